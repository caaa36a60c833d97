//! Palette color mapping settings, stored as an XML string in metadata
//! under the `PaletteColorMapping` key.

use crate::error::{parse_err, Result};
use crate::util::{parse_bool, parse_float};
use crate::xml::element::{XmlElement, XmlWriter};
use log::trace;

/// Metadata key holding the encoded palette.
pub const PALETTE_METADATA_KEY: &str = "PaletteColorMapping";

const PALETTE_XML_VERSION: &str = "1";

/// How data values are mapped onto the palette range.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PaletteScaleMode {
    /// Scale to the full data range
    AutoScale,
    /// Scale to percentiles of the data
    AutoScalePercentage,
    /// Scale to percentiles of the absolute data values
    AutoScaleAbsolutePercentage,
    /// Scale to user given values
    UserScale,
}

impl PaletteScaleMode {
    fn name(self) -> &'static str {
        match self {
            PaletteScaleMode::AutoScale => "MODE_AUTO_SCALE",
            PaletteScaleMode::AutoScalePercentage => "MODE_AUTO_SCALE_PERCENTAGE",
            PaletteScaleMode::AutoScaleAbsolutePercentage => "MODE_AUTO_SCALE_ABSOLUTE_PERCENTAGE",
            PaletteScaleMode::UserScale => "MODE_USER_SCALE",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "MODE_AUTO_SCALE" => Some(PaletteScaleMode::AutoScale),
            "MODE_AUTO_SCALE_PERCENTAGE" => Some(PaletteScaleMode::AutoScalePercentage),
            "MODE_AUTO_SCALE_ABSOLUTE_PERCENTAGE" => Some(PaletteScaleMode::AutoScaleAbsolutePercentage),
            "MODE_USER_SCALE" => Some(PaletteScaleMode::UserScale),
            _ => None,
        }
    }
}

/// Which side of the thresholds is displayed.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ThresholdTest {
    /// Show values outside the threshold range
    ShowOutside,
    /// Show values inside the threshold range
    ShowInside,
}

impl ThresholdTest {
    fn name(self) -> &'static str {
        match self {
            ThresholdTest::ShowOutside => "THRESHOLD_TEST_SHOW_OUTSIDE",
            ThresholdTest::ShowInside => "THRESHOLD_TEST_SHOW_INSIDE",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "THRESHOLD_TEST_SHOW_OUTSIDE" => Some(ThresholdTest::ShowOutside),
            "THRESHOLD_TEST_SHOW_INSIDE" => Some(ThresholdTest::ShowInside),
            _ => None,
        }
    }
}

/// Kind of thresholding applied before coloring.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ThresholdType {
    /// No thresholding
    Off,
    /// Threshold using the normal values
    Normal,
    /// Threshold using mapped values
    Mapped,
    /// Threshold using mapped average area values
    MappedAverageArea,
    /// Threshold using another file
    File,
}

impl ThresholdType {
    fn name(self) -> &'static str {
        match self {
            ThresholdType::Off => "THRESHOLD_TYPE_OFF",
            ThresholdType::Normal => "THRESHOLD_TYPE_NORMAL",
            ThresholdType::Mapped => "THRESHOLD_TYPE_MAPPED",
            ThresholdType::MappedAverageArea => "THRESHOLD_TYPE_MAPPED_AVERAGE_AREA",
            ThresholdType::File => "THRESHOLD_TYPE_FILE",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "THRESHOLD_TYPE_OFF" => Some(ThresholdType::Off),
            "THRESHOLD_TYPE_NORMAL" => Some(ThresholdType::Normal),
            "THRESHOLD_TYPE_MAPPED" => Some(ThresholdType::Mapped),
            "THRESHOLD_TYPE_MAPPED_AVERAGE_AREA" => Some(ThresholdType::MappedAverageArea),
            "THRESHOLD_TYPE_FILE" => Some(ThresholdType::File),
            _ => None,
        }
    }
}

/// Display settings for mapping scalar data onto a color palette.
#[derive(Debug, Clone)]
pub struct PaletteColorMapping {
    /// Scaling mode
    pub scale_mode: PaletteScaleMode,
    /// Negative maximum, negative minimum, positive minimum, positive maximum percentiles
    pub auto_scale_percentage: [f32; 4],
    /// Minimum and maximum percentiles of absolute values
    pub auto_scale_absolute_percentage: [f32; 2],
    /// Negative maximum, negative minimum, positive minimum, positive maximum values
    pub user_scale: [f32; 4],
    /// Name of the palette
    pub palette_name: String,
    /// Interpolate colors between palette control points
    pub interpolate: bool,
    /// Show positive values
    pub display_positive: bool,
    /// Show zero values
    pub display_zero: bool,
    /// Show negative values
    pub display_negative: bool,
    /// Threshold test
    pub threshold_test: ThresholdTest,
    /// Threshold type
    pub threshold_type: ThresholdType,
    /// Lower and upper normal threshold
    pub threshold_normal: [f32; 2],
    modified: bool,
}

impl Default for PaletteColorMapping {
    fn default() -> Self {
        PaletteColorMapping {
            scale_mode: PaletteScaleMode::AutoScalePercentage,
            auto_scale_percentage: [98.0, 2.0, 2.0, 98.0],
            auto_scale_absolute_percentage: [2.0, 98.0],
            user_scale: [-100.0, 0.0, 0.0, 100.0],
            palette_name: "videen_style".to_string(),
            interpolate: true,
            display_positive: true,
            display_zero: false,
            display_negative: true,
            threshold_test: ThresholdTest::ShowOutside,
            threshold_type: ThresholdType::Off,
            threshold_normal: [-1.0, 1.0],
            modified: false,
        }
    }
}

impl PartialEq for PaletteColorMapping {
    fn eq(&self, other: &Self) -> bool {
        self.scale_mode == other.scale_mode
            && self.auto_scale_percentage == other.auto_scale_percentage
            && self.auto_scale_absolute_percentage == other.auto_scale_absolute_percentage
            && self.user_scale == other.user_scale
            && self.palette_name == other.palette_name
            && self.interpolate == other.interpolate
            && self.display_positive == other.display_positive
            && self.display_zero == other.display_zero
            && self.display_negative == other.display_negative
            && self.threshold_test == other.threshold_test
            && self.threshold_type == other.threshold_type
            && self.threshold_normal == other.threshold_normal
    }
}

fn floats_text(values: &[f32]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn read_floats(elem: &XmlElement, out: &mut [f32]) -> Result<()> {
    let tokens: Vec<&str> = elem.text.split_whitespace().collect();
    if tokens.len() != out.len() {
        return parse_err(format!(
            "{} must contain {} numbers",
            elem.name,
            out.len()
        ));
    }
    for (o, t) in out.iter_mut().zip(tokens) {
        *o = parse_float(t, &elem.name)? as f32;
    }
    Ok(())
}

fn read_flag(elem: &XmlElement) -> Result<bool> {
    match parse_bool(&elem.text) {
        Some(b) => Ok(b),
        None => parse_err(format!("{} must be true or false, found '{}'", elem.name, elem.text)),
    }
}

fn unknown_value<T>(elem: &XmlElement) -> Result<T> {
    parse_err(format!("invalid value for {}: {}", elem.name, elem.text.trim()))
}

impl PaletteColorMapping {
    /// Create the default palette settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether settings changed since the flag was last cleared.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Flag the settings as changed.
    pub fn set_modified(&mut self) {
        self.modified = true;
    }

    /// Reset the modification flag.
    pub fn clear_modified(&mut self) {
        self.modified = false;
    }

    /// Encode the settings as a standalone XML string.
    pub fn encode_in_xml(&self) -> Result<String> {
        let mut xml = XmlWriter::new();
        xml.start("PaletteColorMapping", &[("Version", PALETTE_XML_VERSION)])?;
        xml.text_element("ScaleMode", &[], self.scale_mode.name())?;
        xml.text_element("AutoScalePercentageValues", &[], &floats_text(&self.auto_scale_percentage))?;
        xml.text_element(
            "AutoScaleAbsolutePercentageValues",
            &[],
            &floats_text(&self.auto_scale_absolute_percentage),
        )?;
        xml.text_element("UserScaleValues", &[], &floats_text(&self.user_scale))?;
        xml.text_element("PaletteName", &[], &self.palette_name)?;
        xml.text_element("InterpolatePalette", &[], &self.interpolate.to_string())?;
        xml.text_element("DisplayPositiveData", &[], &self.display_positive.to_string())?;
        xml.text_element("DisplayZeroData", &[], &self.display_zero.to_string())?;
        xml.text_element("DisplayNegativeData", &[], &self.display_negative.to_string())?;
        xml.text_element("ThresholdTest", &[], self.threshold_test.name())?;
        xml.text_element("ThresholdType", &[], self.threshold_type.name())?;
        xml.text_element("ThresholdNormalValues", &[], &floats_text(&self.threshold_normal))?;
        xml.end("PaletteColorMapping")?;
        xml.into_string()
    }

    /// Decode settings from an XML string. Elements this type does not
    /// model are skipped, missing ones keep their defaults.
    pub fn decode_from_string_xml(text: &str) -> Result<PaletteColorMapping> {
        let root = XmlElement::parse_document(text)?;
        if root.name != "PaletteColorMapping" {
            return parse_err(format!("unexpected root element in palette: {}", root.name));
        }
        let mut ret = PaletteColorMapping::default();
        for child in &root.children {
            let value = child.text.trim();
            match child.name.as_str() {
                "ScaleMode" => {
                    ret.scale_mode = match PaletteScaleMode::from_name(value) {
                        Some(m) => m,
                        None => return unknown_value(child),
                    }
                }
                "AutoScalePercentageValues" => read_floats(child, &mut ret.auto_scale_percentage)?,
                "AutoScaleAbsolutePercentageValues" => {
                    read_floats(child, &mut ret.auto_scale_absolute_percentage)?
                }
                "UserScaleValues" => read_floats(child, &mut ret.user_scale)?,
                "PaletteName" => ret.palette_name = value.to_string(),
                "InterpolatePalette" => ret.interpolate = read_flag(child)?,
                "DisplayPositiveData" => ret.display_positive = read_flag(child)?,
                "DisplayZeroData" => ret.display_zero = read_flag(child)?,
                "DisplayNegativeData" => ret.display_negative = read_flag(child)?,
                "ThresholdTest" => {
                    ret.threshold_test = match ThresholdTest::from_name(value) {
                        Some(t) => t,
                        None => return unknown_value(child),
                    }
                }
                "ThresholdType" => {
                    ret.threshold_type = match ThresholdType::from_name(value) {
                        Some(t) => t,
                        None => return unknown_value(child),
                    }
                }
                "ThresholdNormalValues" => read_floats(child, &mut ret.threshold_normal)?,
                other => trace!("skipping palette element {}", other),
            }
        }
        Ok(ret)
    }
}
