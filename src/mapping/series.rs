//! Evenly spaced samples, such as time points.

use crate::error::{parse_err, Result};
use crate::util::{fmt_float, parse_float, parse_int};
use crate::xml::element::XmlElement;
use log::warn;

/// Unit of the series start and step.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum SeriesUnit {
    /// Seconds
    Second,
    /// Hertz
    Hertz,
    /// Meters
    Meter,
    /// Radians
    Radian,
}

impl SeriesUnit {
    /// Name used in the `SeriesUnit` attribute.
    pub fn name(self) -> &'static str {
        match self {
            SeriesUnit::Second => "SECOND",
            SeriesUnit::Hertz => "HERTZ",
            SeriesUnit::Meter => "METER",
            SeriesUnit::Radian => "RADIAN",
        }
    }

    /// Parse a `SeriesUnit` attribute value.
    pub fn from_name(name: &str) -> Option<SeriesUnit> {
        match name {
            "SECOND" => Some(SeriesUnit::Second),
            "HERTZ" => Some(SeriesUnit::Hertz),
            "METER" => Some(SeriesUnit::Meter),
            "RADIAN" => Some(SeriesUnit::Radian),
            _ => None,
        }
    }
}

impl Default for SeriesUnit {
    fn default() -> Self {
        SeriesUnit::Second
    }
}

/// Mapping of indices to `start + index * step` in some unit.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesMap {
    length: i64,
    start: f32,
    step: f32,
    unit: SeriesUnit,
}

impl Default for SeriesMap {
    fn default() -> Self {
        SeriesMap {
            length: -1,
            start: 0.0,
            step: 1.0,
            unit: SeriesUnit::Second,
        }
    }
}

impl SeriesMap {
    /// Create a series of the given length, starting at zero with unit step.
    pub fn new(length: i64) -> Self {
        SeriesMap {
            length,
            ..Default::default()
        }
    }

    /// Number of samples, -1 while unknown.
    pub fn get_length(&self) -> i64 {
        self.length
    }

    /// Value of the first sample.
    pub fn get_start(&self) -> f32 {
        self.start
    }

    /// Distance between samples.
    pub fn get_step(&self) -> f32 {
        self.step
    }

    /// Unit of start and step.
    pub fn get_unit(&self) -> SeriesUnit {
        self.unit
    }

    /// Set the number of samples.
    pub fn set_length(&mut self, length: i64) {
        self.length = length;
    }

    /// Set the value of the first sample.
    pub fn set_start(&mut self, start: f32) {
        self.start = start;
    }

    /// Set the distance between samples.
    pub fn set_step(&mut self, step: f32) {
        self.step = step;
    }

    /// Set the unit.
    pub fn set_unit(&mut self, unit: SeriesUnit) {
        self.unit = unit;
    }

    /// Value of the sample at an index.
    pub fn value_at(&self, index: i64) -> f32 {
        self.start + self.step * index as f32
    }

    /// Read `TIME_POINTS` attributes. The length is not stored in CIFTI-1
    /// XML and stays -1 until the caller sets it.
    pub(crate) fn read_xml1(elem: &XmlElement) -> Result<SeriesMap> {
        let mult = match elem.attr("TimeStepUnits") {
            None => return parse_err("timepoints mapping is missing TimeStepUnits attribute"),
            Some("NIFTI_UNITS_SEC") => 1.0,
            Some("NIFTI_UNITS_MSEC") => 0.001,
            Some("NIFTI_UNITS_USEC") => 0.000_001,
            Some(other) => return parse_err(format!("unrecognized value for TimeStepUnits: {}", other)),
        };
        let start = match elem.attr("TimeStart") {
            Some(text) => parse_float(text, "TimeStart")?,
            None => 0.0,
        };
        let step = match elem.attr("TimeStep") {
            Some(text) => parse_float(text, "TimeStep")?,
            None => return parse_err("timepoints mapping is missing TimeStep attribute"),
        };
        elem.expect_no_children()?;
        Ok(SeriesMap {
            length: -1,
            start: (start * mult) as f32,
            step: (step * mult) as f32,
            unit: SeriesUnit::Second,
        })
    }

    pub(crate) fn read_xml2(elem: &XmlElement) -> Result<SeriesMap> {
        let length = parse_int(elem.required_attr("NumberOfSeriesPoints")?, "NumberOfSeriesPoints")?;
        if length < 0 {
            return parse_err("NumberOfSeriesPoints must not be negative");
        }
        let exponent = parse_int(elem.required_attr("SeriesExponent")?, "SeriesExponent")?;
        let start = parse_float(elem.required_attr("SeriesStart")?, "SeriesStart")?;
        let step = parse_float(elem.required_attr("SeriesStep")?, "SeriesStep")?;
        let text = elem.required_attr("SeriesUnit")?;
        let unit = match SeriesUnit::from_name(text) {
            Some(u) => u,
            None => return parse_err(format!("unrecognized value for SeriesUnit: {}", text)),
        };
        elem.expect_no_children()?;
        let mult = 10.0f64.powi(exponent as i32);
        Ok(SeriesMap {
            length,
            start: (start * mult) as f32,
            step: (step * mult) as f32,
            unit,
        })
    }

    /// Attributes of a CIFTI-1 `TIME_POINTS` mapping, rescaled to the
    /// smallest time unit that keeps the values readable.
    pub(crate) fn xml_attributes1(&self) -> Vec<(&'static str, String)> {
        if self.unit != SeriesUnit::Second {
            warn!(
                "series unit {} is written to CIFTI-1 as seconds",
                self.unit.name()
            );
        }
        let test = if self.step != 0.0 { self.step } else { self.start };
        let (mult, units) = if test != 0.0 && test.abs() < 0.00005 {
            (1_000_000.0f32, "NIFTI_UNITS_USEC")
        } else if test != 0.0 && test.abs() < 0.05 {
            (1000.0, "NIFTI_UNITS_MSEC")
        } else {
            (1.0, "NIFTI_UNITS_SEC")
        };
        vec![
            ("TimeStepUnits", units.to_string()),
            ("TimeStart", fmt_float(self.start * mult)),
            ("TimeStep", fmt_float(self.step * mult)),
        ]
    }

    pub(crate) fn xml_attributes2(&self) -> Vec<(&'static str, String)> {
        vec![
            ("NumberOfSeriesPoints", self.length.to_string()),
            ("SeriesExponent", "0".to_string()),
            ("SeriesStart", fmt_float(self.start)),
            ("SeriesStep", fmt_float(self.step)),
            ("SeriesUnit", self.unit.name().to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    fn element(attrs: &[(&str, String)]) -> XmlElement {
        let mut elem = XmlElement::new("MatrixIndicesMap");
        elem.attributes = attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        elem
    }

    #[test]
    fn cifti2_attributes() {
        let mut map = SeriesMap::new(20);
        map.set_start(-1.5);
        map.set_step(0.72);
        map.set_unit(SeriesUnit::Hertz);
        let back = SeriesMap::read_xml2(&element(&map.xml_attributes2())).unwrap();
        assert_eq!(back, map);
        assert_relative_eq!(back.value_at(10), 5.7, epsilon = 1e-5);
    }

    #[test]
    fn cifti2_exponent() {
        let elem = element(&[
            ("NumberOfSeriesPoints", "3".to_string()),
            ("SeriesExponent", "-3".to_string()),
            ("SeriesStart", "10".to_string()),
            ("SeriesStep", "2".to_string()),
            ("SeriesUnit", "METER".to_string()),
        ]);
        let map = SeriesMap::read_xml2(&elem).unwrap();
        assert_eq!(map.get_length(), 3);
        assert_relative_eq!(map.get_start(), 0.01);
        assert_relative_eq!(map.get_step(), 0.002);
        assert_eq!(map.get_unit(), SeriesUnit::Meter);
        let bad = element(&[
            ("NumberOfSeriesPoints", "3".to_string()),
            ("SeriesExponent", "0".to_string()),
            ("SeriesStart", "0".to_string()),
            ("SeriesStep", "1".to_string()),
            ("SeriesUnit", "FURLONG".to_string()),
        ]);
        assert!(SeriesMap::read_xml2(&bad).is_err());
    }

    #[test]
    fn cifti1_units() {
        let mut map = SeriesMap::new(4);
        map.set_step(0.002);
        let attrs = map.xml_attributes1();
        assert_eq!(attrs[0], ("TimeStepUnits", "NIFTI_UNITS_MSEC".to_string()));
        let mut back = SeriesMap::read_xml1(&element(&attrs)).unwrap();
        assert_eq!(back.get_length(), -1);
        back.set_length(4);
        assert_relative_eq!(back.get_step(), 0.002);
        assert_eq!(back.get_unit(), SeriesUnit::Second);

        map.set_step(0.00001);
        assert_eq!(map.xml_attributes1()[0].1, "NIFTI_UNITS_USEC");
        map.set_step(2.0);
        assert_eq!(map.xml_attributes1()[0].1, "NIFTI_UNITS_SEC");

        let missing = element(&[("TimeStepUnits", "NIFTI_UNITS_SEC".to_string())]);
        assert!(SeriesMap::read_xml1(&missing).is_err());
    }
}
