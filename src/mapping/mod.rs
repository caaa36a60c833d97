//! Index mappings: what each index along one matrix dimension stands for.
//!
//! A [`MappingType`] holds one of five kinds of mapping. Brain models and
//! parcels refer to brainordinates, while series, scalars and labels simply
//! enumerate the indices.

use crate::error::{parse_err, Result};
use crate::xml::element::{XmlElement, XmlWriter};
use log::trace;

pub mod brain_models;
pub mod labels;
mod named;
pub mod parcels;
pub mod scalars;
pub mod series;

pub use self::brain_models::BrainModelsMap;
pub use self::labels::LabelsMap;
pub use self::parcels::{Parcel, ParcelsMap};
pub use self::scalars::ScalarsMap;
pub use self::series::{SeriesMap, SeriesUnit};

/// The kind of a mapping.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum IndexType {
    /// Surface vertices and volume voxels
    BrainModels,
    /// Named groups of brainordinates
    Parcels,
    /// Evenly spaced samples
    Series,
    /// Named maps
    Scalars,
    /// Named maps with label tables
    Labels,
}

impl IndexType {
    /// Short uppercase name of the kind.
    pub fn name(self) -> &'static str {
        match self {
            IndexType::BrainModels => "BRAIN_MODELS",
            IndexType::Parcels => "PARCELS",
            IndexType::Series => "SERIES",
            IndexType::Scalars => "SCALARS",
            IndexType::Labels => "LABELS",
        }
    }

    /// Value of `IndicesMapToDataType` in CIFTI-2.
    pub fn cifti_name(self) -> &'static str {
        match self {
            IndexType::BrainModels => "CIFTI_INDEX_TYPE_BRAIN_MODELS",
            IndexType::Parcels => "CIFTI_INDEX_TYPE_PARCELS",
            IndexType::Series => "CIFTI_INDEX_TYPE_SERIES",
            IndexType::Scalars => "CIFTI_INDEX_TYPE_SCALARS",
            IndexType::Labels => "CIFTI_INDEX_TYPE_LABELS",
        }
    }

    /// Value of `IndicesMapToDataType` in CIFTI-1, where series are time points.
    pub fn cifti1_name(self) -> &'static str {
        match self {
            IndexType::Series => "CIFTI_INDEX_TYPE_TIME_POINTS",
            other => other.cifti_name(),
        }
    }
}

/// Outcome of comparing the brainordinates of two mappings.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum MatchResult {
    /// Same models in both
    Equal,
    /// Every model of the left side is in the right side, which has more
    Subset,
    /// Neither of the above
    No,
}

/// A mapping of one matrix dimension.
#[derive(Debug, Clone, PartialEq)]
pub enum MappingType {
    /// Brainordinate mapping
    BrainModels(BrainModelsMap),
    /// Parcel mapping
    Parcels(ParcelsMap),
    /// Series mapping
    Series(SeriesMap),
    /// Scalar maps
    Scalars(ScalarsMap),
    /// Label maps
    Labels(LabelsMap),
}

impl From<BrainModelsMap> for MappingType {
    fn from(map: BrainModelsMap) -> Self {
        MappingType::BrainModels(map)
    }
}

impl From<ParcelsMap> for MappingType {
    fn from(map: ParcelsMap) -> Self {
        MappingType::Parcels(map)
    }
}

impl From<SeriesMap> for MappingType {
    fn from(map: SeriesMap) -> Self {
        MappingType::Series(map)
    }
}

impl From<ScalarsMap> for MappingType {
    fn from(map: ScalarsMap) -> Self {
        MappingType::Scalars(map)
    }
}

impl From<LabelsMap> for MappingType {
    fn from(map: LabelsMap) -> Self {
        MappingType::Labels(map)
    }
}

impl MappingType {
    /// The kind of this mapping.
    pub fn index_type(&self) -> IndexType {
        match self {
            MappingType::BrainModels(_) => IndexType::BrainModels,
            MappingType::Parcels(_) => IndexType::Parcels,
            MappingType::Series(_) => IndexType::Series,
            MappingType::Scalars(_) => IndexType::Scalars,
            MappingType::Labels(_) => IndexType::Labels,
        }
    }

    /// Number of indices along the dimension.
    pub fn get_length(&self) -> i64 {
        match self {
            MappingType::BrainModels(m) => m.get_length(),
            MappingType::Parcels(m) => m.get_length(),
            MappingType::Series(m) => m.get_length(),
            MappingType::Scalars(m) => m.get_length(),
            MappingType::Labels(m) => m.get_length(),
        }
    }

    /// Check whether elementwise operations between data along these two
    /// mappings are meaningful. On mismatch the error explains why.
    pub fn approximate_match(&self, other: &MappingType) -> std::result::Result<(), String> {
        use self::MappingType::*;
        match (self, other) {
            (BrainModels(a), BrainModels(b)) => a.approximate_match(b),
            (Parcels(a), Parcels(b)) => a.approximate_match(b),
            (Series(_), Series(_))
            | (Series(_), Scalars(_))
            | (Series(_), Labels(_))
            | (Scalars(_), Series(_))
            | (Scalars(_), Scalars(_))
            | (Scalars(_), Labels(_))
            | (Labels(_), Series(_))
            | (Labels(_), Scalars(_))
            | (Labels(_), Labels(_)) => {
                if self.get_length() == other.get_length() {
                    Ok(())
                } else {
                    Err("mappings have different length".to_string())
                }
            }
            _ => Err(format!(
                "{} mapping never matches {}",
                self.index_type().name(),
                other.index_type().name()
            )),
        }
    }

    /// Resolve a 1-based index or an exact name to a 0-based index, -1 if it
    /// does not resolve. Brain models and series only accept numbers.
    pub fn get_index_from_number_or_name(&self, number_or_name: &str) -> i64 {
        match self {
            MappingType::Parcels(m) => m.get_index_from_number_or_name(number_or_name),
            MappingType::Scalars(m) => m.get_index_from_number_or_name(number_or_name),
            MappingType::Labels(m) => m.get_index_from_number_or_name(number_or_name),
            MappingType::BrainModels(_) | MappingType::Series(_) => {
                match number_or_name.parse::<i64>() {
                    Ok(n) if n >= 1 && n <= self.get_length() => n - 1,
                    _ => -1,
                }
            }
        }
    }

    /// Whether metadata, palettes or label tables changed since the flags were
    /// last cleared.
    pub fn mutables_modified(&self) -> bool {
        match self {
            MappingType::Scalars(m) => m.mutables_modified(),
            MappingType::Labels(m) => m.mutables_modified(),
            _ => false,
        }
    }

    /// Reset the modification flags of every embedded mutable object.
    pub fn clear_mutables_modified(&self) {
        match self {
            MappingType::Scalars(m) => m.clear_mutables_modified(),
            MappingType::Labels(m) => m.clear_mutables_modified(),
            _ => {}
        }
    }

    /// Read the contents of a CIFTI-1 `MatrixIndicesMap` of the given type.
    pub(crate) fn read_xml1(type_name: &str, elem: &XmlElement) -> Result<MappingType> {
        Ok(match type_name {
            "CIFTI_INDEX_TYPE_BRAIN_MODELS" => BrainModelsMap::read_xml1(elem)?.into(),
            "CIFTI_INDEX_TYPE_TIME_POINTS" => SeriesMap::read_xml1(elem)?.into(),
            "CIFTI_INDEX_TYPE_LABELS" => {
                trace!("parsing nonstandard labels mapping type in cifti-1");
                LabelsMap::read_xml(elem)?.into()
            }
            "CIFTI_INDEX_TYPE_PARCELS" => ParcelsMap::read_xml1(elem)?.into(),
            "CIFTI_INDEX_TYPE_SCALARS" => {
                trace!("parsing nonstandard scalars mapping type in cifti-1");
                ScalarsMap::read_xml(elem)?.into()
            }
            other => return parse_err(format!("invalid value for IndicesMapToDataType in CIFTI-1: {}", other)),
        })
    }

    /// Read the contents of a CIFTI-2 `MatrixIndicesMap` of the given type.
    pub(crate) fn read_xml2(type_name: &str, elem: &XmlElement) -> Result<MappingType> {
        Ok(match type_name {
            "CIFTI_INDEX_TYPE_BRAIN_MODELS" => BrainModelsMap::read_xml2(elem)?.into(),
            "CIFTI_INDEX_TYPE_LABELS" => LabelsMap::read_xml(elem)?.into(),
            "CIFTI_INDEX_TYPE_PARCELS" => ParcelsMap::read_xml2(elem)?.into(),
            "CIFTI_INDEX_TYPE_SCALARS" => ScalarsMap::read_xml(elem)?.into(),
            "CIFTI_INDEX_TYPE_SERIES" => SeriesMap::read_xml2(elem)?.into(),
            other => return parse_err(format!("invalid value for IndicesMapToDataType in CIFTI-2: {}", other)),
        })
    }

    /// Write a CIFTI-1 `MatrixIndicesMap` element applying to the given
    /// (already swapped) dimension list.
    pub(crate) fn write_xml1(&self, applies_to: &str, xml: &mut XmlWriter) -> Result<()> {
        let mut attrs = vec![
            ("AppliesToMatrixDimension", applies_to.to_string()),
            ("IndicesMapToDataType", self.index_type().cifti1_name().to_string()),
        ];
        match self {
            MappingType::Series(m) => {
                attrs.extend(m.xml_attributes1());
                write_empty_map(xml, &attrs)
            }
            MappingType::BrainModels(m) => write_map(xml, &attrs, |xml| m.write_xml1(xml)),
            MappingType::Parcels(m) => write_map(xml, &attrs, |xml| m.write_xml1(xml)),
            MappingType::Scalars(m) => write_map(xml, &attrs, |xml| m.write_xml(xml)),
            MappingType::Labels(m) => write_map(xml, &attrs, |xml| m.write_xml(xml)),
        }
    }

    /// Write a CIFTI-2 `MatrixIndicesMap` element applying to the given
    /// dimension list.
    pub(crate) fn write_xml2(&self, applies_to: &str, xml: &mut XmlWriter) -> Result<()> {
        let mut attrs = vec![
            ("AppliesToMatrixDimension", applies_to.to_string()),
            ("IndicesMapToDataType", self.index_type().cifti_name().to_string()),
        ];
        match self {
            MappingType::Series(m) => {
                attrs.extend(m.xml_attributes2());
                write_empty_map(xml, &attrs)
            }
            MappingType::BrainModels(m) => write_map(xml, &attrs, |xml| m.write_xml2(xml)),
            MappingType::Parcels(m) => write_map(xml, &attrs, |xml| m.write_xml2(xml)),
            MappingType::Scalars(m) => write_map(xml, &attrs, |xml| m.write_xml(xml)),
            MappingType::Labels(m) => write_map(xml, &attrs, |xml| m.write_xml(xml)),
        }
    }
}

fn borrow_attrs<'a>(attrs: &'a [(&'static str, String)]) -> Vec<(&'static str, &'a str)> {
    attrs.iter().map(|(k, v)| (*k, v.as_str())).collect()
}

fn write_empty_map(xml: &mut XmlWriter, attrs: &[(&'static str, String)]) -> Result<()> {
    xml.empty("MatrixIndicesMap", &borrow_attrs(attrs))
}

fn write_map<F>(xml: &mut XmlWriter, attrs: &[(&'static str, String)], body: F) -> Result<()>
where
    F: FnOnce(&mut XmlWriter) -> Result<()>,
{
    xml.start("MatrixIndicesMap", &borrow_attrs(attrs))?;
    body(xml)?;
    xml.end("MatrixIndicesMap")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::Structure;
    use pretty_assertions::assert_eq;

    fn surface_map(nodes: &[i64]) -> MappingType {
        let mut map = BrainModelsMap::new();
        map.add_surface_model(10, Structure::CortexLeft, nodes).unwrap();
        map.into()
    }

    #[test]
    fn kinds_and_lengths() {
        let map = surface_map(&[0, 1, 2]);
        assert_eq!(map.index_type(), IndexType::BrainModels);
        assert_eq!(map.get_length(), 3);
        assert_eq!(MappingType::from(SeriesMap::new(7)).get_length(), 7);
        assert_eq!(IndexType::Series.cifti1_name(), "CIFTI_INDEX_TYPE_TIME_POINTS");
        assert_eq!(IndexType::Series.cifti_name(), "CIFTI_INDEX_TYPE_SERIES");
    }

    #[test]
    fn approximate_matching_between_kinds() {
        let series: MappingType = SeriesMap::new(3).into();
        let scalars: MappingType = ScalarsMap::new(3).into();
        let labels: MappingType = LabelsMap::new(4).into();
        assert_eq!(series.approximate_match(&scalars), Ok(()));
        assert_eq!(
            series.approximate_match(&labels),
            Err("mappings have different length".to_string())
        );
        let dense = surface_map(&[0, 1, 2]);
        assert_eq!(
            dense.approximate_match(&series),
            Err("BRAIN_MODELS mapping never matches SERIES".to_string())
        );
        assert_eq!(dense.approximate_match(&surface_map(&[0, 1, 2])), Ok(()));
        assert!(dense.approximate_match(&surface_map(&[0, 1, 3])).is_err());
    }

    #[test]
    fn number_or_name_on_unnamed_kinds() {
        let series: MappingType = SeriesMap::new(3).into();
        assert_eq!(series.get_index_from_number_or_name("3"), 2);
        assert_eq!(series.get_index_from_number_or_name("4"), -1);
        assert_eq!(series.get_index_from_number_or_name("first"), -1);
    }

    #[test]
    fn series_map_is_written_empty() {
        let mut xml = XmlWriter::new();
        MappingType::from(SeriesMap::new(2))
            .write_xml2("0", &mut xml)
            .unwrap();
        let text = xml.into_string().unwrap();
        let elem = XmlElement::parse_document(&text).unwrap();
        assert_eq!(elem.attr("IndicesMapToDataType"), Some("CIFTI_INDEX_TYPE_SERIES"));
        assert_eq!(elem.attr("NumberOfSeriesPoints"), Some("2"));
        assert!(elem.children.is_empty());
        let back = MappingType::read_xml2("CIFTI_INDEX_TYPE_SERIES", &elem).unwrap();
        assert_eq!(back, MappingType::from(SeriesMap::new(2)));
    }
}
