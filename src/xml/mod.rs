//! The CIFTI XML container: one mapping per matrix dimension plus
//! file-level metadata, read from and written to both CIFTI generations.

use crate::error::{invalid, parse_err, CiftiError, Result};
use crate::mapping::{
    BrainModelsMap, IndexType, LabelsMap, MappingType, ParcelsMap, ScalarsMap, SeriesMap,
};
use crate::metadata::MetaData;
use crate::palette::{PaletteColorMapping, PALETTE_METADATA_KEY};
use crate::volume_space::VolumeSpace;
use log::{debug, warn};
use std::cell::{RefCell, RefMut};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub mod element;

use self::element::{XmlElement, XmlWriter};

/// Dimension whose indices run along a row, i.e. the column index.
pub const ALONG_ROW: usize = 0;
/// Dimension whose indices run along a column, i.e. the row index.
pub const ALONG_COLUMN: usize = 1;

/// Parse a direction given as `ROW`, `COLUMN` or a 1-based dimension number.
pub fn direction_from_string(input: &str) -> Result<usize> {
    if let Ok(converted) = input.parse::<i64>() {
        if converted < 1 {
            return invalid("invalid integer direction, use 1 or greater");
        }
        return Ok((converted - 1) as usize);
    }
    match input {
        "ROW" => Ok(ALONG_ROW),
        "COLUMN" => Ok(ALONG_COLUMN),
        _ => invalid("unrecognized direction string, please use an integer, 'ROW', or 'COLUMN'"),
    }
}

/// Version of the CIFTI XML schema.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum CiftiVersion {
    /// CIFTI-1
    V1_0,
    /// Pre-release CIFTI-2, handled as CIFTI-2
    V1_1,
    /// CIFTI-2
    V2_0,
}

impl CiftiVersion {
    /// The value of the `Version` attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            CiftiVersion::V1_0 => "1.0",
            CiftiVersion::V1_1 => "1.1",
            CiftiVersion::V2_0 => "2.0",
        }
    }

    /// Whether documents of this version use the CIFTI-1 layout.
    pub fn is_cifti1(self) -> bool {
        self == CiftiVersion::V1_0
    }
}

impl Default for CiftiVersion {
    fn default() -> Self {
        CiftiVersion::V2_0
    }
}

impl fmt::Display for CiftiVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CiftiVersion {
    type Err = CiftiError;

    fn from_str(s: &str) -> Result<CiftiVersion> {
        let mut parts = s.trim().splitn(2, '.');
        let major = parts.next().and_then(|p| p.parse::<u32>().ok());
        let minor = match parts.next() {
            Some(p) => p.parse::<u32>().ok(),
            None => Some(0),
        };
        match (major, minor) {
            (Some(1), Some(0)) => Ok(CiftiVersion::V1_0),
            (Some(1), Some(1)) => Ok(CiftiVersion::V1_1),
            (Some(2), Some(0)) => Ok(CiftiVersion::V2_0),
            _ => parse_err(format!("unknown Cifti Version: '{}'", s)),
        }
    }
}

/// The XML header of a CIFTI file.
///
/// File metadata and the file palette can be edited through a shared
/// reference. Dimensions read from a single `MatrixIndicesMap` are
/// independent copies.
#[derive(Debug, Default)]
pub struct CiftiXml {
    maps: Vec<Option<MappingType>>,
    file_metadata: RefCell<MetaData>,
    file_palette: RefCell<Option<PaletteColorMapping>>,
    parsed_version: Option<CiftiVersion>,
}

impl Clone for CiftiXml {
    fn clone(&self) -> Self {
        CiftiXml {
            maps: self.maps.clone(),
            file_metadata: RefCell::new(self.file_metadata.borrow().clone()),
            file_palette: RefCell::new(self.file_palette.borrow().clone()),
            parsed_version: self.parsed_version,
        }
    }
}

impl PartialEq for CiftiXml {
    /// Compares the mappings, the file metadata and the file palette, whether
    /// or not the palette has been decoded yet.
    fn eq(&self, other: &Self) -> bool {
        if self.maps != other.maps {
            return false;
        }
        let mut mine = self.file_metadata.borrow().clone();
        let mut theirs = other.file_metadata.borrow().clone();
        let _ = mine.remove(PALETTE_METADATA_KEY);
        let _ = theirs.remove(PALETTE_METADATA_KEY);
        if mine != theirs {
            return false;
        }
        self.current_file_palette() == other.current_file_palette()
    }
}

impl FromStr for CiftiXml {
    type Err = CiftiError;

    fn from_str(s: &str) -> Result<CiftiXml> {
        CiftiXml::read_xml(s)
    }
}

fn malformed(e: CiftiError) -> CiftiError {
    match e {
        CiftiError::Parse(_) => e,
        other => CiftiError::Parse(other.to_string()),
    }
}

impl CiftiXml {
    /// Create a container with no dimensions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a container with `num` dimensions, none of them mapped yet.
    pub fn with_dimensions(num: usize) -> Self {
        let mut ret = Self::default();
        ret.set_number_of_dimensions(num);
        ret
    }

    /// Parse a CIFTI XML document.
    pub fn read_xml(text: &str) -> Result<CiftiXml> {
        // trailing NULs are common when the XML comes from a NIfTI extension
        let text = text.trim_end_matches('\0');
        let root = XmlElement::parse_document(text).map_err(malformed)?;
        CiftiXml::from_root(&root).map_err(malformed)
    }

    /// Read a CIFTI XML document from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<CiftiXml> {
        let text = fs::read_to_string(path)?;
        CiftiXml::read_xml(&text)
    }

    /// Write the document to a file in the given version.
    pub fn write_file<P: AsRef<Path>>(&self, path: P, version: CiftiVersion) -> Result<()> {
        let text = self.write_xml(version)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Remove all dimensions, metadata and the parsed version.
    pub fn clear(&mut self) {
        *self = CiftiXml::default();
    }

    /// Version of the document this was read from, if any.
    pub fn get_parsed_version(&self) -> Option<CiftiVersion> {
        self.parsed_version
    }

    /// Number of dimensions.
    pub fn get_number_of_dimensions(&self) -> usize {
        self.maps.len()
    }

    /// Add or remove dimensions. New dimensions have no mapping.
    pub fn set_number_of_dimensions(&mut self, num: usize) {
        self.maps.resize(num, None);
    }

    /// The mapping of a dimension.
    pub fn get_map(&self, direction: usize) -> Result<&MappingType> {
        match self.maps.get(direction) {
            Some(Some(map)) => Ok(map),
            _ => Err(CiftiError::NoMapping(direction)),
        }
    }

    /// The mapping of a dimension, for in place changes.
    pub fn get_map_mut(&mut self, direction: usize) -> Result<&mut MappingType> {
        match self.maps.get_mut(direction) {
            Some(Some(map)) => Ok(map),
            _ => Err(CiftiError::NoMapping(direction)),
        }
    }

    /// Set the mapping of an existing dimension. Only one dimension may hold
    /// a labels mapping.
    pub fn set_map<M: Into<MappingType>>(&mut self, direction: usize, map: M) -> Result<()> {
        if direction >= self.maps.len() {
            return invalid(format!(
                "direction {} is out of range for {} dimensions",
                direction,
                self.maps.len()
            ));
        }
        let map = map.into();
        if map.index_type() == IndexType::Labels {
            let other_labels = self.maps.iter().enumerate().any(|(i, m)| {
                i != direction && m.as_ref().map(MappingType::index_type) == Some(IndexType::Labels)
            });
            if other_labels {
                return invalid("Cifti XML cannot contain a label mapping on more than one dimension");
            }
        }
        self.maps[direction] = Some(map);
        Ok(())
    }

    /// Kind of mapping on a dimension.
    pub fn get_mapping_type(&self, direction: usize) -> Result<IndexType> {
        self.get_map(direction).map(MappingType::index_type)
    }

    /// Length of a dimension.
    pub fn get_dimension_length(&self, direction: usize) -> Result<i64> {
        self.get_map(direction).map(MappingType::get_length)
    }

    /// Lengths of every dimension.
    pub fn get_dimensions(&self) -> Result<Vec<i64>> {
        (0..self.maps.len())
            .map(|i| self.get_dimension_length(i))
            .collect()
    }

    /// Editable file-level metadata.
    pub fn get_file_metadata(&self) -> RefMut<'_, MetaData> {
        self.file_metadata.borrow_mut()
    }

    /// Editable file-level palette, decoded from the file metadata on first use.
    pub fn get_file_palette(&self) -> RefMut<'_, PaletteColorMapping> {
        let mut cache = self.file_palette.borrow_mut();
        if cache.is_none() {
            *cache = Some(self.decode_file_palette());
        }
        RefMut::map(cache, |p| p.get_or_insert_with(PaletteColorMapping::default))
    }

    fn decode_file_palette(&self) -> PaletteColorMapping {
        match self.file_metadata.borrow().get(PALETTE_METADATA_KEY) {
            Some(text) => PaletteColorMapping::decode_from_string_xml(text).unwrap_or_else(|e| {
                warn!("failed to parse palette settings from metadata: {}", e);
                PaletteColorMapping::default()
            }),
            None => PaletteColorMapping::default(),
        }
    }

    /// The palette as it would be returned by `get_file_palette`, without
    /// caching it.
    fn current_file_palette(&self) -> PaletteColorMapping {
        match self.file_palette.borrow().as_ref() {
            Some(p) => p.clone(),
            None => self.decode_file_palette(),
        }
    }

    /// Whether every dimension is mapped, and the mappings pairwise
    /// approximately match those of `other`.
    pub fn approximate_match(&self, other: &CiftiXml) -> bool {
        if self.maps.len() != other.maps.len() {
            return false;
        }
        self.maps.iter().zip(&other.maps).all(|(a, b)| match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => a.approximate_match(b).is_ok(),
            _ => false,
        })
    }

    /// Whether any metadata, palette or label table changed since the flags
    /// were last cleared.
    pub fn mutables_modified(&self) -> bool {
        if self.file_metadata.borrow().is_modified() {
            return true;
        }
        if self.file_palette.borrow().as_ref().map_or(false, |p| p.is_modified()) {
            return true;
        }
        self.maps.iter().flatten().any(MappingType::mutables_modified)
    }

    /// Reset every modification flag.
    pub fn clear_mutables_modified(&self) {
        self.file_metadata.borrow_mut().clear_modified();
        if let Some(p) = self.file_palette.borrow_mut().as_mut() {
            p.clear_modified();
        }
        for map in self.maps.iter().flatten() {
            map.clear_mutables_modified();
        }
    }

    /// NIfTI intent code and name for a file with these mappings.
    pub fn get_intent_info(&self, version: CiftiVersion) -> Result<(i32, &'static str)> {
        use crate::mapping::IndexType::*;
        if version.is_cifti1() {
            let mut ret = (3001, "ConnDense");
            for dim in 0..self.maps.len().min(2) {
                if self.get_mapping_type(dim)? == Series {
                    ret = (3002, "ConnDenseTime");
                }
            }
            return Ok(ret);
        }
        let types = (0..self.maps.len())
            .map(|i| self.get_mapping_type(i))
            .collect::<Result<Vec<_>>>()?;
        Ok(match types.as_slice() {
            [BrainModels, BrainModels] => (3001, "ConnDense"),
            [Series, BrainModels] => (3002, "ConnDenseSeries"),
            [Parcels, Parcels] => (3003, "ConnParcels"),
            [Series, Parcels] => (3004, "ConnParcelSries"),
            [Scalars, BrainModels] => (3006, "ConnDenseScalar"),
            [Labels, BrainModels] => (3007, "ConnDenseLabel"),
            [Scalars, Parcels] => (3008, "ConnParcelScalr"),
            [BrainModels, Parcels] => (3009, "ConnParcelDense"),
            [Parcels, BrainModels] => (3010, "ConnDenseParcel"),
            [Parcels, Parcels, Series] => (3011, "ConnPPSr"),
            [Parcels, Parcels, Scalars] => (3012, "ConnPPSc"),
            _ => (3000, "ConnUnknown"),
        })
    }

    /// Brain models mapping of a dimension.
    pub fn get_brain_models_map(&self, direction: usize) -> Result<&BrainModelsMap> {
        match self.get_map(direction)? {
            MappingType::BrainModels(m) => Ok(m),
            other => wrong_type(IndexType::BrainModels, other),
        }
    }

    /// Brain models mapping of a dimension, for in place changes.
    pub fn get_brain_models_map_mut(&mut self, direction: usize) -> Result<&mut BrainModelsMap> {
        match self.get_map_mut(direction)? {
            MappingType::BrainModels(m) => Ok(m),
            other => wrong_type(IndexType::BrainModels, other),
        }
    }

    /// Parcels mapping of a dimension.
    pub fn get_parcels_map(&self, direction: usize) -> Result<&ParcelsMap> {
        match self.get_map(direction)? {
            MappingType::Parcels(m) => Ok(m),
            other => wrong_type(IndexType::Parcels, other),
        }
    }

    /// Parcels mapping of a dimension, for in place changes.
    pub fn get_parcels_map_mut(&mut self, direction: usize) -> Result<&mut ParcelsMap> {
        match self.get_map_mut(direction)? {
            MappingType::Parcels(m) => Ok(m),
            other => wrong_type(IndexType::Parcels, other),
        }
    }

    /// Series mapping of a dimension.
    pub fn get_series_map(&self, direction: usize) -> Result<&SeriesMap> {
        match self.get_map(direction)? {
            MappingType::Series(m) => Ok(m),
            other => wrong_type(IndexType::Series, other),
        }
    }

    /// Series mapping of a dimension, for in place changes such as setting
    /// the length after reading CIFTI-1.
    pub fn get_series_map_mut(&mut self, direction: usize) -> Result<&mut SeriesMap> {
        match self.get_map_mut(direction)? {
            MappingType::Series(m) => Ok(m),
            other => wrong_type(IndexType::Series, other),
        }
    }

    /// Scalars mapping of a dimension.
    pub fn get_scalars_map(&self, direction: usize) -> Result<&ScalarsMap> {
        match self.get_map(direction)? {
            MappingType::Scalars(m) => Ok(m),
            other => wrong_type(IndexType::Scalars, other),
        }
    }

    /// Scalars mapping of a dimension, for in place changes.
    pub fn get_scalars_map_mut(&mut self, direction: usize) -> Result<&mut ScalarsMap> {
        match self.get_map_mut(direction)? {
            MappingType::Scalars(m) => Ok(m),
            other => wrong_type(IndexType::Scalars, other),
        }
    }

    /// Labels mapping of a dimension.
    pub fn get_labels_map(&self, direction: usize) -> Result<&LabelsMap> {
        match self.get_map(direction)? {
            MappingType::Labels(m) => Ok(m),
            other => wrong_type(IndexType::Labels, other),
        }
    }

    /// Labels mapping of a dimension, for in place changes.
    pub fn get_labels_map_mut(&mut self, direction: usize) -> Result<&mut LabelsMap> {
        match self.get_map_mut(direction)? {
            MappingType::Labels(m) => Ok(m),
            other => wrong_type(IndexType::Labels, other),
        }
    }

    fn from_root(root: &XmlElement) -> Result<CiftiXml> {
        if root.name != "CIFTI" {
            return parse_err(format!("unexpected root element in Cifti XML: {}", root.name));
        }
        let version: CiftiVersion = match root.attr("Version") {
            Some(v) => v.parse()?,
            None => return parse_err("Cifti XML missing Version attribute."),
        };
        let mut ret = CiftiXml::new();
        ret.parsed_version = Some(version);
        match version {
            CiftiVersion::V1_0 => {
                match root.attr("NumberOfMatrices") {
                    Some("1") => {}
                    Some(_) => {
                        return parse_err("attribute NumberOfMatrices in CIFTI is required to be 1 for CIFTI-1")
                    }
                    None => return parse_err("missing attribute NumberOfMatrices in CIFTI"),
                }
                ret.parse_matrix1(single_matrix(root)?)?;
            }
            CiftiVersion::V1_1 => {
                warn!("parsing cifti version '1.1', this should not exist in the wild");
                ret.parse_matrix2(single_matrix(root)?)?;
            }
            CiftiVersion::V2_0 => ret.parse_matrix2(single_matrix(root)?)?,
        }
        Ok(ret)
    }

    fn parse_matrix1(&mut self, matrix: &XmlElement) -> Result<()> {
        let mut volume_space = None;
        let mut have_metadata = false;
        for child in &matrix.children {
            match child.name.as_str() {
                "MetaData" => {
                    if have_metadata {
                        return parse_err("MetaData may only be specified once in Matrix");
                    }
                    *self.file_metadata.get_mut() = MetaData::read_cifti_xml(child)?;
                    have_metadata = true;
                }
                "MatrixIndicesMap" => self.parse_indices_map(child, false)?,
                "Volume" => {
                    if volume_space.is_some() {
                        return parse_err("Volume may only be specified once in Matrix");
                    }
                    volume_space = Some(VolumeSpace::read_cifti_xml1(child)?);
                }
                "LabelTable" => debug!("skipping unused LabelTable element in Matrix in CIFTI-1"),
                other => return parse_err(format!("unexpected element in Matrix: {}", other)),
            }
        }
        for (i, map) in self.maps.iter_mut().enumerate() {
            let map = match map {
                Some(m) => m,
                None => {
                    return parse_err(format!("missing mapping for dimension '{}'", swap_cifti1(i)))
                }
            };
            match map {
                MappingType::BrainModels(m) if m.has_volume_data() => match &volume_space {
                    Some(space) => m.set_volume_space(space.clone())?,
                    None => return parse_err("BrainModels map uses voxels, but no Volume element exists"),
                },
                MappingType::Parcels(m) if m.has_volume_data() => match &volume_space {
                    Some(space) => m.set_volume_space(space.clone())?,
                    None => return parse_err("Parcels map uses voxels, but no Volume element exists"),
                },
                _ => {}
            }
        }
        Ok(())
    }

    fn parse_matrix2(&mut self, matrix: &XmlElement) -> Result<()> {
        let mut have_metadata = false;
        for child in &matrix.children {
            match child.name.as_str() {
                "MetaData" => {
                    if have_metadata {
                        return parse_err("MetaData may only be specified once in Matrix");
                    }
                    *self.file_metadata.get_mut() = MetaData::read_cifti_xml(child)?;
                    have_metadata = true;
                }
                "MatrixIndicesMap" => self.parse_indices_map(child, true)?,
                other => return parse_err(format!("unexpected element in Matrix: {}", other)),
            }
        }
        if let Some(i) = self.maps.iter().position(Option::is_none) {
            return parse_err(format!("missing mapping for dimension '{}'", i));
        }
        Ok(())
    }

    fn parse_indices_map(&mut self, elem: &XmlElement, cifti2: bool) -> Result<()> {
        let applies_to = elem.required_attr("AppliesToMatrixDimension")?;
        let type_name = elem.required_attr("IndicesMapToDataType")?;
        let mut used = BTreeSet::new();
        for value in applies_to.split(',') {
            let parsed = match value.trim().parse::<usize>() {
                Ok(v) => v,
                Err(_) => return parse_err(format!("bad value in AppliesToMatrixDimension list: {}", value)),
            };
            let dim = if cifti2 { parsed } else { swap_cifti1(parsed) };
            if !used.insert(dim) {
                return parse_err(format!("AppliesToMatrixDimension contains repeated value: {}", value));
            }
        }
        let map = if cifti2 {
            MappingType::read_xml2(type_name, elem)?
        } else {
            MappingType::read_xml1(type_name, elem)?
        };
        if let Some(&last) = used.iter().next_back() {
            if last >= self.maps.len() {
                self.maps.resize(last + 1, None);
            }
        }
        for dim in used {
            if self.maps[dim].is_some() {
                return parse_err(format!("dimension '{}' has more than one mapping", dim));
            }
            self.maps[dim] = Some(map.clone());
        }
        Ok(())
    }

    /// Write the document in the given version.
    pub fn write_xml(&self, version: CiftiVersion) -> Result<String> {
        if let Some(i) = self.maps.iter().position(Option::is_none) {
            return Err(CiftiError::NoMapping(i));
        }
        let mut xml = XmlWriter::new();
        xml.declaration()?;
        match version {
            CiftiVersion::V1_0 => {
                xml.start("CIFTI", &[("Version", version.as_str()), ("NumberOfMatrices", "1")])?;
                self.write_matrix1(&mut xml)?;
            }
            CiftiVersion::V1_1 => {
                warn!("writing cifti version '1.1', this should not exist in the wild");
                xml.start("CIFTI", &[("Version", version.as_str())])?;
                self.write_matrix2(&mut xml)?;
            }
            CiftiVersion::V2_0 => {
                xml.start("CIFTI", &[("Version", version.as_str())])?;
                self.write_matrix2(&mut xml)?;
            }
        }
        xml.end("CIFTI")?;
        xml.into_string()
    }

    /// File metadata with a decoded palette written back under its key.
    fn effective_file_metadata(&self) -> Result<MetaData> {
        let mut metadata = self.file_metadata.borrow().clone();
        if let Some(palette) = self.file_palette.borrow().as_ref() {
            metadata.set(PALETTE_METADATA_KEY, palette.encode_in_xml()?);
        }
        Ok(metadata)
    }

    fn mapped(&self) -> impl Iterator<Item = &MappingType> {
        self.maps.iter().flatten()
    }

    fn write_matrix1(&self, xml: &mut XmlWriter) -> Result<()> {
        let mut space: Option<&VolumeSpace> = None;
        for map in self.mapped() {
            let map_space = match map {
                MappingType::BrainModels(m) if m.has_volume_data() => m.get_volume_space()?,
                MappingType::Parcels(m) if m.has_volume_data() => m.get_volume_space()?,
                _ => continue,
            };
            match space {
                Some(s) if s != map_space => {
                    return invalid("cannot write different volume spaces for different dimensions in CIFTI-1")
                }
                Some(_) => {}
                None => space = Some(map_space),
            }
        }
        xml.start("Matrix", &[])?;
        self.effective_file_metadata()?.write_cifti_xml(xml)?;
        if let Some(space) = space {
            space.write_cifti_xml1(xml)?;
        }
        for (map, dims) in self.deduplicated() {
            let applies_to = dims
                .iter()
                .map(|&d| swap_cifti1(d).to_string())
                .collect::<Vec<_>>()
                .join(",");
            map.write_xml1(&applies_to, xml)?;
        }
        xml.end("Matrix")
    }

    fn write_matrix2(&self, xml: &mut XmlWriter) -> Result<()> {
        xml.start("Matrix", &[])?;
        self.effective_file_metadata()?.write_cifti_xml(xml)?;
        for (map, dims) in self.deduplicated() {
            let applies_to = dims
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(",");
            map.write_xml2(&applies_to, xml)?;
        }
        xml.end("Matrix")
    }

    /// Group dimensions holding equal mappings, in order of first appearance.
    fn deduplicated(&self) -> Vec<(&MappingType, Vec<usize>)> {
        let maps: Vec<&MappingType> = self.mapped().collect();
        let mut used = vec![false; maps.len()];
        let mut ret = Vec::new();
        for i in 0..maps.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            let mut dims = vec![i];
            for j in (i + 1)..maps.len() {
                if !used[j] && maps[i] == maps[j] {
                    used[j] = true;
                    dims.push(j);
                }
            }
            ret.push((maps[i], dims));
        }
        ret
    }
}

fn wrong_type<T>(expected: IndexType, found: &MappingType) -> Result<T> {
    Err(CiftiError::WrongMappingType(expected, found.index_type()))
}

/// Dimensions 0 and 1 are swapped in CIFTI-1.
fn swap_cifti1(dim: usize) -> usize {
    match dim {
        0 => 1,
        1 => 0,
        d => d,
    }
}

fn single_matrix(root: &XmlElement) -> Result<&XmlElement> {
    let mut matrix = None;
    for child in &root.children {
        if child.name != "Matrix" {
            return parse_err(format!("unexpected element in CIFTI: {}", child.name));
        }
        if matrix.is_some() {
            return parse_err("Matrix element may only be specified once");
        }
        matrix = Some(child);
    }
    match matrix {
        Some(m) => Ok(m),
        None => parse_err("Matrix element not found in CIFTI"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::Structure;
    use pretty_assertions::assert_eq;

    fn dense_xml() -> CiftiXml {
        let mut models = BrainModelsMap::new();
        models
            .add_surface_model(4, Structure::CortexLeft, &[0, 1, 2, 3])
            .unwrap();
        let mut xml = CiftiXml::with_dimensions(2);
        xml.set_map(ALONG_ROW, SeriesMap::new(3)).unwrap();
        xml.set_map(ALONG_COLUMN, models).unwrap();
        xml
    }

    #[test]
    fn directions() {
        assert_eq!(direction_from_string("ROW").unwrap(), ALONG_ROW);
        assert_eq!(direction_from_string("COLUMN").unwrap(), ALONG_COLUMN);
        assert_eq!(direction_from_string("3").unwrap(), 2);
        assert!(direction_from_string("0").is_err());
        assert!(direction_from_string("STACK").is_err());
    }

    #[test]
    fn versions() {
        assert_eq!("1.0".parse::<CiftiVersion>().unwrap(), CiftiVersion::V1_0);
        assert_eq!("2".parse::<CiftiVersion>().unwrap(), CiftiVersion::V2_0);
        assert_eq!(CiftiVersion::V1_1.to_string(), "1.1");
        assert!("3.0".parse::<CiftiVersion>().is_err());
    }

    #[test]
    fn version_1_1_uses_cifti2_layout() {
        let doc = r#"<CIFTI Version="1.1">
  <Matrix>
    <MatrixIndicesMap AppliesToMatrixDimension="0,1" IndicesMapToDataType="CIFTI_INDEX_TYPE_TIME_POINTS"
        TimeStepUnits="NIFTI_UNITS_SEC" TimeStep="1"/>
  </Matrix>
</CIFTI>"#;
        let err = CiftiXml::read_xml(doc).unwrap_err();
        assert!(err.to_string().contains("CIFTI_INDEX_TYPE_TIME_POINTS"));

        let text = dense_xml().write_xml(CiftiVersion::V1_1).unwrap();
        assert!(!text.contains("NumberOfMatrices"));
        assert!(text.contains("CIFTI_INDEX_TYPE_SERIES"));
    }

    #[test]
    fn typed_getters() {
        let mut xml = dense_xml();
        assert_eq!(xml.get_dimensions().unwrap(), vec![3, 4]);
        assert!(xml.get_series_map(ALONG_ROW).is_ok());
        match xml.get_parcels_map(ALONG_COLUMN) {
            Err(CiftiError::WrongMappingType(IndexType::Parcels, IndexType::BrainModels)) => {}
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
        match xml.get_map(5) {
            Err(CiftiError::NoMapping(5)) => {}
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
        xml.get_series_map_mut(ALONG_ROW).unwrap().set_length(5);
        assert_eq!(xml.get_dimension_length(ALONG_ROW).unwrap(), 5);
        assert!(xml.set_map(2, SeriesMap::new(1)).is_err());
    }

    #[test]
    fn single_labels_dimension() {
        let mut xml = CiftiXml::with_dimensions(2);
        xml.set_map(ALONG_ROW, LabelsMap::new(1)).unwrap();
        assert!(xml.set_map(ALONG_COLUMN, LabelsMap::new(1)).is_err());
        xml.set_map(ALONG_ROW, LabelsMap::new(2)).unwrap();
    }

    #[test]
    fn intent_codes() {
        let xml = dense_xml();
        assert_eq!(xml.get_intent_info(CiftiVersion::V2_0).unwrap(), (3002, "ConnDenseSeries"));
        assert_eq!(xml.get_intent_info(CiftiVersion::V1_0).unwrap(), (3002, "ConnDenseTime"));
        let mut other = CiftiXml::with_dimensions(2);
        other.set_map(ALONG_ROW, ScalarsMap::new(1)).unwrap();
        other.set_map(ALONG_COLUMN, ScalarsMap::new(1)).unwrap();
        assert_eq!(other.get_intent_info(CiftiVersion::V2_0).unwrap(), (3000, "ConnUnknown"));
        assert_eq!(other.get_intent_info(CiftiVersion::V1_0).unwrap(), (3001, "ConnDense"));
    }

    #[test]
    fn unmapped_dimension_is_not_written() {
        let xml = CiftiXml::with_dimensions(1);
        match xml.write_xml(CiftiVersion::V2_0) {
            Err(CiftiError::NoMapping(0)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn file_palette_and_flags() {
        let xml = dense_xml();
        assert!(!xml.mutables_modified());
        xml.get_file_metadata().set("Provenance", "test");
        assert!(xml.mutables_modified());
        xml.clear_mutables_modified();
        assert!(!xml.mutables_modified());
        xml.get_file_palette().palette_name = "gray".to_string();
        let text = xml.write_xml(CiftiVersion::V2_0).unwrap();
        let back = CiftiXml::read_xml(&text).unwrap();
        assert_eq!(back.get_file_palette().palette_name, "gray");
        assert_eq!(back.get_file_metadata().get("Provenance"), Some("test"));
        assert_eq!(back, xml);
        assert_eq!(back.get_parsed_version(), Some(CiftiVersion::V2_0));
    }

    #[test]
    fn malformed_documents() {
        let err = CiftiXml::read_xml("<NIFTI Version=\"2\"/>").unwrap_err();
        assert_eq!(err.to_string(), "Cifti XML error: unexpected root element in Cifti XML: NIFTI");
        assert!(CiftiXml::read_xml("<CIFTI/>").is_err());
        assert!(CiftiXml::read_xml("<CIFTI Version=\"2\"></CIFTI>").is_err());
        assert!(CiftiXml::read_xml("<CIFTI Version=\"1\"><Matrix/></CIFTI>").is_err());
        let gap = "<CIFTI Version=\"2\"><Matrix>\
            <MatrixIndicesMap AppliesToMatrixDimension=\"1\" IndicesMapToDataType=\"CIFTI_INDEX_TYPE_SCALARS\"/>\
            </Matrix></CIFTI>";
        let err = CiftiXml::read_xml(gap).unwrap_err();
        assert_eq!(err.to_string(), "Cifti XML error: missing mapping for dimension '0'");
        let repeated = "<CIFTI Version=\"2\"><Matrix>\
            <MatrixIndicesMap AppliesToMatrixDimension=\"0,0\" IndicesMapToDataType=\"CIFTI_INDEX_TYPE_SCALARS\"/>\
            </Matrix></CIFTI>";
        assert!(CiftiXml::read_xml(repeated).is_err());
    }
}
