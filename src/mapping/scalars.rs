//! Named scalar maps, each with its own metadata and palette.

use super::named::{index_from_number_or_name, read_named_map, write_named_map};
use crate::error::{invalid, parse_err, Result};
use crate::metadata::MetaData;
use crate::palette::{PaletteColorMapping, PALETTE_METADATA_KEY};
use crate::xml::element::{XmlElement, XmlWriter};
use log::warn;
use std::cell::{RefCell, RefMut};

#[derive(Debug)]
struct ScalarMap {
    name: String,
    metadata: RefCell<MetaData>,
    palette: RefCell<Option<PaletteColorMapping>>,
}

impl ScalarMap {
    fn new(name: String, metadata: MetaData) -> Self {
        ScalarMap {
            name,
            metadata: RefCell::new(metadata),
            palette: RefCell::new(None),
        }
    }

    /// Metadata with a decoded palette written back under its key.
    fn effective_metadata(&self) -> MetaData {
        let mut metadata = self.metadata.borrow().clone();
        if let Some(palette) = self.palette.borrow().as_ref() {
            match palette.encode_in_xml() {
                Ok(text) => metadata.set(PALETTE_METADATA_KEY, text),
                Err(e) => warn!("failed to encode palette of map '{}': {}", self.name, e),
            }
        }
        metadata
    }

    fn decode_palette(&self) -> PaletteColorMapping {
        match self.metadata.borrow().get(PALETTE_METADATA_KEY) {
            Some(text) => PaletteColorMapping::decode_from_string_xml(text).unwrap_or_else(|e| {
                warn!("failed to parse palette settings of map '{}': {}", self.name, e);
                PaletteColorMapping::default()
            }),
            None => PaletteColorMapping::default(),
        }
    }

    fn palette(&self) -> RefMut<'_, PaletteColorMapping> {
        let mut cache = self.palette.borrow_mut();
        if cache.is_none() {
            *cache = Some(self.decode_palette());
        }
        RefMut::map(cache, |p| p.get_or_insert_with(PaletteColorMapping::default))
    }

    /// Decoded palette without filling the cache.
    fn current_palette(&self) -> PaletteColorMapping {
        match self.palette.borrow().as_ref() {
            Some(p) => p.clone(),
            None => self.decode_palette(),
        }
    }
}

impl Clone for ScalarMap {
    /// The palette cache is folded into the copied metadata and dropped.
    fn clone(&self) -> Self {
        ScalarMap::new(self.name.clone(), self.effective_metadata())
    }
}

impl PartialEq for ScalarMap {
    fn eq(&self, other: &Self) -> bool {
        if self.name != other.name {
            return false;
        }
        let mut mine = self.metadata.borrow().clone();
        let mut theirs = other.metadata.borrow().clone();
        let _ = mine.remove(PALETTE_METADATA_KEY);
        let _ = theirs.remove(PALETTE_METADATA_KEY);
        if mine != theirs {
            return false;
        }
        self.current_palette() == other.current_palette()
    }
}

/// Mapping of indices to named scalar maps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScalarsMap {
    maps: Vec<ScalarMap>,
}

impl ScalarsMap {
    /// Create a mapping with `length` unnamed maps.
    pub fn new(length: i64) -> Self {
        let mut ret = ScalarsMap::default();
        ret.set_length(length);
        ret
    }

    /// Number of maps.
    pub fn get_length(&self) -> i64 {
        self.maps.len() as i64
    }

    /// Grow or shrink to `length` maps. New maps are unnamed.
    pub fn set_length(&mut self, length: i64) {
        let length = length.max(0) as usize;
        self.maps.truncate(length);
        while self.maps.len() < length {
            self.maps.push(ScalarMap::new(String::new(), MetaData::new()));
        }
    }

    fn map(&self, index: i64) -> Result<&ScalarMap> {
        if index < 0 || index >= self.get_length() {
            return invalid(format!("map index {} is out of range", index));
        }
        Ok(&self.maps[index as usize])
    }

    /// Name of a map.
    pub fn get_map_name(&self, index: i64) -> Result<&str> {
        self.map(index).map(|m| m.name.as_str())
    }

    /// Rename a map.
    pub fn set_map_name<S: Into<String>>(&mut self, index: i64, name: S) -> Result<()> {
        self.map(index)?;
        self.maps[index as usize].name = name.into();
        Ok(())
    }

    /// Editable metadata of a map.
    pub fn get_map_metadata(&self, index: i64) -> Result<RefMut<'_, MetaData>> {
        Ok(self.map(index)?.metadata.borrow_mut())
    }

    /// Editable palette of a map, decoded from its metadata on first use.
    pub fn get_map_palette(&self, index: i64) -> Result<RefMut<'_, PaletteColorMapping>> {
        Ok(self.map(index)?.palette())
    }

    /// Resolve a 1-based map number or an exact map name, -1 if neither matches.
    pub fn get_index_from_number_or_name(&self, number_or_name: &str) -> i64 {
        index_from_number_or_name(number_or_name, self.maps.iter().map(|m| m.name.as_str()))
    }

    pub(crate) fn mutables_modified(&self) -> bool {
        self.maps.iter().any(|m| {
            m.metadata.borrow().is_modified()
                || m.palette.borrow().as_ref().map_or(false, |p| p.is_modified())
        })
    }

    pub(crate) fn clear_mutables_modified(&self) {
        for m in &self.maps {
            m.metadata.borrow_mut().clear_modified();
            if let Some(p) = m.palette.borrow_mut().as_mut() {
                p.clear_modified();
            }
        }
    }

    pub(crate) fn read_xml(elem: &XmlElement) -> Result<ScalarsMap> {
        let mut ret = ScalarsMap::default();
        for child in &elem.children {
            if child.name != "NamedMap" {
                return parse_err(format!("unexpected element in scalars map: {}", child.name));
            }
            let parsed = read_named_map(child, false)?;
            ret.maps.push(ScalarMap::new(parsed.name, parsed.metadata));
        }
        Ok(ret)
    }

    pub(crate) fn write_xml(&self, xml: &mut XmlWriter) -> Result<()> {
        for m in &self.maps {
            write_named_map(xml, &m.name, &m.effective_metadata(), None)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn round_trip(map: &ScalarsMap) -> ScalarsMap {
        let mut w = XmlWriter::new();
        w.start("MatrixIndicesMap", &[]).unwrap();
        map.write_xml(&mut w).unwrap();
        w.end("MatrixIndicesMap").unwrap();
        let elem = XmlElement::parse_document(&w.into_string().unwrap()).unwrap();
        ScalarsMap::read_xml(&elem).unwrap()
    }

    #[test]
    fn names_and_length() {
        let mut map = ScalarsMap::new(2);
        map.set_map_name(0, "thickness").unwrap();
        map.set_map_name(1, "curvature").unwrap();
        assert!(map.set_map_name(2, "x").is_err());
        assert_eq!(map.get_map_name(1).unwrap(), "curvature");
        assert_eq!(map.get_index_from_number_or_name("curvature"), 1);
        assert_eq!(map.get_index_from_number_or_name("1"), 0);
        map.set_length(3);
        assert_eq!(map.get_map_name(2).unwrap(), "");
        map.set_length(1);
        assert_eq!(map.get_length(), 1);
    }

    #[test]
    fn metadata_and_palette_through_shared_ref() {
        let mut map = ScalarsMap::new(1);
        map.set_map_name(0, "a").unwrap();
        let shared = &map;
        assert!(!shared.mutables_modified());
        shared.get_map_metadata(0).unwrap().set("Description", "x");
        assert!(shared.mutables_modified());
        shared.clear_mutables_modified();
        {
            let mut palette = shared.get_map_palette(0).unwrap();
            palette.palette_name = "gray".to_string();
            palette.set_modified();
        }
        assert!(shared.mutables_modified());

        let back = round_trip(&map);
        assert_eq!(back, map);
        assert_eq!(back.get_map_palette(0).unwrap().palette_name, "gray");
        assert_eq!(back.get_map_metadata(0).unwrap().get("Description"), Some("x"));
        assert!(!back.mutables_modified());

        let copy = map.clone();
        assert!(copy.get_map_metadata(0).unwrap().exists(PALETTE_METADATA_KEY));
        assert_eq!(copy, map);
    }

    #[test]
    fn bad_palette_falls_back_to_default() {
        let map = ScalarsMap::new(1);
        map.get_map_metadata(0)
            .unwrap()
            .set(PALETTE_METADATA_KEY, "<NotAPalette/>");
        assert_eq!(*map.get_map_palette(0).unwrap(), PaletteColorMapping::default());
    }
}
