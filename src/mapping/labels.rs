//! Named label maps, each with a label table and metadata.

use super::named::{index_from_number_or_name, read_named_map, write_named_map};
use crate::error::{invalid, parse_err, Result};
use crate::label_table::LabelTable;
use crate::metadata::MetaData;
use crate::xml::element::{XmlElement, XmlWriter};
use std::cell::{RefCell, RefMut};

#[derive(Debug, Clone, PartialEq)]
struct LabelMap {
    name: String,
    metadata: RefCell<MetaData>,
    label_table: RefCell<LabelTable>,
}

impl LabelMap {
    fn new(name: String, metadata: MetaData, label_table: LabelTable) -> Self {
        LabelMap {
            name,
            metadata: RefCell::new(metadata),
            label_table: RefCell::new(label_table),
        }
    }
}

/// Mapping of indices to named label maps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LabelsMap {
    maps: Vec<LabelMap>,
}

impl LabelsMap {
    /// Create a mapping with `length` unnamed maps, each holding a default
    /// label table.
    pub fn new(length: i64) -> Self {
        let mut ret = LabelsMap::default();
        ret.set_length(length);
        ret
    }

    /// Number of maps.
    pub fn get_length(&self) -> i64 {
        self.maps.len() as i64
    }

    /// Grow or shrink to `length` maps.
    pub fn set_length(&mut self, length: i64) {
        let length = length.max(0) as usize;
        self.maps.truncate(length);
        while self.maps.len() < length {
            self.maps
                .push(LabelMap::new(String::new(), MetaData::new(), LabelTable::new()));
        }
    }

    fn map(&self, index: i64) -> Result<&LabelMap> {
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

    /// Editable label table of a map.
    pub fn get_map_label_table(&self, index: i64) -> Result<RefMut<'_, LabelTable>> {
        Ok(self.map(index)?.label_table.borrow_mut())
    }

    /// Resolve a 1-based map number or an exact map name, -1 if neither matches.
    pub fn get_index_from_number_or_name(&self, number_or_name: &str) -> i64 {
        index_from_number_or_name(number_or_name, self.maps.iter().map(|m| m.name.as_str()))
    }

    pub(crate) fn mutables_modified(&self) -> bool {
        self.maps
            .iter()
            .any(|m| m.metadata.borrow().is_modified() || m.label_table.borrow().is_modified())
    }

    pub(crate) fn clear_mutables_modified(&self) {
        for m in &self.maps {
            m.metadata.borrow_mut().clear_modified();
            m.label_table.borrow_mut().clear_modified();
        }
    }

    pub(crate) fn read_xml(elem: &XmlElement) -> Result<LabelsMap> {
        let mut ret = LabelsMap::default();
        for child in &elem.children {
            if child.name != "NamedMap" {
                return parse_err(format!("unexpected element in labels map: {}", child.name));
            }
            let parsed = read_named_map(child, true)?;
            let table = parsed.label_table.unwrap_or_default();
            ret.maps.push(LabelMap::new(parsed.name, parsed.metadata, table));
        }
        Ok(ret)
    }

    pub(crate) fn write_xml(&self, xml: &mut XmlWriter) -> Result<()> {
        for m in &self.maps {
            let table = m.label_table.borrow();
            write_named_map(xml, &m.name, &m.metadata.borrow(), Some(&table))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn label_tables_round_trip() {
        let mut map = LabelsMap::new(2);
        map.set_map_name(0, "parcellation").unwrap();
        map.set_map_name(1, "other").unwrap();
        let key = map
            .get_map_label_table(0)
            .unwrap()
            .add_label("V1", 1.0, 0.0, 0.0, 1.0);
        assert!(map.mutables_modified());
        map.clear_mutables_modified();
        assert!(!map.mutables_modified());

        let mut w = XmlWriter::new();
        w.start("MatrixIndicesMap", &[]).unwrap();
        map.write_xml(&mut w).unwrap();
        w.end("MatrixIndicesMap").unwrap();
        let elem = XmlElement::parse_document(&w.into_string().unwrap()).unwrap();
        let back = LabelsMap::read_xml(&elem).unwrap();
        assert_eq!(back, map);
        let table = back.get_map_label_table(0).unwrap();
        assert_eq!(table.get_label(key).unwrap().name, "V1");
        assert_eq!(back.get_index_from_number_or_name("other"), 1);
        assert!(back.get_map_label_table(2).is_err());
    }

    #[test]
    fn named_map_without_table_is_rejected() {
        let doc = "<MatrixIndicesMap><NamedMap><MapName>a</MapName></NamedMap></MatrixIndicesMap>";
        let elem = XmlElement::parse_document(doc).unwrap();
        assert!(LabelsMap::read_xml(&elem).is_err());
    }
}
