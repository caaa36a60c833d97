//! String key/value metadata attached to files and named maps.

use crate::error::{parse_err, Result};
use crate::xml::element::{XmlElement, XmlWriter};
use std::collections::BTreeMap;

/// Ordered string metadata with a modification flag.
///
/// Equality only considers the stored entries.
#[derive(Debug, Clone, Default)]
pub struct MetaData {
    entries: BTreeMap<String, String>,
    modified: bool,
}

impl PartialEq for MetaData {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl MetaData {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for a key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|s| s.as_str())
    }

    /// Whether the key is present.
    pub fn exists(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Set a value, marking the metadata modified when it changes.
    pub fn set<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        let key = key.into();
        let value = value.into();
        if self.entries.get(&key) != Some(&value) {
            let _ = self.entries.insert(key, value);
            self.modified = true;
        }
    }

    /// Remove a key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let old = self.entries.remove(key);
        if old.is_some() {
            self.modified = true;
        }
        old
    }

    /// All keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.entries.clear();
            self.modified = true;
        }
    }

    /// Whether the metadata changed since the flag was last cleared.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Reset the modification flag.
    pub fn clear_modified(&mut self) {
        self.modified = false;
    }

    /// Read a `<MetaData>` element, which is identical in both CIFTI versions.
    pub(crate) fn read_cifti_xml(elem: &XmlElement) -> Result<MetaData> {
        let mut ret = MetaData::new();
        for md in &elem.children {
            if md.name != "MD" {
                return parse_err(format!("unexpected tag name in MetaData: {}", md.name));
            }
            let mut key = None;
            let mut value = None;
            for child in &md.children {
                match child.name.as_str() {
                    "Name" => {
                        if key.is_some() {
                            return parse_err("MD element has multiple Name elements");
                        }
                        key = Some(child.text.clone());
                    }
                    "Value" => {
                        if value.is_some() {
                            return parse_err("MD element has multiple Value elements");
                        }
                        value = Some(child.text.clone());
                    }
                    other => return parse_err(format!("unexpected tag name in MD: {}", other)),
                }
            }
            match (key, value) {
                (Some(k), Some(v)) => {
                    if ret.entries.contains_key(&k) {
                        return parse_err(format!("key '{}' used more than once in MetaData", k));
                    }
                    let _ = ret.entries.insert(k, v);
                }
                (Some(_), None) => return parse_err("MD element has no Value element"),
                (None, Some(_)) => return parse_err("MD element has no Name element"),
                (None, None) => return parse_err("MD element has no Name or Value element"),
            }
        }
        Ok(ret)
    }

    /// Write a `<MetaData>` element. Nothing is written when empty.
    pub(crate) fn write_cifti_xml(&self, xml: &mut XmlWriter) -> Result<()> {
        if self.entries.is_empty() {
            return Ok(());
        }
        xml.start("MetaData", &[])?;
        for (k, v) in &self.entries {
            xml.start("MD", &[])?;
            xml.text_element("Name", &[], k)?;
            xml.text_element("Value", &[], v)?;
            xml.end("MD")?;
        }
        xml.end("MetaData")
    }
}
