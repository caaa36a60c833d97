//! Label tables: integer keys mapped to a name and an RGBA color.

use crate::error::{parse_err, Result};
use crate::util::fmt_float;
use crate::xml::element::{XmlElement, XmlWriter};
use log::{trace, warn};
use std::collections::BTreeMap;

/// Name of the label marking unassigned brainordinates.
pub const UNASSIGNED_NAME: &str = "???";

/// A single entry of a label table.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    /// Key of the label in its table
    pub key: i32,
    /// Display name
    pub name: String,
    /// Red, in [0, 1]
    pub red: f32,
    /// Green, in [0, 1]
    pub green: f32,
    /// Blue, in [0, 1]
    pub blue: f32,
    /// Alpha, in [0, 1]
    pub alpha: f32,
}

impl Label {
    /// Create a label.
    pub fn new<S: Into<String>>(key: i32, name: S, red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Label {
            key,
            name: name.into(),
            red,
            green,
            blue,
            alpha,
        }
    }

    /// The color as an RGBA array.
    pub fn rgba(&self) -> [f32; 4] {
        [self.red, self.green, self.blue, self.alpha]
    }
}

/// Mapping of keys to labels.
///
/// A new table contains the unassigned label `???` at key 0.
#[derive(Debug, Clone)]
pub struct LabelTable {
    labels: BTreeMap<i32, Label>,
    modified: bool,
}

impl PartialEq for LabelTable {
    fn eq(&self, other: &Self) -> bool {
        self.labels == other.labels
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        let mut labels = BTreeMap::new();
        let _ = labels.insert(0, Label::new(0, UNASSIGNED_NAME, 1.0, 1.0, 1.0, 0.0));
        LabelTable {
            labels,
            modified: false,
        }
    }
}

impl LabelTable {
    /// Create a table holding only the unassigned label.
    pub fn new() -> Self {
        Self::default()
    }

    /// Label stored at a key.
    pub fn get_label(&self, key: i32) -> Option<&Label> {
        self.labels.get(&key)
    }

    /// Key of the first label with the given name.
    pub fn get_label_key_from_name(&self, name: &str) -> Option<i32> {
        self.labels.values().find(|l| l.name == name).map(|l| l.key)
    }

    /// Set name and color of the label at `key`, inserting it if needed.
    pub fn set_label<S: Into<String>>(&mut self, key: i32, name: S, red: f32, green: f32, blue: f32, alpha: f32) {
        let name = name.into();
        if key == 0 && name != UNASSIGNED_NAME {
            warn!("label 0 given the name '{}', it usually marks unassigned data", name);
        }
        let _ = self
            .labels
            .insert(key, Label::new(key, name, red, green, blue, alpha));
        self.modified = true;
    }

    /// Add a label by name. An existing label of the same name gets the new
    /// color and keeps its key; otherwise an unused key is generated.
    pub fn add_label<S: Into<String>>(&mut self, name: S, red: f32, green: f32, blue: f32, alpha: f32) -> i32 {
        let name = name.into();
        let key = match self.get_label_key_from_name(&name) {
            Some(k) => k,
            None => self.generate_unused_key(),
        };
        let _ = self
            .labels
            .insert(key, Label::new(key, name, red, green, blue, alpha));
        self.modified = true;
        key
    }

    /// Remove the label at `key`.
    pub fn remove_label(&mut self, key: i32) -> Option<Label> {
        let old = self.labels.remove(&key);
        if old.is_some() {
            self.modified = true;
        }
        old
    }

    /// Key of the `???` label, adding it if the table has none.
    pub fn get_unassigned_label_key(&mut self) -> i32 {
        match self.get_label_key_from_name(UNASSIGNED_NAME) {
            Some(k) => k,
            None => self.add_label(UNASSIGNED_NAME, 0.0, 0.0, 0.0, 0.0),
        }
    }

    /// A positive key that no label uses. Fills holes among the positive keys.
    pub fn generate_unused_key(&self) -> i32 {
        let num_keys = self.labels.len() as i32;
        let largest = match self.labels.keys().next_back() {
            Some(&k) if k > 0 => k,
            _ => return 1,
        };
        if largest < num_keys {
            return largest + 1;
        }
        let mut cur = 0;
        for &k in self.labels.keys().filter(|&&k| k > 0) {
            if k != cur + 1 {
                break;
            }
            cur = k;
        }
        cur + 1
    }

    /// All keys in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = i32> + '_ {
        self.labels.keys().copied()
    }

    /// All labels in ascending key order.
    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.labels.values()
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the table has no labels.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Whether the table changed since the flag was last cleared.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Reset the modification flag.
    pub fn clear_modified(&mut self) {
        self.modified = false;
    }

    /// Read a `<LabelTable>` element.
    ///
    /// A label named `unknown` or `Unknown` with zero alpha is read as the
    /// unassigned label.
    pub(crate) fn read_cifti_xml(elem: &XmlElement) -> Result<LabelTable> {
        let mut ret = LabelTable::new();
        let mut have_unassigned = false;
        for label in &elem.children {
            if label.name != "Label" {
                return parse_err(format!(
                    "unexpected element '{}' encountered in LabelTable",
                    label.name
                ));
            }
            let key: i32 = match label.attr("Key").map(|k| k.trim().parse()) {
                Some(Ok(k)) => k,
                _ => return parse_err("Key attribute of Label missing or noninteger"),
            };
            let mut rgba = [0.0f32, 0.0, 0.0, 1.0];
            for (c, attr) in ["Red", "Green", "Blue"].iter().enumerate() {
                rgba[c] = match label.attr(attr).map(|v| v.trim().parse()) {
                    Some(Ok(v)) => v,
                    _ => return parse_err(format!("{} attribute of Label missing or not a number", attr)),
                };
            }
            match label.attr("Alpha") {
                None | Some("") => {}
                Some(text) => {
                    rgba[3] = match text.trim().parse() {
                        Ok(v) => v,
                        Err(_) => return parse_err("Alpha attribute of Label not a number"),
                    }
                }
            }
            let mut name = label.text.clone();
            if (name == "unknown" || name == "Unknown") && rgba[3] == 0.0 {
                if have_unassigned {
                    warn!("found multiple label elements that should be interpreted as unlabeled");
                } else {
                    trace!("using '{}' label as unlabeled key", name);
                    have_unassigned = true;
                    name = UNASSIGNED_NAME.to_string();
                }
            } else if name == UNASSIGNED_NAME {
                if have_unassigned {
                    warn!("found multiple label elements that should be interpreted as unlabeled");
                }
                have_unassigned = true;
            }
            if name == UNASSIGNED_NAME && key != 0 && ret.is_default_unassigned_at_zero() {
                let _ = ret.labels.remove(&0);
            }
            let _ = ret
                .labels
                .insert(key, Label::new(key, name, rgba[0], rgba[1], rgba[2], rgba[3]));
        }
        Ok(ret)
    }

    fn is_default_unassigned_at_zero(&self) -> bool {
        self.labels.get(&0) == Some(&Label::new(0, UNASSIGNED_NAME, 1.0, 1.0, 1.0, 0.0))
    }

    /// Write a `<LabelTable>` element with labels in ascending key order.
    pub(crate) fn write_cifti_xml(&self, xml: &mut XmlWriter) -> Result<()> {
        xml.start("LabelTable", &[])?;
        for label in self.labels.values() {
            let key = label.key.to_string();
            let red = fmt_float(label.red);
            let green = fmt_float(label.green);
            let blue = fmt_float(label.blue);
            let alpha = fmt_float(label.alpha);
            xml.text_element(
                "Label",
                &[
                    ("Key", &key),
                    ("Red", &red),
                    ("Green", &green),
                    ("Blue", &blue),
                    ("Alpha", &alpha),
                ],
                &label.name,
            )?;
        }
        xml.end("LabelTable")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_table() {
        let mut table = LabelTable::new();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get_label(0).unwrap().name, "???");
        assert_eq!(table.get_unassigned_label_key(), 0);
        assert!(!table.is_modified());
    }

    #[test]
    fn add_and_keys() {
        let mut table = LabelTable::new();
        assert_eq!(table.add_label("A", 1.0, 0.0, 0.0, 1.0), 1);
        assert_eq!(table.add_label("B", 0.0, 1.0, 0.0, 1.0), 2);
        assert_eq!(table.add_label("A", 0.5, 0.5, 0.5, 1.0), 1);
        assert_eq!(table.get_label(1).unwrap().rgba(), [0.5, 0.5, 0.5, 1.0]);
        table.set_label(10, "C", 0.0, 0.0, 1.0, 1.0);
        assert_eq!(table.generate_unused_key(), 3);
        let _ = table.remove_label(2);
        assert_eq!(table.generate_unused_key(), 2);
        assert_eq!(table.keys().collect::<Vec<_>>(), vec![0, 1, 10]);
        assert!(table.is_modified());
        assert_eq!(table.get_label_key_from_name("C"), Some(10));
    }

    #[test]
    fn unassigned_added_when_missing() {
        let mut table = LabelTable::new();
        let _ = table.remove_label(0);
        table.set_label(1, "A", 1.0, 0.0, 0.0, 1.0);
        let key = table.get_unassigned_label_key();
        assert_eq!(key, 2);
        assert_eq!(table.get_label(2).unwrap().name, "???");
    }

    #[test]
    fn xml_round_trip() {
        let mut table = LabelTable::new();
        table.set_label(5, "A & B", 1.0, 0.25, 0.0, 1.0);
        table.set_label(7, "B", 0.0, 0.0, 1.0, 0.5);
        let mut w = XmlWriter::new();
        table.write_cifti_xml(&mut w).unwrap();
        let text = w.into_string().unwrap();
        assert!(text.contains(
            r#"<Label Key="5" Red="1.0000000" Green="0.2500000" Blue="0.0000000" Alpha="1.0000000">"#
        ));
        let elem = XmlElement::parse_document(&text).unwrap();
        assert_eq!(LabelTable::read_cifti_xml(&elem).unwrap(), table);
    }

    #[test]
    fn xml_unknown_is_unassigned() {
        let doc = r#"<LabelTable>
  <Label Key="3" Red="0" Green="0" Blue="0" Alpha="0">Unknown</Label>
  <Label Key="4" Red="1" Green="0" Blue="0">Region</Label>
</LabelTable>"#;
        let mut table = LabelTable::read_cifti_xml(&XmlElement::parse_document(doc).unwrap()).unwrap();
        assert_eq!(table.get_label(0), None);
        assert_eq!(table.get_unassigned_label_key(), 3);
        assert_eq!(table.get_label(4).unwrap().alpha, 1.0);

        let bad = r#"<LabelTable><Label Key="x" Red="0" Green="0" Blue="0">A</Label></LabelTable>"#;
        assert!(LabelTable::read_cifti_xml(&XmlElement::parse_document(bad).unwrap()).is_err());
    }
}
