//! `<NamedMap>` elements shared by scalar and label mappings.

use crate::error::{parse_err, Result};
use crate::label_table::LabelTable;
use crate::metadata::MetaData;
use crate::xml::element::{XmlElement, XmlWriter};

pub(crate) struct ParsedNamedMap {
    pub name: String,
    pub metadata: MetaData,
    pub label_table: Option<LabelTable>,
}

/// Read one `<NamedMap>`. A `LabelTable` child is only accepted, and is
/// then required, when `labels` is set.
pub(crate) fn read_named_map(elem: &XmlElement, labels: bool) -> Result<ParsedNamedMap> {
    let mut name = None;
    let mut metadata = None;
    let mut label_table = None;
    for child in &elem.children {
        match child.name.as_str() {
            "MapName" => {
                if name.is_some() {
                    return parse_err("MapName specified more than once in NamedMap");
                }
                child.expect_no_children()?;
                name = Some(child.text.clone());
            }
            "MetaData" => {
                if metadata.is_some() {
                    return parse_err("MetaData specified more than once in NamedMap");
                }
                metadata = Some(MetaData::read_cifti_xml(child)?);
            }
            "LabelTable" if labels => {
                if label_table.is_some() {
                    return parse_err("LabelTable specified more than once in NamedMap");
                }
                label_table = Some(LabelTable::read_cifti_xml(child)?);
            }
            other => return parse_err(format!("unexpected element in NamedMap: {}", other)),
        }
    }
    let name = match name {
        Some(n) => n,
        None => return parse_err("NamedMap missing required child element MapName"),
    };
    if labels && label_table.is_none() {
        return parse_err("NamedMap in labels mapping missing required child element LabelTable");
    }
    Ok(ParsedNamedMap {
        name,
        metadata: metadata.unwrap_or_default(),
        label_table,
    })
}

pub(crate) fn write_named_map(
    xml: &mut XmlWriter,
    name: &str,
    metadata: &MetaData,
    label_table: Option<&LabelTable>,
) -> Result<()> {
    xml.start("NamedMap", &[])?;
    metadata.write_cifti_xml(xml)?;
    if let Some(table) = label_table {
        table.write_cifti_xml(xml)?;
    }
    xml.text_element("MapName", &[], name)?;
    xml.end("NamedMap")
}

/// Resolve a 1-based map number or exact map name against a list of names.
pub(crate) fn index_from_number_or_name<'a, I>(number_or_name: &str, names: I) -> i64
where
    I: ExactSizeIterator<Item = &'a str>,
{
    let length = names.len() as i64;
    match number_or_name.parse::<i64>() {
        Ok(number) if number >= 1 && number <= length => number - 1,
        Ok(_) => -1,
        Err(_) => names
            .into_iter()
            .position(|n| n == number_or_name)
            .map_or(-1, |i| i as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_or_name() {
        let names = ["first", "2", "third"];
        let find = |s| index_from_number_or_name(s, names.iter().copied());
        assert_eq!(find("1"), 0);
        assert_eq!(find("3"), 2);
        assert_eq!(find("4"), -1);
        assert_eq!(find("0"), -1);
        assert_eq!(find("third"), 2);
        assert_eq!(find("missing"), -1);
    }

    #[test]
    fn named_map_children() {
        let doc = "<NamedMap><MapName>a</MapName><MapName>b</MapName></NamedMap>";
        assert!(read_named_map(&XmlElement::parse_document(doc).unwrap(), false).is_err());
        let doc = "<NamedMap><LabelTable/><MapName>a</MapName></NamedMap>";
        let elem = XmlElement::parse_document(doc).unwrap();
        assert!(read_named_map(&elem, false).is_err());
        let parsed = read_named_map(&elem, true).unwrap();
        assert_eq!(parsed.name, "a");
        assert_eq!(parsed.label_table.unwrap().len(), 1);
        let doc = "<NamedMap><MapName>a</MapName></NamedMap>";
        assert!(read_named_map(&XmlElement::parse_document(doc).unwrap(), true).is_err());
    }
}
