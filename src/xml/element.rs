//! Owned XML element tree built from `quick-xml` events, and a thin writer
//! on top of `quick_xml::Writer`.

use crate::error::{parse_err, CiftiError, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::str;

/// An element of a parsed XML document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    /// Tag name
    pub name: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Child elements in document order
    pub children: Vec<XmlElement>,
    /// Concatenated character data directly inside this element
    pub text: String,
}

impl XmlElement {
    /// Parse a full document and return its root element.
    pub fn parse_document(text: &str) -> Result<XmlElement> {
        let mut reader = Reader::from_str(text);
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;
        loop {
            match reader.read_event()? {
                Event::Start(e) => stack.push(XmlElement::from_start(&e)?),
                Event::Empty(e) => {
                    let elem = XmlElement::from_start(&e)?;
                    attach(&mut stack, &mut root, elem)?;
                }
                Event::End(_) => {
                    // end names are checked by the reader
                    if let Some(elem) = stack.pop() {
                        attach(&mut stack, &mut root, elem)?;
                    }
                }
                Event::Text(t) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(&t.unescape()?);
                    }
                }
                Event::CData(c) => {
                    if let Some(top) = stack.last_mut() {
                        top.text.push_str(str::from_utf8(&c)?);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        if !stack.is_empty() {
            return parse_err(format!("unclosed element: {}", stack[stack.len() - 1].name));
        }
        match root {
            Some(r) => Ok(r),
            None => parse_err("document has no root element"),
        }
    }

    fn from_start(e: &BytesStart) -> Result<XmlElement> {
        let name = str::from_utf8(e.name().as_ref())?.to_string();
        let mut attributes = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = str::from_utf8(attr.key.as_ref())?.to_string();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(XmlElement {
            name,
            attributes,
            children: Vec::new(),
            text: String::new(),
        })
    }

    /// Create an element with no attributes or content.
    pub fn new<S: Into<String>>(name: S) -> Self {
        XmlElement {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Look up an attribute by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Look up an attribute which must be present.
    pub fn required_attr(&self, name: &str) -> Result<&str> {
        match self.attr(name) {
            Some(v) => Ok(v),
            None => parse_err(format!("missing attribute {} in {}", name, self.name)),
        }
    }

    /// Fail if this element contains child elements.
    pub fn expect_no_children(&self) -> Result<()> {
        match self.children.first() {
            Some(c) => parse_err(format!("unexpected element in {}: {}", self.name, c.name)),
            None => Ok(()),
        }
    }
}

fn attach(
    stack: &mut Vec<XmlElement>,
    root: &mut Option<XmlElement>,
    elem: XmlElement,
) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(elem);
        Ok(())
    } else if root.is_none() {
        *root = Some(elem);
        Ok(())
    } else {
        parse_err(format!("unexpected second root element: {}", elem.name))
    }
}

/// Indenting XML writer producing a UTF-8 string.
pub struct XmlWriter {
    inner: Writer<Vec<u8>>,
}

impl std::fmt::Debug for XmlWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("XmlWriter").finish()
    }
}

impl Default for XmlWriter {
    fn default() -> Self {
        XmlWriter::new()
    }
}

impl XmlWriter {
    /// Create a writer with two space indentation.
    pub fn new() -> Self {
        XmlWriter {
            inner: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    /// Write the `<?xml ...?>` declaration.
    pub fn declaration(&mut self) -> Result<()> {
        self.inner
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(())
    }

    /// Open an element with the given attributes.
    pub fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let mut elem = BytesStart::new(name);
        for attr in attributes {
            elem.push_attribute(*attr);
        }
        self.inner.write_event(Event::Start(elem))?;
        Ok(())
    }

    /// Close the element with the given name.
    pub fn end(&mut self, name: &str) -> Result<()> {
        self.inner.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    /// Write escaped character data.
    pub fn text(&mut self, text: &str) -> Result<()> {
        self.inner.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }

    /// Write an element that contains only character data.
    pub fn text_element(&mut self, name: &str, attributes: &[(&str, &str)], text: &str) -> Result<()> {
        if text.is_empty() {
            return self.empty(name, attributes);
        }
        self.start(name, attributes)?;
        self.text(text)?;
        self.end(name)
    }

    /// Write a self-closing element.
    pub fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let mut elem = BytesStart::new(name);
        for attr in attributes {
            elem.push_attribute(*attr);
        }
        self.inner.write_event(Event::Empty(elem))?;
        Ok(())
    }

    /// Finish writing and return the document text.
    pub fn into_string(self) -> Result<String> {
        String::from_utf8(self.inner.into_inner()).map_err(|e| CiftiError::Utf8(e.utf8_error()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_tree() {
        let doc = r#"<?xml version="1.0"?>
<A x="1" y="a &amp; b">
  <B>hello &lt;world&gt;</B>
  <C/>
  <B><![CDATA[raw <text>]]></B>
</A>"#;
        let root = XmlElement::parse_document(doc).unwrap();
        assert_eq!(root.name, "A");
        assert_eq!(root.attr("x"), Some("1"));
        assert_eq!(root.attr("y"), Some("a & b"));
        assert_eq!(root.attr("z"), None);
        assert_eq!(root.children.len(), 3);
        assert_eq!(root.children[0].text, "hello <world>");
        assert_eq!(root.children[1].name, "C");
        assert_eq!(root.children[2].text, "raw <text>");
        assert!(root.required_attr("z").is_err());
        assert!(root.children[1].expect_no_children().is_ok());
        assert!(root.expect_no_children().is_err());
    }

    #[test]
    fn parse_errors() {
        assert!(XmlElement::parse_document("").is_err());
        assert!(XmlElement::parse_document("<A><B></A>").is_err());
        assert!(XmlElement::parse_document("<A/><B/>").is_err());
    }

    #[test]
    fn write_then_parse() {
        let mut w = XmlWriter::new();
        w.declaration().unwrap();
        w.start("Root", &[("Version", "2")]).unwrap();
        w.text_element("Name", &[], "a < b").unwrap();
        w.text_element("Empty", &[("k", "v")], "").unwrap();
        w.end("Root").unwrap();
        let text = w.into_string().unwrap();
        let root = XmlElement::parse_document(&text).unwrap();
        assert_eq!(root.attr("Version"), Some("2"));
        assert_eq!(root.children[0].text, "a < b");
        assert_eq!(root.children[1].attr("k"), Some("v"));
        assert_eq!(root.children[1].text, "");
    }
}
