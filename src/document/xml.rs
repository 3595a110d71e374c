//! Minimal XML element tree on top of quick-xml.
//!
//! Documents are small, so they are read fully into an [`XmlElement`] tree,
//! repaired in place and written back. Element order and unknown elements
//! are preserved. Mixed content is not: the text pieces of an element are
//! concatenated into [`XmlElement::text`].

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::error::DocumentError;

/// An XML element with its attributes, text and child elements.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder: add an attribute.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder: set the text content.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Builder: append a child element.
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// All children with the given name.
    pub fn children_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn children_named_mut<'a>(
        &'a mut self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a mut XmlElement> + 'a {
        self.children.iter_mut().filter(move |c| c.name == name)
    }

    /// Remove every child with the given name, returning how many went.
    pub fn remove_children(&mut self, name: &str) -> usize {
        let before = self.children.len();
        self.children.retain(|c| c.name != name);
        before - self.children.len()
    }

    // ========================================================================
    // Reading
    // ========================================================================

    /// Parse a document and return its root element.
    pub fn parse(xml: &str) -> Result<XmlElement, DocumentError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    stack.push(element_from_start(&e)?);
                }
                Event::Empty(e) => {
                    let element = element_from_start(&e)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| DocumentError::malformed("unexpected closing tag"))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(t) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&t.unescape()?);
                    }
                }
                Event::CData(c) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                    }
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions, doctype
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(DocumentError::malformed("unclosed element at end of input"));
        }
        root.ok_or_else(|| DocumentError::malformed("no root element"))
    }

    // ========================================================================
    // Writing
    // ========================================================================

    /// Serialize this element as a complete document with an XML declaration.
    pub fn to_xml_string(&self) -> Result<String, DocumentError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| DocumentError::Xml(e.into()))?;
        self.write_into(&mut writer)?;

        let bytes = writer.into_inner();
        String::from_utf8(bytes).map_err(|e| DocumentError::malformed(e.to_string()))
    }

    fn write_into(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), DocumentError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() && self.text.is_empty() {
            writer
                .write_event(Event::Empty(start))
                .map_err(|e| DocumentError::Xml(e.into()))?;
            return Ok(());
        }

        writer
            .write_event(Event::Start(start))
            .map_err(|e| DocumentError::Xml(e.into()))?;
        if !self.text.is_empty() {
            writer
                .write_event(Event::Text(BytesText::new(&self.text)))
                .map_err(|e| DocumentError::Xml(e.into()))?;
        }
        for child in &self.children {
            child.write_into(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(|e| DocumentError::Xml(e.into()))?;
        Ok(())
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement, DocumentError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = XmlElement::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), DocumentError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(DocumentError::malformed("more than one root element")),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_document() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<xia>
  <title>Harbour &amp; boats</title>
  <details show="true">
    <detail tag="100" path="1;2 3;4 5;6">Red &lt;sail&gt;</detail>
    <detail tag="101"/>
  </details>
</xia>"#;
        let root = XmlElement::parse(xml).unwrap();
        assert_eq!(root.name, "xia");
        assert_eq!(root.child("title").unwrap().text, "Harbour & boats");

        let details = root.child("details").unwrap();
        assert_eq!(details.attr("show"), Some("true"));
        let tags: Vec<_> = details
            .children_named("detail")
            .filter_map(|d| d.attr("tag"))
            .collect();
        assert_eq!(tags, vec!["100", "101"]);
        assert_eq!(details.children[0].text, "Red <sail>");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(XmlElement::parse("").is_err());
        assert!(XmlElement::parse("<xia><title></xia>").is_err());
        assert!(XmlElement::parse("<a/><b/>").is_err());
    }

    #[test]
    fn test_write_then_parse_preserves_tree() {
        let tree = XmlElement::new("xia")
            .with_child(XmlElement::new("title").with_text("Quotes \" and <brackets>"))
            .with_child(
                XmlElement::new("image")
                    .with_attr("title", "a & b")
                    .with_attr("desctription", ""),
            )
            .with_child(
                XmlElement::new("details")
                    .with_attr("show", "false")
                    .with_child(
                        XmlElement::new("detail")
                            .with_attr("tag", "100")
                            .with_text("desc"),
                    ),
            );

        let xml = tree.to_xml_string().unwrap();
        assert!(xml.starts_with("<?xml"));
        assert_eq!(XmlElement::parse(&xml).unwrap(), tree);
    }

    #[test]
    fn test_attribute_helpers() {
        let mut el = XmlElement::new("detail").with_attr("locked", "true");
        el.set_attr("locked", "false");
        el.set_attr("zoom", "true");
        assert_eq!(el.attributes.len(), 2);
        assert_eq!(el.attr("locked"), Some("false"));

        let mut parent = XmlElement::new("xia")
            .with_child(XmlElement::new("author"))
            .with_child(XmlElement::new("author"))
            .with_child(XmlElement::new("title"));
        assert_eq!(parent.remove_children("author"), 2);
        assert_eq!(parent.children.len(), 1);
    }
}
