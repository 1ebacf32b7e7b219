//! XML codec for sitemap documents.
//!
//! Decoding keeps the whole tree: the expected `urlset`/`url` skeleton is
//! lifted into the document model, anything else is preserved so a
//! non-sitemap body serializes back unchanged. Encoding pretty-prints with
//! two-space indentation and re-emits the source XML declaration.

use crate::document::{DocumentBody, SitemapDocument, XmlElement, XmlNode};
use quick_xml::escape::{unescape, EscapeError};
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// Nesting depth limit for decoded documents.
const MAX_DEPTH: usize = 64;

/// Errors produced while decoding or encoding sitemap XML.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("XML parse error: {0}")]
    Parse(#[from] quick_xml::Error),

    #[error("Invalid XML attribute: {0}")]
    Attribute(#[from] AttrError),

    #[error("Invalid escape sequence: {0}")]
    Escape(#[from] EscapeError),

    #[error("Document nesting exceeds the depth limit")]
    TooDeep,

    #[error("Document ended before all elements were closed")]
    Truncated,

    #[error("XML write error: {0}")]
    Write(#[from] std::io::Error),

    #[error("Encoded document is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Decode sitemap XML text into a document.
///
/// The first root element is kept; comments, processing instructions and
/// doctype declarations are dropped. Text content is trimmed the way
/// sitemap producers expect.
pub fn decode(xml: &str) -> Result<SitemapDocument, CodecError> {
    let mut reader = Reader::from_str(xml);
    let config = reader.config_mut();
    config.trim_text_start = true;
    config.trim_text_end = true;

    let mut decl: Option<BytesDecl<'static>> = None;
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event()? {
            Event::Decl(event) => decl = Some(event.into_owned()),
            Event::Start(start) => {
                let element = read_element(&mut reader, element_open(&start)?, 0)?;
                root.get_or_insert(element);
            }
            Event::Empty(start) => {
                root.get_or_insert(element_open(&start)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(SitemapDocument::new(decl, root))
}

/// Build an element from a start tag, attributes included.
fn element_open(start: &BytesStart) -> Result<XmlElement, CodecError> {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()));
    for attribute in start.attributes() {
        let attribute = attribute?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attribute.value).into_owned();
        let value = unescape(&raw)?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

/// Read children until the element's end tag.
fn read_element(
    reader: &mut Reader<&[u8]>,
    mut element: XmlElement,
    depth: usize,
) -> Result<XmlElement, CodecError> {
    if depth >= MAX_DEPTH {
        return Err(CodecError::TooDeep);
    }

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let child = read_element(reader, element_open(&start)?, depth + 1)?;
                element.children.push(XmlNode::Element(child));
            }
            Event::Empty(start) => {
                element.children.push(XmlNode::Element(element_open(&start)?));
            }
            Event::Text(text) => {
                let raw = String::from_utf8_lossy(&text).into_owned();
                push_text(&mut element, unescape(&raw)?.into_owned());
            }
            Event::CData(data) => {
                push_text(&mut element, String::from_utf8_lossy(&data).into_owned());
            }
            Event::End(_) => return Ok(element),
            Event::Eof => return Err(CodecError::Truncated),
            _ => {}
        }
    }
}

/// Append text to an element, merging with a preceding text node so mixed
/// text and CDATA content decodes to a single node.
fn push_text(element: &mut XmlElement, text: String) {
    if text.is_empty() {
        return;
    }
    if let Some(XmlNode::Text(existing)) = element.children.last_mut() {
        existing.push_str(&text);
    } else {
        element.children.push(XmlNode::Text(text));
    }
}

/// Encode a document back to pretty-printed XML text.
///
/// URL entries and fields that decoded to nothing are suppressed; the root
/// element is always emitted, even when every entry was removed.
pub fn encode(doc: &SitemapDocument) -> Result<String, CodecError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    if let Some(decl) = &doc.decl {
        writer.write_event(Event::Decl(decl.clone()))?;
    }

    match &doc.body {
        DocumentBody::Urlset(urlset) => {
            let mut start = BytesStart::new("urlset");
            for (key, value) in &urlset.attributes {
                start.push_attribute((key.as_str(), value.as_str()));
            }
            writer.write_event(Event::Start(start))?;

            for entry in &urlset.urls {
                if entry.is_empty() {
                    continue;
                }
                let mut start = BytesStart::new("url");
                for (key, value) in &entry.attributes {
                    start.push_attribute((key.as_str(), value.as_str()));
                }
                if entry.fields.iter().all(XmlElement::is_empty) {
                    writer.write_event(Event::Empty(start))?;
                    continue;
                }
                writer.write_event(Event::Start(start))?;
                for field in &entry.fields {
                    write_element(&mut writer, field, true)?;
                }
                writer.write_event(Event::End(BytesEnd::new("url")))?;
            }
            for extra in &urlset.extras {
                write_element(&mut writer, extra, true)?;
            }

            writer.write_event(Event::End(BytesEnd::new("urlset")))?;
        }
        DocumentBody::Foreign(Some(root)) => write_element(&mut writer, root, false)?,
        DocumentBody::Foreign(None) => {}
    }

    Ok(String::from_utf8(writer.into_inner())?)
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    element: &XmlElement,
    suppress_empty: bool,
) -> Result<(), CodecError> {
    if suppress_empty && element.is_empty() {
        return Ok(());
    }

    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for node in &element.children {
        match node {
            XmlNode::Element(child) => write_element(writer, child, suppress_empty)?,
            XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text.as_str())))?,
        }
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}
