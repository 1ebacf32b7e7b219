//! In-memory sitemap document model.
//!
//! The model keeps everything the codec decoded, in source order, so that
//! fields the pipeline never touches serialize back unchanged.

use quick_xml::events::BytesDecl;

/// A node in the decoded element tree.
#[derive(Debug, Clone)]
pub enum XmlNode {
    /// Nested element
    Element(XmlElement),
    /// Text content, already unescaped
    Text(String),
}

/// A generic XML element with its attributes and children in source order.
#[derive(Debug, Clone)]
pub struct XmlElement {
    /// Element name as it appeared in the source
    pub name: String,
    /// Attributes in source order
    pub attributes: Vec<(String, String)>,
    /// Child nodes in source order
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Create an element with no attributes or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create an element holding a single text child.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut element = Self::new(name);
        element.children.push(XmlNode::Text(text.into()));
        element
    }

    /// Direct text content of the element, if any.
    pub fn text(&self) -> Option<&str> {
        self.children.iter().find_map(|node| match node {
            XmlNode::Text(text) => Some(text.as_str()),
            XmlNode::Element(_) => None,
        })
    }

    /// Whether the element carries no attributes and no non-empty content.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
            && self.children.iter().all(|node| match node {
                XmlNode::Text(text) => text.is_empty(),
                XmlNode::Element(child) => child.is_empty(),
            })
    }
}

/// One `url` entry of a sitemap.
///
/// The pipeline only ever examines the `loc` field; everything else rides
/// along untouched.
#[derive(Debug, Clone)]
pub struct UrlEntry {
    /// Attributes on the `url` element itself, in source order
    pub attributes: Vec<(String, String)>,
    /// Child elements of the entry in source order
    pub fields: Vec<XmlElement>,
}

impl UrlEntry {
    /// Create an entry holding only a `loc` field.
    pub fn with_loc(loc: impl Into<String>) -> Self {
        Self {
            attributes: Vec::new(),
            fields: vec![XmlElement::with_text("loc", loc)],
        }
    }

    /// The entry location, if present and non-empty.
    pub fn loc(&self) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name == "loc")
            .and_then(XmlElement::text)
            .filter(|text| !text.is_empty())
    }

    /// Replace the entry location, leaving every other field untouched.
    /// Entries without a `loc` field are left as they are.
    pub fn set_loc(&mut self, loc: impl Into<String>) {
        if let Some(field) = self.fields.iter_mut().find(|field| field.name == "loc") {
            field.children = vec![XmlNode::Text(loc.into())];
        }
    }

    /// Whether the entry has no attributes and no populated fields.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.fields.iter().all(XmlElement::is_empty)
    }
}

/// The root collection of a sitemap document.
#[derive(Debug, Clone)]
pub struct Urlset {
    /// Attributes of the `urlset` element, namespace declarations included
    pub attributes: Vec<(String, String)>,
    /// URL entries in source order
    pub urls: Vec<UrlEntry>,
    /// Non-`url` children of the root, re-emitted after the entries
    pub extras: Vec<XmlElement>,
}

/// A decoded sitemap document.
///
/// A document either carries the expected `urlset` root, or whatever else
/// the upstream returned, kept whole so it can serialize back as-is.
#[derive(Debug, Clone)]
pub struct SitemapDocument {
    /// XML declaration of the source, re-emitted verbatim on encode
    pub(crate) decl: Option<BytesDecl<'static>>,
    pub(crate) body: DocumentBody,
}

#[derive(Debug, Clone)]
pub(crate) enum DocumentBody {
    /// The expected sitemap skeleton
    Urlset(Urlset),
    /// Any other root, or no root at all for an empty input
    Foreign(Option<XmlElement>),
}

impl SitemapDocument {
    pub(crate) fn new(decl: Option<BytesDecl<'static>>, root: Option<XmlElement>) -> Self {
        let body = match root {
            Some(element) if element.name == "urlset" => {
                let mut urlset = Urlset {
                    attributes: element.attributes,
                    urls: Vec::new(),
                    extras: Vec::new(),
                };
                for node in element.children {
                    match node {
                        XmlNode::Element(child) if child.name == "url" => {
                            let fields = child
                                .children
                                .into_iter()
                                .filter_map(|node| match node {
                                    XmlNode::Element(field) => Some(field),
                                    XmlNode::Text(_) => None,
                                })
                                .collect();
                            urlset.urls.push(UrlEntry {
                                attributes: child.attributes,
                                fields,
                            });
                        }
                        XmlNode::Element(other) => urlset.extras.push(other),
                        XmlNode::Text(_) => {}
                    }
                }
                DocumentBody::Urlset(urlset)
            }
            other => DocumentBody::Foreign(other),
        };

        Self { decl, body }
    }

    /// Whether the document carries the expected `urlset` root.
    pub fn is_urlset(&self) -> bool {
        matches!(self.body, DocumentBody::Urlset(_))
    }

    /// URL entries, or `None` when the document is not a sitemap.
    pub fn urls(&self) -> Option<&[UrlEntry]> {
        match &self.body {
            DocumentBody::Urlset(urlset) => Some(&urlset.urls),
            DocumentBody::Foreign(_) => None,
        }
    }

    /// Mutable URL entries, or `None` when the document is not a sitemap.
    pub fn urls_mut(&mut self) -> Option<&mut Vec<UrlEntry>> {
        match &mut self.body {
            DocumentBody::Urlset(urlset) => Some(&mut urlset.urls),
            DocumentBody::Foreign(_) => None,
        }
    }

    /// Number of URL entries, zero for non-sitemap documents.
    pub fn entry_count(&self) -> usize {
        self.urls().map_or(0, |urls| urls.len())
    }
}
