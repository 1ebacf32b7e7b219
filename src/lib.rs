//! Sitemap rewriting relay.
//!
//! Fetches an origin's XML sitemap, edits it and republishes the result
//! over a single HTTP endpoint:
//!
//! - URL entry removal by exact value or wildcard pattern (`*` within a
//!   path segment, `**` across segments)
//! - URL entry addition
//! - Origin domain rewriting on surviving entries
//!
//! The origin domain comes from the `ORIGIN_DOMAIN` environment variable,
//! read on every request. Fields the pipeline does not touch pass through
//! serialization unchanged.
//!
//! ## Configuration Example
//!
//! ```yaml
//! edits:
//!   remove:
//!     - "/work/project-2"
//!     - "/drafts/**"
//!   add:
//!     - "/work/project-42"
//!   replace_domain: "https://www.example.org"
//! ```

pub mod codec;
pub mod config;
pub mod document;
pub mod fetch;
pub mod matcher;
pub mod relay;
pub mod server;
pub mod transformer;

pub use codec::CodecError;
pub use config::{RelayConfig, ResolvedConfig};
pub use document::{SitemapDocument, UrlEntry};
pub use fetch::{FetchError, HttpFetcher, SitemapFetcher};
pub use matcher::UrlPattern;
pub use relay::{RelayError, SitemapRelay};
pub use transformer::{SitemapTransformer, TransformSummary};
