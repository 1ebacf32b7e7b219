//! Sitemap edit pipeline.
//!
//! Applies the configured edits to a decoded sitemap in a fixed order:
//! remove matching entries, append new entries, then rewrite the origin
//! domain on whatever survived. Empty rule lists leave their stage as a
//! no-op.

use crate::config::ResolvedConfig;
use crate::document::{SitemapDocument, UrlEntry};
use crate::matcher::UrlPattern;
use tracing::warn;

/// Compiled edit pipeline for one request.
pub struct SitemapTransformer {
    remove: Vec<UrlPattern>,
    add: Vec<String>,
    origin: String,
    replacement: String,
}

/// Counts of the edits applied by one transform run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransformSummary {
    /// Entries dropped by the removal stage
    pub removed: usize,
    /// Entries appended by the add stage
    pub added: usize,
    /// Entries whose domain prefix was rewritten
    pub rewritten: usize,
}

impl SitemapTransformer {
    /// Compile the pipeline from resolved configuration.
    ///
    /// Removal patterns that fail to compile are skipped with a warning;
    /// they never match anything.
    pub fn new(config: &ResolvedConfig) -> Self {
        let remove = config
            .remove_patterns
            .iter()
            .filter_map(|pattern| match UrlPattern::compile(pattern) {
                Ok(compiled) => Some(compiled),
                Err(error) => {
                    warn!(
                        pattern = %pattern,
                        error = %error,
                        "Skipping removal pattern that failed to compile"
                    );
                    None
                }
            })
            .collect();

        Self {
            remove,
            add: config.add_urls.clone(),
            origin: config.origin.clone(),
            replacement: config.domain_replacement.clone(),
        }
    }

    /// Apply all stages to the document in order.
    ///
    /// Documents without the expected sitemap root pass through untouched.
    pub fn transform(&self, doc: &mut SitemapDocument) -> TransformSummary {
        let mut summary = TransformSummary::default();

        let Some(urls) = doc.urls_mut() else {
            warn!("Sitemap structure might be unexpected or empty; passing document through");
            return summary;
        };

        summary.removed = self.remove_entries(urls);
        summary.added = self.append_entries(urls);
        summary.rewritten = self.rewrite_domains(urls);
        summary
    }

    /// Drop entries whose location matches any removal pattern. Entries
    /// without a location are never removed.
    fn remove_entries(&self, urls: &mut Vec<UrlEntry>) -> usize {
        if self.remove.is_empty() {
            return 0;
        }

        let before = urls.len();
        urls.retain(|entry| match entry.loc() {
            Some(loc) => !self.remove.iter().any(|pattern| pattern.matches(loc)),
            None => true,
        });
        before - urls.len()
    }

    /// Append one entry per configured URL, in configuration order.
    fn append_entries(&self, urls: &mut Vec<UrlEntry>) -> usize {
        for url in &self.add {
            urls.push(UrlEntry::with_loc(url.as_str()));
        }
        self.add.len()
    }

    /// Replace the origin prefix on entries whose location starts with it.
    fn rewrite_domains(&self, urls: &mut [UrlEntry]) -> usize {
        if self.replacement.is_empty() || self.origin.is_empty() {
            return 0;
        }

        let mut rewritten = 0;
        for entry in urls.iter_mut() {
            let Some(rest) = entry
                .loc()
                .and_then(|loc| loc.strip_prefix(&self.origin))
                .map(str::to_string)
            else {
                continue;
            };
            entry.set_loc(format!("{}{}", self.replacement, rest));
            rewritten += 1;
        }
        rewritten
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;

    fn make_config(remove: &[&str], add: &[&str], replacement: &str) -> ResolvedConfig {
        ResolvedConfig {
            origin: "https://origin.example".to_string(),
            source_url: "https://origin.example/sitemap.xml".to_string(),
            remove_patterns: remove.iter().map(|s| s.to_string()).collect(),
            add_urls: add.iter().map(|s| s.to_string()).collect(),
            domain_replacement: replacement.to_string(),
        }
    }

    fn make_doc(locs: &[&str]) -> SitemapDocument {
        let body: String = locs
            .iter()
            .map(|loc| format!("<url><loc>{loc}</loc></url>"))
            .collect();
        codec::decode(&format!("<urlset>{body}</urlset>")).unwrap()
    }

    fn locs(doc: &SitemapDocument) -> Vec<String> {
        doc.urls()
            .unwrap()
            .iter()
            .filter_map(|entry| entry.loc().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_removes_exact_url_and_appends_new_entry() {
        let config = make_config(
            &["https://origin.example/work/project-2"],
            &["https://origin.example/work/project-42"],
            "",
        );
        let transformer = SitemapTransformer::new(&config);
        let mut doc = make_doc(&[
            "https://origin.example/home",
            "https://origin.example/work/project-2",
            "https://origin.example/work/project-9",
        ]);

        let summary = transformer.transform(&mut doc);

        assert_eq!(
            locs(&doc),
            vec![
                "https://origin.example/home",
                "https://origin.example/work/project-9",
                "https://origin.example/work/project-42",
            ]
        );
        assert_eq!(
            summary,
            TransformSummary {
                removed: 1,
                added: 1,
                rewritten: 0
            }
        );
    }

    #[test]
    fn test_wildcard_removal_spares_deeper_paths() {
        let config = make_config(&["https://origin.example/work/*"], &[], "");
        let transformer = SitemapTransformer::new(&config);
        let mut doc = make_doc(&[
            "https://origin.example/work/project-2",
            "https://origin.example/work/project-2/details",
            "https://origin.example/home",
        ]);

        let summary = transformer.transform(&mut doc);

        assert_eq!(
            locs(&doc),
            vec![
                "https://origin.example/work/project-2/details",
                "https://origin.example/home",
            ]
        );
        assert_eq!(summary.removed, 1);
    }

    #[test]
    fn test_domain_rewrite_touches_only_origin_urls() {
        let config = make_config(&[], &[], "https://www.example.org");
        let transformer = SitemapTransformer::new(&config);
        let mut doc = make_doc(&[
            "https://origin.example/home",
            "https://other.example/elsewhere",
            "https://origin.example/work/a",
        ]);

        let summary = transformer.transform(&mut doc);

        assert_eq!(
            locs(&doc),
            vec![
                "https://www.example.org/home",
                "https://other.example/elsewhere",
                "https://www.example.org/work/a",
            ]
        );
        assert_eq!(summary.rewritten, 2);
    }

    #[test]
    fn test_added_entries_are_rewritten_too() {
        let config = make_config(
            &[],
            &["https://origin.example/work/project-42"],
            "https://www.example.org",
        );
        let transformer = SitemapTransformer::new(&config);
        let mut doc = make_doc(&["https://origin.example/home"]);

        transformer.transform(&mut doc);

        assert_eq!(
            locs(&doc),
            vec![
                "https://www.example.org/home",
                "https://www.example.org/work/project-42",
            ]
        );
    }

    #[test]
    fn test_entries_without_loc_are_never_removed_or_rewritten() {
        let xml = "<urlset>\
                   <url><lastmod>2024-01-01</lastmod></url>\
                   <url><loc>https://origin.example/a</loc></url>\
                   </urlset>";
        let mut doc = codec::decode(xml).unwrap();
        let config = make_config(&["**"], &[], "https://www.example.org");
        let transformer = SitemapTransformer::new(&config);

        let summary = transformer.transform(&mut doc);

        assert_eq!(summary.removed, 1);
        assert_eq!(summary.rewritten, 0);
        let urls = doc.urls().unwrap();
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].loc(), None);
    }

    #[test]
    fn test_uncompilable_pattern_is_skipped() {
        let mut config = make_config(&["https://origin.example/home"], &[], "");
        // a literal this long exceeds the regex engine's compiled size limit
        config
            .remove_patterns
            .push(format!("{}*", "b".repeat(2_000_000)));
        let transformer = SitemapTransformer::new(&config);
        let mut doc = make_doc(&["https://origin.example/home", "https://origin.example/x"]);

        let summary = transformer.transform(&mut doc);

        assert_eq!(summary.removed, 1);
        assert_eq!(locs(&doc), vec!["https://origin.example/x"]);
    }

    #[test]
    fn test_foreign_document_skips_all_stages() {
        let config = make_config(&["**"], &["https://origin.example/new"], "https://www.example.org");
        let transformer = SitemapTransformer::new(&config);
        let mut doc = codec::decode("<html><body>maintenance</body></html>").unwrap();

        let summary = transformer.transform(&mut doc);

        assert_eq!(summary, TransformSummary::default());
        assert!(!doc.is_urlset());
    }

    #[test]
    fn test_empty_urlset_still_receives_additions() {
        let config = make_config(&[], &["https://origin.example/work/project-42"], "");
        let transformer = SitemapTransformer::new(&config);
        let mut doc = codec::decode("<urlset></urlset>").unwrap();

        let summary = transformer.transform(&mut doc);

        assert_eq!(summary.added, 1);
        assert_eq!(locs(&doc), vec!["https://origin.example/work/project-42"]);
    }

    #[test]
    fn test_add_stage_does_not_deduplicate() {
        let config = make_config(&[], &["https://origin.example/home"], "");
        let transformer = SitemapTransformer::new(&config);
        let mut doc = make_doc(&["https://origin.example/home"]);

        transformer.transform(&mut doc);
        transformer.transform(&mut doc);

        assert_eq!(doc.entry_count(), 3);
    }

    #[test]
    fn test_empty_rules_are_identity() {
        let config = make_config(&[], &[], "");
        let transformer = SitemapTransformer::new(&config);
        let mut doc = make_doc(&["https://origin.example/a", "https://origin.example/b"]);

        let summary = transformer.transform(&mut doc);

        assert_eq!(summary, TransformSummary::default());
        assert_eq!(
            locs(&doc),
            vec!["https://origin.example/a", "https://origin.example/b"]
        );
    }
}
