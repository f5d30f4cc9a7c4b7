//! Share-link extraction from free-form chat text

use std::collections::BTreeSet;

use regex::{Regex, RegexBuilder};
use tracing::{debug, trace};

/// Share-link patterns recognised when config does not override them
pub const DEFAULT_PATTERNS: &[&str] = &[
    r"https?://(?:www\.)?terabox\.com/s/[\w-]+",
    r"https?://(?:www\.)?1024terabox\.com/s/[\w-]+",
    r"https?://(?:www\.)?freeterabox\.com/s/[\w-]+",
    r"https?://(?:www\.)?teraboxapp\.com/s/[\w-]+",
    r"https?://(?:www\.)?terashare\.co/s/[\w-]+",
    r"https?://(?:www\.)?terabox\.net/s/[\w-]+",
];

/// A candidate share link, exactly as it appeared in the message
pub type Link = String;

/// Compiled set of case-insensitive domain patterns
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    patterns: Vec<Regex>,
    anchored: Vec<Regex>,
}

impl LinkExtractor {
    /// Compile the given patterns
    ///
    /// # Errors
    ///
    /// Returns the first pattern that fails to compile.
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut compiled = Vec::new();
        let mut anchored = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();
            compiled.push(RegexBuilder::new(pattern).case_insensitive(true).build()?);
            anchored.push(
                RegexBuilder::new(&format!("^(?:{pattern})$"))
                    .case_insensitive(true)
                    .build()?,
            );
        }

        Ok(Self {
            patterns: compiled,
            anchored,
        })
    }

    /// Collect every distinct link in `text`; ordering is lexical
    pub fn extract(&self, text: Option<&str>) -> BTreeSet<Link> {
        let text = text.unwrap_or_default();
        let mut links = BTreeSet::new();
        if text.is_empty() {
            return links;
        }

        for pattern in &self.patterns {
            for found in pattern.find_iter(text) {
                trace!(link = found.as_str(), "matched share link");
                links.insert(found.as_str().to_string());
            }
        }

        debug!(count = links.len(), "extracted share links");
        links
    }

    /// True when the whole of `link` matches one of the patterns
    pub fn is_supported(&self, link: &str) -> bool {
        self.anchored.iter().any(|re| re.is_match(link.trim()))
    }
}

/// Share identifier of a link: the path segment after `/s/`
///
/// `https://terabox.com/s/1abc?x=y` gives `1abc`.
pub fn share_id(link: &str) -> Option<&str> {
    let start = link.to_ascii_lowercase().find("/s/")? + 3;
    let rest = &link[start..];
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let id = &rest[..end];
    (!id.is_empty()).then_some(id)
}

impl Default for LinkExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERNS).expect("default link patterns compile")
    }
}
