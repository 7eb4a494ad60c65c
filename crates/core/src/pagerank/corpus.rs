use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::Result;

/// A set of pages and the links between them.
///
/// Pages are kept in name order and addressed by index internally. Links to
/// pages outside the corpus and links from a page to itself are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    pages: Vec<String>,
    links: Vec<Vec<usize>>,
}

impl Corpus {
    /// Build a corpus from `(page, outgoing links)` pairs.
    pub fn from_links<I, S, L>(pages: I) -> Self
    where
        I: IntoIterator<Item = (S, L)>,
        S: Into<String>,
        L: IntoIterator,
        L::Item: Into<String>,
    {
        let raw: BTreeMap<String, BTreeSet<String>> = pages
            .into_iter()
            .map(|(page, links)| (page.into(), links.into_iter().map(Into::into).collect()))
            .collect();

        let names: Vec<String> = raw.keys().cloned().collect();
        let links: Vec<Vec<usize>> = raw
            .iter()
            .map(|(page, targets)| {
                targets
                    .iter()
                    .filter(|t| *t != page)
                    .filter_map(|t| names.binary_search(t).ok())
                    .collect::<Vec<usize>>()
            })
            .collect();

        Self {
            pages: names,
            links,
        }
    }

    /// Parse every `*.html` file in `dir` for `<a href="...">` links.
    ///
    /// Page names are file names; subdirectories are ignored.
    pub fn crawl<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut pages = Vec::new();

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(".html") || !entry.file_type()?.is_file() {
                continue;
            }
            let contents = std::fs::read_to_string(entry.path())?;
            let links = extract_links(&contents);
            log::debug!("{}: {} raw links", name, links.len());
            pages.push((name, links));
        }

        let corpus = Self::from_links(pages);
        log::info!("crawled {} pages from '{}'", corpus.len(), dir.display());
        Ok(corpus)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Page names in sorted order.
    pub fn pages(&self) -> impl Iterator<Item = &str> {
        self.pages.iter().map(|p| p.as_str())
    }

    pub fn page_index(&self, page: &str) -> Option<usize> {
        self.pages.binary_search_by(|p| p.as_str().cmp(page)).ok()
    }

    pub fn page_name(&self, index: usize) -> &str {
        &self.pages[index]
    }

    /// Outgoing links of `page`, or `None` if the page is not in the corpus.
    pub fn links(&self, page: &str) -> Option<BTreeSet<&str>> {
        self.page_index(page)
            .map(|i| self.links[i].iter().map(|&j| self.pages[j].as_str()).collect())
    }

    pub(crate) fn out_links(&self, index: usize) -> &[usize] {
        &self.links[index]
    }
}

/// Targets of `<a ... href="...">` tags, in document order.
fn extract_links(html: &str) -> Vec<String> {
    let mut links = Vec::new();
    let mut rest = html;

    while let Some(start) = rest.find("<a") {
        let after = &rest[start + 2..];
        if !after.starts_with(char::is_whitespace) {
            rest = after;
            continue;
        }
        let tag_end = after.find('>').unwrap_or(after.len());
        let tag = &after[..tag_end];
        if let Some(h) = tag.find("href=\"") {
            let value = &tag[h + 6..];
            if let Some(close) = value.find('"') {
                links.push(value[..close].to_string());
            }
        }
        rest = &after[tag_end..];
    }
    links
}
