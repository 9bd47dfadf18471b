//! arXiv preprint connector.
//!
//! Queries the arXiv export API and parses its Atom feed with `quick-xml`.
//!
//! # Configuration
//!
//! ```toml
//! [sources.arxiv]
//! enabled = true
//! base_url = "http://export.arxiv.org/api/query"
//! ```
//!
//! # Field mapping
//!
//! | Atom element | Paper field |
//! |--------------|-------------|
//! | `entry/id` (after `/abs/`) | `id` |
//! | `entry/id` | `url` |
//! | `entry/title` | `title` |
//! | `entry/author/name` | `authors` |
//! | `entry/summary` | `abstract` |
//! | `entry/published` | `published` |

use anyhow::Result;
use async_trait::async_trait;
use quick_xml::events::Event;
use tracing::debug;

use crate::config::ArxivSourceConfig;
use crate::error::SourceError;
use crate::models::{PaperItem, PaperSource};
use crate::traits::SourceAdapter;

pub struct ArxivAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl ArxivAdapter {
    pub fn new(config: &ArxivSourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("project-scout/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl SourceAdapter<PaperItem> for ArxivAdapter {
    fn name(&self) -> &str {
        "arxiv"
    }

    fn description(&self) -> &str {
        "arXiv preprints, by relevance"
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<PaperItem>, SourceError> {
        let search_query = format!("all:{}", query);
        let max_results = limit.clamp(1, 100).to_string();
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
                ("sortBy", "relevance"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SourceError::Status(resp.status().as_u16()));
        }

        let xml = resp.text().await?;
        let mut papers = parse_atom_feed(&xml)?;
        papers.truncate(limit);
        Ok(papers)
    }
}

#[derive(Default)]
struct EntryFields {
    id: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    author_name: String,
    malformed: bool,
}

impl EntryFields {
    fn into_paper(self) -> Option<PaperItem> {
        if self.malformed {
            return None;
        }
        let url = self.id.trim().to_string();
        if url.is_empty() {
            return None;
        }
        let id = url.rsplit("/abs/").next().unwrap_or(&url).to_string();
        Some(PaperItem {
            id,
            title: collapse_whitespace(&self.title),
            authors: self.authors,
            abstract_text: non_empty(collapse_whitespace(&self.summary)),
            published: non_empty(self.published.trim().to_string()),
            url,
            source: PaperSource::Arxiv,
        })
    }
}

/// Parse an arXiv Atom feed. Entries without an `id` or with text that
/// cannot be unescaped are skipped; a feed that is not well-formed XML is
/// rejected as a whole.
fn parse_atom_feed(xml: &str) -> Result<Vec<PaperItem>, SourceError> {
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut papers = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut entry: Option<EntryFields> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if name == "entry" {
                    entry = Some(EntryFields::default());
                }
                path.push(name);
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"author" => {
                        if let Some(fields) = entry.as_mut() {
                            let author = fields.author_name.trim().to_string();
                            if !author.is_empty() {
                                fields.authors.push(author);
                            }
                            fields.author_name.clear();
                        }
                    }
                    b"entry" => {
                        match entry.take().and_then(EntryFields::into_paper) {
                            Some(paper) => papers.push(paper),
                            None => debug!("skipping arXiv entry without id or with bad text"),
                        }
                    }
                    _ => {}
                }
                path.pop();
            }
            Ok(Event::Text(t)) => {
                if let Some(fields) = entry.as_mut() {
                    match t.unescape() {
                        Ok(text) => append_text(fields, &path, &text),
                        Err(e) => {
                            debug!(error = %e, "bad text in arXiv entry");
                            fields.malformed = true;
                        }
                    }
                }
            }
            Ok(Event::CData(t)) => {
                if let Some(fields) = entry.as_mut() {
                    let text = String::from_utf8_lossy(&t.into_inner()).to_string();
                    append_text(fields, &path, &text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SourceError::Malformed(e.to_string())),
            _ => {}
        }
    }

    Ok(papers)
}

fn append_text(fields: &mut EntryFields, path: &[String], text: &str) {
    let n = path.len();
    if n < 2 {
        return;
    }
    let (parent, current) = (path[n - 2].as_str(), path[n - 1].as_str());
    let target = match (parent, current) {
        ("entry", "id") => &mut fields.id,
        ("entry", "title") => &mut fields.title,
        ("entry", "summary") => &mut fields.summary,
        ("entry", "published") => &mut fields.published,
        ("author", "name") => &mut fields.author_name,
        _ => return,
    };
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(text);
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
