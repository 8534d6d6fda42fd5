//! Syndication feed adapter.
//!
//! Accepts RSS 2.0 (`<rss><channel><item>`), RSS 1.0 (`<rdf:RDF><item>`) and
//! Atom (`<feed><entry>`). The root element picks the layout; entries are then
//! read with `quick-xml`'s event reader, matching each child of an entry by its
//! qualified name. Prefixed extension elements (`media:title`, `atom:link`,
//! `dc:creator`, ...) never shadow the core fields; `dc:date` is the one
//! extension read, as a fallback for `pubDate`.
//!
//! The published time of an entry is derived by priority:
//! a structured RFC 2822 / RFC 3339 parse of the published or updated text,
//! then the raw published text, then the raw updated text, then the current
//! time.

use crate::error::{HarvestError, Result};
use crate::http::PageFetcher;
use crate::models::{CandidateReference, Published};
use crate::sources::truncate;
use crate::utils::{clean_text, offload};
use chrono::{DateTime, FixedOffset, Local};
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::{debug, error, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Rss,
    Atom,
}

impl Layout {
    fn from_root(local_name: &[u8]) -> Option<Self> {
        match local_name.to_ascii_lowercase().as_slice() {
            b"rss" | b"rdf" => Some(Layout::Rss),
            b"feed" => Some(Layout::Atom),
            _ => None,
        }
    }

    fn entry_tag(self) -> &'static [u8] {
        match self {
            Layout::Rss => b"item",
            Layout::Atom => b"entry",
        }
    }

    /// Map a direct child of an entry to the field it fills.
    fn field(self, qname: &[u8]) -> Option<Field> {
        match (self, qname) {
            (_, b"title") => Some(Field::Title),
            (Layout::Rss, b"category") => Some(Field::Category),
            (Layout::Rss, b"link") => Some(Field::Link),
            (Layout::Rss, b"guid") | (Layout::Atom, b"id") => Some(Field::Id),
            (Layout::Rss, b"description") | (Layout::Atom, b"summary") => Some(Field::Summary),
            (Layout::Rss, b"pubDate") | (Layout::Atom, b"published") => Some(Field::Published),
            (Layout::Rss, b"dc:date") => Some(Field::DcDate),
            (Layout::Atom, b"updated") => Some(Field::Updated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Id,
    Summary,
    Published,
    DcDate,
    Updated,
    Category,
}

#[derive(Debug, Clone, PartialEq)]
struct AtomLink {
    href: String,
    rel: Option<String>,
}

/// Raw fields of one feed entry, whitespace-collapsed, in document order.
#[derive(Debug, Default)]
struct RawEntry {
    title: Option<String>,
    link: Option<String>,
    links: Vec<AtomLink>,
    id: Option<String>,
    summary: Option<String>,
    published: Option<String>,
    dc_date: Option<String>,
    updated: Option<String>,
    categories: Vec<String>,
}

impl RawEntry {
    fn set(&mut self, field: Field, raw: &str) {
        let value = clean_text(raw);
        if value.is_empty() {
            return;
        }
        let slot = match field {
            Field::Category => {
                self.categories.push(value);
                return;
            }
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Id => &mut self.id,
            Field::Summary => &mut self.summary,
            Field::Published => &mut self.published,
            Field::DcDate => &mut self.dc_date,
            Field::Updated => &mut self.updated,
        };
        slot.get_or_insert(value);
    }

    /// Read the attribute-carried fields of an Atom `<link>` or `<category>`.
    fn set_from_attributes(&mut self, qname: &[u8], e: &BytesStart<'_>) -> quick_xml::Result<()> {
        let (mut href, mut rel, mut term) = (None, None, None);
        for attr in e.attributes() {
            let attr = attr?;
            let value = attr.unescape_value()?.trim().to_string();
            match attr.key.as_ref() {
                b"href" => href = Some(value),
                b"rel" => rel = Some(value),
                b"term" => term = Some(value),
                _ => {}
            }
        }
        match qname {
            b"link" => {
                if let Some(href) = href.filter(|h| !h.is_empty()) {
                    self.links.push(AtomLink { href, rel });
                }
            }
            b"category" => {
                if let Some(term) = term {
                    self.set(Field::Category, &term);
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Walk the document and collect every entry of its layout.
fn read_entries(xml: &str) -> quick_xml::Result<Option<(Layout, Vec<RawEntry>)>> {
    let mut reader = Reader::from_str(xml);
    let mut layout = None;
    let mut entries = Vec::new();
    let mut depth = 0usize;
    // (entry, depth of its start tag)
    let mut entry: Option<(RawEntry, usize)> = None;
    // (field, buffered text, depth of its start tag)
    let mut field: Option<(Field, String, usize)> = None;

    loop {
        let event = reader.read_event()?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                if !is_empty {
                    depth += 1;
                }
                let Some(current) = layout else {
                    match Layout::from_root(e.local_name().as_ref()) {
                        Some(found) => layout = Some(found),
                        None => return Ok(None),
                    }
                    continue;
                };
                let qname = e.name();
                let qname = qname.as_ref();
                if entry.is_none() {
                    if qname == current.entry_tag() && !is_empty {
                        entry = Some((RawEntry::default(), depth));
                    }
                    continue;
                }
                if field.is_some() {
                    continue;
                }
                if let Some((raw, start)) = entry.as_mut() {
                    let child_depth = if is_empty { depth + 1 } else { depth };
                    if child_depth != *start + 1 {
                        continue;
                    }
                    if current == Layout::Atom {
                        raw.set_from_attributes(qname, e)?;
                    }
                    if let Some(f) = current.field(qname).filter(|_| !is_empty) {
                        field = Some((f, String::new(), depth));
                    }
                }
            }
            Event::Text(e) => {
                if let Some((_, buf, _)) = field.as_mut() {
                    buf.push_str(&e.decode()?);
                }
            }
            Event::CData(e) => {
                if let Some((_, buf, _)) = field.as_mut() {
                    buf.push_str(&e.decode()?);
                }
            }
            Event::GeneralRef(e) => {
                if let Some((_, buf, _)) = field.as_mut() {
                    if let Some(ch) = e.resolve_char_ref()? {
                        buf.push(ch);
                    } else {
                        let name = e.decode()?;
                        match resolve_predefined_entity(&name) {
                            Some(resolved) => buf.push_str(resolved),
                            None => {
                                buf.push('&');
                                buf.push_str(&name);
                                buf.push(';');
                            }
                        }
                    }
                }
            }
            Event::End(_) => {
                if field.as_ref().is_some_and(|(_, _, start)| *start == depth) {
                    if let (Some((f, buf, _)), Some((raw, _))) = (field.take(), entry.as_mut()) {
                        raw.set(f, &buf);
                    }
                }
                if entry.as_ref().is_some_and(|(_, start)| *start == depth) {
                    if let Some((raw, _)) = entry.take() {
                        entries.push(raw);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(layout.map(|layout| (layout, entries)))
}

fn is_http(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

fn parse_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(text)
        .or_else(|_| DateTime::parse_from_rfc3339(text))
        .ok()
}

/// Pick the entry's publish time: structured parse, published text, updated text, now.
pub fn derive_published(published: Option<&str>, updated: Option<&str>) -> Published {
    let published = published.map(str::trim).filter(|s| !s.is_empty());
    let updated = updated.map(str::trim).filter(|s| !s.is_empty());

    if let Some(dt) = published.into_iter().chain(updated).find_map(parse_timestamp) {
        return Published::Timestamp(dt);
    }
    match published.or(updated) {
        Some(raw) => Published::Text(raw.to_string()),
        None => Published::Timestamp(Local::now().fixed_offset()),
    }
}

impl RawEntry {
    fn into_rss_candidate(self) -> Option<CandidateReference> {
        let link = self.link.or_else(|| self.id.filter(|g| is_http(g)))?;
        let published_raw = self.published.or(self.dc_date);

        Some(CandidateReference {
            link,
            title: self.title,
            summary: self.summary,
            published: Some(derive_published(published_raw.as_deref(), None)),
            categories: self.categories,
        })
    }

    fn into_atom_candidate(self) -> Option<CandidateReference> {
        let alternate = self
            .links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.links.first())
            .map(|l| l.href.clone());
        let link = alternate.or_else(|| self.id.filter(|id| is_http(id)))?;

        Some(CandidateReference {
            link,
            title: self.title,
            summary: self.summary,
            published: Some(derive_published(self.published.as_deref(), self.updated.as_deref())),
            categories: self.categories,
        })
    }
}

/// Parse a feed document into candidates, in document order.
///
/// Entries without a usable link are dropped.
pub fn parse_feed(xml: &str) -> Result<Vec<CandidateReference>> {
    let (layout, entries) = match read_entries(xml) {
        Ok(Some(found)) => found,
        Ok(None) => {
            return Err(HarvestError::parse("feed", "not an RSS, RDF or Atom document"));
        }
        Err(e) => return Err(HarvestError::parse("feed", e)),
    };

    let total = entries.len();
    let candidates: Vec<CandidateReference> = match layout {
        Layout::Rss => entries.into_iter().filter_map(RawEntry::into_rss_candidate).collect(),
        Layout::Atom => entries.into_iter().filter_map(RawEntry::into_atom_candidate).collect(),
    };

    if candidates.len() < total {
        debug!(dropped = total - candidates.len(), "Dropped feed entries without a link");
    }
    Ok(candidates)
}

async fn try_fetch<F: PageFetcher>(
    fetcher: &F,
    feed_url: &str,
    limit: Option<usize>,
) -> Result<Vec<CandidateReference>> {
    let xml = fetcher.fetch(feed_url).await?;
    let entries = offload(move || parse_feed(&xml)).await?;
    Ok(truncate(entries, limit))
}

/// Fetch one feed and return up to `limit` candidates in feed order.
///
/// The whole feed is parsed before truncation. Failures are logged and
/// yield an empty list.
#[instrument(level = "info", skip_all, fields(%feed_url))]
pub async fn fetch_candidates<F: PageFetcher>(
    fetcher: &F,
    feed_url: &str,
    limit: Option<usize>,
) -> Vec<CandidateReference> {
    match try_fetch(fetcher, feed_url, limit).await {
        Ok(candidates) => {
            info!(count = candidates.len(), "Indexed feed entries");
            candidates
        }
        Err(e) => {
            error!(error = %e, kind = e.kind(), "Feed failed; contributing no candidates");
            Vec::new()
        }
    }
}
