//! RSS 2.0 and Atom entry extraction.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::debug;

/// One feed entry, fields as found (HTML still embedded where the feed had it).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub summary_html: String,
    pub content_html: String,
    pub published: Option<String>,
    pub media_url: Option<String>,
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    Title,
    Link,
    Summary,
    Content,
    Published,
}

fn field_for(name: &[u8]) -> Option<Field> {
    match name {
        b"title" => Some(Field::Title),
        b"link" => Some(Field::Link),
        b"description" | b"summary" => Some(Field::Summary),
        b"content:encoded" | b"content" => Some(Field::Content),
        b"pubDate" | b"published" | b"updated" | b"dc:date" => Some(Field::Published),
        _ => None,
    }
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| html_escape::decode_html_entities(&String::from_utf8_lossy(&a.value)).into_owned())
}

/// Handles elements that carry their payload in attributes.
fn take_attributes(e: &BytesStart<'_>, entry: &mut FeedEntry) {
    match e.name().as_ref() {
        b"link" => {
            let rel = attr(e, b"rel");
            if let Some(href) = attr(e, b"href") {
                if entry.link.is_empty() && rel.as_deref().is_none_or(|r| r == "alternate") {
                    entry.link = href;
                }
            }
        }
        b"media:content" | b"media:thumbnail" => {
            if entry.media_url.is_none() {
                entry.media_url = attr(e, b"url");
            }
        }
        b"enclosure" => {
            let is_image = attr(e, b"type").is_some_and(|t| t.starts_with("image/"));
            if entry.media_url.is_none() && is_image {
                entry.media_url = attr(e, b"url");
            }
        }
        _ => {}
    }
}

fn push_text(entry: &mut FeedEntry, field: Field, text: &str) {
    let target = match field {
        Field::Title => &mut entry.title,
        Field::Link => &mut entry.link,
        Field::Summary => &mut entry.summary_html,
        Field::Content => &mut entry.content_html,
        Field::Published => {
            entry
                .published
                .get_or_insert_with(String::new)
                .push_str(text.trim());
            return;
        }
    };
    target.push_str(text);
}

/// Entries in feed order. Malformed XML ends parsing; entries read so far
/// are kept.
pub fn parse_feed(xml: &str) -> Vec<FeedEntry> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<FeedEntry> = None;
    // Field of the element directly under the entry, and nesting below it.
    let mut field: Option<Field> = None;
    let mut depth = 0usize;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                debug!(error = %e, position = reader.buffer_position(), "Feed XML error");
                break;
            }
        };
        match event {
            Event::Start(e) => {
                let name = e.name();
                if matches!(name.as_ref(), b"item" | b"entry") {
                    current = Some(FeedEntry::default());
                    field = None;
                    depth = 0;
                    continue;
                }
                let Some(entry) = current.as_mut() else {
                    continue;
                };
                depth += 1;
                if depth == 1 {
                    take_attributes(&e, entry);
                    // First date element wins; Atom often carries both
                    // `published` and `updated`.
                    field = field_for(name.as_ref())
                        .filter(|f| *f != Field::Published || entry.published.is_none());
                }
            }
            Event::Empty(e) => {
                if let Some(entry) = current.as_mut() {
                    take_attributes(&e, entry);
                }
            }
            Event::Text(t) => {
                if let (Some(entry), Some(f)) = (current.as_mut(), field) {
                    let raw = String::from_utf8_lossy(&t);
                    push_text(entry, f, &html_escape::decode_html_entities(&raw));
                }
            }
            Event::CData(c) => {
                if let (Some(entry), Some(f)) = (current.as_mut(), field) {
                    push_text(entry, f, &String::from_utf8_lossy(&c));
                }
            }
            Event::End(e) => {
                if matches!(e.name().as_ref(), b"item" | b"entry") {
                    if let Some(entry) = current.take() {
                        if !entry.title.trim().is_empty() && !entry.link.trim().is_empty() {
                            entries.push(entry);
                        }
                    }
                    field = None;
                    continue;
                }
                if current.is_some() {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        field = None;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    entries
}
