//! Minimal tag-level HTML scanner.
//!
//! Tokenizes a page once, pairs every opening tag with its closing tag and
//! hands out [`Element`] views that can be searched by class or tag name.
//! Good enough for the listing pages scraped here; not a conforming parser.
//! Unclosed elements end where their parent ends.

use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<!--.*?-->|<![^>]*>|<(/?)([a-zA-Z][a-zA-Z0-9:-]*)((?:[^>"']|"[^"]*"|'[^']*')*)>"#)
        .unwrap()
});

static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
        .unwrap()
});

static RAW_TEXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").unwrap());

static ANY_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->|<[^>]*>").unwrap());

static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const VOID: [&str; 14] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

#[derive(Debug, Clone)]
struct Tag {
    name: String,
    attrs: String,
    /// Byte range of the opening tag itself.
    open: (usize, usize),
    /// Byte offset where the matching closing tag starts, and where it ends.
    close: (usize, usize),
}

#[derive(Debug)]
pub struct Document<'a> {
    html: &'a str,
    tags: Vec<Tag>,
}

impl<'a> Document<'a> {
    pub fn parse(html: &'a str) -> Self {
        let mut tags: Vec<Tag> = Vec::new();
        let mut open_stack: Vec<usize> = Vec::new();
        let mut pos = 0;

        while let Some(caps) = TOKEN_RE.captures_at(html, pos) {
            let whole = caps.get(0).map_or((pos, pos + 1), |m| (m.start(), m.end()));
            pos = whole.1.max(pos + 1);

            let Some(name) = caps.get(2) else {
                continue; // comment or doctype
            };
            let name = name.as_str().to_ascii_lowercase();
            let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
            let attrs = caps.get(3).map_or("", |m| m.as_str());

            if closing {
                if let Some(depth) = open_stack.iter().rposition(|&i| tags[i].name == name) {
                    for idx in open_stack.drain(depth..).rev() {
                        let end = if tags[idx].name == name { whole.1 } else { whole.0 };
                        tags[idx].close = (whole.0, end);
                    }
                }
                continue;
            }

            let self_closing = attrs.trim_end().ends_with('/');
            let idx = tags.len();
            tags.push(Tag {
                name: name.clone(),
                attrs: attrs.trim_end_matches('/').to_string(),
                open: whole,
                close: (whole.1, whole.1),
            });

            if self_closing || VOID.contains(&name.as_str()) {
                continue;
            }
            if name == "script" || name == "style" {
                // Raw text: skip straight to the closing tag.
                let needle = format!("</{name}");
                let rest = html[whole.1..].to_ascii_lowercase();
                match rest.find(&needle) {
                    Some(rel) => {
                        let close_start = whole.1 + rel;
                        let close_end = html[close_start..]
                            .find('>')
                            .map_or(html.len(), |e| close_start + e + 1);
                        tags[idx].close = (close_start, close_end);
                        pos = close_end;
                    }
                    None => {
                        tags[idx].close = (html.len(), html.len());
                        pos = html.len();
                    }
                }
                continue;
            }
            open_stack.push(idx);
        }

        for idx in open_stack {
            tags[idx].close = (html.len(), html.len());
        }

        Document { html, tags }
    }

    pub fn find_all_class(&self, class: &str) -> Vec<Element<'_>> {
        self.scan(0, self.tags.len(), |t| has_class_token(&t.attrs, class))
    }

    pub fn find_class(&self, class: &str) -> Option<Element<'_>> {
        self.find_all_class(class).into_iter().next()
    }

    pub fn find_all_tag(&self, name: &str) -> Vec<Element<'_>> {
        self.scan(0, self.tags.len(), |t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn find_tag(&self, name: &str) -> Option<Element<'_>> {
        self.find_all_tag(name).into_iter().next()
    }

    fn scan(&self, from: usize, to: usize, pred: impl Fn(&Tag) -> bool) -> Vec<Element<'_>> {
        (from..to)
            .filter(|&i| pred(&self.tags[i]))
            .map(|idx| Element { doc: self, idx })
            .collect()
    }

    /// Index one past the last tag nested inside `idx`.
    fn descendants_end(&self, idx: usize) -> usize {
        let close = self.tags[idx].close.0;
        let mut end = idx + 1;
        while end < self.tags.len() && self.tags[end].open.0 < close {
            end += 1;
        }
        end
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Element<'d> {
    doc: &'d Document<'d>,
    idx: usize,
}

impl<'d> Element<'d> {
    fn tag(&self) -> &'d Tag {
        &self.doc.tags[self.idx]
    }

    pub fn name(&self) -> &'d str {
        &self.tag().name
    }

    /// Attribute value with entities decoded.
    pub fn attr(&self, name: &str) -> Option<String> {
        attr_value(&self.tag().attrs, name)
    }

    pub fn has_class(&self, class: &str) -> bool {
        has_class_token(&self.tag().attrs, class)
    }

    /// Byte range of the whole element in the source.
    pub fn span(&self) -> (usize, usize) {
        let tag = self.tag();
        (tag.open.0, tag.close.1.max(tag.open.1))
    }

    pub fn outer(&self) -> &'d str {
        let tag = self.tag();
        &self.doc.html[tag.open.0..tag.close.1.max(tag.open.1)]
    }

    pub fn inner(&self) -> &'d str {
        let tag = self.tag();
        &self.doc.html[tag.open.1..tag.close.0.max(tag.open.1)]
    }

    pub fn text(&self) -> String {
        inner_text(self.inner())
    }

    pub fn find_all_class(&self, class: &str) -> Vec<Element<'d>> {
        let end = self.doc.descendants_end(self.idx);
        self.doc
            .scan(self.idx + 1, end, |t| has_class_token(&t.attrs, class))
    }

    pub fn find_class(&self, class: &str) -> Option<Element<'d>> {
        self.find_all_class(class).into_iter().next()
    }

    pub fn find_all_tag(&self, name: &str) -> Vec<Element<'d>> {
        let end = self.doc.descendants_end(self.idx);
        self.doc
            .scan(self.idx + 1, end, |t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn find_tag(&self, name: &str) -> Option<Element<'d>> {
        self.find_all_tag(name).into_iter().next()
    }
}

fn attr_value(attrs: &str, name: &str) -> Option<String> {
    ATTR_RE.captures_iter(attrs).find_map(|caps| {
        let key = caps.get(1)?.as_str();
        if !key.eq_ignore_ascii_case(name) {
            return None;
        }
        let raw = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map_or("", |m| m.as_str());
        Some(html_escape::decode_html_entities(raw).into_owned())
    })
}

fn has_class_token(attrs: &str, class: &str) -> bool {
    attr_value(attrs, "class").is_some_and(|v| v.split_whitespace().any(|c| c == class))
}

/// Visible text of an HTML fragment: scripts and styles dropped, tags turned
/// into spaces, entities decoded, whitespace collapsed.
pub fn inner_text(fragment: &str) -> String {
    let without_raw = RAW_TEXT_RE.replace_all(fragment, " ");
    let without_tags = ANY_TAG_RE.replace_all(&without_raw, " ");
    let decoded = html_escape::decode_html_entities(&without_tags);
    WS_RE.replace_all(decoded.trim(), " ").into_owned()
}

/// Every `<a href>` in document order as `(href, text)`.
pub fn links(html: &str) -> Vec<(String, String)> {
    let doc = Document::parse(html);
    doc.find_all_tag("a")
        .into_iter()
        .filter_map(|a| Some((a.attr("href")?, a.text())))
        .filter(|(href, _)| !href.is_empty())
        .collect()
}

/// `src` of the first `<img>` in a fragment.
pub fn first_img_src(html: &str) -> Option<String> {
    let doc = Document::parse(html);
    doc.find_all_tag("img")
        .into_iter()
        .find_map(|img| img.attr("src").filter(|s| !s.is_empty()))
}
