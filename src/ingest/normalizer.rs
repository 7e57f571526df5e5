//! Item normalizer.
//!
//! Maps one [`RawEntry`] into the canonical [`NewItem`] shape, resolving
//! title, URL, publication date, summary and image.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::ingest::types::{NewItem, RawEntry, MAX_SUMMARY_LENGTH, UNTITLED};

/// Resolve the publication instant of an entry.
///
/// Falls back to `now` when the entry carries no usable date.
pub fn resolve_published(entry: &RawEntry, now: DateTime<Utc>) -> DateTime<Utc> {
    entry.published.or(entry.updated).unwrap_or(now)
}

/// Normalize an entry into an item for `feed_id`.
///
/// Returns `None` when no URL can be resolved.
pub fn normalize(feed_id: i64, entry: &RawEntry, now: DateTime<Utc>) -> Option<NewItem> {
    let url = resolve_url(entry)?;
    let title = entry
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(UNTITLED);

    let mut item = NewItem::new(feed_id, title, url, resolve_published(entry, now));
    if let Some(summary) = resolve_summary(entry) {
        item = item.with_summary(summary);
    }
    if let Some(image) = resolve_image(entry) {
        item = item.with_image_url(image);
    }
    Some(item)
}

/// Resolve the item URL: link, then enclosure, then embedded media, then
/// the entry identifier when it is itself a URI.
pub fn resolve_url(entry: &RawEntry) -> Option<String> {
    let guid = entry.guid.as_deref().filter(|g| g.contains(':'));

    [
        entry.link.as_deref(),
        entry.enclosure.as_deref(),
        entry.media.first(),
        guid,
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .find(|u| !u.is_empty())
    .map(str::to_string)
}

/// Resolve the plain-text summary, truncated to [`MAX_SUMMARY_LENGTH`].
pub fn resolve_summary(entry: &RawEntry) -> Option<String> {
    [entry.content.as_deref(), entry.description.as_deref()]
        .into_iter()
        .flatten()
        .map(strip_html)
        .find(|s| !s.is_empty())
        .map(|s| truncate(&s, MAX_SUMMARY_LENGTH))
}

/// Resolve the item image. First match wins:
///
/// 1. enclosure URL
/// 2. embedded media content, single or list
/// 3. podcast image / thumbnail
/// 4. first `<img src>` in the inline content or description
pub fn resolve_image(entry: &RawEntry) -> Option<String> {
    let non_empty = |s: &&str| !s.trim().is_empty();

    entry
        .enclosure
        .as_deref()
        .filter(non_empty)
        .or_else(|| entry.media.first().filter(non_empty))
        .or_else(|| entry.thumbnail.as_deref().filter(non_empty))
        .map(|s| s.trim().to_string())
        .or_else(|| {
            [entry.content.as_deref(), entry.description.as_deref()]
                .into_iter()
                .flatten()
                .find_map(first_img_src)
        })
}

fn img_src_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<img[^>]+src\s*=\s*["']([^"'>]+)["']"#).expect("valid img regex")
    })
}

/// Find the first `<img src="...">` in an HTML fragment.
fn first_img_src(html: &str) -> Option<String> {
    img_src_regex()
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Strip HTML tags from text and decode common entities.
fn strip_html(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut in_entity = false;
    let mut entity = String::new();

    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                // Tags separate words
                result.push(' ');
            }
            '>' => in_tag = false,
            '&' if !in_tag => {
                in_entity = true;
                entity.clear();
            }
            ';' if in_entity => {
                in_entity = false;
                match entity.as_str() {
                    "amp" => result.push('&'),
                    "lt" => result.push('<'),
                    "gt" => result.push('>'),
                    "quot" => result.push('"'),
                    "apos" => result.push('\''),
                    "nbsp" => result.push(' '),
                    _ if entity.starts_with('#') => {
                        if let Some(c) = parse_numeric_entity(&entity).and_then(char::from_u32) {
                            result.push(c);
                        }
                    }
                    _ => {
                        result.push('&');
                        result.push_str(&entity);
                        result.push(';');
                    }
                }
            }
            // A bare '&' followed by whitespace is not an entity
            c if in_entity && c.is_whitespace() => {
                in_entity = false;
                result.push('&');
                result.push_str(&entity);
                result.push(c);
            }
            _ if in_entity => entity.push(ch),
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }

    if in_entity {
        result.push('&');
        result.push_str(&entity);
    }

    result.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Parse a numeric HTML entity (e.g., "#123" or "#x7B").
fn parse_numeric_entity(entity: &str) -> Option<u32> {
    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok()
    } else {
        entity.strip_prefix('#').and_then(|dec| dec.parse().ok())
    }
}

/// Truncate to at most `max` characters.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
