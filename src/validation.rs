//! Record completeness checks and run-scoped de-duplication.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingKind {
    Missing,
    Empty,
}

/// A required field that kept a record from being complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingField {
    pub key: String,
    pub kind: MissingKind,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            MissingKind::Missing => write!(f, "{} (missing)", self.key),
            MissingKind::Empty => write!(f, "{} (empty)", self.key),
        }
    }
}

/// JSON truthiness: `null`, `false`, `0`, `""`, `[]` and `{}` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

/// True iff every required key is present with a truthy value.
pub fn is_complete(record: &Map<String, Value>, required_keys: &[&str]) -> bool {
    required_keys
        .iter()
        .all(|key| record.get(*key).map(is_truthy).unwrap_or(false))
}

/// Required keys that are absent or falsy, in `required_keys` order.
pub fn missing_fields(record: &Map<String, Value>, required_keys: &[&str]) -> Vec<MissingField> {
    required_keys
        .iter()
        .filter_map(|key| match record.get(*key) {
            None => Some(MissingField { key: key.to_string(), kind: MissingKind::Missing }),
            Some(value) if !is_truthy(value) => {
                Some(MissingField { key: key.to_string(), kind: MissingKind::Empty })
            }
            Some(_) => None,
        })
        .collect()
}

pub fn format_missing(fields: &[MissingField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Normalized values seen during one run. Grows monotonically.
///
/// The detail phase keys events by link; matching by title as well is opt-in
/// through [`SeenEvents`], since distinct shows often share a title.
#[derive(Debug, Default, Clone)]
pub struct DedupSet {
    seen: HashSet<String>,
}

impl DedupSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(value: &str) -> String {
        value.trim().to_lowercase()
    }

    /// Empty values are never duplicates.
    pub fn is_duplicate(&self, value: &str) -> bool {
        let key = Self::normalize(value);
        !key.is_empty() && self.seen.contains(&key)
    }

    /// Records `value`; returns false if it was already present or empty.
    pub fn insert(&mut self, value: &str) -> bool {
        let key = Self::normalize(value);
        !key.is_empty() && self.seen.insert(key)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

impl<S: AsRef<str>> Extend<S> for DedupSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value.as_ref());
        }
    }
}

/// Events already persisted or extracted in this run.
#[derive(Debug, Default, Clone)]
pub struct SeenEvents {
    links: DedupSet,
    titles: Option<DedupSet>,
}

impl SeenEvents {
    pub fn new(match_titles: bool) -> Self {
        Self { links: DedupSet::new(), titles: match_titles.then(DedupSet::new) }
    }

    /// Checked before a link is fetched.
    pub fn has_link(&self, link: &str) -> bool {
        self.links.is_duplicate(link)
    }

    /// Records an event. Returns false when its link, or its title if titles
    /// are matched, was seen before; nothing is recorded then.
    pub fn insert(&mut self, link: &str, title: &str) -> bool {
        let title_seen = self.titles.as_ref().is_some_and(|t| t.is_duplicate(title));
        if title_seen || self.links.is_duplicate(link) {
            return false;
        }
        self.links.insert(link);
        if let Some(titles) = &mut self.titles {
            titles.insert(title);
        }
        true
    }

    /// Number of distinct links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::REQUIRED_KEYS;
    use serde_json::json;

    fn complete_record() -> Map<String, Value> {
        let value = json!({
            "title": "Comedy Night",
            "venue": "The Laugh Factory",
            "summary": "Stand-up showcase",
            "address": "123 Main St",
            "email": "info@laugh.example",
            "city": "Toronto",
            "province": "Ontario",
            "producers": "Laugh Productions",
            "event_link": "https://www.eventbrite.ca/e/comedy-night-1",
            "date": "2025-12-15 8:00 PM"
        });
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn complete_record_passes() {
        let record = complete_record();
        assert!(is_complete(&record, REQUIRED_KEYS));
        assert!(missing_fields(&record, REQUIRED_KEYS).is_empty());
    }

    #[test]
    fn any_missing_or_empty_required_field_fails() {
        for key in REQUIRED_KEYS {
            let mut emptied = complete_record();
            emptied.insert(key.to_string(), json!(""));
            assert!(!is_complete(&emptied, REQUIRED_KEYS), "empty {key} accepted");

            let mut removed = complete_record();
            removed.remove(*key);
            assert!(!is_complete(&removed, REQUIRED_KEYS), "missing {key} accepted");

            let mut nulled = complete_record();
            nulled.insert(key.to_string(), Value::Null);
            assert!(!is_complete(&nulled, REQUIRED_KEYS), "null {key} accepted");
        }
    }

    #[test]
    fn extra_fields_do_not_matter() {
        let mut record = complete_record();
        record.insert("price".into(), json!(""));
        record.insert("capacity".into(), json!(0));
        assert!(is_complete(&record, REQUIRED_KEYS));
    }

    #[test]
    fn falsy_json_values() {
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!([])));
        assert!(!is_truthy(&json!({})));
        assert!(is_truthy(&json!(150)));
        assert!(is_truthy(&json!(" ")));
    }

    #[test]
    fn missing_fields_distinguish_absent_from_empty() {
        let mut record = complete_record();
        record.remove("email");
        record.insert("city".into(), json!(""));

        let missing = missing_fields(&record, REQUIRED_KEYS);
        assert_eq!(
            missing,
            vec![
                MissingField { key: "email".into(), kind: MissingKind::Missing },
                MissingField { key: "city".into(), kind: MissingKind::Empty },
            ]
        );
        assert_eq!(format_missing(&missing), "email (missing), city (empty)");
    }

    #[test]
    fn empty_value_is_never_a_duplicate() {
        let mut seen = DedupSet::new();
        assert!(!seen.is_duplicate(""));
        assert!(!seen.insert(""));
        seen.extend(["a", "b", "Comedy Night"]);
        assert!(!seen.is_duplicate(""));
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn duplicates_are_matched_after_normalization() {
        let mut seen = DedupSet::new();
        assert!(seen.insert("  Comedy Night "));
        assert!(seen.is_duplicate("comedy night"));
        assert!(seen.is_duplicate("COMEDY NIGHT  "));
        assert!(!seen.is_duplicate("Comedy Night II"));
        assert!(!seen.insert("comedy NIGHT"));
    }

    #[test]
    fn titles_only_count_when_enabled() {
        let mut by_link = SeenEvents::new(false);
        assert!(by_link.insert("http://x/1", "Late Show"));
        assert!(by_link.insert("http://x/2", "late show"));
        assert!(by_link.has_link("HTTP://X/2"));

        let mut by_title = SeenEvents::new(true);
        assert!(by_title.insert("http://x/1", "Late Show"));
        assert!(!by_title.insert("http://x/2", " late show"));
        assert!(!by_title.has_link("http://x/2"));
        assert_eq!(by_title.len(), 1);
    }
}
