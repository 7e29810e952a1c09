use crate::constants::REQUIRED_KEYS;
use crate::validation::{format_missing, missing_fields, MissingField};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// A complete comedy event as persisted to the detail CSV.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub title: String,
    pub venue: String,
    pub summary: String,
    pub address: String,
    pub email: String,
    pub city: String,
    pub province: String,
    pub producers: String,
    pub event_link: String,
    pub date: String,

    pub price: Option<String>,
    pub capacity: Option<String>,
    pub duration: Option<String>,
    pub performers: Option<String>,
    pub age_restriction: Option<String>,
}

impl EventRecord {
    /// Builds a record from loosely typed extraction output. Fails with the
    /// list of required fields that are absent or empty.
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, Vec<MissingField>> {
        let missing = missing_fields(fields, REQUIRED_KEYS);
        if !missing.is_empty() {
            return Err(missing);
        }

        let required = |key: &str| fields.get(key).and_then(value_to_string).unwrap_or_default();
        let optional = |key: &str| fields.get(key).and_then(value_to_string);

        Ok(Self {
            title: required("title"),
            venue: required("venue"),
            summary: required("summary"),
            address: required("address"),
            email: required("email"),
            city: required("city"),
            province: required("province"),
            producers: required("producers"),
            event_link: required("event_link"),
            date: required("date"),
            price: optional("price"),
            capacity: optional("capacity"),
            duration: optional("duration"),
            performers: optional("performers"),
            age_restriction: optional("age_restriction"),
        })
    }

    /// Rebuilds a record from a CSV row keyed by column name.
    pub fn from_row(row: &BTreeMap<String, String>) -> Result<Self, Vec<MissingField>> {
        let fields: Map<String, Value> = row
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Self::from_fields(&fields)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "title" => Some(&self.title),
            "venue" => Some(&self.venue),
            "summary" => Some(&self.summary),
            "address" => Some(&self.address),
            "email" => Some(&self.email),
            "city" => Some(&self.city),
            "province" => Some(&self.province),
            "producers" => Some(&self.producers),
            "event_link" => Some(&self.event_link),
            "date" => Some(&self.date),
            "price" => self.price.as_deref(),
            "capacity" => self.capacity.as_deref(),
            "duration" => self.duration.as_deref(),
            "performers" => self.performers.as_deref(),
            "age_restriction" => self.age_restriction.as_deref(),
            _ => None,
        }
    }

    /// Values in detail-CSV column order.
    pub fn csv_row(&self) -> Vec<&str> {
        REQUIRED_KEYS
            .iter()
            .map(|key| self.get(key).unwrap_or(""))
            .collect()
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        // Performer lists sometimes come back as arrays of names
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(value_to_string)
                .collect::<Vec<_>>()
                .join(", "),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

/// Why a single event page produced no record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractionFailure {
    #[error("page fetch failed: {0}")]
    Fetch(String),

    #[error("extraction call failed: {0}")]
    Extraction(String),

    #[error("malformed JSON in extraction result: {0}")]
    MalformedJson(String),

    #[error("extraction returned an empty list")]
    EmptyList,

    #[error("extraction returned {0} instead of an object")]
    NotAnObject(&'static str),

    #[error("missing or empty fields: {}", format_missing(.0))]
    Incomplete(Vec<MissingField>),
}

impl ExtractionFailure {
    /// Short label for metrics and summaries.
    pub fn reason(&self) -> &'static str {
        match self {
            ExtractionFailure::Fetch(_) => "fetch",
            ExtractionFailure::Extraction(_) => "extraction",
            ExtractionFailure::MalformedJson(_) => "malformed_json",
            ExtractionFailure::EmptyList => "empty_list",
            ExtractionFailure::NotAnObject(_) => "not_an_object",
            ExtractionFailure::Incomplete(_) => "incomplete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::MissingKind;
    use serde_json::json;

    #[test]
    fn builds_record_and_stringifies_scalars() {
        let fields = json!({
            "title": "Late Show",
            "venue": "Comedy Bar",
            "summary": "Headliners",
            "address": "945 Bloor St W",
            "email": "Not provided",
            "city": "Toronto",
            "province": "Ontario",
            "producers": "Comedy Bar",
            "event_link": "https://www.eventbrite.ca/e/late-show-1",
            "date": "2025-11-01 9:30 PM",
            "capacity": 150,
            "performers": ["Ana", "Ben"],
            "price": null
        });

        let record = EventRecord::from_fields(fields.as_object().unwrap()).unwrap();
        assert_eq!(record.capacity.as_deref(), Some("150"));
        assert_eq!(record.performers.as_deref(), Some("Ana, Ben"));
        assert_eq!(record.price, None);
        assert_eq!(record.csv_row()[0], "Late Show");
        assert_eq!(record.csv_row()[8], "https://www.eventbrite.ca/e/late-show-1");
    }

    #[test]
    fn incomplete_fields_are_reported() {
        let fields = json!({ "title": "Late Show", "venue": "" });
        let missing = EventRecord::from_fields(fields.as_object().unwrap()).unwrap_err();
        assert_eq!(missing[0], MissingField { key: "venue".into(), kind: MissingKind::Empty });
        assert_eq!(missing.len(), REQUIRED_KEYS.len() - 1);
    }

    #[test]
    fn failure_message_lists_fields() {
        let failure = ExtractionFailure::Incomplete(vec![
            MissingField { key: "email".into(), kind: MissingKind::Missing },
            MissingField { key: "date".into(), kind: MissingKind::Empty },
        ]);
        assert_eq!(failure.to_string(), "missing or empty fields: email (missing), date (empty)");
        assert_eq!(failure.reason(), "incomplete");
    }
}
