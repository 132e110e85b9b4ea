//! The process identity card
//!
//! A small key/value map describing the running process, broadcast to
//! handlers as an event at worker startup. Producers can extend it at
//! runtime by submitting events tagged `identity-card-update` whose text
//! is a JSON object; the worker merges them and suppresses no-op updates.

use std::collections::BTreeMap;

/// Process-level metadata map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityCard {
    entries: BTreeMap<String, String>,
}

impl IdentityCard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read one entry
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// All entries, sorted by key
    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    /// Insert or update one entry; returns whether anything changed
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        let value = value.into();
        if self.entries.get(&key) == Some(&value) {
            return false;
        }
        self.entries.insert(key, value);
        true
    }

    /// Merge a decoded payload; returns whether anything changed
    pub fn merge(&mut self, incoming: &BTreeMap<String, String>) -> bool {
        let mut changed = false;
        for (key, value) in incoming {
            if self.entries.get(key) != Some(value) {
                self.entries.insert(key.clone(), value.clone());
                changed = true;
            }
        }
        changed
    }

    /// Serialize the full card as the broadcast payload
    pub fn to_json(&self) -> String {
        // A string map cannot fail to serialize.
        serde_json::to_string(&self.entries).unwrap_or_default()
    }

    /// Decode an identity-card-update payload
    pub fn parse_payload(text: &str) -> serde_json::Result<BTreeMap<String, String>> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_reports_change() {
        let mut card = IdentityCard::new();
        assert!(card.set("host", "alpha"));
        assert!(!card.set("host", "alpha"));
        assert!(card.set("host", "beta"));
        assert_eq!(card.get("host"), Some("beta"));
    }

    #[test]
    fn test_merge_is_change_aware() {
        let mut card = IdentityCard::new();
        card.set("a", "1");

        let mut incoming = BTreeMap::new();
        incoming.insert("a".to_owned(), "1".to_owned());
        assert!(!card.merge(&incoming));

        incoming.insert("b".to_owned(), "2".to_owned());
        assert!(card.merge(&incoming));
        assert_eq!(card.get("b"), Some("2"));
    }

    #[test]
    fn test_json_round_trip() {
        let mut card = IdentityCard::new();
        card.set("app", "scribe");
        card.set("pid", "42");

        let decoded = IdentityCard::parse_payload(&card.to_json()).unwrap();
        assert_eq!(decoded.get("app").map(String::as_str), Some("scribe"));
        assert_eq!(decoded.get("pid").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(IdentityCard::parse_payload("[1, 2]").is_err());
        assert!(IdentityCard::parse_payload("not json").is_err());
    }
}
