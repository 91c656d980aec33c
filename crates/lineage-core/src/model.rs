//! Lineage input records.
//!
//! # Overview
//!
//! An [`Entity`] is an organization with a founding year, an optional
//! dissolution year, and a list of eras. An [`Event`] is a directed relation
//! between two entities at a given year. Both are produced by an external
//! data layer and are immutable for the duration of one layout run.
//!
//! ## Wire Shape
//!
//! Records use camelCase field names and SCREAMING_SNAKE_CASE event types so
//! the JSON emitted by the surrounding application can be read directly:
//!
//! ```json
//! { "id": "acme", "foundingYear": 1995, "dissolutionYear": 1997, "eras": [{ "year": 1995 }] }
//! { "sourceId": "acme", "targetId": "vega", "year": 1998, "type": "LEGAL_TRANSFER" }
//! ```

use chrono::Datelike;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A named period inside an entity's lifetime (sponsor name, rebrand, ...).
///
/// Only `year` matters to layout; extra fields from the data layer are
/// ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Era {
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Era {
    #[must_use]
    pub const fn new(year: i32) -> Self {
        Self { year, name: None }
    }
}

/// An organization with a lifetime on the time axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,
    pub founding_year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dissolution_year: Option<i32>,
    #[serde(default)]
    pub eras: Vec<Era>,
}

impl Entity {
    /// Create an entity with no eras.
    #[must_use]
    pub fn new(id: impl Into<String>, founding_year: i32, dissolution_year: Option<i32>) -> Self {
        Self {
            id: id.into(),
            founding_year,
            dissolution_year,
            eras: Vec::new(),
        }
    }

    /// The year this entity stops occupying its lane.
    ///
    /// An explicit dissolution year wins. Without one the entity is treated
    /// as still active: the end is the latest era year, or `current_year`
    /// when no era reaches past it.
    #[must_use]
    pub fn effective_end_year(&self, current_year: i32) -> i32 {
        if let Some(end) = self.dissolution_year {
            return end;
        }
        self.eras
            .iter()
            .map(|era| era.year)
            .fold(current_year, i32::max)
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// Kind of lineage relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// Direct legal continuation; the strong hand-off signal.
    LegalTransfer,
    SpiritualSuccession,
    Merge,
    Split,
}

impl EventKind {
    #[must_use]
    pub const fn is_legal_transfer(self) -> bool {
        matches!(self, Self::LegalTransfer)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LegalTransfer => "LEGAL_TRANSFER",
            Self::SpiritualSuccession => "SPIRITUAL_SUCCESSION",
            Self::Merge => "MERGE",
            Self::Split => "SPLIT",
        }
    }
}

/// Directed relation `source → target` at `year`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub source_id: String,
    pub target_id: String,
    pub year: i32,
    #[serde(rename = "type")]
    pub kind: EventKind,
}

impl Event {
    #[must_use]
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        year: i32,
        kind: EventKind,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            year,
            kind,
        }
    }
}

/// The current calendar year from the system clock.
#[must_use]
pub fn system_current_year() -> i32 {
    chrono::Utc::now().year()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dissolution_year_wins() {
        let mut e = Entity::new("a", 1990, Some(1995));
        e.eras.push(Era::new(2001));
        assert_eq!(e.effective_end_year(2024), 1995);
    }

    #[test]
    fn active_entity_runs_to_current_year() {
        let mut e = Entity::new("a", 1990, None);
        e.eras.push(Era::new(1990));
        e.eras.push(Era::new(2010));
        assert_eq!(e.effective_end_year(2024), 2024);
    }

    #[test]
    fn future_era_extends_past_current_year() {
        let mut e = Entity::new("a", 1990, None);
        e.eras.push(Era::new(2026));
        assert_eq!(e.effective_end_year(2024), 2026);
    }

    #[test]
    fn entity_json_uses_camel_case() {
        let json = r#"{"id":"x","foundingYear":2000,"eras":[{"year":2000,"sponsor":"ignored"}]}"#;
        let e: Entity = serde_json::from_str(json).expect("parse entity");
        assert_eq!(e.founding_year, 2000);
        assert_eq!(e.dissolution_year, None);
        assert_eq!(e.eras, vec![Era::new(2000)]);
    }

    #[test]
    fn event_type_is_screaming_snake_case() {
        let json = r#"{"sourceId":"a","targetId":"b","year":1998,"type":"LEGAL_TRANSFER"}"#;
        let ev: Event = serde_json::from_str(json).expect("parse event");
        assert_eq!(ev.kind, EventKind::LegalTransfer);
        assert!(ev.kind.is_legal_transfer());

        let out = serde_json::to_string(&Event::new("a", "b", 2001, EventKind::SpiritualSuccession))
            .expect("serialize event");
        assert!(out.contains(r#""type":"SPIRITUAL_SUCCESSION""#));
    }
}
