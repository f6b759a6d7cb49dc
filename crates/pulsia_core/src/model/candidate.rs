//! Candidate records and view models.
//!
//! # Responsibility
//! - Define the persisted candidate record and its nested value types.
//! - Define the view model rebuilt from a record on every observed change.
//!
//! # Invariants
//! - `Candidate::id` always equals the id of the record it was built from.
//! - `CandidateStatus` is a closed set; unknown tags are rejected at the
//!   payload boundary, never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Stable identifier assigned by the remote store.
///
/// Kept opaque: the managed service uses UUID text, fixtures use short ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(String);

impl CandidateId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for CandidateId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CandidateId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CandidateId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Screening pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandidateStatus {
    /// Signal received, not yet screened.
    New,
    /// Diagnostic conversation in progress.
    Qualifying,
    /// Cleared for the expedition.
    Approved,
}

impl CandidateStatus {
    pub const ALL: [CandidateStatus; 3] = [Self::New, Self::Qualifying, Self::Approved];

    /// Canonical tag as persisted by the remote store.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Qualifying => "Qualifying",
            Self::Approved => "Approved",
        }
    }

    /// Parses a status tag, ignoring ASCII case and surrounding whitespace.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
    }

    /// Badge bucket used by queue renderers.
    pub fn badge_class(self) -> &'static str {
        match self {
            Self::New => "status-new",
            Self::Qualifying => "status-qualifying",
            Self::Approved => "status-approved",
        }
    }
}

impl Display for CandidateStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Author of one conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    Candidate,
    Agent,
}

/// One turn of the screening conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    /// Wall-clock label as stored (for example `14:02`).
    pub timestamp: String,
}

/// One axis of the diagnostic radar chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadarPoint {
    #[serde(rename = "trait")]
    pub trait_name: String,
    pub value: f64,
    #[serde(rename = "fullMark")]
    pub full_mark: f64,
}

/// Candidate row as owned by the remote store, after boundary validation.
///
/// Read-only to this layer: the registry never writes records back.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRecord {
    pub id: CandidateId,
    pub name: String,
    pub phone: String,
    pub status: CandidateStatus,
    pub diagnostic_score: i64,
    /// Stored avatar label; `None` or blank means "derive from name".
    pub avatar: Option<String>,
    pub role: String,
    pub last_message_time: DateTime<Utc>,
    pub conversation_history: Vec<ChatMessage>,
    pub radar_data: Vec<RadarPoint>,
    pub ai_insights: Vec<String>,
}

impl CandidateRecord {
    /// Creates a record with the required fields; the rest take empty defaults.
    pub fn new(
        id: impl Into<CandidateId>,
        name: impl Into<String>,
        status: CandidateStatus,
        last_message_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            phone: String::new(),
            status,
            diagnostic_score: 0,
            avatar: None,
            role: String::new(),
            last_message_time,
            conversation_history: Vec::new(),
            radar_data: Vec::new(),
            ai_insights: Vec::new(),
        }
    }
}

/// Display-ready candidate derived from one `CandidateRecord`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub phone: String,
    pub status: CandidateStatus,
    pub diagnostic_score: i64,
    /// Stored label, or initials derived from `name`.
    pub avatar: String,
    pub role: String,
    /// Raw activity timestamp, kept for re-rendering the label.
    pub last_message_at: DateTime<Utc>,
    /// Relative label such as `5m ago`; computed, never persisted.
    pub last_message_label: String,
    pub conversation_history: Vec<ChatMessage>,
    pub radar_data: Vec<RadarPoint>,
    pub ai_insights: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::{CandidateId, CandidateStatus};

    #[test]
    fn status_parse_ignores_case_and_whitespace() {
        assert_eq!(
            CandidateStatus::parse(" qualifying "),
            Some(CandidateStatus::Qualifying)
        );
        assert_eq!(CandidateStatus::parse("APPROVED"), Some(CandidateStatus::Approved));
        assert_eq!(CandidateStatus::parse("rejected"), None);
    }

    #[test]
    fn status_badge_classes_are_distinct() {
        let classes = CandidateStatus::ALL.map(CandidateStatus::badge_class);
        assert_eq!(classes, ["status-new", "status-qualifying", "status-approved"]);
    }

    #[test]
    fn candidate_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&CandidateId::from("c-1")).unwrap();
        assert_eq!(json, "\"c-1\"");
    }
}
