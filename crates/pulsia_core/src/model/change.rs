//! Change notifications for the candidate collection.

use crate::model::candidate::{CandidateId, CandidateRecord};
use std::fmt::{Display, Formatter};

/// Kind of a change notification, independent of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Parses an event type tag (`INSERT`, `insert`, ...).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "insert" => Some(Self::Insert),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl Display for ChangeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validated change delivered by the change feed.
///
/// Events for the same id arrive in causal order; nothing is assumed across
/// distinct ids.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    Insert(CandidateRecord),
    Update(CandidateRecord),
    Delete(CandidateId),
}

impl ChangeEvent {
    pub fn kind(&self) -> ChangeKind {
        match self {
            Self::Insert(_) => ChangeKind::Insert,
            Self::Update(_) => ChangeKind::Update,
            Self::Delete(_) => ChangeKind::Delete,
        }
    }

    /// Identifier of the candidate this event targets.
    pub fn id(&self) -> &CandidateId {
        match self {
            Self::Insert(record) | Self::Update(record) => &record.id,
            Self::Delete(id) => id,
        }
    }
}
