//! Boundary parsing for remote-store payloads.
//!
//! # Responsibility
//! - Validate and normalize raw JSON rows into `CandidateRecord`.
//! - Validate raw change messages into `ChangeEvent`.
//! - Encode records back into the row shape for stores that emit payloads.
//!
//! # Invariants
//! - Nothing past this module sees an unvalidated payload.
//! - Optional row fields are normalized to empty values here, so domain code
//!   never handles absent strings or sequences.

use crate::model::candidate::{
    CandidateId, CandidateRecord, CandidateStatus, ChatMessage, RadarPoint,
};
use crate::model::change::{ChangeEvent, ChangeKind};
use chrono::{DateTime, SecondsFormat, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Raw change message as emitted by the remote change channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChange {
    pub event_type: String,
    pub identifier: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl RawChange {
    pub fn insert(record: &CandidateRecord) -> Self {
        Self::with_payload(ChangeKind::Insert, record)
    }

    pub fn update(record: &CandidateRecord) -> Self {
        Self::with_payload(ChangeKind::Update, record)
    }

    pub fn delete(id: &CandidateId) -> Self {
        Self {
            event_type: ChangeKind::Delete.as_str().to_ascii_uppercase(),
            identifier: Value::String(id.to_string()),
            payload: None,
        }
    }

    fn with_payload(kind: ChangeKind, record: &CandidateRecord) -> Self {
        Self {
            event_type: kind.as_str().to_ascii_uppercase(),
            identifier: Value::String(record.id.to_string()),
            payload: Some(encode_record(record)),
        }
    }
}

/// Rejection reasons for malformed remote payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    NotAnObject,
    Malformed(String),
    MissingField(&'static str),
    InvalidField { field: &'static str, reason: String },
    UnknownEventType(String),
    MissingPayload(ChangeKind),
    IdentifierMismatch { identifier: String, payload_id: String },
}

impl PayloadError {
    /// Stable machine-readable code for log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAnObject => "not_an_object",
            Self::Malformed(_) => "malformed",
            Self::MissingField(_) => "missing_field",
            Self::InvalidField { .. } => "invalid_field",
            Self::UnknownEventType(_) => "unknown_event_type",
            Self::MissingPayload(_) => "missing_payload",
            Self::IdentifierMismatch { .. } => "identifier_mismatch",
        }
    }
}

impl Display for PayloadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "candidate payload is not a JSON object"),
            Self::Malformed(message) => write!(f, "malformed candidate payload: {message}"),
            Self::MissingField(field) => write!(f, "candidate payload is missing `{field}`"),
            Self::InvalidField { field, reason } => {
                write!(f, "candidate payload field `{field}` is invalid: {reason}")
            }
            Self::UnknownEventType(value) => write!(f, "unknown change event type `{value}`"),
            Self::MissingPayload(kind) => write!(f, "{kind} change is missing its payload"),
            Self::IdentifierMismatch {
                identifier,
                payload_id,
            } => write!(
                f,
                "change identifier `{identifier}` does not match payload id `{payload_id}`"
            ),
        }
    }
}

impl Error for PayloadError {}

pub type PayloadResult<T> = Result<T, PayloadError>;

#[derive(Debug, Deserialize)]
struct RawCandidateRow {
    id: Option<Value>,
    name: Option<String>,
    phone: Option<String>,
    status: Option<String>,
    diagnostic_score: Option<f64>,
    avatar: Option<String>,
    role: Option<String>,
    last_message_time: Option<String>,
    conversation_history: Option<Vec<ChatMessage>>,
    radar_data: Option<Vec<RadarPoint>>,
    ai_insights: Option<Vec<String>>,
}

/// Parses one raw row into a validated record.
///
/// # Errors
/// - `id`, `name`, `status` and `last_message_time` are required.
/// - Nested sequences must match their element shapes exactly.
pub fn parse_record(value: &Value) -> PayloadResult<CandidateRecord> {
    if !value.is_object() {
        return Err(PayloadError::NotAnObject);
    }
    let row: RawCandidateRow = serde_json::from_value(value.clone())
        .map_err(|err| PayloadError::Malformed(err.to_string()))?;

    let id = parse_id(row.id.as_ref().ok_or(PayloadError::MissingField("id"))?)?;

    let name = row.name.ok_or(PayloadError::MissingField("name"))?;
    if name.trim().is_empty() {
        return Err(PayloadError::InvalidField {
            field: "name",
            reason: "must not be blank".to_string(),
        });
    }

    let status_text = row.status.ok_or(PayloadError::MissingField("status"))?;
    let status = CandidateStatus::parse(&status_text).ok_or_else(|| PayloadError::InvalidField {
        field: "status",
        reason: format!("unknown status `{status_text}`"),
    })?;

    let time_text = row
        .last_message_time
        .ok_or(PayloadError::MissingField("last_message_time"))?;
    let last_message_time = parse_timestamp(&time_text).ok_or_else(|| PayloadError::InvalidField {
        field: "last_message_time",
        reason: format!("`{time_text}` is not an RFC 3339 timestamp"),
    })?;

    let diagnostic_score = match row.diagnostic_score {
        None => 0,
        Some(score) if score.is_finite() => score.round() as i64,
        Some(_) => {
            return Err(PayloadError::InvalidField {
                field: "diagnostic_score",
                reason: "must be a finite number".to_string(),
            });
        }
    };

    Ok(CandidateRecord {
        id,
        name,
        phone: row.phone.unwrap_or_default(),
        status,
        diagnostic_score,
        avatar: row.avatar,
        role: row.role.unwrap_or_default(),
        last_message_time,
        conversation_history: row.conversation_history.unwrap_or_default(),
        radar_data: row.radar_data.unwrap_or_default(),
        ai_insights: row.ai_insights.unwrap_or_default(),
    })
}

/// Parses a batch of rows, dropping (and logging) rows that fail validation.
///
/// Returns the accepted records in input order plus the rejected count.
pub fn parse_rows(rows: &[Value]) -> (Vec<CandidateRecord>, usize) {
    let mut records = Vec::with_capacity(rows.len());
    let mut rejected = 0;
    for (index, row) in rows.iter().enumerate() {
        match parse_record(row) {
            Ok(record) => records.push(record),
            Err(err) => {
                rejected += 1;
                warn!(
                    "event=payload_reject module=payload status=skip source=snapshot row_index={} error_code={} error={}",
                    index,
                    err.code(),
                    err
                );
            }
        }
    }
    (records, rejected)
}

/// Validates a raw change message.
pub fn parse_change(raw: &RawChange) -> PayloadResult<ChangeEvent> {
    let kind = ChangeKind::parse(&raw.event_type)
        .ok_or_else(|| PayloadError::UnknownEventType(raw.event_type.clone()))?;
    let identifier = parse_id(&raw.identifier)?;

    if kind == ChangeKind::Delete {
        return Ok(ChangeEvent::Delete(identifier));
    }

    let payload = raw.payload.as_ref().ok_or(PayloadError::MissingPayload(kind))?;
    let record = parse_record(payload)?;
    if record.id != identifier {
        return Err(PayloadError::IdentifierMismatch {
            identifier: identifier.to_string(),
            payload_id: record.id.to_string(),
        });
    }

    Ok(match kind {
        ChangeKind::Insert => ChangeEvent::Insert(record),
        _ => ChangeEvent::Update(record),
    })
}

/// Encodes a record in the remote row shape.
pub fn encode_record(record: &CandidateRecord) -> Value {
    json!({
        "id": record.id.as_str(),
        "name": record.name,
        "phone": record.phone,
        "status": record.status.as_str(),
        "diagnostic_score": record.diagnostic_score,
        "avatar": record.avatar,
        "role": record.role,
        "last_message_time": format_timestamp(record.last_message_time),
        "conversation_history": record.conversation_history,
        "radar_data": record.radar_data,
        "ai_insights": record.ai_insights,
    })
}

/// Formats a timestamp the way rows carry it (RFC 3339, UTC, millis).
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses RFC 3339, falling back to the `YYYY-MM-DD HH:MM:SS+ZZ` form
/// Postgres uses for `timestamptz` text output.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    DateTime::parse_from_rfc3339(trimmed)
        .or_else(|_| DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f%#z"))
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

fn parse_id(value: &Value) -> PayloadResult<CandidateId> {
    let text = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) if number.is_i64() || number.is_u64() => number.to_string(),
        Value::Object(map) => match map.get("id") {
            // Delete notifications may carry the old row key object instead of a scalar.
            Some(inner) if !inner.is_object() => return parse_id(inner),
            _ => String::new(),
        },
        _ => String::new(),
    };
    if text.is_empty() {
        return Err(PayloadError::InvalidField {
            field: "id",
            reason: format!("expected a non-empty string or integer, got `{value}`"),
        });
    }
    Ok(CandidateId::new(text))
}

#[cfg(test)]
mod tests {
    use super::{encode_record, parse_change, parse_record, parse_rows, PayloadError, RawChange};
    use crate::model::candidate::{CandidateId, CandidateRecord, CandidateStatus, Sender};
    use crate::model::change::{ChangeEvent, ChangeKind};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn minimal_row() -> serde_json::Value {
        json!({
            "id": "c-1",
            "name": "Elena Vasquez",
            "status": "Qualifying",
            "last_message_time": "2026-10-18T12:00:00+00:00",
        })
    }

    #[test]
    fn parse_record_defaults_optional_fields() {
        let record = parse_record(&minimal_row()).expect("minimal row should parse");
        assert_eq!(record.id, CandidateId::from("c-1"));
        assert_eq!(record.phone, "");
        assert_eq!(record.role, "");
        assert_eq!(record.avatar, None);
        assert_eq!(record.diagnostic_score, 0);
        assert!(record.conversation_history.is_empty());
        assert!(record.radar_data.is_empty());
        assert!(record.ai_insights.is_empty());
    }

    #[test]
    fn parse_record_treats_null_sequences_as_empty_and_rounds_score() {
        let mut row = minimal_row();
        row["ai_insights"] = json!(null);
        row["conversation_history"] = json!([
            {"id": "1", "sender": "agent", "text": "Welcome.", "timestamp": "12:00"}
        ]);
        row["radar_data"] = json!([{"trait": "Mental Calm", "value": 94, "fullMark": 100}]);
        row["diagnostic_score"] = json!(86.6);

        let record = parse_record(&row).expect("row should parse");
        assert!(record.ai_insights.is_empty());
        assert_eq!(record.conversation_history[0].sender, Sender::Agent);
        assert_eq!(record.radar_data[0].trait_name, "Mental Calm");
        assert_eq!(record.diagnostic_score, 87);
    }

    #[test]
    fn parse_record_accepts_integer_ids_and_postgres_timestamps() {
        let mut row = minimal_row();
        row["id"] = json!(42);
        row["last_message_time"] = json!("2026-10-18 12:00:00.123+00");

        let record = parse_record(&row).expect("row should parse");
        assert_eq!(record.id.as_str(), "42");
        assert_eq!(
            record.last_message_time.timestamp_millis(),
            Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap().timestamp_millis() + 123
        );
    }

    #[test]
    fn parse_record_rejects_missing_and_invalid_fields() {
        let mut row = minimal_row();
        row.as_object_mut().unwrap().remove("name");
        assert_eq!(parse_record(&row), Err(PayloadError::MissingField("name")));

        let mut row = minimal_row();
        row["status"] = json!("Rejected");
        assert!(matches!(
            parse_record(&row),
            Err(PayloadError::InvalidField { field: "status", .. })
        ));

        let mut row = minimal_row();
        row["last_message_time"] = json!("yesterday");
        assert!(matches!(
            parse_record(&row),
            Err(PayloadError::InvalidField {
                field: "last_message_time",
                ..
            })
        ));

        assert_eq!(parse_record(&json!([1, 2])), Err(PayloadError::NotAnObject));
    }

    #[test]
    fn parse_rows_skips_malformed_rows_and_counts_them() {
        let rows = vec![minimal_row(), json!({"id": "broken"}), json!("nope")];
        let (records, rejected) = parse_rows(&rows);
        assert_eq!(records.len(), 1);
        assert_eq!(rejected, 2);
    }

    #[test]
    fn parse_change_handles_each_event_type() {
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        let record = CandidateRecord::new("c-9", "Yuki Tanaka", CandidateStatus::Approved, at);

        let insert = parse_change(&RawChange::insert(&record)).expect("insert should parse");
        assert_eq!(insert, ChangeEvent::Insert(record.clone()));

        let update = parse_change(&RawChange::update(&record)).expect("update should parse");
        assert_eq!(update.kind(), ChangeKind::Update);

        let delete = parse_change(&RawChange::delete(&record.id)).expect("delete should parse");
        assert_eq!(delete, ChangeEvent::Delete(record.id.clone()));
    }

    #[test]
    fn parse_change_rejects_bad_messages() {
        let at = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        let record = CandidateRecord::new("c-9", "Yuki Tanaka", CandidateStatus::Approved, at);

        let unknown = RawChange {
            event_type: "TRUNCATE".to_string(),
            identifier: json!("c-9"),
            payload: None,
        };
        assert!(matches!(
            parse_change(&unknown),
            Err(PayloadError::UnknownEventType(_))
        ));

        let missing = RawChange {
            event_type: "update".to_string(),
            identifier: json!("c-9"),
            payload: None,
        };
        assert_eq!(
            parse_change(&missing),
            Err(PayloadError::MissingPayload(ChangeKind::Update))
        );

        let mismatch = RawChange {
            event_type: "insert".to_string(),
            identifier: json!("c-10"),
            payload: Some(encode_record(&record)),
        };
        assert!(matches!(
            parse_change(&mismatch),
            Err(PayloadError::IdentifierMismatch { .. })
        ));
    }

    #[test]
    fn delete_accepts_old_row_key_object() {
        let raw = RawChange {
            event_type: "DELETE".to_string(),
            identifier: json!({"id": 7}),
            payload: None,
        };
        assert_eq!(
            parse_change(&raw),
            Ok(ChangeEvent::Delete(CandidateId::from("7")))
        );
    }

    #[test]
    fn raw_change_deserializes_from_camel_case_message() {
        let raw: RawChange = serde_json::from_value(json!({
            "eventType": "DELETE",
            "identifier": "c-3",
        }))
        .expect("message should deserialize");
        assert_eq!(raw.payload, None);
        assert_eq!(
            parse_change(&raw),
            Ok(ChangeEvent::Delete(CandidateId::from("c-3")))
        );
    }
}
