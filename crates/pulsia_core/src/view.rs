//! View-model mapping for candidate records.
//!
//! # Responsibility
//! - Translate one `CandidateRecord` into one display-ready `Candidate`.
//! - Derive the relative activity label and the avatar fallback.
//!
//! # Invariants
//! - Mapping is total: every record yields exactly one view model.
//! - Mapping has no side effects; "now" is supplied by the caller.

use crate::model::candidate::{Candidate, CandidateId, CandidateRecord};
use chrono::{DateTime, Utc};

const MS_PER_MINUTE: i64 = 60_000;
const MINUTES_PER_HOUR: i64 = 60;

/// Builds the view model for `record` as seen at `now`.
pub fn to_view_model(record: CandidateRecord, now: DateTime<Utc>) -> Candidate {
    let avatar = match record.avatar {
        Some(label) if !label.trim().is_empty() => label,
        _ => derive_initials(&record.name),
    };
    let last_message_label = relative_time_label(record.last_message_time, now);

    Candidate {
        id: record.id,
        name: record.name,
        phone: record.phone,
        status: record.status,
        diagnostic_score: record.diagnostic_score,
        avatar,
        role: record.role,
        last_message_at: record.last_message_time,
        last_message_label,
        conversation_history: record.conversation_history,
        radar_data: record.radar_data,
        ai_insights: record.ai_insights,
    }
}

/// Renders elapsed time as `<n>m ago` below one hour, `<n>h ago` otherwise.
///
/// Minutes and hours are rounded to nearest. Timestamps at or after `now`
/// render as `0m ago`.
pub fn relative_time_label(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed_ms = now.signed_duration_since(at).num_milliseconds();
    if elapsed_ms <= 0 {
        return "0m ago".to_string();
    }

    let minutes = (elapsed_ms + MS_PER_MINUTE / 2) / MS_PER_MINUTE;
    if minutes < MINUTES_PER_HOUR {
        return format!("{minutes}m ago");
    }
    let hours = (minutes + MINUTES_PER_HOUR / 2) / MINUTES_PER_HOUR;
    format!("{hours}h ago")
}

/// Uppercased first letter of each whitespace-separated token.
pub fn derive_initials(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|token| token.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Resolves the candidate an external selection refers to.
///
/// Falls back to the first candidate when nothing (or a vanished id) is
/// selected. Selection state itself lives with the caller.
pub fn resolve_selection<'a>(
    candidates: &'a [Candidate],
    selected: Option<&CandidateId>,
) -> Option<&'a Candidate> {
    selected
        .and_then(|id| candidates.iter().find(|candidate| &candidate.id == id))
        .or_else(|| candidates.first())
}

#[cfg(test)]
mod tests {
    use super::{derive_initials, relative_time_label, resolve_selection, to_view_model};
    use crate::model::candidate::{CandidateId, CandidateRecord, CandidateStatus};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    #[test]
    fn relative_label_uses_minutes_below_one_hour() {
        assert_eq!(relative_time_label(now() - Duration::minutes(5), now()), "5m ago");
        assert_eq!(relative_time_label(now() - Duration::minutes(59), now()), "59m ago");
    }

    #[test]
    fn relative_label_switches_to_hours() {
        assert_eq!(relative_time_label(now() - Duration::minutes(125), now()), "2h ago");
        assert_eq!(relative_time_label(now() - Duration::minutes(60), now()), "1h ago");
        assert_eq!(relative_time_label(now() - Duration::minutes(90), now()), "2h ago");
    }

    #[test]
    fn relative_label_clamps_zero_and_future_to_zero_minutes() {
        assert_eq!(relative_time_label(now(), now()), "0m ago");
        assert_eq!(relative_time_label(now() + Duration::minutes(3), now()), "0m ago");
    }

    #[test]
    fn relative_label_rounds_to_nearest_minute() {
        assert_eq!(relative_time_label(now() - Duration::seconds(29), now()), "0m ago");
        assert_eq!(relative_time_label(now() - Duration::seconds(90), now()), "2m ago");
    }

    #[test]
    fn initials_are_uppercased_first_letters() {
        assert_eq!(derive_initials("Elena Vasquez"), "EV");
        assert_eq!(derive_initials("  viktor   drăgan "), "VD");
        assert_eq!(derive_initials(""), "");
    }

    #[test]
    fn mapper_prefers_stored_avatar_and_falls_back_to_initials() {
        let mut record = CandidateRecord::new(
            "1",
            "Elena Vasquez",
            CandidateStatus::Qualifying,
            now() - Duration::minutes(3),
        );
        assert_eq!(to_view_model(record.clone(), now()).avatar, "EV");

        record.avatar = Some("   ".to_string());
        assert_eq!(to_view_model(record.clone(), now()).avatar, "EV");

        record.avatar = Some("EVZ".to_string());
        let candidate = to_view_model(record, now());
        assert_eq!(candidate.avatar, "EVZ");
        assert_eq!(candidate.last_message_label, "3m ago");
        assert_eq!(candidate.id, CandidateId::from("1"));
    }

    #[test]
    fn selection_falls_back_to_first_candidate() {
        let candidates = vec![
            to_view_model(CandidateRecord::new("a", "A", CandidateStatus::New, now()), now()),
            to_view_model(CandidateRecord::new("b", "B", CandidateStatus::New, now()), now()),
        ];
        let b = CandidateId::from("b");
        let gone = CandidateId::from("zz");

        assert_eq!(resolve_selection(&candidates, Some(&b)).map(|c| c.id.as_str()), Some("b"));
        assert_eq!(resolve_selection(&candidates, Some(&gone)).map(|c| c.id.as_str()), Some("a"));
        assert_eq!(resolve_selection(&candidates, None).map(|c| c.id.as_str()), Some("a"));
        assert!(resolve_selection(&[], None).is_none());
    }
}
