//! Candidate repository contract and SQLite implementation.

use crate::db::DbError;
use crate::model::candidate::{CandidateId, CandidateRecord, CandidateStatus};
use crate::payload::{format_timestamp, parse_timestamp};
use rusqlite::{params, Connection, ErrorCode, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

const CANDIDATE_SELECT_SQL: &str = "SELECT
    id,
    name,
    phone,
    status,
    diagnostic_score,
    avatar,
    role,
    last_message_time,
    conversation_history,
    radar_data,
    ai_insights
FROM candidates";

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Validation(String),
    Db(DbError),
    NotFound(CandidateId),
    Duplicate(CandidateId),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(message) => write!(f, "invalid candidate: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "candidate not found: {id}"),
            Self::Duplicate(id) => write!(f, "candidate already exists: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted candidate data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Listing options; results are always most-recent-activity first.
#[derive(Debug, Clone, Default)]
pub struct CandidateListQuery {
    pub status: Option<CandidateStatus>,
    pub limit: Option<u32>,
}

pub trait CandidateRepository {
    fn insert_candidate(&self, record: &CandidateRecord) -> RepoResult<()>;
    fn update_candidate(&self, record: &CandidateRecord) -> RepoResult<()>;
    fn delete_candidate(&self, id: &CandidateId) -> RepoResult<()>;
    fn get_candidate(&self, id: &CandidateId) -> RepoResult<Option<CandidateRecord>>;
    fn list_recent(&self, query: &CandidateListQuery) -> RepoResult<Vec<CandidateRecord>>;
}

pub struct SqliteCandidateRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCandidateRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CandidateRepository for SqliteCandidateRepository<'_> {
    fn insert_candidate(&self, record: &CandidateRecord) -> RepoResult<()> {
        validate_record(record)?;

        let result = self.conn.execute(
            "INSERT INTO candidates (
                id,
                name,
                phone,
                status,
                diagnostic_score,
                avatar,
                role,
                last_message_time,
                conversation_history,
                radar_data,
                ai_insights
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                record.id.as_str(),
                record.name.as_str(),
                record.phone.as_str(),
                record.status.as_str(),
                record.diagnostic_score,
                record.avatar.as_deref(),
                record.role.as_str(),
                format_timestamp(record.last_message_time),
                to_json_column(&record.conversation_history)?,
                to_json_column(&record.radar_data)?,
                to_json_column(&record.ai_insights)?,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(RepoError::Duplicate(record.id.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn update_candidate(&self, record: &CandidateRecord) -> RepoResult<()> {
        validate_record(record)?;

        let changed = self.conn.execute(
            "UPDATE candidates
             SET
                name = ?1,
                phone = ?2,
                status = ?3,
                diagnostic_score = ?4,
                avatar = ?5,
                role = ?6,
                last_message_time = ?7,
                conversation_history = ?8,
                radar_data = ?9,
                ai_insights = ?10,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?11;",
            params![
                record.name.as_str(),
                record.phone.as_str(),
                record.status.as_str(),
                record.diagnostic_score,
                record.avatar.as_deref(),
                record.role.as_str(),
                format_timestamp(record.last_message_time),
                to_json_column(&record.conversation_history)?,
                to_json_column(&record.radar_data)?,
                to_json_column(&record.ai_insights)?,
                record.id.as_str(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(record.id.clone()));
        }
        Ok(())
    }

    fn delete_candidate(&self, id: &CandidateId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM candidates WHERE id = ?1;", [id.as_str()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id.clone()));
        }
        Ok(())
    }

    fn get_candidate(&self, id: &CandidateId) -> RepoResult<Option<CandidateRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CANDIDATE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.as_str()])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_candidate_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_recent(&self, query: &CandidateListQuery) -> RepoResult<Vec<CandidateRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CANDIDATE_SELECT_SQL}
             WHERE (?1 IS NULL OR status = ?1)
             ORDER BY last_message_time DESC, id ASC
             LIMIT ?2;"
        ))?;
        let limit = query.limit.map_or(-1, i64::from);
        let mut rows = stmt.query(params![query.status.map(CandidateStatus::as_str), limit])?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_candidate_row(row)?);
        }
        Ok(records)
    }
}

fn validate_record(record: &CandidateRecord) -> RepoResult<()> {
    if record.id.as_str().trim().is_empty() {
        return Err(RepoError::Validation("id must not be blank".to_string()));
    }
    if record.name.trim().is_empty() {
        return Err(RepoError::Validation(format!(
            "name must not be blank for candidate {}",
            record.id
        )));
    }
    Ok(())
}

fn parse_candidate_row(row: &Row<'_>) -> RepoResult<CandidateRecord> {
    let id = CandidateId::new(row.get::<_, String>("id")?);

    let status_text: String = row.get("status")?;
    let status = CandidateStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_text}` for candidate {id}"))
    })?;

    let time_text: String = row.get("last_message_time")?;
    let last_message_time = parse_timestamp(&time_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid last_message_time `{time_text}` for candidate {id}"
        ))
    })?;

    Ok(CandidateRecord {
        name: row.get("name")?,
        phone: row.get("phone")?,
        status,
        diagnostic_score: row.get("diagnostic_score")?,
        avatar: row.get("avatar")?,
        role: row.get("role")?,
        last_message_time,
        conversation_history: from_json_column(row, "conversation_history", &id)?,
        radar_data: from_json_column(row, "radar_data", &id)?,
        ai_insights: from_json_column(row, "ai_insights", &id)?,
        id,
    })
}

fn to_json_column<T: Serialize>(value: &T) -> RepoResult<String> {
    serde_json::to_string(value).map_err(|err| RepoError::InvalidData(err.to_string()))
}

fn from_json_column<T: DeserializeOwned>(
    row: &Row<'_>,
    column: &str,
    id: &CandidateId,
) -> RepoResult<T> {
    let text: String = row.get(column)?;
    serde_json::from_str(&text).map_err(|err| {
        RepoError::InvalidData(format!("invalid {column} JSON for candidate {id}: {err}"))
    })
}
