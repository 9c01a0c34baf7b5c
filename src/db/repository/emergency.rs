use std::str::FromStr;

use chrono::{Duration, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::emergency::{
    ClassificationSummary, EmergencyRecord, InstructionStep, LocationInfo, NotificationRecord,
    MAX_RETRY_COUNT,
};
use crate::models::enums::{
    DeliveryStatus, EmergencyCategory, EmergencyStatus, NotificationMethod, RiskLevel,
    StepPriority,
};

use super::{format_ts, parse_ts, parse_uuid};

// ═══════════════════════════════════════════════════════════
// Aggregate persistence
// ═══════════════════════════════════════════════════════════

/// Persist a freshly created emergency with its instruction list.
/// One transaction — the record either exists completely or not at all.
pub fn insert_emergency(
    conn: &mut Connection,
    record: &EmergencyRecord,
) -> Result<(), DatabaseError> {
    let tx = conn.transaction()?;

    let location = record.location.as_ref();
    tx.execute(
        "INSERT INTO emergencies
         (id, user_id, category, severity, status, version,
          longitude, latitude, street, city, state, zip_code, country, location_captured_at,
          ai_confidence, ai_subtype, ai_risk, ai_reasoning, ai_captured_at,
          resolved_at, resolution_notes, response_time_secs, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                 ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)",
        params![
            record.id.to_string(),
            record.user_id,
            record.category.as_str(),
            record.severity.as_str(),
            record.status.as_str(),
            record.version,
            location.and_then(|l| l.longitude),
            location.and_then(|l| l.latitude),
            location.and_then(|l| l.street.clone()),
            location.and_then(|l| l.city.clone()),
            location.and_then(|l| l.state.clone()),
            location.and_then(|l| l.zip_code.clone()),
            location.and_then(|l| l.country.clone()),
            location.and_then(|l| l.captured_at.map(format_ts)),
            record.ai_analysis.confidence_score,
            record.ai_analysis.detected_subtype,
            record.ai_analysis.risk_assessment.as_str(),
            record.ai_analysis.reasoning,
            format_ts(record.ai_analysis.captured_at),
            record.resolved_at.map(format_ts),
            record.resolution_notes,
            record.response_time_secs,
            format_ts(record.created_at),
            format_ts(record.updated_at),
        ],
    )?;

    for step in &record.instructions {
        tx.execute(
            "INSERT INTO instruction_steps
             (emergency_id, step_number, title, description, estimated_secs, priority,
              safety_note, completed, completed_at, ai_generated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.id.to_string(),
                step.step_number,
                step.title,
                step.description,
                step.estimated_secs,
                step.priority.as_str(),
                step.safety_note,
                step.completed as i32,
                step.completed_at.map(format_ts),
                step.ai_generated as i32,
            ],
        )?;
    }

    tx.commit()?;
    Ok(())
}

/// Load the full aggregate: record, ordered steps, ordered notifications.
pub fn get_emergency(conn: &Connection, id: Uuid) -> Result<EmergencyRecord, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, category, severity, status, version,
                longitude, latitude, street, city, state, zip_code, country, location_captured_at,
                ai_confidence, ai_subtype, ai_risk, ai_reasoning, ai_captured_at,
                resolved_at, resolution_notes, response_time_secs, created_at, updated_at
         FROM emergencies WHERE id = ?1",
    )?;

    let record = stmt
        .query_row(params![id.to_string()], |row| {
            Ok(RawEmergency {
                id: row.get(0)?,
                user_id: row.get(1)?,
                category: row.get(2)?,
                severity: row.get(3)?,
                status: row.get(4)?,
                version: row.get(5)?,
                longitude: row.get(6)?,
                latitude: row.get(7)?,
                street: row.get(8)?,
                city: row.get(9)?,
                state: row.get(10)?,
                zip_code: row.get(11)?,
                country: row.get(12)?,
                location_captured_at: row.get(13)?,
                ai_confidence: row.get(14)?,
                ai_subtype: row.get(15)?,
                ai_risk: row.get(16)?,
                ai_reasoning: row.get(17)?,
                ai_captured_at: row.get(18)?,
                resolved_at: row.get(19)?,
                resolution_notes: row.get(20)?,
                response_time_secs: row.get(21)?,
                created_at: row.get(22)?,
                updated_at: row.get(23)?,
            })
        })
        .optional()?
        .ok_or_else(|| DatabaseError::NotFound {
            entity_type: "Emergency".into(),
            id: id.to_string(),
        })?;

    let mut record = record.into_record()?;
    record.instructions = load_steps(conn, id)?;
    record.notifications = load_notifications(conn, id)?;
    Ok(record)
}

struct RawEmergency {
    id: String,
    user_id: String,
    category: String,
    severity: String,
    status: String,
    version: i64,
    longitude: Option<f64>,
    latitude: Option<f64>,
    street: Option<String>,
    city: Option<String>,
    state: Option<String>,
    zip_code: Option<String>,
    country: Option<String>,
    location_captured_at: Option<String>,
    ai_confidence: f64,
    ai_subtype: String,
    ai_risk: String,
    ai_reasoning: String,
    ai_captured_at: String,
    resolved_at: Option<String>,
    resolution_notes: Option<String>,
    response_time_secs: Option<i64>,
    created_at: String,
    updated_at: String,
}

impl RawEmergency {
    fn into_record(self) -> Result<EmergencyRecord, DatabaseError> {
        let has_location = self.longitude.is_some()
            || self.latitude.is_some()
            || self.street.is_some()
            || self.city.is_some()
            || self.state.is_some()
            || self.zip_code.is_some()
            || self.country.is_some();

        let location = if has_location {
            Some(LocationInfo {
                longitude: self.longitude,
                latitude: self.latitude,
                street: self.street,
                city: self.city,
                state: self.state,
                zip_code: self.zip_code,
                country: self.country,
                captured_at: self
                    .location_captured_at
                    .as_deref()
                    .map(parse_ts)
                    .transpose()?,
            })
        } else {
            None
        };

        Ok(EmergencyRecord {
            id: parse_uuid(&self.id)?,
            user_id: self.user_id,
            category: EmergencyCategory::from_str(&self.category)?,
            severity: RiskLevel::from_str(&self.severity)?,
            status: EmergencyStatus::from_str(&self.status)?,
            version: self.version,
            location,
            ai_analysis: ClassificationSummary {
                confidence_score: self.ai_confidence,
                detected_subtype: self.ai_subtype,
                risk_assessment: RiskLevel::from_str(&self.ai_risk)?,
                reasoning: self.ai_reasoning,
                captured_at: parse_ts(&self.ai_captured_at)?,
            },
            instructions: vec![],
            notifications: vec![],
            resolved_at: self.resolved_at.as_deref().map(parse_ts).transpose()?,
            resolution_notes: self.resolution_notes,
            response_time_secs: self.response_time_secs,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

fn load_steps(conn: &Connection, id: Uuid) -> Result<Vec<InstructionStep>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT step_number, title, description, estimated_secs, priority, safety_note,
                completed, completed_at, ai_generated
         FROM instruction_steps WHERE emergency_id = ?1 ORDER BY step_number ASC",
    )?;
    let rows = stmt.query_map(params![id.to_string()], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
            row.get::<_, i32>(6)?,
            row.get::<_, Option<String>>(7)?,
            row.get::<_, i32>(8)?,
        ))
    })?;

    let mut steps = Vec::new();
    for row in rows {
        let (number, title, description, secs, priority, note, completed, completed_at, ai) =
            row?;
        steps.push(InstructionStep {
            step_number: number,
            title,
            description,
            estimated_secs: secs,
            priority: StepPriority::from_str(&priority)?,
            safety_note: note,
            completed: completed != 0,
            completed_at: completed_at.as_deref().map(parse_ts).transpose()?,
            ai_generated: ai != 0,
        });
    }
    Ok(steps)
}

fn load_notifications(
    conn: &Connection,
    id: Uuid,
) -> Result<Vec<NotificationRecord>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, contact_id, method, sent_at, status, provider, message_id, retry_count,
                device_token, position
         FROM notifications WHERE emergency_id = ?1 ORDER BY position ASC",
    )?;
    let rows = stmt.query_map(params![id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
            row.get::<_, i64>(7)?,
            row.get::<_, Option<String>>(8)?,
            row.get::<_, i64>(9)?,
        ))
    })?;

    let mut notifications = Vec::new();
    for row in rows {
        let (id, contact_id, method, sent_at, status, provider, message_id, retries, token, pos) =
            row?;
        notifications.push(NotificationRecord {
            id: parse_uuid(&id)?,
            contact_id: contact_id.as_deref().map(parse_uuid).transpose()?,
            method: NotificationMethod::from_str(&method)?,
            sent_at: parse_ts(&sent_at)?,
            status: DeliveryStatus::from_str(&status)?,
            provider,
            message_id,
            retry_count: retries,
            device_token: token,
            position: pos,
        });
    }
    Ok(notifications)
}

fn require_version(conn: &Connection, id: Uuid) -> Result<i64, DatabaseError> {
    conn.query_row(
        "SELECT version FROM emergencies WHERE id = ?1",
        params![id.to_string()],
        |row| row.get::<_, i64>(0),
    )
    .optional()?
    .ok_or_else(|| DatabaseError::NotFound {
        entity_type: "Emergency".into(),
        id: id.to_string(),
    })
}

fn bump_version(conn: &Connection, id: Uuid, now: NaiveDateTime) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE emergencies SET version = version + 1, updated_at = ?2 WHERE id = ?1",
        params![id.to_string(), format_ts(now)],
    )?;
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// Lifecycle transitions
// ═══════════════════════════════════════════════════════════

/// Result of a step-completion call.
#[derive(Debug, Clone, Serialize)]
pub struct StepCompletion {
    pub step: InstructionStep,
    pub completed_steps: i64,
    pub total_steps: i64,
    pub all_steps_completed: bool,
}

/// Mark one instruction step complete. Idempotent: re-completing an already
/// completed step changes nothing (its original completion timestamp stands)
/// and reports current counts.
pub fn complete_step(
    conn: &mut Connection,
    id: Uuid,
    step_number: i64,
) -> Result<StepCompletion, DatabaseError> {
    let tx = conn.transaction()?;
    require_version(&tx, id)?;

    let existing: Option<(i32, Option<String>)> = tx
        .query_row(
            "SELECT completed, completed_at FROM instruction_steps
             WHERE emergency_id = ?1 AND step_number = ?2",
            params![id.to_string(), step_number],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((completed, _)) = existing else {
        return Err(DatabaseError::NotFound {
            entity_type: "InstructionStep".into(),
            id: format!("{id}/{step_number}"),
        });
    };

    let now = Utc::now().naive_utc();
    if completed == 0 {
        tx.execute(
            "UPDATE instruction_steps SET completed = 1, completed_at = ?3
             WHERE emergency_id = ?1 AND step_number = ?2",
            params![id.to_string(), step_number, format_ts(now)],
        )?;
        bump_version(&tx, id, now)?;
    }

    let (completed_steps, total_steps): (i64, i64) = tx.query_row(
        "SELECT SUM(completed), COUNT(*) FROM instruction_steps WHERE emergency_id = ?1",
        params![id.to_string()],
        |row| Ok((row.get::<_, Option<i64>>(0)?.unwrap_or(0), row.get(1)?)),
    )?;
    tx.commit()?;

    let record = get_emergency(conn, id)?;
    let step = record
        .find_step(step_number)
        .cloned()
        .ok_or_else(|| DatabaseError::NotFound {
            entity_type: "InstructionStep".into(),
            id: format!("{id}/{step_number}"),
        })?;

    Ok(StepCompletion {
        step,
        completed_steps,
        total_steps,
        all_steps_completed: completed_steps == total_steps && total_steps > 0,
    })
}

/// Default notes applied when the caller supplies none.
pub const DEFAULT_RESOLUTION_NOTES: &str = "Emergency resolved by user";

/// Resolve an active emergency. Any other starting status is a `Conflict`;
/// re-resolving never succeeds.
pub fn resolve_emergency(
    conn: &mut Connection,
    id: Uuid,
    notes: Option<&str>,
) -> Result<EmergencyRecord, DatabaseError> {
    resolve_emergency_at(conn, id, notes, Utc::now().naive_utc())
}

/// Resolution with an injectable clock (exposed for tests).
pub fn resolve_emergency_at(
    conn: &mut Connection,
    id: Uuid,
    notes: Option<&str>,
    now: NaiveDateTime,
) -> Result<EmergencyRecord, DatabaseError> {
    let tx = conn.transaction()?;

    let row: Option<(String, String)> = tx
        .query_row(
            "SELECT status, created_at FROM emergencies WHERE id = ?1",
            params![id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((status, created_at)) = row else {
        return Err(DatabaseError::NotFound {
            entity_type: "Emergency".into(),
            id: id.to_string(),
        });
    };

    let status = EmergencyStatus::from_str(&status)?;
    if status == EmergencyStatus::Resolved {
        return Err(DatabaseError::Conflict("Emergency is already resolved".into()));
    }
    if status != EmergencyStatus::Active {
        return Err(DatabaseError::Conflict(format!(
            "Emergency is {} and cannot be resolved",
            status.as_str()
        )));
    }

    let created_at = parse_ts(&created_at)?;
    // Whole seconds, floored.
    let response_time = (now - created_at).num_seconds().max(0);

    tx.execute(
        "UPDATE emergencies
         SET status = 'resolved', resolved_at = ?2, resolution_notes = ?3,
             response_time_secs = ?4, version = version + 1, updated_at = ?2
         WHERE id = ?1",
        params![
            id.to_string(),
            format_ts(now),
            notes.filter(|n| !n.trim().is_empty()).unwrap_or(DEFAULT_RESOLUTION_NOTES),
            response_time,
        ],
    )?;
    tx.commit()?;

    get_emergency(conn, id)
}

// ═══════════════════════════════════════════════════════════
// Notification list mutations
// ═══════════════════════════════════════════════════════════

/// Append notification attempts to the record. The list is append-only;
/// positions are re-based onto the current tail so concurrent callers can
/// never interleave within a batch. `expected_version` guards against a
/// dispatch racing a retry on the same record.
pub fn append_notifications(
    conn: &mut Connection,
    emergency_id: Uuid,
    records: &[NotificationRecord],
    expected_version: Option<i64>,
) -> Result<Vec<NotificationRecord>, DatabaseError> {
    let tx = conn.transaction()?;
    let version = require_version(&tx, emergency_id)?;
    if let Some(expected) = expected_version {
        if version != expected {
            return Err(DatabaseError::StaleVersion {
                id: emergency_id.to_string(),
                expected,
            });
        }
    }

    let base: i64 = tx.query_row(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM notifications WHERE emergency_id = ?1",
        params![emergency_id.to_string()],
        |row| row.get(0),
    )?;

    let mut appended = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        let mut record = record.clone();
        record.position = base + i as i64;
        tx.execute(
            "INSERT INTO notifications
             (id, emergency_id, contact_id, method, sent_at, status, provider, message_id,
              retry_count, device_token, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.id.to_string(),
                emergency_id.to_string(),
                record.contact_id.map(|c| c.to_string()),
                record.method.as_str(),
                format_ts(record.sent_at),
                record.status.as_str(),
                record.provider,
                record.message_id,
                record.retry_count,
                record.device_token,
                record.position,
            ],
        )?;
        appended.push(record);
    }

    bump_version(&tx, emergency_id, Utc::now().naive_utc())?;
    tx.commit()?;
    Ok(appended)
}

/// Notifications eligible for retry: failed or pending, under the cap.
pub fn retryable_notifications(
    conn: &Connection,
    emergency_id: Uuid,
) -> Result<Vec<NotificationRecord>, DatabaseError> {
    require_version(conn, emergency_id)?;
    let all = load_notifications(conn, emergency_id)?;
    Ok(all
        .into_iter()
        .filter(|n| n.status.is_retryable() && n.retry_count < MAX_RETRY_COUNT)
        .collect())
}

/// Record that a retry attempt is starting. The increment is persisted
/// before the send so a crash mid-retry can never under-count attempts.
pub fn mark_retry_attempt(
    conn: &Connection,
    emergency_id: Uuid,
    notification_id: Uuid,
) -> Result<i64, DatabaseError> {
    let changed = conn.execute(
        "UPDATE notifications SET retry_count = retry_count + 1
         WHERE id = ?1 AND retry_count < ?2",
        params![notification_id.to_string(), MAX_RETRY_COUNT],
    )?;
    if changed == 0 {
        return Err(DatabaseError::Conflict(format!(
            "Notification {notification_id} has exhausted its retries"
        )));
    }
    bump_version(conn, emergency_id, Utc::now().naive_utc())?;
    conn.query_row(
        "SELECT retry_count FROM notifications WHERE id = ?1",
        params![notification_id.to_string()],
        |row| row.get(0),
    )
    .map_err(Into::into)
}

/// Apply a retry's send result. Success overwrites status and message id;
/// failure pins the status to `failed`. The send timestamp always moves.
pub fn record_retry_outcome(
    conn: &Connection,
    emergency_id: Uuid,
    notification_id: Uuid,
    status: DeliveryStatus,
    message_id: Option<&str>,
    sent_at: NaiveDateTime,
) -> Result<(), DatabaseError> {
    match message_id {
        Some(message_id) => {
            conn.execute(
                "UPDATE notifications SET status = ?2, message_id = ?3, sent_at = ?4 WHERE id = ?1",
                params![
                    notification_id.to_string(),
                    status.as_str(),
                    message_id,
                    format_ts(sent_at)
                ],
            )?;
        }
        None => {
            conn.execute(
                "UPDATE notifications SET status = ?2, sent_at = ?3 WHERE id = ?1",
                params![notification_id.to_string(), status.as_str(), format_ts(sent_at)],
            )?;
        }
    }
    bump_version(conn, emergency_id, Utc::now().naive_utc())?;
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// History & analytics queries
// ═══════════════════════════════════════════════════════════

/// Filters for the history listing.
#[derive(Debug, Clone)]
pub struct HistoryFilter {
    pub user_id: String,
    pub start_date: Option<NaiveDateTime>,
    pub end_date: Option<NaiveDateTime>,
    pub category: Option<EmergencyCategory>,
    pub status: Option<EmergencyStatus>,
    pub page: i64,
    pub limit: i64,
}

impl HistoryFilter {
    pub fn for_user(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            start_date: None,
            end_date: None,
            category: None,
            status: None,
            page: 1,
            limit: 20,
        }
    }

    fn where_clause(&self) -> (String, Vec<Box<dyn rusqlite::types::ToSql>>) {
        let mut clauses = vec!["user_id = ?".to_string()];
        let mut args: Vec<Box<dyn rusqlite::types::ToSql>> =
            vec![Box::new(self.user_id.clone())];
        if let Some(start) = self.start_date {
            clauses.push("created_at >= ?".into());
            args.push(Box::new(format_ts(start)));
        }
        if let Some(end) = self.end_date {
            clauses.push("created_at <= ?".into());
            args.push(Box::new(format_ts(end)));
        }
        if let Some(category) = self.category {
            clauses.push("category = ?".into());
            args.push(Box::new(category.as_str().to_string()));
        }
        if let Some(status) = self.status {
            clauses.push("status = ?".into());
            args.push(Box::new(status.as_str().to_string()));
        }
        (clauses.join(" AND "), args)
    }
}

/// One history listing entry with its resolution details.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryItem {
    pub id: Uuid,
    pub category: EmergencyCategory,
    pub status: EmergencyStatus,
    pub severity: RiskLevel,
    pub created_at: NaiveDateTime,
    pub resolved_at: Option<NaiveDateTime>,
    pub response_time_secs: Option<i64>,
    pub resolution_notes: Option<String>,
    pub steps_completed: i64,
    pub total_steps: i64,
    pub notifications_count: i64,
    pub confidence_score: f64,
    pub detected_subtype: String,
    pub risk_assessment: RiskLevel,
    pub city: Option<String>,
}

/// Counts by lifecycle status for the filtered set (ignoring the status
/// filter itself, so the summary always shows the full breakdown).
#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    pub total: i64,
    pub active: i64,
    pub resolved: i64,
    pub cancelled: i64,
    pub escalated: i64,
}

/// Paginated history for one user, newest first. Returns (items, total).
pub fn list_history(
    conn: &Connection,
    filter: &HistoryFilter,
) -> Result<(Vec<HistoryItem>, i64), DatabaseError> {
    let (clause, mut args) = filter.where_clause();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM emergencies WHERE {clause}"),
        rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
        |row| row.get(0),
    )?;

    let limit = filter.limit.clamp(1, 100);
    let offset = (filter.page.max(1) - 1) * limit;
    args.push(Box::new(limit));
    args.push(Box::new(offset));

    let sql = format!(
        "SELECT e.id, e.category, e.status, e.severity, e.created_at, e.resolved_at,
                e.response_time_secs, e.resolution_notes,
                (SELECT COALESCE(SUM(completed), 0) FROM instruction_steps WHERE emergency_id = e.id),
                (SELECT COUNT(*) FROM instruction_steps WHERE emergency_id = e.id),
                (SELECT COUNT(*) FROM notifications WHERE emergency_id = e.id),
                e.ai_confidence, e.ai_subtype, e.ai_risk, e.city
         FROM emergencies e WHERE {clause}
         ORDER BY e.created_at DESC LIMIT ? OFFSET ?"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, Option<i64>>(6)?,
                row.get::<_, Option<String>>(7)?,
                row.get::<_, i64>(8)?,
                row.get::<_, i64>(9)?,
                row.get::<_, i64>(10)?,
                row.get::<_, f64>(11)?,
                row.get::<_, String>(12)?,
                row.get::<_, String>(13)?,
                row.get::<_, Option<String>>(14)?,
            ))
        },
    )?;

    let mut items = Vec::new();
    for row in rows {
        let (
            id,
            category,
            status,
            severity,
            created_at,
            resolved_at,
            response_time,
            notes,
            steps_completed,
            total_steps,
            notifications_count,
            confidence,
            subtype,
            risk,
            city,
        ) = row?;
        items.push(HistoryItem {
            id: parse_uuid(&id)?,
            category: EmergencyCategory::from_str(&category)?,
            status: EmergencyStatus::from_str(&status)?,
            severity: RiskLevel::from_str(&severity)?,
            created_at: parse_ts(&created_at)?,
            resolved_at: resolved_at.as_deref().map(parse_ts).transpose()?,
            response_time_secs: response_time,
            resolution_notes: notes,
            steps_completed,
            total_steps,
            notifications_count,
            confidence_score: confidence,
            detected_subtype: subtype,
            risk_assessment: RiskLevel::from_str(&risk)?,
            city,
        });
    }
    Ok((items, total))
}

/// Status breakdown for a filter (status criterion excluded).
pub fn status_summary(
    conn: &Connection,
    filter: &HistoryFilter,
) -> Result<StatusSummary, DatabaseError> {
    let unfiltered = HistoryFilter {
        status: None,
        ..filter.clone()
    };
    let (clause, args) = unfiltered.where_clause();
    let sql = format!(
        "SELECT status, COUNT(*) FROM emergencies WHERE {clause} GROUP BY status"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
        |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
    )?;

    let mut summary = StatusSummary {
        total: 0,
        active: 0,
        resolved: 0,
        cancelled: 0,
        escalated: 0,
    };
    for row in rows {
        let (status, count) = row?;
        summary.total += count;
        match EmergencyStatus::from_str(&status)? {
            EmergencyStatus::Active => summary.active = count,
            EmergencyStatus::Resolved => summary.resolved = count,
            EmergencyStatus::Cancelled => summary.cancelled = count,
            EmergencyStatus::Escalated => summary.escalated = count,
        }
    }
    Ok(summary)
}

// ── Analytics ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsStats {
    pub overview: AnalyticsOverview,
    pub frequency: FrequencyStats,
    pub response_times: ResponseTimeStats,
    pub categories: CategoryStats,
    pub patterns: PatternStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsOverview {
    pub total_emergencies: i64,
    pub resolved_emergencies: i64,
    pub active_emergencies: i64,
    /// Percentage, rounded to two decimals.
    pub success_rate: f64,
    pub average_response_time: i64,
    pub min_response_time: i64,
    pub max_response_time: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrequencyStats {
    pub daily: Vec<DayCount>,
    pub total: i64,
    pub average_per_day: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DayCount {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponseTimeStats {
    pub average: i64,
    pub by_severity: Vec<SeverityResponseTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeverityResponseTime {
    pub severity: RiskLevel,
    pub average: i64,
    pub min: i64,
    pub max: i64,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryStats {
    pub distribution: Vec<CategoryCount>,
    pub most_common: Option<EmergencyCategory>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryCount {
    pub category: EmergencyCategory,
    pub count: i64,
    pub resolved: i64,
    pub average_response_time: i64,
    /// Percentage, rounded to two decimals.
    pub success_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatternStats {
    pub hourly: Vec<HourCount>,
    pub severity: Vec<SeverityCount>,
    pub by_status: StatusSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct HourCount {
    pub hour: i64,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeverityCount {
    pub severity: RiskLevel,
    pub count: i64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Aggregate statistics for one user over a trailing window of days.
pub fn analytics_stats(
    conn: &Connection,
    user_id: &str,
    days: i64,
) -> Result<AnalyticsStats, DatabaseError> {
    let days = days.max(1);
    let since = Utc::now().naive_utc() - Duration::days(days);
    let since_str = format_ts(since);

    let filter = HistoryFilter {
        start_date: Some(since),
        ..HistoryFilter::for_user(user_id)
    };
    let by_status = status_summary(conn, &filter)?;

    let (avg, min, max): (Option<f64>, Option<i64>, Option<i64>) = conn.query_row(
        "SELECT AVG(response_time_secs), MIN(response_time_secs), MAX(response_time_secs)
         FROM emergencies
         WHERE user_id = ?1 AND created_at >= ?2 AND status = 'resolved'
           AND response_time_secs IS NOT NULL",
        params![user_id, since_str],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;
    let average_response_time = avg.map(|a| a.round() as i64).unwrap_or(0);

    let success_rate = if by_status.total > 0 {
        round2(by_status.resolved as f64 / by_status.total as f64 * 100.0)
    } else {
        0.0
    };

    let mut daily = Vec::new();
    {
        let mut stmt = conn.prepare(
            "SELECT strftime('%Y-%m-%d', created_at) AS day, COUNT(*)
             FROM emergencies WHERE user_id = ?1 AND created_at >= ?2
             GROUP BY day ORDER BY day ASC",
        )?;
        let rows = stmt.query_map(params![user_id, since_str], |row| {
            Ok(DayCount {
                date: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        for row in rows {
            daily.push(row?);
        }
    }

    let mut by_severity_response = Vec::new();
    {
        let mut stmt = conn.prepare(
            "SELECT severity, AVG(response_time_secs), MIN(response_time_secs),
                    MAX(response_time_secs), COUNT(*)
             FROM emergencies
             WHERE user_id = ?1 AND created_at >= ?2 AND status = 'resolved'
               AND response_time_secs IS NOT NULL
             GROUP BY severity",
        )?;
        let rows = stmt.query_map(params![user_id, since_str], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;
        for row in rows {
            let (severity, avg, min, max, count) = row?;
            by_severity_response.push(SeverityResponseTime {
                severity: RiskLevel::from_str(&severity)?,
                average: avg.round() as i64,
                min,
                max,
                count,
            });
        }
    }

    let mut distribution = Vec::new();
    {
        let mut stmt = conn.prepare(
            "SELECT category, COUNT(*),
                    SUM(CASE WHEN status = 'resolved' THEN 1 ELSE 0 END),
                    AVG(CASE WHEN status = 'resolved' THEN response_time_secs END)
             FROM emergencies WHERE user_id = ?1 AND created_at >= ?2
             GROUP BY category ORDER BY COUNT(*) DESC",
        )?;
        let rows = stmt.query_map(params![user_id, since_str], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, Option<f64>>(3)?,
            ))
        })?;
        for row in rows {
            let (category, count, resolved, avg) = row?;
            distribution.push(CategoryCount {
                category: EmergencyCategory::from_str(&category)?,
                count,
                resolved,
                average_response_time: avg.map(|a| a.round() as i64).unwrap_or(0),
                success_rate: if count > 0 {
                    round2(resolved as f64 / count as f64 * 100.0)
                } else {
                    0.0
                },
            });
        }
    }
    let most_common = distribution.first().map(|c| c.category);

    let mut hourly = Vec::new();
    {
        let mut stmt = conn.prepare(
            "SELECT CAST(strftime('%H', created_at) AS INTEGER) AS hour, COUNT(*)
             FROM emergencies WHERE user_id = ?1 AND created_at >= ?2
             GROUP BY hour ORDER BY hour ASC",
        )?;
        let rows = stmt.query_map(params![user_id, since_str], |row| {
            Ok(HourCount {
                hour: row.get(0)?,
                count: row.get(1)?,
            })
        })?;
        for row in rows {
            hourly.push(row?);
        }
    }

    let mut severity_counts = Vec::new();
    {
        let mut stmt = conn.prepare(
            "SELECT severity, COUNT(*) FROM emergencies
             WHERE user_id = ?1 AND created_at >= ?2 GROUP BY severity",
        )?;
        let rows = stmt.query_map(params![user_id, since_str], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (severity, count) = row?;
            severity_counts.push(SeverityCount {
                severity: RiskLevel::from_str(&severity)?,
                count,
            });
        }
    }

    Ok(AnalyticsStats {
        overview: AnalyticsOverview {
            total_emergencies: by_status.total,
            resolved_emergencies: by_status.resolved,
            active_emergencies: by_status.active,
            success_rate,
            average_response_time,
            min_response_time: min.unwrap_or(0),
            max_response_time: max.unwrap_or(0),
        },
        frequency: FrequencyStats {
            total: by_status.total,
            average_per_day: round2(by_status.total as f64 / days as f64),
            daily,
        },
        response_times: ResponseTimeStats {
            average: average_response_time,
            by_severity: by_severity_response,
        },
        categories: CategoryStats {
            distribution,
            most_common,
        },
        patterns: PatternStats {
            hourly,
            severity: severity_counts,
            by_status,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use chrono::Utc;

    pub(crate) fn make_record(user_id: &str, steps: usize) -> EmergencyRecord {
        let now = Utc::now().naive_utc();
        EmergencyRecord {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            category: EmergencyCategory::Fire,
            severity: RiskLevel::High,
            status: EmergencyStatus::Active,
            version: 1,
            location: Some(LocationInfo {
                longitude: Some(3.3792),
                latitude: Some(6.5244),
                street: None,
                city: Some("Lagos".into()),
                state: None,
                zip_code: None,
                country: Some("NG".into()),
                captured_at: Some(now),
            }),
            ai_analysis: ClassificationSummary {
                confidence_score: 0.92,
                detected_subtype: "building_fire".into(),
                risk_assessment: RiskLevel::High,
                reasoning: "Open flames reported".into(),
                captured_at: now,
            },
            instructions: (1..=steps as i64)
                .map(|n| InstructionStep {
                    step_number: n,
                    title: format!("Step {n}"),
                    description: "Do the thing".into(),
                    estimated_secs: 30,
                    priority: StepPriority::High,
                    safety_note: None,
                    completed: false,
                    completed_at: None,
                    ai_generated: true,
                })
                .collect(),
            notifications: vec![],
            resolved_at: None,
            resolution_notes: None,
            response_time_secs: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn make_notification(status: DeliveryStatus) -> NotificationRecord {
        NotificationRecord {
            id: Uuid::new_v4(),
            contact_id: None,
            method: NotificationMethod::Sms,
            sent_at: Utc::now().naive_utc(),
            status,
            provider: "simulation".into(),
            message_id: format!("m_{}", Uuid::new_v4().simple()),
            retry_count: 0,
            device_token: None,
            position: 0,
        }
    }

    #[test]
    fn insert_and_load_round_trip() {
        let mut conn = open_memory_database().unwrap();
        let record = make_record("user-1", 3);
        insert_emergency(&mut conn, &record).unwrap();

        let loaded = get_emergency(&conn, record.id).unwrap();
        assert_eq!(loaded.user_id, "user-1");
        assert_eq!(loaded.category, EmergencyCategory::Fire);
        assert_eq!(loaded.status, EmergencyStatus::Active);
        assert_eq!(loaded.instructions.len(), 3);
        assert!(loaded.instructions_contiguous());
        assert!(loaded.notifications.is_empty());
        assert_eq!(loaded.location.as_ref().unwrap().city.as_deref(), Some("Lagos"));
        assert_eq!(loaded.version, 1);
    }

    #[test]
    fn get_unknown_emergency_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = get_emergency(&conn, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn complete_step_marks_and_counts() {
        let mut conn = open_memory_database().unwrap();
        let record = make_record("user-1", 2);
        insert_emergency(&mut conn, &record).unwrap();

        let result = complete_step(&mut conn, record.id, 1).unwrap();
        assert!(result.step.completed);
        assert!(result.step.completed_at.is_some());
        assert_eq!(result.completed_steps, 1);
        assert_eq!(result.total_steps, 2);
        assert!(!result.all_steps_completed);

        let result = complete_step(&mut conn, record.id, 2).unwrap();
        assert!(result.all_steps_completed);
    }

    #[test]
    fn complete_step_is_idempotent() {
        let mut conn = open_memory_database().unwrap();
        let record = make_record("user-1", 1);
        insert_emergency(&mut conn, &record).unwrap();

        let first = complete_step(&mut conn, record.id, 1).unwrap();
        assert!(first.all_steps_completed);
        let first_completed_at = first.step.completed_at;

        let second = complete_step(&mut conn, record.id, 1).unwrap();
        assert!(second.all_steps_completed);
        assert_eq!(second.step.completed_at, first_completed_at);
    }

    #[test]
    fn single_step_record_completes_fully() {
        let mut conn = open_memory_database().unwrap();
        let record = make_record("user-1", 1);
        insert_emergency(&mut conn, &record).unwrap();
        let result = complete_step(&mut conn, record.id, 1).unwrap();
        assert!(result.all_steps_completed);
    }

    #[test]
    fn complete_missing_step_is_not_found() {
        let mut conn = open_memory_database().unwrap();
        let record = make_record("user-1", 1);
        insert_emergency(&mut conn, &record).unwrap();
        let err = complete_step(&mut conn, record.id, 9).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn resolve_computes_floored_response_time() {
        let mut conn = open_memory_database().unwrap();
        let record = make_record("user-1", 1);
        insert_emergency(&mut conn, &record).unwrap();

        let now = record.created_at + Duration::seconds(200);
        let resolved = resolve_emergency_at(&mut conn, record.id, Some("handled"), now).unwrap();
        assert_eq!(resolved.status, EmergencyStatus::Resolved);
        assert_eq!(resolved.response_time_secs, Some(200));
        assert_eq!(resolved.resolved_at, Some(now));
        assert_eq!(resolved.resolution_notes.as_deref(), Some("handled"));
    }

    #[test]
    fn resolve_defaults_notes() {
        let mut conn = open_memory_database().unwrap();
        let record = make_record("user-1", 1);
        insert_emergency(&mut conn, &record).unwrap();
        let resolved = resolve_emergency(&mut conn, record.id, None).unwrap();
        assert_eq!(
            resolved.resolution_notes.as_deref(),
            Some(DEFAULT_RESOLUTION_NOTES)
        );
    }

    #[test]
    fn double_resolve_conflicts_and_preserves_fields() {
        let mut conn = open_memory_database().unwrap();
        let record = make_record("user-1", 1);
        insert_emergency(&mut conn, &record).unwrap();

        let now = record.created_at + Duration::seconds(90);
        let first = resolve_emergency_at(&mut conn, record.id, Some("done"), now).unwrap();

        let err = resolve_emergency_at(
            &mut conn,
            record.id,
            Some("again"),
            now + Duration::seconds(60),
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));

        let after = get_emergency(&conn, record.id).unwrap();
        assert_eq!(after.resolved_at, first.resolved_at);
        assert_eq!(after.response_time_secs, Some(90));
        assert_eq!(after.resolution_notes.as_deref(), Some("done"));
    }

    #[test]
    fn resolve_unknown_is_not_found() {
        let mut conn = open_memory_database().unwrap();
        let err = resolve_emergency(&mut conn, Uuid::new_v4(), None).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn append_rebases_positions_and_bumps_version() {
        let mut conn = open_memory_database().unwrap();
        let record = make_record("user-1", 1);
        insert_emergency(&mut conn, &record).unwrap();

        let first = vec![
            make_notification(DeliveryStatus::Delivered),
            make_notification(DeliveryStatus::Failed),
        ];
        let appended = append_notifications(&mut conn, record.id, &first, None).unwrap();
        assert_eq!(appended[0].position, 0);
        assert_eq!(appended[1].position, 1);

        let second = vec![make_notification(DeliveryStatus::Delivered)];
        let appended = append_notifications(&mut conn, record.id, &second, None).unwrap();
        assert_eq!(appended[0].position, 2);

        let loaded = get_emergency(&conn, record.id).unwrap();
        assert_eq!(loaded.notifications.len(), 3);
        assert!(loaded.version > 1);
    }

    #[test]
    fn append_with_stale_version_is_rejected() {
        let mut conn = open_memory_database().unwrap();
        let record = make_record("user-1", 1);
        insert_emergency(&mut conn, &record).unwrap();

        let batch = vec![make_notification(DeliveryStatus::Delivered)];
        append_notifications(&mut conn, record.id, &batch, Some(1)).unwrap();

        // Version moved on; a writer still holding version 1 must fail.
        let err = append_notifications(&mut conn, record.id, &batch, Some(1)).unwrap_err();
        assert!(matches!(err, DatabaseError::StaleVersion { .. }));
    }

    #[test]
    fn retryable_selection_and_cap() {
        let mut conn = open_memory_database().unwrap();
        let record = make_record("user-1", 1);
        insert_emergency(&mut conn, &record).unwrap();

        let mut exhausted = make_notification(DeliveryStatus::Failed);
        exhausted.retry_count = MAX_RETRY_COUNT;
        let batch = vec![
            make_notification(DeliveryStatus::Delivered),
            make_notification(DeliveryStatus::Failed),
            make_notification(DeliveryStatus::Pending),
            exhausted,
        ];
        append_notifications(&mut conn, record.id, &batch, None).unwrap();

        let retryable = retryable_notifications(&conn, record.id).unwrap();
        assert_eq!(retryable.len(), 2);
        assert!(retryable.iter().all(|n| n.retry_count < MAX_RETRY_COUNT));
    }

    #[test]
    fn mark_retry_attempt_increments_and_caps() {
        let mut conn = open_memory_database().unwrap();
        let record = make_record("user-1", 1);
        insert_emergency(&mut conn, &record).unwrap();
        let batch = vec![make_notification(DeliveryStatus::Failed)];
        let appended = append_notifications(&mut conn, record.id, &batch, None).unwrap();
        let nid = appended[0].id;

        assert_eq!(mark_retry_attempt(&conn, record.id, nid).unwrap(), 1);
        assert_eq!(mark_retry_attempt(&conn, record.id, nid).unwrap(), 2);
        assert_eq!(mark_retry_attempt(&conn, record.id, nid).unwrap(), 3);
        let err = mark_retry_attempt(&conn, record.id, nid).unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[test]
    fn retry_outcome_success_overwrites_failure_keeps_message_id() {
        let mut conn = open_memory_database().unwrap();
        let record = make_record("user-1", 1);
        insert_emergency(&mut conn, &record).unwrap();
        let batch = vec![make_notification(DeliveryStatus::Failed)];
        let appended = append_notifications(&mut conn, record.id, &batch, None).unwrap();
        let nid = appended[0].id;
        let original_message_id = appended[0].message_id.clone();
        let now = Utc::now().naive_utc();

        record_retry_outcome(&conn, record.id, nid, DeliveryStatus::Failed, None, now).unwrap();
        let loaded = get_emergency(&conn, record.id).unwrap();
        assert_eq!(loaded.notifications[0].status, DeliveryStatus::Failed);
        assert_eq!(loaded.notifications[0].message_id, original_message_id);

        record_retry_outcome(
            &conn,
            record.id,
            nid,
            DeliveryStatus::Delivered,
            Some("new-id"),
            now,
        )
        .unwrap();
        let loaded = get_emergency(&conn, record.id).unwrap();
        assert_eq!(loaded.notifications[0].status, DeliveryStatus::Delivered);
        assert_eq!(loaded.notifications[0].message_id, "new-id");
    }

    #[test]
    fn history_filters_and_paginates() {
        let mut conn = open_memory_database().unwrap();
        for _ in 0..3 {
            insert_emergency(&mut conn, &make_record("user-1", 1)).unwrap();
        }
        let mut medical = make_record("user-1", 1);
        medical.category = EmergencyCategory::Medical;
        insert_emergency(&mut conn, &medical).unwrap();
        insert_emergency(&mut conn, &make_record("user-2", 1)).unwrap();

        let filter = HistoryFilter::for_user("user-1");
        let (items, total) = list_history(&conn, &filter).unwrap();
        assert_eq!(total, 4);
        assert_eq!(items.len(), 4);

        let filter = HistoryFilter {
            category: Some(EmergencyCategory::Medical),
            ..HistoryFilter::for_user("user-1")
        };
        let (items, total) = list_history(&conn, &filter).unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].category, EmergencyCategory::Medical);

        let filter = HistoryFilter {
            limit: 2,
            page: 2,
            ..HistoryFilter::for_user("user-1")
        };
        let (items, total) = list_history(&conn, &filter).unwrap();
        assert_eq!(total, 4);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn history_status_filter_and_summary() {
        let mut conn = open_memory_database().unwrap();
        let record = make_record("user-1", 1);
        insert_emergency(&mut conn, &record).unwrap();
        insert_emergency(&mut conn, &make_record("user-1", 1)).unwrap();
        resolve_emergency(&mut conn, record.id, None).unwrap();

        let filter = HistoryFilter {
            status: Some(EmergencyStatus::Resolved),
            ..HistoryFilter::for_user("user-1")
        };
        let (items, _) = list_history(&conn, &filter).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].status, EmergencyStatus::Resolved);

        // Summary ignores the status criterion.
        let summary = status_summary(&conn, &filter).unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.active, 1);
        assert_eq!(summary.resolved, 1);
    }

    #[test]
    fn analytics_overview_counts() {
        let mut conn = open_memory_database().unwrap();
        let a = make_record("user-1", 1);
        insert_emergency(&mut conn, &a).unwrap();
        let b = make_record("user-1", 1);
        insert_emergency(&mut conn, &b).unwrap();
        resolve_emergency_at(&mut conn, a.id, None, a.created_at + Duration::seconds(120))
            .unwrap();

        let stats = analytics_stats(&conn, "user-1", 30).unwrap();
        assert_eq!(stats.overview.total_emergencies, 2);
        assert_eq!(stats.overview.resolved_emergencies, 1);
        assert_eq!(stats.overview.active_emergencies, 1);
        assert!((stats.overview.success_rate - 50.0).abs() < f64::EPSILON);
        assert_eq!(stats.overview.average_response_time, 120);
        assert_eq!(stats.overview.min_response_time, 120);
        assert_eq!(stats.overview.max_response_time, 120);
        assert_eq!(stats.frequency.daily.len(), 1);
        assert_eq!(stats.categories.most_common, Some(EmergencyCategory::Fire));
        assert!(!stats.patterns.hourly.is_empty());
    }

    #[test]
    fn analytics_empty_user_is_zeroed() {
        let conn = open_memory_database().unwrap();
        let stats = analytics_stats(&conn, "nobody", 30).unwrap();
        assert_eq!(stats.overview.total_emergencies, 0);
        assert!((stats.overview.success_rate - 0.0).abs() < f64::EPSILON);
        assert!(stats.frequency.daily.is_empty());
        assert!(stats.categories.most_common.is_none());
    }
}
