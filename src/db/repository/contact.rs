use std::str::FromStr;

use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::contact::Contact;
use crate::models::enums::Relationship;

use super::{format_ts, parse_ts, parse_uuid};

pub fn insert_contact(conn: &Connection, contact: &Contact) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO contacts
         (id, user_id, name, phone, email, relationship, priority, is_active, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            contact.id.to_string(),
            contact.user_id,
            contact.name,
            contact.phone,
            contact.email,
            contact.relationship.as_str(),
            contact.priority,
            contact.is_active as i32,
            contact.notes,
            format_ts(contact.created_at),
            format_ts(contact.updated_at),
        ],
    )?;
    Ok(())
}

/// Active contacts for a user, highest priority first. This is the exact
/// ordering the dispatcher fans out in.
pub fn list_active_for_user(
    conn: &Connection,
    user_id: &str,
) -> Result<Vec<Contact>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, phone, email, relationship, priority, is_active, notes,
                created_at, updated_at
         FROM contacts
         WHERE user_id = ?1 AND is_active = 1
         ORDER BY priority ASC, created_at ASC",
    )?;
    let rows = stmt.query_map(params![user_id], row_tuple)?;
    collect_contacts(rows)
}

/// Load specific active contacts by id (manual re-send path).
pub fn get_active_by_ids(
    conn: &Connection,
    ids: &[Uuid],
) -> Result<Vec<Contact>, DatabaseError> {
    let mut contacts = Vec::new();
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, phone, email, relationship, priority, is_active, notes,
                created_at, updated_at
         FROM contacts
         WHERE id = ?1 AND is_active = 1",
    )?;
    for id in ids {
        let mut rows = stmt.query_map(params![id.to_string()], row_tuple)?;
        if let Some(row) = rows.next() {
            contacts.push(contact_from_tuple(row?)?);
        }
    }
    contacts.sort_by_key(|c| (c.priority, c.created_at));
    Ok(contacts)
}

pub fn get_contact(conn: &Connection, id: Uuid) -> Result<Contact, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, phone, email, relationship, priority, is_active, notes,
                created_at, updated_at
         FROM contacts WHERE id = ?1",
    )?;
    let mut rows = stmt.query_map(params![id.to_string()], row_tuple)?;
    match rows.next() {
        Some(row) => contact_from_tuple(row?),
        None => Err(DatabaseError::NotFound {
            entity_type: "Contact".into(),
            id: id.to_string(),
        }),
    }
}

type ContactTuple = (
    String,
    String,
    String,
    String,
    Option<String>,
    String,
    i64,
    i32,
    Option<String>,
    String,
    String,
);

fn row_tuple(row: &Row<'_>) -> rusqlite::Result<ContactTuple> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
        row.get(10)?,
    ))
}

fn contact_from_tuple(t: ContactTuple) -> Result<Contact, DatabaseError> {
    let (id, user_id, name, phone, email, relationship, priority, is_active, notes, created, updated) = t;
    Ok(Contact {
        id: parse_uuid(&id)?,
        user_id,
        name,
        phone,
        email,
        relationship: Relationship::from_str(&relationship)?,
        priority,
        is_active: is_active != 0,
        notes,
        created_at: parse_ts(&created)?,
        updated_at: parse_ts(&updated)?,
    })
}

fn collect_contacts(
    rows: impl Iterator<Item = rusqlite::Result<ContactTuple>>,
) -> Result<Vec<Contact>, DatabaseError> {
    let mut contacts = Vec::new();
    for row in rows {
        contacts.push(contact_from_tuple(row?)?);
    }
    Ok(contacts)
}
