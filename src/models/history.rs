use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use uuid::Uuid;

use crate::db::types::{AuditAction, DocumentStatus};

/// A single entry in a document's append-only history.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct HistoryEntry {
    /// Position of this entry in the global history stream.
    pub id: i64,
    pub document: Uuid,
    /// Actor responsible, or `None` for actions taken by the system.
    pub actor: Option<i32>,
    pub action: AuditAction,
    /// Status before the action, `None` for creation.
    pub from_status: Option<DocumentStatus>,
    pub to_status: DocumentStatus,
    pub comment: Option<String>,
    /// Network address the action originated from, if known.
    pub origin: Option<IpAddr>,
    pub timestamp: NaiveDateTime,
}

#[derive(Clone, Debug)]
pub struct NewHistoryEntry<'a> {
    pub document: Uuid,
    pub actor: Option<i32>,
    pub action: AuditAction,
    pub from_status: Option<DocumentStatus>,
    pub to_status: DocumentStatus,
    pub comment: Option<&'a str>,
    pub origin: Option<IpAddr>,
    pub timestamp: NaiveDateTime,
}
