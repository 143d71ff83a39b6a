//! Audit trail of document lifecycles.
//!
//! Every change to a document is recorded in its history, in the same
//! transaction as the change itself. Refused attempts are recorded as well,
//! although in a transaction of their own (the one in which they were refused
//! is rolled back).

use chrono::NaiveDateTime;
use std::net::IpAddr;

use crate::{
    db::types::{AuditAction, DocumentStatus},
    models::{
        document::Document,
        history::{HistoryEntry, NewHistoryEntry},
    },
    store::{StoreError, Transaction},
};

/// Entity responsible for an action.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Actor {
    /// System. This actor is used for actions carried automatically by the
    /// system, such as attaching generated files.
    System,
    /// A user.
    User(i32),
}

impl Actor {
    fn as_db(self) -> Option<i32> {
        match self {
            Actor::System => None,
            Actor::User(id) => Some(id),
        }
    }
}

impl From<i32> for Actor {
    fn from(id: i32) -> Self {
        Actor::User(id)
    }
}

/// Identity and network origin of whoever invokes the workflow.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Caller {
    pub actor: i32,
    pub origin: Option<IpAddr>,
}

impl Caller {
    pub fn new(actor: i32) -> Caller {
        Caller { actor, origin: None }
    }

    pub fn with_origin(self, origin: IpAddr) -> Caller {
        Caller { origin: Some(origin), ..self }
    }
}

/// A change about to be recorded.
#[derive(Clone, Copy, Debug)]
pub struct Record<'a> {
    pub actor: Actor,
    pub action: AuditAction,
    pub from: Option<DocumentStatus>,
    pub to: DocumentStatus,
    pub comment: Option<&'a str>,
    pub origin: Option<IpAddr>,
}

/// Store an event in a document's history.
///
/// This must be called within the same transaction as the change it
/// describes, so that both are committed or neither is.
pub fn record(
    tx: &mut dyn Transaction,
    document: &Document,
    record: Record,
    now: NaiveDateTime,
) -> Result<HistoryEntry, StoreError> {
    let entry = tx.append_history(&NewHistoryEntry {
        document: document.id,
        actor: record.actor.as_db(),
        action: record.action,
        from_status: record.from,
        to_status: record.to,
        comment: record.comment,
        origin: record.origin,
        timestamp: now,
    })?;

    debug!("Recorded {} on {} ({:?} -> {})",
        entry.action, document.number, entry.from_status, entry.to_status);

    Ok(entry)
}

/// Store a refused attempt in a document's history.
///
/// The document's status is left unchanged, and `reason` describes which
/// precondition failed.
pub fn record_denied(
    tx: &mut dyn Transaction,
    document: &Document,
    caller: &Caller,
    reason: &str,
    now: NaiveDateTime,
) -> Result<HistoryEntry, StoreError> {
    record(tx, document, Record {
        actor: Actor::User(caller.actor),
        action: AuditAction::Denied,
        from: Some(document.status),
        to: document.status,
        comment: Some(reason),
        origin: caller.origin,
    }, now)
}
