use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::types::DocumentStatus,
    lifecycle::Trigger,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Event {
    Created(Created),
    StatusChanged(StatusChanged),
    GenerationRequested(GenerationRequested),
}

/// A new draft was created.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Created {
    pub document: Uuid,
    pub number: String,
    /// Author of the document.
    pub author: i32,
}

/// A document has moved from one status to another.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatusChanged {
    pub document: Uuid,
    pub number: String,
    pub trigger: Trigger,
    pub from: DocumentStatus,
    pub to: DocumentStatus,
    /// Actor who caused the change.
    pub actor: i32,
    /// Author of the document.
    pub author: i32,
}

/// A document was approved, and a file should now be generated from it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GenerationRequested {
    pub document: Uuid,
    pub number: String,
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match *self {
            Event::Created(_) => "created",
            Event::StatusChanged(_) => "status-changed",
            Event::GenerationRequested(_) => "generation-requested",
        }
    }

    /// Document this event concerns.
    pub fn document(&self) -> Uuid {
        match *self {
            Event::Created(ref ev) => ev.document,
            Event::StatusChanged(ref ev) => ev.document,
            Event::GenerationRequested(ref ev) => ev.document,
        }
    }
}

impl_from! { for Event ;
    Created => |e| Event::Created(e),
    StatusChanged => |e| Event::StatusChanged(e),
    GenerationRequested => |e| Event::GenerationRequested(e),
}
