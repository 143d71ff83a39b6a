//! Error taxonomy shared by all lifecycle operations.
//!
//! Every error surfaced by [`Workflow`](crate::workflow::Workflow) reports
//! a stable [`ErrorKind`] and, unless it is internal, a machine-readable code
//! naming the precondition which failed.

use failure::Fail;
use serde::Serialize;
use std::{borrow::Cow, fmt};
use uuid::Uuid;

use crate::{
    events::RenderError,
    models::category::AllocationError,
    permissions::{ActorError, RequireCapabilitiesError},
    lifecycle::TransitionError,
    guard::LockedDocumentError,
    store::StoreError,
    workflow::EditError,
};

/// Broad classification of a failure.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// Action is not legal from the document's current status.
    InvalidTransition,
    /// Actor lacks a role, ownership, or department relationship.
    Permission,
    /// Input was rejected before any mutation took place.
    Validation,
    /// Mutation attempted on a locked document outside of the whitelist.
    Locked,
    /// Concurrent modification was detected. Caller should re-fetch and retry.
    Conflict,
    /// Document number could not be issued.
    Allocation,
    /// Referenced entity does not exist.
    NotFound,
    /// Failure of the storage or a collaborator.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(match *self {
            ErrorKind::InvalidTransition => "invalid-transition",
            ErrorKind::Permission => "permission",
            ErrorKind::Validation => "validation",
            ErrorKind::Locked => "locked",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Allocation => "allocation",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Internal => "internal",
        })
    }
}

/// An error which can be reported to a caller of the workflow.
pub trait DomainError: Fail {
    /// Classification of this error.
    fn kind(&self) -> ErrorKind;

    /// Code identifying the failed precondition, or `None` for internal
    /// errors.
    fn code(&self) -> Option<Cow<str>>;
}

/// Any error returned by the workflow.
#[derive(Debug, DomainError, Fail, From)]
pub enum Error {
    #[fail(display = "{}", _0)]
    Transition(#[cause] #[from] TransitionError),
    #[fail(display = "{}", _0)]
    Edit(#[cause] #[from] EditError),
    #[fail(display = "{}", _0)]
    Locked(#[cause] #[from] LockedDocumentError),
    #[fail(display = "{}", _0)]
    Validation(#[cause] #[from] ValidationError),
    #[fail(display = "{}", _0)]
    Allocation(#[cause] #[from] AllocationError),
    #[fail(display = "{}", _0)]
    NotFound(#[cause] #[from] NotFound),
    #[fail(display = "{}", _0)]
    Actor(#[cause] #[from] ActorError),
    #[fail(display = "{}", _0)]
    Capabilities(#[cause] #[from] RequireCapabilitiesError),
    #[fail(display = "{}", _0)]
    Conflict(#[cause] #[from] ConflictError),
    #[fail(display = "{}", _0)]
    Render(#[cause] #[from] RenderError),
    #[fail(display = "{}", _0)]
    Store(#[cause] #[from] StoreError),
}

impl Error {
    /// Was this error caused by the caller (as opposed to a failure of
    /// the system)? Such attempts are recorded in the audit trail.
    pub fn is_rejection(&self) -> bool {
        match self.kind() {
            ErrorKind::InvalidTransition
            | ErrorKind::Permission
            | ErrorKind::Validation
            | ErrorKind::Locked => true,
            _ => false,
        }
    }

    /// Describe this error for the audit trail.
    pub fn describe(&self) -> String {
        match self.code() {
            Some(code) => format!("{}: {}", code, self),
            None => self.to_string(),
        }
    }
}

/// Referenced entity does not exist.
#[derive(Debug, DomainError, Fail)]
pub enum NotFound {
    #[fail(display = "No such document: {}", _0)]
    #[domain(kind = "NotFound", code = "document:not-found")]
    Document(Uuid),
    #[fail(display = "No document numbered {}", _0)]
    #[domain(kind = "NotFound", code = "document:not-found")]
    DocumentNumber(String),
    #[fail(display = "No such category: {}", _0)]
    #[domain(kind = "NotFound", code = "category:not-found")]
    Category(String),
    #[fail(display = "No such template: {}", _0)]
    #[domain(kind = "NotFound", code = "template:not-found")]
    Template(i32),
}

/// Document was modified concurrently.
#[derive(Debug, DomainError, Fail)]
#[fail(display = "Document {} was modified concurrently", document)]
#[domain(kind = "Conflict", code = "document:conflict")]
pub struct ConflictError {
    pub document: Uuid,
}

/// Input was rejected.
#[derive(Debug, DomainError, Fail)]
pub enum ValidationError {
    /// Content lacks a field the template requires.
    #[fail(display = "Missing required field {:?}", _0)]
    #[domain(kind = "Validation", code = "document:content:missing-field")]
    MissingField(String),
    /// Content has a field the template doesn't define.
    #[fail(display = "Unknown field {:?}", _0)]
    #[domain(kind = "Validation", code = "document:content:unknown-field")]
    UnknownField(String),
    /// Field's value doesn't match its declared kind.
    #[fail(display = "Field {:?} must be {}", field, expected)]
    #[domain(kind = "Validation", code = "document:content:invalid-type")]
    InvalidType {
        field: String,
        expected: crate::models::template::FieldKind,
    },
    /// Title is empty or too long.
    #[fail(display = "Title must be between 1 and {} characters", _0)]
    #[domain(kind = "Validation", code = "document:title:invalid")]
    Title(usize),
    /// Template belongs to a different category.
    #[fail(display = "Template {} does not belong to category {}", template, category)]
    #[domain(kind = "Validation", code = "document:template:category-mismatch")]
    TemplateCategory {
        template: i32,
        category: String,
    },
    /// Template is no longer used for new documents.
    #[fail(display = "Template {} is inactive", _0)]
    #[domain(kind = "Validation", code = "document:template:inactive")]
    TemplateInactive(i32),
    /// Another category already uses this code.
    #[fail(display = "Category {} already exists", _0)]
    #[domain(kind = "Validation", code = "category:exists")]
    CategoryExists(String),
    /// Comment text is blank.
    #[fail(display = "Comment can't be empty")]
    #[domain(kind = "Validation", code = "comment:empty")]
    EmptyComment,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_errors_report_inner_kind_and_code() {
        let err = Error::from(NotFound::Category("HP-XX".into()));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.code().as_deref(), Some("category:not-found"));
        assert!(!err.is_rejection());

        let err = Error::from(ValidationError::EmptyComment);
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.is_rejection());
        assert_eq!(err.describe(), "comment:empty: Comment can't be empty");
    }

    #[test]
    fn store_errors_are_internal() {
        let err = Error::from(StoreError::Poisoned);
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.code(), None);
    }
}
