//! The document lifecycle state machine.
//!
//! ```text
//!            submit            review-approve             approve
//!   draft ───────────► pending_review ─────► pending_approval ─────► approved
//!     ▲  │                     │                  ▲    │               (locked)
//!     │  └───── submit (department head) ─────────┘    │
//!     │                        │ review-reject         │ final-reject
//!     │        revise          ▼                       │
//!     └─────────────────── rejected ◄──────────────────┘
//! ```
//!
//! [`plan()`] decides whether a transition is allowed, and what it changes,
//! without touching storage. Applying the resulting [`Transition`] is left to
//! [`crate::workflow`], which does so inside a single transaction.

use chrono::NaiveDateTime;
use failure::Fail;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::{
    db::types::{AuditAction, CommentType, DocumentStatus},
    models::{
        comment,
        document::{Document, Patch},
    },
    permissions::{ActorProfile, Capabilities, RequireCapabilitiesError},
};

/// An action moving a document from one status to another.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Trigger {
    /// Author submits a draft.
    Submit,
    /// Reviewer accepts a submitted document.
    ReviewApprove,
    /// Reviewer sends a submitted document back to its author.
    ReviewReject,
    /// Approver gives final approval, locking the document.
    Approve,
    /// Approver sends a reviewed document back to its author.
    FinalReject,
    /// Author turns a rejected document back into a draft.
    Revise,
}

impl Trigger {
    /// Status a document must be in for this trigger to apply.
    pub fn source(self) -> DocumentStatus {
        match self {
            Trigger::Submit => DocumentStatus::Draft,
            Trigger::ReviewApprove | Trigger::ReviewReject =>
                DocumentStatus::PendingReview,
            Trigger::Approve | Trigger::FinalReject =>
                DocumentStatus::PendingApproval,
            Trigger::Revise => DocumentStatus::Rejected,
        }
    }

    /// Rejections must always be explained.
    pub fn requires_comment(self) -> bool {
        match self {
            Trigger::ReviewReject | Trigger::FinalReject => true,
            _ => false,
        }
    }

    /// Type under which a comment supplied with this trigger is recorded.
    pub fn comment_type(self) -> Option<CommentType> {
        match self {
            Trigger::Submit => Some(CommentType::General),
            Trigger::ReviewApprove => Some(CommentType::Review),
            Trigger::ReviewReject | Trigger::FinalReject =>
                Some(CommentType::Rejection),
            Trigger::Approve => Some(CommentType::Approval),
            Trigger::Revise => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::Submit => "submit",
            Trigger::ReviewApprove => "review-approve",
            Trigger::ReviewReject => "review-reject",
            Trigger::Approve => "approve",
            Trigger::FinalReject => "final-reject",
            Trigger::Revise => "revise",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.as_str())
    }
}

impl FromStr for Trigger {
    type Err = UnknownTrigger;

    fn from_str(v: &str) -> Result<Self, Self::Err> {
        Ok(match v {
            "submit" => Trigger::Submit,
            "review-approve" => Trigger::ReviewApprove,
            "review-reject" => Trigger::ReviewReject,
            "approve" => Trigger::Approve,
            "reject" | "final-reject" => Trigger::FinalReject,
            "revise" => Trigger::Revise,
            _ => return Err(UnknownTrigger(v.to_string())),
        })
    }
}

#[derive(Debug, Fail)]
#[fail(display = "Unknown action: {:?}", _0)]
pub struct UnknownTrigger(String);

/// Outcome chosen by a reviewer or an approver.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn review(self) -> Trigger {
        match self {
            Decision::Approve => Trigger::ReviewApprove,
            Decision::Reject => Trigger::ReviewReject,
        }
    }

    pub fn approval(self) -> Trigger {
        match self {
            Decision::Approve => Trigger::Approve,
            Decision::Reject => Trigger::FinalReject,
        }
    }
}

/// An attempt to move a document.
#[derive(Clone, Copy, Debug)]
pub struct Request<'a> {
    pub trigger: Trigger,
    /// Actor attempting the transition.
    pub actor: &'a ActorProfile,
    /// Author of the document, if still known to the directory.
    pub author: Option<&'a ActorProfile>,
    pub comment: Option<&'a str>,
    pub now: NaiveDateTime,
}

/// A planned and authorised transition.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub trigger: Trigger,
    /// Label under which this transition is recorded in history.
    pub action: AuditAction,
    pub from: DocumentStatus,
    pub to: DocumentStatus,
    /// Changes to apply to the document.
    pub patch: Patch,
    /// Normalised comment, if any was supplied.
    pub comment: Option<String>,
}

impl Transition {
    /// Must the comment be stored atomically with the transition?
    pub fn comment_is_mandatory(&self) -> bool {
        self.trigger.requires_comment()
    }
}

/// Plan a transition of `document`.
///
/// Preconditions are checked in a fixed order: document status, then actor,
/// then comment. The first one to fail is reported.
pub fn plan(document: &Document, request: &Request) -> Result<Transition, TransitionError> {
    let trigger = request.trigger;
    let from = document.status;

    if from != trigger.source() {
        return Err(TransitionError::InvalidStatus { trigger, status: from });
    }

    authorize(document, request)?;

    let comment = comment::normalize(request.comment);

    if trigger.requires_comment() && comment.is_none() {
        return Err(TransitionError::CommentRequired(trigger));
    }

    let actor = Some(Some(request.actor.id));
    let now = Some(Some(request.now));

    let (action, patch) = match trigger {
        Trigger::Submit if request.actor.capabilities()
            .contains(Capabilities::DEPARTMENT_HEAD) =>
        (AuditAction::SubmitDirect, Patch {
            status: Some(DocumentStatus::PendingApproval),
            submitted_at: now,
            reviewed_by: actor,
            reviewed_at: now,
            ..Patch::default()
        }),
        Trigger::Submit => (AuditAction::Submit, Patch {
            status: Some(DocumentStatus::PendingReview),
            submitted_at: now,
            ..Patch::default()
        }),
        Trigger::ReviewApprove => (AuditAction::ReviewApprove, Patch {
            status: Some(DocumentStatus::PendingApproval),
            reviewed_by: actor,
            reviewed_at: now,
            ..Patch::default()
        }),
        Trigger::ReviewReject => (AuditAction::ReviewReject, Patch {
            status: Some(DocumentStatus::Rejected),
            reviewed_by: actor,
            reviewed_at: now,
            ..Patch::default()
        }),
        Trigger::Approve => (AuditAction::Approve, Patch {
            status: Some(DocumentStatus::Approved),
            locked: Some(true),
            approved_by: actor,
            approved_at: now,
            ..Patch::default()
        }),
        Trigger::FinalReject => (AuditAction::FinalReject, Patch {
            status: Some(DocumentStatus::Rejected),
            approved_by: actor,
            approved_at: now,
            ..Patch::default()
        }),
        Trigger::Revise => (AuditAction::Revise, Patch {
            status: Some(DocumentStatus::Draft),
            revision: Some(document.revision.next()
                .ok_or(TransitionError::RevisionExhausted)?),
            reviewed_by: Some(None),
            reviewed_at: Some(None),
            approved_by: Some(None),
            approved_at: Some(None),
            ..Patch::default()
        }),
    };

    let to = patch.status.unwrap_or(from);

    Ok(Transition {
        trigger,
        action,
        from,
        to,
        patch,
        comment: comment.map(str::to_string),
    })
}

/// Verify that the actor may take this action on this document.
fn authorize(document: &Document, request: &Request) -> Result<(), TransitionError> {
    let actor = request.actor;
    let caps = actor.capabilities();

    match request.trigger {
        Trigger::Submit | Trigger::Revise => {
            if actor.id != document.created_by {
                return Err(TransitionError::NotAuthor(request.trigger));
            }
        }
        Trigger::ReviewApprove | Trigger::ReviewReject => {
            caps.require(Capabilities::REVIEW)?;

            // Administrators may review documents of any department.
            if caps.contains(Capabilities::ADMIN) {
                return Ok(());
            }

            if !caps.contains(Capabilities::DEPARTMENT_HEAD) {
                return Err(TransitionError::NotDepartmentHead);
            }

            match request.author {
                Some(author) if actor.same_department(author) => (),
                _ => return Err(TransitionError::DepartmentMismatch),
            }
        }
        Trigger::Approve | Trigger::FinalReject => {
            caps.require(Capabilities::APPROVE)?;
        }
    }

    Ok(())
}

#[derive(Debug, DomainError, Fail, From)]
pub enum TransitionError {
    /// Document is not in the status this trigger applies to.
    #[fail(display = "Can't {} a document which is {}", trigger, status)]
    #[domain(kind = "InvalidTransition", code = "document:transition:invalid-status")]
    InvalidStatus {
        trigger: Trigger,
        status: DocumentStatus,
    },
    /// Only the document's author can take this action.
    #[fail(display = "Only the author can {} this document", _0)]
    #[domain(kind = "Permission", code = "document:transition:not-author")]
    NotAuthor(Trigger),
    /// Actor's role doesn't allow this action.
    #[fail(display = "{}", _0)]
    Capabilities(#[cause] #[from] RequireCapabilitiesError),
    /// Only department heads (and administrators) can review.
    #[fail(display = "Only department heads can review documents")]
    #[domain(kind = "Permission", code = "document:review:not-department-head")]
    NotDepartmentHead,
    /// Department heads can only review documents of their own department.
    #[fail(display = "Document was written in a different department")]
    #[domain(kind = "Permission", code = "document:review:department-mismatch")]
    DepartmentMismatch,
    /// Rejections must be explained.
    #[fail(display = "A comment is required to {}", _0)]
    #[domain(kind = "Validation", code = "document:transition:comment-required")]
    CommentRequired(Trigger),
    /// Revision counter can't be advanced any further.
    #[fail(display = "Document can't be revised any further")]
    #[domain(kind = "InvalidTransition", code = "document:revise:exhausted")]
    RevisionExhausted,
}
