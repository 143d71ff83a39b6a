#[cfg(feature = "postgres")]
use diesel_derive_enum::DbEnum;
use failure::Fail;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[cfg_attr(feature = "postgres", derive(DbEnum), DieselType = "Document_status")]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Document is being written and can be freely edited by its author.
    Draft,
    /// Document was submitted and awaits review by a department head.
    PendingReview,
    /// Document was reviewed and awaits final approval.
    PendingApproval,
    /// Document was approved. Approved documents are locked.
    Approved,
    /// Document was rejected either during review or approval. It can be
    /// revised back into a draft by its author.
    Rejected,
    /// Document was archived. This is a final state.
    Obsolete,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match *self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::PendingReview => "pending_review",
            DocumentStatus::PendingApproval => "pending_approval",
            DocumentStatus::Approved => "approved",
            DocumentStatus::Rejected => "rejected",
            DocumentStatus::Obsolete => "obsolete",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = UnknownVariant;

    fn from_str(v: &str) -> Result<Self, Self::Err> {
        Ok(match v {
            "draft" => DocumentStatus::Draft,
            "pending_review" => DocumentStatus::PendingReview,
            "pending_approval" => DocumentStatus::PendingApproval,
            "approved" => DocumentStatus::Approved,
            "rejected" => DocumentStatus::Rejected,
            "obsolete" => DocumentStatus::Obsolete,
            _ => return Err(UnknownVariant(v.to_string())),
        })
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[cfg_attr(feature = "postgres", derive(DbEnum), DieselType = "Comment_type")]
#[serde(rename_all = "snake_case")]
pub enum CommentType {
    General,
    Review,
    Rejection,
    Approval,
}

impl fmt::Display for CommentType {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(match *self {
            CommentType::General => "general",
            CommentType::Review => "review",
            CommentType::Rejection => "rejection",
            CommentType::Approval => "approval",
        })
    }
}

/// Label of an entry in a document's history.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[cfg_attr(feature = "postgres", derive(DbEnum), DieselType = "Audit_action")]
#[serde(rename_all = "kebab-case")]
pub enum AuditAction {
    Create,
    Edit,
    /// Submitted for review.
    Submit,
    /// Submitted by a department head, skipping review.
    SubmitDirect,
    ReviewApprove,
    ReviewReject,
    Approve,
    FinalReject,
    Revise,
    /// Generated file was attached to an approved document.
    AttachFile,
    /// An attempted action was refused.
    Denied,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(match *self {
            AuditAction::Create => "create",
            AuditAction::Edit => "edit",
            AuditAction::Submit => "submit",
            AuditAction::SubmitDirect => "submit-direct",
            AuditAction::ReviewApprove => "review-approve",
            AuditAction::ReviewReject => "review-reject",
            AuditAction::Approve => "approve",
            AuditAction::FinalReject => "final-reject",
            AuditAction::Revise => "revise",
            AuditAction::AttachFile => "attach-file",
            AuditAction::Denied => "denied",
        })
    }
}

#[derive(Debug, Fail)]
#[fail(display = "Unknown variant: {:?}", _0)]
pub struct UnknownVariant(pub String);
