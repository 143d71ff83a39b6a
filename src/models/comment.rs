//! Comment ledger: human-readable annotations attached to documents.

use chrono::NaiveDateTime;
use failure::Fail;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    db::types::CommentType,
    error::ValidationError,
    store::{StoreError, Transaction},
};

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Comment {
    pub id: i32,
    pub document: Uuid,
    pub actor: i32,
    pub kind: CommentType,
    pub text: String,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug)]
pub struct NewComment<'a> {
    pub document: Uuid,
    pub actor: i32,
    pub kind: CommentType,
    pub text: &'a str,
    pub created_at: NaiveDateTime,
}

/// Normalise comment text, treating blank text as no comment at all.
pub fn normalize(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|text| !text.is_empty())
}

/// Add a comment to a document.
pub fn add(
    tx: &mut dyn Transaction,
    document: Uuid,
    actor: i32,
    kind: CommentType,
    text: &str,
    now: NaiveDateTime,
) -> Result<Comment, AddCommentError> {
    let text = normalize(Some(text)).ok_or(ValidationError::EmptyComment)?;

    tx.append_comment(&NewComment {
        document,
        actor,
        kind,
        text,
        created_at: now,
    }).map_err(From::from)
}

#[derive(Debug, DomainError, Fail, From)]
pub enum AddCommentError {
    #[fail(display = "{}", _0)]
    Validation(#[cause] #[from] ValidationError),
    #[fail(display = "{}", _0)]
    Store(#[cause] #[from] StoreError),
}

impl_from! { for crate::error::Error ;
    AddCommentError => |e| match e {
        AddCommentError::Validation(e) => e.into(),
        AddCommentError::Store(e) => e.into(),
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_comments_are_absent() {
        assert_eq!(normalize(None), None);
        assert_eq!(normalize(Some("   \n")), None);
        assert_eq!(normalize(Some("  Fix section 3 ")), Some("Fix section 3"));
    }
}
