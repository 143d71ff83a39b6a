//! Immutability of locked documents.
//!
//! Once a document is locked only [`Fields::ADMINISTRATIVE`] may change, and
//! the lock itself can never be released.

use failure::Fail;
use uuid::Uuid;

use crate::models::document::{Document, Fields, Patch};

/// Verify that `fields` may be changed on `document`.
pub fn assert_mutable(document: &Document, fields: Fields)
-> Result<(), LockedDocumentError> {
    if !document.locked {
        return Ok(());
    }

    let forbidden = fields - Fields::ADMINISTRATIVE;

    if forbidden.is_empty() {
        Ok(())
    } else {
        Err(LockedDocumentError::Fields {
            document: document.id,
            fields: forbidden,
        })
    }
}

/// Verify that `patch` may be applied to `document`.
///
/// In addition to [`assert_mutable()`] this also refuses to unlock a locked
/// document.
pub fn check_patch(document: &Document, patch: &Patch)
-> Result<(), LockedDocumentError> {
    assert_mutable(document, patch.fields())?;

    if document.locked && patch.locked == Some(false) {
        return Err(LockedDocumentError::Unlock(document.id));
    }

    Ok(())
}

#[derive(Debug, DomainError, Fail)]
pub enum LockedDocumentError {
    /// Write touches fields outside of the administrative whitelist.
    #[fail(display = "Document {} is locked, {:?} can't be changed", document, fields)]
    #[domain(kind = "Locked", code = "document:locked")]
    Fields {
        document: Uuid,
        fields: Fields,
    },
    /// Write attempts to unlock a document.
    #[fail(display = "Document {} can't be unlocked", _0)]
    #[domain(kind = "Locked", code = "document:locked:unlock")]
    Unlock(Uuid),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crate::{
        db::types::DocumentStatus,
        models::{Content, document::NewDocument},
    };

    fn document(locked: bool) -> Document {
        let mut doc = NewDocument {
            id: Uuid::new_v4(),
            number: "HP-QM-1000".into(),
            category: 1,
            template: None,
            title: "Quality manual".into(),
            content: Content::new(),
            created_by: 1,
            created_at: NaiveDate::from_ymd(2024, 5, 1).and_hms(8, 0, 0),
        }.into_document();
        if locked {
            doc.status = DocumentStatus::Approved;
            doc.locked = true;
        }
        doc
    }

    #[test]
    fn unlocked_documents_are_fully_mutable() {
        assert!(assert_mutable(&document(false), Fields::all()).is_ok());
    }

    #[test]
    fn locked_documents_only_accept_whitelisted_fields() {
        let doc = document(true);

        assert!(assert_mutable(&doc, Fields::GENERATED_FILE).is_ok());
        assert!(assert_mutable(&doc, Fields::ADMINISTRATIVE).is_ok());

        match assert_mutable(&doc, Fields::CONTENT | Fields::STATUS) {
            Err(LockedDocumentError::Fields { fields, .. }) =>
                assert_eq!(fields, Fields::CONTENT),
            other => panic!("unexpected result: {:?}", other),
        }

        assert!(assert_mutable(&doc, Fields::TITLE).is_err());
        assert!(assert_mutable(&doc, Fields::REVISION).is_err());
    }

    #[test]
    fn locked_documents_cannot_be_unlocked() {
        let doc = document(true);
        let patch = Patch {
            locked: Some(false),
            status: Some(DocumentStatus::Draft),
            ..Patch::default()
        };
        assert!(matches!(check_patch(&doc, &patch),
            Err(LockedDocumentError::Unlock(_))));

        let patch = Patch {
            generated_file: Some(Some("files/HP-QM-1000-r0.pdf".into())),
            ..Patch::default()
        };
        assert!(check_patch(&doc, &patch).is_ok());
    }
}
