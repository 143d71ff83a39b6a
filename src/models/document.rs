use bitflags::bitflags;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::{fmt, num::ParseIntError, str::FromStr};
use uuid::Uuid;

use crate::db::types::DocumentStatus;
use super::content::Content;

/// Maximum length of a document's title, in characters.
pub const MAX_TITLE_LENGTH: usize = 300;

/// A regulated document.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Document {
    pub id: Uuid,
    /// Document number, issued once at creation and never changed.
    pub number: String,
    pub category: i32,
    pub template: Option<i32>,
    pub title: String,
    pub revision: Revision,
    pub content: Content,
    pub status: DocumentStatus,
    /// Locked documents can't have their content changed. A document is
    /// locked exactly when it is approved.
    pub locked: bool,
    pub created_by: i32,
    pub reviewed_by: Option<i32>,
    pub approved_by: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub submitted_at: Option<NaiveDateTime>,
    pub reviewed_at: Option<NaiveDateTime>,
    pub approved_at: Option<NaiveDateTime>,
    /// Reference to a file generated from this document after approval.
    pub generated_file: Option<String>,
    /// Incremented on every write, used to detect concurrent modifications.
    pub version: i32,
}

/// Data necessary to insert a new document.
#[derive(Clone, Debug)]
pub struct NewDocument {
    pub id: Uuid,
    pub number: String,
    pub category: i32,
    pub template: Option<i32>,
    pub title: String,
    pub content: Content,
    pub created_by: i32,
    pub created_at: NaiveDateTime,
}

impl NewDocument {
    /// Construct a draft from this data.
    pub fn into_document(self) -> Document {
        Document {
            id: self.id,
            number: self.number,
            category: self.category,
            template: self.template,
            title: self.title,
            revision: Revision::default(),
            content: self.content,
            status: DocumentStatus::Draft,
            locked: false,
            created_by: self.created_by,
            reviewed_by: None,
            approved_by: None,
            created_at: self.created_at,
            updated_at: self.created_at,
            submitted_at: None,
            reviewed_at: None,
            approved_at: None,
            generated_file: None,
            version: 1,
        }
    }
}

/// Revision of a document, incremented each time a rejected document is
/// revised back into a draft.
///
/// Revisions are stored and displayed as decimal strings.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Revision(pub u32);

impl Revision {
    pub fn next(self) -> Option<Revision> {
        self.0.checked_add(1).map(Revision)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.0)
    }
}

impl FromStr for Revision {
    type Err = ParseIntError;

    fn from_str(v: &str) -> Result<Self, Self::Err> {
        v.trim().parse().map(Revision)
    }
}

impl Serialize for Revision {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Revision {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let v = String::deserialize(d)?;
        v.parse().map_err(serde::de::Error::custom)
    }
}

bitflags! {
    /// Set of document fields touched by a write.
    pub struct Fields: u32 {
        const TITLE = 0x0001;
        const CONTENT = 0x0002;
        const REVISION = 0x0004;
        const STATUS = 0x0008;
        const LOCKED = 0x0010;
        const REVIEWER = 0x0020;
        const REVIEWED_AT = 0x0040;
        const APPROVER = 0x0080;
        const APPROVED_AT = 0x0100;
        const SUBMITTED_AT = 0x0200;
        const GENERATED_FILE = 0x0400;
        /// Fields which may still change once a document is locked.
        const ADMINISTRATIVE = Self::LOCKED.bits | Self::STATUS.bits
            | Self::APPROVER.bits | Self::APPROVED_AT.bits
            | Self::REVIEWER.bits | Self::REVIEWED_AT.bits
            | Self::GENERATED_FILE.bits;
    }
}

/// A set of changes to a document.
///
/// Every write to a document is expressed as a patch, so that the set of
/// fields it touches can be checked by [`crate::guard`] before it is applied.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Patch {
    pub title: Option<String>,
    pub content: Option<Content>,
    pub revision: Option<Revision>,
    pub status: Option<DocumentStatus>,
    pub locked: Option<bool>,
    pub reviewed_by: Option<Option<i32>>,
    pub reviewed_at: Option<Option<NaiveDateTime>>,
    pub approved_by: Option<Option<i32>>,
    pub approved_at: Option<Option<NaiveDateTime>>,
    pub submitted_at: Option<Option<NaiveDateTime>>,
    pub generated_file: Option<Option<String>>,
}

impl Patch {
    /// Get set of fields this patch changes.
    pub fn fields(&self) -> Fields {
        let mut fields = Fields::empty();
        fields.set(Fields::TITLE, self.title.is_some());
        fields.set(Fields::CONTENT, self.content.is_some());
        fields.set(Fields::REVISION, self.revision.is_some());
        fields.set(Fields::STATUS, self.status.is_some());
        fields.set(Fields::LOCKED, self.locked.is_some());
        fields.set(Fields::REVIEWER, self.reviewed_by.is_some());
        fields.set(Fields::REVIEWED_AT, self.reviewed_at.is_some());
        fields.set(Fields::APPROVER, self.approved_by.is_some());
        fields.set(Fields::APPROVED_AT, self.approved_at.is_some());
        fields.set(Fields::SUBMITTED_AT, self.submitted_at.is_some());
        fields.set(Fields::GENERATED_FILE, self.generated_file.is_some());
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Apply this patch to a document, bumping its version.
    pub fn apply(&self, document: &mut Document, now: NaiveDateTime) {
        if let Some(ref title) = self.title {
            document.title = title.clone();
        }
        if let Some(ref content) = self.content {
            document.content = content.clone();
        }
        if let Some(revision) = self.revision {
            document.revision = revision;
        }
        if let Some(status) = self.status {
            document.status = status;
        }
        if let Some(locked) = self.locked {
            document.locked = locked;
        }
        if let Some(reviewed_by) = self.reviewed_by {
            document.reviewed_by = reviewed_by;
        }
        if let Some(reviewed_at) = self.reviewed_at {
            document.reviewed_at = reviewed_at;
        }
        if let Some(approved_by) = self.approved_by {
            document.approved_by = approved_by;
        }
        if let Some(approved_at) = self.approved_at {
            document.approved_at = approved_at;
        }
        if let Some(submitted_at) = self.submitted_at {
            document.submitted_at = submitted_at;
        }
        if let Some(ref generated_file) = self.generated_file {
            document.generated_file = generated_file.clone();
        }
        document.updated_at = now;
        document.version += 1;
    }
}

/// Criteria for listing documents.
#[derive(Clone, Debug, Default)]
pub struct DocumentFilter {
    pub status: Option<DocumentStatus>,
    pub category: Option<i32>,
    pub created_by: Option<i32>,
}

impl DocumentFilter {
    pub fn matches(&self, document: &Document) -> bool {
        self.status.map_or(true, |s| document.status == s)
            && self.category.map_or(true, |c| document.category == c)
            && self.created_by.map_or(true, |c| document.created_by == c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn draft() -> Document {
        NewDocument {
            id: Uuid::new_v4(),
            number: "HP-QP-410".into(),
            category: 1,
            template: None,
            title: "Document control".into(),
            content: Content::new(),
            created_by: 3,
            created_at: NaiveDate::from_ymd(2024, 1, 2).and_hms(9, 0, 0),
        }.into_document()
    }

    #[test]
    fn new_documents_are_unlocked_drafts_at_revision_zero() {
        let doc = draft();
        assert_eq!(doc.status, DocumentStatus::Draft);
        assert!(!doc.locked);
        assert_eq!(doc.revision.to_string(), "0");
        assert_eq!(doc.version, 1);
    }

    #[test]
    fn patch_reports_touched_fields() {
        let patch = Patch {
            status: Some(DocumentStatus::Approved),
            locked: Some(true),
            approved_by: Some(Some(1)),
            ..Patch::default()
        };
        assert_eq!(patch.fields(),
            Fields::STATUS | Fields::LOCKED | Fields::APPROVER);
        assert!(Fields::ADMINISTRATIVE.contains(patch.fields()));

        let patch = Patch { title: Some("New".into()), ..Patch::default() };
        assert!(!Fields::ADMINISTRATIVE.contains(patch.fields()));
    }

    #[test]
    fn applying_patch_bumps_version() {
        let mut doc = draft();
        let later = NaiveDate::from_ymd(2024, 1, 3).and_hms(9, 0, 0);
        Patch {
            reviewed_by: Some(None),
            revision: Some(Revision(1)),
            ..Patch::default()
        }.apply(&mut doc, later);

        assert_eq!(doc.revision, Revision(1));
        assert_eq!(doc.version, 2);
        assert_eq!(doc.updated_at, later);
    }

    #[test]
    fn revisions_are_strings() {
        let rev: Revision = serde_json::from_str("\"7\"").unwrap();
        assert_eq!(rev, Revision(7));
        assert_eq!(serde_json::to_string(&rev.next().unwrap()).unwrap(), "\"8\"");
        assert_eq!(Revision(u32::max_value()).next(), None);
    }
}
