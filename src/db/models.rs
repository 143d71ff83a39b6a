//! Database rows, and their conversions to and from domain models.

use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::{
    models::{
        category::{Category, NewCategory},
        comment::{Comment, NewComment},
        content,
        document::Document,
        history::{HistoryEntry, NewHistoryEntry},
        template::{NewTemplate, Template},
    },
    store::StoreError,
};
use super::{schema::*, types::*};

#[derive(Clone, Debug, Identifiable, Queryable)]
#[table_name = "document_categories"]
pub struct CategoryRow {
    pub id: i32,
    pub code: String,
    pub name: String,
    pub description: String,
    pub prefix: String,
    pub next_number: i32,
    pub active: bool,
    pub created_at: NaiveDateTime,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Category {
        Category {
            id: row.id,
            code: row.code,
            name: row.name,
            description: row.description,
            prefix: row.prefix,
            next_number: row.next_number,
            active: row.active,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone, Copy, Debug, Insertable)]
#[table_name = "document_categories"]
pub struct NewCategoryRow<'a> {
    pub code: &'a str,
    pub name: &'a str,
    pub description: &'a str,
    pub prefix: &'a str,
    pub next_number: i32,
}

impl<'a> From<&'a NewCategory> for NewCategoryRow<'a> {
    fn from(new: &'a NewCategory) -> Self {
        NewCategoryRow {
            code: &new.code,
            name: &new.name,
            description: &new.description,
            prefix: &new.prefix,
            next_number: new.next_number,
        }
    }
}

#[derive(Clone, Debug, Identifiable, Queryable)]
#[table_name = "document_templates"]
pub struct TemplateRow {
    pub id: i32,
    pub category: i32,
    pub name: String,
    pub description: String,
    /// Schema, encoded as MessagePack.
    pub fields: Vec<u8>,
    pub active: bool,
    pub version: String,
}

impl TemplateRow {
    pub fn into_template(self) -> Result<Template, StoreError> {
        Ok(Template {
            id: self.id,
            category: self.category,
            name: self.name,
            description: self.description,
            schema: rmps::from_slice(&self.fields)?,
            active: self.active,
            version: self.version,
        })
    }
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "document_templates"]
pub struct NewTemplateRow<'a> {
    pub category: i32,
    pub name: &'a str,
    pub description: &'a str,
    pub fields: Vec<u8>,
    pub version: &'a str,
}

impl<'a> NewTemplateRow<'a> {
    pub fn new(template: &'a NewTemplate) -> Result<Self, StoreError> {
        Ok(NewTemplateRow {
            category: template.category,
            name: &template.name,
            description: &template.description,
            fields: rmps::to_vec_named(&template.schema)?,
            version: &template.version,
        })
    }
}

#[derive(Clone, Debug, Identifiable, Queryable)]
#[table_name = "documents"]
pub struct DocumentRow {
    pub id: Uuid,
    pub number: String,
    pub category: i32,
    pub template: Option<i32>,
    pub title: String,
    pub revision: String,
    /// Content, encoded as MessagePack.
    pub content: Vec<u8>,
    pub status: DocumentStatus,
    pub locked: bool,
    pub created_by: i32,
    pub reviewed_by: Option<i32>,
    pub approved_by: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub submitted_at: Option<NaiveDateTime>,
    pub reviewed_at: Option<NaiveDateTime>,
    pub approved_at: Option<NaiveDateTime>,
    pub generated_file: Option<String>,
    pub version: i32,
}

impl DocumentRow {
    pub fn into_document(self) -> Result<Document, StoreError> {
        let revision = self.revision.parse().map_err(|_| StoreError::Corrupt(
            format!("invalid revision {:?} of {}", self.revision, self.number)))?;

        Ok(Document {
            id: self.id,
            number: self.number,
            category: self.category,
            template: self.template,
            title: self.title,
            revision,
            content: content::decode(&self.content)?,
            status: self.status,
            locked: self.locked,
            created_by: self.created_by,
            reviewed_by: self.reviewed_by,
            approved_by: self.approved_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
            submitted_at: self.submitted_at,
            reviewed_at: self.reviewed_at,
            approved_at: self.approved_at,
            generated_file: self.generated_file,
            version: self.version,
        })
    }
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "documents"]
pub struct NewDocumentRow<'a> {
    pub id: Uuid,
    pub number: &'a str,
    pub category: i32,
    pub template: Option<i32>,
    pub title: &'a str,
    pub revision: String,
    pub content: Vec<u8>,
    pub status: DocumentStatus,
    pub locked: bool,
    pub created_by: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub version: i32,
}

impl<'a> NewDocumentRow<'a> {
    pub fn new(document: &'a Document) -> Result<Self, StoreError> {
        Ok(NewDocumentRow {
            id: document.id,
            number: &document.number,
            category: document.category,
            template: document.template,
            title: &document.title,
            revision: document.revision.to_string(),
            content: content::encode(&document.content)?,
            status: document.status,
            locked: document.locked,
            created_by: document.created_by,
            created_at: document.created_at,
            updated_at: document.updated_at,
            version: document.version,
        })
    }
}

/// Every column of a document which can change after creation.
#[derive(AsChangeset, Clone, Debug)]
#[table_name = "documents"]
#[changeset_options(treat_none_as_null = "true")]
pub struct DocumentChanges<'a> {
    pub title: &'a str,
    pub revision: String,
    pub content: Vec<u8>,
    pub status: DocumentStatus,
    pub locked: bool,
    pub reviewed_by: Option<i32>,
    pub approved_by: Option<i32>,
    pub updated_at: NaiveDateTime,
    pub submitted_at: Option<NaiveDateTime>,
    pub reviewed_at: Option<NaiveDateTime>,
    pub approved_at: Option<NaiveDateTime>,
    pub generated_file: Option<&'a str>,
    pub version: i32,
}

impl<'a> DocumentChanges<'a> {
    pub fn new(document: &'a Document) -> Result<Self, StoreError> {
        Ok(DocumentChanges {
            title: &document.title,
            revision: document.revision.to_string(),
            content: content::encode(&document.content)?,
            status: document.status,
            locked: document.locked,
            reviewed_by: document.reviewed_by,
            approved_by: document.approved_by,
            updated_at: document.updated_at,
            submitted_at: document.submitted_at,
            reviewed_at: document.reviewed_at,
            approved_at: document.approved_at,
            generated_file: document.generated_file.as_ref().map(String::as_str),
            version: document.version,
        })
    }
}

#[derive(Clone, Debug, Identifiable, Queryable)]
#[table_name = "document_history"]
pub struct HistoryRow {
    pub id: i64,
    pub document: Uuid,
    pub actor: Option<i32>,
    pub action: AuditAction,
    pub from_status: Option<DocumentStatus>,
    pub to_status: DocumentStatus,
    pub comment: Option<String>,
    pub origin: Option<String>,
    pub timestamp: NaiveDateTime,
}

impl HistoryRow {
    pub fn into_entry(self) -> Result<HistoryEntry, StoreError> {
        let origin = match self.origin {
            Some(ref origin) => Some(origin.parse().map_err(|_| StoreError::Corrupt(
                format!("invalid origin {:?} in history entry {}", origin, self.id)))?),
            None => None,
        };

        Ok(HistoryEntry {
            id: self.id,
            document: self.document,
            actor: self.actor,
            action: self.action,
            from_status: self.from_status,
            to_status: self.to_status,
            comment: self.comment,
            origin,
            timestamp: self.timestamp,
        })
    }
}

#[derive(Clone, Debug, Insertable)]
#[table_name = "document_history"]
pub struct NewHistoryRow<'a> {
    pub document: Uuid,
    pub actor: Option<i32>,
    pub action: AuditAction,
    pub from_status: Option<DocumentStatus>,
    pub to_status: DocumentStatus,
    pub comment: Option<&'a str>,
    pub origin: Option<String>,
    pub timestamp: NaiveDateTime,
}

impl<'a> From<&'a NewHistoryEntry<'a>> for NewHistoryRow<'a> {
    fn from(entry: &'a NewHistoryEntry<'a>) -> Self {
        NewHistoryRow {
            document: entry.document,
            actor: entry.actor,
            action: entry.action,
            from_status: entry.from_status,
            to_status: entry.to_status,
            comment: entry.comment,
            origin: entry.origin.map(|ip| ip.to_string()),
            timestamp: entry.timestamp,
        }
    }
}

#[derive(Clone, Debug, Identifiable, Queryable)]
#[table_name = "document_comments"]
pub struct CommentRow {
    pub id: i32,
    pub document: Uuid,
    pub actor: i32,
    pub kind: CommentType,
    pub text: String,
    pub created_at: NaiveDateTime,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Comment {
        Comment {
            id: row.id,
            document: row.document,
            actor: row.actor,
            kind: row.kind,
            text: row.text,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone, Copy, Debug, Insertable)]
#[table_name = "document_comments"]
pub struct NewCommentRow<'a> {
    pub document: Uuid,
    pub actor: i32,
    pub kind: CommentType,
    pub text: &'a str,
    pub created_at: NaiveDateTime,
}

impl<'a> From<&'a NewComment<'a>> for NewCommentRow<'a> {
    fn from(comment: &'a NewComment<'a>) -> Self {
        NewCommentRow {
            document: comment.document,
            actor: comment.actor,
            kind: comment.kind,
            text: comment.text,
            created_at: comment.created_at,
        }
    }
}
