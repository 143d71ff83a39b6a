use chrono::NaiveDateTime;
use diesel::{
    pg::PgConnection,
    prelude::*,
    result::Error as DbError,
};
use std::convert::TryFrom;
use uuid::Uuid;

use crate::{
    models::{
        category::{Category, NewCategory},
        comment::{Comment, NewComment},
        document::{Document, DocumentFilter, NewDocument, Patch},
        history::{HistoryEntry, NewHistoryEntry},
        template::{NewTemplate, Template},
    },
    store::{Store, StoreError, Transaction},
};
use super::{
    Pool,
    models::*,
    schema::{
        document_categories,
        document_comments,
        document_history,
        document_templates,
        documents,
    },
};

/// A store backed by a PostgreSQL database.
///
/// Rows read with one of the `lock_*` methods are locked (`SELECT … FOR
/// UPDATE`) until the transaction ends, and every write to a document is
/// conditioned on its version, so that concurrent modifications are detected
/// rather than lost.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn new(pool: Pool) -> PgStore {
        PgStore { pool }
    }
}

/// Error aborting a database transaction.
enum TxError<E> {
    /// Database failed.
    Database(DbError),
    /// Caller chose to abort.
    Abort(E),
}

impl<E> From<DbError> for TxError<E> {
    fn from(e: DbError) -> Self {
        TxError::Database(e)
    }
}

impl Store for PgStore {
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn Transaction) -> Result<T, E>,
        E: From<StoreError>,
    {
        let conn = self.pool.get().map_err(StoreError::from)?;

        let result = conn.transaction::<_, TxError<E>, _>(|| {
            let mut tx = PgTransaction { conn: &*conn };
            f(&mut tx).map_err(TxError::Abort)
        });

        match result {
            Ok(value) => Ok(value),
            Err(TxError::Abort(err)) => Err(err),
            Err(TxError::Database(err)) => Err(StoreError::from(err).into()),
        }
    }
}

struct PgTransaction<'c> {
    conn: &'c PgConnection,
}

impl<'c> Transaction for PgTransaction<'c> {
    fn categories(&mut self) -> Result<Vec<Category>, StoreError> {
        Ok(document_categories::table
            .order_by(document_categories::code)
            .get_results::<CategoryRow>(self.conn)?
            .into_iter()
            .map(Category::from)
            .collect())
    }

    fn category(&mut self, code: &str) -> Result<Option<Category>, StoreError> {
        Ok(document_categories::table
            .filter(document_categories::code.eq(code))
            .get_result::<CategoryRow>(self.conn)
            .optional()?
            .map(Category::from))
    }

    fn category_by_id(&mut self, id: i32) -> Result<Option<Category>, StoreError> {
        Ok(document_categories::table
            .find(id)
            .get_result::<CategoryRow>(self.conn)
            .optional()?
            .map(Category::from))
    }

    fn lock_category(&mut self, code: &str) -> Result<Option<Category>, StoreError> {
        Ok(document_categories::table
            .filter(document_categories::code.eq(code))
            .for_update()
            .get_result::<CategoryRow>(self.conn)
            .optional()?
            .map(Category::from))
    }

    fn insert_category(&mut self, category: &NewCategory) -> Result<Category, StoreError> {
        Ok(diesel::insert_into(document_categories::table)
            .values(NewCategoryRow::from(category))
            .get_result::<CategoryRow>(self.conn)?
            .into())
    }

    fn set_category_active(&mut self, id: i32, active: bool) -> Result<(), StoreError> {
        diesel::update(document_categories::table.find(id))
            .set(document_categories::active.eq(active))
            .execute(self.conn)?;
        Ok(())
    }

    fn advance_counter(&mut self, id: i32) -> Result<i32, StoreError> {
        let next = diesel::update(document_categories::table.find(id))
            .set(document_categories::next_number.eq(
                document_categories::next_number + 1))
            .returning(document_categories::next_number)
            .get_result::<i32>(self.conn)?;

        Ok(next - 1)
    }

    fn templates(&mut self, category: Option<i32>) -> Result<Vec<Template>, StoreError> {
        let mut query = document_templates::table
            .order_by(document_templates::id)
            .into_boxed();

        if let Some(category) = category {
            query = query.filter(document_templates::category.eq(category));
        }

        query.get_results::<TemplateRow>(self.conn)?
            .into_iter()
            .map(TemplateRow::into_template)
            .collect()
    }

    fn template(&mut self, id: i32) -> Result<Option<Template>, StoreError> {
        document_templates::table
            .find(id)
            .get_result::<TemplateRow>(self.conn)
            .optional()?
            .map(TemplateRow::into_template)
            .transpose()
    }

    fn insert_template(&mut self, template: &NewTemplate) -> Result<Template, StoreError> {
        diesel::insert_into(document_templates::table)
            .values(&NewTemplateRow::new(template)?)
            .get_result::<TemplateRow>(self.conn)?
            .into_template()
    }

    fn document(&mut self, id: Uuid) -> Result<Option<Document>, StoreError> {
        documents::table
            .find(id)
            .get_result::<DocumentRow>(self.conn)
            .optional()?
            .map(DocumentRow::into_document)
            .transpose()
    }

    fn lock_document(&mut self, id: Uuid) -> Result<Option<Document>, StoreError> {
        documents::table
            .find(id)
            .for_update()
            .get_result::<DocumentRow>(self.conn)
            .optional()?
            .map(DocumentRow::into_document)
            .transpose()
    }

    fn document_by_number(&mut self, number: &str) -> Result<Option<Document>, StoreError> {
        documents::table
            .filter(documents::number.eq(number))
            .get_result::<DocumentRow>(self.conn)
            .optional()?
            .map(DocumentRow::into_document)
            .transpose()
    }

    fn documents(&mut self, filter: &DocumentFilter) -> Result<Vec<Document>, StoreError> {
        let mut query = documents::table
            .order_by((documents::created_at, documents::number))
            .into_boxed();

        if let Some(status) = filter.status {
            query = query.filter(documents::status.eq(status));
        }
        if let Some(category) = filter.category {
            query = query.filter(documents::category.eq(category));
        }
        if let Some(author) = filter.created_by {
            query = query.filter(documents::created_by.eq(author));
        }

        query.get_results::<DocumentRow>(self.conn)?
            .into_iter()
            .map(DocumentRow::into_document)
            .collect()
    }

    fn insert_document(&mut self, document: NewDocument) -> Result<Document, StoreError> {
        let document = document.into_document();

        diesel::insert_into(documents::table)
            .values(&NewDocumentRow::new(&document)?)
            .get_result::<DocumentRow>(self.conn)?
            .into_document()
    }

    fn write_document(
        &mut self,
        id: Uuid,
        expected_version: i32,
        patch: &Patch,
        now: NaiveDateTime,
    ) -> Result<Option<Document>, StoreError> {
        let mut document = match self.document(id)? {
            Some(document) if document.version == expected_version => document,
            _ => return Ok(None),
        };

        patch.apply(&mut document, now);

        diesel::update(documents::table
                .filter(documents::id.eq(id))
                .filter(documents::version.eq(expected_version)))
            .set(&DocumentChanges::new(&document)?)
            .get_result::<DocumentRow>(self.conn)
            .optional()?
            .map(DocumentRow::into_document)
            .transpose()
    }

    fn append_history(&mut self, entry: &NewHistoryEntry) -> Result<HistoryEntry, StoreError> {
        diesel::insert_into(document_history::table)
            .values(&NewHistoryRow::from(entry))
            .get_result::<HistoryRow>(self.conn)?
            .into_entry()
    }

    fn history(&mut self, document: Uuid) -> Result<Vec<HistoryEntry>, StoreError> {
        document_history::table
            .filter(document_history::document.eq(document))
            .order_by(document_history::id)
            .get_results::<HistoryRow>(self.conn)?
            .into_iter()
            .map(HistoryRow::into_entry)
            .collect()
    }

    fn history_after(&mut self, cursor: Option<i64>, limit: usize)
    -> Result<Vec<HistoryEntry>, StoreError> {
        document_history::table
            .filter(document_history::id.gt(cursor.unwrap_or(0)))
            .order_by(document_history::id)
            .limit(i64::try_from(limit).unwrap_or(i64::max_value()))
            .get_results::<HistoryRow>(self.conn)?
            .into_iter()
            .map(HistoryRow::into_entry)
            .collect()
    }

    fn append_comment(&mut self, comment: &NewComment) -> Result<Comment, StoreError> {
        Ok(diesel::insert_into(document_comments::table)
            .values(NewCommentRow::from(comment))
            .get_result::<CommentRow>(self.conn)?
            .into())
    }

    fn comments(&mut self, document: Uuid) -> Result<Vec<Comment>, StoreError> {
        Ok(document_comments::table
            .filter(document_comments::document.eq(document))
            .order_by(document_comments::id)
            .get_results::<CommentRow>(self.conn)?
            .into_iter()
            .map(Comment::from)
            .collect())
    }
}
