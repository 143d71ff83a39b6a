//! Persistent storage of documents and everything attached to them.
//!
//! All reads and writes happen inside a [`Transaction`], obtained from
//! a [`Store`]. A transaction is committed when the closure passed to
//! [`Store::transaction()`] returns `Ok`, and rolled back otherwise.

use chrono::NaiveDateTime;
use failure::{Backtrace, Fail};
use std::{borrow::Cow, fmt};
use uuid::Uuid;

use crate::{
    error::{ConflictError, DomainError, Error, ErrorKind},
    guard,
    models::{
        category::{Category, NewCategory},
        comment::{Comment, NewComment},
        document::{Document, DocumentFilter, NewDocument, Patch},
        history::{HistoryEntry, NewHistoryEntry},
        template::{NewTemplate, Template},
    },
};

mod memory;

pub use self::memory::MemoryStore;

pub trait Store: Send + Sync {
    /// Run `f` inside a transaction.
    ///
    /// Changes made through the transaction are only visible to others after
    /// `f` returns `Ok`. If `f` fails all changes are discarded.
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn Transaction) -> Result<T, E>,
        E: From<StoreError>;
}

/// Operations available within a transaction.
pub trait Transaction {
    /// Get all categories.
    fn categories(&mut self) -> Result<Vec<Category>, StoreError>;

    /// Find a category by its code.
    fn category(&mut self, code: &str) -> Result<Option<Category>, StoreError>;

    /// Find a category by its ID.
    fn category_by_id(&mut self, id: i32) -> Result<Option<Category>, StoreError>;

    /// Find a category by its code, preventing others from modifying it until
    /// this transaction ends.
    fn lock_category(&mut self, code: &str) -> Result<Option<Category>, StoreError>;

    fn insert_category(&mut self, category: &NewCategory) -> Result<Category, StoreError>;

    fn set_category_active(&mut self, id: i32, active: bool) -> Result<(), StoreError>;

    /// Advance category's counter, returning its value from before the
    /// increment.
    ///
    /// This should only ever be called by
    /// [`issue_number()`](crate::models::category::issue_number).
    fn advance_counter(&mut self, id: i32) -> Result<i32, StoreError>;

    fn templates(&mut self, category: Option<i32>) -> Result<Vec<Template>, StoreError>;

    fn template(&mut self, id: i32) -> Result<Option<Template>, StoreError>;

    fn insert_template(&mut self, template: &NewTemplate) -> Result<Template, StoreError>;

    fn document(&mut self, id: Uuid) -> Result<Option<Document>, StoreError>;

    /// Find a document, preventing others from modifying it until this
    /// transaction ends.
    fn lock_document(&mut self, id: Uuid) -> Result<Option<Document>, StoreError>;

    fn document_by_number(&mut self, number: &str) -> Result<Option<Document>, StoreError>;

    /// Find documents matching a filter, oldest first.
    fn documents(&mut self, filter: &DocumentFilter) -> Result<Vec<Document>, StoreError>;

    fn insert_document(&mut self, document: NewDocument) -> Result<Document, StoreError>;

    /// Apply a patch to a document, provided it is still at
    /// `expected_version`.
    ///
    /// Returns `None` when the document was changed in the meantime. Callers
    /// should use [`update_document()`], which also consults
    /// [`crate::guard`].
    fn write_document(
        &mut self,
        id: Uuid,
        expected_version: i32,
        patch: &Patch,
        now: NaiveDateTime,
    ) -> Result<Option<Document>, StoreError>;

    fn append_history(&mut self, entry: &NewHistoryEntry) -> Result<HistoryEntry, StoreError>;

    /// Get history of a single document, oldest first.
    fn history(&mut self, document: Uuid) -> Result<Vec<HistoryEntry>, StoreError>;

    /// Get up to `limit` history entries of all documents, following entry
    /// `cursor` (or from the beginning if `cursor` is `None`).
    fn history_after(&mut self, cursor: Option<i64>, limit: usize)
    -> Result<Vec<HistoryEntry>, StoreError>;

    fn append_comment(&mut self, comment: &NewComment) -> Result<Comment, StoreError>;

    /// Get comments on a document, oldest first.
    fn comments(&mut self, document: Uuid) -> Result<Vec<Comment>, StoreError>;
}

/// Write a patch to a document.
///
/// The patch is checked against the immutability rules first, and written only
/// if the document wasn't modified since `document` was read.
pub fn update_document(
    tx: &mut dyn Transaction,
    document: &Document,
    patch: &Patch,
    now: NaiveDateTime,
) -> Result<Document, Error> {
    guard::check_patch(document, patch)?;

    tx.write_document(document.id, document.version, patch, now)?
        .ok_or_else(|| ConflictError { document: document.id }.into())
}

/// Failure of the storage itself.
#[derive(Debug)]
pub enum StoreError {
    #[cfg(feature = "postgres")]
    Database(diesel::result::Error),
    #[cfg(feature = "postgres")]
    Pool(r2d2::Error),
    /// Stored data could not be encoded.
    Encode(rmps::encode::Error),
    /// Stored data could not be decoded.
    Decode(rmps::decode::Error),
    /// Stored data is not valid.
    Corrupt(String),
    /// A record with the same unique key already exists.
    Duplicate(String),
    /// Another thread panicked while holding the store.
    Poisoned,
}

impl fmt::Display for StoreError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            #[cfg(feature = "postgres")]
            StoreError::Database(ref e) => write!(fmt, "Database error: {}", e),
            #[cfg(feature = "postgres")]
            StoreError::Pool(ref e) => write!(fmt, "Cannot obtain connection: {}", e),
            StoreError::Encode(ref e) => write!(fmt, "Cannot encode data: {}", e),
            StoreError::Decode(ref e) => write!(fmt, "Cannot decode data: {}", e),
            StoreError::Corrupt(ref what) => write!(fmt, "Corrupt data: {}", what),
            StoreError::Duplicate(ref what) => write!(fmt, "Duplicate {}", what),
            StoreError::Poisoned => fmt.write_str("Store is poisoned"),
        }
    }
}

impl Fail for StoreError {
    fn cause(&self) -> Option<&dyn Fail> {
        match *self {
            #[cfg(feature = "postgres")]
            StoreError::Database(ref e) => Some(e),
            #[cfg(feature = "postgres")]
            StoreError::Pool(ref e) => Some(e),
            StoreError::Encode(ref e) => Some(e),
            StoreError::Decode(ref e) => Some(e),
            StoreError::Corrupt(_)
            | StoreError::Duplicate(_)
            | StoreError::Poisoned => None,
        }
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        None
    }
}

impl DomainError for StoreError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Internal
    }

    fn code(&self) -> Option<Cow<str>> {
        None
    }
}

#[cfg(feature = "postgres")]
impl From<diesel::result::Error> for StoreError {
    fn from(e: diesel::result::Error) -> Self {
        use diesel::result::{DatabaseErrorKind, Error as DbError};

        match e {
            DbError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info) =>
                StoreError::Duplicate(info.message().to_string()),
            _ => StoreError::Database(e),
        }
    }
}

#[cfg(feature = "postgres")]
impl_from! { for StoreError ;
    r2d2::Error => |e| StoreError::Pool(e),
}

impl_from! { for StoreError ;
    rmps::encode::Error => |e| StoreError::Encode(e),
    rmps::decode::Error => |e| StoreError::Decode(e),
}
