//! Document categories and the sequence allocator issuing document numbers.

use chrono::NaiveDateTime;
use failure::Fail;
use serde::{Deserialize, Serialize};

use crate::store::{StoreError, Transaction};

/// Counter value new categories start from.
pub const DEFAULT_FIRST_NUMBER: i32 = 1000;

/// A classification grouping documents under a shared numbering prefix.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Category {
    pub id: i32,
    /// Unique code, for example `HP-QP`.
    pub code: String,
    pub name: String,
    pub description: String,
    /// Prefix of document numbers issued in this category.
    pub prefix: String,
    /// Number the next document in this category will receive.
    pub next_number: i32,
    pub active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NewCategory {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub prefix: String,
    #[serde(default = "default_first_number")]
    pub next_number: i32,
}

fn default_first_number() -> i32 {
    DEFAULT_FIRST_NUMBER
}

impl Category {
    /// Format a document number.
    pub fn format_number(&self, number: i32) -> String {
        format!("{}{}", self.prefix, number)
    }
}

/// Issue the next document number in a category.
///
/// The category's row is locked for the rest of the transaction, so two
/// concurrent allocations in the same category are serialised and never
/// receive the same number. This is the only function allowed to advance
/// a category's counter.
pub fn issue_number(tx: &mut dyn Transaction, code: &str)
-> Result<String, AllocationError> {
    let category = tx.lock_category(code)?
        .ok_or_else(|| AllocationError::CategoryNotFound(code.to_string()))?;

    if !category.active {
        return Err(AllocationError::Inactive(category.code));
    }

    if category.next_number == i32::max_value() {
        return Err(AllocationError::Exhausted(category.code));
    }

    let number = tx.advance_counter(category.id)?;

    debug!("Issued number {} in category {}", number, category.code);

    Ok(category.format_number(number))
}

#[derive(Debug, DomainError, Fail, From)]
pub enum AllocationError {
    /// No category with given code exists.
    #[fail(display = "No such category: {}", _0)]
    #[domain(kind = "NotFound", code = "category:not-found")]
    CategoryNotFound(String),
    /// Category no longer accepts new documents.
    #[fail(display = "Category {} is inactive", _0)]
    #[domain(kind = "Allocation", code = "category:inactive")]
    Inactive(String),
    /// Counter can't be advanced any further.
    #[fail(display = "Category {} has run out of numbers", _0)]
    #[domain(kind = "Allocation", code = "category:exhausted")]
    Exhausted(String),
    #[fail(display = "{}", _0)]
    #[domain(internal)]
    Store(#[cause] #[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Store};

    fn store(next_number: i32, active: bool) -> MemoryStore {
        let store = MemoryStore::new();
        store.transaction(|tx| -> Result<(), StoreError> {
            let id = tx.insert_category(&NewCategory {
                code: "HP-QP".into(),
                name: "Quality procedure".into(),
                description: String::new(),
                prefix: "HP-QP-".into(),
                next_number,
            })?.id;
            if !active {
                tx.set_category_active(id, false)?;
            }
            Ok(())
        }).unwrap();
        store
    }

    #[test]
    fn issues_prefixed_numbers_and_advances_counter() {
        let store = store(410, true);

        let (first, second, category) = store.transaction(|tx| -> Result<_, AllocationError> {
            let first = issue_number(tx, "HP-QP")?;
            let second = issue_number(tx, "HP-QP")?;
            Ok((first, second, tx.category("HP-QP")?))
        }).unwrap();

        assert_eq!(first, "HP-QP-410");
        assert_eq!(second, "HP-QP-411");
        assert_eq!(category.unwrap().next_number, 412);
    }

    #[test]
    fn unknown_and_inactive_categories() {
        let store = store(1, false);

        let err = store.transaction(|tx| issue_number(tx, "HP-XX")).unwrap_err();
        assert!(matches!(err, AllocationError::CategoryNotFound(_)));

        let err = store.transaction(|tx| issue_number(tx, "HP-QP")).unwrap_err();
        assert!(matches!(err, AllocationError::Inactive(_)));
    }

    #[test]
    fn exhausted_counter() {
        let store = store(i32::max_value(), true);
        let err = store.transaction(|tx| issue_number(tx, "HP-QP")).unwrap_err();
        assert!(matches!(err, AllocationError::Exhausted(_)));
    }
}
