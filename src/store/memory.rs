use chrono::{NaiveDateTime, Utc};
use std::{collections::BTreeMap, sync::Mutex};
use uuid::Uuid;

use crate::models::{
    category::{Category, NewCategory},
    comment::{Comment, NewComment},
    document::{Document, DocumentFilter, NewDocument, Patch},
    history::{HistoryEntry, NewHistoryEntry},
    template::{NewTemplate, Template},
};
use super::{Store, StoreError, Transaction};

/// A store keeping everything in memory.
///
/// Transactions are fully serialised: each one holds the store for its whole
/// duration and works on a private copy of the state, which replaces the shared
/// one on commit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Clone, Debug, Default)]
struct State {
    categories: BTreeMap<i32, Category>,
    templates: BTreeMap<i32, Template>,
    documents: Vec<Document>,
    history: Vec<HistoryEntry>,
    comments: Vec<Comment>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

impl Store for MemoryStore {
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn Transaction) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut state = self.state.lock().map_err(|_| StoreError::Poisoned)?;
        let mut tx = MemoryTransaction { state: state.clone() };

        let result = f(&mut tx)?;
        *state = tx.state;

        Ok(result)
    }
}

struct MemoryTransaction {
    state: State,
}

impl MemoryTransaction {
    fn find_document(&self, id: Uuid) -> Option<&Document> {
        self.state.documents.iter().find(|d| d.id == id)
    }
}

fn next_id<V>(map: &BTreeMap<i32, V>) -> i32 {
    map.keys().next_back().map_or(1, |id| id + 1)
}

impl Transaction for MemoryTransaction {
    fn categories(&mut self) -> Result<Vec<Category>, StoreError> {
        let mut categories = self.state.categories.values().cloned().collect::<Vec<_>>();
        categories.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(categories)
    }

    fn category(&mut self, code: &str) -> Result<Option<Category>, StoreError> {
        Ok(self.state.categories.values().find(|c| c.code == code).cloned())
    }

    fn category_by_id(&mut self, id: i32) -> Result<Option<Category>, StoreError> {
        Ok(self.state.categories.get(&id).cloned())
    }

    fn lock_category(&mut self, code: &str) -> Result<Option<Category>, StoreError> {
        self.category(code)
    }

    fn insert_category(&mut self, new: &NewCategory) -> Result<Category, StoreError> {
        if self.state.categories.values().any(|c| c.code == new.code) {
            return Err(StoreError::Duplicate(format!("category code {}", new.code)));
        }

        let category = Category {
            id: next_id(&self.state.categories),
            code: new.code.clone(),
            name: new.name.clone(),
            description: new.description.clone(),
            prefix: new.prefix.clone(),
            next_number: new.next_number,
            active: true,
            created_at: Utc::now().naive_utc(),
        };
        self.state.categories.insert(category.id, category.clone());

        Ok(category)
    }

    fn set_category_active(&mut self, id: i32, active: bool) -> Result<(), StoreError> {
        match self.state.categories.get_mut(&id) {
            Some(category) => {
                category.active = active;
                Ok(())
            }
            None => Err(StoreError::Corrupt(format!("no category {}", id))),
        }
    }

    fn advance_counter(&mut self, id: i32) -> Result<i32, StoreError> {
        let category = self.state.categories.get_mut(&id)
            .ok_or_else(|| StoreError::Corrupt(format!("no category {}", id)))?;

        let number = category.next_number;
        category.next_number = number.checked_add(1)
            .ok_or_else(|| StoreError::Corrupt("counter overflow".to_string()))?;

        Ok(number)
    }

    fn templates(&mut self, category: Option<i32>) -> Result<Vec<Template>, StoreError> {
        Ok(self.state.templates.values()
            .filter(|t| category.map_or(true, |c| t.category == c))
            .cloned()
            .collect())
    }

    fn template(&mut self, id: i32) -> Result<Option<Template>, StoreError> {
        Ok(self.state.templates.get(&id).cloned())
    }

    fn insert_template(&mut self, new: &NewTemplate) -> Result<Template, StoreError> {
        if !self.state.categories.contains_key(&new.category) {
            return Err(StoreError::Corrupt(format!("no category {}", new.category)));
        }

        let template = Template {
            id: next_id(&self.state.templates),
            category: new.category,
            name: new.name.clone(),
            description: new.description.clone(),
            schema: new.schema.clone(),
            active: true,
            version: new.version.clone(),
        };
        self.state.templates.insert(template.id, template.clone());

        Ok(template)
    }

    fn document(&mut self, id: Uuid) -> Result<Option<Document>, StoreError> {
        Ok(self.find_document(id).cloned())
    }

    fn lock_document(&mut self, id: Uuid) -> Result<Option<Document>, StoreError> {
        self.document(id)
    }

    fn document_by_number(&mut self, number: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.state.documents.iter().find(|d| d.number == number).cloned())
    }

    fn documents(&mut self, filter: &DocumentFilter) -> Result<Vec<Document>, StoreError> {
        Ok(self.state.documents.iter()
            .filter(|d| filter.matches(d))
            .cloned()
            .collect())
    }

    fn insert_document(&mut self, new: NewDocument) -> Result<Document, StoreError> {
        if self.state.documents.iter().any(|d| d.number == new.number || d.id == new.id) {
            return Err(StoreError::Duplicate(format!("document number {}", new.number)));
        }

        let document = new.into_document();
        self.state.documents.push(document.clone());

        Ok(document)
    }

    fn write_document(
        &mut self,
        id: Uuid,
        expected_version: i32,
        patch: &Patch,
        now: NaiveDateTime,
    ) -> Result<Option<Document>, StoreError> {
        let document = match self.state.documents.iter_mut().find(|d| d.id == id) {
            Some(document) => document,
            None => return Ok(None),
        };

        if document.version != expected_version {
            return Ok(None);
        }

        patch.apply(document, now);

        Ok(Some(document.clone()))
    }

    fn append_history(&mut self, entry: &NewHistoryEntry) -> Result<HistoryEntry, StoreError> {
        let entry = HistoryEntry {
            id: self.state.history.last().map_or(1, |e| e.id + 1),
            document: entry.document,
            actor: entry.actor,
            action: entry.action,
            from_status: entry.from_status,
            to_status: entry.to_status,
            comment: entry.comment.map(str::to_string),
            origin: entry.origin,
            timestamp: entry.timestamp,
        };
        self.state.history.push(entry.clone());

        Ok(entry)
    }

    fn history(&mut self, document: Uuid) -> Result<Vec<HistoryEntry>, StoreError> {
        Ok(self.state.history.iter()
            .filter(|e| e.document == document)
            .cloned()
            .collect())
    }

    fn history_after(&mut self, cursor: Option<i64>, limit: usize)
    -> Result<Vec<HistoryEntry>, StoreError> {
        let cursor = cursor.unwrap_or(0);

        Ok(self.state.history.iter()
            .filter(|e| e.id > cursor)
            .take(limit)
            .cloned()
            .collect())
    }

    fn append_comment(&mut self, new: &NewComment) -> Result<Comment, StoreError> {
        let comment = Comment {
            id: self.state.comments.last().map_or(1, |c| c.id + 1),
            document: new.document,
            actor: new.actor,
            kind: new.kind,
            text: new.text.to_string(),
            created_at: new.created_at,
        };
        self.state.comments.push(comment.clone());

        Ok(comment)
    }

    fn comments(&mut self, document: Uuid) -> Result<Vec<Comment>, StoreError> {
        Ok(self.state.comments.iter()
            .filter(|c| c.document == document)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::{db::types::{AuditAction, DocumentStatus}, models::Content};

    fn new_document(number: &str) -> NewDocument {
        NewDocument {
            id: Uuid::new_v4(),
            number: number.into(),
            category: 1,
            template: None,
            title: "Record".into(),
            content: Content::new(),
            created_by: 1,
            created_at: NaiveDate::from_ymd(2024, 1, 1).and_hms(0, 0, 0),
        }
    }

    #[test]
    fn failed_transactions_leave_no_trace() {
        let store = MemoryStore::new();

        let result = store.transaction(|tx| -> Result<(), StoreError> {
            tx.insert_document(new_document("HP-QR-1"))?;
            Err(StoreError::Corrupt("abort".into()))
        });
        assert!(result.is_err());

        let docs = store.transaction(|tx| tx.documents(&DocumentFilter::default()))
            .unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn duplicate_keys_are_not_corruption() {
        let store = MemoryStore::new();

        let result = store.transaction(|tx| -> Result<(), StoreError> {
            tx.insert_document(new_document("HP-QR-1"))?;
            tx.insert_document(new_document("HP-QR-1"))?;
            Ok(())
        });

        assert!(matches!(result, Err(StoreError::Duplicate(_))));
    }

    #[test]
    fn writes_with_stale_version_are_refused() {
        let store = MemoryStore::new();
        let now = NaiveDate::from_ymd(2024, 1, 2).and_hms(0, 0, 0);

        store.transaction(|tx| -> Result<(), StoreError> {
            let doc = tx.insert_document(new_document("HP-QR-1"))?;
            let patch = Patch {
                status: Some(DocumentStatus::PendingReview),
                ..Patch::default()
            };

            let updated = tx.write_document(doc.id, doc.version, &patch, now)?;
            assert_eq!(updated.map(|d| d.version), Some(2));

            assert!(tx.write_document(doc.id, doc.version, &patch, now)?.is_none());
            Ok(())
        }).unwrap();
    }

    #[test]
    fn history_stream_pages_by_cursor() {
        let store = MemoryStore::new();
        let id = Uuid::new_v4();
        let now = NaiveDate::from_ymd(2024, 1, 2).and_hms(0, 0, 0);

        let page = store.transaction(|tx| -> Result<_, StoreError> {
            for _ in 0..5 {
                tx.append_history(&NewHistoryEntry {
                    document: id,
                    actor: Some(1),
                    action: AuditAction::Edit,
                    from_status: Some(DocumentStatus::Draft),
                    to_status: DocumentStatus::Draft,
                    comment: None,
                    origin: None,
                    timestamp: now,
                })?;
            }
            tx.history_after(Some(2), 2)
        }).unwrap();

        assert_eq!(page.iter().map(|e| e.id).collect::<Vec<_>>(), vec![3, 4]);
    }
}
