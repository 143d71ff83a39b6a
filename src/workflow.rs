//! Single entry point for working with documents.
//!
//! Each operation is carried out as one transaction. Events describing its
//! outcome are published only after that transaction has committed.

use chrono::{Duration, NaiveDateTime, Utc};
use failure::Fail;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    audit::{self, Actor, Caller, Record},
    db::types::{AuditAction, CommentType, DocumentStatus},
    error::{Error, NotFound, ValidationError},
    events::{
        Created,
        EventManager,
        FileStore,
        GenerationRequested,
        Listener,
        RenderError,
        Renderer,
        StatusChanged,
    },
    lifecycle::{self, Decision, Request, Transition, Trigger},
    models::{
        category::{self, AllocationError, Category, NewCategory},
        comment::{self, Comment},
        content::Content,
        document::{self, Document, DocumentFilter, NewDocument, Patch},
        history::HistoryEntry,
        template::{NewTemplate, Template},
    },
    permissions::{self, ActorProfile, Capabilities, Directory},
    store::{self, Store, StoreError, Transaction},
};

/// Tunable behaviour of the workflow.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Settings {
    /// Record refused attempts in documents' history.
    #[serde(default = "default_audit_denied")]
    pub audit_denied: bool,
    /// Number of days after which a document waiting for review or approval
    /// is considered overdue.
    #[serde(default = "default_reminder_after_days")]
    pub reminder_after_days: u32,
}

fn default_audit_denied() -> bool {
    true
}

fn default_reminder_after_days() -> u32 {
    3
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            audit_denied: default_audit_denied(),
            reminder_after_days: default_reminder_after_days(),
        }
    }
}

/// Request to create a new document.
#[derive(Clone, Debug, Default)]
pub struct Draft {
    /// Code of the category to file the document under.
    pub category: String,
    pub template: Option<i32>,
    /// Title. When absent a title is derived from the category and template.
    pub title: Option<String>,
    pub content: Content,
}

/// Changes to a draft's substance.
#[derive(Clone, Debug, Default)]
pub struct Edit {
    pub title: Option<String>,
    pub content: Option<Content>,
}

/// Stage a document is waiting in.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Review,
    Approval,
}

/// A document which has been waiting for too long.
#[derive(Clone, Debug, PartialEq)]
pub struct Reminder {
    pub document: Document,
    pub stage: Stage,
    /// Since when the document has been waiting.
    pub since: NaiveDateTime,
    /// Actors who can move the document forward.
    pub recipients: Vec<i32>,
}

pub struct Workflow<S, D> {
    store: S,
    directory: D,
    events: EventManager,
    settings: Settings,
}

impl<S, D> Workflow<S, D>
where
    S: Store,
    D: Directory,
{
    pub fn new(store: S, directory: D) -> Workflow<S, D> {
        Workflow {
            store,
            directory,
            events: EventManager::new(),
            settings: Settings::default(),
        }
    }

    pub fn with_settings(self, settings: Settings) -> Workflow<S, D> {
        Workflow { settings, ..self }
    }

    /// Register a listener for events emitted by this workflow.
    pub fn listen<L>(&mut self, listener: L)
    where
        L: Listener + 'static,
    {
        self.events.register(listener);
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Create a new draft, issuing it a document number.
    pub fn create(&self, caller: &Caller, draft: Draft) -> Result<Document, Error> {
        let actor = permissions::resolve(&self.directory, caller.actor)?;
        let now = now();

        let document = self.store.transaction(|tx| {
            let category = tx.category(&draft.category)?
                .ok_or_else(|| AllocationError::CategoryNotFound(draft.category.clone()))?;

            let template = match draft.template {
                Some(id) => Some(usable_template(tx, id, &category)?),
                None => None,
            };

            if let Some(ref template) = template {
                template.schema.validate(&draft.content)?;
            }

            let title = match draft.title.as_ref().map(|t| t.trim()) {
                Some(title) if !title.is_empty() => title.to_string(),
                _ => default_title(&category, template.as_ref()),
            };
            validate_title(&title)?;

            let number = category::issue_number(tx, &category.code)?;

            let document = tx.insert_document(NewDocument {
                id: Uuid::new_v4(),
                number,
                category: category.id,
                template: template.map(|t| t.id),
                title,
                content: draft.content,
                created_by: actor.id,
                created_at: now,
            })?;

            audit::record(tx, &document, Record {
                actor: Actor::User(actor.id),
                action: AuditAction::Create,
                from: None,
                to: document.status,
                comment: None,
                origin: caller.origin,
            }, now)?;

            Ok::<_, Error>(document)
        })?;

        info!("{} created {} ({})", actor.name, document.number, document.id);

        self.events.notify(Created {
            document: document.id,
            number: document.number.clone(),
            author: document.created_by,
        });

        Ok(document)
    }

    /// Submit a draft for review.
    pub fn submit(&self, caller: &Caller, id: Uuid, comment: Option<&str>)
    -> Result<Document, Error> {
        self.apply(caller, id, Trigger::Submit, comment)
    }

    /// Review a submitted document.
    pub fn review(
        &self,
        caller: &Caller,
        id: Uuid,
        decision: Decision,
        comment: Option<&str>,
    ) -> Result<Document, Error> {
        self.apply(caller, id, decision.review(), comment)
    }

    /// Give final approval to (or reject) a reviewed document.
    pub fn approve(
        &self,
        caller: &Caller,
        id: Uuid,
        decision: Decision,
        comment: Option<&str>,
    ) -> Result<Document, Error> {
        self.apply(caller, id, decision.approval(), comment)
    }

    /// Turn a rejected document back into a draft.
    pub fn revise(&self, caller: &Caller, id: Uuid) -> Result<Document, Error> {
        self.apply(caller, id, Trigger::Revise, None)
    }

    /// Apply the same trigger to many documents.
    ///
    /// Each document is processed in its own transaction, so a failure for one
    /// of them doesn't affect the others.
    pub fn apply_many(
        &self,
        caller: &Caller,
        ids: &[Uuid],
        trigger: Trigger,
        comment: Option<&str>,
    ) -> Vec<(Uuid, Result<Document, Error>)> {
        ids.iter()
            .map(|&id| (id, self.apply(caller, id, trigger, comment)))
            .collect()
    }

    /// Move a document through the lifecycle.
    pub fn apply(
        &self,
        caller: &Caller,
        id: Uuid,
        trigger: Trigger,
        comment: Option<&str>,
    ) -> Result<Document, Error> {
        let actor = permissions::resolve(&self.directory, caller.actor)?;

        match self.transition(caller, &actor, id, trigger, comment) {
            Ok(outcome) => Ok(self.after_transition(&actor, outcome)),
            Err(err) => {
                self.deny(caller, id, trigger.as_str(), &err);
                Err(err)
            }
        }
    }

    fn transition(
        &self,
        caller: &Caller,
        actor: &ActorProfile,
        id: Uuid,
        trigger: Trigger,
        comment: Option<&str>,
    ) -> Result<(Document, Transition), Error> {
        let now = now();

        self.store.transaction(|tx| -> Result<(Document, Transition), Error> {
            let document = tx.lock_document(id)?.ok_or(NotFound::Document(id))?;
            let author = self.directory.profile(document.created_by);

            let transition = lifecycle::plan(&document, &Request {
                trigger,
                actor,
                author: author.as_ref(),
                comment,
                now,
            })?;

            debug!("{} planned {} of {}: {} -> {}",
                actor.name, trigger, document.number, transition.from, transition.to);

            let updated = store::update_document(tx, &document, &transition.patch, now)?;

            audit::record(tx, &updated, Record {
                actor: Actor::User(actor.id),
                action: transition.action,
                from: Some(transition.from),
                to: transition.to,
                comment: transition.comment.as_ref().map(String::as_str),
                origin: caller.origin,
            }, now)?;

            if transition.comment_is_mandatory() {
                if let (Some(kind), Some(text)) =
                    (trigger.comment_type(), transition.comment.as_ref())
                {
                    comment::add(tx, id, actor.id, kind, text, now)?;
                }
            }

            Ok((updated, transition))
        })
    }

    /// Carry out everything that follows a committed transition.
    fn after_transition(&self, actor: &ActorProfile, outcome: (Document, Transition))
    -> Document {
        let (document, transition) = outcome;

        info!("{} moved {} from {} to {} ({})", actor.name, document.number,
            transition.from, transition.to, transition.trigger);

        if !transition.comment_is_mandatory() {
            if let (Some(kind), Some(text)) =
                (transition.trigger.comment_type(), transition.comment.as_ref())
            {
                self.add_comment_best_effort(&document, actor.id, kind, text);
            }
        }

        self.events.notify(StatusChanged {
            document: document.id,
            number: document.number.clone(),
            trigger: transition.trigger,
            from: transition.from,
            to: transition.to,
            actor: actor.id,
            author: document.created_by,
        });

        if transition.to == DocumentStatus::Approved {
            self.events.notify(GenerationRequested {
                document: document.id,
                number: document.number.clone(),
            });
        }

        document
    }

    /// Store an optional comment after its transition has committed.
    fn add_comment_best_effort(
        &self,
        document: &Document,
        actor: i32,
        kind: CommentType,
        text: &str,
    ) {
        let now = now();
        let result = self.store.transaction(|tx| {
            comment::add(tx, document.id, actor, kind, text, now)
        });

        if let Err(err) = result {
            warn!("Could not store {} comment on {}: {}", kind, document.number, err);
        }
    }

    /// Record a refused attempt, if it was refused because of the caller.
    fn deny(&self, caller: &Caller, id: Uuid, attempt: &str, error: &Error) {
        if !self.settings.audit_denied || !error.is_rejection() {
            return;
        }

        let reason = format!("{} refused: {}", attempt, error.describe());
        let now = now();

        let result = self.store.transaction(|tx| -> Result<_, StoreError> {
            match tx.document(id)? {
                Some(document) => audit::record_denied(tx, &document, caller, &reason, now)
                    .map(Some),
                None => Ok(None),
            }
        });

        match result {
            Ok(Some(entry)) => debug!("Recorded refused attempt {}", entry.id),
            Ok(None) => (),
            Err(err) => warn!("Could not record refused attempt on {}: {}", id, err),
        }
    }

    /// Change a draft's title or content.
    ///
    /// Only the author (or an administrator) can edit a document, and only
    /// while it is an unlocked draft.
    pub fn edit(&self, caller: &Caller, id: Uuid, edit: Edit) -> Result<Document, Error> {
        let actor = permissions::resolve(&self.directory, caller.actor)?;
        let now = now();

        let result = self.store.transaction(|tx| -> Result<Document, Error> {
            let document = tx.lock_document(id)?.ok_or(NotFound::Document(id))?;

            let patch = Patch {
                title: edit.title.as_ref().map(|t| t.trim().to_string()),
                content: edit.content.clone(),
                ..Patch::default()
            };

            crate::guard::check_patch(&document, &patch)?;

            if document.status != DocumentStatus::Draft {
                return Err(EditError::NotDraft(document.status).into());
            }

            if actor.id != document.created_by && !actor.is_admin() {
                return Err(EditError::NotAuthor.into());
            }

            if let Some(ref title) = patch.title {
                validate_title(title)?;
            }

            if let (Some(template), Some(content)) = (document.template, patch.content.as_ref()) {
                let template = tx.template(template)?
                    .ok_or(NotFound::Template(template))?;
                template.schema.validate(content)?;
            }

            if patch.is_empty() {
                return Ok(document);
            }

            let updated = store::update_document(tx, &document, &patch, now)?;

            audit::record(tx, &updated, Record {
                actor: Actor::User(actor.id),
                action: AuditAction::Edit,
                from: Some(document.status),
                to: updated.status,
                comment: None,
                origin: caller.origin,
            }, now)?;

            Ok(updated)
        });

        match result {
            Ok(document) => {
                info!("{} edited {}", actor.name, document.number);
                Ok(document)
            }
            Err(err) => {
                self.deny(caller, id, "edit", &err);
                Err(err)
            }
        }
    }

    /// Replace a draft's content.
    pub fn edit_content(&self, caller: &Caller, id: Uuid, content: Content)
    -> Result<Document, Error> {
        self.edit(caller, id, Edit { title: None, content: Some(content) })
    }

    /// Add a general comment to a document.
    pub fn comment(&self, caller: &Caller, id: Uuid, text: &str) -> Result<Comment, Error> {
        let actor = permissions::resolve(&self.directory, caller.actor)?;
        let now = now();

        self.store.transaction(|tx| {
            tx.document(id)?.ok_or(NotFound::Document(id))?;
            comment::add(tx, id, actor.id, CommentType::General, text, now)
                .map_err(Error::from)
        })
    }

    /// Attach a generated file to an approved document.
    ///
    /// This is the only write allowed on a locked document besides lifecycle
    /// transitions.
    pub fn attach_generated_file(&self, id: Uuid, reference: &str) -> Result<Document, Error> {
        let now = now();

        let document = self.store.transaction(|tx| -> Result<Document, Error> {
            let document = tx.lock_document(id)?.ok_or(NotFound::Document(id))?;

            if document.status != DocumentStatus::Approved {
                return Err(EditError::NotApproved(document.status).into());
            }

            let updated = store::update_document(tx, &document, &Patch {
                generated_file: Some(Some(reference.to_string())),
                ..Patch::default()
            }, now)?;

            audit::record(tx, &updated, Record {
                actor: Actor::System,
                action: AuditAction::AttachFile,
                from: Some(updated.status),
                to: updated.status,
                comment: Some(reference),
                origin: None,
            }, now)?;

            Ok(updated)
        })?;

        info!("Attached {} to {}", reference, document.number);

        Ok(document)
    }

    /// Generate a file from an approved document and attach it.
    ///
    /// Failures are reported, but leave the document approved without a file.
    /// Generation can be retried.
    pub fn generate_file(
        &self,
        id: Uuid,
        renderer: &dyn Renderer,
        files: &dyn FileStore,
    ) -> Result<Document, Error> {
        let document = self.document(id)?;

        if document.status != DocumentStatus::Approved {
            return Err(EditError::NotApproved(document.status).into());
        }

        let data = renderer.render(&document).map_err(|err| {
            error!("Could not render {}: {}", document.number, err);
            RenderError::Render(err)
        })?;

        let name = format!("{}-r{}.{}", document.number, document.revision,
            renderer.extension());

        let reference = files.save(&name, &data).map_err(|err| {
            error!("Could not save {}: {}", name, err);
            RenderError::Save(err)
        })?;

        self.attach_generated_file(id, &reference)
    }

    /// Find documents which have been waiting for review or approval for
    /// longer than configured.
    pub fn overdue(&self, now: NaiveDateTime) -> Result<Vec<Reminder>, Error> {
        let threshold = now - Duration::days(i64::from(self.settings.reminder_after_days));
        let reviewers = self.holders(Capabilities::REVIEW);
        let approvers = self.holders(Capabilities::APPROVE);

        let documents = self.store.transaction(|tx| {
            let mut documents = tx.documents(&DocumentFilter {
                status: Some(DocumentStatus::PendingReview),
                ..DocumentFilter::default()
            })?;
            documents.extend(tx.documents(&DocumentFilter {
                status: Some(DocumentStatus::PendingApproval),
                ..DocumentFilter::default()
            })?);
            Ok::<_, Error>(documents)
        })?;

        Ok(documents.into_iter()
            .filter_map(|document| {
                let (stage, since, recipients) = match document.status {
                    DocumentStatus::PendingReview =>
                        (Stage::Review, document.submitted_at?, &reviewers),
                    DocumentStatus::PendingApproval =>
                        (Stage::Approval, document.reviewed_at?, &approvers),
                    _ => return None,
                };

                if since > threshold {
                    return None;
                }

                Some(Reminder {
                    stage,
                    since,
                    recipients: recipients.clone(),
                    document,
                })
            })
            .collect())
    }

    fn holders(&self, capabilities: Capabilities) -> Vec<i32> {
        self.directory.holders(capabilities)
            .into_iter()
            .map(|actor| actor.id)
            .collect()
    }

    pub fn document(&self, id: Uuid) -> Result<Document, Error> {
        self.store.transaction(|tx| {
            tx.document(id)?.ok_or_else(|| NotFound::Document(id).into())
        })
    }

    pub fn document_by_number(&self, number: &str) -> Result<Document, Error> {
        self.store.transaction(|tx| {
            tx.document_by_number(number)?
                .ok_or_else(|| NotFound::DocumentNumber(number.to_string()).into())
        })
    }

    pub fn documents(&self, filter: &DocumentFilter) -> Result<Vec<Document>, Error> {
        self.store.transaction(|tx| tx.documents(filter).map_err(Error::from))
    }

    /// Get history of a document, oldest first.
    pub fn history(&self, id: Uuid) -> Result<Vec<HistoryEntry>, Error> {
        self.store.transaction(|tx| {
            tx.document(id)?.ok_or(NotFound::Document(id))?;
            tx.history(id).map_err(Error::from)
        })
    }

    /// Read the history of all documents, in the order it was recorded.
    ///
    /// Pass the ID of the last entry of a page as `cursor` to get the next.
    pub fn history_after(&self, cursor: Option<i64>, limit: usize)
    -> Result<Vec<HistoryEntry>, Error> {
        self.store.transaction(|tx| tx.history_after(cursor, limit).map_err(Error::from))
    }

    pub fn categories(&self) -> Result<Vec<Category>, Error> {
        self.store.transaction(|tx| tx.categories().map_err(Error::from))
    }

    pub fn category(&self, code: &str) -> Result<Category, Error> {
        self.store.transaction(|tx| {
            tx.category(code)?.ok_or_else(|| NotFound::Category(code.to_string()).into())
        })
    }

    /// Get templates, optionally only those of a single category.
    pub fn templates(&self, category: Option<&str>) -> Result<Vec<Template>, Error> {
        self.store.transaction(|tx| {
            let category = match category {
                Some(code) => Some(tx.category(code)?
                    .ok_or_else(|| NotFound::Category(code.to_string()))?
                    .id),
                None => None,
            };
            tx.templates(category).map_err(Error::from)
        })
    }

    /// Create a new category. Only administrators can do this.
    pub fn create_category(&self, caller: &Caller, new: &NewCategory)
    -> Result<Category, Error> {
        let actor = permissions::resolve(&self.directory, caller.actor)?;
        actor.capabilities().require(Capabilities::ADMIN)?;

        let category = self.store.transaction(|tx| -> Result<Category, Error> {
            if tx.category(&new.code)?.is_some() {
                return Err(ValidationError::CategoryExists(new.code.clone()).into());
            }

            match tx.insert_category(new) {
                Ok(category) => Ok(category),
                Err(StoreError::Duplicate(_)) =>
                    Err(ValidationError::CategoryExists(new.code.clone()).into()),
                Err(err) => Err(err.into()),
            }
        })?;
        info!("{} created category {} ({})", actor.name, category.code, category.name);

        Ok(category)
    }

    /// Enable or disable issuing numbers in a category. Only administrators
    /// can do this.
    pub fn set_category_active(&self, caller: &Caller, code: &str, active: bool)
    -> Result<Category, Error> {
        let actor = permissions::resolve(&self.directory, caller.actor)?;
        actor.capabilities().require(Capabilities::ADMIN)?;

        self.store.transaction(|tx| -> Result<Category, Error> {
            let category = tx.lock_category(code)?
                .ok_or_else(|| NotFound::Category(code.to_string()))?;
            tx.set_category_active(category.id, active)?;
            Ok(Category { active, ..category })
        })
    }

    /// Create a new template in a category. Only administrators can do this.
    pub fn create_template(&self, caller: &Caller, new: &NewTemplate)
    -> Result<Template, Error> {
        let actor = permissions::resolve(&self.directory, caller.actor)?;
        actor.capabilities().require(Capabilities::ADMIN)?;

        let template = self.store.transaction(|tx| -> Result<Template, Error> {
            tx.category_by_id(new.category)?
                .ok_or_else(|| NotFound::Category(new.category.to_string()))?;
            tx.insert_template(new).map_err(Error::from)
        })?;
        info!("{} created template {} ({})", actor.name, template.id, template.name);

        Ok(template)
    }

    pub fn comments(&self, id: Uuid) -> Result<Vec<Comment>, Error> {
        self.store.transaction(|tx| {
            tx.document(id)?.ok_or(NotFound::Document(id))?;
            tx.comments(id).map_err(Error::from)
        })
    }
}

/// A change to a document was refused.
#[derive(Debug, DomainError, Fail)]
pub enum EditError {
    /// Only drafts can be edited.
    #[fail(display = "Only drafts can be edited, this document is {}", _0)]
    #[domain(kind = "InvalidTransition", code = "document:edit:not-draft")]
    NotDraft(DocumentStatus),
    #[fail(display = "Only the author can edit this document")]
    #[domain(kind = "Permission", code = "document:edit:not-author")]
    NotAuthor,
    /// Generated files are only attached to approved documents.
    #[fail(display = "Can't attach a file to a document which is {}", _0)]
    #[domain(kind = "InvalidTransition", code = "document:attach:not-approved")]
    NotApproved(DocumentStatus),
}

/// Find a template and verify it can be used for a new document in
/// `category`.
fn usable_template(tx: &mut dyn Transaction, id: i32, category: &Category)
-> Result<Template, Error> {
    let template = tx.template(id)?.ok_or(NotFound::Template(id))?;

    if template.category != category.id {
        return Err(ValidationError::TemplateCategory {
            template: id,
            category: category.code.clone(),
        }.into());
    }

    if !template.active {
        return Err(ValidationError::TemplateInactive(id).into());
    }

    Ok(template)
}

fn default_title(category: &Category, template: Option<&Template>) -> String {
    match template {
        Some(template) => template.default_title(&category.name),
        None => format!("{} document", category.name),
    }
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    let length = title.chars().count();

    if length == 0 || length > document::MAX_TITLE_LENGTH {
        Err(ValidationError::Title(document::MAX_TITLE_LENGTH))
    } else {
        Ok(())
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}
