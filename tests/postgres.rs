//! Tests for the PostgreSQL store.
//!
//! These only run when `DATABASE_URL` points at a database which can be
//! dropped and re-created.

#![cfg(feature = "postgres")]

use chrono::Utc;
use diesel::{pg::PgConnection, prelude::*, result::Error as DbError};
use docflow::{
    DomainError,
    ErrorKind,
    Workflow,
    audit::Caller,
    db::{
        PgStore,
        schema::{document_categories, document_history, documents},
        types::{AuditAction, DocumentStatus},
    },
    lifecycle::Decision,
    models::{Document, NewCategory, Patch, history::NewHistoryEntry},
    permissions::StaticDirectory,
    store::{Store, StoreError},
    workflow::Draft,
};
use failure::Fallible;
use lazy_static::lazy_static;
use std::{
    collections::HashSet,
    net::{IpAddr, Ipv4Addr},
    sync::{Arc, Barrier},
    thread,
};

mod common;

use self::common::{Database, actors, directory, setup_db};

lazy_static! {
    static ref DATABASE: Option<Database> = setup_db(seed)
        .expect("Cannot create test database");
}

fn seed(conn: &PgConnection) -> Fallible<()> {
    diesel::insert_into(document_categories::table)
        .values((
            document_categories::code.eq("HP-QP"),
            document_categories::name.eq("Quality procedures"),
            document_categories::prefix.eq("HP-QP-"),
            document_categories::next_number.eq(410),
        ))
        .execute(conn)?;
    Ok(())
}

type PgWorkflow = Workflow<PgStore, StaticDirectory>;

/// Run a test case against a freshly seeded database.
fn run_db_test<F>(test: F)
where
    F: FnOnce(PgWorkflow, &PgConnection) -> Fallible<()>,
{
    let _ = env_logger::builder().is_test(true).try_init();

    let database = match *DATABASE {
        Some(ref database) => database,
        None => {
            eprintln!("DATABASE_URL is not set, skipping");
            return;
        }
    };

    let result = database.lock(|store, conn| {
        test(Workflow::new(store, directory()), conn)
    });

    if let Err(err) = result {
        panic!("{}", err);
    }
}

fn draft(workflow: &PgWorkflow, author: i32) -> Fallible<Document> {
    Ok(workflow.create(&Caller::new(author), Draft {
        category: "HP-QP".into(),
        title: Some("Calibration of gauges".into()),
        ..Draft::default()
    })?)
}

fn reviewed(workflow: &PgWorkflow) -> Fallible<Document> {
    let document = draft(workflow, actors::QUALITY)?;
    workflow.submit(&Caller::new(actors::QUALITY), document.id, None)?;
    Ok(workflow.review(
        &Caller::new(actors::QUALITY_HEAD), document.id, Decision::Approve, None)?)
}

fn approved(workflow: &PgWorkflow) -> Fallible<Document> {
    let document = reviewed(workflow)?;
    Ok(workflow.approve(&Caller::new(actors::ADMIN), document.id, Decision::Approve, None)?)
}

fn database_message(err: DbError) -> String {
    match err {
        DbError::DatabaseError(_, info) => info.message().to_string(),
        err => panic!("expected a database error, got {}", err),
    }
}

#[test]
fn full_lifecycle_is_persisted() {
    run_db_test(|workflow, _| {
        let document = approved(&workflow)?;

        let stored = workflow.document_by_number("HP-QP-410")?;
        assert_eq!(stored.id, document.id);
        assert_eq!(stored.status, DocumentStatus::Approved);
        assert!(stored.locked);
        assert_eq!(stored.reviewed_by, Some(actors::QUALITY_HEAD));
        assert_eq!(stored.approved_by, Some(actors::ADMIN));
        assert_eq!(workflow.category("HP-QP")?.next_number, 411);

        let actions = workflow.history(document.id)?
            .into_iter()
            .map(|entry| entry.action)
            .collect::<Vec<_>>();
        assert_eq!(actions, [
            AuditAction::Create,
            AuditAction::Submit,
            AuditAction::ReviewApprove,
            AuditAction::Approve,
        ]);

        Ok(())
    })
}

#[test]
fn concurrent_approvals_have_one_winner() {
    const THREADS: usize = 2;

    run_db_test(|workflow, _| {
        let document = reviewed(&workflow)?;
        let workflow = Arc::new(workflow);
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles = (0..THREADS)
            .map(|_| {
                let workflow = workflow.clone();
                let barrier = barrier.clone();
                let id = document.id;

                thread::spawn(move || {
                    barrier.wait();
                    workflow.approve(&Caller::new(actors::ADMIN), id, Decision::Approve, None)
                })
            })
            .collect::<Vec<_>>();

        let results = handles.into_iter()
            .map(|handle| handle.join().expect("approving thread panicked"))
            .collect::<Vec<_>>();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);

        // The loser waits for the winner's row lock, and then sees
        // an approved document.
        for result in &results {
            if let Err(ref err) = *result {
                assert_eq!(err.kind(), ErrorKind::InvalidTransition, "{}", err);
            }
        }

        let approvals = workflow.history(document.id)?
            .into_iter()
            .filter(|entry| entry.action == AuditAction::Approve)
            .count();
        assert_eq!(approvals, 1);

        Ok(())
    })
}

#[test]
fn concurrent_allocations_issue_unique_numbers() {
    const THREADS: usize = 6;
    const PER_THREAD: usize = 10;

    run_db_test(|workflow, _| {
        let workflow = Arc::new(workflow);
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles = (0..THREADS)
            .map(|_| {
                let workflow = workflow.clone();
                let barrier = barrier.clone();

                thread::spawn(move || {
                    barrier.wait();

                    (0..PER_THREAD)
                        .map(|_| draft(&workflow, actors::QUALITY).map(|d| d.number))
                        .collect::<Fallible<Vec<_>>>()
                })
            })
            .collect::<Vec<_>>();

        let mut numbers = HashSet::new();
        for handle in handles {
            for number in handle.join().expect("allocating thread panicked")? {
                assert!(numbers.insert(number.clone()), "{} issued twice", number);
            }
        }

        let total = (THREADS * PER_THREAD) as i32;
        let expected = (410..410 + total)
            .map(|n| format!("HP-QP-{}", n))
            .collect::<HashSet<_>>();
        assert_eq!(numbers, expected);
        assert_eq!(workflow.category("HP-QP")?.next_number, 410 + total);

        Ok(())
    })
}

#[test]
fn stale_writes_are_refused() {
    run_db_test(|workflow, _| {
        let document = draft(&workflow, actors::QUALITY)?;
        let patch = Patch {
            title: Some("Calibration of torque wrenches".into()),
            ..Patch::default()
        };
        let now = Utc::now().naive_utc();

        let written = workflow.store().transaction(|tx| -> Result<_, StoreError> {
            let first = tx.write_document(document.id, document.version, &patch, now)?;
            let second = tx.write_document(document.id, document.version, &patch, now)?;
            Ok((first, second))
        })?;

        assert_eq!(written.0.map(|d| d.version), Some(document.version + 1));
        assert!(written.1.is_none());

        Ok(())
    })
}

#[test]
fn database_rejects_changes_to_locked_documents() {
    run_db_test(|workflow, conn| {
        let document = approved(&workflow)?;

        let err = diesel::update(documents::table.find(document.id))
            .set(documents::title.eq("Rewritten behind the workflow's back"))
            .execute(conn)
            .unwrap_err();
        assert!(database_message(err).contains("is locked"));

        let err = diesel::update(documents::table.find(document.id))
            .set(documents::locked.eq(false))
            .execute(conn)
            .unwrap_err();
        assert!(database_message(err).contains("is locked"));

        // Administrative fields can still change.
        diesel::update(documents::table.find(document.id))
            .set(documents::generated_file.eq("HP-QP-410-r0.pdf"))
            .execute(conn)?;

        assert_eq!(workflow.document(document.id)?.title, "Calibration of gauges");

        Ok(())
    })
}

#[test]
fn only_approved_documents_are_locked() {
    run_db_test(|workflow, conn| {
        let document = draft(&workflow, actors::QUALITY)?;

        let result = diesel::update(documents::table.find(document.id))
            .set(documents::status.eq(DocumentStatus::Approved))
            .execute(conn);
        assert!(result.is_err());

        let result = diesel::update(documents::table.find(document.id))
            .set(documents::locked.eq(true))
            .execute(conn);
        assert!(result.is_err());

        Ok(())
    })
}

#[test]
fn history_is_append_only() {
    run_db_test(|workflow, conn| {
        let document = draft(&workflow, actors::QUALITY)?;

        let result = diesel::delete(document_history::table
                .filter(document_history::document.eq(document.id)))
            .execute(conn);
        assert!(result.is_err());

        let result = diesel::update(document_history::table
                .filter(document_history::document.eq(document.id)))
            .set(document_history::comment.eq("changed"))
            .execute(conn);
        assert!(result.is_err());

        assert_eq!(workflow.history(document.id)?.len(), 1);

        Ok(())
    })
}

#[test]
fn every_label_survives_the_database() {
    const STATUSES: &[DocumentStatus] = &[
        DocumentStatus::Draft,
        DocumentStatus::PendingReview,
        DocumentStatus::PendingApproval,
        DocumentStatus::Approved,
        DocumentStatus::Rejected,
        DocumentStatus::Obsolete,
    ];
    const ACTIONS: &[AuditAction] = &[
        AuditAction::Create,
        AuditAction::Edit,
        AuditAction::Submit,
        AuditAction::SubmitDirect,
        AuditAction::ReviewApprove,
        AuditAction::ReviewReject,
        AuditAction::Approve,
        AuditAction::FinalReject,
        AuditAction::Revise,
        AuditAction::AttachFile,
        AuditAction::Denied,
    ];

    run_db_test(|workflow, _| {
        let document = draft(&workflow, actors::QUALITY)?;
        let origin = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7));
        let now = Utc::now().naive_utc();

        let expected = ACTIONS.iter()
            .enumerate()
            .map(|(inx, &action)| (
                action,
                STATUSES[inx % STATUSES.len()],
                STATUSES[(inx + 1) % STATUSES.len()],
            ))
            .collect::<Vec<_>>();

        workflow.store().transaction(|tx| -> Result<(), StoreError> {
            for &(action, from, to) in &expected {
                tx.append_history(&NewHistoryEntry {
                    document: document.id,
                    actor: Some(actors::ADMIN),
                    action,
                    from_status: Some(from),
                    to_status: to,
                    comment: None,
                    origin: Some(origin),
                    timestamp: now,
                })?;
            }
            Ok(())
        })?;

        let stored = workflow.history(document.id)?
            .into_iter()
            // Skip the entry recording creation of the document.
            .skip(1)
            .map(|entry| {
                assert_eq!(entry.origin, Some(origin));
                (entry.action, entry.from_status.unwrap(), entry.to_status)
            })
            .collect::<Vec<_>>();
        assert_eq!(stored, expected);

        Ok(())
    })
}

#[test]
fn duplicate_category_codes_are_invalid() {
    run_db_test(|workflow, _| {
        let err = workflow.create_category(&Caller::new(actors::ADMIN), &NewCategory {
            code: "HP-QP".into(),
            name: "Quality procedures, again".into(),
            description: String::new(),
            prefix: "HP-QP-".into(),
            next_number: 1,
        }).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.code().as_deref(), Some("category:exists"));

        Ok(())
    })
}
