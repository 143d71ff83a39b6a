//! Tests for the audit trail.

use docflow::{
    audit::Caller,
    db::types::{AuditAction, DocumentStatus},
    lifecycle::Decision,
    workflow::Settings,
};
use failure::Fallible;
use std::net::{IpAddr, Ipv4Addr};

mod common;

use self::common::{actors, run_test};

#[test]
fn history_records_every_change_in_order() {
    run_test(|fx| -> Fallible<()> {
        let origin = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7));
        let author = Caller::new(actors::QUALITY).with_origin(origin);

        let draft = fx.draft(actors::QUALITY)?;
        fx.workflow.submit(&author, draft.id, Some("Ready"))?;
        fx.workflow.review(
            &Caller::new(actors::QUALITY_HEAD), draft.id, Decision::Reject, Some("Typos"))?;

        let history = fx.workflow.history(draft.id)?;
        let summary = history.iter()
            .map(|e| (e.action, e.from_status, e.to_status, e.actor))
            .collect::<Vec<_>>();

        assert_eq!(summary, [
            (AuditAction::Create, None, DocumentStatus::Draft, Some(actors::QUALITY)),
            (AuditAction::Submit, Some(DocumentStatus::Draft),
                DocumentStatus::PendingReview, Some(actors::QUALITY)),
            (AuditAction::ReviewReject, Some(DocumentStatus::PendingReview),
                DocumentStatus::Rejected, Some(actors::QUALITY_HEAD)),
        ]);

        assert_eq!(history[1].origin, Some(origin));
        assert_eq!(history[1].comment.as_ref().map(String::as_str), Some("Ready"));
        assert_eq!(history[2].comment.as_ref().map(String::as_str), Some("Typos"));
        assert!(history.windows(2).all(|w| w[0].id < w[1].id));
        assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

        Ok(())
    })
}

#[test]
fn history_stream_is_paged_by_cursor() {
    run_test(|fx| -> Fallible<()> {
        let first = fx.draft(actors::QUALITY)?;
        let second = fx.draft(actors::ENGINEERING)?;
        fx.workflow.submit(&Caller::new(actors::QUALITY), first.id, None)?;

        let page = fx.workflow.history_after(None, 2)?;
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].document, first.id);
        assert_eq!(page[1].document, second.id);

        let rest = fx.workflow.history_after(Some(page[1].id), 10)?;
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].action, AuditAction::Submit);

        assert!(fx.workflow.history_after(Some(rest[0].id), 10)?.is_empty());

        Ok(())
    })
}

#[test]
fn refused_attempts_are_recorded_unless_disabled() {
    run_test(|fx| -> Fallible<()> {
        let draft = fx.draft(actors::QUALITY)?;
        fx.workflow.submit(&Caller::new(actors::ENGINEERING), draft.id, None).unwrap_err();

        let history = fx.workflow.history(draft.id)?;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].action, AuditAction::Denied);
        assert_eq!(history[1].actor, Some(actors::ENGINEERING));
        assert_eq!(history[1].to_status, DocumentStatus::Draft);

        let workflow = fx.workflow.with_settings(Settings {
            audit_denied: false,
            ..Settings::default()
        });
        workflow.submit(&Caller::new(actors::ENGINEERING), draft.id, None).unwrap_err();
        assert_eq!(workflow.history(draft.id)?.len(), 2);

        Ok(())
    })
}

#[test]
fn system_failures_are_not_recorded_as_refusals() {
    run_test(|fx| -> Fallible<()> {
        let before = fx.workflow.history_after(None, 100)?.len();

        // Unknown documents have no history to record a refusal in.
        fx.workflow.submit(&Caller::new(actors::QUALITY), uuid::Uuid::new_v4(), None)
            .unwrap_err();

        assert_eq!(fx.workflow.history_after(None, 100)?.len(), before);
        Ok(())
    })
}
