use itertools::Itertools;
use std::fmt;

use crate::{
    db::types::DocumentStatus,
    permissions::{Capabilities, Directory},
};
use super::events::Event;

/// Something interested in events.
pub trait Listener: Send + Sync {
    fn handle(&self, event: &Event) -> Result<(), failure::Error>;
}

impl<F> Listener for F
where
    F: Fn(&Event) -> Result<(), failure::Error> + Send + Sync,
{
    fn handle(&self, event: &Event) -> Result<(), failure::Error> {
        self(event)
    }
}

/// Delivers events to registered listeners.
#[derive(Default)]
pub struct EventManager {
    listeners: Vec<Box<dyn Listener>>,
}

impl EventManager {
    pub fn new() -> EventManager {
        EventManager::default()
    }

    /// Register a new listener.
    pub fn register<L>(&mut self, listener: L)
    where
        L: Listener + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Emit an event.
    ///
    /// Errors will be logged, but otherwise ignored.
    pub fn notify<E>(&self, event: E)
    where
        Event: From<E>,
    {
        let event = Event::from(event);

        debug!("Dispatching {} event for {} to {} listeners",
            event.kind(), event.document(), self.listeners.len());

        for listener in &self.listeners {
            if let Err(err) = listener.handle(&event) {
                error!("Could not handle {} event for {}: {}",
                    event.kind(), event.document(), err);
            }
        }
    }
}

impl fmt::Debug for EventManager {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("EventManager")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Decide who should be notified of an event.
///
/// Documents awaiting review concern all reviewers, documents awaiting
/// approval concern all approvers, and a decision concerns the document's
/// author.
pub fn recipients<D>(directory: &D, event: &Event) -> Vec<i32>
where
    D: Directory + ?Sized,
{
    let ev = match *event {
        Event::StatusChanged(ref ev) => ev,
        _ => return Vec::new(),
    };

    let ids = match ev.to {
        DocumentStatus::PendingReview => directory.holders(Capabilities::REVIEW)
            .into_iter()
            .map(|actor| actor.id)
            .collect(),
        DocumentStatus::PendingApproval => directory.holders(Capabilities::APPROVE)
            .into_iter()
            .map(|actor| actor.id)
            .collect(),
        DocumentStatus::Approved | DocumentStatus::Rejected => vec![ev.author],
        _ => Vec::new(),
    };

    ids.into_iter().sorted().dedup().collect()
}

/// Listener which decides recipients of notifications and logs them.
///
/// Actual delivery (e-mail, chat, ...) is left to other listeners.
pub struct LogNotifier<D> {
    directory: D,
}

impl<D: Directory> LogNotifier<D> {
    pub fn new(directory: D) -> LogNotifier<D> {
        LogNotifier { directory }
    }
}

impl<D: Directory> Listener for LogNotifier<D> {
    fn handle(&self, event: &Event) -> Result<(), failure::Error> {
        let recipients = recipients(&self.directory, event);

        if let Event::StatusChanged(ref ev) = *event {
            if recipients.is_empty() {
                debug!("Nobody to notify of {} becoming {}", ev.number, ev.to);
            } else {
                info!("Notifying {} of {} becoming {}",
                    recipients.iter().join(", "), ev.number, ev.to);
            }
        }

        Ok(())
    }
}
