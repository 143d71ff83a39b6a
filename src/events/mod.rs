//! Handling of events and notifications.
//!
//! Events are published only after the transaction which caused them has been
//! committed. Listeners decide what to do about them (notify users, generate
//! files, ...). A failing listener never affects the change it was told about.

mod events;
mod render;
mod service;

pub use self::{
    events::*,
    render::{FileStore, RenderError, Renderer},
    service::{EventManager, Listener, LogNotifier, recipients},
};
