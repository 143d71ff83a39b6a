pub mod category;
pub mod comment;
pub mod content;
pub mod document;
pub mod history;
pub mod template;

pub use self::{
    category::{Category, NewCategory},
    comment::Comment,
    content::{Content, FieldValue},
    document::{Document, DocumentFilter, Patch, Revision},
    history::HistoryEntry,
    template::{Template, NewTemplate},
};
