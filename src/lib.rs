// TEMPORARY, see diesel-rs/diesel#1787.
#![allow(proc_macro_derive_resolution_fallback)]

#[macro_use] extern crate docflow_macros;
#[macro_use] extern crate log;

#[cfg(feature = "postgres")]
#[macro_use]
extern crate diesel;

#[cfg(all(feature = "postgres", not(debug_assertions)))]
#[macro_use]
extern crate diesel_migrations;

pub use docflow_macros::*;
#[cfg(feature = "postgres")]
pub use self::cli::main;
pub use self::{
    error::{DomainError, Error, ErrorKind},
    workflow::Workflow,
};

pub(crate) use self::config::Config;

#[macro_use] mod macros;

pub mod audit;
#[cfg(feature = "postgres")]
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod guard;
pub mod lifecycle;
pub mod models;
pub mod permissions;
pub mod store;
pub mod utils;
pub mod workflow;

pub type Result<T, E=failure::Error> = std::result::Result<T, E>;
