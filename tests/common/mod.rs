#![allow(dead_code)]

#[cfg(feature = "postgres")]
mod db;
mod fixture;
mod support;

#[cfg(feature = "postgres")]
pub use self::db::{Database, setup_db};
pub use self::{
    fixture::{Fixture, Recorder, actors, directory},
    support::{TestResult, run_test},
};
