//! Commands for inspecting the audit trail.

use structopt::StructOpt;

use crate::{Result, models::HistoryEntry};
use super::{Docflow, util::{or_dash, print_table}};

#[derive(StructOpt)]
pub struct Opts {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// Show history of a single document
    #[structopt(name = "history")]
    History {
        /// Document number
        number: String,
    },
    /// Show history of all documents, in the order it was recorded
    #[structopt(name = "log")]
    Log {
        /// Only show entries following this one
        #[structopt(long = "after")]
        after: Option<i64>,
        /// Maximum number of entries to show
        #[structopt(long = "limit", short = "l", default_value = "50")]
        limit: usize,
        /// Print entries as JSON, one per line
        #[structopt(long = "json")]
        json: bool,
    },
}

pub fn main(workflow: &Docflow, opts: Opts) -> Result<()> {
    match opts.command {
        Command::History { number } => {
            let document = workflow.document_by_number(&number)?;
            print_entries(&workflow.history(document.id)?);
        }
        Command::Log { after, limit, json } => {
            let entries = workflow.history_after(after, limit)?;

            if json {
                for entry in &entries {
                    println!("{}", serde_json::to_string(entry)?);
                }
                return Ok(());
            }

            print_entries(&entries);

            if entries.len() == limit {
                if let Some(last) = entries.last() {
                    println!("\nMore entries follow, use --after {} to see them", last.id);
                }
            }
        }
    }

    Ok(())
}

fn print_entries(entries: &[HistoryEntry]) {
    let rows = entries.iter()
        .map(|entry| (
            entry.id.to_string(),
            entry.timestamp.to_string(),
            entry.actor.map_or_else(|| "system".to_string(), |id| id.to_string()),
            entry.action.to_string(),
            format!("{} → {}", or_dash(entry.from_status), entry.to_status),
            entry.comment.as_ref().map_or("", String::as_str),
        ))
        .collect::<Vec<_>>();

    print_table(("#", "Date", "Actor", "Action", "Status", "Comment"), &rows);
}
