//! Commands for working with documents.

use chrono::Utc;
use std::path::PathBuf;
use structopt::StructOpt;

use crate::{
    Result,
    audit::Caller,
    db::types::DocumentStatus,
    lifecycle::{Decision, Trigger},
    models::{Document, DocumentFilter, FieldValue},
    workflow::{Draft, Edit, Stage},
};
use super::{
    Docflow,
    require_caller,
    util::{or_dash, parse_decision, parse_field, print_table, read_content},
};

#[derive(StructOpt)]
pub struct Opts {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// List documents
    #[structopt(name = "list")]
    List(ListOpts),
    /// Show a single document
    #[structopt(name = "show")]
    Show {
        /// Document number
        number: String,
    },
    /// Create a new draft
    #[structopt(name = "create")]
    Create(CreateOpts),
    /// Change a draft's title or content
    #[structopt(name = "edit")]
    Edit(EditOpts),
    /// Submit a draft for review
    #[structopt(name = "submit")]
    Submit(ActionOpts),
    /// Review a submitted document
    #[structopt(name = "review")]
    Review(DecisionOpts),
    /// Approve or reject a reviewed document
    #[structopt(name = "approve")]
    Approve(DecisionOpts),
    /// Turn a rejected document back into a draft
    #[structopt(name = "revise")]
    Revise {
        /// Document number
        number: String,
    },
    /// Apply one action to many documents
    #[structopt(name = "batch")]
    Batch(BatchOpts),
    /// Comment on a document
    #[structopt(name = "comment")]
    Comment {
        /// Document number
        number: String,
        /// Comment's text
        text: String,
    },
    /// Attach a generated file to an approved document
    #[structopt(name = "attach")]
    Attach {
        /// Document number
        number: String,
        /// Reference to the generated file
        reference: String,
    },
    /// List documents waiting for too long
    #[structopt(name = "overdue")]
    Overdue,
}

pub fn main(workflow: &Docflow, caller: Option<Caller>, opts: Opts) -> Result<()> {
    match opts.command {
        Command::List(opts) => list(workflow, opts),
        Command::Show { number } => show(workflow, &number),
        Command::Create(opts) => create(workflow, require_caller(caller)?, opts),
        Command::Edit(opts) => edit(workflow, require_caller(caller)?, opts),
        Command::Submit(opts) => {
            let caller = require_caller(caller)?;
            let document = workflow.document_by_number(&opts.number)?;
            let document = workflow.submit(
                &caller, document.id, opts.comment.as_ref().map(String::as_str))?;
            print_status(&document);
            Ok(())
        }
        Command::Review(opts) => {
            let caller = require_caller(caller)?;
            let document = workflow.document_by_number(&opts.number)?;
            let document = workflow.review(&caller, document.id, opts.decision,
                opts.comment.as_ref().map(String::as_str))?;
            print_status(&document);
            Ok(())
        }
        Command::Approve(opts) => {
            let caller = require_caller(caller)?;
            let document = workflow.document_by_number(&opts.number)?;
            let document = workflow.approve(&caller, document.id, opts.decision,
                opts.comment.as_ref().map(String::as_str))?;
            print_status(&document);
            Ok(())
        }
        Command::Revise { number } => {
            let caller = require_caller(caller)?;
            let document = workflow.document_by_number(&number)?;
            let document = workflow.revise(&caller, document.id)?;
            print_status(&document);
            Ok(())
        }
        Command::Batch(opts) => batch(workflow, require_caller(caller)?, opts),
        Command::Comment { number, text } => {
            let caller = require_caller(caller)?;
            let document = workflow.document_by_number(&number)?;
            let comment = workflow.comment(&caller, document.id, &text)?;
            println!("Added comment {} to {}", comment.id, document.number);
            Ok(())
        }
        Command::Attach { number, reference } => {
            let document = workflow.document_by_number(&number)?;
            let document = workflow.attach_generated_file(document.id, &reference)?;
            println!("Attached {} to {}", reference, document.number);
            Ok(())
        }
        Command::Overdue => overdue(workflow),
    }
}

fn print_status(document: &Document) {
    println!("{} (revision {}) is now {}",
        document.number, document.revision, document.status);
}

#[derive(StructOpt)]
pub struct ListOpts {
    /// Only list documents in this status
    #[structopt(long = "status", short = "s")]
    status: Option<DocumentStatus>,
    /// Only list documents of this category
    #[structopt(long = "category", short = "c")]
    category: Option<String>,
    /// Only list documents created by this actor
    #[structopt(long = "author")]
    author: Option<i32>,
}

fn list(workflow: &Docflow, opts: ListOpts) -> Result<()> {
    let category = match opts.category {
        Some(ref code) => Some(workflow.category(code)?.id),
        None => None,
    };

    let documents = workflow.documents(&DocumentFilter {
        status: opts.status,
        category,
        created_by: opts.author,
    })?;

    let rows = documents.iter()
        .map(|document| (
            document.number.as_str(),
            document.revision.to_string(),
            document.status.as_str(),
            document.created_by.to_string(),
            document.title.as_str(),
        ))
        .collect::<Vec<_>>();

    print_table(("Number", "Revision", "Status", "Author", "Title"), &rows);

    Ok(())
}

fn show(workflow: &Docflow, number: &str) -> Result<()> {
    let document = workflow.document_by_number(number)?;
    let comments = workflow.comments(document.id)?;

    println!("{} (revision {}): {}", document.number, document.revision, document.title);
    println!("Status:      {}{}", document.status,
        if document.locked { ", locked" } else { "" });
    println!("Author:      {}", document.created_by);
    println!("Reviewer:    {}", or_dash(document.reviewed_by));
    println!("Approver:    {}", or_dash(document.approved_by));
    println!("Created:     {}", document.created_at);
    println!("Submitted:   {}", or_dash(document.submitted_at));
    println!("Reviewed:    {}", or_dash(document.reviewed_at));
    println!("Approved:    {}", or_dash(document.approved_at));
    println!("File:        {}", or_dash(document.generated_file.as_ref()));

    if !document.content.is_empty() {
        println!();
        let rows = document.content.iter()
            .map(|(name, value)| (name.as_str(), value.to_string()))
            .collect::<Vec<_>>();
        print_table(("Field", "Value"), &rows);
    }

    if !comments.is_empty() {
        println!();
        let rows = comments.iter()
            .map(|comment| (
                comment.created_at.to_string(),
                comment.actor.to_string(),
                comment.kind.to_string(),
                comment.text.as_str(),
            ))
            .collect::<Vec<_>>();
        print_table(("Date", "Actor", "Type", "Comment"), &rows);
    }

    Ok(())
}

#[derive(StructOpt)]
pub struct CreateOpts {
    /// Code of the category to create the document in
    #[structopt(long = "category", short = "c")]
    category: String,
    /// Template to base the document on
    #[structopt(long = "template", short = "t")]
    template: Option<i32>,
    /// Document's title
    #[structopt(long = "title")]
    title: Option<String>,
    /// TOML file with document's content
    #[structopt(long = "content", parse(from_os_str))]
    content: Option<PathBuf>,
    /// Set a single field, as name=value
    #[structopt(long = "field", short = "f", parse(try_from_str = parse_field))]
    fields: Vec<(String, FieldValue)>,
}

fn create(workflow: &Docflow, caller: Caller, opts: CreateOpts) -> Result<()> {
    let content = read_content(opts.content.as_ref().map(PathBuf::as_path), opts.fields)?;

    let document = workflow.create(&caller, Draft {
        category: opts.category,
        template: opts.template,
        title: opts.title,
        content: content.unwrap_or_default(),
    })?;

    println!("Created {} ({})", document.number, document.id);

    Ok(())
}

#[derive(StructOpt)]
pub struct EditOpts {
    /// Document number
    number: String,
    /// New title
    #[structopt(long = "title")]
    title: Option<String>,
    /// TOML file with document's new content
    #[structopt(long = "content", parse(from_os_str))]
    content: Option<PathBuf>,
    /// Set a single field, as name=value
    #[structopt(long = "field", short = "f", parse(try_from_str = parse_field))]
    fields: Vec<(String, FieldValue)>,
}

fn edit(workflow: &Docflow, caller: Caller, opts: EditOpts) -> Result<()> {
    let document = workflow.document_by_number(&opts.number)?;

    // Fields given without a content file are merged into current content.
    let content = match opts.content {
        Some(ref path) => read_content(Some(path.as_path()), opts.fields)?,
        None if !opts.fields.is_empty() => {
            let mut content = document.content.clone();
            content.extend(opts.fields);
            Some(content)
        }
        None => None,
    };

    let document = workflow.edit(&caller, document.id, Edit {
        title: opts.title,
        content,
    })?;

    println!("Updated {}", document.number);

    Ok(())
}

#[derive(StructOpt)]
pub struct ActionOpts {
    /// Document number
    number: String,
    /// Comment to record with this action
    #[structopt(long = "comment", short = "m")]
    comment: Option<String>,
}

#[derive(StructOpt)]
pub struct DecisionOpts {
    /// Document number
    number: String,
    /// Either approve or reject
    #[structopt(parse(try_from_str = parse_decision))]
    decision: Decision,
    /// Comment to record with this decision, required when rejecting
    #[structopt(long = "comment", short = "m")]
    comment: Option<String>,
}

#[derive(StructOpt)]
pub struct BatchOpts {
    /// Action to take, for example submit or review-approve
    action: Trigger,
    /// Numbers of documents to act on
    #[structopt(required = true)]
    numbers: Vec<String>,
    /// Comment to record with each action
    #[structopt(long = "comment", short = "m")]
    comment: Option<String>,
}

fn batch(workflow: &Docflow, caller: Caller, opts: BatchOpts) -> Result<()> {
    let mut ids = Vec::with_capacity(opts.numbers.len());

    for number in &opts.numbers {
        ids.push(workflow.document_by_number(number)?.id);
    }

    let results = workflow.apply_many(
        &caller, &ids, opts.action, opts.comment.as_ref().map(String::as_str));

    let rows = opts.numbers.iter()
        .zip(&results)
        .map(|(number, (_, result))| (
            number.as_str(),
            match *result {
                Ok(ref document) => document.status.to_string(),
                Err(ref err) => err.to_string(),
            },
        ))
        .collect::<Vec<_>>();

    print_table(("Number", "Result"), &rows);

    Ok(())
}

fn overdue(workflow: &Docflow) -> Result<()> {
    let reminders = workflow.overdue(Utc::now().naive_utc())?;

    let rows = reminders.iter()
        .map(|reminder| (
            reminder.document.number.as_str(),
            match reminder.stage {
                Stage::Review => "review",
                Stage::Approval => "approval",
            },
            reminder.since.to_string(),
            reminder.recipients.iter()
                .map(i32::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        ))
        .collect::<Vec<_>>();

    print_table(("Number", "Waiting for", "Since", "Notify"), &rows);

    Ok(())
}
