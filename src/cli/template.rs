//! Commands for managing document templates.

use std::{fs, path::PathBuf};
use structopt::StructOpt;

use crate::{
    Result,
    audit::Caller,
    models::{NewTemplate, template::Schema},
};
use super::{Docflow, require_caller, util::print_table};

#[derive(StructOpt)]
pub struct Opts {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// List templates
    #[structopt(name = "list")]
    List {
        /// Only list templates of this category
        #[structopt(long = "category", short = "c")]
        category: Option<String>,
    },
    /// Add a template
    #[structopt(name = "add")]
    Add(AddOpts),
}

pub fn main(workflow: &Docflow, caller: Option<Caller>, opts: Opts) -> Result<()> {
    match opts.command {
        Command::List { category } => list(workflow, category.as_ref().map(String::as_str)),
        Command::Add(opts) => add(workflow, require_caller(caller)?, opts),
    }
}

fn list(workflow: &Docflow, category: Option<&str>) -> Result<()> {
    let templates = workflow.templates(category)?;

    let rows = templates.iter()
        .map(|template| (
            template.id.to_string(),
            template.name.as_str(),
            template.version.as_str(),
            template.schema.fields.len().to_string(),
            if template.active { "yes" } else { "no" },
        ))
        .collect::<Vec<_>>();

    print_table(("ID", "Name", "Version", "Fields", "Active"), &rows);

    Ok(())
}

#[derive(StructOpt)]
pub struct AddOpts {
    /// Code of the category this template belongs to
    category: String,
    /// Template's name
    #[structopt(long = "name", short = "n")]
    name: String,
    /// TOML file describing template's fields
    #[structopt(long = "schema", short = "s", parse(from_os_str))]
    schema: Option<PathBuf>,
    /// Version of the form
    #[structopt(long = "form-version", default_value = "1.0")]
    version: String,
    #[structopt(long = "description", short = "d", default_value = "")]
    description: String,
}

fn add(workflow: &Docflow, caller: Caller, opts: AddOpts) -> Result<()> {
    let category = workflow.category(&opts.category)?;
    let schema = match opts.schema {
        Some(path) => toml::from_slice::<Schema>(&fs::read(path)?)?,
        None => Schema::default(),
    };

    let template = workflow.create_template(&caller, &NewTemplate {
        category: category.id,
        name: opts.name,
        description: opts.description,
        schema,
        version: opts.version,
    })?;

    println!("Created template {}", template.id);

    Ok(())
}
