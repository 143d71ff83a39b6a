//! Commands for managing document categories.

use structopt::StructOpt;

use crate::{
    Result,
    audit::Caller,
    models::NewCategory,
};
use super::{Docflow, require_caller, util::print_table};

#[derive(StructOpt)]
pub struct Opts {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// List categories
    #[structopt(name = "list")]
    List,
    /// Add a category
    #[structopt(name = "add")]
    Add(AddOpts),
    /// Allow issuing numbers in a category
    #[structopt(name = "enable")]
    Enable {
        /// Category's code
        code: String,
    },
    /// Stop issuing numbers in a category
    #[structopt(name = "disable")]
    Disable {
        /// Category's code
        code: String,
    },
}

pub fn main(workflow: &Docflow, caller: Option<Caller>, opts: Opts) -> Result<()> {
    match opts.command {
        Command::List => list(workflow),
        Command::Add(opts) => add(workflow, require_caller(caller)?, opts),
        Command::Enable { code } =>
            set_active(workflow, require_caller(caller)?, &code, true),
        Command::Disable { code } =>
            set_active(workflow, require_caller(caller)?, &code, false),
    }
}

fn list(workflow: &Docflow) -> Result<()> {
    let categories = workflow.categories()?;

    let rows = categories.iter()
        .map(|category| (
            category.code.as_str(),
            category.name.as_str(),
            category.format_number(category.next_number),
            if category.active { "yes" } else { "no" },
        ))
        .collect::<Vec<_>>();

    print_table(("Code", "Name", "Next number", "Active"), &rows);

    Ok(())
}

#[derive(StructOpt)]
pub struct AddOpts {
    /// Category's code
    code: String,
    /// Category's name
    #[structopt(long = "name", short = "n")]
    name: String,
    /// Prefix of document numbers, defaults to code followed by a dash
    #[structopt(long = "prefix")]
    prefix: Option<String>,
    /// Number the first document will receive
    #[structopt(long = "first", default_value = "1000")]
    first: i32,
    #[structopt(long = "description", short = "d", default_value = "")]
    description: String,
}

impl AddOpts {
    fn into_category(self) -> NewCategory {
        let code = self.code;
        let prefix = self.prefix.unwrap_or_else(|| format!("{}-", code));

        NewCategory {
            code,
            name: self.name,
            description: self.description,
            prefix,
            next_number: self.first,
        }
    }
}

fn add(workflow: &Docflow, caller: Caller, opts: AddOpts) -> Result<()> {
    let category = workflow.create_category(&caller, &opts.into_category())?;

    println!("Created category {}, first number will be {}",
        category.code, category.format_number(category.next_number));

    Ok(())
}

fn set_active(workflow: &Docflow, caller: Caller, code: &str, active: bool)
-> Result<()> {
    let category = workflow.set_category_active(&caller, code, active)?;

    println!("Category {} is now {}", category.code,
        if category.active { "active" } else { "inactive" });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_defaults_to_code() {
        let category = AddOpts::from_iter(&["add", "QP", "--name", "Quality"])
            .into_category();

        assert_eq!(category.code, "QP");
        assert_eq!(category.prefix, "QP-");
        assert_eq!(category.next_number, 1000);
    }

    #[test]
    fn explicit_prefix_is_kept() {
        let category = AddOpts::from_iter(&[
            "add", "HP", "--name", "Health", "--prefix", "HP-QP-", "--first", "410",
        ]).into_category();

        assert_eq!(category.code, "HP");
        assert_eq!(category.prefix, "HP-QP-");
        assert_eq!(category.next_number, 410);
    }
}
