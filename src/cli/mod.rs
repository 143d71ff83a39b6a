use failure::err_msg;
use structopt::StructOpt;

use crate::{
    Result,
    audit::Caller,
    config::Config,
    db::{self, PgStore},
    events::LogNotifier,
    permissions::StaticDirectory,
    workflow::Workflow,
};

mod audit;
mod category;
mod document;
mod template;
mod util;

type Docflow = Workflow<PgStore, StaticDirectory>;

#[derive(StructOpt)]
#[structopt(name = "docflow")]
struct Opts {
    /// ID of the actor on whose behalf to act
    #[structopt(long = "as", short = "a", global = true)]
    actor: Option<i32>,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
enum Command {
    /// Manage document categories
    #[structopt(name = "category")]
    Category(category::Opts),
    /// Manage document templates
    #[structopt(name = "template")]
    Template(template::Opts),
    /// Manage documents
    #[structopt(name = "document")]
    Document(document::Opts),
    /// Inspect the audit trail
    #[structopt(name = "audit")]
    Audit(audit::Opts),
}

pub fn main() -> Result<()> {
    let matches = Opts::clap().version(env!("VERSION")).get_matches();
    let opts = Opts::from_clap(&matches);
    let config = crate::config::load()?;

    setup_logging(&config.logging)?;

    let workflow = workflow(config)?;
    let caller = opts.actor.map(Caller::new);

    match opts.command {
        Command::Category(opts) => category::main(&workflow, caller, opts),
        Command::Template(opts) => template::main(&workflow, caller, opts),
        Command::Document(opts) => document::main(&workflow, caller, opts),
        Command::Audit(opts) => audit::main(&workflow, opts),
    }
}

fn workflow(config: &Config) -> Result<Docflow> {
    let store = db::store(config)?;
    let mut workflow = Workflow::new(store, config.directory())
        .with_settings(config.workflow.clone());

    workflow.listen(LogNotifier::new(config.directory()));

    Ok(workflow)
}

/// Require that the user said who they are.
fn require_caller(caller: Option<Caller>) -> Result<Caller> {
    caller.ok_or_else(|| err_msg("This command requires --as <actor>"))
}

fn setup_logging(config: &crate::config::Logging) -> Result<()> {
    let mut builder = env_logger::Builder::from_default_env();
    builder.filter_level(config.level);

    for (module, level) in &config.filters {
        builder.filter_module(&module, *level);
    }

    builder.try_init()?;
    Ok(())
}
