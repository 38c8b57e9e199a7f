mod bootstrap;
mod cli;
mod config;
mod drop;
mod load;
mod select;

use pgcrud::{Ident, PgConnection, Session};

pub fn run(args: Vec<String>) -> anyhow::Result<()> {
    let cmd = cli::parse_args(&args)?;
    match cmd {
        cli::Command::Help(topic) => {
            cli::print_help(topic);
            Ok(())
        }
        cli::Command::Bootstrap(args) => bootstrap::run(args),
        cli::Command::Load(args) => load::run(args),
        cli::Command::Select(args) => select::run(args),
        cli::Command::Drop(args) => drop::run(args),
    }
}

/// Load the config and open a session.
fn open(conn: &cli::ConnArgs) -> anyhow::Result<(config::ProjectConfig, Session<PgConnection>)> {
    let project = config::ProjectConfig::load(conn)?;
    let settings = project.connection(conn.database.as_deref())?;
    tracing::debug!(config = ?settings, "connecting");
    let session = Session::connect(&settings)?;
    Ok((project, session))
}

fn parse_table(name: &str) -> anyhow::Result<Ident> {
    Ident::parse(name).map_err(|e| anyhow::anyhow!("invalid table name {name:?}: {e}"))
}
