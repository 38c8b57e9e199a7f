use std::path::PathBuf;

pub const DEFAULT_CONFIG: &str = "pgcrud.toml";
pub const DEFAULT_BATCH_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Root,
    Bootstrap,
    Load,
    Select,
    Drop,
}

#[derive(Debug, Clone)]
pub enum Command {
    Help(HelpTopic),
    Bootstrap(BootstrapArgs),
    Load(LoadArgs),
    Select(SelectArgs),
    Drop(DropArgs),
}

/// Options shared by every command that talks to the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnArgs {
    pub config: PathBuf,
    pub database: Option<String>,
}

impl Default for ConnArgs {
    fn default() -> Self {
        Self {
            config: PathBuf::from(DEFAULT_CONFIG),
            database: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BootstrapArgs {
    pub conn: ConnArgs,
    pub file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct LoadArgs {
    pub conn: ConnArgs,
    pub table: String,
    pub file: PathBuf,
    pub batch_size: usize,
}

#[derive(Debug, Clone)]
pub struct SelectArgs {
    pub conn: ConnArgs,
    pub table: String,
    pub columns: Option<Vec<String>>,
    pub filters: Vec<(String, String)>,
    pub limit: Option<i64>,
    pub json: bool,
}

#[derive(Debug, Clone)]
pub struct DropArgs {
    pub conn: ConnArgs,
    pub table: String,
}

pub fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let mut it = args.iter().skip(1);
    let Some(first) = it.next() else {
        return Ok(Command::Help(HelpTopic::Root));
    };

    let topic = match first.as_str() {
        "-h" | "--help" | "help" => return Ok(Command::Help(HelpTopic::Root)),
        "bootstrap" => HelpTopic::Bootstrap,
        "load" => HelpTopic::Load,
        "select" => HelpTopic::Select,
        "drop" => HelpTopic::Drop,
        _ => anyhow::bail!("unknown command: {first}"),
    };
    parse_command(topic, it.map(|s| s.as_str()))
}

/// Parsed tokens before they are checked against one command's shape.
#[derive(Debug, Default)]
struct Parsed {
    conn: ConnArgs,
    positional: Vec<String>,
    columns: Option<Vec<String>>,
    filters: Vec<(String, String)>,
    limit: Option<i64>,
    batch_size: Option<usize>,
    json: bool,
}

fn parse_command<'a>(topic: HelpTopic, mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut p = Parsed::default();

    while let Some(token) = it.next() {
        let (flag, inline) = match token.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value)),
            _ => (token, None),
        };
        let mut value = |name: &str| -> anyhow::Result<String> {
            match inline {
                Some(v) => Ok(v.to_string()),
                None => it
                    .next()
                    .map(str::to_string)
                    .ok_or_else(|| anyhow::anyhow!("{name} requires a value")),
            }
        };

        match flag {
            "-h" | "--help" => return Ok(Command::Help(topic)),
            "--config" => p.conn.config = PathBuf::from(value("--config")?),
            "--database" => p.conn.database = Some(value("--database")?),
            "--columns" if topic == HelpTopic::Select => {
                let parsed = split_csv(&value("--columns")?);
                if parsed.is_empty() {
                    anyhow::bail!("--columns must not be empty");
                }
                p.columns = Some(parsed);
            }
            "--where" if topic == HelpTopic::Select => {
                let raw = value("--where")?;
                let Some((col, val)) = raw.split_once('=') else {
                    anyhow::bail!("--where expects col=value, got: {raw}");
                };
                let col = col.trim();
                if col.is_empty() {
                    anyhow::bail!("--where expects col=value, got: {raw}");
                }
                p.filters.push((col.to_string(), val.to_string()));
            }
            "--limit" if topic == HelpTopic::Select => {
                let raw = value("--limit")?;
                let n: i64 = raw
                    .parse()
                    .map_err(|_| anyhow::anyhow!("--limit must be an integer, got: {raw}"))?;
                p.limit = Some(n);
            }
            "--json" if topic == HelpTopic::Select => p.json = true,
            "--batch-size" if topic == HelpTopic::Load => {
                let raw = value("--batch-size")?;
                let n: usize = raw
                    .parse()
                    .map_err(|_| anyhow::anyhow!("--batch-size must be a positive integer, got: {raw}"))?;
                if n == 0 {
                    anyhow::bail!("--batch-size must be a positive integer, got: {raw}");
                }
                p.batch_size = Some(n);
            }
            _ if flag.starts_with('-') => anyhow::bail!("unknown option: {token}"),
            _ => p.positional.push(token.to_string()),
        }
    }

    build_command(topic, p)
}

fn build_command(topic: HelpTopic, p: Parsed) -> anyhow::Result<Command> {
    let Parsed {
        conn,
        positional,
        columns,
        filters,
        limit,
        batch_size,
        json,
    } = p;
    let mut positional = positional.into_iter();
    let mut take = |what: &str| {
        positional
            .next()
            .ok_or_else(|| anyhow::anyhow!("missing argument: <{what}>"))
    };

    let cmd = match topic {
        HelpTopic::Root => return Ok(Command::Help(HelpTopic::Root)),
        HelpTopic::Bootstrap => Command::Bootstrap(BootstrapArgs {
            conn,
            file: PathBuf::from(take("schema.sql")?),
        }),
        HelpTopic::Load => Command::Load(LoadArgs {
            conn,
            table: take("table")?,
            file: PathBuf::from(take("file.csv")?),
            batch_size: batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
        }),
        HelpTopic::Select => Command::Select(SelectArgs {
            conn,
            table: take("table")?,
            columns,
            filters,
            limit,
            json,
        }),
        HelpTopic::Drop => Command::Drop(DropArgs {
            conn,
            table: take("table")?,
        }),
    };

    if let Some(extra) = positional.next() {
        anyhow::bail!("unexpected argument: {extra}");
    }
    Ok(cmd)
}

fn split_csv(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

pub fn print_help(topic: HelpTopic) {
    match topic {
        HelpTopic::Root => {
            println!(
                "\
pgcrud - allow-listed CRUD against PostgreSQL tables

USAGE:
  pgcrud <COMMAND> [OPTIONS]

COMMANDS:
  bootstrap     Run a schema SQL script once
  load          Load a CSV file into a table
  select        Print rows from a table
  drop          Drop a table
  help          Print this help

GLOBAL OPTIONS:
  --config <FILE>       Config file path (default: pgcrud.toml)
  --database <URL>      Override the [database] section with a connection URL
  -h, --help            Print help

Run `pgcrud <command> --help` for more."
            );
        }
        HelpTopic::Bootstrap => {
            println!(
                "\
USAGE:
  pgcrud bootstrap <schema.sql> [--config <FILE>] [--database <URL>]

Splits the script on ';' and runs each statement in order, then commits."
            );
        }
        HelpTopic::Load => {
            println!(
                "\
USAGE:
  pgcrud load <table> <file.csv> [OPTIONS]

OPTIONS:
  --batch-size <N>      Rows per insert batch; each batch commits (default: 1000)

The header row names the columns; every column must be in the table's allow-list.
Empty fields load as NULL."
            );
        }
        HelpTopic::Select => {
            println!(
                "\
USAGE:
  pgcrud select <table> [OPTIONS]

OPTIONS:
  --columns <a,b,...>   Columns to return (default: every allow-listed column)
  --where <col=value>   Equality filter; repeat to AND several
  --limit <N>           Return at most N rows
  --json                Print one JSON object per row"
            );
        }
        HelpTopic::Drop => {
            println!(
                "\
USAGE:
  pgcrud drop <table> [--config <FILE>] [--database <URL>]

Runs DROP TABLE IF EXISTS after validating the table name."
            );
        }
    }
}
