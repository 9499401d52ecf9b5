use dbbind::ParamStyle;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Root,
    Compile,
    Load,
    Init,
}

#[derive(Debug, Clone)]
pub enum Command {
    Help(HelpTopic),
    Compile(CompileArgs),
    Load(LoadArgs),
    Init(InitArgs),
}

#[derive(Debug, Clone)]
pub struct CompileArgs {
    pub style: ParamStyle,
    pub sql: String,
}

#[derive(Debug, Clone)]
pub struct LoadArgs {
    pub config: PathBuf,
    pub database: Option<String>,
    pub chunk_size: Option<usize>,
    pub isolate: bool,
    pub sql: String,
    pub file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct InitArgs {
    pub config: PathBuf,
}

const DEFAULT_CONFIG: &str = "dbbind.toml";

pub fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let mut it = args.iter().skip(1);
    let Some(first) = it.next() else {
        return Ok(Command::Help(HelpTopic::Root));
    };

    match first.as_str() {
        "-h" | "--help" => Ok(Command::Help(HelpTopic::Root)),
        "compile" => parse_compile(it.map(|s| s.as_str())),
        "load" => parse_load(it.map(|s| s.as_str())),
        "init" => parse_init(it.map(|s| s.as_str())),
        _ => anyhow::bail!("unknown command: {first}"),
    }
}

/// Value of `--name <v>` or `--name=<v>`, if `token` is that flag.
fn flag_value<'a>(
    token: &'a str,
    name: &str,
    it: &mut impl Iterator<Item = &'a str>,
) -> anyhow::Result<Option<&'a str>> {
    if token == name {
        let Some(v) = it.next() else {
            anyhow::bail!("{name} requires a value");
        };
        return Ok(Some(v));
    }
    Ok(token
        .strip_prefix(name)
        .and_then(|rest| rest.strip_prefix('=')))
}

fn parse_compile<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut style = ParamStyle::default();
    let mut sql: Option<String> = None;

    while let Some(token) = it.next() {
        if matches!(token, "-h" | "--help") {
            return Ok(Command::Help(HelpTopic::Compile));
        }
        if let Some(v) = flag_value(token, "--style", &mut it)? {
            style = v.parse()?;
            continue;
        }
        if token.starts_with("--") {
            anyhow::bail!("unknown option: {token}");
        }
        if sql.is_some() {
            anyhow::bail!("unexpected argument: {token}");
        }
        sql = Some(token.to_string());
    }

    let Some(sql) = sql else {
        anyhow::bail!("compile requires a SQL argument");
    };
    Ok(Command::Compile(CompileArgs { style, sql }))
}

fn parse_load<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut config = PathBuf::from(DEFAULT_CONFIG);
    let mut database: Option<String> = None;
    let mut chunk_size: Option<usize> = None;
    let mut isolate = false;
    let mut sql: Option<String> = None;
    let mut file: Option<PathBuf> = None;

    while let Some(token) = it.next() {
        if matches!(token, "-h" | "--help") {
            return Ok(Command::Help(HelpTopic::Load));
        }
        if token == "--isolate" {
            isolate = true;
            continue;
        }
        if let Some(v) = flag_value(token, "--config", &mut it)? {
            config = PathBuf::from(v);
            continue;
        }
        if let Some(v) = flag_value(token, "--database", &mut it)? {
            database = Some(v.to_string());
            continue;
        }
        if let Some(v) = flag_value(token, "--chunk-size", &mut it)? {
            let n: usize = v
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid --chunk-size: {v}"))?;
            chunk_size = Some(n);
            continue;
        }
        if let Some(v) = flag_value(token, "--sql", &mut it)? {
            sql = Some(v.to_string());
            continue;
        }
        if token.starts_with("--") {
            anyhow::bail!("unknown option: {token}");
        }
        if file.is_some() {
            anyhow::bail!("unexpected argument: {token}");
        }
        file = Some(PathBuf::from(token));
    }

    let Some(sql) = sql else {
        anyhow::bail!("load requires --sql");
    };
    let Some(file) = file else {
        anyhow::bail!("load requires an input file");
    };
    Ok(Command::Load(LoadArgs {
        config,
        database,
        chunk_size,
        isolate,
        sql,
        file,
    }))
}

fn parse_init<'a>(mut it: impl Iterator<Item = &'a str>) -> anyhow::Result<Command> {
    let mut config = PathBuf::from(DEFAULT_CONFIG);

    while let Some(token) = it.next() {
        if matches!(token, "-h" | "--help") {
            return Ok(Command::Help(HelpTopic::Init));
        }
        if let Some(v) = flag_value(token, "--config", &mut it)? {
            config = PathBuf::from(v);
            continue;
        }
        anyhow::bail!("unexpected argument: {token}");
    }

    Ok(Command::Init(InitArgs { config }))
}

pub fn print_help(topic: HelpTopic) {
    match topic {
        HelpTopic::Root => {
            println!(
                "\
dbbind - named-placeholder SQL tooling

USAGE:
  dbbind <COMMAND> [OPTIONS]

COMMANDS:
  compile       Show the driver-native form of a statement
  load          Bulk-write a JSON file into PostgreSQL
  init          Write a template dbbind.toml

Run `dbbind <command> --help` for more."
            );
        }
        HelpTopic::Compile => {
            println!(
                "\
USAGE:
  dbbind compile [OPTIONS] <SQL>

OPTIONS:
  --style <STYLE>       qmark | format | numeric | named | dollar (default: qmark)
  -h, --help            Print help"
            );
        }
        HelpTopic::Load => {
            println!(
                "\
USAGE:
  dbbind load [OPTIONS] --sql <SQL> <FILE>

FILE is a JSON array of records or one JSON record per line (.jsonl).
Records are objects keyed by placeholder name, or arrays in placeholder order.

OPTIONS:
  --config <FILE>       Config file path (default: dbbind.toml)
  --database <URL>      Override database.url from config
  --chunk-size <N>      Override executor.chunk_size
  --isolate             Skip failing records and report them at the end
  -h, --help            Print help"
            );
        }
        HelpTopic::Init => {
            println!(
                "\
USAGE:
  dbbind init [OPTIONS]

OPTIONS:
  --config <FILE>       Config file path (default: dbbind.toml)
  -h, --help            Print help"
            );
        }
    }
}
