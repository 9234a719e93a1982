use slurm_state::config::{Config, parse_timezone};
use slurm_state::state::JobStateManager;
use slurm_state::{EntityKind, ParseContext, Record, parse_reader, update};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    if let Err(err) = run(&config) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

struct CliConfig {
    kind: EntityKind,
    input: Option<PathBuf>,
    context: ParseContext,
    tally: Option<String>,
}

fn run(config: &CliConfig) -> slurm_state::Result<()> {
    let reader: Box<dyn BufRead> = match &config.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(io::stdin().lock()),
    };

    let mut records: Vec<Record> = Vec::new();
    let mut stdout = io::stdout().lock();
    for record in parse_reader(config.kind, reader, &config.context) {
        let record = record?;
        writeln!(stdout, "{}", to_json(&record))?;
        records.push(record);
    }
    tracing::info!(kind = %config.kind, records = records.len(), "dump parsed");

    if let Some(field) = &config.tally {
        let poll = update(&mut JobStateManager::new(field.as_str()), &records)?;
        writeln!(stdout, "{}", to_json(&poll))?;
    }
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|err| format!("{{\"error\":\"{err}\"}}"))
}

fn parse_args() -> Result<CliConfig, String> {
    let mut kind = EntityKind::Job;
    let mut input: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut cluster: Option<String> = None;
    let mut timezone: Option<String> = None;
    let mut slot: Option<String> = None;
    let mut tally: Option<String> = None;
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (arg.clone(), None),
        };
        let mut value = |name: &str| -> Result<String, String> {
            match inline.clone() {
                Some(value) => Ok(value),
                None => args.next().ok_or_else(|| format!("error: {name} expects a value")),
            }
        };

        match flag.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("slurm-state {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "-k" | "--kind" => kind = parse_kind(&value("--kind")?)?,
            "-i" | "--input" => input = Some(PathBuf::from(value("--input")?)),
            "-c" | "--config" => config_path = Some(PathBuf::from(value("--config")?)),
            "--cluster" => cluster = Some(value("--cluster")?),
            "--timezone" => timezone = Some(value("--timezone")?),
            "--slot" => slot = Some(value("--slot")?),
            "--tally" => tally = Some(value("--tally")?),
            _ if flag.starts_with('-') && flag != "-" => {
                return Err(format!("error: unknown option '{arg}'"));
            }
            _ => {
                if input.is_some() {
                    return Err("error: input provided multiple times".to_string());
                }
                if flag != "-" {
                    input = Some(PathBuf::from(arg));
                }
            }
        }
    }

    let mut context = match (&config_path, &cluster) {
        (Some(path), Some(name)) => {
            let cfg = Config::load(path).map_err(|err| format!("error: {err}"))?;
            let section = cfg.cluster(name).ok_or_else(|| format!("error: cluster '{name}' is not configured"))?;
            if tally.is_none() && kind == EntityKind::Job && section.tally_field.is_some() {
                tally = Some(section.tally_field().to_string());
            }
            section.context().map_err(|err| format!("error: {err}"))?
        }
        (Some(_), None) => return Err("error: --config requires --cluster".to_string()),
        (None, Some(_)) => return Err("error: --cluster requires --config".to_string()),
        (None, None) => ParseContext::default(),
    };
    if let Some(tz) = timezone {
        context.timezone = parse_timezone(&tz).map_err(|err| format!("error: --timezone: {err}"))?;
    }
    if let Some(slot) = slot {
        context.username_slot = slot;
    }
    if tally.is_some() && kind != EntityKind::Job {
        return Err("error: --tally only applies to --kind job".to_string());
    }

    Ok(CliConfig { kind, input, context, tally })
}

fn parse_kind(value: &str) -> Result<EntityKind, String> {
    match value {
        "job" | "jobs" => Ok(EntityKind::Job),
        "node" | "nodes" => Ok(EntityKind::Node),
        "reservation" | "reservations" => Ok(EntityKind::Reservation),
        _ => Err(format!("error: invalid --kind '{value}' (expected job, node or reservation)")),
    }
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "slurm-state {version}

Parse `scontrol show` output into normalized records.

Usage:
  slurm-state [OPTIONS] [FILE]
  scontrol show job | slurm-state --kind job --tally account

Options:
  -k, --kind <kind>          job, node or reservation. Default: job
  -i, --input <file>         Dump to read. Reads stdin when omitted or '-'.
  -c, --config <file>        TOML cluster configuration.
  --cluster <name>           Cluster section to take timezone and slot from.
  --timezone <tz>            IANA name (America/Montreal), UTC, Z or ±HH:MM.
                             Overrides the configuration.
  --slot <name>              Field name for a job's UserId. Default: {slot}
  --tally <field>            After the records, print the job tally grouped
                             by <field> (e.g. account).
  -h, --help                 Show this help message.
  -V, --version              Print version information.

Records are printed as one JSON object per line. Logs go to stderr and
follow RUST_LOG (default: info).

Exit codes:
  0  Success.
  1  Parse or I/O error.
  2  Invalid arguments.
",
        version = env!("CARGO_PKG_VERSION"),
        slot = slurm_state::DEFAULT_USERNAME_SLOT
    )
}
