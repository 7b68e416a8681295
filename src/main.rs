mod debug_report;

use drugkb::{DrugRecord, SearchFilter, Snapshot, ValidationError, check_regimen, load_catalog, search};
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "DRUGKB_LOG";

fn main() {
    init_tracing();

    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    match run(&config) {
        Ok(()) => {}
        Err(CliError::Input(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(CliError::Internal(msg)) => {
            eprintln!("{msg}");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

enum CliError {
    /// Bad arguments or catalog/regimen input; exit code 2.
    Input(String),
    /// Exit code 1.
    Internal(String),
}

struct CliConfig {
    catalog: PathBuf,
    drugs: Vec<String>,
    conditions: Vec<String>,
    search: Option<String>,
    dangerous: bool,
    unreciprocated: bool,
    json: bool,
    color: bool,
}

fn run(config: &CliConfig) -> Result<(), CliError> {
    let snapshot = load(&config.catalog)?;
    let palette = debug_report::Palette::new(config.color);
    let mut printed = false;

    if !config.drugs.is_empty() {
        let ids = drug_ids(&snapshot, &config.drugs)?;
        let report = check_regimen(&snapshot, &ids, &config.conditions)
            .map_err(|err| CliError::Input(format!("error: {err}")))?;
        if config.json {
            print_json(&report)?;
        } else {
            debug_report::print_regimen(&report, &palette);
        }
        printed = true;
    }

    if config.search.is_some() || config.dangerous {
        let mut filter = SearchFilter::new();
        if let Some(text) = &config.search {
            filter = filter.text(text.as_str());
        }
        if config.dangerous {
            filter = filter.dangerous(true);
        }
        let hits = search(&snapshot, &filter);
        if config.json {
            print_json(&hits)?;
        } else {
            debug_report::print_search(&filter, &hits, &palette);
        }
        printed = true;
    }

    if config.unreciprocated {
        let edges: Vec<_> = snapshot.graph().unreciprocated().collect();
        if config.json {
            print_json(&edges)?;
        } else {
            debug_report::print_unreciprocated(&edges, &palette);
        }
        printed = true;
    }

    if !printed {
        if config.json {
            print_json(snapshot.metrics())?;
        } else {
            debug_report::print_summary(&snapshot, &palette);
        }
    }
    Ok(())
}

fn load(path: &Path) -> Result<Snapshot, CliError> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| CliError::Input(format!("error: cannot read catalog '{}': {err}", path.display())))?;
    let records: Vec<DrugRecord> = serde_json::from_str(&text)
        .map_err(|err| CliError::Input(format!("error: catalog '{}' is not valid JSON: {err}", path.display())))?;

    load_catalog(records).map_err(|err| CliError::Input(describe_violations(&err)))
}

fn describe_violations(err: &ValidationError) -> String {
    let mut out = format!("error: {} catalog violation(s)", err.violations.len());
    for violation in &err.violations {
        out.push_str(&format!("\n  {violation}"));
    }
    out
}

/// Map each `--drug` argument to a catalog id. Ids pass through; names and
/// brands must match exactly one record. Unknown text is passed on so the
/// regimen check reports it with the other unknown ids.
fn drug_ids(snapshot: &Snapshot, args: &[String]) -> Result<Vec<String>, CliError> {
    let catalog = snapshot.catalog();
    args.iter()
        .map(|arg| {
            if catalog.contains_id(arg) {
                return Ok(arg.clone());
            }
            match catalog.by_name_or_brand(arg).as_slice() {
                [] => Ok(arg.clone()),
                [record] => Ok(record.id.clone()),
                many => {
                    let ids: Vec<&str> = many.iter().map(|r| r.id.as_str()).collect();
                    Err(CliError::Input(format!("error: '{arg}' matches several drugs: {}", ids.join(", "))))
                }
            }
        })
        .collect()
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::Internal(format!("error: failed to encode JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

fn parse_args() -> Result<CliConfig, String> {
    let mut catalog: Option<PathBuf> = None;
    let mut drugs = Vec::new();
    let mut conditions = Vec::new();
    let mut search: Option<String> = None;
    let mut dangerous = false;
    let mut unreciprocated = false;
    let mut json = false;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (arg.clone(), None),
        };
        let mut value = |name: &str| -> Result<String, String> {
            inline.clone().or_else(|| args.next()).ok_or_else(|| format!("error: {name} expects a value"))
        };

        match flag.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("drugkb {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--json" => json = true,
            "--dangerous" => dangerous = true,
            "--unreciprocated" => unreciprocated = true,
            "--catalog" | "-c" => {
                if catalog.is_some() {
                    return Err("error: --catalog provided multiple times".to_string());
                }
                catalog = Some(PathBuf::from(value("--catalog")?));
            }
            "--drug" | "-d" => drugs.push(value("--drug")?),
            "--condition" => conditions.push(value("--condition")?),
            "--search" | "-s" => {
                if search.is_some() {
                    return Err("error: --search provided multiple times".to_string());
                }
                search = Some(value("--search")?);
            }
            _ => return Err(format!("error: unknown option '{arg}'")),
        }
    }

    let catalog = catalog.ok_or_else(|| format!("error: --catalog is required\n\n{}", help_text()))?;
    if !conditions.is_empty() && drugs.is_empty() {
        return Err("error: --condition needs at least one --drug".to_string());
    }

    Ok(CliConfig { catalog, drugs, conditions, search, dangerous, unreciprocated, json, color })
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "drugkb {version}

Drug catalog index and regimen interaction checker.

Usage:
  drugkb --catalog <file.json> [--drug <id|name>]... [--condition <text>]...
  drugkb --catalog <file.json> [--search <text>] [--dangerous]
  drugkb --catalog <file.json> --unreciprocated

Options:
  -c, --catalog <file>       JSON array of drug records.
  -d, --drug <id|name>       Add a drug to the regimen (repeatable). Accepts a
                             catalog id, name, generic name, or brand name.
  --condition <text>         Patient condition or allergy (repeatable).
  -s, --search <text>        Search names, uses and mechanisms.
  --dangerous                Only records flagged dangerous.
  --unreciprocated           List interactions only one drug describes.
  --json                     Print results as JSON.
  --color                    Force ANSI color output.
  --no-color                 Disable ANSI color output.
  -h, --help                 Show this help message.
  -V, --version              Print version information.

With no query options a catalog summary is printed.

Logging:
  {log_env}=<filter>        tracing filter for stderr logs. Default: warn

Exit codes:
  0  Success.
  1  Internal error.
  2  Invalid arguments, catalog, or regimen input.
",
        version = env!("CARGO_PKG_VERSION"),
        log_env = LOG_ENV,
    )
}
