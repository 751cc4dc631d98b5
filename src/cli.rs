use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{error, info};
use serde_json::Value;

use crate::client::http::connect;
use crate::client::EnvironmentClient;
use crate::config;
use crate::error::MigrationError;
use crate::migration::errors::append_records;
use crate::migration::fetch::fetch_all;
use crate::migration::remap::IdRemapper;
use crate::migration::{Migrator, RunReport};
use crate::model::resource::ResourceType;

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Run,
    Reset(Vec<ResourceType>),
    Copy(Vec<ResourceType>),
    List { resource: ResourceType, target: bool },
    Get { resource: ResourceType, id: u64, target: bool },
    Help,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
    pub verbose: bool,
}

/// Parse everything after the binary name.
///
/// Supported forms:
///   zdmirror
///   zdmirror run
///   zdmirror reset [TYPE...]
///   zdmirror copy [TYPE...]
///   zdmirror list TYPE [--target]
///   zdmirror get TYPE ID [--target]
pub fn parse_args(args: &[String]) -> Result<Invocation> {
    let mut verbose = false;
    let mut target = false;
    let mut words: Vec<&str> = Vec::new();

    for arg in args {
        match arg.as_str() {
            "-v" | "--verbose" => verbose = true,
            "--target" => target = true,
            "-h" | "--help" => {
                return Ok(Invocation {
                    command: Command::Help,
                    verbose,
                })
            }
            flag if flag.starts_with('-') => bail!("Unknown option: {flag}"),
            word => words.push(word),
        }
    }

    let (name, rest) = match words.split_first() {
        Some((name, rest)) => (*name, rest),
        None => ("run", &[][..]),
    };

    if target && !matches!(name, "list" | "get") {
        bail!("--target only applies to list and get");
    }

    let command = match name {
        "run" => {
            if !rest.is_empty() {
                bail!("run takes no arguments; use reset/copy to restrict resource types");
            }
            Command::Run
        }
        "reset" => Command::Reset(parse_types(rest)?),
        "copy" => Command::Copy(parse_types(rest)?),
        "list" => match rest {
            [resource] => Command::List {
                resource: parse_type(resource)?,
                target,
            },
            _ => bail!("Usage: zdmirror list TYPE [--target]"),
        },
        "get" => match rest {
            [resource, id] => Command::Get {
                resource: parse_type(resource)?,
                id: id.parse().with_context(|| format!("Invalid id: {id}"))?,
                target,
            },
            _ => bail!("Usage: zdmirror get TYPE ID [--target]"),
        },
        "help" => Command::Help,
        other => bail!("Unknown command: {other}\n\nRun `zdmirror --help` for usage."),
    };

    Ok(Invocation { command, verbose })
}

fn parse_type(raw: &str) -> Result<ResourceType> {
    raw.parse::<ResourceType>().map_err(anyhow::Error::msg)
}

/// No types means all of them.
fn parse_types(raw: &[&str]) -> Result<Vec<ResourceType>> {
    if raw.is_empty() {
        return Ok(ResourceType::ALL.to_vec());
    }
    raw.iter().map(|r| parse_type(r)).collect()
}

pub async fn execute(command: Command) -> Result<()> {
    if command == Command::Help {
        print_help();
        return Ok(());
    }

    let config = config::load_config()?;
    let (source, target) = connect(&config)?;

    match command {
        Command::Run => {
            let mut migrator = Migrator::new(&source, &target);
            let mut report = RunReport::default();
            let outcome = migrator.run(&mut report).await;
            log_mappings(migrator.remapper());
            conclude(&report, outcome, &errors_path())
        }
        Command::Reset(types) => {
            let mut report = RunReport::default();
            let outcome = Migrator::new(&source, &target).reset(&types, &mut report).await;
            conclude(&report, outcome, &errors_path())
        }
        Command::Copy(types) => {
            let mut migrator = Migrator::new(&source, &target);
            let mut report = RunReport::default();
            let outcome = migrator.copy(&types, &mut report).await;
            log_mappings(migrator.remapper());
            conclude(&report, outcome, &errors_path())
        }
        Command::List { resource, target: use_target } => {
            let client: &dyn EnvironmentClient = if use_target { &target } else { &source };
            let items = fetch_all(client, resource.list_path(), resource.collection()).await?;
            for item in &items {
                println!("{}\t{}", item.get("id").unwrap_or(&Value::Null), display_name(item));
            }
            println!("{} {} in {}", items.len(), resource, client.name());
            Ok(())
        }
        Command::Get { resource, id, target: use_target } => {
            let client: &dyn EnvironmentClient = if use_target { &target } else { &source };
            let body = client.get(&resource.item_path(id)).await?;
            let item = body.get(resource.singular()).unwrap_or(&body);
            println!("{}", serde_json::to_string_pretty(item)?);
            Ok(())
        }
        Command::Help => Ok(()),
    }
}

fn display_name(item: &serde_json::Map<String, Value>) -> &str {
    item.get("title")
        .or_else(|| item.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("")
}

fn log_mappings(remapper: &IdRemapper) {
    for resource in ResourceType::ALL.into_iter().filter(ResourceType::is_referenced) {
        info!("{} {resource} mapped to new ids", remapper.mapped(resource));
    }
}

fn errors_path() -> PathBuf {
    config::data_dir().join("errors.jsonl")
}

/// Report whatever the run collected, then surface the error that stopped it, if any.
fn conclude(report: &RunReport, outcome: Result<(), MigrationError>, errors_path: &Path) -> Result<()> {
    let finished = finish(report, errors_path);
    match outcome {
        Ok(()) => finished,
        Err(e) => {
            if let Err(write_err) = finished {
                error!("{write_err:#}");
            }
            Err(anyhow::Error::new(e).context("Migration stopped early"))
        }
    }
}

/// Print the per-pass table and persist every error record for later reconciliation.
fn finish(report: &RunReport, path: &Path) -> Result<()> {
    print!("{}", report.summary());

    let records: Vec<_> = report.records().collect();
    if records.is_empty() {
        println!("\nNo errors.");
        return Ok(());
    }

    let written = append_records(path, records)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!(
        "\n{} failed operations, {} dropped references. {written} records appended to {}",
        report.failed(),
        report.dropped_references().count(),
        path.display()
    );
    Ok(())
}

pub fn print_help() {
    println!("zdmirror: mirror help desk configuration from production into a sandbox\n");
    println!("USAGE:");
    println!("  zdmirror [run]                 Delete the sandbox configuration, then copy production's");
    println!("  zdmirror reset [TYPE...]       Delete sandbox items (all types if none given)");
    println!("  zdmirror copy [TYPE...]        Copy production items into the sandbox");
    println!("  zdmirror list TYPE [--target]  List items of a type");
    println!("  zdmirror get TYPE ID [--target] Show one item");
    println!();
    println!("TYPES:");
    println!("  groups, ticket_fields, ticket_forms, automations, triggers, macros");
    println!();
    println!("OPTIONS:");
    println!("  -v, --verbose  Debug logging (RUST_LOG overrides)");
    println!("  --target       Read from the sandbox instead of production");
    println!();
    println!("CONFIG:");
    println!("  ~/.zdmirror/config.toml, or ZDMIRROR_{{SOURCE,TARGET}}_{{URL,USER,PASSWORD}}");
}
