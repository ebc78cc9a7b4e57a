use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{load_config, ConfigurationProvider, GuildConfig};
use crate::data::directory::UnitDirectory;
use crate::data::exclusions::{invert_players, ExclusionEngine};
use crate::data::player::parse_ally_code;
use crate::data::registry::{load_registry, REGISTRY_FILE};
use crate::data::unit::TagFilter;
use crate::data::validate::validate_tables;
use crate::remote::{build_provider, DataProvider};
use crate::report::rollup::{guild_rollup, rollup_rows, write_rollup_csv};
use crate::report::{
    resolve_event_definitions, CsvSink, MemorySink, SnapshotCriteria, SnapshotReporter,
};
use crate::roster::{resolve_snapshot, sync_tables, RosterAssembler, SnapshotQuery};
use crate::tables::{LocalTables, TablesLocation};

pub const SNAPSHOT_ALERT: &str = "ERROR: Failed to retrieve player's data.";

/// Guild roster reconciliation, snapshots and rollups
#[derive(Parser, Debug)]
#[command(name = "datacron", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to the guild config (YAML)
    #[arg(short, long, global = true, env = "DATACRON_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Report one member's GP, threshold counts and tracked units
    Snapshot {
        /// Member name as written in the roster
        #[arg(short, long)]
        name: Option<String>,

        /// Ally code (123-456-789 or 123456789)
        #[arg(short, long)]
        ally_code: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Also write the report blocks to this CSV file
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Count owners per unit and star level across the guild
    Rollup {
        /// Write CSV here instead of printing
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Pull the guild from the configured provider and rewrite the CSV tables
    Sync,

    /// Check the local tables for problems
    Validate,
}

pub fn parse_command(args: &[String]) -> Result<Cli, clap::Error> {
    Cli::try_parse_from(args)
}

pub fn run_with_args(args: &[String]) -> i32 {
    let cli = match parse_command(args) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return err.exit_code();
        }
    };
    init_tracing(cli.log_level());

    let mut config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            return 2;
        }
    };
    if let Err(err) = config.apply_overrides(|key| std::env::var(key).ok()) {
        eprintln!("config error: {err}");
        return 2;
    }

    match cli.command {
        Command::Snapshot {
            name,
            ally_code,
            json,
            out,
        } => handle_snapshot(&config, name, ally_code.as_deref(), json, out),
        Command::Rollup { out } => handle_rollup(&config, out),
        Command::Sync => handle_sync(&config),
        Command::Validate => handle_validate(&config),
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_tables(config: &GuildConfig) -> Option<LocalTables> {
    let location = config.tables_location();
    match LocalTables::load(&location, config.member_count()) {
        Ok(tables) => Some(tables),
        Err(err) => {
            eprintln!("failed to load tables from '{}': {err}", location.path().display());
            None
        }
    }
}

fn handle_snapshot(
    config: &GuildConfig,
    name: Option<String>,
    ally_code: Option<&str>,
    json: bool,
    out: Option<PathBuf>,
) -> i32 {
    let ally_code = match ally_code.map(|raw| (raw, parse_ally_code(raw))) {
        None => None,
        Some((_, Some(code))) => Some(code),
        Some((raw, None)) => {
            eprintln!("invalid ally code '{raw}'");
            return 2;
        }
    };
    let Some(tables) = load_tables(config) else {
        return 1;
    };

    let provider: Option<Box<dyn DataProvider>> = match build_provider(config) {
        Ok(provider) => Some(provider),
        Err(err) => {
            warn!(error = %err, "remote provider unavailable");
            None
        }
    };
    let mut directory = UnitDirectory::from_tables(&tables.heroes, &tables.ships);
    let mut assembler = RosterAssembler::new(&tables.roster, &tables.heroes, &tables.ships);
    if let Some(provider) = provider.as_deref() {
        directory = directory.with_refresh_source(provider);
        assembler = assembler.with_provider(provider);
    }

    let query = SnapshotQuery {
        member_name: name,
        ally_code,
    };
    let alignment = TagFilter::new(config.current_event());
    let Some(player) = resolve_snapshot(&assembler, &query, &alignment, &mut directory) else {
        eprintln!("{SNAPSHOT_ALERT}");
        return 1;
    };

    let events = resolve_event_definitions(tables.events.column_for(config.current_event()));
    let report = SnapshotReporter::new(SnapshotCriteria {
        alignment: config.current_event().to_string(),
        character_tag: config.tag_filter().to_string(),
        power_threshold: config.required_hero_gp(),
    })
    .build(&player, events);

    if let Some(path) = out {
        if let Err(err) = report.write_to(&mut CsvSink::new(&path)) {
            eprintln!("{err}");
            return 1;
        }
    }
    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(raw) => println!("{raw}"),
            Err(err) => {
                eprintln!("failed to serialize snapshot: {err}");
                return 1;
            }
        }
    } else {
        let mut sink = MemorySink::default();
        if let Err(err) = report.write_to(&mut sink) {
            eprintln!("{err}");
            return 1;
        }
        print!("{}", sink.render_tsv());
    }
    0
}

fn handle_rollup(config: &GuildConfig, out: Option<PathBuf>) -> i32 {
    let Some(tables) = load_tables(config) else {
        return 1;
    };
    let players = RosterAssembler::new(&tables.roster, &tables.heroes, &tables.ships).assemble_bulk();
    let mut bulk = invert_players(&players);
    ExclusionEngine::new(config.exclusion_policy).process(
        &mut bulk,
        &tables.exclusions,
        Some(config.current_event()),
    );
    let rows = guild_rollup(&bulk);

    match out {
        Some(path) => match write_rollup_csv(&path, &rows) {
            Ok(()) => {
                info!(path = %path.display(), units = rows.len(), "rollup written");
                0
            }
            Err(err) => {
                eprintln!("{err}");
                1
            }
        },
        None => {
            for row in rollup_rows(&rows) {
                println!("{}", row.join("\t"));
            }
            0
        }
    }
}

fn handle_sync(config: &GuildConfig) -> i32 {
    let provider = match build_provider(config) {
        Ok(provider) => provider,
        Err(err) => {
            eprintln!("{err}");
            return 1;
        }
    };
    match sync_tables(config, provider.as_ref()) {
        Ok(outcome) => {
            println!(
                "synced {} members from {} ({} heroes, {} ships, {} excluded)",
                outcome.members,
                provider.name(),
                outcome.heroes,
                outcome.ships,
                outcome.excluded
            );
            0
        }
        Err(err) => {
            eprintln!("sync failed: {err}");
            1
        }
    }
}

fn handle_validate(config: &GuildConfig) -> i32 {
    let Some(tables) = load_tables(config) else {
        return 1;
    };
    let report = validate_tables(&tables.roster, &tables.heroes, &tables.ships);

    if let TablesLocation::CsvDir(dir) = config.tables_location() {
        for (dataset, entry) in load_registry(&dir.join(REGISTRY_FILE)) {
            let as_of = entry.last_updated.as_deref().unwrap_or("unknown");
            println!("{dataset}: {} as of {as_of}", entry.source);
        }
    }
    for diag in &report.diagnostics {
        println!("{}: {}: {}", diag.severity, diag.context, diag.message);
    }
    if report.has_errors() {
        eprintln!("validation failed: {} diagnostic(s)", report.diagnostics.len());
        1
    } else {
        println!("validation passed: {}", config.tables.display());
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn snapshot_flags_parse() {
        let cli = parse_command(&args(&["datacron", "-vv", "snapshot", "--name", "Bob", "--json"]))
            .expect("parse");
        assert_eq!(cli.log_level(), "debug");
        assert_eq!(
            cli.command,
            Command::Snapshot {
                name: Some("Bob".into()),
                ally_code: None,
                json: true,
                out: None
            }
        );
    }

    #[test]
    fn unknown_command_is_usage_error() {
        assert_eq!(run_with_args(&args(&["datacron", "explode"])), 2);
        assert_eq!(run_with_args(&args(&["datacron"])), 2);
    }

    #[test]
    fn help_exits_cleanly() {
        assert_eq!(run_with_args(&args(&["datacron", "--help"])), 0);
    }
}
