//! `slot` CLI — inspect a provider schedule from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Resolve a horizon to concrete open intervals
//! slot resolve -s schedule.json --from 2026-01-12T00:00:00Z --to 2026-01-19T00:00:00Z
//!
//! # Same, as JSON
//! slot resolve -s schedule.json --from 2026-01-12T00:00:00Z --to 2026-01-19T00:00:00Z --json
//!
//! # Check whether a candidate window is bookable
//! slot check -s schedule.json --start 2026-01-12T09:00:00Z --end 2026-01-12T10:00:00Z
//!
//! # Earliest open span that fits a duration
//! slot first-fit -s schedule.json --from 2026-01-12T00:00:00Z --to 2026-01-19T00:00:00Z --duration 60
//! ```
//!
//! The schedule file is JSON describing one listing: `timezone`, `capacity`,
//! weekly `rules` (`days`, `start`/`end` as `HH:MM`), dated `exceptions`
//! (`kind` is `block` or `open`), and an optional `service`.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveTime, Utc, Weekday};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::process;

use slot_engine::{
    BookingEngine, ExceptionKind, Interval, ListingId, RuleSpec, ServiceId, ServiceTerms, UserId,
};

/// The schedule file describes a single listing; the CLI acts as its owner.
const PROVIDER: UserId = UserId(1);

#[derive(Parser)]
#[command(name = "slot", version, about = "Provider availability inspection CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the schedule to concrete open intervals
    Resolve {
        /// Path to the schedule JSON file
        #[arg(short, long)]
        schedule: String,
        /// Horizon start (RFC 3339, e.g. 2026-01-12T00:00:00Z)
        #[arg(long, value_parser = parse_utc)]
        from: DateTime<Utc>,
        /// Horizon end (RFC 3339, exclusive)
        #[arg(long, value_parser = parse_utc)]
        to: DateTime<Utc>,
        /// Emit JSON instead of one line per interval
        #[arg(long)]
        json: bool,
    },
    /// Evaluate a candidate booking window
    Check {
        /// Path to the schedule JSON file
        #[arg(short, long)]
        schedule: String,
        /// Candidate start (RFC 3339)
        #[arg(long, value_parser = parse_utc)]
        start: DateTime<Utc>,
        /// Candidate end (RFC 3339, exclusive)
        #[arg(long, value_parser = parse_utc)]
        end: DateTime<Utc>,
        /// Evaluate as if the current time were this instant
        #[arg(long, value_parser = parse_utc)]
        now: Option<DateTime<Utc>>,
        /// Emit the decision as JSON
        #[arg(long)]
        json: bool,
    },
    /// Find the earliest open span that fits a duration
    FirstFit {
        /// Path to the schedule JSON file
        #[arg(short, long)]
        schedule: String,
        /// Horizon start (RFC 3339)
        #[arg(long, value_parser = parse_utc)]
        from: DateTime<Utc>,
        /// Horizon end (RFC 3339, exclusive)
        #[arg(long, value_parser = parse_utc)]
        to: DateTime<Utc>,
        /// Minutes to fit (defaults to the schedule's service duration)
        #[arg(long)]
        duration: Option<u32>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            schedule,
            from,
            to,
            json,
        } => {
            let loaded = load_schedule(&schedule)?;
            let open = loaded.engine.resolve_availability(loaded.listing, from, to)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&open)?);
            } else if open.is_empty() {
                println!("no open intervals in horizon");
            } else {
                for iv in &open {
                    println!("{}", format_interval(iv));
                }
            }
        }
        Commands::Check {
            schedule,
            start,
            end,
            now,
            json,
        } => {
            let loaded = load_schedule(&schedule)?;
            let service = loaded.service.map(|(id, _)| id);
            let decision = match now {
                Some(now) => loaded
                    .engine
                    .evaluate_candidate_at(loaded.listing, service, start, end, now)?,
                None => loaded
                    .engine
                    .evaluate_candidate(loaded.listing, service, start, end)?,
            };
            if json {
                println!("{}", serde_json::to_string(&decision)?);
            } else if decision.admit {
                println!("ADMIT");
            } else {
                let reason = decision.reason.map(|r| r.to_string()).unwrap_or_default();
                println!("REJECT {reason}");
            }
            if !decision.admit {
                process::exit(1);
            }
        }
        Commands::FirstFit {
            schedule,
            from,
            to,
            duration,
        } => {
            let loaded = load_schedule(&schedule)?;
            let duration = match duration.or(loaded.service.map(|(_, terms)| terms.duration_min)) {
                Some(minutes) => minutes,
                None => bail!("no --duration given and the schedule has no service"),
            };
            match loaded
                .engine
                .first_bookable_slot(loaded.listing, duration, from, to)?
            {
                Some(slot) => println!("{}", format_interval(&slot)),
                None => {
                    println!("no open interval fits {duration} min");
                    process::exit(1);
                }
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Schedule file
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScheduleFile {
    timezone: String,
    capacity: u32,
    #[serde(default)]
    rules: Vec<RuleEntry>,
    #[serde(default)]
    exceptions: Vec<ExceptionEntry>,
    service: Option<ServiceEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleEntry {
    days: Vec<String>,
    start: String,
    end: String,
    /// Defaults to the listing timezone.
    timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExceptionEntry {
    kind: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
struct ServiceEntry {
    duration_min: u32,
    #[serde(default)]
    buffer_before_min: u32,
    #[serde(default)]
    buffer_after_min: u32,
    #[serde(default)]
    min_notice_min: u32,
    #[serde(default = "default_max_notice_days")]
    max_notice_days: u32,
}

fn default_max_notice_days() -> u32 {
    slot_engine::MAX_HORIZON_DAYS as u32
}

struct Loaded {
    engine: BookingEngine,
    listing: ListingId,
    service: Option<(ServiceId, ServiceTerms)>,
}

/// Read a schedule file and materialize it as a single-listing engine.
fn load_schedule(path: &str) -> Result<Loaded> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read schedule file: {path}"))?;
    let file: ScheduleFile = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse schedule file: {path}"))?;

    let engine = BookingEngine::new();
    let listing = engine
        .create_listing(PROVIDER, &file.timezone, file.capacity)
        .context("Invalid listing in schedule file")?;

    let mut rules = Vec::with_capacity(file.rules.len());
    for entry in &file.rules {
        rules.push(RuleSpec {
            days: parse_days(&entry.days)?,
            start: parse_time(&entry.start)?,
            end: parse_time(&entry.end)?,
            timezone: entry
                .timezone
                .clone()
                .unwrap_or_else(|| file.timezone.clone()),
        });
    }
    engine
        .replace_rules(PROVIDER, listing, rules)
        .context("Invalid rule in schedule file")?;

    for entry in &file.exceptions {
        let kind = parse_kind(&entry.kind)?;
        engine
            .add_exception(
                PROVIDER,
                listing,
                entry.start,
                entry.end,
                kind,
                entry.reason.clone(),
            )
            .context("Invalid exception in schedule file")?;
    }

    let service = match file.service {
        Some(entry) => {
            let terms = ServiceTerms {
                duration_min: entry.duration_min,
                buffer_before_min: entry.buffer_before_min,
                buffer_after_min: entry.buffer_after_min,
                min_notice_min: entry.min_notice_min,
                max_notice_days: entry.max_notice_days,
            };
            let id = engine
                .add_service(PROVIDER, listing, terms)
                .context("Invalid service in schedule file")?;
            Some((id, terms))
        }
        None => None,
    };

    Ok(Loaded {
        engine,
        listing,
        service,
    })
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

fn parse_utc(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

fn parse_days(days: &[String]) -> Result<Vec<Weekday>> {
    let mut out = Vec::with_capacity(days.len());
    for day in days {
        let parsed = day
            .parse::<Weekday>()
            .map_err(|_| anyhow::anyhow!("Unknown weekday in schedule file: '{day}'"))?;
        out.push(parsed);
    }
    Ok(out)
}

fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .with_context(|| format!("Invalid time of day in schedule file: '{s}' (expected HH:MM)"))
}

fn parse_kind(s: &str) -> Result<ExceptionKind> {
    match s {
        "block" => Ok(ExceptionKind::Block),
        "open" => Ok(ExceptionKind::Open),
        other => bail!("Unknown exception kind '{other}' (expected 'block' or 'open')"),
    }
}

fn format_interval(iv: &Interval) -> String {
    format!(
        "{} .. {}  ({} min)",
        iv.start.format("%Y-%m-%d %H:%M"),
        iv.end.format("%Y-%m-%d %H:%M"),
        iv.duration_minutes()
    )
}
