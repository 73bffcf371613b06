#![deny(warnings)]

//! Headless CLI over the order engine: quotes, record normalization,
//! contract numbers and contract documents.

mod config;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use config::EngineConfig;
use contracts::{ContractNumber, ContractNumberGenerator};
use order_core::{ReleaseType, Tariff};
use order_intake::{Normalized, Normalizer, RecordStyle};
use order_pricing::{price_order, OrderContext, OrderSelection};
use persistence::Store;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_SHA"),
    ", ",
    env!("BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "release-desk")]
#[command(about = "Order pricing, intake and contract tooling for music releases")]
#[command(version = VERSION)]
struct Args {
    /// Engine config (YAML); built-in defaults when omitted
    #[arg(short, long, global = true, env = "RELEASE_DESK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Price an order, optionally applying a promo code
    Quote {
        #[arg(long)]
        tariff: Tariff,
        #[arg(long)]
        release: ReleaseType,
        /// Track count; the release type's minimum when omitted
        #[arg(long)]
        tracks: Option<u32>,
        #[arg(long)]
        karaoke: bool,
        #[arg(long)]
        promo: Option<String>,
        /// Promo catalog (YAML), overrides the configured one
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Date the promo code is checked against; today when omitted
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Normalize a submission record (JSON file, `-` for stdin)
    Normalize {
        input: PathBuf,
        /// Print the record in this key convention instead of the canonical form
        #[arg(long, value_enum)]
        export: Option<Style>,
    },
    /// Render a contract document for a submission record
    Contract {
        input: PathBuf,
        /// Existing contract number; a fresh one is generated when omitted
        #[arg(long)]
        number: Option<ContractNumber>,
        #[arg(long)]
        signed: bool,
        #[arg(long, value_enum, default_value = "html")]
        format: Format,
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate a contract number
    Number {
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Deterministic sequence for scripting and tests
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Normalize a record and store it as a confirmed submission
    Submit {
        input: PathBuf,
        /// Database URL, overrides the configured one
        #[arg(long, env = "RELEASE_DESK_DATABASE_URL")]
        database: Option<String>,
        /// Also assign a contract number
        #[arg(long)]
        assign_number: bool,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Style {
    Storage,
    Display,
}

impl From<Style> for RecordStyle {
    fn from(s: Style) -> Self {
        match s {
            Style::Storage => RecordStyle::Storage,
            Style::Display => RecordStyle::Display,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Html,
    Text,
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn read_record(normalizer: &Normalizer, input: &Path) -> Result<Normalized> {
    let text = if input == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?
    };
    let value: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", input.display()))?;
    let normalized = normalizer.normalize_value(&value);
    for w in &normalized.warnings {
        warn!(input = %input.display(), "{w}");
    }
    Ok(normalized)
}

fn quote(
    cfg: &EngineConfig,
    selection: OrderSelection,
    promo: Option<&str>,
    catalog: Option<&Path>,
    date: NaiveDate,
) -> Result<()> {
    let calculator = cfg.calculator()?;
    let catalog = cfg.promo_catalog(catalog)?;
    let (breakdown, rejection) = price_order(&calculator, &selection, promo, &catalog, date);
    println!("{}", serde_json::to_string_pretty(&breakdown)?);
    if let Some(reason) = rejection {
        eprintln!("{}", reason.user_message());
    }
    Ok(())
}

fn render_contract(
    cfg: &EngineConfig,
    normalized: &Normalized,
    number: Option<ContractNumber>,
    signed: bool,
    issued_on: NaiveDate,
) -> Result<contracts::RenderedContract> {
    let renderer = cfg.renderer()?;
    let number = match number {
        Some(n) => n,
        None => ContractNumberGenerator::new(&cfg.contract_prefix)?.generate(issued_on)?,
    };
    let s = &normalized.submission;
    Ok(if signed {
        renderer.render_signed(s, &number, issued_on)
    } else {
        renderer.render(s, &number, issued_on)
    })
}

async fn submit(
    cfg: &EngineConfig,
    normalized: Normalized,
    database: Option<String>,
    assign_number: bool,
    date: NaiveDate,
) -> Result<()> {
    let url = database.unwrap_or_else(|| cfg.database_url.clone());
    let store = Store::connect(&url)
        .await
        .with_context(|| format!("opening {url}"))?;
    let s = normalized.submission;

    let calculator = cfg.calculator()?;
    if let Some(mismatch) = calculator.audit(&s) {
        warn!(?mismatch, "stored price differs from current price list");
    }
    if let Some(code) = &s.promo_code {
        // Surface the reason before the store refuses the submission.
        let ctx = OrderContext::new(Some(s.tariff), Some(s.release_type), s.pricing.subtotal());
        let catalog = store.promo_catalog().await?;
        if let Err(reason) = order_pricing::validate_promo(code, &ctx, &catalog, date) {
            bail!("{}", reason.user_message());
        }
    }

    let id = store.submit(&s, date).await?;
    println!("submission {id}");
    if assign_number {
        let mut generator = ContractNumberGenerator::new(&cfg.contract_prefix)?;
        let assignment = store.assign_contract_number(id, &mut generator, date).await?;
        println!("contract {}", assignment.number);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries command output.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cfg = EngineConfig::load(args.config.as_deref())?;
    info!(version = VERSION, config = ?args.config, "starting");
    let normalizer = Normalizer::default();

    match args.command {
        Command::Quote {
            tariff,
            release,
            tracks,
            karaoke,
            promo,
            catalog,
            date,
        } => {
            let tracks = tracks.unwrap_or_else(|| release.min_tracks());
            let selection = OrderSelection::new(tariff, release, tracks, karaoke);
            quote(
                &cfg,
                selection,
                promo.as_deref(),
                catalog.as_deref(),
                date.unwrap_or_else(today),
            )?;
        }
        Command::Normalize { input, export } => {
            let normalized = read_record(&normalizer, &input)?;
            let out = match export {
                Some(style) => serde_json::to_string_pretty(
                    &normalizer.to_record(&normalized.submission, style.into()),
                )?,
                None => serde_json::to_string_pretty(&normalized)?,
            };
            println!("{out}");
        }
        Command::Contract {
            input,
            number,
            signed,
            format,
            date,
            output,
        } => {
            let normalized = read_record(&normalizer, &input)?;
            let issued_on = date.unwrap_or_else(today);
            let doc = render_contract(&cfg, &normalized, number, signed, issued_on)?;
            let body = match format {
                Format::Html => &doc.html,
                Format::Text => &doc.text,
            };
            match output {
                Some(path) => {
                    std::fs::write(&path, body)
                        .with_context(|| format!("writing {}", path.display()))?;
                    info!(number = %doc.number, path = %path.display(), "contract written");
                }
                None => println!("{body}"),
            }
        }
        Command::Number { prefix, date, seed } => {
            let prefix = prefix.unwrap_or_else(|| cfg.contract_prefix.clone());
            let mut generator = match seed {
                Some(seed) => ContractNumberGenerator::seeded(&prefix, seed)?,
                None => ContractNumberGenerator::new(&prefix)?,
            };
            println!("{}", generator.generate(date.unwrap_or_else(today))?);
        }
        Command::Submit {
            input,
            database,
            assign_number,
            date,
        } => {
            let normalized = read_record(&normalizer, &input)?;
            submit(
                &cfg,
                normalized,
                database,
                assign_number,
                date.unwrap_or_else(today),
            )
            .await?;
        }
    }
    Ok(())
}
