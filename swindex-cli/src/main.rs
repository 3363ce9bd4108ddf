//! swindex CLI: download, load, combine and convert space-weather indices.
//!
//! Commands:
//! - `instruments`: list instruments, their tags and descriptions
//! - `download`: fetch product files from the network or a mirror into the cache
//! - `list`: show the cached files of an instrument
//! - `load`: parse cached files into one series and print or save it
//! - `combine`: merge several tags of one instrument by priority
//! - `convert`: derive ap from Kp or Kp from ap
//! - `cache status` / `cache clean`: report on and empty the cache

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use swindex_core::combine::{combine, CombineOptions};
use swindex_core::config::Config;
use swindex_core::convert::{
    ace_swepam_hourly_omni_norm, calc_daily_ap, convert_ap_to_kp, convert_kp_to_ap, ConversionTable,
    DAILY_AP_MIN_PERIODS,
};
use swindex_core::domain::{InstrumentId, Series, SourceId, SourcePriority, TimeRange};
use swindex_core::download::{HttpSource, MirrorSource, PayloadCache, PayloadSource, StdoutProgress};
use swindex_core::export;
use swindex_core::parse::ParserRegistry;
use swindex_core::registry::{self, CleanLevel};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Span used when neither `--start` nor a configured start date is available.
const DEFAULT_DAYS: i64 = 30;

#[derive(Parser)]
#[command(name = "swindex", about = "swindex: space-weather index adapters")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache directory; overrides the configuration.
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Debug logging.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Instrument, tag and date range shared by most commands.
#[derive(clap::Args)]
struct Selection {
    /// Instrument name, e.g. kp, f107, ace_mag.
    instrument: String,

    /// Instrument tag, e.g. def, now, forecast.
    #[arg(long)]
    tag: String,

    /// First day (YYYY-MM-DD). Defaults to 30 days before --end.
    #[arg(long)]
    start: Option<String>,

    /// Last day (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<String>,
}

/// Where to write a series.
#[derive(clap::Args)]
struct Output {
    /// Write CSV to this file instead of stdout.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Print JSON instead of CSV.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Level {
    Clean,
    Dusty,
    Dirty,
    None,
}

impl From<Level> for CleanLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Clean => CleanLevel::Clean,
            Level::Dusty => CleanLevel::Dusty,
            Level::Dirty => CleanLevel::Dirty,
            Level::None => CleanLevel::None,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Conversion {
    KpToAp,
    ApToKp,
    /// Daily Ap and its 24-hour running mean from 3-hourly ap.
    DailyAp,
    /// ACE SWEPAM density and temperature on the hourly OMNI scale.
    SwepamOmni,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered instruments and their tags.
    Instruments,
    /// Fetch product files into the cache.
    Download {
        #[command(flatten)]
        sel: Selection,

        /// Read from this mirror directory instead of the network.
        #[arg(long)]
        mirror: Option<PathBuf>,
    },
    /// Show cached files of an instrument.
    List {
        instrument: String,

        #[arg(long)]
        tag: String,
    },
    /// Parse cached files into one series.
    Load {
        #[command(flatten)]
        sel: Selection,

        /// Validation level.
        #[arg(long, value_enum, default_value = "clean")]
        clean: Level,

        #[command(flatten)]
        out: Output,
    },
    /// Merge several tags of one instrument; earlier tags win.
    Combine {
        instrument: String,

        /// Tags in priority order, highest first (e.g. def,now,recent).
        #[arg(long, value_delimiter = ',', required = true)]
        tags: Vec<String>,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,

        /// Fields to keep. Defaults to every field.
        #[arg(long)]
        field: Vec<String>,

        #[command(flatten)]
        out: Output,
    },
    /// Derive ap from Kp or Kp from ap.
    Convert {
        #[arg(value_enum)]
        conversion: Conversion,

        #[command(flatten)]
        sel: Selection,

        /// Source field. Defaults to Kp or ap; ignored by swepam-omni.
        #[arg(long)]
        from: Option<String>,

        /// Derived field name. Defaults to ap_from_kp, Kp_from_ap or Ap.
        #[arg(long)]
        to: Option<String>,

        #[command(flatten)]
        out: Output,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report files, size and date span per product.
    Status,
    /// Remove the cached files behind an instrument tag.
    Clean {
        instrument: String,

        #[arg(long)]
        tag: String,

        /// Actually delete (without this flag, only previews what would be removed).
        #[arg(long, default_value_t = false)]
        confirm: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path).with_context(|| format!("load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = dir;
    }
    let cache = PayloadCache::new(&config.cache_dir);
    let parsers = ParserRegistry::standard();

    match cli.command {
        Commands::Instruments => run_instruments(&config),
        Commands::Download { sel, mirror } => run_download(&sel, mirror, &config, &cache),
        Commands::List { instrument, tag } => run_list(&InstrumentId::new(&instrument, &tag), &cache),
        Commands::Load { sel, clean, out } => run_load(&sel, clean.into(), &out, &config, &cache, &parsers),
        Commands::Combine {
            instrument,
            tags,
            start,
            end,
            field,
            out,
        } => run_combine(&instrument, &tags, start.as_deref(), end.as_deref(), field, &out, &config, &cache, &parsers),
        Commands::Convert {
            conversion,
            sel,
            from,
            to,
            out,
        } => run_convert(conversion, &sel, from, to, &out, &config, &cache, &parsers),
        Commands::Cache { action } => match action {
            CacheAction::Status => run_cache_status(&cache),
            CacheAction::Clean {
                instrument,
                tag,
                confirm,
            } => run_cache_clean(&InstrumentId::new(&instrument, &tag), &cache, confirm),
        },
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

// ── Argument helpers ──

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}' (expected YYYY-MM-DD)"))
}

/// `[start, end]` from the arguments, the configured start date, or the last 30 days.
fn date_range(
    start: Option<&str>,
    end: Option<&str>,
    configured_start: Option<NaiveDate>,
) -> Result<TimeRange> {
    let end_date = end.map(parse_date).transpose()?.unwrap_or_else(|| Utc::now().date_naive());
    let start_date = match start {
        Some(s) => parse_date(s)?,
        None => {
            let recent = end_date - Duration::days(DEFAULT_DAYS);
            configured_start.map_or(recent, |d| d.max(recent))
        }
    };
    if start_date > end_date {
        bail!("--start {start_date} is after --end {end_date}");
    }
    Ok(TimeRange::from_dates(start_date, end_date))
}

fn selection(sel: &Selection, config: &Config) -> Result<(InstrumentId, TimeRange)> {
    let inst = registry::instrument(&sel.instrument)?;
    inst.tag(&sel.tag)?;
    let range = date_range(sel.start.as_deref(), sel.end.as_deref(), inst.start_date(&sel.tag, config))?;
    Ok((InstrumentId::new(&sel.instrument, &sel.tag), range))
}

fn write_series(series: &Series, out: &Output) -> Result<()> {
    if out.json {
        println!("{}", export::to_json(series)?);
        return Ok(());
    }
    match &out.csv {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
            export::write_csv(series, file)?;
            info!(path = %path.display(), records = series.len(), "wrote CSV");
        }
        None => {
            let stdout = std::io::stdout();
            export::write_csv(series, stdout.lock())?;
        }
    }
    Ok(())
}

// ── Commands ──

fn run_instruments(config: &Config) -> Result<()> {
    println!("{:<12} {:<12} {:<12} {}", "Instrument", "Tag", "Start", "Description");
    println!("{}", "-".repeat(72));
    for inst in registry::instruments() {
        for tag in inst.tags {
            let start = inst
                .start_date(tag.tag, config)
                .map_or_else(|| "-".to_string(), |d| d.to_string());
            println!("{:<12} {:<12} {:<12} {}: {}", inst.name, tag.tag, start, inst.description, tag.desc);
        }
    }
    Ok(())
}

fn run_download(sel: &Selection, mirror: Option<PathBuf>, config: &Config, cache: &PayloadCache) -> Result<()> {
    let (id, range) = selection(sel, config)?;

    let source: Box<dyn PayloadSource> = match mirror.or_else(|| config.mirror_dir.clone()) {
        Some(dir) => Box::new(MirrorSource::new(dir)?),
        None => Box::new(HttpSource::new(&config.http)?),
    };

    let summary = registry::download(&id, &range, source.as_ref(), cache, &StdoutProgress)?;

    if !summary.all_succeeded() {
        for (date, err) in &summary.errors {
            eprintln!("Error for {id} {date}: {err}");
        }
        std::process::exit(1);
    }
    Ok(())
}

fn run_list(id: &InstrumentId, cache: &PayloadCache) -> Result<()> {
    let files = registry::list_files(id, cache)?;
    if files.is_empty() {
        println!("No cached files for {id}");
        return Ok(());
    }
    for (date, path) in &files {
        println!("{date}  {}", path.display());
    }
    Ok(())
}

fn run_load(
    sel: &Selection,
    level: CleanLevel,
    out: &Output,
    config: &Config,
    cache: &PayloadCache,
    parsers: &ParserRegistry,
) -> Result<()> {
    let (id, range) = selection(sel, config)?;
    let series = registry::load(&id, &range, cache, parsers, config)?;
    let series = registry::clean(&id, series, level)?;
    write_series(&series, out)
}

#[allow(clippy::too_many_arguments)]
fn run_combine(
    instrument: &str,
    tags: &[String],
    start: Option<&str>,
    end: Option<&str>,
    fields: Vec<String>,
    out: &Output,
    config: &Config,
    cache: &PayloadCache,
    parsers: &ParserRegistry,
) -> Result<()> {
    let inst = registry::instrument(instrument)?;
    let configured = tags.iter().filter_map(|t| inst.start_date(t, config)).min();
    let range = date_range(start, end, configured)?;

    let mut loaded = Vec::with_capacity(tags.len());
    for tag in tags {
        let id = InstrumentId::new(instrument, tag);
        let series = registry::load(&id, &range, cache, parsers, config)?;
        loaded.push(registry::clean(&id, series, CleanLevel::Clean)?);
    }

    let priority = SourcePriority::new(tags.iter().map(|t| SourceId::new(instrument, t)));
    let inputs: Vec<&Series> = loaded.iter().collect();
    let options = CombineOptions {
        fields,
        fill: None,
    };
    let combined = combine(&inputs, &priority, range, &options)?;
    write_series(&combined, out)
}

#[allow(clippy::too_many_arguments)]
fn run_convert(
    conversion: Conversion,
    sel: &Selection,
    from: Option<String>,
    to: Option<String>,
    out: &Output,
    config: &Config,
    cache: &PayloadCache,
    parsers: &ParserRegistry,
) -> Result<()> {
    let (id, range) = selection(sel, config)?;
    let series = registry::clean(&id, registry::load(&id, &range, cache, parsers, config)?, CleanLevel::Clean)?;
    let table = ConversionTable::kp_ap();
    let converted = match conversion {
        Conversion::KpToAp => convert_kp_to_ap(
            &series,
            &table,
            from.as_deref().unwrap_or("Kp"),
            to.as_deref().unwrap_or("ap_from_kp"),
        )?,
        Conversion::ApToKp => convert_ap_to_kp(
            &series,
            &table,
            from.as_deref().unwrap_or("ap"),
            to.as_deref().unwrap_or("Kp_from_ap"),
        )?,
        Conversion::DailyAp => {
            let daily = to.as_deref().unwrap_or("Ap");
            calc_daily_ap(
                &series,
                from.as_deref().unwrap_or("ap"),
                daily,
                Some(format!("{daily}_running").as_str()),
                DAILY_AP_MIN_PERIODS,
            )?
        }
        Conversion::SwepamOmni => {
            ace_swepam_hourly_omni_norm(&series, "sw_bulk_speed", "sw_proton_dens", "sw_ion_temp")?
        }
    };
    write_series(&converted, out)
}

fn run_cache_status(cache: &PayloadCache) -> Result<()> {
    let dir = cache.cache_dir();
    if !dir.exists() {
        println!("Cache directory does not exist: {}", dir.display());
        return Ok(());
    }
    let rows = cache.status()?;
    if rows.is_empty() {
        println!("Cache is empty: {}", dir.display());
        return Ok(());
    }

    let total: u64 = rows.iter().map(|r| r.bytes).sum();
    println!("Cache: {}", dir.display());
    println!("Total size: {}", format_size(total));
    println!();
    println!("{:<22} {:>6} {:<25} {:>10}", "Product", "Files", "Date Range", "Size");
    println!("{}", "-".repeat(66));
    for row in &rows {
        let span = match (row.first, row.last) {
            (Some(a), Some(b)) => format!("{a} to {b}"),
            _ => "-".to_string(),
        };
        println!("{:<22} {:>6} {:<25} {:>10}", row.product, row.files, span, format_size(row.bytes));
    }
    Ok(())
}

fn run_cache_clean(id: &InstrumentId, cache: &PayloadCache, confirm: bool) -> Result<()> {
    let (_, tag) = registry::resolve(id)?;
    let files = registry::list_files(id, cache)?;
    if files.is_empty() {
        println!("No cached files for {id}.");
        return Ok(());
    }

    println!("Found {} file(s) for {id} ({}):", files.len(), tag.product);
    for (_, path) in &files {
        println!("  {} ({})", display_name(path), format_size(file_size(path)));
    }

    if !confirm {
        println!();
        println!("Dry run. Pass --confirm to actually delete.");
        return Ok(());
    }

    let mut removed = 0;
    for product in tag.products() {
        removed += cache.clean(&product)?;
    }
    println!("Done. Removed {removed} file(s).");
    std::io::stdout().flush()?;
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
