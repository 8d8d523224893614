// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! CLI tool for building collections and benchmarking gapped queries

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use gap_match::{parse_pattern_file, Collection, Config, GappedIndex, ParseMode, Pattern, Strategy};
use humansize::{SizeFormatter, BINARY};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    prelude::*,
    registry::Registry,
};

macro_rules! die {
    ($fmt:literal, $($arg:tt)*) => {{
        eprintln!($fmt, $($arg)*);
        std::process::exit(1);
    }};

    ($msg:literal) => {{
        eprintln!($msg);
        std::process::exit(1);
    }};
}

#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

fn init_tracing(quiet: bool, verbose: u8) {
    let level_filter = if quiet {
        LevelFilter::ERROR
    } else {
        match verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };

    // Bridge log crate macros to tracing (for library code that uses log::*)
    tracing_log::LogTracer::init().expect("Failed to set log tracer");

    let registry = Registry::default();

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("GM_LOG")
        .from_env_lossy()
        .add_directive(
            "rustyline=warn"
                .parse()
                .expect("Failed to parse rustyline directive"),
        );

    let subscriber = registry.with(env_filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .compact(),
    );

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        die!("INTERNAL ERROR: setting default tracing::subscriber failed");
    }

    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing_panic::panic_hook(info);
        prev_hook(info); // daisy-chain to old panic hook
    }));
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
enum StrategyArg {
    #[default]
    Auto,
    Sa,
    Wc,
    Qgram,
}

impl From<StrategyArg> for Strategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Auto => Self::Auto,
            StrategyArg::Sa => Self::SaSearch,
            StrategyArg::Wc => Self::WcSearch,
            StrategyArg::Qgram => Self::QGram,
        }
    }
}

#[derive(Parser)]
#[command(name = "gm", version, about = "Gapped pattern matching over self-indexed texts")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase logging verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Debug, clap::Args)]
struct IndexingArgs {
    /// Interpret pattern literals as whitespace-separated integers
    #[arg(long)]
    ints: bool,

    /// Build a q-gram filter of the given length alongside
    #[arg(long)]
    qgrams: Option<u8>,

    /// Treat this byte as a document delimiter
    #[arg(long)]
    delimiter: Option<u8>,

    /// Search strategy
    #[arg(long, value_enum, default_value = "auto")]
    strategy: StrategyArg,
}

#[derive(Subcommand)]
enum Command {
    /// Create a collection directory from an input file
    Create {
        /// The input file
        #[arg(short = 'i', long)]
        input: PathBuf,

        /// The collection directory
        #[arg(short = 'c', long)]
        collection: PathBuf,
    },

    /// Run a pattern file against a collection and report timings
    Bench {
        /// The collection directory
        #[arg(short = 'c', long)]
        collection: PathBuf,

        /// The pattern file, one pattern per line
        #[arg(short = 'p', long)]
        patterns: PathBuf,

        #[command(flatten)]
        indexing: IndexingArgs,
    },

    /// Interactive query prompt against a collection
    Shell {
        /// The collection directory
        #[arg(short = 'c', long)]
        collection: PathBuf,

        #[command(flatten)]
        indexing: IndexingArgs,
    },
}

fn cache_name(args: &IndexingArgs) -> String {
    let delim = args
        .delimiter
        .map_or_else(|| "x".into(), |d| d.to_string());
    let qgrams = args.qgrams.map_or_else(|| "x".into(), |q| q.to_string());

    format!("gm-d{delim}-q{qgrams}")
}

fn open_index(collection: &Collection, args: &IndexingArgs) -> gap_match::Result<GappedIndex> {
    let name = cache_name(args);

    if let Some(index) = collection.load_index(&name)? {
        info!("loaded cached index {name:?}");
        return Ok(index);
    }

    let text = collection.load_text()?;

    let mut config = Config::new();
    if let Some(delimiter) = args.delimiter {
        config = config.delimiter(u64::from(delimiter));
    }
    if let Some(q) = args.qgrams {
        config = config.qgram_filter(q);
    }

    let start = Instant::now();
    let index = config.build(text)?;
    info!("built index in {:?}", start.elapsed());

    let path = collection.store_index(&name, &index)?;
    let file_size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or_default();
    info!("index file size: {}", SizeFormatter::new(file_size, BINARY));

    Ok(index)
}

struct TimingSummary {
    total: f64,
    min: f64,
    qrt_1st: f64,
    median: f64,
    mean: f64,
    qrt_3rd: f64,
    max: f64,
}

fn summarize(timings: &[Duration]) -> TimingSummary {
    let mut millis = timings
        .iter()
        .map(|d| d.as_secs_f64() * 1_000.0)
        .collect::<Vec<_>>();
    millis.sort_by(|a, b| a.partial_cmp(b).expect("timings are finite"));

    let at = |q: f64| {
        if millis.is_empty() {
            0.0
        } else {
            let idx = ((millis.len() - 1) as f64 * q).round() as usize;
            millis.get(idx).copied().unwrap_or_default()
        }
    };

    let total: f64 = millis.iter().sum();

    TimingSummary {
        total,
        min: at(0.0),
        qrt_1st: at(0.25),
        median: at(0.5),
        mean: if millis.is_empty() {
            0.0
        } else {
            total / millis.len() as f64
        },
        qrt_3rd: at(0.75),
        max: at(1.0),
    }
}

fn run_bench(
    collection: &PathBuf,
    patterns: &PathBuf,
    args: &IndexingArgs,
) -> gap_match::Result<()> {
    let collection = Collection::open(collection)?;
    let index = open_index(&collection, args)?;

    let mode = if args.ints {
        ParseMode::Integers
    } else {
        ParseMode::Bytes
    };
    let patterns = parse_pattern_file(patterns, mode)?;

    let strategy = Strategy::from(args.strategy);

    let mut timings = vec![];
    let mut num_results = 0u64;
    let mut checksum = 0u64;

    for (npat, pattern) in patterns.iter().enumerate() {
        let start = Instant::now();
        let result = match index.search_with(pattern, strategy) {
            Ok(result) => result,
            Err(e) => {
                warn!("query {:?} failed: {e}", pattern.raw());
                continue;
            }
        };
        let elapsed = start.elapsed();
        timings.push(elapsed);

        for &pos in &result.positions {
            checksum = checksum.wrapping_add(pos);
        }
        num_results += result.positions.len() as u64;

        info!(
            " NPAT={} NPOS={} TIME_MS={} P={:?}",
            npat + 1,
            result.positions.len(),
            elapsed.as_millis(),
            pattern.raw(),
        );
    }

    let summary = summarize(&timings);

    println!("# num_patterns = {}", timings.len());
    println!("# num_results = {num_results}");
    println!("# checksum = {checksum}");
    println!("# total_time_ms = {:.3}", summary.total);
    println!("# min_time_ms = {:.3}", summary.min);
    println!("# qrt_1st_time_ms = {:.3}", summary.qrt_1st);
    println!("# mean_time_ms = {:.3}", summary.mean);
    println!("# median_time_ms = {:.3}", summary.median);
    println!("# qrt_3rd_time_ms = {:.3}", summary.qrt_3rd);
    println!("# max_time_ms = {:.3}", summary.max);

    Ok(())
}

fn shell_search(index: &GappedIndex, strategy: Strategy, mode: ParseMode, raw: &str) {
    let pattern = match Pattern::parse(raw, mode) {
        Ok(pattern) => pattern,
        Err(e) => {
            eprintln!("bad pattern: {e}");
            return;
        }
    };

    let start = Instant::now();
    match index.search_with(&pattern, strategy) {
        Ok(result) => {
            let elapsed = start.elapsed();

            let preview = result
                .positions
                .iter()
                .take(10)
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ");

            println!(
                "{} positions in {elapsed:?} via {:?}: {preview}{}",
                result.positions.len(),
                result.stats.strategy,
                if result.positions.len() > 10 { " ..." } else { "" },
            );
        }
        Err(e) => eprintln!("query failed: {e}"),
    }
}

fn run_shell(collection: &PathBuf, args: &IndexingArgs) -> gap_match::Result<()> {
    let collection = Collection::open(collection)?;
    let index = open_index(&collection, args)?;

    let mode = if args.ints {
        ParseMode::Integers
    } else {
        ParseMode::Bytes
    };
    let mut strategy = Strategy::from(args.strategy);

    let mut rl = rustyline::DefaultEditor::new().map_err(|e| {
        gap_match::Error::Io(std::io::Error::other(e.to_string()))
    })?;

    println!("commands: search <pattern> | strategy <auto|sa|wc|qgram> | quit");

    loop {
        let Ok(line) = rl.readline("gm> ") else {
            break;
        };

        let _ = rl.add_history_entry(&line);

        let Some(words) = shlex::split(&line) else {
            eprintln!("unbalanced quotes");
            continue;
        };

        match words.split_first().map(|(cmd, rest)| (cmd.as_str(), rest)) {
            None => {}
            Some(("quit" | "exit", _)) => break,
            Some(("strategy", [name])) => {
                strategy = match name.as_str() {
                    "auto" => Strategy::Auto,
                    "sa" => Strategy::SaSearch,
                    "wc" => Strategy::WcSearch,
                    "qgram" => Strategy::QGram,
                    other => {
                        eprintln!("unknown strategy {other:?}");
                        continue;
                    }
                };
                println!("strategy = {strategy:?}");
            }
            Some(("search", [pattern])) => shell_search(&index, strategy, mode, pattern),
            // Bare line = pattern
            Some((_, _)) => shell_search(&index, strategy, mode, line.trim()),
        }
    }

    Ok(())
}

fn run(cli: &Cli) -> gap_match::Result<()> {
    match &cli.command {
        Command::Create { input, collection } => {
            let data = std::fs::read(input)?;
            Collection::create(collection, &data)?;
            println!("created collection at {collection:?} ({} bytes)", data.len());
            Ok(())
        }
        Command::Bench {
            collection,
            patterns,
            indexing,
        } => run_bench(collection, patterns, indexing),
        Command::Shell {
            collection,
            indexing,
        } => run_shell(collection, indexing),
    }
}

fn main() {
    let cli = Cli::parse();

    init_tracing(cli.quiet, cli.verbose);

    if let Err(e) = run(&cli) {
        die!("error: {e}");
    }
}
