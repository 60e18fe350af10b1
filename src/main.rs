//! Vortex CLI - query mini-notation patterns from the command line

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, warn, Level};
use vortex::config::{Config, OutputFormat};
use vortex::control::{self, CONTROLS};
use vortex::mini_notation;
use vortex::pattern_structure::sorted;
use vortex::{compile, Event, Fraction, Pattern, TimeSpan, Value};

#[derive(Parser)]
#[command(name = "vortex")]
#[command(about = "Cyclic pattern engine with TidalCycles mini-notation", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/vortex/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging; repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the events of a pattern
    Query {
        /// Mini-notation source, e.g. "bd*2 [~ sd]"
        source: String,

        /// Compile as this control, e.g. `s` or `gain`
        #[arg(long)]
        control: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print the parse tree of mini-notation source as JSON
    Parse {
        source: String,
    },
    /// List the known controls
    Control,
}

#[derive(Args)]
struct OutputArgs {
    /// First cycle, e.g. 0, 1/2 or 2.5
    #[arg(short, long)]
    begin: Option<String>,

    /// Number of cycles to query
    #[arg(short, long)]
    cycles: Option<u32>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    /// Only print event fragments that start with their onset
    #[arg(long)]
    onsets: bool,
}

#[derive(Serialize)]
struct SpanRecord {
    begin: Fraction,
    end: Fraction,
    begin_float: f64,
    end_float: f64,
}

#[derive(Serialize)]
struct EventRecord<'a> {
    whole: Option<SpanRecord>,
    part: SpanRecord,
    onset: bool,
    value: &'a Value,
}

impl From<&TimeSpan> for SpanRecord {
    fn from(span: &TimeSpan) -> Self {
        SpanRecord {
            begin: span.begin.clone(),
            end: span.end.clone(),
            begin_float: span.begin.to_float(),
            end_float: span.end.to_float(),
        }
    }
}

impl<'a> From<&'a Event<Value>> for EventRecord<'a> {
    fn from(event: &'a Event<Value>) -> Self {
        EventRecord {
            whole: event.whole.as_ref().map(SpanRecord::from),
            part: SpanRecord::from(&event.part),
            onset: event.has_onset(),
            value: &event.value,
        }
    }
}

fn init_logging(config: &Config, verbose: u8) {
    let configured = config.logging.level.parse::<Level>().ok();
    let level = match verbose {
        0 => configured.unwrap_or(Level::WARN),
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
    if configured.is_none() {
        warn!(level = %config.logging.level, "unknown log level in config, using warn");
    }
}

fn print_events(
    pattern: Pattern<Value>,
    config: &Config,
    args: &OutputArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let begin = match &args.begin {
        Some(text) => text.parse::<Fraction>()?,
        None => config.query.begin.clone(),
    };
    let cycles = args.cycles.unwrap_or(config.query.cycles);
    let span = TimeSpan::new(begin.clone(), begin + Fraction::from(cycles as i64));
    debug!(%span, "querying");

    let pattern = if args.onsets || config.output.onsets_only {
        pattern.onsets_only()
    } else {
        pattern
    };
    let events = sorted(pattern.query(&span));

    let json = args.json || config.output.format == OutputFormat::Json;
    if json {
        let records: Vec<EventRecord> = events.iter().map(EventRecord::from).collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        for event in &events {
            println!("{}", event);
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::discover(cli.config.as_deref())?;
    init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Query {
            source,
            control: None,
            output,
        } => {
            let pattern = compile(&source)?;
            print_events(pattern, &config, &output)?;
        }
        Commands::Query {
            source,
            control: Some(name),
            output,
        } => {
            let pattern = control::control(&name, &source)?.fmap(Value::Map);
            print_events(pattern, &config, &output)?;
        }
        Commands::Parse { source } => {
            let tree = mini_notation::parse(&source)?;
            println!("{}", serde_json::to_string_pretty(&tree)?);
        }
        Commands::Control => {
            for (name, kind) in CONTROLS {
                println!("{:<8} {}", name, kind);
            }
        }
    }
    Ok(())
}
