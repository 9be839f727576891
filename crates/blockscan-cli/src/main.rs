//! blockscan CLI: stream the records of one block of a delimited file.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use blockscan_core::config::parse_delimiter;
use blockscan_core::{BlockRange, QueryParams, ReaderConfig};
use blockscan_io::FileBlockSource;
use blockscan_reader::{AsyncReader, RecordView};
use clap::{Parser, Subcommand, ValueEnum};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "blockscan")]
#[command(about = "Block-bounded reader for delimited text files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read the records of one block and write them to stdout
    Scan {
        #[command(flatten)]
        scan: ScanArgs,
    },

    /// Print the column count detected from the first record
    Columns {
        /// Input file
        #[arg(short, long)]
        file: PathBuf,

        /// Reader config YAML (overrides env)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum Format {
    #[default]
    Jsonl,
    Csv,
}

#[derive(clap::Args, Debug, Default)]
struct ScanArgs {
    /// Input file
    #[arg(short, long)]
    file: PathBuf,

    /// Block start offset in bytes
    #[arg(long)]
    offset: Option<u64>,

    /// Block length in bytes (0 = to end of file)
    #[arg(long)]
    length: Option<u64>,

    /// Query parameter bundle (JSON)
    #[arg(long)]
    params: Option<PathBuf>,

    /// Reader config YAML (overrides env)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Column count (skips detection)
    #[arg(long)]
    columns: Option<usize>,

    /// Skip the header record of a block at offset 0
    #[arg(long)]
    header: bool,

    /// Output only these column indices
    #[arg(long, value_delimiter = ',')]
    select: Vec<usize>,

    #[arg(long, value_enum, default_value_t = Format::Jsonl)]
    format: Format,

    /// Stop after this many records
    #[arg(long)]
    limit: Option<u64>,

    /// Field delimiter, e.g. "," or "\t"
    #[arg(long)]
    field_delimiter: Option<String>,

    /// Record delimiter, e.g. "\n"
    #[arg(long)]
    record_delimiter: Option<String>,

    /// Quote byte
    #[arg(long)]
    quote: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("blockscan=info")),
        )
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Scan { scan } => run_scan(&scan),
        Commands::Columns { file, config } => run_columns(&file, config.as_deref()),
    };
    if let Err(e) = outcome {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Layer the reader config: defaults < env < YAML < query params < flags.
fn resolve(
    base: ReaderConfig,
    yaml: Option<&str>,
    params: Option<&QueryParams>,
    args: &ScanArgs,
) -> CliResult<(ReaderConfig, BlockRange)> {
    let mut config = match yaml {
        Some(doc) => base.merge_yaml_str(doc)?,
        None => base,
    };
    let mut range = BlockRange::unbounded();

    if let Some(params) = params {
        range = params.block_range();
        if let Some(schema) = params.parse_schema()? {
            config.columns = Some(schema.len());
        }
    }

    if let Some(offset) = args.offset {
        range.offset = offset;
    }
    if let Some(length) = args.length {
        range.length = length;
    }
    if args.columns.is_some() {
        config.columns = args.columns;
    }
    if args.header {
        config.skip_header = true;
    }
    if let Some(d) = &args.field_delimiter {
        config.delimiters.field = parse_delimiter(d)?;
    }
    if let Some(d) = &args.record_delimiter {
        config.delimiters.record = parse_delimiter(d)?;
    }
    if let Some(d) = &args.quote {
        config.delimiters.quote = parse_delimiter(d)?;
    }

    config.validate()?;
    Ok((config, range))
}

fn read_optional(path: Option<&Path>) -> CliResult<Option<String>> {
    match path {
        Some(p) => Ok(Some(fs::read_to_string(p)?)),
        None => Ok(None),
    }
}

fn run_scan(args: &ScanArgs) -> CliResult<()> {
    let yaml = read_optional(args.config.as_deref())?;
    let params = read_optional(args.params.as_deref())?
        .map(|s| QueryParams::from_json(&s))
        .transpose()?;
    let (config, range) = resolve(ReaderConfig::from_env(), yaml.as_deref(), params.as_ref(), args)?;

    let source = FileBlockSource::open_block(&args.file, &range)?;
    let mut reader = AsyncReader::open_block(source, &config, &range)?;
    if let Some(p) = &params {
        tracing::info!(query = %p.query, offset = range.offset, length = range.length, "scanning block");
    }

    let stdout = io::stdout();
    let out = BufWriter::new(stdout.lock());
    let mut sink = match args.format {
        Format::Jsonl => Sink::Jsonl(out),
        Format::Csv => Sink::Csv(csv::Writer::from_writer(out)),
    };

    let mut written = 0u64;
    while args.limit.map_or(true, |n| written < n) {
        let Some(record) = reader.read_record()? else {
            break;
        };
        sink.write(&selected(&record, &args.select)?)?;
        written += 1;
    }
    sink.finish()?;

    reader.shutdown();
    tracing::info!(written, stats = %reader.stats(), "scan finished");
    Ok(())
}

enum Sink<W: Write> {
    Jsonl(W),
    Csv(csv::Writer<W>),
}

impl<W: Write> Sink<W> {
    fn write(&mut self, fields: &[String]) -> CliResult<()> {
        match self {
            Sink::Jsonl(w) => {
                serde_json::to_writer(&mut *w, fields)?;
                w.write_all(b"\n")?;
            }
            Sink::Csv(w) => w.write_record(fields)?,
        }
        Ok(())
    }

    fn finish(self) -> CliResult<()> {
        match self {
            Sink::Jsonl(mut w) => w.flush()?,
            Sink::Csv(mut w) => w.flush()?,
        }
        Ok(())
    }
}

fn selected(record: &RecordView<'_>, select: &[usize]) -> CliResult<Vec<String>> {
    if select.is_empty() {
        return Ok(record.to_strings());
    }
    select
        .iter()
        .map(|&i| {
            record
                .get(i)
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .ok_or_else(|| format!("column {i} out of range for {} columns", record.len()).into())
        })
        .collect()
}

fn run_columns(file: &Path, config: Option<&Path>) -> CliResult<()> {
    let base = ReaderConfig::from_env();
    let config = match read_optional(config)? {
        Some(doc) => base.merge_yaml_str(&doc)?,
        None => base,
    };
    let source = FileBlockSource::open(file, 0)?;
    let reader = AsyncReader::new(source, &config)?;
    println!("{}", reader.column_count()?);
    Ok(())
}
