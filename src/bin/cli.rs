//! Command-line front end for heap and sorted record files.
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use pagestore::{FileOptions, HeapFile, IoStatsSnapshot, Record, RecordFile, SortedFile};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "pagestore",
    version,
    about = "Inspect and edit paged record files",
    disable_help_subcommand = true
)]
struct Cli {
    #[command(flatten)]
    open: OpenArgs,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct OpenArgs {
    #[arg(long, global = true, default_value = "records.dat", help = "Data file path")]
    data: PathBuf,

    #[arg(
        long,
        global = true,
        default_value = "records.pd",
        help = "Page directory file path"
    )]
    directory: PathBuf,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = Organization::Heap,
        help = "File organization the files were written with"
    )]
    org: Organization,

    #[arg(
        long,
        global = true,
        env = "PAGESTORE_SYNC",
        help = "Flush every page and directory write to disk"
    )]
    sync: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Insert a record")]
    Insert {
        #[arg(allow_negative_numbers = true)]
        key: i32,
        #[arg(id = "payload", value_name = "DATA")]
        data: String,
    },

    #[command(about = "Look up the first record with a key")]
    Search {
        #[arg(allow_negative_numbers = true)]
        key: i32,
    },

    #[command(about = "Delete one record with a key")]
    Delete {
        #[arg(allow_negative_numbers = true)]
        key: i32,
    },

    #[command(about = "List records with lo <= key <= hi")]
    Range {
        #[arg(allow_negative_numbers = true)]
        lo: i32,
        #[arg(allow_negative_numbers = true)]
        hi: i32,
    },

    #[command(about = "Print every page's slot layout")]
    Dump,

    #[command(about = "Show page count and I/O counters for opening the files")]
    Stats,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
enum Organization {
    Heap,
    Sorted,
}

#[derive(Serialize)]
struct RecordView {
    key: i32,
    data: String,
}

impl From<&Record> for RecordView {
    fn from(record: &Record) -> Self {
        Self {
            key: record.key(),
            data: record.data().into_owned(),
        }
    }
}

#[derive(Serialize)]
struct InsertReport {
    key: i32,
    pages: usize,
}

#[derive(Serialize)]
struct SearchReport {
    key: i32,
    record: Option<RecordView>,
}

#[derive(Serialize)]
struct DeleteReport {
    key: i32,
    deleted: bool,
}

#[derive(Serialize)]
struct RangeReport {
    lo: i32,
    hi: i32,
    records: Vec<RecordView>,
}

#[derive(Serialize)]
struct DumpReport {
    pages: Vec<String>,
}

#[derive(Serialize)]
struct StatsReport {
    organization: Organization,
    pages: usize,
    page_reads: u64,
    page_writes: u64,
    directory_reads: u64,
    directory_writes: u64,
}

impl StatsReport {
    fn new(organization: Organization, pages: usize, io: IoStatsSnapshot) -> Self {
        Self {
            organization,
            pages,
            page_reads: io.page_reads,
            page_writes: io.page_writes,
            directory_reads: io.directory_reads,
            directory_writes: io.directory_writes,
        }
    }
}

fn main() {
    install_tracing_subscriber();
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn install_tracing_subscriber() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let options = FileOptions::new().sync_writes(cli.open.sync);
    match cli.open.org {
        Organization::Heap => {
            let file = HeapFile::open_with_options(&cli.open.data, &cli.open.directory, options)?;
            execute(file, &cli)
        }
        Organization::Sorted => {
            let file =
                SortedFile::open_with_options(&cli.open.data, &cli.open.directory, options)?;
            execute(file, &cli)
        }
    }
}

fn execute<F: RecordFile>(mut file: F, cli: &Cli) -> Result<(), Box<dyn Error>> {
    match &cli.command {
        Command::Insert { key, data } => {
            file.insert(Record::new(*key, data))?;
            let report = InsertReport {
                key: *key,
                pages: file.page_count(),
            };
            emit(cli.format, &report, || {
                println!("inserted key {} ({} pages)", report.key, report.pages)
            })?;
        }
        Command::Search { key } => {
            let report = SearchReport {
                key: *key,
                record: file.search(*key)?.as_ref().map(RecordView::from),
            };
            emit(cli.format, &report, || match &report.record {
                Some(record) => println!("{}: {}", record.key, record.data),
                None => println!("key {} not found", report.key),
            })?;
        }
        Command::Delete { key } => {
            let report = DeleteReport {
                key: *key,
                deleted: file.delete(*key)?,
            };
            emit(cli.format, &report, || {
                if report.deleted {
                    println!("deleted key {}", report.key);
                } else {
                    println!("key {} not found", report.key);
                }
            })?;
        }
        Command::Range { lo, hi } => {
            let records = file.range_search(*lo, *hi)?;
            let report = RangeReport {
                lo: *lo,
                hi: *hi,
                records: records.iter().map(RecordView::from).collect(),
            };
            emit(cli.format, &report, || {
                for record in &report.records {
                    println!("{}: {}", record.key, record.data);
                }
                println!("{} records", report.records.len());
            })?;
        }
        Command::Dump => {
            let dump = file.dump()?;
            let report = DumpReport {
                pages: dump.lines().map(str::to_owned).collect(),
            };
            emit(cli.format, &report, || {
                for line in &report.pages {
                    println!("{line}");
                }
            })?;
        }
        Command::Stats => {
            let report =
                StatsReport::new(cli.open.org, file.page_count(), file.stats().snapshot());
            emit(cli.format, &report, || print_stats_text(&report))?;
        }
    }
    Ok(())
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: Serialize,
    F: Fn(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}

fn print_stats_text(report: &StatsReport) {
    println!(
        "Organization: {}",
        match report.organization {
            Organization::Heap => "heap",
            Organization::Sorted => "sorted",
        }
    );
    println!("Pages: {}", report.pages);
    println!(
        "I/O: page_reads={} page_writes={} directory_reads={} directory_writes={}",
        report.page_reads, report.page_writes, report.directory_reads, report.directory_writes
    );
}
