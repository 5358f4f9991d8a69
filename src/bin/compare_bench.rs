//! Side-by-side workload for the heap and sorted organizations.
//!
//! Inserts random keys, then runs point searches and range searches against
//! each organization in a scratch directory, reporting wall time and the
//! page/directory I/O each phase cost.

use std::error::Error;
use std::path::Path;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use pagestore::{FileOptions, HeapFile, IoStatsSnapshot, Record, RecordFile, SortedFile};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tempfile::tempdir;

fn main() {
    if let Err(err) = try_main() {
        eprintln!("compare-bench failed: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let workload = Workload::generate(&args);

    BenchResult::print_header();
    for org in args.orgs() {
        let tmpdir = tempdir()?;
        let results = match org {
            Organization::Heap => run::<HeapFile>(tmpdir.path(), org, &workload, args.sync)?,
            Organization::Sorted => run::<SortedFile>(tmpdir.path(), org, &workload, args.sync)?,
        };
        for result in &results {
            result.print();
        }
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(name = "compare-bench", about = "Compare heap and sorted file organizations")]
struct Args {
    /// Records to insert; searches and range searches run this many times too.
    #[arg(long, default_value_t = 1_000)]
    records: usize,

    /// Largest width of a range search.
    #[arg(long, default_value_t = 1_000)]
    max_range: i32,

    /// RNG seed for repeatable workloads.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Restrict the run to one organization.
    #[arg(long, value_enum)]
    org: Option<Organization>,

    /// Flush every page and directory write.
    #[arg(long, env = "PAGESTORE_SYNC")]
    sync: bool,
}

impl Args {
    fn orgs(&self) -> Vec<Organization> {
        match self.org {
            Some(org) => vec![org],
            None => vec![Organization::Heap, Organization::Sorted],
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum, Eq, PartialEq)]
enum Organization {
    Heap,
    Sorted,
}

impl Organization {
    fn label(self) -> &'static str {
        match self {
            Organization::Heap => "heap",
            Organization::Sorted => "sorted",
        }
    }

    fn payload(self, key: i32) -> String {
        match self {
            Organization::Heap => format!("HeapData{key}"),
            Organization::Sorted => format!("SortedData{key}"),
        }
    }
}

/// Keys drawn once and replayed against every organization.
struct Workload {
    inserts: Vec<i32>,
    searches: Vec<i32>,
    ranges: Vec<(i32, i32)>,
}

impl Workload {
    fn generate(args: &Args) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
        let key_space = i32::try_from(args.records.saturating_mul(10))
            .unwrap_or(i32::MAX)
            .max(1);
        let width = args.max_range.max(1);
        let inserts = (0..args.records)
            .map(|_| rng.gen_range(0..key_space))
            .collect();
        let searches = (0..args.records)
            .map(|_| rng.gen_range(0..key_space))
            .collect();
        let ranges = (0..args.records)
            .map(|_| {
                let lo = rng.gen_range(0..key_space);
                (lo, lo.saturating_add(rng.gen_range(0..width)))
            })
            .collect();
        Self {
            inserts,
            searches,
            ranges,
        }
    }
}

#[derive(Debug)]
struct BenchResult {
    org: &'static str,
    phase: &'static str,
    ops: usize,
    time: Duration,
    io: IoStatsSnapshot,
}

impl BenchResult {
    fn print_header() {
        println!(
            "{:<8} {:<8} {:>8} {:>12} {:>10} {:>12} {:>10} {:>12}",
            "ORG", "PHASE", "OPS", "TIME", "PG READS", "PG WRITES", "DIR READS", "DIR WRITES"
        );
        println!("{}", "-".repeat(88));
    }

    fn print(&self) {
        println!(
            "{:<8} {:<8} {:>8} {:>12} {:>10} {:>12} {:>10} {:>12}",
            self.org,
            self.phase,
            self.ops,
            format_duration(self.time),
            self.io.page_reads,
            self.io.page_writes,
            self.io.directory_reads,
            self.io.directory_writes,
        );
    }
}

fn format_duration(d: Duration) -> String {
    let micros = d.as_micros();
    if micros < 1_000 {
        format!("{} µs", micros)
    } else if micros < 1_000_000 {
        format!("{:.2} ms", micros as f64 / 1_000.0)
    } else {
        format!("{:.2} s", micros as f64 / 1_000_000.0)
    }
}

fn run<F: RecordFile>(
    dir: &Path,
    org: Organization,
    workload: &Workload,
    sync: bool,
) -> Result<Vec<BenchResult>, Box<dyn Error>> {
    let options = FileOptions::new().sync_writes(sync);
    let stats = options.stats.clone();
    let mut file = F::open_with_options(
        dir.join(format!("{}.dat", org.label())),
        dir.join(format!("{}.pd", org.label())),
        options,
    )?;

    let mut results = Vec::with_capacity(3);
    let mut phase = |name: &'static str, ops: usize, start: Instant| {
        let result = BenchResult {
            org: org.label(),
            phase: name,
            ops,
            time: start.elapsed(),
            io: stats.snapshot(),
        };
        stats.reset();
        results.push(result);
    };

    stats.reset();
    let start = Instant::now();
    for &key in &workload.inserts {
        file.insert(Record::new(key, org.payload(key)))?;
    }
    phase("insert", workload.inserts.len(), start);

    let start = Instant::now();
    for &key in &workload.searches {
        file.search(key)?;
    }
    phase("search", workload.searches.len(), start);

    let start = Instant::now();
    for &(lo, hi) in &workload.ranges {
        file.range_search(lo, hi)?;
    }
    phase("range", workload.ranges.len(), start);

    Ok(results)
}
