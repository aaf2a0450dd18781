use std::fs;
use std::io::BufRead;
use std::panic;
use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::{Receiver, Sender, bounded};
use tracing::{debug, error, info, warn};

use crate::config::{AnalysisConfig, RESULTS_QUEUE_CAPACITY, WORK_QUEUE_CAPACITY};
use crate::engine::{RulesEngine, ShakmatyEngine};
use crate::error::{AnalysisError, FormatError, StatsError};
use crate::filter::{FilterDecision, GameFilter};
use crate::reader::{GameTokenizer, open_input_stream};
use crate::replay::{Outcome, Replayer, UnsuitableReason};
use crate::stats::{RunStats, collect_cumulative_results, stats_path_for};
use crate::types::{GameRecord, TimeControlClass};

/// Archive name patterns picked up from a directory.
pub const ARCHIVE_PATTERNS: [&str; 3] = ["*.pgn.bz2", "*.pgn.zst", "*.pgn"];

#[derive(Debug)]
pub enum WorkItem {
    Game(GameRecord, TimeControlClass),
    Sentinel,
}

#[derive(Debug)]
pub enum ResultItem {
    Classified(TimeControlClass, String),
    Sentinel,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub path: PathBuf,
    pub artifact: PathBuf,
    pub games_read: u64,
    pub games_queued: u64,
    pub unsuitable: [u64; 6],
    pub stats: RunStats,
}

impl RunReport {
    pub fn unsuitable_count(&self, reason: UnsuitableReason) -> u64 {
        self.unsuitable[reason.index()]
    }

    pub fn games_classified(&self) -> u64 {
        self.stats.total_games()
    }

    /// Non-zero unsuitable counts as `reason=count`, e.g. `too_short=3 terminal=1`.
    pub fn unsuitable_summary(&self) -> String {
        UnsuitableReason::ALL
            .into_iter()
            .filter(|reason| self.unsuitable_count(*reason) > 0)
            .map(|reason| format!("{reason}={}", self.unsuitable_count(reason)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Default)]
struct ProducerCounts {
    read: u64,
    queued: u64,
}

/// Sends the worker's closing sentinel however the worker exits.
struct SentinelGuard<'a> {
    results: &'a Sender<ResultItem>,
}

impl Drop for SentinelGuard<'_> {
    fn drop(&mut self) {
        let _ = self.results.send(ResultItem::Sentinel);
    }
}

fn produce<R: BufRead>(
    input: R,
    path: &Path,
    filter: &GameFilter,
    work: &Sender<WorkItem>,
    workers: usize,
) -> Result<ProducerCounts, FormatError> {
    let mut tokenizer = GameTokenizer::new(input);
    let mut queued = 0;
    let mut failure = None;

    for next in tokenizer.by_ref() {
        let record = match next {
            Ok(record) => record,
            Err(source) => {
                failure = Some(source);
                break;
            }
        };

        match filter.evaluate(&record) {
            FilterDecision::Include(class) => {
                if work.send(WorkItem::Game(record, class)).is_err() {
                    warn!(file = %path.display(), "All workers are gone, stopping early");
                    break;
                }
                queued += 1;
            }
            FilterDecision::Skip(reason) => debug!(?reason, "Skipping game"),
        }
    }

    for _ in 0..workers {
        let _ = work.send(WorkItem::Sentinel);
    }

    let read = tokenizer.games();
    match failure {
        Some(source) => Err(FormatError::Read {
            path: path.to_path_buf(),
            games: read,
            source,
        }),
        None => Ok(ProducerCounts { read, queued }),
    }
}

fn run_worker<E, F>(
    engine_factory: &F,
    captures: u32,
    work: Receiver<WorkItem>,
    results: Sender<ResultItem>,
) -> [u64; 6]
where
    E: RulesEngine,
    F: Fn() -> E,
{
    let _guard = SentinelGuard { results: &results };
    let mut replayer = Replayer::new(engine_factory(), captures);
    let mut unsuitable = [0; 6];

    for item in work.iter() {
        let WorkItem::Game(record, class) = item else {
            break;
        };

        match replayer.replay(&record) {
            Outcome::Suitable(name) => {
                if results.send(ResultItem::Classified(class, name)).is_err() {
                    break;
                }
            }
            Outcome::Unsuitable(reason) => {
                unsuitable[reason.index()] += 1;
                debug!(%reason, "Game unsuitable");
            }
        }
    }

    unsuitable
}

fn collect(results: &Receiver<ResultItem>, workers: usize) -> RunStats {
    let mut stats = RunStats::default();
    let mut remaining = workers;

    while remaining > 0 {
        match results.recv() {
            Ok(ResultItem::Classified(class, name)) => stats.record(class, name),
            Ok(ResultItem::Sentinel) => remaining -= 1,
            Err(_) => break,
        }
    }

    stats
}

/// Runs producer, workers and collector over one archive stream. Nothing is
/// written to disk; the report's `artifact` is where the stats belong.
pub fn analyse_reader<R, E, F>(
    input: R,
    path: &Path,
    config: &AnalysisConfig,
    engine_factory: F,
) -> Result<RunReport, FormatError>
where
    R: BufRead + Send,
    E: RulesEngine,
    F: Fn() -> E + Sync,
{
    let workers = config.workers.max(1);
    let filter = config.filter();
    let (work_tx, work_rx) = bounded::<WorkItem>(WORK_QUEUE_CAPACITY);
    let (results_tx, results_rx) = bounded::<ResultItem>(RESULTS_QUEUE_CAPACITY);

    let (produced, unsuitable, stats) = thread::scope(|scope| {
        let filter = &filter;
        let producer = scope.spawn(move || produce(input, path, filter, &work_tx, workers));

        let engine_factory = &engine_factory;
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let work = work_rx.clone();
                let results = results_tx.clone();
                scope.spawn(move || run_worker(engine_factory, config.captures, work, results))
            })
            .collect();
        drop(work_rx);
        drop(results_tx);

        let stats = collect(&results_rx, workers);

        let mut unsuitable = [0u64; 6];
        for handle in handles {
            match handle.join() {
                Ok(counts) => {
                    for (total, count) in unsuitable.iter_mut().zip(counts) {
                        *total += count;
                    }
                }
                Err(_) => error!(file = %path.display(), "Worker terminated abnormally"),
            }
        }

        let produced = producer
            .join()
            .unwrap_or_else(|payload| panic::resume_unwind(payload));

        (produced, unsuitable, stats)
    });

    let produced = produced?;
    debug!(
        file = %path.display(),
        read = produced.read,
        queued = produced.queued,
        classified = stats.total_games(),
        "Run finished"
    );

    Ok(RunReport {
        path: path.to_path_buf(),
        artifact: stats_path_for(path),
        games_read: produced.read,
        games_queued: produced.queued,
        unsuitable,
        stats,
    })
}

/// Analyses one archive with the given engine and writes its stats artifact.
pub fn analyse_file_with<E, F>(
    path: &Path,
    config: &AnalysisConfig,
    engine_factory: F,
) -> Result<RunReport, AnalysisError>
where
    E: RulesEngine,
    F: Fn() -> E + Sync,
{
    let input = open_input_stream(path)?;
    let report = analyse_reader(input, path, config, engine_factory)?;
    report.stats.write(&report.artifact)?;
    info!(
        file = %path.display(),
        read = report.games_read,
        queued = report.games_queued,
        classified = report.games_classified(),
        unsuitable = %report.unsuitable_summary(),
        "Wrote {}",
        report.artifact.display()
    );
    Ok(report)
}

pub fn analyse_file(path: &Path, config: &AnalysisConfig) -> Result<RunReport, AnalysisError> {
    analyse_file_with(path, config, ShakmatyEngine::new)
}

/// Archives directly inside `dir`, sorted by path.
pub fn find_archives(dir: &Path) -> Result<Vec<PathBuf>, StatsError> {
    let mut archives = Vec::new();
    for pattern in ARCHIVE_PATTERNS {
        let pattern = dir.join(pattern).to_string_lossy().into_owned();
        archives.extend(glob::glob(&pattern)?.filter_map(Result::ok));
    }
    archives.sort();
    archives.dedup();
    Ok(archives)
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub runs: Vec<RunReport>,
    pub failed: Vec<PathBuf>,
    pub cumulative: PathBuf,
}

/// File size in decimal megabytes.
fn size_mb(path: &Path) -> f64 {
    fs::metadata(path)
        .map(|meta| meta.len() as f64 / 1_000_000.0)
        .unwrap_or(0.0)
}

/// Analyses a single archive or every archive in a directory, one after the
/// other, then writes the cumulative stats next to the input. A failing file
/// is logged and skipped.
pub fn analyse_path(
    path: &Path,
    config: &AnalysisConfig,
    sort_by_material_diff: bool,
) -> Result<BatchReport, StatsError> {
    let files = if path.is_dir() {
        find_archives(path)?
    } else {
        vec![path.to_path_buf()]
    };

    let mut batch = BatchReport::default();
    let total = files.len();
    for (i, file) in files.into_iter().enumerate() {
        info!(
            "Analysing {} ({}/{}) [size: {:.1} MB]",
            file.display(),
            i + 1,
            total,
            size_mb(&file)
        );
        match analyse_file(&file, config) {
            Ok(report) => batch.runs.push(report),
            Err(e) => {
                error!("Error analysing {}: {e}", file.display());
                batch.failed.push(file);
            }
        }
    }

    batch.cumulative = collect_cumulative_results(path, sort_by_material_diff)?;
    info!("Cumulative results written to {}", batch.cumulative.display());
    Ok(batch)
}
