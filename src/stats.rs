use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::egtb::material_diff;
use crate::error::StatsError;
use crate::types::TimeControlClass;

pub const STATS_SUFFIX: &str = "stats.json";
pub const CUMULATIVE_FILE_NAME: &str = "cumulative-stats.json";

pub type EgtbCounts = HashMap<String, u64>;

/// EGTB names with their counts in a fixed order.
pub type RankedCounts = Vec<(String, u64)>;

/// Per-file statistics, owned by the collector while a run is in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub timecontrol: [u64; 4],
    pub egtb: EgtbCounts,
}

impl RunStats {
    pub fn record(&mut self, class: TimeControlClass, egtb: String) {
        self.timecontrol[class.index()] += 1;
        *self.egtb.entry(egtb).or_default() += 1;
    }

    pub fn timecontrol_count(&self, class: TimeControlClass) -> u64 {
        self.timecontrol[class.index()]
    }

    pub fn total_games(&self) -> u64 {
        self.timecontrol.iter().sum()
    }

    pub fn write(&self, path: &Path) -> Result<(), StatsError> {
        write_json(path, self)
    }
}

/// Artifact written next to an archive: `games.pgn.bz2` -> `games.pgn.stats.json`.
pub fn stats_path_for(archive: &Path) -> PathBuf {
    archive.with_extension(STATS_SUFFIX)
}

/// Descending count, then name.
pub fn most_games_sort(counts: &EgtbCounts) -> RankedCounts {
    let mut ranked: RankedCounts = counts.iter().map(|(k, &v)| (k.clone(), v)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

/// Ascending material difference, then descending count, then name. Names
/// that do not parse sort last.
pub fn material_diff_sort(counts: &EgtbCounts) -> RankedCounts {
    let mut ranked: Vec<(u32, String, u64)> = counts
        .iter()
        .map(|(k, &v)| (material_diff(k).unwrap_or(u32::MAX), k.clone(), v))
        .collect();
    ranked.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| b.2.cmp(&a.2))
            .then_with(|| a.1.cmp(&b.1))
    });
    ranked.into_iter().map(|(_, k, v)| (k, v)).collect()
}

/// Merged view over any number of run or cumulative artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CumulativeStats {
    pub created: String,
    pub total_games: u64,
    pub timecontrol: [u64; 4],
    pub egtb_material_diff: Option<RankedCounts>,
    pub egtb_most_games: RankedCounts,
}

impl CumulativeStats {
    pub fn write(&self, path: &Path) -> Result<(), StatsError> {
        write_json(path, self)
    }
}

/// Element-wise sum of time control and EGTB counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsMerger {
    timecontrol: [u64; 4],
    egtb: EgtbCounts,
}

impl StatsMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_run(&mut self, run: &RunStats) {
        for (total, count) in self.timecontrol.iter_mut().zip(run.timecontrol) {
            *total += count;
        }
        for (name, count) in &run.egtb {
            *self.egtb.entry(name.clone()).or_default() += count;
        }
    }

    pub fn add_file(&mut self, path: &Path) -> Result<(), StatsError> {
        let run = read_artifact(path)?;
        self.add_run(&run);
        Ok(())
    }

    pub fn finish(self, sort_by_material_diff: bool) -> CumulativeStats {
        let created = chrono::Local::now()
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string();

        CumulativeStats {
            created,
            total_games: self.timecontrol.iter().sum(),
            timecontrol: self.timecontrol,
            egtb_material_diff: sort_by_material_diff.then(|| material_diff_sort(&self.egtb)),
            egtb_most_games: most_games_sort(&self.egtb),
        }
    }
}

/// Accepts both artifact shapes: per-run (`EGTB`) and cumulative
/// (`EGTB_most_games`).
#[derive(Deserialize)]
struct StatsArtifact {
    #[serde(default)]
    timecontrol: HashMap<String, u64>,
    #[serde(rename = "EGTB")]
    egtb: Option<EgtbCounts>,
    #[serde(rename = "EGTB_most_games")]
    egtb_most_games: Option<EgtbCounts>,
}

pub fn read_artifact(path: &Path) -> Result<RunStats, StatsError> {
    let file = File::open(path).map_err(|source| StatsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let artifact: StatsArtifact =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| StatsError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    let mut run = RunStats::default();
    for (key, count) in artifact.timecontrol {
        match key.parse::<TimeControlClass>() {
            Ok(class) => run.timecontrol[class.index()] += count,
            Err(_) => warn!(file = %path.display(), key = %key, "Ignoring unknown time control"),
        }
    }
    run.egtb = artifact
        .egtb
        .or(artifact.egtb_most_games)
        .ok_or_else(|| StatsError::MissingEgtb(path.to_path_buf()))?;

    Ok(run)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StatsError> {
    let io_error = |source| StatsError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
    serde_json::to_writer(&mut writer, value).map_err(|source| StatsError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    writer.flush().map_err(io_error)
}

/// Merges every artifact in `files` into one cumulative view.
pub fn merge_files(
    files: &[PathBuf],
    sort_by_material_diff: bool,
) -> Result<CumulativeStats, StatsError> {
    let mut merger = StatsMerger::new();
    for file in files {
        debug!(file = %file.display(), "Merging stats");
        merger.add_file(file)?;
    }
    Ok(merger.finish(sort_by_material_diff))
}

/// `*.stats.json` files directly inside `dir`, sorted by path.
pub fn find_stats_files(dir: &Path) -> Result<Vec<PathBuf>, StatsError> {
    let pattern = dir
        .join(format!("*.{STATS_SUFFIX}"))
        .to_string_lossy()
        .into_owned();
    let mut files: Vec<PathBuf> = glob::glob(&pattern)?.filter_map(Result::ok).collect();
    files.sort();
    Ok(files)
}

/// Writes `cumulative-stats.json` for an analysed file or directory and
/// returns its path.
pub fn collect_cumulative_results(
    path: &Path,
    sort_by_material_diff: bool,
) -> Result<PathBuf, StatsError> {
    let (files, outfolder) = if path.is_dir() {
        (find_stats_files(path)?, path.to_path_buf())
    } else {
        let single = stats_path_for(path);
        let files = if single.exists() { vec![single] } else { Vec::new() };
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        (files, parent)
    };

    if files.is_empty() {
        warn!(path = %path.display(), "No stats files found, cumulative results will be empty");
    }

    let cumulative = merge_files(&files, sort_by_material_diff)?;
    if !outfolder.as_os_str().is_empty() {
        fs::create_dir_all(&outfolder).map_err(|source| StatsError::Io {
            path: outfolder.clone(),
            source,
        })?;
    }
    let outfile = outfolder.join(CUMULATIVE_FILE_NAME);
    cumulative.write(&outfile)?;
    Ok(outfile)
}

/// Combines previously written cumulative files into `outfile`. The
/// material-difference view is always included.
pub fn combine(files: &[PathBuf], outfile: &Path) -> Result<CumulativeStats, StatsError> {
    let cumulative = merge_files(files, true)?;
    cumulative.write(outfile)?;
    Ok(cumulative)
}

struct TimeControlMap<'a>(&'a [u64; 4]);

impl Serialize for TimeControlMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(TimeControlClass::ALL.len()))?;
        for class in TimeControlClass::ALL {
            map.serialize_entry(class.as_str(), &self.0[class.index()])?;
        }
        map.end()
    }
}

struct OrderedMap<'a>(&'a [(String, u64)]);

impl Serialize for OrderedMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, count) in self.0 {
            map.serialize_entry(name, count)?;
        }
        map.end()
    }
}

impl Serialize for RunStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("timecontrol", &TimeControlMap(&self.timecontrol))?;
        map.serialize_entry("EGTB", &OrderedMap(&most_games_sort(&self.egtb)))?;
        map.end()
    }
}

impl Serialize for CumulativeStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("created", &self.created)?;
        map.serialize_entry("total_games", &self.total_games)?;
        map.serialize_entry("timecontrol", &TimeControlMap(&self.timecontrol))?;
        if let Some(material_diff) = &self.egtb_material_diff {
            map.serialize_entry("EGTB_material_diff", &OrderedMap(material_diff))?;
        }
        map.serialize_entry("EGTB_most_games", &OrderedMap(&self.egtb_most_games))?;
        map.end()
    }
}
