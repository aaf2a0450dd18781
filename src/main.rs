use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use egtb_stats::config::{DEFAULT_HI_ELO, DEFAULT_LO_ELO, REQUIRED_CAPTURES_7_MAN};
use egtb_stats::{AnalysisConfig, ConfigError, TimeControlClass, analyse_path, combine};

/// Endgame tablebase statistics over PGN archives
#[derive(Parser, Debug)]
#[command(name = "egtb-stats", version, about)]
struct Opt {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyse a PGN archive or every archive in a directory
    Analyse {
        /// Archive (.pgn, .pgn.bz2, .pgn.zst) or directory of archives
        path: PathBuf,
        /// Lowest rating of both players
        #[arg(long, default_value_t = DEFAULT_LO_ELO)]
        loelo: i32,
        /// Highest rating of both players
        #[arg(long, default_value_t = DEFAULT_HI_ELO)]
        hielo: i32,
        /// Time control classes to leave out (bullet, blitz, rapid, slow)
        #[arg(long, num_args = 0..)]
        exclude: Vec<String>,
        /// Captures before the position is classified
        #[arg(long, default_value_t = REQUIRED_CAPTURES_7_MAN)]
        captures: u32,
        /// Add the material difference view to the cumulative stats
        #[arg(long)]
        sort_by_material_diff: bool,
        /// Replay worker threads
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Combine cumulative stats files into one
    Combine {
        /// Cumulative stats files
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Output file
        #[arg(long, default_value = "cumulative.json")]
        outfile: PathBuf,
    },
}

fn analysis_config(
    loelo: i32,
    hielo: i32,
    exclude: &[String],
    captures: u32,
    workers: Option<usize>,
) -> Result<AnalysisConfig, ConfigError> {
    let exclude = exclude
        .iter()
        .map(|class| class.parse::<TimeControlClass>())
        .collect::<Result<Vec<_>, _>>()?;

    let config = AnalysisConfig::new(loelo, hielo, exclude, captures)?;
    Ok(match workers {
        Some(workers) => config.with_workers(workers),
        None => config,
    })
}

fn main() -> ExitCode {
    egtb_stats::log::init();

    match run(Opt::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<ConfigError>() {
            Some(config_error) => {
                error!("{config_error}");
                ExitCode::from(config_error.exit_code())
            }
            None => {
                error!("{e:#}");
                ExitCode::FAILURE
            }
        },
    }
}

fn run(opt: Opt) -> Result<()> {
    match opt.command {
        Command::Analyse {
            path,
            loelo,
            hielo,
            exclude,
            captures,
            sort_by_material_diff,
            workers,
        } => {
            let config = analysis_config(loelo, hielo, &exclude, captures, workers)?;
            info!(
                loelo = config.lo_elo,
                hielo = config.hi_elo,
                captures = config.captures,
                workers = config.workers,
                "Starting analysis of {}",
                path.display()
            );

            let batch = analyse_path(&path, &config, sort_by_material_diff)
                .with_context(|| format!("failed to analyse {}", path.display()))?;
            if !batch.failed.is_empty() {
                let total = batch.failed.len() + batch.runs.len();
                info!("{} of {total} files failed", batch.failed.len());
            }
        }
        Command::Combine { files, outfile } => {
            let combined = combine(&files, &outfile)
                .with_context(|| format!("failed to combine into {}", outfile.display()))?;
            info!(
                total_games = combined.total_games,
                "Combined {} files into {}",
                files.len(),
                outfile.display()
            );
        }
    }
    Ok(())
}
