//! Batch orchestrator: discover design files under a directory and apply a
//! parse + projection pair to each on a bounded worker pool.
//!
//! Every file is an independent task; one file's failure never cancels the
//! others. Output paths are derived from input file names into a flat output
//! directory, so a pre-flight uniqueness check rejects colliding inputs
//! before any parsing starts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use crate::convert::bom::{Bom, BomOptions};
use crate::convert::mermaid;
use crate::convert::model3d::BoardModel;
use crate::core::{discover_design_files, FileTypeFilter, ParseOptions, TwinizerError};
use crate::parser::format::{parse_file, Design};

/// Which artifact the batch run produces per file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    BomCsv,
    BomJson,
    Flowchart,
    ClassDiagram,
    ErDiagram,
    Model3d,
    /// Full design model as JSON.
    Json,
}

impl Projection {
    pub fn extension(&self) -> &'static str {
        match self {
            Projection::BomCsv => "csv",
            Projection::BomJson | Projection::Json => "json",
            Projection::Flowchart | Projection::ClassDiagram | Projection::ErDiagram => "mmd",
            Projection::Model3d => "obj",
        }
    }

    /// Apply to a parsed design. Projection/design mismatches (BOM of a
    /// board, 3D model of a schematic) are per-file errors.
    pub fn apply(&self, design: &Design) -> Result<String, TwinizerError> {
        match (self, design) {
            (Projection::BomCsv, Design::Schematic(sch)) => {
                Bom::from_schematic(sch, &BomOptions::default()).to_csv()
            }
            (Projection::BomJson, Design::Schematic(sch)) => {
                Bom::from_schematic(sch, &BomOptions::default()).to_json()
            }
            (Projection::Flowchart, Design::Schematic(sch)) => {
                Ok(mermaid::flowchart(sch, mermaid::Direction::TopDown))
            }
            (Projection::Flowchart, Design::Pcb(pcb)) => {
                Ok(mermaid::pcb_flowchart(pcb, mermaid::Direction::TopDown))
            }
            (Projection::ClassDiagram, Design::Schematic(sch)) => Ok(mermaid::class_diagram(sch)),
            (Projection::ErDiagram, Design::Schematic(sch)) => Ok(mermaid::er_diagram(sch)),
            (Projection::Model3d, Design::Pcb(pcb)) => Ok(BoardModel::from_pcb(pcb)?.to_obj()),
            (Projection::Json, Design::Schematic(sch)) => serde_json::to_string_pretty(sch)
                .map_err(|e| TwinizerError::Other(e.to_string())),
            (Projection::Json, Design::Pcb(pcb)) => serde_json::to_string_pretty(pcb)
                .map_err(|e| TwinizerError::Other(e.to_string())),
            (Projection::Model3d, Design::Schematic(_)) => Err(TwinizerError::Other(
                "3d model projection requires a board file".to_string(),
            )),
            (_, Design::Pcb(_)) => Err(TwinizerError::Other(
                "projection requires a schematic file".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub filter: FileTypeFilter,
    pub recursive: bool,
    pub projection: Projection,
    pub output_dir: PathBuf,
    /// Worker count; defaults to available parallelism.
    pub pool_size: Option<usize>,
    /// Stop submitting new files past this budget. In-flight files finish.
    pub max_files: Option<usize>,
    pub parse_options: ParseOptions,
}

/// Per-file outcomes, sorted by input path for stable reporting.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }
}

/// Run a batch over `input_dir`.
pub fn run_batch(input_dir: &Path, options: &BatchOptions) -> Result<BatchSummary, TwinizerError> {
    let mut files = discover_design_files(input_dir, options.filter, options.recursive)?;
    if let Some(max) = options.max_files {
        files.truncate(max);
    }

    let jobs = plan_outputs(&files, &options.output_dir, options.projection)?;
    if jobs.is_empty() {
        return Ok(BatchSummary::default());
    }
    std::fs::create_dir_all(&options.output_dir)?;

    let pool_size = options
        .pool_size
        .unwrap_or_else(|| {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
        .max(1)
        .min(jobs.len());
    tracing::info!(
        "processing {} files with {} workers",
        jobs.len(),
        pool_size
    );

    let (job_tx, job_rx) = mpsc::channel::<(PathBuf, PathBuf)>();
    let job_rx = Arc::new(Mutex::new(job_rx));
    let (result_tx, result_rx) = mpsc::channel::<(PathBuf, Result<PathBuf, String>)>();

    let mut workers = Vec::with_capacity(pool_size);
    for _ in 0..pool_size {
        let job_rx = Arc::clone(&job_rx);
        let result_tx = result_tx.clone();
        let projection = options.projection;
        let parse_options = options.parse_options;
        workers.push(thread::spawn(move || loop {
            let job = {
                let Ok(guard) = job_rx.lock() else { break };
                guard.recv()
            };
            let Ok((input, output)) = job else { break };
            let outcome = process_one(&input, &output, projection, parse_options)
                .map(|_| output.clone())
                .map_err(|e| e.to_string());
            if result_tx.send((input, outcome)).is_err() {
                break;
            }
        }));
    }
    drop(result_tx);

    for job in jobs {
        if job_tx.send(job).is_err() {
            break;
        }
    }
    drop(job_tx);

    let mut summary = BatchSummary::default();
    for (input, outcome) in result_rx {
        match outcome {
            Ok(_) => summary.succeeded.push(input),
            Err(message) => {
                tracing::warn!("{}: {}", input.display(), message);
                summary.failed.push((input, message));
            }
        }
    }
    for worker in workers {
        let _ = worker.join();
    }

    summary.succeeded.sort();
    summary.failed.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(summary)
}

/// Map inputs to flat output paths and reject duplicates before any parsing.
fn plan_outputs(
    files: &[PathBuf],
    output_dir: &Path,
    projection: Projection,
) -> Result<Vec<(PathBuf, PathBuf)>, TwinizerError> {
    let mut seen: HashMap<PathBuf, PathBuf> = HashMap::new();
    let mut jobs = Vec::with_capacity(files.len());
    for input in files {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("design");
        let output = output_dir.join(format!("{}.{}", stem, projection.extension()));
        if let Some(first) = seen.get(&output) {
            return Err(TwinizerError::OutputCollision {
                first: first.clone(),
                second: input.clone(),
                output,
            });
        }
        seen.insert(output.clone(), input.clone());
        jobs.push((input.clone(), output));
    }
    Ok(jobs)
}

fn process_one(
    input: &Path,
    output: &Path,
    projection: Projection,
    parse_options: ParseOptions,
) -> Result<(), TwinizerError> {
    let outcome = parse_file(input, parse_options)?;
    let artifact = projection.apply(&outcome.design)?;
    std::fs::write(output, artifact)?;
    Ok(())
}
