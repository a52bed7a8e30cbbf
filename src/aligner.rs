//! The external pairwise aligner.
//!
//! Similarity scores come from an all-against-all search of a group of
//! sequences with an external tool. The [`Aligner`] trait separates the two
//! steps of that search (index building and the self-query) so that tests
//! can substitute a fake tool; [`BlastAligner`] drives BLAST+.
//!
//! The search writes a tabular hit table (BLAST `-outfmt 6`):
//!
//! ```text
//! qseqid  sseqid  pident  length  mismatch  gapopen  qstart  qend  sstart  send  evalue  bitscore
//! ```
//!
//! An aligner failure never aborts a run: [`Aligner::self_align`] reports it
//! as [`AlignmentStatus::Failed`] with no hits.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, warn};

use crate::error::DnaBarcoderError;
use crate::io::build_tsv_reader;
use crate::io::tsv::column;

/// Alignments shorter than this use the `blastn-short` task.
pub const SHORT_TASK_COVERAGE: u32 = 400;

/// File name of the hit table inside the working directory.
pub const HIT_TABLE_NAME: &str = "out.txt";

/// File name prefix of the search index inside the working directory.
pub const INDEX_NAME: &str = "db";

/// One row of a tabular hit table.
#[derive(Clone, Debug, PartialEq)]
pub struct HitRecord {
    pub query_id: String,
    pub hit_id: String,
    /// Percent identity, 0-100.
    pub identity: f64,
    pub query_start: i64,
    pub query_end: i64,
}

impl HitRecord {
    /// The absolute length of the aligned region on the query.
    pub fn span(&self) -> u64 {
        self.query_start.abs_diff(self.query_end)
    }
}

/// Parse a tabular hit table. Blank and malformed rows are skipped.
pub fn parse_hit_table(filepath: impl AsRef<Path>) -> Result<Vec<HitRecord>, DnaBarcoderError> {
    let mut reader = build_tsv_reader(filepath, false)?;
    let mut hits = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        match parse_hit(&record) {
            Ok(Some(hit)) => hits.push(hit),
            Ok(None) => {}
            Err(e) => debug!("skipping malformed hit table row {}: {}", i + 1, e),
        }
    }
    Ok(hits)
}

fn parse_hit(record: &csv::StringRecord) -> Result<Option<HitRecord>, DnaBarcoderError> {
    let query_id = column(record, 0);
    if query_id.is_empty() {
        return Ok(None);
    }
    Ok(Some(HitRecord {
        query_id: query_id.to_string(),
        hit_id: column(record, 1).to_string(),
        identity: column(record, 2).trim().parse()?,
        query_start: column(record, 6).trim().parse()?,
        query_end: column(record, 7).trim().parse()?,
    }))
}

/// The outcome of a self-alignment.
#[derive(Clone, Debug, PartialEq)]
pub enum AlignmentStatus {
    /// The aligner ran and reported hits.
    Success,
    /// The aligner ran but found no hits.
    Empty,
    /// The aligner failed; the message says why.
    Failed(String),
}

impl AlignmentStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, AlignmentStatus::Failed(_))
    }
}

impl fmt::Display for AlignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AlignmentStatus::Success => write!(f, "success"),
            AlignmentStatus::Empty => write!(f, "no hits"),
            AlignmentStatus::Failed(msg) => write!(f, "failed: {}", msg),
        }
    }
}

/// Hits of a self-alignment, with how it went.
#[derive(Clone, Debug)]
pub struct AlignmentOutcome {
    pub status: AlignmentStatus,
    pub hits: Vec<HitRecord>,
}

/// An external all-against-all sequence search tool.
///
/// Both steps receive the working directory that holds their inputs; all
/// files they create must be written inside it.
pub trait Aligner {
    /// Build a search index over the FASTA file, returning the index path.
    fn build_index(&self, fasta: &Path, workdir: &Path) -> Result<PathBuf, DnaBarcoderError>;

    /// Search the FASTA file against the index, returning the hit table path.
    fn search(
        &self,
        fasta: &Path,
        index: &Path,
        workdir: &Path,
    ) -> Result<PathBuf, DnaBarcoderError>;

    /// Align the sequences of `fasta` against themselves.
    fn self_align(&self, fasta: &Path, workdir: &Path) -> AlignmentOutcome {
        let hits = self
            .build_index(fasta, workdir)
            .and_then(|index| self.search(fasta, &index, workdir))
            .and_then(|table| {
                if table.exists() {
                    parse_hit_table(&table)
                } else {
                    Err(DnaBarcoderError::MissingAlignerOutput(table))
                }
            });
        match hits {
            Ok(hits) if hits.is_empty() => AlignmentOutcome {
                status: AlignmentStatus::Empty,
                hits,
            },
            Ok(hits) => AlignmentOutcome {
                status: AlignmentStatus::Success,
                hits,
            },
            Err(e) => {
                warn!("alignment of {} failed: {}", fasta.display(), e);
                AlignmentOutcome {
                    status: AlignmentStatus::Failed(e.to_string()),
                    hits: Vec::new(),
                }
            }
        }
    }
}

/// BLAST+ (`makeblastdb` and `blastn`) as the aligner.
#[derive(Clone, Debug)]
pub struct BlastAligner {
    pub makeblastdb: PathBuf,
    pub blastn: PathBuf,
    pub threads: usize,
    /// Use the `blastn-short` task, for short barcodes.
    pub short_task: bool,
}

impl BlastAligner {
    /// Build a BLAST aligner for alignments of at least `min_coverage`
    /// basepairs, using all available cores.
    pub fn new(makeblastdb: impl Into<PathBuf>, blastn: impl Into<PathBuf>, min_coverage: u32) -> Self {
        Self {
            makeblastdb: makeblastdb.into(),
            blastn: blastn.into(),
            threads: num_cpus::get(),
            short_task: min_coverage < SHORT_TASK_COVERAGE,
        }
    }

    /// The `blastn` arguments for a self-query.
    pub fn search_args(&self, fasta: &Path, index: &Path, output: &Path) -> Vec<String> {
        let mut args = vec![
            "-query".to_string(),
            fasta.display().to_string(),
            "-db".to_string(),
            index.display().to_string(),
        ];
        if self.short_task {
            args.push("-task".to_string());
            args.push("blastn-short".to_string());
        }
        args.extend([
            "-outfmt".to_string(),
            "6".to_string(),
            "-out".to_string(),
            output.display().to_string(),
            "-num_threads".to_string(),
            self.threads.to_string(),
        ]);
        args
    }
}

/// Run a command to completion in `workdir`, failing on a non-zero exit.
fn run_command(program: &Path, args: &[String], workdir: &Path) -> Result<(), DnaBarcoderError> {
    debug!("running {} {}", program.display(), args.join(" "));
    let output = Command::new(program)
        .args(args)
        .current_dir(workdir)
        .output()
        .map_err(|e| DnaBarcoderError::AlignerFailed(program.display().to_string(), e.to_string()))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DnaBarcoderError::AlignerFailed(
            program.display().to_string(),
            format!("{} {}", output.status, stderr.trim()),
        ));
    }
    Ok(())
}

impl Aligner for BlastAligner {
    fn build_index(&self, fasta: &Path, workdir: &Path) -> Result<PathBuf, DnaBarcoderError> {
        let index = workdir.join(INDEX_NAME);
        let args = vec![
            "-in".to_string(),
            fasta.display().to_string(),
            "-dbtype".to_string(),
            "nucl".to_string(),
            "-out".to_string(),
            index.display().to_string(),
        ];
        run_command(&self.makeblastdb, &args, workdir)?;
        Ok(index)
    }

    fn search(
        &self,
        fasta: &Path,
        index: &Path,
        workdir: &Path,
    ) -> Result<PathBuf, DnaBarcoderError> {
        let output = workdir.join(HIT_TABLE_NAME);
        let args = self.search_args(fasta, index, &output);
        run_command(&self.blastn, &args, workdir)?;
        Ok(output)
    }
}
