//! Test cases and test utility functions.
//!

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::env;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::aligner::{Aligner, HitRecord, HIT_TABLE_NAME, INDEX_NAME};
use crate::error::DnaBarcoderError;
use crate::io::read_fasta;

/// Get the path to the `dnabarcoder` command line tool built by Cargo.
pub fn dnabarcoder_binary_path() -> PathBuf {
    let mut path = env::current_exe()
        .expect("could not locate the test executable")
        .parent()
        .expect("test executable has no parent directory")
        .to_path_buf();
    // test executables live in target/<profile>/deps
    if path.ends_with("deps") {
        path.pop();
    }
    path.push(format!("dnabarcoder{}", env::consts::EXE_SUFFIX));
    path
}

/// Build a hit record.
pub fn hit(query: &str, subject: &str, identity: f64, start: i64, end: i64) -> HitRecord {
    HitRecord {
        query_id: query.to_string(),
        hit_id: subject.to_string(),
        identity,
        query_start: start,
        query_end: end,
    }
}

/// Format a hit as a 12-column BLAST tabular row.
pub fn hit_table_row(hit: &HitRecord) -> String {
    let length = hit.span() + 1;
    format!(
        "{}\t{}\t{:.3}\t{}\t0\t0\t{}\t{}\t1\t{}\t1e-50\t500",
        hit.query_id, hit.hit_id, hit.identity, length, hit.query_start, hit.query_end, length
    )
}

/// An [`Aligner`] that writes a fixed hit table for every search, and
/// remembers which sequence identifiers it was asked to align.
///
/// Hits between identifiers outside the aligned group are ignored by the
/// matrix builder, so one table can serve every group of a run.
pub struct CannedAligner {
    hits: Vec<HitRecord>,
    fail: bool,
    seen: RefCell<Vec<Vec<String>>>,
}

impl CannedAligner {
    pub fn new(hits: Vec<HitRecord>) -> Self {
        Self {
            hits,
            fail: false,
            seen: RefCell::new(Vec::new()),
        }
    }

    /// An aligner whose index step always fails.
    pub fn failing() -> Self {
        Self {
            hits: Vec::new(),
            fail: true,
            seen: RefCell::new(Vec::new()),
        }
    }

    /// The identifiers of each aligned group, in call order.
    pub fn seen_ids(&self) -> Vec<Vec<String>> {
        self.seen.borrow().clone()
    }
}

impl Aligner for CannedAligner {
    fn build_index(&self, fasta: &Path, workdir: &Path) -> Result<PathBuf, DnaBarcoderError> {
        if self.fail {
            return Err(DnaBarcoderError::AlignerFailed(
                "canned".to_string(),
                "exit status: 1".to_string(),
            ));
        }
        let ids = read_fasta(fasta)?.into_iter().map(|r| r.id).collect();
        self.seen.borrow_mut().push(ids);
        Ok(workdir.join(INDEX_NAME))
    }

    fn search(
        &self,
        _fasta: &Path,
        _index: &Path,
        workdir: &Path,
    ) -> Result<PathBuf, DnaBarcoderError> {
        let output = workdir.join(HIT_TABLE_NAME);
        let mut file = File::create(&output)?;
        for hit in &self.hits {
            writeln!(file, "{}", hit_table_row(hit))?;
        }
        Ok(output)
    }
}

/// Hits for the two-group barcode fixture (`tests_data/barcodes.fasta`):
/// group A (A1, A2, A3) with pairwise identities 1.0, 0.9, 0.8 and group B
/// (B1, B2, B3) with 0.95, 0.95, 0.90, all over full coverage, plus
/// self-hits and a cross-group hit.
pub fn barcode_fixture_hits() -> Vec<HitRecord> {
    vec![
        hit("A1", "A1", 100.0, 1, 500),
        hit("A1", "A2", 100.0, 1, 500),
        hit("A1", "A3", 90.0, 1, 500),
        hit("A2", "A3", 80.0, 1, 500),
        hit("A3", "A2", 78.0, 1, 500),
        hit("B1", "B2", 95.0, 1, 500),
        hit("B1", "B3", 95.0, 1, 500),
        hit("B2", "B3", 90.0, 1, 500),
        hit("B3", "B2", 85.0, 1, 120),
        hit("A1", "B1", 70.0, 1, 500),
    ]
}

/// Random hits between `ids`, reproducible from `seed`.
pub fn random_hits(ids: &[String], num: usize, seed: u64) -> Vec<HitRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..num)
        .map(|_| {
            let query = &ids[rng.gen_range(0..ids.len())];
            let subject = &ids[rng.gen_range(0..ids.len())];
            let identity = rng.gen_range(70.0..=100.0);
            let end = rng.gen_range(50..700);
            hit(query, subject, identity, 1, end)
        })
        .collect()
}

/// Write hits to a temporary 12-column hit table.
pub fn temp_hit_table(hits: &[HitRecord]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("could not create temporary file");
    for hit in hits {
        writeln!(file, "{}", hit_table_row(hit)).expect("could not write hit table");
    }
    file
}
