//! Pairwise similarity matrices of taxon groups.
//!
//! A [`SimilarityMatrix`] holds, for each pair of sequences in a group, the
//! best coverage-adjusted identity reported by the aligner. It is symmetric;
//! the diagonal (self-hits) is never used for statistics.

use indexmap::IndexMap;
use ndarray::Array2;
use std::path::PathBuf;
use tracing::debug;

use crate::aligner::{Aligner, AlignmentStatus, HitRecord};
use crate::error::DnaBarcoderError;
use crate::io::{write_fasta, SequenceRecord};

/// File name of the group FASTA inside a scratch directory.
pub const GROUP_FASTA_NAME: &str = "group.fasta";

/// Score a hit: identity as a fraction, scaled down by the coverage
/// shortfall when the aligned span is below `min_coverage`.
pub fn coverage_adjusted_score(hit: &HitRecord, min_coverage: u32) -> f64 {
    let sim = hit.identity / 100.0;
    let span = hit.span();
    if span < u64::from(min_coverage) {
        sim * span as f64 / min_coverage as f64
    } else {
        sim
    }
}

/// A symmetric matrix of pairwise similarity scores in [0, 1].
#[derive(Clone, Debug, PartialEq)]
pub struct SimilarityMatrix {
    scores: Array2<f64>,
}

impl SimilarityMatrix {
    /// An all-zero matrix for `n` sequences.
    pub fn zeros(n: usize) -> Self {
        Self {
            scores: Array2::zeros((n, n)),
        }
    }

    /// Build the matrix of `ids` from hits. Hits naming an identifier that
    /// is not in `ids` are ignored.
    pub fn from_hits<'a, I>(ids: &[&str], hits: I, min_coverage: u32) -> Self
    where
        I: IntoIterator<Item = &'a HitRecord>,
    {
        let index: IndexMap<&str, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let mut matrix = Self::zeros(ids.len());
        for hit in hits {
            let (Some(&i), Some(&j)) = (
                index.get(hit.query_id.as_str()),
                index.get(hit.hit_id.as_str()),
            ) else {
                debug!("ignoring hit {} -> {} outside the group", hit.query_id, hit.hit_id);
                continue;
            };
            matrix.update(i, j, coverage_adjusted_score(hit, min_coverage));
        }
        matrix
    }

    /// Number of sequences.
    pub fn len(&self) -> usize {
        self.scores.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.scores[[i, j]]
    }

    /// Raise the score of the pair to `score` if it is higher.
    pub fn update(&mut self, i: usize, j: usize, score: f64) {
        if self.scores[[i, j]] < score {
            self.scores[[i, j]] = score;
            self.scores[[j, i]] = score;
        }
    }

    /// The scores of all pairs `i < j`, row by row.
    pub fn pair_scores(&self) -> Vec<f64> {
        let n = self.len();
        let mut scores = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                scores.push(self.scores[[i, j]]);
            }
        }
        scores
    }

    pub fn is_symmetric(&self) -> bool {
        self.scores == self.scores.t()
    }
}

/// Builds a group's similarity matrix by running the aligner in a scratch
/// directory that is removed afterwards.
pub struct MatrixBuilder<'a, A: Aligner> {
    aligner: &'a A,
    min_coverage: u32,
    scratch_root: Option<PathBuf>,
}

impl<'a, A: Aligner> MatrixBuilder<'a, A> {
    pub fn new(aligner: &'a A, min_coverage: u32) -> Self {
        Self {
            aligner,
            min_coverage,
            scratch_root: None,
        }
    }

    /// Create scratch directories under `root` instead of the system
    /// temporary directory.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    /// Align `sequences` against themselves and build their matrix.
    ///
    /// A failed aligner gives an all-zero matrix with a
    /// [`AlignmentStatus::Failed`] status. Errors are only returned when the
    /// scratch files cannot be written.
    pub fn build(
        &self,
        sequences: &[&SequenceRecord],
    ) -> Result<(SimilarityMatrix, AlignmentStatus), DnaBarcoderError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("dnabarcoder-");
        let scratch = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        let fasta = scratch.path().join(GROUP_FASTA_NAME);
        write_fasta(&fasta, sequences.iter().copied())?;

        let outcome = self.aligner.self_align(&fasta, scratch.path());
        let ids: Vec<&str> = sequences.iter().map(|record| record.id.as_str()).collect();
        let matrix = SimilarityMatrix::from_hits(&ids, &outcome.hits, self.min_coverage);
        debug!(
            "built {}x{} similarity matrix from {} hits ({})",
            matrix.len(),
            matrix.len(),
            outcome.hits.len(),
            outcome.status
        );
        scratch.close()?;
        Ok((matrix, outcome.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aligner::HIT_TABLE_NAME;
    use crate::test_utilities::{hit, CannedAligner};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_coverage_adjustment() {
        // full identity over half the required coverage scores exactly 0.5
        assert_eq!(coverage_adjusted_score(&hit("a", "b", 100.0, 1, 201), 400), 0.5);
        assert_eq!(coverage_adjusted_score(&hit("a", "b", 100.0, 201, 1), 400), 0.5);
        // enough coverage is unadjusted
        assert_eq!(coverage_adjusted_score(&hit("a", "b", 97.0, 1, 401), 400), 0.97);
        assert_eq!(coverage_adjusted_score(&hit("a", "b", 90.0, 1, 101), 100), 0.9);
    }

    #[test]
    fn test_matrix_keeps_best_score_symmetric() {
        let hits = vec![
            hit("s1", "s2", 80.0, 1, 500),
            hit("s2", "s1", 95.0, 1, 500),
            hit("s1", "s2", 90.0, 1, 500),
            hit("s1", "s1", 100.0, 1, 500),
            hit("s3", "s1", 100.0, 1, 101),
            hit("s1", "other", 100.0, 1, 500),
        ];
        let matrix = SimilarityMatrix::from_hits(&["s1", "s2", "s3"], &hits, 400);
        assert!(matrix.is_symmetric());
        assert_eq!(matrix.get(0, 1), 0.95);
        assert_eq!(matrix.get(1, 0), 0.95);
        assert_eq!(matrix.get(0, 2), 0.25);
        assert_eq!(matrix.get(1, 2), 0.0);
        assert_eq!(matrix.pair_scores(), vec![0.95, 0.25, 0.0]);
    }

    #[test]
    fn test_pair_scores_small_groups() {
        assert!(SimilarityMatrix::zeros(0).pair_scores().is_empty());
        assert!(SimilarityMatrix::zeros(1).pair_scores().is_empty());
        assert_eq!(SimilarityMatrix::zeros(4).pair_scores().len(), 6);
    }

    #[test]
    fn test_builder_removes_scratch_files() {
        let root = tempdir().unwrap();
        let records = vec![
            SequenceRecord::new("s1", "", b"ACGT".to_vec()),
            SequenceRecord::new("s2", "", b"ACGA".to_vec()),
        ];
        let refs: Vec<&SequenceRecord> = records.iter().collect();
        let aligner = CannedAligner::new(vec![hit("s1", "s2", 75.0, 1, 401)]);
        let (matrix, status) = MatrixBuilder::new(&aligner, 400)
            .with_scratch_root(root.path())
            .build(&refs)
            .unwrap();
        assert_eq!(status, AlignmentStatus::Success);
        assert_eq!(matrix.get(1, 0), 0.75);
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
        // the aligner saw the group FASTA in its working directory
        let seen = aligner.seen_ids();
        assert_eq!(seen, vec![vec!["s1".to_string(), "s2".to_string()]]);
        assert_eq!(HIT_TABLE_NAME, "out.txt");
    }

    #[test]
    fn test_builder_failed_aligner_gives_zero_matrix() {
        let records = vec![
            SequenceRecord::new("s1", "", b"ACGT".to_vec()),
            SequenceRecord::new("s2", "", b"ACGA".to_vec()),
        ];
        let refs: Vec<&SequenceRecord> = records.iter().collect();
        let aligner = CannedAligner::failing();
        let (matrix, status) = MatrixBuilder::new(&aligner, 400).build(&refs).unwrap();
        assert!(status.is_failed());
        assert_eq!(matrix, SimilarityMatrix::zeros(2));
    }
}
