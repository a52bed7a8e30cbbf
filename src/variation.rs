//! Intra-taxon sequence variation.
//!
//! The sequences of each taxon group are aligned against each other and the
//! resulting [`SimilarityMatrix`] is reduced to the median and minimum
//! pairwise similarity. Results for all groups at one rank are collected in
//! a [`Variations`] container, which is stored as JSON
//! (`{"taxon": [median, minimum, count]}`) and as a tab-separated table.

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::aligner::{Aligner, AlignmentStatus};
use crate::error::DnaBarcoderError;
use crate::io::{build_tsv_writer, InputFile, OutputFile, SequenceRecord};
use crate::similarity::{MatrixBuilder, SimilarityMatrix};
use crate::stats::{median, minimum, round_score};
use crate::taxonomy::Classification;

/// The similarity reported for groups with fewer than two sequences.
pub const SENTINEL_SIMILARITY: f64 = 1.0;

/// Column names of the tab-separated variation table.
pub const TSV_HEADER: [&str; 4] = [
    "Taxonname",
    "Median similarity score",
    "Min similarity score",
    "Number of sequences",
];

/// The variation statistics of one taxon group.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64, usize)", into = "(f64, f64, usize)")]
pub struct VariationRecord {
    pub median: f64,
    pub min: f64,
    /// Number of sequences that went into the similarity matrix.
    pub count: usize,
}

impl From<(f64, f64, usize)> for VariationRecord {
    fn from((median, min, count): (f64, f64, usize)) -> Self {
        Self { median, min, count }
    }
}

impl From<VariationRecord> for (f64, f64, usize) {
    fn from(record: VariationRecord) -> Self {
        (record.median, record.min, record.count)
    }
}

/// Reduce a similarity matrix to its variation statistics.
///
/// All pairs `i < j` are used. Groups with fewer than two sequences get
/// [`SENTINEL_SIMILARITY`] for both statistics.
pub fn reduce(matrix: &SimilarityMatrix) -> VariationRecord {
    let mut scores = matrix.pair_scores();
    let (median, min) = match (median(&mut scores), minimum(&scores)) {
        (Some(median), Some(min)) => (round_score(median), round_score(min)),
        _ => (SENTINEL_SIMILARITY, SENTINEL_SIMILARITY),
    };
    VariationRecord {
        median,
        min,
        count: matrix.len(),
    }
}

/// Variation records by taxon name, in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variations {
    records: IndexMap<String, VariationRecord>,
}

impl Variations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, taxon: impl Into<String>, record: VariationRecord) {
        self.records.insert(taxon.into(), record);
    }

    pub fn get(&self, taxon: &str) -> Option<&VariationRecord> {
        self.records.get(taxon)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VariationRecord)> {
        self.records.iter().map(|(taxon, record)| (taxon.as_str(), record))
    }

    /// Records sorted by decreasing median similarity. Ties keep insertion
    /// order.
    pub fn sorted_by_median(&self) -> Vec<(&str, &VariationRecord)> {
        let mut sorted: Vec<_> = self.iter().collect();
        sorted.sort_by(|a, b| b.1.median.total_cmp(&a.1.median));
        sorted
    }

    /// Load variations from a JSON file.
    pub fn from_json(filepath: impl AsRef<Path>) -> Result<Self, DnaBarcoderError> {
        let reader = InputFile::new(filepath.as_ref()).reader()?;
        Ok(serde_json::from_reader(reader)?)
    }

    /// Write variations as pretty-printed JSON.
    pub fn to_json(&self, filepath: impl AsRef<Path>) -> Result<(), DnaBarcoderError> {
        let mut writer = OutputFile::new(filepath.as_ref()).writer()?;
        serde_json::to_writer_pretty(&mut writer, self)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write variations as a tab-separated table with a [`TSV_HEADER`] row.
    pub fn to_tsv(&self, filepath: impl AsRef<Path>) -> Result<(), DnaBarcoderError> {
        let output = OutputFile::new(filepath.as_ref());
        let mut writer = build_tsv_writer(&output)?;
        writer.write_record(TSV_HEADER)?;
        for (taxon, record) in self.iter() {
            writer.write_record([
                taxon.to_string(),
                record.median.to_string(),
                record.min.to_string(),
                record.count.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Taxon groups at one rank: taxon name to its sequences, both in
/// classification-table order.
pub type TaxonGroups<'a> = IndexMap<String, Vec<&'a SequenceRecord>>;

/// Group sequences by their label in `classification`.
///
/// Classified identifiers missing from `records` are skipped, as are
/// duplicate records of an identifier already grouped.
pub fn group_sequences<'a>(
    records: &'a [SequenceRecord],
    classification: &Classification,
) -> TaxonGroups<'a> {
    let mut by_id: IndexMap<&str, &SequenceRecord> = IndexMap::new();
    for record in records {
        by_id.entry(record.id.as_str()).or_insert(record);
    }
    let mut groups = TaxonGroups::new();
    for (id, label) in classification.iter() {
        if let Some(record) = by_id.get(id) {
            groups.entry(label.to_string()).or_default().push(*record);
        }
    }
    groups
}

/// Draw a uniform random subsample of exactly `min(cap, len)` sequences,
/// without replacement, keeping their input order. A cap of `0` keeps the
/// whole group.
pub fn subsample<'a>(
    sequences: &[&'a SequenceRecord],
    cap: usize,
    rng: &mut StdRng,
) -> Vec<&'a SequenceRecord> {
    if cap == 0 || sequences.len() <= cap {
        return sequences.to_vec();
    }
    let mut indices = rand::seq::index::sample(rng, sequences.len(), cap).into_vec();
    indices.sort_unstable();
    indices.into_iter().map(|i| sequences[i]).collect()
}

/// The variations of one rank and the groups whose alignment failed.
#[derive(Clone, Debug, Default)]
pub struct RankVariations {
    pub variations: Variations,
    pub failed_groups: Vec<String>,
}

/// Computes the variation of taxon groups with an [`Aligner`].
pub struct VariationComputer<'a, A: Aligner> {
    builder: MatrixBuilder<'a, A>,
    max_seq_no: usize,
    rng: StdRng,
}

impl<'a, A: Aligner> VariationComputer<'a, A> {
    /// Create a computer that subsamples groups larger than `max_seq_no`
    /// (`0` for no limit). Subsampling is reproducible when `seed` is set.
    pub fn new(builder: MatrixBuilder<'a, A>, max_seq_no: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            builder,
            max_seq_no,
            rng,
        }
    }

    /// Compute one group and add its record to `variations`, which is
    /// returned with the alignment status. Empty groups are not recorded.
    pub fn compute_group(
        &mut self,
        mut variations: Variations,
        taxon: &str,
        sequences: &[&SequenceRecord],
    ) -> Result<(Variations, AlignmentStatus), DnaBarcoderError> {
        if sequences.is_empty() {
            return Ok((variations, AlignmentStatus::Empty));
        }
        let sample = subsample(sequences, self.max_seq_no, &mut self.rng);
        if sample.len() < sequences.len() {
            debug!(
                "{}: sampled {} of {} sequences",
                taxon,
                sample.len(),
                sequences.len()
            );
        }
        let (matrix, status) = if sample.len() < 2 {
            // a single sequence has no pairs to align
            (SimilarityMatrix::zeros(sample.len()), AlignmentStatus::Empty)
        } else {
            self.builder.build(&sample)?
        };
        let record = reduce(&matrix);
        debug!(
            "{}: median {} min {} over {} sequences",
            taxon, record.median, record.min, record.count
        );
        variations.insert(taxon, record);
        Ok((variations, status))
    }

    /// Compute every group of a rank, one at a time.
    pub fn compute_rank(&mut self, groups: &TaxonGroups) -> Result<RankVariations, DnaBarcoderError> {
        let mut variations = Variations::new();
        let mut failed_groups = Vec::new();
        for (i, (taxon, sequences)) in groups.iter().enumerate() {
            info!(
                "computing variation of {} ({} sequences, group {}/{})",
                taxon,
                sequences.len(),
                i + 1,
                groups.len()
            );
            let (updated, status) = self.compute_group(variations, taxon, sequences)?;
            variations = updated;
            if let AlignmentStatus::Failed(msg) = status {
                warn!("{}: aligner failed, similarity scores are zero ({})", taxon, msg);
                failed_groups.push(taxon.clone());
            }
        }
        Ok(RankVariations {
            variations,
            failed_groups,
        })
    }
}
