//! # dnabarcoder: curation tools for DNA barcode reference databases
//!
//! This library supports two batch pipelines over a FASTA file of barcode
//! sequences and a tab-separated classification table:
//!
//! - **Selection** ([`commands::dnabarcoder_select`]): keep the sequences of
//!   requested taxa at a rank, optionally capping the number per taxon and
//!   requiring a minimum length. Taxa come from the classification table or
//!   from `k__...;g__...;s__...` taxonomy strings in FASTA descriptions.
//!
//! - **Variation** ([`commands::dnabarcoder_variation`]): for each taxon at
//!   one or more ranks, align its sequences against each other with an
//!   external [`aligner::Aligner`] (BLAST+ by default), and reduce the
//!   pairwise similarity matrix to the median and minimum similarity. These
//!   statistics are used to calibrate similarity thresholds for
//!   classification. Results are written as JSON, a TSV table, and SVG
//!   figures.
//!
//! The aligner is a trait so that the variation pipeline can be run with any
//! tool producing a tabular hit table; the tests use a canned aligner.

pub mod aligner;
pub mod commands;
pub mod error;
pub mod io;
pub mod plot;
pub mod reporting;
pub mod select;
pub mod similarity;
pub mod stats;
pub mod taxonomy;
pub mod test_utilities;
pub mod variation;

pub mod prelude {
    pub use crate::aligner::{Aligner, AlignmentStatus, BlastAligner, HitRecord};
    pub use crate::error::DnaBarcoderError;
    pub use crate::io::{read_fasta, write_fasta, InputFile, OutputFile, SequenceRecord};
    pub use crate::plot::PlotType;
    pub use crate::similarity::{MatrixBuilder, SimilarityMatrix};
    pub use crate::taxonomy::{Classification, ClassificationTable, IdColumn, TaxaFilter};
    pub use crate::variation::{VariationComputer, VariationRecord, Variations};
}
