//! Types and methods for reading and parsing input and writing output.

pub mod fasta;
pub mod file;
pub mod tsv;

pub use fasta::{read_fasta, write_fasta, SequenceRecord};
pub use file::{InputFile, OutputFile};
pub use tsv::{build_tsv_reader, build_tsv_writer};
