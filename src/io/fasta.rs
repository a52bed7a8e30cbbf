//! Reading and writing FASTA sequence records.
//!
//! Parsing is done by [`noodles::fasta`]; records are copied into the owned
//! [`SequenceRecord`] type so subsets can be regrouped and rewritten freely.

use noodles::fasta;
use std::io::Write;
use std::path::Path;

use super::file::{InputFile, OutputFile};
use crate::error::DnaBarcoderError;

/// Residues per line when writing FASTA.
pub const FASTA_LINE_WIDTH: usize = 60;

/// A single FASTA record: its identifier, free-text description and residues.
#[derive(Clone, Debug, PartialEq)]
pub struct SequenceRecord {
    pub id: String,
    pub description: String,
    pub sequence: Vec<u8>,
}

impl SequenceRecord {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        sequence: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            sequence: sequence.into(),
        }
    }

    /// Number of residues.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// Use the [`noodles`] library to load all records of a (possibly gzipped)
/// FASTA file, in file order.
pub fn read_fasta(filepath: impl AsRef<Path>) -> Result<Vec<SequenceRecord>, DnaBarcoderError> {
    let input = InputFile::new(filepath.as_ref());
    let mut reader = fasta::Reader::new(input.reader()?);

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        let definition = record.definition();
        let id = String::from_utf8(definition.name().to_vec())?;
        let description = match definition.description() {
            Some(description) => String::from_utf8(description.to_vec())?,
            None => String::new(),
        };
        let sequence = record.sequence().as_ref().to_vec();
        records.push(SequenceRecord {
            id,
            description,
            sequence,
        });
    }
    Ok(records)
}

/// Write a single record, wrapping residues at [`FASTA_LINE_WIDTH`].
pub fn write_record<W: Write + ?Sized>(
    writer: &mut W,
    record: &SequenceRecord,
) -> std::io::Result<()> {
    if record.description.is_empty() {
        writeln!(writer, ">{}", record.id)?;
    } else {
        writeln!(writer, ">{} {}", record.id, record.description)?;
    }
    for line in record.sequence.chunks(FASTA_LINE_WIDTH) {
        writer.write_all(line)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Write records to a FASTA file, returning how many were written.
pub fn write_fasta<'a, I>(filepath: impl AsRef<Path>, records: I) -> Result<usize, DnaBarcoderError>
where
    I: IntoIterator<Item = &'a SequenceRecord>,
{
    let output = OutputFile::new(filepath.as_ref());
    let mut writer = output.writer()?;
    let mut written = 0;
    for record in records {
        write_record(&mut writer, record)?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}
