//! Essential TSV functionality, which wraps the [`csv`] crate configured for
//! tab-delimited files.

use csv::{Reader, ReaderBuilder, StringRecord, Writer, WriterBuilder};
use std::io::{Read, Write};
use std::path::Path;

use super::file::{InputFile, OutputFile};
use crate::error::DnaBarcoderError;

/// Build a TSV reader that works on gzip-compressed files and tolerates
/// ragged rows.
///
/// Quoting is disabled: taxon names and identifiers are taken verbatim.
pub fn build_tsv_reader(
    filepath: impl AsRef<Path>,
    has_headers: bool,
) -> Result<Reader<Box<dyn Read>>, DnaBarcoderError> {
    let input = InputFile::new(filepath.as_ref());
    let stream: Box<dyn Read> = Box::new(input.reader()?);
    let reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(has_headers)
        .flexible(true)
        .quoting(false)
        .from_reader(stream);
    Ok(reader)
}

/// Build a TSV writer over an [`OutputFile`].
pub fn build_tsv_writer(output: &OutputFile) -> Result<Writer<Box<dyn Write>>, DnaBarcoderError> {
    let writer = WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(output.writer()?);
    Ok(writer)
}

/// Get a trimmed column from a record, returning `""` for a missing column.
pub fn column<'a>(record: &'a StringRecord, index: usize) -> &'a str {
    record.get(index).map_or("", |s| s.trim_end())
}
