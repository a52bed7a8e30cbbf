//! Input/Output file handling with [`InputFile`] and [`OutputFile`].
//!
//! These types abstract over reading/writing both plaintext and gzip-compressed
//! input/output.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Check if a file is a gzipped by looking for the magic numbers.
///
/// Files shorter than two bytes are never gzipped.
pub fn is_gzipped_file(file_path: impl AsRef<Path>) -> io::Result<bool> {
    let mut file = File::open(file_path.as_ref())?;
    let mut buffer = [0; 2];
    let mut filled = 0;
    while filled < buffer.len() {
        let n = file.read(&mut buffer[filled..])?;
        if n == 0 {
            return Ok(false);
        }
        filled += n;
    }
    Ok(buffer == [0x1f, 0x8b])
}

/// Whether a path carries a `.gz` or `.bgz` extension.
fn has_gzip_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext == "gz" || ext == "bgz")
}

/// Represents an input file.
///
/// This abstracts how data is read in, allowing for both plaintext and
/// gzip-compressed input to be read through a common interface.
#[derive(Clone, Debug)]
pub struct InputFile {
    pub filepath: PathBuf,
}

impl InputFile {
    /// Constructs a new `InputFile`.
    ///
    /// # Arguments
    ///
    /// * `filepath` - the path to the file. Gzip-compressed input is detected
    ///   from the magic number and uncompressed automatically.
    pub fn new(filepath: impl Into<PathBuf>) -> Self {
        Self {
            filepath: filepath.into(),
        }
    }

    /// Opens the file and returns a buffered reader.
    pub fn reader(&self) -> io::Result<BufReader<Box<dyn Read>>> {
        let file = File::open(&self.filepath)?;
        let reader: Box<dyn Read> = if is_gzipped_file(&self.filepath)? {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Ok(BufReader::new(reader))
    }
}

/// Represents an output file.
///
/// If the file extension is `.gz`, output is gzip-compressed.
pub struct OutputFile {
    filepath: PathBuf,
}

impl OutputFile {
    /// Constructs a new `OutputFile`.
    pub fn new(filepath: impl Into<PathBuf>) -> Self {
        Self {
            filepath: filepath.into(),
        }
    }

    /// Creates the file and returns a buffered writer.
    pub fn writer(&self) -> io::Result<Box<dyn Write>> {
        let file = File::create(&self.filepath)?;
        let writer: Box<dyn Write> = if has_gzip_extension(&self.filepath) {
            Box::new(BufWriter::new(GzEncoder::new(file, Compression::default())))
        } else {
            Box::new(BufWriter::new(file))
        };
        Ok(writer)
    }
}
