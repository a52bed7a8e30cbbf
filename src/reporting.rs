//! Types for standardized reports to the user about a command run.
//!
//! Commands return their value together with a [`Report`] of things the
//! user should know about, such as groups whose alignment failed or results
//! that were reloaded instead of recomputed.
//!

use std::fmt;

/// The [`CommandOutput<U>`] type output is generic over some data output
/// from a command, and a [`Report`] that reports information to the user.
#[derive(Debug)]
pub struct CommandOutput<U> {
    value: U,
    report: Report,
}

impl<U> CommandOutput<U> {
    pub fn new(value: U, report: Report) -> Self {
        Self { value, report }
    }

    pub fn into_parts(self) -> (U, Report) {
        (self.value, self.report)
    }
}

/// A type to (semi) standardize reporting to the user.
#[derive(Clone, Debug, Default)]
pub struct Report {
    entries: Vec<String>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_issue(&mut self, message: String) {
        self.entries.push(message)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{}", entry)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_entries() {
        let mut report = Report::new();
        assert!(report.is_empty());
        report.add_issue("2 groups failed".to_string());
        report.add_issue("reloaded barcodes.1.variation".to_string());
        assert_eq!(report.entries().len(), 2);
        assert_eq!(
            report.to_string(),
            "2 groups failed\nreloaded barcodes.1.variation\n"
        );
        let (value, report) = CommandOutput::new(3usize, report).into_parts();
        assert_eq!(value, 3);
        assert!(!report.is_empty());
    }
}
