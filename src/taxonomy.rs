//! Taxonomic classification: classification tables, taxon allow-lists, and
//! taxonomy strings embedded in FASTA descriptions.
//!
//! A classification table is a tab-separated file with a header row. One
//! column holds sequence identifiers; every other column is a rank (e.g.
//! `species`, `genus`, `family`) holding the taxon name of each sequence.
//!
//! ```text
//! ID      species         genus   family
//! seq1    Alpha beta      Alpha   Alphaceae
//! seq2    unidentified    Alpha   Alphaceae
//! ```

use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

use crate::error::DnaBarcoderError;
use crate::io::tsv::{build_tsv_reader, column};

/// The label used for sequences without a classification at some rank.
pub const UNIDENTIFIED: &str = "unidentified";

/// Whether a label carries no classification: empty or `unidentified`.
pub fn is_unidentified(label: &str) -> bool {
    label.is_empty() || label.eq_ignore_ascii_case(UNIDENTIFIED)
}

/// The standard Linnaean ranks understood in FASTA description taxonomy strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rank {
    Kingdom,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species,
}

impl Rank {
    /// Look up a rank by name, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "kingdom" => Some(Rank::Kingdom),
            "phylum" => Some(Rank::Phylum),
            "class" => Some(Rank::Class),
            "order" => Some(Rank::Order),
            "family" => Some(Rank::Family),
            "genus" => Some(Rank::Genus),
            "species" => Some(Rank::Species),
            _ => None,
        }
    }

    /// The taxonomy-string prefix for this rank, e.g. `f__` for family.
    pub fn prefix(&self) -> &'static str {
        match self {
            Rank::Kingdom => "k__",
            Rank::Phylum => "p__",
            Rank::Class => "c__",
            Rank::Order => "o__",
            Rank::Family => "f__",
            Rank::Genus => "g__",
            Rank::Species => "s__",
        }
    }

    const ALL: [Rank; 7] = [
        Rank::Kingdom,
        Rank::Phylum,
        Rank::Class,
        Rank::Order,
        Rank::Family,
        Rank::Genus,
        Rank::Species,
    ];
}

/// Plural form of a rank column name, for figure titles.
///
/// Column names that are not a known rank are returned unchanged.
pub fn rank_plural(name: &str) -> String {
    match Rank::from_name(name) {
        Some(Rank::Kingdom) => "kingdoms".to_string(),
        Some(Rank::Phylum) => "phyla".to_string(),
        Some(Rank::Class) => "classes".to_string(),
        Some(Rank::Order) => "orders".to_string(),
        Some(Rank::Family) => "families".to_string(),
        Some(Rank::Genus) => "genera".to_string(),
        Some(Rank::Species) => "species".to_string(),
        None => name.to_string(),
    }
}

/// Taxon names parsed from a `k__Fungi;p__...;s__Genus_species` style
/// taxonomy string.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DescriptionTaxonomy {
    names: IndexMap<Rank, String>,
}

impl DescriptionTaxonomy {
    /// Parse the taxonomy embedded in a FASTA description.
    ///
    /// Only the first whitespace-delimited token of the description is
    /// considered. Tokens are split on `|` and `;`, and must start with a rank
    /// prefix. A species name must have at least two words (joined by a space
    /// or underscore); underscores become spaces.
    pub fn parse(description: &str) -> Self {
        let mut names = IndexMap::new();
        let taxonomy = description.split_whitespace().next().unwrap_or("");
        for token in taxonomy.split(['|', ';']) {
            let token = token.trim_end();
            for rank in Rank::ALL {
                let Some(name) = token.strip_prefix(rank.prefix()) else {
                    continue;
                };
                if rank == Rank::Species {
                    if name.contains(' ') || name.contains('_') {
                        names.insert(rank, name.replace('_', " "));
                    }
                } else {
                    names.insert(rank, name.to_string());
                }
            }
        }
        Self { names }
    }

    /// The taxon name at `rank`, or `""` when absent or unidentified.
    pub fn name(&self, rank: Rank) -> &str {
        match self.names.get(&rank) {
            Some(name) if !is_unidentified(name) => name,
            _ => "",
        }
    }
}

/// An allow-list of taxon names, parsed from a comma-separated string.
///
/// Empty entries and `unidentified` are dropped. An empty list allows every
/// classified taxon.
#[derive(Clone, Debug, Default)]
pub struct TaxaFilter {
    taxa: HashSet<String>,
}

impl TaxaFilter {
    pub fn parse(taxa: &str) -> Self {
        let taxa = taxa
            .split(',')
            .map(str::trim)
            .filter(|taxon| !is_unidentified(taxon))
            .map(String::from)
            .collect();
        Self { taxa }
    }

    pub fn is_empty(&self) -> bool {
        self.taxa.is_empty()
    }

    /// Whether `label` passes the filter. Matching is case-sensitive.
    pub fn allows(&self, label: &str) -> bool {
        self.taxa.is_empty() || self.taxa.contains(label)
    }
}

/// How to locate the sequence identifier column of a classification table.
#[derive(Clone, Debug, PartialEq)]
pub enum IdColumn {
    /// A column whose header matches this name, ignoring case.
    Named(String),
    /// The first column, whatever its header.
    First,
}

/// A tab-separated classification table, loaded in full.
#[derive(Clone, Debug)]
pub struct ClassificationTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ClassificationTable {
    /// Load a (possibly gzipped) classification table. The first line is the
    /// header.
    pub fn from_path(filepath: impl AsRef<Path>) -> Result<Self, DnaBarcoderError> {
        let filepath = filepath.as_ref();
        let mut reader = build_tsv_reader(filepath, false)?;
        let mut records = reader.records();

        let header: Vec<String> = match records.next() {
            Some(record) => record?.iter().map(|s| s.trim_end().to_string()).collect(),
            None => {
                return Err(DnaBarcoderError::InvalidClassificationFile(format!(
                    "'{}' is empty",
                    filepath.display()
                )))
            }
        };

        let mut rows = Vec::new();
        for result in records {
            let record = result?;
            let row: Vec<String> = (0..record.len())
                .map(|i| column(&record, i).to_string())
                .collect();
            if row.iter().all(|value| value.is_empty()) {
                continue;
            }
            rows.push(row);
        }
        debug!(
            "loaded {} classification rows with {} columns from {}",
            rows.len(),
            header.len(),
            filepath.display()
        );
        Ok(Self { header, rows })
    }

    /// The column names, in file order.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Resolve the identifier column position.
    pub fn id_position(&self, id_column: &IdColumn) -> Result<usize, DnaBarcoderError> {
        match id_column {
            IdColumn::First => Ok(0),
            IdColumn::Named(name) => self
                .header
                .iter()
                .position(|column| column.eq_ignore_ascii_case(name))
                .ok_or_else(|| DnaBarcoderError::MissingIdColumn(name.clone())),
        }
    }

    /// Resolve a rank column by exact name.
    pub fn rank_position(&self, rank: &str) -> Result<usize, DnaBarcoderError> {
        self.header
            .iter()
            .position(|column| column == rank)
            .ok_or_else(|| DnaBarcoderError::MissingRankColumn(rank.to_string()))
    }

    /// The name of the column at `position`, checked against the header width.
    pub fn column_name(&self, position: usize) -> Result<&str, DnaBarcoderError> {
        self.header
            .get(position)
            .map(String::as_str)
            .ok_or(DnaBarcoderError::RankPositionOutOfRange(
                position,
                self.header.len(),
            ))
    }

    /// Map each identifier to its label in the `rank_position` column.
    ///
    /// Unidentified labels and rows too short to hold the rank are skipped. A
    /// leading `>` on identifiers is removed. If an identifier appears more
    /// than once, its first label is kept.
    pub fn labels(
        &self,
        id_position: usize,
        rank_position: usize,
        taxa: &TaxaFilter,
    ) -> IndexMap<String, String> {
        let mut labels = IndexMap::new();
        for row in &self.rows {
            let Some(id) = row.get(id_position) else {
                continue;
            };
            let id = id.trim_start_matches('>').trim();
            let label = row.get(rank_position).map_or("", String::as_str);
            if id.is_empty() || is_unidentified(label) || !taxa.allows(label) {
                continue;
            }
            labels
                .entry(id.to_string())
                .or_insert_with(|| label.to_string());
        }
        labels
    }
}

/// The outcome of the classification loader: identifier to taxon label at a
/// single rank. Identifiers that are absent are unclassified.
#[derive(Clone, Debug)]
pub struct Classification {
    pub rank: String,
    labels: IndexMap<String, String>,
}

impl Classification {
    /// Resolve the identifier and rank columns of `table`, then load the
    /// labels of all classified identifiers allowed by `taxa`.
    ///
    /// Fails before reading any rows if either column cannot be resolved.
    pub fn load(
        table: &ClassificationTable,
        rank: &str,
        id_column: &IdColumn,
        taxa: &TaxaFilter,
    ) -> Result<Self, DnaBarcoderError> {
        let id_position = table.id_position(id_column)?;
        let rank_position = table.rank_position(rank)?;
        Ok(Self::at_position(table, id_position, rank_position, taxa))
    }

    /// Load labels from an already-resolved column position.
    pub fn at_position(
        table: &ClassificationTable,
        id_position: usize,
        rank_position: usize,
        taxa: &TaxaFilter,
    ) -> Self {
        let rank = table
            .header()
            .get(rank_position)
            .cloned()
            .unwrap_or_default();
        let labels = table.labels(id_position, rank_position, taxa);
        Self { rank, labels }
    }

    /// The label of `id`, if classified.
    pub fn label(&self, id: &str) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    /// Number of classified identifiers.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterate over `(identifier, label)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(id, label)| (id.as_str(), label.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::OutputFile;
    use std::io::Write;

    fn table() -> ClassificationTable {
        ClassificationTable::from_path("tests_data/classification.tsv")
            .expect("could not load classification")
    }

    #[test]
    fn test_description_taxonomy() {
        let taxonomy =
            DescriptionTaxonomy::parse("k__Fungi;p__Ascomycota;f__Alphaceae;g__Alpha;s__Alpha_beta");
        assert_eq!(taxonomy.name(Rank::Kingdom), "Fungi");
        assert_eq!(taxonomy.name(Rank::Phylum), "Ascomycota");
        assert_eq!(taxonomy.name(Rank::Family), "Alphaceae");
        assert_eq!(taxonomy.name(Rank::Genus), "Alpha");
        assert_eq!(taxonomy.name(Rank::Species), "Alpha beta");
        assert_eq!(taxonomy.name(Rank::Order), "");
    }

    #[test]
    fn test_description_taxonomy_pipes_and_trailing_text() {
        let taxonomy = DescriptionTaxonomy::parse("SH01|k__Fungi;o__Helotiales|ref more text");
        assert_eq!(taxonomy.name(Rank::Order), "Helotiales");
        assert_eq!(taxonomy.name(Rank::Kingdom), "Fungi");
    }

    #[test]
    fn test_species_requires_two_words() {
        let taxonomy = DescriptionTaxonomy::parse("g__Alpha;s__Alpha");
        assert_eq!(taxonomy.name(Rank::Species), "");
        assert_eq!(taxonomy.name(Rank::Genus), "Alpha");
    }

    #[test]
    fn test_unidentified_description_taxon() {
        let taxonomy = DescriptionTaxonomy::parse("k__Fungi;f__unidentified");
        assert_eq!(taxonomy.name(Rank::Family), "");
    }

    #[test]
    fn test_rank_names() {
        assert_eq!(Rank::from_name("Species"), Some(Rank::Species));
        assert_eq!(Rank::from_name("GENUS"), Some(Rank::Genus));
        assert_eq!(Rank::from_name("strain"), None);
        assert_eq!(rank_plural("family"), "families");
        assert_eq!(rank_plural("phylum"), "phyla");
        assert_eq!(rank_plural("clade"), "clade");
    }

    #[test]
    fn test_taxa_filter() {
        let filter = TaxaFilter::parse("Alpha beta,,unidentified,Gamma delta");
        assert!(!filter.is_empty());
        assert!(filter.allows("Alpha beta"));
        assert!(filter.allows("Gamma delta"));
        assert!(!filter.allows("alpha beta"));
        assert!(TaxaFilter::parse("").is_empty());
        assert!(TaxaFilter::parse("unidentified").allows("anything"));
    }

    #[test]
    fn test_id_column_case_insensitive() {
        let table = table();
        assert_eq!(table.id_position(&IdColumn::Named("id".to_string())).unwrap(), 0);
        assert_eq!(table.id_position(&IdColumn::First).unwrap(), 0);
        assert!(matches!(
            table.id_position(&IdColumn::Named("accession".to_string())),
            Err(DnaBarcoderError::MissingIdColumn(_))
        ));
    }

    #[test]
    fn test_missing_rank_column() {
        let table = table();
        let result = Classification::load(
            &table,
            "strain",
            &IdColumn::Named("ID".to_string()),
            &TaxaFilter::default(),
        );
        assert!(matches!(result, Err(DnaBarcoderError::MissingRankColumn(rank)) if rank == "strain"));
        assert!(matches!(
            table.column_name(42),
            Err(DnaBarcoderError::RankPositionOutOfRange(42, 4))
        ));
    }

    #[test]
    fn test_load_species() {
        let table = table();
        let classification = Classification::load(
            &table,
            "species",
            &IdColumn::Named("ID".to_string()),
            &TaxaFilter::default(),
        )
        .unwrap();
        assert_eq!(classification.rank, "species");
        assert_eq!(classification.label("A1"), Some("Alpha beta"));
        assert_eq!(classification.label("B3"), Some("Gamma delta"));
        // unidentified and empty labels are unclassified
        assert_eq!(classification.label("U1"), None);
        assert_eq!(classification.label("U2"), None);
        // ragged row
        assert_eq!(classification.label("R1"), None);
        // the header is not data
        assert_eq!(classification.label("ID"), None);
    }

    #[test]
    fn test_load_with_allow_list() {
        let table = table();
        let classification = Classification::load(
            &table,
            "species",
            &IdColumn::Named("ID".to_string()),
            &TaxaFilter::parse("Gamma delta"),
        )
        .unwrap();
        assert_eq!(classification.len(), 3);
        assert!(classification.iter().all(|(_, label)| label == "Gamma delta"));
    }

    fn check_messy_table(path: &Path) {
        let table = ClassificationTable::from_path(path).unwrap();
        assert_eq!(table.header().to_vec(), vec!["ID", "", "genus"]);
        // blank and all-empty lines are not rows
        assert_eq!(table.len(), 2);
        assert_eq!(table.column_name(1).unwrap(), "");

        let genus = Classification::at_position(&table, 0, 2, &TaxaFilter::default());
        assert_eq!(genus.label("A1"), Some("Alpha"));
        assert_eq!(genus.label(">A1"), None);
        assert_eq!(genus.label("A2"), Some("Alpha"));

        let unnamed = Classification::at_position(&table, 0, 1, &TaxaFilter::default());
        assert_eq!(unnamed.label("A1"), Some("x"));
        assert_eq!(unnamed.label("A2"), None);
    }

    #[test]
    fn test_crlf_blank_lines_and_prefixed_ids() {
        let contents = "ID\t\tgenus\r\n>A1\tx\tAlpha \r\n\r\n\t\t\r\nA2\tunidentified\tAlpha\r\n";
        let dir = tempfile::tempdir().unwrap();

        let plain = dir.path().join("classification.tsv");
        std::fs::write(&plain, contents).unwrap();
        check_messy_table(&plain);

        let gzipped = dir.path().join("classification.tsv.gz");
        {
            let mut writer = OutputFile::new(&gzipped).writer().unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        check_messy_table(&gzipped);
    }

    #[test]
    fn test_first_label_wins() {
        let table = table();
        let classification = Classification::at_position(&table, 0, 2, &TaxaFilter::default());
        assert_eq!(classification.rank, "genus");
        // D1 appears twice; the first genus is kept
        assert_eq!(classification.label("D1"), Some("Alpha"));
    }
}
