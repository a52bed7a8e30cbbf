//! Selection of sequences by taxon.
//!
//! Each record is resolved to a taxon label, either from a classification
//! table or from the taxonomy string in its FASTA description. Records are
//! kept when the label is classified, passes the [`TaxaFilter`], and the
//! sequence is long enough. An optional cap limits how many records are
//! kept per label.

use indexmap::IndexMap;
use tracing::debug;

use crate::io::SequenceRecord;
use crate::taxonomy::{is_unidentified, Classification, DescriptionTaxonomy, Rank, TaxaFilter};

/// Where taxon labels come from.
#[derive(Clone, Debug)]
pub enum LabelSource {
    /// Labels loaded from a classification table.
    Table(Classification),
    /// Labels parsed from the description at a rank; `None` if the rank name
    /// is not a known rank, in which case nothing is classified.
    Description(Option<Rank>),
}

impl LabelSource {
    /// Resolve the label of a record, or `""` if unclassified.
    pub fn label(&self, record: &SequenceRecord) -> String {
        match self {
            LabelSource::Table(classification) => classification
                .label(&record.id)
                .unwrap_or_default()
                .to_string(),
            LabelSource::Description(None) => String::new(),
            LabelSource::Description(Some(rank)) => {
                let taxonomy = if record.description.is_empty() {
                    DescriptionTaxonomy::parse(&record.id)
                } else {
                    DescriptionTaxonomy::parse(&record.description)
                };
                taxonomy.name(*rank).to_string()
            }
        }
    }
}

/// Selection criteria.
#[derive(Clone, Debug, Default)]
pub struct SelectionCriteria {
    pub taxa: TaxaFilter,
    /// Maximum records per label; `0` for no limit.
    pub max_per_group: usize,
    /// Minimum sequence length, inclusive.
    pub min_length: usize,
}

/// The records chosen by [`select_records`], in input order, and how many
/// were chosen per label.
#[derive(Clone, Debug, Default)]
pub struct Selection {
    pub records: Vec<SequenceRecord>,
    pub group_counts: IndexMap<String, usize>,
}

impl Selection {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Select records whose label is classified, allowed, and long enough,
/// keeping at most `max_per_group` per label when that is non-zero.
pub fn select_records<'a, I>(
    records: I,
    labels: &LabelSource,
    criteria: &SelectionCriteria,
) -> Selection
where
    I: IntoIterator<Item = &'a SequenceRecord>,
{
    let mut selection = Selection::default();
    for record in records {
        let label = labels.label(record);
        if is_unidentified(&label) || !criteria.taxa.allows(&label) {
            continue;
        }
        if record.len() < criteria.min_length {
            debug!("{} is too short ({} < {})", record.id, record.len(), criteria.min_length);
            continue;
        }
        let count = selection.group_counts.entry(label).or_insert(0);
        if criteria.max_per_group > 0 && *count >= criteria.max_per_group {
            continue;
        }
        *count += 1;
        selection.records.push(record.clone());
    }
    selection
}
