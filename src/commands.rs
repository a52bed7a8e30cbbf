//! The `select` and `variation` commands.
//!
//! Each command takes a plain options struct and returns a
//! [`CommandOutput`], so runs can be configured without the command line.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{
    aligner::Aligner,
    error::DnaBarcoderError,
    io::{read_fasta, write_fasta, SequenceRecord},
    plot::{cross_rank_figure, rank_figure, write_svg, PlotType},
    reporting::{CommandOutput, Report},
    select::{select_records, LabelSource, SelectionCriteria},
    similarity::MatrixBuilder,
    taxonomy::{rank_plural, Classification, ClassificationTable, IdColumn, Rank, TaxaFilter},
    variation::{group_sequences, VariationComputer, Variations},
};

/// Configuration of [`dnabarcoder_select`].
#[derive(Clone, Debug)]
pub struct SelectOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Classification table; without one, labels are parsed from the FASTA
    /// descriptions.
    pub classification: Option<PathBuf>,
    pub rank: String,
    /// Comma-separated allow-list of taxa; empty to allow every taxon.
    pub taxa: String,
    /// Maximum sequences per taxon, `0` for no limit.
    pub number: usize,
    pub min_length: usize,
    pub id_column: String,
}

/// Select the sequences of the requested taxa and write them to
/// `options.output`. Returns the number of selected sequences.
pub fn dnabarcoder_select(options: &SelectOptions) -> Result<CommandOutput<usize>, DnaBarcoderError> {
    let taxa = TaxaFilter::parse(&options.taxa);

    // resolve the classification before reading any sequences
    let labels = match &options.classification {
        Some(path) => {
            let table = ClassificationTable::from_path(path)?;
            let id_column = IdColumn::Named(options.id_column.clone());
            LabelSource::Table(Classification::load(&table, &options.rank, &id_column, &taxa)?)
        }
        None => {
            let rank = Rank::from_name(&options.rank);
            if rank.is_none() {
                warn!(
                    "'{}' is not a rank of description taxonomies; no sequence will be classified",
                    options.rank
                );
            }
            LabelSource::Description(rank)
        }
    };

    let records = read_fasta(&options.input)?;
    let criteria = SelectionCriteria {
        taxa,
        max_per_group: options.number,
        min_length: options.min_length,
    };
    let selection = select_records(&records, &labels, &criteria);
    info!(
        "selected {} of {} sequences from {} taxa",
        selection.len(),
        records.len(),
        selection.group_counts.len()
    );
    write_fasta(&options.output, selection.records.iter())?;

    let mut report = Report::new();
    if selection.is_empty() {
        report.add_issue("No sequences are selected.".to_string());
    }
    Ok(CommandOutput::new(selection.len(), report))
}

/// Configuration of [`dnabarcoder_variation`].
#[derive(Clone, Debug)]
pub struct VariationOptions {
    pub input: PathBuf,
    pub classification: PathBuf,
    pub out_dir: PathBuf,
    /// Classification column positions; every column but the identifier
    /// column when `None`.
    pub positions: Option<Vec<usize>>,
    pub min_coverage: u32,
    /// Maximum sequences aligned per group, `0` for no limit.
    pub max_seq_no: usize,
    pub plot_type: PlotType,
    pub seed: Option<u64>,
    pub id_column: IdColumn,
}

/// The output files and results of one rank.
#[derive(Clone, Debug)]
pub struct RankOutput {
    pub position: usize,
    /// The rank name as used in figure titles.
    pub title: String,
    pub json: PathBuf,
    pub tsv: PathBuf,
    pub figure: PathBuf,
    pub variations: Variations,
    /// Whether the results were reloaded from an existing JSON file.
    pub reloaded: bool,
}

/// The outputs of a variation run.
#[derive(Clone, Debug, Default)]
pub struct VariationRun {
    pub ranks: Vec<RankOutput>,
    /// The cross-rank figure, written when more than one rank was computed.
    pub cross_rank_figure: Option<PathBuf>,
}

/// The base name of output files: the input file name without its last
/// extension.
pub fn output_base(input: &Path) -> Result<String, DnaBarcoderError> {
    input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| DnaBarcoderError::InvalidSequenceFilename(input.to_path_buf()))
}

/// Title of a rank in figures: the plural rank name, or the column position
/// for a column without a header.
pub fn rank_title(column_name: &str, position: usize) -> String {
    if column_name.is_empty() {
        format!("groups at position {}", position)
    } else {
        rank_plural(column_name)
    }
}

/// Compute the variation of every taxon at each requested classification
/// position, writing JSON, TSV and figure outputs to `options.out_dir`.
///
/// Existing JSON outputs are reloaded rather than recomputed. All positions
/// are checked against the classification before anything is written.
pub fn dnabarcoder_variation<A: Aligner>(
    options: &VariationOptions,
    aligner: &A,
) -> Result<CommandOutput<VariationRun>, DnaBarcoderError> {
    let table = ClassificationTable::from_path(&options.classification)?;
    let id_position = table.id_position(&options.id_column)?;
    let positions = match &options.positions {
        Some(positions) => positions.clone(),
        None => (0..table.header().len())
            .filter(|&pos| pos != id_position)
            .collect(),
    };
    let mut titles = Vec::with_capacity(positions.len());
    for &position in &positions {
        titles.push(rank_title(table.column_name(position)?, position));
    }
    let base = output_base(&options.input)?;
    fs::create_dir_all(&options.out_dir)?;

    let mut report = Report::new();
    let mut records: Option<Vec<SequenceRecord>> = None;
    let builder = MatrixBuilder::new(aligner, options.min_coverage);
    let mut computer = VariationComputer::new(builder, options.max_seq_no, options.seed);
    let mut run = VariationRun::default();

    for (&position, title) in positions.iter().zip(titles) {
        let json = options
            .out_dir
            .join(format!("{}.{}.variation", base, position));
        let tsv = options
            .out_dir
            .join(format!("{}.{}.variation.txt", base, position));
        let figure = options
            .out_dir
            .join(format!("{}.{}.variation.svg", base, position));

        let reloaded = json.exists();
        let variations = if reloaded {
            report.add_issue(format!(
                "The variation file {} exists. Please delete the file if you wish to recalculate the variation.",
                json.display()
            ));
            Variations::from_json(&json)?
        } else {
            if records.is_none() {
                records = Some(read_fasta(&options.input)?);
            }
            let sequences = records.as_deref().unwrap_or_default();
            let classification =
                Classification::at_position(&table, id_position, position, &TaxaFilter::default());
            let groups = group_sequences(sequences, &classification);
            info!(
                "computing the variation of {} {} at position {}",
                groups.len(),
                title,
                position
            );
            let result = computer.compute_rank(&groups)?;
            if !result.failed_groups.is_empty() {
                report.add_issue(format!(
                    "The aligner failed for {} of {} {}: {}",
                    result.failed_groups.len(),
                    result.variations.len(),
                    title,
                    result.failed_groups.join(", ")
                ));
            }
            result.variations.to_json(&json)?;
            result.variations
        };

        variations.to_tsv(&tsv)?;
        write_svg(&figure, &rank_figure(&variations, &title, options.plot_type))?;
        info!(
            "the variations are saved in {} and {}, the figure in {}",
            json.display(),
            tsv.display(),
            figure.display()
        );
        run.ranks.push(RankOutput {
            position,
            title,
            json,
            tsv,
            figure,
            variations,
            reloaded,
        });
    }

    if run.ranks.len() > 1 {
        let figure = options.out_dir.join(format!("{}.variation.svg", base));
        let ranks: Vec<(&str, &Variations)> = run
            .ranks
            .iter()
            .map(|rank| (rank.title.as_str(), &rank.variations))
            .collect();
        write_svg(&figure, &cross_rank_figure(&ranks, options.plot_type))?;
        run.cross_rank_figure = Some(figure);
    }
    Ok(CommandOutput::new(run, report))
}
