use std::path::PathBuf;

use clap::{Parser, Subcommand};
use dnabarcoder::{
    aligner::BlastAligner,
    commands::{dnabarcoder_select, dnabarcoder_variation, SelectOptions, VariationOptions},
    prelude::*,
    reporting::Report,
    taxonomy::IdColumn,
};
use tracing_subscriber::EnvFilter;

const INFO: &str = "\
dnabarcoder: selection of barcode sequences and intra-taxon sequence variation
usage: dnabarcoder [--help] <subcommand>

Subcommands:

  select:     select the sequences of given taxa from a FASTA file.
  variation:  compute the median and minimum similarity within each taxon.

";

#[derive(Parser)]
#[clap(name = "dnabarcoder")]
#[clap(about = INFO)]
struct Cli {
    /// increase log verbosity (-d info, -dd debug, -ddd trace); RUST_LOG
    /// takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    debug: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Select sequences by taxon, group size, and length.
    Select {
        /// the FASTA file
        #[arg(short, long, required = true)]
        input: PathBuf,

        /// the FASTA output file containing the sequences of the given taxa
        #[arg(short, long, required = true)]
        out: PathBuf,

        /// the classification file in tab. format (taxa are read from the
        /// FASTA descriptions if not given)
        #[arg(short, long)]
        classification: Option<PathBuf>,

        /// the classification rank for the selection
        #[arg(long, alias = "classificationrank", required = true)]
        rank: String,

        /// the taxa for the selection, separated by ","
        #[arg(short, long, default_value = "")]
        taxa: String,

        /// the maximum number of sequences to be selected per taxon (0 for no limit)
        #[arg(short, long, default_value_t = 0)]
        number: usize,

        /// the required minimum sequence length
        #[arg(short, long, default_value_t = 0)]
        length: usize,

        /// the column name of sequence ids in the classification file
        #[arg(long, default_value = "ID")]
        idcolumnname: String,
    },
    /// Compute the similarity variation of the taxa at one or more ranks.
    Variation {
        /// the FASTA file of reference sequences
        #[arg(short, long, required = true)]
        input: PathBuf,

        /// the classification file in tab. format
        #[arg(short, long, required = true)]
        classification: PathBuf,

        /// the output folder
        #[arg(short, long, default_value = "dnabarcoder")]
        out: PathBuf,

        /// the classification positions to compute, separated by "," (all
        /// columns but the id column if not given)
        #[arg(short = 'p', long, value_delimiter = ',')]
        classificationpos: Option<Vec<usize>>,

        /// minimum alignment length; shorter alignments are penalized. For
        /// short barcodes such as ITS2 this should probably be 100
        #[arg(long, default_value_t = 400)]
        mincoverage: u32,

        /// the maximum number of randomly selected sequences per taxon (0 for no limit)
        #[arg(short, long, default_value_t = 0)]
        maxseqno: usize,

        /// the type of plots: boxplot or plot
        #[arg(long, default_value = "boxplot")]
        plottype: String,

        /// seed for the random selection of sequences
        #[arg(long)]
        seed: Option<u64>,

        /// the column name of sequence ids in the classification file (the
        /// first column if not given)
        #[arg(long)]
        idcolumnname: Option<String>,

        /// path to the blastn executable
        #[arg(long, env = "DNABARCODER_BLASTN", default_value = "blastn")]
        blastn: PathBuf,

        /// path to the makeblastdb executable
        #[arg(long, env = "DNABARCODER_MAKEBLASTDB", default_value = "makeblastdb")]
        makeblastdb: PathBuf,
    },
}

fn init_logging(debug: u8) {
    let level = match debug {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}

fn print_report(report: &Report) {
    for entry in report.entries() {
        println!("{}", entry);
    }
}

fn run() -> Result<(), DnaBarcoderError> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match &cli.command {
        Some(Commands::Select {
            input,
            out,
            classification,
            rank,
            taxa,
            number,
            length,
            idcolumnname,
        }) => {
            let options = SelectOptions {
                input: input.clone(),
                output: out.clone(),
                classification: classification.clone(),
                rank: rank.clone(),
                taxa: taxa.clone(),
                number: *number,
                min_length: *length,
                id_column: idcolumnname.clone(),
            };
            let (selected, report) = dnabarcoder_select(&options)?.into_parts();
            if selected > 0 {
                println!(
                    "{} sequences are selected and saved in {}.",
                    selected,
                    out.display()
                );
            }
            print_report(&report);
        }
        Some(Commands::Variation {
            input,
            classification,
            out,
            classificationpos,
            mincoverage,
            maxseqno,
            plottype,
            seed,
            idcolumnname,
            blastn,
            makeblastdb,
        }) => {
            let options = VariationOptions {
                input: input.clone(),
                classification: classification.clone(),
                out_dir: out.clone(),
                positions: classificationpos.clone(),
                min_coverage: *mincoverage,
                max_seq_no: *maxseqno,
                plot_type: plottype.parse()?,
                seed: *seed,
                id_column: idcolumnname
                    .clone()
                    .map_or(IdColumn::First, IdColumn::Named),
            };
            let aligner = BlastAligner::new(makeblastdb, blastn, *mincoverage);
            let (run, report) = dnabarcoder_variation(&options, &aligner)?.into_parts();
            print_report(&report);
            for rank in &run.ranks {
                println!(
                    "The variations are saved in the json file {} and tab file {}. The figure is saved in {}.",
                    rank.json.display(),
                    rank.tsv.display(),
                    rank.figure.display()
                );
            }
            if let Some(figure) = &run.cross_rank_figure {
                println!(
                    "The variations of all ranks are compared in the figure {}.",
                    figure.display()
                );
            }
        }
        None => {
            println!("{}\n", INFO);
            std::process::exit(1);
        }
    }
    Ok(())
}

fn main() {
    match run() {
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
