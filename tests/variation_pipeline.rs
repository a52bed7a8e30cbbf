//! End-to-end runs of the variation pipeline with a canned aligner.

use dnabarcoder::{
    commands::{dnabarcoder_variation, VariationOptions},
    prelude::*,
    test_utilities::{barcode_fixture_hits, CannedAligner},
};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn options(out_dir: &Path, positions: Option<Vec<usize>>) -> VariationOptions {
    VariationOptions {
        input: "tests_data/barcodes.fasta".into(),
        classification: "tests_data/classification.tsv".into(),
        out_dir: out_dir.to_path_buf(),
        positions,
        min_coverage: 400,
        max_seq_no: 0,
        plot_type: PlotType::Boxplot,
        seed: None,
        id_column: IdColumn::First,
    }
}

#[test]
fn test_two_group_fixture() {
    let dir = tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let aligner = CannedAligner::new(barcode_fixture_hits());
    let (run, report) = dnabarcoder_variation(&options(&out_dir, Some(vec![1])), &aligner)
        .expect("variation run failed")
        .into_parts();
    assert!(report.is_empty());
    assert_eq!(run.ranks.len(), 1);
    assert!(run.cross_rank_figure.is_none());

    let rank = &run.ranks[0];
    assert_eq!(rank.title, "species");
    assert!(!rank.reloaded);
    assert_eq!(rank.json, out_dir.join("barcodes.1.variation"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&rank.json).unwrap()).unwrap();
    assert_eq!(json["Alpha beta"], serde_json::json!([0.9, 0.8, 3]));
    assert_eq!(json["Gamma delta"], serde_json::json!([0.95, 0.9, 3]));

    let tsv = fs::read_to_string(out_dir.join("barcodes.1.variation.txt")).unwrap();
    let lines: Vec<&str> = tsv.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Taxonname\tMedian similarity score\tMin similarity score\tNumber of sequences",
            "Alpha beta\t0.9\t0.8\t3",
            "Gamma delta\t0.95\t0.9\t3",
        ]
    );

    let svg = fs::read_to_string(out_dir.join("barcodes.1.variation.svg")).unwrap();
    assert!(svg.contains("Median and min. similarity scores of species"));
}

#[test]
fn test_existing_results_are_reloaded() {
    let dir = tempdir().unwrap();
    let aligner = CannedAligner::new(barcode_fixture_hits());
    let first = dnabarcoder_variation(&options(dir.path(), Some(vec![1])), &aligner)
        .unwrap()
        .into_parts()
        .0;

    // tabular output and figures are rewritten from the reloaded results
    fs::remove_file(dir.path().join("barcodes.1.variation.txt")).unwrap();
    let idle = CannedAligner::new(Vec::new());
    let (second, report) = dnabarcoder_variation(&options(dir.path(), Some(vec![1])), &idle)
        .unwrap()
        .into_parts();
    assert!(idle.seen_ids().is_empty());
    assert!(second.ranks[0].reloaded);
    assert_eq!(second.ranks[0].variations, first.ranks[0].variations);
    assert!(report.entries()[0].contains("exists. Please delete the file"));
    assert!(dir.path().join("barcodes.1.variation.txt").exists());
}

#[test]
fn test_all_ranks_and_cross_rank_figure() {
    let dir = tempdir().unwrap();
    let aligner = CannedAligner::new(barcode_fixture_hits());
    let mut opts = options(dir.path(), None);
    opts.plot_type = PlotType::Plot;
    let (run, _) = dnabarcoder_variation(&opts, &aligner).unwrap().into_parts();

    let titles: Vec<&str> = run.ranks.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["species", "genera", "families"]);
    // two groups per rank
    assert_eq!(aligner.seen_ids().len(), 6);

    let genera = &run.ranks[1].variations;
    let alpha = genera.get("Alpha").unwrap();
    assert_eq!((alpha.median, alpha.min, alpha.count), (0.9, 0.8, 3));

    let figure = run.cross_rank_figure.expect("no cross-rank figure");
    assert_eq!(figure, dir.path().join("barcodes.variation.svg"));
    let svg = fs::read_to_string(figure).unwrap();
    assert!(svg.contains("Median similarity scores of all groups"));
    assert!(svg.contains("families. Median"));
}

#[test]
fn test_sampling_cap_and_seed() {
    let dir = tempdir().unwrap();
    let aligner = CannedAligner::new(barcode_fixture_hits());
    let mut opts = options(dir.path(), Some(vec![1]));
    opts.max_seq_no = 2;
    opts.seed = Some(3);
    let (run, _) = dnabarcoder_variation(&opts, &aligner).unwrap().into_parts();
    for (_, record) in run.ranks[0].variations.iter() {
        assert_eq!(record.count, 2);
    }
    assert!(aligner.seen_ids().iter().all(|ids| ids.len() == 2));
}

#[test]
fn test_failed_aligner_is_reported() {
    let dir = tempdir().unwrap();
    let aligner = CannedAligner::failing();
    let (run, report) = dnabarcoder_variation(&options(dir.path(), Some(vec![1])), &aligner)
        .unwrap()
        .into_parts();
    let alpha = run.ranks[0].variations.get("Alpha beta").unwrap();
    assert_eq!((alpha.median, alpha.min, alpha.count), (0.0, 0.0, 3));
    assert!(report.entries()[0].contains("The aligner failed for 2 of 2 species"));
}

#[test]
fn test_configuration_errors_produce_no_output() {
    let dir = tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let aligner = CannedAligner::new(barcode_fixture_hits());

    let result = dnabarcoder_variation(&options(&out_dir, Some(vec![1, 9])), &aligner);
    assert!(matches!(
        result,
        Err(DnaBarcoderError::RankPositionOutOfRange(9, 4))
    ));

    let mut opts = options(&out_dir, Some(vec![1]));
    opts.id_column = IdColumn::Named("accession".to_string());
    assert!(matches!(
        dnabarcoder_variation(&opts, &aligner),
        Err(DnaBarcoderError::MissingIdColumn(_))
    ));

    assert!(!out_dir.exists());
    assert!(aligner.seen_ids().is_empty());
}
