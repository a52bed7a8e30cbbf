use criterion::{criterion_group, criterion_main, Criterion};
use dnabarcoder::aligner::parse_hit_table;
use dnabarcoder::similarity::SimilarityMatrix;
use dnabarcoder::test_utilities::{random_hits, temp_hit_table};
use dnabarcoder::variation::reduce;

const NUM_SEQUENCES: usize = 300;
const NUM_HITS: usize = 100_000;

fn bench_variation(c: &mut Criterion) {
    // create the benchmark group
    let mut group = c.benchmark_group("variation");

    // create the test data
    let ids: Vec<String> = (0..NUM_SEQUENCES).map(|i| format!("seq{}", i)).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
    let hits = random_hits(&ids, NUM_HITS, 42);
    let hit_table = temp_hit_table(&hits);

    // configure the sample size for the group
    group.sample_size(10);

    group.bench_function("parse_hit_table", |b| {
        b.iter(|| parse_hit_table(hit_table.path()).unwrap().len());
    });

    group.bench_function("matrix_and_reduce", |b| {
        b.iter(|| {
            let matrix = SimilarityMatrix::from_hits(&id_refs, &hits, 400);
            reduce(&matrix)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_variation);
criterion_main!(benches);
