use biorempp::aggregate;
use biorempp::optimize::{optimize_source, GENERAL_COLUMNS};
use biorempp::*;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const CLASSES: [&str; 4] = ["Aromatic", "Metal", "Chlorinated", "Aliphatic"];

fn string_table(name: &str, columns: &[&str], rows: Vec<Vec<String>>) -> Table {
    let schema = Schema::new(
        columns
            .iter()
            .map(|c| (c.to_string(), ColumnType::String, false))
            .collect(),
    );
    let mut table = Table::new(name.to_string(), schema);
    for row in rows {
        table
            .append_values(row.into_iter().map(ColumnValue::String).collect())
            .unwrap();
    }
    table
}

/// Reference set with `kos` codes, three compounds per code
fn references(kos: usize) -> ReferenceSet {
    let ko = |i: usize| format!("K{:05}", i);

    let annotation = (0..kos * 3)
        .map(|i| {
            vec![
                ko(i / 3),
                format!("C{:05}", i % 500),
                CLASSES[i % CLASSES.len()].to_string(),
                format!("compound_{}", i % 500),
                format!("gene_{}", i / 3),
            ]
        })
        .collect();
    let pathway = (0..kos)
        .map(|i| vec![ko(i), format!("pathway_{}", i % 40), format!("gene_{}", i)])
        .collect();
    let degradation = (0..kos)
        .filter(|i| i % 4 != 0)
        .map(|i| vec![format!("gene_{}", i), ko(i), format!("P{}", i % 12), CLASSES[i % 4].to_string()])
        .collect();
    let toxicity = (0..500)
        .map(|i| vec![format!("C{:05}", i), format!("compound_{}", i), format!("label_{}", i % 3)])
        .collect();

    ReferenceSet::from_tables(
        string_table("annotation", &["ko", "cpd", "compoundclass", "compoundname", "genesymbol"], annotation),
        string_table("pathway_map", &["ko", "pathname", "genesymbol"], pathway),
        string_table("degradation_map", &["Gene", "ko", "Pathway", "compound_pathway"], degradation),
        string_table("toxicity", &["cpd", "compoundname", "label_NR_AR"], toxicity),
    )
    .unwrap()
}

fn records(samples: usize, kos: usize) -> Table {
    let rows = (0..samples * kos / 2)
        .map(|i| vec![format!("S{}", i % samples), format!("K{:05}", (i * 7) % kos)])
        .collect();
    string_table("records", &["sample", "ko"], rows)
}

fn bench_build_enriched(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_enriched");
    let plan = JoinPlan::default();

    for size in [100, 1000, 5000].iter() {
        let plain = references(*size);
        let optimized = plain.optimized();
        let base = records(20, *size);
        let optimized_base = optimize(&base, GENERAL_COLUMNS);

        group.bench_with_input(BenchmarkId::new("plain", size), size, |b, _| {
            b.iter(|| {
                build_enriched(
                    black_box(&base),
                    plain.annotation.table(),
                    plain.pathway_map.table(),
                    plain.degradation_map.table(),
                    &plan,
                )
                .unwrap()
            });
        });

        group.bench_with_input(BenchmarkId::new("categorical", size), size, |b, _| {
            b.iter(|| {
                build_enriched(
                    black_box(&optimized_base),
                    optimized.annotation.table(),
                    optimized.pathway_map.table(),
                    optimized.degradation_map.table(),
                    &plan,
                )
                .unwrap()
            });
        });
    }
    group.finish();
}

fn bench_optimize(c: &mut Criterion) {
    let mut group = c.benchmark_group("optimize_annotation");

    for size in [1000, 10000].iter() {
        let set = references(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| optimize_source(black_box(set.annotation.table()), ReferenceSource::Annotation));
        });
    }
    group.finish();
}

fn bench_aggregations(c: &mut Criterion) {
    let set = references(2000).optimized();
    let (enriched, _) = build_enriched(
        &records(50, 2000),
        set.annotation.table(),
        set.pathway_map.table(),
        set.degradation_map.table(),
        &JoinPlan::default(),
    )
    .unwrap();

    c.bench_function("gene_sample_counts", |b| {
        b.iter(|| aggregate::gene_sample_counts(black_box(&enriched)).unwrap())
    });
    c.bench_function("compound_ranking", |b| {
        b.iter(|| aggregate::compound_ranking(black_box(&enriched)).unwrap())
    });
    c.bench_function("ko_per_sample_pathway", |b| {
        b.iter(|| aggregate::ko_per_sample_pathway(black_box(&enriched), "pathway_7").unwrap())
    });
    c.bench_function("cluster_samples", |b| {
        b.iter(|| {
            aggregate::cluster_samples(
                black_box(&enriched),
                aggregate::DistanceMetric::Euclidean,
                aggregate::Linkage::Average,
            )
            .unwrap()
        })
    });
}

criterion_group!(benches, bench_build_enriched, bench_optimize, bench_aggregations);

criterion_main!(benches);
