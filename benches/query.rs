//! Query-path benchmarks: traversals, filters, and duplicate blocking.

use criterion::{criterion_group, criterion_main, Criterion};
use gedkit::dedup::{DedupConfig, DuplicateDetector};
use gedkit::{Gedcom, Graph, QueryEngine};

/// A chain of `generations` families, each child parenting the next.
fn pedigree(generations: usize) -> String {
    let mut out = String::from("0 HEAD\n1 GEDC\n2 VERS 5.5.1\n");
    for g in 0..=generations {
        out.push_str(&format!(
            "0 @I{g}@ INDI\n1 NAME Person{g} /Chain/\n1 BIRT\n2 DATE {}\n",
            1700 + g
        ));
        if g > 0 {
            out.push_str(&format!("1 FAMC @F{}@\n", g - 1));
        }
        if g < generations {
            out.push_str(&format!("1 FAMS @F{g}@\n"));
        }
    }
    for g in 0..generations {
        out.push_str(&format!("0 @F{g}@ FAM\n1 HUSB @I{g}@\n1 CHIL @I{}@\n", g + 1));
    }
    out.push_str("0 TRLR\n");
    out
}

fn bench_ancestors(c: &mut Criterion) {
    let tree = Gedcom::parse_str(&pedigree(200)).unwrap();
    let graph = Graph::build(&tree).unwrap();

    c.bench_function("ancestors_200_generations", |b| {
        b.iter(|| {
            // A fresh engine per iteration defeats the result cache.
            let engine = QueryEngine::new(&graph);
            engine.ancestors("@I200@", None).unwrap().len()
        });
    });
}

fn bench_filter(c: &mut Criterion) {
    let mut source = String::from("0 HEAD\n");
    for i in 0..2000 {
        source.push_str(&format!(
            "0 @I{i}@ INDI\n1 NAME Given{i} /Surname{}/\n1 BIRT\n2 DATE {}\n",
            i % 40,
            1700 + (i % 200)
        ));
    }
    source.push_str("0 TRLR\n");
    let tree = Gedcom::parse_str(&source).unwrap();
    let graph = Graph::build(&tree).unwrap();
    let engine = QueryEngine::new(&graph);

    c.bench_function("filter_surname_and_year_range", |b| {
        b.iter(|| {
            engine
                .filter()
                .by_surname("surname7")
                .by_birth_year_range(1700, 1780)
                .execute()
                .unwrap()
                .len()
        });
    });
}

fn bench_duplicates(c: &mut Criterion) {
    let mut source = String::from("0 HEAD\n");
    for i in 0..1000 {
        source.push_str(&format!(
            "0 @I{i}@ INDI\n1 NAME Given{} /Surname{}/\n1 BIRT\n2 DATE {}\n",
            i % 120,
            i % 40,
            1700 + (i % 200)
        ));
    }
    source.push_str("0 TRLR\n");
    let tree = Gedcom::parse_str(&source).unwrap();
    let graph = Graph::build(&tree).unwrap();

    c.bench_function("duplicates_1000_people", |b| {
        let detector = DuplicateDetector::new(DedupConfig {
            parallel: false,
            ..DedupConfig::default()
        });
        b.iter(|| detector.find_duplicates(&graph, None).unwrap().matches.len());
    });
}

criterion_group!(benches, bench_ancestors, bench_filter, bench_duplicates);
criterion_main!(benches);
