//! Parse-path benchmarks: tokenizer throughput and full tree assembly.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gedkit::tokenizer::{Token, Tokenizer};
use gedkit::Gedcom;

/// Generates a synthetic file with `families` family units of two
/// parents and two children each.
fn synthetic_gedcom(families: usize) -> String {
    let mut out = String::from("0 HEAD\n1 GEDC\n2 VERS 5.5.1\n1 CHAR UTF-8\n");
    for f in 0..families {
        let base = f * 4;
        for (offset, (given, sex)) in [("Adam", "M"), ("Ann", "F"), ("Ben", "M"), ("Bea", "F")]
            .into_iter()
            .enumerate()
        {
            let id = base + offset;
            out.push_str(&format!(
                "0 @I{id}@ INDI\n1 NAME {given}{f} /Fam{f}/\n1 SEX {sex}\n1 BIRT\n2 DATE {} \
                 JAN {}\n2 PLAC Town{}, County, Country\n",
                1 + offset,
                1800 + (f % 150),
                f % 97,
            ));
            if offset < 2 {
                out.push_str(&format!("1 FAMS @F{f}@\n"));
            } else {
                out.push_str(&format!("1 FAMC @F{f}@\n"));
            }
        }
        out.push_str(&format!(
            "0 @F{f}@ FAM\n1 HUSB @I{}@\n1 WIFE @I{}@\n1 CHIL @I{}@\n1 CHIL @I{}@\n",
            base,
            base + 1,
            base + 2,
            base + 3
        ));
    }
    out.push_str("0 TRLR\n");
    out
}

fn bench_tokenizer(c: &mut Criterion) {
    let source = synthetic_gedcom(500);
    let mut group = c.benchmark_group("tokenizer");
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("tokenize_500_families", |b| {
        b.iter(|| {
            let mut tokenizer = Tokenizer::new(source.chars());
            tokenizer.next_token().unwrap();
            let mut count = 0usize;
            while !tokenizer.done() {
                if let Token::Tag(_) = tokenizer.current_token {
                    count += 1;
                }
                tokenizer.next_token().unwrap();
            }
            count
        });
    });
    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for families in [100usize, 1000] {
        let source = synthetic_gedcom(families);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("full_tree", families),
            &source,
            |b, source| b.iter(|| Gedcom::parse_str(source).unwrap()),
        );
    }
    group.finish();
}

criterion_group!(benches, bench_tokenizer, bench_parse);
criterion_main!(benches);
