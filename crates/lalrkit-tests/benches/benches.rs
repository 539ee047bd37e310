use criterion::{criterion_group, criterion_main, Criterion};
use lalrkit::grammar::{examples, Grammar, GrammarDef};
use lalrkit::parser::Parser;
use lalrkit::table;
use lalrkit_tests::{render_reduction, tokens};
use std::hint::black_box;

criterion_main!(benches);
criterion_group!(benches, bench_build, bench_parse);

fn bench_build(c: &mut Criterion) {
    bench_table_gen(c, "arithmetic", examples::arithmetic);
    bench_table_gen(c, "arithmetic_full", examples::arithmetic_full);
    bench_table_gen(c, "with_nullable", examples::with_nullable);
}

fn bench_table_gen(c: &mut Criterion, name: &str, f: impl FnOnce(&mut GrammarDef)) {
    let grammar = Grammar::define(f);
    c.bench_function(name, |b| {
        b.iter(|| {
            let _table = black_box(table::build(&grammar).unwrap());
        });
    });
}

fn bench_parse(c: &mut Criterion) {
    let grammar = Grammar::define(examples::arithmetic);
    let table = table::build(&grammar).unwrap();

    let mut spec = vec![("NUMBER", "1")];
    for _ in 0..256 {
        spec.push(("PLUS", "+"));
        spec.push(("NUMBER", "1"));
    }
    let toks = tokens(&table, &spec);

    c.bench_function("parse_long_sum", |b| {
        b.iter(|| {
            let mut parser = Parser::new(&table, render_reduction);
            let out: String = parser.parse(toks.clone(), "expr").unwrap();
            black_box(out);
        });
    });
}
