use lalrkit::grammar::{examples, Grammar, GrammarDef};
use lalrkit::{lalr, lr0, table};
use tracing_subscriber::EnvFilter;

fn smoketest(f: impl FnOnce(&mut GrammarDef)) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let grammar = Grammar::define(f);
    eprintln!("grammar:\n{}", grammar);
    eprintln!();

    let automaton = lr0::lr0(&grammar);
    eprintln!("automaton:\n{}", automaton.display(&grammar));
    eprintln!();

    let data = lalr::lalr(&grammar, &automaton);
    let table = table::generate(&grammar, &automaton, &data).unwrap();
    eprintln!("table:\n{}", table.display());
}

#[test]
fn smoketest_arithmetic() {
    smoketest(examples::arithmetic);
}

#[test]
fn smoketest_arithmetic_full() {
    smoketest(examples::arithmetic_full);
}

#[test]
fn smoketest_with_nullable() {
    smoketest(examples::with_nullable);
}

#[test]
fn smoketest_dangling_else() {
    smoketest(examples::dangling_else);
}

#[test]
fn smoketest_follow_cycle() {
    smoketest(examples::follow_cycle);
}

#[test]
fn smoketest_optional_tail() {
    smoketest(examples::optional_tail);
}

#[test]
fn smoketest_nullable_start() {
    smoketest(examples::nullable_start);
}

#[test]
fn smoketest_multi_start() {
    smoketest(examples::multi_start);
}
