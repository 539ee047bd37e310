use lalrkit::grammar::{examples, Grammar, TerminalSet};
use lalrkit::lalr::lalr;
use lalrkit::lr0::lr0;
use lalrkit::parser::Parser;
use lalrkit::table::{build, generate, Action, GrammarError, ParseTable};
use lalrkit_tests::{render_reduction, tokens};

#[test]
fn rebuilding_yields_an_identical_table() {
    let first = build(&Grammar::define(examples::arithmetic_full)).unwrap();
    let second = build(&Grammar::define(examples::arithmetic_full)).unwrap();

    assert_eq!(first, second);
    // Bit-identical on the wire, not merely equivalent.
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap(),
    );
}

#[test]
fn shift_wins_over_reduce() {
    let table = build(&Grammar::define(examples::dangling_else)).unwrap();

    assert!(!table.conflicts.is_empty());
    for conflict in &table.conflicts {
        let action = table.states[&conflict.state].actions[&conflict.terminal];
        assert!(matches!(action, Action::Shift(_)));
    }
}

#[test]
fn reduce_reduce_is_fatal() {
    let err = build(&Grammar::define(examples::reduce_reduce)).unwrap_err();

    let GrammarError::ReduceReduce { conflicts } = err;
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].terminal, "C");
    assert_eq!(conflicts[0].rules.len(), 2);

    let message = GrammarError::ReduceReduce { conflicts }.to_string();
    assert!(message.contains("a -> X"));
    assert!(message.contains("b -> X"));
}

#[test]
fn includes_cycles_share_follow_sets() {
    let grammar = Grammar::define(examples::follow_cycle);
    let automaton = lr0(&grammar);
    let data = lalr(&grammar, &automaton);

    let a = grammar
        .nonterminals
        .iter()
        .find_map(|(&id, name)| (name == "A").then_some(id))
        .unwrap();
    let b = grammar
        .nonterminals
        .iter()
        .find_map(|(&id, name)| (name == "B").then_some(id))
        .unwrap();
    let root = automaton.start_states["s"];

    // `A -> b B` and `B -> a A` put the inner A- and B-transitions on one
    // cycle of the includes relation; both must hold the identical set.
    let b_goto = data
        .transitions
        .iter()
        .copied()
        .find(|t| t.symbol == b)
        .unwrap();
    let inner_a = data
        .transitions
        .iter()
        .copied()
        .find(|t| t.symbol == a && t.from != root)
        .unwrap();

    assert_eq!(data.follows[&inner_a], data.follows[&b_goto]);

    let expected: TerminalSet = [grammar.terminal_id("`e`").unwrap()].into_iter().collect();
    assert_eq!(data.follows[&b_goto], expected);

    // The shared look-ahead actually drives reductions deep in the nest.
    let table = generate(&grammar, &automaton, &data).unwrap();
    let toks = tokens(
        &table,
        &[("`b`", "b"), ("`a`", "a"), ("`b`", "b"), ("`x`", "x"), ("`e`", "e")],
    );
    let mut parser = Parser::new(&table, render_reduction);
    let out: String = parser.parse(toks, "s").unwrap();
    assert_eq!(out, "((b (a (b x))) e)");
}

fn outcome(table: &ParseTable, spec: &[(&str, &'static str)]) -> Result<String, String> {
    let toks = tokens(table, spec);
    let mut parser = Parser::new(table, render_reduction);
    parser.parse(toks, "expr").map_err(|err| err.to_string())
}

#[test]
fn round_trip_preserves_behavior() {
    let table = build(&Grammar::define(examples::arithmetic)).unwrap();

    let json = serde_json::to_string(&table).unwrap();
    let restored: ParseTable = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, table);

    let corpus: &[&[(&str, &'static str)]] = &[
        &[("NUMBER", "3")],
        &[("NUMBER", "3"), ("PLUS", "+"), ("NUMBER", "4")],
        &[
            ("NUMBER", "3"),
            ("PLUS", "+"),
            ("NUMBER", "4"),
            ("PLUS", "+"),
            ("NUMBER", "5"),
        ],
        &[],
        &[("NUMBER", "3"), ("PLUS", "+")],
        &[("PLUS", "+")],
        &[("NUMBER", "3"), ("NUMBER", "4")],
    ];
    for spec in corpus {
        assert_eq!(outcome(&table, spec), outcome(&restored, spec));
    }
}
