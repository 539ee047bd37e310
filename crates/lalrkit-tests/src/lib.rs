//! Shared fixtures for the integration tests and benches.

use lalrkit::grammar::{RuleID, TerminalID};
use lalrkit::parser::{ParseItem, Token};
use lalrkit::table::ParseTable;

/// A minimal token for driving the engine in tests.
#[derive(Debug, Clone, PartialEq)]
pub struct TestToken {
    pub terminal: TerminalID,
    pub text: &'static str,
    pub position: usize,
}

impl Token for TestToken {
    fn terminal(&self) -> TerminalID {
        self.terminal
    }

    fn position(&self) -> usize {
        self.position
    }
}

/// Build a token stream from `(terminal name, text)` pairs, assigning
/// positions in sequence.
pub fn tokens(table: &ParseTable, spec: &[(&str, &'static str)]) -> Vec<TestToken> {
    spec.iter()
        .enumerate()
        .map(|(position, &(name, text))| TestToken {
            terminal: table
                .terminal_id(name)
                .unwrap_or_else(|| panic!("unknown terminal {}", name)),
            text,
            position,
        })
        .collect()
}

/// A reducer producing a parenthesized rendering of the reduction
/// structure; single-symbol reductions pass their value through, so
/// `3 + 4` comes out as `(3 + 4)`.
pub fn render_reduction(_rule: RuleID, args: Vec<ParseItem<TestToken, String>>) -> String {
    let mut parts: Vec<String> = args
        .into_iter()
        .map(|item| match item {
            ParseItem::Token(token) => token.text.to_owned(),
            ParseItem::Value(value) => value,
        })
        .collect();
    if parts.len() == 1 {
        parts.pop().unwrap()
    } else {
        format!("({})", parts.join(" "))
    }
}
