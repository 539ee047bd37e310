//! The table-driven parser engine.
//!
//! A deterministic shift-reduce automaton over a pull-based token stream:
//! tokens are consumed one at a time, never buffered, never re-read. The
//! look-ahead decision is encoded entirely in the table; the engine never
//! peeks beyond the current token.

use crate::grammar::{RuleID, TerminalID};
use crate::lr0::StateID;
use crate::table::{Action, ParseTable};

/// A trait for abstracting token symbols.
pub trait Token {
    /// The terminal kind used for table lookups.
    fn terminal(&self) -> TerminalID;

    /// Position of the token in the source, reported in errors.
    fn position(&self) -> usize;
}

/// An entry of the value stack: a raw shifted token, or the value a reducer
/// produced for a recognized rule.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseItem<T, V> {
    Token(T),
    Value(V),
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError<T> {
    /// The current state has no action for the current token. Recoverable
    /// by starting a fresh parse, not by resuming this one.
    #[error("unexpected token {terminal} at position {position}, expected one of: {}", expected.join(", "))]
    UnexpectedToken {
        token: T,
        terminal: String,
        position: usize,
        expected: Vec<String>,
        state: StateID,
    },

    /// The input ended although the current state required more of it. The
    /// position is the last token's, or zero for an empty input.
    #[error("unexpected end of input at position {position}, expected one of: {}", expected.join(", "))]
    UnexpectedEof {
        position: usize,
        expected: Vec<String>,
        state: StateID,
    },

    /// The requested start symbol is not an entry point of the table.
    #[error("unknown start symbol `{0}`")]
    UnknownStart(String),
}

/// The parser driving token streams against a built table.
///
/// The table is shared and read-only; every [`parse`](Parser::parse) call
/// owns its own state and value stacks. The reducer is called exactly once
/// per reduce, in bottom-up recognition order, with the popped values
/// oldest-first; whatever it returns is pushed in their place.
pub struct Parser<'t, F> {
    table: &'t ParseTable,
    reduce: F,
}

impl<'t, F> Parser<'t, F> {
    pub fn new(table: &'t ParseTable, reduce: F) -> Self {
        Self { table, reduce }
    }

    pub fn parse<T, V, I>(&mut self, tokens: I, start: &str) -> Result<V, ParseError<T>>
    where
        T: Token,
        I: IntoIterator<Item = T>,
        F: FnMut(RuleID, Vec<ParseItem<T, V>>) -> V,
    {
        self.run(tokens, start, &mut |_| {})
    }

    /// Like [`parse`](Parser::parse), additionally invoking `observer` with
    /// the new state after every shift. Purely informational; the observer
    /// cannot influence the parse.
    pub fn parse_with_observer<T, V, I>(
        &mut self,
        tokens: I,
        start: &str,
        mut observer: impl FnMut(StateID),
    ) -> Result<V, ParseError<T>>
    where
        T: Token,
        I: IntoIterator<Item = T>,
        F: FnMut(RuleID, Vec<ParseItem<T, V>>) -> V,
    {
        self.run(tokens, start, &mut observer)
    }

    fn run<T, V, I>(
        &mut self,
        tokens: I,
        start: &str,
        observer: &mut dyn FnMut(StateID),
    ) -> Result<V, ParseError<T>>
    where
        T: Token,
        I: IntoIterator<Item = T>,
        F: FnMut(RuleID, Vec<ParseItem<T, V>>) -> V,
    {
        let table = self.table;
        let &start_state = table
            .start_states
            .get(start)
            .ok_or_else(|| ParseError::UnknownStart(start.to_owned()))?;
        let end_state = table.end_states[start];

        let mut state_stack = vec![start_state];
        let mut value_stack: Vec<ParseItem<T, V>> = Vec::new();

        let mut last_position = 0;
        for token in tokens {
            last_position = token.position();
            self.feed_token(&mut state_stack, &mut value_stack, token, observer)?;
        }

        // The input is exhausted: run the remaining reductions against a
        // synthesized end-of-input, which no state can shift.
        loop {
            let &state = state_stack.last().expect("state stack exhausted");
            if state == end_state {
                debug_assert_eq!(value_stack.len(), 1);
                match value_stack.pop() {
                    Some(ParseItem::Value(value)) => return Ok(value),
                    _ => unreachable!("accepting state without a reduced value"),
                }
            }
            match table.states[&state].actions.get(&TerminalID::EOI) {
                Some(&Action::Reduce(rule)) => {
                    self.reduce_once(&mut state_stack, &mut value_stack, rule)
                }
                Some(&Action::Shift(_)) => unreachable!("end-of-input can never be shifted"),
                None => {
                    return Err(ParseError::UnexpectedEof {
                        position: last_position,
                        expected: self.expected_at(state),
                        state,
                    })
                }
            }
        }
    }

    fn feed_token<T, V>(
        &mut self,
        state_stack: &mut Vec<StateID>,
        value_stack: &mut Vec<ParseItem<T, V>>,
        token: T,
        observer: &mut dyn FnMut(StateID),
    ) -> Result<(), ParseError<T>>
    where
        T: Token,
        F: FnMut(RuleID, Vec<ParseItem<T, V>>) -> V,
    {
        let table = self.table;
        let terminal = token.terminal();
        loop {
            let &state = state_stack.last().expect("state stack exhausted");
            match table.states[&state].actions.get(&terminal) {
                Some(&Action::Shift(next)) => {
                    state_stack.push(next);
                    value_stack.push(ParseItem::Token(token));
                    observer(next);
                    return Ok(());
                }
                // A reduce does not consume input: the same token is
                // re-examined against the new stack top.
                Some(&Action::Reduce(rule)) => {
                    self.reduce_once(state_stack, value_stack, rule)
                }
                None => {
                    return Err(ParseError::UnexpectedToken {
                        terminal: self.terminal_name(terminal),
                        position: token.position(),
                        token,
                        expected: self.expected_at(state),
                        state,
                    })
                }
            }
        }
    }

    fn reduce_once<T, V>(
        &mut self,
        state_stack: &mut Vec<StateID>,
        value_stack: &mut Vec<ParseItem<T, V>>,
        rule: RuleID,
    ) where
        F: FnMut(RuleID, Vec<ParseItem<T, V>>) -> V,
    {
        let table = self.table;
        let info = &table.rules[&rule];
        let args = value_stack.split_off(value_stack.len() - info.arity);
        state_stack.truncate(state_stack.len() - info.arity);

        let value = (self.reduce)(rule, args);

        let &top = state_stack.last().expect("state stack exhausted");
        let next = match table.states[&top].gotos.get(&info.left) {
            Some(&next) => next,
            // Every state that can complete a rule's recognition has a goto
            // for that rule's left-hand side; a miss is a table defect.
            None => unreachable!("no goto for {:?} out of {:?}", info.left, top),
        };
        state_stack.push(next);
        value_stack.push(ParseItem::Value(value));
    }

    fn expected_at(&self, state: StateID) -> Vec<String> {
        self.table.states[&state]
            .actions
            .keys()
            .map(|&t| self.terminal_name(t))
            .collect()
    }

    fn terminal_name(&self, terminal: TerminalID) -> String {
        self.table
            .tokens
            .get(&terminal)
            .cloned()
            .unwrap_or_else(|| format!("{:?}", terminal))
    }
}
