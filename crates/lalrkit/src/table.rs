//! Parse-table construction with conflict resolution.
//!
//! Shift/reduce conflicts are resolved in favor of shifting; this is a
//! deterministic, documented policy, and every suppressed reduction is
//! retained on the table as a [`ShiftReduceConflict`]. Reduce/reduce
//! conflicts are grammar errors: no table is produced for them.

use crate::grammar::{Grammar, NonterminalID, RuleID, TerminalID};
use crate::lalr::LalrData;
use crate::lr0::{LR0Automaton, StateID};
use crate::types::Map;
use crate::util::display_fn;
use serde::{de, ser::SerializeTuple, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The action the automaton performs in a state on a particular look-ahead
/// terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Action {
    /// Consume the look-ahead terminal and transition to the specified state.
    Shift(StateID),
    /// Replace the recognized rule's expansion by its left-hand nonterminal.
    Reduce(RuleID),
}

// On the wire an action is a `(tag, index)` pair: tag 0 shifts to the state
// index, tag 1 reduces the rule index.
impl Serialize for Action {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut tuple = serializer.serialize_tuple(2)?;
        match self {
            Self::Shift(next) => {
                tuple.serialize_element(&0u8)?;
                tuple.serialize_element(next)?;
            }
            Self::Reduce(rule) => {
                tuple.serialize_element(&1u8)?;
                tuple.serialize_element(rule)?;
            }
        }
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (tag, index) = <(u8, u16)>::deserialize(deserializer)?;
        match tag {
            0 => Ok(Self::Shift(StateID::from_raw(index))),
            1 => Ok(Self::Reduce(RuleID::from_raw(index))),
            _ => Err(de::Error::custom(format!("invalid action tag {}", tag))),
        }
    }
}

/// One row of the table: terminal actions plus nonterminal gotos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub actions: Map<TerminalID, Action>,
    pub gotos: Map<NonterminalID, StateID>,
}

/// What the engine needs to replay a reduce: the rule's left-hand
/// nonterminal and the length of its expansion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRule {
    pub left: NonterminalID,
    pub arity: usize,
}

/// A shift/reduce conflict that was resolved in favor of shifting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftReduceConflict {
    pub state: StateID,
    pub terminal: TerminalID,
    pub suppressed: RuleID,
}

/// A reduce/reduce conflict site, rendered readably for error reports.
#[derive(Debug, Clone, PartialEq)]
pub struct ReduceReduceConflict {
    pub state: StateID,
    pub terminal: String,
    pub rules: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    /// Two or more distinct rules are valid reductions for the same terminal
    /// in the same state; no deterministic table exists.
    #[error("{}", render_reduce_reduce(.conflicts))]
    ReduceReduce { conflicts: Vec<ReduceReduceConflict> },
}

fn render_reduce_reduce(conflicts: &[ReduceReduceConflict]) -> String {
    use fmt::Write as _;

    let mut msg = String::new();
    for conflict in conflicts {
        let _ = write!(
            msg,
            "\nreduce/reduce collision on {} in {:?} between the following rules:",
            conflict.terminal, conflict.state,
        );
        for rule in &conflict.rules {
            let _ = write!(msg, "\n\t- {}", rule);
        }
    }
    msg
}

/// A deterministic LALR(1) parse table.
///
/// Built once per grammar and immutable afterwards; any number of parses
/// may read it concurrently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseTable {
    /// Terminal index ↔ name correspondence.
    pub tokens: Map<TerminalID, String>,
    pub rules: Map<RuleID, TableRule>,
    pub states: Map<StateID, TableRow>,
    /// Entry state per start symbol name.
    pub start_states: Map<String, StateID>,
    /// Accepting state per start symbol name.
    pub end_states: Map<String, StateID>,
    /// Shift/reduce conflicts resolved while building, in resolution order.
    pub conflicts: Vec<ShiftReduceConflict>,
}

impl ParseTable {
    pub fn terminal_id(&self, name: &str) -> Option<TerminalID> {
        self.tokens
            .iter()
            .find_map(|(&id, n)| (n == name).then_some(id))
    }

    pub fn display(&self) -> impl fmt::Display + '_ {
        display_fn(move |f| {
            for (i, (id, row)) in self.states.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }

                writeln!(f, "#### State {:?}", id)?;
                writeln!(f, "## actions")?;
                for (terminal, action) in &row.actions {
                    let token = &self.tokens[terminal];
                    match action {
                        Action::Shift(next) => {
                            writeln!(f, "- {} => shift({:?})", token, next)?;
                        }
                        Action::Reduce(rule) => {
                            writeln!(f, "- {} => reduce({:?})", token, rule)?;
                        }
                    }
                }
                if !row.gotos.is_empty() {
                    writeln!(f, "## gotos")?;
                    for (symbol, goto) in &row.gotos {
                        writeln!(f, "- {:?} => goto({:?})", symbol, goto)?;
                    }
                }
            }
            Ok(())
        })
    }
}

/// Build the parse table for the automaton's grammar.
///
/// Fails with [`GrammarError::ReduceReduce`] if any state holds two valid
/// reductions for one terminal; in that case no table — not even a partial
/// one — is observable.
pub fn generate(g: &Grammar, lr0: &LR0Automaton, lalr: &LalrData) -> Result<ParseTable, GrammarError> {
    let mut states = Map::default();
    let mut conflicts = Vec::new();
    let mut reduce_reduce = Vec::new();

    for (&id, lr0_state) in &lr0.states {
        let mut actions: Map<TerminalID, Action> = lr0_state
            .shifts
            .iter()
            .map(|(&t, &next)| (t, Action::Shift(next)))
            .collect();

        if let Some(lookaheads) = lalr.lookaheads.get(&id) {
            for (&terminal, rules) in lookaheads {
                if rules.len() > 1 {
                    reduce_reduce.push(ReduceReduceConflict {
                        state: id,
                        terminal: g.terminals[&terminal].clone(),
                        rules: rules
                            .iter()
                            .map(|&r| g.rule(r).display(g).to_string())
                            .collect(),
                    });
                    continue;
                }

                let rule = rules[0];
                if actions.contains_key(&terminal) {
                    tracing::debug!(
                        state = ?id,
                        terminal = %g.terminals[&terminal],
                        rule = %g.rule(rule).display(g),
                        "shift/reduce conflict, resolving as shift",
                    );
                    conflicts.push(ShiftReduceConflict {
                        state: id,
                        terminal,
                        suppressed: rule,
                    });
                } else {
                    actions.insert(terminal, Action::Reduce(rule));
                }
            }
        }

        states.insert(
            id,
            TableRow {
                actions,
                gotos: lr0_state.gotos.clone(),
            },
        );
    }

    if !reduce_reduce.is_empty() {
        return Err(GrammarError::ReduceReduce {
            conflicts: reduce_reduce,
        });
    }

    let mut end_states = Map::default();
    for start in &g.starts {
        let mut found = None;
        for (&id, state) in &lr0.states {
            let accepts = state
                .closure
                .iter()
                .any(|item| item.rule == start.rule && item.is_satisfied(g));
            if accepts {
                assert!(
                    found.replace(id).is_none(),
                    "multiple accepting states for start symbol {}",
                    start.name,
                );
            }
        }
        let id = found.unwrap_or_else(|| panic!("no accepting state for start symbol {}", start.name));
        end_states.insert(start.name.clone(), id);
    }

    let rules = g
        .rules
        .iter()
        .map(|(&id, rule)| {
            (
                id,
                TableRule {
                    left: rule.left,
                    arity: rule.right.len(),
                },
            )
        })
        .collect();

    let table = ParseTable {
        tokens: g.terminals.clone(),
        rules,
        states,
        start_states: lr0.start_states.clone(),
        end_states,
        conflicts,
    };
    tracing::debug!(
        states = table.states.len(),
        conflicts = table.conflicts.len(),
        "parse table built"
    );
    Ok(table)
}

/// Build the parse table for a grammar, running the whole pipeline.
pub fn build(g: &Grammar) -> Result<ParseTable, GrammarError> {
    let automaton = crate::lr0::lr0(g);
    let lalr = crate::lalr::lalr(g, &automaton);
    generate(g, &automaton, &lalr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::examples;

    #[test]
    fn action_round_trips_through_wire_form() {
        let table = build(&Grammar::define(examples::arithmetic)).unwrap();
        for row in table.states.values() {
            for &action in row.actions.values() {
                let json = serde_json::to_string(&action).unwrap();
                assert_eq!(serde_json::from_str::<Action>(&json).unwrap(), action);
            }
        }
    }

    #[test]
    fn shift_actions_use_tag_zero() {
        let table = build(&Grammar::define(examples::arithmetic)).unwrap();
        let (_, row) = table.states.first().unwrap();
        for (_, &action) in &row.actions {
            let json = serde_json::to_string(&action).unwrap();
            match action {
                Action::Shift(_) => assert!(json.starts_with("[0,")),
                Action::Reduce(_) => assert!(json.starts_with("[1,")),
            }
        }
    }
}
