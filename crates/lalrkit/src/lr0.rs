//! LR(0) automaton construction.

use crate::grammar::{Grammar, NonterminalID, RuleID, SymbolID, TerminalID};
use crate::types::{Map, Set};
use crate::util::display_fn;
use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, fmt};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateID(u16);
impl StateID {
    pub(crate) const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }
}
impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}

/// The LR(0) item, a.k.a. LR item core: a rule with a dot position marking
/// recognition progress.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LR0Item {
    pub rule: RuleID,
    pub index: u16,
}
impl LR0Item {
    pub fn is_satisfied(&self, g: &Grammar) -> bool {
        g.rule(self.rule).right.len() == usize::from(self.index)
    }

    /// The symbol immediately after the dot, if any.
    pub fn next(&self, g: &Grammar) -> Option<SymbolID> {
        g.rule(self.rule).right.get(usize::from(self.index)).copied()
    }

    /// Move the dot one symbol forward. Must only be applied to an
    /// unsatisfied item.
    pub fn advance(&self) -> Self {
        Self {
            rule: self.rule,
            index: self.index + 1,
        }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            let rule = g.rule(self.rule);
            write!(f, "{} -> [ ", g.nonterminals[&rule.left])?;
            for (i, r) in rule.right.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                if i == usize::from(self.index) {
                    f.write_str(". ")?;
                }
                f.write_str(g.symbol_name(*r))?;
            }
            if rule.right.len() == usize::from(self.index) {
                write!(f, " .")?;
            }
            write!(f, " ]")
        })
    }
}

#[derive(Debug, Clone)]
pub struct LR0State {
    /// The items defining this state's identity; two states with equal
    /// kernels are the same state.
    pub kernels: Vec<LR0Item>,
    /// Kernel plus the epsilon expansion of every nonterminal after a dot.
    pub closure: Vec<LR0Item>,
    pub shifts: Map<TerminalID, StateID>,
    pub gotos: Map<NonterminalID, StateID>,
}

impl LR0State {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            writeln!(f, "## kernels:")?;
            for kernel in &self.kernels {
                writeln!(f, "- {}", kernel.display(g))?;
            }
            if !self.shifts.is_empty() {
                writeln!(f, "## shifts:")?;
                for (t, to) in &self.shifts {
                    writeln!(f, "- {} => {:?}", g.terminals[t], to)?;
                }
            }
            if !self.gotos.is_empty() {
                writeln!(f, "## gotos:")?;
                for (n, to) in &self.gotos {
                    writeln!(f, "- {} => {:?}", g.nonterminals[n], to)?;
                }
            }
            Ok(())
        })
    }
}

#[derive(Debug)]
pub struct LR0Automaton {
    pub states: Map<StateID, LR0State>,
    /// Root state per start symbol name. A root state's kernel is the single
    /// dot-0 item of the start symbol's wrap rule.
    pub start_states: Map<String, StateID>,
}

impl LR0Automaton {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (i, (id, state)) in self.states.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {:?}", id)?;
                write!(f, "{}", state.display(g))?;
            }
            Ok(())
        })
    }
}

/// Calculate the LR(0) automaton for the specified grammar, starting from
/// every designated start symbol.
pub fn lr0(g: &Grammar) -> LR0Automaton {
    let nonkernels = nonkernels(g);

    let mut states = Map::<StateID, LR0State>::default();
    let mut state_id = {
        let mut next_state_id = 0;
        move || {
            let id = StateID(next_state_id);
            next_state_id += 1;
            id
        }
    };

    let mut pending_states = VecDeque::<(StateID, Vec<LR0Item>)>::new();
    let mut isocores = Map::<Vec<LR0Item>, StateID>::default();
    let mut start_states = Map::default();
    for start in &g.starts {
        let kernel = vec![LR0Item {
            rule: start.rule,
            index: 0,
        }];
        let id = state_id();
        isocores.insert(kernel.clone(), id);
        start_states.insert(start.name.clone(), id);
        pending_states.push_back((id, kernel));
    }

    let mut new_kernels = Map::<SymbolID, Set<LR0Item>>::default();
    while let Some((current, kernels)) = pending_states.pop_front() {
        let mut closure: Set<LR0Item> = kernels.iter().copied().collect();
        for kernel in &kernels {
            if let Some(SymbolID::N(n)) = kernel.next(g) {
                closure.extend(&nonkernels[&n]);
            }
        }

        new_kernels.clear();
        for item in &closure {
            if let Some(sym) = item.next(g) {
                new_kernels.entry(sym).or_default().insert(item.advance());
            }
        }

        let mut shifts = Map::default();
        let mut gotos = Map::default();
        for (sym, new_kernel) in new_kernels.drain(..) {
            let mut new_kernel: Vec<_> = new_kernel.into_iter().collect();
            new_kernel.sort_unstable();
            let next = match isocores.get(&new_kernel) {
                Some(id) => *id,
                None => {
                    let id = state_id();
                    isocores.insert(new_kernel.clone(), id);
                    pending_states.push_back((id, new_kernel));
                    id
                }
            };
            match sym {
                SymbolID::T(t) => {
                    shifts.insert(t, next);
                }
                SymbolID::N(n) => {
                    gotos.insert(n, next);
                }
            }
        }

        states.insert(
            current,
            LR0State {
                kernels,
                closure: closure.into_iter().collect(),
                shifts,
                gotos,
            },
        );
    }

    LR0Automaton {
        states,
        start_states,
    }
}

/// For each nonterminal, the dot-0 items reachable by epsilon expansion.
fn nonkernels(g: &Grammar) -> Map<NonterminalID, Set<LR0Item>> {
    let mut by_origin = Map::<NonterminalID, Vec<LR0Item>>::default();
    for (&id, rule) in &g.rules {
        by_origin
            .entry(rule.left)
            .or_default()
            .push(LR0Item { rule: id, index: 0 });
    }

    let mut nonkernels = Map::default();
    for &n in g.nonterminals.keys() {
        let mut items: Set<LR0Item> = by_origin
            .get(&n)
            .into_iter()
            .flatten()
            .copied()
            .collect();

        loop {
            let mut added = Vec::new();
            for item in &items {
                if let Some(SymbolID::N(next)) = item.next(g) {
                    added.extend(by_origin.get(&next).into_iter().flatten().copied());
                }
            }

            let changed = added
                .into_iter()
                .fold(false, |changed, item| changed | items.insert(item));
            if !changed {
                break;
            }
        }
        nonkernels.insert(n, items);
    }
    nonkernels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernels_identify_states() {
        let g = Grammar::define(crate::grammar::examples::arithmetic_full);
        let automaton = lr0(&g);

        // Kernel-value equality keys the state set: no two states share one.
        let mut seen = Set::default();
        for state in automaton.states.values() {
            assert!(seen.insert(state.kernels.clone()));
            let mut sorted = state.kernels.clone();
            sorted.sort_unstable();
            assert_eq!(state.kernels, sorted);
        }

        // Every shift/goto target exists.
        for state in automaton.states.values() {
            for to in state.shifts.values().chain(state.gotos.values()) {
                assert!(automaton.states.contains_key(to));
            }
        }
    }

    #[test]
    fn root_states_have_wrap_kernels() {
        let g = Grammar::define(crate::grammar::examples::multi_start);
        let automaton = lr0(&g);

        assert_eq!(automaton.start_states.len(), 2);
        for start in &g.starts {
            let root = automaton.start_states[&start.name];
            let state = &automaton.states[&root];
            assert_eq!(state.kernels.len(), 1);
            assert_eq!(state.kernels[0].rule, start.rule);
            assert_eq!(state.kernels[0].index, 0);
        }
    }
}
