//! LALR(1) look-ahead sets computation.
//!
//! The algorithm is based on DeRemer and Pennello's method\[1\]: a single
//! walk over the LR(0) automaton extracts the `directly-reads`, `reads`,
//! `includes` and `lookback` relations, and two passes of the digraph
//! procedure close them into the follow set of every nonterminal
//! transition. The second pass is seeded with the first's output; a single
//! pass would under-compute the look-aheads of nested reductions.
//!
//! \[1\]: DeRemer and Pennello, Efficient Computation of LALR(1) Look-Ahead Sets
//!       <https://dl.acm.org/doi/10.1145/69622.357187>

use crate::digraph::digraph;
use crate::grammar::{Grammar, NonterminalID, RuleID, SymbolID, TerminalID, TerminalSet};
use crate::lr0::{LR0Automaton, StateID};
use crate::types::{Map, Set};
use std::fmt;

/// A nonterminal transition: the index unit of every look-ahead relation.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Goto {
    pub from: StateID,
    pub symbol: NonterminalID,
}

impl fmt::Debug for Goto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:?},{:?})", self.from, self.symbol)
    }
}

#[derive(Debug)]
pub struct LalrData {
    /// The ordered domain of the relations below.
    pub transitions: Vec<Goto>,
    /// Final follow set per nonterminal transition. All members of a cycle
    /// in the `includes` relation hold the identical set.
    pub follows: Map<Goto, TerminalSet>,
    /// Per state: terminal -> rules that may reduce on it.
    pub lookaheads: Map<StateID, Map<TerminalID, Set<RuleID>>>,
}

/// Compute the look-ahead sets corresponding to the reductions in the
/// provided LR(0) automaton.
pub fn lalr(g: &Grammar, lr0: &LR0Automaton) -> LalrData {
    // Step 0: extract the nonterminal transitions along with their
    // direct-read sets and the `reads` relation:
    //   DirectRead(p,A) := { t | p --(A)--> r --(t)--> ... }
    //   (p,A) `reads` (r,C) <==> p --(A)--> r --(C)--> && C =>* ε
    let (transitions, directly_reads, reads) = reads_relations(g, lr0);

    // Step 1: the `includes` and `lookback` relations:
    //   (p,A) `includes` (p',B) <==> B -> βAγ, γ =>* ε, p' --(β)--> p
    //   (q, A->ω) `lookback` (p,A) <==> p --(ω)--> q
    let (includes, lookback) = includes_lookback(g, lr0, &transitions, &reads);

    // Step 2: close the relations.
    //   Read(p,A) = DirectRead(p,A) \cup \bigcup { Read(r,C) | (p,A) `reads` (r,C) }
    //   Follow(p,A) = Read(p,A) \cup \bigcup { Follow(p',B) | (p,A) `includes` (p',B) }
    let read_sets = digraph(&transitions, &reads, &directly_reads);
    let follows = digraph(&transitions, &includes, &read_sets);

    // Step 3: assign look-aheads to reductions.
    //   LA(q, A->ω) = \bigcup { Follow(p,A) | (q, A->ω) `lookback` (p,A) }
    let mut lookaheads = Map::<StateID, Map<TerminalID, Set<RuleID>>>::default();
    for (goto, lookbacks) in &lookback {
        for &(state, rule) in lookbacks {
            for t in follows[goto].iter() {
                lookaheads
                    .entry(state)
                    .or_default()
                    .entry(t)
                    .or_default()
                    .insert(rule);
            }
        }
    }

    tracing::debug!(
        transitions = transitions.len(),
        "computed LALR(1) look-ahead sets"
    );

    LalrData {
        transitions,
        follows,
        lookaheads,
    }
}

fn reads_relations(
    g: &Grammar,
    lr0: &LR0Automaton,
) -> (Vec<Goto>, Map<Goto, TerminalSet>, Map<Goto, Set<Goto>>) {
    let mut transitions = Vec::new();
    let mut directly_reads = Map::<Goto, TerminalSet>::default();
    let mut reads = Map::<Goto, Set<Goto>>::default();

    // The continuation of a start symbol's root state is end-of-input; this
    // anchors the whole propagation.
    for &root in lr0.start_states.values() {
        let state = &lr0.states[&root];
        debug_assert_eq!(state.kernels.len(), 1);
        let item = state.kernels[0];
        debug_assert_eq!(item.index, 0);
        if let Some(SymbolID::N(symbol)) = item.next(g) {
            directly_reads
                .entry(Goto { from: root, symbol })
                .or_default()
                .insert(TerminalID::EOI);
        }
    }

    for (&from, state) in &lr0.states {
        let mut seen = Set::<NonterminalID>::default();
        for item in &state.closure {
            let Some(SymbolID::N(symbol)) = item.next(g) else {
                continue;
            };
            if !seen.insert(symbol) {
                continue;
            }

            let goto = Goto { from, symbol };
            transitions.push(goto);
            let next = state.gotos[&symbol];
            let dr = directly_reads.entry(goto).or_default();
            let r = reads.entry(goto).or_default();
            for item2 in &lr0.states[&next].closure {
                match item2.next(g) {
                    Some(SymbolID::T(t)) => {
                        dr.insert(t);
                    }
                    Some(SymbolID::N(n)) if g.nullables.contains(&n) => {
                        r.insert(Goto {
                            from: next,
                            symbol: n,
                        });
                    }
                    _ => {}
                }
            }
        }
    }

    (transitions, directly_reads, reads)
}

fn includes_lookback(
    g: &Grammar,
    lr0: &LR0Automaton,
    transitions: &[Goto],
    reads: &Map<Goto, Set<Goto>>,
) -> (Map<Goto, Set<Goto>>, Map<Goto, Set<(StateID, RuleID)>>) {
    let mut includes = Map::<Goto, Set<Goto>>::default();
    let mut lookback = Map::<Goto, Set<(StateID, RuleID)>>::default();

    for &outer in transitions {
        let state = &lr0.states[&outer.from];
        for item in &state.closure {
            let rule = g.rule(item.rule);
            if rule.left != outer.symbol {
                continue;
            }

            // Walk the rest of the rule's expansion through the automaton.
            let mut at = outer.from;
            for (i, &sym) in rule.right.iter().enumerate().skip(usize::from(item.index)) {
                if let SymbolID::N(n) = sym {
                    let inner = Goto { from: at, symbol: n };
                    // The inner transition's follow set must absorb the
                    // outer one's whenever everything after `sym` can
                    // derive the empty sequence.
                    if reads.contains_key(&inner)
                        && rule.right[i + 1..].iter().all(|&s| g.is_nullable(s))
                    {
                        includes.entry(inner).or_default().insert(outer);
                    }
                }
                let here = &lr0.states[&at];
                at = match sym {
                    SymbolID::T(t) => here.shifts[&t],
                    SymbolID::N(n) => here.gotos[&n],
                };
            }

            // `at` now is the state completing the rule's recognition.
            if item.index == 0 {
                let end = &lr0.states[&at];
                if end
                    .closure
                    .iter()
                    .any(|it| it.rule == item.rule && it.is_satisfied(g))
                {
                    lookback.entry(outer).or_default().insert((at, item.rule));
                }
            }
        }
    }

    (includes, lookback)
}
