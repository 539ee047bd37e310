//! Context-free grammars.

use crate::types::{Map, Set};
use crate::util::display_fn;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==== symbol identifiers ====

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TerminalID(u16);
impl TerminalID {
    /// The reserved end-of-input terminal. It appears in no rule, so it can
    /// never be shifted.
    pub const EOI: Self = Self(0);
    const OFFSET: u16 = 1;
}
impl fmt::Debug for TerminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Self::EOI => write!(f, "T#End"),
            _ => write!(f, "T#{:03}", self.0),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NonterminalID(u16);
impl fmt::Debug for NonterminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N#{:03}", self.0)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}
impl fmt::Debug for SymbolID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::T(t) => write!(f, "{:?}", t),
            Self::N(n) => write!(f, "{:?}", n),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleID(u16);
impl RuleID {
    pub(crate) const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }
}
impl fmt::Debug for RuleID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R#{:03}", self.0)
    }
}

// ==== terminal sets ====

#[derive(Debug, Default, Clone, PartialEq)]
pub struct TerminalSet {
    inner: bit_set::BitSet,
}
impl TerminalSet {
    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.0.into())
    }
    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.0.into())
    }
    pub fn union_with(&mut self, other: &Self) {
        self.inner.union_with(&other.inner)
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        self.inner
            .iter()
            .map(|raw| raw.try_into().map(TerminalID).unwrap())
    }
}
impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self {
            inner: iter.into_iter().map(|t| t.0.into()).collect(),
        }
    }
}
impl crate::digraph::Set for TerminalSet {
    fn union_with(&mut self, other: &Self) {
        self.union_with(other)
    }
}

// ==== rules ====

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub left: NonterminalID,
    pub right: Vec<SymbolID>,
}
impl Rule {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(f, "{} -> ", g.nonterminals[&self.left])?;
            if self.right.is_empty() {
                f.write_str("ε")?;
            } else {
                for (i, r) in self.right.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    f.write_str(g.symbol_name(*r))?;
                }
            }
            Ok(())
        })
    }
}

/// A designated start symbol together with its synthesized wrap rule
/// `root -> symbol`. The wrap rule is never reduced at runtime; the state
/// holding its satisfied item is the accepting state for this start symbol.
#[derive(Debug)]
pub struct StartSymbol {
    pub name: String,
    pub symbol: NonterminalID,
    pub root: NonterminalID,
    pub rule: RuleID,
}

#[derive(Debug)]
#[non_exhaustive]
pub struct Grammar {
    pub terminals: Map<TerminalID, String>,
    pub nonterminals: Map<NonterminalID, String>,
    pub rules: Map<RuleID, Rule>,
    pub starts: Vec<StartSymbol>,
    pub nullables: Set<NonterminalID>,
}

impl Grammar {
    pub fn define<F>(f: F) -> Self
    where
        F: FnOnce(&mut GrammarDef),
    {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            rules: Map::default(),
            starts: Vec::new(),
            next_terminal: TerminalID::OFFSET,
            next_nonterminal: 0,
            next_rule: 0,
        };

        def.terminals.insert(TerminalID::EOI, "#EOI".into());

        f(&mut def);

        let start_symbols = if def.starts.is_empty() {
            let first = def
                .nonterminals
                .first()
                .map(|(k, _v)| *k)
                .expect("the start symbol is not specified");
            vec![first]
        } else {
            std::mem::take(&mut def.starts)
        };

        let mut starts = Vec::new();
        for symbol in start_symbols {
            let name = def.nonterminals[&symbol].clone();
            let root = def.nonterminal(&format!("#root_{}", name));
            let rule = def.rule(root, [SymbolID::N(symbol)]);
            starts.push(StartSymbol {
                name,
                symbol,
                root,
                rule,
            });
        }

        let mut nullables = Set::default();
        loop {
            let mut changed = false;
            for rule in def.rules.values() {
                if rule
                    .right
                    .iter()
                    .all(|s| matches!(s, SymbolID::N(n) if nullables.contains(n)))
                {
                    changed |= nullables.insert(rule.left);
                }
            }
            if !changed {
                break;
            }
        }

        Self {
            terminals: def.terminals,
            nonterminals: def.nonterminals,
            rules: def.rules,
            starts,
            nullables,
        }
    }

    pub fn rule(&self, id: RuleID) -> &Rule {
        &self.rules[&id]
    }

    pub fn is_nullable(&self, sym: SymbolID) -> bool {
        matches!(sym, SymbolID::N(n) if self.nullables.contains(&n))
    }

    pub fn symbol_name(&self, sym: SymbolID) -> &str {
        match sym {
            SymbolID::T(t) => &self.terminals[&t],
            SymbolID::N(n) => &self.nonterminals[&n],
        }
    }

    pub fn terminal_id(&self, name: &str) -> Option<TerminalID> {
        self.terminals
            .iter()
            .find_map(|(&id, n)| (n == name).then_some(id))
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#### terminals: ")?;
        for (i, t) in self.terminals.values().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", t)?;
        }
        write!(f, "\n#### nonterminals: ")?;
        for (i, n) in self.nonterminals.values().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", n)?;
        }
        writeln!(f, "\n#### rules:")?;
        for rule in self.rules.values() {
            writeln!(f, "- {}", rule.display(self))?;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct GrammarDef {
    terminals: Map<TerminalID, String>,
    nonterminals: Map<NonterminalID, String>,
    rules: Map<RuleID, Rule>,
    starts: Vec<NonterminalID>,
    next_terminal: u16,
    next_nonterminal: u16,
    next_rule: u16,
}
impl GrammarDef {
    pub fn terminal(&mut self, name: &str) -> TerminalID {
        let terminal = TerminalID(self.next_terminal);
        self.terminals.insert(terminal, name.into());
        self.next_terminal += 1;
        terminal
    }

    pub fn nonterminal(&mut self, name: &str) -> NonterminalID {
        let nonterminal = NonterminalID(self.next_nonterminal);
        self.nonterminals.insert(nonterminal, name.into());
        self.next_nonterminal += 1;
        nonterminal
    }

    pub fn rule<I>(&mut self, left: NonterminalID, right: I) -> RuleID
    where
        I: IntoIterator<Item = SymbolID>,
    {
        let right: Vec<_> = right.into_iter().collect();
        for rule in self.rules.values() {
            assert!(rule.left != left || rule.right != right, "rule duplicated");
        }

        let id = RuleID(self.next_rule);
        self.rules.insert(id, Rule { left, right });
        self.next_rule += 1;
        id
    }

    /// Designate a start symbol. May be called more than once; the first
    /// declared nonterminal is used when no start symbol is designated.
    pub fn start_symbol(&mut self, start: NonterminalID) {
        if !self.starts.contains(&start) {
            self.starts.push(start);
        }
    }
}

pub mod examples {
    use super::*;
    use SymbolID::*;

    /// `expr: expr '+' term | term`, `term: NUMBER`.
    pub fn arithmetic(g: &mut GrammarDef) {
        let plus = g.terminal("PLUS");
        let num = g.terminal("NUMBER");

        let expr = g.nonterminal("expr");
        let term = g.nonterminal("term");

        g.start_symbol(expr);

        g.rule(expr, [N(expr), T(plus), N(term)]);
        g.rule(expr, [N(term)]);
        g.rule(term, [T(num)]);
    }

    pub fn arithmetic_full(g: &mut GrammarDef) {
        let lparen = g.terminal("LPAREN");
        let rparen = g.terminal("RPAREN");
        let plus = g.terminal("PLUS");
        let minus = g.terminal("MINUS");
        let star = g.terminal("STAR");
        let slash = g.terminal("SLASH");
        let num = g.terminal("NUM");

        let expr = g.nonterminal("expr");
        let term = g.nonterminal("term");
        let factor = g.nonterminal("factor");
        let atom = g.nonterminal("atom");

        g.start_symbol(expr);

        g.rule(expr, [N(expr), T(plus), N(term)]);
        g.rule(expr, [N(expr), T(minus), N(term)]);
        g.rule(expr, [N(term)]);

        g.rule(term, [N(term), T(star), N(factor)]);
        g.rule(term, [N(term), T(slash), N(factor)]);
        g.rule(term, [N(factor)]);

        g.rule(factor, [T(minus), N(factor)]);
        g.rule(factor, [N(atom)]);

        g.rule(atom, [T(num)]);
        g.rule(atom, [T(lparen), N(expr), T(rparen)]);
    }

    pub fn with_nullable(g: &mut GrammarDef) {
        // E → E + T n | T
        // T → a | ( E n ) | n a
        // n → ϵ | num

        let lparen = g.terminal("`(`");
        let rparen = g.terminal("`)`");
        let plus = g.terminal("`+`");
        let a = g.terminal("`-`");
        let num = g.terminal("NUM");

        let expr = g.nonterminal("expr");
        let term = g.nonterminal("term");
        let nullable = g.nonterminal("nullable");

        g.rule(expr, [N(expr), T(plus), N(nullable)]);
        g.rule(expr, [N(term)]);

        g.rule(term, [T(a)]);
        g.rule(term, [T(lparen), N(expr), N(nullable), T(rparen)]);
        g.rule(term, [N(nullable), T(a)]);

        g.rule(nullable, []);
        g.rule(nullable, [T(num)]);
    }

    /// The classic dangling-else ambiguity; the shift preference binds each
    /// `else` to the innermost `if`.
    pub fn dangling_else(g: &mut GrammarDef) {
        let r#if = g.terminal("IF");
        let r#else = g.terminal("ELSE");
        let other = g.terminal("OTHER");

        let stmt = g.nonterminal("stmt");

        g.start_symbol(stmt);

        g.rule(stmt, [T(r#if), N(stmt)]);
        g.rule(stmt, [T(r#if), N(stmt), T(r#else), N(stmt)]);
        g.rule(stmt, [T(other)]);
    }

    /// Two rules reducible on the same look-ahead in the same state.
    pub fn reduce_reduce(g: &mut GrammarDef) {
        let x = g.terminal("X");
        let c = g.terminal("C");

        let s = g.nonterminal("s");
        let a = g.nonterminal("a");
        let b = g.nonterminal("b");

        g.start_symbol(s);

        g.rule(s, [N(a), T(c)]);
        g.rule(s, [N(b), T(c)]);
        g.rule(a, [T(x)]);
        g.rule(b, [T(x)]);
    }

    /// Mutually recursive rules whose `includes` relation forms a cycle, so
    /// the transitions involved must converge to one shared follow set.
    pub fn follow_cycle(g: &mut GrammarDef) {
        let b = g.terminal("`b`");
        let a = g.terminal("`a`");
        let x = g.terminal("`x`");
        let e = g.terminal("`e`");

        let s = g.nonterminal("s");
        let aa = g.nonterminal("A");
        let bb = g.nonterminal("B");

        g.start_symbol(s);

        g.rule(s, [N(aa), T(e)]);
        g.rule(aa, [T(b), N(bb)]);
        g.rule(bb, [T(a), N(aa)]);
        g.rule(bb, [T(x)]);
    }

    /// `a: 'x' | 'x' 'y'` — must reduce `a: 'x'` at end of input instead of
    /// waiting for a `'y'` that never arrives.
    pub fn optional_tail(g: &mut GrammarDef) {
        let x = g.terminal("X");
        let y = g.terminal("Y");

        let a = g.nonterminal("a");

        g.start_symbol(a);

        g.rule(a, [T(x)]);
        g.rule(a, [T(x), T(y)]);
    }

    /// A nullable start symbol; the empty input is a valid sentence.
    pub fn nullable_start(g: &mut GrammarDef) {
        let x = g.terminal("X");

        let s = g.nonterminal("s");

        g.start_symbol(s);

        g.rule(s, []);
        g.rule(s, [T(x), N(s)]);
    }

    /// The arithmetic grammar with both `expr` and `term` as entry points.
    pub fn multi_start(g: &mut GrammarDef) {
        let plus = g.terminal("PLUS");
        let num = g.terminal("NUMBER");

        let expr = g.nonterminal("expr");
        let term = g.nonterminal("term");

        g.start_symbol(expr);
        g.start_symbol(term);

        g.rule(expr, [N(expr), T(plus), N(term)]);
        g.rule(expr, [N(term)]);
        g.rule(term, [T(num)]);
    }
}
