use crate::symbol::{RuleId, Symbol};

/// A production `id -> rhs` with the cached length of its expansion.
///
/// Ingested rules are binary. Rewriting passes may lengthen or shorten the
/// right-hand side, but it is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub(crate) rhs: Vec<Symbol>,
    pub(crate) length: usize,
}

impl Rule {
    pub(crate) fn new(rhs: Vec<Symbol>, length: usize) -> Self {
        debug_assert!(!rhs.is_empty(), "Rule must not be empty");
        Self { rhs, length }
    }

    /// The right-hand side.
    pub fn rhs(&self) -> &[Symbol] {
        &self.rhs
    }

    /// Number of terminals in the full expansion.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Returns `(left, right)` for a binary rule.
    pub fn as_pair(&self) -> Option<(Symbol, Symbol)> {
        match self.rhs.as_slice() {
            [left, right] => Some((*left, *right)),
            _ => None,
        }
    }

    pub fn first(&self) -> Symbol {
        self.rhs[0]
    }

    pub fn last(&self) -> Symbol {
        self.rhs[self.rhs.len() - 1]
    }

    /// Number of times `symbol` occurs on the right-hand side.
    pub fn occurrences(&self, symbol: Symbol) -> usize {
        self.rhs.iter().filter(|&&s| s == symbol).count()
    }

    /// Iterates over the rule ids referenced by the right-hand side.
    pub fn children(&self) -> impl Iterator<Item = RuleId> + '_ {
        self.rhs.iter().filter_map(|s| s.rule_id())
    }
}
