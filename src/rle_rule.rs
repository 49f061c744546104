//! Border + run-length view of a right-hand side.
//!
//! A leading and a trailing non-terminal are kept apart as borders; the
//! symbols between them are grouped into maximal runs. The view is used to
//! report grammar size, never for rewriting.

use crate::error::GrammarError;
use crate::grammar::Grammar;
use crate::metadata::Metadata;
use crate::symbol::{RuleId, Symbol};
use ahash::AHashSet as HashSet;
use std::collections::BTreeMap;
use std::fmt;

/// `count` consecutive copies of `symbol`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub symbol: Symbol,
    pub count: usize,
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 1 {
            write!(f, "{}", self.symbol)
        } else {
            write!(f, "{}^{}", self.symbol, self.count)
        }
    }
}

/// A right-hand side as `left? blocks* right?`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompressedRule {
    left: Option<Symbol>,
    blocks: Vec<Block>,
    right: Option<Symbol>,
}

impl CompressedRule {
    pub fn new(left: Option<Symbol>, blocks: Vec<Block>, right: Option<Symbol>) -> Self {
        Self { left, blocks, right }
    }

    /// Splits off non-terminal borders and run-length encodes the rest.
    pub fn from_list(rhs: &[Symbol]) -> Self {
        let mut middle = rhs;

        let left = match middle.split_first() {
            Some((&first, rest)) if !first.is_terminal() => {
                middle = rest;
                Some(first)
            }
            _ => None,
        };
        let right = match middle.split_last() {
            Some((&last, rest)) if !last.is_terminal() => {
                middle = rest;
                Some(last)
            }
            _ => None,
        };

        let mut blocks: Vec<Block> = Vec::new();
        for &symbol in middle {
            match blocks.last_mut() {
                Some(block) if block.symbol == symbol => block.count += 1,
                _ => blocks.push(Block { symbol, count: 1 }),
            }
        }

        Self { left, blocks, right }
    }

    /// Expands back to the plain right-hand side.
    pub fn to_list(&self) -> Vec<Symbol> {
        let mut rhs = Vec::with_capacity(self.expanded_len());
        rhs.extend(self.left);
        for block in &self.blocks {
            rhs.extend(std::iter::repeat(block.symbol).take(block.count));
        }
        rhs.extend(self.right);
        rhs
    }

    /// Blocks plus present borders.
    pub fn size(&self) -> usize {
        self.blocks.len() + usize::from(self.left.is_some()) + usize::from(self.right.is_some())
    }

    /// Number of symbols [`to_list`](Self::to_list) produces.
    pub fn expanded_len(&self) -> usize {
        self.blocks.iter().map(|b| b.count).sum::<usize>()
            + usize::from(self.left.is_some())
            + usize::from(self.right.is_some())
    }

    pub fn left(&self) -> Option<Symbol> {
        self.left
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn right(&self) -> Option<Symbol> {
        self.right
    }
}

impl fmt::Display for CompressedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::with_capacity(self.size());
        parts.extend(self.left.map(|s| s.to_string()));
        parts.extend(self.blocks.iter().map(|b| b.to_string()));
        parts.extend(self.right.map(|s| s.to_string()));
        write!(f, "{}", parts.join(" "))
    }
}

/// A whole grammar in the border + run-length view, with the block
/// metadata of its rules.
#[derive(Debug, Clone)]
pub struct CompressedGrammar {
    rules: BTreeMap<RuleId, CompressedRule>,
    sequence: Vec<Symbol>,
    metadata: Metadata,
}

impl CompressedGrammar {
    pub fn from_grammar(grammar: &Grammar) -> Self {
        Self::with_artificial_terminals(grammar, &HashSet::default())
    }

    /// Converts `grammar`, computing metadata with every rule in
    /// `artificial` treated as a terminal.
    pub fn with_artificial_terminals(grammar: &Grammar, artificial: &HashSet<RuleId>) -> Self {
        let rules = grammar
            .rules()
            .map(|(id, rule)| (id, CompressedRule::from_list(rule.rhs())))
            .collect();
        Self {
            rules,
            sequence: grammar.sequence().to_vec(),
            metadata: Metadata::with_artificial_terminals(grammar, artificial),
        }
    }

    /// Expands every rule back and rebuilds the plain grammar.
    pub fn to_grammar(&self) -> Result<Grammar, GrammarError> {
        let rules = self.rules.iter().map(|(&id, rule)| (id, rule.to_list()));
        Grammar::from_parts(rules, self.sequence.clone())
    }

    /// Sum of all rule sizes.
    pub fn total_size(&self) -> usize {
        self.rules.values().map(CompressedRule::size).sum()
    }

    pub fn rule(&self, id: RuleId) -> Option<&CompressedRule> {
        self.rules.get(&id)
    }

    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &CompressedRule)> + '_ {
        self.rules.iter().map(|(&id, rule)| (id, rule))
    }

    pub fn sequence(&self) -> &[Symbol] {
        &self.sequence
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

impl fmt::Display for CompressedGrammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, rule) in &self.rules {
            writeln!(f, "R{id}: {rule}")?;
        }
        let sequence: Vec<String> = self.sequence.iter().map(|s| s.to_string()).collect();
        writeln!(f, "SEQ: {}", sequence.join(" "))?;
        write!(f, "Total size: {}", self.total_size())
    }
}
