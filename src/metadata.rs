//! Reference bookkeeping over a grammar's rule table.
//!
//! `vocc` counts the distinct contexts that reference a rule, not how often
//! they do. It stands in for the rule's true occurrence count in the expanded
//! string without expanding anything.

use crate::error::GrammarError;
use crate::grammar::Grammar;
use crate::rle_rule::Block;
use crate::symbol::{RuleId, Symbol};
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use tracing::warn;

/// A place a non-terminal can be referenced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Context {
    /// The top-level sequence.
    Sequence,
    /// The right-hand side of a rule.
    Rule(RuleId),
}

/// Per rule, the non-terminals on its right-hand side with multiplicity.
pub type UsageMatrix = HashMap<RuleId, HashMap<RuleId, usize>>;

/// Per non-terminal, the set of contexts referencing it.
pub type ReverseUsageMap = HashMap<RuleId, HashSet<Context>>;

/// Counts the non-terminals used by each rule.
pub fn build_usage_matrix(grammar: &Grammar) -> UsageMatrix {
    grammar
        .rules()
        .map(|(id, rule)| {
            let mut counts: HashMap<RuleId, usize> = HashMap::default();
            for child in rule.children() {
                *counts.entry(child).or_insert(0) += 1;
            }
            (id, counts)
        })
        .collect()
}

/// Inverts the usage matrix, collapsing multiplicity.
///
/// Non-terminals in `sequence` additionally get [`Context::Sequence`].
pub fn build_reverse_usage_map(usage: &UsageMatrix, sequence: &[Symbol]) -> ReverseUsageMap {
    let mut reverse: ReverseUsageMap = HashMap::default();
    for (&parent, children) in usage {
        for &child in children.keys() {
            reverse.entry(child).or_default().insert(Context::Rule(parent));
        }
    }
    for id in sequence.iter().filter_map(|s| s.rule_id()) {
        reverse.entry(id).or_default().insert(Context::Sequence);
    }
    reverse
}

/// Per-rule figures for one snapshot of a grammar.
///
/// The blocks describe the rule's expansion as maximal runs of one symbol:
/// `leftmost` is the first run, `rightmost` the last. When the expansion is
/// a single run both are the same block and `single_block` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMetadata {
    /// Number of distinct contexts referencing the rule.
    pub vocc: usize,
    /// Expanded length, counting every artificial terminal as one symbol.
    pub length: usize,
    pub leftmost: Block,
    pub rightmost: Block,
    pub single_block: bool,
}

/// Block summary of a concatenation: only its borders are tracked, the
/// runs in between never matter to a parent.
#[derive(Debug, Clone, Copy)]
struct Runs {
    length: usize,
    leftmost: Block,
    rightmost: Block,
    single: bool,
}

impl Runs {
    fn unit(symbol: Symbol) -> Self {
        let block = Block { symbol, count: 1 };
        Self {
            length: 1,
            leftmost: block,
            rightmost: block,
            single: true,
        }
    }

    /// Summary of `self` followed by `next`. Touching runs of the same
    /// symbol merge into one block.
    fn append(self, next: Self) -> Self {
        let length = self.length.saturating_add(next.length);
        let joined = self.rightmost.symbol == next.leftmost.symbol;

        if joined && self.single && next.single {
            let block = Block {
                symbol: self.leftmost.symbol,
                count: self.leftmost.count.saturating_add(next.leftmost.count),
            };
            return Self {
                length,
                leftmost: block,
                rightmost: block,
                single: true,
            };
        }

        let mut leftmost = self.leftmost;
        let mut rightmost = next.rightmost;
        if joined && self.single {
            leftmost.count = leftmost.count.saturating_add(next.leftmost.count);
        }
        if joined && next.single {
            rightmost.count = rightmost.count.saturating_add(self.rightmost.count);
        }
        Self {
            length,
            leftmost,
            rightmost,
            single: false,
        }
    }
}

/// Usage maps and per-rule metadata for one snapshot of a grammar.
///
/// Any structural change to the grammar makes it stale.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    usage: UsageMatrix,
    reverse: ReverseUsageMap,
    rules: HashMap<RuleId, RuleMetadata>,
}

impl Metadata {
    pub fn compute(grammar: &Grammar) -> Self {
        Self::with_artificial_terminals(grammar, &HashSet::default())
    }

    /// Like [`compute`](Self::compute), but every rule in `artificial` is
    /// treated as an opaque terminal: its expansion is the single block
    /// `R<id>^1` and its parents see it as one symbol.
    pub fn with_artificial_terminals(grammar: &Grammar, artificial: &HashSet<RuleId>) -> Self {
        let usage = build_usage_matrix(grammar);
        let reverse = build_reverse_usage_map(&usage, grammar.sequence());

        let mut runs: HashMap<RuleId, Runs> = HashMap::with_capacity(grammar.rules.len());
        for id in children_first(grammar) {
            let summary = if artificial.contains(&id) {
                Runs::unit(Symbol::NonTerminal(id))
            } else {
                let mut symbols = grammar.rules[&id].rhs.iter().map(|&symbol| match symbol {
                    Symbol::NonTerminal(child) if !artificial.contains(&child) => {
                        runs.get(&child).copied().unwrap_or_else(|| Runs::unit(symbol))
                    }
                    _ => Runs::unit(symbol),
                });
                // Rules are never empty
                let Some(first) = symbols.next() else {
                    continue;
                };
                symbols.fold(first, Runs::append)
            };
            runs.insert(id, summary);
        }

        let rules = runs
            .into_iter()
            .map(|(id, summary)| {
                let vocc = reverse.get(&id).map_or(0, |parents| parents.len());
                let meta = RuleMetadata {
                    vocc,
                    length: summary.length,
                    leftmost: summary.leftmost,
                    rightmost: summary.rightmost,
                    single_block: summary.single,
                };
                (id, meta)
            })
            .collect();

        Self {
            usage,
            reverse,
            rules,
        }
    }

    /// Metadata of a rule present when this snapshot was taken.
    pub fn get(&self, id: RuleId) -> Option<&RuleMetadata> {
        self.rules.get(&id)
    }

    pub fn vocc(&self, id: RuleId) -> usize {
        self.rules.get(&id).map_or(0, |meta| meta.vocc)
    }

    /// Contexts referencing `id`.
    pub fn parents(&self, id: RuleId) -> Option<&HashSet<Context>> {
        self.reverse.get(&id)
    }

    /// How often `child` occurs on the right-hand side of `parent`.
    pub fn multiplicity(&self, parent: RuleId, child: RuleId) -> usize {
        self.usage
            .get(&parent)
            .and_then(|children| children.get(&child))
            .copied()
            .unwrap_or(0)
    }

    pub fn usage_matrix(&self) -> &UsageMatrix {
        &self.usage
    }

    pub fn reverse_usage_map(&self) -> &ReverseUsageMap {
        &self.reverse
    }
}

/// Rule ids with every rule placed after the rules it references.
///
/// Uses an explicit stack. A reference to a missing rule, or one that closes
/// a cycle, is logged and skipped; callers find no entry for it yet.
fn children_first(grammar: &Grammar) -> Vec<RuleId> {
    let mut order = Vec::with_capacity(grammar.rules.len());
    let mut done: HashSet<RuleId> = HashSet::with_capacity(grammar.rules.len());
    let mut active: HashSet<RuleId> = HashSet::default();

    for &root in grammar.rules.keys() {
        if done.contains(&root) {
            continue;
        }
        active.insert(root);
        let mut stack: Vec<(RuleId, usize)> = vec![(root, 0)];

        while let Some(frame) = stack.last_mut() {
            let (id, index) = *frame;

            let Some(&symbol) = grammar.rules[&id].rhs.get(index) else {
                order.push(id);
                done.insert(id);
                active.remove(&id);
                stack.pop();
                continue;
            };
            frame.1 += 1;

            let Symbol::NonTerminal(child) = symbol else {
                continue;
            };
            if done.contains(&child) {
                continue;
            }
            if !grammar.rules.contains_key(&child) {
                warn!(rule = id, missing = child, "inconsistent grammar: dangling reference, assuming length 1");
                continue;
            }
            if !active.insert(child) {
                warn!(rule = id, child, "inconsistent grammar: cyclic reference, assuming length 1");
                continue;
            }
            stack.push((child, 0));
        }
    }

    order
}

/// Lengths of all rules, children first, and the first rule whose length
/// does not fit in `usize` (that length and its ancestors' saturate).
fn bottom_up_lengths(grammar: &Grammar) -> (HashMap<RuleId, usize>, Option<RuleId>) {
    let mut lengths: HashMap<RuleId, usize> = HashMap::with_capacity(grammar.rules.len());
    let mut overflow = None;

    for id in children_first(grammar) {
        let length = grammar.rules[&id]
            .rhs
            .iter()
            .map(|&symbol| match symbol {
                Symbol::Terminal(_) => 1,
                Symbol::NonTerminal(child) => lengths.get(&child).copied().unwrap_or(1),
            })
            .try_fold(0usize, usize::checked_add);
        if length.is_none() {
            overflow = overflow.or(Some(id));
        }
        lengths.insert(id, length.unwrap_or(usize::MAX));
    }

    (lengths, overflow)
}

fn store_lengths(grammar: &mut Grammar, lengths: &HashMap<RuleId, usize>) {
    for (id, rule) in grammar.rules.iter_mut() {
        if let Some(&length) = lengths.get(id) {
            rule.length = length;
        }
    }
}

/// Recomputes every rule's cached length from its children.
///
/// Rules are evaluated children first with an explicit stack. A reference
/// to a missing rule, or one that closes a cycle, is logged and counted as
/// length 1; the computation carries on, so downstream lengths may be short.
/// A length that overflows `usize` is logged and saturates.
pub fn recompute_lengths(grammar: &mut Grammar) {
    let (lengths, overflow) = bottom_up_lengths(grammar);
    if let Some(id) = overflow {
        warn!(rule = id, "expanded length overflows usize, saturating");
    }
    store_lengths(grammar, &lengths);
}

/// Recomputes every cached length of a closed, acyclic grammar, failing
/// when one does not fit in `usize`. Lengths are left untouched on error.
pub(crate) fn try_recompute_lengths(grammar: &mut Grammar) -> Result<(), GrammarError> {
    let (lengths, overflow) = bottom_up_lengths(grammar);
    if overflow.is_some() {
        return Err(GrammarError::LengthOverflow);
    }
    store_lengths(grammar, &lengths);
    Ok(())
}
