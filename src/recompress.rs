//! RePair-style recompression of an existing grammar.
//!
//! Unlike plain RePair, which counts pairs in a flat string, this works on
//! the grammar directly. A pair inside a rule is weighted by the rule's
//! `vocc`, approximating how often the pair occurs in the expanded string.
//! Each round
//!
//! 1. merges a shared preceding symbol into rules that are always used as
//!    the last symbol behind it (popInlet),
//! 2. weights every adjacent pair,
//! 3. replaces the heaviest pair everywhere with a rule,
//!
//! until no pair weighs more than 1. Unreachable rules are swept at the end.
//!
//! # Example
//!
//! ```
//! use slp_recompress::{decompress, recompress, Grammar};
//!
//! let grammar = Grammar::from_bytes(b"abcabcabcabc");
//! let smaller = recompress(grammar);
//! assert_eq!(decompress(&smaller).unwrap(), b"abcabcabcabc");
//! ```

use crate::grammar::Grammar;
use crate::metadata::{Context, Metadata};
use crate::symbol::{Bigram, RuleId, Symbol};
use crate::trace::{RecompressObserver, TracingObserver};
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use std::cmp::Ordering;
use tracing::debug;

/// Knobs for a recompression run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecompressConfig {
    /// Stop after this many rounds even without a fixed point.
    pub max_rounds: Option<usize>,
    /// Run one popOutlet pass before the first round. It is never repeated
    /// inside the loop.
    pub pop_outlet: bool,
}

impl RecompressConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_rounds(mut self, rounds: usize) -> Self {
        self.max_rounds = Some(rounds);
        self
    }

    pub fn pop_outlet(mut self, enabled: bool) -> Self {
        self.pop_outlet = enabled;
        self
    }
}

/// Counters over a recompression run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecompressStats {
    pub rounds: usize,
    pub bigrams_replaced: usize,
    pub inlets_popped: usize,
    pub outlets_popped: usize,
    pub rules_pruned: usize,
}

/// Result of [`Recompressor::run`].
#[derive(Debug, Clone)]
pub struct Recompressed {
    pub grammar: Grammar,
    pub stats: RecompressStats,
}

/// What a single round did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// `bigram` was replaced by `rule` at `occurrences` places.
    Replaced {
        bigram: Bigram,
        frequency: usize,
        rule: RuleId,
        occurrences: usize,
    },
    /// No bigram weighs more than 1.
    FixedPoint,
}

/// A bigram with its weighted frequency.
///
/// Ordered by frequency; among equal frequencies the smaller bigram ranks
/// higher, so the maximum is unique.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct PairRecord {
    frequency: usize,
    bigram: Bigram,
}

impl Ord for PairRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.frequency
            .cmp(&other.frequency)
            .then_with(|| other.bigram.cmp(&self.bigram))
    }
}

impl PartialOrd for PairRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Drives the recompression of one grammar.
///
/// Owns the grammar for the duration of the run; every round sees the fully
/// updated result of the previous one.
pub struct Recompressor<O = TracingObserver> {
    grammar: Grammar,
    config: RecompressConfig,
    observer: O,
    stats: RecompressStats,
}

impl Recompressor {
    pub fn new(grammar: Grammar) -> Self {
        Self {
            grammar,
            config: RecompressConfig::default(),
            observer: TracingObserver,
            stats: RecompressStats::default(),
        }
    }
}

impl<O: RecompressObserver> Recompressor<O> {
    pub fn with_config(mut self, config: RecompressConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the observer receiving structural events.
    pub fn with_observer<P: RecompressObserver>(self, observer: P) -> Recompressor<P> {
        Recompressor {
            grammar: self.grammar,
            config: self.config,
            observer,
            stats: self.stats,
        }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn stats(&self) -> RecompressStats {
        self.stats
    }

    pub fn into_grammar(self) -> Grammar {
        self.grammar
    }

    /// Runs rounds until a fixed point (or the round limit), then prunes.
    pub fn run(mut self) -> Recompressed {
        if self.config.pop_outlet {
            self.pop_outlet();
        }
        loop {
            if let Some(max) = self.config.max_rounds {
                if self.stats.rounds >= max {
                    debug!(max, "round limit reached");
                    break;
                }
            }
            if self.round() == RoundOutcome::FixedPoint {
                break;
            }
        }
        self.prune();

        Recompressed {
            grammar: self.grammar,
            stats: self.stats,
        }
    }

    /// Runs a single round.
    pub fn round(&mut self) -> RoundOutcome {
        self.stats.rounds += 1;
        let round = self.stats.rounds;
        self.observer.round_started(round, &self.grammar);

        let metadata = Metadata::compute(&self.grammar);
        self.pop_inlet_with(&metadata);
        self.grammar.recompute_lengths();

        let metadata = Metadata::compute(&self.grammar);
        let best = bigram_frequencies(&self.grammar, &metadata)
            .into_iter()
            .map(|(bigram, frequency)| PairRecord { frequency, bigram })
            .max();

        match best {
            Some(record) if record.frequency > 1 => {
                let (rule, occurrences) = self.replace_bigram(record.bigram);
                self.grammar.recompute_lengths();
                self.stats.bigrams_replaced += 1;
                self.observer
                    .bigram_replaced(record.bigram, record.frequency, rule, occurrences);
                RoundOutcome::Replaced {
                    bigram: record.bigram,
                    frequency: record.frequency,
                    rule,
                    occurrences,
                }
            }
            best => {
                self.observer
                    .fixed_point(round, best.map(|record| (record.bigram, record.frequency)));
                RoundOutcome::FixedPoint
            }
        }
    }

    /// Runs one popInlet pass on fresh metadata. Returns the number of rules
    /// inlined.
    pub fn pop_inlet(&mut self) -> usize {
        let metadata = Metadata::compute(&self.grammar);
        let popped = self.pop_inlet_with(&metadata);
        self.grammar.recompute_lengths();
        popped
    }

    /// Runs one popOutlet pass on fresh metadata. Returns the number of rules
    /// spliced into their parent.
    pub fn pop_outlet(&mut self) -> usize {
        let metadata = Metadata::compute(&self.grammar);
        let popped = self.pop_outlet_with(&metadata);
        self.grammar.recompute_lengths();
        popped
    }

    /// Deletes rules unreachable from the sequence.
    pub fn prune(&mut self) -> usize {
        let removed = self.grammar.prune_unreachable();
        self.stats.rules_pruned += removed;
        self.observer.pruned(removed);
        removed
    }

    /// For every rule `T` whose parents all end with `[x, T]` for the same
    /// `x`, creates `T' = x T.rhs`, points the parents at it and drops `T`.
    ///
    /// `metadata` is the snapshot from the start of the pass. A target whose
    /// snapshot parents no longer all exist is skipped.
    fn pop_inlet_with(&mut self, metadata: &Metadata) -> usize {
        let targets: Vec<RuleId> = self.grammar.rule_ids().collect();
        let mut popped = 0;

        for target in targets {
            let Some(parents) = metadata.parents(target) else {
                continue;
            };
            let Some(prefix) = self.inlet_prefix(target, parents) else {
                continue;
            };
            let Some(target_rhs) = self.grammar.rule(target).map(|rule| rule.rhs().to_vec()) else {
                continue;
            };

            let mut merged_rhs = Vec::with_capacity(target_rhs.len() + 1);
            merged_rhs.push(prefix);
            merged_rhs.extend(target_rhs);
            let merged = self.grammar.add_rule(merged_rhs);

            for context in parents {
                let Context::Rule(parent) = *context else {
                    continue;
                };
                if let Some(rule) = self.grammar.rules.get_mut(&parent) {
                    let keep = rule.rhs.len() - 2;
                    rule.rhs.truncate(keep);
                    rule.rhs.push(Symbol::NonTerminal(merged));
                }
            }
            self.grammar.remove_rule(target);

            self.observer.inlet_popped(target, merged, parents.len());
            popped += 1;
        }

        self.stats.inlets_popped += popped;
        popped
    }

    /// The symbol every parent places right before `target`, if `target` is
    /// eligible for popInlet.
    fn inlet_prefix(&self, target: RuleId, parents: &HashSet<Context>) -> Option<Symbol> {
        if !self.grammar.contains_rule(target) {
            return None;
        }
        let target_symbol = Symbol::NonTerminal(target);
        let mut prefix = None;

        for context in parents {
            let Context::Rule(parent) = *context else {
                return None;
            };
            let rule = self.grammar.rule(parent)?;
            let [.., before, last] = rule.rhs() else {
                return None;
            };
            if *last != target_symbol || rule.occurrences(target_symbol) != 1 {
                return None;
            }
            match prefix {
                None => prefix = Some(*before),
                Some(symbol) if symbol == *before => {}
                Some(_) => return None,
            }
        }
        prefix
    }

    /// Splices a rule's first or last non-terminal in place when that
    /// non-terminal is used exactly once, by this rule only.
    fn pop_outlet_with(&mut self, metadata: &Metadata) -> usize {
        let ids: Vec<RuleId> = self.grammar.rule_ids().collect();
        let mut popped = 0;

        for parent in ids {
            for at_end in [false, true] {
                let Some(rule) = self.grammar.rule(parent) else {
                    break;
                };
                let edge = if at_end { rule.last() } else { rule.first() };
                let Symbol::NonTerminal(child) = edge else {
                    continue;
                };
                if !is_sole_use(metadata, parent, child) {
                    continue;
                }
                let Some(child_rule) = self.grammar.remove_rule(child) else {
                    continue;
                };
                let Some(rule) = self.grammar.rules.get_mut(&parent) else {
                    continue;
                };

                let index = if at_end { rule.rhs.len() - 1 } else { 0 };
                let mut rhs = Vec::with_capacity(rule.rhs.len() + child_rule.rhs.len() - 1);
                rhs.extend_from_slice(&rule.rhs[..index]);
                rhs.extend_from_slice(&child_rule.rhs);
                rhs.extend_from_slice(&rule.rhs[index + 1..]);
                rule.rhs = rhs;

                self.observer.outlet_popped(parent, child);
                popped += 1;
            }
        }

        self.stats.outlets_popped += popped;
        popped
    }

    /// Replaces every non-overlapping occurrence of `bigram`, scanning each
    /// sequence left to right. Reuses an existing rule defining exactly
    /// `bigram`, otherwise allocates one.
    fn replace_bigram(&mut self, bigram: Bigram) -> (RuleId, usize) {
        let rule = match defining_rules(&self.grammar).get(&bigram) {
            Some(&id) => id,
            None => self.grammar.add_rule(bigram.as_slice().to_vec()),
        };
        let replacement = Symbol::NonTerminal(rule);

        let mut occurrences = replace_pairs(&mut self.grammar.sequence, bigram, replacement);
        for (&id, other) in self.grammar.rules.iter_mut() {
            if id != rule {
                occurrences += replace_pairs(&mut other.rhs, bigram, replacement);
            }
        }
        (rule, occurrences)
    }
}

fn is_sole_use(metadata: &Metadata, parent: RuleId, child: RuleId) -> bool {
    metadata.vocc(child) == 1
        && metadata
            .parents(child)
            .is_some_and(|parents| parents.contains(&Context::Rule(parent)))
        && metadata.multiplicity(parent, child) == 1
}

/// For each bigram, the lowest-id rule whose whole right-hand side is it.
fn defining_rules(grammar: &Grammar) -> HashMap<Bigram, RuleId> {
    let mut defining = HashMap::default();
    for (id, rule) in grammar.rules() {
        if let Some((left, right)) = rule.as_pair() {
            defining.entry(Bigram(left, right)).or_insert(id);
        }
    }
    defining
}

/// Weighted frequency of every adjacent pair.
///
/// A pair in the top sequence counts 1; a pair inside a rule counts the
/// rule's `vocc`. Rules unknown to `metadata`, and the rule that already
/// defines a bigram as its whole right-hand side, contribute nothing.
pub fn bigram_frequencies(grammar: &Grammar, metadata: &Metadata) -> HashMap<Bigram, usize> {
    let mut frequencies: HashMap<Bigram, usize> = HashMap::default();
    for pair in grammar.sequence().windows(2) {
        *frequencies.entry(Bigram(pair[0], pair[1])).or_insert(0) += 1;
    }

    let defining = defining_rules(grammar);
    for (id, rule) in grammar.rules() {
        let Some(meta) = metadata.get(id) else {
            continue;
        };
        if meta.vocc == 0 {
            continue;
        }
        // A rule that is exactly the bigram defines it rather than using it.
        // Counting it would keep every defined pair above 1 forever, and
        // replacement reuses that rule instead of minting a copy.
        if let Some((left, right)) = rule.as_pair() {
            if defining.get(&Bigram(left, right)) == Some(&id) {
                continue;
            }
        }
        for pair in rule.rhs().windows(2) {
            *frequencies.entry(Bigram(pair[0], pair[1])).or_insert(0) += meta.vocc;
        }
    }
    frequencies
}

/// Greedy left-to-right replacement. Returns the number of pairs replaced.
fn replace_pairs(symbols: &mut Vec<Symbol>, bigram: Bigram, replacement: Symbol) -> usize {
    let mut count = 0;
    let mut read = 0;
    let mut write = 0;

    while read < symbols.len() {
        if read + 1 < symbols.len() && symbols[read] == bigram.0 && symbols[read + 1] == bigram.1 {
            symbols[write] = replacement;
            read += 2;
            count += 1;
        } else {
            symbols[write] = symbols[read];
            read += 1;
        }
        write += 1;
    }

    symbols.truncate(write);
    count
}

/// Recompresses `grammar` to a fixed point with default settings.
pub fn recompress(grammar: Grammar) -> Grammar {
    Recompressor::new(grammar).run().grammar
}
