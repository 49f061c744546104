//! Hooks for watching the recompressor work.

use crate::grammar::Grammar;
use crate::symbol::{Bigram, RuleId};
use tracing::{debug, info};

/// Receives one call per structural event of a recompression run.
///
/// Every method has an empty default body, so an observer only implements
/// what it cares about. `()` ignores everything.
pub trait RecompressObserver {
    fn round_started(&mut self, _round: usize, _grammar: &Grammar) {}

    /// `target` was inlined into the new rule `merged`, which now ends
    /// `parents` rules.
    fn inlet_popped(&mut self, _target: RuleId, _merged: RuleId, _parents: usize) {}

    /// `child` was spliced into its only user `parent`.
    fn outlet_popped(&mut self, _parent: RuleId, _child: RuleId) {}

    fn bigram_replaced(&mut self, _bigram: Bigram, _frequency: usize, _rule: RuleId, _occurrences: usize) {}

    /// No bigram is frequent enough to replace. `best` is the top candidate.
    fn fixed_point(&mut self, _round: usize, _best: Option<(Bigram, usize)>) {}

    fn pruned(&mut self, _removed: usize) {}
}

impl RecompressObserver for () {}

impl<O: RecompressObserver + ?Sized> RecompressObserver for &mut O {
    fn round_started(&mut self, round: usize, grammar: &Grammar) {
        (**self).round_started(round, grammar);
    }

    fn inlet_popped(&mut self, target: RuleId, merged: RuleId, parents: usize) {
        (**self).inlet_popped(target, merged, parents);
    }

    fn outlet_popped(&mut self, parent: RuleId, child: RuleId) {
        (**self).outlet_popped(parent, child);
    }

    fn bigram_replaced(&mut self, bigram: Bigram, frequency: usize, rule: RuleId, occurrences: usize) {
        (**self).bigram_replaced(bigram, frequency, rule, occurrences);
    }

    fn fixed_point(&mut self, round: usize, best: Option<(Bigram, usize)>) {
        (**self).fixed_point(round, best);
    }

    fn pruned(&mut self, removed: usize) {
        (**self).pruned(removed);
    }
}

/// Default observer: forwards every event to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl RecompressObserver for TracingObserver {
    fn round_started(&mut self, round: usize, grammar: &Grammar) {
        debug!(
            round,
            rules = grammar.rule_count(),
            sequence = grammar.sequence().len(),
            "recompression round"
        );
    }

    fn inlet_popped(&mut self, target: RuleId, merged: RuleId, parents: usize) {
        debug!(target, merged, parents, "popped inlet");
    }

    fn outlet_popped(&mut self, parent: RuleId, child: RuleId) {
        debug!(parent, child, "popped outlet");
    }

    fn bigram_replaced(&mut self, bigram: Bigram, frequency: usize, rule: RuleId, occurrences: usize) {
        info!(%bigram, frequency, rule, occurrences, "replaced bigram");
    }

    fn fixed_point(&mut self, round: usize, best: Option<(Bigram, usize)>) {
        match best {
            Some((bigram, frequency)) => {
                info!(round, %bigram, frequency, "fixed point reached")
            }
            None => info!(round, "fixed point reached, no bigrams left"),
        }
    }

    fn pruned(&mut self, removed: usize) {
        debug!(removed, "pruned unreachable rules");
    }
}
