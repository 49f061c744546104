use super::{arb_grammar, arb_nary_grammar, arb_text_grammar};
use crate::{decompress, Grammar, Metadata, RecompressConfig, RecompressObserver, Recompressor, Symbol};
use proptest::prelude::*;

/// Generous cap; the tested inputs reach their fixed point well before it.
const MAX_ROUNDS: usize = 1_000;

fn run(grammar: Grammar, pop_outlet: bool) -> crate::Recompressed {
    let config = RecompressConfig::new()
        .max_rounds(MAX_ROUNDS)
        .pop_outlet(pop_outlet);
    Recompressor::new(grammar)
        .with_config(config)
        .with_observer(())
        .run()
}

/// Rounds after which an uncapped run counts as stuck.
const ROUND_GUARD: usize = 10_000;

/// Fails the test once a run goes past [`ROUND_GUARD`] rounds.
struct RoundGuard;

impl RecompressObserver for RoundGuard {
    fn round_started(&mut self, round: usize, _grammar: &Grammar) {
        assert!(round <= ROUND_GUARD, "no fixed point after {ROUND_GUARD} rounds");
    }
}

/// Runs without a round limit, so only reaching a fixed point ends it.
fn run_uncapped(grammar: Grammar, pop_outlet: bool) -> crate::Recompressed {
    let config = RecompressConfig::new().pop_outlet(pop_outlet);
    Recompressor::new(grammar)
        .with_config(config)
        .with_observer(RoundGuard)
        .run()
}

proptest! {
    /// Recompression never changes the represented string.
    #[test]
    fn prop_recompress_preserves_text((text, grammar) in arb_text_grammar()) {
        let result = run(grammar, false);
        prop_assert_eq!(decompress(&result.grammar).unwrap(), text);
    }

    /// Same with a popOutlet pass up front.
    #[test]
    fn prop_recompress_with_outlet_preserves_text((text, grammar) in arb_text_grammar()) {
        let result = run(grammar, true);
        prop_assert_eq!(decompress(&result.grammar).unwrap(), text);
    }

    /// Arbitrary binary grammars, including unreachable and shared rules.
    #[test]
    fn prop_recompress_preserves_random_grammar(grammar in arb_grammar()) {
        let expected = decompress(&grammar).unwrap();
        let result = run(grammar, false);
        prop_assert_eq!(decompress(&result.grammar).unwrap(), expected);
    }

    /// The result is closed, acyclic, fully reachable and its cached
    /// lengths agree with the expansion.
    #[test]
    fn prop_recompressed_grammar_is_consistent(grammar in arb_grammar()) {
        let result = run(grammar, true);
        let grammar = result.grammar;
        prop_assert!(grammar.validate().is_ok());

        for (id, rule) in grammar.rules() {
            prop_assert!(!rule.rhs().is_empty(), "rule {} is empty", id);
            let expanded = grammar.expand(&Symbol::NonTerminal(id)).count();
            prop_assert_eq!(rule.length(), expanded);
        }

        let mut pruned = grammar.clone();
        prop_assert_eq!(pruned.prune_unreachable(), 0);
    }

    /// Each round that does not report a fixed point replaces something.
    #[test]
    fn prop_rounds_make_progress((_text, grammar) in arb_text_grammar(), pop_outlet in any::<bool>()) {
        let result = run_uncapped(grammar, pop_outlet);
        prop_assert_eq!(result.stats.bigrams_replaced + 1, result.stats.rounds);
    }

    /// Grammars with rules of any arity reach a fixed point without a round
    /// limit, keep their text and end with no bigram weighing more than 1.
    #[test]
    fn prop_nary_grammar_terminates(grammar in arb_nary_grammar(), pop_outlet in any::<bool>()) {
        let expected = decompress(&grammar).unwrap();
        let result = run_uncapped(grammar, pop_outlet);
        prop_assert_eq!(decompress(&result.grammar).unwrap(), expected);

        let metadata = Metadata::compute(&result.grammar);
        let frequencies = crate::bigram_frequencies(&result.grammar, &metadata);
        prop_assert!(frequencies.values().all(|&frequency| frequency <= 1));
    }

    /// At the end of a run no bigram weighs more than 1.
    #[test]
    fn prop_stops_at_fixed_point((_text, grammar) in arb_text_grammar()) {
        let mut recompressor = Recompressor::new(grammar).with_observer(());
        while recompressor.round() != crate::RoundOutcome::FixedPoint {
            prop_assert!(recompressor.stats().rounds < MAX_ROUNDS);
        }
        let grammar = recompressor.grammar();
        let metadata = Metadata::compute(grammar);
        let frequencies = crate::bigram_frequencies(grammar, &metadata);
        prop_assert!(frequencies.values().all(|&frequency| frequency <= 1));
    }

    /// A grammar already at a fixed point keeps its rules and sequence.
    #[test]
    fn prop_fixed_point_is_stable(
        bytes in prop::sample::subsequence((0u8..=255).collect::<Vec<_>>(), 0..64).prop_shuffle(),
        wrap in any::<bool>(),
    ) {
        // Distinct bytes give distinct pairs; optionally hide them in a rule.
        let symbols: Vec<Symbol> = bytes.iter().map(|&b| b.into()).collect();
        let grammar = if wrap && symbols.len() >= 2 {
            Grammar::from_parts(vec![(256, symbols)], vec![Symbol::NonTerminal(256)]).unwrap()
        } else {
            Grammar::new(symbols)
        };

        let result = run(grammar.clone(), false);
        prop_assert_eq!(result.stats.bigrams_replaced, 0);
        prop_assert_eq!(result.grammar.rule_count(), grammar.rule_count());
        prop_assert_eq!(result.grammar.sequence(), grammar.sequence());
    }

    /// Pruning twice removes nothing the second time.
    #[test]
    fn prop_prune_idempotent(grammar in arb_grammar()) {
        let mut grammar = grammar;
        let expected = decompress(&grammar).unwrap();
        grammar.prune_unreachable();
        let snapshot = grammar.clone();
        prop_assert_eq!(grammar.prune_unreachable(), 0);
        prop_assert_eq!(&grammar, &snapshot);
        prop_assert_eq!(decompress(&grammar).unwrap(), expected);
    }

    /// Repeated text yields fewer grammar symbols than text symbols.
    #[test]
    fn prop_repetition_compresses(
        pattern in prop::collection::vec(any::<u8>(), 2..6),
        reps in 4..16usize,
    ) {
        let text = pattern.repeat(reps);
        let result = run(Grammar::new(text.iter().map(|&b| b.into()).collect()), false);
        let stats = result.grammar.stats();
        prop_assert!(
            stats.rhs_symbols + stats.sequence_len < text.len(),
            "{} grammar symbols for {} bytes",
            stats.rhs_symbols + stats.sequence_len,
            text.len()
        );
        prop_assert_eq!(decompress(&result.grammar).unwrap(), text);
    }
}

/// Bolero fuzz test: recompression neither panics nor alters the text
#[cfg(test)]
#[test]
fn fuzz_recompress_roundtrip() {
    bolero::check!().with_type::<Vec<u8>>().for_each(|input| {
        let grammar = Grammar::from_bytes(input);
        let result = run(grammar, false);
        assert_eq!(decompress(&result.grammar).unwrap(), *input);
        assert_eq!(result.grammar.total_length(), Ok(input.len()));
    });
}

/// Bolero fuzz test: the flat sequence form recompresses the same way
#[cfg(test)]
#[test]
fn fuzz_recompress_flat_sequence() {
    bolero::check!().with_type::<Vec<u8>>().for_each(|input| {
        let grammar = Grammar::new(input.iter().map(|&b| b.into()).collect());
        let result = run(grammar, true);
        assert_eq!(decompress(&result.grammar).unwrap(), *input);
        assert!(result.grammar.validate().is_ok());
    });
}
