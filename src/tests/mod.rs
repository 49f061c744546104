mod recompress_properties;

use crate::{Grammar, RuleId, Symbol, FIRST_RULE_ID};
use proptest::prelude::*;

/// Random closed binary grammar.
///
/// Each rule only references terminals or rules defined before it, so the
/// result is acyclic by construction. Rule and sequence counts are kept small
/// to bound the expanded length.
pub(crate) fn arb_grammar() -> impl Strategy<Value = Grammar> {
    (
        prop::collection::vec((any::<u16>(), any::<u16>()), 0..10),
        prop::collection::vec(any::<u16>(), 1..8),
        2u8..6,
    )
        .prop_map(|(pairs, seq, alphabet)| {
            let pick = |raw: u16, defined: usize| -> Symbol {
                let choices = usize::from(alphabet) + defined;
                let index = usize::from(raw) % choices;
                if index < usize::from(alphabet) {
                    Symbol::Terminal(b'a' + index as u8)
                } else {
                    Symbol::NonTerminal(FIRST_RULE_ID + (index - usize::from(alphabet)) as RuleId)
                }
            };

            let rules: Vec<(RuleId, Vec<Symbol>)> = pairs
                .iter()
                .enumerate()
                .map(|(i, &(left, right))| {
                    (FIRST_RULE_ID + i as RuleId, vec![pick(left, i), pick(right, i)])
                })
                .collect();
            let sequence = seq.iter().map(|&raw| pick(raw, rules.len())).collect();

            Grammar::from_parts(rules, sequence).expect("generated grammar is closed and acyclic")
        })
}

/// Random closed grammar with right-hand sides of one to four symbols,
/// acyclic the same way as [`arb_grammar`].
pub(crate) fn arb_nary_grammar() -> impl Strategy<Value = Grammar> {
    (
        prop::collection::vec(prop::collection::vec(any::<u16>(), 1..5), 0..8),
        prop::collection::vec(any::<u16>(), 1..8),
        2u8..6,
    )
        .prop_map(|(bodies, seq, alphabet)| {
            let pick = |raw: u16, defined: usize| -> Symbol {
                let index = usize::from(raw) % (usize::from(alphabet) + defined);
                match index.checked_sub(usize::from(alphabet)) {
                    None => Symbol::Terminal(b'a' + index as u8),
                    Some(rule) => Symbol::NonTerminal(FIRST_RULE_ID + rule as RuleId),
                }
            };

            let rules: Vec<(RuleId, Vec<Symbol>)> = bodies
                .iter()
                .enumerate()
                .map(|(i, body)| {
                    (FIRST_RULE_ID + i as RuleId, body.iter().map(|&raw| pick(raw, i)).collect())
                })
                .collect();
            let sequence = seq.iter().map(|&raw| pick(raw, rules.len())).collect();

            Grammar::from_parts(rules, sequence).expect("generated grammar is closed and acyclic")
        })
}

/// Balanced grammar over a small-alphabet byte string.
pub(crate) fn arb_text_grammar() -> impl Strategy<Value = (Vec<u8>, Grammar)> {
    prop::collection::vec(b'a'..=b'd', 0..200).prop_map(|text| {
        let grammar = Grammar::from_bytes(&text);
        (text, grammar)
    })
}
