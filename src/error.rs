use thiserror::Error;

use crate::symbol::RuleId;

/// Errors raised by grammar construction and queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    /// An excerpt request outside `0 <= start < end <= total`.
    #[error("invalid range [{start}, {end}) for a string of length {total}")]
    InvalidRange {
        start: usize,
        end: usize,
        total: usize,
    },

    /// A non-terminal without a rule entry.
    #[error("missing rule for non-terminal R{0}")]
    MissingRule(RuleId),

    /// A rule id inside the terminal range.
    #[error("rule id {0} collides with the terminal range")]
    ReservedRuleId(RuleId),

    #[error("rule R{0} has an empty right-hand side")]
    EmptyRule(RuleId),

    /// Inserting the rule would make it reachable from itself.
    #[error("rule R{0} would reference itself")]
    CyclicRule(RuleId),

    /// The same rule id was defined twice.
    #[error("rule R{0} is defined more than once")]
    DuplicateRule(RuleId),

    /// An expanded length does not fit in `usize`.
    #[error("expanded length does not fit in usize")]
    LengthOverflow,
}
