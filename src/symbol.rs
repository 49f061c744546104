use std::fmt;

/// Identifier of a grammar rule. Valid ids start at [`FIRST_RULE_ID`].
pub type RuleId = u32;

/// Smallest id a rule may carry; everything below is a terminal byte.
pub const FIRST_RULE_ID: RuleId = 256;

/// A grammar symbol.
///
/// Terminals are literal bytes, non-terminals reference a rule by id. In the
/// integer encoding used by the text format, values `0..=255` are terminals
/// and every larger value is a rule id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Symbol {
    /// A literal byte.
    Terminal(u8),

    /// A reference to a rule.
    NonTerminal(RuleId),
}

impl Symbol {
    /// Decodes the integer encoding.
    pub fn from_raw(raw: u32) -> Self {
        match u8::try_from(raw) {
            Ok(byte) => Symbol::Terminal(byte),
            Err(_) => Symbol::NonTerminal(raw),
        }
    }

    /// Encodes the symbol as an integer.
    pub fn raw(self) -> u32 {
        match self {
            Symbol::Terminal(byte) => u32::from(byte),
            Symbol::NonTerminal(id) => id,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Symbol::Terminal(_))
    }

    /// Returns the referenced rule id, if this is a non-terminal.
    pub fn rule_id(self) -> Option<RuleId> {
        match self {
            Symbol::Terminal(_) => None,
            Symbol::NonTerminal(id) => Some(id),
        }
    }
}

impl From<u8> for Symbol {
    fn from(byte: u8) -> Self {
        Symbol::Terminal(byte)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Symbol::Terminal(byte) if byte.is_ascii_graphic() || byte == b' ' => {
                write!(f, "'{}'", byte as char)
            }
            Symbol::Terminal(byte) => write!(f, "\\x{byte:02x}"),
            Symbol::NonTerminal(id) => write!(f, "R{id}"),
        }
    }
}

/// An ordered pair of adjacent symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bigram(pub Symbol, pub Symbol);

impl Bigram {
    pub fn as_slice(&self) -> [Symbol; 2] {
        [self.0, self.1]
    }
}

impl fmt::Display for Bigram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.0, self.1)
    }
}
