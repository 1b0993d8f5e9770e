//! Namespace interaction specifications.
//!
//! Interactions cross the features of several namespaces. Two spellings are
//! accepted:
//!
//! ```text
//!   "ab"          quadratic: namespace index 'a' × namespace index 'b'
//!   "abc"         cubic
//!   "user|item"   extent interaction over full namespace names
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InteractionParseError {
    #[error("interaction must name at least two namespaces: {0:?}")]
    TooShort(String),

    #[error("interaction contains an empty namespace name: {0:?}")]
    EmptyTerm(String),

    #[error("namespace interactions must be ASCII: {0:?}")]
    NonAscii(String),
}

/// A namespace interaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Interaction {
    /// Interaction over single-byte namespace indices.
    Namespaces(Vec<u8>),
    /// Interaction over full namespace names.
    Extents(Vec<String>),
}

impl Interaction {
    pub fn quadratic(a: u8, b: u8) -> Self {
        Interaction::Namespaces(vec![a, b])
    }

    pub fn cubic(a: u8, b: u8, c: u8) -> Self {
        Interaction::Namespaces(vec![a, b, c])
    }

    /// Number of namespaces crossed.
    pub fn arity(&self) -> usize {
        match self {
            Interaction::Namespaces(terms) => terms.len(),
            Interaction::Extents(terms) => terms.len(),
        }
    }

    /// The namespace pair if this is a quadratic index interaction.
    pub fn as_quadratic(&self) -> Option<(u8, u8)> {
        match self {
            Interaction::Namespaces(terms) if terms.len() == 2 => Some((terms[0], terms[1])),
            _ => None,
        }
    }

    pub fn is_extent(&self) -> bool {
        matches!(self, Interaction::Extents(_))
    }

    pub fn parse(spec: &str) -> Result<Self, InteractionParseError> {
        if spec.contains('|') {
            let terms: Vec<String> = spec.split('|').map(|t| t.trim().to_string()).collect();
            if terms.iter().any(|t| t.is_empty()) {
                return Err(InteractionParseError::EmptyTerm(spec.to_string()));
            }
            if terms.len() < 2 {
                return Err(InteractionParseError::TooShort(spec.to_string()));
            }
            return Ok(Interaction::Extents(terms));
        }
        if !spec.is_ascii() {
            return Err(InteractionParseError::NonAscii(spec.to_string()));
        }
        if spec.len() < 2 {
            return Err(InteractionParseError::TooShort(spec.to_string()));
        }
        Ok(Interaction::Namespaces(spec.as_bytes().to_vec()))
    }

    /// Parse a list of interaction strings.
    pub fn parse_all<S: AsRef<str>>(specs: &[S]) -> Result<Vec<Self>, InteractionParseError> {
        specs.iter().map(|s| Self::parse(s.as_ref())).collect()
    }
}

impl std::fmt::Display for Interaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Interaction::Namespaces(terms) => {
                for &t in terms {
                    write!(f, "{}", t as char)?;
                }
                Ok(())
            }
            Interaction::Extents(terms) => write!(f, "{}", terms.join("|")),
        }
    }
}

impl TryFrom<String> for Interaction {
    type Error = InteractionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Interaction::parse(&value)
    }
}

impl From<Interaction> for String {
    fn from(value: Interaction) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quadratic_and_cubic() {
        assert_eq!(Interaction::parse("ab").unwrap(), Interaction::quadratic(b'a', b'b'));
        let cubic = Interaction::parse("abc").unwrap();
        assert_eq!(cubic.arity(), 3);
        assert!(cubic.as_quadratic().is_none());
    }

    #[test]
    fn parse_extents() {
        let ext = Interaction::parse("user|item").unwrap();
        assert!(ext.is_extent());
        assert_eq!(ext.to_string(), "user|item");
    }

    #[test]
    fn parse_rejects_bad_specs() {
        assert!(matches!(
            Interaction::parse("a"),
            Err(InteractionParseError::TooShort(_))
        ));
        assert!(matches!(
            Interaction::parse("user|"),
            Err(InteractionParseError::EmptyTerm(_))
        ));
        assert!(matches!(
            Interaction::parse("äb"),
            Err(InteractionParseError::NonAscii(_))
        ));
    }

    #[test]
    fn serde_uses_string_form() {
        let json = serde_json::to_string(&vec![Interaction::quadratic(b'u', b'a')]).unwrap();
        assert_eq!(json, "[\"ua\"]");
        let back: Vec<Interaction> = serde_json::from_str("[\"ua\",\"x|y\"]").unwrap();
        assert_eq!(back[1], Interaction::Extents(vec!["x".into(), "y".into()]));
    }
}
