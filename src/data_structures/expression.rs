//! String expressions with attribute substitution.
//!
//! `"tower_[height].gltf"` evaluates to `"tower_40.gltf"` for a feature whose
//! `height` attribute is `40`. Missing attributes evaluate to an empty string and
//! an unterminated `[` is kept as literal text.

use std::fmt;

use crate::data_structures::feature::Feature;

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Literal(String),
    Attribute(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StringExpression {
    source: String,
    tokens: Vec<Token>,
}

impl StringExpression {
    pub fn new(source: &str) -> Self {
        let mut tokens = Vec::new();
        let mut rest = source;
        while let Some(open) = rest.find('[') {
            let Some(close) = rest[open..].find(']').map(|c| open + c) else {
                break;
            };
            if open > 0 {
                tokens.push(Token::Literal(rest[..open].to_string()));
            }
            tokens.push(Token::Attribute(rest[open + 1..close].trim().to_string()));
            rest = &rest[close + 1..];
        }
        if !rest.is_empty() {
            tokens.push(Token::Literal(rest.to_string()));
        }
        Self {
            source: source.to_string(),
            tokens,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// `true` if the expression references no attribute and always evaluates to
    /// the same string.
    pub fn is_constant(&self) -> bool {
        self.tokens
            .iter()
            .all(|token| matches!(token, Token::Literal(_)))
    }

    pub fn eval(&self, feature: &Feature) -> String {
        self.tokens
            .iter()
            .map(|token| match token {
                Token::Literal(text) => text.clone(),
                Token::Attribute(name) => feature
                    .attr(name)
                    .map(ToString::to_string)
                    .unwrap_or_default(),
            })
            .collect()
    }
}

impl From<&str> for StringExpression {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl fmt::Display for StringExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}
