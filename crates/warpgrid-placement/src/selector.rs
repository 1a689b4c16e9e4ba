//! Label selector parsing and matching.
//!
//! Turns a [`LabelSelector`] (expression string or structured form) into a
//! [`Selector`] that can be evaluated against a label map. Parsing is where
//! selector semantics are checked; the snapshot types carry selectors
//! verbatim.
//!
//! Expression grammar, comma separated:
//!
//! ```text
//! key            key exists
//! !key           key does not exist
//! key=value      key==value      key!=value
//! key in (a,b)   key notin (a,b)
//! key > 3        key < 3
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use warpgrid_state::{LabelSelector, LabelSelectorRequirement};

const MAX_NAME_LEN: usize = 63;
const MAX_PREFIX_LEN: usize = 253;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]([-A-Za-z0-9_.]*[A-Za-z0-9])?$").expect("label name pattern")
});

static PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("label prefix pattern")
});

/// Errors produced while parsing a label selector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("found {found} at position {position} in {input:?}, expected {expected}")]
    Unexpected {
        input: String,
        position: usize,
        found: String,
        expected: &'static str,
    },

    #[error("invalid label key {0:?}")]
    InvalidKey(String),

    #[error("invalid label value {value:?} for key {key:?}")]
    InvalidValue { key: String, value: String },

    #[error("unknown operator {operator:?} for key {key:?}")]
    UnknownOperator { key: String, operator: String },

    #[error("operator {operator} on key {key:?} requires {expected}")]
    ValueCount {
        key: String,
        operator: Operator,
        expected: &'static str,
    },

    #[error("value {value:?} for key {key:?} is not an integer")]
    NotAnInteger { key: String, value: String },
}

/// Comparison applied by a [`Requirement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    In,
    NotIn,
    Exists,
    DoesNotExist,
    GreaterThan,
    LessThan,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operator::Equals => "=",
            Operator::NotEquals => "!=",
            Operator::In => "in",
            Operator::NotIn => "notin",
            Operator::Exists => "exists",
            Operator::DoesNotExist => "!",
            Operator::GreaterThan => ">",
            Operator::LessThan => "<",
        };
        f.write_str(s)
    }
}

/// A single validated `key <op> values` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    key: String,
    operator: Operator,
    values: BTreeSet<String>,
}

impl Requirement {
    /// Validate and build a requirement.
    pub fn new(
        key: impl Into<String>,
        operator: Operator,
        values: impl IntoIterator<Item = String>,
    ) -> Result<Self, SelectorError> {
        let key = key.into();
        validate_key(&key)?;
        let values: BTreeSet<String> = values.into_iter().collect();

        let expected = match operator {
            Operator::In | Operator::NotIn if values.is_empty() => Some("a non-empty value set"),
            Operator::Equals | Operator::NotEquals if values.len() != 1 => Some("exactly one value"),
            Operator::Exists | Operator::DoesNotExist if !values.is_empty() => Some("no values"),
            Operator::GreaterThan | Operator::LessThan if values.len() != 1 => {
                Some("exactly one value")
            }
            _ => None,
        };
        if let Some(expected) = expected {
            return Err(SelectorError::ValueCount {
                key,
                operator,
                expected,
            });
        }

        for value in &values {
            if matches!(operator, Operator::GreaterThan | Operator::LessThan) {
                if value.parse::<i64>().is_err() {
                    return Err(SelectorError::NotAnInteger {
                        key,
                        value: value.clone(),
                    });
                }
            } else {
                validate_value(&key, value)?;
            }
        }

        Ok(Self {
            key,
            operator,
            values,
        })
    }

    /// Whether `labels` satisfy this requirement.
    pub fn matches(&self, labels: &HashMap<String, String>) -> bool {
        let value = labels.get(&self.key);
        match self.operator {
            Operator::Equals | Operator::In => value.is_some_and(|v| self.values.contains(v)),
            Operator::NotEquals | Operator::NotIn => value.is_none_or(|v| !self.values.contains(v)),
            Operator::Exists => value.is_some(),
            Operator::DoesNotExist => value.is_none(),
            Operator::GreaterThan | Operator::LessThan => {
                let Some(actual) = value.and_then(|v| v.parse::<i64>().ok()) else {
                    return false;
                };
                let Some(bound) = self.values.first().and_then(|v| v.parse::<i64>().ok()) else {
                    return false;
                };
                if self.operator == Operator::GreaterThan {
                    actual > bound
                } else {
                    actual < bound
                }
            }
        }
    }
}

/// A parsed label query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Matches no label set.
    Nothing,
    /// Matches label sets satisfying every requirement. Empty matches all.
    All(Vec<Requirement>),
}

impl Selector {
    /// Parse an expression string.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        Parser::new(input).parse().map(Selector::All)
    }

    /// Convert an optional selector from the snapshot model.
    ///
    /// An absent selector selects nothing.
    pub fn from_label_selector(selector: Option<&LabelSelector>) -> Result<Self, SelectorError> {
        match selector {
            None => Ok(Selector::Nothing),
            Some(LabelSelector::Expression(expr)) => Selector::parse(expr),
            Some(LabelSelector::Structured {
                match_labels,
                match_expressions,
            }) => {
                let mut requirements = Vec::with_capacity(match_labels.len() + match_expressions.len());
                for (key, value) in match_labels {
                    requirements.push(Requirement::new(
                        key.clone(),
                        Operator::Equals,
                        [value.clone()],
                    )?);
                }
                for expr in match_expressions {
                    requirements.push(structured_requirement(expr)?);
                }
                // Deterministic order for equality and logging.
                requirements.sort_by(|a, b| a.key.cmp(&b.key));
                Ok(Selector::All(requirements))
            }
        }
    }

    pub fn matches(&self, labels: &HashMap<String, String>) -> bool {
        match self {
            Selector::Nothing => false,
            Selector::All(requirements) => requirements.iter().all(|r| r.matches(labels)),
        }
    }
}

fn structured_requirement(expr: &LabelSelectorRequirement) -> Result<Requirement, SelectorError> {
    let operator = match expr.operator.as_str() {
        "In" => Operator::In,
        "NotIn" => Operator::NotIn,
        "Exists" => Operator::Exists,
        "DoesNotExist" => Operator::DoesNotExist,
        other => {
            return Err(SelectorError::UnknownOperator {
                key: expr.key.clone(),
                operator: other.to_string(),
            });
        }
    };
    Requirement::new(expr.key.clone(), operator, expr.values.iter().cloned())
}

fn validate_key(key: &str) -> Result<(), SelectorError> {
    let invalid = || SelectorError::InvalidKey(key.to_string());
    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };
    if let Some(prefix) = prefix {
        if prefix.is_empty() || prefix.len() > MAX_PREFIX_LEN || !PREFIX_RE.is_match(prefix) {
            return Err(invalid());
        }
    }
    if name.is_empty() || name.len() > MAX_NAME_LEN || !NAME_RE.is_match(name) {
        return Err(invalid());
    }
    Ok(())
}

fn validate_value(key: &str, value: &str) -> Result<(), SelectorError> {
    if value.is_empty() || (value.len() <= MAX_NAME_LEN && NAME_RE.is_match(value)) {
        return Ok(());
    }
    Err(SelectorError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

// ── Lexer ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Comma,
    Equals,
    DoubleEquals,
    NotEquals,
    Bang,
    GreaterThan,
    LessThan,
    OpenParen,
    CloseParen,
    In,
    NotIn,
    End,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "identifier {s:?}"),
            Token::Comma => f.write_str("','"),
            Token::Equals => f.write_str("'='"),
            Token::DoubleEquals => f.write_str("'=='"),
            Token::NotEquals => f.write_str("'!='"),
            Token::Bang => f.write_str("'!'"),
            Token::GreaterThan => f.write_str("'>'"),
            Token::LessThan => f.write_str("'<'"),
            Token::OpenParen => f.write_str("'('"),
            Token::CloseParen => f.write_str("')'"),
            Token::In => f.write_str("'in'"),
            Token::NotIn => f.write_str("'notin'"),
            Token::End => f.write_str("end of input"),
        }
    }
}

impl Token {
    /// Text of a token usable as a key or value. `in` and `notin` are
    /// only operators right after a key.
    fn into_word(self) -> Result<String, Self> {
        match self {
            Token::Ident(word) => Ok(word),
            Token::In => Ok("in".to_string()),
            Token::NotIn => Ok("notin".to_string()),
            other => Err(other),
        }
    }
}

fn is_special(c: char) -> bool {
    matches!(c, ',' | '=' | '!' | '>' | '<' | '(' | ')')
}

fn lex(input: &str) -> Vec<(Token, usize)> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        chars.next();
        let token = match c {
            ',' => Token::Comma,
            '(' => Token::OpenParen,
            ')' => Token::CloseParen,
            '>' => Token::GreaterThan,
            '<' => Token::LessThan,
            '=' => {
                if chars.next_if(|&(_, c)| c == '=').is_some() {
                    Token::DoubleEquals
                } else {
                    Token::Equals
                }
            }
            '!' => {
                if chars.next_if(|&(_, c)| c == '=').is_some() {
                    Token::NotEquals
                } else {
                    Token::Bang
                }
            }
            _ => {
                let mut end = pos + c.len_utf8();
                while let Some((i, c)) = chars.next_if(|&(_, c)| !c.is_whitespace() && !is_special(c)) {
                    end = i + c.len_utf8();
                }
                match &input[pos..end] {
                    "in" => Token::In,
                    "notin" => Token::NotIn,
                    ident => Token::Ident(ident.to_string()),
                }
            }
        };
        tokens.push((token, pos));
    }

    tokens.push((Token::End, input.len()));
    tokens
}

// ── Parser ────────────────────────────────────────────────────────

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            tokens: lex(input),
            pos: 0,
        }
    }

    fn peek(&self) -> &Token {
        // `lex` always terminates the stream with `End`.
        &self.tokens[self.pos.min(self.tokens.len() - 1)].0
    }

    fn next(&mut self) -> (Token, usize) {
        let idx = self.pos.min(self.tokens.len() - 1);
        self.pos += 1;
        self.tokens[idx].clone()
    }

    /// Consume a key or value word.
    fn next_word(&mut self, expected: &'static str) -> Result<String, SelectorError> {
        let (token, position) = self.next();
        token
            .into_word()
            .map_err(|found| self.unexpected((found, position), expected))
    }

    fn unexpected(&self, (found, position): (Token, usize), expected: &'static str) -> SelectorError {
        SelectorError::Unexpected {
            input: self.input.to_string(),
            position,
            found: found.to_string(),
            expected,
        }
    }

    fn parse(mut self) -> Result<Vec<Requirement>, SelectorError> {
        let mut requirements = Vec::new();
        if *self.peek() == Token::End {
            return Ok(requirements);
        }

        loop {
            requirements.push(self.parse_requirement()?);
            match self.next() {
                (Token::Comma, _) => continue,
                (Token::End, _) => break,
                other => return Err(self.unexpected(other, "',' or end of input")),
            }
        }
        Ok(requirements)
    }

    fn parse_requirement(&mut self) -> Result<Requirement, SelectorError> {
        if *self.peek() == Token::Bang {
            self.next();
            let key = self.next_word("identifier")?;
            return Requirement::new(key, Operator::DoesNotExist, []);
        }
        let key = self.next_word("identifier or '!'")?;

        if matches!(self.peek(), Token::Comma | Token::End) {
            return Requirement::new(key, Operator::Exists, []);
        }

        let operator = match self.next() {
            (Token::Equals | Token::DoubleEquals, _) => Operator::Equals,
            (Token::NotEquals, _) => Operator::NotEquals,
            (Token::In, _) => Operator::In,
            (Token::NotIn, _) => Operator::NotIn,
            (Token::GreaterThan, _) => Operator::GreaterThan,
            (Token::LessThan, _) => Operator::LessThan,
            other => return Err(self.unexpected(other, "'=', '==', '!=', 'in', 'notin', '>' or '<'")),
        };

        let values = match operator {
            Operator::In | Operator::NotIn => self.parse_value_set()?,
            _ => vec![self.parse_single_value()?],
        };
        Requirement::new(key, operator, values)
    }

    fn parse_single_value(&mut self) -> Result<String, SelectorError> {
        match self.peek() {
            // `key=` selects the empty value.
            Token::Comma | Token::End => Ok(String::new()),
            _ => self.next_word("identifier"),
        }
    }

    fn parse_value_set(&mut self) -> Result<Vec<String>, SelectorError> {
        match self.next() {
            (Token::OpenParen, _) => {}
            other => return Err(self.unexpected(other, "'('")),
        }
        if *self.peek() == Token::CloseParen {
            self.next();
            return Ok(Vec::new());
        }

        let mut values = Vec::new();
        loop {
            let value = match self.peek() {
                Token::Comma | Token::CloseParen => String::new(),
                _ => self.next_word("identifier")?,
            };
            values.push(value);
            match self.next() {
                (Token::Comma, _) => continue,
                (Token::CloseParen, _) => break,
                other => return Err(self.unexpected(other, "',' or ')'")),
            }
        }
        Ok(values)
    }
}
