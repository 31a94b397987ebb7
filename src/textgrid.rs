//! Reader for Praat TextGrid annotation files.
//!
//! Both the long ("verbose") and short text formats are accepted. Files may be UTF-8 or
//! UTF-16 with a byte-order mark. Parsing works on a token stream of numbers, quoted strings,
//! and `<flag>` values, which is what both formats have in common.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TextGridError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid TextGrid {path}: {message}")]
    Invalid { path: PathBuf, message: String },
    #[error("{0}")]
    Syntax(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Interval {
    pub xmin: f64,
    pub xmax: f64,
    pub text: String,
}

impl Interval {
    pub fn duration(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn midpoint(&self) -> f64 {
        0.5 * (self.xmin + self.xmax)
    }

    pub fn is_labeled(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub time: f64,
    pub mark: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tier {
    Interval {
        name: String,
        xmin: f64,
        xmax: f64,
        intervals: Vec<Interval>,
    },
    Point {
        name: String,
        xmin: f64,
        xmax: f64,
        points: Vec<Point>,
    },
}

impl Tier {
    pub fn name(&self) -> &str {
        match self {
            Tier::Interval { name, .. } | Tier::Point { name, .. } => name,
        }
    }

    /// Intervals of an interval tier; empty for point tiers.
    pub fn intervals(&self) -> &[Interval] {
        match self {
            Tier::Interval { intervals, .. } => intervals,
            Tier::Point { .. } => &[],
        }
    }

    /// Intervals with non-blank text.
    pub fn labeled_intervals(&self) -> impl Iterator<Item = &Interval> {
        self.intervals().iter().filter(|interval| interval.is_labeled())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextGrid {
    pub xmin: f64,
    pub xmax: f64,
    pub tiers: Vec<Tier>,
}

impl TextGrid {
    pub fn read(path: &Path) -> Result<Self, TextGridError> {
        let bytes = std::fs::read(path).map_err(|source| TextGridError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&decode_text(&bytes)).map_err(|err| match err {
            TextGridError::Syntax(message) => TextGridError::Invalid {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    pub fn parse(text: &str) -> Result<Self, TextGridError> {
        let mut tokens = TokenStream::new(tokenize(text));
        let file_type = tokens.text()?;
        let object_class = tokens.text()?;
        if file_type != "ooTextFile" || object_class != "TextGrid" {
            return Err(TextGridError::Syntax(format!(
                "expected an ooTextFile TextGrid, found `{file_type}` / `{object_class}`"
            )));
        }
        let xmin = tokens.number()?;
        let xmax = tokens.number()?;
        let mut tiers = Vec::new();
        if tokens.flag()? == "exists" {
            let count = tokens.count()?;
            for _ in 0..count {
                tiers.push(parse_tier(&mut tokens)?);
            }
        }
        Ok(Self { xmin, xmax, tiers })
    }

    pub fn tier(&self, name: &str) -> Option<&Tier> {
        self.tiers.iter().find(|tier| tier.name() == name)
    }
}

fn parse_tier(tokens: &mut TokenStream) -> Result<Tier, TextGridError> {
    let class = tokens.text()?;
    let name = tokens.text()?;
    let xmin = tokens.number()?;
    let xmax = tokens.number()?;
    let count = tokens.count()?;
    match class.as_str() {
        "IntervalTier" => {
            let mut intervals = Vec::with_capacity(count);
            for _ in 0..count {
                intervals.push(Interval {
                    xmin: tokens.number()?,
                    xmax: tokens.number()?,
                    text: tokens.text()?,
                });
            }
            Ok(Tier::Interval {
                name,
                xmin,
                xmax,
                intervals,
            })
        }
        "TextTier" => {
            let mut points = Vec::with_capacity(count);
            for _ in 0..count {
                points.push(Point {
                    time: tokens.number()?,
                    mark: tokens.text()?,
                });
            }
            Ok(Tier::Point {
                name,
                xmin,
                xmax,
                points,
            })
        }
        other => Err(TextGridError::Syntax(format!("unknown tier class `{other}`"))),
    }
}

fn decode_text(bytes: &[u8]) -> String {
    match bytes {
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8_lossy(rest).into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Text(String),
    Flag(String),
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                while let Some(c) = chars.next() {
                    if c == '"' {
                        if chars.peek() == Some(&'"') {
                            chars.next();
                            value.push('"');
                        } else {
                            break;
                        }
                    } else {
                        value.push(c);
                    }
                }
                tokens.push(Token::Text(value));
            }
            '[' => {
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                }
            }
            '<' => {
                chars.next();
                let flag: String = chars.by_ref().take_while(|&c| c != '>').collect();
                tokens.push(Token::Flag(flag));
            }
            '!' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || matches!(c, '"' | '[' | '<') {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                if let Ok(value) = word.parse::<f64>() {
                    tokens.push(Token::Number(value));
                }
            }
        }
    }
    tokens
}

struct TokenStream {
    tokens: std::vec::IntoIter<Token>,
}

impl TokenStream {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens: tokens.into_iter(),
        }
    }

    fn next(&mut self, expected: &str) -> Result<Token, TextGridError> {
        self.tokens
            .next()
            .ok_or_else(|| TextGridError::Syntax(format!("unexpected end, expected {expected}")))
    }

    fn number(&mut self) -> Result<f64, TextGridError> {
        match self.next("a number")? {
            Token::Number(value) => Ok(value),
            other => Err(unexpected("a number", &other)),
        }
    }

    fn count(&mut self) -> Result<usize, TextGridError> {
        let value = self.number()?;
        if value < 0.0 || value.fract() != 0.0 {
            return Err(TextGridError::Syntax(format!("invalid count {value}")));
        }
        Ok(value as usize)
    }

    fn text(&mut self) -> Result<String, TextGridError> {
        match self.next("a string")? {
            Token::Text(value) => Ok(value),
            other => Err(unexpected("a string", &other)),
        }
    }

    fn flag(&mut self) -> Result<String, TextGridError> {
        match self.next("a flag")? {
            Token::Flag(value) => Ok(value),
            other => Err(unexpected("a flag", &other)),
        }
    }
}

fn unexpected(expected: &str, found: &Token) -> TextGridError {
    TextGridError::Syntax(format!("expected {expected}, found {found:?}"))
}
