// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::io::BufRead;
use std::path::Path;

/// Bounded wildcard between two literals
///
/// Counts the symbols between the end of one literal and the start of the
/// next; `u64::MAX` stands for an unbounded gap.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Gap {
    /// Minimum number of gap symbols
    pub min: u64,

    /// Maximum number of gap symbols
    pub max: u64,
}

/// How pattern literals are interpreted
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ParseMode {
    /// Each literal is a byte string
    #[default]
    Bytes,

    /// Each literal is a whitespace-separated list of decimal symbols
    Integers,
}

/// Error while parsing a pattern line
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PatternError {
    /// The line is empty
    Empty,

    /// A literal between two wildcards is empty
    EmptySubPattern,

    /// A gap token could not be parsed
    Gap(String),

    /// A symbol could not be parsed as a decimal integer
    Symbol(String),
}

impl std::fmt::Display for PatternError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PatternError({self:?})")
    }
}

impl std::error::Error for PatternError {}

/// A gapped pattern: literal sub-patterns interleaved with bounded
/// wildcards
///
/// `s0 .* s1 .{1,5} s2` has three sub-patterns and two gaps. A plain `.*`
/// is the unbounded gap `(0, u64::MAX)`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Pattern {
    raw: String,
    subpatterns: Vec<Vec<u64>>,
    gaps: Vec<Gap>,
}

fn parse_gap(token: &str) -> Result<Gap, PatternError> {
    let bad = || PatternError::Gap(token.into());

    match token.split_once(',') {
        Some((min, "")) => Ok(Gap {
            min: min.trim().parse().map_err(|_| bad())?,
            max: u64::MAX,
        }),
        Some((min, max)) => {
            let gap = Gap {
                min: min.trim().parse().map_err(|_| bad())?,
                max: max.trim().parse().map_err(|_| bad())?,
            };
            if gap.min > gap.max {
                return Err(bad());
            }
            Ok(gap)
        }
        None => {
            let exact = token.trim().parse().map_err(|_| bad())?;
            Ok(Gap {
                min: exact,
                max: exact,
            })
        }
    }
}

fn parse_literal(segment: &str, mode: ParseMode) -> Result<Vec<u64>, PatternError> {
    let symbols = match mode {
        ParseMode::Bytes => segment.bytes().map(u64::from).collect::<Vec<_>>(),
        ParseMode::Integers => segment
            .split_whitespace()
            .map(|tok| tok.parse().map_err(|_| PatternError::Symbol(tok.into())))
            .collect::<Result<Vec<_>, _>>()?,
    };

    if symbols.is_empty() {
        return Err(PatternError::EmptySubPattern);
    }

    Ok(symbols)
}

impl Pattern {
    /// Parses a raw pattern line.
    pub fn parse(raw: &str, mode: ParseMode) -> Result<Self, PatternError> {
        if raw.is_empty() {
            return Err(PatternError::Empty);
        }

        let bytes = raw.as_bytes();
        let mut subpatterns = vec![];
        let mut gaps = vec![];

        let mut seg_start = 0;
        let mut i = 0;

        while i < bytes.len() {
            if bytes.get(i) == Some(&b'.') {
                match bytes.get(i + 1) {
                    Some(&b'*') => {
                        subpatterns
                            .push(parse_literal(raw.get(seg_start..i).unwrap_or_default(), mode)?);
                        gaps.push(Gap {
                            min: 0,
                            max: u64::MAX,
                        });

                        i += 2;
                        seg_start = i;
                        continue;
                    }
                    Some(&b'{') => {
                        let close = raw
                            .get(i..)
                            .and_then(|rest| rest.find('}'))
                            .ok_or_else(|| PatternError::Gap(raw.get(i..).unwrap_or_default().into()))?;

                        subpatterns
                            .push(parse_literal(raw.get(seg_start..i).unwrap_or_default(), mode)?);
                        gaps.push(parse_gap(raw.get(i + 2..i + close).unwrap_or_default())?);

                        i += close + 1;
                        seg_start = i;
                        continue;
                    }
                    _ => {}
                }
            }
            i += 1;
        }

        subpatterns.push(parse_literal(raw.get(seg_start..).unwrap_or_default(), mode)?);

        Ok(Self {
            raw: raw.into(),
            subpatterns,
            gaps,
        })
    }

    /// The raw pattern line
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The literal sub-patterns, in order
    #[must_use]
    pub fn subpatterns(&self) -> &[Vec<u64>] {
        &self.subpatterns
    }

    /// The gap bounds between consecutive sub-patterns
    #[must_use]
    pub fn gaps(&self) -> &[Gap] {
        &self.gaps
    }

    /// Number of literal sub-patterns
    #[must_use]
    pub fn term_count(&self) -> usize {
        self.subpatterns.len()
    }

    /// Gap bounds translated to start-to-start distances
    ///
    /// Adding `|s_i|` to the declared gap lets the engines compare start
    /// positions directly (and makes a single-term search a degenerate
    /// two-term search with gap zero).
    #[must_use]
    pub fn start_to_start_gaps(&self) -> Vec<Gap> {
        self.gaps
            .iter()
            .zip(&self.subpatterns)
            .map(|(gap, sub)| Gap {
                min: gap.min.saturating_add(sub.len() as u64),
                max: gap.max.saturating_add(sub.len() as u64),
            })
            .collect()
    }

    /// Maximum length of a matching substring (saturating)
    #[must_use]
    pub fn max_window_len(&self) -> u64 {
        let literals = self
            .subpatterns
            .iter()
            .fold(0u64, |acc, s| acc.saturating_add(s.len() as u64));

        self.gaps
            .iter()
            .fold(literals, |acc, gap| acc.saturating_add(gap.max))
    }

    /// Whether every symbol fits into a byte
    #[must_use]
    pub fn is_byte_pattern(&self) -> bool {
        self.subpatterns
            .iter()
            .all(|sub| sub.iter().all(|&sym| sym <= u64::from(u8::MAX)))
    }

    /// Compiles the equivalent verification regex over raw bytes.
    pub fn to_byte_regex(&self) -> crate::Result<regex::bytes::Regex> {
        if !self.is_byte_pattern() {
            return Err(crate::Error::Unsupported(
                "regex verification requires byte symbols",
            ));
        }

        let mut expr = String::new();

        for (i, sub) in self.subpatterns.iter().enumerate() {
            if i > 0 {
                let gap = self.gaps.get(i - 1).expect("gap count is terms - 1");
                if gap.max == u64::MAX {
                    expr.push_str(&format!(".{{{},}}", gap.min));
                } else {
                    expr.push_str(&format!(".{{{},{}}}", gap.min, gap.max));
                }
            }

            for &sym in sub {
                let byte = sym as u8;
                if byte.is_ascii_alphanumeric() {
                    expr.push(char::from(byte));
                } else {
                    expr.push_str(&format!("\\x{byte:02X}"));
                }
            }
        }

        let regex = regex::bytes::RegexBuilder::new(&expr)
            .unicode(false)
            .dot_matches_new_line(true)
            .build()?;

        Ok(regex)
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Parses a line-delimited pattern file.
///
/// Unreadable files are fatal; lines that fail to parse are logged and
/// skipped.
pub fn parse_pattern_file<P: AsRef<Path>>(path: P, mode: ParseMode) -> crate::Result<Vec<Pattern>> {
    let file = std::fs::File::open(path.as_ref())?;
    let reader = std::io::BufReader::new(file);

    let mut patterns = vec![];

    for line in reader.lines() {
        let line = line?;

        match Pattern::parse(&line, mode) {
            Ok(pattern) => patterns.push(pattern),
            Err(e) => {
                log::warn!("could not parse pattern {line:?}, skipped: {e}");
            }
        }
    }

    log::info!("read {} patterns", patterns.len());

    Ok(patterns)
}
