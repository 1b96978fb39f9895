//! Path patterns with variable segments.
//!
//! # Responsibilities
//! - Parse `/session/:sessionId/element/:id` style patterns once at registration
//! - Match a concrete path segment-by-segment
//! - Extract URL-decoded values for variable segments
//!
//! # Design Decisions
//! - Both pattern and path are split on every `/`, so the leading empty segment and any
//!   trailing slash take part in the count (`/a/` does not match `/a`)
//! - Literal comparison is exact and case-sensitive
//! - No regex; matching is a single zip over segments

use std::borrow::Cow;
use std::fmt;

pub const VARIABLE_MARKER: char = ':';
pub const SEPARATOR: char = '/';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Variable(String),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        match raw.strip_prefix(VARIABLE_MARKER) {
            Some(name) => Segment::Variable(name.to_string()),
            None => Segment::Literal(raw.to_string()),
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Segment::Variable(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
    variables: usize,
}

impl PathPattern {
    pub fn parse(raw: &str) -> Self {
        let segments: Vec<Segment> = raw.split(SEPARATOR).map(Segment::parse).collect();
        let variables = segments.iter().filter(|s| s.is_variable()).count();
        Self {
            raw: raw.to_string(),
            segments,
            variables,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn variable_count(&self) -> usize {
        self.variables
    }

    pub fn is_match_for(&self, path: &str) -> bool {
        let parts: Vec<&str> = path.split(SEPARATOR).collect();
        if parts.len() != self.segments.len() {
            return false;
        }
        self.segments.iter().zip(parts).all(|(segment, part)| match segment {
            Segment::Literal(literal) => literal == part,
            Segment::Variable(_) => true,
        })
    }

    /// Bind variable names to decoded segment values. Call only after `is_match_for`.
    ///
    /// A segment with an invalid percent-escape is bound raw.
    pub fn extract(&self, path: &str) -> Vec<(String, String)> {
        self.segments
            .iter()
            .zip(path.split(SEPARATOR))
            .filter_map(|(segment, part)| match segment {
                Segment::Variable(name) => Some((name.clone(), decode(part))),
                Segment::Literal(_) => None,
            })
            .collect()
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn decode(part: &str) -> String {
    urlencoding::decode(part)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| part.to_string())
}
