//! The invariant library.
//!
//! Every predicate here is a pure function of its inputs returning a
//! [`Verdict`]. Invariants never depend on each other's outcomes.
//!
//! Pattern and text invariants are deliberately permissive: they check that
//! something is present, not that content is exactly right.

use std::fmt;

use regex::Regex;
use url::Url;

use crate::color::Rgb;
use crate::error::VerifyError;
use crate::models::NavigationResponse;
use crate::probe::{EvidenceRequest, Probed};

/// Result of applying one invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass(String),
    Fail(String),
    /// The evidence could not be interpreted (e.g. a transparent color);
    /// reported as skipped rather than failed.
    Inconclusive(String),
}

impl Verdict {
    fn check(passed: bool, message: String) -> Self {
        if passed {
            Verdict::Pass(message)
        } else {
            Verdict::Fail(message)
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self, Verdict::Pass(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Verdict::Pass(m) | Verdict::Fail(m) | Verdict::Inconclusive(m) => m,
        }
    }
}

/// Permissive matcher for URLs and text.
#[derive(Debug, Clone)]
pub enum Pattern {
    Regex(Regex),
    Prefix(String),
    Contains(String),
}

impl Pattern {
    pub fn regex(source: &str) -> Result<Self, VerifyError> {
        Ok(Pattern::Regex(Regex::new(source)?))
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        Pattern::Prefix(prefix.into())
    }

    pub fn contains(fragment: impl Into<String>) -> Self {
        Pattern::Contains(fragment.into())
    }

    pub fn is_match(&self, subject: &str) -> bool {
        match self {
            Pattern::Regex(re) => re.is_match(subject),
            Pattern::Prefix(p) => subject.starts_with(p.as_str()),
            Pattern::Contains(f) => subject.contains(f.as_str()),
        }
    }

    /// Like [`Pattern::is_match`], but a path prefix (`/es/`) is applied to
    /// the path of an absolute URL rather than to the whole string.
    pub fn matches_location(&self, url: &str) -> bool {
        match self {
            Pattern::Prefix(p) if p.starts_with('/') => match Url::parse(url) {
                Ok(parsed) => parsed.path().starts_with(p.as_str()),
                Err(_) => url.starts_with(p.as_str()),
            },
            _ => self.is_match(url),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Regex(re) => write!(f, "/{}/", re.as_str()),
            Pattern::Prefix(p) => write!(f, "prefix \"{p}\""),
            Pattern::Contains(c) => write!(f, "contains \"{c}\""),
        }
    }
}

/// How many needles of a containment check must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    All,
    Any,
}

/// Bound on a color's averaged channel value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Below(f64),
    Above(f64),
}

impl Bound {
    fn holds(&self, value: f64) -> bool {
        match *self {
            Bound::Below(limit) => value < limit,
            Bound::Above(limit) => value > limit,
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Below(limit) => write!(f, "< {limit}"),
            Bound::Above(limit) => write!(f, "> {limit}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Pure predicates
// ---------------------------------------------------------------------------

pub fn count_at_least(count: usize, min: usize) -> Verdict {
    Verdict::check(count >= min, format!("{count} matching element(s), expected at least {min}"))
}

pub fn count_at_most(count: usize, max: usize) -> Verdict {
    Verdict::check(count <= max, format!("{count} matching element(s), expected at most {max}"))
}

/// Case-folded containment of literal needles.
pub fn text_contains(text: &str, needles: &[String], mode: MatchMode) -> Verdict {
    let haystack = text.to_lowercase();
    let missing: Vec<&str> = needles
        .iter()
        .filter(|n| !haystack.contains(&n.to_lowercase()))
        .map(String::as_str)
        .collect();

    let passed = match mode {
        MatchMode::All => missing.is_empty(),
        MatchMode::Any => needles.is_empty() || missing.len() < needles.len(),
    };
    if passed {
        Verdict::Pass(format!("text mentions {}", needles.join(", ")))
    } else {
        Verdict::Fail(format!("text does not mention {}", missing.join(", ")))
    }
}

pub fn text_longer_than(text: &str, min_chars: usize) -> Verdict {
    let len = text.chars().count();
    Verdict::check(
        len > min_chars,
        format!("text is {len} characters, expected more than {min_chars}"),
    )
}

pub fn pattern_matches(subject: &str, value: &str, pattern: &Pattern) -> Verdict {
    Verdict::check(
        pattern.is_match(value),
        format!("{subject} '{}' vs {pattern}", abbreviate(value)),
    )
}

pub fn attribute_equals(name: &str, actual: Option<&str>, expected: &str) -> Verdict {
    match actual {
        Some(value) => Verdict::check(
            value == expected,
            format!("{name}=\"{value}\", expected \"{expected}\""),
        ),
        None => Verdict::Fail(format!("attribute {name} missing, expected \"{expected}\"")),
    }
}

pub fn attribute_matches(name: &str, actual: Option<&str>, pattern: &Pattern) -> Verdict {
    match actual {
        Some(value) => pattern_matches(name, value, pattern),
        None => Verdict::Fail(format!("attribute {name} missing")),
    }
}

/// Averaged channel value of a computed color against a bound.
pub fn channel_average(property: &str, raw: &str, bound: Bound) -> Verdict {
    let Some(color) = Rgb::parse(raw) else {
        return Verdict::Inconclusive(format!("{property} '{raw}' is not an opaque rgb color"));
    };
    let avg = color.average();
    Verdict::check(
        bound.holds(avg),
        format!("{property} {color} averages {avg:.1}, expected {bound}"),
    )
}

/// Crude contrast proxy: the averaged-channel gap must exceed `threshold`.
///
/// Symmetric in its two colors. Not a W3C contrast ratio.
pub fn contrast(foreground: Rgb, background: Rgb, threshold: f64) -> Verdict {
    let gap = foreground.average_distance(&background);
    Verdict::check(
        gap > threshold,
        format!("{foreground} on {background}: brightness gap {gap:.1}, expected > {threshold}"),
    )
}

pub fn url_matches(url: &str, pattern: &Pattern) -> Verdict {
    Verdict::check(
        pattern.matches_location(url),
        format!("url '{}' vs {pattern}", abbreviate(url)),
    )
}

pub fn url_excludes(url: &str, pattern: &Pattern) -> Verdict {
    Verdict::check(
        !pattern.matches_location(url),
        format!("url '{url}' must not match {pattern}"),
    )
}

pub fn status_in(response: &NavigationResponse, allowed: &[u16]) -> Verdict {
    match response.status {
        Some(code) => Verdict::check(
            allowed.contains(&code),
            format!("HTTP {code}, expected one of {allowed:?}"),
        ),
        None => Verdict::Inconclusive("session did not report an HTTP status".to_string()),
    }
}

fn abbreviate(value: &str) -> String {
    const MAX: usize = 80;
    if value.chars().count() <= MAX {
        value.to_string()
    } else {
        let head: String = value.chars().take(MAX).collect();
        format!("{head}…")
    }
}

// ---------------------------------------------------------------------------
// Typed invariants
// ---------------------------------------------------------------------------

/// Invariants over a probed element.
#[derive(Debug, Clone)]
pub enum ElementInvariant {
    Visible,
    CountAtLeast(usize),
    CountAtMost(usize),
    TextContains { needles: Vec<String>, mode: MatchMode },
    TextLongerThan(usize),
    TextMatches(Pattern),
    AttributeEquals { name: String, expected: String },
    AttributeMatches { name: String, pattern: Pattern },
    AttributeNonEmpty(String),
    ChannelAverage { property: String, bound: Bound },
    Contrast { foreground: String, background: String, threshold: f64 },
}

impl ElementInvariant {
    pub fn contains(needle: impl Into<String>) -> Self {
        ElementInvariant::TextContains {
            needles: vec![needle.into()],
            mode: MatchMode::All,
        }
    }

    pub fn contains_any<I, S>(needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ElementInvariant::TextContains {
            needles: needles.into_iter().map(Into::into).collect(),
            mode: MatchMode::Any,
        }
    }

    pub fn attribute_equals(name: impl Into<String>, expected: impl Into<String>) -> Self {
        ElementInvariant::AttributeEquals {
            name: name.into(),
            expected: expected.into(),
        }
    }

    pub fn background_below(limit: f64) -> Self {
        ElementInvariant::ChannelAverage {
            property: "background-color".into(),
            bound: Bound::Below(limit),
        }
    }

    pub fn color_above(limit: f64) -> Self {
        ElementInvariant::ChannelAverage {
            property: "color".into(),
            bound: Bound::Above(limit),
        }
    }

    /// Text color against background color of the same element.
    pub fn contrast(threshold: f64) -> Self {
        ElementInvariant::Contrast {
            foreground: "color".into(),
            background: "background-color".into(),
            threshold,
        }
    }

    /// Count invariants judge absence themselves (as a count of zero).
    pub fn evaluates_absence(&self) -> bool {
        matches!(
            self,
            ElementInvariant::CountAtLeast(_) | ElementInvariant::CountAtMost(_)
        )
    }

    /// Upper-bound counts look once; waiting would only delay a pass.
    pub fn waits_for_presence(&self) -> bool {
        !matches!(self, ElementInvariant::CountAtMost(_))
    }

    pub fn evidence(&self) -> EvidenceRequest {
        match self {
            ElementInvariant::Visible => EvidenceRequest::visibility(),
            ElementInvariant::CountAtLeast(_) | ElementInvariant::CountAtMost(_) => {
                EvidenceRequest::default()
            }
            ElementInvariant::TextContains { .. }
            | ElementInvariant::TextLongerThan(_)
            | ElementInvariant::TextMatches(_) => EvidenceRequest::text(),
            ElementInvariant::AttributeEquals { name, .. }
            | ElementInvariant::AttributeMatches { name, .. }
            | ElementInvariant::AttributeNonEmpty(name) => EvidenceRequest::attribute(name.clone()),
            ElementInvariant::ChannelAverage { property, .. } => {
                EvidenceRequest::styles([property.clone()])
            }
            ElementInvariant::Contrast {
                foreground,
                background,
                ..
            } => EvidenceRequest::styles([foreground.clone(), background.clone()]),
        }
    }

    /// Verdict for a probe that found nothing; only meaningful for counts.
    pub fn evaluate_absent(&self) -> Verdict {
        match self {
            ElementInvariant::CountAtLeast(min) => count_at_least(0, *min),
            ElementInvariant::CountAtMost(max) => count_at_most(0, *max),
            _ => Verdict::Inconclusive("element absent".to_string()),
        }
    }

    pub fn evaluate<E>(&self, probed: &Probed<E>) -> Verdict {
        let text = || probed.text.as_deref().unwrap_or_default();
        match self {
            ElementInvariant::Visible => match probed.visible {
                Some(true) => Verdict::Pass(format!("{} is visible", probed.locator)),
                Some(false) => Verdict::Fail(format!("{} is present but hidden", probed.locator)),
                None => Verdict::Inconclusive("visibility was not probed".to_string()),
            },
            ElementInvariant::CountAtLeast(min) => count_at_least(probed.matches, *min),
            ElementInvariant::CountAtMost(max) => count_at_most(probed.matches, *max),
            ElementInvariant::TextContains { needles, mode } => {
                text_contains(text(), needles, *mode)
            }
            ElementInvariant::TextLongerThan(min) => text_longer_than(text(), *min),
            ElementInvariant::TextMatches(pattern) => pattern_matches("text", text(), pattern),
            ElementInvariant::AttributeEquals { name, expected } => {
                attribute_equals(name, probed.attribute(name), expected)
            }
            ElementInvariant::AttributeMatches { name, pattern } => {
                attribute_matches(name, probed.attribute(name), pattern)
            }
            ElementInvariant::AttributeNonEmpty(name) => match probed.attribute(name) {
                Some(v) if !v.trim().is_empty() => Verdict::Pass(format!("{name}=\"{v}\"")),
                _ => Verdict::Fail(format!("attribute {name} missing or empty")),
            },
            ElementInvariant::ChannelAverage { property, bound } => channel_average(
                property,
                probed.style(property).unwrap_or_default(),
                *bound,
            ),
            ElementInvariant::Contrast {
                foreground,
                background,
                threshold,
            } => {
                let fg_raw = probed.style(foreground).unwrap_or_default();
                let bg_raw = probed.style(background).unwrap_or_default();
                match (Rgb::parse(fg_raw), Rgb::parse(bg_raw)) {
                    (Some(fg), Some(bg)) => contrast(fg, bg, *threshold),
                    _ => Verdict::Inconclusive(format!(
                        "cannot compare {foreground} '{fg_raw}' with {background} '{bg_raw}'"
                    )),
                }
            }
        }
    }
}

impl fmt::Display for ElementInvariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementInvariant::Visible => f.write_str("visible"),
            ElementInvariant::CountAtLeast(n) => write!(f, "count >= {n}"),
            ElementInvariant::CountAtMost(n) => write!(f, "count <= {n}"),
            ElementInvariant::TextContains { needles, mode } => {
                let joiner = if *mode == MatchMode::All { " & " } else { " | " };
                write!(f, "text contains {}", needles.join(joiner))
            }
            ElementInvariant::TextLongerThan(n) => write!(f, "text longer than {n}"),
            ElementInvariant::TextMatches(p) => write!(f, "text matches {p}"),
            ElementInvariant::AttributeEquals { name, expected } => {
                write!(f, "{name} == \"{expected}\"")
            }
            ElementInvariant::AttributeMatches { name, pattern } => {
                write!(f, "{name} matches {pattern}")
            }
            ElementInvariant::AttributeNonEmpty(name) => write!(f, "{name} non-empty"),
            ElementInvariant::ChannelAverage { property, bound } => {
                write!(f, "avg({property}) {bound}")
            }
            ElementInvariant::Contrast {
                foreground,
                background,
                threshold,
            } => write!(f, "|avg({foreground}) - avg({background})| > {threshold}"),
        }
    }
}

/// Invariants over the session's current location.
#[derive(Debug, Clone)]
pub enum LocationInvariant {
    Matches(Pattern),
    Excludes(Pattern),
}

impl LocationInvariant {
    pub fn evaluate(&self, url: &str) -> Verdict {
        match self {
            LocationInvariant::Matches(p) => url_matches(url, p),
            LocationInvariant::Excludes(p) => url_excludes(url, p),
        }
    }
}

impl fmt::Display for LocationInvariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationInvariant::Matches(p) => write!(f, "url matches {p}"),
            LocationInvariant::Excludes(p) => write!(f, "url excludes {p}"),
        }
    }
}

/// Invariants over the most recent navigation response.
#[derive(Debug, Clone)]
pub enum ResponseInvariant {
    StatusIn(Vec<u16>),
}

impl ResponseInvariant {
    pub fn evaluate(&self, response: &NavigationResponse) -> Verdict {
        match self {
            ResponseInvariant::StatusIn(allowed) => status_in(response, allowed),
        }
    }
}

impl fmt::Display for ResponseInvariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseInvariant::StatusIn(allowed) => write!(f, "status in {allowed:?}"),
        }
    }
}
