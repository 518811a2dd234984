//! Locator strategies and ordered fallback chains.
//!
//! A chain is data, not control flow: adding a fallback is appending a
//! [`Locator`], never nesting another conditional.

use std::fmt;

use regex::Regex;

use crate::error::VerifyError;

/// Restricts a selector's matches by their text content.
#[derive(Debug, Clone)]
pub enum TextFilter {
    /// Case-folded substring match.
    Contains(String),
    /// Regular expression match against the raw text.
    Matches(Regex),
}

impl TextFilter {
    pub fn accepts(&self, text: &str) -> bool {
        match self {
            TextFilter::Contains(needle) => text.to_lowercase().contains(&needle.to_lowercase()),
            TextFilter::Matches(re) => re.is_match(text),
        }
    }
}

impl fmt::Display for TextFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextFilter::Contains(needle) => write!(f, "text~\"{needle}\""),
            TextFilter::Matches(re) => write!(f, "text=/{}/", re.as_str()),
        }
    }
}

/// One strategy for finding an element: a CSS selector plus an optional text filter.
#[derive(Debug, Clone)]
pub struct Locator {
    pub selector: String,
    pub text: Option<TextFilter>,
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            text: None,
        }
    }

    /// Keep only matches whose text contains `needle` (case-insensitive).
    pub fn with_text(mut self, needle: impl Into<String>) -> Self {
        self.text = Some(TextFilter::Contains(needle.into()));
        self
    }

    /// Keep only matches whose text matches `pattern`.
    pub fn matching(mut self, pattern: &str) -> Result<Self, VerifyError> {
        self.text = Some(TextFilter::Matches(Regex::new(pattern)?));
        Ok(self)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.text {
            Some(filter) => write!(f, "{} [{filter}]", self.selector),
            None => f.write_str(&self.selector),
        }
    }
}

/// Ordered list of locators tried in sequence until one yields a match.
#[derive(Debug, Clone)]
pub struct LocatorChain {
    locators: Vec<Locator>,
}

impl LocatorChain {
    pub fn new(first: Locator) -> Self {
        Self {
            locators: vec![first],
        }
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::new(Locator::css(selector))
    }

    /// Append a fallback tried when every earlier locator found nothing.
    pub fn or(mut self, next: Locator) -> Self {
        self.locators.push(next);
        self
    }

    pub fn or_css(self, selector: impl Into<String>) -> Self {
        self.or(Locator::css(selector))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Locator> {
        self.locators.iter()
    }

    pub fn len(&self) -> usize {
        self.locators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Locator> {
        self.locators.get(index)
    }
}

impl From<Locator> for LocatorChain {
    fn from(locator: Locator) -> Self {
        Self::new(locator)
    }
}

impl From<&str> for LocatorChain {
    fn from(selector: &str) -> Self {
        Self::css(selector)
    }
}

impl fmt::Display for LocatorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, locator) in self.locators.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{locator}")?;
        }
        Ok(())
    }
}
