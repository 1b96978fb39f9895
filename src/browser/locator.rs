//! Selenese locator parsing.
//!
//! # Responsibilities
//! - Parse element locators (`id=`, `name=`, `identifier=`, `css=`, `xpath=`, `link=`)
//! - Infer the strategy for implicit locators (`//a` is xpath, `foo` is identifier)
//! - Parse option locators for `select` and attribute locators for `getAttribute`
//!
//! # Design Decisions
//! - Strategy tables are `const` slices, built at compile time and never mutated
//! - `dom=` / `document.` locators are rejected: they need script evaluation the hub does not own

use std::fmt;

use super::BrowserError;

/// A parsed element locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Id(String),
    Name(String),
    /// Id first, then name.
    Identifier(String),
    Css(String),
    XPath(String),
    /// Anchor whose visible text equals the value.
    Link(String),
}

type LocatorCtor = fn(String) -> Locator;

const STRATEGIES: &[(&str, LocatorCtor)] = &[
    ("id", Locator::Id),
    ("name", Locator::Name),
    ("identifier", Locator::Identifier),
    ("css", Locator::Css),
    ("xpath", Locator::XPath),
    ("link", Locator::Link),
];

impl Locator {
    pub fn parse(raw: &str) -> Result<Self, BrowserError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(BrowserError::InvalidArgument("empty locator".into()));
        }
        if raw.starts_with("//") || raw.starts_with("(//") {
            return Ok(Locator::XPath(raw.to_string()));
        }
        if raw.starts_with("document.") || raw.starts_with("dom=") {
            return Err(BrowserError::Unsupported(format!("dom locator `{}`", raw)));
        }

        if let Some((prefix, value)) = raw.split_once('=') {
            if let Some((_, ctor)) = STRATEGIES.iter().find(|(name, _)| *name == prefix) {
                if value.is_empty() {
                    return Err(BrowserError::InvalidArgument(format!("empty {} locator", prefix)));
                }
                return Ok(ctor(value.to_string()));
            }
        }

        Ok(Locator::Identifier(raw.to_string()))
    }

    pub fn strategy(&self) -> &'static str {
        match self {
            Locator::Id(_) => "id",
            Locator::Name(_) => "name",
            Locator::Identifier(_) => "identifier",
            Locator::Css(_) => "css",
            Locator::XPath(_) => "xpath",
            Locator::Link(_) => "link",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Locator::Id(v)
            | Locator::Name(v)
            | Locator::Identifier(v)
            | Locator::Css(v)
            | Locator::XPath(v)
            | Locator::Link(v) => v,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.strategy(), self.value())
    }
}

/// Selects an `<option>` inside a `<select>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionLocator {
    Label(String),
    Value(String),
    Id(String),
    Index(usize),
}

impl OptionLocator {
    /// Parse `label=`, `value=`, `id=` or `index=`; bare text is a label.
    pub fn parse(raw: &str) -> Result<Self, BrowserError> {
        let option = match raw.split_once('=') {
            Some(("label", v)) => OptionLocator::Label(v.to_string()),
            Some(("value", v)) => OptionLocator::Value(v.to_string()),
            Some(("id", v)) => OptionLocator::Id(v.to_string()),
            Some(("index", v)) => {
                let index = v.trim().parse().map_err(|_| {
                    BrowserError::InvalidArgument(format!("option index `{}` is not a number", v))
                })?;
                OptionLocator::Index(index)
            }
            _ => OptionLocator::Label(raw.to_string()),
        };
        Ok(option)
    }
}

impl fmt::Display for OptionLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionLocator::Label(v) => write!(f, "label={}", v),
            OptionLocator::Value(v) => write!(f, "value={}", v),
            OptionLocator::Id(v) => write!(f, "id={}", v),
            OptionLocator::Index(i) => write!(f, "index={}", i),
        }
    }
}

/// Split `locator@attribute` on the last `@`.
pub fn split_attribute_locator(raw: &str) -> Result<(&str, &str), BrowserError> {
    match raw.rsplit_once('@') {
        Some((locator, attribute)) if !locator.is_empty() && !attribute.is_empty() => {
            Ok((locator, attribute))
        }
        _ => Err(BrowserError::InvalidArgument(format!(
            "attribute locator `{}` must look like locator@attribute",
            raw
        ))),
    }
}
