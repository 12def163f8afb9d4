//! Window relation expressions.
//!
//! A relation describes how to walk from the current browsing context to a
//! target one:
//!
//! ```text
//! path     := segment ('.' segment)*
//! segment  := 'opener' | 'parent' | 'top' | frameref
//! frameref := 'frames[' quote name quote ']' | 'frames[' name ']'
//! quote    := "'" | '"'
//! ```
//!
//! # Example
//!
//! ```ignore
//! use xdomain_bus::Relation;
//!
//! let relation: Relation = "opener.frames['x'].parent".parse()?;
//! assert_eq!(relation.to_string(), "window.opener.frames['x'].parent");
//! let target = relation.resolve(&host.window())?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::error::{Error, Result};

use super::context::ContextRef;

// ============================================================================
// Constants
// ============================================================================

/// Default relation when a handler names none.
pub const DEFAULT_RELATION: &str = "opener";

/// `frames[name]`, `frames['name']` or `frames["name"]`.
static FRAME_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^frames\[(?:'([A-Za-z0-9_-]+)'|"([A-Za-z0-9_-]+)"|([A-Za-z0-9_-]+))\]$"#)
        .expect("frame segment pattern is valid")
});

// ============================================================================
// Segment
// ============================================================================

/// One navigation step.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// `opener`
    Opener,
    /// `parent`
    Parent,
    /// `top`
    Top,
    /// `frames[name]`
    Frame(String),
}

impl Segment {
    /// Parses a single segment.
    fn parse(segment: &str) -> Option<Self> {
        match segment {
            "opener" => Some(Self::Opener),
            "parent" => Some(Self::Parent),
            "top" => Some(Self::Top),
            _ => {
                let caps = FRAME_SEGMENT.captures(segment)?;
                let name = caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3))?;
                Some(Self::Frame(name.as_str().to_string()))
            }
        }
    }

    /// Applies this step to `node`.
    fn apply(&self, node: &ContextRef) -> Option<ContextRef> {
        match self {
            Self::Opener => node.opener(),
            Self::Parent => node.parent(),
            Self::Top => node.top(),
            Self::Frame(name) => node.frame(name),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opener => f.write_str("opener"),
            Self::Parent => f.write_str("parent"),
            Self::Top => f.write_str("top"),
            Self::Frame(name) => write!(f, "frames['{name}']"),
        }
    }
}

// ============================================================================
// Relation
// ============================================================================

/// A parsed relation expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Expression as given.
    source: String,
    /// Parsed steps, never empty.
    segments: Vec<Segment>,
}

impl Relation {
    /// Parses a relation expression.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Syntax`] naming the first malformed segment.
    pub fn parse(expr: &str) -> Result<Self> {
        let segments = expr
            .split('.')
            .map(|part| Segment::parse(part).ok_or_else(|| Error::syntax(expr, part)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            source: expr.to_string(),
            segments,
        })
    }

    /// Returns the expression as originally written.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns the parsed steps.
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Walks the relation starting at `from`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContextNotFound`] if a step has no target.
    pub fn resolve(&self, from: &ContextRef) -> Result<ContextRef> {
        let mut node = ContextRef::clone(from);

        for segment in &self.segments {
            node = segment
                .apply(&node)
                .ok_or_else(|| Error::context_not_found(&self.source, segment.to_string()))?;
        }

        trace!(relation = %self, "Relation resolved");
        Ok(node)
    }
}

impl FromStr for Relation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("window")?;
        for segment in &self.segments {
            write!(f, ".{segment}")?;
        }
        Ok(())
    }
}

// ============================================================================
// Public Functions
// ============================================================================

/// Parses `expr` and resolves it from `from` in one step.
///
/// # Errors
///
/// - [`Error::Syntax`] if the expression is malformed
/// - [`Error::ContextNotFound`] if a step has no target
pub fn resolve_relation(from: &ContextRef, expr: &str) -> Result<ContextRef> {
    Relation::parse(expr)?.resolve(from)
}

// ============================================================================
// Tests
// ============================================================================
