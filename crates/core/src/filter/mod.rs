//! Module for filters that recognize compiler-synthesized instruction ranges.
//!
//! A filter inspects one method at a time and reports inclusive instruction ranges that the
//! compiler generated on its own, so that coverage tooling can leave them out of line and
//! branch statistics. Filters never fail: a method whose shape is not recognized simply gets
//! no ranges.
//!
//! # Usage
//! ```rust,ignore
//! use chaff_core::filter::{Filter, Filters, IgnoreRange};
//!
//! let mut ranges: Vec<IgnoreRange> = Vec::new();
//! Filters::all().filter(&method, &class, &mut ranges);
//! ```

pub mod coroutine;
pub mod matcher;

pub use coroutine::KotlinCoroutineFilter;
pub use matcher::{Cursor, Matcher, label_target, skip_non_opcodes};

use crate::config::AnalysisConfig;
use crate::insn::{ClassListing, MethodNode};
use chaff_utils::errors::ConfigError;
use serde::Serialize;
use std::fmt;

/// Annotation the Kotlin compiler puts on every class it emits.
pub const KOTLIN_METADATA: &str = "Lkotlin/Metadata;";

/// Inclusive range of instruction indices to exclude from coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct IgnoreRange {
    pub first: usize,
    pub last: usize,
}

impl IgnoreRange {
    pub const fn new(first: usize, last: usize) -> Self {
        Self { first, last }
    }

    pub const fn contains(&self, index: usize) -> bool {
        self.first <= index && index <= self.last
    }
}

impl fmt::Display for IgnoreRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.first, self.last)
    }
}

/// Facts about the class that owns the method being filtered.
pub trait FilterContext {
    /// Internal name of the class.
    fn class_name(&self) -> &str;
    /// Descriptors of the annotations present on the class.
    fn class_annotations(&self) -> &[String];
}

impl FilterContext for ClassListing {
    fn class_name(&self) -> &str {
        &self.name
    }

    fn class_annotations(&self) -> &[String] {
        &self.annotations
    }
}

/// Returns true iff the class was emitted by the Kotlin compiler.
pub fn is_kotlin_class(ctx: &dyn FilterContext) -> bool {
    ctx.class_annotations().iter().any(|a| a == KOTLIN_METADATA)
}

/// Sink for ignore ranges. Duplicate ranges may be reported and must be tolerated.
pub trait FilterOutput {
    fn ignore(&mut self, first: usize, last: usize);
}

impl FilterOutput for Vec<IgnoreRange> {
    fn ignore(&mut self, first: usize, last: usize) {
        self.push(IgnoreRange::new(first, last));
    }
}

/// Trait for recognizers of compiler-generated code.
pub trait Filter: Send + Sync {
    /// Returns the filter's name for logging and configuration.
    fn name(&self) -> &'static str;
    /// Reports the synthetic ranges of `method` to `output`.
    fn filter(&self, method: &MethodNode, ctx: &dyn FilterContext, output: &mut dyn FilterOutput);
}

/// Registry of filters, applied in order. It is itself a [`Filter`].
pub struct Filters {
    filters: Vec<Box<dyn Filter>>,
}

impl Filters {
    /// Registry applying `filters` in the given order.
    pub fn new(filters: Vec<Box<dyn Filter>>) -> Self {
        Self { filters }
    }

    /// Every known filter.
    pub fn all() -> Self {
        Self::new(vec![Box::new(KotlinCoroutineFilter)])
    }

    /// Every known filter except those disabled in `cfg`.
    pub fn from_config(cfg: &AnalysisConfig) -> Result<Self, ConfigError> {
        let mut filters = Self::all();
        for disabled in &cfg.disabled_filters {
            if !filters.names().any(|name| name == disabled) {
                return Err(ConfigError::UnknownFilter(disabled.clone()));
            }
        }
        filters
            .filters
            .retain(|f| !cfg.disabled_filters.iter().any(|d| d == f.name()));
        Ok(filters)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.filters.iter().map(|f| f.name())
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl fmt::Debug for Filters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl Filter for Filters {
    fn name(&self) -> &'static str {
        "Filters"
    }

    fn filter(&self, method: &MethodNode, ctx: &dyn FilterContext, output: &mut dyn FilterOutput) {
        for filter in &self.filters {
            tracing::trace!("{} on {}.{}", filter.name(), ctx.class_name(), method.name);
            filter.filter(method, ctx, output);
        }
    }
}
