//! Runs a filter registry over every method of a class and collects the ranges.

use crate::config::AnalysisConfig;
use crate::filter::{Filter, Filters, IgnoreRange};
use crate::insn::{ClassListing, MethodNode};
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

/// Ranges reported for one method.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodReport {
    pub name: String,
    pub descriptor: String,
    pub ranges: Vec<IgnoreRange>,
    /// Number of non-structural instructions covered by at least one range
    pub ignored_instructions: usize,
}

impl MethodReport {
    fn new(method: &MethodNode, ranges: Vec<IgnoreRange>) -> Self {
        let ignored_instructions = method
            .instructions
            .iter()
            .enumerate()
            .filter(|(index, insn)| {
                !insn.is_structural() && ranges.iter().any(|r| r.contains(*index))
            })
            .count();
        Self {
            name: method.name.clone(),
            descriptor: method.descriptor.clone(),
            ranges,
            ignored_instructions,
        }
    }
}

/// Ranges reported for every method of a class, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassReport {
    pub class: String,
    pub methods: Vec<MethodReport>,
}

impl ClassReport {
    /// Total number of instructions excluded from coverage.
    pub fn ignored_instruction_count(&self) -> usize {
        self.methods.iter().map(|m| m.ignored_instructions).sum()
    }

    pub fn range_count(&self) -> usize {
        self.methods.iter().map(|m| m.ranges.len()).sum()
    }
}

/// Runs `filters` over one method and returns its ranges in index order.
fn filter_method(method: &MethodNode, class: &ClassListing, filters: &Filters) -> Vec<IgnoreRange> {
    let mut ranges = Vec::new();
    filters.filter(method, class, &mut ranges);
    ranges.sort();
    ranges
}

/// Applies `filters` to each method of `class`.
///
/// With `cfg.parallel` the methods are matched on the rayon thread pool; the report is
/// identical to a sequential run.
pub fn analyze_class(class: &ClassListing, filters: &Filters, cfg: &AnalysisConfig) -> ClassReport {
    let per_method: Vec<Vec<IgnoreRange>> = if cfg.parallel {
        class
            .methods
            .par_iter()
            .map(|method| filter_method(method, class, filters))
            .collect()
    } else {
        class
            .methods
            .iter()
            .map(|method| filter_method(method, class, filters))
            .collect()
    };

    let report = ClassReport {
        class: class.name.clone(),
        methods: class
            .methods
            .iter()
            .zip(per_method)
            .map(|(method, ranges)| MethodReport::new(method, ranges))
            .collect(),
    };
    info!(
        "{}: {} ranges, {} instructions ignored",
        report.class,
        report.range_count(),
        report.ignored_instruction_count()
    );
    report
}
