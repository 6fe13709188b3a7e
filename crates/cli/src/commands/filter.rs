//! Module for the `filter` subcommand, which runs the coverage filters over a listing.

use async_trait::async_trait;
use chaff_core::analysis::analyze_class;
use chaff_core::config::AnalysisConfig;
use chaff_core::filter::Filters;
use clap::Args;
use std::error::Error;

#[derive(Args)]
pub struct FilterArgs {
    /// JSON analysis configuration
    #[arg(short, long)]
    config: Option<String>,

    /// Print the JSON report instead of annotated ranges
    #[arg(long)]
    json: bool,
}

#[async_trait]
impl super::Command for FilterArgs {
    async fn execute(self, input: &str) -> Result<(), Box<dyn Error>> {
        let cfg = match &self.config {
            Some(path) => AnalysisConfig::from_file(path)?,
            None => AnalysisConfig::default(),
        };
        let filters = Filters::from_config(&cfg)?;
        tracing::debug!("Running filters {:?}", filters);

        let class = super::load_listing(input).await?;
        let report = analyze_class(&class, &filters, &cfg);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        for (method, method_report) in class.methods.iter().zip(&report.methods) {
            if method_report.ranges.is_empty() {
                continue;
            }
            println!(
                "{}{}: {} ranges, {} instructions ignored",
                method.name,
                method.descriptor,
                method_report.ranges.len(),
                method_report.ignored_instructions
            );
            for range in &method_report.ranges {
                let first = method.instructions.get(range.first);
                let last = method.instructions.get(range.last);
                if let (Some(first), Some(last)) = (first, last) {
                    println!("  {:<12} {first}  ..  {last}", range.to_string());
                }
            }
        }
        Ok(())
    }
}
