//! Module for the `decode` subcommand, which prints a parsed instruction listing.
//!
//! Every method is printed with its descriptor followed by its nodes, each prefixed with the
//! index that ignore ranges refer to.

use async_trait::async_trait;
use clap::Args;
use std::error::Error;

/// Arguments for the `decode` subcommand.
#[derive(Args)]
pub struct DecodeArgs {}

#[async_trait]
impl super::Command for DecodeArgs {
    async fn execute(self, input: &str) -> Result<(), Box<dyn Error>> {
        let class = super::load_listing(input).await?;
        println!("class {}", class.name);
        for annotation in &class.annotations {
            println!("annotation {annotation}");
        }
        for method in &class.methods {
            println!("method {} {}", method.name, method.descriptor);
            for (index, insn) in method.instructions.iter().enumerate() {
                println!("{index:>5}  {insn}");
            }
            println!("end");
        }
        Ok(())
    }
}
