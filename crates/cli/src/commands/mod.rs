use async_trait::async_trait;
use chaff_core::decoder::read_listing;
use chaff_core::insn::ClassListing;
use clap::Subcommand;
use std::error::Error;

pub mod decode;
pub mod filter;

#[derive(Subcommand)]
pub enum Cmd {
    /// Print the parsed instructions of every method
    Decode(decode::DecodeArgs),

    /// Report the instruction ranges to exclude from coverage
    Filter(filter::FilterArgs),
}

#[async_trait]
pub trait Command {
    async fn execute(self, input: &str) -> Result<(), Box<dyn Error>>;
}

#[async_trait]
impl Command for Cmd {
    async fn execute(self, input: &str) -> Result<(), Box<dyn Error>> {
        match self {
            Cmd::Decode(args) => args.execute(input).await,
            Cmd::Filter(args) => args.execute(input).await,
        }
    }
}

/// Reads and parses the listing at `path` off the async runtime.
pub(crate) async fn load_listing(path: &str) -> Result<ClassListing, Box<dyn Error>> {
    let path = path.to_string();
    Ok(tokio::task::spawn_blocking(move || read_listing(path)).await??)
}
