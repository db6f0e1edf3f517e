use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Courier - fetch the delivery report, hand it to the route processor and
/// look deliveries up.
#[derive(Parser, Debug)]
#[command(name = "courier", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, env = "COURIER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download the report, convert it and run the processor
    Run,

    /// Look one delivery code up in the newest processed report
    Lookup {
        /// Delivery code or scanned label payload
        code: String,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read scanned codes from stdin, one per line, and look each up
    Scan,

    /// Maintain the courier reference data
    #[command(subcommand)]
    Reference(ReferenceAction),
}

#[derive(Subcommand, Debug)]
pub enum ReferenceAction {
    /// List every record with its number
    #[command(alias = "ls")]
    List,

    /// Append a record
    Add {
        /// Courier name
        name: String,
        #[arg(long, default_value = "")]
        city: String,
        #[arg(long, default_value = "")]
        district: String,
        #[arg(long, default_value = "")]
        postal_code: String,
    },

    /// Remove a record by the number shown in `list`
    #[command(alias = "rm")]
    Remove { number: usize },
}
