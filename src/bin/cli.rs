//! txkv CLI Client
//!
//! Command-line interface for interacting with txkv.

use clap::{Parser, Subcommand};
use txkv::{Client, Result};

/// txkv CLI
#[derive(Parser, Debug)]
#[command(name = "txkv-cli")]
#[command(about = "CLI for the txkv key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7878")]
    server: String,

    /// Username sent with LOGIN
    #[arg(short, long, default_value = "cli")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a stored value
    Get {
        table: String,
        key: String,
    },

    /// Store a value
    Set {
        table: String,
        key: String,
        value: String,
    },

    /// Add one to a stored integer
    Incr {
        /// Run the increment as a transaction
        #[arg(short, long)]
        transaction: bool,

        table: String,
        key: String,
    },

    /// Create a table
    Create {
        table: String,
    },
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let mut client = Client::connect(args.server.as_str())?;
    client.login(&args.user)?;

    match &args.command {
        Commands::Get { table, key } => {
            let value = client.get_value(table, key)?;
            println!("{}", value);
        }
        Commands::Set { table, key, value } => client.set_value(table, key, value)?,
        Commands::Incr {
            transaction,
            table,
            key,
        } => client.incr_value(table, key, *transaction)?,
        Commands::Create { table } => client.create(table)?,
    }

    client.bye()
}
