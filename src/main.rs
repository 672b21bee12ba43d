//! Panelsmith CLI
//!
//! Commands:
//!   serve - Start the relay server (default)
//!   init  - Write a default config file

use anyhow::Result;
use clap::{Parser, Subcommand};
use panelsmith::{server, Config};

#[derive(Parser)]
#[command(name = "panelsmith")]
#[command(about = "API relay for the comic-creation studio")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the relay server
    Serve {
        /// Port to listen on (overrides the PORT environment variable)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Write a default config file
    Init,
}

/// Flag beats environment beats config.
fn pick_port(flag: Option<u16>, env_port: Option<u16>, config_port: u16) -> u16 {
    flag.or(env_port).unwrap_or(config_port)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // No command = serve; relaying is the only job this process has.
    let command = cli.command.unwrap_or(Commands::Serve { port: None });

    match command {
        Commands::Serve { port } => {
            let config = Config::load()?.unwrap_or_default();
            let env_port = std::env::var("PORT").ok().and_then(|v| v.parse().ok());
            let port = pick_port(port, env_port, config.port);

            println!("Starting server on http://localhost:{}...", port);
            server::serve(config, port).await?;
        }

        Commands::Init => {
            let config = Config::default();
            config.save()?;
            println!("Wrote default config to {}", Config::path()?.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_port_precedence() {
        assert_eq!(pick_port(Some(9000), Some(8000), 3002), 9000);
        assert_eq!(pick_port(None, Some(8000), 3002), 8000);
        assert_eq!(pick_port(None, None, 3002), 3002);
    }
}
