use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "tether", about = "Discord/Roblox account linking and role sync", version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "tether.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Initialize the Tether data directory and configuration
    Init {
        /// Data directory path
        #[arg(long, default_value = "/var/lib/tether")]
        data_dir: String,
    },
    /// Start the API server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { data_dir } => {
            commands::init::run(&data_dir).await?;
        }
        Commands::Serve { port } => {
            commands::serve::run(&cli.config, port).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn cli_parse_init_defaults() {
        let cli = Cli::parse_from(["tether", "init"]);
        assert_eq!(cli.config, "tether.toml");
        match cli.command {
            Commands::Init { data_dir } => assert_eq!(data_dir, "/var/lib/tether"),
            _ => panic!("expected Init command"),
        }
    }

    #[test]
    fn cli_parse_init_custom() {
        let cli = Cli::parse_from([
            "tether",
            "--config",
            "/etc/tether.toml",
            "init",
            "--data-dir",
            "/opt/tether",
        ]);
        assert_eq!(cli.config, "/etc/tether.toml");
        match cli.command {
            Commands::Init { data_dir } => assert_eq!(data_dir, "/opt/tether"),
            _ => panic!("expected Init command"),
        }
    }

    #[test]
    fn cli_parse_serve_defaults() {
        let cli = Cli::parse_from(["tether", "serve"]);
        match cli.command {
            Commands::Serve { port } => assert_eq!(port, 8080),
            _ => panic!("expected Serve command"),
        }
    }

    #[test]
    fn cli_parse_serve_custom_port() {
        let cli = Cli::parse_from(["tether", "serve", "--port", "3000"]);
        match cli.command {
            Commands::Serve { port } => assert_eq!(port, 3000),
            _ => panic!("expected Serve command"),
        }
    }
}
