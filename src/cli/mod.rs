use clap::{Parser, Subcommand};

pub mod config;
pub mod init_config;
pub mod run;
pub mod version;

#[derive(Parser)]
#[command(name = "gatehouse")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Access gate and site-status service", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP and realtime service
    Run {
        /// Path to config file (default: ~/.local/share/gatehouse/config.toml)
        #[arg(long)]
        config: Option<String>,

        /// Directory for persisted state (overrides config)
        #[arg(long)]
        data_dir: Option<String>,

        /// Listen address, e.g. 127.0.0.1:8787 (overrides config)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Write a default config file
    InitConfig {
        /// Where to write it (default: ~/.local/share/gatehouse/config.toml)
        #[arg(long)]
        config: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display version information
    Version,
}

pub async fn execute(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Run {
            config,
            data_dir,
            bind,
        } => run::execute(config, data_dir, bind).await,
        Commands::InitConfig { config, force } => init_config::execute(config, force),
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}
