#![forbid(unsafe_code)]

use std::fs::File;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use model_arena::gateway::AdapterRegistry;
use model_arena::pipeline::{PipelineController, Prompt};
use model_arena::server::{self, AppState};

#[derive(Parser)]
#[command(name = "arena", version, about = "Model arena CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        #[arg(long, default_value = "127.0.0.1:8360")]
        bind: SocketAddr,
    },
    /// Run the full pipeline once and print the result as JSON
    Run {
        /// Prompt text
        #[arg(long)]
        prompt: String,
        /// Comma-separated model ids (see `models`)
        #[arg(long, value_delimiter = ',')]
        models: Vec<String>,
        /// Write the result to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List the model catalog
    Models,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind } => {
            let registry = AdapterRegistry::from_env()?;
            let state = Arc::new(AppState::new(registry));
            server::serve(state, bind).await?;
        }
        Commands::Run {
            prompt,
            models,
            out,
        } => {
            let registry = AdapterRegistry::from_env()?;
            let controller = PipelineController::new(Arc::new(registry));
            let result = controller
                .run(Prompt::text_only(prompt), models, None)
                .await?;
            let json = serde_json::to_string_pretty(&result)?;
            match out {
                Some(path) => {
                    let mut file = File::create(path)?;
                    file.write_all(json.as_bytes())?;
                }
                None => println!("{json}"),
            }
        }
        Commands::Models => {
            for m in model_arena::AVAILABLE_MODELS {
                println!(
                    "{:32} {:20} vendor={:9} vision={}",
                    m.id,
                    m.display_name,
                    m.vendor.as_str(),
                    m.supports_vision
                );
            }
        }
    }

    Ok(())
}
