use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use datachat::config::Config;
use datachat::gemini::GeminiClient;
use datachat::web_server;

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about = "Browser chat over the Gemini API with CSV upload and AI data analysis", long_about = None)]
struct Cli {
    /// Port for the web server.
    #[arg(long, default_value_t = 8501)]
    port: u16,
    /// Address to bind the web server to.
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,
}

// The main entry point of the application, using tokio's async runtime
#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for environment variables like API keys)
    dotenvy::dotenv().ok();

    // Initialize tracing (logging) subscriber
    // Reads log level from RUST_LOG environment variable (e.g., RUST_LOG=info,datachat=debug)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Parse command-line arguments
    let cli = Cli::parse();

    // A missing API key degrades chat to a visible warning; it never aborts
    // startup.
    let model = match Config::from_env() {
        Ok(config) => {
            info!(model = %config.model, "Gemini API key successfully configured");
            Some(GeminiClient::new(&config))
        }
        Err(e) => {
            warn!("{}; chat responses are disabled", e);
            None
        }
    };

    info!("Starting web server on {}:{}...", cli.bind, cli.port);
    let bind = cli.bind.clone();
    let mut web_server_handle = tokio::spawn(async move {
        if let Err(e) = web_server::start_web_server(&bind, cli.port, model).await {
            error!("Web server failed: {:?}", e);
        }
    });

    // Keep the main thread alive and wait for shutdown signals or task completion
    let ctrl_c = tokio::signal::ctrl_c();
    // Pin the ctrl_c future to the stack so its address is stable
    tokio::pin!(ctrl_c);

    tokio::select! {
        // Wait for Ctrl-C signal for graceful shutdown
        _ = &mut ctrl_c => {
            info!("Ctrl-C received, initiating shutdown...");
        }
        // Handle potential completion/failure of the web server task
        res = &mut web_server_handle => {
            match res {
                Ok(_) => info!("Web server task completed unexpectedly."),
                // Handle JoinError (e.g., if the task panicked)
                Err(e) if e.is_panic() => error!("Web server task panicked: {:?}", e),
                Err(e) => error!("Web server task failed: {:?}", e),
            }
        }
    }

    if !web_server_handle.is_finished() {
        web_server_handle.abort();
    }
    info!("Shutdown complete.");

    Ok(())
}
