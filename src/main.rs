use clap::{Parser, Subcommand};
use event_search::app::event_search_use_case::EventSearchUseCase;
use event_search::common::types::SearchRequest;
use event_search::config::Config;
use event_search::server::{start_server, AppState};
use event_search::{logging, observability};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "event_search")]
#[command(about = "Event search backend with deduplication, pagination and snippets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Port to listen on (overrides PORT / config.toml)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run the search pipeline once and print the JSON response for each page
    Search {
        /// Location, e.g. "Dallas, TX"
        #[arg(long)]
        location: String,
        /// Interests (comma-separated)
        #[arg(long, value_delimiter = ',')]
        interests: Vec<String>,
        /// Date filter (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// Number of pages to request
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();
    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Serve { port } => {
            observability::init();
            let port = port.unwrap_or(config.server.port);
            let state = AppState {
                use_case: Arc::new(EventSearchUseCase::from_config(&config)),
                environment: config.server.environment.clone(),
            };
            start_server(state, port).await?;
        }
        Commands::Search {
            location,
            interests,
            date,
            pages,
        } => {
            let use_case = EventSearchUseCase::from_config(&config);
            let request = SearchRequest {
                location,
                interests,
                date,
            };
            for page in 1..=pages.max(1) {
                match use_case.search(&request).await {
                    Ok(resp) => {
                        info!("Page {} returned {} items", page, resp.items.len());
                        println!("{}", serde_json::to_string_pretty(&resp)?);
                    }
                    Err(e) => {
                        error!("Search failed: {}", e);
                        return Err(e.into());
                    }
                }
            }
        }
    }
    Ok(())
}
