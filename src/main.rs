use std::env;
use std::process;
use window_limiter::{config::LimiterConfig, init_limiter_server, init_tracing};

#[tokio::main]
async fn main() {
    // Initialize tracing
    init_tracing();

    // Get config file path from command line or use default
    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| "config/limiter.yaml".to_string());

    // Load configuration
    let config = match LimiterConfig::from_file(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration from {}: {}", config_path, e);
            eprintln!("Usage: window-limiter [config_file]");
            process::exit(1);
        }
    };

    if let Err(e) = init_limiter_server(config).await {
        eprintln!("Rate limiter error: {}", e);
        process::exit(1);
    }
}
