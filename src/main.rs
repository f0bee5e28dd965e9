// sqlgate - ask your database in plain english, safely

use sqlgate::cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // a missing .env is fine, real env vars still apply
    dotenvy::dotenv().ok();
    init_logging();

    if let Err(e) = cli::run().await {
        eprintln!("error: {e:?}");
        std::process::exit(1);
    }
}

// logs go to stderr so `ask --raw` output stays clean json
fn init_logging() {
    let filter = std::env::var("RUST_LOG")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new("warn,sqlgate=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
