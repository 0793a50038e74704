pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod server;
pub mod services;
pub mod utils;

pub use commands::AppState;
pub use config::ServerConfig;
pub use server::build_router;

pub async fn run() {
    if let Err(error) = try_run().await {
        eprintln!("failed to launch server: {error}");
        std::process::exit(1);
    }
}

async fn try_run() -> error::AppResult<()> {
    let config = ServerConfig::from_env()?;
    utils::logger::init_logging(config.log_dir.as_deref())?;
    server::serve(config).await
}
