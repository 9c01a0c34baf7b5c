use tracing_subscriber::EnvFilter;

use aegis::api::{server, ApiContext};
use aegis::config::Config;
use aegis::db;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        version = aegis::config::APP_VERSION,
        db = %config.database_path.display(),
        "Starting Aegis"
    );

    if let Some(parent) = config.database_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::error!(error = %e, "Cannot create data directory");
            std::process::exit(1);
        }
    }
    let conn = match db::open_database(&config.database_path) {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!(error = %e, "Cannot open database");
            std::process::exit(1);
        }
    };

    let ctx = ApiContext::new(conn, config.build_model_client(), config.build_channels());
    if let Err(e) = server::serve(ctx, config.bind_addr).await {
        tracing::error!(error = %e, "Server terminated");
        std::process::exit(1);
    }
}
