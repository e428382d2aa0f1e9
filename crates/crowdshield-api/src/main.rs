use crowdshield_api::ServerConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Optional config file path as the first argument; environment
    // variables (CROWDSHIELD_*) override, defaults otherwise.
    let config = match std::env::args().nth(1) {
        Some(path) => match ServerConfig::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("failed to load config {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => ServerConfig::from_env().unwrap_or_default(),
    };

    if let Err(e) = crowdshield_api::run(config).await {
        tracing::error!("server exited with error: {}", e);
        std::process::exit(1);
    }
}
