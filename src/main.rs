use std::net::SocketAddr;

use axum_server::tls_rustls::RustlsConfig;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use sims::config::Config;
use sims::endpoints::{self, AppState};

#[tokio::main]
async fn main() {
    // Begin logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Could not install logger: {e}");
    }

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("{e}");
            return;
        }
    };

    // Open the stores, aborting start-up if an error occurs
    let state = match AppState::open(&config).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("{e}");
            return;
        }
    };

    info!("Stores opened under {}", config.storage.data_dir.display());

    let app = endpoints::router(state);

    let Ok(addr) = config.server.bind.parse::<SocketAddr>() else {
        tracing::error!("Invalid bind address '{}'", config.server.bind);
        return;
    };

    let served = match (&config.server.tls_cert, &config.server.tls_key) {
        (Some(cert), Some(key)) => {
            _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
            let tls = match RustlsConfig::from_pem_file(cert, key).await {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!("Could not load TLS certificate: {e}");
                    return;
                }
            };
            info!("Serving HTTPS on {addr}");
            axum_server::bind_rustls(addr, tls)
                .serve(app.into_make_service())
                .await
        }
        _ => {
            info!("Serving HTTP on {addr}");
            axum_server::bind(addr).serve(app.into_make_service()).await
        }
    };

    if let Err(e) = served {
        tracing::error!("Server stopped: {e}");
    }
}
