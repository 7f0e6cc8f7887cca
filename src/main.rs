use std::process::ExitCode;
use std::sync::Arc;

use asset_relay::{App, Config, RemoteApi, Uploader};
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if config.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();
    init_logging(&config);

    let api = match RemoteApi::new(&*config.api_base, &*config.users_base, config.request_timeout) {
        Ok(api) => api,
        Err(err) => {
            log::error!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let app = Arc::new(App::new(Uploader::new(api, config.poll_policy()), config.size_limit()));

    let listener = match TcpListener::bind(config.listen).await {
        Ok(listener) => listener,
        Err(err) => {
            log::error!("failed to bind {}: {}", config.listen, err);
            return ExitCode::FAILURE;
        }
    };

    log::info!(
        "listening on {} (assets API {}, {} polls every {:?})",
        config.listen,
        config.api_base,
        config.poll_attempts,
        config.poll_interval
    );

    tokio::select! {
        _ = asset_relay::server::serve(listener, app) => {}
        _ = tokio::signal::ctrl_c() => {
            log::info!("shutting down");
        }
    }

    ExitCode::SUCCESS
}
