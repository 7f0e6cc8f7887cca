use crate::constants;
use crate::poll::PollPolicy;
use crate::size_limit::SizeLimit;
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

/// Server configuration, from flags or `ASSET_RELAY_*` environment variables.
#[derive(Debug, Clone, Parser)]
#[command(name = "asset-relay", version, about = "Relays form uploads to the Roblox assets API")]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "ASSET_RELAY_LISTEN", default_value = "127.0.0.1:3000")]
    pub listen: SocketAddr,

    /// Base URL of the assets API.
    #[arg(long, env = "ASSET_RELAY_API_BASE", default_value = constants::DEFAULT_API_BASE)]
    pub api_base: String,

    /// Base URL of the users API.
    #[arg(long, env = "ASSET_RELAY_USERS_BASE", default_value = constants::DEFAULT_USERS_BASE)]
    pub users_base: String,

    /// Operation polls before an upload is reported as unconfirmed.
    #[arg(long, env = "ASSET_RELAY_POLL_ATTEMPTS", default_value_t = constants::DEFAULT_POLL_ATTEMPTS)]
    pub poll_attempts: u32,

    /// Wait before each operation poll.
    #[arg(long, env = "ASSET_RELAY_POLL_INTERVAL", default_value = "2s", value_parser = humantime::parse_duration)]
    pub poll_interval: Duration,

    /// Timeout for each outbound request.
    #[arg(long, env = "ASSET_RELAY_REQUEST_TIMEOUT", default_value = "30s", value_parser = humantime::parse_duration)]
    pub request_timeout: Duration,

    /// Largest accepted request body, in bytes.
    #[arg(long, env = "ASSET_RELAY_MAX_BODY_SIZE", default_value_t = constants::DEFAULT_WHOLE_STREAM_SIZE_LIMIT)]
    pub max_body_size: usize,

    /// Largest accepted file part, in bytes.
    #[arg(long, env = "ASSET_RELAY_MAX_FILE_SIZE", default_value_t = constants::DEFAULT_FILE_SIZE_LIMIT)]
    pub max_file_size: usize,

    /// Log as JSON lines.
    #[arg(long, env = "ASSET_RELAY_LOG_JSON")]
    pub log_json: bool,
}

impl Config {
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            max_attempts: self.poll_attempts,
            interval: self.poll_interval,
        }
    }

    pub fn size_limit(&self) -> SizeLimit {
        SizeLimit::new()
            .whole_stream(self.max_body_size)
            .for_field(constants::FORM_FILE_FIELD, self.max_file_size)
    }
}
