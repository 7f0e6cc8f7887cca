use crate::client::AssetApi;
use crate::constants;
use crate::helpers;
use serde_json::Value;
use std::time::Duration;

/// How long to wait for an asynchronous operation to finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy {
            max_attempts: constants::DEFAULT_POLL_ATTEMPTS,
            interval: constants::DEFAULT_POLL_INTERVAL,
        }
    }
}

/// What one poll attempt observed.
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    /// Transport error or non-2xx status.
    Transient,
    /// 2xx with `done` not `true`.
    Pending(Value),
    /// 2xx with `done == true`.
    Complete(Value),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    Polling { attempt: u32 },
    Done(Option<String>),
    GivenUp,
}

impl PollState {
    pub fn start(policy: &PollPolicy) -> PollState {
        if policy.max_attempts == 0 {
            PollState::GivenUp
        } else {
            PollState::Polling { attempt: 0 }
        }
    }

    /// Applies one attempt. `Done` and `GivenUp` are terminal.
    pub fn next(self, attempt: &Attempt, policy: &PollPolicy) -> PollState {
        match self {
            PollState::Polling { attempt: count } => match attempt {
                Attempt::Complete(body) => PollState::Done(asset_id_from_operation(body)),
                Attempt::Transient | Attempt::Pending(_) => {
                    let count = count + 1;
                    if count >= policy.max_attempts {
                        PollState::GivenUp
                    } else {
                        PollState::Polling { attempt: count }
                    }
                }
            },
            terminal => terminal,
        }
    }
}

/// Result of driving an operation to a terminal state.
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    pub asset_id: Option<String>,
    /// The final operation body, or the initial response if the operation
    /// never reported `done`.
    pub last_seen: Value,
    pub attempts: u32,
}

/// Polls `path` until the operation is done or the attempt budget runs out.
///
/// Never fails: giving up yields `asset_id: None`.
pub async fn poll_operation<A>(api: &A, api_key: &str, path: &str, policy: &PollPolicy, initial: Value) -> PollOutcome
where
    A: AssetApi + ?Sized,
{
    let mut state = PollState::start(policy);
    let mut last_seen = initial;
    let mut attempts = 0;

    loop {
        match state {
            PollState::Polling { .. } => {
                tokio::time::sleep(policy.interval).await;
                attempts += 1;

                let attempt = attempt_once(api, api_key, path).await;
                log::debug!("poll {} of '{}': {:?}", attempts, path, attempt);

                if let Attempt::Complete(body) = &attempt {
                    last_seen = body.clone();
                }

                state = state.next(&attempt, policy);
            }
            PollState::Done(asset_id) => {
                log::info!("operation '{}' finished after {} polls, asset id {:?}", path, attempts, asset_id);
                return PollOutcome {
                    asset_id,
                    last_seen,
                    attempts,
                };
            }
            PollState::GivenUp => {
                log::warn!("operation '{}' not done after {} polls, giving up", path, attempts);
                return PollOutcome {
                    asset_id: None,
                    last_seen,
                    attempts,
                };
            }
        }
    }
}

async fn attempt_once<A>(api: &A, api_key: &str, path: &str) -> Attempt
where
    A: AssetApi + ?Sized,
{
    match api.get_operation(api_key, path).await {
        Ok(response) if response.is_success() => {
            let body = response.json();
            if body.get("done").and_then(Value::as_bool) == Some(true) {
                Attempt::Complete(body)
            } else {
                Attempt::Pending(body)
            }
        }
        Ok(response) => {
            log::warn!("poll of '{}' answered {}", path, response.status);
            Attempt::Transient
        }
        Err(err) => {
            log::warn!("poll of '{}' failed: {}", path, err);
            Attempt::Transient
        }
    }
}

/// `assetId` at the top level or under `response`.
pub fn direct_asset_id(body: &Value) -> Option<String> {
    helpers::json_id(body.get("assetId")).or_else(|| helpers::json_id(body.pointer("/response/assetId")))
}

/// Best-effort: digits following `assets/` in `response.path` or `path`.
pub fn recover_asset_id(body: &Value) -> Option<String> {
    ["/response/path", "/path"]
        .iter()
        .filter_map(|pointer| body.pointer(pointer).and_then(Value::as_str))
        .find_map(|path| {
            constants::ASSET_PATH_RE
                .captures(path)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_owned())
        })
}

fn asset_id_from_operation(body: &Value) -> Option<String> {
    direct_asset_id(body).or_else(|| recover_asset_id(body))
}
