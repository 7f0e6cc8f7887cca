use crate::client::AssetApi;
use crate::constants;
use crate::helpers;
use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

/// Credentials submitted for a check, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyRequest {
    pub user_id: Option<String>,
    pub api_key: Option<String>,
}

impl VerifyRequest {
    /// Reads `{userId, apiKey}`. `userId` may be sent as a string or a number.
    pub fn from_json(body: &[u8]) -> crate::Result<VerifyRequest> {
        let value: Value = serde_json::from_slice(body).map_err(crate::Error::DecodeJson)?;

        Ok(VerifyRequest {
            user_id: helpers::json_id(value.get("userId")),
            api_key: value
                .get("apiKey")
                .and_then(Value::as_str)
                .filter(|key| !key.is_empty())
                .map(str::to_owned),
        })
    }
}

/// Outcome of probing an API key. Only a definite 401 or 403 marks the key
/// invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCheck {
    pub valid: bool,
    pub error: Option<String>,
    pub warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResult {
    pub valid: bool,
    pub display_name: Option<String>,
    pub key_valid: bool,
    pub key_error: Option<String>,
    pub key_warning: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLookup {
    pub valid: bool,
    pub display_name: Option<String>,
    pub user_id: String,
}

pub fn validate_user_id(user_id: &str) -> crate::Result<()> {
    if constants::NUMERIC_USER_ID_RE.is_match(user_id) {
        Ok(())
    } else {
        Err(crate::Error::Validation("User ID must be a number".to_owned()))
    }
}

/// Confirms the user exists and is not banned, returning its display name.
pub async fn verify_user<A>(api: &A, user_id: &str) -> crate::Result<Option<String>>
where
    A: AssetApi + ?Sized,
{
    let response = api
        .get_user(user_id)
        .await
        .map_err(|err| crate::Error::UpstreamUnreachable(err.to_string()))?;

    if !response.is_success() {
        log::debug!("user lookup for {} answered {}", user_id, response.status);
        return Err(crate::Error::UserNotFound);
    }

    let user = response.json();
    if user.get("isBanned").and_then(Value::as_bool) == Some(true) {
        return Err(crate::Error::UserBanned);
    }

    Ok(user
        .get("displayName")
        .or_else(|| user.get("name"))
        .and_then(Value::as_str)
        .map(str::to_owned))
}

pub async fn check_api_key<A>(api: &A, api_key: &str) -> KeyCheck
where
    A: AssetApi + ?Sized,
{
    match api.probe_api_key(api_key).await {
        Ok(response) => match response.status {
            StatusCode::UNAUTHORIZED => KeyCheck {
                valid: false,
                error: Some("API Key is invalid (401)".to_owned()),
                warning: None,
            },
            StatusCode::FORBIDDEN => KeyCheck {
                valid: false,
                error: Some("API Key lacks Assets permissions (403)".to_owned()),
                warning: None,
            },
            _ => KeyCheck {
                valid: true,
                error: None,
                warning: None,
            },
        },
        Err(err) => {
            log::warn!("API key probe failed: {}", err);
            KeyCheck {
                valid: true,
                error: None,
                warning: Some("Could not fully verify key".to_owned()),
            }
        }
    }
}

/// Checks both halves of a credential pair without uploading anything.
pub async fn verify_credentials<A>(api: &A, request: VerifyRequest) -> crate::Result<VerifyResult>
where
    A: AssetApi + ?Sized,
{
    let (user_id, api_key) = match (request.user_id, request.api_key) {
        (Some(user_id), Some(api_key)) => (user_id, api_key),
        _ => return Err(crate::Error::MissingCredentials),
    };

    validate_user_id(&user_id)?;

    let display_name = verify_user(api, &user_id).await?;
    let key = check_api_key(api, &api_key).await;

    Ok(VerifyResult {
        valid: true,
        display_name,
        key_valid: key.valid,
        key_error: key.error,
        key_warning: key.warning,
    })
}

/// The user-only lookup behind `GET /api/verify?uid=…`.
pub async fn lookup_user<A>(api: &A, user_id: &str) -> crate::Result<UserLookup>
where
    A: AssetApi + ?Sized,
{
    let display_name = verify_user(api, user_id).await?;

    Ok(UserLookup {
        valid: true,
        display_name,
        user_id: user_id.to_owned(),
    })
}
