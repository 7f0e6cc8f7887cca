use crate::asset::{self, AssetResult, AssetUploadSpec};
use crate::client::AssetApi;
use crate::form::{FilePart, ParsedRequest};
use crate::poll::{self, PollPolicy};
use crate::writer;
use serde_json::Value;

/// An inbound form that passed validation, ready to be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedUpload {
    pub spec: AssetUploadSpec,
    pub file: FilePart,
    pub api_key: String,
}

impl PreparedUpload {
    /// Validates the inbound form and resolves the asset type.
    ///
    /// Reads `userId`, `apiKey`, `assetType`, `displayName`, `description`
    /// and the form's file part.
    pub fn from_form(mut form: ParsedRequest) -> crate::Result<PreparedUpload> {
        let (user_id, api_key) = match (form.field("userId"), form.field("apiKey")) {
            (Some(user_id), Some(api_key)) => (user_id.to_owned(), api_key.to_owned()),
            _ => return Err(crate::Error::MissingCredentials),
        };

        let file = form
            .take_file()
            .filter(|file| !file.is_empty())
            .ok_or(crate::Error::MissingFile)?;

        let inferred = asset::infer(&file.file_name, form.field("assetType"));
        let spec = AssetUploadSpec::new(
            inferred.asset_type,
            form.field("displayName"),
            form.field("description"),
            user_id,
        );

        Ok(PreparedUpload { spec, file, api_key })
    }

    pub fn mime_type(&self) -> &'static str {
        mime_type_of(&self.spec, &self.file)
    }
}

fn mime_type_of(spec: &AssetUploadSpec, file: &FilePart) -> &'static str {
    asset::mime_type_for(spec.asset_type, &asset::file_extension(&file.file_name))
}

/// Submits uploads to the assets API and waits for asynchronous operations.
pub struct Uploader<A> {
    api: A,
    policy: PollPolicy,
}

impl<A: AssetApi> Uploader<A> {
    pub fn new(api: A, policy: PollPolicy) -> Uploader<A> {
        Uploader { api, policy }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Validates an inbound form, then submits it.
    pub async fn upload_form(&self, form: ParsedRequest) -> crate::Result<AssetResult> {
        let prepared = PreparedUpload::from_form(form)?;
        self.submit(&prepared.spec, &prepared.file, &prepared.api_key).await
    }

    /// Creates the asset and resolves its id.
    ///
    /// A 2xx reply carrying `assetId` (top level or under `response`) is final.
    /// A 2xx reply carrying only an operation `path` is polled; if polling
    /// never confirms the asset, the result is still a success with no id.
    pub async fn submit(&self, spec: &AssetUploadSpec, file: &FilePart, api_key: &str) -> crate::Result<AssetResult> {
        if spec.creator_user_id.is_empty() || api_key.is_empty() {
            return Err(crate::Error::MissingCredentials);
        }
        if file.is_empty() {
            return Err(crate::Error::MissingFile);
        }

        let mime_type = mime_type_of(spec, file);
        let metadata = spec.metadata_json()?;
        let body = writer::encode(&metadata, file, mime_type);

        log::info!(
            "uploading '{}' ({} bytes) for user {} as {} ({})",
            writer::outbound_file_name(file),
            file.len(),
            spec.creator_user_id,
            spec.asset_type,
            mime_type
        );

        let response = self.api.create_asset(api_key, body).await?;
        log::info!("assets API answered {}", response.status);

        let body = response.json();
        if !response.is_success() {
            log::debug!("assets API error body: {}", body);
            return Err(crate::Error::from_remote(response.status, body));
        }

        if let Some(asset_id) = poll::direct_asset_id(&body) {
            return Ok(AssetResult::new(Some(asset_id), body));
        }

        let path = match body.get("path").and_then(Value::as_str) {
            Some(path) => path.to_owned(),
            None => {
                log::warn!("assets API reply has neither assetId nor operation path");
                return Ok(AssetResult::new(None, body));
            }
        };

        let outcome = poll::poll_operation(&self.api, api_key, &path, &self.policy, body).await;
        Ok(AssetResult::new(outcome.asset_id, outcome.last_seen))
    }
}
