use crate::constants;
use crate::helpers;
use serde::Serialize;
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

/// The asset categories the remote API validates uploads against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AssetType {
    Model,
    Decal,
    Audio,
    MeshPart,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Model => "Model",
            AssetType::Decal => "Decal",
            AssetType::Audio => "Audio",
            AssetType::MeshPart => "MeshPart",
        }
    }

    pub fn from_extension(ext: &str) -> Option<AssetType> {
        match ext {
            "rbxm" | "rbxmx" => Some(AssetType::Model),
            "png" | "jpg" | "jpeg" => Some(AssetType::Decal),
            "mp3" | "ogg" => Some(AssetType::Audio),
            "fbx" | "obj" => Some(AssetType::MeshPart),
            _ => None,
        }
    }

    /// Reads the type picked in the browser form. The form says `Mesh` where
    /// the remote API says `MeshPart`.
    pub fn from_hint(hint: &str) -> Option<AssetType> {
        match hint {
            "Model" => Some(AssetType::Model),
            "Decal" => Some(AssetType::Decal),
            "Audio" => Some(AssetType::Audio),
            "Mesh" | "MeshPart" => Some(AssetType::MeshPart),
            _ => None,
        }
    }
}

impl Display for AssetType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The lowercased text after the last `.` of `file_name`, or `""` when there is none.
pub fn file_extension(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Asset type and MIME type resolved for one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inference {
    pub asset_type: AssetType,
    pub mime_type: &'static str,
}

/// Resolves the asset type and MIME type of an upload. Total: every input
/// yields a value.
///
/// A recognized extension decides the type; otherwise a valid `hint` does;
/// otherwise the type is `Model`.
pub fn infer(file_name: &str, hint: Option<&str>) -> Inference {
    let ext = file_extension(file_name);

    let asset_type = AssetType::from_extension(&ext)
        .or_else(|| hint.and_then(AssetType::from_hint))
        .unwrap_or(AssetType::Model);

    Inference {
        asset_type,
        mime_type: mime_type_for(asset_type, &ext),
    }
}

pub fn mime_type_for(asset_type: AssetType, ext: &str) -> &'static str {
    let by_type = match asset_type {
        AssetType::Decal => lookup(constants::DECAL_ONLY_MIME, ext),
        _ => None,
    };

    by_type
        .or_else(|| lookup(constants::MIME_BY_EXTENSION, ext))
        .unwrap_or(constants::OCTET_STREAM)
}

fn lookup(table: &[(&str, &'static str)], ext: &str) -> Option<&'static str> {
    table.iter().find(|(known, _)| *known == ext).map(|(_, mime_type)| *mime_type)
}

/// What gets created on the remote side. Built once per upload; the name and
/// description are already defaulted and truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUploadSpec {
    pub asset_type: AssetType,
    pub display_name: String,
    pub description: String,
    pub creator_user_id: String,
}

impl AssetUploadSpec {
    pub fn new<U: Into<String>>(
        asset_type: AssetType,
        display_name: Option<&str>,
        description: Option<&str>,
        creator_user_id: U,
    ) -> AssetUploadSpec {
        AssetUploadSpec {
            asset_type,
            display_name: helpers::truncate_chars(
                display_name.unwrap_or(constants::DEFAULT_DISPLAY_NAME),
                constants::MAX_DISPLAY_NAME_CHARS,
            ),
            description: helpers::truncate_chars(
                description.unwrap_or(constants::DEFAULT_DESCRIPTION),
                constants::MAX_DESCRIPTION_CHARS,
            ),
            creator_user_id: creator_user_id.into(),
        }
    }

    pub fn metadata(&self) -> AssetMetadata<'_> {
        AssetMetadata {
            asset_type: self.asset_type,
            display_name: &self.display_name,
            description: &self.description,
            creation_context: CreationContext {
                creator: Creator {
                    user_id: &self.creator_user_id,
                },
            },
        }
    }

    pub fn metadata_json(&self) -> crate::Result<String> {
        serde_json::to_string(&self.metadata()).map_err(|err| crate::Error::Server(err.to_string()))
    }
}

/// The `request` part of an outbound upload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetMetadata<'a> {
    pub asset_type: AssetType,
    pub display_name: &'a str,
    pub description: &'a str,
    pub creation_context: CreationContext<'a>,
}

#[derive(Debug, Serialize)]
pub struct CreationContext<'a> {
    pub creator: Creator<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Creator<'a> {
    pub user_id: &'a str,
}

/// The success body returned to the browser.
///
/// `asset_id` is `None` when the upload was accepted but never confirmed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetResult {
    pub success: bool,
    pub asset_id: Option<String>,
    pub toolbox_url: Option<String>,
    pub insert_url: Option<String>,
    pub raw: Value,
}

impl AssetResult {
    pub fn new(asset_id: Option<String>, raw: Value) -> AssetResult {
        AssetResult {
            success: true,
            toolbox_url: asset_id
                .as_ref()
                .map(|id| format!("{}{}", constants::TOOLBOX_URL_PREFIX, id)),
            insert_url: asset_id
                .as_ref()
                .map(|id| format!("{}{}", constants::INSERT_URL_PREFIX, id)),
            asset_id,
            raw,
        }
    }
}
