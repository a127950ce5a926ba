//! Alist HTTP API Types
//!
//! Deserialization targets for the Alist JSON API.

use serde::Deserialize;

/// Storage provider tag reported by Alist for Aliyundrive Open mounts.
pub const PROVIDER_ALIYUNDRIVE_OPEN: &str = "AliyundriveOpen";

/// Status of a finished transcoding or subtitle task.
pub const TASK_FINISHED: &str = "finished";

/// Generic Alist API response wrapper
#[derive(Debug, Deserialize)]
pub struct AlistResp<T> {
    pub code: u64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

/// Login response data
#[derive(Debug, Deserialize)]
pub struct LoginData {
    pub token: String,
}

/// File/folder information from `fs/get`
#[derive(Debug, Clone, Deserialize)]
pub struct FsGetResp {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    pub is_dir: bool,
    #[serde(default)]
    pub modified: String,
    #[serde(default)]
    pub sign: String,
    #[serde(default)]
    pub thumb: String,
    #[serde(rename = "type", default)]
    pub r#type: u64,
    #[serde(default)]
    pub raw_url: String,
    #[serde(default)]
    pub provider: String,
}

/// Directory listing from `fs/list`
#[derive(Debug, Clone, Deserialize)]
pub struct FsListResp {
    #[serde(default)]
    pub content: Option<Vec<FsListContent>>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub readme: String,
    #[serde(default)]
    pub write: bool,
    #[serde(default)]
    pub provider: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FsListContent {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    pub is_dir: bool,
    #[serde(default)]
    pub modified: String,
    #[serde(default)]
    pub thumb: String,
    #[serde(rename = "type", default)]
    pub r#type: u64,
}

/// Current user information from `me`
#[derive(Debug, Clone, Deserialize)]
pub struct MeResp {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub base_path: String,
    #[serde(default)]
    pub role: u64,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub permission: u64,
}

/// Video preview information from `fs/other` with method `video_preview`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FsOtherResp {
    #[serde(default)]
    pub drive_id: String,
    #[serde(default)]
    pub file_id: String,
    #[serde(default)]
    pub video_preview_play_info: VideoPreviewPlayInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoPreviewPlayInfo {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub live_transcoding_subtitle_task_list: Vec<SubtitleTask>,
    #[serde(default)]
    pub live_transcoding_task_list: Vec<TranscodingTask>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscodingTask {
    #[serde(default)]
    pub stage: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub template_height: u64,
    #[serde(default)]
    pub template_id: String,
    #[serde(default)]
    pub template_name: String,
    #[serde(default)]
    pub template_width: u64,
    #[serde(default)]
    pub url: String,
}

impl TranscodingTask {
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status == TASK_FINISHED
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubtitleTask {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub url: String,
}

impl SubtitleTask {
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status == TASK_FINISHED
    }
}
