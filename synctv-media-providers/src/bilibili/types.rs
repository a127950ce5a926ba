//! Bilibili API Data Structures

use serde::Deserialize;

/// Common envelope for `api.bilibili.com/x/...` responses (payload in `data`).
#[derive(Debug, Clone, Deserialize)]
pub struct DataResp<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

/// Envelope for `api.bilibili.com/pgc/...` responses (payload in `result`).
#[derive(Debug, Clone, Deserialize)]
pub struct ResultResp<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub result: Option<T>,
}

/// Plain (progressive) play URL payload, shared by UGC and PGC endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct PlayUrlData {
    #[serde(default)]
    pub accept_quality: Vec<u64>,
    #[serde(default)]
    pub accept_description: Vec<String>,
    #[serde(default)]
    pub quality: u64,
    #[serde(default)]
    pub durl: Vec<DurlInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DurlInfo {
    pub url: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub length: u64,
    #[serde(default)]
    pub backup_url: Option<Vec<String>>,
}

/// Quality format descriptor
#[derive(Debug, Clone, Deserialize)]
pub struct SupportFormat {
    pub quality: u64,
    #[serde(default)]
    pub new_description: String,
}

/// DASH play URL payload, shared by UGC and PGC endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct DashPlayData {
    pub dash: DashInfo,
    #[serde(default)]
    pub support_formats: Vec<SupportFormat>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashInfo {
    #[serde(default)]
    pub duration: f64,
    #[serde(default, rename = "minBufferTime")]
    pub min_buffer_time: f64,
    #[serde(default)]
    pub video: Vec<DashVideo>,
    #[serde(default)]
    pub audio: Option<Vec<DashAudio>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashVideo {
    pub id: u64,
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(default, rename = "backupUrl")]
    pub backup_url: Option<Vec<String>>,
    #[serde(default, rename = "mimeType")]
    pub mime_type: String,
    #[serde(default)]
    pub codecs: String,
    #[serde(default)]
    pub width: u64,
    #[serde(default)]
    pub height: u64,
    #[serde(default, rename = "frameRate")]
    pub frame_rate: String,
    #[serde(default)]
    pub bandwidth: u64,
    #[serde(default)]
    pub sar: String,
    #[serde(default, rename = "startWithSap")]
    pub start_with_sap: u64,
    #[serde(default, rename = "SegmentBase")]
    pub segment_base: SegmentBase,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashAudio {
    pub id: u64,
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(default, rename = "backupUrl")]
    pub backup_url: Option<Vec<String>>,
    #[serde(default, rename = "mimeType")]
    pub mime_type: String,
    #[serde(default)]
    pub codecs: String,
    #[serde(default)]
    pub bandwidth: u64,
    #[serde(default, rename = "startWithSap")]
    pub start_with_sap: u64,
    #[serde(default, rename = "SegmentBase")]
    pub segment_base: SegmentBase,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SegmentBase {
    #[serde(default, rename = "Initialization")]
    pub initialization: String,
    #[serde(default, rename = "indexRange")]
    pub index_range: String,
}

/// Player v2 info carrying the subtitle list
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerV2Data {
    #[serde(default)]
    pub subtitle: SubtitleInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubtitleInfo {
    #[serde(default)]
    pub subtitles: Vec<SubtitleItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubtitleItem {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub lan: String,
    pub lan_doc: String,
    pub subtitle_url: String,
}

/// Caption body served from the subtitle CDN (`subtitle_url`)
#[derive(Debug, Clone, Deserialize)]
pub struct SubtitleBody {
    #[serde(default)]
    pub font_size: f64,
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub body: Vec<SubtitleLine>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubtitleLine {
    pub from: f64,
    pub to: f64,
    #[serde(default)]
    pub sid: i64,
    #[serde(default)]
    pub location: i64,
    pub content: String,
}

/// Resolved plain play URL
#[derive(Debug, Clone)]
pub struct VideoUrlInfo {
    pub accept_quality: Vec<u32>,
    pub accept_description: Vec<String>,
    pub current_quality: u32,
    pub url: String,
}

/// DASH stream data (structured, turned into MPD XML by [`super::generate_mpd`])
#[derive(Debug, Clone)]
pub struct DashData {
    pub duration: f64,
    pub min_buffer_time: f64,
    pub video_streams: Vec<VideoStreamData>,
    pub audio_streams: Vec<AudioStreamData>,
}

/// Video stream representation
#[derive(Debug, Clone)]
pub struct VideoStreamData {
    pub id: u64,
    pub quality_name: String,
    pub base_url: String,
    pub mime_type: String,
    pub codecs: String,
    pub width: u64,
    pub height: u64,
    pub frame_rate: String,
    pub bandwidth: u64,
    pub sar: String,
    pub start_with_sap: u64,
    pub segment_base: SegmentBase,
}

/// Audio stream representation
#[derive(Debug, Clone)]
pub struct AudioStreamData {
    pub id: u64,
    pub base_url: String,
    pub mime_type: String,
    pub codecs: String,
    pub bandwidth: u64,
    pub start_with_sap: u64,
    pub segment_base: SegmentBase,
}
