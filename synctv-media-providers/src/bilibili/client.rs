//! Bilibili HTTP Client

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{
    AudioStreamData, DashData, DashInfo, DashPlayData, DataResp, PlayUrlData, PlayerV2Data,
    ResultResp, SubtitleBody, SupportFormat, VideoStreamData, VideoUrlInfo,
};
use crate::error::{check_response, json_with_limit, ProviderClientError};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const REFERER: &str = "https://www.bilibili.com";
const API_BASE: &str = "https://api.bilibili.com";

/// Default quality number requested for plain play URLs (1080P).
const DEFAULT_QN: u32 = 80;

/// `fnval` flag set requesting DASH with HDR, 4K, Dolby and AV1 variants.
const DASH_FNVAL: &str = "4048";

/// Shared HTTP client for all Bilibili requests (connection pooling).
/// Redirects are disabled so a response cannot bounce requests elsewhere.
static SHARED_CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .pool_max_idle_per_host(10)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to build Bilibili shared HTTP client")
});

/// Bilibili HTTP Client
///
/// Cookies of a bound account are attached to every API request; without
/// them the API answers anonymously with reduced qualities.
#[derive(Clone)]
pub struct BilibiliClient {
    client: Client,
    api_base: String,
    cookies: HashMap<String, String>,
}

impl Default for BilibiliClient {
    fn default() -> Self {
        Self::new()
    }
}

impl BilibiliClient {
    /// Create an anonymous client (reuses shared connection pool)
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: SHARED_CLIENT.clone(),
            api_base: API_BASE.to_string(),
            cookies: HashMap::new(),
        }
    }

    /// Create a client carrying account cookies
    #[must_use]
    pub fn with_cookies(cookies: HashMap<String, String>) -> Self {
        Self {
            cookies,
            ..Self::new()
        }
    }

    /// Point the client at another API host (mirrors, tests)
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn has_cookies(&self) -> bool {
        !self.cookies.is_empty()
    }

    fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        let mut pairs: Vec<_> = self.cookies.iter().collect();
        pairs.sort();
        Some(
            pairs
                .into_iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderClientError> {
        let url = format!("{}{endpoint}", self.api_base);
        debug!(endpoint, logged_in = !self.cookies.is_empty(), "Bilibili request");
        let mut req = self.client.get(&url).query(query).header("Referer", REFERER);
        if let Some(cookie) = self.cookie_header() {
            req = req.header("Cookie", cookie);
        }
        let resp = check_response(req.send().await?)?;
        json_with_limit(resp).await
    }

    async fn get_data<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderClientError> {
        let json: DataResp<T> = self.get_json(endpoint, query).await?;
        if json.code != 0 {
            return Err(ProviderClientError::Api { code: json.code, message: json.message });
        }
        json.data
            .ok_or_else(|| ProviderClientError::Parse(format!("Missing data in {endpoint} response")))
    }

    async fn get_result<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderClientError> {
        let json: ResultResp<T> = self.get_json(endpoint, query).await?;
        if json.code != 0 {
            return Err(ProviderClientError::Api { code: json.code, message: json.message });
        }
        json.result
            .ok_or_else(|| ProviderClientError::Parse(format!("Missing result in {endpoint} response")))
    }

    /// Get plain video playback URL (UGC, not DASH)
    pub async fn get_video_url(
        &self,
        bvid: &str,
        cid: u64,
        quality: Option<u32>,
    ) -> Result<VideoUrlInfo, ProviderClientError> {
        let query = [
            ("bvid", bvid.to_string()),
            ("cid", cid.to_string()),
            ("qn", quality.unwrap_or(DEFAULT_QN).to_string()),
        ];
        let data: PlayUrlData = self.get_data("/x/player/playurl", &query).await?;
        to_video_url_info(data)
    }

    /// Get plain PGC (bangumi episode) playback URL
    pub async fn get_pgc_url(
        &self,
        epid: u64,
        quality: Option<u32>,
    ) -> Result<VideoUrlInfo, ProviderClientError> {
        let query = [
            ("ep_id", epid.to_string()),
            ("qn", quality.unwrap_or(DEFAULT_QN).to_string()),
        ];
        let result: PlayUrlData = self.get_result("/pgc/player/web/playurl", &query).await?;
        to_video_url_info(result)
    }

    /// Get DASH video streams, split into (regular, HEVC)
    pub async fn get_dash_video_url(
        &self,
        bvid: &str,
        cid: u64,
    ) -> Result<(DashData, DashData), ProviderClientError> {
        let query = [
            ("bvid", bvid.to_string()),
            ("cid", cid.to_string()),
            ("fnval", DASH_FNVAL.to_string()),
        ];
        let data: DashPlayData = self.get_data("/x/player/wbi/playurl", &query).await?;
        Ok(parse_dash_info(&data.dash, &data.support_formats))
    }

    /// Get DASH PGC streams, split into (regular, HEVC)
    pub async fn get_dash_pgc_url(&self, epid: u64) -> Result<(DashData, DashData), ProviderClientError> {
        let query = [("ep_id", epid.to_string()), ("fnval", DASH_FNVAL.to_string())];
        let result: DashPlayData = self.get_result("/pgc/player/web/playurl", &query).await?;
        Ok(parse_dash_info(&result.dash, &result.support_formats))
    }

    /// List subtitles of a video as `display name -> absolute caption URL`
    pub async fn get_subtitles(
        &self,
        bvid: &str,
        cid: u64,
    ) -> Result<HashMap<String, String>, ProviderClientError> {
        let query = [("bvid", bvid.to_string()), ("cid", cid.to_string())];
        let data: PlayerV2Data = self.get_data("/x/player/v2", &query).await?;

        let mut subtitles = HashMap::new();
        for sub in data.subtitle.subtitles {
            let url = if sub.subtitle_url.starts_with("http") {
                sub.subtitle_url
            } else if sub.subtitle_url.is_empty() {
                continue;
            } else {
                format!("https:{}", sub.subtitle_url)
            };
            if !sub.lan_doc.is_empty() {
                subtitles.insert(sub.lan_doc, url);
            }
        }
        Ok(subtitles)
    }

    /// Download a caption body from its CDN URL
    pub async fn get_subtitle_body(&self, url: &str) -> Result<SubtitleBody, ProviderClientError> {
        let req = self.client.get(url).header("Referer", REFERER);
        let resp = check_response(req.send().await?)?;
        json_with_limit(resp).await
    }
}

fn to_video_url_info(data: PlayUrlData) -> Result<VideoUrlInfo, ProviderClientError> {
    let url = data
        .durl
        .into_iter()
        .next()
        .map(|d| d.url)
        .ok_or_else(|| ProviderClientError::Parse("Empty durl list".to_string()))?;

    Ok(VideoUrlInfo {
        accept_quality: data.accept_quality.iter().map(|&q| q as u32).collect(),
        accept_description: data.accept_description,
        current_quality: data.quality as u32,
        url,
    })
}

fn is_hevc(codecs: &str) -> bool {
    codecs.starts_with("hev1") || codecs.starts_with("hvc1")
}

/// Split DASH info into (regular, HEVC). Audio streams are shared by both.
fn parse_dash_info(dash_info: &DashInfo, support_formats: &[SupportFormat]) -> (DashData, DashData) {
    let quality_names: HashMap<u64, &str> = support_formats
        .iter()
        .map(|f| (f.quality, f.new_description.as_str()))
        .collect();

    let audio_streams: Vec<AudioStreamData> = dash_info
        .audio
        .iter()
        .flatten()
        .map(|audio| AudioStreamData {
            id: audio.id,
            base_url: audio.base_url.clone(),
            mime_type: audio.mime_type.clone(),
            codecs: audio.codecs.clone(),
            bandwidth: audio.bandwidth,
            start_with_sap: audio.start_with_sap,
            segment_base: audio.segment_base.clone(),
        })
        .collect();

    let (hevc_videos, regular_videos): (Vec<_>, Vec<_>) = dash_info
        .video
        .iter()
        .map(|video| VideoStreamData {
            id: video.id,
            quality_name: quality_names
                .get(&video.id)
                .map_or_else(|| format!("{}P", video.height), |name| (*name).to_string()),
            base_url: video.base_url.clone(),
            mime_type: video.mime_type.clone(),
            codecs: video.codecs.clone(),
            width: video.width,
            height: video.height,
            frame_rate: video.frame_rate.clone(),
            bandwidth: video.bandwidth,
            sar: video.sar.clone(),
            start_with_sap: video.start_with_sap,
            segment_base: video.segment_base.clone(),
        })
        .partition(|v| is_hevc(&v.codecs));

    let regular = DashData {
        duration: dash_info.duration,
        min_buffer_time: dash_info.min_buffer_time,
        video_streams: regular_videos,
        audio_streams: audio_streams.clone(),
    };
    let hevc = DashData {
        duration: dash_info.duration,
        min_buffer_time: dash_info.min_buffer_time,
        video_streams: hevc_videos,
        audio_streams,
    };
    (regular, hevc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dash_payload() -> serde_json::Value {
        json!({
            "dash": {
                "duration": 95,
                "minBufferTime": 1.5,
                "video": [
                    {"id": 80, "baseUrl": "https://upos/avc-1080.m4s", "mimeType": "video/mp4",
                     "codecs": "avc1.640032", "width": 1920, "height": 1080, "frameRate": "30",
                     "bandwidth": 2000, "startWithSap": 1,
                     "SegmentBase": {"Initialization": "0-900", "indexRange": "901-1200"}},
                    {"id": 80, "baseUrl": "https://upos/hevc-1080.m4s", "mimeType": "video/mp4",
                     "codecs": "hev1.1.6.L120.90", "width": 1920, "height": 1080, "frameRate": "30",
                     "bandwidth": 1500, "startWithSap": 1,
                     "SegmentBase": {"Initialization": "0-1000", "indexRange": "1001-1400"}}
                ],
                "audio": [
                    {"id": 30280, "baseUrl": "https://upos/audio.m4s", "mimeType": "audio/mp4",
                     "codecs": "mp4a.40.2", "bandwidth": 128, "startWithSap": 0,
                     "SegmentBase": {"Initialization": "0-800", "indexRange": "801-1000"}}
                ]
            },
            "support_formats": [{"quality": 80, "new_description": "1080P 高清"}]
        })
    }

    #[test]
    fn test_cookie_header_is_sorted() {
        let client = BilibiliClient::with_cookies(HashMap::from([
            ("SESSDATA".to_string(), "s".to_string()),
            ("bili_jct".to_string(), "j".to_string()),
        ]));
        assert!(client.has_cookies());
        assert_eq!(client.cookie_header().unwrap(), "SESSDATA=s; bili_jct=j");
        assert!(BilibiliClient::new().cookie_header().is_none());
    }

    #[tokio::test]
    async fn test_get_dash_video_url_splits_hevc() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/x/player/wbi/playurl"))
            .and(query_param("bvid", "BV1xx411c7XZ"))
            .and(query_param("fnval", "4048"))
            .and(header("cookie", "SESSDATA=s"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0, "message": "0", "data": dash_payload()
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = BilibiliClient::with_cookies(HashMap::from([("SESSDATA".to_string(), "s".to_string())]))
            .with_api_base(server.uri());
        let (regular, hevc) = client.get_dash_video_url("BV1xx411c7XZ", 1234).await.unwrap();

        assert_eq!(regular.video_streams.len(), 1);
        assert_eq!(regular.video_streams[0].base_url, "https://upos/avc-1080.m4s");
        assert_eq!(regular.video_streams[0].quality_name, "1080P 高清");
        assert_eq!(hevc.video_streams.len(), 1);
        assert_eq!(hevc.video_streams[0].base_url, "https://upos/hevc-1080.m4s");
        assert_eq!(regular.audio_streams.len(), 1);
        assert_eq!(hevc.audio_streams.len(), 1);
    }

    #[tokio::test]
    async fn test_get_pgc_url_uses_result_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pgc/player/web/playurl"))
            .and(query_param("ep_id", "777"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0, "message": "success",
                "result": {"accept_quality": [80, 64], "accept_description": ["1080P", "720P"],
                           "quality": 64, "durl": [{"url": "https://upos/ep.flv", "size": 1}]}
            })))
            .mount(&server)
            .await;

        let client = BilibiliClient::new().with_api_base(server.uri());
        let info = client.get_pgc_url(777, None).await.unwrap();
        assert_eq!(info.url, "https://upos/ep.flv");
        assert_eq!(info.current_quality, 64);
        assert_eq!(info.accept_quality, vec![80, 64]);
    }

    #[tokio::test]
    async fn test_api_error_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/x/player/playurl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": -404, "message": "啥都木有", "data": null
            })))
            .mount(&server)
            .await;

        let client = BilibiliClient::new().with_api_base(server.uri());
        let err = client.get_video_url("BV1", 1, None).await.unwrap_err();
        assert!(matches!(err, ProviderClientError::Api { code: -404, .. }));
    }

    #[tokio::test]
    async fn test_get_subtitles_normalizes_urls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/x/player/v2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 0, "message": "0",
                "data": {"subtitle": {"subtitles": [
                    {"id": 1, "lan": "zh-CN", "lan_doc": "中文（中国）", "subtitle_url": "//i0.hdslb.com/bfs/subtitle/zh.json"},
                    {"id": 2, "lan": "en-US", "lan_doc": "English", "subtitle_url": "https://i0.hdslb.com/bfs/subtitle/en.json"},
                    {"id": 3, "lan": "ja", "lan_doc": "日本語", "subtitle_url": ""}
                ]}}
            })))
            .mount(&server)
            .await;

        let client = BilibiliClient::new().with_api_base(server.uri());
        let subs = client.get_subtitles("BV1", 1).await.unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs["中文（中国）"], "https://i0.hdslb.com/bfs/subtitle/zh.json");
        assert_eq!(subs["English"], "https://i0.hdslb.com/bfs/subtitle/en.json");
    }
}
