use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::id::{MovieId, RoomId, UserId};
use crate::{Error, Result};

static RE_BVID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^BV[0-9A-Za-z]+$").expect("invalid BVID regex"));

/// A playlist item of one room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub room_id: RoomId,
    pub creator_id: UserId,
    /// Per-room ordering key. Unique and strictly increasing in list order.
    pub position: u64,
    pub base: MovieBase,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Movie {
    /// New movie with a fresh id. `position` is assigned by the playlist on insert.
    #[must_use]
    pub fn new(room_id: RoomId, creator_id: UserId, base: MovieBase) -> Self {
        let now = Utc::now();
        Self {
            id: MovieId::new(),
            room_id,
            creator_id,
            position: 0,
            base,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.room_id.is_empty() {
            return Err(Error::InvalidInput("room id is empty".to_string()));
        }
        self.base.validate()
    }

    /// Whether this movie is played through a streaming channel.
    #[must_use]
    pub const fn needs_channel(&self) -> bool {
        self.base.live && (self.base.rtmp_source || self.base.proxy)
    }

    #[must_use]
    pub fn alist(&self) -> Option<(&str, &str)> {
        match self.base.vendor_info.as_ref().map(|v| &v.kind) {
            Some(VendorKind::Alist { path, password }) => Some((path.as_str(), password.as_str())),
            _ => None,
        }
    }

    #[must_use]
    pub fn bilibili(&self) -> Option<&BilibiliRef> {
        match self.base.vendor_info.as_ref().map(|v| &v.kind) {
            Some(VendorKind::Bilibili(bili)) => Some(bili),
            _ => None,
        }
    }
}

/// The user-editable description of a movie
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovieBase {
    pub name: String,
    pub url: String,
    pub live: bool,
    pub proxy: bool,
    pub rtmp_source: bool,
    /// Container hint for players (`m3u8`, `mpd`, `flv`, ...), empty to sniff.
    pub movie_type: String,
    pub headers: HashMap<String, String>,
    pub vendor_info: Option<VendorInfo>,
}

impl MovieBase {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("movie name is empty".to_string()));
        }

        if self.rtmp_source {
            if !self.live {
                return Err(Error::InvalidInput("rtmp source must be live".to_string()));
            }
            if !self.url.is_empty() || self.vendor_info.is_some() {
                return Err(Error::InvalidInput(
                    "rtmp source cannot carry a url or vendor info".to_string(),
                ));
            }
            return Ok(());
        }

        match &self.vendor_info {
            Some(vendor) => vendor.validate(),
            None => self.validate_url(),
        }
    }

    fn validate_url(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(Error::InvalidInput("movie url is empty".to_string()));
        }
        let url = url::Url::parse(&self.url)
            .map_err(|e| Error::InvalidInput(format!("invalid movie url: {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            "rtmp" if self.live && self.proxy => Ok(()),
            other => Err(Error::InvalidInput(format!("unsupported url scheme: {other}"))),
        }
    }

    /// Merge a patch into this base. Validation is left to the caller.
    pub fn apply(&mut self, patch: MoviePatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(url) = patch.url {
            self.url = url;
        }
        if let Some(live) = patch.live {
            self.live = live;
        }
        if let Some(proxy) = patch.proxy {
            self.proxy = proxy;
        }
        if let Some(rtmp_source) = patch.rtmp_source {
            self.rtmp_source = rtmp_source;
        }
        if let Some(movie_type) = patch.movie_type {
            self.movie_type = movie_type;
        }
        if let Some(headers) = patch.headers {
            self.headers = headers;
        }
        if let Some(vendor_info) = patch.vendor_info {
            self.vendor_info = vendor_info;
        }
    }
}

/// Partial update of a [`MovieBase`]. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoviePatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub live: Option<bool>,
    pub proxy: Option<bool>,
    pub rtmp_source: Option<bool>,
    pub movie_type: Option<String>,
    pub headers: Option<HashMap<String, String>>,
    /// `Some(None)` removes the vendor binding.
    pub vendor_info: Option<Option<VendorInfo>>,
}

/// Which vendor backend serves a movie and how to find it there
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorInfo {
    /// Backend instance name; empty selects the default backend.
    #[serde(default)]
    pub backend: String,
    #[serde(flatten)]
    pub kind: VendorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "vendor", rename_all = "lowercase")]
pub enum VendorKind {
    Alist {
        /// `<server_id>/<path on that server>`
        path: String,
        #[serde(default)]
        password: String,
    },
    Bilibili(BilibiliRef),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BilibiliRef {
    pub bvid: String,
    pub cid: u64,
    pub epid: u64,
    /// Serve one DASH manifest resolved with the creator's account to everyone.
    pub shared: bool,
}

impl VendorInfo {
    pub fn validate(&self) -> Result<()> {
        match &self.kind {
            VendorKind::Alist { path, .. } => {
                split_alist_path(path)?;
                Ok(())
            }
            VendorKind::Bilibili(bili) => {
                if !bili.bvid.is_empty() && !RE_BVID.is_match(&bili.bvid) {
                    return Err(Error::InvalidInput(format!("invalid bvid: {}", bili.bvid)));
                }
                if bili.epid != 0 || (!bili.bvid.is_empty() && bili.cid != 0) {
                    Ok(())
                } else {
                    Err(Error::InvalidInput(
                        "bilibili movie needs an epid, or a bvid with a cid".to_string(),
                    ))
                }
            }
        }
    }
}

/// Split an Alist movie path `<server_id>/<file path>` into its parts.
/// The returned file path is absolute.
pub fn split_alist_path(path: &str) -> Result<(&str, String)> {
    let (server_id, file_path) = path
        .split_once('/')
        .ok_or_else(|| Error::InvalidInput(format!("alist path has no server id: {path}")))?;
    if server_id.is_empty() {
        return Err(Error::InvalidInput("alist server id is empty".to_string()));
    }
    let file_path = file_path.trim_start_matches('/');
    if file_path.is_empty() {
        return Err(Error::InvalidInput("alist file path is empty".to_string()));
    }
    Ok((server_id, format!("/{file_path}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(name: &str, url: &str) -> MovieBase {
        MovieBase {
            name: name.to_string(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    fn bilibili(bvid: &str, cid: u64, epid: u64) -> VendorInfo {
        VendorInfo {
            backend: String::new(),
            kind: VendorKind::Bilibili(BilibiliRef {
                bvid: bvid.to_string(),
                cid,
                epid,
                shared: false,
            }),
        }
    }

    #[test]
    fn test_plain_url_validation() {
        assert!(base("a", "https://example.com/a.mp4").validate().is_ok());
        assert!(base("", "https://example.com/a.mp4").validate().is_err());
        assert!(base("a", "").validate().is_err());
        assert!(base("a", "ftp://example.com/a.mp4").validate().is_err());
        assert!(base("a", "not a url").validate().is_err());
    }

    #[test]
    fn test_rtmp_url_needs_live_proxy() {
        let mut b = base("live", "rtmp://example.com/live/stream");
        assert!(b.validate().is_err());
        b.live = true;
        b.proxy = true;
        assert!(b.validate().is_ok());
    }

    #[test]
    fn test_rtmp_source_rules() {
        let mut b = base("cam", "");
        b.rtmp_source = true;
        assert!(b.validate().is_err());
        b.live = true;
        assert!(b.validate().is_ok());
        b.url = "https://example.com".to_string();
        assert!(b.validate().is_err());
    }

    #[test]
    fn test_bilibili_validation() {
        let mut b = base("bili", "");
        b.vendor_info = Some(bilibili("BV1xx411c7XZ", 1, 0));
        assert!(b.validate().is_ok());
        b.vendor_info = Some(bilibili("BV1xx411c7XZ", 0, 0));
        assert!(b.validate().is_err());
        b.vendor_info = Some(bilibili("", 0, 12345));
        assert!(b.validate().is_ok());
        b.vendor_info = Some(bilibili("av170001", 1, 0));
        assert!(b.validate().is_err());
    }

    #[test]
    fn test_split_alist_path() {
        assert_eq!(
            split_alist_path("0123456789abcdef/movies/a.mp4").unwrap(),
            ("0123456789abcdef", "/movies/a.mp4".to_string())
        );
        assert!(split_alist_path("/movies/a.mp4").is_err());
        assert!(split_alist_path("server/").is_err());
        assert!(split_alist_path("server").is_err());
    }

    #[test]
    fn test_apply_patch() {
        let mut b = base("a", "https://example.com/a.mp4");
        b.apply(MoviePatch {
            name: Some("b".to_string()),
            live: Some(true),
            ..Default::default()
        });
        assert_eq!(b.name, "b");
        assert!(b.live);
        assert_eq!(b.url, "https://example.com/a.mp4");

        b.vendor_info = Some(bilibili("", 0, 1));
        b.apply(MoviePatch {
            vendor_info: Some(None),
            ..Default::default()
        });
        assert!(b.vendor_info.is_none());
    }

    #[test]
    fn test_needs_channel() {
        let mut movie = Movie::new(RoomId::new(), UserId::new(), base("a", "https://e.com/a.flv"));
        assert!(!movie.needs_channel());
        movie.base.live = true;
        assert!(!movie.needs_channel());
        movie.base.proxy = true;
        assert!(movie.needs_channel());
    }

    #[test]
    fn test_vendor_info_json_shape() {
        let info = VendorInfo {
            backend: "main".to_string(),
            kind: VendorKind::Alist {
                path: "abc/a.mp4".to_string(),
                password: String::new(),
            },
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["vendor"], "alist");
        assert_eq!(json["path"], "abc/a.mp4");
        let back: VendorInfo = serde_json::from_value(json).unwrap();
        assert_eq!(back, info);
    }
}
