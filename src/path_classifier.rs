use crate::downloader::DownloadOutcome;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use url::Url;

const MAX_BASENAME_LEN: usize = 64;
const MAX_EXTENSION_LEN: usize = 8;

const JS_EXTENSIONS: &[&str] = &["js", "mjs", "cjs"];
const FONT_EXTENSIONS: &[&str] = &["woff", "woff2", "ttf", "otf", "eot"];
const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "svg", "ico", "bmp", "avif", "apng", "tif", "tiff",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetFolder {
    Js,
    Fonts,
    Img,
    Other,
}

impl AssetFolder {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetFolder::Js => "js",
            AssetFolder::Fonts => "fonts",
            AssetFolder::Img => "img",
            AssetFolder::Other => "other",
        }
    }
}

impl fmt::Display for AssetFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn essence(content_type: &str) -> String {
    content_type
        .parse::<mime::Mime>()
        .map(|m| m.essence_str().to_ascii_lowercase())
        .unwrap_or_else(|_| {
            content_type
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
}

fn is_javascript_type(essence: &str) -> bool {
    essence.contains("javascript") || essence.contains("ecmascript")
}

fn is_font_type(essence: &str) -> bool {
    essence.starts_with("font/") || essence.contains("font") || essence == "application/vnd.ms-fontobject"
}

fn is_image_type(essence: &str) -> bool {
    essence.starts_with("image/")
}

/// Extension of the last path segment, if it looks like one.
fn url_extension(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let (stem, ext) = segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > MAX_EXTENSION_LEN {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub fn classify(url: &Url, content_type: &str) -> AssetFolder {
    let ext = url_extension(url);
    let ext = ext.as_deref().unwrap_or_default();
    let essence = essence(content_type);

    if JS_EXTENSIONS.contains(&ext) || is_javascript_type(&essence) {
        AssetFolder::Js
    } else if FONT_EXTENSIONS.contains(&ext) || is_font_type(&essence) {
        AssetFolder::Fonts
    } else if IMAGE_EXTENSIONS.contains(&ext) || is_image_type(&essence) {
        AssetFolder::Img
    } else {
        AssetFolder::Other
    }
}

fn extension_for_type(essence: &str) -> Option<String> {
    let preferred = match essence {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/svg+xml" => Some("svg"),
        "image/x-icon" | "image/vnd.microsoft.icon" => Some("ico"),
        "image/avif" => Some("avif"),
        "font/woff" | "application/font-woff" => Some("woff"),
        "font/woff2" | "application/font-woff2" => Some("woff2"),
        "font/ttf" | "application/x-font-ttf" => Some("ttf"),
        "font/otf" | "application/x-font-otf" => Some("otf"),
        "application/vnd.ms-fontobject" => Some("eot"),
        "text/javascript" | "application/javascript" | "application/x-javascript" => Some("js"),
        "text/css" => Some("css"),
        "application/json" | "application/manifest+json" => Some("json"),
        _ => None,
    };
    if let Some(ext) = preferred {
        return Some(ext.to_string());
    }

    mime_guess::get_mime_extensions_str(essence)
        .and_then(|exts| exts.first())
        .map(|ext| ext.to_string())
}

fn fallback_extension(essence: &str) -> &'static str {
    if is_image_type(essence) {
        "img"
    } else if is_javascript_type(essence) {
        "js"
    } else if is_font_type(essence) {
        "woff"
    } else {
        "bin"
    }
}

fn sanitize_basename(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .unwrap_or_default();
    let stem = match segment.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => segment,
    };

    let cleaned: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .take(MAX_BASENAME_LEN)
        .collect();
    let cleaned = cleaned.trim_matches('.');

    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.to_string()
    }
}

/// First 8 hex characters of the SHA-256 of the full URL.
pub fn short_hash(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..8].to_string()
}

/// `assets/<folder>/<base>-<hash>.<ext>`, derived only from its inputs.
pub fn build_local_path(url: &Url, content_type: &str) -> String {
    let essence = essence(content_type);
    let folder = classify(url, content_type);
    let base = sanitize_basename(url);
    let hash = short_hash(url.as_str());
    let ext = url_extension(url)
        .or_else(|| extension_for_type(&essence))
        .unwrap_or_else(|| fallback_extension(&essence).to_string());

    format!("assets/{}/{}-{}.{}", folder, base, hash, ext)
}

/// Absolute URL to local relative path, for successful downloads only.
///
/// Both the requested and the post-redirect URL point at the same path.
#[derive(Debug, Clone, Default)]
pub struct LocalPathMap {
    paths: HashMap<String, String>,
}

impl LocalPathMap {
    pub fn from_outcomes(outcomes: &[DownloadOutcome]) -> Self {
        let mut map = LocalPathMap::default();
        for outcome in outcomes.iter().filter(|o| o.is_success()) {
            let Ok(url) = Url::parse(&outcome.requested_url) else { continue };
            let path = build_local_path(&url, outcome.content_type.as_deref().unwrap_or_default());
            map.paths.insert(outcome.requested_url.clone(), path.clone());
            if let Some(final_url) = &outcome.final_url {
                map.paths.entry(final_url.clone()).or_insert(path);
            }
        }
        map
    }

    pub fn insert(&mut self, url: impl Into<String>, path: impl Into<String>) {
        self.paths.insert(url.into(), path.into());
    }

    pub fn get(&self, url: &str) -> Option<&str> {
        self.paths.get(url).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn entries_longest_first(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<(&str, &str)> = self
            .paths
            .iter()
            .map(|(url, path)| (url.as_str(), path.as_str()))
            .collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));
        entries
    }
}
