use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
pub const DEFAULT_TIMEOUT_MS: u64 = 20_000;
pub const DEFAULT_MAX_REDIRECTS: usize = 5;
pub const DEFAULT_CONCURRENCY: usize = 8;

/// `@import` inlining depth for stylesheets linked with `<link>`.
pub const EXTERNAL_IMPORT_DEPTH: u32 = 2;
/// `@import` inlining depth for inline `<style>` blocks.
pub const INLINE_IMPORT_DEPTH: u32 = 1;

/// Fully resolved settings for one mirroring run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    pub url: String,
    /// Explicit output directory; derived from the hostname when absent.
    pub outdir: Option<PathBuf>,
    /// Parent of the hostname-derived directory.
    pub output_root: PathBuf,
    pub user_agent: String,
    pub timeout_ms: u64,
    pub max_redirects: usize,
    pub concurrency: usize,
    pub external_import_depth: u32,
    pub inline_import_depth: u32,
    pub verbose: bool,
    pub show_progress: bool,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            outdir: None,
            output_root: PathBuf::from("."),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            concurrency: DEFAULT_CONCURRENCY,
            external_import_depth: EXTERNAL_IMPORT_DEPTH,
            inline_import_depth: INLINE_IMPORT_DEPTH,
            verbose: false,
            show_progress: false,
        }
    }
}

impl MirrorConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Worker count actually used; zero is treated as one.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}
