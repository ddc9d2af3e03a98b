use crate::config::MirrorConfig;
use crate::css_processor::{process_stylesheets, ImportDepths};
use crate::downloader::{download_all, progress_bar, AssetSet, DownloadOutcome};
use crate::error::Result;
use crate::file_manager::FileManager;
use crate::html_parser::HtmlParser;
use crate::http_client::{HttpClient, HttpConfig};
use crate::logging::Stage;
use crate::page_fetcher::fetch_html;
use crate::path_classifier::LocalPathMap;
use crate::rewriter::{rewrite_css, rewrite_html, STYLESHEET_HREF};
use crate::url_utils::{host_root, normalize_url};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct AssetFailure {
    pub url: String,
    pub error: String,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct MirrorReport {
    pub output_dir: PathBuf,
    pub final_url: String,
    pub content_type: String,
    pub stylesheets_ok: usize,
    pub stylesheets_failed: usize,
    pub assets_total: usize,
    pub assets_ok: usize,
    pub assets_failed: usize,
    pub failures: Vec<AssetFailure>,
}

pub struct WebsiteMirror {
    config: MirrorConfig,
}

impl WebsiteMirror {
    pub fn new(config: MirrorConfig) -> Self {
        Self { config }
    }

    /// Fetch, consolidate, download, rewrite, write. Only the entry page fetch
    /// and file writes can fail the run.
    pub async fn run(&self) -> Result<MirrorReport> {
        let url = normalize_url(&self.config.url)?;
        info!(stage = %Stage::Start, %url, concurrency = self.config.effective_concurrency(), "mirroring page");

        let http_config = HttpConfig::from_mirror_config(&self.config);
        let client = HttpClient::new(http_config)?;
        let page = fetch_html(&client, &url).await?;
        let base_url = page.final_url.clone();

        info!(stage = %Stage::Think, base = %base_url, content_type = %page.content_type, "scanning document");
        let parser = HtmlParser::from_url(base_url.clone());
        let styles = parser.collect_styles(&page.raw_html);
        let html_assets = parser.discover_assets(&page.raw_html);
        info!(
            stage = %Stage::Think,
            stylesheets = styles.len(),
            html_assets = html_assets.len(),
            "document scanned"
        );

        // Asset hosts see the page as referer from here on.
        let asset_client = client.with_referer(base_url.clone())?;
        let depths = ImportDepths {
            external: self.config.external_import_depth,
            inline: self.config.inline_import_depth,
        };
        let consolidated = process_stylesheets(&asset_client, &base_url, &styles, depths).await;

        let mut assets = AssetSet::default();
        assets.extend(html_assets);
        assets.extend(consolidated.assets.clone());
        let urls = assets.to_vec();

        let progress = progress_bar(urls.len(), self.config.show_progress);
        let outcomes = download_all(
            &asset_client,
            &urls,
            self.config.effective_concurrency(),
            &progress,
        )
        .await;
        progress.finish_and_clear();

        // Both rewrite passes read the finished map.
        let path_map = LocalPathMap::from_outcomes(&outcomes);
        let css = rewrite_css(&consolidated.css, &path_map);
        let html = rewrite_html(&page.raw_html, &base_url, &path_map);

        let files = self.create_output_dir(&url)?;
        info!(stage = %Stage::Output, dir = ?files.base_dir(), "writing output");
        files.save_file("index.html", html.as_bytes())?;
        files.save_file(STYLESHEET_HREF, css.as_bytes())?;
        let written = write_assets(&files, &outcomes, &path_map)?;

        let failures: Vec<AssetFailure> = outcomes
            .iter()
            .filter_map(|o| {
                o.error_message().map(|error| AssetFailure {
                    url: o.requested_url.clone(),
                    error: error.to_string(),
                })
            })
            .collect();

        let report = MirrorReport {
            output_dir: files.base_dir().to_path_buf(),
            final_url: base_url.to_string(),
            content_type: page.content_type.clone(),
            stylesheets_ok: consolidated.stylesheets_ok,
            stylesheets_failed: consolidated.stylesheets_failed,
            assets_total: outcomes.len(),
            assets_ok: written,
            assets_failed: failures.len(),
            failures,
        };
        info!(
            stage = %Stage::Output,
            assets_ok = report.assets_ok,
            assets_failed = report.assets_failed,
            "mirror complete"
        );
        Ok(report)
    }

    fn create_output_dir(&self, url: &url::Url) -> Result<FileManager> {
        match &self.config.outdir {
            Some(target) => FileManager::create_for_target(target),
            None => FileManager::create_unique(&self.config.output_root, &host_root(url)),
        }
    }
}

fn write_assets(
    files: &FileManager,
    outcomes: &[DownloadOutcome],
    path_map: &LocalPathMap,
) -> Result<usize> {
    let mut written = 0;
    for outcome in outcomes {
        let Some(bytes) = outcome.bytes() else { continue };
        match path_map.get(&outcome.requested_url) {
            Some(path) => {
                files.save_file(path, bytes)?;
                written += 1;
            }
            None => warn!(url = %outcome.requested_url, "downloaded asset has no local path"),
        }
    }
    Ok(written)
}
