use crate::error::MirrorError;
use crate::http_client::{HttpClient, ACCEPT_ANY};
use crate::logging::Stage;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone, Default)]
pub struct AssetSet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl AssetSet {
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.seen.contains(&url) {
            return false;
        }
        self.seen.insert(url.clone());
        self.order.push(url);
        true
    }

    pub fn extend(&mut self, other: AssetSet) {
        for url in other.order {
            self.insert(url);
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.order.clone()
    }
}

impl FromIterator<String> for AssetSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut set = AssetSet::default();
        for url in iter {
            set.insert(url);
        }
        set
    }
}

#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub requested_url: String,
    pub final_url: Option<String>,
    pub content_type: Option<String>,
    pub result: Result<Vec<u8>, String>,
}

impl DownloadOutcome {
    fn failure(requested_url: &str, final_url: Option<String>, message: String) -> Self {
        Self {
            requested_url: requested_url.to_string(),
            final_url,
            content_type: None,
            result: Err(message),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        self.result.as_deref().ok()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.result.as_ref().err().map(String::as_str)
    }
}

pub fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar().template("{spinner} [{bar:30}] {pos}/{len} {msg}") {
        bar.set_style(style);
    }
    bar
}

async fn download_one(client: &HttpClient, requested: &str) -> DownloadOutcome {
    let url = match Url::parse(requested) {
        Ok(url) => url,
        Err(e) => return DownloadOutcome::failure(requested, None, e.to_string()),
    };

    debug!(stage = %Stage::Tool, %url, "downloading asset");
    let outcome = match client.get(&url, ACCEPT_ANY).await {
        Err(e) => DownloadOutcome::failure(requested, None, e.to_string()),
        Ok(response) if !response.is_success() => DownloadOutcome::failure(
            requested,
            Some(response.final_url.to_string()),
            format!("HTTP {}", response.status.as_u16()),
        ),
        Ok(response) => DownloadOutcome {
            requested_url: requested.to_string(),
            final_url: Some(response.final_url.to_string()),
            content_type: response.content_type,
            result: Ok(response.body),
        },
    };

    if let Some(message) = outcome.error_message() {
        let err = MirrorError::AssetDownload {
            url: requested.to_string(),
            reason: message.to_string(),
        };
        warn!(stage = %Stage::Observe, "{}", err);
    }
    outcome
}

/// Outcomes come back in input order no matter which request finished first.
pub async fn download_all(
    client: &HttpClient,
    urls: &[String],
    limit: usize,
    progress: &ProgressBar,
) -> Vec<DownloadOutcome> {
    if urls.is_empty() {
        return Vec::new();
    }

    let workers = limit.max(1).min(urls.len());
    info!(stage = %Stage::Tool, assets = urls.len(), workers, "downloading assets");

    let cursor = AtomicUsize::new(0);
    let cursor = &cursor;
    let batches = join_all((0..workers).map(move |_| async move {
        let mut done = Vec::new();
        loop {
            let index = cursor.fetch_add(1, Ordering::SeqCst);
            let Some(url) = urls.get(index) else { break };
            let outcome = download_one(client, url).await;
            progress.inc(1);
            done.push((index, outcome));
        }
        done
    }))
    .await;

    let mut slots: Vec<Option<DownloadOutcome>> = (0..urls.len()).map(|_| None).collect();
    for (index, outcome) in batches.into_iter().flatten() {
        slots[index] = Some(outcome);
    }
    let outcomes: Vec<DownloadOutcome> = slots.into_iter().flatten().collect();

    let ok = outcomes.iter().filter(|o| o.is_success()).count();
    info!(
        stage = %Stage::Observe,
        ok,
        failed = outcomes.len() - ok,
        "asset downloads finished"
    );
    outcomes
}
