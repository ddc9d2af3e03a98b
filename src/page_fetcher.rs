use crate::error::{MirrorError, Result};
use crate::http_client::{HttpClient, ACCEPT_HTML};
use crate::logging::Stage;
use tracing::info;
use url::Url;

/// The entry document as delivered by the server.
#[derive(Debug, Clone)]
pub struct PageDocument {
    pub raw_html: String,
    /// Post-redirect URL; the base for every relative reference in the run.
    pub final_url: Url,
    pub content_type: String,
}

pub async fn fetch_html(client: &HttpClient, url: &Url) -> Result<PageDocument> {
    info!(stage = %Stage::Tool, %url, "fetching page");

    let response = client
        .get(url, ACCEPT_HTML)
        .await
        .map_err(|e| MirrorError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    if !response.is_success() {
        return Err(MirrorError::Fetch {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status.as_u16()),
        });
    }

    let raw_html = response.text();
    if raw_html.trim().is_empty() {
        return Err(MirrorError::Fetch {
            url: url.to_string(),
            reason: "empty body".to_string(),
        });
    }

    if &response.final_url != url {
        info!(stage = %Stage::Observe, final_url = %response.final_url, "page redirected");
    }

    Ok(PageDocument {
        raw_html,
        final_url: response.final_url,
        content_type: response
            .content_type
            .unwrap_or_else(|| "text/html".to_string()),
    })
}
