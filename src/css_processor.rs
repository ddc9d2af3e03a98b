//! Stylesheet consolidation: `@import` inlining and `url()` normalization.
//!
//! Every stylesheet ends up with absolute `url("...")` tokens so the rewriter can
//! later swap them for local paths with plain substring replacement.

use crate::config::{EXTERNAL_IMPORT_DEPTH, INLINE_IMPORT_DEPTH};
use crate::downloader::AssetSet;
use crate::error::MirrorError;
use crate::http_client::{HttpClient, ACCEPT_CSS};
use crate::logging::Stage;
use crate::url_utils::{is_non_fetchable, resolve};
use futures::future::{join_all, BoxFuture};
use regex::Regex;
use std::collections::HashSet;
use std::ops::Range;
use std::sync::{LazyLock, Mutex};
use tracing::{debug, info, warn};
use url::Url;

static URL_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:"([^"]*)"|'([^']*)'|([^)"'\s]*))\s*\)"#).expect("url token regex")
});

static IMPORT_RULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)@import\s+(?:url\(\s*(?:"([^"]*)"|'([^']*)'|([^)"'\s]*))\s*\)|"([^"]*)"|'([^']*)')\s*([^;]*);?"#,
    )
    .expect("import rule regex")
});

static CHARSET_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)@charset\s+["'][^"']*["']\s*;"#).expect("charset regex"));

#[derive(Debug, Clone, PartialEq)]
pub enum CollectedStyle {
    External(Url),
    Inline(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StylesheetSource {
    External(Url),
    /// 1-based position among the page's `<style>` blocks.
    Inline(usize),
}

/// One stylesheet with the base its relative references resolve against.
#[derive(Debug, Clone)]
pub struct StylesheetUnit {
    pub source: StylesheetSource,
    pub css_text: String,
    pub base_url: Url,
}

impl StylesheetUnit {
    fn provenance(&self) -> String {
        match &self.source {
            StylesheetSource::External(url) => format!("/* source: {} */", comment_safe(url.as_str())),
            StylesheetSource::Inline(n) => format!("/* source: inline <style> #{} */", n),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ImportDepths {
    pub external: u32,
    pub inline: u32,
}

impl Default for ImportDepths {
    fn default() -> Self {
        Self {
            external: EXTERNAL_IMPORT_DEPTH,
            inline: INLINE_IMPORT_DEPTH,
        }
    }
}

/// Imports already inlined (or claimed) during this run.
#[derive(Debug, Default)]
pub struct VisitedImports {
    seen: Mutex<HashSet<String>>,
}

impl VisitedImports {
    pub fn insert(&self, url: &str) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.insert(url.to_string())
    }
}

#[derive(Clone, Copy)]
pub struct CssContext<'a> {
    pub client: &'a HttpClient,
    pub visited: &'a VisitedImports,
}

#[derive(Debug, Default)]
pub struct ConsolidatedCss {
    pub css: String,
    pub assets: AssetSet,
    pub stylesheets_ok: usize,
    pub stylesheets_failed: usize,
}

struct ImportRule {
    span: Range<usize>,
    target: String,
    media: String,
}

fn find_import_rules(css: &str) -> Vec<ImportRule> {
    IMPORT_RULE
        .captures_iter(css)
        .filter_map(|caps| {
            let span = caps.get(0)?.range();
            let target = (1..=5).find_map(|i| caps.get(i))?.as_str().trim().to_string();
            let media = caps.get(6).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
            Some(ImportRule { span, target, media })
        })
        .collect()
}

fn comment_safe(text: &str) -> String {
    text.replace("*/", "*\\/")
}

fn strip_fragment(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

/// Calls `map` with every `url()` reference outside `@import` rules; tokens for
/// which it returns `Some` become `url("<value>")`, the rest stay as written.
pub fn map_url_tokens<F>(css: &str, mut map: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let import_spans: Vec<Range<usize>> = IMPORT_RULE.find_iter(css).map(|m| m.range()).collect();
    let mut out = String::with_capacity(css.len());
    let mut last = 0;

    for caps in URL_TOKEN.captures_iter(css) {
        let Some(whole) = caps.get(0) else { continue };
        if import_spans.iter().any(|span| span.contains(&whole.start())) {
            continue;
        }
        let reference = (1..=3)
            .find_map(|i| caps.get(i))
            .map(|m| m.as_str().trim())
            .unwrap_or_default();

        if let Some(replacement) = map(reference) {
            out.push_str(&css[last..whole.start()]);
            out.push_str(&format!("url(\"{}\")", replacement));
            last = whole.end();
        }
    }

    out.push_str(&css[last..]);
    out
}

pub fn url_references(css: &str) -> Vec<String> {
    let mut refs = Vec::new();
    map_url_tokens(css, |reference| {
        refs.push(reference.to_string());
        None
    });
    refs
}

/// Rewrites every `@import` target to the canonical `@import url("<absolute>")` form.
fn absolutize_imports(css: &str, base: &Url) -> String {
    let mut out = String::with_capacity(css.len());
    let mut last = 0;

    for rule in find_import_rules(css) {
        let Some(target) = resolve(base, &rule.target) else { continue };
        out.push_str(&css[last..rule.span.start]);
        if rule.media.is_empty() {
            out.push_str(&format!("@import url(\"{}\");", target));
        } else {
            out.push_str(&format!("@import url(\"{}\") {};", target, rule.media));
        }
        last = rule.span.end;
    }

    out.push_str(&css[last..]);
    out
}

/// Resolves every fetchable `url()` against `base`, replaces it with the
/// absolute form and records it in `assets`.
pub fn rewrite_urls_to_absolute(css: &str, base: &Url, assets: &mut AssetSet) -> String {
    let css = absolutize_imports(css, base);
    map_url_tokens(&css, |reference| {
        if is_non_fetchable(reference) {
            return None;
        }
        let absolute = resolve(base, reference)?;
        assets.insert(strip_fragment(&absolute));
        Some(absolute.to_string())
    })
}

async fn fetch_stylesheet(client: &HttpClient, url: &Url) -> Result<(String, Url), String> {
    let response = client
        .get(url, ACCEPT_CSS)
        .await
        .map_err(|e| e.to_string())?;
    if !response.is_success() {
        return Err(format!("HTTP {}", response.status.as_u16()));
    }
    let text = response.text();
    let text = text.trim_start_matches('\u{feff}');
    Ok((CHARSET_RULE.replace_all(text, "").into_owned(), response.final_url))
}

/// Replaces `@import` rules with the bodies they point at, `depth` levels deep.
pub fn inline_imports<'a>(
    css: &'a str,
    base: &'a Url,
    depth: u32,
    ctx: CssContext<'a>,
    assets: &'a mut AssetSet,
) -> BoxFuture<'a, String> {
    Box::pin(async move {
        if depth == 0 {
            return css.to_string();
        }

        let rules = find_import_rules(css);
        let mut out = String::with_capacity(css.len());
        let mut last = 0;

        for rule in rules {
            let Some(target) = resolve(base, &rule.target) else { continue };
            out.push_str(&css[last..rule.span.start]);
            last = rule.span.end;

            let body = resolve_import(&target, &rule.media, depth, ctx, &mut *assets).await;
            out.push_str(&body);
        }

        out.push_str(&css[last..]);
        out
    })
}

async fn resolve_import(
    target: &Url,
    media: &str,
    depth: u32,
    ctx: CssContext<'_>,
    assets: &mut AssetSet,
) -> String {
    let key = strip_fragment(target);
    if !ctx.visited.insert(&key) {
        debug!(url = %key, "import already visited");
        return format!("/* import skipped (visited): {} */", comment_safe(&key));
    }

    debug!(stage = %Stage::Tool, url = %key, depth, "inlining import");
    let (body, final_url) = match fetch_stylesheet(ctx.client, target).await {
        Ok(fetched) => fetched,
        Err(reason) => {
            let err = MirrorError::ImportResolution {
                url: key.clone(),
                reason: reason.clone(),
            };
            warn!(stage = %Stage::Observe, "{}", err);
            return format!(
                "/* import failed: {} ({}) */",
                comment_safe(&key),
                comment_safe(&reason)
            );
        }
    };
    ctx.visited.insert(&strip_fragment(&final_url));

    let absolute = rewrite_urls_to_absolute(&body, &final_url, assets);
    let inlined = inline_imports(&absolute, &final_url, depth - 1, ctx, assets).await;

    let safe = comment_safe(&key);
    if media.is_empty() {
        format!("/* import: {} */\n{}\n/* end import: {} */", safe, inlined.trim(), safe)
    } else {
        format!(
            "/* import: {} */\n@media {} {{\n{}\n}}\n/* end import: {} */",
            safe,
            media,
            inlined.trim(),
            safe
        )
    }
}

async fn process_unit(unit: StylesheetUnit, depth: u32, ctx: CssContext<'_>) -> (String, AssetSet) {
    let mut assets = AssetSet::default();
    let absolute = rewrite_urls_to_absolute(&unit.css_text, &unit.base_url, &mut assets);
    let inlined = inline_imports(&absolute, &unit.base_url, depth, ctx, &mut assets).await;
    let block = format!("{}\n{}\n", unit.provenance(), inlined.trim());
    (block, assets)
}

enum LoadedStyle {
    Unit { unit: StylesheetUnit, depth: u32 },
    Failed { url: Url, reason: String },
}

async fn load_collected(
    style: &CollectedStyle,
    inline_index: usize,
    page_base: &Url,
    depths: ImportDepths,
    client: &HttpClient,
) -> LoadedStyle {
    match style {
        CollectedStyle::External(url) => {
            info!(stage = %Stage::Tool, %url, "fetching stylesheet");
            match fetch_stylesheet(client, url).await {
                Ok((css_text, final_url)) => LoadedStyle::Unit {
                    unit: StylesheetUnit {
                        source: StylesheetSource::External(url.clone()),
                        css_text,
                        base_url: final_url,
                    },
                    depth: depths.external,
                },
                Err(reason) => {
                    let err = MirrorError::StylesheetFetch {
                        url: url.to_string(),
                        reason: reason.clone(),
                    };
                    warn!(stage = %Stage::Observe, "{}", err);
                    LoadedStyle::Failed {
                        url: url.clone(),
                        reason,
                    }
                }
            }
        }
        CollectedStyle::Inline(css_text) => LoadedStyle::Unit {
            unit: StylesheetUnit {
                source: StylesheetSource::Inline(inline_index),
                css_text: css_text.clone(),
                base_url: page_base.clone(),
            },
            depth: depths.inline,
        },
    }
}

/// Top-level sheets are fetched concurrently; `@import` targets are then
/// claimed and inlined one unit at a time in discovery order, so the first
/// sheet in the document always owns a shared import.
pub async fn process_stylesheets(
    client: &HttpClient,
    page_base: &Url,
    styles: &[CollectedStyle],
    depths: ImportDepths,
) -> ConsolidatedCss {
    let visited = VisitedImports::default();
    for style in styles {
        if let CollectedStyle::External(url) = style {
            visited.insert(&strip_fragment(url));
        }
    }
    let ctx = CssContext {
        client,
        visited: &visited,
    };

    let mut inline_count = 0;
    let loads: Vec<_> = styles
        .iter()
        .map(|style| {
            if matches!(style, CollectedStyle::Inline(_)) {
                inline_count += 1;
            }
            load_collected(style, inline_count, page_base, depths, client)
        })
        .collect();
    let loaded = join_all(loads).await;

    let mut consolidated = ConsolidatedCss::default();
    for item in loaded {
        match item {
            LoadedStyle::Unit { unit, depth } => {
                let (block, assets) = process_unit(unit, depth, ctx).await;
                consolidated.css.push_str(&block);
                consolidated.assets.extend(assets);
                consolidated.stylesheets_ok += 1;
            }
            LoadedStyle::Failed { url, reason } => {
                consolidated.css.push_str(&format!(
                    "/* failed to fetch stylesheet {}: {} */\n",
                    comment_safe(url.as_str()),
                    comment_safe(&reason)
                ));
                consolidated.stylesheets_failed += 1;
            }
        }
        consolidated.css.push('\n');
    }

    info!(
        stage = %Stage::Observe,
        stylesheets = styles.len(),
        failed = consolidated.stylesheets_failed,
        assets = consolidated.assets.len(),
        "stylesheets consolidated"
    );
    consolidated
}
