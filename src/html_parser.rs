use crate::css_processor::{url_references, CollectedStyle};
use crate::downloader::AssetSet;
use crate::error::{MirrorError, Result};
use crate::url_utils::{resolve, resolve_asset};
use select::document::Document;
use select::node::Node;
use select::predicate::Any;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttrKind {
    Single,
    Srcset,
    InlineStyle,
}

#[derive(Debug, Clone, Copy)]
pub enum Scope {
    Tags(&'static [&'static str]),
    /// `<link>` elements with one of these `rel` tokens.
    LinkRel(&'static [&'static str]),
    AnyElement,
}

impl Scope {
    pub fn matches(&self, tag: &str, rel: Option<&str>) -> bool {
        match self {
            Scope::Tags(tags) => tags.iter().any(|t| t.eq_ignore_ascii_case(tag)),
            Scope::LinkRel(rels) => {
                tag.eq_ignore_ascii_case("link")
                    && rel.map_or(false, |rel| has_rel_token(rel, rels))
            }
            Scope::AnyElement => true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AttrRule {
    pub scope: Scope,
    pub attr: &'static str,
    pub kind: AttrKind,
}

const MEDIA_TAGS: &[&str] = &["img", "script", "source", "video", "audio", "track", "embed", "input"];
const ICON_RELS: &[&str] = &[
    "icon",
    "apple-touch-icon",
    "apple-touch-icon-precomposed",
    "mask-icon",
    "manifest",
];

/// Every element/attribute pair that can point at an asset.
pub const ATTR_RULES: &[AttrRule] = &[
    AttrRule { scope: Scope::Tags(MEDIA_TAGS), attr: "src", kind: AttrKind::Single },
    AttrRule { scope: Scope::Tags(&["video"]), attr: "poster", kind: AttrKind::Single },
    AttrRule { scope: Scope::Tags(&["object"]), attr: "data", kind: AttrKind::Single },
    AttrRule { scope: Scope::LinkRel(ICON_RELS), attr: "href", kind: AttrKind::Single },
    AttrRule { scope: Scope::Tags(&["img", "source"]), attr: "srcset", kind: AttrKind::Srcset },
    AttrRule { scope: Scope::AnyElement, attr: "data-srcset", kind: AttrKind::Srcset },
    AttrRule { scope: Scope::AnyElement, attr: "data-src", kind: AttrKind::Single },
    AttrRule { scope: Scope::AnyElement, attr: "data-original", kind: AttrKind::Single },
    AttrRule { scope: Scope::AnyElement, attr: "data-lazy", kind: AttrKind::Single },
    AttrRule { scope: Scope::AnyElement, attr: "style", kind: AttrKind::InlineStyle },
];

pub fn has_rel_token(rel: &str, wanted: &[&str]) -> bool {
    rel.split_ascii_whitespace()
        .any(|token| wanted.iter().any(|w| w.eq_ignore_ascii_case(token)))
}

pub fn is_stylesheet_link(rel: Option<&str>, as_attr: Option<&str>) -> bool {
    let Some(rel) = rel else { return false };
    has_rel_token(rel, &["stylesheet"])
        || (has_rel_token(rel, &["preload"])
            && as_attr.map_or(false, |a| a.trim().eq_ignore_ascii_case("style")))
}

pub fn parse_srcset(srcset: &str) -> Vec<&str> {
    srcset
        .split(',')
        .filter_map(|candidate| candidate.split_whitespace().next())
        .filter(|url| !url.is_empty())
        .collect()
}

pub fn attr_references(kind: AttrKind, value: &str) -> Vec<String> {
    match kind {
        AttrKind::Single => {
            let value = value.trim();
            if value.is_empty() {
                Vec::new()
            } else {
                vec![value.to_string()]
            }
        }
        AttrKind::Srcset => parse_srcset(value).into_iter().map(str::to_string).collect(),
        AttrKind::InlineStyle => url_references(value),
    }
}

#[derive(Clone)]
pub struct HtmlParser {
    base_url: Url,
}

impl HtmlParser {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| MirrorError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        Ok(Self { base_url })
    }

    pub fn from_url(base_url: Url) -> Self {
        Self { base_url }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn collect_styles(&self, html_content: &str) -> Vec<CollectedStyle> {
        let document = Document::from(html_content);
        let mut styles = Vec::new();
        let mut seen_external = AssetSet::default();

        for node in document.find(Any) {
            match node.name() {
                Some("link") => {
                    if !is_stylesheet_link(node.attr("rel"), node.attr("as")) {
                        continue;
                    }
                    let Some(href) = node.attr("href") else { continue };
                    if let Some(url) = resolve(&self.base_url, href) {
                        if seen_external.insert(url.to_string()) {
                            styles.push(CollectedStyle::External(url));
                        }
                    }
                }
                Some("style") => {
                    let css = node.text();
                    if !css.trim().is_empty() {
                        styles.push(CollectedStyle::Inline(css));
                    }
                }
                _ => {}
            }
        }

        styles
    }

    pub fn discover_assets(&self, html_content: &str) -> AssetSet {
        let document = Document::from(html_content);
        let mut assets = AssetSet::default();
        self.discover_in(&document, &mut assets);
        assets
    }

    fn discover_in(&self, document: &Document, assets: &mut AssetSet) {
        for node in document.find(Any) {
            let Some(tag) = node.name() else { continue };
            if tag == "noscript" {
                self.discover_in_noscript(&node, assets);
                continue;
            }
            for rule in ATTR_RULES {
                if !rule.scope.matches(tag, node.attr("rel")) {
                    continue;
                }
                let Some(value) = node.attr(rule.attr) else { continue };
                for reference in attr_references(rule.kind, value) {
                    // One bad value must not stop the rest of the scan.
                    if let Some(url) = resolve_asset(&self.base_url, &reference) {
                        assets.insert(url);
                    }
                }
            }
        }
    }

    // noscript content is raw text in a scripted parse
    fn discover_in_noscript(&self, node: &Node, assets: &mut AssetSet) {
        let markup = node.text();
        if markup.trim().is_empty() {
            return;
        }
        let fragment = Document::from(markup.as_str());
        self.discover_in(&fragment, assets);
    }
}
