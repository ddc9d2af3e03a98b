//! Swaps absolute asset URLs for local paths in the consolidated CSS and the page.

use crate::css_processor::map_url_tokens;
use crate::html_parser::{is_stylesheet_link, AttrKind, ATTR_RULES};
use crate::path_classifier::LocalPathMap;
use crate::url_utils::resolve;
use html5ever::serialize::{serialize, SerializeOpts};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::interface::{Attribute, ElementFlags, NodeOrText, QualName, TreeSink};
use html5ever::{namespace_url, ns, parse_document, parse_fragment, LocalName};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use std::cell::RefCell;
use tracing::warn;
use url::Url;

pub const STYLESHEET_HREF: &str = "style.css";

/// Replaces every quoted absolute URL in `css` with its local path.
///
/// `url()` tokens were normalized to `url("<absolute>")` beforehand, so exact
/// substring replacement is enough. Longer URLs go first so a URL that is a
/// prefix of another never clobbers it.
pub fn rewrite_css(css: &str, map: &LocalPathMap) -> String {
    let mut out = css.to_string();
    for (url, path) in map.entries_longest_first() {
        if !out.contains(url) {
            continue;
        }
        out = out
            .replace(&format!("\"{}\"", url), &format!("\"{}\"", path))
            .replace(&format!("\"{}#", url), &format!("\"{}#", path));
    }
    out
}

fn html_name(local: &str) -> QualName {
    QualName::new(None, ns!(html), LocalName::from(local))
}

fn attribute(name: &str, value: &str) -> Attribute {
    Attribute {
        name: QualName::new(None, ns!(), LocalName::from(name)),
        value: StrTendril::from_slice(value),
    }
}

fn attr_value(attrs: &RefCell<Vec<Attribute>>, name: &str) -> Option<String> {
    attrs
        .borrow()
        .iter()
        .find(|a| &*a.name.local == name)
        .map(|a| a.value.to_string())
}

fn find_element(node: &Handle, tag: &str) -> Option<Handle> {
    if let NodeData::Element { name, .. } = &node.data {
        if &*name.local == tag {
            return Some(node.clone());
        }
    }
    node.children
        .borrow()
        .iter()
        .find_map(|child| find_element(child, tag))
}

fn serialize_children(node: &Handle) -> String {
    let mut buf: Vec<u8> = Vec::new();
    if let Err(e) = serialize(&mut buf, &SerializableHandle::from(node.clone()), SerializeOpts::default()) {
        warn!("failed to serialize document: {}", e);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Rewrites asset references in a page against a complete URL map.
pub struct HtmlRewriter<'a> {
    base_url: &'a Url,
    map: &'a LocalPathMap,
}

impl<'a> HtmlRewriter<'a> {
    pub fn new(base_url: &'a Url, map: &'a LocalPathMap) -> Self {
        Self { base_url, map }
    }

    /// Local path for a raw reference, keeping any `#fragment`.
    fn local_for(&self, reference: &str) -> Option<String> {
        let absolute = resolve(self.base_url, reference)?;
        let fragment = absolute.fragment().map(str::to_string);
        let mut key = absolute;
        key.set_fragment(None);
        let path = self.map.get(key.as_str())?;
        Some(match fragment {
            Some(fragment) => format!("{}#{}", path, fragment),
            None => path.to_string(),
        })
    }

    fn rewrite_srcset(&self, value: &str) -> Option<String> {
        let mut changed = false;
        let candidates: Vec<String> = value
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|candidate| {
                let mut parts = candidate.splitn(2, char::is_whitespace);
                let url = parts.next().unwrap_or_default();
                let descriptor = parts.next().map(str::trim).unwrap_or_default();
                let url = match self.local_for(url) {
                    Some(local) => {
                        changed = true;
                        local
                    }
                    None => url.to_string(),
                };
                if descriptor.is_empty() {
                    url
                } else {
                    format!("{} {}", url, descriptor)
                }
            })
            .collect();

        changed.then(|| candidates.join(", "))
    }

    /// New attribute value, or `None` when nothing maps to a local file.
    pub fn rewrite_value(&self, kind: AttrKind, value: &str) -> Option<String> {
        match kind {
            AttrKind::Single => self.local_for(value),
            AttrKind::Srcset => self.rewrite_srcset(value),
            AttrKind::InlineStyle => {
                let mut changed = false;
                let css = map_url_tokens(value, |reference| {
                    let local = self.local_for(reference)?;
                    changed = true;
                    Some(local)
                });
                changed.then_some(css)
            }
        }
    }

    fn rewrite_attrs(&self, tag: &str, attrs: &RefCell<Vec<Attribute>>) {
        let rel = attr_value(attrs, "rel");
        let mut attrs = attrs.borrow_mut();
        for attr in attrs.iter_mut() {
            let name = attr.name.local.to_string();
            let rules = ATTR_RULES
                .iter()
                .filter(|rule| rule.attr == name && rule.scope.matches(tag, rel.as_deref()));
            for rule in rules {
                if let Some(new_value) = self.rewrite_value(rule.kind, &attr.value) {
                    attr.value = StrTendril::from(new_value);
                }
            }
        }
    }

    /// Walks the tree; with `strip_styles`, collects stylesheet and `<base>` nodes for removal.
    fn walk(&self, node: &Handle, strip_styles: bool, removals: &mut Vec<Handle>) {
        if let NodeData::Element { name, attrs, .. } = &node.data {
            let tag = name.local.to_string();
            if strip_styles {
                let is_style = match tag.as_str() {
                    "style" | "base" => true,
                    "link" => is_stylesheet_link(
                        attr_value(attrs, "rel").as_deref(),
                        attr_value(attrs, "as").as_deref(),
                    ),
                    _ => false,
                };
                if is_style {
                    removals.push(node.clone());
                    return;
                }
            }
            if tag == "noscript" {
                self.rewrite_noscript(node);
            }
            self.rewrite_attrs(&tag, attrs);
        }

        for child in node.children.borrow().iter() {
            self.walk(child, strip_styles, removals);
        }
    }

    /// `<noscript>` holds markup as text; rewrite it as a separate fragment.
    fn rewrite_noscript(&self, node: &Handle) {
        for child in node.children.borrow().iter() {
            if let NodeData::Text { contents } = &child.data {
                let markup = contents.borrow().to_string();
                if markup.trim().is_empty() {
                    continue;
                }
                let rewritten = self.rewrite_fragment(&markup);
                *contents.borrow_mut() = StrTendril::from(rewritten);
            }
        }
    }

    pub fn rewrite_fragment(&self, markup: &str) -> String {
        let dom = parse_fragment(RcDom::default(), Default::default(), html_name("body"), vec![])
            .one(markup);
        let mut removals = Vec::new();
        self.walk(&dom.document, false, &mut removals);

        let root = dom.document.children.borrow().first().cloned();
        match root {
            Some(root) => serialize_children(&root),
            None => markup.to_string(),
        }
    }

    /// Rewrites the page and leaves a single `<link>` to `style.css`.
    pub fn rewrite_document(&self, html: &str) -> String {
        let mut dom = parse_document(RcDom::default(), Default::default()).one(html);

        let mut removals = Vec::new();
        self.walk(&dom.document, true, &mut removals);
        for node in &removals {
            dom.remove_from_parent(node);
        }

        if let Some(head) = find_element(&dom.document, "head") {
            let link = dom.create_element(
                html_name("link"),
                vec![attribute("rel", "stylesheet"), attribute("href", STYLESHEET_HREF)],
                ElementFlags::default(),
            );
            dom.append(&head, NodeOrText::AppendNode(link));
        }

        serialize_children(&dom.document)
    }
}

pub fn rewrite_html(html: &str, base_url: &Url, map: &LocalPathMap) -> String {
    HtmlRewriter::new(base_url, map).rewrite_document(html)
}
