use crate::error::{MirrorError, Result};
use url::Url;

/// Canonicalizes a user-supplied address, defaulting the scheme to https.
pub fn normalize_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MirrorError::InvalidUrl("empty URL".to_string()));
    }

    let candidate = if has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed.trim_start_matches('/'))
    };

    let url = Url::parse(&candidate)
        .map_err(|e| MirrorError::InvalidUrl(format!("{}: {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(MirrorError::InvalidUrl(format!(
            "{}: unsupported scheme {}",
            raw,
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(MirrorError::InvalidUrl(format!("{}: missing host", raw)));
    }

    Ok(url)
}

fn has_scheme(input: &str) -> bool {
    match input.find("://") {
        Some(idx) => input[..idx]
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.'),
        None => false,
    }
}

/// First label of the hostname with a leading `www.` removed.
pub fn host_root(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    let host = host.strip_prefix("www.").unwrap_or(host);
    let root: String = host
        .split('.')
        .next()
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();

    if root.is_empty() {
        "site".to_string()
    } else {
        root
    }
}

/// References that never hit the network and are left exactly as written.
pub fn is_non_fetchable(reference: &str) -> bool {
    let lower = reference.trim().to_ascii_lowercase();
    lower.is_empty()
        || lower.starts_with('#')
        || lower.starts_with("data:")
        || lower.starts_with("blob:")
        || lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("about:")
}

/// Resolves a possibly relative reference against `base`.
///
/// Returns `None` for non-fetchable references and anything that does not end
/// up as an http(s) URL.
pub fn resolve(base: &Url, reference: &str) -> Option<Url> {
    let reference = reference.trim();
    if is_non_fetchable(reference) {
        return None;
    }

    let resolved = if reference.starts_with("//") {
        // Protocol-relative URL
        Url::parse(&format!("{}:{}", base.scheme(), reference)).ok()?
    } else {
        base.join(reference).ok()?
    };

    match resolved.scheme() {
        "http" | "https" => Some(resolved),
        _ => None,
    }
}

/// Asset URLs are keyed without their fragment.
pub fn resolve_asset(base: &Url, reference: &str) -> Option<String> {
    let mut url = resolve(base, reference)?;
    url.set_fragment(None);
    Some(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_adds_https() {
        let url = normalize_url("example.com/page").unwrap();
        assert_eq!(url.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_normalize_keeps_http() {
        let url = normalize_url("  http://example.com  ").unwrap();
        assert_eq!(url.as_str(), "http://example.com/");
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        assert!(matches!(normalize_url(""), Err(MirrorError::InvalidUrl(_))));
        assert!(matches!(normalize_url("http://"), Err(MirrorError::InvalidUrl(_))));
        assert!(matches!(
            normalize_url("ftp://example.com/file"),
            Err(MirrorError::InvalidUrl(_))
        ));
        assert!(matches!(normalize_url("exa mple.com"), Err(MirrorError::InvalidUrl(_))));
    }

    #[test]
    fn test_host_root() {
        let cases = vec![
            ("https://www.example.com/", "example"),
            ("https://blog.example.co.uk/", "blog"),
            ("https://example.com/", "example"),
            ("http://127.0.0.1:8080/", "127"),
        ];
        for (input, expected) in cases {
            assert_eq!(host_root(&Url::parse(input).unwrap()), expected, "for {}", input);
        }
    }

    #[test]
    fn test_resolve_variants() {
        let base = Url::parse("https://example.com/subdir/page.html").unwrap();
        let cases = vec![
            ("../style.css", Some("https://example.com/style.css")),
            ("./script.js", Some("https://example.com/subdir/script.js")),
            ("images/photo.jpg", Some("https://example.com/subdir/images/photo.jpg")),
            ("/a.png", Some("https://example.com/a.png")),
            ("//cdn.example.com/x.js", Some("https://cdn.example.com/x.js")),
            ("https://other.test/y.png", Some("https://other.test/y.png")),
            ("data:image/png;base64,AAAA", None),
            ("#section", None),
            ("blob:https://example.com/123", None),
            ("javascript:void(0)", None),
            ("", None),
        ];
        for (input, expected) in cases {
            assert_eq!(
                resolve(&base, input).map(|u| u.to_string()),
                expected.map(str::to_string),
                "for {}",
                input
            );
        }
    }

    #[test]
    fn test_resolve_asset_drops_fragment() {
        let base = Url::parse("https://example.com/").unwrap();
        assert_eq!(
            resolve_asset(&base, "icons.svg#home").as_deref(),
            Some("https://example.com/icons.svg")
        );
    }
}
