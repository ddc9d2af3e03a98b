mod common;

use common::{Route, TestServer};
use page_mirror::css_processor::process_stylesheets;
use page_mirror::{CollectedStyle, ConsolidatedCss, HttpClient, HttpConfig, ImportDepths};
use url::Url;

async fn consolidate(server: &TestServer, styles: Vec<CollectedStyle>) -> ConsolidatedCss {
    let client = HttpClient::new(HttpConfig::default()).unwrap();
    let page = Url::parse(&server.url("/index.html")).unwrap();
    process_stylesheets(&client, &page, &styles, ImportDepths::default()).await
}

fn external(server: &TestServer, path: &str) -> CollectedStyle {
    CollectedStyle::External(Url::parse(&server.url(path)).unwrap())
}

#[tokio::test]
async fn test_self_import_is_skipped() {
    let server = TestServer::start(vec![(
        "/a.css",
        Route::css("@import url(\"a.css\");\n.a { color: red; }"),
    )]);

    let result = consolidate(&server, vec![external(&server, "/a.css")]).await;
    assert!(
        result.css.contains(&format!("/* import skipped (visited): {} */", server.url("/a.css"))),
        "{}",
        result.css
    );
    assert!(result.css.contains(".a { color: red; }"));
    assert_eq!(server.hits("/a.css"), 1);
}

#[tokio::test]
async fn test_import_cycle_terminates() {
    let server = TestServer::start(vec![
        ("/a.css", Route::css("@import 'b.css';\n.a { color: red; }")),
        ("/b.css", Route::css("@import 'a.css';\n.b { color: blue; }")),
    ]);

    let result = consolidate(&server, vec![external(&server, "/a.css")]).await;
    assert!(result.css.contains(&format!("/* import: {} */", server.url("/b.css"))));
    assert!(result.css.contains(".b { color: blue; }"));
    assert!(
        result.css.contains(&format!("/* import skipped (visited): {} */", server.url("/a.css"))),
        "{}",
        result.css
    );
    assert_eq!(server.hits("/a.css"), 1);
    assert_eq!(server.hits("/b.css"), 1);
}

#[tokio::test]
async fn test_import_chain_stops_at_depth() {
    let server = TestServer::start(vec![
        ("/a.css", Route::css("@import \"b.css\";\n.a {}")),
        ("/b.css", Route::css("@import \"c.css\";\n.b {}")),
        ("/c.css", Route::css("@import \"d.css\";\n.c {}")),
        ("/d.css", Route::css(".d {}")),
    ]);

    let result = consolidate(&server, vec![external(&server, "/a.css")]).await;
    assert_eq!(result.css.matches("@import").count(), 1, "{}", result.css);
    assert!(result.css.contains(&format!("@import url(\"{}\");", server.url("/d.css"))));
    assert!(result.css.contains(".c {}"));
    assert!(!result.css.contains(".d {}"));
    assert_eq!(server.hits("/d.css"), 0);
}

#[tokio::test]
async fn test_inline_style_imports_one_level() {
    let server = TestServer::start(vec![
        ("/b.css", Route::css("@import \"c.css\";\n.b {}")),
        ("/c.css", Route::css(".c {}")),
    ]);

    let result = consolidate(
        &server,
        vec![CollectedStyle::Inline("@import \"/b.css\";\n.inline {}".to_string())],
    )
    .await;
    assert!(result.css.contains(".b {}"));
    assert!(!result.css.contains(".c {}"));
    assert!(result.css.contains(&format!("@import url(\"{}\");", server.url("/c.css"))));
}

#[tokio::test]
async fn test_failed_import_leaves_comment() {
    let server = TestServer::start(vec![(
        "/a.css",
        Route::css("@import url(missing.css);\n.a { color: red; }"),
    )]);

    let result = consolidate(&server, vec![external(&server, "/a.css")]).await;
    assert!(
        result.css.contains(&format!("/* import failed: {} (HTTP 404) */", server.url("/missing.css"))),
        "{}",
        result.css
    );
    assert!(result.css.contains(".a { color: red; }"));
    assert_eq!(result.stylesheets_ok, 1);
    assert_eq!(result.stylesheets_failed, 0);
}

#[tokio::test]
async fn test_import_media_is_wrapped() {
    let server = TestServer::start(vec![
        ("/a.css", Route::css("@import url(\"print.css\") print;")),
        ("/print.css", Route::css(".p { display: none; }")),
    ]);

    let result = consolidate(&server, vec![external(&server, "/a.css")]).await;
    assert!(
        result.css.contains("@media print {\n.p { display: none; }\n}"),
        "{}",
        result.css
    );
}

#[tokio::test]
async fn test_imported_urls_resolve_against_imported_sheet() {
    let server = TestServer::start(vec![
        ("/css/a.css", Route::css("@import \"sub/b.css\";")),
        ("/css/sub/b.css", Route::css(".b { background: url(img/bg.png); }")),
    ]);

    let result = consolidate(&server, vec![external(&server, "/css/a.css")]).await;
    let expected = server.url("/css/sub/img/bg.png");
    assert_eq!(result.assets.to_vec(), vec![expected.clone()]);
    assert!(result.css.contains(&format!("url(\"{}\")", expected)));
}

#[tokio::test]
async fn test_stylesheets_concatenate_in_document_order() {
    let server = TestServer::start(vec![
        ("/one.css", Route::css(".one {}")),
        ("/two.css", Route::css(".two {}")),
    ]);

    let result = consolidate(
        &server,
        vec![
            external(&server, "/one.css"),
            CollectedStyle::Inline(".inline {}".to_string()),
            external(&server, "/two.css"),
        ],
    )
    .await;
    let one = result.css.find(".one {}").unwrap();
    let inline = result.css.find(".inline {}").unwrap();
    let two = result.css.find(".two {}").unwrap();
    assert!(one < inline && inline < two);
    assert_eq!(result.stylesheets_ok, 3);
}

#[tokio::test]
async fn test_shared_import_owned_by_first_sheet_in_document() {
    let server = TestServer::start(vec![
        (
            "/slow-first.css",
            Route::css("@import \"common.css\";\n.first {}").delayed(400),
        ),
        ("/second.css", Route::css("@import \"common.css\";\n.second {}")),
        ("/common.css", Route::css(".common {}")),
    ]);

    let result = consolidate(
        &server,
        vec![external(&server, "/slow-first.css"), external(&server, "/second.css")],
    )
    .await;
    let css = &result.css;
    let common = css.find(".common {}").unwrap();
    let first = css.find(".first {}").unwrap();
    let skipped = css
        .find(&format!("/* import skipped (visited): {} */", server.url("/common.css")))
        .unwrap();
    let second = css.find(".second {}").unwrap();

    assert!(common < first, "{}", css);
    assert!(first < skipped && skipped < second, "{}", css);
    assert_eq!(css.matches(".common {}").count(), 1);
    assert_eq!(server.hits("/common.css"), 1);
}
