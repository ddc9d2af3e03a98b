pub mod cli;
pub mod config;
pub mod css_processor;
pub mod downloader;
pub mod error;
pub mod file_manager;
pub mod html_parser;
pub mod http_client;
pub mod logging;
pub mod mirror;
pub mod page_fetcher;
pub mod path_classifier;
pub mod rewriter;
pub mod url_utils;

// Re-export main types for convenience
pub use cli::MirrorCommand;
pub use config::MirrorConfig;
pub use css_processor::{CollectedStyle, ConsolidatedCss, ImportDepths};
pub use downloader::{AssetSet, DownloadOutcome};
pub use error::{MirrorError, Result};
pub use file_manager::FileManager;
pub use html_parser::HtmlParser;
pub use http_client::{HttpClient, HttpConfig};
pub use mirror::{MirrorReport, WebsiteMirror};
pub use path_classifier::{build_local_path, classify, AssetFolder, LocalPathMap};
