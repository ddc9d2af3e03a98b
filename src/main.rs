use anyhow::{Context, Result};
use clap::Parser;
use colored::*;

use page_mirror::logging::init_tracing;
use page_mirror::{MirrorCommand, MirrorConfig, MirrorReport, WebsiteMirror};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = MirrorCommand::parse();
    init_tracing(args.verbose);

    if let Err(e) = run(&args).await {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(args: &MirrorCommand) -> Result<()> {
    let config = MirrorConfig::from(args);
    let mirror = WebsiteMirror::new(config);

    let report = mirror
        .run()
        .await
        .with_context(|| format!("could not mirror {}", args.url))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(())
}

fn print_summary(report: &MirrorReport) {
    println!("✅ Mirrored {}", report.final_url.blue());
    println!("📁 Output directory: {}", report.output_dir.display());
    println!(
        "🎨 Stylesheets: {} ok, {} failed",
        report.stylesheets_ok.to_string().green(),
        report.stylesheets_failed.to_string().yellow()
    );
    println!(
        "📦 Assets: {} ok, {} failed (of {})",
        report.assets_ok.to_string().green(),
        report.assets_failed.to_string().yellow(),
        report.assets_total
    );
    for failure in &report.failures {
        println!("   {} {} ({})", "⚠️ ".yellow(), failure.url, failure.error);
    }
}
