pub mod share;

use smartshare_core::MediaPair;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use share::{CommandShareSink, ManifestShareSink, ShareManifest};

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays machine-readable.
pub fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("smartshare=info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Size in kilobytes with one decimal, e.g. `"12.5 KB"`.
pub fn format_kb(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

/// One line of the original-vs-compressed comparison.
pub fn comparison_line(pair: &MediaPair) -> String {
    format!(
        "{}: {} -> {} ({:.0}% smaller)",
        pair.display_name,
        format_kb(pair.original_size_bytes),
        format_kb(pair.compressed_size_bytes),
        pair.savings_percent()
    )
}

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
