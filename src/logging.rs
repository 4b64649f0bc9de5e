// ==============================================================================
// logging.rs - Tracing Setup
// ==============================================================================
// Description: Shared tracing subscriber for the command-line tools
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 0.1.0
// ==============================================================================

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when RUST_LOG is unset
pub const DEFAULT_FILTER: &str = "gwas_qc=info";

/// Default filter for the library plus the calling binary's own target
pub fn default_filter(binary: &str) -> String {
    format!("{},{}=info", DEFAULT_FILTER, binary)
}

/// Install the global subscriber; log output goes to stderr
pub fn init_tracing(binary: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(binary).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
