//! Tracing configuration for emukrnl
//!
//! Installs a `tracing-subscriber` registry with an environment filter and a
//! single stderr fmt layer:
//!
//! "2025-01-15 10:30:45.123 INFO [file.rs:42] [target] message"
//!
//! `RUST_LOG` replaces the default directives entirely.

use std::io;

use tracing_subscriber::{fmt, fmt::writer::BoxMakeWriter, prelude::*, registry};

/// Check if running in development environment
fn is_development() -> bool {
    cfg!(debug_assertions)
}

/// Build the default filter directives for tracing
///
/// - **Development**: debug for everything
/// - **Production**: info
/// - **config crate**: warn, its source lookups are noisy
fn build_filter_directives(is_dev: bool) -> Vec<String> {
    let kernel_level = if is_dev { "debug" } else { "info" };
    vec![
        if is_dev { "debug" } else { "info" }.to_string(),
        format!("ek_core={kernel_level}"),
        format!("ek_infra={kernel_level}"),
        format!("ek_platform={kernel_level}"),
        format!("emukrnl_lib={kernel_level}"),
        "config=warn".to_string(),
    ]
}

/// Initialize the tracing subscriber.
///
/// Call once from `main`, before any kernel object is created.
///
/// # Errors
///
/// Returns `Err` if a global subscriber is already registered.
pub fn init_tracing_subscriber() -> anyhow::Result<()> {
    let filter_directives = build_filter_directives(is_development());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter_directives.join(",")));

    // Logs go to stderr so command output on stdout stays machine readable.
    let writer: BoxMakeWriter = BoxMakeWriter::new(io::stderr);
    let fmt_layer = fmt::layer()
        .with_timer(fmt::time::ChronoUtc::new(
            "%Y-%m-%d %H:%M:%S%.3f".to_string(),
        ))
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_ansi(cfg!(not(test))) // Disable colors in tests
        .with_writer(writer);

    registry().with(env_filter).with(fmt_layer).try_init()?;

    Ok(())
}
