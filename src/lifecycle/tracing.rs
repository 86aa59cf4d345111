//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered by `RUST_LOG`.
//!
//! ## What Gets Traced
//!
//! - **Reconciler operations**: every Create, Read, Update and Delete runs in a span carrying
//!   the resource kind and handle
//! - **Retries**: each retry logs the attempt, the status and the wait
//! - **Requests**: method and path at `debug`; response bodies are truncated by
//!   [`truncate_for_log`]
//!
//! The bearer token never appears in a log line: `Credential` prints `[REDACTED]`.
//!
//! ## Usage Examples
//!
//! ```bash
//! # Operation outcomes only
//! RUST_LOG=info cargo run -- 5f0c8c9e1c9d440000e8d8c3
//!
//! # Desired state, diffs and response bodies
//! RUST_LOG=debug cargo run -- 5f0c8c9e1c9d440000e8d8c3/robots.txt
//!
//! # Only the engine
//! RUST_LOG=webflow_reconcile::framework=debug cargo run -- ...
//! ```
//!
//! With `RUST_LOG=info` an Update that replaces a redirect reads:
//!
//! ```text
//! INFO update{kind="redirect" handle=5f0c.../redirects/r1 dry_run=false}: Replacing changed=["destinationPath"]
//! INFO update{kind="redirect" handle=5f0c.../redirects/r1 dry_run=false}: Replaced new_handle=5f0c.../redirects/r2
//! ```

pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}

/// Shortens `text` to at most `max` characters for log output.
pub fn truncate_for_log(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}... ({} bytes total)", &text[..cut], text.len()),
        None => text.to_string(),
    }
}
