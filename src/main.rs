//! Refreshes the handles given on the command line and prints their observed state as JSON.
//!
//! ```bash
//! WEBFLOW_API_TOKEN=... cargo run -- <handle>...
//! ```
//!
//! Ctrl-C cancels every in-flight request and backoff sleep.

use std::process::ExitCode;
use tracing::{error, info, warn, Instrument};
use webflow_reconcile::framework::{Observation, ResourceHandle};
use webflow_reconcile::lifecycle::{setup_tracing, ProviderConfig, ProviderSystem};

#[tokio::main]
async fn main() -> ExitCode {
    setup_tracing();

    let handles: Vec<ResourceHandle> = std::env::args().skip(1).map(ResourceHandle::new).collect();
    if handles.is_empty() {
        eprintln!("usage: webflow-reconcile <handle>...");
        return ExitCode::FAILURE;
    }

    let system = match ProviderConfig::from_env().and_then(ProviderSystem::new) {
        Ok(system) => system,
        Err(e) => {
            error!(error = %e, "Cannot configure provider");
            return ExitCode::FAILURE;
        }
    };

    let cancel = system.cancellation_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted");
            cancel.cancel();
        }
    });

    let mut failed = false;
    for handle in &handles {
        let span = tracing::info_span!("refresh", %handle);
        let ctx = system.context();
        let result = system.read_any(&ctx, handle).instrument(span).await;

        match result {
            Ok(Observation::Present(observed)) => match serde_json::to_string_pretty(&observed) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    error!(%handle, error = %e, "Cannot encode observed state");
                    failed = true;
                }
            },
            Ok(Observation::Absent) => info!(%handle, "Resource no longer exists"),
            Err(e) => {
                error!(%handle, error = %e, "Refresh failed");
                failed = true;
                if e.is_cancelled() {
                    break;
                }
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
