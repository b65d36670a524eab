//! Log output for the `playblast` binary and for hosts embedding the ledger.
//!
//! Human-readable lines go to stderr so that stdout stays free for artifact
//! paths and `--json` results; JSON mode emits one object per event carrying
//! the `event=` names from [`crate::obs`].

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Route ledger and publish events to the terminal.
///
/// `RUST_LOG` wins over `level` (e.g. `RUST_LOG=playblast_core=debug` to see
/// individual ledger appends). A host that already installed a subscriber
/// keeps it.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if json {
        registry
            .with(fmt::layer().with_target(false).json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_ignored() {
        init_tracing(false, Level::INFO);
        init_tracing(true, Level::DEBUG);
        tracing::info!(event = "telemetry.ready");
    }
}
