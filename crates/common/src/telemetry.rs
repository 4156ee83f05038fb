//! Tracing subscriber setup shared by the gateway and the maintenance CLI

use crate::config::ObservabilityConfig;
use tracing_subscriber::{fmt::MakeWriter, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_tracing(config: &ObservabilityConfig) {
    init_with_writer(config, std::io::stdout);
}

/// Same as [`init_tracing`], logging to stderr so stdout stays machine-readable
pub fn init_cli_tracing(config: &ObservabilityConfig) {
    init_with_writer(config, std::io::stderr);
}

fn init_with_writer<W>(config: &ObservabilityConfig, writer: W)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}
