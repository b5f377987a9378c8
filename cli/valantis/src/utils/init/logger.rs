use std::sync::OnceLock;

use tracing::error;
use tracing_subscriber::prelude::*;
use tracing_subscriber::reload::Handle;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::commands::Verbosity;

static LOGGER_HANDLE: OnceLock<Handle<EnvFilter, Registry>> = OnceLock::new();

/// Filter directives for a verbosity level.
///
/// Logs of the binary and both libraries are raised together,
/// dependencies only join in at the highest levels.
pub(crate) fn log_filter(verbosity: Verbosity) -> &'static str {
    match verbosity {
        // Show only errors
        Verbosity::Quiet => "off,valantis=error,valantis_sdk=error,valantis_catalog=error",
        // Only show warnings
        Verbosity::Verbose(0) => "off,valantis=warn,valantis_sdk=warn,valantis_catalog=warn",
        Verbosity::Verbose(1) => "off,valantis=info,valantis_sdk=info,valantis_catalog=info",
        // Every request and response
        Verbosity::Verbose(2) => "off,valantis=debug,valantis_sdk=debug,valantis_catalog=debug",
        Verbosity::Verbose(3) => "off,valantis=trace,valantis_sdk=trace,valantis_catalog=trace",
        // Also show debug from dependencies (reqwest, hyper)
        Verbosity::Verbose(4) => "debug,valantis=trace,valantis_sdk=trace,valantis_catalog=trace",
        Verbosity::Verbose(_) => "trace",
    }
}

/// Install the global subscriber, or update its filter if already installed.
///
/// `RUST_LOG` takes precedence over `verbosity` when set.
pub(crate) fn init_logger(verbosity: Option<Verbosity>) {
    let verbosity = verbosity.unwrap_or_default();

    let filter_handle = LOGGER_HANDLE.get_or_init(|| {
        let (subscriber, reload_handle) = create_registry_and_filter_reload_handle();
        subscriber.init();
        reload_handle
    });

    update_filters(filter_handle, log_filter(verbosity));
}

pub fn update_filters(filter_handle: &Handle<EnvFilter, Registry>, log_filter: &str) {
    let result = filter_handle.modify(|layer| {
        match EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_filter)) {
            Ok(new_filter) => *layer = new_filter,
            Err(err) => {
                error!("Updating logger filter failed: {}", err);
            },
        };
    });
    if let Err(err) = result {
        error!("Updating logger filter failed: {}", err);
    }
}

pub fn create_registry_and_filter_reload_handle() -> (
    impl SubscriberInitExt,
    Handle<EnvFilter, Registry>,
) {
    // Start out silent, the actual filter is set right after by `update_filters`.
    let filter = EnvFilter::new("off");
    let (filter, filter_reload_handle) = tracing_subscriber::reload::Layer::new(filter);
    let log_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter);
    let registry = tracing_subscriber::registry().with(log_layer);

    (registry, filter_reload_handle)
}
