//! Logging for the CLI and the HTTP server.
//!
//! One `tracing` subscriber covers this crate and tower-http's request
//! spans. `RUST_LOG` replaces the verbosity-derived filter when it parses.

use tower_http::{
    trace::{
        DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse,
        HttpMakeClassifier, TraceLayer,
    },
    LatencyUnit,
};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Info and above, including one line per HTTP response.
    #[default]
    Normal,
    /// Debug and above, including request starts and storage detail.
    Verbose,
    /// Everything.
    Trace,
}

impl Verbosity {
    /// Convert verbosity to tracing level filter.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }
}

/// Build the filter directive for the given verbosity.
#[must_use]
pub fn default_filter(verbosity: Verbosity) -> String {
    let level = verbosity.to_level_filter();
    format!("travel_analytics={level},tower_http={level}")
}

/// Build the subscriber filter.
///
/// `override_directives` (normally `RUST_LOG`) wins when it parses; an
/// unparsable override falls back to [`default_filter`].
#[must_use]
pub fn build_filter(verbosity: Verbosity, override_directives: Option<&str>) -> EnvFilter {
    override_directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_filter(verbosity)))
}

/// Initialize the global subscriber.
///
/// Safe to call more than once; later calls are ignored.
///
/// ```no_run
/// use travel_analytics::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    let subscriber = tracing_subscriber::registry()
        .with(build_filter(verbosity, rust_log.as_deref()))
        .with(fmt::layer().with_target(true).with_thread_ids(false));

    let _ = subscriber.try_init();
}

/// Request tracing for the API router.
///
/// Each request gets an INFO span with method and URI. Responses log at INFO
/// with latency in milliseconds; 5xx responses log at WARN.
#[must_use]
pub fn http_trace_layer() -> TraceLayer<HttpMakeClassifier> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        )
        .on_failure(DefaultOnFailure::new().level(Level::WARN))
}

/// Warnings and errors only, routed through the test writer.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    use tracing::level_filters::LevelFilter;

    #[test]
    fn test_verbosity_to_level() {
        assert_eq!(Verbosity::Quiet.to_level_filter(), Level::ERROR);
        assert_eq!(Verbosity::Normal.to_level_filter(), Level::INFO);
        assert_eq!(Verbosity::Verbose.to_level_filter(), Level::DEBUG);
        assert_eq!(Verbosity::Trace.to_level_filter(), Level::TRACE);
    }

    #[test]
    fn test_verbosity_default() {
        assert_eq!(Verbosity::default(), Verbosity::Normal);
    }

    #[test]
    fn test_default_filter_covers_http_tracing() {
        assert_eq!(
            default_filter(Verbosity::Verbose),
            "travel_analytics=DEBUG,tower_http=DEBUG"
        );
    }

    #[test]
    fn test_build_filter_from_verbosity() {
        let filter = build_filter(Verbosity::Quiet, None);
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::ERROR));

        let directives = filter.to_string().to_lowercase();
        assert!(directives.contains("travel_analytics=error"), "{directives}");
        assert!(directives.contains("tower_http=error"), "{directives}");
    }

    #[test]
    fn test_build_filter_prefers_override() {
        let filter = build_filter(Verbosity::Quiet, Some("travel_analytics=trace"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
        assert!(!filter.to_string().to_lowercase().contains("tower_http"));
    }

    #[test]
    fn test_build_filter_ignores_bad_override() {
        let filter = build_filter(Verbosity::Verbose, Some("travel_analytics=loud"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }
}
