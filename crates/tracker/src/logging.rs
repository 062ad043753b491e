//! Tracing setup for the `field-tracker` binary.
//!
//! Session, zone and upload events carry structured fields (`session_id`,
//! `farm_id`, `zone_id`), so the json format is the default for shipped
//! configs. `pretty` is meant for replaying a walk locally.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LoggingConfig;

/// sqlx logs every statement at info; batch inserts would drown the engine.
const QUIET_TARGETS: &[&str] = &["sqlx=warn"];

fn default_directives(level: &str) -> String {
    std::iter::once(level)
        .chain(QUIET_TARGETS.iter().copied())
        .collect::<Vec<_>>()
        .join(",")
}

/// Installs the global subscriber.
///
/// `RUST_LOG` replaces the configured directives entirely.
pub fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.level)));
    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_span_events(FmtSpan::CLOSE)
                    .with_current_span(true)
                    .with_target(true),
            )
            .init();
    } else {
        registry.with(fmt::layer().pretty().with_target(false)).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_quiet_sqlx() {
        assert_eq!(default_directives("debug"), "debug,sqlx=warn");
    }

    #[test]
    fn test_default_directives_parse() {
        assert!(EnvFilter::try_new(default_directives("field_tracker=trace,info")).is_ok());
    }
}
