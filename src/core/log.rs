use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

/// Crates whose internals only matter when debugging storage or HTTP.
const QUIET_TARGETS: [&str; 4] = ["fjall", "lsm_tree", "reqwest", "hyper_util"];

/// Warnings from `xpns` (skipped documents, failed rate lookups) are always
/// shown. `verbose` adds debug output for `xpns` and info for the quiet
/// dependencies.
fn app_filter(verbose: bool) -> Targets {
    let (app_level, dependency_level) = if verbose {
        (LevelFilter::DEBUG, LevelFilter::INFO)
    } else {
        (LevelFilter::WARN, LevelFilter::ERROR)
    };
    QUIET_TARGETS
        .iter()
        .fold(Targets::new().with_target("xpns", app_level), |targets, target| {
            targets.with_target(*target, dependency_level)
        })
}

/// Installs the global subscriber. Log lines go to stderr so tables on
/// stdout stay clean.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    tracing_subscriber::registry()
        .with(fmt::layer().pretty().without_time().with_writer(std::io::stderr))
        .with(app_filter(verbose))
        .with(env_filter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_are_shown_without_verbose() {
        let filter = app_filter(false);
        assert!(filter.would_enable("xpns::store::disk", &Level::WARN));
        assert!(!filter.would_enable("xpns::core::orchestrator", &Level::DEBUG));
        assert!(!filter.would_enable("fjall::keyspace", &Level::WARN));
        assert!(filter.would_enable("reqwest::connect", &Level::ERROR));
    }

    #[test]
    fn test_verbose_enables_debug_output() {
        let filter = app_filter(true);
        assert!(filter.would_enable("xpns::core::orchestrator", &Level::DEBUG));
        assert!(filter.would_enable("lsm_tree::compaction", &Level::INFO));
        assert!(!filter.would_enable("hyper_util::client", &Level::DEBUG));
    }
}
