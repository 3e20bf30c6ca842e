use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

/// Extra filter directives, e.g. `sbeprims_codec=trace`.
pub const LOG_DIRECTIVES_ENV: &str = "SBEPRIMS_LOG";

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// `level` for the sbeprims crates, warn for everything else, then any
/// `extra` comma-separated directives. Empty and unparseable directives are
/// dropped.
pub fn filter(level: LogLevel, extra: Option<&str>) -> EnvFilter {
    let base = EnvFilter::default().add_directive(LevelFilter::WARN.into());
    // Targets match by prefix, so this covers every sbeprims_* crate.
    let ours = format!("sbeprims={}", level.as_str());
    std::iter::once(ours.as_str())
        .chain(extra.into_iter().flat_map(|e| e.split(',')))
        .map(str::trim)
        .filter(|directive| !directive.is_empty())
        .filter_map(|directive| directive.parse::<Directive>().ok())
        .fold(base, EnvFilter::add_directive)
}

/// Install the stderr subscriber. Library events (IR loads, version
/// decisions, section transitions) surface at debug and trace.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let extra = std::env::var(LOG_DIRECTIVES_ENV).ok();
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter(level, extra.as_deref()))
        .with_ansi(false)
        .with_target(true);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_applies_to_workspace_crates() {
        let rendered = filter(LogLevel::Debug, None).to_string().to_lowercase();
        assert!(rendered.contains("sbeprims=debug"), "{rendered}");
        assert!(rendered.contains("warn"), "{rendered}");
    }

    #[test]
    fn extra_directives_are_added() {
        let rendered = filter(LogLevel::Info, Some("sbeprims_codec=trace, ,"))
            .to_string()
            .to_lowercase();
        assert!(rendered.contains("sbeprims_codec=trace"), "{rendered}");
        assert!(rendered.contains("sbeprims=info"), "{rendered}");
    }
}
