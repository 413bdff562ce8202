use std::fmt::{self, Write};
use std::path::PathBuf;

use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::{DefaultFields, FmtSpan, Format, Full};
use tracing_subscriber::fmt::{time::FormatTime, Layer as FmtLayer};
use tracing_subscriber::layer::Layered;
use tracing_subscriber::{prelude::*, registry::Registry, EnvFilter};

mod fanout;

use self::fanout::Fanout;
use super::app_config::config;
use super::error::Result;

pub mod prelude {
    pub use tracing::{debug, error, info, trace, warn};
    pub use tracing::{debug_span, error_span, info_span, trace_span, warn_span};
    pub use tracing::{event, field::Empty, instrument, span};
}

type Filtered = Layered<EnvFilter, Registry>;
type Output = FmtLayer<Filtered, DefaultFields, Format<Full, IsoTime>, NonBlocking>;

/// Install the global subscriber from the `logging` section of the config.
///
/// `produces_output` tells terminal outputs with `auto_switch` to keep off
/// stdout. The returned guard flushes pending lines on drop and has to be
/// held in main.
pub fn setup(produces_output: bool) -> Result<LoggingGuard> {
    let cfg: LoggingConfig = match config().get("logging") {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("invalid logging config, using defaults: {}", err);
            LoggingConfig::default()
        }
    };
    LoggingGuard::install(&cfg, produces_output)
}

pub struct LoggingGuard {
    _workers: Vec<WorkerGuard>,
}

impl LoggingGuard {
    fn install(cfg: &LoggingConfig, produces_output: bool) -> Result<Self> {
        let mut workers = vec![];
        let outputs: Vec<Output> = cfg
            .outputs
            .iter()
            .filter(|o| o.enabled)
            .map(|o| {
                let (writer, guard) = o.target.to_writer(produces_output);
                workers.push(guard);
                FmtLayer::default()
                    .with_ansi(o.target.supports_color())
                    .with_target(false)
                    .with_span_events(o.span_events.iter().fold(FmtSpan::NONE, |f, e| f | (*e).into()))
                    .with_timer(IsoTime)
                    .with_writer(writer)
            })
            .collect();

        Registry::default()
            .with(cfg.filter.to_env_filter())
            .with(Fanout(outputs))
            .try_init()?;

        Ok(Self { _workers: workers })
    }
}

pub struct IsoTime;

impl FormatTime for IsoTime {
    fn format_time(&self, w: &mut dyn Write) -> fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

// ====== Config to Layer ======

impl FilterConfig {
    fn to_env_filter(&self) -> EnvFilter {
        let filter = match &self.from_env {
            Some(env) => EnvFilter::from_env(env),
            None => EnvFilter::default(),
        };

        match &self.directives {
            Some(dirs) => dirs
                .split(',')
                .filter_map(|s| match s.parse() {
                    Ok(d) => Some(d),
                    Err(err) => {
                        eprintln!("ignoring `{}`: {}", s, err);
                        None
                    }
                })
                .fold(filter, |f, dir| f.add_directive(dir)),
            None => filter,
        }
    }
}

impl LoggingTarget {
    fn supports_color(&self) -> bool {
        matches!(self, LoggingTarget::Term(_))
    }

    fn to_writer(&self, produces_output: bool) -> (NonBlocking, WorkerGuard) {
        let builder = NonBlockingBuilder::default().lossy(false);
        match self {
            LoggingTarget::Term(TermOutput {
                name: TermTarget::Stdout,
                auto_switch,
            }) if !(*auto_switch && produces_output) => builder.finish(std::io::stdout()),
            LoggingTarget::Term(_) => builder.finish(std::io::stderr()),
            LoggingTarget::File(file) => {
                builder.finish(RollingFileAppender::new(Rotation::NEVER, &file.directory, &file.name))
            }
        }
    }
}

impl From<SpanEvent> for FmtSpan {
    fn from(e: SpanEvent) -> Self {
        match e {
            SpanEvent::New => FmtSpan::NEW,
            SpanEvent::Enter => FmtSpan::ENTER,
            SpanEvent::Exit => FmtSpan::EXIT,
            SpanEvent::Close => FmtSpan::CLOSE,
            SpanEvent::Active => FmtSpan::ACTIVE,
            SpanEvent::Full => FmtSpan::FULL,
        }
    }
}

// ====== Logging Config ======

#[derive(Debug, serde::Deserialize)]
struct LoggingConfig {
    #[serde(default)]
    filter: FilterConfig,
    #[serde(default)]
    outputs: Vec<LoggingOutput>,
}

#[derive(Debug, serde::Deserialize)]
struct FilterConfig {
    #[serde(default)]
    directives: Option<String>,
    #[serde(default, deserialize_with = "deserialize_filter_from_env")]
    from_env: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct LoggingOutput {
    enabled: bool,
    #[serde(default)]
    span_events: Vec<SpanEvent>,
    target: LoggingTarget,
}

#[derive(Copy, Clone, Debug, serde::Deserialize)]
enum SpanEvent {
    New,
    Enter,
    Exit,
    Close,
    Active,
    Full,
}

#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "lowercase")]
enum LoggingTarget {
    Term(TermOutput),
    File(FileOutput),
}

#[derive(Debug, serde::Deserialize)]
struct TermOutput {
    name: TermTarget,
    #[serde(default)]
    auto_switch: bool,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
enum TermTarget {
    Stdout,
    Stderr,
}

#[derive(Debug, serde::Deserialize)]
struct FileOutput {
    directory: PathBuf,
    name: PathBuf,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            directives: Some("INFO".into()),
            from_env: Some("RUST_LOG".into()),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: Default::default(),
            outputs: vec![LoggingOutput {
                enabled: true,
                span_events: vec![],
                target: LoggingTarget::Term(TermOutput {
                    name: TermTarget::Stdout,
                    auto_switch: true,
                }),
            }],
        }
    }
}

// ====== serde helpers ======

/// Deserialize `false` to `None`, `true` to `Some("RUST_LOG")`, and string to `Some(xxx)`
fn deserialize_filter_from_env<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct VisitFromEnv;

    impl<'de> serde::de::Visitor<'de> for VisitFromEnv {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("bool or string")
        }

        fn visit_bool<E>(self, value: bool) -> std::result::Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(if value { Some("RUST_LOG".into()) } else { None })
        }

        fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            // values coming from the environment are always strings
            match value {
                "true" => self.visit_bool(true),
                "false" => self.visit_bool(false),
                _ => Ok(Some(value.to_owned())),
            }
        }
    }

    deserializer.deserialize_any(VisitFromEnv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_logging_section() {
        let cfg: LoggingConfig = serde_yaml::from_str(
            r#"
filter:
  directives: "easysim=debug"
  from_env: false
outputs:
  - enabled: true
    span_events: [New, Close]
    target: { type: term, name: stderr }
  - enabled: false
    target: { type: file, directory: logs, name: sim.log }
"#,
        )
        .unwrap();
        assert_eq!(cfg.filter.directives.as_deref(), Some("easysim=debug"));
        assert_eq!(cfg.filter.from_env, None);
        assert_eq!(cfg.outputs.len(), 2);
        assert!(cfg.outputs[0].target.supports_color());
        assert!(!cfg.outputs[1].target.supports_color());
    }

    #[test]
    fn from_env_flag() {
        let cfg: FilterConfig = serde_yaml::from_str("from_env: true").unwrap();
        assert_eq!(cfg.from_env.as_deref(), Some("RUST_LOG"));
        let cfg: FilterConfig = serde_yaml::from_str("from_env: SIM_LOG").unwrap();
        assert_eq!(cfg.from_env.as_deref(), Some("SIM_LOG"));
    }

    #[test]
    fn second_install_fails() {
        let cfg = LoggingConfig {
            filter: FilterConfig::default(),
            outputs: vec![],
        };
        let _first = LoggingGuard::install(&cfg, true);
        let second = LoggingGuard::install(&cfg, true);
        assert!(matches!(second, Err(crate::utils::Error::Others(_))));
    }

    #[test]
    fn iso_timestamp() {
        let mut s = String::new();
        IsoTime.format_time(&mut s).unwrap();
        // 2021-05-01 12:00:00.000
        assert_eq!(s.len(), 23);
    }
}
