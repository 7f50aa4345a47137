// crates/logging/src/subscriber.rs
#![allow(missing_docs)]

use crate::flags::{LogFormat, SubscriberConfig};
use crate::formatter::SafeforkFormatter;
use crate::json_format::JsonFormatter;
use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, fmt as tracing_fmt,
    filter::Directive,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

#[cfg(all(unix, feature = "syslog"))]
mod syslog_sink {
    use std::fmt;
    use std::io;
    use std::os::unix::net::UnixDatagram;
    use std::path::{Path, PathBuf};
    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer};

    struct MessageVisitor {
        msg: String,
    }

    impl MessageVisitor {
        fn push(&mut self, name: &str, value: &str) {
            if !self.msg.is_empty() {
                self.msg.push(' ');
            }
            if name != "message" {
                self.msg.push_str(name);
                self.msg.push('=');
            }
            self.msg.push_str(value);
        }
    }

    impl Visit for MessageVisitor {
        fn record_str(&mut self, field: &Field, value: &str) {
            self.push(field.name(), value);
        }

        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.push(field.name(), &format!("{value:?}"));
        }
    }

    pub(super) struct SyslogLayer {
        sock: UnixDatagram,
    }

    impl SyslogLayer {
        pub(super) fn new(path: Option<&Path>) -> io::Result<Self> {
            let path = path
                .map(Path::to_path_buf)
                .or_else(|| std::env::var_os("SAFEFORK_SYSLOG_PATH").map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("/dev/log"));
            let sock = UnixDatagram::unbound()?;
            sock.connect(path)?;
            Ok(Self { sock })
        }
    }

    fn severity(level: Level) -> u8 {
        match level {
            Level::ERROR => 3,
            Level::WARN => 4,
            Level::INFO => 6,
            Level::DEBUG | Level::TRACE => 7,
        }
    }

    impl<S> Layer<S> for SyslogLayer
    where
        S: Subscriber,
    {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut v = MessageVisitor { msg: String::new() };
            event.record(&mut v);
            if v.msg.is_empty() {
                v.msg.push_str(event.metadata().target());
            }
            // facility user(1)
            let pri = 8 + severity(*event.metadata().level());
            let pid = std::process::id();
            let data = format!("<{pri}>safefork[{pid}]: {}", v.msg);
            let _ = self.sock.send(data.as_bytes());
        }
    }
}

fn base_level(quiet: bool, verbose: u8) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::ERROR,
        (false, 0) => LevelFilter::WARN,
        (false, 1) => LevelFilter::INFO,
        (false, 2) => LevelFilter::DEBUG,
        (false, _) => LevelFilter::TRACE,
    }
}

/// Build a [`tracing`] subscriber for the safefork targets.
pub fn subscriber(cfg: SubscriberConfig) -> io::Result<Box<dyn tracing::Subscriber + Send + Sync>> {
    let SubscriberConfig {
        format,
        verbose,
        debug,
        quiet,
        log_file,
        syslog,
        syslog_path,
        colored,
        timestamps,
    } = cfg;

    let mut filter = EnvFilter::builder()
        .with_default_directive(base_level(quiet, verbose).into())
        .from_env_lossy();
    if !quiet {
        for flag in &debug {
            let directive: Directive = format!("{}=trace", flag.target())
                .parse()
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            filter = filter.add_directive(directive);
        }
    }

    let base = tracing_fmt::layer()
        .with_writer(io::stderr)
        .with_ansi(colored);
    let fmt_layer = match (format, timestamps) {
        (LogFormat::Json, true) => base.json().boxed(),
        (LogFormat::Json, false) => base.json().without_time().boxed(),
        (LogFormat::Text, _) => base
            .event_format(SafeforkFormatter::new(timestamps))
            .boxed(),
    };

    #[cfg(all(unix, feature = "syslog"))]
    let syslog_layer = if syslog {
        Some(syslog_sink::SyslogLayer::new(syslog_path.as_deref())?)
    } else {
        None
    };
    #[cfg(not(all(unix, feature = "syslog")))]
    let syslog_layer: Option<tracing_subscriber::layer::Identity> = {
        let _ = (syslog, syslog_path);
        None
    };

    let file_layer = match log_file {
        Some((path, fmt)) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let base = tracing_fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false);
            let layer = match fmt {
                LogFormat::Json => base.event_format(JsonFormatter).boxed(),
                LogFormat::Text => base.event_format(SafeforkFormatter::new(true)).boxed(),
            };
            Some(layer)
        }
        None => None,
    };

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(syslog_layer)
        .with(file_layer);
    Ok(Box::new(registry))
}

/// Install the subscriber globally.
pub fn init(cfg: SubscriberConfig) -> io::Result<()> {
    subscriber(cfg)?
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))
}
