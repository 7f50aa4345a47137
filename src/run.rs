// src/run.rs

use std::io;

use logging::{SubscriberConfig, subscriber};
use oracle::{ForkError, ForkResult, Oracle, Report};
use thiserror::Error;
use tracing::subscriber::with_default;

use crate::config::CheckConfig;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to set up logging: {0}")]
    Logging(#[from] io::Error),
    #[error(transparent)]
    Fork(#[from] ForkError),
}

fn subscriber_config(cfg: &CheckConfig) -> SubscriberConfig {
    SubscriberConfig::builder()
        .format(cfg.log_format)
        .verbose(cfg.verbose)
        .debug(&cfg.debug)
        .quiet(cfg.quiet)
        .log_file(cfg.log_file.clone())
        .syslog(cfg.syslog)
        .syslog_path(cfg.syslog_path.clone())
        .colored(cfg.colored)
        .timestamps(cfg.timestamps)
        .build()
}

/// Evaluate the oracle with diagnostics routed through `cfg`'s subscriber.
///
/// The subscriber is only in effect for this call; a global subscriber the
/// caller installed is left alone.
pub fn evaluate_with_config(cfg: &CheckConfig) -> io::Result<Report> {
    let sub = subscriber(subscriber_config(cfg))?;
    Ok(with_default(sub, || Oracle::new(cfg.oracle).evaluate()))
}

pub fn is_safe_to_fork_with_config(cfg: &CheckConfig) -> io::Result<bool> {
    evaluate_with_config(cfg).map(|report| report.is_safe())
}

/// Like [`safe_fork`](crate::safe_fork), logging through `cfg`'s subscriber.
pub fn safe_fork_with_config(cfg: &CheckConfig) -> Result<ForkResult, Error> {
    let sub = subscriber(subscriber_config(cfg))?;
    with_default(sub, || Oracle::new(cfg.oracle).fork()).map_err(Error::from)
}
