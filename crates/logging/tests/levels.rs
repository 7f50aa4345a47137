// crates/logging/tests/levels.rs
use logging::{DebugFlag, LogFormat, SubscriberConfig, subscriber};
use tracing::Level;
use tracing::subscriber::with_default;

fn build(cfg: SubscriberConfig) -> Box<dyn tracing::Subscriber + Send + Sync> {
    subscriber(cfg).unwrap()
}

#[test]
fn warn_but_not_info_by_default() {
    let sub = build(SubscriberConfig::default());
    with_default(sub, || {
        assert!(tracing::enabled!(Level::WARN));
        assert!(!tracing::enabled!(Level::INFO));
    });
}

#[test]
fn verbose_enables_info() {
    let sub = build(SubscriberConfig::builder().verbose(1).build());
    with_default(sub, || {
        assert!(tracing::enabled!(Level::INFO));
        assert!(!tracing::enabled!(Level::DEBUG));
    });
}

#[test]
fn two_v_enables_debug() {
    let sub = build(SubscriberConfig::builder().verbose(2).build());
    with_default(sub, || {
        assert!(tracing::enabled!(Level::DEBUG));
    });
}

#[test]
fn quiet_hides_warnings() {
    let sub = build(SubscriberConfig::builder().verbose(3).quiet(true).build());
    with_default(sub, || {
        assert!(tracing::enabled!(Level::ERROR));
        assert!(!tracing::enabled!(Level::WARN));
    });
}

#[test]
fn debug_flag_is_scoped_to_its_target() {
    let sub = build(
        SubscriberConfig::builder()
            .debug([DebugFlag::Signals])
            .build(),
    );
    with_default(sub, || {
        assert!(tracing::enabled!(target: "safefork::signals", Level::TRACE));
        assert!(!tracing::enabled!(target: "safefork::threads", Level::DEBUG));
    });
}

#[test]
fn json_verbose_enables_info() {
    let sub = build(
        SubscriberConfig::builder()
            .format(LogFormat::Json)
            .verbose(1)
            .build(),
    );
    with_default(sub, || {
        assert!(tracing::enabled!(Level::INFO));
    });
}
