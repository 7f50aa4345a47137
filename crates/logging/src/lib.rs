// crates/logging/src/lib.rs

//! Subscriber setup for the `safefork` command and library.
//!
//! Every component logs under a `safefork::<component>` target. The
//! default level is warn, which is where the oracle reports unsafe checks.

mod flags;
mod formatter;
mod json_format;
mod subscriber;

pub use flags::{DebugFlag, LogFormat, SubscriberConfig, SubscriberConfigBuilder};
pub use formatter::SafeforkFormatter;
pub use json_format::JsonFormatter;
pub use subscriber::{init, subscriber};
