// src/lib.rs

//! Decide whether it is safe to fork the current process, and fork only when
//! it is.
//!
//! Forking is considered safe when the process has a single thread, no
//! signals are pending, no async runtime is driving the calling thread and
//! the allocator freeze is held:
//!
//! ```no_run
//! use safefork::{FreezeGuard, ForkResult, safe_fork};
//!
//! let _freeze = FreezeGuard::new();
//! match safe_fork() {
//!     Ok(ForkResult::Child) => std::process::exit(0),
//!     Ok(ForkResult::Parent { child }) => println!("forked {child}"),
//!     Err(err) => eprintln!("{err}"),
//! }
//! ```

mod config;
mod run;

pub use config::{CheckConfig, CheckConfigBuilder};
pub use run::{Error, evaluate_with_config, is_safe_to_fork_with_config, safe_fork_with_config};

pub use logging::{DebugFlag, LogFormat};
pub use observers::{
    CheckKind, Diagnostic, FreezeGuard, ObserveError, Observer, Verdict, freeze, freeze_count,
    unfreeze,
};
pub use oracle::{
    ForkError, ForkResult, IntrospectionPolicy, Mode, Oracle, OracleConfig, Report,
    default_observers, is_safe_to_fork, safe_fork,
};
