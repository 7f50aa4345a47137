// crates/observers/src/threads.rs

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::{CheckKind, Diagnostic, ObserveError, Observer, Result, Verdict};

const TASK_DIR: &str = "/proc/self/task";

/// One OS thread found by the census.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ThreadEntry {
    pub tid: i32,
    pub name: Option<String>,
}

/// Counts the OS threads of the current process.
///
/// Only the calling thread survives `fork(2)`; locks held by any other
/// thread stay locked forever in the child. The census is safe iff it finds
/// exactly one thread.
#[derive(Clone, Debug)]
pub struct ThreadCensus {
    task_dir: PathBuf,
}

impl Default for ThreadCensus {
    fn default() -> Self {
        Self::system()
    }
}

impl ThreadCensus {
    /// Census of the running process.
    pub fn system() -> Self {
        Self {
            task_dir: PathBuf::from(TASK_DIR),
        }
    }

    /// Census over a `task` directory laid out like `/proc/<pid>/task`.
    pub fn with_task_dir(task_dir: impl Into<PathBuf>) -> Self {
        Self {
            task_dir: task_dir.into(),
        }
    }

    pub fn task_dir(&self) -> &Path {
        &self.task_dir
    }

    /// Every thread currently listed, in ascending tid order.
    pub fn enumerate(&self) -> Result<Vec<ThreadEntry>> {
        let procfs = cfg!(any(target_os = "linux", target_os = "android"));
        if !procfs && self.task_dir == Path::new(TASK_DIR) {
            return Err(ObserveError::Unsupported {
                check: CheckKind::Threads,
            });
        }
        read_tasks(&self.task_dir).map_err(|source| ObserveError::Io {
            check: CheckKind::Threads,
            source,
        })
    }
}

fn read_tasks(dir: &Path) -> io::Result<Vec<ThreadEntry>> {
    let mut threads = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let Some(tid) = entry
            .file_name()
            .to_str()
            .and_then(|s| s.parse::<i32>().ok())
        else {
            continue;
        };
        // A thread may exit between readdir and this read.
        let name = fs::read_to_string(entry.path().join("comm"))
            .ok()
            .map(|s| s.trim_end_matches('\n').to_string());
        trace!(target: "safefork::threads", tid, name = name.as_deref(), "thread");
        threads.push(ThreadEntry { tid, name });
    }
    threads.sort_by_key(|t| t.tid);
    Ok(threads)
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn caller_tid() -> i32 {
    nix::unistd::gettid().as_raw()
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn caller_tid() -> i32 {
    -1
}

impl Observer for ThreadCensus {
    fn check(&self) -> CheckKind {
        CheckKind::Threads
    }

    fn observe(&self) -> Result<Verdict> {
        let threads = self.enumerate()?;
        debug!(target: "safefork::threads", count = threads.len(), "thread census");
        // A live process always lists itself.
        if threads.is_empty() {
            return Err(ObserveError::Io {
                check: CheckKind::Threads,
                source: io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no tasks listed in {}", self.task_dir.display()),
                ),
            });
        }
        if threads.len() == 1 {
            return Ok(Verdict::safe(CheckKind::Threads));
        }
        let me = caller_tid();
        let mut others: Vec<Diagnostic> = threads
            .iter()
            .filter(|t| t.tid != me)
            .map(|t| Diagnostic::Thread {
                tid: t.tid,
                name: t.name.clone(),
            })
            .collect();
        // The caller is not in this listing (fixture tree); report all but one.
        if others.len() == threads.len() {
            others.remove(0);
        }
        Ok(Verdict::unsafe_with(CheckKind::Threads, others))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn task(dir: &Path, tid: i32, name: Option<&str>) {
        let t = dir.join(tid.to_string());
        fs::create_dir(&t).unwrap();
        if let Some(name) = name {
            fs::write(t.join("comm"), format!("{name}\n")).unwrap();
        }
    }

    #[test]
    fn single_task_is_safe() {
        let dir = tempdir().unwrap();
        task(dir.path(), 5_000_100, Some("main"));
        let v = ThreadCensus::with_task_dir(dir.path()).observe().unwrap();
        assert!(v.safe);
        assert!(v.diagnostics.is_empty());
    }

    #[test]
    fn extra_tasks_are_reported() {
        let dir = tempdir().unwrap();
        task(dir.path(), 5_000_100, Some("main"));
        task(dir.path(), 5_000_101, Some("worker"));
        task(dir.path(), 5_000_102, None);
        let v = ThreadCensus::with_task_dir(dir.path()).observe().unwrap();
        assert!(!v.safe);
        assert_eq!(
            v.diagnostics,
            vec![
                Diagnostic::Thread {
                    tid: 5_000_101,
                    name: Some("worker".into())
                },
                Diagnostic::Thread {
                    tid: 5_000_102,
                    name: None
                },
            ]
        );
    }

    #[test]
    fn non_numeric_entries_are_ignored() {
        let dir = tempdir().unwrap();
        task(dir.path(), 5_000_007, Some("main"));
        fs::create_dir(dir.path().join("self")).unwrap();
        let threads = ThreadCensus::with_task_dir(dir.path()).enumerate().unwrap();
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].name.as_deref(), Some("main"));
    }

    #[test]
    fn missing_task_dir_is_an_error() {
        let dir = tempdir().unwrap();
        let err = ThreadCensus::with_task_dir(dir.path().join("gone"))
            .observe()
            .unwrap_err();
        assert_eq!(err.check(), CheckKind::Threads);
        assert!(matches!(err, ObserveError::Io { .. }));
    }

    #[test]
    fn empty_task_dir_is_indeterminate() {
        let dir = tempdir().unwrap();
        let err = ThreadCensus::with_task_dir(dir.path()).observe().unwrap_err();
        assert_eq!(err.check(), CheckKind::Threads);
        match err {
            ObserveError::Io { source, .. } => assert_eq!(source.kind(), io::ErrorKind::NotFound),
            other => panic!("unexpected {other:?}"),
        }
    }
}
