// crates/oracle/src/report.rs

use std::fmt;

use observers::{CheckKind, Diagnostic, Verdict};
use serde::Serialize;

/// The verdicts of one oracle evaluation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Report {
    safe: bool,
    verdicts: Vec<Verdict>,
}

impl Report {
    pub fn new(verdicts: Vec<Verdict>) -> Self {
        let safe = verdicts.iter().all(|v| v.safe);
        Self { safe, verdicts }
    }

    pub fn is_safe(&self) -> bool {
        self.safe
    }

    pub fn verdicts(&self) -> &[Verdict] {
        &self.verdicts
    }

    pub fn verdict(&self, check: CheckKind) -> Option<&Verdict> {
        self.verdicts.iter().find(|v| v.check == check)
    }

    pub fn unsafe_checks(&self) -> impl Iterator<Item = CheckKind> + '_ {
        self.verdicts.iter().filter(|v| !v.safe).map(|v| v.check)
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> + '_ {
        self.verdicts.iter().flat_map(|v| v.diagnostics.iter())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for verdict in &self.verdicts {
            let status = if verdict.safe { "safe" } else { "unsafe" };
            writeln!(f, "{:<10} {status}", verdict.check.as_str())?;
            for diagnostic in &verdict.diagnostics {
                writeln!(f, "{:11}{diagnostic}", "")?;
            }
        }
        if self.safe {
            f.write_str("safe to fork")
        } else {
            f.write_str("unsafe to fork")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_is_safe() {
        assert!(Report::new(Vec::new()).is_safe());
    }

    #[test]
    fn renders_diagnostics_under_their_check() {
        let report = Report::new(vec![
            Verdict::safe(CheckKind::Threads),
            Verdict::unsafe_with(CheckKind::Freeze, vec![Diagnostic::NotFrozen]),
        ]);
        assert_eq!(
            report.to_string(),
            concat!(
                "threads    safe\n",
                "freeze     unsafe\n",
                "           freeze count is zero\n",
                "unsafe to fork",
            )
        );
        assert_eq!(report.unsafe_checks().collect::<Vec<_>>(), [CheckKind::Freeze]);
    }

    #[test]
    fn serializes_overall_result() {
        let report = Report::new(vec![Verdict::safe(CheckKind::Signals)]);
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["safe"], true);
        assert_eq!(v["verdicts"][0]["check"], "signals");
    }
}
