use std::fmt::{self, Display};

/// Final metrics of a run, written to the results file and the log. The
/// interconnect and thermal numbers are raw (non-normalized); the cost is
/// the adapted phase-two cost at fit ratio 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct FinalReport {
    pub valid: bool,
    pub cost: f64,
    pub max_occupation: f64,
    pub hpwl: f64,
    pub tsvs: f64,
    pub thermal: f64,
    pub runtime_secs: f64,
}

impl Display for FinalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.valid {
            writeln!(f, "No fitting solution found; metrics below describe the best-effort layout.")?;
        }
        writeln!(f, "Final (adapted) cost: {}", self.cost)?;
        writeln!(f, " Max die occupation: {}", self.max_occupation)?;
        writeln!(f, " HPWL: {}", self.hpwl)?;
        writeln!(f, " TSVs: {}", self.tsvs)?;
        writeln!(f, " Temp cost (no real temp): {}", self.thermal)?;
        write!(f, "Runtime: {} s", self.runtime_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lists_all_metrics() {
        let report = FinalReport {
            valid: true,
            cost: 1.25,
            max_occupation: 0.8,
            hpwl: 42.0,
            tsvs: 3.0,
            thermal: 7.5,
            runtime_secs: 0.25,
        };
        let s = report.to_string();
        assert!(s.contains("Final (adapted) cost: 1.25"));
        assert!(s.contains("HPWL: 42"));
        assert!(s.contains("TSVs: 3"));
        assert!(s.contains("Runtime: 0.25 s"));
        assert!(!s.contains("best-effort"));

        let s = FinalReport::default().to_string();
        assert!(s.contains("best-effort"));
    }
}
