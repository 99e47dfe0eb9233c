//! Conversion reports and recovered-condition diagnostics

use serde::Serialize;
use std::fmt;

/// A recovered condition worth surfacing to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionWarning {
    pub context: String,
    pub message: String,
}

impl fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.context, self.message)
    }
}

/// Collects warnings for a pass and mirrors them to the log
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<ConversionWarning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, context: impl Into<String>, message: impl Into<String>) {
        let warning = ConversionWarning {
            context: context.into(),
            message: message.into(),
        };
        tracing::warn!(context = %warning.context, "{}", warning.message);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[ConversionWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<ConversionWarning> {
        self.warnings
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionMode {
    Extract,
    Inject,
}

/// How one step of a pass ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StepOutcome {
    Completed { definitions: usize, placements: usize },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub step: String,
    pub outcome: StepOutcome,
}

/// Summary of an extraction or injection pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    pub mode: ConversionMode,
    pub steps: Vec<StepReport>,
    pub warnings: Vec<ConversionWarning>,
}

impl ConversionReport {
    pub fn new(mode: ConversionMode) -> Self {
        Self {
            mode,
            steps: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn skipped(&self) -> impl Iterator<Item = &StepReport> {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, StepOutcome::Skipped { .. }))
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.skipped().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_collect() {
        let mut diag = Diagnostics::new();
        diag.warn("vehicle", "no remap entry for objects\\vehicles\\x\\x");
        assert_eq!(diag.warnings().len(), 1);
        assert_eq!(
            diag.warnings()[0].to_string(),
            "[vehicle] no remap entry for objects\\vehicles\\x\\x"
        );
    }

    #[test]
    fn test_report_clean() {
        let mut report = ConversionReport::new(ConversionMode::Inject);
        report.steps.push(StepReport {
            step: "scenery".into(),
            outcome: StepOutcome::Completed {
                definitions: 1,
                placements: 2,
            },
        });
        assert!(report.is_clean());

        report.steps.push(StepReport {
            step: "crate".into(),
            outcome: StepOutcome::Skipped {
                reason: "Field not found".into(),
            },
        });
        assert!(!report.is_clean());
        assert_eq!(report.skipped().count(), 1);
    }
}
