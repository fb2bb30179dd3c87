//! Validation outcome — the four-variant result of a store validation.
//!
//! The outcome is the payload the watchers hand back to hook scripts, so it
//! has two serialized forms with different jobs:
//!
//! - **Structured** (JSON): shape-uniform `{valid, errors, warnings}` for
//!   every variant. The wire shape is deliberately variant-blind so that a
//!   reader cannot drop warnings on the failure path — the historical bug
//!   this module exists to prevent.
//! - **Text** (`Display`): first line is the literal `PASSED` or `FAILED`
//!   token (hook scripts grep for it without parsing), followed by labeled
//!   bullet lists.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ValidationOutcome
// ---------------------------------------------------------------------------

/// Result of validating the loaded model resources.
///
/// Exactly one of four variants; `is_valid` ⇔ `Success` or
/// `SuccessWithWarnings`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireOutcome", into = "WireOutcome")]
pub enum ValidationOutcome {
    /// Valid, no errors, no warnings.
    Success,
    /// Valid, with at least one warning.
    SuccessWithWarnings(Vec<String>),
    /// Invalid, with at least one error and no warnings.
    Failure(Vec<String>),
    /// Invalid, with at least one error and at least one warning.
    FailureWithWarnings {
        errors: Vec<String>,
        warnings: Vec<String>,
    },
}

impl ValidationOutcome {
    /// A clean pass.
    #[must_use]
    pub const fn success() -> Self {
        Self::Success
    }

    /// A pass that raised warnings. Empty input collapses to [`Self::Success`].
    #[must_use]
    pub fn success_with_warnings(warnings: Vec<String>) -> Self {
        if warnings.is_empty() {
            Self::Success
        } else {
            Self::SuccessWithWarnings(warnings)
        }
    }

    /// A failure with no warnings.
    #[must_use]
    pub const fn failure(errors: Vec<String>) -> Self {
        Self::Failure(errors)
    }

    /// A failure that also raised warnings. Empty warnings collapse to
    /// [`Self::Failure`].
    #[must_use]
    pub fn failure_with_warnings(errors: Vec<String>, warnings: Vec<String>) -> Self {
        if warnings.is_empty() {
            Self::Failure(errors)
        } else {
            Self::FailureWithWarnings { errors, warnings }
        }
    }

    /// Build the canonical variant from collected rule output.
    ///
    /// This is the single normalization point: every (errors, warnings) pair
    /// maps to exactly one variant.
    #[must_use]
    pub fn from_parts(errors: Vec<String>, warnings: Vec<String>) -> Self {
        match (errors.is_empty(), warnings.is_empty()) {
            (true, true) => Self::Success,
            (true, false) => Self::SuccessWithWarnings(warnings),
            (false, true) => Self::Failure(errors),
            (false, false) => Self::FailureWithWarnings { errors, warnings },
        }
    }

    /// Whether the model state is valid.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Success | Self::SuccessWithWarnings(_))
    }

    /// Whether any errors were raised.
    #[must_use]
    pub const fn has_errors(&self) -> bool {
        !self.is_valid()
    }

    /// Whether any warnings were raised — on success *or* failure.
    #[must_use]
    pub const fn has_warnings(&self) -> bool {
        matches!(
            self,
            Self::SuccessWithWarnings(_) | Self::FailureWithWarnings { .. }
        )
    }

    /// The errors, empty for the success variants.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        match self {
            Self::Success | Self::SuccessWithWarnings(_) => &[],
            Self::Failure(errors) | Self::FailureWithWarnings { errors, .. } => errors,
        }
    }

    /// The warnings, empty for the warning-free variants.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        match self {
            Self::Success | Self::Failure(_) => &[],
            Self::SuccessWithWarnings(warnings)
            | Self::FailureWithWarnings { warnings, .. } => warnings,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire form — shape-uniform {valid, errors, warnings}
// ---------------------------------------------------------------------------

/// The on-disk JSON shape, identical for all four variants.
#[derive(Serialize, Deserialize)]
struct WireOutcome {
    valid: bool,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl From<ValidationOutcome> for WireOutcome {
    fn from(outcome: ValidationOutcome) -> Self {
        Self {
            valid: outcome.is_valid(),
            errors: outcome.errors().to_vec(),
            warnings: outcome.warnings().to_vec(),
        }
    }
}

impl From<WireOutcome> for ValidationOutcome {
    fn from(wire: WireOutcome) -> Self {
        // `valid` is derived state; the (errors, warnings) pair is
        // authoritative. An inconsistent record (valid=true with errors)
        // normalizes to the variant the lists imply.
        Self::from_parts(wire.errors, wire.warnings)
    }
}

// ---------------------------------------------------------------------------
// Text form
// ---------------------------------------------------------------------------

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", if self.is_valid() { "PASSED" } else { "FAILED" })?;
        if self.has_errors() {
            writeln!(f, "\nERRORS")?;
            for e in self.errors() {
                writeln!(f, "  - {e}")?;
            }
        }
        if self.has_warnings() {
            writeln!(f, "\nWARNINGS")?;
            for w in self.warnings() {
                writeln!(f, "  - {w}")?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn validity_per_variant() {
        assert!(ValidationOutcome::success().is_valid());
        assert!(ValidationOutcome::success_with_warnings(strings(&["w"])).is_valid());
        assert!(!ValidationOutcome::failure(strings(&["e"])).is_valid());
        assert!(
            !ValidationOutcome::failure_with_warnings(strings(&["e"]), strings(&["w"])).is_valid()
        );
    }

    #[test]
    fn empty_warnings_collapse() {
        assert_eq!(
            ValidationOutcome::success_with_warnings(vec![]),
            ValidationOutcome::Success
        );
        assert_eq!(
            ValidationOutcome::failure_with_warnings(strings(&["e"]), vec![]),
            ValidationOutcome::Failure(strings(&["e"]))
        );
    }

    #[test]
    fn json_round_trip_all_variants() {
        let variants = vec![
            ValidationOutcome::success(),
            ValidationOutcome::success_with_warnings(strings(&["w1", "w2"])),
            ValidationOutcome::failure(strings(&["e1"])),
            ValidationOutcome::failure_with_warnings(strings(&["e1"]), strings(&["w1"])),
        ];
        for outcome in variants {
            let json = serde_json::to_string(&outcome).expect("serialize");
            let back: ValidationOutcome = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(back, outcome, "round trip of {json}");
        }
    }

    // Regression: a failure record must not lose its warnings on read.
    #[test]
    fn failure_warnings_survive_deserialization() {
        let json = r#"{"valid":false,"errors":["e1"],"warnings":["w1"]}"#;
        let outcome: ValidationOutcome = serde_json::from_str(json).expect("deserialize");
        assert!(!outcome.is_valid());
        assert!(outcome.has_warnings());
        assert_eq!(outcome.warnings(), ["w1".to_owned()]);
    }

    #[test]
    fn inconsistent_valid_flag_normalizes_from_lists() {
        let json = r#"{"valid":true,"errors":["e1"],"warnings":[]}"#;
        let outcome: ValidationOutcome = serde_json::from_str(json).expect("deserialize");
        assert!(!outcome.is_valid());
    }

    #[test]
    fn text_form_contains_passed_token() {
        let text = ValidationOutcome::success().to_string();
        assert!(text.starts_with("PASSED"));
    }

    #[test]
    fn text_form_lists_errors_and_warnings() {
        let outcome =
            ValidationOutcome::failure_with_warnings(strings(&["broken ref"]), strings(&["lonely"]));
        let text = outcome.to_string();
        assert!(text.starts_with("FAILED"));
        assert!(text.contains("ERRORS"));
        assert!(text.contains("  - broken ref"));
        assert!(text.contains("WARNINGS"));
        assert!(text.contains("  - lonely"));
    }

    #[test]
    fn success_text_has_no_section_headings() {
        let text = ValidationOutcome::success().to_string();
        assert!(!text.contains("ERRORS"));
        assert!(!text.contains("WARNINGS"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_messages() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[ -~]{1,40}", 0..4)
    }

    proptest! {
        // Every (errors, warnings) pair survives a JSON round trip intact,
        // including warnings carried by failures.
        #[test]
        fn wire_round_trip(errors in arb_messages(), warnings in arb_messages()) {
            let outcome = ValidationOutcome::from_parts(errors.clone(), warnings.clone());
            let json = serde_json::to_string(&outcome).expect("serialize");
            let back: ValidationOutcome = serde_json::from_str(&json).expect("deserialize");
            prop_assert_eq!(&back, &outcome);
            prop_assert_eq!(back.errors(), errors.as_slice());
            prop_assert_eq!(back.warnings(), warnings.as_slice());
        }

        // The text form always opens with exactly one of the two tokens.
        #[test]
        fn text_token(errors in arb_messages(), warnings in arb_messages()) {
            let outcome = ValidationOutcome::from_parts(errors, warnings);
            let text = outcome.to_string();
            let first = text.lines().next().unwrap_or_default();
            prop_assert!(first == "PASSED" || first == "FAILED");
            prop_assert_eq!(first == "PASSED", outcome.is_valid());
        }
    }
}
