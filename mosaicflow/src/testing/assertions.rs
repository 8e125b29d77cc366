//! Test assertions for stage outputs.

use crate::core::{StageOutput, StageStatus, StageSummary};

/// Asserts that the output indicates success.
pub fn assert_output_succeeded(output: &StageOutput) {
    assert!(
        output.is_success(),
        "Expected success, got status: {:?} ({:?})",
        output.status,
        output.error
    );
}

/// Asserts that the output indicates failure.
pub fn assert_output_failed(output: &StageOutput) {
    assert!(
        output.is_failure(),
        "Expected failure, got status: {:?}",
        output.status
    );
}

/// Asserts that the output has the expected status.
pub fn assert_output_status(output: &StageOutput, expected: StageStatus) {
    assert_eq!(
        output.status, expected,
        "Expected status {:?}, got {:?}",
        expected, output.status
    );
}

/// Asserts the attempted/achieved counts.
pub fn assert_output_summary(output: &StageOutput, attempted: usize, achieved: usize) {
    assert_eq!(
        output.summary,
        StageSummary::new(attempted, achieved),
        "Expected summary attempted {attempted}, achieved {achieved}, got {}",
        output.summary
    );
}

/// Asserts that the output data contains a specific value.
pub fn assert_output_value(output: &StageOutput, key: &str, expected: &serde_json::Value) {
    let actual = output.get(key);
    assert_eq!(
        actual,
        Some(expected),
        "Expected value {:?} for key '{}', got {:?}",
        expected,
        key,
        actual
    );
}

/// Asserts that the output is retryable.
pub fn assert_output_retryable(output: &StageOutput) {
    assert!(output.retryable, "Expected output to be retryable, but it isn't");
}
