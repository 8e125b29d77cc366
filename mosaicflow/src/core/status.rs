//! Stage status and kind enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of work a stage performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Reprojects and tiles an index-specific dataset.
    Warp,
    /// Generates reduced-resolution overview pyramids on the warp output.
    BuildOverviews,
    /// Relocates the result to the remote mosaic directory over ssh.
    Transfer,
    /// Registers the transferred file as a granule of a mosaic store.
    Register,
    /// A fan-out leaf that publishes a message.
    Push,
    /// Queries the product catalog.
    Search,
    /// Downloads products from the catalog.
    Download,
}

impl StageKind {
    /// The four kinds of a mosaic pipeline instance, in chain order.
    pub const MOSAIC_CHAIN: [Self; 4] = [
        Self::Warp,
        Self::BuildOverviews,
        Self::Transfer,
        Self::Register,
    ];

    /// Prefix used to derive deterministic task names.
    #[must_use]
    pub fn task_prefix(&self) -> &'static str {
        match self {
            Self::Warp => "gdal_warp_",
            Self::BuildOverviews => "gdal_addo_",
            Self::Transfer => "rsync_",
            Self::Register => "gs_add_mosaic_granule_",
            Self::Push => "task_push",
            Self::Search => "dhus_search",
            Self::Download => "dhus_download",
        }
    }

    /// Task name for the given 1-based index.
    #[must_use]
    pub fn task_name(&self, index: u32) -> String {
        format!("{}{}", self.task_prefix(), index)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warp => write!(f, "warp"),
            Self::BuildOverviews => write!(f, "build_overviews"),
            Self::Transfer => write!(f, "transfer"),
            Self::Register => write!(f, "register"),
            Self::Push => write!(f, "push"),
            Self::Search => write!(f, "search"),
            Self::Download => write!(f, "download"),
        }
    }
}

/// The execution status of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// Stage is pending execution.
    #[default]
    Pending,
    /// Stage is currently running.
    Running,
    /// Stage completed successfully.
    Ok,
    /// Stage was skipped.
    Skip,
    /// Stage failed.
    Fail,
    /// Stage exceeded its deadline.
    Timeout,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Ok => write!(f, "ok"),
            Self::Skip => write!(f, "skip"),
            Self::Fail => write!(f, "fail"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

impl StageStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ok | Self::Skip | Self::Fail | Self::Timeout)
    }

    /// Returns true if the status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok | Self::Skip)
    }

    /// Returns true if the status indicates failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Fail | Self::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_kind_display() {
        assert_eq!(StageKind::Warp.to_string(), "warp");
        assert_eq!(StageKind::BuildOverviews.to_string(), "build_overviews");
        assert_eq!(StageKind::Register.to_string(), "register");
    }

    #[test]
    fn test_task_names() {
        assert_eq!(StageKind::Warp.task_name(3), "gdal_warp_3");
        assert_eq!(StageKind::BuildOverviews.task_name(1), "gdal_addo_1");
        assert_eq!(StageKind::Transfer.task_name(5), "rsync_5");
        assert_eq!(StageKind::Register.task_name(2), "gs_add_mosaic_granule_2");
        assert_eq!(StageKind::Push.task_name(4), "task_push4");
    }

    #[test]
    fn test_stage_status_is_terminal() {
        assert!(StageStatus::Ok.is_terminal());
        assert!(StageStatus::Timeout.is_terminal());
        assert!(!StageStatus::Pending.is_terminal());
        assert!(!StageStatus::Running.is_terminal());
    }

    #[test]
    fn test_timeout_is_failure() {
        assert!(StageStatus::Timeout.is_failure());
        assert!(!StageStatus::Timeout.is_success());
    }

    #[test]
    fn test_stage_kind_serialize() {
        let json = serde_json::to_string(&StageKind::BuildOverviews).unwrap();
        assert_eq!(json, r#""build_overviews""#);

        let kind: StageKind = serde_json::from_str(r#""transfer""#).unwrap();
        assert_eq!(kind, StageKind::Transfer);
    }
}
