use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::progress::ProgressEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShaderQuality {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformancePreset {
    Quality,
    Performance,
}

impl PerformancePreset {
    /// Render, simulation and shadow distance in chunks.
    pub fn view_distance(self) -> u32 {
        match self {
            PerformancePreset::Quality => 12,
            PerformancePreset::Performance => 8,
        }
    }
}

impl FromStr for ShaderQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(ShaderQuality::Low),
            "medium" => Ok(ShaderQuality::Medium),
            "high" => Ok(ShaderQuality::High),
            other => Err(format!("unknown shader quality {other:?} (expected low, medium or high)")),
        }
    }
}

impl FromStr for PerformancePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quality" => Ok(PerformancePreset::Quality),
            "performance" => Ok(PerformancePreset::Performance),
            other => Err(format!("unknown preset {other:?} (expected quality or performance)")),
        }
    }
}

/// What the user asked for. Fixed for the lifetime of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRequest {
    pub destination_path: PathBuf,
    pub shader_enabled: bool,
    pub shader_quality: ShaderQuality,
    pub performance_preset: PerformancePreset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallStage {
    Idle,
    Cleaning,
    Downloading,
    Extracting,
    Patching,
    Done,
    Failed,
    Cancelled,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstallStage::Idle => "idle",
            InstallStage::Cleaning => "cleaning",
            InstallStage::Downloading => "downloading",
            InstallStage::Extracting => "extracting",
            InstallStage::Patching => "patching",
            InstallStage::Done => "done",
            InstallStage::Failed => "failed",
            InstallStage::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum InstallOutcome {
    Success,
    Cancelled,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InstallEventKind {
    Progress(ProgressEvent),
    Finished(InstallOutcome),
}

/// Event delivered to the subscriber of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstallEvent {
    pub run_id: Uuid,
    pub kind: InstallEventKind,
}
