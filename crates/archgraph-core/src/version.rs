//! Versioned progress records and the rules that derive progress from a
//! component's semantic version.
//!
//! A phase tag maps to a major version number: `mvp` is major 0, `v1` is
//! major 1, `v2` is major 2 and so on. A component at `0.7.5` is therefore
//! 75% through its `mvp` phase, has not started `v1`, and once it reaches
//! `1.0.0` the `mvp` phase is complete.

use crate::NodeId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tags created for every new component unless configured otherwise.
pub const DEFAULT_VERSION_TAGS: [&str; 4] = ["overview", "mvp", "v1", "v2"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VersionStatus {
    Planned,
    InProgress,
    Complete,
}

impl fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VersionStatus::Planned => "planned",
            VersionStatus::InProgress => "in-progress",
            VersionStatus::Complete => "complete",
        };
        f.write_str(s)
    }
}

impl Default for VersionStatus {
    fn default() -> Self {
        VersionStatus::Planned
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub node_id: NodeId,
    pub version: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub status: VersionStatus,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Version {
    pub fn new(node_id: impl Into<NodeId>, version: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            version: version.into(),
            content: None,
            progress: 0,
            status: VersionStatus::Planned,
            updated_at: Utc::now(),
        }
    }

    /// A record whose progress and status follow `current_version`.
    pub fn derived(
        node_id: impl Into<NodeId>,
        version: impl Into<String>,
        current_version: Option<&str>,
    ) -> Self {
        let mut record = Self::new(node_id, version);
        record.apply_progress(derive_progress(current_version, &record.version));
        record
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.apply_progress(progress);
        self
    }

    pub fn is_phase(&self) -> bool {
        phase_major(&self.version).is_some()
    }

    /// Sets progress and the status that follows from it.
    pub fn apply_progress(&mut self, progress: u8) {
        self.progress = progress.min(100);
        self.status = derive_status(self.progress);
    }

    /// Re-derives a phase-tagged record from a new `current_version`.
    /// Returns false, leaving the record untouched, for non-phase tags.
    pub fn recalculate(&mut self, current_version: Option<&str>) -> bool {
        if !self.is_phase() {
            return false;
        }
        self.apply_progress(derive_progress(current_version, &self.version));
        self.updated_at = Utc::now();
        true
    }
}

/// Major version a phase tag stands for, `None` when the tag is not a phase.
pub fn phase_major(tag: &str) -> Option<u64> {
    if tag == "mvp" {
        return Some(0);
    }
    let digits = tag.strip_prefix('v')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match digits.parse::<u64>() {
        Ok(major) if major >= 1 => Some(major),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemVer {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SemVer {
    /// Parses `major.minor[.patch]`, tolerating a leading `v` and a
    /// pre-release suffix on the patch (`1.2.3-beta` reads as `1.2.3`).
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let mut parts = trimmed.splitn(3, '.');

        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        let patch = match parts.next() {
            None => 0,
            Some(raw) => {
                let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
                if digits.is_empty() {
                    return None;
                }
                digits.parse().ok()?
            }
        };

        Some(Self {
            major,
            minor,
            patch,
        })
    }
}

/// Completion percentage of `tag` for a component currently at `current_version`.
pub fn derive_progress(current_version: Option<&str>, tag: &str) -> u8 {
    let Some(phase) = phase_major(tag) else {
        return 0;
    };
    let Some(semver) = current_version.and_then(SemVer::parse) else {
        return 0;
    };

    if semver.major > phase {
        100
    } else if semver.major < phase {
        0
    } else {
        semver
            .minor
            .saturating_mul(10)
            .saturating_add(semver.patch)
            .min(100) as u8
    }
}

pub fn derive_status(progress: u8) -> VersionStatus {
    match progress {
        0 => VersionStatus::Planned,
        p if p >= 100 => VersionStatus::Complete,
        _ => VersionStatus::InProgress,
    }
}
