//! Model Version Record - registry entry promoted from a run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A numbered version of a registered model.
///
/// `source` points at the artifact the version was promoted from, as
/// `runs:/<run_id>/<artifact_path>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelVersionRecord {
    name: String,
    version: u32,
    run_id: String,
    artifact_path: String,
    created_at: DateTime<Utc>,
}

impl ModelVersionRecord {
    /// Create a new model version record.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: u32,
        run_id: impl Into<String>,
        artifact_path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            run_id: run_id.into(),
            artifact_path: artifact_path.into(),
            created_at: Utc::now(),
        }
    }

    /// Registered model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version number, starting at 1.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Run the artifact came from.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Run-relative artifact path.
    #[must_use]
    pub fn artifact_path(&self) -> &str {
        &self.artifact_path
    }

    /// `runs:/<run_id>/<artifact_path>`
    #[must_use]
    pub fn source(&self) -> String {
        format!("runs:/{}/{}", self.run_id, self.artifact_path)
    }

    /// Registration timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_uri() {
        let mv = ModelVersionRecord::new("CaliforniaHousingRegressor", 1, "abc", "model");
        assert_eq!(mv.source(), "runs:/abc/model");
        assert_eq!(mv.version(), 1);
    }
}
