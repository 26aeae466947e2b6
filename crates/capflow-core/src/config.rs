//! Capture configuration
//!
//! Defaults match the mobile front-end; every field can be overridden from
//! TOML:
//!
//! ```toml
//! max_audit_media = 20
//! max_bda_media = 5
//! max_steps = 200
//! analysis_timeout_ms = 30000
//! journal_enabled = true
//! ```

use capflow_model::ArtifactKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// TOML did not parse
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values parsed but are unusable
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Capture configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Top-level media cap for audits
    pub max_audit_media: usize,
    /// Top-level media cap for breakdown analyses
    pub max_bda_media: usize,
    /// Step cap for guides and maps
    pub max_steps: usize,
    /// How long an analysis may run before it is reported failed
    pub analysis_timeout_ms: u64,
    /// Record transitions in the session journal
    pub journal_enabled: bool,
}

impl CaptureConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With audit media cap
    #[inline]
    #[must_use]
    pub fn with_max_audit_media(mut self, max: usize) -> Self {
        self.max_audit_media = max;
        self
    }

    /// With BDA media cap
    #[inline]
    #[must_use]
    pub fn with_max_bda_media(mut self, max: usize) -> Self {
        self.max_bda_media = max;
        self
    }

    /// With step cap
    #[inline]
    #[must_use]
    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max;
        self
    }

    /// With analysis timeout
    #[inline]
    #[must_use]
    pub fn with_analysis_timeout(mut self, timeout: Duration) -> Self {
        self.analysis_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With journal on or off
    #[inline]
    #[must_use]
    pub fn with_journal(mut self, enabled: bool) -> Self {
        self.journal_enabled = enabled;
        self
    }

    /// Top-level media cap for `kind`; `None` if the kind has no bucket
    #[must_use]
    pub fn media_cap(&self, kind: ArtifactKind) -> Option<usize> {
        match kind {
            ArtifactKind::Audit => Some(self.max_audit_media),
            ArtifactKind::Bda => Some(self.max_bda_media),
            ArtifactKind::Guide | ArtifactKind::Map => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_millis(self.analysis_timeout_ms)
    }

    /// Parse from TOML text; missing keys take their defaults
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] on malformed TOML and
    /// [`ConfigError::Invalid`] on unusable values
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// See [`CaptureConfig::from_toml_str`]; also [`ConfigError::Io`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Reject values no workflow could run with
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the offending key
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_audit_media == 0 {
            return Err(ConfigError::Invalid("max_audit_media must be at least 1".into()));
        }
        if self.max_bda_media == 0 {
            return Err(ConfigError::Invalid("max_bda_media must be at least 1".into()));
        }
        if self.max_steps == 0 {
            return Err(ConfigError::Invalid("max_steps must be at least 1".into()));
        }
        if self.analysis_timeout_ms == 0 {
            return Err(ConfigError::Invalid("analysis_timeout_ms must be positive".into()));
        }
        Ok(())
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_audit_media: 20,
            max_bda_media: 5,
            max_steps: 200,
            analysis_timeout_ms: 30_000,
            journal_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CaptureConfig::new();
        assert_eq!(config.media_cap(ArtifactKind::Audit), Some(20));
        assert_eq!(config.media_cap(ArtifactKind::Guide), None);
        assert_eq!(config.analysis_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = CaptureConfig::from_toml_str("max_audit_media = 3\n").unwrap();
        assert_eq!(config.max_audit_media, 3);
        assert_eq!(config.max_bda_media, 5);
        assert!(config.journal_enabled);
    }

    #[test]
    fn zero_cap_rejected() {
        let err = CaptureConfig::from_toml_str("max_steps = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_toml_rejected() {
        assert!(matches!(
            CaptureConfig::from_toml_str("max_steps = \"many\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn builder() {
        let config = CaptureConfig::new()
            .with_max_audit_media(2)
            .with_analysis_timeout(Duration::from_millis(50))
            .with_journal(false);
        assert_eq!(config.max_audit_media, 2);
        assert_eq!(config.analysis_timeout_ms, 50);
        assert!(!config.journal_enabled);
    }
}
