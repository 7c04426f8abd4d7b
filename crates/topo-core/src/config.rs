//! Pipeline presentation settings

/// Settings passed explicitly to [`crate::ReconciliationPipeline::new`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Unchanged lines around each diff hunk
    pub context_lines: usize,

    /// Use ANSI colours in operator output
    pub color: bool,

    /// Program name used in follow-up guidance
    pub program_name: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            context_lines: 3,
            color: false,
            program_name: "topoctl".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create with defaults
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set diff context size
    #[inline]
    #[must_use]
    pub fn with_context_lines(mut self, lines: usize) -> Self {
        self.context_lines = lines;
        self
    }

    /// Enable or disable colour
    #[inline]
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Set program name shown in guidance
    #[inline]
    #[must_use]
    pub fn with_program_name(mut self, name: impl Into<String>) -> Self {
        self.program_name = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = PipelineConfig::new()
            .with_context_lines(1)
            .with_color(true)
            .with_program_name("tiup-cluster");
        assert_eq!(config.context_lines, 1);
        assert!(config.color);
        assert_eq!(config.program_name, "tiup-cluster");
        assert_eq!(PipelineConfig::default().context_lines, 3);
    }
}
