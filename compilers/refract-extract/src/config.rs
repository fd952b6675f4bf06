use serde::{Deserialize, Serialize};

/// Tunables of frame extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Maximum depth of a frame below its own root token.
    pub frame_height: u32,
    /// Part-of-speech tags left out of yield text.
    pub yield_exclusions: Vec<String>,
}

impl ExtractConfig {
    pub const DEFAULT_HEIGHT: u32 = 2;

    pub fn with_height(mut self, frame_height: u32) -> Self {
        self.frame_height = frame_height;
        self
    }

    pub(crate) fn excludes_from_yield(&self, pos: &str) -> bool {
        self.yield_exclusions.iter().any(|tag| tag == pos)
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            frame_height: Self::DEFAULT_HEIGHT,
            yield_exclusions: vec!["DT".to_string(), "IN".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ExtractConfig = serde_json::from_str(r#"{ "frame_height": 1 }"#).unwrap();
        assert_eq!(config.frame_height, 1);
        assert_eq!(config.yield_exclusions, vec!["DT", "IN"]);

        let empty: ExtractConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, ExtractConfig::default());
    }

    #[test]
    fn test_exclusions_are_exact() {
        let config = ExtractConfig::default().with_height(4);
        assert_eq!(config.frame_height, 4);
        assert!(config.excludes_from_yield("DT"));
        assert!(!config.excludes_from_yield("dt"));
        assert!(!config.excludes_from_yield("NN"));
    }
}
