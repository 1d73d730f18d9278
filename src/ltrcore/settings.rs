use serde::{Serialize, Deserialize};
use std::fs;
use std::path::Path;
use crate::ltrcore::Result;

#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
#[serde(default)]
pub struct LtrSettings {
    // hard gate, checked each time a ranking query builds its weight
    plugin_enabled: bool,
    // default for queries that don't say whether to cache feature scores
    feature_score_cache: bool,
    // documents per partition when building an index
    segment_size: usize,
}

impl Default for LtrSettings {
    fn default() -> Self {
        LtrSettings {
            plugin_enabled: true,
            feature_score_cache: true,
            segment_size: 1000,
        }
    }
}

impl LtrSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_str(cfg: &str) -> Self {
        match serde_yaml::from_str(cfg) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("invalid ltr settings, using defaults: {}", e);
                Self::default()
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    pub fn is_plugin_enabled(&self) -> bool {
        self.plugin_enabled
    }

    pub fn set_plugin_enabled(&mut self, enabled: bool) {
        self.plugin_enabled = enabled;
    }

    pub fn feature_score_cache(&self) -> bool {
        self.feature_score_cache
    }

    pub fn set_feature_score_cache(&mut self, enabled: bool) {
        self.feature_score_cache = enabled;
    }

    pub fn segment_size(&self) -> usize {
        self.segment_size.max(1)
    }

    pub fn set_segment_size(&mut self, size: usize) {
        self.segment_size = size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_syntax() {
        let cfg_str =
"plugin_enabled: false
segment_size: 2
";
        let settings = LtrSettings::from_str(cfg_str);
        assert!(!settings.is_plugin_enabled());
        assert!(settings.feature_score_cache());
        assert_eq!(settings.segment_size(), 2);
    }

    #[test]
    fn test_invalid_yaml_falls_back() {
        let settings = LtrSettings::from_str("plugin_enabled: [oops");
        assert_eq!(settings, LtrSettings::default());
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(crate::ltrcore::CFG_NAME);
        fs::write(&path, "feature_score_cache: false\n").unwrap();
        let settings = LtrSettings::from_path(&path).unwrap();
        assert!(!settings.feature_score_cache());
        assert!(settings.is_plugin_enabled());
        assert!(LtrSettings::from_path(&dir.path().join("missing.yaml")).is_err());
    }
}
