use serde::{Deserialize, Serialize};
use std::path::Path;

/// Host-provided settings for one annotator instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old configs
pub struct AnnotatorConfig {
    /// Surface width in pixels, measured once at mount
    pub width: u32,
    /// Surface height in pixels, measured once at mount
    pub height: u32,
    /// Hex color for the next stroke
    pub color: String,
    pub thickness: u32,
    pub disabled: bool,
    /// Path of the image shown behind the annotations
    pub background_source: Option<String>,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            color: "#000000".to_owned(),
            thickness: 2,
            disabled: false,
            background_source: None,
        }
    }
}

impl AnnotatorConfig {
    /// Read a JSON config file
    pub fn load(path: impl AsRef<Path>) -> crate::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}
