use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Multisample count requested from the GL config picker.
    pub samples: u8,
    pub vsync: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "OpenGLtest".to_string(),
            width: 1280,
            height: 720,
            samples: 4,
            vsync: true,
        }
    }
}
