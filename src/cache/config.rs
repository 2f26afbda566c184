//! Flusher configuration.
//!
//! Controlled via the `[flusher]` section of `tagflush.toml`.

use serde::Deserialize;

use crate::application::repos::VisibilityOverrides;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FlusherConfig {
    /// When false, registrations are ignored and commit flushes nothing.
    pub enabled: bool,
    /// Let render contexts used for asset lookups see hidden nodes.
    pub show_invisible_content: bool,
    /// Let render contexts used for asset lookups see access-restricted nodes.
    pub show_inaccessible_content: bool,
}

impl Default for FlusherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            show_invisible_content: true,
            show_inaccessible_content: true,
        }
    }
}

impl From<&crate::config::FlusherSettings> for FlusherConfig {
    fn from(settings: &crate::config::FlusherSettings) -> Self {
        Self {
            enabled: settings.enabled,
            show_invisible_content: settings.show_invisible_content,
            show_inaccessible_content: settings.show_inaccessible_content,
        }
    }
}

impl FlusherConfig {
    pub fn visibility(&self) -> VisibilityOverrides {
        VisibilityOverrides {
            invisible_content_shown: self.show_invisible_content,
            inaccessible_content_shown: self.show_inaccessible_content,
        }
    }
}
