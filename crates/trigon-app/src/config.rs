// SPDX-License-Identifier: CEPL-1.0
use std::path::{Path, PathBuf};
use std::{fs, io};

use serde::Deserialize;
use tracing::{debug, warn};
use trigon_platform::WindowDesc;
use trigon_render_vk::PresentPreference;

#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppCfg {
    pub window: WindowCfg,
    pub render: RenderCfg,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct WindowCfg {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for WindowCfg {
    fn default() -> Self {
        let d = WindowDesc::default();
        Self {
            width: d.width,
            height: d.height,
            title: d.title,
        }
    }
}

impl From<&WindowCfg> for WindowDesc {
    fn from(cfg: &WindowCfg) -> Self {
        WindowDesc {
            width: cfg.width,
            height: cfg.height,
            title: cfg.title.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RenderCfg {
    pub clear_color: [f32; 4],
    /// Overrides the build-profile default when set.
    pub validation: Option<bool>,
    pub present_mode: PresentModeCfg,
    pub vertex_shader: Option<PathBuf>,
    pub fragment_shader: Option<PathBuf>,
}

impl Default for RenderCfg {
    fn default() -> Self {
        RenderCfg {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            validation: None,
            present_mode: PresentModeCfg::default(),
            vertex_shader: None,
            fragment_shader: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PresentModeCfg {
    #[default]
    Mailbox,
    Fifo,
}

impl From<PresentModeCfg> for PresentPreference {
    fn from(mode: PresentModeCfg) -> Self {
        match mode {
            PresentModeCfg::Mailbox => PresentPreference::Mailbox,
            PresentModeCfg::Fifo => PresentPreference::Fifo,
        }
    }
}

/// Missing or malformed files fall back to defaults.
pub fn load_cfg(path: &Path) -> AppCfg {
    let text = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no config file, using defaults");
            return AppCfg::default();
        }
        Err(e) => {
            warn!(path = %path.display(), "config unreadable ({e}), using defaults");
            return AppCfg::default();
        }
    };
    match toml::from_str::<AppCfg>(&text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(path = %path.display(), "config malformed ({e}), using defaults");
            AppCfg::default()
        }
    }
}
