// SPDX-License-Identifier: CEPL-1.0
use std::ffi::CString;

use kindle_render_vk::{ash::khr::swapchain, ContextSettings};
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize, Default)]
pub struct AppCfg {
    #[serde(default)]
    pub window: WindowCfg,
    #[serde(default)]
    pub context: ContextCfg,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WindowCfg {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowCfg {
    fn default() -> Self {
        WindowCfg {
            title: String::from("kindle"),
            width: 800,
            height: 600,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ContextCfg {
    pub app_name: String,
    /// Unset means "on in debug builds".
    pub validation: Option<bool>,
    pub device_extensions: Vec<String>,
}

impl Default for ContextCfg {
    fn default() -> Self {
        ContextCfg {
            app_name: String::from("kindle"),
            validation: None,
            device_extensions: Vec::new(),
        }
    }
}

impl ContextCfg {
    /// `validation_override` comes from the command line and wins over the file.
    pub fn to_settings(&self, validation_override: Option<bool>) -> ContextSettings {
        let mut device_extensions = vec![swapchain::NAME.to_owned()];
        for name in &self.device_extensions {
            match CString::new(name.as_str()) {
                Ok(c) if !device_extensions.contains(&c) => device_extensions.push(c),
                Ok(_) => {}
                Err(_) => warn!("ignoring device extension with interior NUL: {name:?}"),
            }
        }

        ContextSettings {
            app_name: self.app_name.clone(),
            device_extensions,
            validation: validation_override
                .or(self.validation)
                .unwrap_or(cfg!(debug_assertions)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg: AppCfg = toml::from_str("").unwrap();
        assert_eq!(cfg.window.title, "kindle");
        assert_eq!((cfg.window.width, cfg.window.height), (800, 600));
        assert_eq!(cfg.context.validation, None);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg: AppCfg = toml::from_str(
            r#"
            [window]
            width = 1920

            [context]
            validation = false
            device_extensions = ["VK_KHR_maintenance1", "VK_KHR_swapchain"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.window.width, 1920);
        assert_eq!(cfg.window.height, 600);

        let settings = cfg.context.to_settings(None);
        assert!(!settings.validation);
        assert_eq!(
            settings.device_extensions,
            vec![
                swapchain::NAME.to_owned(),
                CString::new("VK_KHR_maintenance1").unwrap()
            ]
        );
    }

    #[test]
    fn command_line_overrides_file() {
        let cfg = ContextCfg {
            validation: Some(false),
            ..ContextCfg::default()
        };
        assert!(cfg.to_settings(Some(true)).validation);
        assert!(!cfg.to_settings(None).validation);
    }

    #[test]
    fn validation_defaults_to_build_profile() {
        let settings = ContextCfg::default().to_settings(None);
        assert_eq!(settings.validation, cfg!(debug_assertions));
    }
}
