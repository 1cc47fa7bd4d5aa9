use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use flipview::DemoSettings;

pub const CONFIG_PATH: &str = "flipview.ron";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("unable to read \"{path}\"")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse \"{path}\": {message}")]
    Parse { path: String, message: String },

    #[error("unknown log level \"{0}\"")]
    LogLevel(String),
}

/// Startup configuration. Every field is optional in the file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub window_width: u32,
    pub window_height: u32,
    pub title: String,
    pub validation: bool,
    pub log_level: String,
    pub asset_root: PathBuf,
    pub shader_root: PathBuf,
    pub settings: DemoSettings,
}

impl Default for DemoConfig {
    fn default() -> Self {
        DemoConfig {
            window_width: 1280,
            window_height: 720,
            title: "Negative Viewport height".to_string(),
            validation: true,
            log_level: "info".to_string(),
            asset_root: PathBuf::from("assets"),
            shader_root: PathBuf::from("shaders"),
            settings: DemoSettings::default(),
        }
    }
}

impl DemoConfig {
    /// Reads `path`, falling back to the defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<DemoConfig, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => DemoConfig::parse(&contents, path),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(DemoConfig::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    pub fn parse(contents: &str, path: &Path) -> Result<DemoConfig, ConfigError> {
        let config: DemoConfig = ron::from_str(contents).map_err(|err| ConfigError::Parse {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;

        config.log_level_filter()?;
        Ok(config)
    }

    pub fn log_level_filter(&self) -> Result<log::LevelFilter, ConfigError> {
        log::LevelFilter::from_str(&self.log_level)
            .map_err(|_| ConfigError::LogLevel(self.log_level.clone()))
    }

    pub fn window_desc(&self) -> flipview::WindowDesc {
        flipview::WindowDesc {
            width: self.window_width,
            height: self.window_height,
            title: self.title.clone(),
            validation: self.validation,
        }
    }

    pub fn renderer_paths(&self) -> flipview::RendererPaths {
        flipview::RendererPaths {
            asset_root: self.asset_root.clone(),
            vertex_shader: self.shader_root.join("quad.vert"),
            fragment_shader: self.shader_root.join("quad.frag"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flipview::{CullMode, QuadOrientation};

    #[test]
    fn missing_file_gives_defaults() {
        let config = DemoConfig::load(Path::new("does/not/exist/flipview.ron")).unwrap();

        assert_eq!(config, DemoConfig::default());
        assert_eq!(config.settings, DemoSettings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let contents = r#"(
            window_width: 800,
            validation: false,
            settings: (quad_orientation: OpenGl, cull_mode: Front),
        )"#;

        let config = DemoConfig::parse(contents, Path::new(CONFIG_PATH)).unwrap();

        assert_eq!(config.window_width, 800);
        assert_eq!(config.window_height, 720);
        assert!(!config.validation);
        assert_eq!(config.settings.quad_orientation, QuadOrientation::OpenGl);
        assert_eq!(config.settings.cull_mode, CullMode::Front);
        assert!(config.settings.negative_viewport);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let result = DemoConfig::parse("(window_width: \"wide\")", Path::new(CONFIG_PATH));

        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let result = DemoConfig::parse("(log_level: \"chatty\")", Path::new(CONFIG_PATH));

        assert!(matches!(result, Err(ConfigError::LogLevel(level)) if level == "chatty"));
    }

    #[test]
    fn shader_paths_follow_shader_root() {
        let config = DemoConfig {
            shader_root: PathBuf::from("custom"),
            ..Default::default()
        };
        let paths = config.renderer_paths();

        assert_eq!(paths.vertex_shader, PathBuf::from("custom/quad.vert"));
        assert_eq!(paths.fragment_shader, PathBuf::from("custom/quad.frag"));
    }
}
