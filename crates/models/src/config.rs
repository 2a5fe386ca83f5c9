use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SlipwayError;
use crate::plan::{AppLocator, BuildPlan, ImageRef};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    pub build: BuildConfig,
    pub app: AppConfig,
    pub docker: DockerConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct BuildConfig {
    /// Base runtime image, `repository[:tag]`.
    pub base_image: String,
    pub workdir: String,
    /// OS packages installed (and their installer cache purged) in one stage.
    pub system_packages: Vec<String>,
    /// Dependency manifest file, relative to the source root.
    pub manifest: String,
    /// Port recorded in the image and bound by the entrypoint.
    pub port: u16,
    /// Image repository the build tags into.
    pub image_repository: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct AppConfig {
    pub module: String,
    pub object: String,
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct DockerConfig {
    /// Docker host override; empty means the platform default socket.
    pub host: String,
    /// Grace period handed to `stop` before the engine kills the process.
    pub stop_grace_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct RunConfig {
    /// Host port to publish the container port on. None picks an ephemeral
    /// port, which is what lets N containers from one image run side by side.
    pub host_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            build: BuildConfig::default(),
            app: AppConfig::default(),
            docker: DockerConfig::default(),
            run: RunConfig::default(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            base_image: "python:3.11-slim".to_string(),
            workdir: "/app".to_string(),
            system_packages: Vec::new(),
            manifest: "requirements.txt".to_string(),
            port: 8000,
            image_repository: "slipway/app".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            module: "main".to_string(),
            object: "app".to_string(),
            bind: "0.0.0.0".to_string(),
        }
    }
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            stop_grace_secs: 10,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { host_port: None }
    }
}

impl Config {
    /// Load from the first existing path, if any.
    pub fn load_first(paths: &[&str]) -> Result<Option<Self>, SlipwayError> {
        for path in paths {
            if Path::new(path).exists() {
                return Self::load(path).map(Some);
            }
        }
        Ok(None)
    }

    pub fn load(path: &str) -> Result<Self, SlipwayError> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| SlipwayError::Config {
            reason: format!("{}: {}", path, e),
        })
    }

    /// Resolve the configuration into a concrete build plan.
    pub fn build_plan(&self) -> Result<BuildPlan, SlipwayError> {
        let base: ImageRef = self.build.base_image.parse()?;
        Ok(BuildPlan {
            base,
            workdir: self.build.workdir.clone(),
            system_packages: self.build.system_packages.clone(),
            manifest: self.build.manifest.clone(),
            app: AppLocator {
                module: self.app.module.clone(),
                object: self.app.object.clone(),
            },
            bind: self.app.bind.clone(),
            port: self.build.port,
            image_repository: self.build.image_repository.clone(),
        })
    }
}
