use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SlipwayError;

/// Reference to a base runtime image, `repository[:tag]`.
///
/// The tag defaults to `latest` when omitted. An empty repository or an
/// explicit empty tag (`python:`) is rejected up front so a bad reference
/// fails before Docker is ever invoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageRef {
    pub repository: String,
    pub tag: String,
}

impl ImageRef {
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
        }
    }
}

impl FromStr for ImageRef {
    type Err = SlipwayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(SlipwayError::InvalidImageRef {
                input: s.to_string(),
            });
        }
        // The tag separator is the last colon, unless it belongs to a
        // registry port (a slash after it).
        match s.rsplit_once(':') {
            Some((repo, tag)) if !tag.contains('/') => {
                if repo.is_empty() || tag.is_empty() {
                    return Err(SlipwayError::InvalidImageRef {
                        input: s.to_string(),
                    });
                }
                Ok(Self::new(repo, tag))
            }
            _ => Ok(Self::new(s, "latest")),
        }
    }
}

impl TryFrom<String> for ImageRef {
    type Error = SlipwayError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ImageRef> for String {
    fn from(r: ImageRef) -> Self {
        r.to_string()
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

/// ASGI application object locator: `module:object`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppLocator {
    pub module: String,
    pub object: String,
}

impl Default for AppLocator {
    fn default() -> Self {
        Self {
            module: "main".to_string(),
            object: "app".to_string(),
        }
    }
}

impl fmt::Display for AppLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.object)
    }
}

/// The single process invocation recorded to run at container start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entrypoint {
    pub program: String,
    pub args: Vec<String>,
}

impl Entrypoint {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Standard ASGI server invocation: bind all interfaces on `port` and
    /// serve the located application object.
    pub fn uvicorn(app: &AppLocator, bind: &str, port: u16) -> Self {
        Self::new(
            "uvicorn",
            vec![
                app.to_string(),
                "--host".to_string(),
                bind.to_string(),
                "--port".to_string(),
                port.to_string(),
            ],
        )
    }

    /// Exec-form rendering for a Dockerfile `CMD` instruction.
    pub fn to_exec_form(&self) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.iter().cloned());
        let quoted: Vec<String> = parts
            .iter()
            .map(|p| format!("\"{}\"", p.replace('\\', "\\\\").replace('"', "\\\"")))
            .collect();
        format!("[{}]", quoted.join(", "))
    }
}

/// Everything the packaging crate needs to produce an image: the ordered
/// inputs of the build pipeline, fully resolved from config and CLI flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildPlan {
    pub base: ImageRef,
    pub workdir: String,
    pub system_packages: Vec<String>,
    pub manifest: String,
    pub app: AppLocator,
    pub bind: String,
    pub port: u16,
    /// Image repository to tag the result under; the tag itself is
    /// content-addressed by the builder.
    pub image_repository: String,
}

impl BuildPlan {
    pub fn entrypoint(&self) -> Entrypoint {
        Entrypoint::uvicorn(&self.app, &self.bind, self.port)
    }
}
