use thiserror::Error;

#[derive(Error, Debug)]
pub enum SlipwayError {
    #[error("Base image could not be resolved: {image}")]
    BaseResolution { image: String },

    #[error("System package installation failed: {detail}")]
    SystemDependency { detail: String },

    #[error("Dependency resolution failed: {detail}")]
    DependencyResolution { detail: String },

    #[error("Source copy failed for {path}: {detail}")]
    SourceCopy { path: String, detail: String },

    #[error("Image build failed: {detail}")]
    BuildFailed { detail: String },

    #[error("Container failed to start: {detail}")]
    RuntimeStart { detail: String },

    #[error("Timed out after {timeout_ms}ms waiting for container exit")]
    WaitTimeout { timeout_ms: u64 },

    #[error("Docker error: {message}")]
    Docker { message: String },

    #[error("Invalid image reference: {input:?}")]
    InvalidImageRef { input: String },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("Internal error: {reason}")]
    Internal { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SlipwayError {
    /// Stable machine-readable label for each failure class.
    pub fn error_type(&self) -> &'static str {
        match self {
            SlipwayError::BaseResolution { .. } => "BaseResolutionError",
            SlipwayError::SystemDependency { .. } => "SystemDependencyError",
            SlipwayError::DependencyResolution { .. } => "DependencyResolutionError",
            SlipwayError::SourceCopy { .. } => "SourceCopyError",
            SlipwayError::BuildFailed { .. } => "BuildError",
            SlipwayError::RuntimeStart { .. } => "RuntimeStartError",
            SlipwayError::WaitTimeout { .. } => "WaitTimeoutError",
            SlipwayError::Docker { .. } => "DockerError",
            SlipwayError::InvalidImageRef { .. } => "InvalidImageRefError",
            SlipwayError::Config { .. } => "ConfigError",
            SlipwayError::Internal { .. } => "InternalError",
            SlipwayError::Io(_) => "IoError",
        }
    }

    /// Build-stage failures are unrecoverable within the build; the caller
    /// aborts without tagging a partial image.
    pub fn is_build_fatal(&self) -> bool {
        matches!(
            self,
            SlipwayError::BaseResolution { .. }
                | SlipwayError::SystemDependency { .. }
                | SlipwayError::DependencyResolution { .. }
                | SlipwayError::SourceCopy { .. }
                | SlipwayError::BuildFailed { .. }
        )
    }
}
