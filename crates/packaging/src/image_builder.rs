use std::path::Path;
use std::process::Stdio;

use sha2::{Digest, Sha256};
use slipway_models::{BuildPlan, ImageRef, SlipwayError};
use tokio::process::Command;
use tracing::{error, info, instrument};

use crate::context::BuildContext;
use crate::dockerfile::render_plan;

/// Drives `docker build` over an assembled context. A failed build tags
/// nothing; the failure is classified back to the stage that caused it.
pub struct ImageBuilder {
    docker_bin: String,
}

impl Default for ImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageBuilder {
    pub fn new() -> Self {
        Self {
            docker_bin: "docker".to_string(),
        }
    }

    #[instrument(skip(self, plan, source_root))]
    pub async fn build(
        &self,
        plan: &BuildPlan,
        source_root: &Path,
    ) -> Result<ImageRef, SlipwayError> {
        let dockerfile = render_plan(plan);
        let context = BuildContext::assemble(source_root, &plan.manifest, &dockerfile)?;
        let manifest = context.manifest_bytes(&plan.manifest)?;

        let image_ref = ImageRef::new(
            plan.image_repository.clone(),
            content_tag(&manifest, &dockerfile),
        );

        info!("Building image: {}", image_ref);
        info!("Build context: {:?}", context.path());

        let output = Command::new(&self.docker_bin)
            .arg("build")
            .arg("-t")
            .arg(image_ref.to_string())
            .arg("-f")
            .arg(context.dockerfile_path())
            .arg(context.path())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| SlipwayError::Docker {
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("Image build failed - stderr: {}", stderr);
            return Err(classify_build_failure(&stderr, &plan.base));
        }

        info!("Built image: {}", image_ref);
        Ok(image_ref)
    }
}

/// Content-addressed image tag: a digest over the dependency manifest and the
/// rendered Dockerfile. Source-only edits leave the tag unchanged, so
/// rebuilding after such an edit reuses the dependency layers.
pub fn content_tag(manifest: &[u8], dockerfile: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(manifest);
    hasher.update(dockerfile.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    hex[..12].to_string()
}

/// Map a failed `docker build` to the stage that broke. Buildkit echoes every
/// step into stderr, so the classification keys on the instruction named in
/// the "did not complete successfully" line rather than on anything that
/// merely appears in the log; anything unrecognized stays an opaque build
/// error carrying the stderr.
pub fn classify_build_failure(stderr: &str, base: &ImageRef) -> SlipwayError {
    const BASE_MARKERS: &[&str] = &[
        "pull access denied",
        "manifest unknown",
        "failed to resolve source metadata",
        "repository does not exist",
        "invalid reference format",
    ];

    let detail = stderr.trim().to_string();

    if BASE_MARKERS.iter().any(|m| stderr.contains(m)) {
        return SlipwayError::BaseResolution {
            image: base.to_string(),
        };
    }

    if let Some(failed) = stderr
        .lines()
        .find(|line| line.contains("did not complete successfully"))
    {
        if failed.contains("apt-get") {
            return SlipwayError::SystemDependency { detail };
        }
        if failed.contains("pip install") {
            return SlipwayError::DependencyResolution { detail };
        }
    }

    // Older engines without the buildkit summary line still print the
    // installer's own diagnostics.
    if stderr.contains("Unable to locate package") {
        return SlipwayError::SystemDependency { detail };
    }
    if stderr.contains("No matching distribution found")
        || stderr.contains("Could not find a version that satisfies")
    {
        return SlipwayError::DependencyResolution { detail };
    }

    SlipwayError::BuildFailed { detail }
}
