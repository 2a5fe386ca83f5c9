use std::marker::PhantomData;

use slipway_models::{BuildPlan, Entrypoint, ImageRef};

/// Marker types for the build pipeline phases. Each operation is only
/// available on the phase it belongs to, so an out-of-order stage sequence
/// is a type error rather than a runtime failure.
pub struct BaseSelected;
pub struct WorkdirSet;
pub struct DependenciesInstalled;
pub struct SourceCopied;
pub struct EntrypointSet;

/// Ordered Dockerfile under construction.
///
/// The phase parameter advances from `BaseSelected` through `WorkdirSet`,
/// `DependenciesInstalled`, and `SourceCopied` to `EntrypointSet`; only the
/// final phase can render. System packages are the one optional stage and
/// keep the builder in `WorkdirSet`. Declaring the entrypoint again replaces
/// the previous declaration (last write wins).
pub struct Dockerfile<Stage> {
    lines: Vec<String>,
    entrypoint: Option<Entrypoint>,
    _stage: PhantomData<Stage>,
}

impl<Stage> Dockerfile<Stage> {
    fn advance<Next>(self) -> Dockerfile<Next> {
        Dockerfile {
            lines: self.lines,
            entrypoint: self.entrypoint,
            _stage: PhantomData,
        }
    }
}

impl Dockerfile<BaseSelected> {
    /// Pin the base runtime image. Entry point of the pipeline.
    pub fn from_image(base: &ImageRef) -> Self {
        Dockerfile {
            lines: vec![format!("FROM {}", base)],
            entrypoint: None,
            _stage: PhantomData,
        }
    }

    /// Anchor path for all following stages.
    pub fn workdir(mut self, path: &str) -> Dockerfile<WorkdirSet> {
        self.lines.push(format!("WORKDIR {}", path));
        self.advance()
    }
}

impl Dockerfile<WorkdirSet> {
    /// Install OS packages and purge the installer cache in the same layer.
    /// An empty set renders nothing; the stage is skippable.
    pub fn system_packages(mut self, packages: &[String]) -> Self {
        if !packages.is_empty() {
            self.lines.push(format!(
                "RUN apt-get update \\\n    && apt-get install -y --no-install-recommends {} \\\n    && rm -rf /var/lib/apt/lists/*",
                packages.join(" ")
            ));
        }
        self
    }

    /// Copy the dependency manifest alone and resolve it. Runs before any
    /// source copy so source churn cannot invalidate this layer.
    pub fn install_dependencies(mut self, manifest: &str) -> Dockerfile<DependenciesInstalled> {
        self.lines.push(format!("COPY {} ./", manifest));
        self.lines
            .push(format!("RUN pip install --no-cache-dir -r {}", manifest));
        self.advance()
    }
}

impl Dockerfile<DependenciesInstalled> {
    /// Copy the remaining application tree.
    pub fn copy_source(mut self) -> Dockerfile<SourceCopied> {
        self.lines.push("COPY . .".to_string());
        self.advance()
    }
}

impl Dockerfile<SourceCopied> {
    /// Documentation-only port declaration; binding is controlled by the
    /// entrypoint arguments.
    pub fn expose(mut self, port: u16) -> Self {
        self.lines.push(format!("EXPOSE {}", port));
        self
    }

    /// Record the single process to run at container start.
    pub fn entrypoint(mut self, entrypoint: Entrypoint) -> Dockerfile<EntrypointSet> {
        self.entrypoint = Some(entrypoint);
        self.advance()
    }
}

impl Dockerfile<EntrypointSet> {
    /// Re-declaration replaces the recorded command.
    pub fn entrypoint(mut self, entrypoint: Entrypoint) -> Self {
        self.entrypoint = Some(entrypoint);
        self
    }

    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        // The phase type guarantees the entrypoint is present.
        if let Some(ep) = &self.entrypoint {
            out.push_str(&format!("\nCMD {}\n", ep.to_exec_form()));
        }
        out
    }
}

/// Render the full staged pipeline for a resolved build plan.
pub fn render_plan(plan: &BuildPlan) -> String {
    Dockerfile::from_image(&plan.base)
        .workdir(&plan.workdir)
        .system_packages(&plan.system_packages)
        .install_dependencies(&plan.manifest)
        .copy_source()
        .expose(plan.port)
        .entrypoint(plan.entrypoint())
        .render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use slipway_models::Config;

    fn default_plan() -> BuildPlan {
        Config::default().build_plan().unwrap()
    }

    #[test]
    fn renders_default_pipeline_in_order() {
        let rendered = render_plan(&default_plan());
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "FROM python:3.11-slim");
        assert_eq!(lines[1], "WORKDIR /app");
        assert_eq!(lines[2], "COPY requirements.txt ./");
        assert_eq!(lines[3], "RUN pip install --no-cache-dir -r requirements.txt");
        assert_eq!(lines[4], "COPY . .");
        assert_eq!(lines[5], "EXPOSE 8000");
        assert_eq!(
            lines[6],
            r#"CMD ["uvicorn", "main:app", "--host", "0.0.0.0", "--port", "8000"]"#
        );
    }

    #[test]
    fn manifest_install_precedes_source_copy() {
        let mut plan = default_plan();
        plan.system_packages = vec!["gcc".to_string(), "libpq-dev".to_string()];
        let rendered = render_plan(&plan);
        let manifest_at = rendered.find("COPY requirements.txt").unwrap();
        let install_at = rendered.find("pip install").unwrap();
        let source_at = rendered.find("COPY . .").unwrap();
        assert!(manifest_at < install_at);
        assert!(install_at < source_at);
    }

    #[test]
    fn apt_purge_shares_the_install_layer() {
        let mut plan = default_plan();
        plan.system_packages = vec!["gcc".to_string()];
        let rendered = render_plan(&plan);
        // The purge must sit inside the same RUN instruction as the install,
        // i.e. between "RUN apt-get update" and the next COPY.
        let (_, after_run) = rendered.split_once("RUN apt-get update").unwrap();
        let (instruction, _) = after_run.split_once("COPY").unwrap();
        assert!(instruction.contains("apt-get install -y --no-install-recommends gcc"));
        assert!(instruction.contains("rm -rf /var/lib/apt/lists/*"));
    }

    #[test]
    fn empty_package_set_skips_the_stage() {
        let rendered = render_plan(&default_plan());
        assert!(!rendered.contains("apt-get"));
    }

    #[test]
    fn pip_never_keeps_a_cache() {
        let rendered = render_plan(&default_plan());
        assert!(rendered.contains("pip install --no-cache-dir"));
    }

    #[test]
    fn entrypoint_last_write_wins() {
        let plan = default_plan();
        let first = Entrypoint::new("uvicorn", vec!["old:app".to_string()]);
        let second = plan.entrypoint();
        let rendered = Dockerfile::from_image(&plan.base)
            .workdir(&plan.workdir)
            .install_dependencies(&plan.manifest)
            .copy_source()
            .entrypoint(first)
            .entrypoint(second)
            .render();
        assert!(!rendered.contains("old:app"));
        assert!(rendered.contains("main:app"));
        assert_eq!(rendered.matches("CMD ").count(), 1);
    }

    #[test]
    fn expose_is_metadata_only() {
        let plan = default_plan();
        let rendered = render_plan(&plan);
        // One EXPOSE line; the bind itself comes from the CMD arguments.
        assert_eq!(rendered.matches("EXPOSE").count(), 1);
        assert!(rendered.contains("EXPOSE 8000"));
        assert!(rendered.contains(r#""--port", "8000""#));
    }
}
