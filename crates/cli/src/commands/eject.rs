use std::path::Path;

use slipway_models::Config;
use slipway_packaging::render_plan;

/// Write the rendered Dockerfile next to the source so it can be customized
/// by hand. Refuses to clobber an existing one.
pub fn eject(config: &Config, path: Option<&str>) -> anyhow::Result<()> {
    let source_root = Path::new(path.unwrap_or("."));
    let dockerfile_path = source_root.join("Dockerfile");
    if dockerfile_path.exists() {
        anyhow::bail!(
            "{} already exists - edit it directly or delete it to re-eject",
            dockerfile_path.display()
        );
    }

    let plan = config.build_plan()?;
    std::fs::write(&dockerfile_path, render_plan(&plan))?;

    println!("Wrote {}", dockerfile_path.display());
    Ok(())
}
