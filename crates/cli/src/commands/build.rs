use std::path::Path;

use slipway_models::{Config, ImageRef};
use slipway_packaging::ImageBuilder;

/// Build an image from the source tree and print the tag it landed under.
pub async fn build(config: &Config, path: Option<&str>) -> anyhow::Result<()> {
    let image = build_image(config, path).await?;
    println!("{}", image);
    Ok(())
}

pub(crate) async fn build_image(
    config: &Config,
    path: Option<&str>,
) -> anyhow::Result<ImageRef> {
    let source_root = Path::new(path.unwrap_or("."));
    let plan = config.build_plan()?;
    let builder = ImageBuilder::new();
    Ok(builder.build(&plan, source_root).await?)
}
