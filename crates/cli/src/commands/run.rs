use slipway_invoker::{ContainerManager, Launcher};
use slipway_models::Config;

use super::build::build_image;

/// Launch a container from `image`; prints the container ID and the host
/// port its declared port came out on.
pub async fn run(config: &Config, image: &str, host_port: Option<u16>) -> anyhow::Result<()> {
    let host_port = host_port.or(config.run.host_port);
    let launcher = Launcher::new(&config.docker)?;
    let mut manager = ContainerManager::new(launcher, config.docker.stop_grace_secs);

    let container_id = manager
        .launch(image, config.build.port, host_port)
        .await?;
    let published = manager
        .published_port(&container_id, config.build.port)
        .await?;

    match published {
        Some(port) => println!("{} listening on 0.0.0.0:{}", container_id, port),
        None => println!("{}", container_id),
    }
    Ok(())
}

/// Build the source tree, then launch the result.
pub async fn up(config: &Config, path: Option<&str>, host_port: Option<u16>) -> anyhow::Result<()> {
    let image = build_image(config, path).await?;
    run(config, &image.to_string(), host_port).await
}
