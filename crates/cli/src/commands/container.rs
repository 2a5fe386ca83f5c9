use slipway_invoker::{DockerLike, Launcher};
use slipway_models::Config;

pub async fn logs(config: &Config, container: &str) -> anyhow::Result<()> {
    let launcher = Launcher::new(&config.docker)?;
    let output = launcher.logs(container).await?;
    print!("{}", output);
    Ok(())
}

pub async fn stop(config: &Config, container: &str) -> anyhow::Result<()> {
    let launcher = Launcher::new(&config.docker)?;
    launcher.stop(container, config.docker.stop_grace_secs).await?;
    println!("{}", container);
    Ok(())
}

pub async fn rm(config: &Config, container: &str) -> anyhow::Result<()> {
    let launcher = Launcher::new(&config.docker)?;
    launcher.remove(container, true).await?;
    println!("{}", container);
    Ok(())
}

pub async fn ps(config: &Config) -> anyhow::Result<()> {
    let launcher = Launcher::new(&config.docker)?;
    let containers = launcher.list_managed().await?;
    if containers.is_empty() {
        println!("No slipway containers");
        return Ok(());
    }
    println!("{:<14} {:<28} {:<10} {}", "CONTAINER", "IMAGE", "STATE", "STATUS");
    for c in containers {
        let short_id: String = c.id.chars().take(12).collect();
        println!("{:<14} {:<28} {:<10} {}", short_id, c.image, c.state, c.status);
    }
    Ok(())
}
