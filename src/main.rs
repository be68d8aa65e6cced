use clap::Parser;
use site_shooter::{
    setup_logging, Archive, Cli, Config, DriveClient, PhantomRenderer, Shooter,
};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    setup_logging(args.debug);

    debug!("targets: {:?}", args.target);

    let config_file = site_shooter::config_path()?;
    debug!("load config from `{}`", config_file.display());
    let config = Config::load(&config_file)?;

    let services = config.selected(&args.target);
    let service_names: Vec<String> = services.iter().map(|s| s.name.clone()).collect();

    debug!("> trying to connect to google drive");
    let drive = config.global.google_drive.clone();
    let client = DriveClient::new(drive.clone());
    let mut archive = Archive::new(
        Box::new(client),
        drive.parent_id,
        config.global.extension.clone(),
    );
    archive.reconcile_folders(&service_names).await?;

    let renderer = PhantomRenderer::new(
        config.global.renderer_binary.clone(),
        config.global.bridge_script.clone(),
    );
    let mut shooter = Shooter::new(&config.global, Box::new(renderer), archive);

    debug!("starting to shoot");
    let summary = shooter.run(&services).await;

    info!(
        "run finished: {} attempted, {} uploaded, {} render failures, {} upload failures",
        summary.attempted, summary.uploaded, summary.render_failed, summary.upload_failed
    );

    Ok(())
}
