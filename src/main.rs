mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail};
use clap::Parser;
use log::{error, info, warn};

use portrait_studio::config::Config;
use portrait_studio::intake::PRIVACY_POLICY_TEXT;
use portrait_studio::remote::{self, HttpFaceDetector, HttpImageGenerator};
use portrait_studio::{PhotoFile, RunOutcome, StudioError, StudioSession, SCENES, STYLES};

use cli::Cli;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    if cli.list_templates {
        print_templates();
        return Ok(());
    }
    let (Some(scene_id), Some(style_id)) = (cli.scene.as_deref(), cli.style.as_deref()) else {
        bail!("expected a scene id and a style id");
    };

    let config = Config::from_env().map_err(|e| anyhow!("invalid configuration: {}", e))?;
    info!("Detection endpoint: {}", config.remote.detect_endpoint);
    info!("Generation endpoint: {}", config.remote.generate_endpoint);

    let mut session = StudioSession::new(
        &config,
        Arc::new(HttpFaceDetector::new(&config.remote)),
        Arc::new(HttpImageGenerator::new(&config.remote)),
    );
    session.start()?;

    let mut files = Vec::with_capacity(cli.photos.len());
    for path in &cli.photos {
        files.push(PhotoFile::from_path(path).await?);
    }
    let outcome = session.select_files(files)?;
    if let Some(notice) = outcome.notice() {
        warn!("{}", notice);
    }
    if session.pending_count() == 0 {
        bail!("none of the selected files can be used");
    }

    if !cli.agree {
        println!("{}", PRIVACY_POLICY_TEXT);
        session.decline_privacy();
        bail!("guardian consent is required, rerun with --agree");
    }
    session.agree_to_privacy().await?;

    info!("Checking faces...");
    session.wait_for_validations().await;
    for photo in session.photos() {
        info!("{} ({}): face {:?}", photo.file_name, photo.id, photo.face);
    }
    session.continue_to_templates().map_err(report)?;

    let mut progress = session.orchestrator().subscribe_progress();
    let progress_task = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let snapshot = *progress.borrow_and_update();
            info!("Progress: {} / {}", snapshot.attempted, snapshot.total);
        }
    });

    let orchestrator = session.orchestrator();
    let cancel_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling generation");
            orchestrator.cancel();
        }
    });

    let run = session.confirm_template(scene_id, style_id).await;
    progress_task.abort();
    cancel_task.abort();

    match run.map_err(report)? {
        RunOutcome::Completed(generation) => info!("{}", generation.summary()),
        RunOutcome::Cancelled => bail!("generation cancelled"),
        RunOutcome::AlreadyRunning => bail!("generation already in progress"),
    }

    let output_dir = config.output_dir.as_deref().map(PathBuf::from);
    loop {
        let current = session.current_result()?;
        println!(
            "[{}] {} -> {}",
            session.viewer().position_label(),
            current.template_name,
            current.url
        );
        if let Some(dir) = &output_dir {
            match remote::save_result(current, dir).await {
                Ok(path) => println!("    saved to {}", path.display()),
                Err(e) => error!("Failed to save {}: {}", current.id, e),
            }
        }
        if !session.next_result() {
            break;
        }
    }

    Ok(())
}

fn report(e: StudioError) -> StudioError {
    error!("{} (options: {:?})", e, e.suggested_actions());
    e
}

fn print_templates() {
    println!("Scenes:");
    for scene in SCENES {
        println!("  {:<10} {} - {}", scene.id, scene.name, scene.description);
    }
    println!("Styles:");
    for style in STYLES {
        println!("  {:<10} {} - {}", style.id, style.name, style.description);
    }
}
