use std::{path::Path, process, sync::Arc};

use bytes::Bytes;
use stillframe::{
    application::{
        error::AppError,
        render::{FfmpegExecutor, RenderPipeline, UploadParts},
    },
    config::{self, Command, RenderArgs, Settings},
    infra::{
        error::InfraError,
        http::{self, RenderState},
        storage::ArtifactStorage,
        telemetry,
    },
};
use tokio::signal;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let pipeline = Arc::new(build_pipeline(&settings)?);

    match cli_args.resolved_command() {
        Command::Serve(_) => run_serve(&settings, pipeline).await,
        Command::Render(args) => run_render(pipeline, &args).await,
    }
}

fn build_pipeline(settings: &Settings) -> Result<RenderPipeline, AppError> {
    let storage = ArtifactStorage::new(settings.storage.directory.clone()).map_err(|err| {
        AppError::from(InfraError::configuration(format!(
            "storage directory `{}` is unusable: {err}",
            settings.storage.directory.display()
        )))
    })?;

    let executor = FfmpegExecutor::new(
        settings.render.ffmpeg_path.clone(),
        settings.render.timeout,
    );

    info!(
        storage = %storage.root().display(),
        ffmpeg = %settings.render.ffmpeg_path.display(),
        output_cleanup = settings.render.output_cleanup.as_str(),
        timeout_seconds = settings.render.timeout.map(|limit| limit.as_secs()),
        "render pipeline configured"
    );

    Ok(RenderPipeline::new(
        Arc::new(storage),
        executor,
        settings.render.output_cleanup,
    ))
}

async fn run_serve(settings: &Settings, pipeline: Arc<RenderPipeline>) -> Result<(), AppError> {
    let router = http::build_router(RenderState::new(pipeline), settings.uploads.body_limit());

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!("server stopped");
    Ok(())
}

async fn run_render(pipeline: Arc<RenderPipeline>, args: &RenderArgs) -> Result<(), AppError> {
    let parts = UploadParts {
        image: Some(read_input(&args.image).await?),
        audio: Some(read_input(&args.audio).await?),
        subtitles: match args.subtitles.as_deref() {
            Some(path) => Some(read_input(path).await?),
            None => None,
        },
    };

    let video = pipeline.render(parts.into_request()?).await?;
    let run_id = video.run_id;
    let written = video
        .persist_to(&args.output)
        .await
        .map_err(|err| {
            AppError::unexpected(format!(
                "failed to write `{}`: {err}",
                args.output.display()
            ))
        })?;

    info!(
        run_id = %run_id,
        output = %args.output.display(),
        size_bytes = written,
        "render written"
    );
    Ok(())
}

async fn read_input(path: &Path) -> Result<Bytes, AppError> {
    tokio::fs::read(path)
        .await
        .map(Bytes::from)
        .map_err(|err| AppError::validation(format!("cannot read `{}`: {err}", path.display())))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
