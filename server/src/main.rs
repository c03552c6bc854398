use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{error, info};

use rainboard_server::clicks::ClickAudit;
use rainboard_server::error::Result;
use rainboard_server::handlers::router;
use rainboard_server::state::AppState;
use rainboard_server::storage::{restore_stroke_log, FilePointStore, PointStore};

#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Directory that receives one PNG per clear.
    #[arg(long, default_value = "drawings")]
    image_dir: PathBuf,
    #[arg(long, default_value = "mousePositions.bin")]
    point_log: PathBuf,
    #[arg(long, default_value = "clicks.txt")]
    click_log: PathBuf,
    #[arg(long, default_value = "public")]
    public_dir: PathBuf,
    /// Keep at most this many points on the board, dropping the oldest.
    #[arg(long)]
    max_points: Option<usize>,
    #[arg(long, default_value_t = 60)]
    backup_interval_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Err(error) = tokio::fs::create_dir_all(&args.image_dir).await {
        error!("Failed to create image dir {}: {error}", args.image_dir.display());
    }
    let store: Arc<dyn PointStore> = Arc::new(FilePointStore::new(args.point_log.clone()));
    let strokes = restore_stroke_log(store.as_ref(), args.max_points).await;
    let state = AppState::new(
        strokes,
        args.image_dir.clone(),
        store,
        ClickAudit::new(args.click_log.clone()),
    );

    let backup_state = state.clone();
    let backup_interval = Duration::from_secs(args.backup_interval_secs.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(backup_interval);
        loop {
            interval.tick().await;
            if let Err(error) = backup_state.persistence.save_if_dirty().await {
                error!("Failed to back up point log: {error}");
            }
        }
    });

    let app = router(state.clone(), &args.public_dir);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Whiteboard running at http://localhost:{port}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down, finishing drawings and saving point log");
    state.rasterizer.drain().await;
    if let Err(error) = state.persistence.save().await {
        error!("Failed to save point log on shutdown: {error}");
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {error}");
        std::future::pending::<()>().await;
    }
}
