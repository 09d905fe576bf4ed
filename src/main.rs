//! Focus Guard - a persistent focus timer that blocks distracting sites
//!
//! `serve` runs the timer authority; the other subcommands are a control
//! surface talking to it.

use std::{path::Path, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::{error, info};

use focus_guard::{
    api::create_router,
    bootstrap::build_authority,
    config::{ClientArgs, Config, Mode, ServeArgs},
    control::{ControlSurface, HttpLink},
    state::{AppState, Clock, JsonFileStore, SystemClock},
    tasks::tick_loop_task,
    utils::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // Initialize tracing with appropriate log level
    tracing_subscriber::fmt()
        .with_env_filter(format!("focus_guard={},tower_http=info", config.log_level()))
        .init();

    let state_dir = config.state_dir();

    match &config.mode {
        Mode::Serve(args) => serve(args, &state_dir).await,
        Mode::Status { follow, client } => status(client, &state_dir, *follow).await,
        Mode::Start { duration_seconds, client } => {
            let surface = control_surface(client, &state_dir)?;
            surface.start(client.start_request(*duration_seconds)).await?;
            println!("{}", surface.open().await.render(SystemClock.now()));
            Ok(())
        }
        Mode::Stop { client } => {
            let surface = control_surface(client, &state_dir)?;
            surface.stop().await?;
            println!("{}", surface.open().await.render(SystemClock.now()));
            Ok(())
        }
        Mode::Switch { client } => {
            let surface = control_surface(client, &state_dir)?;
            surface.switch_phase().await?;
            println!("{}", surface.open().await.render(SystemClock.now()));
            Ok(())
        }
        Mode::Complete { client } => {
            control_surface(client, &state_dir)?.report_phase_complete().await?;
            Ok(())
        }
    }
}

async fn serve(args: &ServeArgs, state_dir: &Path) -> anyhow::Result<()> {
    info!("Starting focus-guard server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: host={}, port={}, work={}min, break={}min",
          args.host, args.port, args.work_minutes, args.break_minutes);

    // Reconcile with the last snapshot before accepting commands
    let authority = build_authority(args, state_dir)?;
    let state = Arc::new(AppState::new(authority, args.host.clone(), args.port));

    // Start the countdown tick background task
    let tick_state = Arc::clone(&state);
    let ticker = tokio::spawn(async move {
        tick_loop_task(tick_state).await;
    });

    // Create HTTP router with all endpoints
    let app = create_router(Arc::clone(&state));

    // Bind to the specified address
    let addr = args.address();
    let listener = TcpListener::bind(&addr).await?;

    info!("Server running on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /start          - Start a work phase");
    info!("  POST /stop           - Stop and reset the timer");
    info!("  POST /phase-complete - Finish the current phase");
    info!("  POST /switch         - Switch phase (debug)");
    info!("  GET  /state          - Live timer state");
    info!("  GET  /status         - Timer, blocking and server status");
    info!("  GET  /badge          - Countdown indicator");
    info!("  POST /navigation     - Check a tab navigation");
    info!("  GET  /blocked        - Block page");
    info!("  GET  /health         - Health check");

    // Setup graceful shutdown
    let server = axum::serve(listener, app);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    ticker.abort();
    if let Err(e) = state.apply("shutdown", |authority| authority.shutdown()) {
        error!("Failed to save final snapshot: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}

fn control_surface(client: &ClientArgs, state_dir: &Path) -> anyhow::Result<ControlSurface<HttpLink>> {
    Ok(ControlSurface::new(
        HttpLink::new(client.authority.clone())?,
        Box::new(JsonFileStore::in_dir(state_dir)),
        client.defaults()?,
        Arc::new(SystemClock),
    ))
}

async fn status(client: &ClientArgs, state_dir: &Path, follow: bool) -> anyhow::Result<()> {
    let surface = control_surface(client, state_dir)?;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        // Re-anchor on every refresh rather than counting down locally
        let view = surface.open().await;
        println!("{} [{}]", view.render(SystemClock.now()), view.source.as_str());

        if !follow {
            return Ok(());
        }
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
            _ = &mut shutdown => return Ok(()),
        }
    }
}
