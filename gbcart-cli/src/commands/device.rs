//! Opening a session and running one request with a progress bar.

use std::fs;
use std::sync::Arc;

use gbcart_lib::{
    CancelToken, Job, Link, Outcome, Request, RequestControl, RequestPool, SerialTransport,
    Session, Settings, SimulatedCartridge, TransferProgress, drive_with_progress,
};

use crate::cli_types::DeviceArgs;
use crate::error::CliError;
use crate::progress::TransferBar;

/// Load settings with the command-line overrides applied.
pub(crate) fn load_settings(args: &DeviceArgs) -> Result<Settings, CliError> {
    let mut settings = Settings::load()?;
    if let Some(port) = &args.port {
        settings.device.port = Some(port.clone());
    }
    if let Some(platform) = args.platform {
        settings.device.platform = platform.short_name().to_string();
    }
    Ok(settings)
}

/// Build a session for the configured adapter, or for a simulated one.
pub(crate) fn open_session(args: &DeviceArgs) -> Result<Arc<Session>, CliError> {
    let settings = load_settings(args)?;
    let config = settings.session_config()?;

    let link = match &args.simulate {
        Some(path) => {
            let rom = fs::read(path)?;
            log::debug!("simulating an adapter with {}", path.display());
            Link::new(SimulatedCartridge::new(rom).with_flash(0))
        }
        None => Link::new(SerialTransport::new(settings.matcher())),
    };
    Ok(Arc::new(Session::new(link, config)))
}

/// Run `request` on a worker, drawing its progress until it finishes.
///
/// Ctrl-C cancels the request; the engine stops at the next page
/// boundary and the link is released before this returns.
pub(crate) fn run_request(
    session: Arc<Session>,
    request: Request,
    quiet: bool,
) -> Result<Outcome, CliError> {
    let rt = tokio::runtime::Runtime::new().map_err(|e| CliError::runtime(e.to_string()))?;

    rt.block_on(async move {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<TransferProgress>();
        let cancel = CancelToken::new();
        let control = RequestControl::new()
            .with_cancel(cancel.clone())
            .with_progress(tx);

        let mut pool = RequestPool::start(1, session);
        pool.submit(Job::new(1, request).with_control(control)).await?;
        pool.close();

        let interrupt = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::warn!("Interrupted, cancelling...");
                cancel.cancel();
            }
        });

        let mut bar = TransferBar::new(quiet);
        let done = drive_with_progress(pool.recv(), rx, |event| bar.update(event)).await;
        bar.finish();
        interrupt.abort();

        let done = done.ok_or_else(|| CliError::runtime("worker exited without a result"))?;
        Ok(done.result?)
    })
}
