//! Process signals
//!
//! SIGTERM and SIGINT request a graceful stop, SIGHUP a configuration
//! reload. Signals are turned into `ControlEvent`s on a channel so the
//! coordinator decides what they mean for its current state.

use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Terminate,
    Reload,
}

/// Spawns the task forwarding signals to `events`
///
/// The task ends once the receiving side is dropped.
#[cfg(unix)]
pub fn spawn_signal_listener(events: mpsc::Sender<ControlEvent>) -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut hangup = signal(SignalKind::hangup())?;

    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                _ = terminate.recv() => {
                    info!("Received SIGTERM");
                    ControlEvent::Terminate
                }
                _ = interrupt.recv() => {
                    info!("Received SIGINT");
                    ControlEvent::Terminate
                }
                _ = hangup.recv() => {
                    info!("Received SIGHUP");
                    ControlEvent::Reload
                }
            };
            if events.send(event).await.is_err() {
                debug!("Control channel closed, stopping signal listener");
                break;
            }
        }
    });
    Ok(())
}

#[cfg(not(unix))]
pub fn spawn_signal_listener(events: mpsc::Sender<ControlEvent>) -> std::io::Result<()> {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C");
            if events.send(ControlEvent::Terminate).await.is_err() {
                debug!("Control channel closed, stopping signal listener");
                break;
            }
        }
    });
    Ok(())
}
