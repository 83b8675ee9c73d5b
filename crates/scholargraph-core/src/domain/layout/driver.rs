//! Background ticking for the layout simulation
//!
//! One tick per frame while the simulation is running, under the host's
//! write lock so a tick never observes a half-applied mutation. While the
//! layout is idle the task parks on a `Notify` and costs nothing.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;
use tracing::debug;

use super::simulation::LayoutSimulation;

/// Default frame interval (~60 fps)
pub const DEFAULT_FRAME: Duration = Duration::from_millis(16);

/// State that owns a layout simulation
pub trait LayoutHost: Send + Sync + 'static {
    fn layout_mut(&mut self) -> &mut LayoutSimulation;
}

impl LayoutHost for LayoutSimulation {
    fn layout_mut(&mut self) -> &mut LayoutSimulation {
        self
    }
}

/// Handle to the ticking task; aborts it on drop
#[derive(Debug)]
pub struct LayoutDriver {
    handle: JoinHandle<()>,
    wake: Arc<Notify>,
}

impl LayoutDriver {
    /// Spawn the ticking task on the current runtime
    pub fn spawn<H: LayoutHost>(host: Arc<RwLock<H>>, wake: Arc<Notify>, frame: Duration) -> Self {
        let signal = Arc::clone(&wake);
        let handle = tokio::spawn(async move {
            loop {
                let running = {
                    let mut guard = host.write().await;
                    guard.layout_mut().tick()
                };
                if running {
                    tokio::time::sleep(frame).await;
                } else {
                    debug!("Layout idle, waiting for changes");
                    signal.notified().await;
                }
            }
        });
        Self { handle, wake }
    }

    /// Resume ticking after a change to the visible set or a drag event
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    pub fn shutdown(self) {
        self.handle.abort();
    }
}

impl Drop for LayoutDriver {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
