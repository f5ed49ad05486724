//! Ctrl-C handling.

use log::{info, warn};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::job::JobController;

/// Cancels job `id` when the process receives Ctrl-C.
///
/// The returned task should be aborted once the job has finished.
pub fn cancel_on_interrupt(controller: JobController, id: Uuid) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, stopping job {id}...");
                if !controller.cancel(id) {
                    warn!("Job {id} had already finished");
                }
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {e}"),
        }
    })
}
