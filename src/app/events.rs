//! Following a job's event stream from the command line.

use log::warn;
use tokio::sync::broadcast::{error::RecvError, Receiver};

use crate::job::JobEvent;

/// Waits for the job's terminal event.
///
/// Intermediate events are already logged by the job itself. Returns `None`
/// if the channel closes before a terminal event arrives.
pub async fn wait_for_terminal_event(events: &mut Receiver<JobEvent>) -> Option<JobEvent> {
    loop {
        match events.recv().await {
            Ok(event) if event.is_terminal() => return Some(event),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                warn!("Event stream lagged, {skipped} events skipped");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}
