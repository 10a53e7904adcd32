// Progress coordinator - relays download progress to the surface
//
// Events arrive on the download worker's context and are marshaled through
// the dispatch queue before touching display state. Completion reveals the
// output directory and arms a cancellable timer that drops the status line
// back to idle.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use super::dispatch::Dispatcher;
use super::errors::ExtractError;
use super::models::{DownloadOutcome, ProgressEvent, ProgressStatus};
use super::surface::Surface;
use super::utils::{strip_ansi, truncate};

const IDLE_TEXT: &str = "Idle";

pub struct ProgressCoordinator {
    dispatch: Dispatcher,
    surface: Arc<dyn Surface>,
    idle_reset_secs: u64,
    reset_task: Mutex<Option<JoinHandle<()>>>,
}

impl ProgressCoordinator {
    pub fn new(dispatch: Dispatcher, surface: Arc<dyn Surface>, idle_reset_secs: u64) -> Self {
        Self {
            dispatch,
            surface,
            idle_reset_secs,
            reset_task: Mutex::new(None),
        }
    }

    /// A new download is starting: cancel any pending idle reset and put
    /// the surface into its busy state.
    pub fn begin(&self) {
        self.cancel_pending_reset();
        let surface = self.surface.clone();
        self.dispatch.submit(move || {
            surface.set_controls_enabled(false);
            surface.set_download_status("Preparing...");
            surface.set_progress_percent(None);
        });
    }

    /// One progress callback from the download collaborator. Percent text
    /// from the service may carry terminal styling; strip it before it can
    /// reach the display.
    pub fn on_event(&self, event: ProgressEvent) {
        let surface = self.surface.clone();
        let artifact = strip_ansi(&event.artifact);
        self.dispatch.submit(move || match event.status {
            ProgressStatus::Downloading => {
                surface.set_progress_percent(event.percent);
                if artifact.is_empty() {
                    surface.set_download_status("Downloading...");
                } else {
                    surface.set_download_status(&format!("Downloading {}", artifact));
                }
            }
            ProgressStatus::Finished => {
                surface.set_progress_percent(Some(100.0));
                surface.set_download_status("Finishing...");
            }
        });
    }

    /// Final outcome of the download worker. Always re-enables the
    /// controls and arms the idle reset; the directory is only revealed on
    /// success.
    pub fn on_complete(
        &self,
        result: Result<DownloadOutcome, ExtractError>,
        output_dir: PathBuf,
        note: Option<String>,
    ) {
        let surface = self.surface.clone();
        self.dispatch.submit(move || {
            match result {
                Ok(outcome) => {
                    let mut text = if outcome.artifact.is_empty() {
                        "Download complete!".to_string()
                    } else {
                        format!("Download complete: {}", strip_ansi(&outcome.artifact))
                    };
                    if let Some(note) = note {
                        text.push(' ');
                        text.push_str(&note);
                    }
                    surface.set_progress_percent(Some(100.0));
                    surface.set_download_status(&text);
                    surface.reveal_directory(&output_dir);
                }
                Err(e) => {
                    surface.set_progress_percent(None);
                    surface.set_download_status(&format!(
                        "Download failed: {}",
                        truncate(&strip_ansi(&e.to_string()), 200)
                    ));
                }
            }
            surface.set_controls_enabled(true);
        });

        self.schedule_idle_reset();
    }

    fn schedule_idle_reset(&self) {
        let dispatch = self.dispatch.clone();
        let surface = self.surface.clone();
        let delay = Duration::from_secs(self.idle_reset_secs);

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            dispatch.submit(move || {
                surface.set_download_status(IDLE_TEXT);
                surface.set_progress_percent(None);
            });
        });

        if let Some(previous) = self.reset_task.lock().unwrap().replace(handle) {
            previous.abort();
        }
    }

    fn cancel_pending_reset(&self) {
        if let Some(task) = self.reset_task.lock().unwrap().take() {
            task.abort();
        }
    }
}

impl Drop for ProgressCoordinator {
    fn drop(&mut self) {
        self.cancel_pending_reset();
    }
}
