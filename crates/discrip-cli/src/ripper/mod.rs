//! The scan loop.
//!
//! One `Ripper` drives one physical drive forever: eject, wait for the user
//! to load a disc, scan it with the door locked while streaming progress to
//! the bus, record the summary, and start over.

mod progress;

pub use progress::{ProgressTracker, ScanUpdate};

use std::sync::Arc;

use discrip_core::{
    DiscIdentity, DiscStore, DiscSummary, DriveTopics, Event, ProgressPayload, PublishOptions,
};
use discrip_runtime::{CommandRunner, DriveController, DriveError, OutboundPublisher, RunnerError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Failures that end the scan loop.
#[derive(Debug, Error)]
pub enum RipperError {
    #[error(transparent)]
    Drive(#[from] DriveError),

    #[error(transparent)]
    Runner(#[from] RunnerError),
}

pub struct Ripper {
    controller: DriveController,
    runner: Arc<CommandRunner>,
    publisher: OutboundPublisher,
    topics: DriveTopics,
    store: Arc<dyn DiscStore>,
    autoclose: bool,
}

impl Ripper {
    pub fn new(
        controller: DriveController,
        runner: Arc<CommandRunner>,
        publisher: OutboundPublisher,
        topics: DriveTopics,
        store: Arc<dyn DiscStore>,
        autoclose: bool,
    ) -> Self {
        Self {
            controller,
            runner,
            publisher,
            topics,
            store,
            autoclose,
        }
    }

    /// Run the drive loop until `cancel` fires or a device error occurs.
    ///
    /// Cancelling drops the in-flight step: a running tool is killed and a
    /// locked door is unlocked in the background.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), RipperError> {
        tokio::select! {
            result = self.drive_loop() => result,
            () = cancel.cancelled() => {
                info!("Scan loop cancelled");
                Ok(())
            }
        }
    }

    pub async fn drive_loop(&self) -> Result<(), RipperError> {
        let device = self.controller.device_path();
        loop {
            self.publish_progress(&ProgressPayload::awaiting_disc());

            info!(device = %device.display(), "Waiting for a disc");
            self.controller.cycle(self.autoclose).await?;
            self.controller.wait_disc_ready().await?;

            if !self.controller.is_disc_ok().await? {
                info!("Tray closed without a readable disc");
                continue;
            }

            let identity = match discrip_runtime::probe_disc_identity(&device).await {
                Ok(identity) => identity,
                Err(e) => {
                    warn!(error = %e, "Could not identify disc, skipping");
                    continue;
                }
            };

            self.process_disc(&identity).await?;
        }
    }

    /// Scan an identified disc and hand the summary to the store.
    ///
    /// Store failures are logged; the scan itself has already been published.
    pub async fn process_disc(&self, identity: &DiscIdentity) -> Result<DiscSummary, RipperError> {
        let known = match self.store.contains(identity.disc_id).await {
            Ok(known) => known,
            Err(e) => {
                warn!(error = %e, "Disc lookup failed");
                false
            }
        };
        info!(disc_id = identity.disc_id, label = %identity.label, known, "Disc identified");

        let summary = self.scan_disc().await?;

        if let Err(e) = self.store.record(identity, &summary).await {
            error!(disc_id = identity.disc_id, error = %e, "Failed to record disc");
        }
        Ok(summary)
    }

    /// Scan the inserted disc with the door locked, forwarding progress and
    /// messages to the bus while the tool runs.
    pub async fn scan_disc(&self) -> Result<DiscSummary, RipperError> {
        let execution = self
            .controller
            .with_locked_door(async {
                info!("Scanning disc");
                self.publish_progress(&ProgressPayload::starting());
                let (execution, ()) = tokio::join!(self.runner.run_info(true), self.forward_events());
                execution
            })
            .await??;

        debug!(command_number = execution.command_number, events = execution.history.len(), "Scan finished");
        Ok(DiscSummary::from_history(&execution.history))
    }

    /// Consume queued events for the next command until its `Stop`.
    async fn forward_events(&self) {
        let mut tracker = ProgressTracker::new();
        let mut command = None;

        loop {
            let event = self.runner.next_event().await;
            match (&event, command) {
                (Event::Start { command_number }, None) => {
                    command = Some(*command_number);
                    continue;
                }
                (_, None) => continue,
                _ => {}
            }

            if let Some(update) = tracker.apply(&event) {
                self.publish(update);
            }
            if event.is_stop() && event.command_number() == command {
                break;
            }
        }
    }

    fn publish(&self, update: ScanUpdate) {
        match update {
            ScanUpdate::Progress(payload) => {
                self.publisher
                    .enqueue(self.topics.progress(), payload, PublishOptions::default());
            }
            ScanUpdate::Message(payload) => {
                self.publisher
                    .enqueue(self.topics.message(), payload, PublishOptions::default());
            }
        }
    }

    fn publish_progress(&self, payload: &ProgressPayload) {
        self.publish(ScanUpdate::Progress(payload.to_json()));
    }
}
