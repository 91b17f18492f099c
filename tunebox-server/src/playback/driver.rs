//! Queue drain
//!
//! Plays the queue front to back on the active device. Each track is played,
//! timed with the shared [`PositionTracker`](super::PositionTracker), and
//! removed from the queue only once it has finished. At most one drain runs
//! process-wide; a stop request ends it within one poll interval and leaves the
//! in-flight entry queued.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tunebox_common::models::{Player, QueueEntry};
use tunebox_common::{Error, Result};

use super::player::resolve_active_player;
use super::{QueueStore, SharedTracker};
use crate::broadcast::Broadcaster;
use crate::media::MediaServer;

/// Value of `active_run` while no drain is executing
const NO_RUN: u64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverState {
    Idle,
    Draining,
    /// Last drain was ended by an explicit stop
    StoppedByRequest,
}

/// How a call to [`PlaybackDriver::run_queue`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Another drain held the run flag; nothing was done
    AlreadyRunning,
    /// No unattempted entries remained
    Completed { played: usize },
    /// The run flag was cleared mid-drain
    Stopped,
    /// The position tracker was reset underneath the drain
    Interrupted,
}

enum WaitOutcome {
    Finished,
    Stopped,
    Interrupted,
}

pub struct PlaybackDriver {
    queue: Arc<QueueStore>,
    media: Arc<dyn MediaServer>,
    tracker: SharedTracker,
    broadcaster: Broadcaster,
    client_name: Option<String>,
    poll_interval: Duration,
    /// Id of the executing drain, or NO_RUN
    active_run: AtomicU64,
    next_run: AtomicU64,
    stopped_by_request: AtomicBool,
}

impl PlaybackDriver {
    pub fn new(
        queue: Arc<QueueStore>,
        media: Arc<dyn MediaServer>,
        tracker: SharedTracker,
        broadcaster: Broadcaster,
        client_name: Option<String>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue,
            media,
            tracker,
            broadcaster,
            client_name,
            poll_interval,
            active_run: AtomicU64::new(NO_RUN),
            next_run: AtomicU64::new(1),
            stopped_by_request: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> DriverState {
        if self.is_draining() {
            DriverState::Draining
        } else if self.stopped_by_request.load(Ordering::Acquire) {
            DriverState::StoppedByRequest
        } else {
            DriverState::Idle
        }
    }

    pub fn is_draining(&self) -> bool {
        self.active_run.load(Ordering::Acquire) != NO_RUN
    }

    /// Drain the queue in a background task
    pub fn start(self: &Arc<Self>) -> JoinHandle<Result<DrainOutcome>> {
        let driver = Arc::clone(self);
        tokio::spawn(async move {
            let result = driver.run_queue().await;
            match &result {
                Ok(outcome) => debug!("Queue drain ended: {:?}", outcome),
                Err(e) => error!("Queue drain failed: {}", e),
            }
            result
        })
    }

    /// Drain the queue on the current task
    ///
    /// Returns immediately with [`DrainOutcome::AlreadyRunning`] if a drain is
    /// executing. The active device is resolved before the run flag is
    /// claimed, so a missing device fails without changing driver state.
    pub async fn run_queue(&self) -> Result<DrainOutcome> {
        if self.is_draining() {
            info!("Playback already active, skipping queue start");
            return Ok(DrainOutcome::AlreadyRunning);
        }

        let player =
            resolve_active_player(self.media.as_ref(), self.client_name.as_deref()).await?;
        debug!("Active player found: {}", player.name);

        let run = self.next_run.fetch_add(1, Ordering::Relaxed);
        if self
            .active_run
            .compare_exchange(NO_RUN, run, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!("Playback already active, skipping queue start");
            return Ok(DrainOutcome::AlreadyRunning);
        }
        self.stopped_by_request.store(false, Ordering::Release);

        let result = self.drain(run, &player).await;

        // A stop (and possibly a newer run) may already own the flag
        let _ = self
            .active_run
            .compare_exchange(run, NO_RUN, Ordering::AcqRel, Ordering::Acquire);
        result
    }

    fn owns_run(&self, run: u64) -> bool {
        self.active_run.load(Ordering::Acquire) == run
    }

    async fn drain(&self, run: u64, player: &Player) -> Result<DrainOutcome> {
        let mut attempted: HashSet<String> = HashSet::new();
        let mut played = 0;

        loop {
            if !self.owns_run(run) {
                info!("Playback stopped by request, leaving the queue loop");
                return Ok(DrainOutcome::Stopped);
            }

            let next = self
                .queue
                .list_all()
                .await?
                .into_iter()
                .find(|entry| !attempted.contains(&entry.item_id));
            let Some(entry) = next else {
                if played == 0 && attempted.is_empty() {
                    warn!("Playback queue is empty");
                }
                return Ok(DrainOutcome::Completed { played });
            };
            attempted.insert(entry.item_id.clone());

            match self.play_entry(run, player, &entry).await {
                Some(WaitOutcome::Finished) => {
                    match self.queue.dequeue_by_id(&entry.item_id).await {
                        Ok(_) | Err(Error::NotFound(_)) => {}
                        Err(e) => return Err(e),
                    }
                    played += 1;
                    self.broadcaster.push_queue().await;
                }
                Some(WaitOutcome::Stopped) => {
                    info!("Playback stopped by request, {} stays queued", entry.title);
                    return Ok(DrainOutcome::Stopped);
                }
                Some(WaitOutcome::Interrupted) => {
                    warn!("Position tracking reset while playing {}", entry.title);
                    return Ok(DrainOutcome::Interrupted);
                }
                None => {}
            }
        }
    }

    /// Play one entry to completion; None when the entry was skipped
    async fn play_entry(
        &self,
        run: u64,
        player: &Player,
        entry: &QueueEntry,
    ) -> Option<WaitOutcome> {
        let track = match self.media.track(&entry.item_id).await {
            Ok(track) => track,
            Err(e) => {
                warn!("Skipping {}: could not resolve track: {}", entry.item_id, e);
                return None;
            }
        };

        let total = track.duration_secs();
        if total == 0 {
            warn!("Skipping {}: no usable duration", track.title);
            return None;
        }

        debug!("Starting playback of {} on {}", track.title, player.name);
        if let Err(e) = self.media.play(player, &track).await {
            warn!("Skipping {}: play command failed: {}", track.title, e);
            return None;
        }
        {
            // A stop clears the flag before it takes the tracker lock
            let mut tracker = self.tracker.lock().await;
            if !self.owns_run(run) {
                return Some(WaitOutcome::Stopped);
            }
            tracker.start(&track.title);
        }

        let outcome = self
            .wait_for_track(run, &track.title, Duration::from_secs(total))
            .await;
        if matches!(outcome, WaitOutcome::Finished) {
            debug!("Finished playing {}, moving to the next song", track.title);
            self.tracker.lock().await.stop();
        }
        Some(outcome)
    }

    /// Poll the tracker until `title` has played for `duration`
    async fn wait_for_track(&self, run: u64, title: &str, duration: Duration) -> WaitOutcome {
        loop {
            if !self.owns_run(run) {
                return WaitOutcome::Stopped;
            }

            {
                let tracker = self.tracker.lock().await;
                match tracker.track_name() {
                    // A stop clears the flag before resetting the tracker
                    None if !self.owns_run(run) => return WaitOutcome::Stopped,
                    None => return WaitOutcome::Interrupted,
                    Some(name) if name == title => {
                        if tracker.get_elapsed_time(title) >= duration {
                            return WaitOutcome::Finished;
                        }
                    }
                    // Device still reports another title; its session will catch up
                    Some(other) => debug!("Waiting for {}, device reports {}", title, other),
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// Stop audio on the active device and end any drain
    ///
    /// Fails with [`Error::NoActivePlayer`] if no device can be resolved, in
    /// which case nothing changes. Once a device is resolved the drain is
    /// ended and the tracker reset even if the stop command itself fails.
    pub async fn stop_playback(&self) -> Result<()> {
        let player = match resolve_active_player(self.media.as_ref(), self.client_name.as_deref())
            .await
        {
            Ok(player) => player,
            Err(Error::NoPlayersFound) => return Err(Error::NoActivePlayer),
            Err(e) => return Err(e),
        };

        info!("Stopping playback on {}", player.name);
        let command = self.media.stop(&player).await;

        self.active_run.store(NO_RUN, Ordering::Release);
        self.stopped_by_request.store(true, Ordering::Release);
        self.tracker.lock().await.reset();

        command
    }
}
