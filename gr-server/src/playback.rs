//! Background task that drives the playback clock from wall time

use crate::state::AppState;
use gr_core::Tick;
use std::time::Instant;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Start (or restart) the task ticking the active replay.
///
/// The task ends when the clock stops (pause or end of data), when the
/// replay is removed, or when its token is cancelled.
pub async fn start_playback_task(state: AppState) {
    let token = {
        let mut cancel = state.replay_cancel.write().await;
        if let Some(old) = cancel.take() {
            old.cancel();
        }
        let token = CancellationToken::new();
        *cancel = Some(token.clone());
        token
    };

    let replay = state.replay.clone();
    let period = state.config.tick_interval();

    tokio::spawn(async move {
        info!("Playback task started");

        let mut interval = tokio::time::interval(period);
        // Late ticks collapse into one; the clock catches up from elapsed time
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = interval.tick() => {}
            }

            let mut guard = replay.write().await;
            let Some(rs) = guard.as_mut() else { break };

            match rs.controller_mut().tick(Instant::now()) {
                Tick::Idle => break,
                Tick::Finished { index } => {
                    info!("Replay reached the last frame ({})", index);
                    break;
                }
                Tick::Advanced { from, to } => debug!("Advanced {} -> {}", from, to),
                Tick::Held => {}
            }
        }

        info!("Playback task ended");
    });
}
