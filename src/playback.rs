//! Paced playback of cascades.
//!
//! Propagation is computed eagerly; playback only spaces the waves out in
//! time. Dropping a stream cancels the rest of the playback.

use async_stream::stream;
use std::time::Duration;
use tokio_stream::Stream;

use crate::propagation::Wave;
use crate::simulation::{Simulation, WaveUpdate};

/// Yield `(index, wave)` pairs, sleeping `delay` before each one.
pub fn wave_stream(waves: Vec<Wave>, delay: Duration) -> impl Stream<Item = (usize, Wave)> {
    stream! {
        for (index, wave) in waves.into_iter().enumerate() {
            tokio::time::sleep(delay).await;
            yield (index, wave);
        }
    }
}

/// Drive the session's pending run, one wave per `delay`, until it completes.
pub fn session_stream(
    sim: &mut Simulation,
    delay: Duration,
) -> impl Stream<Item = WaveUpdate> + '_ {
    stream! {
        while sim.is_running() {
            tokio::time::sleep(delay).await;
            if let Some(update) = sim.advance() {
                yield update;
            }
        }
    }
}
