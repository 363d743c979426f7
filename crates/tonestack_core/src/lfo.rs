//! LFO Ticker
//!
//! Drives the modulation LFO from a dedicated thread on a fixed wall-clock
//! period, independent of the audio block rate. Each tick advances the phase
//! once and publishes the derived delay time / amplitude to [`SharedState`],
//! where the audio tick samples it once per buffer (last value wins).
//!
//! If the thread wakes up late, the missed ticks are dropped: the phase
//! advances by exactly one step and the schedule jumps forward.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use tonestack_dsp::mapping::lfo_rate_hz;
use tonestack_dsp::{Lfo, ModulationOutput};
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::message::Event;
use crate::shared::SharedState;
use crate::stage::StageId;

const RATE_SLOT: usize = 0;
const DEPTH_SLOT: usize = 1;

/// Fixed-period tick schedule without catch-up
#[derive(Debug, Clone, Copy)]
pub struct TickSchedule {
    next: Instant,
    period: Duration,
}

impl TickSchedule {
    /// First tick fires one period after `start`
    pub fn new(start: Instant, period: Duration) -> Self {
        Self {
            next: start + period,
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// How long to sleep before the next tick is due
    pub fn wait_time(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }

    /// Decide whether a tick fires at `now`
    ///
    /// Returns `None` when it is too early, otherwise the number of stale
    /// ticks skipped on the way. The schedule moves to the first slot after
    /// `now`.
    pub fn due(&mut self, now: Instant) -> Option<u64> {
        if now < self.next {
            return None;
        }
        let behind = now.duration_since(self.next).as_nanos();
        let dropped = (behind / self.period.as_nanos().max(1)) as u64;
        self.next += self.period * (dropped as u32 + 1);
        Some(dropped)
    }
}

/// Advance the LFO by one tick and publish its output
///
/// While modulation is disabled the phase holds and the output is neutral.
pub fn tick(lfo: &mut Lfo, shared: &SharedState, tick_interval_s: f32) -> ModulationOutput {
    if !shared.is_enabled(StageId::Modulation) {
        shared.reset_lfo_output();
        return ModulationOutput::NEUTRAL;
    }

    let rate = lfo_rate_hz(shared.control(StageId::Modulation, RATE_SLOT));
    let depth = shared.control(StageId::Modulation, DEPTH_SLOT);
    let value = lfo.advance(rate, tick_interval_s);
    let kind = shared.modulation_type();
    let output = kind.derive(value, depth);
    // A type switch since the load wins; the next tick derives for it
    shared.publish_lfo_output(kind, output);
    output
}

/// Handle to the running LFO thread; stops it on drop
pub struct LfoTicker {
    shutdown: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl LfoTicker {
    /// Spawn the `tonestack-lfo` thread
    pub fn spawn(
        shared: Arc<SharedState>,
        events: Sender<Event>,
        period: Duration,
    ) -> EngineResult<Self> {
        let (shutdown, shutdown_rx) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("tonestack-lfo".into())
            .spawn(move || {
                info!("LFO ticker started ({:.1} Hz)", 1.0 / period.as_secs_f64());

                let mut lfo = Lfo::new();
                let tick_interval_s = period.as_secs_f32();
                let mut schedule = TickSchedule::new(Instant::now(), period);

                loop {
                    match shutdown_rx.recv_timeout(schedule.wait_time(Instant::now())) {
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {}
                    }

                    let Some(dropped) = schedule.due(Instant::now()) else {
                        continue;
                    };
                    if dropped > 0 {
                        let total = shared.record_dropped_ticks(dropped);
                        debug!("LFO ticker dropped {} stale ticks ({} total)", dropped, total);
                        let _ = events.try_send(Event::LfoTicksDropped { dropped });
                    }

                    tick(&mut lfo, &shared, tick_interval_s);
                }

                info!("LFO ticker stopped");
            })
            .map_err(|e| EngineError::ThreadSpawn(e.to_string()))?;

        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for it to exit
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        let _ = self.shutdown.try_send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("LFO ticker thread panicked");
            }
        }
    }
}

impl Drop for LfoTicker {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}
