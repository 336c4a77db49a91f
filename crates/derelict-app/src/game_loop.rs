//! Time drivers: the auto-tick background thread and hibernation.
//!
//! Both take the session lock once per step or chunk and release it in
//! between, so readers and player actions interleave with time advancing.

use std::io;
use std::sync::mpsc;
use std::time::Instant;

use derelict_core::events::Event;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::state::{lock, LoopCommand, Session};

/// Spawns the auto-tick loop on a named thread.
///
/// Returns the command sender and a receiver carrying the events of every
/// applied action and every tick (empty batches are not sent).
pub fn spawn_auto_tick(
    session: Session,
    config: &AppConfig,
) -> io::Result<(mpsc::Sender<LoopCommand>, mpsc::Receiver<Vec<Event>>)> {
    let (cmd_tx, cmd_rx) = mpsc::channel::<LoopCommand>();
    let (event_tx, event_rx) = mpsc::channel::<Vec<Event>>();
    let interval = config.tick_interval();
    let dt = config.seconds_per_tick;

    std::thread::Builder::new()
        .name("derelict-auto-tick".into())
        .spawn(move || run_auto_tick(&session, &cmd_rx, &event_tx, interval, dt))?;

    Ok((cmd_tx, event_rx))
}

/// The loop. Runs until Shutdown or until the command sender is dropped.
fn run_auto_tick(
    session: &Session,
    cmd_rx: &mpsc::Receiver<LoopCommand>,
    event_tx: &mpsc::Sender<Vec<Event>>,
    interval: std::time::Duration,
    dt: f64,
) {
    let mut paused = false;
    let mut next_tick_time = Instant::now();
    info!(?interval, dt, "auto-tick started");

    loop {
        // 1. Drain all pending commands
        loop {
            match cmd_rx.try_recv() {
                Ok(LoopCommand::Action(action)) => {
                    let events = lock(session).apply_action(&action);
                    publish(event_tx, events);
                }
                Ok(LoopCommand::Pause) => {
                    debug!("auto-tick paused");
                    paused = true;
                }
                Ok(LoopCommand::Resume) => {
                    debug!("auto-tick resumed");
                    paused = false;
                    next_tick_time = Instant::now();
                }
                Ok(LoopCommand::Shutdown) | Err(mpsc::TryRecvError::Disconnected) => {
                    info!("auto-tick stopped");
                    return;
                }
                Err(mpsc::TryRecvError::Empty) => break,
            }
        }

        // 2. Advance one step
        if !paused {
            let events = lock(session).tick(dt);
            publish(event_tx, events);
        }

        // 3. Sleep until next tick
        next_tick_time += interval;
        let now = Instant::now();
        if next_tick_time > now {
            std::thread::sleep(next_tick_time - now);
        } else if now - next_tick_time > interval * 2 {
            // Too far behind; reset to avoid a catch-up spiral
            next_tick_time = now;
        }
    }
}

fn publish(event_tx: &mpsc::Sender<Vec<Event>>, events: Vec<Event>) {
    if !events.is_empty() {
        // Nobody listening is fine; the loop keeps time regardless.
        let _ = event_tx.send(events);
    }
}

/// Outcome of a hibernation request.
#[derive(Debug, Clone, Default)]
pub struct HibernateReport {
    pub requested_s: u64,
    /// Simulated seconds actually slept.
    pub elapsed_s: u64,
    /// The first event that matched the wake condition, if any.
    pub woke_by: Option<Event>,
    /// Every event produced while hibernating.
    pub events: Vec<Event>,
}

impl HibernateReport {
    pub fn woke_early(&self) -> bool {
        self.woke_by.is_some()
    }
}

/// Skip `total_s` seconds in 1-second ticks, `chunk_s` ticks per lock.
/// After each chunk the chunk's events are checked against `wake`; the
/// first match ends hibernation early.
pub fn hibernate<F>(session: &Session, total_s: u64, chunk_s: u64, mut wake: F) -> HibernateReport
where
    F: FnMut(&Event) -> bool,
{
    let chunk_s = chunk_s.max(1);
    let mut report = HibernateReport {
        requested_s: total_s,
        ..Default::default()
    };

    while report.elapsed_s < total_s {
        let steps = chunk_s.min(total_s - report.elapsed_s);
        let chunk: Vec<Event> = {
            let mut engine = lock(session);
            (0..steps).flat_map(|_| engine.tick(1.0)).collect()
        };
        report.elapsed_s += steps;

        report.woke_by = chunk.iter().find(|e| wake(e)).cloned();
        report.events.extend(chunk);
        if report.woke_early() {
            info!(elapsed_s = report.elapsed_s, "hibernation interrupted");
            break;
        }
    }
    report
}
