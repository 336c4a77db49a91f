//! Job-completion hooks for collaborators that react to finished work
//! (for example mounting salvaged content).

use derelict_core::events::Event;
use derelict_core::jobs::Job;

/// Called once per completed job, after the tick that completed it.
///
/// `events` holds what the job's effect emitted, including `job_completed`.
pub trait JobHook: Send {
    fn on_job_completed(&mut self, job: &Job, events: &[Event]);
}

impl<F> JobHook for F
where
    F: FnMut(&Job, &[Event]) + Send,
{
    fn on_job_completed(&mut self, job: &Job, events: &[Event]) {
        self(job, events)
    }
}
