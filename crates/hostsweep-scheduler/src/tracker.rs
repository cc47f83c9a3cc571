//! Completion tracker: counts successful hosts and decides when to stop.

use tracing::{debug, info, warn};

use hostsweep_core::TaskStatus;

use crate::registry::HostRegistry;

/// What the event loop should do after a status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationDecision {
    Continue,
    /// Every known host has completed; stop the driver.
    Terminate,
}

#[derive(Debug, Default)]
pub struct CompletionTracker {
    /// Hosts whose task finished successfully. Never exceeds the number
    /// of known hosts.
    completed: usize,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Record a status update and evaluate termination.
    ///
    /// Only `Finished` counts, and only once per host. Failed, lost and
    /// other non-success terminal states mark the host stalled: they are
    /// not retried and the run cannot complete without that host. Updates
    /// for tasks this scheduler never launched are ignored.
    pub fn observe(
        &mut self,
        registry: &mut HostRegistry,
        status: &TaskStatus,
    ) -> TerminationDecision {
        let Some(hostname) = registry.host_for_task(&status.task_id).map(str::to_string) else {
            warn!(
                task_id = %status.task_id,
                state = %status.state,
                "status update for unknown task, ignoring"
            );
            return self.evaluate(registry);
        };

        if status.state.is_success() {
            if registry.mark_completed(&hostname) {
                self.completed += 1;
                info!(
                    %hostname,
                    task_id = %status.task_id,
                    completed = self.completed,
                    known = registry.known_count(),
                    "installer finished on host"
                );
            } else {
                debug!(%hostname, task_id = %status.task_id, "duplicate completion, ignoring");
            }
        } else if status.state.is_terminal() {
            registry.mark_stalled(&hostname, status.state);
            warn!(
                %hostname,
                task_id = %status.task_id,
                state = %status.state,
                message = status.message.as_deref().unwrap_or(""),
                "installer task ended without success; host will not be retried"
            );
        } else {
            info!(
                %hostname,
                task_id = %status.task_id,
                state = %status.state,
                "task status update"
            );
        }

        self.evaluate(registry)
    }

    /// `Terminate` iff the completion count has reached a non-zero number
    /// of known hosts.
    pub fn evaluate(&self, registry: &HostRegistry) -> TerminationDecision {
        let known = registry.known_count();
        if known > 0 && self.completed == known {
            TerminationDecision::Terminate
        } else {
            TerminationDecision::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use hostsweep_core::TaskState;

    use super::*;

    fn serviced_registry(hosts: &[(&str, &str)]) -> HostRegistry {
        let mut registry = HostRegistry::new();
        for (host, task) in hosts {
            registry.observe(host);
            registry.mark_serviced(host, task);
        }
        registry
    }

    #[test]
    fn empty_registry_never_terminates() {
        let tracker = CompletionTracker::new();
        let registry = HostRegistry::new();
        assert_eq!(tracker.evaluate(&registry), TerminationDecision::Continue);
    }

    #[test]
    fn terminates_when_all_hosts_finish() {
        let mut registry = serviced_registry(&[("h1", "t1"), ("h2", "t2")]);
        let mut tracker = CompletionTracker::new();

        let first = tracker.observe(&mut registry, &TaskStatus::new("t1", TaskState::Finished));
        assert_eq!(first, TerminationDecision::Continue);
        assert_eq!(tracker.completed(), 1);

        let second = tracker.observe(&mut registry, &TaskStatus::new("t2", TaskState::Finished));
        assert_eq!(second, TerminationDecision::Terminate);
        assert_eq!(tracker.completed(), 2);
    }

    #[test]
    fn running_updates_do_not_count() {
        let mut registry = serviced_registry(&[("h1", "t1")]);
        let mut tracker = CompletionTracker::new();

        for state in [TaskState::Staging, TaskState::Starting, TaskState::Running] {
            let decision = tracker.observe(&mut registry, &TaskStatus::new("t1", state));
            assert_eq!(decision, TerminationDecision::Continue);
        }
        assert_eq!(tracker.completed(), 0);
    }

    #[test]
    fn failed_and_lost_stall_without_counting() {
        let mut registry = serviced_registry(&[("h1", "t1"), ("h2", "t2")]);
        let mut tracker = CompletionTracker::new();

        tracker.observe(&mut registry, &TaskStatus::new("t1", TaskState::Failed));
        tracker.observe(&mut registry, &TaskStatus::new("t2", TaskState::Lost));

        assert_eq!(tracker.completed(), 0);
        assert_eq!(
            registry.stalled(),
            vec![
                ("h1".to_string(), TaskState::Failed),
                ("h2".to_string(), TaskState::Lost)
            ]
        );
    }

    #[test]
    fn repeated_finish_counts_once() {
        let mut registry = serviced_registry(&[("h1", "t1"), ("h2", "t2")]);
        let mut tracker = CompletionTracker::new();

        tracker.observe(&mut registry, &TaskStatus::new("t1", TaskState::Finished));
        let decision = tracker.observe(&mut registry, &TaskStatus::new("t1", TaskState::Finished));

        assert_eq!(decision, TerminationDecision::Continue);
        assert_eq!(tracker.completed(), 1);
    }

    #[test]
    fn unknown_task_is_ignored() {
        let mut registry = serviced_registry(&[("h1", "t1")]);
        let mut tracker = CompletionTracker::new();

        let stray = TaskStatus::new("stray", TaskState::Finished);
        let decision = tracker.observe(&mut registry, &stray);

        assert_eq!(decision, TerminationDecision::Continue);
        assert_eq!(tracker.completed(), 0);
        assert_eq!(registry.completed_count(), 0);
    }
}
