//! Host registry: every host seen in an offer and how far it got.
//!
//! The registry only grows. A host enters as `Seen` the first time its
//! hostname appears in an offer, moves to `Serviced` when its one task is
//! launched, and ends as `Completed` or `Stalled`. Hosts are never removed
//! and never serviced twice.

use std::collections::{BTreeMap, HashMap};

use hostsweep_core::{Hostname, TaskId, TaskState};

/// Per-host progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostStatus {
    /// Appeared in an offer; no task launched yet.
    Seen,
    /// Task launched, no terminal status yet.
    Serviced { task_id: TaskId },
    /// Task finished successfully.
    Completed { task_id: TaskId },
    /// Task reached a non-success terminal state. Not retried.
    Stalled { task_id: TaskId, state: TaskState },
}

impl HostStatus {
    pub fn is_serviced(&self) -> bool {
        !matches!(self, HostStatus::Seen)
    }

    pub fn task_id(&self) -> Option<&str> {
        match self {
            HostStatus::Seen => None,
            HostStatus::Serviced { task_id }
            | HostStatus::Completed { task_id }
            | HostStatus::Stalled { task_id, .. } => Some(task_id),
        }
    }
}

#[derive(Debug, Default)]
pub struct HostRegistry {
    /// Known-hosts set, keyed by hostname. Ordered for stable listings.
    hosts: BTreeMap<Hostname, HostStatus>,
    /// task_id → hostname for every launched task.
    tasks: HashMap<TaskId, Hostname>,
}

impl HostRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hostname to the known set. Returns true if it was new.
    pub fn observe(&mut self, hostname: &str) -> bool {
        if self.hosts.contains_key(hostname) {
            return false;
        }
        self.hosts.insert(hostname.to_string(), HostStatus::Seen);
        true
    }

    pub fn is_known(&self, hostname: &str) -> bool {
        self.hosts.contains_key(hostname)
    }

    pub fn is_serviced(&self, hostname: &str) -> bool {
        self.hosts
            .get(hostname)
            .is_some_and(HostStatus::is_serviced)
    }

    pub fn status(&self, hostname: &str) -> Option<&HostStatus> {
        self.hosts.get(hostname)
    }

    /// Record that `task_id` was launched for `hostname`.
    ///
    /// Only a known, not yet serviced host can be marked. Returns false
    /// (and changes nothing) otherwise.
    pub fn mark_serviced(&mut self, hostname: &str, task_id: &str) -> bool {
        match self.hosts.get_mut(hostname) {
            Some(status) if *status == HostStatus::Seen => {
                *status = HostStatus::Serviced {
                    task_id: task_id.to_string(),
                };
                self.tasks.insert(task_id.to_string(), hostname.to_string());
                true
            }
            _ => false,
        }
    }

    /// Hostname a task was launched for, if the task is ours.
    pub fn host_for_task(&self, task_id: &str) -> Option<&str> {
        self.tasks.get(task_id).map(String::as_str)
    }

    /// Move a host to `Completed`. Returns true on the first completion only.
    ///
    /// A host whose task was reported lost may still complete if the task
    /// later reports success.
    pub fn mark_completed(&mut self, hostname: &str) -> bool {
        let Some(status) = self.hosts.get_mut(hostname) else {
            return false;
        };
        let task_id = match status {
            HostStatus::Serviced { task_id } | HostStatus::Stalled { task_id, .. } => {
                std::mem::take(task_id)
            }
            HostStatus::Seen | HostStatus::Completed { .. } => return false,
        };
        *status = HostStatus::Completed { task_id };
        true
    }

    /// Move a serviced host to `Stalled`. Returns true if it changed.
    pub fn mark_stalled(&mut self, hostname: &str, state: TaskState) -> bool {
        let Some(status) = self.hosts.get_mut(hostname) else {
            return false;
        };
        let task_id = match status {
            HostStatus::Serviced { task_id } => std::mem::take(task_id),
            _ => return false,
        };
        *status = HostStatus::Stalled { task_id, state };
        true
    }

    pub fn known_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn serviced_count(&self) -> usize {
        self.hosts.values().filter(|s| s.is_serviced()).count()
    }

    pub fn completed_count(&self) -> usize {
        self.hosts
            .values()
            .filter(|s| matches!(s, HostStatus::Completed { .. }))
            .count()
    }

    /// Known hosts with no task launched yet.
    pub fn unserviced(&self) -> Vec<Hostname> {
        self.hosts_where(|s| matches!(s, HostStatus::Seen))
    }

    /// Hosts with a launched task and no terminal status.
    pub fn pending(&self) -> Vec<Hostname> {
        self.hosts_where(|s| matches!(s, HostStatus::Serviced { .. }))
    }

    /// Hosts whose task ended in a non-success state, with that state.
    pub fn stalled(&self) -> Vec<(Hostname, TaskState)> {
        self.hosts
            .iter()
            .filter_map(|(host, status)| match status {
                HostStatus::Stalled { state, .. } => Some((host.clone(), *state)),
                _ => None,
            })
            .collect()
    }

    fn hosts_where(&self, pred: impl Fn(&HostStatus) -> bool) -> Vec<Hostname> {
        self.hosts
            .iter()
            .filter(|(_, status)| pred(status))
            .map(|(host, _)| host.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observe_is_idempotent() {
        let mut registry = HostRegistry::new();
        assert!(registry.observe("h1"));
        assert!(!registry.observe("h1"));
        assert_eq!(registry.known_count(), 1);
        assert_eq!(registry.status("h1"), Some(&HostStatus::Seen));
    }

    #[test]
    fn unknown_host_cannot_be_serviced() {
        let mut registry = HostRegistry::new();
        assert!(!registry.mark_serviced("ghost", "t-1"));
        assert!(!registry.is_known("ghost"));
        assert!(registry.host_for_task("t-1").is_none());
    }

    #[test]
    fn host_is_serviced_once() {
        let mut registry = HostRegistry::new();
        registry.observe("h1");
        assert!(registry.mark_serviced("h1", "t-1"));
        assert!(!registry.mark_serviced("h1", "t-2"));

        assert_eq!(registry.host_for_task("t-1"), Some("h1"));
        assert!(registry.host_for_task("t-2").is_none());
        assert_eq!(registry.status("h1").and_then(HostStatus::task_id), Some("t-1"));
    }

    #[test]
    fn completion_counts_once() {
        let mut registry = HostRegistry::new();
        registry.observe("h1");
        registry.mark_serviced("h1", "t-1");

        assert!(registry.mark_completed("h1"));
        assert!(!registry.mark_completed("h1"));
        assert_eq!(registry.completed_count(), 1);
    }

    #[test]
    fn seen_host_cannot_complete() {
        let mut registry = HostRegistry::new();
        registry.observe("h1");
        assert!(!registry.mark_completed("h1"));
        assert!(!registry.mark_stalled("h1", TaskState::Failed));
    }

    #[test]
    fn stalled_host_can_still_complete() {
        let mut registry = HostRegistry::new();
        registry.observe("h1");
        registry.mark_serviced("h1", "t-1");

        assert!(registry.mark_stalled("h1", TaskState::Lost));
        assert_eq!(registry.stalled(), vec![("h1".to_string(), TaskState::Lost)]);

        assert!(registry.mark_completed("h1"));
        assert!(registry.stalled().is_empty());
        assert_eq!(
            registry.status("h1"),
            Some(&HostStatus::Completed { task_id: "t-1".to_string() })
        );
    }

    #[test]
    fn listings_partition_known_hosts() {
        let mut registry = HostRegistry::new();
        for host in ["a", "b", "c", "d"] {
            registry.observe(host);
        }
        registry.mark_serviced("b", "t-b");
        registry.mark_serviced("c", "t-c");
        registry.mark_serviced("d", "t-d");
        registry.mark_completed("c");
        registry.mark_stalled("d", TaskState::Failed);

        assert_eq!(registry.unserviced(), vec!["a"]);
        assert_eq!(registry.pending(), vec!["b"]);
        assert_eq!(registry.stalled(), vec![("d".to_string(), TaskState::Failed)]);
        assert_eq!(registry.serviced_count(), 3);
        assert_eq!(registry.completed_count(), 1);
    }
}
