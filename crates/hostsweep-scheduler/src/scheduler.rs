//! InstallScheduler: the event-handling state machine.
//!
//! Owns the host registry, the dispatcher and the tracker, so both
//! handlers share one exclusion domain: they take `&mut self` and cannot
//! overlap. Once the run is done, offers are declined and statuses are
//! ignored.

use tracing::{debug, info};

use hostsweep_core::{Offer, Payload, TaskStatus};

use crate::dispatcher::{Dispatch, OfferDispatcher};
use crate::progress::{Progress, RunPhase};
use crate::registry::HostRegistry;
use crate::tracker::{CompletionTracker, TerminationDecision};

pub struct InstallScheduler {
    registry: HostRegistry,
    dispatcher: OfferDispatcher,
    tracker: CompletionTracker,
    done: bool,
}

impl InstallScheduler {
    pub fn new(payload: Payload) -> Self {
        Self::with_dispatcher(OfferDispatcher::new(payload))
    }

    pub fn with_dispatcher(dispatcher: OfferDispatcher) -> Self {
        Self {
            registry: HostRegistry::new(),
            dispatcher,
            tracker: CompletionTracker::new(),
            done: false,
        }
    }

    /// Handle one offer batch.
    pub fn handle_offers(&mut self, offers: &[Offer]) -> Dispatch {
        if self.done {
            debug!(offers = offers.len(), "run complete, declining offers");
            return Dispatch {
                launches: Vec::new(),
                declined: offers.iter().map(|o| o.id.clone()).collect(),
            };
        }

        let dispatch = self.dispatcher.dispatch(&mut self.registry, offers);
        debug!(
            offers = offers.len(),
            launched = dispatch.launches.len(),
            declined = dispatch.declined.len(),
            known = self.registry.known_count(),
            phase = %self.phase(),
            "offer batch dispatched"
        );
        dispatch
    }

    /// Handle one status update.
    pub fn handle_status(&mut self, status: &TaskStatus) -> TerminationDecision {
        if self.done {
            debug!(
                task_id = %status.task_id,
                state = %status.state,
                "run complete, ignoring status"
            );
            return TerminationDecision::Terminate;
        }

        let decision = self.tracker.observe(&mut self.registry, status);
        if decision == TerminationDecision::Terminate {
            self.done = true;
            info!(
                hosts = self.registry.known_count(),
                "installer completed on every known host"
            );
        }
        decision
    }

    pub fn phase(&self) -> RunPhase {
        if self.done {
            RunPhase::Done
        } else if self.registry.known_count() > 0
            && self.registry.serviced_count() == self.registry.known_count()
        {
            RunPhase::Draining
        } else {
            RunPhase::Collecting
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn completed(&self) -> usize {
        self.tracker.completed()
    }

    pub fn registry(&self) -> &HostRegistry {
        &self.registry
    }

    pub fn progress(&self) -> Progress {
        Progress {
            phase: self.phase(),
            known: self.registry.known_count(),
            serviced: self.registry.serviced_count(),
            completed: self.tracker.completed(),
            unserviced: self.registry.unserviced(),
            pending: self.registry.pending(),
            stalled: self.registry.stalled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use hostsweep_core::{Resource, TaskState};

    use super::*;

    fn test_scheduler() -> InstallScheduler {
        InstallScheduler::new(Payload::new(
            "http://repo.local/cni",
            "install.py",
            "python",
            ["http://repo.local/cni".to_string(), "vsd.local".to_string()],
        ))
    }

    fn offer(id: &str, hostname: &str) -> Offer {
        Offer {
            id: id.to_string(),
            agent_id: format!("agent-{hostname}"),
            hostname: hostname.to_string(),
            resources: vec![Resource::scalar("cpus", 2.0)],
        }
    }

    fn finished(task_id: &str) -> TaskStatus {
        TaskStatus::new(task_id, TaskState::Finished)
    }

    /// Scenario A: returns the task ids launched for h1 and h2.
    fn launch_h1_h2(scheduler: &mut InstallScheduler) -> (String, String) {
        let dispatch = scheduler.handle_offers(&[offer("o1", "h1"), offer("o2", "h2")]);
        assert_eq!(dispatch.launches.len(), 2);
        assert_ne!(dispatch.launches[0].task.id, dispatch.launches[1].task.id);
        (
            dispatch.launches[0].task.id.clone(),
            dispatch.launches[1].task.id.clone(),
        )
    }

    #[test]
    fn starts_collecting_with_nothing_known() {
        let scheduler = test_scheduler();
        assert_eq!(scheduler.phase(), RunPhase::Collecting);
        assert_eq!(scheduler.progress(), Progress::initial());
    }

    #[test]
    fn finishing_every_host_terminates() {
        let mut scheduler = test_scheduler();
        let (t1, t2) = launch_h1_h2(&mut scheduler);
        assert_eq!(scheduler.phase(), RunPhase::Draining);

        // Scenario B
        assert_eq!(scheduler.handle_status(&finished(&t1)), TerminationDecision::Continue);
        assert_eq!(scheduler.completed(), 1);

        // Scenario C
        assert_eq!(scheduler.handle_status(&finished(&t2)), TerminationDecision::Terminate);
        assert_eq!(scheduler.completed(), 2);
        assert_eq!(scheduler.phase(), RunPhase::Done);
    }

    #[test]
    fn failed_host_blocks_termination() {
        // Scenario D
        let mut scheduler = test_scheduler();
        let (t1, t2) = launch_h1_h2(&mut scheduler);

        assert_eq!(
            scheduler.handle_status(&TaskStatus::new(&t1, TaskState::Failed)),
            TerminationDecision::Continue
        );
        assert_eq!(scheduler.completed(), 0);

        assert_eq!(scheduler.handle_status(&finished(&t2)), TerminationDecision::Continue);
        assert!(!scheduler.is_done());

        let progress = scheduler.progress();
        assert_eq!(progress.stalled, vec![("h1".to_string(), TaskState::Failed)]);
        assert!(progress.is_blocked());
    }

    #[test]
    fn late_host_defers_termination() {
        // Scenario E. h3 has to appear before h2 finishes: with h1 and h2
        // both done the run is already over and h3's offer is declined.
        let mut scheduler = test_scheduler();
        let (t1, _) = launch_h1_h2(&mut scheduler);
        scheduler.handle_status(&finished(&t1));

        let dispatch = scheduler.handle_offers(&[offer("o3", "h3"), offer("o4", "h1")]);
        assert_eq!(dispatch.launches.len(), 1);
        assert_eq!(dispatch.declined, vec!["o4"]);
        let t3 = dispatch.launches[0].task.id.clone();

        // Remaining h2 finishes: 2 of 3.
        let t2 = scheduler
            .registry()
            .status("h2")
            .and_then(|s| s.task_id())
            .map(str::to_string)
            .unwrap();
        assert_eq!(scheduler.handle_status(&finished(&t2)), TerminationDecision::Continue);
        assert_eq!(scheduler.registry().known_count(), 3);

        assert_eq!(scheduler.handle_status(&finished(&t3)), TerminationDecision::Terminate);
    }

    #[test]
    fn new_host_returns_run_to_collecting() {
        let mut scheduler = test_scheduler();
        launch_h1_h2(&mut scheduler);
        assert_eq!(scheduler.phase(), RunPhase::Draining);

        scheduler.registry.observe("h3");
        assert_eq!(scheduler.phase(), RunPhase::Collecting);
    }

    #[test]
    fn reoffered_batch_is_fully_declined() {
        let mut scheduler = test_scheduler();
        let batch = [offer("o1", "h1"), offer("o2", "h2")];
        scheduler.handle_offers(&batch);

        let again = scheduler.handle_offers(&batch);
        assert!(again.launches.is_empty());
        assert_eq!(again.declined.len(), 2);
    }

    #[test]
    fn offers_after_done_are_declined() {
        let mut scheduler = test_scheduler();
        let (t1, t2) = launch_h1_h2(&mut scheduler);
        scheduler.handle_status(&finished(&t1));
        scheduler.handle_status(&finished(&t2));

        let dispatch = scheduler.handle_offers(&[offer("o9", "h9")]);
        assert!(dispatch.launches.is_empty());
        assert_eq!(dispatch.declined, vec!["o9"]);
        assert_eq!(scheduler.registry().known_count(), 2);
    }

    #[test]
    fn statuses_after_done_are_ignored() {
        let mut scheduler = test_scheduler();
        let (t1, t2) = launch_h1_h2(&mut scheduler);
        scheduler.handle_status(&finished(&t1));
        assert_eq!(scheduler.handle_status(&finished(&t2)), TerminationDecision::Terminate);

        let failed = TaskStatus::new(&t1, TaskState::Failed);
        assert_eq!(scheduler.handle_status(&failed), TerminationDecision::Terminate);
        assert_eq!(scheduler.handle_status(&finished(&t2)), TerminationDecision::Terminate);

        assert_eq!(scheduler.completed(), 2);
        assert!(scheduler.registry().stalled().is_empty());
        assert_eq!(scheduler.phase(), RunPhase::Done);
    }

    #[test]
    fn at_most_once_across_many_batches() {
        let mut scheduler = test_scheduler();
        let mut launched_for_h1 = 0;
        for round in 0..10 {
            let dispatch = scheduler.handle_offers(&[
                offer(&format!("a{round}"), "h1"),
                offer(&format!("b{round}"), &format!("h{}", round % 3 + 1)),
            ]);
            launched_for_h1 += dispatch
                .launches
                .iter()
                .filter(|l| l.task.hostname == "h1")
                .count();
            assert!(scheduler.completed() <= scheduler.registry().known_count());
        }
        assert_eq!(launched_for_h1, 1);
        assert_eq!(scheduler.registry().known_count(), 3);
        assert_eq!(scheduler.registry().serviced_count(), 3);
    }
}
