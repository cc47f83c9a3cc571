//! Offer dispatcher: turns an offer batch into launches and declines.
//!
//! Every hostname in a batch joins the known set (which raises the
//! termination target). The first offer for a host that has no task yet is
//! accepted and gets exactly one task; every other offer is declined.

use tracing::{debug, info};
use uuid::Uuid;

use hostsweep_core::{LaunchRequest, Offer, OfferId, Payload, ResourceRequest, TaskInfo};

use crate::registry::HostRegistry;

/// Outcome of dispatching one offer batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dispatch {
    pub launches: Vec<LaunchRequest>,
    /// Offers not used, to be handed back to the manager.
    pub declined: Vec<OfferId>,
}

impl Dispatch {
    pub fn is_empty(&self) -> bool {
        self.launches.is_empty() && self.declined.is_empty()
    }
}

/// Builds installer tasks for unserviced hosts.
#[derive(Debug, Clone)]
pub struct OfferDispatcher {
    payload: Payload,
    resources: ResourceRequest,
}

impl OfferDispatcher {
    /// Create a dispatcher requesting `ResourceRequest::MINIMAL` per task.
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            resources: ResourceRequest::MINIMAL,
        }
    }

    /// Dispatch one batch against the registry.
    ///
    /// Offered resources are not checked against the request; the manager
    /// is free to reject a launch that does not fit.
    pub fn dispatch(&self, registry: &mut HostRegistry, offers: &[Offer]) -> Dispatch {
        for offer in offers {
            if registry.observe(&offer.hostname) {
                debug!(hostname = %offer.hostname, "new host discovered");
            }
        }

        let mut dispatch = Dispatch::default();
        for offer in offers {
            if registry.is_serviced(&offer.hostname) {
                debug!(
                    hostname = %offer.hostname,
                    offer_id = %offer.id,
                    "host already serviced, declining offer"
                );
                dispatch.declined.push(offer.id.clone());
                continue;
            }

            let task = self.build_task(offer);
            registry.mark_serviced(&offer.hostname, &task.id);
            info!(
                hostname = %offer.hostname,
                task_id = %task.id,
                offer_id = %offer.id,
                "launching installer task"
            );
            dispatch.launches.push(LaunchRequest {
                offer_id: offer.id.clone(),
                task,
            });
        }

        dispatch
    }

    /// Build the task for one accepted offer.
    pub fn build_task(&self, offer: &Offer) -> TaskInfo {
        let id = Uuid::new_v4().to_string();
        TaskInfo {
            name: format!("task {id}"),
            id,
            agent_id: offer.agent_id.clone(),
            hostname: offer.hostname.clone(),
            resources: self.resources,
            command: self.payload.command(),
        }
    }
}
