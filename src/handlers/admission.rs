//! Admission pass: pair idle slaves with waiting users and tell both sides.

use crate::state::Broker;
use chrono::Utc;
use serde_json::json;
use sharecast_proto::names::event;
use tracing::info;

/// Run one admission pass. Returns how many viewers were admitted.
///
/// Called wherever capacity may have appeared: after an enqueue, a slave
/// (re)connect or session end, and after a viewer or slave leaves.
pub fn run(broker: &Broker) -> usize {
    let admitted = broker.admit_waiting();
    for admission in &admitted {
        info!(
            slave = %admission.slave,
            viewer = %admission.viewer.id(),
            order = admission.order,
            waited_ms = (Utc::now() - admission.enqueued_at).num_milliseconds(),
            "Viewer admitted"
        );
        admission.viewer.emit(
            event::QUEUE_ADMITTED,
            json!({ "slave_name": admission.slave, "order": admission.order }),
        );
        admission.slave_session.emit(
            event::SLAVE_VIEWER_ASSIGNED,
            json!({ "session_id": admission.viewer.id() }),
        );
    }
    admitted.len()
}
