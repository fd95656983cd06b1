//! Event, RPC, room and field names used on the wire.
//!
//! Names a client may send start with its role prefix; the broker refuses
//! anything else. Names the broker sends are not filtered and use whatever
//! prefix reads best for the receiver.

/// Handshake field names.
pub mod field {
    /// Role selector in the opening message.
    pub const ROLE: &str = "role";
    /// Host name (host and slave handshakes).
    pub const HOST_NAME: &str = "host_name";
    /// Host secret (host and slave handshakes).
    pub const HOST_SECRET: &str = "host_secret";
    /// Slave name as deployed clients spell it.
    pub const SALVE_NAME: &str = "salve_name";
    /// Slave name, corrected spelling.
    pub const SLAVE_NAME: &str = "slave_name";
    /// Echo answer in a user's challenge reply.
    pub const RAND_BACK: &str = "rand.back";
}

/// Events the broker sends.
pub mod event {
    /// Echo challenge to a connecting user; payload is an integer.
    pub const RAND_CHECK: &str = "rand.check";
    /// Duplicate host registration; payload is the holder's session id.
    pub const ERROR_REGISTER_ALREADY: &str = "error.register.already";
    /// A host went away; payload is the host name.
    pub const SYSTEM_HOST_LEAVE: &str = "system.host.leave";
    /// The slave serving this viewer went away; payload is the slave name.
    pub const SYSTEM_SLAVE_LEAVE: &str = "system.slave.leave";
    /// A user left a room; payload is the user's session id.
    pub const USER_LEAVE: &str = "user.leave";
    /// A queued user was admitted; payload `{slave_name, order}`.
    pub const QUEUE_ADMITTED: &str = "queue.admitted";
    /// A slave was paired with a viewer; payload `{session_id}`.
    pub const SLAVE_VIEWER_ASSIGNED: &str = "slave.viewer.assigned";
    /// A slave's viewer went away; payload is the viewer's session id.
    pub const SLAVE_VIEWER_LEAVE: &str = "slave.viewer.leave";
    /// The slave finished serving this viewer; payload is the slave name.
    pub const VIEWING_END: &str = "viewing.end";
}

/// Events clients send.
pub mod inbound {
    /// User withdraws from the admission queue.
    pub const USER_QUEUE_LEAVE: &str = "user.queue.leave";
    /// Slave finished serving its current viewer.
    pub const SLAVE_SESSION_END: &str = "slave.session.end";
}

/// RPC methods clients call.
pub mod rpc {
    /// Enter the admission queue; result `{ticket, order}`.
    pub const USER_QUEUE_JOIN: &str = "user.queue.join";
    /// Query queue position; params `{ticket}`, result `{order, ahead, in_service}`.
    pub const USER_QUEUE_STATE: &str = "user.queue.state";
    /// Provision a slave under the calling host; params `{slave_name}`.
    pub const HOST_SLAVE_PROVISION: &str = "host.slave.provision";
    /// List the calling host's slaves.
    pub const HOST_SLAVE_LIST: &str = "host.slave.list";
    /// The calling slave's state; result `{slave_name, serving}`.
    pub const SLAVE_STATUS: &str = "slave.status";
}

/// Well-known rooms.
pub mod room {
    /// Every authenticated user is a member.
    pub const ALL_USERS: &str = "user_all";
}
