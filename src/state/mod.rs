//! State management module.
//!
//! Contains the Broker (shared broker state), role objects and the registries
//! they live in.

mod broker;
pub mod managers;
mod role;
mod session_id;

pub use broker::{Broker, BrokerStats, SecretCheck};
pub use managers::host::HostManager;
pub use managers::queue::{AdmissionQueue, QueueCounters};
pub use managers::slave::{ProvisionError, SlaveManager};
pub use managers::user::UserManager;
pub use role::{Admission, Host, Role, Slave, User};
pub use session_id::{SessionId, SessionIdGenerator};
