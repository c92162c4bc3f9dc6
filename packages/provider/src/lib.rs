//! Provider environment for treeline: the ordered list of candidate
//! server destinations, the shared exponential-backoff blacklist, and the
//! policy knobs governing selection and failover.

mod blacklist;
mod clock;
mod environment;

pub use blacklist::Blacklist;
pub use clock::{Clock, ManualClock, SystemClock};
pub use environment::{ProviderEnvironment, ProviderEnvironmentBuilder};
