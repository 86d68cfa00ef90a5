//! Shared ECU State
//!
//! One record holding the latest value of every channel. The acquisition
//! worker is the only writer; any number of readers take copies through
//! [`EcuStateStore::snapshot`].

mod state;
mod store;

pub use state::{EcuState, TcuStatus};
pub use store::EcuStateStore;
