//! BOLT3 commitment and HTLC transactions for a Lightning payment channel,
//! plus the `init` feature handshake that gates channel setup.

pub mod config;
pub mod errors;
pub mod features;
pub mod logging;
pub mod scripts;
pub mod signing;
pub mod transactions;
pub mod types;

#[cfg(test)]
mod tests;

pub use config::*;
pub use errors::{Error, Result};
pub use features::*;
pub use scripts::*;
pub use signing::*;
pub use transactions::*;
pub use types::*;
