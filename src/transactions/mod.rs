mod commitment;
mod fees;
mod htlc;
mod sweep;

pub use commitment::*;
pub use fees::*;
pub use htlc::*;
pub use sweep::*;
