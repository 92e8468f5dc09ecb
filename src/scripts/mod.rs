mod commitment;
mod funding;
mod htlc;
mod scriptpubkey;

pub use commitment::*;
pub use funding::*;
pub use htlc::*;
pub use scriptpubkey::*;
