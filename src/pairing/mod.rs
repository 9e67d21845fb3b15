mod options;
mod pairing;

pub use options::{PairingOptions, PairingSummary};
pub use pairing::pair_units;
