//! Timeline model: clips, swap-on-write state and the canonical fingerprint.

pub(crate) mod clip;
pub(crate) mod fingerprint;
pub(crate) mod state;
