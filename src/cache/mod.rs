//! Bounded in-memory caches.

pub(crate) mod bounded;
