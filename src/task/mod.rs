//! Background work for the cache: the janitor that drives periodic
//! expiration sweeps.

pub(crate) mod janitor;
