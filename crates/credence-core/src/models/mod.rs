//! Networks shipped with the crate.

pub mod credit_net;
