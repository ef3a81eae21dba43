//! Upstream forwarding.

mod proxy;

pub use proxy::UpstreamProxy;
