use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::IdPolicy;

/// The slice of a request the gate needs to make its decision: when it was
/// read off the wire, and where it came from.
#[derive(Debug, Clone)]
pub struct RequestMeta {
    /// Monotonic nanoseconds at which the request was read, from the gate's
    /// clock. This is the canonical `now` for rate estimation.
    pub begin_nanos: u64,
    /// Remote socket address, when the transport exposes one.
    pub peer: Option<SocketAddr>,
    /// Opaque per-connection identifier.
    pub connection_id: u64,
}

/// Maps a request to the identity its rate is tracked under.
///
/// `None` means "reject without tracking". An empty string is the shared
/// global bucket; none of the built-in policies produce it, but a custom
/// function may opt in.
pub type IdFn = Arc<dyn Fn(&RequestMeta) -> Option<String> + Send + Sync>;

/// Builds the identity function for a configured policy.
pub fn id_fn_for(policy: IdPolicy) -> IdFn {
    match policy {
        IdPolicy::RemoteAddress => Arc::new(|meta: &RequestMeta| {
            meta.peer.map(|addr| addr.ip().to_string())
        }),
        IdPolicy::RemoteAddressPort => {
            Arc::new(|meta: &RequestMeta| meta.peer.map(|addr| addr.to_string()))
        }
        IdPolicy::RemotePort => Arc::new(|meta: &RequestMeta| {
            meta.peer.map(|addr| addr.port().to_string())
        }),
        IdPolicy::ConnectionId => {
            Arc::new(|meta: &RequestMeta| Some(meta.connection_id.to_string()))
        }
    }
}
