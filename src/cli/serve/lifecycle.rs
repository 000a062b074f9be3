//! Server lifecycle management.

use crate::core::register_server;
use anyhow::{Result, anyhow};
use std::{net::SocketAddr, sync::Arc};
use tiny_http::Server;

/// Bind to `addr` and register the server for graceful shutdown.
pub fn bind(addr: SocketAddr) -> Result<Arc<Server>> {
    let server = Server::http(addr).map_err(|e| anyhow!("failed to bind {addr}: {e}"))?;
    let server = Arc::new(server);
    register_server(Arc::clone(&server));
    Ok(server)
}

/// Worker pool for request handlers.
pub fn worker_pool(workers: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("hashdist-serve-{i}"))
        .build()
        .map_err(|e| anyhow!("failed to create thread pool: {e}"))
}
