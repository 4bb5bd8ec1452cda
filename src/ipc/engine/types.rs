/*!
 * Engine Types
 * Configuration and the request/response shapes carried for the host
 */

use crate::core::limits::{DEFAULT_STREAM_CAPACITY, DEFAULT_WORKER_THREADS, INGEST_POOL_BUFFERS};
use crate::ipc::stream::DataStream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Engine tunables. The wire limits are compile-time constants; these only
/// size the runtime machinery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Workers for parallel-class requests and notifications
    pub worker_threads: usize,
    /// Ring capacity of newly registered data streams
    pub stream_capacity: usize,
    /// Buffers pre-populated in the packet ingest pool
    pub ingest_buffers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_threads: DEFAULT_WORKER_THREADS,
            stream_capacity: DEFAULT_STREAM_CAPACITY,
            ingest_buffers: INGEST_POOL_BUFFERS,
        }
    }
}

/// Post body element kind tags on the wire
pub(crate) const POST_ELEMENT_BYTES: u8 = 1;
pub(crate) const POST_ELEMENT_FILE: u8 = 2;

/// One element of a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostElement {
    Bytes(Vec<u8>),
    File(String),
}

/// A browser network request handed across the bridge for proxying or
/// modification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<PostElement>,
}

/// Body of a proxied response.
pub enum ProxyBody {
    None,
    /// Inline bytes carried in the response packet
    Bytes(Vec<u8>),
    /// Large bodies arrive through a data stream registered by id
    Stream(Arc<DataStream>),
}

/// Controller's answer to a `WindowProxyRequest`.
pub struct ProxyResponse {
    pub status_code: u32,
    pub status_text: String,
    /// `content-type` header value clipped at the first `;`
    pub media_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: ProxyBody,
}
