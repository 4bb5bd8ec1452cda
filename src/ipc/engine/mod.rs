/*!
 * IPC Engine
 * Reader loop, correlation, dispatch, outbound calls, and lifecycle
 */

pub mod handlers;
pub mod opcodes;
pub mod types;

mod calls;
mod pending;

pub use handlers::{HostHooks, NoopHost};
pub use opcodes::{
    ControllerNotification, ControllerOpcode, HostNotification, HostOpcode, OrderingClass,
};
pub use types::{EngineConfig, PostElement, ProxyBody, ProxyResponse, WebRequest};

use crate::core::errors::ProtocolError;
use crate::core::limits::{MAX_PACKET_SIZE, SCRATCH_BUFFER_SIZE};
use crate::ipc::codec::{PacketHeader, PacketKind, PacketReader, PacketWriter};
use crate::ipc::pipe::Pipe;
use crate::ipc::pool::BufferPool;
use crate::ipc::stream::DataStream;
use crate::ipc::work::{WorkQueue, WorkerPool};
use dashmap::DashMap;
use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use pending::PendingRequest;
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread;

type BlockingGuard = Box<dyn Fn() -> bool + Send + Sync>;

struct EngineInner {
    config: EngineConfig,
    pipe: Pipe,
    started: AtomicBool,
    stopped: AtomicBool,
    request_ids: AtomicU32,
    pending: DashMap<u32, Arc<PendingRequest>>,
    streams: DashMap<u32, Arc<DataStream>>,
    /// Write path: scratch send buffer behind the single write mutex.
    /// Held per packet; never combined with any other lock.
    send: Mutex<Vec<u8>>,
    ingest_pool: BufferPool,
    ui_queue: WorkQueue,
    stream_queue: WorkQueue,
    workers: WorkerPool,
    host: RwLock<Arc<dyn HostHooks>>,
    blocking_guard: RwLock<Option<BlockingGuard>>,
}

/// The IPC engine bridging this host process and its controller.
///
/// Cheap to clone; all clones share one engine. Lifecycle is single-shot:
/// `start` spawns the reader and the workers, `stop` releases every blocked
/// caller, stream waiter, and worker, and the engine cannot be restarted.
#[derive(Clone)]
pub struct IpcEngine {
    inner: Arc<EngineInner>,
}

impl IpcEngine {
    pub fn new(config: EngineConfig) -> Self {
        let ingest_pool = BufferPool::new(MAX_PACKET_SIZE, config.ingest_buffers);

        Self {
            inner: Arc::new(EngineInner {
                config,
                pipe: Pipe::new(),
                started: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
                request_ids: AtomicU32::new(0),
                pending: DashMap::with_shard_amount(32),
                streams: DashMap::with_shard_amount(32),
                send: Mutex::new(Vec::with_capacity(SCRATCH_BUFFER_SIZE)),
                ingest_pool,
                ui_queue: WorkQueue::new("ipc-ui"),
                stream_queue: WorkQueue::new("ipc-stream"),
                workers: WorkerPool::new(),
                host: RwLock::new(Arc::new(NoopHost)),
                blocking_guard: RwLock::new(None),
            }),
        }
    }

    /// Install descriptors inherited from the controller. Must precede
    /// `start`.
    pub fn set_handles(&self, read_fd: RawFd, write_fd: RawFd) {
        self.inner.pipe.set_handles(read_fd, write_fd);
    }

    /// Register the callback surface for window/dev-tools/picker requests.
    pub fn set_host(&self, host: Arc<dyn HostHooks>) {
        *self.inner.host.write() = host;
    }

    /// Register a predicate identifying threads that must not block on
    /// outbound calls; `call` and `notify` log an error when it fires.
    pub fn set_blocking_guard<F>(&self, guard: F)
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        *self.inner.blocking_guard.write() = Some(Box::new(guard));
    }

    pub fn has_valid_handles(&self) -> bool {
        self.inner.pipe.has_valid_handles()
    }

    pub fn is_available(&self) -> bool {
        self.has_valid_handles()
            && self.inner.started.load(Ordering::Acquire)
            && !self.inner.stopped.load(Ordering::Acquire)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub fn start(&self) {
        info!("IPC start called");

        if !self.has_valid_handles() {
            warn!("IPC handles not set, engine stays idle");
            return;
        }
        if self.inner.stopped.load(Ordering::Acquire)
            || self.inner.started.swap(true, Ordering::AcqRel)
        {
            return;
        }

        self.inner.ui_queue.start();
        self.inner.stream_queue.start();
        self.inner.workers.add_workers(self.inner.config.worker_threads);

        let engine = self.clone();
        let spawned = thread::Builder::new()
            .name("ipc-reader".to_string())
            .spawn(move || {
                info!("Started IPC reader thread");
                engine.run();
            });
        if let Err(e) = spawned {
            error!("Failed to spawn IPC reader thread: {}", e);
            self.stop();
            return;
        }

        info!("Started IPC");
    }

    pub fn stop(&self) {
        self.stop_internal();
    }

    fn stop_internal(&self) -> bool {
        if !self.inner.started.load(Ordering::Acquire) {
            return false;
        }
        if self.inner.stopped.swap(true, Ordering::AcqRel) {
            return false;
        }

        info!("Stopping IPC");

        self.inner.pipe.close();
        info!("Stopped pipe");

        self.inner.ui_queue.stop();
        self.inner.stream_queue.stop();
        self.inner.workers.stop();
        info!("Stopped workers");

        let pending: Vec<Arc<PendingRequest>> = self
            .inner
            .pending
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for request in pending {
            request.abort();
        }
        info!("Cancelled pending requests");

        let stream_ids: Vec<u32> = self.inner.streams.iter().map(|entry| *entry.key()).collect();
        for id in stream_ids {
            if let Some((_, stream)) = self.inner.streams.remove(&id) {
                stream.close();
            }
        }
        info!("Closed data streams");

        info!("Stopped IPC");
        true
    }

    /// Tear everything down and let the host react (terminate its loop).
    /// Idempotent; safe from any engine thread.
    pub fn close_everything(&self) {
        if self.stop_internal() {
            self.host().on_shutdown();
        }
    }

    /// Schedule a host-originated callback on the dedicated UI queue.
    pub fn queue_work<F>(&self, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.inner.stopped.load(Ordering::Acquire) {
            return;
        }
        self.inner.ui_queue.enqueue(work);
    }

    pub(crate) fn host(&self) -> Arc<dyn HostHooks> {
        self.inner.host.read().clone()
    }

    // =========================================================================
    // Reader loop
    // =========================================================================

    fn run(&self) {
        let mut header_buf = [0u8; PacketHeader::SIZE];
        let mut scratch = vec![0u8; SCRATCH_BUFFER_SIZE];

        while self.is_available() {
            let got = self.inner.pipe.read(&mut header_buf, true);
            if got == 0 {
                info!("Pipe closed, controller likely wants this host to exit");
                self.close_everything();
                return;
            }
            if got != PacketHeader::SIZE {
                self.fail(ProtocolError::ShortHeader(got));
                return;
            }

            let header = match PacketHeader::parse(&header_buf) {
                Ok(header) => header,
                Err(e) => {
                    self.fail(e);
                    return;
                }
            };

            let body_len = match header.body_len() {
                Ok(len) => len,
                Err(e) => {
                    self.fail(e);
                    return;
                }
            };
            if body_len > MAX_PACKET_SIZE {
                self.fail(ProtocolError::Oversized {
                    size: body_len,
                    max: MAX_PACKET_SIZE,
                });
                return;
            }

            if scratch.len() < body_len {
                scratch.resize(body_len, 0);
            }
            let got = self.inner.pipe.read(&mut scratch[..body_len], true);
            if got != body_len {
                self.fail(ProtocolError::ShortBody {
                    expected: body_len,
                    got,
                });
                return;
            }

            debug!(
                "Received packet (kind {:?}, opcode {}, {} body bytes)",
                header.kind, header.opcode, body_len
            );
            self.dispatch(header, &scratch[..body_len]);
        }

        info!("IPC reader stopped");
    }

    fn fail(&self, error: ProtocolError) {
        error!("{}. Shutting down.", error);
        self.close_everything();
    }

    fn dispatch(&self, header: PacketHeader, body: &[u8]) {
        match header.kind {
            PacketKind::Response => {
                let pending = self
                    .inner
                    .pending
                    .get(&header.request_id)
                    .map(|entry| entry.value().clone());
                match pending {
                    Some(request) => request.complete(body),
                    None => warn!(
                        "Response for unknown request id {} dropped",
                        header.request_id
                    ),
                }
            }
            PacketKind::Request => {
                let Some((buffer, body_len)) = self.ingest(body) else {
                    return;
                };

                let engine = self.clone();
                let job = move || {
                    let mut writer = PacketWriter::new();
                    {
                        let mut reader = PacketReader::new(&buffer[..body_len]);
                        handlers::handle_request(&engine, header.opcode, &mut reader, &mut writer);
                    }
                    engine.inner.ingest_pool.release(buffer);

                    if !engine.write_packet(
                        PacketKind::Response,
                        header.opcode,
                        header.request_id,
                        writer.as_slice(),
                    ) {
                        engine.close_everything();
                    }
                };

                let class = ControllerOpcode::try_from(header.opcode)
                    .map(ControllerOpcode::ordering_class);
                match class {
                    Ok(OrderingClass::StreamOrdered) => self.inner.stream_queue.enqueue(job),
                    _ => self.inner.workers.enqueue(job),
                }
            }
            PacketKind::Notification => {
                let Some((buffer, body_len)) = self.ingest(body) else {
                    return;
                };

                let engine = self.clone();
                self.inner.workers.enqueue(move || {
                    {
                        let mut reader = PacketReader::new(&buffer[..body_len]);
                        handlers::handle_notification(&engine, header.opcode, &mut reader);
                    }
                    engine.inner.ingest_pool.release(buffer);
                });
            }
        }
    }

    /// Copy a packet body into a pooled buffer for handler dispatch.
    fn ingest(&self, body: &[u8]) -> Option<(Vec<u8>, usize)> {
        let mut buffer = self.inner.ingest_pool.acquire();
        if buffer.len() < body.len() {
            warn!("Skipped packet too large for ingest pool buffer");
            self.inner.ingest_pool.release(buffer);
            return None;
        }
        buffer[..body.len()].copy_from_slice(body);
        Some((buffer, body.len()))
    }

    // =========================================================================
    // Outbound
    // =========================================================================

    /// Send a request and block until the matching response or shutdown.
    /// Returns an empty body when the engine is unavailable or goes down
    /// while waiting.
    pub fn call(&self, opcode: HostOpcode, body: &[u8]) -> Vec<u8> {
        if !self.is_available() {
            return Vec::new();
        }
        self.check_blocking_guard();

        let request_id = self
            .inner
            .request_ids
            .fetch_add(1, Ordering::SeqCst)
            .wrapping_add(1);
        let pending = Arc::new(PendingRequest::new(opcode, request_id));
        self.inner.pending.insert(request_id, pending.clone());

        debug!(
            "Sent request (opcode {:?}, id {}), waiting for response",
            opcode, request_id
        );
        if !self.write_packet(PacketKind::Request, opcode.into(), request_id, body) {
            self.inner.pending.remove(&request_id);
            self.close_everything();
            return Vec::new();
        }

        let response = pending.wait();
        self.inner.pending.remove(&request_id);
        debug!("Got response (opcode {:?}, id {})", opcode, request_id);
        response
    }

    /// Send a fire-and-forget notification; correlation id is 0.
    pub fn notify(&self, opcode: HostNotification, body: &[u8]) {
        if !self.is_available() {
            return;
        }
        self.check_blocking_guard();

        debug!("Sent notification (opcode {:?})", opcode);
        if !self.write_packet(PacketKind::Notification, opcode.into(), 0, body) {
            self.close_everything();
        }
    }

    /// Frame and write one packet under the write mutex. Entire packets are
    /// serialized; a short write is fatal to framing and reported as such.
    pub(crate) fn write_packet(
        &self,
        kind: PacketKind,
        opcode: u8,
        request_id: u32,
        body: &[u8],
    ) -> bool {
        let header = PacketHeader::new(kind, opcode, request_id, body.len());

        let mut send = self.inner.send.lock();
        send.clear();
        send.reserve(PacketHeader::SIZE + body.len());
        send.extend_from_slice(&header.encode());
        send.extend_from_slice(body);

        let wrote = self.inner.pipe.write(&send, true);
        if wrote != send.len() {
            error!(
                "{}",
                ProtocolError::ShortWrite {
                    expected: send.len(),
                    wrote,
                }
            );
            return false;
        }
        true
    }

    fn check_blocking_guard(&self) {
        if let Some(guard) = self.inner.blocking_guard.read().as_ref() {
            if guard() {
                error!("Blocking IPC call issued from a thread that must not block");
            }
        }
    }

    // =========================================================================
    // Stream registry
    // =========================================================================

    /// Register a stream for `id` if absent. Idempotent.
    pub fn stream_open(&self, id: u32) {
        use dashmap::mapref::entry::Entry;

        match self.inner.streams.entry(id) {
            Entry::Occupied(_) => info!("Stream {} already open", id),
            Entry::Vacant(vacant) => {
                info!("Stream {} opened", id);
                vacant.insert(Arc::new(DataStream::with_capacity(
                    id,
                    self.inner.config.stream_capacity,
                )));
            }
        }
    }

    pub fn stream(&self, id: u32) -> Option<Arc<DataStream>> {
        self.inner.streams.get(&id).map(|entry| entry.value().clone())
    }

    /// Look up `id`, registering a fresh stream when the peer references one
    /// it never opened explicitly (body-stream proxy responses).
    pub fn get_or_open_stream(&self, id: u32) -> Arc<DataStream> {
        self.inner
            .streams
            .entry(id)
            .or_insert_with(|| {
                info!("Stream {} registered lazily", id);
                Arc::new(DataStream::with_capacity(
                    id,
                    self.inner.config.stream_capacity,
                ))
            })
            .value()
            .clone()
    }

    /// Close and deregister `id` (peer-initiated close or shutdown).
    pub fn stream_close(&self, id: u32) {
        if let Some((_, stream)) = self.inner.streams.remove(&id) {
            info!("Stream {} closed", id);
            stream.close();
        }
    }

    /// Locally-initiated close: tear down the stream here, then tell the
    /// peer. The remote half is skipped when the engine is already down.
    pub fn close_stream(&self, id: u32) {
        self.stream_close(id);

        if !self.is_available() {
            return;
        }
        let _ = self.call(HostOpcode::StreamClose, &id.to_le_bytes());
    }
}
