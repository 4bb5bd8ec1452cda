/*!
 * Data Stream
 * Bounded per-stream ring buffer with two-sided condvar backpressure
 */

use crate::core::limits::DEFAULT_STREAM_CAPACITY;
use log::debug;
use parking_lot::{Condvar, Mutex};
use ringbuf::{traits::*, HeapRb};

struct StreamState {
    ring: HeapRb<u8>,
    closed: bool,
}

/// A logical unidirectional byte channel multiplexed inside the packet
/// transport.
///
/// Single-producer ordering is enforced upstream: the engine routes every
/// write for a given stream id through the in-order stream worker. Readers
/// may drain from any one thread. A full ring blocks the producer until the
/// consumer frees space or the stream closes; bytes buffered before close
/// remain readable until drained.
pub struct DataStream {
    id: u32,
    state: Mutex<StreamState>,
    readable: Condvar,
    writable: Condvar,
}

impl DataStream {
    pub fn new(id: u32) -> Self {
        Self::with_capacity(id, DEFAULT_STREAM_CAPACITY)
    }

    pub fn with_capacity(id: u32, capacity: usize) -> Self {
        Self {
            id,
            state: Mutex::new(StreamState {
                ring: HeapRb::<u8>::new(capacity),
                closed: false,
            }),
            readable: Condvar::new(),
            writable: Condvar::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Enqueue `data`, blocking while the ring is full. Returns the number of
    /// bytes written, which is less than `data.len()` only when the stream
    /// was closed mid-write.
    pub fn write(&self, data: &[u8]) -> usize {
        let mut state = self.state.lock();
        let mut written = 0;

        while written < data.len() {
            if state.closed {
                debug!("Stream {} closed mid-write ({} of {} bytes)", self.id, written, data.len());
                break;
            }

            let space = state.ring.vacant_len();
            if space == 0 {
                self.writable.wait(&mut state);
                continue;
            }

            let chunk = space.min(data.len() - written);
            written += state.ring.push_slice(&data[written..written + chunk]);
            self.readable.notify_one();
        }

        written
    }

    /// Copy up to `buf.len()` bytes from the ring, blocking until at least
    /// one byte is available or the stream is closed. Returns 0 only when the
    /// stream is closed and drained. Short reads are normal; callers that
    /// need exactly N bytes must loop.
    pub fn read(&self, buf: &mut [u8]) -> usize {
        if buf.is_empty() {
            return 0;
        }

        let mut state = self.state.lock();
        loop {
            if !state.ring.is_empty() {
                let read = state.ring.pop_slice(buf);
                self.writable.notify_one();
                return read;
            }

            if state.closed {
                return 0;
            }

            self.readable.wait(&mut state);
        }
    }

    /// Close the stream and wake every waiter on both sides. Idempotent.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.readable.notify_all();
        self.writable.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.state.lock().ring.occupied_len()
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().ring.capacity().get()
    }
}
