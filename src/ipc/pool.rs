/*!
 * Buffer Pool
 * Reusable fixed-size byte buffers shared by packet ingestion and streams
 */

use log::debug;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Pool of identically-sized buffers. `acquire` never blocks: an empty pool
/// allocates a fresh buffer instead. Ownership transfers on both calls.
pub struct BufferPool {
    buffer_size: usize,
    free: Mutex<VecDeque<Vec<u8>>>,
    allocated: AtomicUsize,
}

/// Point-in-time pool counters
#[derive(Debug, Clone)]
pub struct BufferPoolStats {
    pub available: usize,
    pub allocated: usize,
}

impl BufferPool {
    pub fn new(buffer_size: usize, initial_count: usize) -> Self {
        let free: VecDeque<Vec<u8>> = (0..initial_count).map(|_| vec![0u8; buffer_size]).collect();

        Self {
            buffer_size,
            free: Mutex::new(free),
            allocated: AtomicUsize::new(initial_count),
        }
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Pop a pooled buffer, or allocate a new one when the pool is empty.
    pub fn acquire(&self) -> Vec<u8> {
        if let Some(buffer) = self.free.lock().pop_front() {
            return buffer;
        }

        self.allocated.fetch_add(1, Ordering::Relaxed);
        debug!("Buffer pool empty, allocated new {} byte buffer", self.buffer_size);
        vec![0u8; self.buffer_size]
    }

    /// Return a buffer for reuse. The buffer is renormalized to the pool's
    /// fixed size in case the holder shrank it.
    pub fn release(&self, mut buffer: Vec<u8>) {
        buffer.resize(self.buffer_size, 0);
        self.free.lock().push_back(buffer);
    }

    pub fn stats(&self) -> BufferPoolStats {
        BufferPoolStats {
            available: self.free.lock().len(),
            allocated: self.allocated.load(Ordering::Relaxed),
        }
    }
}
