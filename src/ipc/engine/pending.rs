/*!
 * Pending Requests
 * Correlation slot an outbound caller blocks on until its response lands
 */

use super::opcodes::HostOpcode;
use log::warn;
use parking_lot::{Condvar, Mutex};

struct Slot {
    ready: bool,
    body: Vec<u8>,
}

/// One in-flight outbound request.
///
/// The reader thread completes the slot exactly once; shutdown aborts it
/// with an empty body. Both paths take the slot's own mutex before touching
/// the body, and the ready flag transitions false to true exactly once.
pub(crate) struct PendingRequest {
    pub opcode: HostOpcode,
    pub request_id: u32,
    slot: Mutex<Slot>,
    ready_cv: Condvar,
}

impl PendingRequest {
    pub fn new(opcode: HostOpcode, request_id: u32) -> Self {
        Self {
            opcode,
            request_id,
            slot: Mutex::new(Slot {
                ready: false,
                body: Vec::new(),
            }),
            ready_cv: Condvar::new(),
        }
    }

    /// Deliver the response body and wake the caller.
    pub fn complete(&self, body: &[u8]) {
        {
            let mut slot = self.slot.lock();
            if slot.ready {
                warn!(
                    "Duplicate response for request {} (opcode {:?}) dropped",
                    self.request_id, self.opcode
                );
                return;
            }
            slot.body.extend_from_slice(body);
            slot.ready = true;
        }
        self.ready_cv.notify_one();
    }

    /// Wake the caller with an empty body (engine shutdown).
    pub fn abort(&self) {
        {
            let mut slot = self.slot.lock();
            if slot.ready {
                return;
            }
            slot.ready = true;
        }
        self.ready_cv.notify_one();
    }

    /// Block until the slot is ready and take the body.
    pub fn wait(&self) -> Vec<u8> {
        let mut slot = self.slot.lock();
        while !slot.ready {
            self.ready_cv.wait(&mut slot);
        }
        std::mem::take(&mut slot.body)
    }
}
