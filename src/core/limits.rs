/*!
 * System Limits and Constants
 *
 * Centralized location for all engine-wide limits, thresholds, and defaults.
 *
 * ## Design Philosophy
 * - All values include rationale comments explaining WHY they exist
 * - Values are grouped by domain (wire, streams, scheduling)
 * - Wire-compatibility constants are marked with [WIRE-COMPAT]
 */

// =============================================================================
// WIRE LIMITS
// =============================================================================

/// Maximum packet body size (10 MiB)
/// Packets whose declared body exceeds this terminate the connection.
/// [WIRE-COMPAT] Both sides must agree on this bound.
pub const MAX_PACKET_SIZE: usize = 10 * 1024 * 1024;

/// Initial size of the reader-thread scratch buffer (4 KiB)
/// Grown on demand up to MAX_PACKET_SIZE; most packets fit without growth.
pub const SCRATCH_BUFFER_SIZE: usize = 4096;

/// Initial reservation of a packet body builder (512 bytes)
/// Most response bodies are tiny; doubling growth covers the rest.
pub const WRITER_INITIAL_RESERVATION: usize = 512;

// =============================================================================
// STREAM LIMITS
// =============================================================================

/// Default per-stream ring capacity (10 MiB)
/// Bounds memory per stream; a full ring blocks the producer until the
/// consumer drains or the stream closes.
pub const DEFAULT_STREAM_CAPACITY: usize = 10 * 1024 * 1024;

// =============================================================================
// SCHEDULING
// =============================================================================

/// Worker threads for parallel-class inbound requests and notifications
pub const DEFAULT_WORKER_THREADS: usize = 4;

/// Buffers pre-populated in the packet ingest pool
/// Bounds how many inbound packets can be in flight across the workers
/// before a fresh allocation happens.
pub const INGEST_POOL_BUFFERS: usize = 4;
