/*!
 * IPC Module
 * Packet transport, codec, streams, scheduling, and the engine itself
 */

pub mod codec;
pub mod engine;
pub mod pipe;
pub mod pool;
pub mod stream;
pub mod work;

// Re-export for convenience
pub use codec::{PacketHeader, PacketKind, PacketReader, PacketWriter};
pub use engine::{EngineConfig, HostHooks, IpcEngine, NoopHost};
pub use pipe::Pipe;
pub use pool::{BufferPool, BufferPoolStats};
pub use stream::DataStream;
pub use work::{WorkQueue, WorkerPool};
