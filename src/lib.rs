/*!
 * hostbridge
 * IPC engine bridging a controller process and an embedded-browser host
 * over an anonymous duplex pipe
 */

#![cfg(unix)]

pub mod core;
pub mod ipc;

pub use ipc::codec::{PacketHeader, PacketKind, PacketReader, PacketWriter};
pub use ipc::engine::{
    ControllerNotification, ControllerOpcode, EngineConfig, HostHooks, HostNotification,
    HostOpcode, IpcEngine, NoopHost, OrderingClass, PostElement, ProxyBody, ProxyResponse,
    WebRequest,
};
pub use ipc::pipe::Pipe;
pub use ipc::pool::BufferPool;
pub use ipc::stream::DataStream;
pub use ipc::work::{WorkQueue, WorkerPool};
