/*!
 * Inbound Dispatch
 * Builtin request/notification handlers and the host hook surface
 */

use super::opcodes::{ControllerNotification, ControllerOpcode};
use super::IpcEngine;
use crate::ipc::codec::{PacketReader, PacketWriter};
use log::{debug, error, info};

/// Callback surface the embedding host registers for the window, dev-tools,
/// URL-filter, and file-picker opcode families. The engine is passed as a
/// context argument so handlers can make outbound calls without a global.
pub trait HostHooks: Send + Sync {
    /// Handle a non-builtin inbound request. Whatever is left in `writer`
    /// becomes the response body; leaving it empty is a valid answer.
    fn handle_request(
        &self,
        engine: &IpcEngine,
        opcode: ControllerOpcode,
        reader: &mut PacketReader<'_>,
        writer: &mut PacketWriter,
    ) {
        let _ = (engine, reader, writer);
        info!("No host hook registered for {:?}, answering empty", opcode);
    }

    /// Invoked once after the engine tears down, on the thread that observed
    /// the fatal condition.
    fn on_shutdown(&self) {}
}

/// Default hooks: every forwarded opcode is logged and answered empty.
pub struct NoopHost;

impl HostHooks for NoopHost {}

/// Dispatch one inbound request. `raw_opcode` that decodes to a builtin is
/// handled here; the window/dev-tools/picker families go through the host
/// hooks; unknown values are logged and answered with an empty body.
pub(crate) fn handle_request(
    engine: &IpcEngine,
    raw_opcode: u8,
    reader: &mut PacketReader<'_>,
    writer: &mut PacketWriter,
) {
    let Ok(opcode) = ControllerOpcode::try_from(raw_opcode) else {
        error!("Unknown request opcode {}", raw_opcode);
        return;
    };

    debug!("Handling request {:?}", opcode);

    match opcode {
        ControllerOpcode::Ping => {}
        ControllerOpcode::Print => {
            if let Some(message) = reader.read_string(reader.remaining()) {
                info!("{}", message);
            }
        }
        ControllerOpcode::Echo => {
            let len = reader.remaining();
            reader.copy_to(len, |bytes| writer.write_bytes(bytes).is_ok());
        }
        ControllerOpcode::StreamOpen => {
            if let Some(id) = reader.read::<u32>() {
                engine.stream_open(id);
            }
        }
        ControllerOpcode::StreamData => {
            if let Some(id) = reader.read::<u32>() {
                match engine.stream(id) {
                    Some(stream) => {
                        let len = reader.remaining();
                        reader.copy_to(len, |bytes| {
                            stream.write(bytes);
                            true
                        });
                        let _ = writer.write(true);
                    }
                    None => {
                        debug!("Stream data for unknown stream {}", id);
                        let _ = writer.write(false);
                    }
                }
            }
        }
        ControllerOpcode::StreamClose => {
            if let Some(id) = reader.read::<u32>() {
                engine.stream_close(id);
            }
        }
        other => engine.host().handle_request(engine, other, reader, writer),
    }
}

/// Dispatch one inbound notification. Unknown opcodes are logged and ignored.
pub(crate) fn handle_notification(engine: &IpcEngine, raw_opcode: u8, reader: &mut PacketReader<'_>) {
    let _ = reader;
    match ControllerNotification::try_from(raw_opcode) {
        Ok(ControllerNotification::Exit) => {
            info!("Exit notification received");
            engine.close_everything();
        }
        Err(other) => error!("Unknown notification opcode {}", other),
    }
}
