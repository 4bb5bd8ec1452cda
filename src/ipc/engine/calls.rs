/*!
 * Outbound Surface
 * Typed wrappers over `call`/`notify` with the controller's body layouts
 */

use super::types::{
    PostElement, ProxyBody, ProxyResponse, WebRequest, POST_ELEMENT_BYTES, POST_ELEMENT_FILE,
};
use super::{HostNotification, HostOpcode, IpcEngine};
use crate::core::errors::CodecError;
use crate::ipc::codec::{PacketReader, PacketWriter};
use log::error;

impl IpcEngine {
    pub fn ping(&self) {
        let _ = self.call(HostOpcode::Ping, &[]);
    }

    pub fn echo(&self, data: &[u8]) -> Vec<u8> {
        self.call(HostOpcode::Echo, data)
    }

    pub fn print(&self, message: &str) {
        let _ = self.call(HostOpcode::Print, message.as_bytes());
    }

    /// Ask the controller to service a proxied resource request. `None` when
    /// the engine is down or the controller answered with garbage.
    pub fn window_proxy_request(
        &self,
        window_id: i32,
        request: &WebRequest,
    ) -> Option<ProxyResponse> {
        if !self.is_available() {
            return None;
        }

        let mut writer = PacketWriter::new();
        if let Err(e) = encode_web_request(&mut writer, window_id, request, true) {
            error!("Failed to serialize proxy request: {}", e);
            return None;
        }

        let response = self.call(HostOpcode::WindowProxyRequest, writer.as_slice());
        if response.is_empty() {
            return None;
        }
        parse_proxy_response(self, &response)
    }

    /// Offer a request to the controller for rewriting. Returns the modified
    /// request, or `None` when nothing came back.
    pub fn window_modify_request(
        &self,
        window_id: i32,
        request: &WebRequest,
        modify_body: bool,
    ) -> Option<WebRequest> {
        if !self.is_available() {
            return None;
        }

        let mut writer = PacketWriter::new();
        if let Err(e) = encode_web_request(&mut writer, window_id, request, modify_body) {
            error!("Failed to serialize modify request: {}", e);
            return None;
        }

        let response = self.call(HostOpcode::WindowModifyRequest, writer.as_slice());
        if response.is_empty() {
            return None;
        }
        parse_modified_request(&response, modify_body)
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    pub fn notify_ready(&self) {
        self.notify(HostNotification::Ready, &[]);
    }

    pub fn notify_exit(&self) {
        self.notify(HostNotification::Exit, &[]);
    }

    pub fn notify_window_opened(&self, window_id: i32) {
        self.notify(HostNotification::WindowOpened, &window_id.to_le_bytes());
    }

    pub fn notify_window_closed(&self, window_id: i32) {
        self.notify(HostNotification::WindowClosed, &window_id.to_le_bytes());
    }

    pub fn notify_window_focused(&self, window_id: i32) {
        self.notify(HostNotification::WindowFocused, &window_id.to_le_bytes());
    }

    pub fn notify_window_unfocused(&self, window_id: i32) {
        self.notify(HostNotification::WindowUnfocused, &window_id.to_le_bytes());
    }

    pub fn notify_window_fullscreen_changed(&self, window_id: i32, fullscreen: bool) {
        let mut writer = PacketWriter::new();
        let _ = writer.write(window_id);
        let _ = writer.write(fullscreen);
        self.notify(HostNotification::WindowFullscreenChanged, writer.as_slice());
    }

    pub fn notify_window_load_start(&self, window_id: i32, url: &str) {
        self.notify_window_load(HostNotification::WindowLoadStart, window_id, url);
    }

    pub fn notify_window_load_end(&self, window_id: i32, url: &str) {
        self.notify_window_load(HostNotification::WindowLoadEnd, window_id, url);
    }

    fn notify_window_load(&self, opcode: HostNotification, window_id: i32, url: &str) {
        let mut writer = PacketWriter::new();
        let _ = writer.write(window_id);
        let _ = writer.write_size_prefixed_string(url);
        self.notify(opcode, writer.as_slice());
    }

    pub fn notify_window_load_error(
        &self,
        window_id: i32,
        error_code: i32,
        error_text: &str,
        url: &str,
    ) {
        let mut writer = PacketWriter::new();
        let _ = writer.write(window_id);
        let _ = writer.write(error_code);
        let _ = writer.write_size_prefixed_string(error_text);
        let _ = writer.write_size_prefixed_string(url);
        self.notify(HostNotification::WindowLoadError, writer.as_slice());
    }

    pub fn notify_window_devtools_event(&self, window_id: i32, method: &str, payload: &[u8]) {
        let mut writer = PacketWriter::new();
        let _ = writer.write(window_id);
        let _ = writer.write_size_prefixed_string(method);
        let _ = writer.write(payload.len() as i32);
        let _ = writer.write_bytes(payload);
        self.notify(HostNotification::WindowDevToolsEvent, writer.as_slice());
    }
}

fn encode_web_request(
    writer: &mut PacketWriter,
    window_id: i32,
    request: &WebRequest,
    include_body: bool,
) -> Result<(), CodecError> {
    writer.write(window_id)?;
    writer.write_size_prefixed_string(&request.method)?;
    writer.write_size_prefixed_string(&request.url)?;

    writer.write(request.headers.len() as i32)?;
    for (key, value) in &request.headers {
        writer.write_size_prefixed_string(key)?;
        writer.write_size_prefixed_string(value)?;
    }

    if include_body && !request.body.is_empty() {
        writer.write(request.body.len() as i32)?;
        for element in &request.body {
            match element {
                PostElement::Bytes(bytes) => {
                    writer.write(POST_ELEMENT_BYTES)?;
                    writer.write(bytes.len() as u32)?;
                    writer.write_bytes(bytes)?;
                }
                PostElement::File(path) => {
                    writer.write(POST_ELEMENT_FILE)?;
                    writer.write_size_prefixed_string(path)?;
                }
            }
        }
    } else {
        writer.write(0i32)?;
    }

    Ok(())
}

fn parse_proxy_response(engine: &IpcEngine, body: &[u8]) -> Option<ProxyResponse> {
    let mut reader = PacketReader::new(body);

    let Some(status_code) = reader.read::<u32>() else {
        error!("Failed to read status code");
        return None;
    };
    let Some(status_text) = reader.read_size_prefixed_string() else {
        error!("Failed to read status text");
        return None;
    };

    let Some(header_count) = reader.read::<u32>() else {
        error!("Failed to read response header count");
        return None;
    };

    let mut media_type = None;
    let mut headers = Vec::with_capacity(header_count as usize);
    for _ in 0..header_count {
        let Some(key) = reader.read_size_prefixed_string() else {
            error!("Failed to read response header key");
            return None;
        };
        let Some(value) = reader.read_size_prefixed_string() else {
            error!("Failed to read response header value");
            return None;
        };

        if key.eq_ignore_ascii_case("content-type") {
            media_type = value.split(';').next().map(str::to_string);
        }
        headers.push((key, value));
    }

    let Some(body_type) = reader.read::<u8>() else {
        error!("Failed to read body type");
        return None;
    };

    let body = match body_type {
        1 => {
            let Some(body_size) = reader.read::<u32>() else {
                error!("Failed to read body size");
                return None;
            };
            if body_size == 0 {
                ProxyBody::None
            } else {
                let Some(bytes) = reader.read_slice(body_size as usize) else {
                    error!(
                        "Proxy response missing body ({} bytes declared, {} remaining)",
                        body_size,
                        reader.remaining()
                    );
                    return None;
                };
                ProxyBody::Bytes(bytes.to_vec())
            }
        }
        2 => {
            let Some(stream_id) = reader.read::<u32>() else {
                error!("Failed to read stream id");
                return None;
            };
            ProxyBody::Stream(engine.get_or_open_stream(stream_id))
        }
        _ => ProxyBody::None,
    };

    Some(ProxyResponse {
        status_code,
        status_text,
        media_type,
        headers,
        body,
    })
}

fn parse_modified_request(body: &[u8], modify_body: bool) -> Option<WebRequest> {
    let mut reader = PacketReader::new(body);

    let Some(method) = reader.read_size_prefixed_string() else {
        error!("Failed to read method");
        return None;
    };
    let Some(url) = reader.read_size_prefixed_string() else {
        error!("Failed to read url");
        return None;
    };

    let Some(header_count) = reader.read::<u32>() else {
        error!("Failed to read header count");
        return None;
    };
    let mut headers = Vec::with_capacity(header_count as usize);
    for _ in 0..header_count {
        let Some(key) = reader.read_size_prefixed_string() else {
            error!("Failed to read header key");
            return None;
        };
        let Some(value) = reader.read_size_prefixed_string() else {
            error!("Failed to read header value");
            return None;
        };
        headers.push((key, value));
    }

    let Some(element_count) = reader.read::<u32>() else {
        error!("Failed to read element count");
        return None;
    };

    let mut elements = Vec::new();
    if modify_body {
        for _ in 0..element_count {
            let Some(kind) = reader.read::<u8>() else {
                error!("Failed to read element kind");
                return None;
            };

            match kind {
                POST_ELEMENT_BYTES => {
                    let Some(size) = reader.read::<u32>() else {
                        error!("Failed to read element size");
                        return None;
                    };
                    let Some(bytes) = reader.read_slice(size as usize) else {
                        error!("Not enough data available to read element body");
                        return None;
                    };
                    elements.push(PostElement::Bytes(bytes.to_vec()));
                }
                POST_ELEMENT_FILE => {
                    let Some(path) = reader.read_size_prefixed_string() else {
                        error!("Failed to read element file name");
                        return None;
                    };
                    elements.push(PostElement::File(path));
                }
                other => {
                    error!("Unknown element kind {}", other);
                    return None;
                }
            }
        }
    }

    Some(WebRequest {
        method,
        url,
        headers,
        body: elements,
    })
}
