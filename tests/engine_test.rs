/*!
 * Engine Tests
 * End-to-end packet scenarios driven over real OS pipes
 */

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use serial_test::serial;

use hostbridge::ipc::pipe::{create_pair, Pipe};
use hostbridge::{
    ControllerOpcode, EngineConfig, HostHooks, HostOpcode, IpcEngine, PacketHeader, PacketKind,
};

const INVALID_FD: i32 = -1;

/// An engine wired to this test through two anonymous pipes. The test plays
/// the controller: it writes packets into `to_host` and reads the host's
/// packets from `from_host`.
struct Harness {
    engine: IpcEngine,
    to_host: Pipe,
    from_host: Pipe,
}

impl Harness {
    fn start(config: EngineConfig) -> Self {
        let (c2h_read, c2h_write) = create_pair().unwrap();
        let (h2c_read, h2c_write) = create_pair().unwrap();

        let engine = IpcEngine::new(config);
        engine.set_handles(c2h_read, h2c_write);

        let to_host = Pipe::new();
        to_host.set_handles(INVALID_FD, c2h_write);
        let from_host = Pipe::new();
        from_host.set_handles(h2c_read, INVALID_FD);

        engine.start();
        assert!(engine.is_available());

        Self {
            engine,
            to_host,
            from_host,
        }
    }

    fn send(&self, kind: PacketKind, opcode: u8, request_id: u32, body: &[u8]) {
        let header = PacketHeader::new(kind, opcode, request_id, body.len());
        self.send_raw(header, body);
    }

    fn send_raw(&self, header: PacketHeader, body: &[u8]) {
        let mut packet = header.encode().to_vec();
        packet.extend_from_slice(body);
        assert_eq!(self.to_host.write(&packet, true), packet.len());
    }

    fn recv(&self) -> (PacketHeader, Vec<u8>) {
        let mut header_buf = [0u8; PacketHeader::SIZE];
        assert_eq!(
            self.from_host.read(&mut header_buf, true),
            PacketHeader::SIZE
        );
        let header = PacketHeader::parse(&header_buf).unwrap();

        let body_len = header.body_len().unwrap();
        let mut body = vec![0u8; body_len];
        assert_eq!(self.from_host.read(&mut body, true), body_len);
        (header, body)
    }

    fn wait_for_shutdown(&self) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while self.engine.is_available() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!self.engine.is_available());
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.engine.stop();
    }
}

#[test]
#[serial]
fn test_echo_round_trip() {
    let harness = Harness::start(EngineConfig::default());

    harness.send(
        PacketKind::Request,
        ControllerOpcode::Echo.into(),
        42,
        b"hello",
    );

    let (header, body) = harness.recv();
    assert_eq!(header.kind, PacketKind::Response);
    assert_eq!(header.request_id, 42);
    assert_eq!(header.opcode, u8::from(ControllerOpcode::Echo));
    assert_eq!(header.size, 11);
    assert_eq!(body, b"hello");
}

#[test]
#[serial]
fn test_unknown_opcode_answered_empty() {
    let harness = Harness::start(EngineConfig::default());

    harness.send(PacketKind::Request, 0xFE, 7, &[]);
    let (header, body) = harness.recv();
    assert_eq!(header.kind, PacketKind::Response);
    assert_eq!(header.request_id, 7);
    assert_eq!(header.opcode, 0xFE);
    assert!(body.is_empty());

    // the channel survives: a ping afterwards completes normally
    assert!(harness.engine.is_available());
    harness.send(PacketKind::Request, ControllerOpcode::Ping.into(), 8, &[]);
    let (header, body) = harness.recv();
    assert_eq!(header.request_id, 8);
    assert!(body.is_empty());
}

#[test]
#[serial]
fn test_stream_order_with_ring_wrap() {
    let harness = Harness::start(EngineConfig {
        stream_capacity: 16,
        ..EngineConfig::default()
    });

    harness.send(
        PacketKind::Request,
        ControllerOpcode::StreamOpen.into(),
        1,
        &1u32.to_le_bytes(),
    );
    let _ = harness.recv();

    let stream = harness.engine.stream(1).unwrap();
    let consumer = thread::spawn(move || {
        let mut collected = Vec::new();
        let mut buf = [0u8; 16];
        while collected.len() < 20 {
            let n = stream.read(&mut buf);
            assert!(n > 0);
            collected.extend_from_slice(&buf[..n]);
        }
        collected
    });

    let mut first = 1u32.to_le_bytes().to_vec();
    first.extend_from_slice(b"ABCDEFGHIJ");
    harness.send(PacketKind::Request, ControllerOpcode::StreamData.into(), 2, &first);

    let mut second = 1u32.to_le_bytes().to_vec();
    second.extend_from_slice(b"KLMNOPQRST");
    harness.send(PacketKind::Request, ControllerOpcode::StreamData.into(), 3, &second);

    let (_, body) = harness.recv();
    assert_eq!(body, [1]);
    let (_, body) = harness.recv();
    assert_eq!(body, [1]);

    // 20 bytes through a 16 byte ring: the writer never deadlocks and the
    // consumer sees the exact byte sequence
    assert_eq!(consumer.join().unwrap(), b"ABCDEFGHIJKLMNOPQRST");
}

#[test]
#[serial]
fn test_stop_wakes_blocked_callers() {
    let harness = Harness::start(EngineConfig::default());

    let mut callers = Vec::new();
    for _ in 0..3 {
        let engine = harness.engine.clone();
        callers.push(thread::spawn(move || engine.echo(b"never answered")));
    }

    // let the calls get onto the wire before pulling the plug
    thread::sleep(Duration::from_millis(50));

    let stopped_at = Instant::now();
    harness.engine.stop();

    for caller in callers {
        let response = caller.join().unwrap();
        assert!(response.is_empty());
    }
    assert!(stopped_at.elapsed() < Duration::from_millis(100));
}

#[test]
#[serial]
fn test_oversized_packet_terminates_engine() {
    let harness = Harness::start(EngineConfig::default());

    let header = PacketHeader {
        size: 0xFFFF_FFFF,
        request_id: 1,
        kind: PacketKind::Request,
        opcode: 0,
    };
    harness.send_raw(header, &[]);

    harness.wait_for_shutdown();

    // the engine closed its pipe ends
    let mut buf = [0u8; 1];
    assert_eq!(harness.from_host.read(&mut buf, true), 0);
}

#[test]
#[serial]
fn test_undersized_size_field_terminates_engine() {
    let harness = Harness::start(EngineConfig::default());

    // size must cover at least the six header bytes after the size field
    let header = PacketHeader {
        size: 2,
        request_id: 1,
        kind: PacketKind::Request,
        opcode: 0,
    };
    harness.send_raw(header, &[]);

    harness.wait_for_shutdown();
}

#[test]
#[serial]
fn test_stream_data_for_unknown_id() {
    let harness = Harness::start(EngineConfig::default());

    let mut body = 99u32.to_le_bytes().to_vec();
    body.push(0xAB);
    harness.send(PacketKind::Request, ControllerOpcode::StreamData.into(), 1, &body);
    let (_, response) = harness.recv();
    assert_eq!(response, [0]);

    harness.send(
        PacketKind::Request,
        ControllerOpcode::StreamOpen.into(),
        2,
        &99u32.to_le_bytes(),
    );
    let _ = harness.recv();

    harness.send(PacketKind::Request, ControllerOpcode::StreamData.into(), 3, &body);
    let (_, response) = harness.recv();
    assert_eq!(response, [1]);

    let stream = harness.engine.stream(99).unwrap();
    let mut buf = [0u8; 4];
    assert_eq!(stream.read(&mut buf), 1);
    assert_eq!(buf[0], 0xAB);
}

#[test]
#[serial]
fn test_unknown_correlation_id_is_dropped() {
    let harness = Harness::start(EngineConfig::default());

    harness.send(PacketKind::Response, 0, 777, b"orphan");

    // still alive and serving requests
    harness.send(PacketKind::Request, ControllerOpcode::Ping.into(), 1, &[]);
    let (header, _) = harness.recv();
    assert_eq!(header.request_id, 1);
}

#[test]
#[serial]
fn test_outbound_call_round_trip() {
    let harness = Harness::start(EngineConfig::default());

    let engine = harness.engine.clone();
    let caller = thread::spawn(move || engine.echo(b"marco"));

    let (header, body) = harness.recv();
    assert_eq!(header.kind, PacketKind::Request);
    assert_eq!(header.opcode, u8::from(HostOpcode::Echo));
    assert_eq!(body, b"marco");

    harness.send(PacketKind::Response, header.opcode, header.request_id, b"polo");
    assert_eq!(caller.join().unwrap(), b"polo");
}

#[test]
#[serial]
fn test_notify_carries_no_correlation_id() {
    let harness = Harness::start(EngineConfig::default());

    harness.engine.notify_ready();

    let (header, body) = harness.recv();
    assert_eq!(header.kind, PacketKind::Notification);
    assert_eq!(header.request_id, 0);
    assert_eq!(header.opcode, 0);
    assert!(body.is_empty());
}

#[test]
#[serial]
fn test_exit_notification_triggers_shutdown_hook() {
    let harness = Harness::start(EngineConfig::default());

    struct FlagHost {
        shutdown: AtomicBool,
    }
    impl HostHooks for FlagHost {
        fn on_shutdown(&self) {
            self.shutdown.store(true, Ordering::SeqCst);
        }
    }

    let host = Arc::new(FlagHost {
        shutdown: AtomicBool::new(false),
    });
    harness.engine.set_host(host.clone());

    harness.send(PacketKind::Notification, 0, 0, &[]);

    harness.wait_for_shutdown();
    let deadline = Instant::now() + Duration::from_secs(2);
    while !host.shutdown.load(Ordering::SeqCst) && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert!(host.shutdown.load(Ordering::SeqCst));
}

#[test]
#[serial]
fn test_close_stream_notifies_peer() {
    let harness = Harness::start(EngineConfig::default());

    harness.engine.stream_open(5);
    assert!(harness.engine.stream(5).is_some());

    let engine = harness.engine.clone();
    let closer = thread::spawn(move || engine.close_stream(5));

    let (header, body) = harness.recv();
    assert_eq!(header.kind, PacketKind::Request);
    assert_eq!(header.opcode, u8::from(HostOpcode::StreamClose));
    assert_eq!(body, 5u32.to_le_bytes());

    harness.send(PacketKind::Response, header.opcode, header.request_id, &[]);
    closer.join().unwrap();

    assert!(harness.engine.stream(5).is_none());
}

#[test]
#[serial]
fn test_peer_close_shuts_the_engine_down() {
    let harness = Harness::start(EngineConfig::default());

    harness.to_host.close();
    harness.wait_for_shutdown();
}

#[test]
#[serial]
fn test_start_without_handles_is_a_noop() {
    let engine = IpcEngine::new(EngineConfig::default());
    assert!(!engine.has_valid_handles());

    engine.start();
    assert!(!engine.is_available());
    assert!(engine.echo(b"void").is_empty());
}
