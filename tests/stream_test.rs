/*!
 * Data Stream Tests
 * Ordering, wrap, and shutdown-liveness properties under concurrency
 */

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;

use hostbridge::DataStream;

#[test]
fn test_large_payload_through_small_ring() {
    // 64 byte ring, 10 KiB payload: the ring wraps hundreds of times and the
    // consumer still observes the exact producer byte sequence
    let payload: Vec<u8> = (0..10_240u32).map(|i| (i % 251) as u8).collect();
    let stream = Arc::new(DataStream::with_capacity(1, 64));

    let producer = {
        let stream = stream.clone();
        let payload = payload.clone();
        thread::spawn(move || {
            let written = stream.write(&payload);
            stream.close();
            written
        })
    };

    let mut collected = Vec::with_capacity(payload.len());
    let mut buf = [0u8; 48];
    loop {
        let n = stream.read(&mut buf);
        if n == 0 {
            break;
        }
        collected.extend_from_slice(&buf[..n]);
    }

    assert_eq!(producer.join().unwrap(), payload.len());
    assert_eq!(collected, payload);
}

#[test]
fn test_chunked_writes_concatenate_in_order() {
    let stream = Arc::new(DataStream::with_capacity(2, 32));

    let producer = {
        let stream = stream.clone();
        thread::spawn(move || {
            for chunk in 0..100u8 {
                stream.write(&[chunk; 7]);
            }
            stream.close();
        })
    };

    let mut collected = Vec::new();
    let mut buf = [0u8; 13];
    loop {
        let n = stream.read(&mut buf);
        if n == 0 {
            break;
        }
        collected.extend_from_slice(&buf[..n]);
    }
    producer.join().unwrap();

    let expected: Vec<u8> = (0..100u8).flat_map(|chunk| [chunk; 7]).collect();
    assert_eq!(collected, expected);
}

#[test]
fn test_close_releases_all_blocked_threads() {
    let stream = Arc::new(DataStream::with_capacity(3, 8));

    // saturate the ring so writers will block
    assert_eq!(stream.write(&[0u8; 8]), 8);

    let mut writers = Vec::new();
    for _ in 0..2 {
        let stream = stream.clone();
        writers.push(thread::spawn(move || stream.write(&[1u8; 4])));
    }

    let mut readers = Vec::new();
    for _ in 0..2 {
        let stream = stream.clone();
        readers.push(thread::spawn(move || {
            // drain whatever is there, then block on the empty ring
            let mut total = 0;
            let mut buf = [0u8; 16];
            loop {
                let n = stream.read(&mut buf);
                if n == 0 {
                    return total;
                }
                total += n;
            }
        }));
    }

    thread::sleep(Duration::from_millis(50));
    let closed_at = Instant::now();
    stream.close();

    let mut drained = 0;
    for writer in writers {
        writer.join().unwrap();
    }
    for reader in readers {
        drained += reader.join().unwrap();
    }
    assert!(closed_at.elapsed() < Duration::from_millis(100));

    // everything that entered the ring was drained before EOF
    assert!(drained >= 8);
    assert_eq!(stream.buffered(), 0);
}

#[test]
fn test_close_then_drain_then_eof() {
    let stream = DataStream::with_capacity(4, 32);
    stream.write(b"remainder");
    stream.close();
    stream.close();
    stream.close();

    let mut buf = [0u8; 4];
    let mut collected = Vec::new();
    loop {
        let n = stream.read(&mut buf);
        if n == 0 {
            break;
        }
        collected.extend_from_slice(&buf[..n]);
    }

    assert_eq!(collected, b"remainder");
    assert_eq!(stream.read(&mut buf), 0);
    assert_eq!(stream.read(&mut buf), 0);
}
