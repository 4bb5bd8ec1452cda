/*!
 * Pipe Transport
 * Fixed-direction duplex byte transport over inherited Unix descriptors
 */

use log::{debug, info};
use nix::libc;
use std::io;
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicI32, Ordering};

const INVALID_FD: RawFd = -1;

/// Raw byte transport over a pair of pipe descriptors.
///
/// The read and write ends are owned separately so a reader thread can block
/// on `read` while another thread writes. `close` releases both ends and is
/// safe to call from any thread; a subsequent read or write observes the
/// invalid handle and returns a short count. Framing is a caller concern.
pub struct Pipe {
    read_fd: AtomicI32,
    write_fd: AtomicI32,
}

impl Pipe {
    pub const fn new() -> Self {
        Self {
            read_fd: AtomicI32::new(INVALID_FD),
            write_fd: AtomicI32::new(INVALID_FD),
        }
    }

    /// Install descriptors inherited from the parent process.
    pub fn set_handles(&self, read_fd: RawFd, write_fd: RawFd) {
        debug!("Pipe handles set (read: {}, write: {})", read_fd, write_fd);
        self.read_fd.store(read_fd, Ordering::Release);
        self.write_fd.store(write_fd, Ordering::Release);
    }

    pub fn has_valid_handles(&self) -> bool {
        self.read_fd.load(Ordering::Acquire) != INVALID_FD
            && self.write_fd.load(Ordering::Acquire) != INVALID_FD
    }

    /// Read up to `buf.len()` bytes. With `read_fully` the call loops until
    /// the buffer is full, the peer closes, or the pipe errors; the return
    /// value is the number of bytes actually read (0 means end of stream).
    pub fn read(&self, buf: &mut [u8], read_fully: bool) -> usize {
        let mut total = 0;
        while total < buf.len() {
            let fd = self.read_fd.load(Ordering::Acquire);
            if fd == INVALID_FD {
                break;
            }

            let n = unsafe {
                libc::read(
                    fd,
                    buf[total..].as_mut_ptr() as *mut libc::c_void,
                    buf.len() - total,
                )
            };
            if n < 0 {
                if io::Error::last_os_error().kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                break;
            }
            if n == 0 {
                break;
            }

            total += n as usize;
            if !read_fully {
                break;
            }
        }
        total
    }

    /// Write up to `buf.len()` bytes. With `write_fully` the call loops until
    /// everything is written or the pipe fails; a short return means the peer
    /// closed.
    pub fn write(&self, buf: &[u8], write_fully: bool) -> usize {
        let mut total = 0;
        while total < buf.len() {
            let fd = self.write_fd.load(Ordering::Acquire);
            if fd == INVALID_FD {
                break;
            }

            let n = unsafe {
                libc::write(
                    fd,
                    buf[total..].as_ptr() as *const libc::c_void,
                    buf.len() - total,
                )
            };
            if n < 0 {
                if io::Error::last_os_error().kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                break;
            }
            if n == 0 {
                break;
            }

            total += n as usize;
            if !write_fully {
                break;
            }
        }
        total
    }

    /// Release both ends. Idempotent; callable from any thread.
    pub fn close(&self) {
        let read_fd = self.read_fd.swap(INVALID_FD, Ordering::AcqRel);
        if read_fd != INVALID_FD {
            unsafe { libc::close(read_fd) };
            info!("Pipe read handle closed");
        }

        let write_fd = self.write_fd.swap(INVALID_FD, Ordering::AcqRel);
        if write_fd != INVALID_FD {
            unsafe { libc::close(write_fd) };
            info!("Pipe write handle closed");
        }
    }
}

impl Default for Pipe {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Pipe {
    fn drop(&mut self) {
        self.close();
    }
}

/// Create an anonymous pipe, returning `(read_end, write_end)`.
pub fn create_pair() -> io::Result<(RawFd, RawFd)> {
    let mut fds = [0 as libc::c_int; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok((fds[0], fds[1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_write_then_read() {
        let (r, w) = create_pair().unwrap();
        let pipe = Pipe::new();
        pipe.set_handles(r, w);

        assert_eq!(pipe.write(b"hello", true), 5);

        let mut buf = [0u8; 5];
        assert_eq!(pipe.read(&mut buf, true), 5);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn test_read_fully_spans_partial_writes() {
        let (r, w) = create_pair().unwrap();
        let reader = Arc::new(Pipe::new());
        reader.set_handles(r, INVALID_FD);
        let writer = Pipe::new();
        writer.set_handles(INVALID_FD, w);

        let handle = {
            let reader = reader.clone();
            thread::spawn(move || {
                let mut buf = [0u8; 8];
                let n = reader.read(&mut buf, true);
                (n, buf)
            })
        };

        writer.write(b"abcd", true);
        thread::sleep(std::time::Duration::from_millis(20));
        writer.write(b"efgh", true);

        let (n, buf) = handle.join().unwrap();
        assert_eq!(n, 8);
        assert_eq!(&buf, b"abcdefgh");
    }

    #[test]
    fn test_peer_close_is_end_of_stream() {
        let (r, w) = create_pair().unwrap();
        let reader = Pipe::new();
        reader.set_handles(r, INVALID_FD);

        {
            let writer = Pipe::new();
            writer.set_handles(INVALID_FD, w);
            assert_eq!(writer.write(b"xy", true), 2);
            // writer dropped here, closing the write end
        }

        let mut buf = [0u8; 4];
        assert_eq!(reader.read(&mut buf, true), 2);
        assert_eq!(reader.read(&mut buf, true), 0);
    }

    #[test]
    fn test_close_is_idempotent() {
        let (r, w) = create_pair().unwrap();
        let pipe = Pipe::new();
        pipe.set_handles(r, w);
        assert!(pipe.has_valid_handles());

        pipe.close();
        pipe.close();
        assert!(!pipe.has_valid_handles());
        assert_eq!(pipe.write(b"x", true), 0);
    }
}
