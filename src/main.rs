/*!
 * hostbridge - Host Process Entry Point
 *
 * Boot sequence:
 * - inherit the controller's pipe descriptors from the command line
 * - start the IPC engine
 * - announce readiness and park until the engine tears down
 */

use std::sync::Arc;

use log::{error, info};
use parking_lot::{Condvar, Mutex};

use hostbridge::{EngineConfig, HostHooks, IpcEngine};

/// Latch released exactly once when the engine goes down.
struct ShutdownLatch {
    released: Mutex<bool>,
    condvar: Condvar,
}

impl ShutdownLatch {
    fn new() -> Self {
        Self {
            released: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    fn release(&self) {
        let mut released = self.released.lock();
        *released = true;
        self.condvar.notify_all();
    }

    fn wait(&self) {
        let mut released = self.released.lock();
        while !*released {
            self.condvar.wait(&mut released);
        }
    }
}

/// Hooks for a bare host: no window backend, shutdown releases the latch.
struct BareHost {
    latch: Arc<ShutdownLatch>,
}

impl HostHooks for BareHost {
    fn on_shutdown(&self) {
        info!("Engine shut down, releasing message loop");
        self.latch.release();
    }
}

/// `--parent-to-child <fd>` and `--child-to-parent <fd>` as handed over by
/// the controller that spawned this process.
fn inherited_handles() -> (Option<i32>, Option<i32>) {
    let mut read_fd = None;
    let mut write_fd = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--parent-to-child" => read_fd = args.next().and_then(|v| v.parse().ok()),
            "--child-to-parent" => write_fd = args.next().and_then(|v| v.parse().ok()),
            _ => {}
        }
    }

    (read_fd, write_fd)
}

fn config_from_env() -> EngineConfig {
    let mut config = EngineConfig::default();

    if let Ok(value) = std::env::var("HOSTBRIDGE_WORKER_THREADS") {
        if let Ok(threads) = value.parse() {
            config.worker_threads = threads;
        }
    }
    if let Ok(value) = std::env::var("HOSTBRIDGE_STREAM_CAPACITY") {
        if let Ok(capacity) = value.parse() {
            config.stream_capacity = capacity;
        }
    }

    config
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("hostbridge starting...");

    let config = config_from_env();
    info!(
        "Engine config: {} workers, {} byte stream capacity",
        config.worker_threads, config.stream_capacity
    );

    let engine = IpcEngine::new(config);

    match inherited_handles() {
        (Some(read_fd), Some(write_fd)) => {
            engine.set_handles(read_fd, write_fd);
            info!("Set handles");
        }
        _ => {
            info!("Missing handles");
        }
    }

    if !engine.has_valid_handles() {
        error!("IPC handles must be passed via --parent-to-child/--child-to-parent");
        std::process::exit(1);
    }

    let latch = Arc::new(ShutdownLatch::new());
    engine.set_host(Arc::new(BareHost {
        latch: latch.clone(),
    }));

    engine.start();
    engine.notify_ready();

    latch.wait();
    info!("hostbridge exiting");
}
