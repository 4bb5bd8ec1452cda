/*!
 * Work Scheduling
 * Ordered single-consumer queue and unordered multi-consumer pool
 */

use log::{debug, error, info};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    state: Mutex<State>,
    condvar: Condvar,
}

struct State {
    jobs: VecDeque<Job>,
    exit: bool,
}

impl Shared {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                jobs: VecDeque::new(),
                exit: false,
            }),
            condvar: Condvar::new(),
        })
    }

    fn enqueue(&self, job: Job) {
        {
            let mut state = self.state.lock();
            if state.exit {
                debug!("Work item discarded after stop");
                return;
            }
            state.jobs.push_back(job);
        }
        self.condvar.notify_one();
    }

    /// Set the exit flag, drop everything not yet started, wake all consumers.
    fn shutdown(&self) {
        let discarded = {
            let mut state = self.state.lock();
            state.exit = true;
            let discarded = state.jobs.len();
            state.jobs.clear();
            discarded
        };
        self.condvar.notify_all();

        if discarded > 0 {
            info!("Discarded {} queued work items on stop", discarded);
        }
    }

    /// Consumer loop shared by the queue worker and the pool workers.
    fn drain(&self, name: &str) {
        loop {
            let job = {
                let mut state = self.state.lock();
                while !state.exit && state.jobs.is_empty() {
                    self.condvar.wait(&mut state);
                }
                if state.exit {
                    info!("{} worker shutting down", name);
                    return;
                }
                state.jobs.pop_front()
            };

            if let Some(job) = job {
                job();
            }
        }
    }
}

/// FIFO queue drained by a single background thread.
///
/// Items submitted from one producer execute in exact submission order.
pub struct WorkQueue {
    name: &'static str,
    shared: Arc<Shared>,
    started: AtomicBool,
}

impl WorkQueue {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            shared: Shared::new(),
            started: AtomicBool::new(false),
        }
    }

    pub fn start(&self) {
        if self.started.swap(true, Ordering::AcqRel) {
            return;
        }

        let shared = self.shared.clone();
        let name = self.name;
        let spawned = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || shared.drain(name));
        match spawned {
            Ok(_) => info!("{} queue started", self.name),
            Err(e) => error!("Failed to spawn {} worker: {}", self.name, e),
        }
    }

    /// Set the exit flag, clear pending work, and wake the worker. The worker
    /// finishes its in-flight item and exits; no join is attempted so stop is
    /// safe from any thread, including the worker itself.
    pub fn stop(&self) {
        if !self.started.load(Ordering::Acquire) {
            return;
        }
        self.shared.shutdown();
    }

    pub fn enqueue<F>(&self, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.enqueue(Box::new(work));
    }
}

/// Fixed set of worker threads draining one shared FIFO.
///
/// No ordering across workers; each worker runs its current item to
/// completion before honoring stop.
pub struct WorkerPool {
    shared: Arc<Shared>,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self {
            shared: Shared::new(),
        }
    }

    pub fn add_workers(&self, count: usize) {
        for index in 0..count {
            let shared = self.shared.clone();
            let spawned = thread::Builder::new()
                .name(format!("ipc-worker-{}", index))
                .spawn(move || shared.drain("pool"));
            if let Err(e) = spawned {
                error!("Failed to spawn pool worker {}: {}", index, e);
            }
        }
        info!("Worker pool started with {} workers", count);
    }

    pub fn enqueue<F>(&self, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared.enqueue(Box::new(work));
    }

    pub fn stop(&self) {
        self.shared.shutdown();
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new()
    }
}
