//! Fixed-size background worker pool.
//!
//! Jobs are queued on an unbounded crossbeam channel and picked up by named
//! worker threads. A pool with zero workers runs every job inline on the
//! scheduling thread.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Pending {
    count: Mutex<usize>,
    idle: Condvar,
}

impl Pending {
    fn increment(&self) {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner) += 1;
    }

    fn decrement(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }

    fn wait_for_zero(&self) {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        while *count > 0 {
            count = self
                .idle
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Runs background jobs for the lifetime of a map builder.
pub struct ThreadPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    pending: Arc<Pending>,
}

impl ThreadPool {
    /// Spawn `num_threads` workers.
    pub fn new(num_threads: usize) -> Self {
        let pending = Arc::new(Pending::default());
        if num_threads == 0 {
            return Self {
                sender: None,
                workers: Vec::new(),
                pending,
            };
        }

        let (sender, receiver) = unbounded::<Job>();
        let mut workers = Vec::with_capacity(num_threads);
        for index in 0..num_threads {
            let receiver = receiver.clone();
            let pending = Arc::clone(&pending);
            match thread::Builder::new()
                .name(format!("naksha-worker-{}", index))
                .spawn(move || run_worker(receiver, pending))
            {
                Ok(handle) => workers.push(handle),
                Err(e) => log::error!("Failed to spawn worker {}: {}", index, e),
            }
        }
        log::info!("Thread pool started with {} workers", workers.len());

        // Every spawn failed: fall back to inline execution.
        let sender = if workers.is_empty() { None } else { Some(sender) };
        Self {
            sender,
            workers,
            pending,
        }
    }

    /// Number of worker threads (0 = inline).
    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Queue a job.
    pub fn schedule<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(sender) = &self.sender else {
            job();
            return;
        };
        self.pending.increment();
        if let Err(e) = sender.send(Box::new(job)) {
            self.pending.decrement();
            log::warn!("Worker pool is shut down, running job inline");
            (e.into_inner())();
        }
    }

    /// Block until every scheduled job has completed.
    pub fn wait_until_idle(&self) {
        self.pending.wait_for_zero();
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        // Closing the channel ends each worker once the queue is drained.
        self.sender.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("Worker thread panicked");
            }
        }
    }
}

fn run_worker(receiver: Receiver<Job>, pending: Arc<Pending>) {
    while let Ok(job) = receiver.recv() {
        job();
        pending.decrement();
    }
}
