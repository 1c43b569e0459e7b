use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// A closure the worker pool runs once, on whichever worker picks it up.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Accepts closures to run, possibly concurrently with one another.
///
/// Deliberately minimal: the coordinator only ever needs "run this batch's
/// dispatch somewhere, maybe alongside other batches' dispatches". Nothing
/// about the coordinator depends on this being backed by OS threads — a
/// work-stealing runtime or an async executor's task spawner satisfies the
/// contract equally well, so long as submitted jobs eventually run.
pub trait WorkerPool: Send + Sync {
    /// Submits `job` to run on the pool. Returns immediately; `job` may run
    /// concurrently with jobs submitted before or after it.
    fn submit(&self, job: Job);
}

enum Message {
    Run(Job),
    Shutdown,
}

/// A fixed-size pool of persistent OS threads, each pulling jobs off a
/// shared queue.
///
/// This is the coordinator's default worker pool (see
/// [`crate::Coordinator::create`]), sized at construction and torn down
/// when dropped.
pub struct FixedThreadPool {
    sender: Mutex<Option<mpsc::Sender<Message>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl FixedThreadPool {
    /// Creates a pool with `workers` persistent threads.
    ///
    /// # Panics
    ///
    /// Panics if `workers` is zero.
    #[must_use]
    pub fn new(workers: usize) -> Self {
        assert!(workers > 0, "a worker pool needs at least one worker");

        let (sender, receiver) = mpsc::channel::<Message>();
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..workers)
            .map(|id| {
                let receiver = Arc::clone(&receiver);
                thread::Builder::new()
                    .name(format!("coalesce-worker-{id}"))
                    .spawn(move || loop {
                        let message = receiver
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .recv();
                        match message {
                            Ok(Message::Run(job)) => job(),
                            Ok(Message::Shutdown) | Err(_) => break,
                        }
                    })
                    .expect("failed to spawn worker thread")
            })
            .collect();

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(handles),
        }
    }
}

impl WorkerPool for FixedThreadPool {
    fn submit(&self, job: Job) {
        let guard = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(sender) = guard.as_ref() {
            // A send error means every worker thread has already exited,
            // which only happens once the pool itself is being dropped.
            let _ = sender.send(Message::Run(job));
        } else {
            tracing::warn!("dropped job submitted after worker pool shutdown");
        }
    }
}

impl Drop for FixedThreadPool {
    fn drop(&mut self) {
        if let Some(sender) = self.sender.lock().unwrap_or_else(|e| e.into_inner()).take() {
            let workers = self.workers.lock().unwrap_or_else(|e| e.into_inner()).len();
            for _ in 0..workers {
                let _ = sender.send(Message::Shutdown);
            }
        }
        for handle in self.workers.lock().unwrap_or_else(|e| e.into_inner()).drain(..) {
            let _ = handle.join();
        }
    }
}
