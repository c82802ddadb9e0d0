use std::io;
use std::thread::{self, JoinHandle};

/// Work handed to a spawner; runs a worker to completion
pub type WorkerJob = Box<dyn FnOnce() + Send + 'static>;

/// Launches workers as independent units of execution.
///
/// A spawn error aborts the whole race. If an implementation drops a job without
/// running it, the worker reports an abnormal termination.
pub trait Spawner {
    fn spawn(&self, worker: usize, job: WorkerJob) -> io::Result<JoinHandle<()>>;
}

impl<S: Spawner + ?Sized> Spawner for &S {
    fn spawn(&self, worker: usize, job: WorkerJob) -> io::Result<JoinHandle<()>> {
        (**self).spawn(worker, job)
    }
}

impl<S: Spawner + ?Sized> Spawner for Box<S> {
    fn spawn(&self, worker: usize, job: WorkerJob) -> io::Result<JoinHandle<()>> {
        (**self).spawn(worker, job)
    }
}

/// Runs each worker on its own named OS thread
#[derive(Debug, Clone, Default)]
pub struct ThreadSpawner {
    stack_size: Option<usize>,
}

impl ThreadSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }
}

impl Spawner for ThreadSpawner {
    fn spawn(&self, worker: usize, job: WorkerJob) -> io::Result<JoinHandle<()>> {
        let mut builder = thread::Builder::new().name(format!("racescout-worker-{worker}"));
        if let Some(bytes) = self.stack_size {
            builder = builder.stack_size(bytes);
        }
        builder.spawn(job)
    }
}
