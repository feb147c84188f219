//! Fixed-size worker thread pool fed by a bounded queue.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;

use crate::error::TilerResult;

type Task = Box<dyn FnOnce() -> TilerResult<()> + Send + 'static>;

/// Counts of finished tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolReport {
    pub completed: usize,
    pub failed: usize,
}

/// A pool of worker threads.
///
/// Submitting blocks while the queue is full. A failing task is logged and
/// counted; the worker carries on with the next one.
pub struct WorkerPool {
    sender: async_channel::Sender<(String, Task)>,
    workers: Vec<JoinHandle<()>>,
    completed: Arc<AtomicUsize>,
    failed: Arc<AtomicUsize>,
}

impl WorkerPool {
    pub fn new(num_threads: usize) -> Self {
        let num_threads = num_threads.max(1);
        let (sender, receiver) = async_channel::bounded::<(String, Task)>(num_threads);
        let completed = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));

        let workers = (0..num_threads)
            .map(|index| {
                let receiver = receiver.clone();
                let completed = Arc::clone(&completed);
                let failed = Arc::clone(&failed);
                std::thread::Builder::new()
                    .name(format!("tiler-worker-{index}"))
                    .spawn(move || {
                        while let Ok((name, task)) = receiver.recv_blocking() {
                            match task() {
                                Ok(()) => {
                                    tracing::debug!("Finished {name}");
                                    completed.fetch_add(1, Ordering::Relaxed);
                                }
                                Err(e) => {
                                    tracing::error!("{name} failed: {e}");
                                    failed.fetch_add(1, Ordering::Relaxed);
                                }
                            }
                        }
                    })
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::error!("Failed to start worker thread: {e}");
                    None
                }
            })
            .collect();

        Self {
            sender,
            workers,
            completed,
            failed,
        }
    }

    /// Queue a task, blocking while the queue is full.
    pub fn submit<F>(&self, name: impl Into<String>, task: F)
    where
        F: FnOnce() -> TilerResult<()> + Send + 'static,
    {
        let name = name.into();
        if self.workers.is_empty() {
            // No workers could be started; run inline so work is not lost.
            if let Err(e) = task() {
                tracing::error!("{name} failed: {e}");
                self.failed.fetch_add(1, Ordering::Relaxed);
            } else {
                self.completed.fetch_add(1, Ordering::Relaxed);
            }
            return;
        }

        let task: Task = Box::new(task);
        if let Err(e) = self.sender.send_blocking((name, task)) {
            tracing::error!("Worker queue closed, dropping {}", e.into_inner().0);
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Wait for every queued task to finish.
    pub fn finish(self) -> PoolReport {
        self.sender.close();
        for worker in self.workers {
            if worker.join().is_err() {
                tracing::error!("A worker thread panicked");
            }
        }
        PoolReport {
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::error::TilerError;

    #[test]
    fn test_runs_every_task() {
        let pool = WorkerPool::new(3);
        let counter = Arc::new(AtomicUsize::new(0));
        for i in 0..50 {
            let counter = Arc::clone(&counter);
            pool.submit(format!("task {i}"), move || {
                counter.fetch_add(1, Ordering::Relaxed);
                Ok(())
            });
        }

        let report = pool.finish();
        assert_eq!(counter.load(Ordering::Relaxed), 50);
        assert_eq!(
            report,
            PoolReport {
                completed: 50,
                failed: 0
            }
        );
    }

    #[test]
    fn test_failures_do_not_stop_the_pool() {
        let pool = WorkerPool::new(2);
        for i in 0..10 {
            pool.submit(format!("task {i}"), move || {
                if i % 3 == 0 {
                    Err(TilerError::Io {
                        path: PathBuf::from(format!("tile_{i}.obj")),
                        message: "disk full".to_string(),
                    })
                } else {
                    Ok(())
                }
            });
        }

        let report = pool.finish();
        assert_eq!(report.failed, 4);
        assert_eq!(report.completed, 6);
    }
}
