use std::{
    any::Any,
    marker::PhantomData,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, PoisonError},
    thread,
};

use crossbeam::{
    channel::{Receiver, Sender, unbounded},
    sync::WaitGroup,
};

type Job = Box<dyn FnOnce() + Send + 'static>;

type PanicSlot = Arc<Mutex<Option<Box<dyn Any + Send + 'static>>>>;

/// A fixed pool of worker threads that runs scoped jobs.
///
/// Jobs only enter the pool through [`Executor::scope`], so every job borrows from a frame that
/// outlives it.
pub struct Executor {
    sender: Sender<Message>,
    workers: Vec<Worker>,
}

enum Message {
    Run(Job),
    Stop,
}

struct Worker {
    id: usize,
    handle: Option<thread::JoinHandle<()>>,
}

impl Executor {
    /// Start `size` worker threads.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero or a thread can not be spawned.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "worker pool size must be greater than 0");

        let (sender, receiver) = unbounded();
        let workers = (0..size)
            .map(|id| Worker::start(id, receiver.clone()))
            .collect();

        log::debug!("started executor with {size} workers");
        Executor { sender, workers }
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Run `f` with a [`Scope`] that can spawn jobs borrowing from the caller.
    ///
    /// Every job spawned in the scope has finished when this returns. If any job panicked,
    /// the first panic is resumed on the calling thread after all jobs are done.
    ///
    /// ```ignore
    /// let mut data = vec![1, 2, 3, 4];
    /// executor.scope(|s| {
    ///     for item in &mut data {
    ///         s.spawn(move || *item *= 2);
    ///     }
    /// });
    /// assert_eq!(data, vec![2, 4, 6, 8]);
    /// ```
    pub fn scope<'env, F, R>(&'env self, f: F) -> R
    where
        F: FnOnce(&Scope<'env>) -> R,
    {
        let panic_slot = PanicSlot::default();
        let result = {
            let scope = Scope {
                executor: self,
                wait_group: Some(WaitGroup::new()),
                panic_slot: panic_slot.clone(),
                _phantom: PhantomData,
            };
            f(&scope)
        };

        let payload = panic_slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(payload) = payload {
            panic::resume_unwind(payload);
        }
        result
    }
}

/// Spawner for jobs that may borrow anything living for `'env`.
pub struct Scope<'env> {
    executor: &'env Executor,
    wait_group: Option<WaitGroup>,
    panic_slot: PanicSlot,
    _phantom: PhantomData<std::cell::Cell<&'env ()>>,
}

impl<'env> Scope<'env> {
    /// Queue `f` on the pool. It is done before the enclosing [`Executor::scope`] returns.
    pub fn spawn<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'env,
    {
        let wait_group = self.wait_group.clone();
        let panic_slot = self.panic_slot.clone();
        let job: Box<dyn FnOnce() + Send + 'env> = Box::new(move || {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
                panic_slot
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get_or_insert(payload);
            }
            drop(wait_group);
        });

        // SAFETY: dropping the scope blocks until every job has released its wait group handle,
        // and the scope can not outlive 'env, so the job never runs past its borrows.
        let job: Job = unsafe { std::mem::transmute(job) };
        if self.executor.sender.send(Message::Run(job)).is_err() {
            // Workers only stop when the executor is dropped, which 'env rules out.
            unreachable!("executor workers stopped while a scope was alive");
        }
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        if let Some(wait_group) = self.wait_group.take() {
            wait_group.wait();
        }
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        for _ in &self.workers {
            let _ = self.sender.send(Message::Stop);
        }

        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take()
                && handle.join().is_err()
            {
                log::error!("executor worker {} terminated abnormally", worker.id);
            }
        }
    }
}

impl Worker {
    fn start(id: usize, receiver: Receiver<Message>) -> Self {
        let handle = thread::Builder::new()
            .name(format!("strata-worker-{id}"))
            .spawn(move || {
                while let Ok(Message::Run(job)) = receiver.recv() {
                    job();
                }
            })
            .expect("failed to spawn executor worker thread");

        Worker {
            id,
            handle: Some(handle),
        }
    }
}
