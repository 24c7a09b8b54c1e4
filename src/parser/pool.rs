//! Worker pool for function-body validation
//!
//! The streaming parser is the single producer: it enqueues one job per
//! code entry, each carrying a shared frozen snapshot of the module. Any
//! number of workers drain the channel. The first validation failure wins
//! and cancels the rest; bodies in flight abort between instructions.

use super::module::ModuleContext;
use super::types::{FunctionType, ValueType};
use crate::debug_println;
use crate::error::{Result, ValidationError, WasmvetError};
use crate::validator::CodeValidator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

/// One function body awaiting validation
pub struct ValidationJob {
    pub func_index: u32,
    pub ty: FunctionType,
    pub locals: Vec<(u32, ValueType)>,
    pub body: Vec<u8>,
    pub ctx: Arc<ModuleContext>,
}

/// Shared cancellation flag. Cloning hands out another handle to the same
/// flag; setting it stops the pool at the next safe point.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn flag(&self) -> &AtomicBool {
        &self.0
    }
}

/// Validation workers draining a channel of body jobs
pub struct ValidationPool {
    sender: Option<Sender<ValidationJob>>,
    workers: Vec<JoinHandle<()>>,
    failure: Arc<Mutex<Option<WasmvetError>>>,
    cancel: CancelToken,
}

impl ValidationPool {
    /// Spawn `workers` validation threads (at least one)
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        let (sender, receiver) = channel::<ValidationJob>();
        let receiver = Arc::new(Mutex::new(receiver));
        let failure = Arc::new(Mutex::new(None));
        let cancel = CancelToken::new();

        debug_println!("spawning {} validation workers", workers);
        let handles = (0..workers)
            .map(|_| {
                let receiver = Arc::clone(&receiver);
                let failure = Arc::clone(&failure);
                let cancel = cancel.clone();
                thread::spawn(move || worker_loop(&receiver, &failure, &cancel))
            })
            .collect();

        ValidationPool {
            sender: Some(sender),
            workers: handles,
            failure,
            cancel,
        }
    }

    /// Pool sized to the machine, for embedders without an opinion
    pub fn with_default_workers() -> Self {
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(workers)
    }

    /// Handle the embedder can use to cancel validation
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Enqueue one function body. Jobs submitted after a failure are
    /// accepted and silently dropped by the cancelled workers.
    pub fn submit(&self, job: ValidationJob) {
        trace_submit(&job);
        if let Some(sender) = &self.sender {
            // A send error means every worker is gone; the failure slot
            // already holds the reason
            let _ = sender.send(job);
        }
    }

    /// Wait for all pending validations and report the verdict
    pub fn finish(&mut self) -> Result<()> {
        drop(self.sender.take());
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        let mut failure = self
            .failure
            .lock()
            .map_err(|_| WasmvetError::Validation(ValidationError::Cancelled))?;
        if let Some(err) = failure.take() {
            return Err(err);
        }
        if self.cancel.is_cancelled() {
            return Err(ValidationError::Cancelled.into());
        }
        Ok(())
    }
}

impl Drop for ValidationPool {
    fn drop(&mut self) {
        self.cancel.cancel();
        drop(self.sender.take());
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    receiver: &Mutex<Receiver<ValidationJob>>,
    failure: &Mutex<Option<WasmvetError>>,
    cancel: &CancelToken,
) {
    loop {
        let job = {
            let Ok(guard) = receiver.lock() else {
                return;
            };
            guard.recv()
        };
        let Ok(job) = job else {
            // Channel closed: parser is done submitting
            return;
        };
        if cancel.is_cancelled() {
            continue;
        }
        let func_index = job.func_index;
        let result = CodeValidator::with_cancel(&job.ctx, cancel.flag()).validate_function(
            &job.ty,
            &job.locals,
            job.body,
        );
        match result {
            Ok(()) => {}
            Err(WasmvetError::Validation(ValidationError::Cancelled)) => {}
            Err(err) => {
                debug_println!("function {} failed validation: {}", func_index, err);
                if let Ok(mut slot) = failure.lock() {
                    // First failure wins; everything after is discarded
                    if slot.is_none() {
                        *slot = Some(err);
                    }
                }
                cancel.cancel();
            }
        }
    }
}

fn trace_submit(job: &ValidationJob) {
    crate::trace_println!(
        "enqueueing function {} ({} body bytes)",
        job.func_index,
        job.body.len()
    );
}
