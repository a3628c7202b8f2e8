//! A single-consumer FIFO of deferred work against shared render state.
//!
//! Handlers and background fetches never touch render state directly; they push tasks, and the
//! render loop runs everything queued once per frame with [TaskQueue::drain].

use crossbeam::channel::{self, Receiver, Sender};

use crate::Result;

pub type Task<C> = Box<dyn FnOnce(&mut C) -> Result<()> + Send>;

/// The consuming end. Not cloneable: exactly one owner drains it.
pub struct TaskQueue<C> {
    tx: Sender<Task<C>>,
    rx: Receiver<Task<C>>,
}

/// A producing end; cheap to clone and safe to send to other threads.
pub struct TaskSender<C> {
    tx: Sender<Task<C>>,
}

impl<C> Clone for TaskSender<C> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<C> std::fmt::Debug for TaskSender<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSender")
            .field("queued", &self.tx.len())
            .finish()
    }
}

impl<C> std::fmt::Debug for TaskQueue<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("queued", &self.rx.len())
            .finish()
    }
}

impl<C> TaskSender<C> {
    /// Append a task to the back of the queue.
    ///
    /// If the queue has been dropped, the task is discarded.
    pub fn push(&self, task: impl FnOnce(&mut C) -> Result<()> + Send + 'static) {
        if self.tx.send(Box::new(task)).is_err() {
            tracing::debug!("task queue closed; discarding task");
        }
    }
}

impl<C> Default for TaskQueue<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> TaskQueue<C> {
    pub fn new() -> Self {
        let (tx, rx) = channel::unbounded();
        Self { tx, rx }
    }

    pub fn sender(&self) -> TaskSender<C> {
        TaskSender {
            tx: self.tx.clone(),
        }
    }

    #[inline]
    pub fn push(&self, task: impl FnOnce(&mut C) -> Result<()> + Send + 'static) {
        // can't fail: `self` holds the receiver
        let _ = self.tx.send(Box::new(task));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Run queued tasks in order until none remain, including any pushed by the tasks
    /// themselves. Returns how many ran.
    ///
    /// A failing task is logged and dropped; later tasks still run.
    pub fn drain(&self, cx: &mut C) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            ran += 1;
            if let Err(e) = task(cx) {
                tracing::warn!(error = %e, "queued task failed");
            }
        }
        if ran > 0 {
            tracing::trace!(ran, "drained task queue");
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn fifo_with_reentrant_pushes() {
        let queue = TaskQueue::<Vec<u32>>::new();
        let sender = queue.sender();
        queue.push(move |log| {
            log.push(1);
            sender.push(|log| {
                log.push(3);
                Ok(())
            });
            Ok(())
        });
        queue.push(|log| {
            log.push(2);
            Err(Error::EmptyPointSet)
        });
        let mut log = Vec::new();
        assert_eq!(queue.drain(&mut log), 3);
        assert_eq!(log, vec![1, 2, 3]);
        assert!(queue.is_empty());
    }
}
