use futures::future::{AbortHandle, Abortable};
use std::future::Future;
use tokio::task::JoinHandle;

/// Piece of work which can be cancelled
#[derive(Debug)]
pub struct Task {
    shutdown: AbortHandle,
    handle: JoinHandle<()>,
}

impl Task {
    /// Creates a new task and immediatly runs it in a `tokio::task`.
    pub fn spawn<F>(task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (shutdown, abort_registration) = AbortHandle::new_pair();
        let future = Abortable::new(task, abort_registration);
        let handle = tokio::task::spawn(async move {
            let _ = future.await;
        });

        Self { shutdown, handle }
    }

    /// Cancels the task and joins it.
    pub async fn cancel(self) {
        self.shutdown.abort();
        let _ = self.handle.await;
    }

    /// Joins the task, letting it run to completion.
    #[cfg(test)]
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}
