// Serialized dispatch queue - the single lane into display state
//
// Background workers never touch the surface or shared caches directly;
// they submit a closure here. A single consumer task drains the queue, so
// handlers run one at a time, in submission order. Handlers must stay fast
// and non-blocking: anything slow belongs in the worker before submission.

use tokio::sync::mpsc;

type Handler = Box<dyn FnOnce() + Send + 'static>;

#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<Handler>,
}

impl Dispatcher {
    /// Spawn the consumer task on the current runtime. The task exits when
    /// the last `Dispatcher` clone is dropped.
    pub fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Handler>();
        tokio::spawn(async move {
            while let Some(handler) = rx.recv().await {
                handler();
            }
            log::debug!("[Dispatch] queue closed, consumer exiting");
        });
        Self { tx }
    }

    /// Queue a handler. Never blocks; submission from inside a running
    /// handler is allowed and runs after the current one completes.
    pub fn submit<F>(&self, handler: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.tx.send(Box::new(handler)).is_err() {
            log::warn!("[Dispatch] handler dropped, consumer already gone");
        }
    }
}
