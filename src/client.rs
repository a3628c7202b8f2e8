use std::sync::Arc;

use crate::{
    context::{DrawItem, RenderContext},
    fetch::{Fetcher, FileFetcher},
    queue::{TaskQueue, TaskSender},
    resource::{HandlerRegistry, Message, ResourceHandler},
    state::SceneState,
    Result,
};

/// Owns the scene state, the handlers that mutate it, and the queue of deferred work.
///
/// Messages are applied with [handle](Self::handle) as they arrive; the deferred work they
/// produce runs at the start of the next [frame](Self::frame).
#[derive(Debug)]
pub struct Client {
    registry: HandlerRegistry,
    queue: TaskQueue<SceneState>,
    state: SceneState,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// A client that reads `file:` URIs from the local filesystem.
    pub fn new() -> Self {
        Self::with_fetcher(Arc::new(FileFetcher))
    }

    pub fn with_fetcher(fetcher: Arc<dyn Fetcher>) -> Self {
        let queue = TaskQueue::new();
        let state = SceneState::new(queue.sender(), fetcher);
        Self {
            registry: HandlerRegistry::with_defaults(),
            queue,
            state,
        }
    }

    /// Replace the handler for one resource kind.
    pub fn register_handler(&mut self, handler: impl ResourceHandler + 'static) {
        self.registry.register(handler);
    }

    /// Apply one lifecycle message. Errors are scoped to that message's resource.
    pub fn handle(&mut self, message: Message) -> Result<()> {
        let (kind, id) = (message.kind(), message.id());
        self.registry
            .dispatch(&mut self.state, message)
            .inspect_err(|e| tracing::warn!(%kind, %id, error = %e, "failed to handle message"))
    }

    /// Run all deferred work. Returns the number of tasks run.
    #[inline]
    pub fn drain(&mut self) -> usize {
        self.queue.drain(&mut self.state)
    }

    /// Run all deferred work, then list every patch to draw.
    pub fn frame(&mut self, cx: &RenderContext) -> Vec<DrawItem<'_>> {
        self.drain();
        let mut items: Vec<_> = self
            .state
            .scene
            .nodes()
            .flat_map(|(id, node)| {
                node.patches.iter().map(move |bundle| DrawItem {
                    entity: *id,
                    bundle,
                    model: node.global,
                    attention: cx.attention(id),
                })
            })
            .collect();
        items.sort_by_key(|item| (item.entity, item.bundle.patch));
        items
    }

    #[inline]
    pub fn state(&self) -> &SceneState {
        &self.state
    }

    #[inline]
    pub fn tasks(&self) -> TaskSender<SceneState> {
        self.queue.sender()
    }

    /// Whether no deferred work is waiting.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty()
    }
}
