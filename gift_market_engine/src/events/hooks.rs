use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, OrderChangedEvent, VerificationTaskEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_changed_producer: Vec<EventProducer<OrderChangedEvent>>,
    pub verification_task_producer: Vec<EventProducer<VerificationTaskEvent>>,
}

impl EventProducers {
    pub async fn publish_order_changed(&self, event: OrderChangedEvent) {
        for producer in &self.order_changed_producer {
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_verification_task(&self, event: VerificationTaskEvent) {
        for producer in &self.verification_task_producer {
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_changed: Option<EventHandler<OrderChangedEvent>>,
    pub on_verification_task: Option<EventHandler<VerificationTaskEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_changed = hooks.on_order_changed.map(|f| EventHandler::new(buffer_size, f));
        let on_verification_task = hooks.on_verification_task.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_changed, on_verification_task }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_changed {
            result.order_changed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_verification_task {
            result.verification_task_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns one task per configured hook. Each task ends once all of its producers have been dropped.
    pub fn start_handlers(self) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();
        if let Some(handler) = self.on_order_changed {
            handles.push(tokio::spawn(handler.start_handler()));
        }
        if let Some(handler) = self.on_verification_task {
            handles.push(tokio::spawn(handler.start_handler()));
        }
        handles
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_changed: Option<Handler<OrderChangedEvent>>,
    pub on_verification_task: Option<Handler<VerificationTaskEvent>>,
}

impl EventHooks {
    pub fn on_order_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderChangedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_changed = Some(Arc::new(f));
        self
    }

    pub fn on_verification_task<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(VerificationTaskEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_verification_task = Some(Arc::new(f));
        self
    }
}
