use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::events::{EarningsRecordedEvent, EventHandler, EventProducer, Handler, TransactionRefundedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub earnings_recorded_producer: Vec<EventProducer<EarningsRecordedEvent>>,
    pub transaction_refunded_producer: Vec<EventProducer<TransactionRefundedEvent>>,
}

pub struct EventHandlers {
    pub on_earnings_recorded: Option<EventHandler<EarningsRecordedEvent>>,
    pub on_transaction_refunded: Option<EventHandler<TransactionRefundedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_earnings_recorded = hooks.on_earnings_recorded.map(|f| EventHandler::new(buffer_size, f));
        let on_transaction_refunded = hooks.on_transaction_refunded.map(|f| EventHandler::new(buffer_size, f));
        Self { on_earnings_recorded, on_transaction_refunded }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_earnings_recorded {
            result.earnings_recorded_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_transaction_refunded {
            result.transaction_refunded_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_earnings_recorded {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_transaction_refunded {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_earnings_recorded: Option<Handler<EarningsRecordedEvent>>,
    pub on_transaction_refunded: Option<Handler<TransactionRefundedEvent>>,
}

impl EventHooks {
    pub fn on_earnings_recorded<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(EarningsRecordedEvent) -> BoxFuture<'static, ()>) + Send + Sync + 'static {
        self.on_earnings_recorded = Some(Arc::new(f));
        self
    }

    pub fn on_transaction_refunded<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(TransactionRefundedEvent) -> BoxFuture<'static, ()>) + Send + Sync + 'static {
        self.on_transaction_refunded = Some(Arc::new(f));
        self
    }
}
