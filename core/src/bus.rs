//! Observer fan-out for engine events.

use crate::event::EngineEvent;
use std::{cell::RefCell, rc::Rc};

/// Anything that wants to hear about engine events.
pub trait EventSink {
    fn publish(&mut self, event: &EngineEvent);
}

/// Keeps every event it sees. The runner drains it after each command;
/// tests inspect it directly.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Rc<RefCell<Vec<EngineEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.borrow().clone()
    }

    pub fn drain(&self) -> Vec<EngineEvent> {
        self.events.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl EventSink for RecordingSink {
    fn publish(&mut self, event: &EngineEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Writes each event to the log at a level matching its priority.
#[derive(Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn publish(&mut self, event: &EngineEvent) {
        use crate::event::AlertPriority;
        match event.priority() {
            AlertPriority::High => log::warn!("{}: {event:?}", event.type_name()),
            AlertPriority::Normal => log::info!("{}: {event:?}", event.type_name()),
            AlertPriority::Low => log::debug!("{}: {event:?}", event.type_name()),
        }
    }
}

#[derive(Default)]
pub struct EventBus {
    sinks: Vec<Box<dyn EventSink>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    /// Deliver in subscription order.
    pub fn publish(&mut self, event: &EngineEvent) {
        for sink in &mut self.sinks {
            sink.publish(event);
        }
    }

    pub fn publish_all(&mut self, events: &[EngineEvent]) {
        for event in events {
            self.publish(event);
        }
    }
}
