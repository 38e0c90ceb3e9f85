//! Listener that records every dispatched event.

use slirc_client::{IrcEvent, ListenerContext, NetworkListener};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, Default)]
pub struct Recorder(Rc<RefCell<Vec<IrcEvent>>>);

#[allow(dead_code)]
impl Recorder {
    pub fn events(&self) -> Vec<IrcEvent> {
        self.0.borrow().clone()
    }

    /// Event names in delivery order.
    pub fn names(&self) -> Vec<String> {
        self.0.borrow().iter().map(|e| e.name().to_string()).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.0.borrow().iter().filter(|e| e.name() == name).count()
    }

    pub fn find(&self, name: &str) -> Option<IrcEvent> {
        self.0.borrow().iter().find(|e| e.name() == name).cloned()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl NetworkListener for Recorder {
    fn on_event(&mut self, event: &IrcEvent, _ctx: &mut ListenerContext<'_>) {
        self.0.borrow_mut().push(event.clone());
    }
}
