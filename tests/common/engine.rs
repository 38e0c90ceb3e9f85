//! Scripted protocol engine.
//!
//! Every engine the connector creates shares its log with the test through
//! an [`EngineHandle`], so tests can feed events in and inspect what the
//! client sent.

use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use slirc_client::{
    Command, ConnectRequest, Connector, EngineError, EngineEvent, EventKind, ProtocolEngine,
    ServerConfig,
};
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::future::poll_fn;
use std::rc::Rc;
use std::task::{Poll, Waker};

#[derive(Debug)]
pub struct EngineLog {
    pub server: ServerConfig,
    pub connects: Vec<ConnectRequest>,
    pub sent: Vec<Command>,
    pub inbound: VecDeque<EngineEvent>,
    pub dropped: bool,
    waker: Option<Waker>,
}

/// Test-side view of one engine.
#[derive(Clone, Debug)]
pub struct EngineHandle(Rc<RefCell<EngineLog>>);

#[allow(dead_code)]
impl EngineHandle {
    pub fn host(&self) -> String {
        self.0.borrow().server.host.clone()
    }

    pub fn server(&self) -> ServerConfig {
        self.0.borrow().server.clone()
    }

    /// Queue an event and wake anyone waiting on readiness.
    pub fn push(&self, event: EngineEvent) {
        let mut log = self.0.borrow_mut();
        log.inbound.push_back(event);
        if let Some(waker) = log.waker.take() {
            waker.wake();
        }
    }

    pub fn push_named(&self, kind: EventKind, origin: &str, params: &[&str]) {
        self.push(EngineEvent::named(kind, origin, params));
    }

    pub fn push_numeric(&self, code: u16, args: &[&str]) {
        self.push(EngineEvent::numeric("irc.example.net", code, args));
    }

    pub fn sent(&self) -> Vec<Command> {
        self.0.borrow().sent.clone()
    }

    pub fn take_sent(&self) -> Vec<Command> {
        std::mem::take(&mut self.0.borrow_mut().sent)
    }

    pub fn connects(&self) -> Vec<ConnectRequest> {
        self.0.borrow().connects.clone()
    }

    pub fn is_dropped(&self) -> bool {
        self.0.borrow().dropped
    }
}

struct MockEngine {
    log: Rc<RefCell<EngineLog>>,
}

impl ProtocolEngine for MockEngine {
    fn connect(&mut self, request: &ConnectRequest) -> Result<(), EngineError> {
        self.log.borrow_mut().connects.push(request.clone());
        Ok(())
    }

    fn send(&mut self, command: Command) -> Result<(), EngineError> {
        self.log.borrow_mut().sent.push(command);
        Ok(())
    }

    fn readiness(&self) -> LocalBoxFuture<'_, ()> {
        let log = self.log.clone();
        poll_fn(move |cx| {
            let mut log = log.borrow_mut();
            if log.inbound.is_empty() {
                log.waker = Some(cx.waker().clone());
                Poll::Pending
            } else {
                Poll::Ready(())
            }
        })
        .boxed_local()
    }

    fn process(&mut self, events: &mut Vec<EngineEvent>) {
        events.extend(self.log.borrow_mut().inbound.drain(..));
    }
}

impl Drop for MockEngine {
    fn drop(&mut self) {
        self.log.borrow_mut().dropped = true;
    }
}

#[derive(Default)]
struct Registry {
    engines: Vec<EngineHandle>,
    refused: HashSet<String>,
}

/// Shared record of every engine a [`MockConnector`] created.
#[derive(Clone, Default)]
pub struct MockServers(Rc<RefCell<Registry>>);

#[allow(dead_code)]
impl MockServers {
    pub fn connector(&self) -> MockConnector {
        MockConnector(self.clone())
    }

    /// Make the connector refuse `host`.
    pub fn refuse(&self, host: &str) {
        self.0.borrow_mut().refused.insert(host.to_string());
    }

    /// Let the connector accept `host` again.
    pub fn accept(&self, host: &str) {
        self.0.borrow_mut().refused.remove(host);
    }

    pub fn engines(&self) -> Vec<EngineHandle> {
        self.0.borrow().engines.clone()
    }

    pub fn count(&self) -> usize {
        self.0.borrow().engines.len()
    }

    /// Most recently created engine.
    pub fn last(&self) -> EngineHandle {
        self.0
            .borrow()
            .engines
            .last()
            .cloned()
            .expect("no engine was created")
    }

    pub fn hosts(&self) -> Vec<String> {
        self.engines().iter().map(EngineHandle::host).collect()
    }
}

pub struct MockConnector(MockServers);

impl Connector for MockConnector {
    fn create(&mut self, server: &ServerConfig) -> Result<Box<dyn ProtocolEngine>, EngineError> {
        let mut registry = self.0.0.borrow_mut();
        if registry.refused.contains(&server.host) {
            return Err(EngineError::Connect {
                server: server.to_string(),
                reason: "connection refused".to_string(),
            });
        }

        let log = Rc::new(RefCell::new(EngineLog {
            server: server.clone(),
            connects: Vec::new(),
            sent: Vec::new(),
            inbound: VecDeque::new(),
            dropped: false,
            waker: None,
        }));
        registry.engines.push(EngineHandle(log.clone()));
        Ok(Box::new(MockEngine { log }))
    }
}
