//! Fake collaborators driven by test code

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use htd_client::{
    AuthGate, AuthService, Collaborators, Endpoints, GateConfig, KeyValueStore, MachineRegistry,
    Renderer, RendererFactory, Socket, Transport,
};
use htd_core::error::{ConnectionError, DirectoryError, LoginError};
use htd_core::time::ManualClock;
use htd_core::{ConnectionId, Credential, Machine};
use htd_protocol::TerminalSize;
use reqwest::Url;

/// Something a fake socket or renderer did, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Open(ConnectionId, String),
    Send(ConnectionId, String),
    Close(ConnectionId),
    Create(usize),
    Fit(usize),
    Write(usize, String),
    Dispose(usize),
}

/// Shared, ordered log of everything the fakes saw
#[derive(Debug, Clone, Default)]
pub struct OpLog(Arc<Mutex<Vec<Op>>>);

impl OpLog {
    pub fn push(&self, op: Op) {
        self.0.lock().unwrap().push(op);
    }

    pub fn ops(&self) -> Vec<Op> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    pub fn opened(&self) -> Vec<ConnectionId> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::Open(id, _) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn sent(&self) -> Vec<(ConnectionId, serde_json::Value)> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::Send(id, text) => Some((id, serde_json::from_str(&text).unwrap())),
                _ => None,
            })
            .collect()
    }

    pub fn writes(&self) -> Vec<String> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::Write(_, data) => Some(data),
                _ => None,
            })
            .collect()
    }

    /// Sockets opened and not yet closed after replaying the log up to `upto`
    pub fn open_sockets_at(&self, upto: usize) -> usize {
        let mut open = 0usize;
        for op in self.ops().into_iter().take(upto) {
            match op {
                Op::Open(..) => open += 1,
                Op::Close(..) => open = open.saturating_sub(1),
                _ => {}
            }
        }
        open
    }
}

pub struct FakeTransport {
    pub log: OpLog,
    pub fail_next: Arc<Mutex<bool>>,
}

impl Transport for FakeTransport {
    fn open(&mut self, id: ConnectionId, url: &Url) -> Result<Box<dyn Socket>, ConnectionError> {
        if std::mem::take(&mut *self.fail_next.lock().unwrap()) {
            return Err(ConnectionError::OpenFailed("refused".into()));
        }
        self.log.push(Op::Open(id, url.to_string()));
        Ok(Box::new(FakeSocket {
            id,
            log: self.log.clone(),
            closed: false,
        }))
    }
}

struct FakeSocket {
    id: ConnectionId,
    log: OpLog,
    closed: bool,
}

impl Socket for FakeSocket {
    fn send(&mut self, text: String) -> Result<(), ConnectionError> {
        if self.closed {
            return Err(ConnectionError::Closed);
        }
        self.log.push(Op::Send(self.id, text));
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.log.push(Op::Close(self.id));
        }
    }
}

pub struct FakeRenderers {
    pub log: OpLog,
    pub size: Arc<Mutex<TerminalSize>>,
    created: usize,
}

impl RendererFactory for FakeRenderers {
    fn create(&mut self) -> Box<dyn Renderer> {
        self.created += 1;
        self.log.push(Op::Create(self.created));
        Box::new(FakeRenderer {
            n: self.created,
            log: self.log.clone(),
            viewport: self.size.clone(),
            size: TerminalSize::default(),
        })
    }
}

struct FakeRenderer {
    n: usize,
    log: OpLog,
    viewport: Arc<Mutex<TerminalSize>>,
    size: TerminalSize,
}

impl Renderer for FakeRenderer {
    fn write(&mut self, data: &str) {
        self.log.push(Op::Write(self.n, data.to_string()));
    }

    fn size(&self) -> TerminalSize {
        self.size
    }

    fn fit(&mut self) -> TerminalSize {
        self.size = *self.viewport.lock().unwrap();
        self.log.push(Op::Fit(self.n));
        self.size
    }

    fn dispose(&mut self) {
        self.log.push(Op::Dispose(self.n));
    }
}

#[derive(Default)]
pub struct FakeAuth {
    pub responses: Mutex<VecDeque<Result<Credential, LoginError>>>,
}

#[async_trait]
impl AuthService for FakeAuth {
    async fn login(&self, _username: &str, _password: &str) -> Result<Credential, LoginError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LoginError::Transport("no scripted response".into())))
    }
}

#[derive(Default)]
pub struct FakeRegistry {
    pub next: Mutex<Option<Result<Vec<Machine>, DirectoryError>>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeRegistry {
    pub fn respond(&self, result: Result<Vec<Machine>, DirectoryError>) {
        *self.next.lock().unwrap() = Some(result);
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl MachineRegistry for FakeRegistry {
    async fn list_machines(&self, token: &str) -> Result<Vec<Machine>, DirectoryError> {
        self.calls.lock().unwrap().push(token.to_string());
        self.next
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Key-value store whose contents stay visible to the test
#[derive(Clone, Default)]
pub struct SharedStore(pub Arc<Mutex<std::collections::BTreeMap<String, String>>>);

impl SharedStore {
    pub fn get_entry(&self, key: &str) -> Option<String> {
        self.0.lock().unwrap().get(key).cloned()
    }
}

impl KeyValueStore for SharedStore {
    fn get(&self, key: &str) -> Option<String> {
        self.get_entry(key)
    }

    fn set(&mut self, key: &str, value: &str) -> std::io::Result<()> {
        self.0.lock().unwrap().insert(key.into(), value.into());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> std::io::Result<()> {
        self.0.lock().unwrap().remove(key);
        Ok(())
    }
}

pub const NOW: i64 = 1_700_000_000;

pub fn machines() -> Vec<Machine> {
    vec![
        Machine::new("m1", "alpha", "10.0.0.1", "linux"),
        Machine::new("m2", "beta", "10.0.0.2", "darwin"),
    ]
}

pub fn endpoints() -> Endpoints {
    Endpoints::new("http://door.test").unwrap()
}

/// Transport and renderer fakes sharing one log
pub fn connection_fakes() -> (FakeTransport, FakeRenderers, OpLog, Arc<Mutex<TerminalSize>>) {
    let log = OpLog::default();
    let size = Arc::new(Mutex::new(TerminalSize::new(120, 40)));
    (
        FakeTransport {
            log: log.clone(),
            fail_next: Arc::new(Mutex::new(false)),
        },
        FakeRenderers {
            log: log.clone(),
            size: size.clone(),
            created: 0,
        },
        log,
        size,
    )
}

pub struct Harness {
    pub gate: AuthGate,
    pub rx: htd_client::EventReceiver,
    pub tx: htd_client::EventSender,
    pub log: OpLog,
    pub size: Arc<Mutex<TerminalSize>>,
    pub auth: Arc<FakeAuth>,
    pub registry: Arc<FakeRegistry>,
    pub store: SharedStore,
    pub clock: ManualClock,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(SharedStore::default())
    }

    pub fn with_store(store: SharedStore) -> Self {
        let (tx, rx) = htd_client::channel();
        let (transport, renderers, log, size) = connection_fakes();
        let auth = Arc::new(FakeAuth::default());
        let registry = Arc::new(FakeRegistry::default());
        registry.respond(Ok(machines()));
        let clock = ManualClock::new(NOW);

        let gate = AuthGate::new(
            GateConfig::new(endpoints()),
            Collaborators {
                auth: auth.clone(),
                registry: registry.clone(),
                transport: Box::new(transport),
                renderers: Box::new(renderers),
                store: Box::new(store.clone()),
                clock: Arc::new(clock.clone()),
            },
            tx.clone(),
        );

        Self {
            gate,
            rx,
            tx,
            log,
            size,
            auth,
            registry,
            store,
            clock,
        }
    }

    /// Let spawned tasks run, then apply every queued event
    pub async fn settle(&mut self) {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        while let Ok(event) = self.rx.try_recv() {
            self.gate.handle(event);
        }
    }

    pub async fn login_ok(&mut self, token: &str, expires_at: i64) {
        self.auth
            .responses
            .lock()
            .unwrap()
            .push_back(Ok(Credential::new(token, expires_at)));
        self.gate.login("ops", "pw").await.unwrap();
        self.settle().await;
    }
}
