#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use relay_clock::{DurationSecs, TestClock, UnixTime};
use relay_tokens::{
    error::{ConfigError, StoreError},
    store::{in_memory::StoredEntry, InMemoryCredentialStore},
    ApplicationConfig, ConfigProvider, CredentialStore, CredentialValue, CredentialValueRef,
    IssuerResponse, IssuerTransportError, RelayConfig, RelayServices, StoreKey, StoreKeyRef,
    UpstreamIssuer,
};

pub const PRIMARY_APP: &str = "app0";
pub const SECONDARY_APP: &str = "app1";

pub fn both_enabled() -> RelayConfig {
    RelayConfig {
        primary: Some(ApplicationConfig::enabled(PRIMARY_APP, "primary-secret")),
        secondary: Some(ApplicationConfig::enabled(SECONDARY_APP, "secondary-secret")),
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IssuerCall {
    AccessToken { app_id: String, force_refresh: bool },
    Ticket { access_token: String },
}

/// Replies with scripted responses, or a fresh `T<n>` when the script runs out
#[derive(Default)]
pub struct RecordingIssuer {
    script: Mutex<VecDeque<Result<IssuerResponse, String>>>,
    calls: Mutex<Vec<IssuerCall>>,
    panic_on_ticket: bool,
    latency: Option<Duration>,
}

impl RecordingIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn panicking_on_ticket() -> Self {
        Self {
            panic_on_ticket: true,
            ..Self::default()
        }
    }

    /// Takes `latency` of tokio time to answer each access token request
    pub fn slow(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn then_issue(self, value: &str, lifetime: u64) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(IssuerResponse::issued(value, DurationSecs(lifetime))));
        self
    }

    pub fn then_reject(self, code: i64, message: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(IssuerResponse::rejected(code, message)));
        self
    }

    pub fn then_fail(self, message: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(message.to_owned()));
        self
    }

    pub fn calls(&self) -> Vec<IssuerCall> {
        self.calls.lock().unwrap().clone()
    }

    fn respond(&self, call: IssuerCall) -> Result<IssuerResponse, IssuerTransportError> {
        let mut calls = self.calls.lock().unwrap();
        calls.push(call);
        let n = calls.len();
        drop(calls);

        match self.script.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(IssuerTransportError::new(message)),
            None => Ok(IssuerResponse::issued(format!("T{n}"), DurationSecs(7200))),
        }
    }
}

#[async_trait]
impl UpstreamIssuer for RecordingIssuer {
    async fn fetch_access_token(
        &self,
        application: &ApplicationConfig,
        force_refresh: bool,
    ) -> Result<IssuerResponse, IssuerTransportError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.respond(IssuerCall::AccessToken {
            app_id: application.app_id.as_str().to_owned(),
            force_refresh,
        })
    }

    async fn fetch_ticket(
        &self,
        access_token: &CredentialValueRef,
    ) -> Result<IssuerResponse, IssuerTransportError> {
        if self.panic_on_ticket {
            panic!("ticket endpoint exploded");
        }
        self.respond(IssuerCall::Ticket {
            access_token: access_token.as_str().to_owned(),
        })
    }
}

/// Wraps an in-memory store, counting every operation
pub struct CountingStore {
    inner: InMemoryCredentialStore<TestClock>,
    pub reads: AtomicUsize,
    pub ttls: AtomicUsize,
    pub writes: AtomicUsize,
    fail_reads: bool,
    fail_writes: bool,
}

impl CountingStore {
    pub fn new(clock: TestClock) -> Self {
        Self {
            inner: InMemoryCredentialStore::new().with_clock(clock),
            reads: AtomicUsize::new(0),
            ttls: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            fail_reads: false,
            fail_writes: false,
        }
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub async fn seed(&self, key: &str, value: &str, ttl: u64) {
        self.inner
            .write(
                StoreKeyRef::from_str(key),
                CredentialValueRef::from_str(value),
                DurationSecs(ttl),
            )
            .await
            .unwrap();
    }

    pub async fn snapshot(&self) -> HashMap<StoreKey, StoredEntry> {
        self.inner.snapshot().await
    }

    pub async fn entry(&self, key: &str) -> Option<(String, u64)> {
        self.inner
            .snapshot()
            .await
            .get(StoreKeyRef::from_str(key))
            .map(|e| (e.value.as_str().to_owned(), e.remaining.0))
    }

    pub fn operations(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
            + self.ttls.load(Ordering::SeqCst)
            + self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CredentialStore for CountingStore {
    async fn read(&self, key: &StoreKeyRef) -> Result<Option<CredentialValue>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads {
            return Err(StoreError::transport("connection reset"));
        }
        self.inner.read(key).await
    }

    async fn time_to_live(&self, key: &StoreKeyRef) -> Result<DurationSecs, StoreError> {
        self.ttls.fetch_add(1, Ordering::SeqCst);
        self.inner.time_to_live(key).await
    }

    async fn write(
        &self,
        key: &StoreKeyRef,
        value: &CredentialValueRef,
        ttl: DurationSecs,
    ) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(StoreError::transport("connection reset"));
        }
        self.inner.write(key, value, ttl).await
    }
}

/// Serves a configuration that tests can swap out, counting loads
pub struct SwappableConfig {
    config: Mutex<Option<RelayConfig>>,
    pub loads: AtomicUsize,
}

impl SwappableConfig {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config: Mutex::new(Some(config)),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            config: Mutex::new(None),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn set(&self, config: RelayConfig) {
        *self.config.lock().unwrap() = Some(config);
    }
}

#[async_trait]
impl ConfigProvider for SwappableConfig {
    async fn load(&self) -> Result<RelayConfig, ConfigError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.config
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ConfigError::Provider("configuration backend offline".into()))
    }
}

pub struct Harness {
    pub clock: TestClock,
    pub config: Arc<SwappableConfig>,
    pub store: Arc<CountingStore>,
    pub issuer: Arc<RecordingIssuer>,
    pub services: RelayServices,
}

impl Harness {
    pub fn new(config: RelayConfig, issuer: RecordingIssuer) -> Self {
        let clock = TestClock::new(UnixTime(1_700_000_000));
        let store = CountingStore::new(clock.clone());
        Self::with_parts(clock, SwappableConfig::new(config), store, issuer)
    }

    pub fn with_parts(
        clock: TestClock,
        config: SwappableConfig,
        store: CountingStore,
        issuer: RecordingIssuer,
    ) -> Self {
        let config = Arc::new(config);
        let store = Arc::new(store);
        let issuer = Arc::new(issuer);
        let services = RelayServices::builder()
            .config(config.clone())
            .store(store.clone())
            .issuer(issuer.clone())
            .build()
            .unwrap();

        Self {
            clock,
            config,
            store,
            issuer,
            services,
        }
    }
}
