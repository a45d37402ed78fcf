//! Shared fixtures for the in-crate tests

use crate::clock::{Clock, ManualClock};
use crate::enrich::Directory;
use crate::hub::NotificationHub;
use crate::registry::{RegisterToken, TokenRegistry};
use crate::store::NotificationStore;
use chrono::{DateTime, TimeZone, Utc};
use medpush_common::services::{
    BoxFuture, DeliveryError, DeliveryReport, PushGateway, PushMessage,
};
use medpush_common::models::PushToken;
use medpush_db::{
    DbClient, DbError, DirectoryRepository, NotificationRepository, PushTokenRepository,
    SqlDirectoryRepository, SqlNotificationRepository, SqlPushTokenRepository, TokenUpsert,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) type TestHub =
    NotificationHub<SqlPushTokenRepository, SqlNotificationRepository, SqlDirectoryRepository>;

pub(crate) fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// A gateway that records every call and fails on command.
#[derive(Default)]
pub(crate) struct RecordingGateway {
    pub singles: Mutex<Vec<(String, PushMessage)>>,
    pub batches: Mutex<Vec<Vec<String>>>,
    invalid: HashSet<String>,
    transient: HashSet<String>,
    /// Batch calls that succeed before the gateway goes away
    available_batches: Option<usize>,
    batch_calls: AtomicUsize,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(mut self, tokens: &[&str]) -> Self {
        self.invalid.extend(tokens.iter().map(|t| t.to_string()));
        self
    }

    pub fn flaky_for(mut self, tokens: &[&str]) -> Self {
        self.transient.extend(tokens.iter().map(|t| t.to_string()));
        self
    }

    pub fn unavailable() -> Self {
        Self::new().unavailable_after(0)
    }

    pub fn unavailable_after(mut self, batches: usize) -> Self {
        self.available_batches = Some(batches);
        self
    }

    pub fn single_tokens(&self) -> Vec<String> {
        self.singles
            .lock()
            .unwrap()
            .iter()
            .map(|(token, _)| token.clone())
            .collect()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(Vec::len).collect()
    }

    fn is_down(&self, calls_before: usize) -> bool {
        self.available_batches
            .is_some_and(|available| calls_before >= available)
    }
}

impl PushGateway for RecordingGateway {
    fn send_single<'a>(
        &'a self,
        token: &'a str,
        message: &'a PushMessage,
    ) -> BoxFuture<'a, (), DeliveryError> {
        Box::pin(async move {
            if self.is_down(0) {
                return Err(DeliveryError::Unavailable("gateway down".to_string()));
            }
            self.singles
                .lock()
                .unwrap()
                .push((token.to_string(), message.clone()));
            if self.invalid.contains(token) {
                return Err(DeliveryError::InvalidToken(token.to_string()));
            }
            Ok(())
        })
    }

    fn send_batch<'a>(
        &'a self,
        tokens: &'a [String],
        _message: &'a PushMessage,
    ) -> BoxFuture<'a, DeliveryReport, DeliveryError> {
        Box::pin(async move {
            let calls_before = self.batch_calls.fetch_add(1, Ordering::SeqCst);
            if self.is_down(calls_before) {
                return Err(DeliveryError::Unavailable("gateway down".to_string()));
            }
            self.batches.lock().unwrap().push(tokens.to_vec());

            let mut report = DeliveryReport::default();
            for token in tokens {
                if self.invalid.contains(token) {
                    report.failed_tokens.push(token.clone());
                } else if self.transient.contains(token) {
                    report.transient_failures += 1;
                } else {
                    report.sent_count += 1;
                }
            }
            Ok(report)
        })
    }
}

pub(crate) struct Fixture {
    pub clock: Arc<ManualClock>,
    pub gateway: Arc<RecordingGateway>,
    pub registry: Arc<TokenRegistry<SqlPushTokenRepository>>,
    pub notifications: SqlNotificationRepository,
    pub directory: SqlDirectoryRepository,
    pub hub: TestHub,
}

impl Fixture {
    /// Registers a token for a doctor, optionally bound to a device.
    pub async fn register(&self, doctor_id: i64, token: &str, device_id: Option<&str>) {
        let mut request = RegisterToken::new(token);
        request.device_id = device_id.map(str::to_string);
        self.registry.register(doctor_id, request).await.unwrap();
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

pub(crate) async fn fixture(gateway: RecordingGateway) -> Fixture {
    let db = DbClient::from_url("sqlite::memory:").await.unwrap();

    let tokens = SqlPushTokenRepository::new(db.clone());
    let notifications = SqlNotificationRepository::new(db.clone());
    let directory = SqlDirectoryRepository::new(db.clone());
    tokens.init_schema().await.unwrap();
    notifications.init_schema().await.unwrap();
    directory.init_schema().await.unwrap();

    let clock = Arc::new(ManualClock::new(noon()));
    let gateway = Arc::new(gateway);
    let registry = Arc::new(TokenRegistry::new(tokens, clock.clone(), 10));

    let hub = NotificationHub::new(
        registry.clone(),
        NotificationStore::new(notifications.clone(), clock.clone()),
        Directory::new(directory.clone()),
        gateway.clone(),
        clock.clone(),
    );

    Fixture {
        clock,
        gateway,
        registry,
        notifications,
        directory,
        hub,
    }
}

/// Token storage over an in-memory database with chosen operations broken.
pub(crate) struct BrokenTokenStore {
    inner: SqlPushTokenRepository,
    fail_purge: bool,
    fail_lookup: bool,
}

impl BrokenTokenStore {
    async fn with(fail_purge: bool, fail_lookup: bool) -> Self {
        let db = DbClient::from_url("sqlite::memory:").await.unwrap();
        let inner = SqlPushTokenRepository::new(db);
        inner.init_schema().await.unwrap();
        Self {
            inner,
            fail_purge,
            fail_lookup,
        }
    }

    pub async fn failing_purge() -> Self {
        Self::with(true, false).await
    }

    pub async fn failing_lookup() -> Self {
        Self::with(false, true).await
    }
}

fn locked() -> DbError {
    DbError::PoolError("database is locked".to_string())
}

impl PushTokenRepository for BrokenTokenStore {
    async fn init_schema(&self) -> Result<(), DbError> {
        self.inner.init_schema().await
    }

    async fn upsert(&self, upsert: TokenUpsert) -> Result<PushToken, DbError> {
        self.inner.upsert(upsert).await
    }

    async fn enforce_limit(&self, doctor_id: i64, max: u32) -> Result<u64, DbError> {
        self.inner.enforce_limit(doctor_id, max).await
    }

    async fn find_by_doctor(&self, doctor_id: i64) -> Result<Vec<PushToken>, DbError> {
        self.inner.find_by_doctor(doctor_id).await
    }

    async fn tokens_for(&self, doctor_ids: &[i64]) -> Result<Vec<String>, DbError> {
        if self.fail_lookup {
            return Err(locked());
        }
        self.inner.tokens_for(doctor_ids).await
    }

    async fn all_tokens(&self) -> Result<Vec<String>, DbError> {
        self.inner.all_tokens().await
    }

    async fn remove(
        &self,
        doctor_id: i64,
        token: Option<&str>,
        device_id: Option<&str>,
    ) -> Result<u64, DbError> {
        self.inner.remove(doctor_id, token, device_id).await
    }

    async fn purge_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        self.inner.purge_created_before(cutoff).await
    }

    async fn purge_tokens(&self, tokens: &[String]) -> Result<u64, DbError> {
        if self.fail_purge {
            return Err(locked());
        }
        self.inner.purge_tokens(tokens).await
    }
}
