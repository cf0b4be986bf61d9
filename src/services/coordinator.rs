//! Polling coordinator
//!
//! One [`PollingCoordinator`] exists per configured device. It owns the
//! refresh cadence, fetches the status document through the injected
//! [`LiquidCheckClient`], flattens it into a [`ReadingSnapshot`] and publishes
//! the result on a `watch` channel. Entities read the published state and
//! never fetch on their own.
//!
//! A failed refresh never replaces the last good snapshot; it only records
//! the failure so consumers can mark themselves stale.

use crate::client::LiquidCheckClient;
use crate::error::{ErrorCode, ErrorReporter, LiquidCheckError, Result};
use crate::services::device::DeviceIdentity;
use crate::services::snapshot::{MetricKey, ReadingSnapshot, ReadingValue};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Default refresh interval in seconds
pub const DEFAULT_SCAN_INTERVAL: u64 = 60;

/// Largest accepted refresh interval in seconds
pub const MAX_SCAN_INTERVAL: u64 = 3600;

/// Most recent failed refresh
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshFailure {
    /// Code of the underlying cause
    pub code: ErrorCode,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// State published after every refresh
#[derive(Debug, Clone, Default)]
pub struct CoordinatorState {
    /// Last successful snapshot
    pub snapshot: Option<Arc<ReadingSnapshot>>,
    /// Set by a failed refresh, cleared by the next success
    pub last_failure: Option<RefreshFailure>,
    pub last_success_at: Option<DateTime<Utc>>,
    /// Completed refreshes, successful or not
    pub refresh_count: u64,
    pub consecutive_failures: u32,
}

impl CoordinatorState {
    /// True if the most recent refresh succeeded
    pub fn last_update_success(&self) -> bool {
        self.refresh_count > 0 && self.last_failure.is_none()
    }

    /// Value of `key` in the last good snapshot
    pub fn read(&self, key: MetricKey) -> Option<ReadingValue> {
        self.snapshot
            .as_ref()
            .and_then(|snapshot| snapshot.get(key).cloned())
    }
}

/// Result of a refresh request that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// A new snapshot was stored
    Updated(Arc<ReadingSnapshot>),
    /// Another refresh was in flight, or the coordinator was shut down
    Skipped,
}

/// Periodic poller and cache for one device
pub struct PollingCoordinator {
    identity: DeviceIdentity,
    client: Arc<dyn LiquidCheckClient>,
    /// `None` when periodic refresh is disabled
    update_interval: Option<Duration>,
    state: watch::Sender<CoordinatorState>,
    refresh_lock: tokio::sync::Mutex<()>,
    task: Mutex<Option<JoinHandle<()>>>,
    shut_down: AtomicBool,
}

impl std::fmt::Debug for PollingCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingCoordinator")
            .field("identity", &self.identity)
            .field("update_interval", &self.update_interval)
            .field("running", &self.is_running())
            .finish()
    }
}

impl PollingCoordinator {
    /// Create an idle coordinator; no refresh has run and no timer is started
    pub fn new(
        identity: DeviceIdentity,
        client: Arc<dyn LiquidCheckClient>,
        scan_interval_secs: u64,
    ) -> Result<Arc<Self>> {
        if scan_interval_secs > MAX_SCAN_INTERVAL {
            return Err(LiquidCheckError::invalid_input(format!(
                "Scan interval must be between 0 and {MAX_SCAN_INTERVAL} seconds, got {scan_interval_secs}"
            )));
        }

        let update_interval =
            (scan_interval_secs > 0).then(|| Duration::from_secs(scan_interval_secs));
        let (state, _) = watch::channel(CoordinatorState::default());

        Ok(Arc::new(Self {
            identity,
            client,
            update_interval,
            state,
            refresh_lock: tokio::sync::Mutex::new(()),
            task: Mutex::new(None),
            shut_down: AtomicBool::new(false),
        }))
    }

    /// Create a coordinator, run the first refresh and start the timer
    ///
    /// Fails with the refresh error if the first refresh fails; no timer is
    /// started in that case.
    pub async fn setup(
        identity: DeviceIdentity,
        client: Arc<dyn LiquidCheckClient>,
        scan_interval_secs: u64,
    ) -> Result<Arc<Self>> {
        let coordinator = Self::new(identity, client, scan_interval_secs)?;
        coordinator.refresh().await?;
        coordinator.start();

        info!(
            device_id = %coordinator.identity.id,
            host = %coordinator.identity.host,
            interval = ?coordinator.update_interval,
            "Coordinator started"
        );
        Ok(coordinator)
    }

    /// Fetch, flatten and publish one snapshot
    ///
    /// Returns [`RefreshOutcome::Skipped`] without fetching when a refresh is
    /// already in flight. Every failure is returned as
    /// [`LiquidCheckError::RefreshFailed`] and the previous snapshot is kept.
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let Ok(_guard) = self.refresh_lock.try_lock() else {
            debug!(host = %self.identity.host, "Refresh already in flight, skipping");
            return Ok(RefreshOutcome::Skipped);
        };

        // The fetch runs in its own task so a panic surfaces as a JoinError
        let client = Arc::clone(&self.client);
        let fetched = tokio::spawn(async move { client.fetch_status().await }).await;

        if self.shut_down.load(Ordering::SeqCst) {
            debug!(host = %self.identity.host, "Coordinator shut down, discarding refresh result");
            return Ok(RefreshOutcome::Skipped);
        }

        let document = match fetched {
            Ok(Ok(document)) => document,
            Ok(Err(err)) => return Err(self.record_failure(err.into())),
            Err(join_err) => {
                return Err(self.record_failure(LiquidCheckError::internal(format!(
                    "Status fetch task failed: {join_err}"
                ))))
            }
        };

        let snapshot = Arc::new(ReadingSnapshot::from_status(&document));
        let mut recovered_after = 0;
        self.state.send_modify(|state| {
            recovered_after = state.consecutive_failures;
            state.snapshot = Some(Arc::clone(&snapshot));
            state.last_failure = None;
            state.last_success_at = Some(snapshot.fetched_at());
            state.refresh_count += 1;
            state.consecutive_failures = 0;
        });

        if recovered_after > 0 {
            info!(
                host = %self.identity.host,
                failures = recovered_after,
                "Device reachable again"
            );
        }
        debug!(
            host = %self.identity.host,
            metrics = snapshot.len(),
            "Refresh succeeded"
        );
        Ok(RefreshOutcome::Updated(snapshot))
    }

    fn record_failure(&self, cause: LiquidCheckError) -> LiquidCheckError {
        let failure = RefreshFailure {
            code: cause.to_error_code(),
            message: cause.message_with_causes(),
            at: Utc::now(),
        };
        let error = LiquidCheckError::refresh_failed(self.identity.host.clone(), cause);

        let mut consecutive = 0;
        self.state.send_modify(|state| {
            state.last_failure = Some(failure);
            state.refresh_count += 1;
            state.consecutive_failures += 1;
            consecutive = state.consecutive_failures;
        });

        if consecutive == 1 {
            let context = ErrorReporter::create_context(
                error.to_error_code(),
                "coordinator",
                "refresh",
            )
            .with_metadata("host", self.identity.host.clone())
            .with_metadata("device_id", self.identity.id.clone());
            ErrorReporter::log_error(&error, Some(context));
        } else {
            debug!(
                host = %self.identity.host,
                consecutive,
                error = %error,
                "Refresh still failing"
            );
        }
        error
    }

    /// Start the periodic timer
    ///
    /// Does nothing when the interval is 0 or the timer is already running.
    pub fn start(self: &Arc<Self>) {
        let Some(period) = self.update_interval else {
            debug!(host = %self.identity.host, "Periodic refresh disabled");
            return;
        };

        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        self.shut_down.store(false, Ordering::SeqCst);

        let coordinator: Weak<Self> = Arc::downgrade(self);
        *task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let Some(coordinator) = coordinator.upgrade() else {
                    break;
                };
                // Failures are recorded and logged by refresh itself
                let _ = coordinator.refresh().await;
            }
        }));
    }

    /// Cancel the timer without waiting for an in-flight fetch
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        if let Some(handle) = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
            info!(host = %self.identity.host, "Coordinator stopped");
        }
    }

    /// True while the periodic timer is active
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Receiver notified after every completed refresh
    pub fn subscribe(&self) -> watch::Receiver<CoordinatorState> {
        self.state.subscribe()
    }

    /// Copy of the current state
    pub fn state(&self) -> CoordinatorState {
        self.state.borrow().clone()
    }

    /// Value of `key` in the last good snapshot; `None` means unknown
    pub fn read(&self, key: MetricKey) -> Option<ReadingValue> {
        self.state.borrow().read(key)
    }

    pub fn snapshot(&self) -> Option<Arc<ReadingSnapshot>> {
        self.state.borrow().snapshot.clone()
    }

    pub fn last_update_success(&self) -> bool {
        self.state.borrow().last_update_success()
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn update_interval(&self) -> Option<Duration> {
        self.update_interval
    }
}

impl Drop for PollingCoordinator {
    fn drop(&mut self) {
        if let Some(handle) = self
            .task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockLiquidCheckClient, MockResponse};
    use serde_json::json;

    fn identity() -> DeviceIdentity {
        DeviceIdentity::new("test_entry_id", "192.168.1.100", "Cistern")
    }

    fn partial_document() -> serde_json::Value {
        json!({"payload": {"measure": {"level": 0.23, "content": 920, "percent": 8.4}}})
    }

    fn coordinator_with(
        client: MockLiquidCheckClient,
        interval: u64,
    ) -> (Arc<MockLiquidCheckClient>, Arc<PollingCoordinator>) {
        let client = Arc::new(client);
        let coordinator = PollingCoordinator::new(identity(), client.clone(), interval).unwrap();
        (client, coordinator)
    }

    #[tokio::test]
    async fn test_read_is_unknown_before_any_refresh() {
        let (client, coordinator) = coordinator_with(MockLiquidCheckClient::new("192.168.1.100"), 60);

        assert_eq!(coordinator.read(MetricKey::Level), None);
        assert!(!coordinator.last_update_success());
        assert!(!coordinator.is_running());
        assert_eq!(client.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_refresh_publishes_partial_snapshot() {
        let (_, coordinator) = coordinator_with(
            MockLiquidCheckClient::new("192.168.1.100")
                .with_responses([MockResponse::Document(partial_document())]),
            60,
        );

        let outcome = coordinator.refresh().await.unwrap();
        assert!(matches!(outcome, RefreshOutcome::Updated(ref s) if s.len() == 3));

        assert_eq!(coordinator.read(MetricKey::Level), Some(ReadingValue::Float(0.23)));
        assert_eq!(coordinator.read(MetricKey::Content), Some(ReadingValue::Integer(920)));
        assert_eq!(coordinator.read(MetricKey::Percent), Some(ReadingValue::Float(8.4)));
        assert_eq!(coordinator.read(MetricKey::Firmware), None);
        assert!(coordinator.last_update_success());
    }

    #[tokio::test]
    async fn test_first_refresh_failure_leaves_read_unknown() {
        let (_, coordinator) = coordinator_with(
            MockLiquidCheckClient::new("192.168.1.100").with_responses([MockResponse::HttpStatus(500)]),
            60,
        );

        let err = coordinator.refresh().await.unwrap_err();
        assert!(err.is_refresh_failure());
        assert_eq!(coordinator.read(MetricKey::Level), None);

        let state = coordinator.state();
        assert_eq!(state.refresh_count, 1);
        assert_eq!(
            state.last_failure.map(|f| f.code),
            Some(ErrorCode::DeviceRejected)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_setup_fails_and_starts_no_timer_when_first_refresh_fails() {
        let client = Arc::new(
            MockLiquidCheckClient::new("192.168.1.100").with_responses([MockResponse::Timeout]),
        );

        let result = PollingCoordinator::setup(identity(), client.clone(), 60).await;
        assert!(matches!(result, Err(LiquidCheckError::RefreshFailed { .. })));

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(client.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn test_setup_rejects_interval_above_maximum() {
        let client = Arc::new(MockLiquidCheckClient::new("192.168.1.100"));
        let result = PollingCoordinator::setup(identity(), client.clone(), 3601).await;

        assert!(matches!(result, Err(LiquidCheckError::InvalidInput(_))));
        assert_eq!(client.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn test_last_good_snapshot_survives_failures() {
        let (_, coordinator) = coordinator_with(
            MockLiquidCheckClient::new("192.168.1.100").with_responses([
                MockResponse::Document(partial_document()),
                MockResponse::HttpStatus(500),
                MockResponse::Timeout,
                MockResponse::Malformed,
            ]),
            60,
        );

        coordinator.refresh().await.unwrap();
        for _ in 0..3 {
            assert!(coordinator.refresh().await.is_err());
        }

        assert_eq!(coordinator.read(MetricKey::Level), Some(ReadingValue::Float(0.23)));
        assert!(!coordinator.last_update_success());

        let state = coordinator.state();
        assert_eq!(state.consecutive_failures, 3);
        assert_eq!(state.refresh_count, 4);
        assert_eq!(
            state.last_failure.map(|f| f.code),
            Some(ErrorCode::ParsingFailed)
        );
    }

    #[tokio::test]
    async fn test_success_after_failure_clears_failure() {
        let (_, coordinator) = coordinator_with(
            MockLiquidCheckClient::new("192.168.1.100").with_responses([
                MockResponse::HttpStatus(503),
                MockResponse::Document(partial_document()),
            ]),
            60,
        );

        assert!(coordinator.refresh().await.is_err());
        assert!(!coordinator.last_update_success());

        coordinator.refresh().await.unwrap();
        let state = coordinator.state();
        assert!(state.last_update_success());
        assert!(state.last_failure.is_none());
        assert_eq!(state.consecutive_failures, 0);
        assert!(state.last_success_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_refreshes_do_not_overlap() {
        let (client, coordinator) = coordinator_with(
            MockLiquidCheckClient::new("192.168.1.100")
                .with_responses([MockResponse::Document(partial_document())])
                .with_delay(Duration::from_secs(5)),
            60,
        );

        let (first, second) = tokio::join!(coordinator.refresh(), coordinator.refresh());

        assert!(matches!(first.unwrap(), RefreshOutcome::Updated(_)));
        assert_eq!(second.unwrap(), RefreshOutcome::Skipped);
        assert_eq!(client.fetch_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_refreshes_every_interval() {
        let client = Arc::new(MockLiquidCheckClient::new("192.168.1.100"));
        let coordinator = PollingCoordinator::setup(identity(), client.clone(), 60)
            .await
            .unwrap();
        assert!(coordinator.is_running());
        assert_eq!(client.fetch_calls(), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(client.fetch_calls(), 2);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(client.fetch_calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_keeps_running_through_failures() {
        let client = Arc::new(MockLiquidCheckClient::new("192.168.1.100").with_responses([
            MockResponse::Document(partial_document()),
            MockResponse::HttpStatus(500),
            MockResponse::HttpStatus(500),
            MockResponse::Document(partial_document()),
        ]));
        let coordinator = PollingCoordinator::setup(identity(), client.clone(), 10)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(client.fetch_calls(), 4);
        assert!(coordinator.is_running());
        assert!(coordinator.last_update_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_disables_timer() {
        let client = Arc::new(MockLiquidCheckClient::new("192.168.1.100"));
        let coordinator = PollingCoordinator::setup(identity(), client.clone(), 0)
            .await
            .unwrap();

        assert_eq!(coordinator.update_interval(), None);
        assert!(!coordinator.is_running());

        tokio::time::sleep(Duration::from_secs(3600)).await;
        assert_eq!(client.fetch_calls(), 1);

        // Manual refresh still works
        coordinator.refresh().await.unwrap();
        assert_eq!(client.fetch_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_timer() {
        let client = Arc::new(MockLiquidCheckClient::new("192.168.1.100"));
        let coordinator = PollingCoordinator::setup(identity(), client.clone(), 60)
            .await
            .unwrap();

        coordinator.shutdown();
        assert!(!coordinator.is_running());

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(client.fetch_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_coordinator_stops_timer() {
        let client = Arc::new(MockLiquidCheckClient::new("192.168.1.100"));
        let coordinator = PollingCoordinator::setup(identity(), client.clone(), 60)
            .await
            .unwrap();
        drop(coordinator);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(client.fetch_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_result_discarded_after_shutdown() {
        let (_, coordinator) = coordinator_with(
            MockLiquidCheckClient::new("192.168.1.100")
                .with_responses([MockResponse::Document(partial_document())])
                .with_delay(Duration::from_secs(5)),
            60,
        );

        let pending = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.refresh().await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        coordinator.shutdown();

        let outcome = pending.await.unwrap().unwrap();
        assert_eq!(outcome, RefreshOutcome::Skipped);
        assert_eq!(coordinator.read(MetricKey::Level), None);
        assert_eq!(coordinator.state().refresh_count, 0);
    }

    #[tokio::test]
    async fn test_subscribers_notified_after_failure() {
        let (_, coordinator) = coordinator_with(
            MockLiquidCheckClient::new("192.168.1.100").with_responses([MockResponse::HttpStatus(500)]),
            60,
        );
        let mut receiver = coordinator.subscribe();

        assert!(!receiver.has_changed().unwrap());
        let _ = coordinator.refresh().await;
        assert!(receiver.has_changed().unwrap());
        assert!(receiver.borrow_and_update().last_failure.is_some());
    }

    #[tokio::test]
    async fn test_panicking_fetch_becomes_refresh_failure() {
        let (_, coordinator) = coordinator_with(
            MockLiquidCheckClient::new("192.168.1.100").with_responses([MockResponse::Panic]),
            60,
        );

        let err = coordinator.refresh().await.unwrap_err();
        assert!(err.is_refresh_failure());
        assert_eq!(
            coordinator.state().last_failure.map(|f| f.code),
            Some(ErrorCode::InternalError)
        );

        // The lock is released; the next refresh runs
        let err = coordinator.refresh().await.unwrap_err();
        assert!(err.is_refresh_failure());
        assert_eq!(coordinator.state().refresh_count, 2);
    }
}
