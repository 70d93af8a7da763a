//! Integration tests for the recovery engine, default chains, and failsafe

use async_trait::async_trait;
use medilink_core::{ConnectionConfig, MedilinkError, SessionConnection, TransportFactory, TransportHandle};
use medilink_recovery::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn collaborator_error(subsystem: &str, reason: &str) -> MedilinkError {
    MedilinkError::Collaborator {
        subsystem: subsystem.to_string(),
        reason: reason.to_string(),
    }
}

/// Scripted chain step recording its invocations
struct ScriptedAction {
    name: &'static str,
    succeed: bool,
    order: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl RecoveryAction for ScriptedAction {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn attempt(&self, _failure: &Failure) -> Result<(), MedilinkError> {
        self.order.lock().push(self.name);
        if self.succeed {
            Ok(())
        } else {
            Err(MedilinkError::Recovery {
                action: self.name.to_string(),
                reason: "scripted failure".to_string(),
            })
        }
    }
}

fn scripted(
    name: &'static str,
    succeed: bool,
    order: &Arc<Mutex<Vec<&'static str>>>,
) -> Arc<dyn RecoveryAction> {
    Arc::new(ScriptedAction {
        name,
        succeed,
        order: order.clone(),
    })
}

#[derive(Default)]
struct StubEngine {
    fail_initialize: bool,
    fail_recover: bool,
    source: Option<String>,
    initialize_calls: AtomicUsize,
}

#[async_trait]
impl MediaEngine for StubEngine {
    async fn initialize(&self) -> Result<(), MedilinkError> {
        self.initialize_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_initialize {
            Err(collaborator_error("media engine", "init failed"))
        } else {
            Ok(())
        }
    }

    async fn recover_from_error(&self) -> Result<(), MedilinkError> {
        if self.fail_recover {
            Err(collaborator_error("media engine", "recover failed"))
        } else {
            Ok(())
        }
    }

    async fn reload_source(&self, _url: &str) -> Result<(), MedilinkError> {
        Ok(())
    }

    fn source_url(&self) -> Option<String> {
        self.source.clone()
    }
}

#[derive(Default)]
struct StubThumbnails {
    fail_all: bool,
    clear_calls: AtomicUsize,
}

#[async_trait]
impl ThumbnailPipeline for StubThumbnails {
    async fn clear_cache(&self) -> Result<(), MedilinkError> {
        self.clear_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all {
            Err(collaborator_error("thumbnails", "cache locked"))
        } else {
            Ok(())
        }
    }

    async fn rebuild(&self) -> Result<(), MedilinkError> {
        if self.fail_all {
            Err(collaborator_error("thumbnails", "rebuild failed"))
        } else {
            Ok(())
        }
    }

    async fn enable_frame_extraction(&self) -> Result<(), MedilinkError> {
        if self.fail_all {
            Err(collaborator_error("thumbnails", "no frames"))
        } else {
            Ok(())
        }
    }

    async fn enable_placeholders(&self) -> Result<(), MedilinkError> {
        if self.fail_all {
            Err(collaborator_error("thumbnails", "placeholders missing"))
        } else {
            Ok(())
        }
    }

    fn cache_size(&self) -> usize {
        0
    }
}

#[derive(Default)]
struct StubBridge {
    posted: Mutex<Vec<String>>,
}

impl HostBridge for StubBridge {
    fn post_message(&self, payload: &str) {
        self.posted.lock().push(payload.to_string());
    }
}

/// Factory whose endpoint is never reachable
struct DeadFactory;

#[async_trait]
impl TransportFactory for DeadFactory {
    async fn connect(&self, _endpoint: &str) -> Result<TransportHandle, MedilinkError> {
        Err(MedilinkError::Transport {
            reason: "endpoint unreachable".to_string(),
        })
    }
}

struct TestHarness {
    deps: RecoveryDeps,
    stubs: StubHandles,
}

struct StubHandles {
    media_engine: Arc<StubEngine>,
    thumbnails: Arc<StubThumbnails>,
    bridge: Arc<StubBridge>,
}

fn harness(media_engine: StubEngine, thumbnails: StubThumbnails) -> TestHarness {
    let media_engine = Arc::new(media_engine);
    let thumbnails = Arc::new(thumbnails);
    let bridge = Arc::new(StubBridge::default());
    let (connection, _events) =
        SessionConnection::new(ConnectionConfig::default(), Arc::new(DeadFactory));
    let deps = RecoveryDeps {
        connection: Arc::new(connection),
        media_engine: media_engine.clone(),
        thumbnails: thumbnails.clone(),
        bridge: bridge.clone(),
        flags: Arc::new(FeatureFlagStore::default()),
        network_retry_delay: Duration::from_millis(50),
    };
    TestHarness {
        deps,
        stubs: StubHandles {
            media_engine,
            thumbnails,
            bridge,
        },
    }
}

fn engine_with_default_chains(deps: &RecoveryDeps) -> (RecoveryEngine, RecoveryEventStream) {
    let (mut engine, events) = RecoveryEngine::new(deps.flags.clone(), 50);
    for (category, actions) in default_chains(deps) {
        engine.register_chain(category, actions);
    }
    (engine, events)
}

#[tokio::test]
async fn chain_stops_at_first_success() {
    let flags = Arc::new(FeatureFlagStore::default());
    let (mut engine, mut events) = RecoveryEngine::new(flags, 50);
    let order = Arc::new(Mutex::new(Vec::new()));
    engine.register_chain(
        ErrorCategory::ConnectionFailed,
        vec![
            scripted("first", false, &order),
            scripted("second", true, &order),
            scripted("third", true, &order),
        ],
    );

    let recovered = engine
        .handle(Failure::new("websocket dropped"))
        .await;

    assert!(recovered);
    assert_eq!(*order.lock(), vec!["first", "second"]);
    match events.try_next().expect("recovered notice") {
        RecoveryEvent::Recovered { category, action } => {
            assert_eq!(category, ErrorCategory::ConnectionFailed);
            assert_eq!(action, "second");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn exhausted_chain_activates_failsafe_exactly_once() {
    let flags = Arc::new(FeatureFlagStore::default());
    let (mut engine, mut events) = RecoveryEngine::new(flags.clone(), 50);
    let order = Arc::new(Mutex::new(Vec::new()));
    engine.register_chain(
        ErrorCategory::ConnectionFailed,
        vec![
            scripted("first", false, &order),
            scripted("second", false, &order),
        ],
    );

    let recovered = engine.handle(Failure::new("websocket dropped")).await;

    assert!(!recovered);
    assert_eq!(*order.lock(), vec!["first", "second"]);
    assert!(!flags.snapshot().realtime_updates);
    match events.try_next().expect("degraded notice") {
        RecoveryEvent::DegradedMode { category } => {
            assert_eq!(category, ErrorCategory::ConnectionFailed)
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(events.try_next().is_none(), "failsafe must fire exactly once");
}

#[tokio::test]
async fn unknown_category_goes_straight_to_failsafe() {
    let flags = Arc::new(FeatureFlagStore::default());
    let (engine, mut events) = RecoveryEngine::new(flags.clone(), 50);

    let recovered = engine.handle(Failure::new("something odd happened")).await;

    assert!(!recovered);
    match events.try_next().expect("degraded notice") {
        RecoveryEvent::DegradedMode { category } => assert_eq!(category, ErrorCategory::Unknown),
        other => panic!("unexpected event {other:?}"),
    }
    // Nothing attributable: the flags stay as they were.
    assert_eq!(flags.snapshot(), FeatureFlags::default());
}

#[tokio::test]
async fn every_invocation_lands_in_history() {
    let flags = Arc::new(FeatureFlagStore::default());
    let (mut engine, _events) = RecoveryEngine::new(flags, 50);
    let order = Arc::new(Mutex::new(Vec::new()));
    engine.register_chain(
        ErrorCategory::NetworkError,
        vec![
            scripted("first", false, &order),
            scripted("second", false, &order),
            scripted("third", true, &order),
        ],
    );

    engine.handle(Failure::new("network glitch")).await;

    let history = engine.history();
    assert_eq!(history.len(), 4);
    // Most recent first.
    assert_eq!(history[0].outcome, RecordOutcome::ActionSucceeded);
    assert_eq!(history[0].action.as_deref(), Some("third"));
    assert_eq!(history[1].outcome, RecordOutcome::ActionFailed);
    assert_eq!(history[2].outcome, RecordOutcome::ActionFailed);
    assert_eq!(history[3].outcome, RecordOutcome::Classified);
    assert!(history.iter().all(|r| r.category == ErrorCategory::NetworkError));
}

#[tokio::test]
async fn default_chains_map_every_category_with_three_steps() {
    let harness = harness(StubEngine::default(), StubThumbnails::default());
    let chains = default_chains(&harness.deps);

    assert_eq!(chains.len(), 5);
    for (category, actions) in &chains {
        assert_ne!(*category, ErrorCategory::Unknown);
        assert_eq!(actions.len(), 3, "category {category} should have 3 steps");
    }
}

#[tokio::test]
async fn engine_failure_degrades_to_legacy_mode() {
    let harness = harness(
        StubEngine {
            fail_initialize: true,
            ..StubEngine::default()
        },
        StubThumbnails::default(),
    );
    let (engine, mut events) = engine_with_default_chains(&harness.deps);

    let recovered = engine
        .handle(Failure::new("streaming engine init failed"))
        .await;

    assert!(recovered);
    assert_eq!(harness.stubs.media_engine.initialize_calls.load(Ordering::SeqCst), 1);
    let flags = harness.deps.flags.snapshot();
    assert!(!flags.media_engine);
    assert!(flags.legacy_mode);
    match events.try_next().expect("recovered notice") {
        RecoveryEvent::Recovered { action, .. } => assert_eq!(action, "legacy-engine-mode"),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn connection_failure_falls_back_to_polling() {
    let harness = harness(StubEngine::default(), StubThumbnails::default());
    let (engine, mut events) = engine_with_default_chains(&harness.deps);

    // No session was ever connected, so the retry step fails and the chain
    // moves on to the host-side polling fallback.
    let recovered = engine
        .handle(Failure::new("WebSocket closed unexpectedly"))
        .await;

    assert!(recovered);
    let posted = harness.stubs.bridge.posted.lock().clone();
    assert_eq!(posted.len(), 1);
    assert!(posted[0].contains("StartPollingFallback"));
    match events.try_next().expect("recovered notice") {
        RecoveryEvent::Recovered { action, .. } => assert_eq!(action, "polling-fallback"),
        other => panic!("unexpected event {other:?}"),
    }
    // Realtime stays enabled: the disable step never ran.
    assert!(harness.deps.flags.snapshot().realtime_updates);
}

#[tokio::test]
async fn thumbnail_collapse_exhausts_chain_and_disables_unified() {
    let harness = harness(
        StubEngine::default(),
        StubThumbnails {
            fail_all: true,
            ..StubThumbnails::default()
        },
    );
    let (engine, mut events) = engine_with_default_chains(&harness.deps);

    let recovered = engine
        .handle(Failure::new("thumbnail render worker crashed"))
        .await;

    assert!(!recovered);
    assert_eq!(harness.stubs.thumbnails.clear_calls.load(Ordering::SeqCst), 1);
    assert!(!harness.deps.flags.snapshot().unified_thumbnails);
    match events.try_next().expect("degraded notice") {
        RecoveryEvent::DegradedMode { category } => {
            assert_eq!(category, ErrorCategory::ThumbnailFailed)
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn playback_failure_without_source_reaches_basic_player() {
    let harness = harness(
        StubEngine {
            fail_recover: true,
            source: None,
            ..StubEngine::default()
        },
        StubThumbnails::default(),
    );
    let (engine, mut events) = engine_with_default_chains(&harness.deps);

    let recovered = engine.handle(Failure::new("video playback stalled")).await;

    assert!(recovered);
    let flags = harness.deps.flags.snapshot();
    assert!(flags.basic_player);
    assert!(!flags.media_engine);
    match events.try_next().expect("recovered notice") {
        RecoveryEvent::Recovered { action, .. } => assert_eq!(action, "basic-player-fallback"),
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn network_failure_waits_then_goes_offline() {
    let harness = harness(StubEngine::default(), StubThumbnails::default());
    let (engine, mut events) = engine_with_default_chains(&harness.deps);

    // The wait-and-retry step sleeps, finds no session to reconnect, and
    // fails; offline mode is the second step.
    let recovered = engine.handle(Failure::new("fetch aborted: offline")).await;

    assert!(recovered);
    assert!(harness.deps.flags.snapshot().offline_mode);
    match events.try_next().expect("recovered notice") {
        RecoveryEvent::Recovered { action, .. } => assert_eq!(action, "enable-offline-mode"),
        other => panic!("unexpected event {other:?}"),
    }
}
