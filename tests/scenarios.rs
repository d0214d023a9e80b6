//! End-to-end continue-or-end scenarios, played on virtual time.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use continue_flow::ads::{LoadScript, ScriptedAdProvider, ShowScript};
use continue_flow::platform::{AudioCall, EngineCall, RecordingAudio, RecordingEngine};
use continue_flow::{
    AdError, AdLoadState, AdResolution, ExitPath, FlowConfig, FlowEvent, FlowEventKind, Outcome,
    PlayerAction, RunFailure, RunOutcomeRouter, RunState,
};

struct Harness {
    router: RunOutcomeRouter<ScriptedAdProvider>,
    engine: RecordingEngine,
    audio: RecordingAudio,
    events: broadcast::Receiver<FlowEvent>,
}

impl Harness {
    fn new(provider: ScriptedAdProvider) -> Self {
        Self::with_config(FlowConfig::default(), provider)
    }

    fn with_config(config: FlowConfig, provider: ScriptedAdProvider) -> Self {
        let audio = RecordingAudio::new();
        let router = RunOutcomeRouter::new(config, provider, Box::new(audio.clone()))
            .expect("valid config");
        let events = router.subscribe_events();
        Self {
            router,
            engine: RecordingEngine::new(),
            audio,
            events,
        }
    }

    async fn fail(
        &mut self,
        failure: RunFailure,
        actions: &mut mpsc::Receiver<PlayerAction>,
    ) -> RunState {
        self.router
            .handle_failure(failure, &mut self.engine, actions)
            .await
    }

    fn drain_events(&mut self) -> Vec<FlowEventKind> {
        let mut kinds = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            kinds.push(event.kind);
        }
        kinds
    }

    fn assert_offer_reset(&self) {
        let offer = self.router.offer();
        assert!(!offer.is_open());
        assert_eq!(offer.ads().state(), AdLoadState::Idle);
        assert!(!offer.countdown().expired);
    }
}

/// Input channel with one action sent after `delay`. Keep the sender alive.
fn press_after(
    delay: Duration,
    action: PlayerAction,
) -> (mpsc::Sender<PlayerAction>, mpsc::Receiver<PlayerAction>) {
    let (tx, rx) = mpsc::channel(4);
    let sender = tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = sender.send(action).await;
    });
    (tx, rx)
}

fn outcomes(kinds: &[FlowEventKind]) -> Vec<Outcome> {
    kinds
        .iter()
        .filter_map(|kind| match kind {
            FlowEventKind::OutcomeEmitted { outcome, .. } => Some(*outcome),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_scenario_give_up_before_timeout() {
    let mut h = Harness::new(ScriptedAdProvider::rewarding());
    h.engine.add_points(1200);
    let failure = h.engine.fail();
    assert_eq!(failure.fail_count, 1);

    let (_tx, mut rx) = press_after(Duration::from_secs(2), PlayerAction::GiveUp);
    let state = h.fail(failure, &mut rx).await;

    assert_eq!(state, RunState::GameOver { score: 1200 });
    assert_eq!(h.router.game_over().displayed_score(), Some(1200));
    assert_eq!(h.engine.calls(), &[EngineCall::EndRun]);
    assert_eq!(h.router.last_report().map(|r| &r.exit), Some(&ExitPath::GiveUp));
    assert_eq!(outcomes(&h.drain_events()), vec![Outcome::End]);
    h.assert_offer_reset();
}

#[tokio::test(start_paused = true)]
async fn test_scenario_rewarded_continue() {
    let mut h = Harness::new(ScriptedAdProvider::rewarding());
    h.engine.add_points(800);

    let (_tx, mut rx) = press_after(Duration::from_millis(600), PlayerAction::Continue);
    let state = h
        .fail(RunFailure { fail_count: 0, score: 800 }, &mut rx)
        .await;

    assert_eq!(state, RunState::Running);
    assert_eq!(h.engine.calls(), &[EngineCall::ResumeRun]);
    assert_eq!(h.engine.score(), 800);
    assert_eq!(h.audio.calls(), vec![AudioCall::Pause, AudioCall::Resume]);

    let report = h.router.last_report().cloned().unwrap();
    assert_eq!(report.exit, ExitPath::Continue { ad: AdResolution::Rewarded });

    let kinds = h.drain_events();
    assert!(kinds.contains(&FlowEventKind::AdStateChanged { state: AdLoadState::Loaded }));
    assert!(kinds.iter().any(|k| matches!(k, FlowEventKind::AdShown { .. })));
    assert!(kinds.contains(&FlowEventKind::RunResumed { score: 800 }));
    assert_eq!(outcomes(&kinds), vec![Outcome::Resume]);
    h.assert_offer_reset();
}

#[tokio::test(start_paused = true)]
async fn test_scenario_load_failure_resumes_without_ad() {
    let provider = ScriptedAdProvider::new(
        LoadScript::Fail {
            after: Duration::from_millis(100),
            message: "network down".to_string(),
        },
        ShowScript::Complete {
            watch: Duration::from_secs(2),
        },
    );
    let mut h = Harness::new(provider);

    let (_tx, mut rx) = press_after(Duration::from_millis(500), PlayerAction::Continue);
    let state = h
        .fail(RunFailure { fail_count: 0, score: 450 }, &mut rx)
        .await;

    assert_eq!(state, RunState::Running);
    let report = h.router.last_report().cloned().unwrap();
    assert_eq!(
        report.exit,
        ExitPath::Continue {
            ad: AdResolution::Skipped(AdError::LoadFailure("network down".to_string()))
        }
    );
    // Immediate: no ad time on top of the wait for input
    assert!(report.elapsed < Duration::from_millis(600));
    assert_eq!(h.router.offer().ads().provider().show_calls(), 0);
    assert!(h.audio.calls().is_empty());

    let kinds = h.drain_events();
    assert!(kinds.contains(&FlowEventKind::AdStateChanged { state: AdLoadState::Failed }));
    h.assert_offer_reset();
}

#[tokio::test(start_paused = true)]
async fn test_scenario_timeout_ends_run() {
    let mut h = Harness::new(ScriptedAdProvider::rewarding());
    let (_tx, mut rx) = mpsc::channel(4);

    let state = h
        .fail(RunFailure { fail_count: 0, score: 300 }, &mut rx)
        .await;

    assert_eq!(state, RunState::GameOver { score: 300 });
    let report = h.router.last_report().cloned().unwrap();
    assert_eq!(report.exit, ExitPath::Timeout);
    assert!(report.elapsed >= Duration::from_secs(5));
    assert!(report.elapsed <= Duration::from_secs(6));

    let kinds = h.drain_events();
    let expiries = kinds
        .iter()
        .filter(|k| **k == FlowEventKind::CountdownExpired)
        .count();
    assert_eq!(expiries, 1);
    assert!(kinds.contains(&FlowEventKind::GameOverOpened { score: 300, fail_count: 0 }));
    h.assert_offer_reset();
}

#[tokio::test(start_paused = true)]
async fn test_scenario_fail_limit_bypasses_offer() {
    let mut h = Harness::new(ScriptedAdProvider::rewarding());
    let (_tx, mut rx) = mpsc::channel(4);

    let state = h
        .fail(RunFailure { fail_count: 2, score: 2000 }, &mut rx)
        .await;

    assert_eq!(state, RunState::GameOver { score: 2000 });
    assert_eq!(h.router.offer().presentations(), 0);
    assert_eq!(h.router.offer().ads().provider().load_calls(), 0);
    assert!(h.router.last_report().is_none());

    let kinds = h.drain_events();
    assert_eq!(
        kinds,
        vec![FlowEventKind::GameOverOpened { score: 2000, fail_count: 2 }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_tap_during_ad_does_not_carry_to_next_failure() {
    let mut h = Harness::new(ScriptedAdProvider::rewarding());
    let (tx, mut rx) = press_after(Duration::from_millis(400), PlayerAction::Continue);
    let late = tx.clone();
    tokio::spawn(async move {
        // Second tap lands while the ad is on screen
        tokio::time::sleep(Duration::from_millis(900)).await;
        let _ = late.send(PlayerAction::GiveUp).await;
    });

    let state = h
        .fail(RunFailure { fail_count: 0, score: 70 }, &mut rx)
        .await;
    assert_eq!(state, RunState::Running);

    // Next failure gets no fresh input and must run its full countdown
    let state = h
        .fail(RunFailure { fail_count: 1, score: 90 }, &mut rx)
        .await;
    assert_eq!(state, RunState::GameOver { score: 90 });
    assert_eq!(h.router.last_report().map(|r| &r.exit), Some(&ExitPath::Timeout));
    drop(tx);
}

// ============================================================================
// Degraded platforms
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_unsupported_platform_still_continues() {
    let mut h = Harness::new(ScriptedAdProvider::unsupported());
    let (_tx, mut rx) = press_after(Duration::from_millis(300), PlayerAction::Continue);

    let state = h
        .fail(RunFailure { fail_count: 1, score: 10 }, &mut rx)
        .await;

    assert_eq!(state, RunState::Running);
    let report = h.router.last_report().cloned().unwrap();
    assert_eq!(
        report.exit,
        ExitPath::Continue {
            ad: AdResolution::Skipped(AdError::Unavailable)
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_ads_disabled_skip_load() {
    let config = FlowConfig {
        ads_enabled: false,
        ..FlowConfig::default()
    };
    let mut h = Harness::with_config(config, ScriptedAdProvider::rewarding());
    let (_tx, mut rx) = press_after(Duration::from_millis(300), PlayerAction::Continue);

    let state = h
        .fail(RunFailure { fail_count: 0, score: 10 }, &mut rx)
        .await;

    assert_eq!(state, RunState::Running);
    assert_eq!(h.router.offer().ads().provider().load_calls(), 0);
    assert!(h.audio.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_show_error_after_visible_balances_audio() {
    let provider = ScriptedAdProvider::new(
        LoadScript::Succeed {
            after: Duration::from_millis(50),
        },
        ShowScript::FailAfterShow {
            message: "renderer crashed".to_string(),
        },
    );
    let mut h = Harness::new(provider);
    let (_tx, mut rx) = press_after(Duration::from_millis(300), PlayerAction::Continue);

    let state = h
        .fail(RunFailure { fail_count: 0, score: 10 }, &mut rx)
        .await;

    assert_eq!(state, RunState::Running);
    assert_eq!(h.audio.calls(), vec![AudioCall::Pause, AudioCall::Resume]);
    h.assert_offer_reset();
}

// ============================================================================
// Full run
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_full_run_until_game_over_and_restart() {
    let mut h = Harness::new(ScriptedAdProvider::rewarding());
    h.engine.add_points(100);

    // First failure: continue through the ad
    let failure = h.engine.fail();
    let (_tx, mut rx) = press_after(Duration::from_millis(400), PlayerAction::Continue);
    assert_eq!(h.fail(failure, &mut rx).await, RunState::Running);

    // Score keeps growing, the second failure hits the limit
    h.engine.add_points(50);
    let failure = h.engine.fail();
    assert_eq!(failure.fail_count, 2);
    let state = h.fail(failure, &mut rx).await;
    assert_eq!(state, RunState::GameOver { score: 150 });
    assert_eq!(h.router.offer().presentations(), 1);

    // Late failures are ignored until restart
    let state = h
        .fail(RunFailure { fail_count: 0, score: 1 }, &mut rx)
        .await;
    assert_eq!(state, RunState::GameOver { score: 150 });

    assert!(h.router.restart(&mut h.engine));
    assert_eq!(h.engine.fail_count(), 0);
    assert_eq!(h.engine.score(), 0);
    assert!(!h.router.game_over().is_open());

    // Offer is reusable in the new run
    let failure = h.engine.fail();
    let (_tx, mut rx) = press_after(Duration::from_millis(100), PlayerAction::GiveUp);
    let state = h.fail(failure, &mut rx).await;
    assert_eq!(state, RunState::GameOver { score: 0 });
    assert_eq!(h.router.offer().presentations(), 2);
    assert_eq!(
        h.engine.calls(),
        &[EngineCall::ResumeRun, EngineCall::Restart, EngineCall::EndRun]
    );
}

#[tokio::test(start_paused = true)]
async fn test_exactly_one_outcome_per_presentation() {
    let actions = [
        Some(PlayerAction::Continue),
        Some(PlayerAction::GiveUp),
        None,
    ];

    for action in actions {
        let mut h = Harness::new(ScriptedAdProvider::rewarding());
        let (_tx, mut rx) = match action {
            Some(action) => press_after(Duration::from_millis(250), action),
            None => {
                let (tx, rx) = mpsc::channel(4);
                (tx, rx)
            }
        };

        h.fail(RunFailure { fail_count: 1, score: 5 }, &mut rx).await;

        let kinds = h.drain_events();
        assert_eq!(outcomes(&kinds).len(), 1, "action={:?}", action);
        assert_eq!(
            kinds.iter().filter(|k| **k == FlowEventKind::OfferClosed).count(),
            1
        );
        h.assert_offer_reset();
    }
}
