//! Continue Flow Demo
//!
//! Plays the continue-or-end scenarios against the scripted ad provider
//! and logs every flow event.

use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use continue_flow::{
    ads::{LoadScript, ScriptedAdProvider, ShowScript},
    platform::{RecordingAudio, RecordingEngine},
    FlowConfig, PlayerAction, RunOutcomeRouter, RunState, VERSION,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = FlowConfig::from_env();
    config.validate()?;

    info!("Continue Flow v{}", VERSION);
    info!(
        "Timeout: {}s, fail limit: {}, ads enabled: {}",
        config.timeout_seconds, config.fail_limit, config.ads_enabled
    );

    give_up_scenario(&config).await?;
    rewarded_continue_scenario(&config).await?;
    failed_load_scenario(&config).await?;
    timeout_scenario(&config).await?;
    fail_limit_scenario(&config).await?;

    info!("=== Demo complete ===");
    Ok(())
}

/// Router wired to recording collaborators, plus an event logger.
fn setup(
    config: &FlowConfig,
    provider: ScriptedAdProvider,
) -> Result<(RunOutcomeRouter<ScriptedAdProvider>, RecordingEngine, RecordingAudio)> {
    let audio = RecordingAudio::new();
    let router = RunOutcomeRouter::new(config.clone(), provider, Box::new(audio.clone()))?;

    let mut events = router.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match serde_json::to_string(&event.kind) {
                Ok(json) => info!("  event: {}", json),
                Err(e) => info!("  event: {:?} ({})", event.kind, e),
            }
        }
    });

    Ok((router, RecordingEngine::new(), audio))
}

/// Player input arriving after a delay.
fn press_after(delay: Duration, action: PlayerAction) -> mpsc::Receiver<PlayerAction> {
    let (tx, rx) = mpsc::channel(4);
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let _ = tx.send(action).await;
        // Hold input open so the offer does not read a closed channel
        tokio::time::sleep(Duration::from_secs(3600)).await;
    });
    rx
}

fn log_result(state: RunState, engine: &RecordingEngine, audio: &RecordingAudio) {
    info!("Result: {:?}", state);
    info!("Engine calls: {:?}", engine.calls());
    info!("Audio calls: {:?}", audio.calls());
}

async fn give_up_scenario(config: &FlowConfig) -> Result<()> {
    info!("=== Scenario 1: give up before timeout ===");
    let (mut router, mut engine, audio) = setup(config, ScriptedAdProvider::rewarding())?;

    engine.add_points(1200);
    let first = engine.fail();
    let mut actions = press_after(Duration::from_millis(1500), PlayerAction::GiveUp);

    let state = router.handle_failure(first, &mut engine, &mut actions).await;
    log_result(state, &engine, &audio);
    Ok(())
}

async fn rewarded_continue_scenario(config: &FlowConfig) -> Result<()> {
    info!("=== Scenario 2: continue with rewarded ad ===");
    let (mut router, mut engine, audio) = setup(config, ScriptedAdProvider::rewarding())?;

    engine.add_points(800);
    let failure = engine.fail();
    let mut actions = press_after(Duration::from_millis(700), PlayerAction::Continue);

    let state = router.handle_failure(failure, &mut engine, &mut actions).await;
    log_result(state, &engine, &audio);
    if let Some(report) = router.last_report() {
        info!("Offer {} took {:?} via {:?}", report.offer_id, report.elapsed, report.exit);
    }
    Ok(())
}

async fn failed_load_scenario(config: &FlowConfig) -> Result<()> {
    info!("=== Scenario 3: ad fails to load, continue anyway ===");
    let provider = ScriptedAdProvider::new(
        LoadScript::Fail {
            after: Duration::from_millis(200),
            message: "no fill".to_string(),
        },
        ShowScript::Complete {
            watch: Duration::from_secs(2),
        },
    );
    let (mut router, mut engine, audio) = setup(config, provider)?;

    engine.add_points(450);
    let failure = engine.fail();
    let mut actions = press_after(Duration::from_millis(800), PlayerAction::Continue);

    let state = router.handle_failure(failure, &mut engine, &mut actions).await;
    log_result(state, &engine, &audio);
    Ok(())
}

async fn timeout_scenario(config: &FlowConfig) -> Result<()> {
    info!("=== Scenario 4: no input, countdown expires ===");
    let (mut router, mut engine, audio) = setup(config, ScriptedAdProvider::rewarding())?;

    engine.add_points(300);
    let failure = engine.fail();
    let (_tx, mut actions) = mpsc::channel(4);

    let state = router.handle_failure(failure, &mut engine, &mut actions).await;
    log_result(state, &engine, &audio);
    Ok(())
}

async fn fail_limit_scenario(config: &FlowConfig) -> Result<()> {
    info!("=== Scenario 5: fail limit reached, offer bypassed ===");
    let (mut router, mut engine, audio) = setup(config, ScriptedAdProvider::rewarding())?;
    let (_tx, mut actions) = mpsc::channel(4);

    engine.add_points(2000);
    let mut state = RunState::Running;
    while state == RunState::Running {
        let failure = engine.fail();
        if failure.fail_count < config.fail_limit {
            // Skip the offer for earlier failures, the engine keeps counting
            continue;
        }
        state = router.handle_failure(failure, &mut engine, &mut actions).await;
    }
    log_result(state, &engine, &audio);

    router.restart(&mut engine);
    info!("After restart: {:?}, fail count {}", router.state(), engine.fail_count());
    Ok(())
}
