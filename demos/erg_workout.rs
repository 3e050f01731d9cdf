use fecontrol::{BleConfig, BleManager, Command, Response, Result, TrainerConnection};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// (target watts, minutes)
const INTERVALS: &[(f32, u64)] = &[(120.0, 5), (220.0, 3), (140.0, 2), (240.0, 3), (100.0, 5)];

async fn ride(trainer: &TrainerConnection) -> Result<()> {
    for (step, &(watts, minutes)) in INTERVALS.iter().enumerate() {
        info!("🎯 Interval {}: {watts} W for {minutes} min", step + 1);
        trainer.send_command(&Command::target_power(watts)).await?;
        sleep(Duration::from_secs(minutes * 60)).await;
    }

    // Leave the trainer freewheeling
    trainer.send_command(&Command::basic_resistance(0.0)).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    info!("🚴 FE-C ERG Workout Example");

    let config = BleConfig {
        scan_timeout_ms: 3000,
        ..BleConfig::default()
    };
    let manager = BleManager::new(config).await?;

    let trainers = manager.scan().await?;
    let Some(first) = trainers.first() else {
        error!("❌ No FE-C trainer in range");
        return Ok(());
    };
    let trainer = manager.connect(first).await?;
    info!("✅ Connected to: {}", first.name);

    let mut dispatcher = trainer.dispatcher();
    let mut responses = dispatcher.subscribe();

    tokio::spawn(async move {
        while let Some(response) = responses.recv().await {
            match response {
                Response::TrainerData {
                    instantaneous_power_w,
                    target_power_limits,
                    ..
                } => info!("⚡ {instantaneous_power_w} W ({target_power_limits:?})"),
                Response::CommandStatus { .. } => {
                    if let Some(result) = response.command_result() {
                        info!("📨 Last command: {result:?}");
                    }
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        result = trainer.run_notifications(&mut dispatcher) => {
            warn!("Trainer went away before the workout finished");
            result?;
        }
        result = ride(&trainer) => result?,
        _ = tokio::signal::ctrl_c() => info!("Workout aborted"),
    }

    let state = dispatcher.state();
    if let (Some(power), Some(cadence)) = (state.power_w, state.cadence_rpm) {
        info!("📈 Final reading: {power} W at {cadence} rpm");
    }

    trainer.disconnect().await?;
    info!("👋 Workout complete");
    Ok(())
}
