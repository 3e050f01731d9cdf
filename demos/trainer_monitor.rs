use fecontrol::{BleConfig, BleManager, Command, FeState, Response, Result};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    info!("📊 FE-C Trainer Monitor Example");
    info!("Searching for FE-C trainers...");

    let manager = BleManager::new(BleConfig::default()).await?;
    let trainer = match manager.connect_first().await {
        Ok(trainer) => {
            info!("✅ Connected to: {}", trainer.address());
            trainer
        }
        Err(e) => {
            error!("❌ Failed to connect to trainer: {}", e);
            return Err(e);
        }
    };

    let mut dispatcher = trainer.dispatcher();
    let mut responses = dispatcher.subscribe();

    tokio::spawn(async move {
        while let Some(response) = responses.recv().await {
            match response {
                Response::GeneralFeData {
                    speed_kmh,
                    elapsed_s,
                    heart_rate_bpm,
                    fe_state,
                    ..
                } => {
                    println!(
                        "⏱  {elapsed_s:5.2}s  🚴 {speed_kmh:5.1} km/h  ❤️  {heart_rate_bpm:3} bpm  [{fe_state}]"
                    );
                    if fe_state == FeState::Finished {
                        println!("🏁 Trainer reports the session finished");
                    }
                }
                Response::TrainerData {
                    cadence_rpm,
                    instantaneous_power_w,
                    status,
                    ..
                } => {
                    println!("⚡ {instantaneous_power_w:4} W  🔄 {cadence_rpm:3} rpm");
                    if status.resistance_calibration_required() {
                        println!("⚠️  Resistance calibration required");
                    }
                }
                Response::ManufacturerId {
                    manufacturer,
                    model,
                    hardware_revision,
                } => {
                    println!("🏭 Manufacturer {manufacturer}, model {model}, hw rev {hardware_revision}");
                }
                Response::ProductInformation {
                    sw_revision_main,
                    sw_revision_supplemental,
                    serial_number,
                } => {
                    println!(
                        "📦 Serial {serial_number}, software {sw_revision_main}.{sw_revision_supplemental}"
                    );
                }
                other => println!("📄 Page {}: {other:?}", other.page()),
            }
        }
    });

    // Trainers answer page requests on the read characteristic
    if let Err(e) = trainer.send_command(&Command::request_page(48)).await {
        warn!("Page request failed: {}", e);
    }

    info!("🔍 Monitoring, press Ctrl+C to stop");

    let lost = tokio::select! {
        result = trainer.run_notifications(&mut dispatcher) => result.err(),
        _ = tokio::signal::ctrl_c() => {
            info!("Stopping monitor");
            None
        }
    };

    println!("\n📋 Last known state:\n{:#?}", dispatcher.state());

    if let Some(e) = lost {
        error!("❌ Trainer lost: {}", e);
        return Err(e);
    }

    trainer.disconnect().await?;
    info!("👋 Disconnected");
    Ok(())
}
