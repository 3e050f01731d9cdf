#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

//! # fecontrol
//!
//! A Rust library for commanding smart bike trainers with the ANT+ FE-C
//! (Fitness Equipment Control) protocol, carried over Bluetooth Low Energy
//! the way Tacx trainers expose it.
//!
//! The crate has three layers:
//!
//! - **Encoder** ([`request`]): typed control commands (basic resistance,
//!   target power, wind and track resistance, calibration, page requests)
//!   validated and packed into checksummed 13-byte frames
//! - **Decoder** ([`response`]): inbound frames turned into typed data pages,
//!   or `None` for anything malformed or unsupported
//! - **Page dispatcher** ([`dispatcher`]): filters notifications by
//!   characteristic, keeps a last-known [`TrainerState`] and fans decoded
//!   pages out to subscribers
//!
//! The encoder and decoder are pure and never touch the radio. [`ble`] wires
//! them to a trainer through `btleplug`.
//!
//! ## Frame layout
//!
//! ```text
//! [A4] [09] [msg id] [channel] [page] [data x7] [xor checksum]
//! ```
//!
//! Outbound control pages use message id `0x4F` (acknowledged data) on
//! channel 5 and fill unused bytes with `0xFF`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use fecontrol::{BleConfig, BleManager, Command, Response};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = BleManager::new(BleConfig::default()).await?;
//!     let trainer = manager.connect_first().await?;
//!
//!     let mut dispatcher = trainer.dispatcher();
//!     let mut responses = dispatcher.subscribe();
//!
//!     // ERG mode at 200 W
//!     trainer.send_command(&Command::target_power(200.0)).await?;
//!
//!     tokio::spawn(async move {
//!         while let Some(response) = responses.recv().await {
//!             if let Response::TrainerData { instantaneous_power_w, .. } = response {
//!                 println!("{instantaneous_power_w} W");
//!             }
//!         }
//!     });
//!
//!     // Runs until the trainer disconnects
//!     trainer.run_notifications(&mut dispatcher).await?;
//!     Ok(())
//! }
//! ```
//!
//! Without a trainer at hand the codec works on plain bytes:
//!
//! ```
//! use fecontrol::{Command, Response};
//!
//! let packet = Command::basic_resistance(50.0).encode().unwrap();
//! assert_eq!(packet.as_bytes()[4], 48);
//!
//! let decoded = Response::decode(packet.as_ref());
//! assert_eq!(decoded, Some(Response::BasicResistance { resistance_percent: 50.0 }));
//! ```

use uuid::Uuid;

/// Bluetooth Low Energy transport
pub mod ble;
/// Notification routing and last-known trainer state
pub mod dispatcher;
/// Error types and handling
pub mod error;
/// Frame layout, checksum and per-page field descriptors
pub mod protocol;
/// Outbound control commands
pub mod request;
/// Inbound data pages
pub mod response;
/// Bit sets and enumerations shared by requests and responses
pub mod types;

pub use ble::{send_command, BleConfig, BleManager, FecTransport, TrainerConnection, TrainerInfo};
pub use dispatcher::{DispatcherConfig, PageDispatcher, TrainerState};
pub use error::{FecError, Result};
pub use protocol::WirePacket;
pub use request::Command;
pub use response::Response;
pub use types::{
    CalibrationFeatures, CalibrationStatus, CommandResult, EquipmentType, FeCapabilities, FeState,
    GeneralCapabilities, HeartRateSource, SpeedCondition, TargetPowerLimits, TemperatureCondition,
    TrainerStatus,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tacx FE-C over BLE service UUID
///
/// Shares the Nordic UART base UUID with the `FEC1` short id.
pub const FEC_SERVICE_UUID: Uuid = Uuid::from_u128(0x6E40_FEC1_B5A3_F393_E0A9_E50E_24DC_CA9E);

/// Characteristic the trainer notifies FE-C data pages on
pub const FEC_READ_CHAR_UUID: Uuid = Uuid::from_u128(0x6E40_FEC2_B5A3_F393_E0A9_E50E_24DC_CA9E);

/// Characteristic control pages are written to
pub const FEC_WRITE_CHAR_UUID: Uuid = Uuid::from_u128(0x6E40_FEC3_B5A3_F393_E0A9_E50E_24DC_CA9E);
