use async_trait::async_trait;
use btleplug::{
    api::{
        BDAddr, Central, Characteristic, Manager as _, Peripheral as _, ScanFilter,
        ValueNotification, WriteType,
    },
    platform::{Manager, Peripheral},
};
use futures::stream::{Stream, StreamExt};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::{sync::Mutex, time::timeout};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dispatcher::{DispatcherConfig, PageDispatcher},
    error::{FecError, Result},
    request::Command,
    FEC_READ_CHAR_UUID, FEC_SERVICE_UUID, FEC_WRITE_CHAR_UUID,
};

/// BLE connection parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BleConfig {
    /// FE-C service advertised by the trainer
    pub service: Uuid,
    /// Characteristic the trainer notifies frames on
    pub read_characteristic: Uuid,
    /// Characteristic control frames are written to
    pub write_characteristic: Uuid,
    /// How long to scan for trainers
    pub scan_timeout_ms: u64,
    /// Connection timeout
    pub connect_timeout_ms: u64,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            service: FEC_SERVICE_UUID,
            read_characteristic: FEC_READ_CHAR_UUID,
            write_characteristic: FEC_WRITE_CHAR_UUID,
            scan_timeout_ms: 5000,
            connect_timeout_ms: 10000,
        }
    }
}

/// Something that can carry FE-C frames to a trainer
#[async_trait]
pub trait FecTransport: Send + Sync {
    /// Write one complete frame
    async fn write_frame(&self, data: &[u8]) -> Result<()>;
}

/// Encode a command and write it to the transport
///
/// # Errors
///
/// Returns the range error of [`Command::encode`] without writing anything,
/// or whatever the transport reports.
pub async fn send_command<T>(transport: &T, command: &Command) -> Result<()>
where
    T: FecTransport + ?Sized,
{
    let packet = command.encode()?;
    debug!("Sending page {}: {}", packet.page(), packet.to_hex());
    transport.write_frame(packet.as_ref()).await
}

/// A trainer found while scanning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainerInfo {
    /// Advertised name
    pub name: String,
    /// Bluetooth address
    pub address: BDAddr,
    /// Signal strength at discovery time
    pub rssi: Option<i16>,
}

/// BLE manager for FE-C trainer discovery
pub struct BleManager {
    manager: Manager,
    config: BleConfig,
    peripherals: Arc<Mutex<HashMap<BDAddr, Peripheral>>>,
}

impl BleManager {
    /// Create a new BLE manager
    ///
    /// # Errors
    ///
    /// Returns [`FecError::Ble`] if the Bluetooth adapter cannot be initialized.
    pub async fn new(config: BleConfig) -> Result<Self> {
        let manager = Manager::new().await?;

        Ok(Self {
            manager,
            config,
            peripherals: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Connection parameters in use
    #[must_use]
    pub const fn config(&self) -> &BleConfig {
        &self.config
    }

    /// Scan for trainers advertising the FE-C service
    ///
    /// Results are ordered by signal strength, strongest first.
    ///
    /// # Errors
    ///
    /// Returns [`FecError::DeviceNotFound`] if no Bluetooth adapters are available,
    /// or [`FecError::Ble`] for other Bluetooth-related errors.
    pub async fn scan(&self) -> Result<Vec<TrainerInfo>> {
        info!("Starting scan for FE-C trainers...");

        let adapters = self.manager.adapters().await?;
        let central = adapters.first().ok_or(FecError::DeviceNotFound)?;

        let scan_filter = ScanFilter {
            services: vec![self.config.service],
        };

        central.start_scan(scan_filter).await?;
        tokio::time::sleep(Duration::from_millis(self.config.scan_timeout_ms)).await;
        central.stop_scan().await?;

        let mut trainers = Vec::new();
        for peripheral in central.peripherals().await? {
            let Ok(Some(properties)) = peripheral.properties().await else {
                continue;
            };
            // Some platforms ignore the scan filter
            if !properties.services.contains(&self.config.service) {
                continue;
            }

            let trainer = TrainerInfo {
                name: properties
                    .local_name
                    .unwrap_or_else(|| "Unknown trainer".to_string()),
                address: peripheral.address(),
                rssi: properties.rssi,
            };
            info!("Found trainer: {} ({})", trainer.name, trainer.address);

            self.peripherals
                .lock()
                .await
                .insert(trainer.address, peripheral);
            trainers.push(trainer);
        }

        trainers.sort_by(|a, b| b.rssi.cmp(&a.rssi));
        info!("Scan completed. Found {} trainer(s)", trainers.len());
        Ok(trainers)
    }

    /// Connect to a trainer returned by [`BleManager::scan`]
    ///
    /// # Errors
    ///
    /// Returns [`FecError::DeviceNotFound`] if the trainer was not part of a scan,
    /// [`FecError::Timeout`] if connection times out,
    /// [`FecError::ConnectionFailed`] if connection fails,
    /// or [`FecError::Protocol`] if the FE-C characteristics are missing.
    pub async fn connect(&self, trainer: &TrainerInfo) -> Result<TrainerConnection> {
        info!("Connecting to trainer: {}", trainer.name);

        let peripheral = self
            .peripherals
            .lock()
            .await
            .get(&trainer.address)
            .cloned()
            .ok_or(FecError::DeviceNotFound)?;

        let timeout_ms = self.config.connect_timeout_ms;
        timeout(Duration::from_millis(timeout_ms), peripheral.connect())
            .await
            .map_err(|_| FecError::Timeout { timeout_ms })?
            .map_err(|e| FecError::ConnectionFailed(e.to_string()))?;

        peripheral.discover_services().await?;

        let services = peripheral.services();
        let service = services
            .iter()
            .find(|s| s.uuid == self.config.service)
            .ok_or_else(|| FecError::Protocol("FE-C service not found".to_string()))?;

        let find = |uuid: Uuid, what: &str| {
            service
                .characteristics
                .iter()
                .find(|c| c.uuid == uuid)
                .cloned()
                .ok_or_else(|| FecError::Protocol(format!("{what} characteristic not found")))
        };
        let read_char = find(self.config.read_characteristic, "Read")?;
        let write_char = find(self.config.write_characteristic, "Write")?;

        peripheral.subscribe(&read_char).await?;

        info!("Successfully connected to {}", trainer.name);

        Ok(TrainerConnection {
            peripheral,
            read_char,
            write_char,
            config: self.config.clone(),
        })
    }

    /// Scan and connect to the strongest trainer in range
    ///
    /// # Errors
    ///
    /// Returns [`FecError::DeviceNotFound`] if no trainer was found, or any
    /// error of [`BleManager::connect`].
    pub async fn connect_first(&self) -> Result<TrainerConnection> {
        let trainers = self.scan().await?;
        let trainer = trainers.first().ok_or(FecError::DeviceNotFound)?;
        self.connect(trainer).await
    }
}

/// Active connection to an FE-C trainer
pub struct TrainerConnection {
    peripheral: Peripheral,
    read_char: Characteristic,
    write_char: Characteristic,
    config: BleConfig,
}

impl TrainerConnection {
    /// Encode and send a control command
    ///
    /// # Errors
    ///
    /// Returns a range error for invalid parameters, or
    /// [`FecError::Protocol`] if the write fails.
    pub async fn send_command(&self, command: &Command) -> Result<()> {
        send_command(self, command).await
    }

    /// A dispatcher listening on this connection's read characteristic
    #[must_use]
    pub fn dispatcher(&self) -> PageDispatcher {
        PageDispatcher::new(DispatcherConfig::from(&self.config))
    }

    /// Feed notifications into the dispatcher until the trainer disconnects
    ///
    /// # Errors
    ///
    /// Returns [`FecError::Ble`] if setting up notifications fails, and
    /// [`FecError::Disconnected`] once the notification stream ends.
    pub async fn run_notifications(&self, dispatcher: &mut PageDispatcher) -> Result<()> {
        let notification_stream = self.peripheral.notifications().await?;
        let result = forward_notifications(notification_stream, dispatcher).await;
        warn!("Notification stream from {} ended", self.peripheral.address());
        result
    }

    /// Check if the trainer is still connected
    pub async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    /// Disconnect from the trainer
    ///
    /// # Errors
    ///
    /// Returns [`FecError::Ble`] if disconnection fails.
    pub async fn disconnect(&self) -> Result<()> {
        self.peripheral.unsubscribe(&self.read_char).await?;
        self.peripheral.disconnect().await?;
        Ok(())
    }

    /// Trainer address
    #[must_use]
    pub fn address(&self) -> BDAddr {
        self.peripheral.address()
    }
}

/// Drain a notification stream into the dispatcher
///
/// The stream only ends when the peripheral goes away, so running out of
/// notifications is reported as [`FecError::Disconnected`].
async fn forward_notifications<S>(mut stream: S, dispatcher: &mut PageDispatcher) -> Result<()>
where
    S: Stream<Item = ValueNotification> + Unpin,
{
    while let Some(data) = stream.next().await {
        dispatcher.on_frame_received(data.uuid, &data.value, None);
    }

    Err(FecError::Disconnected)
}

#[async_trait]
impl FecTransport for TrainerConnection {
    async fn write_frame(&self, data: &[u8]) -> Result<()> {
        self.peripheral
            .write(&self.write_char, data, WriteType::WithResponse)
            .await
            .map_err(|e| FecError::Protocol(format!("Failed to send command: {e}")))
    }
}
