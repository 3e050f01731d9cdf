use serde::Serialize;
use std::error::Error;
use tokio::sync::mpsc;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::{
    ble::BleConfig,
    protocol,
    response::Response,
    types::{
        CalibrationStatus, CommandResult, EquipmentType, FeCapabilities, FeState,
        GeneralCapabilities, SpeedCondition, TargetPowerLimits, TemperatureCondition,
        TrainerStatus,
    },
    FEC_READ_CHAR_UUID,
};

/// Dispatcher configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Characteristic the trainer notifies FE-C frames on
    pub read_characteristic: Uuid,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            read_characteristic: FEC_READ_CHAR_UUID,
        }
    }
}

impl From<&BleConfig> for DispatcherConfig {
    fn from(config: &BleConfig) -> Self {
        Self {
            read_characteristic: config.read_characteristic,
        }
    }
}

/// Last known trainer properties
///
/// Every field starts out `None` and is overwritten by the most recent page
/// that carries it. Fields are never cleared.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainerState {
    /// Most recently decoded page number
    pub last_page: Option<u8>,

    /// Temperature in degC reported with the last calibration result
    pub calibration_temperature_c: Option<f32>,
    /// Whether the last calibration result included a zero offset
    pub zero_offset_calibrated: Option<bool>,
    /// Whether the last calibration result included a spin down time
    pub spindown_calibrated: Option<bool>,
    /// Most recent zero offset, possibly from an earlier calibration
    pub zero_offset: Option<u16>,
    /// Most recent spin down time in ms, possibly from an earlier calibration
    pub spindown_ms: Option<u16>,
    /// Temperature in degC while a calibration is in progress
    pub current_temperature_c: Option<f32>,
    /// Zero offset calibration progress
    pub zero_offset_status: Option<CalibrationStatus>,
    /// Spin down calibration progress
    pub spindown_status: Option<CalibrationStatus>,
    /// Speed condition during calibration
    pub speed_condition: Option<SpeedCondition>,
    /// Temperature condition during calibration
    pub temperature_condition: Option<TemperatureCondition>,
    /// Speed to reach for calibration, in km/h
    pub target_speed_kmh: Option<f32>,
    /// Target spin down time in ms
    pub target_spindown_ms: Option<u16>,

    /// Equipment type
    pub equipment_type: Option<EquipmentType>,
    /// Elapsed time in seconds
    pub elapsed_s: Option<f32>,
    /// Distance travelled in metres
    pub distance_m: Option<u8>,
    /// Speed in km/h
    pub speed_kmh: Option<f32>,
    /// Heart rate in bpm
    pub heart_rate_bpm: Option<u8>,
    /// General FE capabilities
    pub general_capabilities: Option<GeneralCapabilities>,
    /// FE state
    pub fe_state: Option<FeState>,
    /// Lap toggle bit
    pub lap_toggle: Option<bool>,

    /// Cycle length in metres
    pub cycle_length_m: Option<f32>,
    /// Incline in percent
    pub incline_percent: Option<f32>,
    /// Resistance level in percent
    pub resistance_level_percent: Option<f32>,

    /// Cadence in rpm
    pub cadence_rpm: Option<u8>,
    /// Instantaneous power in watts
    pub power_w: Option<u16>,
    /// Accumulated power in watts
    pub accumulated_power_w: Option<u16>,
    /// Update event count of page 25 or 26
    pub update_event_count: Option<u8>,
    /// Trainer status flags
    pub trainer_status: Option<TrainerStatus>,
    /// Target power limit flags
    pub target_power_limits: Option<TargetPowerLimits>,
    /// Wheel revolutions
    pub wheel_revolutions: Option<u8>,
    /// Accumulated wheel period in seconds
    pub wheel_period_s: Option<f32>,
    /// Accumulated torque in Nm
    pub torque_nm: Option<f32>,

    /// Basic resistance target in percent
    pub target_resistance_percent: Option<f32>,
    /// Target power in watts
    pub target_power_w: Option<f32>,
    /// Wind resistance coefficient in kg/m
    pub wind_coefficient: Option<f32>,
    /// Wind speed in km/h
    pub wind_speed_kmh: Option<i16>,
    /// Drafting factor
    pub drafting_factor: Option<f32>,
    /// Grade in percent
    pub grade_percent: Option<f32>,
    /// Rolling resistance coefficient
    pub rolling_resistance: Option<f32>,

    /// Maximum resistance in newtons
    pub max_resistance_n: Option<u16>,
    /// Supported control modes
    pub fe_capabilities: Option<FeCapabilities>,

    /// User weight in kg
    pub user_weight_kg: Option<f32>,
    /// Bicycle weight in kg
    pub bicycle_weight_kg: Option<f32>,
    /// Wheel diameter offset in mm
    pub wheel_diameter_offset_mm: Option<u8>,
    /// Wheel diameter in metres
    pub wheel_diameter_m: Option<f32>,
    /// Gear ratio
    pub gear_ratio: Option<f32>,

    /// Page last requested through page 70
    pub requested_page: Option<u8>,
    /// Id of the last command the trainer received
    pub last_command_id: Option<u8>,
    /// Sequence number of the last command
    pub command_sequence: Option<u8>,
    /// Outcome of the last command
    pub command_result: Option<CommandResult>,
    /// Response data of the last command
    pub command_data: Option<u32>,

    /// Hardware revision
    pub hardware_revision: Option<u8>,
    /// Manufacturer id
    pub manufacturer: Option<u16>,
    /// Model number
    pub model: Option<u16>,
    /// Main software revision
    pub sw_revision_main: Option<u8>,
    /// Supplemental software revision
    pub sw_revision_supplemental: Option<u8>,
    /// Serial number
    pub serial_number: Option<u32>,
}

impl TrainerState {
    /// Fold a decoded page into the snapshot
    #[allow(clippy::too_many_lines)]
    pub fn apply(&mut self, response: &Response) {
        self.last_page = Some(response.page());

        match *response {
            Response::CalibrationResponse {
                temperature_c,
                zero_offset,
                spindown_ms,
            } => {
                self.calibration_temperature_c = Some(temperature_c);
                self.zero_offset_calibrated = Some(zero_offset.is_some());
                self.spindown_calibrated = Some(spindown_ms.is_some());
                if zero_offset.is_some() {
                    self.zero_offset = zero_offset;
                }
                if spindown_ms.is_some() {
                    self.spindown_ms = spindown_ms;
                }
            }
            Response::CalibrationProgress {
                zero_offset_status,
                spindown_status,
                speed_condition,
                temperature_condition,
                temperature_c,
                target_speed_kmh,
                target_spindown_ms,
            } => {
                self.zero_offset_status = Some(zero_offset_status);
                self.spindown_status = Some(spindown_status);
                self.speed_condition = Some(speed_condition);
                self.temperature_condition = Some(temperature_condition);
                self.current_temperature_c = Some(temperature_c);
                self.target_speed_kmh = Some(target_speed_kmh);
                self.target_spindown_ms = Some(target_spindown_ms);
            }
            Response::GeneralFeData {
                equipment_type,
                elapsed_s,
                distance_m,
                speed_kmh,
                heart_rate_bpm,
                capabilities,
                fe_state,
                lap_toggle,
            } => {
                self.equipment_type = Some(equipment_type);
                self.elapsed_s = Some(elapsed_s);
                self.distance_m = Some(distance_m);
                self.speed_kmh = Some(speed_kmh);
                self.heart_rate_bpm = Some(heart_rate_bpm);
                self.general_capabilities = Some(capabilities);
                self.fe_state = Some(fe_state);
                self.lap_toggle = Some(lap_toggle);
            }
            Response::GeneralSettings {
                cycle_length_m,
                incline_percent,
                resistance_level_percent,
                fe_state,
            } => {
                self.cycle_length_m = Some(cycle_length_m);
                self.incline_percent = Some(incline_percent);
                self.resistance_level_percent = Some(resistance_level_percent);
                self.fe_state = Some(fe_state);
            }
            Response::StationaryBikeData {
                cadence_rpm,
                power_w,
                fe_state,
            } => {
                self.cadence_rpm = Some(cadence_rpm);
                self.power_w = Some(power_w);
                self.fe_state = Some(fe_state);
            }
            Response::TrainerData {
                update_event_count,
                cadence_rpm,
                accumulated_power_w,
                instantaneous_power_w,
                status,
                target_power_limits,
                fe_state,
            } => {
                self.update_event_count = Some(update_event_count);
                self.cadence_rpm = Some(cadence_rpm);
                self.accumulated_power_w = Some(accumulated_power_w);
                self.power_w = Some(instantaneous_power_w);
                self.trainer_status = Some(status);
                self.target_power_limits = Some(target_power_limits);
                self.fe_state = Some(fe_state);
            }
            Response::TrainerTorqueData {
                update_event_count,
                wheel_revolutions,
                wheel_period_s,
                torque_nm,
                fe_state,
            } => {
                self.update_event_count = Some(update_event_count);
                self.wheel_revolutions = Some(wheel_revolutions);
                self.wheel_period_s = Some(wheel_period_s);
                self.torque_nm = Some(torque_nm);
                self.fe_state = Some(fe_state);
            }
            Response::BasicResistance { resistance_percent } => {
                self.target_resistance_percent = Some(resistance_percent);
            }
            Response::TargetPower { target_power_w } => {
                self.target_power_w = Some(target_power_w);
            }
            Response::WindResistance {
                coefficient,
                wind_speed_kmh,
                drafting_factor,
            } => {
                self.wind_coefficient = Some(coefficient);
                self.wind_speed_kmh = Some(wind_speed_kmh);
                self.drafting_factor = Some(drafting_factor);
            }
            Response::TrackResistance {
                grade_percent,
                rolling_resistance,
            } => {
                self.grade_percent = Some(grade_percent);
                self.rolling_resistance = Some(rolling_resistance);
            }
            Response::FeCapabilities {
                max_resistance_n,
                capabilities,
            } => {
                self.max_resistance_n = Some(max_resistance_n);
                self.fe_capabilities = Some(capabilities);
            }
            Response::UserConfiguration {
                user_weight_kg,
                bicycle_weight_kg,
                wheel_diameter_offset_mm,
                wheel_diameter_m,
                gear_ratio,
            } => {
                self.user_weight_kg = Some(user_weight_kg);
                self.bicycle_weight_kg = Some(bicycle_weight_kg);
                self.wheel_diameter_offset_mm = Some(wheel_diameter_offset_mm);
                self.wheel_diameter_m = Some(wheel_diameter_m);
                self.gear_ratio = Some(gear_ratio);
            }
            Response::RequestDataAck { requested_page, .. } => {
                self.requested_page = Some(requested_page);
            }
            Response::CommandStatus {
                command_id,
                sequence,
                status,
                data,
            } => {
                self.last_command_id = Some(command_id);
                self.command_sequence = Some(sequence);
                self.command_result = Some(CommandResult::from(status));
                self.command_data = Some(data);
            }
            Response::ManufacturerId {
                hardware_revision,
                manufacturer,
                model,
            } => {
                self.hardware_revision = Some(hardware_revision);
                self.manufacturer = Some(manufacturer);
                self.model = Some(model);
            }
            Response::ProductInformation {
                sw_revision_main,
                sw_revision_supplemental,
                serial_number,
            } => {
                self.sw_revision_main = Some(sw_revision_main);
                self.sw_revision_supplemental = Some(sw_revision_supplemental);
                self.serial_number = Some(serial_number);
            }
        }
    }
}

/// Routes characteristic notifications to decoded responses
///
/// The dispatcher is driven from a single delivery context: the transport
/// calls [`PageDispatcher::on_frame_received`] once per notification.
#[derive(Debug)]
pub struct PageDispatcher {
    config: DispatcherConfig,
    state: TrainerState,
    subscribers: Vec<mpsc::UnboundedSender<Response>>,
}

impl Default for PageDispatcher {
    fn default() -> Self {
        Self::new(DispatcherConfig::default())
    }
}

impl PageDispatcher {
    /// Create a dispatcher listening on the configured characteristic
    #[must_use]
    pub fn new(config: DispatcherConfig) -> Self {
        Self {
            config,
            state: TrainerState::default(),
            subscribers: Vec::new(),
        }
    }

    /// Dispatcher configuration
    #[must_use]
    pub const fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Register a new consumer of decoded responses
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<Response> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Number of registered consumers, including ones not yet pruned
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Last known trainer properties
    #[must_use]
    pub const fn state(&self) -> &TrainerState {
        &self.state
    }

    /// Handle one characteristic notification
    ///
    /// Frames from other characteristics and malformed or unsupported frames
    /// are dropped. A decoded response updates [`PageDispatcher::state`], is
    /// sent to every subscriber and returned.
    pub fn on_frame_received(
        &mut self,
        characteristic: Uuid,
        data: &[u8],
        transport_error: Option<&dyn Error>,
    ) -> Option<Response> {
        if let Some(error) = transport_error {
            trace!("Transport reported {error}, handling frame anyway");
        }

        if characteristic != self.config.read_characteristic {
            trace!("Ignoring notification from {characteristic}");
            return None;
        }

        if !protocol::is_well_formed(data) {
            trace!("Dropping malformed frame: {:02X?}", data);
            return None;
        }

        let Some(response) = Response::decode(data) else {
            trace!("Dropping unsupported frame: {:02X?}", data);
            return None;
        };

        debug!("Received page {}: {:?}", response.page(), response);

        self.state.apply(&response);
        self.publish(response);

        Some(response)
    }

    fn publish(&mut self, response: Response) {
        self.subscribers.retain(|tx| tx.send(response).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{protocol::checksum, request::Command, FEC_WRITE_CHAR_UUID};

    fn frame(payload: [u8; 8]) -> Vec<u8> {
        let mut data = vec![0xA4, 0x09, 0x4E, 0x05];
        data.extend_from_slice(&payload);
        data.push(checksum(&data));
        data
    }

    #[test]
    fn test_default_config_uses_tacx_read_characteristic() {
        let config = DispatcherConfig::default();
        assert_eq!(
            config.read_characteristic.to_string(),
            "6e40fec2-b5a3-f393-e0a9-e50e24dcca9e"
        );

        let ble = BleConfig::default();
        assert_eq!(DispatcherConfig::from(&ble), config);
    }

    #[tokio::test]
    async fn test_decoded_frames_reach_every_subscriber() {
        let mut dispatcher = PageDispatcher::default();
        let mut first = dispatcher.subscribe();
        let mut second = dispatcher.subscribe();

        let data = frame([48, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 99]);
        let response = dispatcher.on_frame_received(FEC_READ_CHAR_UUID, &data, None);

        let expected = Response::BasicResistance {
            resistance_percent: 49.5,
        };
        assert_eq!(response, Some(expected));
        assert_eq!(first.recv().await, Some(expected));
        assert_eq!(second.recv().await, Some(expected));
    }

    #[tokio::test]
    async fn test_other_characteristics_are_ignored() {
        let mut dispatcher = PageDispatcher::default();
        let mut rx = dispatcher.subscribe();

        let data = frame([48, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 99]);
        assert_eq!(
            dispatcher.on_frame_received(FEC_WRITE_CHAR_UUID, &data, None),
            None
        );
        assert!(rx.try_recv().is_err());
        assert_eq!(dispatcher.state(), &TrainerState::default());
    }

    #[test]
    fn test_malformed_frames_are_dropped() {
        let mut dispatcher = PageDispatcher::default();
        let mut rx = dispatcher.subscribe();

        let mut corrupted = frame([16, 25, 0, 0, 0, 0, 0, 0]);
        corrupted[5] ^= 0x10;
        let unsupported = frame([82, 0, 0, 0, 0, 0, 0, 0]);

        for data in [vec![], vec![0xA4, 0x09], corrupted, unsupported] {
            assert_eq!(
                dispatcher.on_frame_received(FEC_READ_CHAR_UUID, &data, None),
                None
            );
        }
        assert!(rx.try_recv().is_err());
        assert_eq!(dispatcher.state().last_page, None);
    }

    #[test]
    fn test_transport_error_does_not_block_delivery() {
        let mut dispatcher = PageDispatcher::default();
        let io_error = std::io::Error::other("link lost");
        let error: &dyn Error = &io_error;

        let data = frame([80, 0xFF, 0xFF, 7, 0x59, 0x00, 0x34, 0x12]);
        let response = dispatcher.on_frame_received(FEC_READ_CHAR_UUID, &data, Some(error));

        assert_eq!(
            response,
            Some(Response::ManufacturerId {
                hardware_revision: 7,
                manufacturer: 0x59,
                model: 0x1234,
            })
        );
        assert_eq!(dispatcher.state().manufacturer, Some(0x59));
    }

    #[test]
    fn test_closed_subscribers_are_pruned() {
        let mut dispatcher = PageDispatcher::default();
        let kept = dispatcher.subscribe();
        drop(dispatcher.subscribe());
        assert_eq!(dispatcher.subscriber_count(), 2);

        let data = frame([21, 0, 0, 0, 85, 200, 0, 3 << 4]);
        assert!(dispatcher
            .on_frame_received(FEC_READ_CHAR_UUID, &data, None)
            .is_some());
        assert_eq!(dispatcher.subscriber_count(), 1);
        drop(kept);
    }

    #[test]
    fn test_state_tracks_last_known_values() {
        let mut dispatcher = PageDispatcher::default();

        let pages = [
            frame([16, 25, 40, 10, 0x10, 0x27, 150, 3 << 4]),
            frame([25, 1, 92, 0x10, 0x00, 0xFA, 0x00, 3 << 4]),
            frame([54, 0xFF, 0xFF, 0xFF, 0xFF, 0xD0, 0x07, 0b111]),
            frame([71, 49, 3, 0, 0xFF, 0xFF, 0xFF, 0xFF]),
            frame([1, 0x40, 0x00, 90, 0x10, 0x00, 0xFF, 0xFF]),
            frame([1, 0x80, 0x00, 92, 0xFF, 0xFF, 0x20, 0x03]),
        ];
        for data in &pages {
            assert!(dispatcher
                .on_frame_received(FEC_READ_CHAR_UUID, data, None)
                .is_some());
        }

        let state = dispatcher.state();
        assert_eq!(state.last_page, Some(1));
        assert_eq!(state.equipment_type, Some(EquipmentType::Trainer));
        assert_eq!(state.heart_rate_bpm, Some(150));
        assert_eq!(state.cadence_rpm, Some(92));
        assert_eq!(state.power_w, Some(250));
        assert_eq!(state.fe_state, Some(FeState::InUse));
        assert_eq!(state.max_resistance_n, Some(2000));
        assert!(state.fe_capabilities.is_some_and(FeCapabilities::simulation));
        assert_eq!(state.last_command_id, Some(49));
        assert_eq!(state.command_result, Some(CommandResult::Pass));
        assert_eq!(state.spindown_ms, Some(800));
        assert_eq!(state.calibration_temperature_c, Some(21.0));
    }

    #[test]
    fn test_calibration_flags_follow_latest_result() {
        let mut dispatcher = PageDispatcher::default();

        let zero_offset_only = frame([1, 0x40, 0x00, 90, 0x10, 0x00, 0xFF, 0xFF]);
        dispatcher.on_frame_received(FEC_READ_CHAR_UUID, &zero_offset_only, None);
        let state = dispatcher.state();
        assert_eq!(state.zero_offset_calibrated, Some(true));
        assert_eq!(state.spindown_calibrated, Some(false));
        assert_eq!(state.zero_offset, Some(0x0010));
        assert_eq!(state.spindown_ms, None);

        let spindown_only = frame([1, 0x80, 0x00, 92, 0xFF, 0xFF, 0x20, 0x03]);
        dispatcher.on_frame_received(FEC_READ_CHAR_UUID, &spindown_only, None);
        let state = dispatcher.state();
        assert_eq!(state.zero_offset_calibrated, Some(false));
        assert_eq!(state.spindown_calibrated, Some(true));
        // Value kept from the earlier calibration
        assert_eq!(state.zero_offset, Some(0x0010));
        assert_eq!(state.spindown_ms, Some(800));
        assert_eq!(state.calibration_temperature_c, Some(21.0));

        let in_progress = frame([2, 0x80, 0x00, 90, 0x00, 0x00, 0x00, 0x00]);
        dispatcher.on_frame_received(FEC_READ_CHAR_UUID, &in_progress, None);
        let state = dispatcher.state();
        assert_eq!(state.current_temperature_c, Some(20.0));
        assert_eq!(state.calibration_temperature_c, Some(21.0));
        assert_eq!(state.spindown_status, Some(CalibrationStatus::Pending));
    }

    #[test]
    fn test_outbound_frames_are_decodable() {
        let mut dispatcher = PageDispatcher::default();
        let packet = Command::target_power(180.0).encode().unwrap();

        let response = dispatcher.on_frame_received(FEC_READ_CHAR_UUID, packet.as_ref(), None);
        assert_eq!(
            response,
            Some(Response::TargetPower {
                target_power_w: 180.0
            })
        );
        assert_eq!(dispatcher.state().target_power_w, Some(180.0));
    }
}
