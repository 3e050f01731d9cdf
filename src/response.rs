use crate::{
    protocol::{layout, page, WirePacket, PAYLOAD_SIZE},
    types::{
        CalibrationFeatures, CalibrationStatus, CommandResult, EquipmentType, FeCapabilities,
        FeState, GeneralCapabilities, SpeedCondition, TargetPowerLimits, TemperatureCondition,
        TrainerStatus,
    },
};
use serde::{Deserialize, Serialize};

/// Decoded inbound FE-C data page
///
/// Values are already converted to physical units. Fields that carry no
/// unit (serial numbers, command bytes) are kept raw.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Response {
    /// Page 1: result of a calibration
    CalibrationResponse {
        /// Temperature in degC
        temperature_c: f32,
        /// Zero offset, present only when the zero offset feature bit is set
        zero_offset: Option<u16>,
        /// Spin down time in ms, present only when the spin down feature bit is set
        spindown_ms: Option<u16>,
    },
    /// Page 2: calibration in progress
    CalibrationProgress {
        /// Zero offset calibration status
        zero_offset_status: CalibrationStatus,
        /// Spin down calibration status
        spindown_status: CalibrationStatus,
        /// Speed condition for the calibration
        speed_condition: SpeedCondition,
        /// Temperature condition for the calibration
        temperature_condition: TemperatureCondition,
        /// Current temperature in degC
        temperature_c: f32,
        /// Speed the rider must reach, in km/h
        target_speed_kmh: f32,
        /// Target spin down time in ms
        target_spindown_ms: u16,
    },
    /// Page 16: general FE data
    GeneralFeData {
        /// Equipment type
        equipment_type: EquipmentType,
        /// Elapsed time in seconds (wraps at 64 s)
        elapsed_s: f32,
        /// Distance travelled in metres (wraps at 256 m)
        distance_m: u8,
        /// Speed in km/h
        speed_kmh: f32,
        /// Heart rate in bpm
        heart_rate_bpm: u8,
        /// Capability flags
        capabilities: GeneralCapabilities,
        /// FE state
        fe_state: FeState,
        /// Lap toggle bit
        lap_toggle: bool,
    },
    /// Page 17: general settings
    GeneralSettings {
        /// Cycle length in metres
        cycle_length_m: f32,
        /// Incline in percent
        incline_percent: f32,
        /// Resistance level in percent of maximum
        resistance_level_percent: f32,
        /// FE state
        fe_state: FeState,
    },
    /// Page 21: specific stationary bike data
    StationaryBikeData {
        /// Cadence in rpm
        cadence_rpm: u8,
        /// Instantaneous power in watts
        power_w: u16,
        /// FE state
        fe_state: FeState,
    },
    /// Page 25: specific trainer data
    TrainerData {
        /// Update event count
        update_event_count: u8,
        /// Cadence in rpm
        cadence_rpm: u8,
        /// Accumulated power in watts (wraps at 65536)
        accumulated_power_w: u16,
        /// Instantaneous power in watts, 12 bits
        instantaneous_power_w: u16,
        /// Trainer status flags
        status: TrainerStatus,
        /// Target power limit flags
        target_power_limits: TargetPowerLimits,
        /// FE state
        fe_state: FeState,
    },
    /// Page 26: specific trainer torque data
    TrainerTorqueData {
        /// Update event count
        update_event_count: u8,
        /// Wheel revolutions
        wheel_revolutions: u8,
        /// Accumulated wheel period in seconds
        wheel_period_s: f32,
        /// Accumulated torque in Nm
        torque_nm: f32,
        /// FE state
        fe_state: FeState,
    },
    /// Page 48: basic resistance
    BasicResistance {
        /// Total resistance in percent
        resistance_percent: f32,
    },
    /// Page 49: target power
    TargetPower {
        /// Target power in watts
        target_power_w: f32,
    },
    /// Page 50: wind resistance
    WindResistance {
        /// Wind resistance coefficient in kg/m
        coefficient: f32,
        /// Wind speed in km/h
        wind_speed_kmh: i16,
        /// Drafting factor
        drafting_factor: f32,
    },
    /// Page 51: track resistance
    TrackResistance {
        /// Grade in percent
        grade_percent: f32,
        /// Rolling resistance coefficient
        rolling_resistance: f32,
    },
    /// Page 54: FE capabilities
    FeCapabilities {
        /// Maximum resistance in newtons
        max_resistance_n: u16,
        /// Supported control modes
        capabilities: FeCapabilities,
    },
    /// Page 55: user configuration
    UserConfiguration {
        /// User weight in kg
        user_weight_kg: f32,
        /// Bicycle weight in kg
        bicycle_weight_kg: f32,
        /// Wheel diameter offset in mm
        wheel_diameter_offset_mm: u8,
        /// Wheel diameter in metres
        wheel_diameter_m: f32,
        /// Gear ratio
        gear_ratio: f32,
    },
    /// Page 70: echo of a data page request
    RequestDataAck {
        /// Requested page number
        requested_page: u8,
        /// Command type
        command_type: u8,
    },
    /// Page 71: status of the last control command
    CommandStatus {
        /// Last received command id (page number)
        command_id: u8,
        /// Sequence number
        sequence: u8,
        /// Raw status byte
        status: u8,
        /// Response data, most significant byte first on the wire
        data: u32,
    },
    /// Page 80: manufacturer's identification
    ManufacturerId {
        /// Hardware revision
        hardware_revision: u8,
        /// Manufacturer id
        manufacturer: u16,
        /// Model number
        model: u16,
    },
    /// Page 81: product information
    ProductInformation {
        /// Main software revision
        sw_revision_main: u8,
        /// Supplemental software revision
        sw_revision_supplemental: u8,
        /// Serial number, least significant byte first on the wire
        serial_number: u32,
    },
}

impl Response {
    /// Decode a received buffer
    ///
    /// Returns `None` for short, corrupted or foreign frames and for pages
    /// this crate does not support. Shared channels carry such frames
    /// routinely, so no reason is reported.
    #[must_use]
    pub fn decode(data: &[u8]) -> Option<Self> {
        WirePacket::parse(data).and_then(|packet| Self::from_packet(&packet))
    }

    /// Decode an already validated frame
    #[must_use]
    pub fn from_packet(packet: &WirePacket) -> Option<Self> {
        let p = packet.payload();

        let response = match packet.page() {
            page::CALIBRATION => calibration_response(p),
            page::CALIBRATION_PROGRESS => calibration_progress(p),
            page::GENERAL_FE_DATA => Self::GeneralFeData {
                equipment_type: EquipmentType::from(layout::EQUIPMENT_TYPE.raw_u8(p)),
                elapsed_s: layout::ELAPSED_TIME.value(p),
                distance_m: layout::DISTANCE.raw_u8(p),
                speed_kmh: layout::SPEED.value(p),
                heart_rate_bpm: layout::HEART_RATE.raw_u8(p),
                capabilities: GeneralCapabilities::from_bits(
                    layout::GENERAL_CAPABILITIES.raw_u8(p),
                ),
                fe_state: fe_state(p),
                lap_toggle: layout::LAP_TOGGLE.raw(p) != 0,
            },
            page::GENERAL_SETTINGS => Self::GeneralSettings {
                cycle_length_m: layout::CYCLE_LENGTH.value(p),
                incline_percent: layout::INCLINE.value(p),
                resistance_level_percent: layout::RESISTANCE_LEVEL.value(p),
                fe_state: fe_state(p),
            },
            page::STATIONARY_BIKE_DATA => Self::StationaryBikeData {
                cadence_rpm: layout::BIKE_CADENCE.raw_u8(p),
                power_w: layout::BIKE_POWER.raw_u16(p),
                fe_state: fe_state(p),
            },
            page::TRAINER_DATA => Self::TrainerData {
                update_event_count: layout::UPDATE_EVENT_COUNT.raw_u8(p),
                cadence_rpm: layout::TRAINER_CADENCE.raw_u8(p),
                accumulated_power_w: layout::ACCUMULATED_POWER.raw_u16(p),
                instantaneous_power_w: layout::INSTANTANEOUS_POWER.raw_u16(p),
                status: TrainerStatus::from_bits(layout::TRAINER_STATUS.raw_u8(p)),
                target_power_limits: TargetPowerLimits::from(
                    layout::TARGET_POWER_LIMITS.raw_u8(p),
                ),
                fe_state: fe_state(p),
            },
            page::TRAINER_TORQUE_DATA => Self::TrainerTorqueData {
                update_event_count: layout::UPDATE_EVENT_COUNT.raw_u8(p),
                wheel_revolutions: layout::WHEEL_REVOLUTIONS.raw_u8(p),
                wheel_period_s: layout::WHEEL_PERIOD.value(p),
                torque_nm: layout::TORQUE.value(p),
                fe_state: fe_state(p),
            },
            page::BASIC_RESISTANCE => Self::BasicResistance {
                resistance_percent: layout::BASIC_RESISTANCE.value(p),
            },
            page::TARGET_POWER => Self::TargetPower {
                target_power_w: layout::TARGET_POWER.value(p),
            },
            page::WIND_RESISTANCE => Self::WindResistance {
                coefficient: layout::WIND_COEFFICIENT.value(p),
                // Unsigned offset encoding, byte 127 is still air
                wind_speed_kmh: i16::from(layout::WIND_SPEED.raw_u8(p)) - 127,
                drafting_factor: layout::DRAFTING_FACTOR.value(p),
            },
            page::TRACK_RESISTANCE => Self::TrackResistance {
                grade_percent: layout::GRADE.value(p),
                rolling_resistance: layout::ROLLING_RESISTANCE.value(p),
            },
            page::FE_CAPABILITIES => Self::FeCapabilities {
                max_resistance_n: layout::MAX_RESISTANCE.raw_u16(p),
                capabilities: FeCapabilities::from_bits(layout::FE_CAPABILITIES.raw_u8(p)),
            },
            page::USER_CONFIGURATION => Self::UserConfiguration {
                user_weight_kg: layout::USER_WEIGHT.value(p),
                bicycle_weight_kg: layout::BICYCLE_WEIGHT.value(p),
                wheel_diameter_offset_mm: layout::WHEEL_DIAMETER_OFFSET.raw_u8(p),
                wheel_diameter_m: layout::WHEEL_DIAMETER.value(p),
                gear_ratio: layout::GEAR_RATIO.value(p),
            },
            page::REQUEST_DATA => Self::RequestDataAck {
                requested_page: layout::REQUESTED_PAGE.raw_u8(p),
                command_type: layout::REQUEST_COMMAND_TYPE.raw_u8(p),
            },
            page::COMMAND_STATUS => Self::CommandStatus {
                command_id: layout::LAST_COMMAND_ID.raw_u8(p),
                sequence: layout::SEQUENCE.raw_u8(p),
                status: layout::COMMAND_STATUS.raw_u8(p),
                data: layout::COMMAND_DATA.raw(p),
            },
            page::MANUFACTURER_ID => Self::ManufacturerId {
                hardware_revision: layout::HW_REVISION.raw_u8(p),
                manufacturer: layout::MANUFACTURER_ID.raw_u16(p),
                model: layout::MODEL_NUMBER.raw_u16(p),
            },
            page::PRODUCT_INFORMATION => Self::ProductInformation {
                sw_revision_main: layout::SW_REVISION_MAIN.raw_u8(p),
                sw_revision_supplemental: layout::SW_REVISION_SUPPLEMENTAL.raw_u8(p),
                serial_number: layout::SERIAL_NUMBER.raw(p),
            },
            _ => return None,
        };

        Some(response)
    }

    /// Data page number of this response
    #[must_use]
    pub const fn page(&self) -> u8 {
        match self {
            Self::CalibrationResponse { .. } => page::CALIBRATION,
            Self::CalibrationProgress { .. } => page::CALIBRATION_PROGRESS,
            Self::GeneralFeData { .. } => page::GENERAL_FE_DATA,
            Self::GeneralSettings { .. } => page::GENERAL_SETTINGS,
            Self::StationaryBikeData { .. } => page::STATIONARY_BIKE_DATA,
            Self::TrainerData { .. } => page::TRAINER_DATA,
            Self::TrainerTorqueData { .. } => page::TRAINER_TORQUE_DATA,
            Self::BasicResistance { .. } => page::BASIC_RESISTANCE,
            Self::TargetPower { .. } => page::TARGET_POWER,
            Self::WindResistance { .. } => page::WIND_RESISTANCE,
            Self::TrackResistance { .. } => page::TRACK_RESISTANCE,
            Self::FeCapabilities { .. } => page::FE_CAPABILITIES,
            Self::UserConfiguration { .. } => page::USER_CONFIGURATION,
            Self::RequestDataAck { .. } => page::REQUEST_DATA,
            Self::CommandStatus { .. } => page::COMMAND_STATUS,
            Self::ManufacturerId { .. } => page::MANUFACTURER_ID,
            Self::ProductInformation { .. } => page::PRODUCT_INFORMATION,
        }
    }

    /// Interpreted status byte of a page 71 response
    #[must_use]
    pub fn command_result(&self) -> Option<CommandResult> {
        match *self {
            Self::CommandStatus { status, .. } => Some(CommandResult::from(status)),
            _ => None,
        }
    }
}

fn fe_state(p: &[u8; PAYLOAD_SIZE]) -> FeState {
    FeState::from(layout::FE_STATE.raw_u8(p))
}

// 7.4.1 Data Page 1
fn calibration_response(p: &[u8; PAYLOAD_SIZE]) -> Response {
    let features = CalibrationFeatures::from_bits(layout::CALIBRATION_FEATURES.raw_u8(p));

    Response::CalibrationResponse {
        temperature_c: layout::CALIBRATION_TEMPERATURE.value(p),
        zero_offset: features
            .zero_offset()
            .then(|| layout::ZERO_OFFSET.raw_u16(p)),
        spindown_ms: features
            .spindown()
            .then(|| layout::SPINDOWN_TIME.raw_u16(p)),
    }
}

// 7.4.2 Data Page 2
fn calibration_progress(p: &[u8; PAYLOAD_SIZE]) -> Response {
    let status = CalibrationFeatures::from_bits(layout::CALIBRATION_FEATURES.raw_u8(p));

    Response::CalibrationProgress {
        zero_offset_status: CalibrationStatus::from(status.zero_offset()),
        spindown_status: CalibrationStatus::from(status.spindown()),
        speed_condition: SpeedCondition::from(layout::SPEED_CONDITION.raw_u8(p)),
        temperature_condition: TemperatureCondition::from(
            layout::TEMPERATURE_CONDITION.raw_u8(p),
        ),
        temperature_c: layout::CALIBRATION_TEMPERATURE.value(p),
        target_speed_kmh: layout::TARGET_SPEED.value(p),
        target_spindown_ms: layout::TARGET_SPINDOWN_TIME.raw_u16(p),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{protocol::checksum, request::Command};

    fn frame(payload: [u8; PAYLOAD_SIZE]) -> Vec<u8> {
        let mut data = vec![0xA4, 0x09, 0x00, 0x00];
        data.extend_from_slice(&payload);
        data.push(checksum(&data));
        data
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_rejects_malformed_buffers() {
        for len in 0..5 {
            assert_eq!(Response::decode(&vec![0xA4; len]), None);
        }

        let good = frame([48, 0, 0, 0, 0, 0, 0, 99]);
        assert!(Response::decode(&good).is_some());

        let mut bad_checksum = good.clone();
        bad_checksum[12] = bad_checksum[12].wrapping_add(1);
        assert_eq!(Response::decode(&bad_checksum), None);

        let mut bad_sync = good.clone();
        bad_sync[0] = 0xA5;
        bad_sync[12] ^= 0xA4 ^ 0xA5;
        assert_eq!(Response::decode(&bad_sync), None);

        let mut bad_length = good.clone();
        bad_length[1] = 8;
        bad_length[12] ^= 0x09 ^ 0x08;
        assert_eq!(Response::decode(&bad_length), None);
    }

    #[test]
    fn test_unknown_page_is_not_decodable() {
        for page in [0, 3, 18, 19, 52, 82, 255] {
            assert_eq!(Response::decode(&frame([page, 0, 0, 0, 0, 0, 0, 0])), None);
        }
    }

    #[test]
    fn test_page1_with_all_data() {
        let data = frame([1, 0xC0, 0x00, 60, 0x23, 0x01, 0x34, 0x12]);
        assert_eq!(
            Response::decode(&data),
            Some(Response::CalibrationResponse {
                temperature_c: 5.0,
                zero_offset: Some(0x0123),
                spindown_ms: Some(0x1234),
            })
        );
    }

    #[test]
    fn test_page1_without_spindown() {
        let data = frame([1, 0x40, 0x00, 61, 0x23, 0x01, 0x34, 0x12]);
        match Response::decode(&data) {
            Some(Response::CalibrationResponse {
                temperature_c,
                zero_offset,
                spindown_ms,
            }) => {
                assert!(approx(temperature_c, 5.5));
                assert_eq!(zero_offset, Some(0x0123));
                assert_eq!(spindown_ms, None);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_page1_without_zero_offset() {
        let data = frame([1, 0x80, 0x00, 60, 0x00, 0x00, 0x55, 0x55]);
        match Response::decode(&data) {
            Some(Response::CalibrationResponse {
                zero_offset,
                spindown_ms,
                ..
            }) => {
                assert_eq!(zero_offset, None);
                assert_eq!(spindown_ms, Some(0x5555));
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_page2() {
        let conditions = (0x01 << 6) | (0x02 << 4);
        let data = frame([2, 0xC0, conditions, 60, 0x55, 0x55, 0x56, 0x34]);
        match Response::decode(&data) {
            Some(Response::CalibrationProgress {
                zero_offset_status,
                spindown_status,
                speed_condition,
                temperature_condition,
                temperature_c,
                target_speed_kmh,
                target_spindown_ms,
            }) => {
                assert_eq!(zero_offset_status, CalibrationStatus::Pending);
                assert_eq!(spindown_status, CalibrationStatus::Pending);
                assert_eq!(speed_condition, SpeedCondition::TooSlow);
                assert_eq!(temperature_condition, TemperatureCondition::Ok);
                assert!(approx(temperature_c, 5.0));
                assert!((target_speed_kmh - f32::from(0x5555u16) * 3.6 / 1000.0).abs() < 1e-2);
                assert_eq!(target_spindown_ms, 0x3456);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_page2_status_bits_are_independent() {
        let data = frame([2, 0x40, 0, 50, 0, 0, 0, 0]);
        match Response::decode(&data) {
            Some(Response::CalibrationProgress {
                zero_offset_status,
                spindown_status,
                speed_condition,
                ..
            }) => {
                assert_eq!(zero_offset_status, CalibrationStatus::Pending);
                assert_eq!(spindown_status, CalibrationStatus::NotRequested);
                assert_eq!(speed_condition, SpeedCondition::NotApplicable);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_page16() {
        // Hand contact HR, distance and virtual speed; state in use; lap toggle set
        let flags = 0b1000_0000 | (3 << 4) | 0b1111;
        let data = frame([16, 25, 123, 69, 0x39, 0x30, 180, flags]);
        match Response::decode(&data) {
            Some(Response::GeneralFeData {
                equipment_type,
                elapsed_s,
                distance_m,
                speed_kmh,
                heart_rate_bpm,
                capabilities,
                fe_state,
                lap_toggle,
            }) => {
                assert_eq!(equipment_type, EquipmentType::Trainer);
                assert!(approx(elapsed_s, 30.75));
                assert_eq!(distance_m, 69);
                assert!((speed_kmh - 12345.0 * 3.6 / 1000.0).abs() < 1e-3);
                assert_eq!(heart_rate_bpm, 180);
                assert_eq!(
                    capabilities.heart_rate_source(),
                    crate::types::HeartRateSource::HandContact
                );
                assert!(capabilities.distance_travelled());
                assert!(capabilities.virtual_speed());
                assert_eq!(fe_state, FeState::InUse);
                assert!(lap_toggle);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_page17() {
        let incline = 0x0999u16.to_le_bytes();
        let data = frame([17, 0, 0, 23, incline[0], incline[1], 0x69, 2 << 4]);
        match Response::decode(&data) {
            Some(Response::GeneralSettings {
                cycle_length_m,
                incline_percent,
                resistance_level_percent,
                fe_state,
            }) => {
                assert!(approx(cycle_length_m, 0.23));
                assert!(approx(incline_percent, 24.57));
                assert!(approx(resistance_level_percent, 52.5));
                assert_eq!(fe_state, FeState::Ready);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_page17_negative_incline() {
        let incline = (-350i16).to_le_bytes();
        let data = frame([17, 0, 0, 0, incline[0], incline[1], 0, 0]);
        match Response::decode(&data) {
            Some(Response::GeneralSettings {
                incline_percent, ..
            }) => assert!(approx(incline_percent, -3.5)),
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_page21() {
        let data = frame([21, 0, 0, 0, 90, 0x2C, 0x01, 3 << 4]);
        assert_eq!(
            Response::decode(&data),
            Some(Response::StationaryBikeData {
                cadence_rpm: 90,
                power_w: 300,
                fe_state: FeState::InUse,
            })
        );
    }

    #[test]
    fn test_page25() {
        let accumulated = 458u16.to_le_bytes();
        let instant = 999u16.to_le_bytes();
        // Resistance calibration required in the high nibble of byte 6
        let status_and_msb = (0b0010 << 4) | instant[1];
        let data = frame([
            25,
            23,
            111,
            accumulated[0],
            accumulated[1],
            instant[0],
            status_and_msb,
            (3 << 4) | 0x01,
        ]);
        match Response::decode(&data) {
            Some(Response::TrainerData {
                update_event_count,
                cadence_rpm,
                accumulated_power_w,
                instantaneous_power_w,
                status,
                target_power_limits,
                fe_state,
            }) => {
                assert_eq!(update_event_count, 23);
                assert_eq!(cadence_rpm, 111);
                assert_eq!(accumulated_power_w, 458);
                assert_eq!(instantaneous_power_w, 999);
                assert!(status.resistance_calibration_required());
                assert!(!status.power_calibration_required());
                assert_eq!(target_power_limits, TargetPowerLimits::SpeedTooLow);
                assert_eq!(fe_state, FeState::InUse);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_page25_ignores_reserved_limit_bits() {
        for (byte7, limits) in [
            (0b0000_1101, TargetPowerLimits::SpeedTooLow),
            (0b0000_0110, TargetPowerLimits::SpeedTooHigh),
            (0b0011_1100, TargetPowerLimits::AtTarget),
            (0b0000_1111, TargetPowerLimits::Undetermined),
        ] {
            let data = frame([25, 0, 0, 0, 0, 0, 0, byte7]);
            match Response::decode(&data) {
                Some(Response::TrainerData {
                    target_power_limits,
                    ..
                }) => assert_eq!(target_power_limits, limits, "byte 7 = {byte7:#010b}"),
                other => panic!("unexpected response: {other:?}"),
            }
        }
    }

    #[test]
    fn test_page26() {
        let period = 4096u16.to_le_bytes();
        let torque = 640u16.to_le_bytes();
        let data = frame([26, 7, 12, period[0], period[1], torque[0], torque[1], 3 << 4]);
        match Response::decode(&data) {
            Some(Response::TrainerTorqueData {
                update_event_count,
                wheel_revolutions,
                wheel_period_s,
                torque_nm,
                fe_state,
            }) => {
                assert_eq!(update_event_count, 7);
                assert_eq!(wheel_revolutions, 12);
                assert!(approx(wheel_period_s, 2.0));
                assert!(approx(torque_nm, 20.0));
                assert_eq!(fe_state, FeState::InUse);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_page48() {
        let data = frame([48, 0, 0, 0, 0, 0, 0, 99]);
        assert_eq!(
            Response::decode(&data),
            Some(Response::BasicResistance {
                resistance_percent: 49.5
            })
        );
    }

    #[test]
    fn test_page49() {
        let target = 456u16.to_le_bytes();
        let data = frame([49, 0, 0, 0, 0, 0, target[0], target[1]]);
        assert_eq!(
            Response::decode(&data),
            Some(Response::TargetPower {
                target_power_w: 114.0
            })
        );
    }

    #[test]
    fn test_page50() {
        let data = frame([50, 0, 0, 0, 0, 123, 134, 99]);
        match Response::decode(&data) {
            Some(Response::WindResistance {
                coefficient,
                wind_speed_kmh,
                drafting_factor,
            }) => {
                assert!(approx(coefficient, 1.23));
                assert_eq!(wind_speed_kmh, 7);
                assert!(approx(drafting_factor, 0.99));
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_page50_still_air_offset() {
        let data = frame([50, 0, 0, 0, 0, 0, 0, 0]);
        match Response::decode(&data) {
            Some(Response::WindResistance { wind_speed_kmh, .. }) => {
                assert_eq!(wind_speed_kmh, -127);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_page51() {
        let grade = 20_500u16.to_le_bytes();
        let data = frame([51, 0, 0, 0, 0, grade[0], grade[1], 77]);
        match Response::decode(&data) {
            Some(Response::TrackResistance {
                grade_percent,
                rolling_resistance,
            }) => {
                assert!(approx(grade_percent, 5.0));
                assert!((rolling_resistance - 77.0 * 5e-5).abs() < 1e-7);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_page54() {
        let max = 12345u16.to_le_bytes();
        let data = frame([54, 0, 0, 0, 0, max[0], max[1], 0b111]);
        match Response::decode(&data) {
            Some(Response::FeCapabilities {
                max_resistance_n,
                capabilities,
            }) => {
                assert_eq!(max_resistance_n, 12345);
                assert!(capabilities.basic_resistance());
                assert!(capabilities.target_power());
                assert!(capabilities.simulation());
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_page55() {
        let weight = 7500u16.to_le_bytes();
        let bike = ((100u16 << 4) | 13).to_le_bytes();
        let data = frame([55, weight[0], weight[1], 0xFF, bike[0], bike[1], 222, 205]);
        match Response::decode(&data) {
            Some(Response::UserConfiguration {
                user_weight_kg,
                bicycle_weight_kg,
                wheel_diameter_offset_mm,
                wheel_diameter_m,
                gear_ratio,
            }) => {
                assert!(approx(user_weight_kg, 75.0));
                assert!(approx(bicycle_weight_kg, 5.0));
                assert_eq!(wheel_diameter_offset_mm, 13);
                assert!(approx(wheel_diameter_m, 2.22));
                assert!(approx(gear_ratio, 6.15));
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_page70() {
        let data = frame([70, 0xFF, 0xFF, 0xFF, 0xFF, 0x80, 54, 0x01]);
        assert_eq!(
            Response::decode(&data),
            Some(Response::RequestDataAck {
                requested_page: 54,
                command_type: 0x01,
            })
        );
    }

    #[test]
    fn test_page71_is_big_endian() {
        let data = frame([71, 0x12, 0x34, 0x56, 0x12, 0x34, 0xAB, 0xCD]);
        let response = Response::decode(&data).unwrap();
        assert_eq!(
            response,
            Response::CommandStatus {
                command_id: 0x12,
                sequence: 0x34,
                status: 0x56,
                data: 0x1234_ABCD,
            }
        );
        assert_eq!(response.command_result(), Some(CommandResult::Reserved(0x56)));
    }

    #[test]
    fn test_page80() {
        let data = frame([80, 0, 0, 99, 0x99, 0x99, 0x5A, 0x5A]);
        assert_eq!(
            Response::decode(&data),
            Some(Response::ManufacturerId {
                hardware_revision: 99,
                manufacturer: 0x9999,
                model: 0x5A5A,
            })
        );
    }

    #[test]
    fn test_page81_is_little_endian() {
        let serial = 0x12AB_56EFu32.to_le_bytes();
        let data = frame([81, 0, 69, 3, serial[0], serial[1], serial[2], serial[3]]);
        assert_eq!(
            Response::decode(&data),
            Some(Response::ProductInformation {
                sw_revision_main: 3,
                sw_revision_supplemental: 69,
                serial_number: 0x12AB_56EF,
            })
        );
    }

    #[test]
    fn test_commands_survive_a_round_trip() {
        let resistance = Response::decode(Command::basic_resistance(33.3).encode().unwrap().as_ref());
        assert!(matches!(
            resistance,
            Some(Response::BasicResistance { resistance_percent }) if approx(resistance_percent, 33.5)
        ));

        let power = Response::decode(Command::target_power(201.1).encode().unwrap().as_ref());
        assert!(matches!(
            power,
            Some(Response::TargetPower { target_power_w }) if approx(target_power_w, 201.0)
        ));

        let wind = Command::WindResistance {
            coefficient: 0.51,
            wind_speed_kmh: -12.4,
            drafting_factor: 0.75,
        };
        match Response::decode(wind.encode().unwrap().as_ref()) {
            Some(Response::WindResistance {
                coefficient,
                wind_speed_kmh,
                drafting_factor,
            }) => {
                assert!(approx(coefficient, 0.51));
                assert_eq!(wind_speed_kmh, -12);
                assert!(approx(drafting_factor, 0.75));
            }
            other => panic!("unexpected response: {other:?}"),
        }

        for grade in [-200.0, -7.25, 0.0, 3.5, 200.0] {
            let track = Command::track_resistance(grade, 0.0041);
            match Response::decode(track.encode().unwrap().as_ref()) {
                Some(Response::TrackResistance {
                    grade_percent,
                    rolling_resistance,
                }) => {
                    assert!((grade_percent - grade).abs() <= 0.005 + 1e-3);
                    assert!((rolling_resistance - 0.0041).abs() <= 2.5e-5 + 1e-7);
                }
                other => panic!("unexpected response: {other:?}"),
            }
        }

        let request = Response::decode(Command::request_page(50).encode().unwrap().as_ref());
        assert_eq!(
            request,
            Some(Response::RequestDataAck {
                requested_page: 50,
                command_type: 0x01,
            })
        );

        let calibration = Command::CalibrationRequest {
            zero_offset: true,
            spindown: false,
        };
        match Response::decode(calibration.encode().unwrap().as_ref()) {
            Some(Response::CalibrationResponse {
                zero_offset,
                spindown_ms,
                ..
            }) => {
                assert!(zero_offset.is_some());
                assert_eq!(spindown_ms, None);
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_response_page_matches_wire_page() {
        let data = frame([25, 0, 0, 0, 0, 0, 0, 0]);
        let response = Response::decode(&data).unwrap();
        assert_eq!(response.page(), 25);
        assert_eq!(response.command_result(), None);
    }
}
