use crate::{
    error::{FecError, Result},
    protocol::{layout, page, WirePacket, NO_DATA, PAYLOAD_SIZE},
    types::CalibrationFeatures,
};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Valid total resistance in percent
pub const RESISTANCE_RANGE: RangeInclusive<f32> = 0.0..=100.0;
/// Valid target power in watts
pub const TARGET_POWER_RANGE: RangeInclusive<f32> = 0.0..=10_000.0;
/// Valid wind resistance coefficient in kg/m
pub const WIND_COEFFICIENT_RANGE: RangeInclusive<f32> = 0.0..=1.86;
/// Wind speed limits in km/h; values outside are clamped, not rejected
pub const WIND_SPEED_RANGE: RangeInclusive<f32> = -127.0..=127.0;
/// Valid drafting factor
pub const DRAFTING_FACTOR_RANGE: RangeInclusive<f32> = 0.0..=1.0;
/// Valid grade in percent
pub const GRADE_RANGE: RangeInclusive<f32> = -200.0..=200.0;
/// Valid rolling resistance coefficient
pub const ROLLING_RESISTANCE_RANGE: RangeInclusive<f32> = 0.0..=0.0127;
/// Pages that may be requested through page 70
pub const REQUEST_PAGE_RANGE: RangeInclusive<u8> = 0..=50;

/// Page 70 byte 5: reply with an acknowledged message
pub const REQUEST_ACKNOWLEDGED_REPLY: u8 = 0x80;
/// Page 70 byte 7: command type "request data page"
pub const REQUEST_DATA_PAGE: u8 = 0x01;

/// Outbound FE-C control command
///
/// Each variant carries physical values only. [`Command::encode`] validates
/// them and produces the checksummed wire frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Page 48: total resistance as a percentage of maximum
    BasicResistance {
        /// Resistance in percent, 0 to 100
        percent: f32,
    },
    /// Page 49: target power (ERG mode)
    TargetPower {
        /// Target power in watts, 0 to 10000
        watts: f32,
    },
    /// Page 50: wind resistance simulation
    WindResistance {
        /// Wind resistance coefficient in kg/m, 0 to 1.86
        coefficient: f32,
        /// Wind speed in km/h, clamped to -127..=127
        wind_speed_kmh: f32,
        /// Drafting scale factor, 0 to 1
        drafting_factor: f32,
    },
    /// Page 51: track resistance simulation
    TrackResistance {
        /// Grade in percent, -200 to 200
        grade_percent: f32,
        /// Rolling resistance coefficient, 0 to 0.0127
        rolling_resistance: f32,
    },
    /// Page 1: start a calibration
    CalibrationRequest {
        /// Request zero offset calibration
        zero_offset: bool,
        /// Request spin down calibration
        spindown: bool,
    },
    /// Page 70: ask the trainer to transmit a data page
    RequestPage {
        /// Requested page number, 0 to 50
        page: u8,
    },
}

fn check(field: &'static str, range: &RangeInclusive<f32>, value: f32) -> Result<f32> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(FecError::out_of_range(field, *range.start(), *range.end(), value))
    }
}

fn filled(page: u8) -> [u8; PAYLOAD_SIZE] {
    let mut payload = [NO_DATA; PAYLOAD_SIZE];
    payload[0] = page;
    payload
}

impl Command {
    /// Create a basic resistance command
    #[must_use]
    pub const fn basic_resistance(percent: f32) -> Self {
        Self::BasicResistance { percent }
    }

    /// Create a target power command
    #[must_use]
    pub const fn target_power(watts: f32) -> Self {
        Self::TargetPower { watts }
    }

    /// Create a track resistance command
    #[must_use]
    pub const fn track_resistance(grade_percent: f32, rolling_resistance: f32) -> Self {
        Self::TrackResistance {
            grade_percent,
            rolling_resistance,
        }
    }

    /// Create a page request
    #[must_use]
    pub const fn request_page(page: u8) -> Self {
        Self::RequestPage { page }
    }

    /// Data page number this command is sent on
    #[must_use]
    pub const fn page(&self) -> u8 {
        match self {
            Self::BasicResistance { .. } => page::BASIC_RESISTANCE,
            Self::TargetPower { .. } => page::TARGET_POWER,
            Self::WindResistance { .. } => page::WIND_RESISTANCE,
            Self::TrackResistance { .. } => page::TRACK_RESISTANCE,
            Self::CalibrationRequest { .. } => page::CALIBRATION,
            Self::RequestPage { .. } => page::REQUEST_DATA,
        }
    }

    /// Validate the parameters and build the 13-byte wire frame
    ///
    /// # Errors
    ///
    /// Returns [`FecError::OutOfRange`] or [`FecError::IntegerOutOfRange`]
    /// naming the field when a parameter is outside its documented range.
    /// Wind speed is clamped instead; only a NaN wind speed is rejected.
    pub fn encode(&self) -> Result<WirePacket> {
        let payload = self.payload()?;
        Ok(WirePacket::from_payload(payload))
    }

    fn payload(&self) -> Result<[u8; PAYLOAD_SIZE]> {
        let mut payload = filled(self.page());

        match *self {
            Self::BasicResistance { percent } => {
                let percent = check("percent", &RESISTANCE_RANGE, percent)?;
                layout::BASIC_RESISTANCE.encode(&mut payload, percent);
            }
            Self::TargetPower { watts } => {
                let watts = check("watts", &TARGET_POWER_RANGE, watts)?;
                layout::TARGET_POWER.encode(&mut payload, watts);
            }
            Self::WindResistance {
                coefficient,
                wind_speed_kmh,
                drafting_factor,
            } => {
                let coefficient = check("coefficient", &WIND_COEFFICIENT_RANGE, coefficient)?;
                let drafting_factor =
                    check("drafting_factor", &DRAFTING_FACTOR_RANGE, drafting_factor)?;
                if wind_speed_kmh.is_nan() {
                    return Err(FecError::out_of_range(
                        "wind_speed_kmh",
                        *WIND_SPEED_RANGE.start(),
                        *WIND_SPEED_RANGE.end(),
                        wind_speed_kmh,
                    ));
                }
                let wind_speed =
                    wind_speed_kmh.clamp(*WIND_SPEED_RANGE.start(), *WIND_SPEED_RANGE.end());

                layout::WIND_COEFFICIENT.encode(&mut payload, coefficient);
                // Whole km/h, so round before applying the +127 offset
                layout::WIND_SPEED.encode(&mut payload, wind_speed.round());
                layout::DRAFTING_FACTOR.encode(&mut payload, drafting_factor);
            }
            Self::TrackResistance {
                grade_percent,
                rolling_resistance,
            } => {
                let grade = check("grade_percent", &GRADE_RANGE, grade_percent)?;
                let crr = check(
                    "rolling_resistance",
                    &ROLLING_RESISTANCE_RANGE,
                    rolling_resistance,
                )?;
                layout::GRADE.encode(&mut payload, grade);
                layout::ROLLING_RESISTANCE.encode(&mut payload, crr);
            }
            Self::CalibrationRequest {
                zero_offset,
                spindown,
            } => {
                let features = CalibrationFeatures::new(zero_offset, spindown);
                layout::CALIBRATION_FEATURES.put(&mut payload, u32::from(features.bits()));
                layout::CALIBRATION_RESERVED.put(&mut payload, 0);
            }
            Self::RequestPage { page } => {
                if !REQUEST_PAGE_RANGE.contains(&page) {
                    return Err(FecError::IntegerOutOfRange {
                        field: "page",
                        min: i64::from(*REQUEST_PAGE_RANGE.start()),
                        max: i64::from(*REQUEST_PAGE_RANGE.end()),
                        value: i64::from(page),
                    });
                }
                layout::REQUEST_RESPONSE.put(&mut payload, u32::from(REQUEST_ACKNOWLEDGED_REPLY));
                layout::REQUESTED_PAGE.put(&mut payload, u32::from(page));
                layout::REQUEST_COMMAND_TYPE.put(&mut payload, u32::from(REQUEST_DATA_PAGE));
            }
        }

        Ok(payload)
    }
}
