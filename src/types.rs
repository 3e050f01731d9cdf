use serde::{Deserialize, Serialize};
use std::{fmt, ops::BitOr};

/// Implements the shared bit set surface for a `u8` newtype
macro_rules! bit_set {
    ($name:ident) => {
        impl $name {
            /// Empty set
            pub const EMPTY: Self = Self(0);

            /// Build a set from raw wire bits
            #[must_use]
            pub const fn from_bits(bits: u8) -> Self {
                Self(bits)
            }

            /// Raw wire bits
            #[must_use]
            pub const fn bits(self) -> u8 {
                self.0
            }

            /// Check whether every bit of `other` is set in `self`
            #[must_use]
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            /// Check whether no bit is set
            #[must_use]
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }
        }

        impl BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }
    };
}

/// Calibration features of page 1 (request/response) and page 2 (in progress)
///
/// Bit 6 selects zero offset calibration, bit 7 spin down calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CalibrationFeatures(u8);

bit_set!(CalibrationFeatures);

impl CalibrationFeatures {
    /// Zero offset calibration
    pub const ZERO_OFFSET: Self = Self(1 << 6);
    /// Spin down calibration
    pub const SPINDOWN: Self = Self(1 << 7);

    /// Build the feature byte for a calibration request
    #[must_use]
    pub const fn new(zero_offset: bool, spindown: bool) -> Self {
        Self(((spindown as u8) << 7) | ((zero_offset as u8) << 6))
    }

    /// Zero offset calibration bit is set
    #[must_use]
    pub const fn zero_offset(self) -> bool {
        self.contains(Self::ZERO_OFFSET)
    }

    /// Spin down calibration bit is set
    #[must_use]
    pub const fn spindown(self) -> bool {
        self.contains(Self::SPINDOWN)
    }
}

/// Control modes advertised on page 54
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FeCapabilities(u8);

bit_set!(FeCapabilities);

impl FeCapabilities {
    /// Basic resistance mode (page 48)
    pub const BASIC_RESISTANCE: Self = Self(1 << 0);
    /// Target power mode (page 49)
    pub const TARGET_POWER: Self = Self(1 << 1);
    /// Simulation mode (pages 50 and 51)
    pub const SIMULATION: Self = Self(1 << 2);

    /// Basic resistance mode is supported
    #[must_use]
    pub const fn basic_resistance(self) -> bool {
        self.contains(Self::BASIC_RESISTANCE)
    }

    /// Target power mode is supported
    #[must_use]
    pub const fn target_power(self) -> bool {
        self.contains(Self::TARGET_POWER)
    }

    /// Simulation mode is supported
    #[must_use]
    pub const fn simulation(self) -> bool {
        self.contains(Self::SIMULATION)
    }
}

/// Capabilities nibble of the general FE data page (page 16, byte 7 bits 0-3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GeneralCapabilities(u8);

bit_set!(GeneralCapabilities);

impl GeneralCapabilities {
    /// Heart rate from an ANT+ monitor
    pub const HR_ANT_PLUS: Self = Self(0b01);
    /// Heart rate from an electromagnetic (5 kHz) monitor
    pub const HR_ELECTROMAGNETIC: Self = Self(0b10);
    /// Heart rate from hand contact sensors, overlaps both single-bit sources
    pub const HR_HAND_CONTACT: Self = Self(0b11);
    /// Distance travelled is reported
    pub const DISTANCE_TRAVELLED: Self = Self(1 << 2);
    /// Reported speed is virtual rather than measured
    pub const VIRTUAL_SPEED: Self = Self(1 << 3);

    /// Source of the reported heart rate
    ///
    /// The 2-bit sub-field is matched in priority order: the combined
    /// hand contact pattern first, then its single-bit components.
    #[must_use]
    pub const fn heart_rate_source(self) -> HeartRateSource {
        if self.contains(Self::HR_HAND_CONTACT) {
            HeartRateSource::HandContact
        } else if self.contains(Self::HR_ELECTROMAGNETIC) {
            HeartRateSource::Electromagnetic
        } else if self.contains(Self::HR_ANT_PLUS) {
            HeartRateSource::AntPlus
        } else {
            HeartRateSource::Invalid
        }
    }

    /// Distance travelled is reported
    #[must_use]
    pub const fn distance_travelled(self) -> bool {
        self.contains(Self::DISTANCE_TRAVELLED)
    }

    /// Reported speed is virtual
    #[must_use]
    pub const fn virtual_speed(self) -> bool {
        self.contains(Self::VIRTUAL_SPEED)
    }
}

/// Trainer status bits of page 25 (byte 6 high nibble)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TrainerStatus(u8);

bit_set!(TrainerStatus);

impl TrainerStatus {
    /// Bicycle power calibration required
    pub const POWER_CALIBRATION_REQUIRED: Self = Self(1 << 0);
    /// Resistance calibration required
    pub const RESISTANCE_CALIBRATION_REQUIRED: Self = Self(1 << 1);
    /// User configuration required
    pub const USER_CONFIGURATION_REQUIRED: Self = Self(1 << 2);

    /// Bicycle power calibration required
    #[must_use]
    pub const fn power_calibration_required(self) -> bool {
        self.contains(Self::POWER_CALIBRATION_REQUIRED)
    }

    /// Resistance calibration required
    #[must_use]
    pub const fn resistance_calibration_required(self) -> bool {
        self.contains(Self::RESISTANCE_CALIBRATION_REQUIRED)
    }

    /// User configuration required
    #[must_use]
    pub const fn user_configuration_required(self) -> bool {
        self.contains(Self::USER_CONFIGURATION_REQUIRED)
    }
}

/// Heart rate data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeartRateSource {
    /// No valid heart rate source
    Invalid,
    /// ANT+ heart rate monitor
    AntPlus,
    /// Electromagnetic heart rate monitor
    Electromagnetic,
    /// Hand contact sensors
    HandContact,
}

/// Calibration progress status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationStatus {
    /// Calibration not requested
    NotRequested = 0,
    /// Calibration pending
    Pending = 1,
}

impl From<bool> for CalibrationStatus {
    fn from(pending: bool) -> Self {
        if pending {
            Self::Pending
        } else {
            Self::NotRequested
        }
    }
}

/// Temperature condition reported during calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemperatureCondition {
    /// Not applicable
    NotApplicable = 0,
    /// Too cold
    TooCold = 1,
    /// Temperature OK
    Ok = 2,
    /// Too hot
    TooHot = 3,
}

impl From<u8> for TemperatureCondition {
    fn from(value: u8) -> Self {
        match value & 0x03 {
            0 => Self::NotApplicable,
            1 => Self::TooCold,
            2 => Self::Ok,
            _ => Self::TooHot,
        }
    }
}

impl fmt::Display for TemperatureCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotApplicable => write!(f, "Not Applicable"),
            Self::TooCold => write!(f, "Too Cold"),
            Self::Ok => write!(f, "OK"),
            Self::TooHot => write!(f, "Too Hot"),
        }
    }
}

/// Speed condition reported during calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedCondition {
    /// Not applicable
    NotApplicable = 0,
    /// Current speed too low to calibrate
    TooSlow = 1,
    /// Speed OK
    Ok = 2,
    /// Reserved value
    Reserved = 3,
}

impl From<u8> for SpeedCondition {
    fn from(value: u8) -> Self {
        match value & 0x03 {
            0 => Self::NotApplicable,
            1 => Self::TooSlow,
            2 => Self::Ok,
            _ => Self::Reserved,
        }
    }
}

impl fmt::Display for SpeedCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotApplicable => write!(f, "Not Applicable"),
            Self::TooSlow => write!(f, "Too Slow"),
            Self::Ok => write!(f, "OK"),
            Self::Reserved => write!(f, "Reserved"),
        }
    }
}

/// Fitness equipment type from page 16
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquipmentType {
    /// General fitness equipment
    General = 16,
    /// Treadmill
    Treadmill = 19,
    /// Elliptical
    Elliptical = 20,
    /// Stationary bike
    StationaryBike = 21,
    /// Rower
    Rower = 22,
    /// Climber
    Climber = 23,
    /// Nordic skier
    NordicSkier = 24,
    /// Trainer or stationary bike with resistance control
    Trainer = 25,
    /// Unrecognized equipment type
    Unknown = 255,
}

impl From<u8> for EquipmentType {
    fn from(value: u8) -> Self {
        match value {
            16 => Self::General,
            19 => Self::Treadmill,
            20 => Self::Elliptical,
            21 => Self::StationaryBike,
            22 => Self::Rower,
            23 => Self::Climber,
            24 => Self::NordicSkier,
            25 => Self::Trainer,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for EquipmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General => write!(f, "General"),
            Self::Treadmill => write!(f, "Treadmill"),
            Self::Elliptical => write!(f, "Elliptical"),
            Self::StationaryBike => write!(f, "Stationary Bike"),
            Self::Rower => write!(f, "Rower"),
            Self::Climber => write!(f, "Climber"),
            Self::NordicSkier => write!(f, "Nordic Skier"),
            Self::Trainer => write!(f, "Trainer"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Fitness equipment state machine value (bits 4-6 of the last payload byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeState {
    /// Reserved value
    Reserved = 0,
    /// Asleep or off
    AsleepOff = 1,
    /// Ready
    Ready = 2,
    /// In use
    InUse = 3,
    /// Finished or paused
    Finished = 4,
}

impl From<u8> for FeState {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::AsleepOff,
            2 => Self::Ready,
            3 => Self::InUse,
            4 => Self::Finished,
            _ => Self::Reserved,
        }
    }
}

impl fmt::Display for FeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reserved => write!(f, "Reserved"),
            Self::AsleepOff => write!(f, "Asleep"),
            Self::Ready => write!(f, "Ready"),
            Self::InUse => write!(f, "In Use"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}

/// Target power limit flags of page 25
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetPowerLimits {
    /// Operating at the target power, or no target set
    AtTarget = 0,
    /// Cadence or speed too low to reach the target power
    SpeedTooLow = 1,
    /// Cadence or speed too high to reach the target power
    SpeedTooHigh = 2,
    /// Power limit cannot be determined
    Undetermined = 3,
}

impl From<u8> for TargetPowerLimits {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::AtTarget,
            1 => Self::SpeedTooLow,
            2 => Self::SpeedTooHigh,
            _ => Self::Undetermined,
        }
    }
}

/// Outcome of the last control command, from the page 71 status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandResult {
    /// Command applied
    Pass,
    /// Command failed
    Fail,
    /// Command not supported
    NotSupported,
    /// Command rejected
    Rejected,
    /// Command still pending
    Pending,
    /// No command received yet
    Uninitialized,
    /// Reserved status value
    Reserved(u8),
}

impl From<u8> for CommandResult {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Pass,
            1 => Self::Fail,
            2 => Self::NotSupported,
            3 => Self::Rejected,
            4 => Self::Pending,
            255 => Self::Uninitialized,
            other => Self::Reserved(other),
        }
    }
}
