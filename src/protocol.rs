use bytes::{BufMut, Bytes, BytesMut};

/// Total frame size in bytes
pub const MESSAGE_SIZE: usize = 13;

/// Page number plus seven data bytes
pub const PAYLOAD_SIZE: usize = 8;

/// Sync byte opening every ANT frame
pub const SYNC: u8 = 0xA4;

/// Length byte of a content frame (page, seven data bytes, checksum)
pub const CONTENT_LENGTH: u8 = 9;

/// ANT acknowledged data message id used for outbound control pages
pub const MSG_ACKNOWLEDGED_DATA: u8 = 0x4F;

/// ANT channel carried in outbound control pages
pub const FEC_CHANNEL: u8 = 0x05;

/// "No data" filler for unused payload bytes
pub const NO_DATA: u8 = 0xFF;

/// Offset of the page number within a frame
const PAGE_OFFSET: usize = 4;

/// FE-C data page numbers
pub mod page {
    /// Calibration request and response
    pub const CALIBRATION: u8 = 1;
    /// Calibration in progress
    pub const CALIBRATION_PROGRESS: u8 = 2;
    /// General FE data
    pub const GENERAL_FE_DATA: u8 = 16;
    /// General settings
    pub const GENERAL_SETTINGS: u8 = 17;
    /// Specific stationary bike data
    pub const STATIONARY_BIKE_DATA: u8 = 21;
    /// Specific trainer data
    pub const TRAINER_DATA: u8 = 25;
    /// Specific trainer torque data
    pub const TRAINER_TORQUE_DATA: u8 = 26;
    /// Basic resistance
    pub const BASIC_RESISTANCE: u8 = 48;
    /// Target power
    pub const TARGET_POWER: u8 = 49;
    /// Wind resistance
    pub const WIND_RESISTANCE: u8 = 50;
    /// Track resistance
    pub const TRACK_RESISTANCE: u8 = 51;
    /// FE capabilities
    pub const FE_CAPABILITIES: u8 = 54;
    /// User configuration
    pub const USER_CONFIGURATION: u8 = 55;
    /// Request data page
    pub const REQUEST_DATA: u8 = 70;
    /// Command status
    pub const COMMAND_STATUS: u8 = 71;
    /// Manufacturer's identification
    pub const MANUFACTURER_ID: u8 = 80;
    /// Product information
    pub const PRODUCT_INFORMATION: u8 = 81;
}

/// XOR of all bytes
#[must_use]
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, b| acc ^ b)
}

/// Framing gates shared by the decoder and the dispatcher
///
/// A buffer is well formed when it is longer than four bytes, XORs to zero,
/// starts with [`SYNC`] and carries exactly `length` bytes after the header.
#[must_use]
pub fn is_well_formed(data: &[u8]) -> bool {
    if data.len() <= PAGE_OFFSET {
        return false;
    }
    if checksum(data) != 0 {
        return false;
    }
    if data[0] != SYNC {
        return false;
    }
    data[PAGE_OFFSET..].len() == usize::from(data[1])
}

/// A checksummed 13-byte FE-C frame
///
/// Layout: `[sync, length, msg_id, channel, page, data[7], checksum]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WirePacket([u8; MESSAGE_SIZE]);

impl WirePacket {
    /// Build an outbound control frame around an 8-byte payload
    #[must_use]
    pub fn from_payload(payload: [u8; PAYLOAD_SIZE]) -> Self {
        let mut frame = [0u8; MESSAGE_SIZE];
        frame[..PAGE_OFFSET].copy_from_slice(&[
            SYNC,
            CONTENT_LENGTH,
            MSG_ACKNOWLEDGED_DATA,
            FEC_CHANNEL,
        ]);
        frame[PAGE_OFFSET..MESSAGE_SIZE - 1].copy_from_slice(&payload);
        frame[MESSAGE_SIZE - 1] = checksum(&frame[..MESSAGE_SIZE - 1]);
        Self(frame)
    }

    /// Validate a received buffer
    ///
    /// Returns `None` unless the buffer passes [`is_well_formed`] and its
    /// length byte is that of a content frame.
    #[must_use]
    pub fn parse(data: &[u8]) -> Option<Self> {
        if !is_well_formed(data) || data[1] != CONTENT_LENGTH {
            return None;
        }
        let frame: [u8; MESSAGE_SIZE] = data.try_into().ok()?;
        Some(Self(frame))
    }

    /// Raw frame bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; MESSAGE_SIZE] {
        &self.0
    }

    /// Frame bytes for a transport write
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(MESSAGE_SIZE);
        buf.put_slice(&self.0);
        buf.freeze()
    }

    /// Message id byte
    #[must_use]
    pub const fn message_id(&self) -> u8 {
        self.0[2]
    }

    /// Channel byte
    #[must_use]
    pub const fn channel(&self) -> u8 {
        self.0[3]
    }

    /// Data page number
    #[must_use]
    pub const fn page(&self) -> u8 {
        self.0[PAGE_OFFSET]
    }

    /// Page number followed by the seven data bytes
    #[must_use]
    pub fn payload(&self) -> &[u8; PAYLOAD_SIZE] {
        self.0[PAGE_OFFSET..MESSAGE_SIZE - 1]
            .try_into()
            .unwrap_or(&[0; PAYLOAD_SIZE])
    }

    /// Trailing checksum byte
    #[must_use]
    pub const fn checksum(&self) -> u8 {
        self.0[MESSAGE_SIZE - 1]
    }

    /// Space separated lowercase hex, e.g. `a4 09 4f ...`
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.0
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl AsRef<[u8]> for WirePacket {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for WirePacket {
    type Error = ();

    fn try_from(data: &[u8]) -> std::result::Result<Self, Self::Error> {
        Self::parse(data).ok_or(())
    }
}

/// Storage width of a payload field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    /// Single byte
    U8,
    /// Two bytes, least significant first
    U16Le,
    /// Four bytes, most significant first
    U32Be,
    /// Four bytes, least significant first
    U32Le,
}

impl Width {
    const fn len(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16Le => 2,
            Self::U32Be | Self::U32Le => 4,
        }
    }
}

/// Layout of one field inside an 8-byte page payload
///
/// A field reads `width` bytes at `offset`, takes `bits` bits starting at
/// `shift`, optionally sign-extends them, and converts the result to a
/// physical value as `raw * scale + bias`. Encoding is the exact inverse,
/// `round((value - bias) / scale)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Field {
    /// Index into the payload (0 is the page number)
    pub offset: usize,
    /// Storage width
    pub width: Width,
    /// Bit position of the least significant bit of the field
    pub shift: u32,
    /// Number of bits in the field
    pub bits: u32,
    /// Physical units per raw step
    pub scale: f32,
    /// Physical value of raw zero
    pub bias: f32,
    /// Two's complement field
    pub signed: bool,
}

impl Field {
    const fn whole(offset: usize, width: Width, bits: u32) -> Self {
        Self {
            offset,
            width,
            shift: 0,
            bits,
            scale: 1.0,
            bias: 0.0,
            signed: false,
        }
    }

    /// A whole byte
    #[must_use]
    pub const fn u8(offset: usize) -> Self {
        Self::whole(offset, Width::U8, 8)
    }

    /// A little-endian 16-bit word
    #[must_use]
    pub const fn u16_le(offset: usize) -> Self {
        Self::whole(offset, Width::U16Le, 16)
    }

    /// A big-endian 32-bit word
    #[must_use]
    pub const fn u32_be(offset: usize) -> Self {
        Self::whole(offset, Width::U32Be, 32)
    }

    /// A little-endian 32-bit word
    #[must_use]
    pub const fn u32_le(offset: usize) -> Self {
        Self::whole(offset, Width::U32Le, 32)
    }

    /// Restrict to `bits` bits starting at `shift`
    #[must_use]
    pub const fn bits(mut self, shift: u32, bits: u32) -> Self {
        self.shift = shift;
        self.bits = bits;
        self
    }

    /// Physical units per raw step
    #[must_use]
    pub const fn scaled(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// Physical value of raw zero
    #[must_use]
    pub const fn biased(mut self, bias: f32) -> Self {
        self.bias = bias;
        self
    }

    /// Interpret the raw bits as two's complement
    #[must_use]
    pub const fn signed(mut self) -> Self {
        self.signed = true;
        self
    }

    const fn mask(&self) -> u32 {
        if self.bits >= 32 {
            u32::MAX
        } else {
            (1 << self.bits) - 1
        }
    }

    fn word(&self, payload: &[u8; PAYLOAD_SIZE]) -> u32 {
        let b = &payload[self.offset..self.offset + self.width.len()];
        match self.width {
            Width::U8 => u32::from(b[0]),
            Width::U16Le => u32::from(u16::from_le_bytes([b[0], b[1]])),
            Width::U32Be => u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
            Width::U32Le => u32::from_le_bytes([b[0], b[1], b[2], b[3]]),
        }
    }

    /// Unsigned raw bits of the field
    #[must_use]
    pub fn raw(&self, payload: &[u8; PAYLOAD_SIZE]) -> u32 {
        (self.word(payload) >> self.shift) & self.mask()
    }

    /// Raw bits as a byte, for fields no wider than eight bits
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn raw_u8(&self, payload: &[u8; PAYLOAD_SIZE]) -> u8 {
        (self.raw(payload) & 0xFF) as u8
    }

    /// Raw bits as a 16-bit word, for fields no wider than sixteen bits
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn raw_u16(&self, payload: &[u8; PAYLOAD_SIZE]) -> u16 {
        (self.raw(payload) & 0xFFFF) as u16
    }

    /// Raw value with sign extension applied
    #[must_use]
    pub fn raw_signed(&self, payload: &[u8; PAYLOAD_SIZE]) -> i64 {
        let raw = i64::from(self.raw(payload));
        if self.signed && self.bits < 64 && raw & (1 << (self.bits - 1)) != 0 {
            raw - (1 << self.bits)
        } else {
            raw
        }
    }

    /// Physical value of the field
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn value(&self, payload: &[u8; PAYLOAD_SIZE]) -> f32 {
        self.raw_signed(payload) as f32 * self.scale + self.bias
    }

    /// Raw step count for a physical value
    ///
    /// The caller validates the range first; the result is saturated to the
    /// field width.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn quantize(&self, value: f32) -> u32 {
        let steps = ((value - self.bias) / self.scale).round();
        if steps <= 0.0 {
            0
        } else {
            (steps as u32).min(self.mask())
        }
    }

    /// Store raw bits, leaving bits outside the field untouched
    #[allow(clippy::cast_possible_truncation)]
    pub fn put(&self, payload: &mut [u8; PAYLOAD_SIZE], raw: u32) {
        let mask = self.mask() << self.shift;
        let word = (self.word(payload) & !mask) | ((raw << self.shift) & mask);
        let dst = &mut payload[self.offset..self.offset + self.width.len()];
        match self.width {
            Width::U8 => dst[0] = (word & 0xFF) as u8,
            Width::U16Le => dst.copy_from_slice(&((word & 0xFFFF) as u16).to_le_bytes()),
            Width::U32Be => dst.copy_from_slice(&word.to_be_bytes()),
            Width::U32Le => dst.copy_from_slice(&word.to_le_bytes()),
        }
    }

    /// Quantize a physical value and store it
    pub fn encode(&self, payload: &mut [u8; PAYLOAD_SIZE], value: f32) {
        self.put(payload, self.quantize(value));
    }
}

/// Field layouts of every supported page
///
/// Offsets index the 8-byte payload, where byte 0 is the page number.
pub mod layout {
    use super::Field;

    /// m/s per raw step of the 0.001 m/s speed fields
    const MM_PER_S: f32 = 0.001;
    /// km/h per raw step of the 0.001 m/s speed fields
    const KMH_PER_MM_S: f32 = MM_PER_S * 3.6;

    /// Page 1 and 2 calibration feature / status byte
    pub const CALIBRATION_FEATURES: Field = Field::u8(1);
    /// Page 1 and 2 temperature, 0.5 degC steps from -25 degC
    pub const CALIBRATION_TEMPERATURE: Field = Field::u8(3).scaled(0.5).biased(-25.0);
    /// Page 1 zero offset
    pub const ZERO_OFFSET: Field = Field::u16_le(4);
    /// Page 1 spin down time in ms
    pub const SPINDOWN_TIME: Field = Field::u16_le(6);
    /// Page 1 byte following the feature byte, reserved
    pub const CALIBRATION_RESERVED: Field = Field::u8(2);

    /// Page 2 speed condition
    pub const SPEED_CONDITION: Field = Field::u8(2).bits(6, 2);
    /// Page 2 temperature condition
    pub const TEMPERATURE_CONDITION: Field = Field::u8(2).bits(4, 2);
    /// Page 2 target speed in km/h
    pub const TARGET_SPEED: Field = Field::u16_le(4).scaled(KMH_PER_MM_S);
    /// Page 2 target spin down time in ms
    pub const TARGET_SPINDOWN_TIME: Field = Field::u16_le(6);

    /// Bits 4-6 of the last payload byte on pages 16, 17, 21, 25 and 26
    pub const FE_STATE: Field = Field::u8(7).bits(4, 3);
    /// Page 16 lap toggle
    pub const LAP_TOGGLE: Field = Field::u8(7).bits(7, 1);
    /// Page 16 equipment type
    pub const EQUIPMENT_TYPE: Field = Field::u8(1).bits(0, 5);
    /// Page 16 elapsed time in seconds
    pub const ELAPSED_TIME: Field = Field::u8(2).scaled(0.25);
    /// Page 16 distance travelled in metres
    pub const DISTANCE: Field = Field::u8(3);
    /// Page 16 speed in km/h
    pub const SPEED: Field = Field::u16_le(4).scaled(KMH_PER_MM_S);
    /// Page 16 heart rate in bpm
    pub const HEART_RATE: Field = Field::u8(6);
    /// Page 16 capability nibble
    pub const GENERAL_CAPABILITIES: Field = Field::u8(7).bits(0, 4);

    /// Page 17 cycle length in metres
    pub const CYCLE_LENGTH: Field = Field::u8(3).scaled(0.01);
    /// Page 17 incline in percent, signed
    pub const INCLINE: Field = Field::u16_le(4).signed().scaled(0.01);
    /// Page 17 resistance level in percent
    pub const RESISTANCE_LEVEL: Field = Field::u8(6).scaled(0.5);

    /// Page 21 cadence in rpm
    pub const BIKE_CADENCE: Field = Field::u8(4);
    /// Page 21 instantaneous power in watts
    pub const BIKE_POWER: Field = Field::u16_le(5);

    /// Page 25 and 26 update event count
    pub const UPDATE_EVENT_COUNT: Field = Field::u8(1);
    /// Page 25 cadence in rpm
    pub const TRAINER_CADENCE: Field = Field::u8(2);
    /// Page 25 accumulated power in watts
    pub const ACCUMULATED_POWER: Field = Field::u16_le(3);
    /// Page 25 instantaneous power, 12 bits spanning bytes 5 and 6
    pub const INSTANTANEOUS_POWER: Field = Field::u16_le(5).bits(0, 12);
    /// Page 25 trainer status, high nibble of byte 6
    pub const TRAINER_STATUS: Field = Field::u8(6).bits(4, 4);
    /// Page 25 target power limit flags, bits 2-3 are reserved
    pub const TARGET_POWER_LIMITS: Field = Field::u8(7).bits(0, 2);

    /// Page 26 wheel revolutions
    pub const WHEEL_REVOLUTIONS: Field = Field::u8(2);
    /// Page 26 accumulated wheel period in seconds
    pub const WHEEL_PERIOD: Field = Field::u16_le(3).scaled(1.0 / 2048.0);
    /// Page 26 accumulated torque in Nm
    pub const TORQUE: Field = Field::u16_le(5).scaled(1.0 / 32.0);

    /// Page 48 total resistance in percent
    pub const BASIC_RESISTANCE: Field = Field::u8(7).scaled(0.5);

    /// Page 49 target power in watts
    pub const TARGET_POWER: Field = Field::u16_le(6).scaled(0.25);

    /// Page 50 wind resistance coefficient in kg/m
    pub const WIND_COEFFICIENT: Field = Field::u8(5).scaled(0.01);
    /// Page 50 wind speed in km/h, offset by 127
    pub const WIND_SPEED: Field = Field::u8(6).biased(-127.0);
    /// Page 50 drafting factor
    pub const DRAFTING_FACTOR: Field = Field::u8(7).scaled(0.01);

    /// Page 51 grade in percent, offset by 200
    pub const GRADE: Field = Field::u16_le(5).scaled(0.01).biased(-200.0);
    /// Page 51 rolling resistance coefficient
    pub const ROLLING_RESISTANCE: Field = Field::u8(7).scaled(5e-5);

    /// Page 54 maximum resistance in newtons
    pub const MAX_RESISTANCE: Field = Field::u16_le(5);
    /// Page 54 control capabilities
    pub const FE_CAPABILITIES: Field = Field::u8(7);

    /// Page 55 user weight in kg
    pub const USER_WEIGHT: Field = Field::u16_le(1).scaled(0.01);
    /// Page 55 wheel diameter offset in mm
    pub const WHEEL_DIAMETER_OFFSET: Field = Field::u8(4).bits(0, 4);
    /// Page 55 bicycle weight in kg, 12 bits spanning bytes 4 and 5
    pub const BICYCLE_WEIGHT: Field = Field::u16_le(4).bits(4, 12).scaled(0.05);
    /// Page 55 wheel diameter in metres
    pub const WHEEL_DIAMETER: Field = Field::u8(6).scaled(0.01);
    /// Page 55 gear ratio
    pub const GEAR_RATIO: Field = Field::u8(7).scaled(0.03);

    /// Page 70 requested transmission response
    pub const REQUEST_RESPONSE: Field = Field::u8(5);
    /// Page 70 requested page number
    pub const REQUESTED_PAGE: Field = Field::u8(6);
    /// Page 70 command type
    pub const REQUEST_COMMAND_TYPE: Field = Field::u8(7);

    /// Page 71 last received command id
    pub const LAST_COMMAND_ID: Field = Field::u8(1);
    /// Page 71 sequence number
    pub const SEQUENCE: Field = Field::u8(2);
    /// Page 71 command status
    pub const COMMAND_STATUS: Field = Field::u8(3);
    /// Page 71 response data, most significant byte first
    pub const COMMAND_DATA: Field = Field::u32_be(4);

    /// Page 80 hardware revision
    pub const HW_REVISION: Field = Field::u8(3);
    /// Page 80 manufacturer id
    pub const MANUFACTURER_ID: Field = Field::u16_le(4);
    /// Page 80 model number
    pub const MODEL_NUMBER: Field = Field::u16_le(6);

    /// Page 81 supplemental software revision
    pub const SW_REVISION_SUPPLEMENTAL: Field = Field::u8(2);
    /// Page 81 main software revision
    pub const SW_REVISION_MAIN: Field = Field::u8(3);
    /// Page 81 serial number, least significant byte first
    pub const SERIAL_NUMBER: Field = Field::u32_le(4);
}
