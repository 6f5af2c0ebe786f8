/// Fractional bits removed after multiplying by the scale factor
pub const SCALE_SHIFT: u32 = 12;

/// Source of one output axis. A negative mapping flips the sign of the
/// routed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, num_enum::IntoPrimitive, num_enum::TryFromPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AxisMap {
    Unused = 0,
    PlusX = 1,
    MinusX = 2,
    PlusY = 3,
    MinusY = 4,
    PlusZ = 5,
    MinusZ = 6,
}

impl AxisMap {
    /// Pick the input for this mapping out of a raw `[x, y, z]` sample.
    pub const fn route(self, raw: &[i32; 3]) -> i32 {
        match self {
            AxisMap::Unused => 0,
            AxisMap::PlusX => raw[0],
            AxisMap::MinusX => raw[0].wrapping_neg(),
            AxisMap::PlusY => raw[1],
            AxisMap::MinusY => raw[1].wrapping_neg(),
            AxisMap::PlusZ => raw[2],
            AxisMap::MinusZ => raw[2].wrapping_neg(),
        }
    }
}

/// How the sensor encodes its readings within the significant bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataType {
    Unsigned,
    SignedTwoComp,
}

/// Scale one axis reading.
///
/// The offset is subtracted first, then the value is masked to its
/// significant bits and sign extended when the sensor is two's complement.
/// The product with `scale` is rounded, shifted down by [`SCALE_SHIFT`] and
/// saturated to the `i32` range.
pub fn scale_sensor_data(data: i32, offset: i32, mask: u32, scale: i32, data_type: DataType) -> i32 {
    let mut value = (data.wrapping_sub(offset) as u32) & mask;

    if data_type == DataType::SignedTwoComp && value & ((!mask) >> 1) != 0 {
        value |= !mask;
    }

    let product = value as i32 as i64 * scale as i64;
    let rounded = (product + (1 << (SCALE_SHIFT - 1))) >> SCALE_SHIFT;

    rounded.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}
