use crate::errors::ConversionError;

/// Largest representable fixed-point time
pub const MAX_TIME: i64 = i64::MAX;

/// Fractional bits dropped after the multiply. The coefficient carries 32
/// fractional bits and the result carries `Q_TIME`.
const TIME_SHIFT: u32 = 32 - crate::config::Q_TIME;

/// Seconds per counter tick as an unsigned Q32 coefficient.
pub const fn tick_coefficient(us_per_tick: u32) -> u32 {
    ((us_per_tick as u64) * (1u64 << 32) / 1_000_000) as u32
}

/// Extends a free running 32-bit counter with a count of observed wraps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimestampExtender {
    last: u32,
    extension: u32,
}

impl TimestampExtender {
    pub const fn new() -> Self {
        Self {
            last: 0,
            extension: 0,
        }
    }

    /// Record a new raw stamp and return the `(high, low)` counter words. A
    /// wrap is counted when the previous stamp was in the upper half of the
    /// range and this one is not.
    pub fn extend(&mut self, raw: u32) -> (u32, u32) {
        if (self.last as i32) < 0 && (raw as i32) >= 0 {
            self.extension = self.extension.wrapping_add(1);
        }
        self.last = raw;
        (self.extension, raw)
    }

    pub fn extension(&self) -> u32 {
        self.extension
    }
}

/// Convert a 64-bit tick count to fixed-point seconds. The coefficient is
/// treated as positive. The result is rounded and fails when it no longer
/// fits a signed 64-bit time value.
pub fn time_from_counter(coefficient: u32, high: u32, low: u32) -> Result<i64, ConversionError> {
    let coefficient = if coefficient & 0x8000_0000 != 0 {
        coefficient.wrapping_neg()
    } else {
        coefficient
    };

    let count = ((high as u64) << 32) | low as u64;
    let product = count as u128 * coefficient as u128;
    let time = (product + (1 << (TIME_SHIFT - 1))) >> TIME_SHIFT;

    i64::try_from(time).map_err(|_| ConversionError::TimeOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COEF: u32 = tick_coefficient(25);

    #[test]
    fn test_coefficient() {
        assert_eq!(COEF, 107374);
    }

    #[test]
    fn test_rollover_counted_once() {
        let mut ext = TimestampExtender::new();
        let times: [i64; 3] = [0xFFFF_FFF0, 0xFFFF_FFFF, 0x0000_0005].map(|raw| {
            let (high, low) = ext.extend(raw);
            time_from_counter(COEF, high, low).unwrap()
        });

        assert_eq!(ext.extension(), 1);
        assert!(times[0] < times[1]);
        assert!(times[1] < times[2]);
    }

    #[test]
    fn test_no_rollover_in_lower_half() {
        let mut ext = TimestampExtender::new();
        for raw in [100, 200, 300, 0x7FFF_FFFF] {
            ext.extend(raw);
        }
        assert_eq!(ext.extension(), 0);
    }

    #[test]
    fn test_one_second() {
        // 40000 ticks of 25 us, rounded into Q24
        let time = time_from_counter(COEF, 0, 40_000).unwrap();
        let one_second = 1i64 << 24;
        assert!((time - one_second).abs() < 64);
    }

    #[test]
    fn test_negative_coefficient_normalised() {
        assert_eq!(
            time_from_counter(COEF.wrapping_neg(), 0, 1000),
            time_from_counter(COEF, 0, 1000)
        );
    }

    #[test]
    fn test_overflow() {
        assert_eq!(
            time_from_counter(u32::MAX >> 1, u32::MAX, u32::MAX),
            Err(ConversionError::TimeOverflow)
        );
    }
}
