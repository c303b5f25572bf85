#[inline]
pub fn sat_add_i16(a: i16, b: i16) -> i16 {
    let s = a as i32 + b as i32;
    if s > i16::MAX as i32 {
        i16::MAX
    } else if s < i16::MIN as i32 {
        i16::MIN
    } else {
        s as i16
    }
}

/// Scale a sample by a linear gain, clamping to the i16 range.
#[inline]
pub fn apply_gain(sample: i16, gain: f32) -> i16 {
    (sample as f32 * gain).clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Widen or narrow a signed PCM sample of `bits` to 16 bits.
#[inline]
pub fn to_i16(sample: i32, bits: u16) -> i16 {
    if bits <= 16 {
        (sample << (16 - bits)) as i16
    } else {
        (sample >> (bits - 16)) as i16
    }
}
