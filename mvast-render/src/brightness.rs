use mvast_core::FrameBuffer;

/// Per-channel lookup table for `round(c * factor)` clamped to 0..=255.
pub fn brightness_lut(factor: f64) -> [u8; 256] {
    let mut lut = [0u8; 256];
    if factor.is_nan() || factor <= 0.0 {
        return lut;
    }
    for (c, slot) in lut.iter_mut().enumerate() {
        *slot = (c as f64 * factor).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Scales the colour channels of `frame` by `factor`, leaving alpha alone.
///
/// A factor of 1.0 or more returns the source frame itself (sharing its
/// storage); 0.0 or less, and NaN, yield black.
pub fn adjust_brightness(frame: &FrameBuffer, factor: f64) -> FrameBuffer {
    if factor >= 1.0 {
        return frame.clone();
    }
    let lut = brightness_lut(factor);
    let mut out = Vec::with_capacity(frame.data().len());
    for px in frame.data().chunks_exact(4) {
        out.extend_from_slice(&[lut[px[0] as usize], lut[px[1] as usize], lut[px[2] as usize], px[3]]);
    }
    // Length is preserved, so the conversion cannot fail.
    FrameBuffer::from_rgba(frame.width(), frame.height(), out)
        .unwrap_or_else(|| FrameBuffer::solid(frame.width(), frame.height(), [0, 0, 0, 255]))
}
