use std::f64::consts::PI;

pub fn db_to_gain(db: f64) -> f64 {
    10.0f64.powf(db / 20.0)
}

pub fn gain_to_db(gain: f64) -> f64 {
    20.0 * gain.max(1e-300).log10()
}

#[inline]
pub fn hz_to_rad(hz: f64) -> f64 {
    2.0 * PI * hz
}

/// Round to the nearest multiple of 1/factor (ties away from zero, no DC bias).
#[inline]
pub fn quantize(value: f64, factor: f64) -> f64 {
    (value * factor).round() / factor
}

/// Normalized digital frequency in rad/sample.
#[inline]
pub fn digital_omega(freq_hz: f64, dt: f64) -> f64 {
    hz_to_rad(freq_hz) * dt
}
