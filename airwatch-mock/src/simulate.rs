//! Diurnal baselines for the simulated room, sampled by day fraction
//! (0.0 = midnight, 0.5 = noon).

use std::f64::consts::PI;

/// Indoor temperature in °C: coolest before dawn, peaking mid-afternoon.
pub fn simulated_temperature(day_fraction: f64) -> f64 {
    let radians = (day_fraction - 0.25) * 2.0 * PI;
    21.0 + radians.sin() * 4.0
}

/// Relative humidity %: runs inverse to the temperature curve.
pub fn simulated_humidity(day_fraction: f64) -> f64 {
    let radians = (day_fraction - 0.25) * 2.0 * PI;
    (55.0 - radians.sin() * 12.0).clamp(0.0, 100.0)
}

/// PM2.5 in µg/m³: builds through the day, settles overnight.
pub fn simulated_pm25(day_fraction: f64) -> f64 {
    let radians = (day_fraction - 0.4) * 2.0 * PI;
    (40.0 + radians.sin() * 20.0).max(0.0)
}

/// Noise in dB: quiet overnight, loud through the working day.
pub fn simulated_noise(day_fraction: f64) -> f64 {
    let daylight = ((day_fraction - 0.25) * 2.0 * PI).sin().max(0.0);
    35.0 + daylight * 25.0
}
