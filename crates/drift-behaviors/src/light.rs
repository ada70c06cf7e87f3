//! Surface irradiance from solar height.
//!
//! Empirical model after Skartveit & Olseth (1988): full daylight scales
//! with the sine of the solar height relative to its noon value, and
//! three linear twilight bands (civil, nautical, astronomical) decay to
//! a constant night level.

use std::f64::consts::PI;

use chrono::{DateTime, Datelike, Timelike};
use drift_core::SimTime;

/// Clear-sky irradiance at noon, µE m⁻² s⁻¹.
pub const MAX_LIGHT: f64 = 1500.0;

/// Irradiance at sunrise and sunset.
const TWILIGHT: f64 = 5.76;
/// Irradiance at the end of civil twilight (sun 6° below the horizon).
const CIVIL: f64 = 0.048;
/// Irradiance at the end of nautical twilight (12°).
const NAUTICAL: f64 = 1.15e-4;
/// Night irradiance, reached at 18°.
const NIGHT: f64 = 1.15e-5;

const RAD: f64 = PI / 180.0;

/// Surface irradiance in µE m⁻² s⁻¹ at `time` (UTC) and position
/// `lon`, `lat` in degrees.
///
/// Only the day of year and the whole UTC hour of `time` are used. A
/// time outside the calendar range, or a NaN position, yields NaN.
pub fn surface_light(time: SimTime, lon: f64, lat: f64) -> f64 {
    let Some(dt) = DateTime::from_timestamp(time.seconds(), 0) else {
        return f64::NAN;
    };
    let yday = f64::from(dt.ordinal());
    let hours = f64::from(dt.hour());
    let phi = lat * RAD;

    // Solar declination.
    let a1 = 0.9856 * RAD;
    let a2 = 1.9171 * RAD;
    let sin_delta = 0.3979 * (a1 * (yday - 80.0) + a2 * ((a1 * yday).sin() - 0.98112)).sin();
    let cos_delta = (1.0 - sin_delta * sin_delta).sqrt();

    // True solar time in degrees, zero with the sun in the north.
    let tst = hours * 15.0 + lon - 0.4083 * (a1 * (yday - 80.0)).cos()
        - 1.7958 * (a1 * (yday - 80.0)).cos()
        + 2.4875 * (1.0712 * RAD * (yday - 80.0)).sin();

    let sin_height = sin_delta * phi.sin() - cos_delta * phi.cos() * (tst * RAD).cos();
    let sin_noon = sin_delta * phi.sin() + cos_delta * phi.cos();
    from_height(sin_height.clamp(-1.0, 1.0).asin() / RAD, sin_height, sin_noon)
}

/// Irradiance for a solar height in degrees.
fn from_height(height: f64, sin_height: f64, sin_noon: f64) -> f64 {
    if height >= 0.0 {
        MAX_LIGHT * (sin_height / sin_noon) + TWILIGHT
    } else if height >= -6.0 {
        (TWILIGHT - CIVIL) / 6.0 * (6.0 + height) + CIVIL
    } else if height >= -12.0 {
        (CIVIL - NAUTICAL) / 6.0 * (12.0 + height) + NAUTICAL
    } else if height >= -18.0 {
        (NAUTICAL - NIGHT) / 6.0 * (18.0 + height) + NIGHT
    } else if height < -18.0 {
        NIGHT
    } else {
        f64::NAN
    }
}
