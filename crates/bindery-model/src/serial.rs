//! Excel serial-day date codec.
//!
//! Excel's 1900 date system counts days from a nominal 1900-01-01 epoch and
//! inherits the Lotus 1-2-3 bug that treats 1900 as a leap year: serial 60 is
//! the non-existent 1900-02-29. Anchoring the conversion on 1899-12-31 (the
//! day before the nominal epoch) and adding a fixed one-day bias reproduces
//! the buggy numbering for every date from 1900-03-01 onward, which is what
//! consuming applications expect.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone};

/// Round-trip tolerance in serial days (~14 minutes).
///
/// Serial values are rendered with fixed decimal precision and day fractions
/// accumulate floating-point error, so conversion is not bit-exact.
pub const SERIAL_TOLERANCE_DAYS: f64 = 0.01;

/// Correction applied on top of the 1899-12-31 anchor so that 1900-03-01
/// lands on serial 61.
const SERIAL_BIAS_DAYS: f64 = 1.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Decimal places used when a serial value is embedded in a numeric cell.
const SERIAL_RENDER_PRECISION: usize = 4;

fn epoch_anchor() -> NaiveDateTime {
    // The day before the format's nominal 1900-01-01 epoch.
    NaiveDate::from_ymd_opt(1899, 12, 31)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("static epoch anchor")
}

/// Convert a wall-clock timestamp to its serial-day encoding.
pub fn to_serial(dt: NaiveDateTime) -> f64 {
    let elapsed = dt - epoch_anchor();
    elapsed.num_milliseconds() as f64 / MILLIS_PER_DAY + SERIAL_BIAS_DAYS
}

/// Convert a zoned timestamp to its serial-day encoding.
///
/// Serial values encode local wall-clock time, so the instant is first
/// projected into its own time zone.
pub fn to_serial_in<Tz: TimeZone>(t: &DateTime<Tz>) -> f64 {
    to_serial(t.naive_local())
}

/// Exact inverse of [`to_serial`], re-applying the bias in the opposite
/// direction. Returns `None` for serials outside the representable range.
pub fn from_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let days = serial - SERIAL_BIAS_DAYS;
    let millis = (days * MILLIS_PER_DAY).round();
    if millis < i64::MIN as f64 || millis > i64::MAX as f64 {
        return None;
    }
    epoch_anchor().checked_add_signed(Duration::milliseconds(millis as i64))
}

/// Inverse of [`to_serial_in`]: interpret a serial as wall-clock time in the
/// given zone. Returns `None` when the local time is unrepresentable (DST
/// gaps) or out of range.
pub fn from_serial_in<Tz: TimeZone>(serial: f64, tz: &Tz) -> Option<DateTime<Tz>> {
    let naive = from_serial(serial)?;
    tz.from_local_datetime(&naive).earliest()
}

/// Fixed-precision rendering of a timestamp's serial value, as embedded in
/// numeric date cells.
pub fn serial_string(dt: NaiveDateTime) -> String {
    format!("{:.*}", SERIAL_RENDER_PRECISION, to_serial(dt))
}
