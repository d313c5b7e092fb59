//! This module contains the pure, stateless kernels for calendar and
//! clock-of-day conversions.
//!
//! The source database stores dates as a packed decimal integer
//! (`(year - 1900) * 10000 + month * 100 + day`) and times/timestamps as
//! packed little-endian structures whose seconds field is pre-scaled to
//! microseconds. The wire wants flat epoch-relative integers, so these
//! kernels decode the packing and run the proleptic-Gregorian day-count
//! arithmetic (Howard Hinnant's `days_from_civil` algorithm).

//==================================================================================
// 1. Civil Calendar Arithmetic
//==================================================================================

/// Days from 1970-01-01 to the given proleptic-Gregorian civil date.
///
/// Negative results are valid and represent dates before the epoch.
pub fn days_from_civil(year: i32, month: u32, day: u32) -> i64 {
    let mut y = year;
    let m = month as i32;
    y -= (m <= 2) as i32;
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let doy = (153 * (m + if m > 2 { -3 } else { 9 }) + 2) / 5 + day as i32 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era as i64 * 146_097 + doe as i64 - 719_468
}

//==================================================================================
// 2. Packed Source Decodings
//==================================================================================

/// Decodes a packed date integer into a day count relative to 1970-01-01.
///
/// The packing is `(year - 1900) * 10000 + month * 100 + day`. For years
/// before 1900 the whole integer is negative and the month/day remainder
/// wraps negative with it, so the year offset is borrowed down by one and
/// the remainder re-shifted into range before splitting.
pub fn packed_date_to_epoch_days(packed: i32) -> i32 {
    let mut year_offset = packed / 10_000;
    let mut month_day = packed % 10_000;
    if month_day < 0 {
        year_offset -= 1;
        month_day += 10_000;
    }
    let year = year_offset + 1900;
    let month = (month_day / 100) as u32;
    let day = (month_day % 100) as u32;
    days_from_civil(year, month, day) as i32
}

/// Decodes a packed time-of-day into picoseconds since midnight.
///
/// `scaled_seconds` carries the seconds field pre-scaled to microseconds
/// (fractional seconds included); hour and minute are clamped into range
/// rather than rejected.
pub fn packed_time_to_picos(scaled_seconds: u32, hour: u8, minute: u8) -> i64 {
    let clock = ((hour % 24) as i64) * 3_600 + ((minute % 60) as i64) * 60;
    clock * 1_000_000_000_000 + scaled_seconds as i64 * 1_000_000
}

/// Decodes a packed timestamp into microseconds since the 1970-01-01 epoch.
///
/// Unlike the packed date, the year field here is absolute, not
/// 1900-offset. The day component reuses the civil day-count conversion so
/// date and timestamp stay consistent around the epoch.
pub fn packed_timestamp_to_epoch_micros(
    scaled_seconds: u32,
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
) -> i64 {
    let days = days_from_civil(year as i32, month as u32, day as u32);
    let clock = ((hour % 24) as i64) * 3_600 + ((minute % 60) as i64) * 60;
    days * 86_400_000_000 + clock * 1_000_000 + scaled_seconds as i64
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
