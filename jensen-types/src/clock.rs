//! BCD clock payloads for GET/SET_DEVICE_TIME
//!
//! Seven bytes, one BCD pair each: century, year-of-century, month, day,
//! hour, minute, second.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::error::{Error, Result};

/// Payload length
pub const CLOCK_LEN: usize = 7;

fn to_bcd(value: u32) -> u8 {
    (((value / 10) << 4) | (value % 10)) as u8
}

fn from_bcd(byte: u8) -> Result<u32> {
    let (high, low) = (byte >> 4, byte & 0x0F);
    if high > 9 || low > 9 {
        return Err(Error::Parse(format!("invalid BCD byte 0x{:02X}", byte)));
    }
    Ok(u32::from(high) * 10 + u32::from(low))
}

/// Encode a timestamp for SET_DEVICE_TIME
///
/// # Errors
///
/// Years outside 0..=9999 cannot be expressed.
pub fn encode(time: &NaiveDateTime) -> Result<[u8; CLOCK_LEN]> {
    let year = u32::try_from(time.year())
        .ok()
        .filter(|year| *year <= 9999)
        .ok_or_else(|| Error::Validation(format!("year {} out of range", time.year())))?;

    Ok([
        to_bcd(year / 100),
        to_bcd(year % 100),
        to_bcd(time.month()),
        to_bcd(time.day()),
        to_bcd(time.hour()),
        to_bcd(time.minute()),
        to_bcd(time.second()),
    ])
}

/// Decode a GET_DEVICE_TIME response body
pub fn decode(body: &[u8]) -> Result<NaiveDateTime> {
    if body.len() < CLOCK_LEN {
        return Err(Error::short_body("device time", CLOCK_LEN, body.len()));
    }

    let mut fields = [0u32; CLOCK_LEN];
    for (field, byte) in fields.iter_mut().zip(body) {
        *field = from_bcd(*byte)?;
    }

    let [century, year, month, day, hour, minute, second] = fields;
    NaiveDate::from_ymd_opt((century * 100 + year) as i32, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .ok_or_else(|| Error::Parse(format!("invalid device time {:02X?}", &body[..CLOCK_LEN])))
}
