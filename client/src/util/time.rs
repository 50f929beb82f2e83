//! Wall-clock helpers.
//!
//! In the browser timestamps are formatted with the JS `Date` API so they
//! follow the visitor's locale. Server-side rendering and tests fall back to
//! a fixed UTC `YYYY-MM-DD HH:MM:SS` form.

#[cfg(test)]
#[path = "time_test.rs"]
mod time_test;

/// Current time in milliseconds since the Unix epoch.
#[cfg(feature = "hydrate")]
#[allow(clippy::cast_possible_truncation)]
pub fn now_ms() -> i64 {
    js_sys::Date::now() as i64
}

/// Current time in milliseconds since the Unix epoch.
#[cfg(not(feature = "hydrate"))]
pub fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

/// Format a millisecond epoch timestamp for display.
#[cfg(feature = "hydrate")]
#[allow(clippy::cast_precision_loss)]
pub fn format_timestamp(ms: i64) -> String {
    let date = js_sys::Date::new(&wasm_bindgen::JsValue::from_f64(ms as f64));
    String::from(date.to_locale_string("default", &wasm_bindgen::JsValue::UNDEFINED))
}

/// Format a millisecond epoch timestamp for display.
#[cfg(not(feature = "hydrate"))]
pub fn format_timestamp(ms: i64) -> String {
    format_utc(ms)
}

/// `YYYY-MM-DD HH:MM:SS` in UTC.
#[cfg(any(test, not(feature = "hydrate")))]
fn format_utc(ms: i64) -> String {
    let secs = ms.div_euclid(1000);
    let days = secs.div_euclid(86_400);
    let rem = secs.rem_euclid(86_400);
    let (year, month, day) = civil_from_days(days);
    format!(
        "{year:04}-{month:02}-{day:02} {:02}:{:02}:{:02}",
        rem / 3600,
        (rem / 60) % 60,
        rem % 60
    )
}

/// Days since 1970-01-01 to a proleptic Gregorian (year, month, day).
#[cfg(any(test, not(feature = "hydrate")))]
fn civil_from_days(days: i64) -> (i64, i64, i64) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
