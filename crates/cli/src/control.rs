//! HTTP control surface
//!
//! `POST /frequency?freq=<value>` changes the generator cadence. `<value>` is
//! either a positive integer of milliseconds or a duration string such as
//! `500ms`, `1.5s` or `1h30m`.

use std::fmt::Write as _;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use ingestion::RateController;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::error::{CliError, Result};

/// Query string of `POST /frequency`
#[derive(Debug, Deserialize)]
pub struct FrequencyQuery {
    pub freq: Option<String>,
}

/// Routes of the control surface
pub fn router(rate: RateController) -> Router {
    Router::new()
        .route("/frequency", post(update_frequency))
        .with_state(rate)
}

/// Bind the control listener; failure is fatal for the producer
pub async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| CliError::control_bind(addr, e))
}

/// Serve until `cancel` fires
#[instrument(name = "control_serve", skip_all)]
pub async fn serve(listener: TcpListener, rate: RateController, cancel: CancellationToken) {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "control surface listening");
    }
    let server = axum::serve(listener, router(rate))
        .with_graceful_shutdown(async move { cancel.cancelled().await });
    if let Err(e) = server.await {
        warn!(error = %e, "control surface stopped with error");
    }
}

/// `POST /frequency`
pub async fn update_frequency(
    State(rate): State<RateController>,
    Query(query): Query<FrequencyQuery>,
) -> (StatusCode, Json<Value>) {
    let Some(raw) = query.freq.filter(|f| !f.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "freq is required" })),
        );
    };

    let Some(interval) = parse_frequency(&raw) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid freq" })),
        );
    };

    rate.update_frequency(interval);
    (
        StatusCode::OK,
        Json(json!({
            "message": "Frequency updated",
            "frequency": format_duration(interval),
        })),
    )
}

/// Longest accepted interval, in nanoseconds (`i64::MAX`)
const MAX_INTERVAL_NANOS: u128 = i64::MAX as u128;

/// Integer milliseconds first, then a duration string; zero, negative and
/// overlong values are rejected
pub fn parse_frequency(raw: &str) -> Option<Duration> {
    let interval = match raw.parse::<u64>() {
        Ok(ms) if u128::from(ms) * 1_000_000 > MAX_INTERVAL_NANOS => return None,
        Ok(ms) => Duration::from_millis(ms),
        Err(_) => parse_duration(raw)?,
    };
    (!interval.is_zero()).then_some(interval)
}

/// Parse a duration string: a sequence of decimal numbers, each with an
/// optional fraction and a unit (`ns`, `us`, `µs`, `ms`, `s`, `m`, `h`)
///
/// Returns `None` for malformed input, for negative durations and for totals
/// above `i64::MAX` nanoseconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let (negative, mut rest) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    if rest == "0" {
        return Some(Duration::ZERO);
    }
    if rest.is_empty() {
        return None;
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_part, after) = rest.split_at(int_len);

        let (frac_part, after) = match after.strip_prefix('.') {
            Some(tail) => {
                let frac_len = tail.bytes().take_while(u8::is_ascii_digit).count();
                tail.split_at(frac_len)
            }
            None => ("", after),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }

        let unit_len = after
            .char_indices()
            .find(|(_, c)| *c == '.' || c.is_ascii_digit())
            .map_or(after.len(), |(i, _)| i);
        let (unit, after) = after.split_at(unit_len);
        let scale = unit_nanos(unit)?;

        let whole: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().ok()?
        };
        let mut nanos = whole.checked_mul(scale)?;
        if !frac_part.is_empty() {
            // digits beyond nanosecond precision cannot contribute
            let digits = &frac_part[..frac_part.len().min(18)];
            let numerator: u128 = digits.parse().ok()?;
            let denominator = 10u128.pow(digits.len() as u32);
            nanos = nanos.checked_add(numerator * scale / denominator)?;
        }

        total = total.checked_add(nanos)?;
        rest = after;
    }

    if (negative && total > 0) || total > MAX_INTERVAL_NANOS {
        return None;
    }
    let secs = u64::try_from(total / 1_000_000_000).ok()?;
    Some(Duration::new(secs, (total % 1_000_000_000) as u32))
}

fn unit_nanos(unit: &str) -> Option<u128> {
    Some(match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => 1_000,
        "ms" => 1_000_000,
        "s" => 1_000_000_000,
        "m" => 60 * 1_000_000_000,
        "h" => 3_600 * 1_000_000_000,
        _ => return None,
    })
}

/// Canonical text form: `500ms`, `1.5s`, `1m30s`, `2h0m0s`
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    match nanos {
        0 => "0s".to_string(),
        n if n < 1_000 => format!("{n}ns"),
        n if n < 1_000_000 => format!("{}µs", decimal(n, 1_000, 3)),
        n if n < 1_000_000_000 => format!("{}ms", decimal(n, 1_000_000, 6)),
        n => {
            let secs = n / 1_000_000_000;
            let (hours, minutes) = (secs / 3_600, secs % 3_600 / 60);
            let seconds = n % 60_000_000_000;

            let mut out = String::new();
            if hours > 0 {
                let _ = write!(out, "{hours}h");
            }
            if hours > 0 || minutes > 0 {
                let _ = write!(out, "{minutes}m");
            }
            let _ = write!(out, "{}s", decimal(seconds, 1_000_000_000, 9));
            out
        }
    }
}

/// `value / unit` with the fraction trimmed of trailing zeros
fn decimal(value: u128, unit: u128, width: usize) -> String {
    let whole = value / unit;
    let frac = value % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let frac = format!("{frac:0width$}");
    format!("{whole}.{}", frac.trim_end_matches('0'))
}
