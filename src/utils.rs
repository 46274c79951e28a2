use chrono::{DateTime, Utc};
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins over the configured filter. Safe to call more than once.
pub fn start_log(filter: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let _ = tracing_subscriber::fmt().with_env_filter(env_filter).with_target(false).try_init();
}

pub fn display_time(utc_time: DateTime<Utc>) -> String {
    let local_time = utc_time.with_timezone(&chrono::Local);
    local_time.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Unix seconds to UTC at millisecond precision, `None` when not finite or out of range.
pub fn ux_secs_to_utc(secs: f64) -> Option<DateTime<Utc>> {
    let ms = (secs * 1000.).round();
    if !ms.is_finite() || ms.abs() >= i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(ms as i64)
}
