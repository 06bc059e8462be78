use chrono::Utc;

pub const MICROS_PER_SEC: u64 = 1_000_000;

/// Current wall-clock time in µs since the epoch
pub fn now_us() -> u64 {
    Utc::now().timestamp_micros().max(0) as u64
}

pub fn split_micros(ts: u64) -> (u64, u32) {
    (ts / MICROS_PER_SEC, (ts % MICROS_PER_SEC) as u32)
}

pub fn join_micros(sec: u64, us: u32) -> u64 {
    sec.saturating_mul(MICROS_PER_SEC).saturating_add(us as u64)
}
