use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, TimeZone, Timelike};

use crate::errors::{GeoError, Result};

const SECS_PER_HOUR: u64 = 3600;
const SECS_PER_DAY: u64 = 86_400;

/// 定时任务的触发节奏
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// 固定间隔
    Every(Duration),
    /// 每个整点
    Hourly,
    /// 每天的固定时刻（本地时间）
    DailyAt(NaiveTime),
}

impl Schedule {
    /// 解析节奏表达式，支持：
    /// - `@daily`、`@hourly`
    /// - 每日时刻：`01:00`、`23:30:15`
    /// - 固定间隔：`30m`、`6h`、`1d`、`1d2h30m`
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        match input.to_ascii_lowercase().as_str() {
            "" => return Err(GeoError::config("Empty schedule expression")),
            "@daily" | "@midnight" => return Ok(Self::DailyAt(NaiveTime::MIN)),
            "@hourly" => return Ok(Self::Hourly),
            _ => {}
        }

        if input.contains(':') {
            return NaiveTime::parse_from_str(input, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(input, "%H:%M"))
                .map(Self::DailyAt)
                .map_err(|e| GeoError::config(format!("Invalid time of day '{}': {}", input, e)));
        }

        parse_interval(input).map(Self::Every)
    }

    /// 距离下一次触发的等待时间
    ///
    /// 每日时刻恰好等于 `now` 时顺延到次日，因此结果总是大于零
    pub fn next_delay<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Duration {
        match self {
            Self::Every(interval) => *interval,
            Self::Hourly => {
                let elapsed = u64::from(now.minute()) * 60 + u64::from(now.second());
                Duration::from_secs(SECS_PER_HOUR - elapsed)
            }
            Self::DailyAt(time) => {
                let tz = now.timezone();
                let mut date = now.date_naive();
                // 夏令时跳过的时刻在当天不存在，继续看下一天
                for _ in 0..3 {
                    let candidate = date.and_time(*time).and_local_timezone(tz.clone()).earliest();
                    if let Some(candidate) = candidate.filter(|c| c > now)
                        && let Ok(delay) = candidate.signed_duration_since(now).to_std()
                    {
                        return delay;
                    }
                    match date.succ_opt() {
                        Some(next) => date = next,
                        None => break,
                    }
                }
                Duration::from_secs(SECS_PER_DAY)
            }
        }
    }
}

impl FromStr for Schedule {
    type Err = GeoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Every(interval) => write!(f, "every {}s", interval.as_secs()),
            Self::Hourly => write!(f, "hourly"),
            Self::DailyAt(time) => write!(f, "daily at {}", time.format("%H:%M:%S")),
        }
    }
}

/// 解析 `1d2h30m` 形式的相对时间
fn parse_interval(input: &str) -> Result<Duration> {
    let invalid = || GeoError::config(format!("Invalid schedule expression: '{}'", input));

    let mut total: u64 = 0;
    let mut remaining = input;

    while !remaining.is_empty() {
        let digits = remaining
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(remaining.len());
        if digits == 0 {
            return Err(invalid());
        }
        let num: u64 = remaining[..digits].parse().map_err(|_| invalid())?;
        remaining = &remaining[digits..];

        let unit_len = remaining
            .find(|c: char| !c.is_alphabetic())
            .unwrap_or(remaining.len());
        if unit_len == 0 {
            return Err(GeoError::config(format!(
                "Missing time unit after '{}' in '{}'",
                num, input
            )));
        }

        let multiplier = match remaining[..unit_len].to_lowercase().as_str() {
            "s" | "sec" | "second" | "seconds" => 1,
            "m" | "min" | "minute" | "minutes" => 60,
            "h" | "hour" | "hours" => SECS_PER_HOUR,
            "d" | "day" | "days" => SECS_PER_DAY,
            "w" | "week" | "weeks" => 7 * SECS_PER_DAY,
            unit => {
                return Err(GeoError::config(format!(
                    "Unsupported time unit '{}' in '{}'",
                    unit, input
                )));
            }
        };

        total = num
            .checked_mul(multiplier)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(invalid)?;
        remaining = &remaining[unit_len..];
    }

    if total == 0 {
        return Err(GeoError::config("Schedule interval must be greater than zero"));
    }

    Ok(Duration::from_secs(total))
}
