//! Daily trigger: one sweep per day at a fixed UTC time

use crate::config::SweeperConfig;
use crate::sweep::{TriggerSource, sweep_once};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use colored::Colorize;

/// Parse `HH:MM` (24h clock)
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| format!("invalid time '{}': expected HH:MM (UTC, 24h)", raw))
}

/// First instant strictly after `now` whose UTC clock reads `at`
pub fn next_occurrence(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let today = now.date_naive().and_time(at).and_utc();
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

pub async fn handle(config: &SweeperConfig, at: NaiveTime) -> anyhow::Result<()> {
    println!(
        "{} {} UTC {}",
        "Sweeping daily at".blue().bold(),
        at.format("%H:%M").to_string().cyan(),
        "(Ctrl-C to stop)".dimmed()
    );

    loop {
        let next = next_occurrence(Utc::now(), at);
        let wait = (next - Utc::now()).to_std().unwrap_or_default();
        tracing::info!(next_run = %next.to_rfc3339(), "Waiting for next scheduled sweep");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "Stopped".yellow());
                return Ok(());
            }
        }

        // A sweep that cannot start is retried at the next slot
        match sweep_once(config, TriggerSource::Schedule).await {
            Ok(report) => {
                println!(
                    "{} {}",
                    Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string().dimmed(),
                    report.summary()
                );
            }
            Err(e) => {
                tracing::error!(error = %format!("{:#}", e), "Scheduled sweep could not start");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(
            parse_time_of_day("03:30").unwrap(),
            NaiveTime::from_hms_opt(3, 30, 0).unwrap()
        );
        assert!(parse_time_of_day("24:00").is_err());
        assert!(parse_time_of_day("3pm").is_err());
        assert!(parse_time_of_day("").is_err());
    }

    #[test]
    fn test_next_occurrence_later_today() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 1, 0, 0).unwrap();
        let at = NaiveTime::from_hms_opt(3, 0, 0).unwrap();
        assert_eq!(
            next_occurrence(now, at),
            Utc.with_ymd_and_hms(2024, 6, 1, 3, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_occurrence_rolls_over() {
        let at = NaiveTime::from_hms_opt(3, 0, 0).unwrap();

        let now = Utc.with_ymd_and_hms(2024, 6, 1, 5, 0, 0).unwrap();
        assert_eq!(
            next_occurrence(now, at),
            Utc.with_ymd_and_hms(2024, 6, 2, 3, 0, 0).unwrap()
        );

        // exactly on the slot: the run just happened, wait a full day
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 3, 0, 0).unwrap();
        assert_eq!(
            next_occurrence(now, at),
            Utc.with_ymd_and_hms(2024, 6, 2, 3, 0, 0).unwrap()
        );

        let now = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 0).unwrap();
        assert_eq!(
            next_occurrence(now, at),
            Utc.with_ymd_and_hms(2025, 1, 1, 3, 0, 0).unwrap()
        );
    }
}
