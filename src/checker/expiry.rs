use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::debug;

use crate::facts::SystemFacts;

/// `chage -l` prints dates like `Dec 01, 2026`.
const CHAGE_DATE_FORMAT: &str = "%b %d, %Y";
const EXPIRES_FIELD: &str = "account expires";

/// Reads a user's account expiration from the system aging report and
/// their longest session time from the process table.
pub struct ExpiryInspector {
    facts: Arc<dyn SystemFacts>,
}

impl ExpiryInspector {
    pub fn new(facts: Arc<dyn SystemFacts>) -> Self {
        Self { facts }
    }

    /// The account's expiration date, or `None` when the account never
    /// expires, the field is absent, or the value does not parse.
    pub async fn expiration_date(&self, username: &str) -> Option<NaiveDate> {
        let report = match self.facts.account_info(username).await {
            Ok(report) => report,
            Err(e) => {
                debug!("account info for {} unavailable: {}", username, e);
                return None;
            }
        };

        parse_expiration(&report)
    }

    /// Whole days until `date`, measured from today. `-1` when no date
    /// is known; negative once the account has expired.
    pub fn expiration_days(&self, date: Option<NaiveDate>) -> i64 {
        days_until(date, Local::now().date_naive())
    }

    /// Elapsed time of the user's longest-running process, or `None`
    /// when the user has no processes.
    pub async fn time_online(&self, username: &str) -> Option<String> {
        let listing = self.facts.process_etimes(username).await.ok()?;
        longest_etime(&listing)
    }
}

fn parse_expiration(report: &str) -> Option<NaiveDate> {
    for line in report.lines() {
        let Some((field, value)) = line.split_once(':') else {
            continue;
        };
        if !field.trim().eq_ignore_ascii_case(EXPIRES_FIELD) {
            continue;
        }

        let value = value.trim();
        if value.eq_ignore_ascii_case("never") {
            return None;
        }
        return NaiveDate::parse_from_str(value, CHAGE_DATE_FORMAT).ok();
    }

    None
}

/// Both sides are calendar dates taken at local midnight, so a date ten
/// days out reads 10 at any time of day and steps down at midnight.
fn days_until(date: Option<NaiveDate>, today: NaiveDate) -> i64 {
    match date {
        Some(date) => (date - today).num_days(),
        None => -1,
    }
}

/// Picks the longest `[[dd-]hh:]mm:ss` elapsed time from a ps listing.
fn longest_etime(listing: &str) -> Option<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .max_by_key(|line| etime_seconds(line))
        .map(|line| line.to_string())
}

fn etime_seconds(etime: &str) -> u64 {
    let (days, clock) = match etime.split_once('-') {
        Some((days, clock)) => (days.parse::<u64>().unwrap_or(0), clock),
        None => (0, etime),
    };

    let mut parts = clock.rsplit(':');
    let seconds: u64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
    let minutes: u64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
    let hours: u64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);

    ((days * 24 + hours) * 60 + minutes) * 60 + seconds
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::CannedFacts;

    const CHAGE_REPORT: &str = "Last password change\t\t\t\t\t: Jan 15, 2026\n\
        Password expires\t\t\t\t\t: never\n\
        Account expires\t\t\t\t\t\t: Dec 01, 2026\n\
        Minimum number of days between password change\t\t: 0\n";

    #[test]
    fn test_parses_expiration_field() {
        assert_eq!(
            parse_expiration(CHAGE_REPORT),
            NaiveDate::from_ymd_opt(2026, 12, 1)
        );
    }

    #[test]
    fn test_never_and_garbage_yield_none() {
        assert_eq!(parse_expiration("Account expires : never\n"), None);
        assert_eq!(parse_expiration("Account expires : not a date\n"), None);
        assert_eq!(parse_expiration("Password expires : Dec 01, 2026\n"), None);
        assert_eq!(parse_expiration(""), None);
    }

    #[test]
    fn test_days_until_decreases_as_today_advances() {
        let date = NaiveDate::from_ymd_opt(2026, 9, 9).unwrap();

        let earlier = days_until(Some(date), NaiveDate::from_ymd_opt(2026, 8, 30).unwrap());
        let later = days_until(Some(date), NaiveDate::from_ymd_opt(2026, 9, 4).unwrap());
        let past = days_until(Some(date), NaiveDate::from_ymd_opt(2026, 9, 12).unwrap());

        assert_eq!(earlier, 10);
        assert_eq!(later, 5);
        assert_eq!(past, -3);
        assert!(earlier > later && later > past);
    }

    #[test]
    fn test_no_date_is_minus_one() {
        assert_eq!(days_until(None, NaiveDate::from_ymd_opt(2026, 8, 30).unwrap()), -1);
    }

    #[test]
    fn test_longest_etime_wins() {
        let listing = "   01:12\n 2-03:04:05\n   59:59\n10:00:00\n";

        assert_eq!(longest_etime(listing), Some("2-03:04:05".to_string()));
    }

    #[test]
    fn test_empty_listing_has_no_time_online() {
        assert_eq!(longest_etime(""), None);
        assert_eq!(longest_etime("  \n"), None);
    }

    #[tokio::test]
    async fn test_time_online_from_facts() {
        let facts = Arc::new(CannedFacts::new().with_etimes("   05:12\n   01:02\n"));
        let inspector = ExpiryInspector::new(facts);

        assert_eq!(inspector.time_online("alice").await, Some("05:12".to_string()));
    }

    #[tokio::test]
    async fn test_unavailable_report_yields_no_date() {
        let inspector = ExpiryInspector::new(Arc::new(CannedFacts::new()));

        assert_eq!(inspector.expiration_date("alice").await, None);
        assert_eq!(inspector.expiration_days(None), -1);
    }
}
