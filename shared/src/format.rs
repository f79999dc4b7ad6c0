//! Display helpers shared by the API and the browser module

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::i18n::translate;
use crate::types::Language;

/// Relative time such as `3 hours ago`, in the requested language
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>, lang: Language) -> String {
    let seconds = (now - then).num_seconds();

    if seconds < 60 {
        return translate(lang, "just_now").to_string();
    }

    let (value, key) = if seconds < 3_600 {
        (seconds / 60, "minutes_ago")
    } else if seconds < 86_400 {
        (seconds / 3_600, "hours_ago")
    } else {
        (seconds / 86_400, "days_ago")
    };

    format!("{} {}", value, translate(lang, key))
}

/// Euro amount with thousands separators, e.g. `€1,234.50`
pub fn format_price(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let plain = format!("{:.2}", rounded.abs());
    let (whole, cents) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}€{}.{}", sign, grouped, cents)
}

/// Shorten `text` to at most `max` characters, marking the cut with `...`
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::str::FromStr;

    #[test]
    fn time_ago_buckets() {
        let now = Utc::now();
        assert_eq!(time_ago(now - Duration::seconds(5), now, Language::English), "just now");
        assert_eq!(
            time_ago(now - Duration::minutes(3), now, Language::English),
            "3 minutes ago"
        );
        assert_eq!(
            time_ago(now - Duration::hours(2), now, Language::Greek),
            "2 ώρες πριν"
        );
        assert_eq!(
            time_ago(now - Duration::days(9), now, Language::English),
            "9 days ago"
        );
    }

    #[test]
    fn future_timestamps_read_as_just_now() {
        let now = Utc::now();
        assert_eq!(time_ago(now + Duration::hours(1), now, Language::English), "just now");
    }

    #[test]
    fn price_formatting() {
        assert_eq!(format_price(Decimal::from_str("1234.5").unwrap()), "€1,234.50");
        assert_eq!(format_price(Decimal::from_str("0").unwrap()), "€0.00");
        assert_eq!(format_price(Decimal::from_str("999.999").unwrap()), "€1,000.00");
        assert_eq!(format_price(Decimal::from_str("-12.3").unwrap()), "-€12.30");
        assert_eq!(format_price(Decimal::from_str("1234567").unwrap()), "€1,234,567.00");
    }

    #[test]
    fn truncate_is_char_safe() {
        assert_eq!(truncate("short", 30), "short");
        assert_eq!(truncate("Ελαιόλαδο Εξαιρετικό Παρθένο", 12), "Ελαιόλαδο...");
    }
}
