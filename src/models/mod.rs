use chrono::{DateTime, Local, NaiveDateTime, Timelike};

/// Storage format for every timestamp: hour granularity, zero-padded.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:00";

/// Static attributes read once from a listing page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingAttributes {
    pub address: String,
    pub locality: String,
    pub municipality: String,
    pub agency: String,
    pub agent: String,
    pub asking_price: i64,
    pub living_area: i64,
    pub ancillary_area: i64,
    pub plot_area: i64,
    pub rooms: i64,
    pub running_cost: i64,
}

/// One tracked listing as persisted in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub id: i64,
    pub url: String,
    pub first_seen: String,
    pub last_seen: String,
    pub attributes: ListingAttributes,
    pub alive: bool,
}

/// A point-in-time read of a listing's view counter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSample {
    pub listing_id: i64,
    pub sampled_at: String,
    pub view_count: i64,
}

/// Truncate a local time to the hour and render it in [`TIMESTAMP_FORMAT`].
pub fn hour_stamp(at: DateTime<Local>) -> String {
    truncate_to_hour(at.naive_local())
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

fn truncate_to_hour(at: NaiveDateTime) -> NaiveDateTime {
    at.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn hour_stamp_is_zero_padded_and_truncated() {
        let at = Local.with_ymd_and_hms(2024, 3, 7, 9, 41, 12).unwrap();
        assert_eq!(hour_stamp(at), "2024-03-07 09:00");
    }

    #[test]
    fn hour_stamps_sort_chronologically() {
        let early = Local.with_ymd_and_hms(2024, 9, 30, 23, 5, 0).unwrap();
        let late = Local.with_ymd_and_hms(2024, 10, 1, 0, 5, 0).unwrap();
        assert!(hour_stamp(early) < hour_stamp(late));
    }
}
