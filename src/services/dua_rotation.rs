//! Daily devotional rotation
//!
//! Picks one item per calendar day: `(day_of_month - 1) mod N` over the items
//! ordered by creation time. The result depends on the date only, never on
//! the time of day it is asked for.

use chrono::{Datelike, NaiveDate};

use crate::models::DevotionalItem;

/// Text sent in place of an item when nothing has been added yet
pub const NO_CONTENT_TEXT: &str = "🕌 Hozircha duolar mavjud emas.";

/// Index of the item for `date` among `len` items; `None` when `len` is zero
pub fn rotation_index(date: NaiveDate, len: usize) -> Option<usize> {
    if len == 0 {
        return None;
    }
    // day() is 1-based
    Some((date.day() as usize - 1) % len)
}

/// The item to send on `date`. `items` must already be ordered oldest first.
pub fn select_for_date(items: &[DevotionalItem], date: NaiveDate) -> Option<&DevotionalItem> {
    rotation_index(date, items.len()).map(|index| &items[index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn items(n: usize) -> Vec<DevotionalItem> {
        (0..n)
            .map(|i| {
                DevotionalItem::new(
                    format!("dua {i}"),
                    None,
                    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::minutes(i as i64),
                )
            })
            .collect()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_index_follows_day_of_month() {
        assert_eq!(rotation_index(date(2025, 3, 1), 7), Some(0));
        assert_eq!(rotation_index(date(2025, 3, 8), 7), Some(0));
        assert_eq!(rotation_index(date(2025, 3, 31), 7), Some(30 % 7));
        assert_eq!(rotation_index(date(2025, 3, 15), 1), Some(0));
    }

    #[test]
    fn test_empty_list_has_no_selection() {
        assert_eq!(rotation_index(date(2025, 3, 1), 0), None);
        assert!(select_for_date(&[], date(2025, 3, 1)).is_none());
    }

    #[test]
    fn test_thirty_items_cover_thirty_days() {
        let items = items(30);
        let start = date(2025, 4, 1);

        let mut seen: Vec<&str> = (0..30)
            .map(|offset| {
                let day = start + chrono::Duration::days(offset);
                select_for_date(&items, day).unwrap().caption.as_str()
            })
            .collect();
        seen.sort_unstable();
        seen.dedup();

        assert_eq!(seen.len(), 30);
    }

    #[test]
    fn test_month_rollover_restarts_cycle() {
        let items = items(4);
        assert_eq!(select_for_date(&items, date(2025, 1, 31)).unwrap().caption, "dua 2");
        assert_eq!(select_for_date(&items, date(2025, 2, 1)).unwrap().caption, "dua 0");
    }
}
