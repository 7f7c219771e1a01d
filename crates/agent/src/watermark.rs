use crate::classifier::Signal;

/// High-water mark for one wallet's feed: the newest settlement time
/// already processed, plus the hash it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermark {
    pub timestamp_ms: i64,
}

impl Watermark {
    /// 0 admits the entire first page, bounded by the fetch page size.
    pub fn cold_start() -> Self {
        Self { timestamp_ms: 0 }
    }
}

/// Signals strictly newer than the watermark, in feed order
/// (most-recent-first). Strict comparison: a signal whose timestamp
/// equals the watermark was already processed in an earlier cycle, and
/// a replayed page with unchanged timestamps selects nothing.
pub fn select_new<'a>(signals: &'a [Signal], mark: Watermark) -> Vec<&'a Signal> {
    signals
        .iter()
        .filter(|s| s.timestamp_ms > mark.timestamp_ms)
        .collect()
}

/// Watermark advancement after processing a page: the newest entry
/// carrying a usable timestamp, whether or not it was a trade. Entries
/// the feed left untimed classify to 0 and are passed over, so a page
/// can only ever move the mark forward. `None` when nothing on the
/// page is timed, which leaves the stored watermark untouched.
pub fn page_watermark(signals: &[Signal]) -> Option<(i64, Option<&str>)> {
    let newest = signals.iter().find(|s| s.timestamp_ms > 0)?;
    Some((newest.timestamp_ms, newest.hash.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::Side;

    fn signal(hash: &str, timestamp_ms: i64) -> Signal {
        Signal {
            hash: Some(hash.to_string()),
            chain_id: Some("base".to_string()),
            timestamp_ms,
            side: Side::Buy,
            token_address: Some("0xdegen".to_string()),
            symbol: "DEGEN".to_string(),
            is_trade: true,
            operation: "trade".to_string(),
        }
    }

    #[test]
    fn test_cold_start_admits_full_page() {
        let page = vec![signal("0xc", 3000), signal("0xb", 2000), signal("0xa", 1000)];
        let new = select_new(&page, Watermark::cold_start());
        assert_eq!(new.len(), 3);
    }

    #[test]
    fn test_strictly_newer_only() {
        let page = vec![signal("0xc", 3000), signal("0xb", 2000), signal("0xa", 1000)];
        let new = select_new(&page, Watermark { timestamp_ms: 2000 });
        assert_eq!(new.len(), 1);
        assert_eq!(new[0].hash.as_deref(), Some("0xc"));
    }

    #[test]
    fn test_replayed_page_selects_nothing() {
        let page = vec![signal("0xc", 3000), signal("0xb", 2000)];
        let new = select_new(&page, Watermark { timestamp_ms: 3000 });
        assert!(new.is_empty());
    }

    #[test]
    fn test_advancement_uses_page_head() {
        let page = vec![signal("0xc", 3000), signal("0xb", 2000)];
        let (ts, hash) = page_watermark(&page).unwrap();
        assert_eq!(ts, 3000);
        assert_eq!(hash, Some("0xc"));
    }

    #[test]
    fn test_empty_page_keeps_watermark() {
        assert!(page_watermark(&[]).is_none());
    }

    #[test]
    fn test_untimed_head_does_not_move_mark_back() {
        // A page whose newest entry has no settlement time must not
        // reset the mark to 0; the first timed entry speaks for the page.
        let page = vec![signal("0xuntimed", 0), signal("0xb", 2000)];
        let (ts, hash) = page_watermark(&page).unwrap();
        assert_eq!(ts, 2000);
        assert_eq!(hash, Some("0xb"));
    }

    #[test]
    fn test_fully_untimed_page_yields_no_mark() {
        let page = vec![signal("0xa", 0), signal("0xb", 0)];
        assert!(page_watermark(&page).is_none());
    }

    #[test]
    fn test_zero_timestamp_signals_never_selected() {
        // Feed entries without a mined_at classify to timestamp 0 and must
        // not be replayed once any real watermark exists.
        let page = vec![signal("0xnots", 0)];
        assert!(select_new(&page, Watermark { timestamp_ms: 1 }).is_empty());
        assert_eq!(select_new(&page, Watermark::cold_start()).len(), 0);
    }
}
