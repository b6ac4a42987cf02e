use crate::error::{HoldingsError, HoldingsResult};
use crate::models::{HoldingRecord, HoldingsChange, HoldingsDiff, TickerSnapshot};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Distinct tickers per snapshot date, newest first.
pub fn ticker_snapshots(records: &[HoldingRecord]) -> Vec<TickerSnapshot> {
    let mut by_date: BTreeMap<_, BTreeSet<String>> = BTreeMap::new();
    for r in records {
        by_date.entry(r.date).or_default().insert(r.ticker.clone());
    }

    by_date
        .into_iter()
        .rev()
        .map(|(date, tickers)| TickerSnapshot { date, tickers })
        .collect()
}

/// Compare the tickers held on `current` against `previous`.
///
/// Tickers are compared as exact, case-sensitive strings. When the newer
/// snapshot is strictly larger only additions are reported, when it is
/// strictly smaller only drops are reported; a same-size change reports both.
pub fn compare_snapshots(current: &TickerSnapshot, previous: &TickerSnapshot) -> HoldingsDiff {
    let mut diff = HoldingsDiff {
        current: current.date,
        previous: previous.date,
        change: HoldingsChange::Unchanged,
        added: BTreeSet::new(),
        dropped: BTreeSet::new(),
    };

    if current.tickers == previous.tickers {
        return diff;
    }

    let added = || -> BTreeSet<String> {
        current.tickers.difference(&previous.tickers).cloned().collect()
    };
    let dropped = || -> BTreeSet<String> {
        previous.tickers.difference(&current.tickers).cloned().collect()
    };

    match current.tickers.len().cmp(&previous.tickers.len()) {
        std::cmp::Ordering::Greater => {
            diff.change = HoldingsChange::Added;
            diff.added = added();
        }
        std::cmp::Ordering::Less => {
            diff.change = HoldingsChange::Dropped;
            diff.dropped = dropped();
        }
        std::cmp::Ordering::Equal => {
            diff.change = HoldingsChange::Reshuffled;
            diff.added = added();
            diff.dropped = dropped();
        }
    }
    diff
}

/// Diff the two most recent distinct snapshot dates.
pub fn diff_recent_holdings(records: &[HoldingRecord]) -> HoldingsResult<HoldingsDiff> {
    let snapshots = ticker_snapshots(records);
    let (current, previous) = match snapshots.as_slice() {
        [current, previous, ..] => (current, previous),
        _ => {
            return Err(HoldingsError::InsufficientHistory {
                found: snapshots.len(),
            });
        }
    };

    debug!(
        "Comparing {} ({} tickers) against {} ({} tickers)",
        current.date,
        current.tickers.len(),
        previous.date,
        previous.tickers.len()
    );

    let diff = compare_snapshots(current, previous);
    info!(
        "Holdings diff {} → {}: {:?}, +{} / -{}",
        diff.previous,
        diff.current,
        diff.change,
        diff.added.len(),
        diff.dropped.len()
    );
    Ok(diff)
}
