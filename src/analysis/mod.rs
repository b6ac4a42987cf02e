//! Holdings analysis over a cleaned snapshot table.
//!
//! The two analyses use different windows whenever more than two
//! snapshot dates are loaded:
//!   - `differ`  compares the two most recent snapshot dates (what changed last).
//!   - `changes` compares the earliest and latest dates in the whole dataset.

pub mod changes;
pub mod differ;

pub use changes::build_change_report;
pub use differ::{diff_recent_holdings, ticker_snapshots};
