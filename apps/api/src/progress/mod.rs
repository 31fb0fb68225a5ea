// Progress tracking: weekly score snapshot, deltas and derived insights.

pub mod calculator;
pub mod handlers;
pub mod insights;
pub mod snapshot;
