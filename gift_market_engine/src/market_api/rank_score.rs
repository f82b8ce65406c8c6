//! The rank score summarises a user's trading record. It is a pure function of the user's order counts, so it can be
//! recomputed at any time.
use crate::db_types::OrderStatusCounts;

const SOLD_WEIGHT: i64 = 10;
const BID_COMPLETED_WEIGHT: i64 = 5;
const LIVE_WEIGHT: i64 = 1;
const CANCELLED_PENALTY: i64 = 2;

pub fn rank_score(counts: &OrderStatusCounts) -> i64 {
    let active = counts.live + counts.reserved;
    let score = counts.sold * SOLD_WEIGHT + counts.bid_completed * BID_COMPLETED_WEIGHT + active * LIVE_WEIGHT -
        counts.cancelled * CANCELLED_PENALTY;
    score.max(0)
}
