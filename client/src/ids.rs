//! Id generators backed by the system: random UUIDs and the wall clock.

use chrono::Utc;
use shelf_engine::{BookId, IdGenerator};
use uuid::Uuid;

/// Random v4 UUID ids, rendered as text.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&mut self) -> BookId {
        BookId::Text(Uuid::new_v4().to_string())
    }
}

/// Numeric ids from the millisecond clock.
///
/// Two draws within the same millisecond still yield distinct, increasing
/// ids.
#[derive(Debug, Clone, Default)]
pub struct TimestampIds {
    last: u64,
}

impl IdGenerator for TimestampIds {
    fn next_id(&mut self) -> BookId {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        self.last = now.max(self.last + 1);
        BookId::Num(self.last)
    }
}
