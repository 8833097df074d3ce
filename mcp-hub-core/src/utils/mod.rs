use std::sync::{LockResult, MutexGuard, RwLockReadGuard, RwLockWriteGuard};

pub mod time;

pub use self::time::*;

pub fn is_blank(path: &str) -> bool {
    path.trim().is_empty()
}

/// Recover the guard of a poisoned lock.
/// The hub never leaves shared state half-updated across a panic,
/// so the data behind a poisoned lock is still consistent.
#[inline]
pub fn lock_recover<T>(res: LockResult<MutexGuard<'_, T>>) -> MutexGuard<'_, T> {
    res.unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[inline]
pub fn read_recover<T>(res: LockResult<RwLockReadGuard<'_, T>>) -> RwLockReadGuard<'_, T> {
    res.unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[inline]
pub fn write_recover<T>(res: LockResult<RwLockWriteGuard<'_, T>>) -> RwLockWriteGuard<'_, T> {
    res.unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Percentage of `part` in `total`, 0 when `total` is 0.
#[inline]
pub fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

/// Round to two decimal places, the precision the dashboard renders.
#[inline]
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn percent_of_zero_total() {
        assert_eq!(percent(3, 0), 0.0);
        assert_eq!(percent(1, 4), 25.0);
    }

    #[test]
    fn round_two_places() {
        assert_eq!(round2(1.23456), 1.23);
        assert_eq!(round2(0.126), 0.13);
    }
}
