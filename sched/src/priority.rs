//! Диапазон приоритетов
//! Priority range
//!
//! Диапазон фиксирован / The range is fixed:
//!   0 — минимальный / minimum
//!   1 — по умолчанию / default
//!   7 — максимальный / maximum
//!
//! Пустая очередь сообщает PRIORITY_EMPTY (< MIN), чтобы не донорствовать.
//! An empty queue reports PRIORITY_EMPTY (< MIN) so it never donates.

use crate::{Error, Result};

pub type Priority = i32;

pub const PRIORITY_MIN:     Priority = 0;
pub const PRIORITY_MAX:     Priority = 7;
pub const PRIORITY_DEFAULT: Priority = 1;
pub const PRIORITY_EMPTY:   Priority = PRIORITY_MIN - 1;

/// Проверить, что приоритет в допустимом диапазоне.
/// Check that a priority is within range.
pub fn check(priority: Priority) -> Result<Priority> {
    if (PRIORITY_MIN..=PRIORITY_MAX).contains(&priority) {
        Ok(priority)
    } else {
        Err(Error::InvalidPriority { priority })
    }
}
