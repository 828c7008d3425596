//! Clock — источник меток enqueue_time
//! Clock — source of enqueue_time stamps
//!
//! Метка нужна только для FIFO среди равных приоритетов.
//! The stamp only breaks FIFO ties between equal priorities.

/// Трейт для монотонных часов ядра (таймер, счётчик тиков).
/// Trait for the kernel's monotonic clock (timer, tick counter).
pub trait Clock {
    /// Текущее время; не убывает между вызовами.
    /// Current time; never decreases between calls.
    fn now(&mut self) -> u64;
}

/// Счётчик: каждое чтение строго больше предыдущего.
/// Counter: every read is strictly greater than the previous one.
#[derive(Debug, Default, Clone)]
pub struct SequenceClock {
    next: u64,
}

impl SequenceClock {
    pub const fn new() -> Self { Self { next: 0 } }
}

impl Clock for SequenceClock {
    fn now(&mut self) -> u64 {
        let t = self.next;
        self.next += 1;
        t
    }
}
