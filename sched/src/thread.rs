//! Thread scheduling state
//!
//! Запись создаётся при первом обращении к потоку и живёт всё время его жизни.
//! A record is created on first reference to a thread and lives as long as it.

use alloc::collections::BTreeSet;
use core::fmt;

use crate::priority::{Priority, PRIORITY_DEFAULT};
use crate::queue::QueueId;

/// Непрозрачный идентификатор потока / Opaque thread handle
///
/// Порядок = порядок создания; используется как последний tie-break.
/// Order is creation order; it is the last selection tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadHandle(pub u64);

impl ThreadHandle {
    pub const fn from_raw(raw: u64) -> Self { Self(raw) }
    pub const fn as_raw(self) -> u64      { self.0 }
}

impl fmt::Display for ThreadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thread#{}", self.0)
    }
}

/// Состояние планирования потока / Per-thread scheduling state
#[derive(Debug, Clone)]
pub(crate) struct ThreadState {
    pub base:           Priority,
    /// Кэш max(base, донорство очередей) / Cached max(base, owned queues)
    pub effective:      Priority,
    pub valid:          bool,
    /// Только очереди с донорством / Donating queues only
    pub owned_queues:   BTreeSet<QueueId>,
    /// Только очереди с донорством / Donating queues only
    pub waiting_queues: BTreeSet<QueueId>,
    pub enqueue_time:   u64,
}

impl ThreadState {
    pub const fn new() -> Self {
        Self {
            base:           PRIORITY_DEFAULT,
            effective:      PRIORITY_DEFAULT,
            valid:          false,
            owned_queues:   BTreeSet::new(),
            waiting_queues: BTreeSet::new(),
            enqueue_time:   0,
        }
    }
}
