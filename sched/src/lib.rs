//! cupruxos-sched — планировщик с донорством приоритета
//! cupruxos-sched — priority scheduler with priority donation
//!
//! Ядро выбирает следующий поток по эффективному приоритету.
//! The core picks the next thread by effective priority.
//!
//! Эффективный приоритет = max(базовый, донорский).
//! Effective priority = max(base, donated).
//!
//! Граф зависимостей / Dependency graph:
//!   поток → очереди, которыми владеет → их ожидающие → ...
//!   thread → queues it owns → their waiters → their owned queues → ...
//!
//! Использование / Usage:
//!   let mut sched = PriorityScheduler::new();
//!   let lock = sched.new_queue(true);
//!   sched.acquire(lock, low)?;
//!   sched.wait_for_access(lock, high)?;
//!   assert_eq!(sched.get_effective_priority(low), sched.get_effective_priority(high));
//!
//! Вся работа идёт под одним глобальным замком (см. `global`).
//! Everything runs under one global lock (see `global`).

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod clock;
pub mod config;
pub mod global;
pub mod priority;
pub mod queue;
pub mod scheduler;
pub mod thread;

pub use clock::{Clock, SequenceClock};
pub use config::{Invalidation, SchedulerConfig};
pub use priority::{Priority, PRIORITY_DEFAULT, PRIORITY_EMPTY, PRIORITY_MAX, PRIORITY_MIN};
pub use queue::{QueueId, QueueSnapshot};
pub use scheduler::PriorityScheduler;
pub use thread::ThreadHandle;

/// Ошибки планировщика / Scheduler errors
///
/// Все ошибки — нарушения контракта вызывающим кодом.
/// Every variant is a caller contract violation; state is untouched when one is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Приоритет вне [MIN, MAX] / Priority outside [MIN, MAX]
    #[error("priority {priority} outside [{}, {}]", PRIORITY_MIN, PRIORITY_MAX)]
    InvalidPriority { priority: Priority },

    /// Очередь не создана этим планировщиком / Queue not created here (or dropped)
    #[error("unknown wait queue {0}")]
    UnknownQueue(QueueId),

    /// acquire() для потока, который ждёт в этой же очереди
    /// acquire() of a thread that waits in the same queue
    #[error("{thread} cannot own {queue} while waiting in it")]
    OwnerIsWaiter { queue: QueueId, thread: ThreadHandle },

    /// wait_for_access() для владельца очереди
    /// wait_for_access() by the queue's owner
    #[error("{thread} cannot wait in {queue} while owning it")]
    WaiterIsOwner { queue: QueueId, thread: ThreadHandle },

    /// Повторное wait_for_access() без передачи владения
    /// Second wait_for_access() without a handoff in between
    #[error("{thread} is already waiting in {queue}")]
    AlreadyWaiting { queue: QueueId, thread: ThreadHandle },

    /// drop_queue() для занятой очереди / drop of an owned or waited-on queue
    #[error("{0} still has an owner or waiters")]
    QueueBusy(QueueId),

    /// drop_thread() для потока, который ещё владеет или ждёт
    /// drop_thread() of a thread that still owns or waits in a queue
    #[error("{0} still owns or waits in a queue")]
    ThreadBusy(ThreadHandle),
}

pub type Result<T> = core::result::Result<T, Error>;
