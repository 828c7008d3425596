//! Глобальный планировщик под одним замком
//! Global scheduler behind one lock
//!
//! Заменяет "запрет прерываний": каждая операция держит SCHED_LOCK
//! от начала до конца, поэтому внутри ядра гонок нет.
//! Replaces "interrupts disabled": every operation holds SCHED_LOCK for
//! its whole duration, so the core itself has no races.
//!
//! Клиенты (lock, семафор, join) вызывают with() и работают с &mut.
//! Clients (lock, semaphore, join) call with() and get a &mut.

use spin::Mutex;

use crate::priority::Priority;
use crate::scheduler::PriorityScheduler;
use crate::thread::ThreadHandle;

static SCHED_LOCK: Mutex<PriorityScheduler> = Mutex::new(PriorityScheduler::new());

pub fn init() {
    log::info!("[sched] priority scheduler ready (donation, {:?} invalidation)",
        SCHED_LOCK.lock().config().invalidation);
}

/// Выполнить f под глобальным замком.
/// Run f with the global lock held.
///
/// Не вызывать рекурсивно: spin::Mutex не реентерабелен.
/// Do not nest: spin::Mutex is not reentrant.
pub fn with<R>(f: impl FnOnce(&mut PriorityScheduler) -> R) -> R {
    f(&mut *SCHED_LOCK.lock())
}

/// Не ждать, если замок занят (например, из обработчика прерывания).
/// Do not spin if the lock is held (e.g. from an interrupt handler).
pub fn try_with<R>(f: impl FnOnce(&mut PriorityScheduler) -> R) -> Option<R> {
    SCHED_LOCK.try_lock().map(|mut sched| f(&mut *sched))
}

pub fn get_priority(thread: ThreadHandle) -> Priority {
    with(|s| s.get_priority(thread))
}

pub fn get_effective_priority(thread: ThreadHandle) -> Priority {
    with(|s| s.get_effective_priority(thread))
}

pub fn set_priority(thread: ThreadHandle, priority: Priority) -> crate::Result<()> {
    with(|s| s.set_priority(thread, priority))
}

pub fn increase_priority(thread: ThreadHandle) -> bool {
    with(|s| s.increase_priority(thread))
}

pub fn decrease_priority(thread: ThreadHandle) -> bool {
    with(|s| s.decrease_priority(thread))
}
