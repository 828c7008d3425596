//! Wait queue — очередь ожидания одного ресурса
//! Wait queue — the waiters and owner of one resource instance
//!
//! Клиенты (lock, семафор, condition, join) создают по очереди на ресурс.
//! Clients (lock, semaphore, condition, join) create one queue per resource.
//!
//!   donates = true   — ресурс с единственным владельцем (lock, join)
//!   donates = false  — нет владельца, которому стоит поднимать приоритет
//!                      (ready queue, wait set условной переменной)

use alloc::collections::BTreeSet;
use alloc::vec::Vec;
use core::fmt;

use crate::priority::{Priority, PRIORITY_EMPTY};
use crate::thread::ThreadHandle;

/// Идентификатор очереди / Queue identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueueId(pub u64);

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct WaitQueue {
    pub donates:   bool,
    pub waiters:   BTreeSet<ThreadHandle>,
    pub owner:     Option<ThreadHandle>,
    /// Кэш max по ожидающим / Cached max over waiters
    pub effective: Priority,
    pub valid:     bool,
}

impl WaitQueue {
    pub const fn new(donates: bool) -> Self {
        Self {
            donates,
            waiters:   BTreeSet::new(),
            owner:     None,
            effective: PRIORITY_EMPTY,
            valid:     false,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.owner.is_none() && self.waiters.is_empty()
    }
}

/// Снимок очереди для отладки / Queue snapshot for debugging
///
/// `waiters` идут в порядке, в котором их отдал бы next_thread().
/// `waiters` are listed in the order next_thread() would hand them out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub id:        QueueId,
    pub donates:   bool,
    pub owner:     Option<ThreadHandle>,
    pub waiters:   Vec<ThreadHandle>,
    pub effective: Priority,
}

impl fmt::Display for QueueSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} donates={} owner=", self.id, self.donates)?;
        match self.owner {
            Some(t) => write!(f, "{}", t)?,
            None    => f.write_str("none")?,
        }
        f.write_str(" waiters=[")?;
        for (i, t) in self.waiters.iter().enumerate() {
            if i > 0 { f.write_str(", ")?; }
            write!(f, "{}", t)?;
        }
        write!(f, "] effective={}", self.effective)
    }
}
