//! Priority scheduler — арена потоков и очередей
//! Priority scheduler — arena of thread and queue records
//!
//! Записи связаны ключами, а не ссылками:
//! Records point at each other by key, not by reference:
//!
//!   ThreadState.owned_queues   ──► QueueId ──► WaitQueue.waiters ──► ThreadHandle
//!   ThreadState.waiting_queues ──► QueueId ──► WaitQueue.owner   ──► ThreadHandle
//!
//! Эффективный приоритет считается лениво и кэшируется с обеих сторон.
//! Effective priority is computed lazily and cached on both sides:
//!
//!   thread = max(base, owned queues)
//!   queue  = max(waiters)             (PRIORITY_EMPTY если пусто / if empty)
//!
//! Сброс кэша — см. `Invalidation`.
//! Cache invalidation — see `Invalidation`.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;
use core::cmp::Reverse;

use log::{debug, trace, warn};

use crate::clock::{Clock, SequenceClock};
use crate::config::{Invalidation, SchedulerConfig};
use crate::priority::{self, Priority, PRIORITY_EMPTY, PRIORITY_MAX, PRIORITY_MIN};
use crate::queue::{QueueId, QueueSnapshot, WaitQueue};
use crate::thread::{ThreadHandle, ThreadState};
use crate::{Error, Result};

/// Вершина графа донорства / Donation graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Node {
    Thread(ThreadHandle),
    Queue(QueueId),
}

/// Результат пересчёта: значение и признак того, что цикл не встретился.
/// Recomputation result: the value, and whether no back edge was seen.
#[derive(Clone, Copy)]
struct Computed {
    value:    Priority,
    complete: bool,
}

pub struct PriorityScheduler<C: Clock = SequenceClock> {
    config:      SchedulerConfig,
    clock:       C,
    threads:     BTreeMap<ThreadHandle, ThreadState>,
    queues:      BTreeMap<QueueId, WaitQueue>,
    next_queue:  u64,
    next_thread: u64,
}

impl PriorityScheduler<SequenceClock> {
    pub const fn new() -> Self {
        Self::with_config(SchedulerConfig::new())
    }

    pub const fn with_config(config: SchedulerConfig) -> Self {
        Self::with_clock(SequenceClock::new(), config)
    }
}

impl Default for PriorityScheduler<SequenceClock> {
    fn default() -> Self { Self::new() }
}

impl<C: Clock> PriorityScheduler<C> {
    /// Планировщик с часами ядра вместо счётчика.
    /// Scheduler stamping enqueue_time from the kernel's clock instead of a counter.
    pub const fn with_clock(clock: C, config: SchedulerConfig) -> Self {
        Self {
            config,
            clock,
            threads:     BTreeMap::new(),
            queues:      BTreeMap::new(),
            next_queue:  0,
            next_thread: 0,
        }
    }

    pub fn config(&self) -> SchedulerConfig { self.config }

    // ── Потоки / Threads ─────────────────────────────────────────────────────

    /// Выдать новый handle (для встраивания без своих идентификаторов).
    /// Allocate a fresh handle, in creation order.
    pub fn spawn(&mut self) -> ThreadHandle {
        while self.threads.contains_key(&ThreadHandle(self.next_thread)) {
            self.next_thread += 1;
        }
        let handle = ThreadHandle(self.next_thread);
        self.next_thread += 1;
        self.threads.insert(handle, ThreadState::new());
        trace!("[sched] spawn {}", handle);
        handle
    }

    /// Освободить запись завершившегося потока.
    /// Release the record of a finished thread.
    ///
    /// Поток не должен владеть очередью или ждать в ней, в том числе в
    /// недонорской (их записи потока не помнят).
    /// The thread must not own or wait in any queue, non-donating ones
    /// included (the thread record does not list those).
    pub fn drop_thread(&mut self, thread: ThreadHandle) -> Result<()> {
        let Some(state) = self.threads.get(&thread) else {
            return Ok(());
        };
        let busy = !state.owned_queues.is_empty()
            || !state.waiting_queues.is_empty()
            || self.queues.values().any(|q| q.owner == Some(thread) || q.waiters.contains(&thread));
        if busy {
            return Err(Error::ThreadBusy(thread));
        }
        self.threads.remove(&thread);
        trace!("[sched] drop {}", thread);
        Ok(())
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    fn state(&mut self, thread: ThreadHandle) -> &mut ThreadState {
        self.threads.entry(thread).or_insert_with(ThreadState::new)
    }

    /// Базовый приоритет (запись создаётся при первом обращении).
    /// Base priority; the record is created on first reference.
    pub fn get_priority(&mut self, thread: ThreadHandle) -> Priority {
        self.state(thread).base
    }

    pub fn set_priority(&mut self, thread: ThreadHandle, priority: Priority) -> Result<()> {
        priority::check(priority)?;
        self.set_base(thread, priority);
        Ok(())
    }

    fn set_base(&mut self, thread: ThreadHandle, priority: Priority) {
        let state = self.state(thread);
        if state.base == priority {
            return;
        }
        debug!("[sched] {} priority {} -> {}", thread, state.base, priority);
        state.base = priority;

        match self.config.invalidation {
            Invalidation::Transitive => self.invalidate(Node::Thread(thread)),
            Invalidation::Direct => {
                let state = self.state(thread);
                state.valid = false;
                let waiting: Vec<QueueId> = state.waiting_queues.iter().copied().collect();
                for id in waiting {
                    if let Some(queue) = self.queues.get_mut(&id) {
                        queue.valid = false;
                    }
                }
            }
        }
    }

    /// +1 к базовому приоритету; false если уже MAX.
    /// Raise base priority by one; false (and no change) at MAX.
    pub fn increase_priority(&mut self, thread: ThreadHandle) -> bool {
        let priority = self.get_priority(thread);
        if priority >= PRIORITY_MAX {
            return false;
        }
        self.set_base(thread, priority + 1);
        true
    }

    /// -1 к базовому приоритету; false если уже MIN.
    /// Lower base priority by one; false (and no change) at MIN.
    pub fn decrease_priority(&mut self, thread: ThreadHandle) -> bool {
        let priority = self.get_priority(thread);
        if priority <= PRIORITY_MIN {
            return false;
        }
        self.set_base(thread, priority - 1);
        true
    }

    pub fn get_effective_priority(&mut self, thread: ThreadHandle) -> Priority {
        let mut path = BTreeSet::new();
        self.thread_effective(thread, &mut path).value
    }

    // ── Очереди / Queues ─────────────────────────────────────────────────────

    pub fn new_queue(&mut self, donates_priority: bool) -> QueueId {
        let id = QueueId(self.next_queue);
        self.next_queue += 1;
        self.queues.insert(id, WaitQueue::new(donates_priority));
        trace!("[sched] new {} donates={}", id, donates_priority);
        id
    }

    /// Освободить очередь уничтоженного ресурса.
    /// Release the slot of a destroyed resource's queue.
    pub fn drop_queue(&mut self, id: QueueId) -> Result<()> {
        if !self.queue(id)?.is_idle() {
            return Err(Error::QueueBusy(id));
        }
        self.queues.remove(&id);
        trace!("[sched] drop {}", id);
        Ok(())
    }

    fn queue(&self, id: QueueId) -> Result<&WaitQueue> {
        self.queues.get(&id).ok_or(Error::UnknownQueue(id))
    }

    pub fn owner(&self, id: QueueId) -> Result<Option<ThreadHandle>> {
        Ok(self.queue(id)?.owner)
    }

    pub fn donates_priority(&self, id: QueueId) -> Result<bool> {
        Ok(self.queue(id)?.donates)
    }

    pub fn waiter_count(&self, id: QueueId) -> Result<usize> {
        Ok(self.queue(id)?.waiters.len())
    }

    pub fn is_waiting(&self, id: QueueId, thread: ThreadHandle) -> Result<bool> {
        Ok(self.queue(id)?.waiters.contains(&thread))
    }

    /// Поток не может продолжать — встать в очередь.
    /// The thread cannot proceed; add it to the queue's waiters.
    pub fn wait_for_access(&mut self, id: QueueId, thread: ThreadHandle) -> Result<()> {
        let queue = self.queue(id)?;
        if queue.owner == Some(thread) {
            return Err(Error::WaiterIsOwner { queue: id, thread });
        }
        if queue.waiters.contains(&thread) {
            return Err(Error::AlreadyWaiting { queue: id, thread });
        }
        let donates = queue.donates;

        let now = self.clock.now();
        let state = self.state(thread);
        state.enqueue_time = now;
        if donates {
            state.waiting_queues.insert(id);
        }
        if let Some(queue) = self.queues.get_mut(&id) {
            queue.waiters.insert(thread);
        }
        self.invalidate_queue(id);
        trace!("[sched] {} waits in {} at t={}", thread, id, now);
        Ok(())
    }

    /// Безусловно сделать поток владельцем очереди.
    /// Unconditionally make the thread the queue's owner.
    pub fn acquire(&mut self, id: QueueId, thread: ThreadHandle) -> Result<()> {
        let queue = self.queue(id)?;
        if queue.waiters.contains(&thread) {
            return Err(Error::OwnerIsWaiter { queue: id, thread });
        }
        if let Some(prev) = queue.owner.filter(|&prev| prev != thread) {
            warn!("[sched] {} overwrites owner {} of {}", thread, prev, id);
        }
        self.set_owner(id, thread);
        debug!("[sched] {} acquires {}", thread, id);
        Ok(())
    }

    /// Передать владение лучшему ожидающему; None если никто не ждёт.
    /// Hand ownership to the best waiter; None (and no owner) if nobody waits.
    pub fn next_thread(&mut self, id: QueueId) -> Result<Option<ThreadHandle>> {
        self.queue(id)?;
        let Some(next) = self.select(id) else {
            let (donates, prev) = match self.queues.get_mut(&id) {
                Some(queue) => (queue.donates, queue.owner.take()),
                None        => return Ok(None),
            };
            if let (true, Some(prev)) = (donates, prev) {
                self.state(prev).owned_queues.remove(&id);
                self.invalidate_queue(id);
                self.invalidate_thread(prev);
            }
            debug!("[sched] {} released, no waiters", id);
            return Ok(None);
        };

        if let Some(queue) = self.queues.get_mut(&id) {
            queue.waiters.remove(&next);
        }
        self.state(next).waiting_queues.remove(&id);
        self.invalidate_queue(id);
        self.set_owner(id, next);
        debug!("[sched] {} handed to {}", id, next);
        Ok(Some(next))
    }

    /// То, что вернул бы next_thread(), без изменения состояния.
    /// What next_thread() would return, without changing ownership.
    pub fn pick_next_thread(&mut self, id: QueueId) -> Result<Option<ThreadHandle>> {
        self.queue(id)?;
        Ok(self.select(id))
    }

    pub fn queue_effective_priority(&mut self, id: QueueId) -> Result<Priority> {
        self.queue(id)?;
        let mut path = BTreeSet::new();
        Ok(self.queue_effective(id, &mut path).value)
    }

    /// Снимок очереди: владелец и ожидающие в порядке выбора.
    /// Queue snapshot: owner and waiters in selection order.
    pub fn snapshot(&mut self, id: QueueId) -> Result<QueueSnapshot> {
        let (donates, owner) = {
            let queue = self.queue(id)?;
            (queue.donates, queue.owner)
        };
        let mut ranked = self.ranked_waiters(id);
        ranked.sort_unstable();
        let snapshot = QueueSnapshot {
            id,
            donates,
            owner,
            waiters:   ranked.into_iter().map(|(_, _, t)| t).collect(),
            effective: self.queue_effective_priority(id)?,
        };
        debug!("[sched] {}", snapshot);
        Ok(snapshot)
    }

    // ── Выбор / Selection ────────────────────────────────────────────────────

    /// Ключ выбора: больший приоритет, затем раньше в очереди, затем меньший handle.
    /// Selection key: higher priority, then earlier enqueue, then lower handle.
    fn ranked_waiters(&mut self, id: QueueId) -> Vec<(Reverse<Priority>, u64, ThreadHandle)> {
        let waiters: Vec<ThreadHandle> = match self.queues.get(&id) {
            Some(queue) => queue.waiters.iter().copied().collect(),
            None        => return Vec::new(),
        };
        waiters
            .into_iter()
            .map(|t| {
                let priority = self.get_effective_priority(t);
                (Reverse(priority), self.state(t).enqueue_time, t)
            })
            .collect()
    }

    fn select(&mut self, id: QueueId) -> Option<ThreadHandle> {
        self.ranked_waiters(id).into_iter().min().map(|(_, _, t)| t)
    }

    fn set_owner(&mut self, id: QueueId, thread: ThreadHandle) {
        let (donates, prev) = match self.queues.get_mut(&id) {
            Some(queue) => (queue.donates, queue.owner.replace(thread)),
            None        => return,
        };
        if !donates {
            return;
        }
        if let Some(prev) = prev.filter(|&prev| prev != thread) {
            self.state(prev).owned_queues.remove(&id);
            self.invalidate_thread(prev);
        }
        self.state(thread).owned_queues.insert(id);
        self.invalidate_thread(thread);
    }

    // ── Пересчёт / Recomputation ─────────────────────────────────────────────

    fn thread_effective(&mut self, thread: ThreadHandle, path: &mut BTreeSet<Node>) -> Computed {
        let state = self.state(thread);
        if state.valid {
            return Computed { value: state.effective, complete: true };
        }
        let base = state.base;
        if !path.insert(Node::Thread(thread)) {
            warn!("[sched] donation cycle through {}, using base {}", thread, base);
            return Computed { value: base, complete: false };
        }

        let owned: Vec<QueueId> = state.owned_queues.iter().copied().collect();
        let mut result = Computed { value: base, complete: true };
        for id in owned {
            let donated = self.queue_effective(id, path);
            result.value = result.value.max(donated.value);
            result.complete &= donated.complete;
        }
        path.remove(&Node::Thread(thread));

        if result.complete {
            let state = self.state(thread);
            state.effective = result.value;
            state.valid = true;
        }
        trace!("[sched] {} effective={} cached={}", thread, result.value, result.complete);
        result
    }

    /// Недонорские очереди не кэшируют: их ожидающие их не помнят.
    /// Non-donating queues are not cached: their waiters do not record them.
    fn queue_effective(&mut self, id: QueueId, path: &mut BTreeSet<Node>) -> Computed {
        let (donates, waiters) = match self.queues.get(&id) {
            Some(queue) if queue.donates && queue.valid => {
                return Computed { value: queue.effective, complete: true };
            }
            Some(queue) => (queue.donates, queue.waiters.iter().copied().collect::<Vec<_>>()),
            None        => return Computed { value: PRIORITY_EMPTY, complete: true },
        };
        if !path.insert(Node::Queue(id)) {
            warn!("[sched] donation cycle through {}", id);
            return Computed { value: PRIORITY_EMPTY, complete: false };
        }

        let mut result = Computed { value: PRIORITY_EMPTY, complete: true };
        for thread in waiters {
            let waiter = self.thread_effective(thread, path);
            result.value = result.value.max(waiter.value);
            result.complete &= waiter.complete;
        }
        path.remove(&Node::Queue(id));

        if donates && result.complete {
            if let Some(queue) = self.queues.get_mut(&id) {
                queue.effective = result.value;
                queue.valid = true;
            }
        }
        result
    }

    // ── Сброс кэша / Invalidation ────────────────────────────────────────────

    fn invalidate_thread(&mut self, thread: ThreadHandle) {
        match self.config.invalidation {
            Invalidation::Transitive => self.invalidate(Node::Thread(thread)),
            Invalidation::Direct     => self.state(thread).valid = false,
        }
    }

    fn invalidate_queue(&mut self, id: QueueId) {
        match self.config.invalidation {
            Invalidation::Transitive => self.invalidate(Node::Queue(id)),
            Invalidation::Direct => {
                if let Some(queue) = self.queues.get_mut(&id) {
                    queue.valid = false;
                }
            }
        }
    }

    /// Сбросить вершину и всех, кто от неё зависит.
    /// Invalidate a node and everything whose cache depends on it:
    ///
    ///   thread → donating queues it waits in → their owners → ...
    fn invalidate(&mut self, start: Node) {
        let mut seen = BTreeSet::new();
        let mut work = Vec::from([start]);

        while let Some(node) = work.pop() {
            if !seen.insert(node) {
                continue;
            }
            match node {
                Node::Thread(thread) => {
                    let state = self.state(thread);
                    state.valid = false;
                    work.extend(state.waiting_queues.iter().map(|&id| Node::Queue(id)));
                }
                Node::Queue(id) => {
                    if let Some(queue) = self.queues.get_mut(&id) {
                        queue.valid = false;
                        if let (true, Some(owner)) = (queue.donates, queue.owner) {
                            work.push(Node::Thread(owner));
                        }
                    }
                }
            }
        }
    }
}
