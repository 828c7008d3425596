//! Сценарии донорства через клиентов-примитивов
//! Donation scenarios driven through lock/join-style clients

use cupruxos_sched::{
    Error, PriorityScheduler, QueueId, ThreadHandle, PRIORITY_DEFAULT, PRIORITY_MAX, PRIORITY_MIN,
};

/// Минимальный lock поверх очереди с донорством.
/// Minimal lock on top of a donating queue.
struct Lock {
    queue: QueueId,
}

impl Lock {
    fn new(sched: &mut PriorityScheduler) -> Self {
        Self { queue: sched.new_queue(true) }
    }

    /// true — захватил сразу, false — встал в очередь.
    fn acquire(&self, sched: &mut PriorityScheduler, thread: ThreadHandle) -> bool {
        if sched.owner(self.queue).unwrap().is_none() {
            sched.acquire(self.queue, thread).unwrap();
            true
        } else {
            sched.wait_for_access(self.queue, thread).unwrap();
            false
        }
    }

    fn release(&self, sched: &mut PriorityScheduler) -> Option<ThreadHandle> {
        sched.next_thread(self.queue).unwrap()
    }
}

fn thread(sched: &mut PriorityScheduler, priority: i32) -> ThreadHandle {
    let t = sched.spawn();
    sched.set_priority(t, priority).unwrap();
    t
}

#[test]
fn fresh_handles_report_default_priority() {
    let mut sched = PriorityScheduler::new();
    for raw in [0, 17, u64::MAX] {
        let t = ThreadHandle::from_raw(raw);
        assert_eq!(sched.get_priority(t), PRIORITY_DEFAULT);
    }
}

#[test]
fn bounds_on_increase_and_decrease() {
    let mut sched = PriorityScheduler::new();
    let t = sched.spawn();

    while sched.increase_priority(t) {}
    assert_eq!(sched.get_priority(t), PRIORITY_MAX);
    assert!(!sched.increase_priority(t));
    assert_eq!(sched.get_priority(t), PRIORITY_MAX);

    while sched.decrease_priority(t) {}
    assert_eq!(sched.get_priority(t), PRIORITY_MIN);
    assert!(!sched.decrease_priority(t));
    assert_eq!(sched.get_priority(t), PRIORITY_MIN);
}

#[test]
fn high_waiter_lifts_low_holder_until_release() {
    let mut sched = PriorityScheduler::new();
    let a = thread(&mut sched, 1);
    let b = thread(&mut sched, 7);
    let lock = Lock::new(&mut sched);

    assert!(lock.acquire(&mut sched, a));
    assert!(!lock.acquire(&mut sched, b));
    assert_eq!(sched.get_effective_priority(a), 7);

    assert_eq!(lock.release(&mut sched), Some(b));
    assert_eq!(sched.owner(lock.queue), Ok(Some(b)));
    assert_eq!(sched.waiter_count(lock.queue), Ok(0));
    assert_eq!(sched.get_effective_priority(a), 1);
    assert_eq!(sched.get_effective_priority(b), 7);

    assert_eq!(lock.release(&mut sched), None);
    assert_eq!(sched.owner(lock.queue), Ok(None));
}

#[test]
fn holder_of_two_locks_keeps_the_larger_donation() {
    let mut sched = PriorityScheduler::new();
    let holder = thread(&mut sched, 0);
    let mid = thread(&mut sched, 4);
    let high = thread(&mut sched, 6);
    let l1 = Lock::new(&mut sched);
    let l2 = Lock::new(&mut sched);

    l1.acquire(&mut sched, holder);
    l2.acquire(&mut sched, holder);
    l1.acquire(&mut sched, mid);
    l2.acquire(&mut sched, high);
    assert_eq!(sched.get_effective_priority(holder), 6);

    assert_eq!(l2.release(&mut sched), Some(high));
    assert_eq!(sched.get_effective_priority(holder), 4);
    assert_eq!(l1.release(&mut sched), Some(mid));
    assert_eq!(sched.get_effective_priority(holder), 0);
}

#[test]
fn fifo_among_equals_with_requeue() {
    let mut sched = PriorityScheduler::new();
    let lock = Lock::new(&mut sched);
    let owner = thread(&mut sched, 3);
    let t1 = thread(&mut sched, 3);
    let t2 = thread(&mut sched, 3);
    let t3 = thread(&mut sched, 3);

    lock.acquire(&mut sched, owner);
    for t in [t1, t2, t3] {
        lock.acquire(&mut sched, t);
    }

    // Каждый получивший lock сразу снова встаёт в очередь.
    let mut order = Vec::new();
    for _ in 0..6 {
        let prev = sched.owner(lock.queue).unwrap().unwrap();
        let next = lock.release(&mut sched).unwrap();
        order.push(next);
        sched.wait_for_access(lock.queue, prev).unwrap();
    }
    assert_eq!(order, vec![t1, t2, t3, owner, t1, t2]);
}

#[test]
fn higher_priority_arrival_jumps_the_line() {
    let mut sched = PriorityScheduler::new();
    let lock = Lock::new(&mut sched);
    let owner = thread(&mut sched, 2);
    let t1 = thread(&mut sched, 2);
    let t2 = thread(&mut sched, 2);
    let urgent = thread(&mut sched, 5);

    lock.acquire(&mut sched, owner);
    lock.acquire(&mut sched, t1);
    lock.acquire(&mut sched, t2);
    lock.acquire(&mut sched, urgent);

    assert_eq!(sched.pick_next_thread(lock.queue), Ok(Some(urgent)));
    assert_eq!(lock.release(&mut sched), Some(urgent));
    assert_eq!(lock.release(&mut sched), Some(t1));
    assert_eq!(lock.release(&mut sched), Some(t2));
}

#[test]
fn join_queue_donates_to_target() {
    // join: целевой поток владеет своей join-очередью с момента создания.
    let mut sched = PriorityScheduler::new();
    let target = thread(&mut sched, 1);
    let joiner = thread(&mut sched, 5);
    let join = sched.new_queue(true);
    let ready = sched.new_queue(false);

    sched.acquire(join, target).unwrap();
    sched.wait_for_access(join, joiner).unwrap();
    assert_eq!(sched.get_effective_priority(target), 5);

    // В ready queue target обгоняет поток с базовым 4.
    let rival = thread(&mut sched, 4);
    sched.wait_for_access(ready, rival).unwrap();
    sched.wait_for_access(ready, target).unwrap();
    assert_eq!(sched.next_thread(ready), Ok(Some(target)));

    // target завершился — join-очередь отдаёт joiner'а.
    assert_eq!(sched.next_thread(join), Ok(Some(joiner)));
    assert_eq!(sched.get_effective_priority(target), 1);
}

#[test]
fn no_op_set_priority_keeps_reads_stable() {
    let mut sched = PriorityScheduler::new();
    let a = thread(&mut sched, 2);
    let b = thread(&mut sched, 6);
    let lock = Lock::new(&mut sched);
    lock.acquire(&mut sched, a);
    lock.acquire(&mut sched, b);

    let before = (sched.get_effective_priority(a), sched.get_effective_priority(b));
    sched.set_priority(b, 6).unwrap();
    sched.set_priority(a, 2).unwrap();
    let after = (sched.get_effective_priority(a), sched.get_effective_priority(b));
    assert_eq!(before, (6, 6));
    assert_eq!(before, after);
    assert_eq!(sched.queue_effective_priority(lock.queue), Ok(6));
}

#[test]
fn raising_a_waiter_reaches_the_holder() {
    let mut sched = PriorityScheduler::new();
    let holder = thread(&mut sched, 1);
    let waiter = thread(&mut sched, 2);
    let lock = Lock::new(&mut sched);
    lock.acquire(&mut sched, holder);
    lock.acquire(&mut sched, waiter);
    assert_eq!(sched.get_effective_priority(holder), 2);

    assert!(sched.increase_priority(waiter));
    assert!(sched.increase_priority(waiter));
    assert_eq!(sched.get_effective_priority(holder), 4);
    assert_eq!(sched.get_priority(holder), 1);
}

#[test]
fn contract_violations_leave_state_untouched() {
    let mut sched = PriorityScheduler::new();
    let a = thread(&mut sched, 3);
    let b = thread(&mut sched, 5);
    let lock = Lock::new(&mut sched);
    lock.acquire(&mut sched, a);
    lock.acquire(&mut sched, b);

    assert_eq!(sched.set_priority(a, 9), Err(Error::InvalidPriority { priority: 9 }));
    assert_eq!(
        sched.acquire(lock.queue, b),
        Err(Error::OwnerIsWaiter { queue: lock.queue, thread: b })
    );
    assert_eq!(sched.get_priority(a), 3);
    assert_eq!(sched.get_effective_priority(a), 5);
    assert_eq!(sched.is_waiting(lock.queue, b), Ok(true));
    assert_eq!(sched.owner(lock.queue), Ok(Some(a)));
}
