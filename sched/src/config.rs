//! Настройки планировщика
//! Scheduler configuration

/// Как далеко распространяется сброс кэша эффективного приоритета.
/// How far effective-priority cache invalidation travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Invalidation {
    /// Поток → очереди, где он ждёт → их владельцы → ... (до неподвижной точки).
    /// Thread → donating queues it waits in → their owners → ... until nothing changes.
    #[default]
    Transitive,
    /// Только сам поток и очереди, где он ждёт напрямую.
    /// Only the thread itself and the queues it directly waits in.
    ///
    /// Владелец такой очереди может держать устаревший кэш, пока его
    /// не сбросит что-то ещё.
    /// The owner of such a queue may keep a stale cache until something
    /// else invalidates it.
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerConfig {
    pub invalidation: Invalidation,
}

impl SchedulerConfig {
    pub const fn new() -> Self {
        Self { invalidation: Invalidation::Transitive }
    }

    pub const fn with_invalidation(mut self, invalidation: Invalidation) -> Self {
        self.invalidation = invalidation;
        self
    }
}
