//! In-memory runner registry

use relay_interfaces::RunnerRegistry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

/// A registry notification, in the order received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildEvent {
    Up { job_id: Uuid, pid: u32 },
    Down { job_id: Uuid, pid: u32 },
}

/// Records child process notifications and the set of live children
#[derive(Debug, Default)]
pub struct MemoryRunnerRegistry {
    events: Mutex<Vec<ChildEvent>>,
    active: Mutex<HashMap<u32, Uuid>>,
}

impl MemoryRunnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications received so far
    pub fn events(&self) -> Vec<ChildEvent> {
        lock(&self.events).clone()
    }

    /// Children currently registered as running, by pid
    pub fn active_children(&self) -> HashMap<u32, Uuid> {
        lock(&self.active).clone()
    }

    pub fn active_count(&self) -> usize {
        lock(&self.active).len()
    }
}

impl RunnerRegistry for MemoryRunnerRegistry {
    fn child_up(&self, job_id: Uuid, pid: u32) {
        debug!(%job_id, pid, "Task process up");
        lock(&self.events).push(ChildEvent::Up { job_id, pid });
        lock(&self.active).insert(pid, job_id);
    }

    fn child_down(&self, job_id: Uuid, pid: u32) {
        debug!(%job_id, pid, "Task process down");
        lock(&self.events).push(ChildEvent::Down { job_id, pid });
        lock(&self.active).remove(&pid);
    }
}

// Poisoning is ignored: the guarded data stays consistent per call
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_up_down_pairs() {
        let registry = MemoryRunnerRegistry::new();
        let job_id = Uuid::new_v4();

        registry.child_up(job_id, 41);
        registry.child_up(job_id, 42);
        assert_eq!(registry.active_count(), 2);

        registry.child_down(job_id, 41);
        assert_eq!(registry.active_children().get(&42), Some(&job_id));
        assert_eq!(
            registry.events(),
            vec![
                ChildEvent::Up { job_id, pid: 41 },
                ChildEvent::Up { job_id, pid: 42 },
                ChildEvent::Down { job_id, pid: 41 },
            ]
        );
    }
}
