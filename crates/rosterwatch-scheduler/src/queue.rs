//! Priority task queue — sorted descending by priority, FIFO among equals.

use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};

use crate::tasks::Task;

/// Queue length plus a priority histogram.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct QueueSnapshot {
    pub length: usize,
    /// priority (rendered to one decimal) → pending tasks
    pub histogram: BTreeMap<String, usize>,
}

/// Histogram key for a priority: `10`, `99.9`.
pub fn priority_key(priority: f64) -> String {
    let rounded = (priority * 10.0).round() / 10.0;
    format!("{rounded}")
}

#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: VecDeque<Task>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert after every task of equal or higher priority.
    pub fn enqueue(&mut self, task: Task) {
        let at = self.tasks.partition_point(|t| t.priority >= task.priority);
        self.tasks.insert(at, task);
    }

    pub fn enqueue_batch<I: IntoIterator<Item = Task>>(&mut self, tasks: I) -> usize {
        let mut n = 0;
        for task in tasks {
            self.enqueue(task);
            n += 1;
        }
        n
    }

    /// Remove and return the highest-priority task.
    pub fn dequeue_next(&mut self) -> Option<Task> {
        self.tasks.pop_front()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let mut histogram = BTreeMap::new();
        for task in &self.tasks {
            *histogram.entry(priority_key(task.priority)).or_insert(0) += 1;
        }
        QueueSnapshot {
            length: self.tasks.len(),
            histogram,
        }
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Pending tasks in dequeue order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }
}
