//! An explicit macrotask queue.
//!
//! The host loop decides when a "tick" ends by calling [`TaskQueue::run_next`] or
//! [`TaskQueue::run_until_idle`]. A [`SameTickWindow`] created against the queue
//! stays open until the task it scheduled at creation time runs.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

type Task = Box<dyn FnOnce()>;

#[derive(Clone, Default)]
pub struct TaskQueue {
    tasks: Rc<RefCell<VecDeque<Task>>>,
}
impl TaskQueue {
    pub fn new() -> Self {
        TaskQueue::default()
    }

    pub fn schedule<F: FnOnce() + 'static>(&self, task: F) {
        self.tasks.borrow_mut().push_back(Box::new(task));
    }

    /// Runs the oldest task. Tasks may schedule more tasks.
    pub fn run_next(&self) -> bool {
        let task = self.tasks.borrow_mut().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }

    pub fn pending(&self) -> usize {
        self.tasks.borrow().len()
    }
}
impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskQueue({} pending)", self.pending())
    }
}

/// Whether a top-level proxy is still in the flow that created it.
#[derive(Clone, Debug)]
pub struct SameTickWindow {
    open: Rc<Cell<bool>>,
}
impl SameTickWindow {
    /// Open now; closed by the next task the queue runs.
    pub fn scheduled(queue: &TaskQueue) -> Self {
        let window = SameTickWindow {
            open: Rc::new(Cell::new(true)),
        };
        let flag = window.open.clone();
        queue.schedule(move || flag.set(false));
        window
    }

    pub fn always_open() -> Self {
        SameTickWindow {
            open: Rc::new(Cell::new(true)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_closes_on_next_task() {
        let queue = TaskQueue::new();
        let window = SameTickWindow::scheduled(&queue);
        assert!(window.is_open());
        assert_eq!(queue.pending(), 1);
        assert!(queue.run_next());
        assert!(!window.is_open());
        assert!(!queue.run_next());
    }

    #[test]
    fn test_tasks_run_in_order_and_may_reschedule() {
        let queue = TaskQueue::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (q, l1, l2) = (queue.clone(), log.clone(), log.clone());
        queue.schedule(move || {
            l1.borrow_mut().push(1);
            let l3 = l1.clone();
            q.schedule(move || l3.borrow_mut().push(3));
        });
        queue.schedule(move || l2.borrow_mut().push(2));
        assert_eq!(queue.run_until_idle(), 3);
        assert_eq!(*log.borrow(), vec![1, 2, 3]);
    }
}
