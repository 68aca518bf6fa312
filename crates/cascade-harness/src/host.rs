//! Scripted host: queues render requests, drains them in arrival order.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use cascade_connect::{BindingId, Host, HostBinding, Phase};
use cascade_core::Result;
use tracing::trace;

use crate::trace::TraceLog;

/// Host implementation backed by a FIFO render queue.
#[derive(Default)]
pub struct TestHost {
    queue: RefCell<VecDeque<BindingId>>,
}

impl Host for TestHost {
    fn request_render(&self, id: BindingId) {
        trace!(id, "render requested");
        self.queue.borrow_mut().push_back(id);
    }
}

impl TestHost {
    fn take_next(&self) -> Option<BindingId> {
        self.queue.borrow_mut().pop_front()
    }

    fn pending(&self) -> usize {
        self.queue.borrow().len()
    }
}

/// Drives bindings through mount, render and unmount the way a UI scheduler
/// would, recording a `"name:render"` trace event per commit.
pub struct Stage {
    host: Rc<TestHost>,
    trace: TraceLog,
    bindings: RefCell<Vec<Rc<dyn HostBinding>>>,
}

impl Stage {
    #[must_use]
    pub fn new(trace: TraceLog) -> Self {
        Self {
            host: Rc::new(TestHost::default()),
            trace,
            bindings: RefCell::new(Vec::new()),
        }
    }

    /// The host handle to put in a bind site.
    #[must_use]
    pub fn host(&self) -> Rc<dyn Host> {
        Rc::clone(&self.host) as Rc<dyn Host>
    }

    /// Mount a freshly bound consumer: initial render commit, then the
    /// mount-completed signal. The binding stays under the stage's control
    /// for [`flush`](Self::flush).
    pub fn mount(&self, binding: impl HostBinding + 'static) -> Result<()> {
        let binding: Rc<dyn HostBinding> = Rc::new(binding);
        self.trace.record(format!("{}:mount", binding.name()));
        binding.commit_render()?;
        binding.complete_mount();
        self.bindings.borrow_mut().push(binding);
        Ok(())
    }

    /// Drain the render queue in arrival order, committing each requested
    /// binding. Commits may enqueue further requests (descendant sweeps);
    /// those are processed in the same drain.
    pub fn flush(&self) -> Result<()> {
        while let Some(id) = self.host.take_next() {
            let binding = self
                .bindings
                .borrow()
                .iter()
                .find(|b| b.id() == id)
                .cloned();
            let Some(binding) = binding else { continue };
            if binding.phase() == Phase::Unmounted {
                continue;
            }
            self.trace.record(format!("{}:render", binding.name()));
            binding.commit_render()?;
        }
        Ok(())
    }

    /// Render requests not yet flushed.
    #[must_use]
    pub fn pending_renders(&self) -> usize {
        self.host.pending()
    }

    /// Unmount every staged binding, most recently mounted first.
    pub fn unmount_all(&self) {
        for binding in self.bindings.borrow_mut().drain(..).rev() {
            binding.unmount();
        }
    }
}
