//! # Self-Update Tracking
//!
//! Tells the observer and the selection reader which rendering-tree events
//! the view caused itself.
//!
//! While an [`IgnoreGuard`] is alive the view is writing to the tree. When
//! the outermost guard is dropped, the span of tree sequence numbers
//! produced in the meantime is recorded, and any record or selection change
//! carrying a number inside a recorded span is self-caused. This keeps the
//! filtering correct even when notifications are delivered long after the
//! write, when a plain flag would already have been reset.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::trace;
use weft_dom::DomHandle;

/// Half-open range of tree sequence numbers: `start < seq <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfSpan {
    pub start: u64,
    pub end: u64,
}

impl SelfSpan {
    pub fn contains(&self, seq: u64) -> bool {
        self.start < seq && seq <= self.end
    }
}

#[derive(Debug, Default)]
pub struct UpdateTracker {
    depth: Cell<u32>,
    open_since: Cell<u64>,
    spans: RefCell<Vec<SelfSpan>>,
}

impl UpdateTracker {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Start (or nest into) a self-caused update
    pub fn acquire(self: &Rc<Self>, dom: &DomHandle) -> IgnoreGuard {
        let depth = self.depth.get();
        if depth == 0 {
            self.open_since.set(dom.borrow().seq());
        }
        self.depth.set(depth + 1);

        IgnoreGuard {
            tracker: Rc::clone(self),
            dom: Rc::clone(dom),
        }
    }

    /// Whether a guard is currently held
    pub fn is_held(&self) -> bool {
        self.depth.get() > 0
    }

    /// Whether the event with sequence number `seq` was produced by the view
    pub fn is_self_caused(&self, seq: u64) -> bool {
        if self.is_held() && seq > self.open_since.get() {
            return true;
        }
        self.spans.borrow().iter().any(|span| span.contains(seq))
    }

    /// Forget spans that end at or before `seq`
    pub fn prune(&self, seq: u64) {
        self.spans.borrow_mut().retain(|span| span.end > seq);
    }

    pub fn spans(&self) -> Vec<SelfSpan> {
        self.spans.borrow().clone()
    }

    fn release(&self, end: u64) {
        let depth = self.depth.get().saturating_sub(1);
        self.depth.set(depth);
        if depth > 0 {
            return;
        }

        let span = SelfSpan {
            start: self.open_since.get(),
            end,
        };
        if span.end > span.start {
            trace!(start = span.start, end = span.end, "Recorded self-caused span");
            self.spans.borrow_mut().push(span);
        }
    }
}

/// Scoped marker for a self-caused update, released on every exit path
#[must_use = "the update is only marked while the guard is alive"]
pub struct IgnoreGuard {
    tracker: Rc<UpdateTracker>,
    dom: DomHandle,
}

impl Drop for IgnoreGuard {
    fn drop(&mut self) {
        // The tree may still be borrowed when unwinding; the span then ends
        // where it started and nothing is suppressed after the fact.
        let end = match self.dom.try_borrow() {
            Ok(dom) => dom.seq(),
            Err(_) => self.tracker.open_since.get(),
        };
        self.tracker.release(end);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_dom::Dom;

    #[test]
    fn test_guard_marks_events_while_held() {
        let dom = Dom::new_handle();
        let tracker = UpdateTracker::new();
        let before = dom.borrow().seq();

        let guard = tracker.acquire(&dom);
        assert!(tracker.is_held());
        let text = dom.borrow_mut().create_text("x");
        let doc = dom.borrow().document();
        dom.borrow_mut().append_child(doc, text).unwrap();
        let during = dom.borrow().seq();
        assert!(tracker.is_self_caused(during));
        drop(guard);

        assert!(!tracker.is_held());
        assert!(tracker.is_self_caused(during));
        assert!(!tracker.is_self_caused(before));
        assert_eq!(tracker.spans(), vec![SelfSpan { start: before, end: during }]);

        dom.borrow_mut().set_text(text, "y").unwrap();
        assert!(!tracker.is_self_caused(dom.borrow().seq()));
    }

    #[test]
    fn test_nested_guards_record_one_span() {
        let dom = Dom::new_handle();
        let tracker = UpdateTracker::new();

        let outer = tracker.acquire(&dom);
        {
            let _inner = tracker.acquire(&dom);
            dom.borrow_mut().create_document();
            let doc = dom.borrow().document();
            dom.borrow_mut().blur(doc).unwrap();
        }
        assert!(tracker.is_held());
        drop(outer);

        assert_eq!(tracker.spans().len(), 1);
    }

    #[test]
    fn test_empty_span_is_not_recorded() {
        let dom = Dom::new_handle();
        let tracker = UpdateTracker::new();
        drop(tracker.acquire(&dom));
        assert!(tracker.spans().is_empty());
    }

    #[test]
    fn test_prune_drops_old_spans() {
        let dom = Dom::new_handle();
        let tracker = UpdateTracker::new();
        let doc = dom.borrow().document();

        {
            let _guard = tracker.acquire(&dom);
            dom.borrow_mut().blur(doc).unwrap();
        }
        let end = dom.borrow().seq();
        tracker.prune(end);
        assert!(tracker.spans().is_empty());
        assert!(!tracker.is_self_caused(end));
    }
}
