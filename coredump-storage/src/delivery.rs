use std::sync::atomic::{AtomicBool, Ordering};

/// Tracks whether the stored coredump was already delivered.
///
/// Runtime flash writes may complete asynchronously, so after a clear the
/// flash can still hold the old coredump for a while. This flag makes the
/// delivery aware read report an empty region from the moment the clear was
/// accepted.
///
/// The flag starts out `false` at process start. It is set by a successful
/// clear and only goes back to `false` through [`DeliveryState::reset`], which
/// the coredump producer calls when it begins a new capture. The operations are
/// single atomic accesses, so they are safe in any execution context.
#[derive(Debug, Default)]
pub struct DeliveryState {
    delivered: AtomicBool,
}

impl DeliveryState {
    /// A state with no coredump delivered yet.
    pub const fn new() -> Self {
        Self {
            delivered: AtomicBool::new(false),
        }
    }

    /// Returns true once the stored coredump has been delivered and cleared.
    pub fn is_delivered(&self) -> bool {
        self.delivered.load(Ordering::Acquire)
    }

    pub(crate) fn mark_delivered(&self) {
        self.delivered.store(true, Ordering::Release);
    }

    /// Forget about a previous delivery.
    pub fn reset(&self) {
        self.delivered.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod test {
    use super::DeliveryState;

    #[test]
    fn lifecycle() {
        let state = DeliveryState::new();
        assert!(!state.is_delivered());

        state.mark_delivered();
        assert!(state.is_delivered());

        state.reset();
        assert!(!state.is_delivered());
    }
}
