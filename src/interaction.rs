//! client-side optimistic updates as an explicit state machine.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Settled,
    Pending,
    Committed,
    RolledBack { reason: String },
}

/// display state that may run ahead of the store. `begin` applies a change
/// locally and keeps the previous value; the write's outcome then either
/// commits it or restores the previous value.
#[derive(Debug, Clone, PartialEq)]
pub struct Optimistic<T> {
    shown: T,
    previous: Option<T>,
    phase: Phase,
}

impl<T: Clone> Optimistic<T> {
    pub fn new(value: T) -> Self {
        Self {
            shown: value,
            previous: None,
            phase: Phase::Settled,
        }
    }

    pub fn get(&self) -> &T { &self.shown }

    pub fn phase(&self) -> &Phase { &self.phase }

    pub fn is_pending(&self) -> bool { self.phase == Phase::Pending }

    /// returns `false` while another change is still pending.
    pub fn begin(&mut self, f: impl FnOnce(&mut T)) -> bool {
        if self.is_pending() {
            return false;
        }

        self.previous = Some(self.shown.clone());
        f(&mut self.shown);
        self.phase = Phase::Pending;
        true
    }

    /// `confirmed` replaces the shown value when the store reports one.
    pub fn commit(&mut self, confirmed: Option<T>) {
        if !self.is_pending() {
            return;
        }
        if let Some(v) = confirmed {
            self.shown = v;
        }

        self.previous = None;
        self.phase = Phase::Committed;
    }

    pub fn rollback(&mut self, reason: impl Into<String>) {
        if !self.is_pending() {
            return;
        }
        if let Some(prev) = self.previous.take() {
            self.shown = prev;
        }

        let reason = reason.into();
        tracing::debug!("optimistic change rolled back: {}", reason);
        self.phase = Phase::RolledBack { reason };
    }

    /// feeds a write's result straight into `commit` or `rollback`.
    pub fn settle<E: ::core::fmt::Display>(&mut self, result: Result<Option<T>, E>) {
        match result {
            Ok(v) => self.commit(v),
            Err(e) => self.rollback(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_keeps_change() {
        let mut o = Optimistic::new(0u32);
        assert!(o.begin(|v| *v += 1));
        assert_eq!(*o.get(), 1);

        o.commit(None);
        assert_eq!(*o.get(), 1);
        assert_eq!(o.phase(), &Phase::Committed);
    }

    #[test]
    fn rollback_restores_previous() {
        let mut o = Optimistic::new((false, 3u32));
        o.begin(|(liked, n)| {
            *liked = true;
            *n += 1;
        });
        o.settle::<&str>(Err("network down"));

        assert_eq!(*o.get(), (false, 3));
        assert_eq!(
            o.phase(),
            &Phase::RolledBack {
                reason: "network down".to_string()
            }
        );
    }

    #[test]
    fn second_begin_waits_for_settlement() {
        let mut o = Optimistic::new(0);
        assert!(o.begin(|v| *v = 1));
        assert!(!o.begin(|v| *v = 2));
        assert_eq!(*o.get(), 1);

        o.commit(Some(5));
        assert_eq!(*o.get(), 5);
        assert!(o.begin(|v| *v = 6));
    }
}
