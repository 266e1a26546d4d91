use std::collections::BTreeMap;

/// Values read for elements that do not exist yet, keyed by element index.
#[derive(Debug, Clone)]
pub struct DeferredAttributes<T> {
    pending: BTreeMap<usize, T>,
}

impl<T> Default for DeferredAttributes<T> {
    fn default() -> Self {
        Self {
            pending: BTreeMap::new(),
        }
    }
}

impl<T> DeferredAttributes<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` for element `index`, replacing an earlier one.
    pub fn defer(&mut self, index: usize, value: T) {
        self.pending.insert(index, value);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Removes the value waiting for `index`, once that element exists.
    pub fn take(&mut self, index: usize) -> Option<T> {
        self.pending.remove(&index)
    }

    /// Removes every value whose element index is below `count`, in index
    /// order. Later entries stay pending.
    pub fn drain_ready(&mut self, count: usize) -> Vec<(usize, T)> {
        let rest = self.pending.split_off(&count);
        let ready = std::mem::replace(&mut self.pending, rest);
        ready.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_and_drain() {
        let mut d = DeferredAttributes::new();
        d.defer(5, "five");
        d.defer(1, "one");
        d.defer(9, "nine");
        assert_eq!(d.take(1), Some("one"));
        assert_eq!(d.take(1), None);

        let ready = d.drain_ready(6);
        assert_eq!(ready, vec![(5, "five")]);
        assert_eq!(d.len(), 1);
        assert_eq!(d.drain_ready(100), vec![(9, "nine")]);
        assert!(d.is_empty());
    }
}
