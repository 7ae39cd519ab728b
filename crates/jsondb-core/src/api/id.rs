use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Issues record ids: decimal Unix-millisecond timestamps, strictly
/// increasing within one generator even when several inserts land in the
/// same millisecond or the wall clock steps backwards.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id, greater than every id this generator has issued.
    pub fn next_id(&self) -> u64 {
        let now = now_millis();
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self.last.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => last = actual,
            }
        }
    }

    /// Keep drawing ids until `taken` returns `false` for one.
    pub fn next_unused(&self, taken: impl Fn(&str) -> bool) -> String {
        loop {
            let id = self.next_id().to_string();
            if !taken(&id) {
                return id;
            }
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_ids_strictly_increase() {
        let ids = IdGenerator::new();
        let mut prev = ids.next_id();
        for _ in 0..10_000 {
            let next = ids.next_id();
            assert!(next > prev);
            prev = next;
        }
    }

    #[test]
    fn test_ids_are_time_derived() {
        let before = now_millis();
        let id = IdGenerator::new().next_id();
        assert!(id >= before);
    }

    #[test]
    fn test_concurrent_ids_unique() {
        let ids = Arc::new(IdGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ids = Arc::clone(&ids);
                thread::spawn(move || (0..1_000).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 4_000);
    }

    #[test]
    fn test_next_unused_skips_taken() {
        let ids = IdGenerator::new();
        let first = ids.next_id();
        let blocked = (first + 1).to_string();
        let blocked2 = (first + 2).to_string();
        let id = ids.next_unused(|c| c == blocked || c == blocked2);
        assert!(id.parse::<u64>().unwrap() >= first + 3);
    }
}
