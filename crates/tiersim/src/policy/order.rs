//! Victim orders for the simple reference policies.

use super::tiering::VictimOrder;
use crate::file::File;
use crate::rng::SimRng;

/// Least recently used first.
#[derive(Debug, Clone, Copy, Default)]
pub struct LruOrder;

impl VictimOrder for LruOrder {
    fn name(&self) -> &'static str {
        "lru"
    }

    fn rank(&mut self, candidates: &mut [File], _now_ns: u64) {
        candidates.sort_by_key(|file| file.last_access_ns);
    }
}

/// Oldest first.
#[derive(Debug, Clone, Copy, Default)]
pub struct FifoOrder;

impl VictimOrder for FifoOrder {
    fn name(&self) -> &'static str {
        "fifo"
    }

    fn rank(&mut self, candidates: &mut [File], _now_ns: u64) {
        candidates.sort_by_key(|file| file.creation_time_ns);
    }
}

/// Uniformly random, reproducible for a given seed.
#[derive(Debug, Clone)]
pub struct RandomOrder {
    rng: SimRng,
}

impl RandomOrder {
    pub fn new(rng: SimRng) -> Self {
        Self { rng }
    }
}

impl VictimOrder for RandomOrder {
    fn name(&self) -> &'static str {
        "random"
    }

    fn rank(&mut self, candidates: &mut [File], _now_ns: u64) {
        self.rng.shuffle(candidates);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::TierId;

    fn file(path: &str, created: u64, accessed: u64) -> File {
        let mut file = File::new(path, TierId::new(0), 1, created);
        file.touch(accessed, false);
        file
    }

    fn paths(files: &[File]) -> Vec<&str> {
        files.iter().map(|f| f.path.as_str()).collect()
    }

    fn sample() -> Vec<File> {
        vec![file("/a", 0, 50), file("/b", 10, 20), file("/c", 5, 30)]
    }

    #[test]
    fn lru_ranks_by_last_access() {
        let mut files = sample();
        LruOrder.rank(&mut files, 100);
        assert_eq!(paths(&files), ["/b", "/c", "/a"]);
    }

    #[test]
    fn fifo_ranks_by_creation() {
        let mut files = sample();
        FifoOrder.rank(&mut files, 100);
        assert_eq!(paths(&files), ["/a", "/c", "/b"]);
    }

    #[test]
    fn ties_keep_path_order() {
        let mut files = vec![file("/a", 0, 0), file("/b", 0, 0)];
        LruOrder.rank(&mut files, 0);
        assert_eq!(paths(&files), ["/a", "/b"]);
    }

    #[test]
    fn random_is_reproducible_per_seed() {
        let many = || (0..32).map(|i| file(&format!("/f{i}"), i, i)).collect::<Vec<_>>();

        let mut first = many();
        let mut second = many();
        RandomOrder::new(SimRng::new(3)).rank(&mut first, 0);
        RandomOrder::new(SimRng::new(3)).rank(&mut second, 0);

        assert_eq!(paths(&first), paths(&second));
        assert_ne!(paths(&first), paths(&many()));
    }
}
