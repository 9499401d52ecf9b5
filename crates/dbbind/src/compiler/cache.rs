use super::CompiledStatement;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Compiled statements keyed by raw SQL text, evicting the least recently used.
///
/// A cache belongs to one [`Compiler`](super::Compiler), so the paramstyle is fixed.
/// Every hit stamps its entry with a logical clock; eviction only runs when an insert
/// would exceed the capacity.
#[derive(Debug)]
pub(super) struct CompileCache {
    capacity: NonZeroUsize,
    entries: Mutex<Entries>,
}

#[derive(Debug, Default)]
struct Entries {
    clock: u64,
    by_sql: HashMap<String, (Arc<CompiledStatement>, u64)>,
}

impl Entries {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_stalest(&mut self) {
        let stalest = self
            .by_sql
            .iter()
            .min_by_key(|(_, (_, used))| *used)
            .map(|(sql, _)| sql.clone());
        if let Some(sql) = stalest {
            self.by_sql.remove(&sql);
        }
    }
}

impl CompileCache {
    pub(super) fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(Entries::default()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, Entries> {
        // Statements are immutable once inserted, so a poisoned map is still consistent.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn get(&self, sql: &str) -> Option<Arc<CompiledStatement>> {
        let mut entries = self.entries();
        let now = entries.tick();
        let (stmt, used) = entries.by_sql.get_mut(sql)?;
        *used = now;
        Some(Arc::clone(stmt))
    }

    /// Cache `stmt` for `sql`. If another caller got there first, its statement wins and
    /// is returned instead.
    pub(super) fn insert(&self, sql: &str, stmt: Arc<CompiledStatement>) -> Arc<CompiledStatement> {
        let mut entries = self.entries();
        let now = entries.tick();
        if let Some((existing, used)) = entries.by_sql.get_mut(sql) {
            *used = now;
            return Arc::clone(existing);
        }

        if entries.by_sql.len() >= self.capacity.get() {
            entries.evict_stalest();
        }
        entries
            .by_sql
            .insert(sql.to_string(), (Arc::clone(&stmt), now));
        stmt
    }

    pub(super) fn len(&self) -> usize {
        self.entries().by_sql.len()
    }

    pub(super) fn clear(&self) {
        self.entries().by_sql.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParamStyle;
    use crate::compiler::compile;

    fn cache(capacity: usize) -> CompileCache {
        CompileCache::new(NonZeroUsize::new(capacity).unwrap())
    }

    fn stmt(sql: &str) -> Arc<CompiledStatement> {
        Arc::new(compile(sql, ParamStyle::Qmark).unwrap())
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = cache(2);
        cache.insert("a", stmt("select :a"));
        cache.insert("b", stmt("select :b"));
        assert!(cache.get("a").is_some());
        cache.insert("c", stmt("select :c"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn first_insert_wins() {
        let cache = cache(4);
        let first = cache.insert("q", stmt("select :x"));
        let second = cache.insert("q", stmt("select :y"));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn capacity_of_one_keeps_the_latest() {
        let cache = cache(1);
        cache.insert("a", stmt("select :a"));
        cache.insert("b", stmt("select :b"));
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());

        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
