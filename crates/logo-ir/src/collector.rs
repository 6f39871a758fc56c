use rustc_hash::FxHashMap;
use std::hash::Hash;

/// Assigns dense ids to distinct values, remembering insertion order.
#[derive(Debug, Clone)]
pub struct Collector<T: Eq + Hash> {
    map: FxHashMap<T, usize>,
    items: Vec<T>,
}

impl<T: Eq + Hash + Clone> Collector<T> {
    pub fn get_or_insert(&mut self, t: T) -> usize {
        if let Some(i) = self.map.get(&t) {
            return *i;
        }
        let i = self.items.len();
        self.items.push(t.clone());
        self.map.insert(t, i);
        i
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.items.iter().enumerate()
    }
}

impl<T: Eq + Hash> Default for Collector<T> {
    fn default() -> Self {
        Self {
            map: Default::default(),
            items: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Collector;

    #[test]
    fn ids_follow_first_insertion() {
        let mut c = Collector::default();
        assert_eq!(c.get_or_insert("b"), 0);
        assert_eq!(c.get_or_insert("a"), 1);
        assert_eq!(c.get_or_insert("b"), 0);
        assert_eq!(c.iter().map(|(_, s)| *s).collect::<Vec<_>>(), ["b", "a"]);
    }
}
