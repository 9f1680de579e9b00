//! Union-Find (disjoint set) with path compression and union by rank.
//!
//! Used to split a bucket into proximity components: plots connected by a
//! chain of within-threshold neighbours end up in one set.

use std::collections::HashMap;
use std::hash::Hash;

/// Disjoint-set forest keyed by arbitrary hashable items.
#[derive(Debug, Clone)]
pub struct UnionFind<T> {
    parent: HashMap<T, T>,
    rank: HashMap<T, u32>,
}

impl<T> Default for UnionFind<T>
where
    T: Clone + Eq + Hash + Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> UnionFind<T>
where
    T: Clone + Eq + Hash + Ord,
{
    pub fn new() -> Self {
        Self {
            parent: HashMap::new(),
            rank: HashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            parent: HashMap::with_capacity(capacity),
            rank: HashMap::with_capacity(capacity),
        }
    }

    /// Add a singleton set. Existing items are left untouched.
    pub fn make_set(&mut self, item: T) {
        if !self.parent.contains_key(&item) {
            self.parent.insert(item.clone(), item.clone());
            self.rank.insert(item, 0);
        }
    }

    /// Root of the set containing `item`. Unknown items are their own root.
    pub fn find(&mut self, item: &T) -> T {
        let mut root = item.clone();
        while let Some(parent) = self.parent.get(&root) {
            if *parent == root {
                break;
            }
            root = parent.clone();
        }

        // Path compression
        let mut current = item.clone();
        while current != root {
            let next = match self.parent.get(&current) {
                Some(p) => p.clone(),
                None => break,
            };
            self.parent.insert(current, root.clone());
            current = next;
        }

        root
    }

    /// Merge the sets containing `a` and `b`.
    pub fn union(&mut self, a: &T, b: &T) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return;
        }

        let rank_a = self.rank.get(&root_a).copied().unwrap_or(0);
        let rank_b = self.rank.get(&root_b).copied().unwrap_or(0);

        if rank_a < rank_b {
            self.parent.insert(root_a, root_b);
        } else if rank_a > rank_b {
            self.parent.insert(root_b, root_a);
        } else {
            self.parent.insert(root_b, root_a.clone());
            self.rank.insert(root_a, rank_a + 1);
        }
    }

    pub fn connected(&mut self, a: &T, b: &T) -> bool {
        self.find(a) == self.find(b)
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// All sets as root -> members, members sorted ascending.
    pub fn groups(&mut self) -> HashMap<T, Vec<T>> {
        let items: Vec<T> = self.parent.keys().cloned().collect();
        let mut groups: HashMap<T, Vec<T>> = HashMap::new();
        for item in items {
            let root = self.find(&item);
            groups.entry(root).or_default().push(item);
        }
        for members in groups.values_mut() {
            members.sort();
        }
        groups
    }

    /// All sets as member lists, ordered by their smallest member.
    pub fn sorted_groups(&mut self) -> Vec<Vec<T>> {
        let mut groups: Vec<Vec<T>> = self.groups().into_values().collect();
        groups.sort_by(|a, b| a.first().cmp(&b.first()));
        groups
    }
}
