//! Arena-indexed disjoint-set with path compression, used by the
//! clusterizer to link header nodes without cyclic object-graph references.

/// Disjoint-set over integer indices `0..n`. Callers keep their own
/// `Vec<T>` in parallel with the indices handed to [`UnionFind::union`].
pub struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
        }
    }

    pub fn find(&mut self, index: usize) -> usize {
        if self.parent[index] != index {
            let root = self.find(self.parent[index]);
            self.parent[index] = root;
        }
        self.parent[index]
    }

    /// Unions the sets containing `a` and `b`, making `find(a)`'s root win
    /// so callers can rely on a deterministic survivor.
    pub fn union(&mut self, a: usize, b: usize) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            self.parent[root_b] = root_a;
        }
    }

    /// Groups `0..n` by root, in first-seen order.
    #[must_use]
    pub fn groups(mut self) -> Vec<Vec<usize>> {
        let mut by_root: Vec<(usize, Vec<usize>)> = Vec::new();
        for index in 0..self.parent.len() {
            let root = self.find(index);
            match by_root.iter_mut().find(|(r, _)| *r == root) {
                Some((_, members)) => members.push(index),
                None => by_root.push((root, vec![index])),
            }
        }
        by_root.into_iter().map(|(_, members)| members).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrelated_indices_stay_in_singleton_groups() {
        let uf = UnionFind::new(3);
        let groups = uf.groups();
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn union_merges_transitively() {
        let mut uf = UnionFind::new(4);
        uf.union(0, 1);
        uf.union(1, 2);
        assert_eq!(uf.find(0), uf.find(2));
        assert_ne!(uf.find(0), uf.find(3));
    }

    #[test]
    fn groups_cover_every_index_exactly_once() {
        let mut uf = UnionFind::new(5);
        uf.union(0, 2);
        uf.union(3, 4);
        let groups = uf.groups();
        let total: usize = groups.iter().map(Vec::len).sum();
        assert_eq!(total, 5);
    }
}
