use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::hash::Hash;

use hashbrown::{HashMap, HashSet};

/// Directed graph backed by an insertion-ordered adjacency map.
///
/// Vertices and each vertex's successors are kept in the order they were
/// first inserted, so traversals (and therefore the cycle or topological
/// order they report) are deterministic. Parallel edges are collapsed.
///
/// Used for the precedence graph between transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiGraph<T>
where
    T: Hash + Eq + Clone + Debug,
{
    vertices: Vec<T>,
    /// Maps each vertex to the vertices it has edges to.
    adj_map: HashMap<T, Vec<T>>,
}

impl<T> Default for DiGraph<T>
where
    T: Hash + Eq + Clone + Debug,
{
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            adj_map: HashMap::new(),
        }
    }
}

impl<T> DiGraph<T>
where
    T: Hash + Eq + Clone + Debug,
{
    /// Adds a vertex with no outgoing edges (if not already present).
    pub fn add_vertex(&mut self, vertex: T) {
        if !self.adj_map.contains_key(&vertex) {
            self.vertices.push(vertex.clone());
            self.adj_map.insert(vertex, Vec::new());
        }
    }

    /// Inserts a directed edge from `source` to `target`.
    ///
    /// Both vertices are added to the graph if not already present.
    pub fn add_edge(&mut self, source: T, target: T) {
        self.add_vertex(source.clone());
        self.add_vertex(target.clone());
        if let Some(successors) = self.adj_map.get_mut(&source) {
            if !successors.contains(&target) {
                successors.push(target);
            }
        }
    }

    /// Returns `true` if an edge from `source` to `target` exists.
    pub fn has_edge(&self, source: &T, target: &T) -> bool {
        self.adj_map
            .get(source)
            .is_some_and(|successors| successors.contains(target))
    }

    /// Vertices in insertion order.
    #[must_use]
    pub fn vertices(&self) -> &[T] {
        &self.vertices
    }

    /// Successors of `vertex` in insertion order.
    pub fn successors(&self, vertex: &T) -> &[T] {
        self.adj_map.get(vertex).map_or(&[][..], Vec::as_slice)
    }

    /// Finds a cycle by depth-first search.
    ///
    /// Vertices and successors are visited in insertion order; the first
    /// edge that reaches a vertex still on the recursion stack closes the
    /// reported cycle. The result lists the cycle's vertices in path order;
    /// the last one has an edge back to the first.
    #[must_use]
    pub fn find_cycle(&self) -> Option<Vec<T>> {
        let mut visited = HashSet::new();
        let mut path = Vec::new();
        self.vertices.iter().find_map(|vertex| {
            if visited.contains(vertex) {
                None
            } else {
                self.cycle_from(vertex, &mut visited, &mut path)
            }
        })
    }

    fn cycle_from(
        &self,
        vertex: &T,
        visited: &mut HashSet<T>,
        path: &mut Vec<T>,
    ) -> Option<Vec<T>> {
        visited.insert(vertex.clone());
        path.push(vertex.clone());
        for next in self.successors(vertex) {
            // `path` is exactly the recursion stack.
            if let Some(start) = path.iter().position(|v| v == next) {
                return Some(path[start..].to_vec());
            }
            if !visited.contains(next) {
                if let Some(cycle) = self.cycle_from(next, visited, path) {
                    return Some(cycle);
                }
            }
        }
        path.pop();
        None
    }

    /// Returns `true` if the graph contains a cycle.
    #[must_use]
    pub fn has_cycle(&self) -> bool {
        self.find_cycle().is_some()
    }

    /// Returns `true` if the graph has no cycles.
    #[must_use]
    pub fn is_acyclic(&self) -> bool {
        !self.has_cycle()
    }

    /// Returns a topological ordering of vertices if the graph is acyclic,
    /// or None if the graph contains a cycle.
    ///
    /// Kahn's algorithm with a FIFO queue seeded in insertion order, so
    /// among ready vertices the earliest inserted comes first.
    /// Time complexity: O(V+E).
    #[must_use]
    pub fn topological_sort(&self) -> Option<Vec<T>> {
        let mut in_degree: HashMap<&T, usize> =
            self.vertices.iter().map(|vertex| (vertex, 0)).collect();
        for successors in self.adj_map.values() {
            for successor in successors {
                *in_degree.entry(successor).or_insert(0) += 1;
            }
        }

        let mut queue: VecDeque<&T> = self
            .vertices
            .iter()
            .filter(|vertex| in_degree.get(vertex).copied() == Some(0))
            .collect();

        let mut result = Vec::with_capacity(self.vertices.len());
        while let Some(vertex) = queue.pop_front() {
            result.push(vertex.clone());
            for successor in self.successors(vertex) {
                if let Some(degree) = in_degree.get_mut(successor) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(successor);
                    }
                }
            }
        }

        (result.len() == self.vertices.len()).then_some(result)
    }

    /// Returns all edges as a list of (source, target) pairs, in insertion order.
    #[must_use]
    pub fn to_edge_list(&self) -> Vec<(T, T)> {
        self.vertices
            .iter()
            .flat_map(|source| {
                self.successors(source)
                    .iter()
                    .map(move |target| (source.clone(), target.clone()))
            })
            .collect()
    }
}
