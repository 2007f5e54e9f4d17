//! Graph Traversal
//!
//! BFS over the dependency graphs: shortest call chains over `deps_out` and
//! impact closures over `deps_in`. Neighbor expansion is in sorted order so
//! results never depend on map iteration order.
//!
//! @module query/traverse

use std::collections::{HashMap, HashSet, VecDeque};

/// Shortest path from `from` to `to` over the forward dependency graph.
/// Returns the qualified-name chain inclusive of both endpoints, or `None`
/// when no path exists. `from == to` yields a single-element chain.
pub fn shortest_chain(
    deps_out: &HashMap<String, HashSet<String>>,
    from: &str,
    to: &str,
) -> Option<Vec<String>> {
    if from == to {
        return Some(vec![from.to_string()]);
    }

    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<Vec<&str>> = VecDeque::new();
    visited.insert(from);
    queue.push_back(vec![from]);

    while let Some(path) = queue.pop_front() {
        let current = *path.last().unwrap_or(&from);
        let Some(neighbors) = deps_out.get(current) else {
            continue;
        };
        let mut sorted: Vec<&str> = neighbors.iter().map(|s| s.as_str()).collect();
        sorted.sort_unstable();
        for neighbor in sorted {
            if neighbor == to {
                let mut chain: Vec<String> = path.iter().map(|s| s.to_string()).collect();
                chain.push(neighbor.to_string());
                return Some(chain);
            }
            if visited.insert(neighbor) {
                let mut next = path.clone();
                next.push(neighbor);
                queue.push_back(next);
            }
        }
    }
    None
}

/// BFS closure over the reverse dependency graph starting from `symbol`.
///
/// Returns `(direct, levels)`: the depth-1 dependents (minus the symbol
/// itself) and the deeper BFS levels beyond them. Level contents are
/// unsorted; callers order them by definition site.
pub fn impact_closure(
    deps_in: &HashMap<String, HashSet<String>>,
    symbol: &str,
) -> (Vec<String>, Vec<Vec<String>>) {
    let direct: Vec<String> = deps_in
        .get(symbol)
        .map(|set| set.iter().filter(|s| s.as_str() != symbol).cloned().collect())
        .unwrap_or_default();

    let mut seen: HashSet<String> = direct.iter().cloned().collect();
    seen.insert(symbol.to_string());

    let mut levels: Vec<Vec<String>> = Vec::new();
    let mut frontier = direct.clone();
    while !frontier.is_empty() {
        let mut next: Vec<String> = Vec::new();
        for name in &frontier {
            if let Some(sources) = deps_in.get(name) {
                for source in sources {
                    if seen.insert(source.clone()) {
                        next.push(source.clone());
                    }
                }
            }
        }
        if !next.is_empty() {
            levels.push(next.clone());
        }
        frontier = next;
    }

    (direct, levels)
}
