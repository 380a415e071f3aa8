//! Dependency-aware ordering of TOC entries for `save`.
//!
//! Entries are topologically sorted on their `dependencies` so that,
//! for every pair `(a, b)` where `b` is in `a.dependencies`, `b` is
//! written before `a`. Ties are broken first by section
//! (Pre-Data < Data < Post-Data < None) and then by original insertion
//! order, so a save of an already-ordered archive is a no-op reorder.

use crate::entry::Entry;
use crate::error::ArchiveError;
use std::collections::HashMap;

fn section_rank(entry: &Entry) -> u8 {
    use crate::constants::Section::*;
    match entry.section {
        PreData => 0,
        Data => 1,
        PostData => 2,
        None => 3,
    }
}

/// Returns `entries` reordered so dependencies always precede their
/// dependents. Fails with `ArchiveError::CyclicDependencies` if the
/// dependency graph has a cycle.
pub fn topological_order(entries: &[Entry]) -> Result<Vec<Entry>, ArchiveError> {
    let index_of: HashMap<i64, usize> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| (e.id, i))
        .collect();

    // Kahn's algorithm with a priority tie-break: among all entries
    // with no remaining unsatisfied dependency, always pick the one
    // with the lowest (section, original-index) key next.
    let mut indegree = vec![0usize; entries.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); entries.len()];

    for (i, entry) in entries.iter().enumerate() {
        for dep in &entry.dependencies {
            if let Some(&dep_idx) = index_of.get(dep) {
                // self-dependency is its own (degenerate) cycle
                if dep_idx == i {
                    return Err(ArchiveError::CyclicDependencies);
                }
                dependents[dep_idx].push(i);
                indegree[i] += 1;
            }
        }
    }

    let mut ready: Vec<usize> = (0..entries.len())
        .filter(|&i| indegree[i] == 0)
        .collect();
    ready.sort_by_key(|&i| (section_rank(&entries[i]), i));

    let mut order = Vec::with_capacity(entries.len());
    let mut ready_set: std::collections::BTreeSet<(u8, usize)> = ready
        .iter()
        .map(|&i| (section_rank(&entries[i]), i))
        .collect();

    while let Some(&(_, i)) = ready_set.iter().next() {
        ready_set.remove(&(section_rank(&entries[i]), i));
        order.push(i);
        for &dependent in &dependents[i] {
            indegree[dependent] -= 1;
            if indegree[dependent] == 0 {
                ready_set.insert((section_rank(&entries[dependent]), dependent));
            }
        }
    }

    if order.len() != entries.len() {
        return Err(ArchiveError::CyclicDependencies);
    }

    Ok(order.into_iter().map(|i| entries[i].clone()).collect())
}
