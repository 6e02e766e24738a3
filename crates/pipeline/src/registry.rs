//! Pass registry: dependency validation, topological order, level grouping
//!
//! Passes are collected through a builder and sealed once. Sealing validates
//! the whole dependency graph and computes both orderings up front, so the
//! sealed registry answers `ordered()` and `levels()` without ever failing.

use crate::error::RegistryError;
use crate::pass::Pass;
use std::collections::HashMap;
use std::sync::Arc;

pub struct RegistryBuilder {
    passes: Vec<Arc<dyn Pass>>,
    index: HashMap<&'static str, usize>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Add a pass, preserving insertion order. Insertion order is the
    /// tie-break everywhere ordering is otherwise unconstrained.
    pub fn register(&mut self, pass: Arc<dyn Pass>) -> Result<(), RegistryError> {
        let name = pass.name();
        if self.index.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        self.index.insert(name, self.passes.len());
        self.passes.push(pass);
        Ok(())
    }

    /// Validate the dependency graph and seal the registry.
    pub fn build(self) -> Result<PassRegistry, RegistryError> {
        let order = topological_order(&self.passes, &self.index)?;
        let levels = group_levels(&self.passes, &self.index, &order);
        Ok(PassRegistry {
            passes: self.passes,
            index: self.index,
            order,
            levels,
        })
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A validated, immutable pass set with precomputed orderings.
pub struct PassRegistry {
    passes: Vec<Arc<dyn Pass>>,
    index: HashMap<&'static str, usize>,
    order: Vec<usize>,
    levels: Vec<Vec<usize>>,
}

impl std::fmt::Debug for PassRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassRegistry")
            .field("passes", &self.passes.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("index", &self.index)
            .field("order", &self.order)
            .field("levels", &self.levels)
            .finish()
    }
}

impl PassRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Pass>> {
        self.index.get(name).map(|&idx| &self.passes[idx])
    }

    /// All passes in registration order. No execution ordering implied.
    pub fn all(&self) -> &[Arc<dyn Pass>] {
        &self.passes
    }

    /// Flat topological order: every pass appears strictly after all of its
    /// dependencies.
    pub fn ordered(&self) -> Vec<Arc<dyn Pass>> {
        self.order
            .iter()
            .map(|&idx| Arc::clone(&self.passes[idx]))
            .collect()
    }

    /// Passes grouped by dependency depth. Level 0 holds passes with no
    /// dependencies; every dependency of a level-k pass lives strictly below
    /// level k, so levels can run in sequence with members of one level
    /// running concurrently.
    pub fn levels(&self) -> Vec<Vec<Arc<dyn Pass>>> {
        self.levels
            .iter()
            .map(|group| {
                group
                    .iter()
                    .map(|&idx| Arc::clone(&self.passes[idx]))
                    .collect()
            })
            .collect()
    }

    /// Human-readable schedule, for logging.
    pub fn execution_plan(&self) -> String {
        self.levels
            .iter()
            .enumerate()
            .map(|(depth, group)| {
                let names: Vec<_> = group.iter().map(|&idx| self.passes[idx].name()).collect();
                if names.len() > 1 {
                    format!("level {}: {} (parallel)", depth, names.join(", "))
                } else {
                    format!("level {}: {}", depth, names[0])
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Depth-first post-order topological sort, as an explicit worklist so deep
/// graphs cannot exhaust the call stack. Roots are visited in registration
/// order, which makes the result deterministic for a fixed registration
/// sequence.
fn topological_order(
    passes: &[Arc<dyn Pass>],
    index: &HashMap<&'static str, usize>,
) -> Result<Vec<usize>, RegistryError> {
    let mut marks = vec![Mark::Unvisited; passes.len()];
    let mut order = Vec::with_capacity(passes.len());

    for root in 0..passes.len() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::InProgress;
        // frame: (pass index, position of the next dependency to visit)
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            let deps = passes[node].dependencies();

            if frame.1 == deps.len() {
                marks[node] = Mark::Done;
                order.push(node);
                stack.pop();
                continue;
            }

            let dep_name = deps[frame.1];
            frame.1 += 1;

            let dep = *index.get(dep_name).ok_or_else(|| {
                RegistryError::UnknownDependency {
                    pass: passes[node].name().to_string(),
                    dependency: dep_name.to_string(),
                }
            })?;

            match marks[dep] {
                Mark::Unvisited => {
                    marks[dep] = Mark::InProgress;
                    stack.push((dep, 0));
                }
                Mark::InProgress => {
                    return Err(RegistryError::CircularDependency(
                        passes[dep].name().to_string(),
                    ));
                }
                Mark::Done => {}
            }
        }
    }

    Ok(order)
}

/// `level(p) = 1 + max(level(dep))`, or 0 with no dependencies. Computed over
/// the topological order so every dependency's level is known first. Within a
/// level, passes keep registration order.
fn group_levels(
    passes: &[Arc<dyn Pass>],
    index: &HashMap<&'static str, usize>,
    order: &[usize],
) -> Vec<Vec<usize>> {
    let mut level = vec![0usize; passes.len()];
    for &node in order {
        level[node] = passes[node]
            .dependencies()
            .iter()
            .map(|dep| level[index[dep]] + 1)
            .max()
            .unwrap_or(0);
    }

    let depth = match level.iter().max() {
        Some(&max) => max + 1,
        None => return Vec::new(),
    };
    let mut groups = vec![Vec::new(); depth];
    for (idx, &lvl) in level.iter().enumerate() {
        groups[lvl].push(idx);
    }
    groups
}
