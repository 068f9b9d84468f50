use lazy_static::lazy_static;
use std::any::TypeId;
use std::sync::Arc;

use super::cache::ResolveCache;
use crate::core::Result;
use crate::metadata::{EntityType, MetadataModel, Navigation};

/// Default traversal depth bound for eager-load path computation.
pub const DEFAULT_INCLUDE_DEPTH: usize = 20;

/// Cache key for one computed eager-load path set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IncludeCacheKey {
    type_id: TypeId,
    depth: usize,
}

impl IncludeCacheKey {
    pub fn new(type_id: TypeId, depth: usize) -> Self {
        Self { type_id, depth }
    }
}

lazy_static! {
    static ref INCLUDE_PATH_CACHE: ResolveCache<IncludeCacheKey, Vec<String>> =
        ResolveCache::new();
}

/// Eager-load paths needed to fully materialize an audit snapshot of
/// the given entity type, cached per (type, depth) for the process
/// lifetime. The relationship graph is assumed static, so a cached set
/// is never recomputed.
///
/// An unmapped type yields an empty set, not an error.
pub fn include_paths(
    model: &dyn MetadataModel,
    type_id: TypeId,
    depth: usize,
) -> Result<Arc<Vec<String>>> {
    INCLUDE_PATH_CACHE.get_or_try_insert_with(IncludeCacheKey::new(type_id, depth), || {
        Ok(calculate_include_paths(model, type_id, depth))
    })
}

/// Cursor over the eligible sibling edges of one traversal level.
struct Frame<'a> {
    edges: Vec<&'a Navigation>,
    pos: Option<usize>,
}

impl<'a> Frame<'a> {
    fn new(edges: Vec<&'a Navigation>) -> Self {
        Self { edges, pos: None }
    }

    fn advance(&mut self) -> bool {
        let next = self.pos.map_or(0, |pos| pos + 1);
        if next < self.edges.len() {
            self.pos = Some(next);
            true
        } else {
            false
        }
    }

    fn current(&self) -> &'a Navigation {
        self.edges[self.pos.expect("frame read before first advance")]
    }
}

/// Iterative depth-first enumeration of all maximal root-to-leaf edge
/// chains, with an explicit frame stack instead of recursion.
///
/// A node is a leaf when it has no eligible edges: cycle-prevented
/// edges are excluded, an unmapped edge target contributes none, and a
/// node reached at the depth bound contributes none (hard stop). Each
/// leaf with a non-empty stack emits one dot-joined path.
fn calculate_include_paths(
    model: &dyn MetadataModel,
    root: TypeId,
    depth: usize,
) -> Vec<String> {
    let mut paths = Vec::new();
    let mut current: Option<&EntityType> = model.find_entity_type(root);
    let mut stack: Vec<Frame<'_>> = Vec::new();

    loop {
        let eligible: Vec<&Navigation> = match current {
            Some(entity) if stack.len() < depth => entity
                .navigations()
                .iter()
                .filter(|navigation| !navigation.prevents_cycle())
                .collect(),
            _ => Vec::new(),
        };

        if eligible.is_empty() {
            if !stack.is_empty() {
                let segments: Vec<&str> =
                    stack.iter().map(|frame| frame.current().name()).collect();
                paths.push(segments.join("."));
            }
        } else {
            stack.push(Frame::new(eligible));
        }

        // Advance the topmost cursor to its next sibling, popping
        // exhausted levels on the way back up.
        while let Some(top) = stack.last_mut() {
            if top.advance() {
                break;
            }
            stack.pop();
        }

        match stack.last() {
            None => break,
            Some(top) => current = model.find_entity_type(top.current().target()),
        }
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataRegistry;

    #[test]
    fn sibling_branches_emit_separate_paths() {
        struct Root;
        struct Left;
        struct Right;
        struct Tip;

        let model = MetadataRegistry::new()
            .with_entity(
                EntityType::new::<Root>("Root")
                    .with_navigation::<Left>("Left")
                    .with_navigation::<Right>("Right"),
            )
            .unwrap()
            .with_entity(EntityType::new::<Left>("Left").with_navigation::<Tip>("Tip"))
            .unwrap()
            .with_entity(EntityType::new::<Right>("Right"))
            .unwrap()
            .with_entity(EntityType::new::<Tip>("Tip"))
            .unwrap();

        let paths = calculate_include_paths(&model, TypeId::of::<Root>(), DEFAULT_INCLUDE_DEPTH);
        assert_eq!(paths, vec!["Left.Tip".to_string(), "Right".to_string()]);
    }

    #[test]
    fn depth_zero_emits_nothing() {
        struct Root;
        struct Child;

        let model = MetadataRegistry::new()
            .with_entity(EntityType::new::<Root>("Root").with_navigation::<Child>("Child"))
            .unwrap()
            .with_entity(EntityType::new::<Child>("Child"))
            .unwrap();

        let paths = calculate_include_paths(&model, TypeId::of::<Root>(), 0);
        assert!(paths.is_empty());
    }

    #[test]
    fn unmapped_edge_target_is_a_leaf() {
        struct Root;
        struct Ghost;

        let model = MetadataRegistry::new()
            .with_entity(EntityType::new::<Root>("Root").with_navigation::<Ghost>("Ghost"))
            .unwrap();

        let paths = calculate_include_paths(&model, TypeId::of::<Root>(), DEFAULT_INCLUDE_DEPTH);
        assert_eq!(paths, vec!["Ghost".to_string()]);
    }
}
