// Inheritance tree expansion

use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::error::{AnalyzerError, Result};
use crate::index::{ClassRecord, HierarchyNode};

/// Looks up class definitions by name.
///
/// `Ok(None)` means the class is not defined anywhere in the searched roots.
pub trait ClassResolver {
    fn resolve(&self, name: &str) -> Result<Option<Arc<ClassRecord>>>;
}

/// Expand `name` and its superclasses into a tree.
///
/// Unresolvable bases become unresolved leaves. A base that already appears
/// on the current path is emitted once more as a leaf marked `cycle` and not
/// expanded, so malformed or colliding inputs still terminate.
pub fn build_hierarchy<R: ClassResolver + ?Sized>(
    resolver: &R,
    name: &str,
    include_interfaces: bool,
) -> Result<HierarchyNode> {
    let mut path = HashSet::new();
    expand(resolver, name, include_interfaces, &mut path)
}

fn expand<R: ClassResolver + ?Sized>(
    resolver: &R,
    name: &str,
    include_interfaces: bool,
    path: &mut HashSet<String>,
) -> Result<HierarchyNode> {
    if path.contains(name) {
        debug!("Inheritance cycle through {}", name);
        let mut node = HierarchyNode::leaf(name);
        node.cycle = true;
        return Ok(node);
    }

    let record = match resolver.resolve(name) {
        Ok(Some(record)) => record,
        Ok(None) => return Ok(HierarchyNode::leaf(name)),
        Err(e) if e.is_not_found() => return Ok(HierarchyNode::leaf(name)),
        Err(e @ (AnalyzerError::Cancelled | AnalyzerError::NoRootsConfigured { .. })) => return Err(e),
        Err(e) => {
            debug!("Could not resolve {}: {}", name, e);
            return Ok(HierarchyNode::leaf(name));
        }
    };

    path.insert(name.to_string());
    let mut superclasses = Vec::with_capacity(record.superclasses.len());
    for base in &record.superclasses {
        superclasses.push(expand(resolver, base, include_interfaces, path)?);
    }
    path.remove(name);

    Ok(HierarchyNode {
        class_name: record.name.clone(),
        superclasses,
        interfaces: if include_interfaces {
            record.interfaces.clone()
        } else {
            Vec::new()
        },
        resolved: true,
        cycle: false,
    })
}
