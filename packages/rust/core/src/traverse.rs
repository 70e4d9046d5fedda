//! Depth-first, pre-order flattening of the collection document tree.
//!
//! The flattened sequence is the single source of truth for both section
//! placement and table-of-contents order.

use std::collections::HashSet;

use tracing::{debug, instrument};

use docbinder_shared::{DocbinderError, DocumentNode, Result};

/// Deepest nesting accepted from the remote service.
pub const MAX_TREE_DEPTH: usize = 64;

/// Largest number of documents accepted in one collection.
pub const MAX_TREE_NODES: usize = 100_000;

/// A tree node together with its depth (0 for top-level documents).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatNode<'a> {
    pub node: &'a DocumentNode,
    pub depth: usize,
}

/// Flatten a document forest in depth-first pre-order, within
/// [`MAX_TREE_DEPTH`] and [`MAX_TREE_NODES`].
///
/// Top-level nodes are visited in the given order; each node is emitted
/// before its children, which are visited in their given order. Fails with
/// [`DocbinderError::MalformedTree`] when the forest exceeds
/// [`MAX_TREE_DEPTH`] or [`MAX_TREE_NODES`], or when an identifier appears
/// twice (the source is then not a tree).
pub fn flatten(forest: &[DocumentNode]) -> Result<Vec<FlatNode<'_>>> {
    flatten_with_limits(forest, MAX_TREE_DEPTH, MAX_TREE_NODES)
}

/// [`flatten`] with explicit depth and size limits.
#[instrument(skip_all, fields(roots = forest.len(), max_depth = max_depth, max_nodes = max_nodes))]
pub fn flatten_with_limits(
    forest: &[DocumentNode],
    max_depth: usize,
    max_nodes: usize,
) -> Result<Vec<FlatNode<'_>>> {
    let mut out: Vec<FlatNode<'_>> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    // Explicit stack instead of recursion; children are pushed in reverse so
    // the first child is popped first.
    let mut stack: Vec<FlatNode<'_>> = forest
        .iter()
        .rev()
        .map(|node| FlatNode { node, depth: 0 })
        .collect();

    while let Some(current) = stack.pop() {
        if current.depth >= max_depth {
            return Err(DocbinderError::malformed_tree(format!(
                "document {} is nested deeper than {max_depth} levels",
                current.node.id
            )));
        }

        if !seen.insert(current.node.id.as_str()) {
            return Err(DocbinderError::malformed_tree(format!(
                "document {} appears more than once",
                current.node.id
            )));
        }

        if out.len() >= max_nodes {
            return Err(DocbinderError::malformed_tree(format!(
                "collection has more than {max_nodes} documents"
            )));
        }

        out.push(current);

        stack.extend(current.node.children.iter().rev().map(|child| FlatNode {
            node: child,
            depth: current.depth + 1,
        }));
    }

    debug!(documents = out.len(), "document tree flattened");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(id: &str) -> DocumentNode {
        DocumentNode::new(id, id.to_uppercase())
    }

    fn ids<'a>(flat: &[FlatNode<'a>]) -> Vec<(&'a str, usize)> {
        flat.iter().map(|f| (f.node.id.as_str(), f.depth)).collect()
    }

    #[test]
    fn engineering_docs_order() {
        let forest = vec![leaf("a").with_children(vec![leaf("b")]), leaf("c")];
        let flat = flatten(&forest).unwrap();
        assert_eq!(ids(&flat), vec![("a", 0), ("b", 1), ("c", 0)]);
    }

    #[test]
    fn preorder_completes_subtrees_before_siblings() {
        // a
        // ├── b
        // │   ├── d
        // │   └── e
        // └── c
        //     └── f
        // g
        let forest = vec![
            leaf("a").with_children(vec![
                leaf("b").with_children(vec![leaf("d"), leaf("e")]),
                leaf("c").with_children(vec![leaf("f")]),
            ]),
            leaf("g"),
        ];

        let flat = flatten(&forest).unwrap();
        assert_eq!(
            ids(&flat),
            vec![
                ("a", 0),
                ("b", 1),
                ("d", 2),
                ("e", 2),
                ("c", 1),
                ("f", 2),
                ("g", 0)
            ]
        );
    }

    #[test]
    fn every_node_appears_once_and_before_descendants() {
        let forest = vec![
            leaf("r1").with_children(vec![
                leaf("x").with_children(vec![leaf("y").with_children(vec![leaf("z")])]),
                leaf("w"),
            ]),
            leaf("r2").with_children(vec![leaf("v")]),
        ];

        let flat = flatten(&forest).unwrap();
        assert_eq!(flat.len(), 8);

        let position = |id: &str| flat.iter().position(|f| f.node.id == id).unwrap();
        for f in &flat {
            if let Some(parent) = &f.node.parent_id {
                assert!(position(parent) < position(&f.node.id));
                let parent_depth = flat[position(parent)].depth;
                assert_eq!(f.depth, parent_depth + 1);
            }
        }
        // An earlier sibling's whole subtree precedes the next sibling.
        assert!(position("z") < position("w"));
        assert!(position("w") < position("r2"));
    }

    #[test]
    fn empty_forest() {
        assert!(flatten(&[]).unwrap().is_empty());
    }

    #[test]
    fn duplicate_id_is_malformed() {
        let forest = vec![leaf("a").with_children(vec![leaf("a")])];
        let err = flatten(&forest).unwrap_err();
        assert!(matches!(err, DocbinderError::MalformedTree { .. }));
    }

    #[test]
    fn excessive_depth_is_malformed() {
        let mut node = leaf("n0");
        for i in 1..=MAX_TREE_DEPTH {
            node = leaf(&format!("n{i}")).with_children(vec![node]);
        }

        let forest = vec![node];
        let err = flatten(&forest).unwrap_err();
        assert!(err.to_string().contains("nested deeper"));
    }

    #[test]
    fn too_many_nodes_is_malformed() {
        let forest = vec![
            leaf("a").with_children(vec![leaf("b"), leaf("c")]),
            leaf("d"),
        ];

        let err = flatten_with_limits(&forest, MAX_TREE_DEPTH, 3).unwrap_err();
        assert!(matches!(err, DocbinderError::MalformedTree { .. }));
        assert!(err.to_string().contains("more than 3 documents"));

        let flat = flatten_with_limits(&forest, MAX_TREE_DEPTH, 4).unwrap();
        assert_eq!(flat.len(), 4);
    }

    #[test]
    fn custom_depth_limit() {
        let forest = vec![leaf("a").with_children(vec![leaf("b").with_children(vec![leaf("c")])])];
        assert!(flatten_with_limits(&forest, 2, MAX_TREE_NODES).is_err());
        assert_eq!(flatten_with_limits(&forest, 3, MAX_TREE_NODES).unwrap().len(), 3);
    }

    #[test]
    fn depth_at_limit_is_accepted() {
        let mut node = leaf("n0");
        for i in 1..MAX_TREE_DEPTH {
            node = leaf(&format!("n{i}")).with_children(vec![node]);
        }

        let forest = vec![node];
        let flat = flatten(&forest).unwrap();
        assert_eq!(flat.len(), MAX_TREE_DEPTH);
        assert_eq!(flat.last().unwrap().depth, MAX_TREE_DEPTH - 1);
    }
}
