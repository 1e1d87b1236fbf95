//! Assembly of a note's descendants into nested children.

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::models::{NoteId, NoteSummary, NoteTreeNode};

/// Default cap on how many levels of children a detail view nests.
pub const DEFAULT_MAX_TREE_DEPTH: usize = 32;

/// One descendant loaded from storage.
#[derive(Debug, Clone)]
pub struct TreeEntry {
    pub note: NoteSummary,
    /// 1 for immediate children of the root, 2 for grandchildren, and so on.
    pub depth: usize,
}

/// Nested children of a root note.
#[derive(Debug, Clone, Default)]
pub struct AssembledTree {
    pub children: Vec<NoteTreeNode>,
    /// True when entries deeper than the cap were dropped.
    pub truncated: bool,
}

/// Nest `entries` under `root_id`.
///
/// Sibling order follows the order of `entries`. Entries deeper than
/// `max_depth` are dropped and reported through `truncated`. A root that shows
/// up among its own descendants, or a note reached twice, means the stored
/// hierarchy has a cycle and is reported as an error.
pub fn assemble_children(
    root_id: NoteId,
    entries: Vec<TreeEntry>,
    max_depth: usize,
) -> Result<AssembledTree> {
    let mut seen = HashSet::with_capacity(entries.len());
    let mut truncated = false;
    let mut by_parent: HashMap<NoteId, Vec<NoteSummary>> = HashMap::new();

    for entry in entries {
        if entry.note.id == root_id || !seen.insert(entry.note.id) {
            return Err(Error::Internal(format!(
                "Cycle detected in note hierarchy below note {}",
                root_id
            )));
        }
        if entry.depth > max_depth {
            truncated = true;
            continue;
        }
        let Some(parent) = entry.note.parent else {
            return Err(Error::Internal(format!(
                "Descendant note {} has no parent",
                entry.note.id
            )));
        };
        by_parent.entry(parent).or_default().push(entry.note);
    }

    let children = take_children(root_id, &mut by_parent);
    Ok(AssembledTree {
        children,
        truncated,
    })
}

fn take_children(
    parent: NoteId,
    by_parent: &mut HashMap<NoteId, Vec<NoteSummary>>,
) -> Vec<NoteTreeNode> {
    by_parent
        .remove(&parent)
        .unwrap_or_default()
        .into_iter()
        .map(|note| {
            let children = take_children(note.id, by_parent);
            NoteTreeNode { note, children }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(id: NoteId, parent: NoteId, depth: usize) -> TreeEntry {
        TreeEntry {
            note: NoteSummary {
                id,
                title: format!("note {}", id),
                slug: format!("note-{}-1-0", id),
                content: String::new(),
                tags: vec![],
                parent: Some(parent),
                updated_at: Utc::now(),
            },
            depth,
        }
    }

    fn ids(nodes: &[NoteTreeNode]) -> Vec<NoteId> {
        nodes.iter().map(|n| n.note.id).collect()
    }

    #[test]
    fn test_empty_tree() {
        let tree = assemble_children(1, vec![], DEFAULT_MAX_TREE_DEPTH).unwrap();
        assert!(tree.children.is_empty());
        assert!(!tree.truncated);
    }

    #[test]
    fn test_nested_children() {
        let entries = vec![entry(2, 1, 1), entry(3, 1, 1), entry(4, 2, 2), entry(5, 4, 3)];
        let tree = assemble_children(1, entries, DEFAULT_MAX_TREE_DEPTH).unwrap();

        assert_eq!(ids(&tree.children), vec![2, 3]);
        assert_eq!(ids(&tree.children[0].children), vec![4]);
        assert_eq!(ids(&tree.children[0].children[0].children), vec![5]);
        assert!(tree.children[1].children.is_empty());
    }

    #[test]
    fn test_sibling_order_preserved() {
        let entries = vec![entry(9, 1, 1), entry(2, 1, 1), entry(5, 1, 1)];
        let tree = assemble_children(1, entries, DEFAULT_MAX_TREE_DEPTH).unwrap();
        assert_eq!(ids(&tree.children), vec![9, 2, 5]);
    }

    #[test]
    fn test_depth_cap_truncates() {
        let entries = vec![entry(2, 1, 1), entry(3, 2, 2), entry(4, 3, 3)];
        let tree = assemble_children(1, entries, 2).unwrap();

        assert!(tree.truncated);
        assert_eq!(ids(&tree.children), vec![2]);
        assert_eq!(ids(&tree.children[0].children), vec![3]);
        assert!(tree.children[0].children[0].children.is_empty());
    }

    #[test]
    fn test_root_in_descendants_is_cycle() {
        let entries = vec![entry(2, 1, 1), entry(1, 2, 2)];
        let err = assemble_children(1, entries, DEFAULT_MAX_TREE_DEPTH).unwrap_err();
        assert!(err.to_string().contains("Cycle detected"));
    }

    #[test]
    fn test_repeated_note_is_cycle() {
        let entries = vec![entry(2, 1, 1), entry(3, 2, 2), entry(2, 3, 3)];
        assert!(assemble_children(1, entries, DEFAULT_MAX_TREE_DEPTH).is_err());
    }
}
