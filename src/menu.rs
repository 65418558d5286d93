use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// One entry of the handbook's table of contents, as served by `GET /menu`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuNode {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub children: Vec<MenuNode>,
    /// Content shipped inline with the menu, used when fetching the section fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<i64>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<MenuNode>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<MenuNode>>::deserialize(deserializer)?.unwrap_or_default())
}

impl MenuNode {
    pub fn leaf(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            index: 0,
            parent_id: None,
            children: Vec::new(),
            content: None,
            page_number: None,
        }
    }

    /// Build a branch node, re-parenting `children` onto `id`.
    pub fn branch(id: i64, name: impl Into<String>, children: Vec<MenuNode>) -> Self {
        let children = children
            .into_iter()
            .enumerate()
            .map(|(position, mut child)| {
                child.parent_id = Some(id);
                if child.index == 0 {
                    child.index = position as i64 + 1;
                }
                child
            })
            .collect();
        Self {
            children,
            ..Self::leaf(id, name)
        }
    }

    pub fn with_cached_content(mut self, content: impl Into<String>, page_number: i64) -> Self {
        self.content = Some(content.into());
        self.page_number = Some(page_number);
        self
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Inline content usable as a fallback chapter. Both the content and a
    /// page number must be present.
    pub fn cached_content(&self) -> Option<(&str, i64)> {
        match (&self.content, self.page_number) {
            (Some(content), Some(page)) if !content.is_empty() => Some((content.as_str(), page)),
            _ => None,
        }
    }
}

/// Depth-first search for `target_id`. Returns the chain of ids from a root
/// down to the target, inclusive. The first match in pre-order wins.
pub fn find_path_to_node(tree: &[MenuNode], target_id: i64) -> Option<Vec<i64>> {
    let mut path = Vec::new();
    if find_path_helper(tree, target_id, &mut path) {
        Some(path)
    } else {
        None
    }
}

fn find_path_helper(items: &[MenuNode], target_id: i64, path: &mut Vec<i64>) -> bool {
    for item in items {
        path.push(item.id);
        if item.id == target_id || find_path_helper(&item.children, target_id, path) {
            return true;
        }
        path.pop();
    }
    false
}

/// Keep every node whose name contains `query` (case-insensitive), plus the
/// ancestors of such nodes. A blank query returns the tree untouched.
pub fn filter_tree(tree: &[MenuNode], query: &str) -> Vec<MenuNode> {
    let query = query.trim();
    if query.is_empty() {
        return tree.to_vec();
    }
    filter_helper(tree, &query.to_lowercase())
}

fn filter_helper(items: &[MenuNode], needle: &str) -> Vec<MenuNode> {
    items
        .iter()
        .filter_map(|item| {
            let matches = item.name.to_lowercase().contains(needle);
            let children = filter_helper(&item.children, needle);
            if matches || !children.is_empty() {
                Some(MenuNode {
                    children,
                    ..item.clone()
                })
            } else {
                None
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatNode<'a> {
    pub node: &'a MenuNode,
    pub depth: usize,
}

/// Pre-order traversal annotated with nesting depth (roots are depth 0).
pub fn flatten_with_depth(tree: &[MenuNode]) -> Vec<FlatNode<'_>> {
    let mut out = Vec::new();
    flatten_helper(tree, 0, &mut out);
    out
}

fn flatten_helper<'a>(items: &'a [MenuNode], depth: usize, out: &mut Vec<FlatNode<'a>>) {
    for node in items {
        out.push(FlatNode { node, depth });
        flatten_helper(&node.children, depth + 1, out);
    }
}

/// Label for flat pickers: one "— " per nesting level before the name.
pub fn indented_label(flat: &FlatNode<'_>) -> String {
    format!("{}{}", "— ".repeat(flat.depth), flat.node.name)
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexedNode {
    pub id: i64,
    pub name: String,
    pub index: i64,
    pub parent_id: Option<i64>,
    pub child_ids: Vec<i64>,
}

/// Flat id-keyed view over a menu tree.
#[derive(Debug, Clone, Default)]
pub struct MenuIndex {
    nodes: HashMap<i64, IndexedNode>,
    root_ids: Vec<i64>,
}

impl MenuIndex {
    pub fn build(tree: &[MenuNode]) -> Self {
        let mut index = Self::default();
        for root in tree {
            if index.insert(root, None) {
                index.root_ids.push(root.id);
            }
        }
        index
    }

    // Duplicate ids keep the first occurrence, matching find_path_to_node.
    fn insert(&mut self, node: &MenuNode, parent_id: Option<i64>) -> bool {
        if self.nodes.contains_key(&node.id) {
            log::warn!("Duplicate menu id {} ({}), ignoring", node.id, node.name);
            return false;
        }
        self.nodes.insert(
            node.id,
            IndexedNode {
                id: node.id,
                name: node.name.clone(),
                index: node.index,
                parent_id,
                child_ids: Vec::new(),
            },
        );
        for child in &node.children {
            if self.insert(child, Some(node.id)) {
                if let Some(entry) = self.nodes.get_mut(&node.id) {
                    entry.child_ids.push(child.id);
                }
            }
        }
        true
    }

    pub fn get(&self, id: i64) -> Option<&IndexedNode> {
        self.nodes.get(&id)
    }

    pub fn root_ids(&self) -> &[i64] {
        &self.root_ids
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_leaf(&self, id: i64) -> bool {
        self.nodes
            .get(&id)
            .map(|node| node.child_ids.is_empty())
            .unwrap_or(false)
    }

    /// Ancestor chain from the root to `id`, inclusive.
    pub fn path_to(&self, id: i64) -> Option<Vec<i64>> {
        let mut path = vec![id];
        let mut current = self.nodes.get(&id)?;
        while let Some(parent_id) = current.parent_id {
            path.push(parent_id);
            current = self.nodes.get(&parent_id)?;
        }
        path.reverse();
        Some(path)
    }

    /// The node with `id` inside `tree`, found by following its indexed path.
    pub fn locate<'a>(&self, tree: &'a [MenuNode], id: i64) -> Option<&'a MenuNode> {
        let mut items = tree;
        let mut found = None;
        for step in self.path_to(id)? {
            let node = items.iter().find(|n| n.id == step)?;
            items = &node.children;
            found = Some(node);
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn law_tree() -> Vec<MenuNode> {
        vec![MenuNode::branch(
            1,
            "Luật",
            vec![MenuNode::leaf(2, "Điều 1"), MenuNode::leaf(3, "Điều 2")],
        )]
    }

    fn deep_tree() -> Vec<MenuNode> {
        vec![
            MenuNode::leaf(100, "Preface"),
            MenuNode::branch(
                1,
                "Part I",
                vec![MenuNode::branch(
                    10,
                    "Chapter 1",
                    vec![MenuNode::branch(
                        20,
                        "Section 1.1",
                        vec![MenuNode::leaf(30, "Article 1")],
                    )],
                )],
            ),
        ]
    }

    #[test]
    fn test_path_to_deeply_nested_node() {
        let tree = deep_tree();
        let path = find_path_to_node(&tree, 20).unwrap();
        assert_eq!(path, vec![1, 10, 20]);

        let path = find_path_to_node(&tree, 30).unwrap();
        assert_eq!(path.len(), 4);
        assert_eq!(path.last(), Some(&30));
    }

    #[test]
    fn test_path_to_root_and_missing() {
        let tree = deep_tree();
        assert_eq!(find_path_to_node(&tree, 100), Some(vec![100]));
        assert_eq!(find_path_to_node(&tree, 999), None);
        assert_eq!(find_path_to_node(&[], 1), None);
    }

    #[test]
    fn test_path_first_match_wins_on_duplicates() {
        let tree = vec![
            MenuNode::branch(1, "A", vec![MenuNode::leaf(7, "dup")]),
            MenuNode::leaf(7, "dup again"),
        ];
        assert_eq!(find_path_to_node(&tree, 7), Some(vec![1, 7]));
    }

    #[test]
    fn test_filter_keeps_parent_of_matching_children() {
        let filtered = filter_tree(&law_tree(), "điều");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "Luật");
        assert_eq!(filtered[0].children.len(), 2);
    }

    #[test]
    fn test_filter_single_child() {
        let filtered = filter_tree(&law_tree(), "Điều 1");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].children.len(), 1);
        assert_eq!(filtered[0].children[0].name, "Điều 1");
    }

    #[test]
    fn test_filter_matching_parent_drops_unmatched_children() {
        let filtered = filter_tree(&law_tree(), "luật");
        assert_eq!(filtered.len(), 1);
        assert!(filtered[0].children.is_empty());
    }

    #[test]
    fn test_filter_no_match_and_blank_query() {
        let tree = law_tree();
        assert!(filter_tree(&tree, "nothing here").is_empty());
        assert_eq!(filter_tree(&tree, "   "), tree);
        // Input is untouched
        assert_eq!(tree[0].children.len(), 2);
    }

    #[test]
    fn test_flatten_is_preorder_with_depth() {
        let tree = deep_tree();
        let flat: Vec<(i64, usize)> = flatten_with_depth(&tree)
            .iter()
            .map(|f| (f.node.id, f.depth))
            .collect();
        assert_eq!(flat, vec![(100, 0), (1, 0), (10, 1), (20, 2), (30, 3)]);
    }

    #[test]
    fn test_indented_label() {
        let tree = law_tree();
        let flat = flatten_with_depth(&tree);
        let labels: Vec<String> = flat.iter().map(indented_label).collect();
        assert_eq!(labels, vec!["Luật", "— Điều 1", "— Điều 2"]);
    }

    #[test]
    fn test_index_matches_recursive_search() {
        let tree = deep_tree();
        let index = MenuIndex::build(&tree);
        assert_eq!(index.len(), 5);
        assert_eq!(index.root_ids(), &[100, 1]);
        for id in [100, 1, 10, 20, 30] {
            assert_eq!(index.path_to(id), find_path_to_node(&tree, id));
        }
        assert!(index.is_leaf(30));
        assert!(!index.is_leaf(20));
        assert_eq!(index.get(20).unwrap().child_ids, vec![30]);
        assert_eq!(index.path_to(404), None);
        assert_eq!(index.locate(&tree, 30).map(|n| n.id), Some(30));
        assert!(index.locate(&tree, 404).is_none());
    }

    #[test]
    fn test_deserialize_api_shape() {
        let json = r#"[{"id":1,"name":"Luật","index":1,"parentId":null,
            "children":[{"id":2,"name":"Điều 1","index":1,"parentId":1,"children":null}]}]"#;
        let tree: Vec<MenuNode> = serde_json::from_str(json).unwrap();
        assert_eq!(tree[0].children[0].parent_id, Some(1));
        assert!(tree[0].children[0].children.is_empty());
        assert!(tree[0].has_children());
    }

    #[test]
    fn test_cached_content_requires_page_number() {
        let mut node = MenuNode::leaf(1, "x");
        node.content = Some("<p>hi</p>".into());
        assert_eq!(node.cached_content(), None);
        let node = node.with_cached_content("<p>hi</p>", 3);
        assert_eq!(node.cached_content(), Some(("<p>hi</p>", 3)));
    }
}
