use crate::domain::LocationPath;
use std::collections::BTreeMap;

/// Nested grouping of location paths by shared leading segments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathTree {
    children: BTreeMap<String, PathTree>,
}

impl PathTree {
    pub fn from_paths<'a, I>(paths: I) -> Self
    where
        I: IntoIterator<Item = &'a LocationPath>,
    {
        let mut tree = Self::default();
        for path in paths {
            tree.insert(path.segments());
        }
        tree
    }

    fn insert(&mut self, segments: &[String]) {
        if let Some((head, tail)) = segments.split_first() {
            self.children.entry(head.clone()).or_default().insert(tail);
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn children(&self) -> &BTreeMap<String, PathTree> {
        &self.children
    }

    pub fn leaf_count(&self) -> usize {
        if self.is_leaf() {
            return 1;
        }
        self.children.values().map(PathTree::leaf_count).sum()
    }

    /// Renders one line per branch tip:
    ///
    /// ```text
    ///  -> World -> UK
    ///           -> FR
    ///  -> Mars -> (12 items)
    /// ```
    ///
    /// Groups with more than `collapse_limit` children collapse to a count.
    pub fn render(&self, collapse_limit: Option<usize>) -> Vec<String> {
        let mut lines = Vec::new();
        self.render_into(&mut lines, "", collapse_limit);
        lines
    }

    fn render_into(&self, lines: &mut Vec<String>, prefix: &str, collapse_limit: Option<usize>) {
        for (index, (name, child)) in self.children.iter().enumerate() {
            let line = if index == 0 {
                format!("{prefix} -> {name}")
            } else {
                format!("{} -> {name}", " ".repeat(prefix.chars().count()))
            };

            if child.is_leaf() {
                lines.push(line);
            } else if collapse_limit.is_some_and(|limit| child.children.len() > limit) {
                lines.push(format!("{line} -> ({} items)", child.children.len()));
            } else {
                child.render_into(lines, &line, collapse_limit);
            }
        }
    }
}
