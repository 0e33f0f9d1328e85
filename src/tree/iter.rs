use super::OctreeNode;

/// Breadth-first walk over a subtree, yielding each node with its depth
/// relative to the node the walk started from.
pub struct NodeIter<'a> {
    current: Vec<&'a OctreeNode>,
    next: Vec<&'a OctreeNode>,
    current_index: usize,
    current_depth: usize,
}

impl<'a> NodeIter<'a> {
    pub(super) fn new(root: &'a OctreeNode) -> Self {
        Self {
            current: vec![root],
            next: Vec::new(),
            current_index: 0,
            current_depth: 0,
        }
    }
}

impl<'a> Iterator for NodeIter<'a> {
    type Item = (usize, &'a OctreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_index < self.current.len() {
                let node = self.current[self.current_index];
                self.next.extend(node.children().map(|(_, child)| child));
                self.current_index += 1;
                return Some((self.current_depth, node));
            }
            if self.next.is_empty() {
                return None;
            }
            self.current = std::mem::take(&mut self.next);
            self.current_index = 0;
            self.current_depth += 1;
        }
    }
}

impl<'a> IntoIterator for &'a OctreeNode {
    type Item = (usize, &'a OctreeNode);
    type IntoIter = NodeIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        NodeIter::new(self)
    }
}
