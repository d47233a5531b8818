use std::fmt::{self, Display};

use super::{BuildStatistics, Bvh, NodeIdx, NodeKind};

/// Human readable dump of the tree, one line per node indented by depth.
pub struct TreeDump<'a> {
    bvh: &'a Bvh,
}

impl Bvh {
    pub fn tree_dump(&self) -> TreeDump<'_> {
        TreeDump { bvh: self }
    }

    pub fn print_tree(&self) {
        print!("{}", self.tree_dump());
    }

    pub fn print_statistics(&self) {
        println!(
            "Triangles: {} ({} instances x {})",
            self.triangle_count(),
            self.instance_count,
            self.triangles_per_instance
        );
        println!("Nodes: {} / {}", self.nodes_used, self.node_capacity());
        print!("{}", self.statistics);
    }
}

impl TreeDump<'_> {
    fn fmt_recursive(&self, f: &mut fmt::Formatter<'_>, indent: usize, node: NodeIdx) -> fmt::Result {
        let bounds = self.bvh.node_bounds(node);
        write!(f, "{}- ", "  ".repeat(indent))?;

        match self.bvh.node_links(node).decode() {
            NodeKind::Leaf { triangles } => writeln!(
                f,
                "L{}: {:?}-{:?} {} triangles @ {}",
                node.index(),
                bounds.min,
                bounds.max,
                triangles.len(),
                triangles.start,
            ),
            NodeKind::Inner { left } => {
                writeln!(f, "I{}: {:?}-{:?}", node.index(), bounds.min, bounds.max)?;
                self.fmt_recursive(f, indent + 1, left)?;
                self.fmt_recursive(f, indent + 1, left + 1)
            }
        }
    }
}

impl Display for TreeDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_recursive(f, 0, NodeIdx::ROOT)
    }
}

impl Display for BuildStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Leafs: {}", self.leafs())?;
        writeln!(f, "Leaf depth: {}", self.leaf_depth)?;
        writeln!(f, "Leaf size: {}", self.leaf_size)
    }
}
