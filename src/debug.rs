use std::{collections::VecDeque, fmt};

use crate::{
    node::{Color, Dir},
    RedBlackTree,
};

impl<K, V, C> RedBlackTree<K, V, C>
where
    K: fmt::Display,
{
    /// Writes the shape of the tree as a Graphviz `digraph` named `name`.
    ///
    /// Nodes are labeled with their keys and filled with their color; null leaves are drawn as
    /// points. The output is a debugging aid and its exact layout is not stable.
    pub fn dotgraph<W>(&self, name: &str, mut w: W) -> fmt::Result
    where
        W: fmt::Write,
    {
        let root = match self.root {
            Some(r) => r,
            None => return write!(w, "digraph \"graph-{name}\" {{}}"),
        };

        enum Item {
            Node(usize),
            Missing(u32),
        }

        let mut queue = VecDeque::new();
        queue.push_back(Item::Node(root));

        write!(
            w,
            "digraph \"graph-{name}\" {{\n subgraph \"subgraph-{name}\" {{"
        )?;

        let mut missing = 0;
        let mut links = String::new();

        // One `rank=same` group per tree level.
        while !queue.is_empty() {
            use fmt::Write;

            write!(w, "{{rank=same; ")?;

            for _ in 0..queue.len() {
                let node = match queue.pop_front() {
                    Some(Item::Node(node)) => node,
                    Some(Item::Missing(id)) => {
                        write!(w, "\"graph{name}-missing{id}\" [shape=point]; ")?;
                        continue;
                    }
                    None => break,
                };

                let key = &self.node(node).key;
                let fill = match self.color(Some(node)) {
                    Color::Red => "red",
                    Color::Black => "black",
                };
                write!(
                    w,
                    "\"graph{name}-{node}\" [label=\"{key}\", style=filled, fillcolor={fill}, fontcolor=white]; "
                )?;

                for dir in [Dir::Left, Dir::Right] {
                    match self.child(node, dir) {
                        Some(child) => {
                            queue.push_back(Item::Node(child));
                            writeln!(links, "\"graph{name}-{node}\" -> \"graph{name}-{child}\";")?;
                        }
                        None => {
                            queue.push_back(Item::Missing(missing));
                            writeln!(
                                links,
                                "\"graph{name}-{node}\" -> \"graph{name}-missing{missing}\";"
                            )?;
                            missing += 1;
                        }
                    }
                }
            }

            writeln!(w, "}}")?;
        }

        w.write_str(&links)?;

        w.write_str(" }\n}")
    }
}
