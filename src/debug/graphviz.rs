//! Graphviz (DOT) export of a trie.

use ahash::{AHashMap, AHashSet};
use std::io::{self, Write};
use std::sync::Arc;

use super::footprint;
use crate::trie::{Leaf, Node};

/// Nodes to highlight in [`write_graphviz`] output.
///
/// Nodes are identified by their allocation. The table keeps every marked
/// node alive, so an address is never reused while it is marked.
#[derive(Debug, Default)]
pub struct NodeMarks {
    marked: AHashMap<usize, Arc<Node>>,
}

impl NodeMarks {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `node`. Returns `false` if it was already marked.
    pub fn mark(&mut self, node: &Arc<Node>) -> bool {
        self.marked.insert(address(node), Arc::clone(node)).is_none()
    }

    /// Unmarks `node`. Returns `false` if it was not marked.
    pub fn unmark(&mut self, node: &Arc<Node>) -> bool {
        self.marked.remove(&address(node)).is_some()
    }

    /// Returns `true` if `node` is marked.
    pub fn is_marked(&self, node: &Arc<Node>) -> bool {
        self.marked.contains_key(&address(node))
    }

    /// Number of marked nodes.
    pub fn len(&self) -> usize {
        self.marked.len()
    }

    /// Returns `true` if nothing is marked.
    pub fn is_empty(&self) -> bool {
        self.marked.is_empty()
    }

    /// Unmarks everything.
    pub fn clear(&mut self) {
        self.marked.clear();
    }
}

fn address<T>(pointer: &Arc<T>) -> usize {
    Arc::as_ptr(pointer) as usize
}

/// Sequential DOT identifiers for nodes, leaves and value boxes.
#[derive(Default)]
struct Identifiers {
    next: u64,
    nodes: AHashMap<usize, u64>,
    leaves: AHashMap<usize, u64>,
}

impl Identifiers {
    fn fresh(&mut self) -> u64 {
        self.next += 1;
        self.next
    }

    fn node(&mut self, node: &Arc<Node>) -> u64 {
        if let Some(&id) = self.nodes.get(&address(node)) {
            return id;
        }
        let id = self.fresh();
        self.nodes.insert(address(node), id);
        id
    }

    fn leaf(&mut self, leaf: &Arc<Leaf>) -> u64 {
        if let Some(&id) = self.leaves.get(&address(leaf)) {
            return id;
        }
        let id = self.fresh();
        self.leaves.insert(address(leaf), id);
        id
    }
}

struct Writer<'a, W> {
    out: W,
    marks: &'a NodeMarks,
    ids: Identifiers,
    visited: AHashSet<usize>,
}

/// Writes a DOT description of the trie below `root` to `out`.
///
/// The graph is labelled with `label` and the [`footprint`] of the trie.
/// Nodes show their key and are outlined red when they are in `marks`;
/// leaves show their value and the number of attached ids, which hang off
/// them in a grey box. Solid edges point from parent to child, dashed grey
/// edges from child back to parent.
///
/// # Errors
///
/// Returns any error from writing to `out`.
///
/// # Examples
///
/// ```rust
/// use pathtrie::debug::{NodeMarks, write_graphviz};
/// use pathtrie::{Path, Trie};
///
/// let trie = Trie::new();
/// trie.insert(&Path::from([(1, 2)]), 3).unwrap();
///
/// let mut dot = Vec::new();
/// write_graphviz(&mut dot, "example", trie.root(), &NodeMarks::new()).unwrap();
/// let dot = String::from_utf8(dot).unwrap();
/// assert!(dot.starts_with("digraph G {"));
/// assert!(dot.contains(r#"label="3;""#));
/// ```
pub fn write_graphviz<W: Write>(
    out: W,
    label: &str,
    root: &Arc<Leaf>,
    marks: &NodeMarks,
) -> io::Result<()> {
    let mut writer = Writer {
        out,
        marks,
        ids: Identifiers::default(),
        visited: AHashSet::new(),
    };
    write!(
        writer.out,
        r#"digraph G {{graph[label="{}({}b)"]; node[style=filled];"#,
        escape(label),
        footprint(root)
    )?;
    writer.leaf(root)?;
    write!(writer.out, "}}")
}

impl<W: Write> Writer<'_, W> {
    fn node(&mut self, node: &Arc<Node>) -> io::Result<u64> {
        let id = self.ids.node(node);
        if self.marks.is_marked(node) {
            write!(
                self.out,
                r##""{id}"[label="{}" fillcolor="#ffffff" color="red"];"##,
                node.key()
            )?;
        } else {
            write!(self.out, r##""{id}"[label="{}" fillcolor="#ffffff"];"##, node.key())?;
        }

        let mut result = Ok(());
        node.ascend_children(|leaf| {
            result = self.leaf(leaf).and_then(|child| self.child_edge(id, child));
            result.is_ok()
        });
        result?;

        if let Some(parent) = node.parent() {
            let parent = self.ids.leaf(&parent);
            self.parent_edge(id, parent)?;
        }
        Ok(id)
    }

    fn leaf(&mut self, leaf: &Arc<Leaf>) -> io::Result<u64> {
        let id = self.ids.leaf(leaf);
        if !self.visited.insert(address(leaf)) {
            return Ok(id);
        }

        let values = leaf.values();
        if leaf.is_root() {
            write!(self.out, r##""{id}"[label="root" fillcolor="#bef1cf"];"##)?;
        } else {
            write!(
                self.out,
                r##""{id}"[label="{} ({})" fillcolor="#bef1cf"];"##,
                leaf.value(),
                values.len()
            )?;
        }

        if !values.is_empty() {
            let mut listing = String::new();
            values.ascend(|value| {
                listing.push_str(&value.to_string());
                listing.push(';');
                true
            });
            let data = self.ids.fresh();
            write!(
                self.out,
                r##""{data}"[label="{listing}" fillcolor="#cccccc" shape=polygon];"##
            )?;
            write!(self.out, r#""{id}"->"{data}"[style=dashed,dir=none];"#)?;
        }

        let mut result = Ok(());
        leaf.ascend_children(|node| {
            result = self.node(node).and_then(|child| self.child_edge(id, child));
            result.is_ok()
        });
        result?;

        if let Some(parent) = leaf.parent() {
            let parent = self.ids.node(&parent);
            self.parent_edge(id, parent)?;
        }
        Ok(id)
    }

    fn child_edge(&mut self, from: u64, to: u64) -> io::Result<()> {
        write!(self.out, r#""{from}"->"{to}"[dir=forward];"#)
    }

    fn parent_edge(&mut self, from: u64, to: u64) -> io::Result<()> {
        write!(
            self.out,
            r##""{from}"->"{to}"[dir=forward style=dashed color="#cccccc"];"##
        )
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}
