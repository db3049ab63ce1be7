//! A lightweight tree standing in for the rendered diff table.
//!
//! The selection engine works on node/offset anchors, so it needs a concrete
//! structure to anchor into. [`RenderedDoc`] is an arena of nodes mirroring
//! what a host would actually paint: one table, one row per [`TableRow`],
//! cells for line numbers and content, plus comment threads and editable
//! regions attached after the fact. Hosts with a real widget tree map their
//! hit-test results onto these ids.

use crate::domain::Side;
use crate::group::DiffLineType;
use crate::render::TableRow;

pub type NodeId = usize;

/// A position inside the document: a node plus an offset within it. For
/// [`NodeKind::Text`] nodes the offset counts code points; for element nodes
/// it counts children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub node: NodeId,
    pub offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    LineNumber(Side),
    Sign(Side),
    Content(Side),
    ContextControl,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Table,
    /// A table row with its per-side line markers. Context-control rows carry
    /// no markers.
    Row {
        left: Option<u32>,
        right: Option<u32>,
    },
    Cell(CellKind),
    Text(String),
    CommentThread,
    Editable,
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct RenderedDoc {
    nodes: Vec<Node>,
}

impl RenderedDoc {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Table,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        0
    }

    /// Builds the document for a row sequence.
    pub fn from_rows(rows: &[TableRow]) -> Self {
        let mut doc = Self::new();
        let table = doc.root();
        for row in rows {
            match row {
                TableRow::SideBySide { left, right } => {
                    let row_id = doc.append(
                        table,
                        NodeKind::Row {
                            left: left.as_ref().and_then(|s| s.number(Side::Left)),
                            right: right.as_ref().and_then(|s| s.number(Side::Right)),
                        },
                    );
                    for (side, slot) in [(Side::Left, left), (Side::Right, right)] {
                        let number = doc.append(row_id, NodeKind::Cell(CellKind::LineNumber(side)));
                        let content = doc.append(row_id, NodeKind::Cell(CellKind::Content(side)));
                        if let Some(slot) = slot {
                            if let Some(n) = slot.number(side) {
                                doc.append(number, NodeKind::Text(n.to_string()));
                            }
                            doc.append(content, NodeKind::Text(slot.text.clone()));
                        }
                    }
                }
                TableRow::Unified { slot } => {
                    let (left, right) = (slot.number(Side::Left), slot.number(Side::Right));
                    let row_id = doc.append(table, NodeKind::Row { left, right });
                    for side in [Side::Left, Side::Right] {
                        let number = doc.append(row_id, NodeKind::Cell(CellKind::LineNumber(side)));
                        if let Some(n) = slot.number(side) {
                            doc.append(number, NodeKind::Text(n.to_string()));
                        }
                    }
                    let content_side = if slot.line_type == DiffLineType::Remove {
                        Side::Left
                    } else {
                        Side::Right
                    };
                    let content =
                        doc.append(row_id, NodeKind::Cell(CellKind::Content(content_side)));
                    doc.append(content, NodeKind::Text(slot.text.clone()));
                }
                TableRow::ContextControl { hidden_lines, .. } => {
                    let row_id = doc.append(
                        table,
                        NodeKind::Row {
                            left: None,
                            right: None,
                        },
                    );
                    let cell = doc.append(row_id, NodeKind::Cell(CellKind::ContextControl));
                    doc.append(cell, NodeKind::Text(format!("+{hidden_lines} common lines")));
                }
            }
        }
        doc
    }

    pub fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        id
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Nearest ancestor-or-self row.
    pub fn row_of(&self, id: NodeId) -> Option<NodeId> {
        self.ancestor_or_self(id, |k| matches!(k, NodeKind::Row { .. }))
    }

    /// Nearest ancestor-or-self cell.
    pub fn cell_of(&self, id: NodeId) -> Option<NodeId> {
        self.ancestor_or_self(id, |k| matches!(k, NodeKind::Cell(_)))
    }

    pub fn is_in_comment_thread(&self, id: NodeId) -> bool {
        self.ancestor_or_self(id, |k| matches!(k, NodeKind::CommentThread))
            .is_some()
    }

    pub fn is_in_editable(&self, id: NodeId) -> bool {
        self.ancestor_or_self(id, |k| matches!(k, NodeKind::Editable))
            .is_some()
    }

    fn ancestor_or_self(&self, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if pred(&self.nodes[node].kind) {
                return Some(node);
            }
            current = self.nodes[node].parent;
        }
        None
    }

    /// The line marker of a row on the given side.
    pub fn row_line(&self, row: NodeId, side: Side) -> Option<u32> {
        match self.nodes[row].kind {
            NodeKind::Row { left, right } => match side {
                Side::Left => left,
                Side::Right => right,
            },
            _ => None,
        }
    }

    /// The first row carrying the given line marker.
    pub fn find_row(&self, side: Side, line: u32) -> Option<NodeId> {
        self.children(self.root())
            .iter()
            .copied()
            .find(|&row| self.row_line(row, side) == Some(line))
    }

    /// The content cell of a row on the given side.
    pub fn content_cell(&self, row: NodeId, side: Side) -> Option<NodeId> {
        self.children(row).iter().copied().find(|&c| {
            matches!(self.nodes[c].kind, NodeKind::Cell(CellKind::Content(s)) if s == side)
        })
    }

    /// Whether a content cell has no text (the filler cell opposite an
    /// unbalanced delta).
    pub fn cell_is_empty(&self, cell: NodeId) -> bool {
        self.descendant_text_nodes(cell)
            .iter()
            .all(|&t| self.text(t).is_none_or(str::is_empty))
    }

    /// The text node holding a line's content, for building anchors.
    pub fn content_text_node(&self, side: Side, line: u32) -> Option<NodeId> {
        let row = self.find_row(side, line)?;
        let cell = self.content_cell(row, side)?;
        self.descendant_text_nodes(cell).first().copied()
    }

    /// Text nodes under `id` in document order.
    pub fn descendant_text_nodes(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut Vec<NodeId>) {
        if matches!(self.nodes[id].kind, NodeKind::Text(_)) {
            out.push(id);
        }
        for &child in &self.nodes[id].children {
            self.collect_text(child, out);
        }
    }

    /// Root-to-node child-index path; paths compare in document order.
    pub fn path(&self, id: NodeId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.nodes[current].parent {
            let index = self.nodes[parent]
                .children
                .iter()
                .position(|&c| c == current)
                .unwrap_or(0);
            path.push(index);
            current = parent;
        }
        path.reverse();
        path
    }

    pub fn cmp_document_order(&self, a: NodeId, b: NodeId) -> std::cmp::Ordering {
        self.path(a).cmp(&self.path(b))
    }

    /// Attaches a comment thread under a line's content cell, one text child
    /// per paragraph. Returns the thread node.
    pub fn attach_comment_thread(
        &mut self,
        side: Side,
        line: u32,
        paragraphs: &[&str],
    ) -> Option<NodeId> {
        let row = self.find_row(side, line)?;
        let cell = self.content_cell(row, side)?;
        let thread = self.append(cell, NodeKind::CommentThread);
        for paragraph in paragraphs {
            self.append(thread, NodeKind::Text((*paragraph).to_string()));
        }
        Some(thread)
    }

    /// Attaches an editable region (a draft reply box) under a thread.
    pub fn attach_editable(&mut self, thread: NodeId, draft: &str) -> NodeId {
        let editable = self.append(thread, NodeKind::Editable);
        self.append(editable, NodeKind::Text(draft.to_string()));
        editable
    }
}

impl Default for RenderedDoc {
    fn default() -> Self {
        Self::new()
    }
}
