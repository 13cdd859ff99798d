//! # Document View Tree
//!
//! Owned mirror of the document's rendered structure.
//!
//! Each document line is rendered as one line element holding a single text
//! node, directly inside the content container:
//!
//! ```text
//! <pre class="CM-content">
//!   <div class="CM-line">first line</div>
//!   <div class="CM-line">second line</div>
//! </pre>
//! ```
//!
//! `update` brings the rendering tree in line with a new document while
//! touching as little as possible: lines outside the changed region keep
//! their nodes, changed lines get their text replaced in place, and only the
//! surplus is created or removed.
//!
//! ## Divergence
//!
//! The tree is shared with the user and the platform, so before diffing the
//! mirror is checked against it:
//!
//! - a line whose text node simply holds different text (typing) is
//!   *adopted*: the mirror takes the tree's text and the diff decides what
//!   to write
//! - a line whose structure no longer matches (nodes gone, split, retagged,
//!   extra attributes) is *stale* and is rebuilt as a whole
//! - a line inside a dirty range whose text still matches the mirror is
//!   stale as well
//! - when the container's child list no longer matches the mirrored lines,
//!   the container itself is the smallest consistent subtree and everything
//!   is rebuilt

use crate::ViewConfig;
use std::collections::HashMap;
use tracing::{debug, error, instrument, warn};
use weft_dom::{Dom, DomError, DomPosition, NodeId, NodeKind};
use weft_state::Text;

/// Rendered document line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineView {
    text: String,
    dom: NodeId,
    text_node: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineState {
    Intact,
    Drifted,
    Stale,
}

impl LineView {
    fn render(dom: &mut Dom, text: &str, tag: &str, class: &str) -> Result<Self, DomError> {
        let element = dom.create_element(tag);
        dom.set_attribute(element, "class", class)?;
        let text_node = dom.create_text(text);
        dom.append_child(element, text_node)?;

        Ok(Self {
            text: text.to_string(),
            dom: element,
            text_node,
        })
    }

    fn inspect(&self, dom: &Dom, tag: &str, class: &str) -> LineState {
        // The class is the only attribute a rendered line carries
        match dom.kind(self.dom) {
            Some(NodeKind::Element { tag: t, attributes })
                if t == tag
                    && attributes.len() == 1
                    && attributes.get("class").map(String::as_str) == Some(class) => {}
            _ => return LineState::Stale,
        }
        if dom.children(self.dom) != [self.text_node] {
            return LineState::Stale;
        }
        match dom.text(self.text_node) {
            Some(text) if text == self.text => LineState::Intact,
            Some(_) => LineState::Drifted,
            None => LineState::Stale,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The line element
    pub fn dom(&self) -> NodeId {
        self.dom
    }

    pub fn text_node(&self) -> NodeId {
        self.text_node
    }
}

/// Document ranges whose rendering is known to be stale
///
/// Overlapping and touching ranges are merged on insertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtyRanges {
    ranges: Vec<(usize, usize)>,
}

impl DirtyRanges {
    pub fn add(&mut self, from: usize, to: usize) {
        let mut merged = (from.min(to), from.max(to));
        let mut ranges = Vec::with_capacity(self.ranges.len() + 1);
        for &(start, end) in &self.ranges {
            if end < merged.0 || start > merged.1 {
                ranges.push((start, end));
            } else {
                merged = (merged.0.min(start), merged.1.max(end));
            }
        }
        ranges.push(merged);
        ranges.sort_unstable();
        self.ranges = ranges;
    }

    pub fn intersects(&self, from: usize, to: usize) -> bool {
        self.ranges
            .iter()
            .any(|&(start, end)| start <= to && from <= end)
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn as_slice(&self) -> &[(usize, usize)] {
        &self.ranges
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }
}

/// What a call to [`DocView::update`] did to the rendering tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub removed: usize,
    pub updated: usize,
    pub rebuilt: usize,
    /// Lines whose text was taken over from the tree
    pub adopted: usize,
    pub full_rebuild: bool,
}

impl ReconcileReport {
    /// Whether the tree was left untouched
    pub fn is_noop(&self) -> bool {
        self.created == 0
            && self.removed == 0
            && self.updated == 0
            && self.rebuilt == 0
            && !self.full_rebuild
    }
}

#[derive(Debug)]
pub struct DocView {
    content: NodeId,
    lines: Vec<LineView>,
    dirty: DirtyRanges,
    line_tag: String,
    line_class: String,
}

impl DocView {
    /// Render `doc` into the (empty) content container
    pub fn new(dom: &mut Dom, content: NodeId, doc: &Text, config: &ViewConfig) -> Result<Self, DomError> {
        let mut view = Self {
            content,
            lines: Vec::new(),
            dirty: DirtyRanges::default(),
            line_tag: config.line_tag.clone(),
            line_class: config.line_class.clone(),
        };
        view.rebuild_all(dom, doc)?;
        Ok(view)
    }

    pub fn content(&self) -> NodeId {
        self.content
    }

    pub fn lines(&self) -> &[LineView] {
        &self.lines
    }

    pub fn dirty_ranges(&self) -> &DirtyRanges {
        &self.dirty
    }

    pub fn has_dirty_ranges(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Flag `from..to` (mirror coordinates) as out of sync with the tree
    pub fn mark_dirty(&mut self, from: usize, to: usize) {
        self.dirty.add(from, to);
    }

    /// Range of every line in mirror coordinates
    pub fn line_ranges(&self) -> Vec<(usize, usize)> {
        let mut start = 0;
        self.lines
            .iter()
            .map(|line| {
                let end = start + line.text.chars().count();
                let range = (start, end);
                start = end + 1;
                range
            })
            .collect()
    }

    /// Mirror range of the line holding each of `nodes`, `None` for nodes
    /// outside every mirrored line
    pub fn ranges_for_nodes(&self, dom: &Dom, nodes: &[NodeId]) -> Vec<Option<(usize, usize)>> {
        let ranges = self.line_ranges();
        let by_element: HashMap<NodeId, usize> = self
            .lines
            .iter()
            .enumerate()
            .map(|(index, line)| (line.dom, index))
            .collect();

        nodes
            .iter()
            .map(|node| {
                let top = self.top_level_child(dom, *node)?;
                by_element.get(&top).map(|index| ranges[*index])
            })
            .collect()
    }

    /// Make the rendering tree match `doc` and clear the dirty ranges
    #[instrument(skip_all, fields(lines = doc.line_count(), dirty = self.dirty.len()))]
    pub fn update(&mut self, dom: &mut Dom, doc: &Text) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        if !dom.exists(self.content) {
            error!(content = %self.content, "Content container no longer exists");
            self.dirty.add(0, doc.len());
            return report;
        }

        let patched = if self.structure_intact(dom) {
            match self.patch(dom, doc, &mut report) {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "Incremental update failed; rebuilding content");
                    false
                }
            }
        } else {
            warn!("Content children diverged from the mirror; rebuilding content");
            false
        };

        if !patched {
            report = ReconcileReport {
                full_rebuild: true,
                ..ReconcileReport::default()
            };
            if let Err(e) = self.rebuild_all(dom, doc) {
                error!(error = %e, "Rebuilding content failed");
                self.dirty.add(0, doc.len());
                return report;
            }
            report.created = self.lines.len();
        }

        self.dirty.clear();
        debug!(?report, "Reconciled document view");
        report
    }

    fn structure_intact(&self, dom: &Dom) -> bool {
        dom.children(self.content)
            .iter()
            .copied()
            .eq(self.lines.iter().map(|line| line.dom))
    }

    fn patch(&mut self, dom: &mut Dom, doc: &Text, report: &mut ReconcileReport) -> Result<(), DomError> {
        let ranges = self.line_ranges();
        let mut stale = vec![false; self.lines.len()];
        for (index, line) in self.lines.iter_mut().enumerate() {
            let (from, to) = ranges[index];
            let dirty = self.dirty.intersects(from, to);
            match line.inspect(dom, &self.line_tag, &self.line_class) {
                // Marked by an observed mutation the tree no longer shows
                LineState::Intact if dirty => stale[index] = true,
                LineState::Intact => {}
                LineState::Drifted => {
                    line.text = dom.text(line.text_node).unwrap_or_default().to_string();
                    report.adopted += 1;
                }
                LineState::Stale => stale[index] = true,
            }
        }

        let doc_lines: Vec<&str> = doc.lines().collect();
        let old_len = self.lines.len();
        let new_len = doc_lines.len();

        let lines = &self.lines;
        let same = |old: usize, new: usize| !stale[old] && lines[old].text == doc_lines[new];

        let mut prefix = 0;
        while prefix < old_len && prefix < new_len && same(prefix, prefix) {
            prefix += 1;
        }
        let mut suffix = 0;
        while suffix < old_len - prefix
            && suffix < new_len - prefix
            && same(old_len - 1 - suffix, new_len - 1 - suffix)
        {
            suffix += 1;
        }

        let old_end = old_len - suffix;
        let new_end = new_len - suffix;
        let paired = (old_end - prefix).min(new_end - prefix);

        for index in prefix..prefix + paired {
            let text = doc_lines[index];
            if stale[index] {
                self.rebuild_line(dom, index, text)?;
                report.rebuilt += 1;
            } else if self.lines[index].text != text {
                let line = &mut self.lines[index];
                dom.set_text(line.text_node, text)?;
                line.text = text.to_string();
                report.updated += 1;
            }
        }

        let insert_at = prefix + paired;
        if new_end > insert_at {
            let reference = self.lines.get(old_end).map(|line| line.dom);
            let mut created = Vec::with_capacity(new_end - insert_at);
            for text in &doc_lines[insert_at..new_end] {
                let line = LineView::render(dom, text, &self.line_tag, &self.line_class)?;
                dom.insert_before(self.content, line.dom, reference)?;
                created.push(line);
            }
            report.created += created.len();
            self.lines.splice(insert_at..insert_at, created);
        } else if old_end > insert_at {
            let removed: Vec<LineView> = self.lines.drain(insert_at..old_end).collect();
            for line in &removed {
                dom.remove(line.dom)?;
            }
            report.removed += removed.len();
        }

        Ok(())
    }

    fn rebuild_line(&mut self, dom: &mut Dom, index: usize, text: &str) -> Result<(), DomError> {
        let fresh = LineView::render(dom, text, &self.line_tag, &self.line_class)?;
        let old = self.lines[index].dom;
        dom.insert_before(self.content, fresh.dom, Some(old))?;
        dom.remove(old)?;
        self.lines[index] = fresh;
        Ok(())
    }

    fn rebuild_all(&mut self, dom: &mut Dom, doc: &Text) -> Result<(), DomError> {
        let mut lines = Vec::with_capacity(doc.line_count());
        for text in doc.lines() {
            lines.push(LineView::render(dom, text, &self.line_tag, &self.line_class)?);
        }

        let previous = dom.children(self.content).to_vec();
        dom.replace_children(self.content, lines.iter().map(|line| line.dom).collect())?;
        for child in previous {
            if dom.exists(child) && dom.parent(child).is_none() {
                dom.remove(child)?;
            }
        }

        self.lines = lines;
        Ok(())
    }

    // ----- position mapping ---------------------------------------------

    /// Tree position of document offset `pos`
    ///
    /// Only meaningful while the mirror is in sync with `doc`.
    pub fn pos_to_dom(&self, doc: &Text, pos: usize) -> Option<DomPosition> {
        let pos = pos.min(doc.len());
        let info = doc.line_at(pos).ok()?;
        let line = self.lines.get(info.number)?;
        let offset = (pos - info.start).min(line.text.chars().count());
        Some(DomPosition::new(line.text_node, offset))
    }

    /// Text offset of a tree position, read from the tree's actual structure
    ///
    /// Every child of the content container counts as one line, so this
    /// also works while the tree holds edits the document has not seen yet:
    /// the result is then an offset into [`read_text`](Self::read_text).
    pub fn dom_to_pos(&self, dom: &Dom, pos: DomPosition) -> Option<usize> {
        let children = dom.children(self.content);
        let line_len = |node: NodeId| dom.text_content(node).chars().count();

        if pos.node == self.content {
            let index = pos.offset.min(children.len());
            let start: usize = children[..index].iter().map(|c| line_len(*c) + 1).sum();
            return Some(if index == children.len() && index > 0 {
                start - 1
            } else {
                start
            });
        }

        let top = self.top_level_child(dom, pos.node)?;
        let index = children.iter().position(|child| *child == top)?;
        let start: usize = children[..index].iter().map(|c| line_len(*c) + 1).sum();

        let mut within = text_before(dom, top, pos.node);
        within += match dom.text(pos.node) {
            Some(_) => pos.offset,
            None => dom
                .children(pos.node)
                .iter()
                .take(pos.offset)
                .map(|child| line_len(*child))
                .sum(),
        };

        Some(start + within.min(line_len(top)))
    }

    /// Index of the mirrored line containing `node`
    pub fn line_for_node(&self, dom: &Dom, node: NodeId) -> Option<usize> {
        let top = self.top_level_child(dom, node)?;
        self.lines.iter().position(|line| line.dom == top)
    }

    /// Text currently shown by the tree, one line per container child
    pub fn read_text(&self, dom: &Dom) -> String {
        dom.children(self.content)
            .iter()
            .map(|child| dom.text_content(*child))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn top_level_child(&self, dom: &Dom, node: NodeId) -> Option<NodeId> {
        let mut current = node;
        loop {
            let parent = dom.parent(current)?;
            if parent == self.content {
                return Some(current);
            }
            current = parent;
        }
    }
}

/// Characters of text preceding `target` inside `top`, in document order
fn text_before(dom: &Dom, top: NodeId, target: NodeId) -> usize {
    fn walk(dom: &Dom, node: NodeId, target: NodeId, count: &mut usize) -> bool {
        if node == target {
            return true;
        }
        if let Some(text) = dom.text(node) {
            *count += text.chars().count();
            return false;
        }
        dom.children(node)
            .iter()
            .any(|child| walk(dom, *child, target, count))
    }

    let mut count = 0;
    walk(dom, top, target, &mut count);
    count
}
