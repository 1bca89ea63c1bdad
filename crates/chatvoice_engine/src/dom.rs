//! A mutable HTML document with batched change notifications.
//!
//! Mutations made through [`LiveDocument`] are recorded and handed to the
//! registered observers on [`LiveDocument::flush`], one batch per observer,
//! filtered to the records that fall inside the observed subtree.

use ego_tree::{NodeId, NodeRef, Tree};
use scraper::{ElementRef, Html, Node, Selector};
use thiserror::Error;

pub type ObserverId = u64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomError {
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    #[error("node {0:?} has no parent")]
    Detached(NodeId),
    #[error(transparent)]
    Selector(#[from] SelectorError),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid selector `{selector}`: {message}")]
pub struct SelectorError {
    pub selector: String,
    pub message: String,
}

/// One child-list change under `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added: Vec<NodeId>,
    pub removed: Vec<NodeId>,
    /// `target` and its ancestors at the time of the change, nearest first.
    pub lineage: Vec<NodeId>,
}

impl MutationRecord {
    /// Whether the change happened at or below `node`.
    pub fn is_within(&self, node: NodeId) -> bool {
        self.lineage.contains(&node)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObserveOptions {
    /// Also report changes below the observed node, not just its direct children.
    pub subtree: bool,
}

pub trait DocumentObserver {
    fn on_mutations(&mut self, html: &Html, records: &[MutationRecord]);

    /// Called once when the registration is removed.
    fn disconnect(&mut self) {}
}

struct Registration {
    id: ObserverId,
    root: NodeId,
    options: ObserveOptions,
    observer: Box<dyn DocumentObserver>,
}

/// Detached nodes stay in the underlying arena until the document is
/// dropped, so a long-lived document grows with every removal.
pub struct LiveDocument {
    html: Html,
    pending: Vec<MutationRecord>,
    observers: Vec<Registration>,
    next_observer: ObserverId,
}

impl LiveDocument {
    pub fn parse(source: &str) -> Self {
        Self {
            html: Html::parse_document(source),
            pending: Vec::new(),
            observers: Vec::new(),
            next_observer: 1,
        }
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    pub fn root(&self) -> NodeId {
        self.html.tree.root().id()
    }

    pub fn body(&self) -> Option<NodeId> {
        self.query_selector("body").ok().flatten()
    }

    /// First connected element matching `selector`, in document order.
    pub fn query_selector(&self, selector: &str) -> Result<Option<NodeId>, DomError> {
        let selector = parse_selector(selector)?;
        let found = select_connected(&self.html, &selector).next().map(|el| el.id());
        Ok(found)
    }

    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, DomError> {
        let selector = parse_selector(selector)?;
        let found = select_connected(&self.html, &selector).map(|el| el.id()).collect();
        Ok(found)
    }

    pub fn element(&self, id: NodeId) -> Option<ElementRef<'_>> {
        self.html.tree.get(id).and_then(ElementRef::wrap)
    }

    pub fn is_connected(&self, id: NodeId) -> bool {
        is_inclusive_ancestor(&self.html.tree, self.root(), id)
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.html
            .tree
            .get(id)
            .map(|node| node.children().filter(|c| c.value().is_element()).count())
            .unwrap_or(0)
    }

    /// Parses `fragment` and appends its top-level nodes to `parent`.
    pub fn append_html(&mut self, parent: NodeId, fragment: &str) -> Result<Vec<NodeId>, DomError> {
        if self.html.tree.get(parent).is_none() {
            return Err(DomError::UnknownNode(parent));
        }
        let parsed = Html::parse_fragment(fragment);
        let mut added = Vec::new();
        for child in parsed.root_element().children() {
            let id = graft(&mut self.html.tree, parent, child).ok_or(DomError::UnknownNode(parent))?;
            added.push(id);
        }
        if !added.is_empty() {
            self.pending.push(MutationRecord {
                target: parent,
                added: added.clone(),
                removed: Vec::new(),
                lineage: lineage(&self.html.tree, parent),
            });
        }
        Ok(added)
    }

    pub fn remove(&mut self, node: NodeId) -> Result<(), DomError> {
        let parent = self
            .html
            .tree
            .get(node)
            .ok_or(DomError::UnknownNode(node))?
            .parent()
            .ok_or(DomError::Detached(node))?
            .id();
        let parent_lineage = lineage(&self.html.tree, parent);
        if let Some(mut handle) = self.html.tree.get_mut(node) {
            handle.detach();
        }
        self.pending.push(MutationRecord {
            target: parent,
            added: Vec::new(),
            removed: vec![node],
            lineage: parent_lineage,
        });
        Ok(())
    }

    /// Detaches every child of `parent`; returns how many were removed.
    pub fn clear_children(&mut self, parent: NodeId) -> Result<usize, DomError> {
        let children: Vec<NodeId> = self
            .html
            .tree
            .get(parent)
            .ok_or(DomError::UnknownNode(parent))?
            .children()
            .map(|c| c.id())
            .collect();
        for child in &children {
            if let Some(mut handle) = self.html.tree.get_mut(*child) {
                handle.detach();
            }
        }
        if !children.is_empty() {
            self.pending.push(MutationRecord {
                target: parent,
                added: Vec::new(),
                removed: children.clone(),
                lineage: lineage(&self.html.tree, parent),
            });
        }
        Ok(children.len())
    }

    pub fn observe(
        &mut self,
        root: NodeId,
        options: ObserveOptions,
        observer: Box<dyn DocumentObserver>,
    ) -> ObserverId {
        let id = self.next_observer;
        self.next_observer += 1;
        self.observers.push(Registration {
            id,
            root,
            options,
            observer,
        });
        id
    }

    /// Removes the registration and runs its disconnect hook.
    pub fn disconnect(&mut self, id: ObserverId) -> bool {
        match self.observers.iter().position(|r| r.id == id) {
            Some(index) => {
                let mut registration = self.observers.remove(index);
                registration.observer.disconnect();
                true
            }
            None => false,
        }
    }

    pub fn disconnect_all(&mut self) {
        for mut registration in self.observers.drain(..) {
            registration.observer.disconnect();
        }
    }

    /// Nodes held by the document, detached ones included.
    pub fn arena_len(&self) -> usize {
        self.html.tree.nodes().count()
    }

    pub fn pending_records(&self) -> usize {
        self.pending.len()
    }

    /// Delivers queued records to every observer whose scope they fall in.
    /// Scope is judged by where each change happened, not by where its
    /// target ended up after the rest of the batch.
    pub fn flush(&mut self) -> usize {
        let records = std::mem::take(&mut self.pending);
        if records.is_empty() {
            return 0;
        }
        let html = &self.html;
        for registration in &mut self.observers {
            let relevant: Vec<MutationRecord> = records
                .iter()
                .filter(|r| {
                    r.target == registration.root
                        || (registration.options.subtree && r.is_within(registration.root))
                })
                .cloned()
                .collect();
            if !relevant.is_empty() {
                registration.observer.on_mutations(html, &relevant);
            }
        }
        records.len()
    }
}

impl Drop for LiveDocument {
    fn drop(&mut self) {
        self.disconnect_all();
    }
}

pub fn parse_selector(selector: &str) -> Result<Selector, SelectorError> {
    Selector::parse(selector).map_err(|err| SelectorError {
        selector: selector.to_string(),
        message: format!("{err:?}"),
    })
}

/// Matching elements reachable from the document root. Detached subtrees are skipped.
pub fn select_connected<'a, 'b>(
    html: &'a Html,
    selector: &'b Selector,
) -> impl Iterator<Item = ElementRef<'a>> + 'b
where
    'a: 'b,
{
    let root = html.root_element();
    std::iter::once(root)
        .filter(move |el| selector.matches(el))
        .chain(root.select(selector))
}

pub fn is_inclusive_ancestor(tree: &Tree<Node>, ancestor: NodeId, node: NodeId) -> bool {
    if ancestor == node {
        return true;
    }
    tree.get(node)
        .map(|n| n.ancestors().any(|a| a.id() == ancestor))
        .unwrap_or(false)
}

/// `node` followed by its ancestors up to the tree root.
pub fn lineage(tree: &Tree<Node>, node: NodeId) -> Vec<NodeId> {
    match tree.get(node) {
        Some(n) => std::iter::once(node)
            .chain(n.ancestors().map(|a| a.id()))
            .collect(),
        None => Vec::new(),
    }
}

fn graft(tree: &mut Tree<Node>, parent: NodeId, source: NodeRef<'_, Node>) -> Option<NodeId> {
    let id = {
        let mut parent = tree.get_mut(parent)?;
        parent.append(source.value().clone()).id()
    };
    for child in source.children() {
        graft(tree, id, child)?;
    }
    Some(id)
}
