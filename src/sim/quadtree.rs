//! Broad phase: a quadtree rebuilt every tick
//!
//! Static geometry is inserted up front. Each moving body is then *queried*:
//! the query snapshots every indexed body whose rectangle overlaps the
//! query's, queues them as candidate pairs, and finally inserts the queried
//! body so later queries can see it. The caller drains the queued pairs one
//! at a time before issuing the next query.
//!
//! Candidates are rectangle overlaps at query time only. Handlers re-check
//! exact overlap against the bodies' current positions.

use std::collections::VecDeque;

use crate::error::SimError;
use crate::sim::body::{Owner, Rect};

/// Outcome of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    /// At least one candidate pair is waiting in [`Quadtree::next_pair`]
    Overlapping,
    /// Nothing overlapped
    Done,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    owner: Owner,
    rect: Rect,
}

#[derive(Debug, Clone)]
struct Node {
    bounds: Rect,
    depth: u32,
    /// Indices of the NW, NE, SW, SE children once split
    children: Option<[usize; 4]>,
    items: Vec<Entry>,
}

impl Node {
    fn leaf(bounds: Rect, depth: u32) -> Self {
        Self {
            bounds,
            depth,
            children: None,
            items: Vec::new(),
        }
    }
}

/// Region quadtree over an arena of nodes
#[derive(Debug, Clone)]
pub struct Quadtree {
    nodes: Vec<Node>,
    max_depth: u32,
    max_per_node: usize,
    pending: VecDeque<(Owner, Owner)>,
    len: usize,
    /// Scratch buffer reused across queries
    found: Vec<Owner>,
}

impl Quadtree {
    pub fn new(bounds: Rect, max_depth: u32, max_per_node: usize) -> Self {
        Self {
            nodes: vec![Node::leaf(bounds, 0)],
            max_depth,
            max_per_node: max_per_node.max(1),
            pending: VecDeque::new(),
            len: 0,
            found: Vec::new(),
        }
    }

    /// Drop every body and start over with new root bounds
    pub fn reset(&mut self, bounds: Rect) {
        self.nodes.clear();
        self.nodes.push(Node::leaf(bounds, 0));
        self.pending.clear();
        self.len = 0;
    }

    pub fn bounds(&self) -> Rect {
        self.nodes[0].bounds
    }

    /// Number of bodies indexed since the last reset
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index a body without looking for overlaps.
    ///
    /// Bodies entirely outside the root are ignored.
    pub fn insert(&mut self, owner: Owner, rect: Rect) {
        if !self.nodes[0].bounds.overlaps(&rect) {
            return;
        }
        self.insert_into(0, Entry { owner, rect });
        self.len += 1;
    }

    /// Queue every indexed body overlapping `rect` as a pair `(owner, other)`,
    /// then index `owner` itself.
    ///
    /// A body stored in several leaves is reported once, and a body never
    /// pairs with itself.
    pub fn collide(&mut self, owner: Owner, rect: Rect) -> Result<QueryState, SimError> {
        if !self.pending.is_empty() {
            return Err(SimError::QueryNotDrained {
                pending: self.pending.len(),
            });
        }

        let mut found = std::mem::take(&mut self.found);
        found.clear();
        self.gather(0, &rect, &mut found);
        found.sort_unstable();
        found.dedup();
        self.pending
            .extend(found.iter().filter(|other| **other != owner).map(|other| (owner, *other)));
        self.found = found;

        self.insert(owner, rect);

        Ok(if self.pending.is_empty() {
            QueryState::Done
        } else {
            QueryState::Overlapping
        })
    }

    /// Next candidate pair of the last query, `(queried, indexed)`
    pub fn next_pair(&mut self) -> Option<(Owner, Owner)> {
        self.pending.pop_front()
    }

    pub fn is_drained(&self) -> bool {
        self.pending.is_empty()
    }

    #[cfg(test)]
    fn leaf_bounds(&self) -> impl Iterator<Item = Rect> + '_ {
        self.nodes.iter().filter(|n| n.children.is_none()).map(|n| n.bounds)
    }

    fn insert_into(&mut self, index: usize, entry: Entry) {
        if let Some(children) = self.nodes[index].children {
            for child in children {
                if self.nodes[child].bounds.overlaps(&entry.rect) {
                    self.insert_into(child, entry);
                }
            }
            return;
        }

        let node = &mut self.nodes[index];
        node.items.push(entry);
        if node.items.len() > self.max_per_node && node.depth < self.max_depth {
            self.split(index);
        }
    }

    fn split(&mut self, index: usize) {
        let depth = self.nodes[index].depth + 1;
        let quadrants = self.nodes[index].bounds.quadrants();
        let first = self.nodes.len();
        for bounds in quadrants {
            self.nodes.push(Node::leaf(bounds, depth));
        }
        let children = [first, first + 1, first + 2, first + 3];

        let items = std::mem::take(&mut self.nodes[index].items);
        self.nodes[index].children = Some(children);
        for entry in items {
            for child in children {
                if self.nodes[child].bounds.overlaps(&entry.rect) {
                    self.insert_into(child, entry);
                }
            }
        }
    }

    fn gather(&self, index: usize, rect: &Rect, found: &mut Vec<Owner>) {
        let node = &self.nodes[index];
        if !node.bounds.overlaps(rect) {
            return;
        }
        match node.children {
            Some(children) => {
                for child in children {
                    self.gather(child, rect, found);
                }
            }
            None => found.extend(
                node.items
                    .iter()
                    .filter(|entry| entry.rect.overlaps(rect))
                    .map(|entry| entry.owner),
            ),
        }
    }
}
