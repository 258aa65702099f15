//! Client Ring Module
//!
//! Ordered collection of the clients that live on one desktop. The first
//! element is the master, everything after it is the stack.
//!
//! Nodes are kept in an arena and linked by index. The ring stores explicit
//! `head` and `tail` indices, so insertion at either end is O(1) and a
//! `ClientId` stays valid for as long as its client is in the ring.

use crate::wm::client::{Client, WindowId};

/// Stable position of a client inside one [`ClientRing`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(usize);

/// Traversal direction along the ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

#[derive(Debug, Clone)]
struct Node {
    client: Client,
    prev: Option<ClientId>,
    next: Option<ClientId>,
}

/// Result of removing a client from the ring
#[derive(Debug)]
pub struct Removed {
    /// The client that was spliced out
    pub client: Client,
    /// Position that should become current: the predecessor, the new head
    /// when the removed client was the head, or nothing for an empty ring
    pub fallback: Option<ClientId>,
}

/// Per-desktop client ordering
#[derive(Debug, Clone, Default)]
pub struct ClientRing {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<ClientId>,
    tail: Option<ClientId>,
    len: usize,
}

impl ClientRing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The master position
    pub fn head(&self) -> Option<ClientId> {
        self.head
    }

    pub fn tail(&self) -> Option<ClientId> {
        self.tail
    }

    pub fn get(&self, id: ClientId) -> Option<&Client> {
        self.node(id).map(|n| &n.client)
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.node_mut(id).map(|n| &mut n.client)
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.node(id).is_some()
    }

    /// True successor, `None` at the tail
    pub fn next(&self, id: ClientId) -> Option<ClientId> {
        self.node(id)?.next
    }

    /// True predecessor, `None` at the head
    pub fn prev(&self, id: ClientId) -> Option<ClientId> {
        self.node(id)?.prev
    }

    /// Neighbour in `direction`, wrapping around at both ends.
    pub fn step(&self, id: ClientId, direction: Direction) -> Option<ClientId> {
        let node = self.node(id)?;
        match direction {
            Direction::Next => node.next.or(self.head),
            Direction::Prev => node.prev.or(self.tail),
        }
    }

    /// Position of the client managing `window`
    pub fn find(&self, window: WindowId) -> Option<ClientId> {
        self.ids()
            .find(|&id| self.get(id).is_some_and(|c| c.window == window))
    }

    /// Positions in ring order, master first
    pub fn ids(&self) -> Ids<'_> {
        Ids {
            ring: self,
            cursor: self.head,
            remaining: self.len,
        }
    }

    /// Clients in ring order, master first
    pub fn iter(&self) -> impl Iterator<Item = &Client> + '_ {
        self.ids().filter_map(move |id| self.get(id))
    }

    /// Window ids in ring order
    pub fn windows(&self) -> Vec<WindowId> {
        self.iter().map(|c| c.window).collect()
    }

    /// Insert a new client for `window`.
    ///
    /// With `at_tail` the client is appended after the current tail,
    /// otherwise it becomes the new master and the old master moves to the
    /// top of the stack. Callers make the returned id current.
    pub fn insert(&mut self, window: WindowId, at_tail: bool) -> ClientId {
        let id = self.alloc(Node {
            client: Client::new(window),
            prev: None,
            next: None,
        });

        match (self.head, self.tail) {
            (Some(head), Some(tail)) => {
                if at_tail {
                    self.set_next(tail, Some(id));
                    self.set_prev(id, Some(tail));
                    self.tail = Some(id);
                } else {
                    self.set_next(id, Some(head));
                    self.set_prev(head, Some(id));
                    self.head = Some(id);
                }
            }
            _ => {
                self.head = Some(id);
                self.tail = Some(id);
            }
        }

        self.len += 1;
        id
    }

    /// Splice `id` out of the ring.
    ///
    /// Returns `None` if `id` is not (or no longer) part of this ring.
    pub fn remove(&mut self, id: ClientId) -> Option<Removed> {
        let node = self.nodes.get_mut(id.0)?.take()?;
        self.free.push(id.0);
        self.len -= 1;

        match node.prev {
            Some(prev) => self.set_next(prev, node.next),
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => self.set_prev(next, node.prev),
            None => self.tail = node.prev,
        }

        Some(Removed {
            client: node.client,
            fallback: node.prev.or(self.head),
        })
    }

    /// Exchange the clients held at two positions, leaving the links alone.
    ///
    /// Returns `false` if either position is not part of the ring.
    pub fn swap_contents(&mut self, a: ClientId, b: ClientId) -> bool {
        if !self.contains(a) || !self.contains(b) {
            return false;
        }
        if a == b {
            return true;
        }

        let (lo, hi) = if a.0 < b.0 { (a.0, b.0) } else { (b.0, a.0) };
        let (left, right) = self.nodes.split_at_mut(hi);
        match (left[lo].as_mut(), right[0].as_mut()) {
            (Some(x), Some(y)) => {
                std::mem::swap(&mut x.client, &mut y.client);
                true
            }
            _ => false,
        }
    }

    fn alloc(&mut self, node: Node) -> ClientId {
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                ClientId(slot)
            }
            None => {
                self.nodes.push(Some(node));
                ClientId(self.nodes.len() - 1)
            }
        }
    }

    fn node(&self, id: ClientId) -> Option<&Node> {
        self.nodes.get(id.0)?.as_ref()
    }

    fn node_mut(&mut self, id: ClientId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)?.as_mut()
    }

    fn set_next(&mut self, id: ClientId, next: Option<ClientId>) {
        if let Some(node) = self.node_mut(id) {
            node.next = next;
        }
    }

    fn set_prev(&mut self, id: ClientId, prev: Option<ClientId>) {
        if let Some(node) = self.node_mut(id) {
            node.prev = prev;
        }
    }
}

/// Forward iterator over ring positions
pub struct Ids<'a> {
    ring: &'a ClientRing,
    cursor: Option<ClientId>,
    remaining: usize,
}

impl Iterator for Ids<'_> {
    type Item = ClientId;

    fn next(&mut self) -> Option<ClientId> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.cursor?;
        self.cursor = self.ring.next(id);
        self.remaining -= 1;
        Some(id)
    }
}
