//! Indexable skip list
//!
//! An ordered map with positional access. Every forward link records its
//! width: the number of base-level links it spans. Key lookup walks the
//! usual skip-list descent; positional lookup subtracts widths instead of
//! comparing keys. Both are O(log n).
//!
//! Nodes live in an arena `Vec` and link by index, with a free list for
//! reuse after deletes. `HEAD` and `NIL` are sentinel indices so head links
//! and node links share one code path.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Tallest tower a node can reach
pub const MAX_HEIGHT: usize = 12;

const NIL: usize = usize::MAX;
const HEAD: usize = usize::MAX - 1;

#[derive(Debug, Clone, Copy)]
struct Link {
    next: usize,
    /// Base-level links spanned by this forward pointer
    width: usize,
}

const EMPTY_LINK: Link = Link { next: NIL, width: 1 };

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    links: Vec<Link>,
}

/// Ordered map with O(log n) key and positional lookup
pub struct IndexableSkipList<K, V, R = SmallRng> {
    nodes: Vec<Option<Node<K, V>>>,
    free: Vec<usize>,
    head: [Link; MAX_HEIGHT],
    height: usize,
    len: usize,
    override_existing: bool,
    rng: R,
}

impl<K: Ord, V> IndexableSkipList<K, V, SmallRng> {
    /// List seeded from OS entropy; inserts replace existing keys
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_entropy(), true)
    }
}

impl<K: Ord, V> Default for IndexableSkipList<K, V, SmallRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V, R: Rng> IndexableSkipList<K, V, R> {
    /// List with an injected coin-flip source.
    ///
    /// `override_existing` decides what `insert` does on an equal key:
    /// replace the value, or keep the old one.
    pub fn with_rng(rng: R, override_existing: bool) -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            head: [EMPTY_LINK; MAX_HEIGHT],
            height: 1,
            len: 0,
            override_existing,
            rng,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a key-value pair.
    ///
    /// Returns `None` for a new key. For an existing key, returns the
    /// displaced value when overriding, or hands `value` back untouched
    /// when not.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let mut update = [HEAD; MAX_HEIGHT];
        let mut steps_at_level = [0usize; MAX_HEIGHT];
        let mut at = HEAD;
        for level in (0..self.height).rev() {
            loop {
                let link = self.link(at, level);
                if link.next == NIL || self.node(link.next).key >= key {
                    break;
                }
                steps_at_level[level] += link.width;
                at = link.next;
            }
            update[level] = at;
        }

        // Equal key: no structural change either way
        let existing = self.link(update[0], 0).next;
        if existing != NIL && self.node(existing).key == key {
            if self.override_existing {
                let slot = &mut self.node_mut(existing).value;
                return Some(std::mem::replace(slot, value));
            }
            return Some(value);
        }

        let target_height = self.random_height();
        let index = self.alloc(key, value, target_height);

        // Splice in at each of the new node's levels, deriving widths from
        // the base-level distance accumulated on the way down
        let mut steps = 0;
        for level in 0..target_height {
            let prev = update[level];
            let prev_link = self.link(prev, level);
            let new_link = Link {
                next: prev_link.next,
                width: prev_link.width - steps,
            };
            self.node_mut(index).links[level] = new_link;
            self.set_link(
                prev,
                level,
                Link {
                    next: index,
                    width: steps + 1,
                },
            );
            steps += steps_at_level[level];
        }

        // Levels above the new node span one more base element now
        for level in target_height..MAX_HEIGHT {
            let prev = update[level];
            let mut link = self.link(prev, level);
            link.width += 1;
            self.set_link(prev, level, link);
        }

        if target_height > self.height {
            self.height = target_height;
        }
        self.len += 1;
        None
    }

    /// Remove a key, returning its value
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let mut update = [HEAD; MAX_HEIGHT];
        let mut at = HEAD;
        for level in (0..self.height).rev() {
            loop {
                let link = self.link(at, level);
                if link.next == NIL || self.node(link.next).key >= *key {
                    break;
                }
                at = link.next;
            }
            update[level] = at;
        }

        let target = self.link(update[0], 0).next;
        if target == NIL || self.node(target).key != *key {
            return None;
        }

        let target_height = self.node(target).links.len();
        for level in 0..target_height {
            let prev = update[level];
            let target_link = self.node(target).links[level];
            let mut link = self.link(prev, level);
            link.width += target_link.width - 1;
            link.next = target_link.next;
            self.set_link(prev, level, link);
        }
        for level in target_height..MAX_HEIGHT {
            let prev = update[level];
            let mut link = self.link(prev, level);
            link.width -= 1;
            self.set_link(prev, level, link);
        }

        while self.height > 1 && self.head[self.height - 1].next == NIL {
            self.height -= 1;
        }

        self.len -= 1;
        let node = self.nodes[target].take().expect("deleted node was live");
        self.free.push(target);
        Some(node.value)
    }

    /// Look up a value by key
    pub fn get(&self, key: &K) -> Option<&V> {
        let index = self.find(key)?;
        Some(&self.node(index).value)
    }

    /// Mutable lookup by key
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let index = self.find(key)?;
        Some(&mut self.node_mut(index).value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Look up the `index`-th entry in key order (0-based)
    pub fn get_by_index(&self, index: usize) -> Option<(&K, &V)> {
        if index >= self.len {
            return None;
        }
        let mut remaining = index + 1;
        let mut at = HEAD;
        for level in (0..self.height).rev() {
            loop {
                let link = self.link(at, level);
                if link.next == NIL || link.width > remaining {
                    break;
                }
                remaining -= link.width;
                at = link.next;
            }
            if remaining == 0 {
                break;
            }
        }
        let node = self.node(at);
        Some((&node.key, &node.value))
    }

    /// In-order iteration over the base level
    pub fn iter(&self) -> Iter<'_, K, V, R> {
        Iter {
            list: self,
            at: self.head[0].next,
        }
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.head = [EMPTY_LINK; MAX_HEIGHT];
        self.height = 1;
        self.len = 0;
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn find(&self, key: &K) -> Option<usize> {
        let mut at = HEAD;
        for level in (0..self.height).rev() {
            loop {
                let link = self.link(at, level);
                if link.next == NIL || self.node(link.next).key >= *key {
                    break;
                }
                at = link.next;
            }
        }
        let candidate = self.link(at, 0).next;
        if candidate != NIL && self.node(candidate).key == *key {
            Some(candidate)
        } else {
            None
        }
    }

    /// Fair-coin tower height, capped at one above the current height
    fn random_height(&mut self) -> usize {
        let cap = (self.height + 1).min(MAX_HEIGHT);
        let mut height = 1;
        while height < cap && self.rng.gen::<bool>() {
            height += 1;
        }
        height
    }

    fn alloc(&mut self, key: K, value: V, height: usize) -> usize {
        let node = Node {
            key,
            value,
            links: vec![EMPTY_LINK; height],
        };
        match self.free.pop() {
            Some(index) => {
                self.nodes[index] = Some(node);
                index
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        }
    }

    fn node(&self, index: usize) -> &Node<K, V> {
        self.nodes[index].as_ref().expect("stale skip list index")
    }

    fn node_mut(&mut self, index: usize) -> &mut Node<K, V> {
        self.nodes[index].as_mut().expect("stale skip list index")
    }

    fn link(&self, at: usize, level: usize) -> Link {
        if at == HEAD {
            self.head[level]
        } else {
            self.node(at).links[level]
        }
    }

    fn set_link(&mut self, at: usize, level: usize, link: Link) {
        if at == HEAD {
            self.head[level] = link;
        } else {
            self.node_mut(at).links[level] = link;
        }
    }
}

/// Base-level iterator in key order
pub struct Iter<'a, K, V, R> {
    list: &'a IndexableSkipList<K, V, R>,
    at: usize,
}

impl<'a, K: Ord, V, R: Rng> Iterator for Iter<'a, K, V, R> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.at == NIL {
            return None;
        }
        let node = self.list.node(self.at);
        self.at = node.links[0].next;
        Some((&node.key, &node.value))
    }
}
