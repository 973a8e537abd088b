use crate::arena::{Arena, SENTINEL};
use crate::error::TreeError;

/// Which child edge a rotation or a fixup case is operating on. Takes the place of
/// the `LEFT`/`RIGHT` register aliases and `1 - dir` trick in the register-based
/// design this crate is grounded on; `opposite()` is the Rust-side equivalent of
/// that trick.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Dir {
    Left,
    Right,
}

impl Dir {
    #[inline(always)]
    fn opposite(self) -> Dir {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

/// An in-memory ordered associative container backed by a red-black tree.
///
/// Worst-case O(log n) insert, remove, and lookup; in-order iteration in O(n).
/// Single-writer, multi-reader: concurrent access across threads is the caller's
/// concern (wrap in `std::sync::RwLock` if needed), the same way the design this
/// crate is based on never takes a lock itself.
#[derive(Debug, Clone)]
pub struct RedBlackTree<K, V> {
    arena: Arena<K, V>,
    root: u32,
    sequence_number: u64,
}

impl<K: Ord, V> Default for RedBlackTree<K, V> {
    fn default() -> Self {
        RedBlackTree {
            arena: Arena::new(),
            root: SENTINEL,
            sequence_number: 0,
        }
    }
}

impl<K: Ord, V> RedBlackTree<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Monotonically increasing count of structural mutations (inserts that added a
    /// node, and removes). Exposed for diagnostics and property tests; it is not
    /// part of the red-black invariants.
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    #[inline(always)]
    fn get_dir(&self, node: u32, dir: Dir) -> u32 {
        match dir {
            Dir::Left => self.arena.get_left(node),
            Dir::Right => self.arena.get_right(node),
        }
    }

    #[inline(always)]
    fn set_dir(&mut self, node: u32, dir: Dir, child: u32) {
        match dir {
            Dir::Left => self.arena.set_left(node, child),
            Dir::Right => self.arena.set_right(node, child),
        }
    }

    #[inline(always)]
    fn child_dir(&self, parent: u32, child: u32) -> Dir {
        if self.arena.get_left(parent) == child {
            Dir::Left
        } else if self.arena.get_right(parent) == child {
            Dir::Right
        } else {
            panic!("nodes are not connected")
        }
    }

    #[inline(always)]
    fn connect(&mut self, parent: u32, child: u32, dir: Dir) {
        if parent != SENTINEL {
            self.set_dir(parent, dir, child);
        }
        self.arena.set_parent(child, parent);
    }

    /// Rotates `parent_index` down and its `dir.opposite()` child up, preserving
    /// in-order key order. `rotate_dir(x, Left)` is the classic `left_rotate(x)`;
    /// `rotate_dir(x, Right)` is `right_rotate(x)`.
    fn rotate_dir(&mut self, parent_index: u32, dir: Dir) -> Option<u32> {
        let grandparent_index = self.arena.get_parent(parent_index);
        let sibling_index = self.get_dir(parent_index, dir.opposite());
        if sibling_index == SENTINEL {
            return None;
        }
        let child_index = self.get_dir(sibling_index, dir);
        self.connect(sibling_index, parent_index, dir);
        self.connect(parent_index, child_index, dir.opposite());
        if grandparent_index != SENTINEL {
            let gdir = self.child_dir(grandparent_index, parent_index);
            self.connect(grandparent_index, sibling_index, gdir);
        } else {
            self.arena.set_parent(sibling_index, SENTINEL);
            self.root = sibling_index;
        }
        Some(sibling_index)
    }

    fn fix_insert(&mut self, mut node: u32) {
        while self.arena.is_red(self.arena.get_parent(node)) {
            let mut parent = self.arena.get_parent(node);
            let mut grandparent = self.arena.get_parent(parent);
            if grandparent == SENTINEL {
                debug_assert_eq!(parent, self.root);
                break;
            }
            let dir = self.child_dir(grandparent, parent);
            let uncle = self.get_dir(grandparent, dir.opposite());
            if self.arena.is_red(uncle) {
                self.arena.color_black(uncle);
                self.arena.color_black(parent);
                self.arena.color_red(grandparent);
                node = grandparent;
            } else {
                if self.child_dir(parent, node) == dir.opposite() {
                    self.rotate_dir(parent, dir);
                    node = parent;
                }
                parent = self.arena.get_parent(node);
                grandparent = self.arena.get_parent(parent);
                self.arena.color_black(parent);
                self.arena.color_red(grandparent);
                self.rotate_dir(grandparent, dir.opposite());
            }
        }
        self.arena.color_black(self.root);
    }

    /// Finds the existing node for `key`, or the attachment point (parent index,
    /// direction) where a new node would be linked in. `SENTINEL` as the parent
    /// index means the tree is empty and the new node would become the root.
    fn find_slot(&self, key: &K) -> Result<u32, (u32, Dir)> {
        let mut reference = self.root;
        if reference == SENTINEL {
            return Err((SENTINEL, Dir::Left));
        }
        loop {
            let ref_key = &self.arena.get(reference).key;
            let (target, dir) = match key.cmp(ref_key) {
                std::cmp::Ordering::Equal => return Ok(reference),
                std::cmp::Ordering::Less => (self.arena.get_left(reference), Dir::Left),
                std::cmp::Ordering::Greater => (self.arena.get_right(reference), Dir::Right),
            };
            if target == SENTINEL {
                return Err((reference, dir));
            }
            reference = target;
        }
    }

    fn attach(&mut self, parent: u32, dir: Dir, key: K, value: V) -> u32 {
        let node_index = self.arena.add_node(key, value);
        if parent == SENTINEL {
            self.root = node_index;
            self.arena.color_black(node_index);
        } else {
            self.arena.color_red(node_index);
            self.connect(parent, node_index, dir);
            if self.arena.get_parent(parent) != SENTINEL {
                self.fix_insert(node_index);
            }
        }
        self.sequence_number += 1;
        node_index
    }

    /// Inserts `key` with `value`. If `key` was already present, its value is
    /// replaced and the previous value is returned: the upsert convenience most
    /// callers of an ordered map expect. Use [`insert_strict`](Self::insert_strict)
    /// for "fail, don't overwrite" semantics.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.find_slot(&key) {
            Ok(existing) => Some(std::mem::replace(&mut self.arena.get_mut(existing).value, value)),
            Err((parent, dir)) => {
                self.attach(parent, dir, key, value);
                None
            }
        }
    }

    /// Inserts `key` with `value` only if `key` is not already present. On
    /// conflict, the tree is left unchanged and the rejected pair is returned
    /// inside the error.
    pub fn insert_strict(&mut self, key: K, value: V) -> Result<(), TreeError<K, V>> {
        match self.find_slot(&key) {
            Ok(_) => Err(TreeError::DuplicateKey { key, value }),
            Err((parent, dir)) => {
                self.attach(parent, dir, key, value);
                Ok(())
            }
        }
    }

    fn find_node(&self, key: &K) -> u32 {
        let mut reference = self.root;
        while reference != SENTINEL {
            let ref_key = &self.arena.get(reference).key;
            reference = match key.cmp(ref_key) {
                std::cmp::Ordering::Equal => return reference,
                std::cmp::Ordering::Less => self.arena.get_left(reference),
                std::cmp::Ordering::Greater => self.arena.get_right(reference),
            };
        }
        SENTINEL
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        match self.find_node(key) {
            SENTINEL => None,
            node => Some(&self.arena.get(node).value),
        }
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        match self.find_node(key) {
            SENTINEL => None,
            node => Some(&mut self.arena.get_mut(node).value),
        }
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find_node(key) != SENTINEL
    }

    /// Transplants `source` into `target`'s slot in the structure, not the arena.
    /// `target` is not freed here, only unlinked from its parent.
    fn transplant(&mut self, target: u32, source: u32) {
        let parent = self.arena.get_parent(target);
        if parent == SENTINEL {
            self.root = source;
            self.arena.set_parent(source, SENTINEL);
            return;
        }
        let dir = self.child_dir(parent, target);
        self.connect(parent, source, dir);
    }

    fn find_min_index(&self, index: u32) -> u32 {
        let mut node = index;
        while self.arena.get_left(node) != SENTINEL {
            node = self.arena.get_left(node);
        }
        node
    }

    fn find_max_index(&self, index: u32) -> u32 {
        let mut node = index;
        while self.arena.get_right(node) != SENTINEL {
            node = self.arena.get_right(node);
        }
        node
    }

    /// Runs delete-fixup starting at `node_index`. `sentinel_context` supplies the
    /// (parent, dir) of `node_index` for the first iteration when `node_index` is
    /// itself `SENTINEL`. The arena has no slot to store a transient parent link on,
    /// unlike the single shared sentinel *node* this design is grounded on, so that
    /// one iteration's worth of context is threaded through explicitly instead.
    fn fix_remove(&mut self, mut node_index: u32, mut sentinel_context: Option<(u32, Dir)>) {
        while node_index != self.root && self.arena.is_black(node_index) {
            let (parent, dir) = match sentinel_context.take() {
                Some(ctx) => ctx,
                None => {
                    let parent = self.arena.get_parent(node_index);
                    (parent, self.child_dir(parent, node_index))
                }
            };
            let mut sibling = self.get_dir(parent, dir.opposite());
            if self.arena.is_red(sibling) {
                self.arena.color_black(sibling);
                self.arena.color_red(parent);
                self.rotate_dir(parent, dir);
                sibling = self.get_dir(parent, dir.opposite());
            }
            let sibling_near = self.get_dir(sibling, dir);
            let sibling_far = self.get_dir(sibling, dir.opposite());
            if self.arena.is_black(sibling_near) && self.arena.is_black(sibling_far) {
                self.arena.color_red(sibling);
                node_index = parent;
            } else {
                if self.arena.is_black(self.get_dir(sibling, dir.opposite())) {
                    self.arena.color_black(self.get_dir(sibling, dir));
                    self.arena.color_red(sibling);
                    self.rotate_dir(sibling, dir.opposite());
                    sibling = self.get_dir(parent, dir.opposite());
                }
                if self.arena.is_red(parent) {
                    self.arena.color_red(sibling);
                } else {
                    self.arena.color_black(sibling);
                }
                self.arena.color_black(parent);
                self.arena.color_black(self.get_dir(sibling, dir.opposite()));
                self.rotate_dir(parent, dir);
                node_index = self.root;
            }
        }
        self.arena.color_black(node_index);
    }

    /// Removes `key`, returning its value. A missing key is a silent no-op,
    /// returning `None`, the same contract as the original's `delete`.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let z = self.find_node(key);
        if z == SENTINEL {
            return None;
        }
        let left = self.arena.get_left(z);
        let right = self.arena.get_right(z);
        let z_parent = self.arena.get_parent(z);
        let z_dir = if z_parent != SENTINEL {
            Some(self.child_dir(z_parent, z))
        } else {
            None
        };

        let y_original_black;
        let x;
        let mut sentinel_context = None;

        if left == SENTINEL {
            y_original_black = self.arena.is_black(z);
            x = right;
            self.transplant(z, right);
            if x == SENTINEL {
                sentinel_context = z_dir.map(|dir| (z_parent, dir));
            }
        } else if right == SENTINEL {
            y_original_black = self.arena.is_black(z);
            x = left;
            self.transplant(z, left);
            if x == SENTINEL {
                sentinel_context = z_dir.map(|dir| (z_parent, dir));
            }
        } else {
            let y = self.find_min_index(right);
            y_original_black = self.arena.is_black(y);
            x = self.arena.get_right(y);
            if self.arena.get_parent(y) == z {
                self.arena.set_parent(x, y);
                if x == SENTINEL {
                    sentinel_context = Some((y, Dir::Right));
                }
            } else {
                let y_parent = self.arena.get_parent(y);
                self.transplant(y, x);
                if x == SENTINEL {
                    sentinel_context = Some((y_parent, Dir::Left));
                }
                self.arena.set_right(y, right);
                self.arena.set_parent(right, y);
            }
            self.transplant(z, y);
            self.arena.set_left(y, left);
            self.arena.set_parent(left, y);
            if self.arena.is_black(z) {
                self.arena.color_black(y);
            } else {
                self.arena.color_red(y);
            }
        }

        let (_, value) = self.arena.remove_node(z);
        if y_original_black {
            self.fix_remove(x, sentinel_context);
        }
        self.sequence_number += 1;
        Some(value)
    }

    /// Drops every stored value and resets the tree to empty. Reusable afterward.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = SENTINEL;
    }

    pub fn get_min(&self) -> Option<(&K, &V)> {
        if self.root == SENTINEL {
            return None;
        }
        let node = self.arena.get(self.find_min_index(self.root));
        Some((&node.key, &node.value))
    }

    pub fn get_max(&self) -> Option<(&K, &V)> {
        if self.root == SENTINEL {
            return None;
        }
        let node = self.arena.get(self.find_max_index(self.root));
        Some((&node.key, &node.value))
    }

    /// In-order traversal, invoking `f` once per stored pair. `f` only ever
    /// observes shared references, so it cannot mutate the tree it is walking.
    pub fn walk<F: FnMut(&K, &V)>(&self, mut f: F) {
        for (k, v) in self.iter() {
            f(k, v);
        }
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            tree: self,
            stack: Vec::new(),
            rev_stack: Vec::new(),
            node: self.root,
            rev_node: self.root,
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let node = self.root;
        IterMut {
            tree: self,
            stack: Vec::new(),
            rev_stack: Vec::new(),
            node,
            rev_node: node,
        }
    }

    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> {
        self.iter().map(|(_, v)| v)
    }

    pub fn values_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut V> {
        self.iter_mut().map(|(_, v)| v)
    }

    /// Checks every red-black invariant from scratch. O(n); intended for tests
    /// and debug assertions, not hot-path use.
    pub fn is_valid(&self) -> bool {
        if self.arena.is_red(self.root) {
            return false;
        }
        let mut stack = vec![(self.root, 0u32)];
        let mut black_counts = vec![];
        while let Some((node, mut count)) = stack.pop() {
            if node == SENTINEL {
                black_counts.push(count);
                continue;
            }
            count += self.arena.is_black(node) as u32;
            let left = self.arena.get_left(node);
            let right = self.arena.get_right(node);
            if self.arena.is_red(node) && (self.arena.is_red(left) || self.arena.is_red(right)) {
                return false;
            }
            stack.push((left, count));
            stack.push((right, count));
        }
        black_counts.iter().all(|&c| c == black_counts[0])
    }
}

pub struct Iter<'a, K, V> {
    tree: &'a RedBlackTree<K, V>,
    stack: Vec<u32>,
    rev_stack: Vec<u32>,
    node: u32,
    rev_node: u32,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        while !self.stack.is_empty() || self.node != SENTINEL {
            if self.node != SENTINEL {
                self.stack.push(self.node);
                self.node = self.tree.arena.get_left(self.node);
            } else {
                let cur = self.stack.pop().unwrap();
                self.node = self.tree.arena.get_right(cur);
                let slot = self.tree.arena.get(cur);
                return Some((&slot.key, &slot.value));
            }
        }
        None
    }
}

impl<'a, K, V> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        while !self.rev_stack.is_empty() || self.rev_node != SENTINEL {
            if self.rev_node != SENTINEL {
                self.rev_stack.push(self.rev_node);
                self.rev_node = self.tree.arena.get_right(self.rev_node);
            } else {
                let cur = self.rev_stack.pop().unwrap();
                self.rev_node = self.tree.arena.get_left(cur);
                let slot = self.tree.arena.get(cur);
                return Some((&slot.key, &slot.value));
            }
        }
        None
    }
}

pub struct IterMut<'a, K, V> {
    tree: &'a mut RedBlackTree<K, V>,
    stack: Vec<u32>,
    rev_stack: Vec<u32>,
    node: u32,
    rev_node: u32,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        while !self.stack.is_empty() || self.node != SENTINEL {
            if self.node != SENTINEL {
                self.stack.push(self.node);
                self.node = self.tree.arena.get_left(self.node);
            } else {
                let cur = self.stack.pop().unwrap();
                self.node = self.tree.arena.get_right(cur);
                // SAFETY: in-order traversal visits each live index exactly once, and
                // nothing in a live iteration resizes or frees arena slots, so the two
                // references handed out across iterations never alias.
                // TODO: revisit once a safe disjoint-borrow pattern for arena indices exists.
                let slot = unsafe { &mut *self.tree.arena.get_mut_ptr(cur) };
                return Some((&slot.key, &mut slot.value));
            }
        }
        None
    }
}

impl<'a, K, V> DoubleEndedIterator for IterMut<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        while !self.rev_stack.is_empty() || self.rev_node != SENTINEL {
            if self.rev_node != SENTINEL {
                self.rev_stack.push(self.rev_node);
                self.rev_node = self.tree.arena.get_right(self.rev_node);
            } else {
                let cur = self.rev_stack.pop().unwrap();
                self.rev_node = self.tree.arena.get_left(cur);
                // SAFETY: see `next` above.
                let slot = unsafe { &mut *self.tree.arena.get_mut_ptr(cur) };
                return Some((&slot.key, &mut slot.value));
            }
        }
        None
    }
}

impl<'a, K, V> IntoIterator for &'a RedBlackTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V> IntoIterator for &'a mut RedBlackTree<K, V> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K: Ord, V> std::ops::Index<&K> for RedBlackTree<K, V> {
    type Output = V;

    fn index(&self, key: &K) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

impl<K: Ord, V> std::ops::IndexMut<&K> for RedBlackTree<K, V> {
    fn index_mut(&mut self, key: &K) -> &mut V {
        self.get_mut(key).expect("no entry found for key")
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for RedBlackTree<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut tree = Self::new();
        for (k, v) in iter {
            tree.insert(k, v);
        }
        tree
    }
}

impl<K: Ord, V> Extend<(K, V)> for RedBlackTree<K, V> {
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}
