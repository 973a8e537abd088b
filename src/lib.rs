//! An in-memory ordered associative container backed by a red-black tree: a
//! self-balancing binary search tree in which every root-to-leaf path carries the
//! same number of black nodes and no red node has a red child. Insert, remove, and
//! lookup are all worst-case `O(log n)`; in-order iteration is `O(n)`.
//!
//! ```
//! use rbtree::RedBlackTree;
//!
//! let mut tree = RedBlackTree::new();
//! tree.insert(10, "ten");
//! tree.insert(20, "twenty");
//! tree.insert(5, "five");
//!
//! assert_eq!(tree.get(&10), Some(&"ten"));
//! assert_eq!(tree.remove(&20), Some("twenty"));
//! assert_eq!(tree.keys().copied().collect::<Vec<_>>(), vec![5, 10]);
//! ```
//!
//! Single-writer, multi-reader: the tree performs no locking of its own. A host
//! that needs concurrent writers wraps the whole tree in `std::sync::RwLock` or
//! `Mutex`, the same way a caller would wrap any other non-`Sync`-by-design map.

mod arena;
mod error;
mod tree;

pub use arena::SENTINEL;
pub use error::TreeError;
pub use tree::{Iter, IterMut, RedBlackTree};
