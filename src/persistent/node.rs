//! Array-based trie nodes shared by persistent sequences.
//!
//! A [`Node`] is either a branch holding up to [`BRANCHING_FACTOR`] children
//! or a leaf holding up to [`BRANCHING_FACTOR`] elements. Nodes reachable from
//! a published vector are never written to: the path-copy functions build new
//! nodes along one root-to-leaf route and share every other subtree, while the
//! `*_mut` functions write in place only where the reference count proves that
//! the caller is the sole owner.

use super::ReferenceCounter;

/// Branching factor (2^5 = 32)
pub(crate) const BRANCHING_FACTOR: usize = 32;

/// Bits of the index consumed per trie level
pub(crate) const BITS_PER_LEVEL: usize = 5;

/// Bit mask for extracting the slot within a node
pub(crate) const MASK: usize = BRANCHING_FACTOR - 1;

/// The child slots of a branch node.
pub(crate) type Children<T> = [Option<ReferenceCounter<Node<T>>>; BRANCHING_FACTOR];

/// Internal node of the radix trie.
pub(crate) enum Node<T> {
    /// Branch node; children are packed to the left
    Branch(ReferenceCounter<Children<T>>),
    /// Leaf node containing the elements themselves
    Leaf(ReferenceCounter<[T]>),
}

// Cloning a node only bumps reference counts, so no `T: Clone` bound.
impl<T> Clone for Node<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Branch(children) => Self::Branch(children.clone()),
            Self::Leaf(elements) => Self::Leaf(elements.clone()),
        }
    }
}

impl<T> Node<T> {
    /// Creates a branch node with every slot empty.
    pub(crate) fn empty_branch() -> Self {
        Self::Branch(ReferenceCounter::new(std::array::from_fn(|_| None)))
    }

    /// Creates a branch whose only child is `child`.
    fn single_child(child: Self) -> Self {
        let mut children: Children<T> = std::array::from_fn(|_| None);
        children[0] = Some(ReferenceCounter::new(child));
        Self::Branch(ReferenceCounter::new(children))
    }

    /// Creates a new root one level taller than `root`, with `root` as its
    /// first child and a fresh path to `tail` as its second.
    pub(crate) fn grow_root(root: ReferenceCounter<Self>, shift: usize, tail: Self) -> Self {
        let mut children: Children<T> = std::array::from_fn(|_| None);
        children[0] = Some(root);
        children[1] = Some(ReferenceCounter::new(Self::new_path(shift, tail)));
        Self::Branch(ReferenceCounter::new(children))
    }

    /// Wraps `node` in single-child branches until it sits `level` bits
    /// below the returned node.
    pub(crate) fn new_path(level: usize, node: Self) -> Self {
        if level == 0 {
            node
        } else {
            Self::single_child(Self::new_path(level - BITS_PER_LEVEL, node))
        }
    }

    /// Returns the leaf holding `index`, descending from a node at `shift`.
    ///
    /// Returns `None` when the path runs into an empty slot.
    pub(crate) fn leaf_for(&self, shift: usize, index: usize) -> Option<&ReferenceCounter<[T]>> {
        let mut node = self;
        let mut level = shift;

        while level > 0 {
            match node {
                Self::Branch(children) => {
                    node = children[(index >> level) & MASK].as_deref()?;
                    level -= BITS_PER_LEVEL;
                }
                Self::Leaf(_) => return None,
            }
        }

        match node {
            Self::Leaf(elements) => Some(elements),
            Self::Branch(_) => None,
        }
    }

    /// Grafts a full tail leaf at `tail_offset`, copying only the nodes on the
    /// path from this node down to the graft point.
    pub(crate) fn push_tail(&self, level: usize, tail_offset: usize, tail: Self) -> Self {
        let Self::Branch(children) = self else {
            debug_assert!(false, "push_tail reached a leaf above level 0");
            return tail;
        };

        let subindex = (tail_offset >> level) & MASK;
        let mut new_children: Children<T> = (**children).clone();

        let child = if level == BITS_PER_LEVEL {
            tail
        } else {
            match &children[subindex] {
                Some(existing) => existing.push_tail(level - BITS_PER_LEVEL, tail_offset, tail),
                None => Self::new_path(level - BITS_PER_LEVEL, tail),
            }
        };
        new_children[subindex] = Some(ReferenceCounter::new(child));

        Self::Branch(ReferenceCounter::new(new_children))
    }

    /// In-place variant of [`Node::push_tail`].
    ///
    /// Nodes still shared with another owner are copied before being written.
    pub(crate) fn push_tail_mut(
        node: &mut ReferenceCounter<Self>,
        level: usize,
        tail_offset: usize,
        tail: Self,
    ) {
        let Self::Branch(children) = ReferenceCounter::make_mut(node) else {
            debug_assert!(false, "push_tail_mut reached a leaf above level 0");
            return;
        };
        let children = ReferenceCounter::make_mut(children);
        let subindex = (tail_offset >> level) & MASK;

        if level == BITS_PER_LEVEL {
            children[subindex] = Some(ReferenceCounter::new(tail));
        } else if let Some(child) = children[subindex].as_mut() {
            Self::push_tail_mut(child, level - BITS_PER_LEVEL, tail_offset, tail);
        } else {
            children[subindex] = Some(ReferenceCounter::new(Self::new_path(
                level - BITS_PER_LEVEL,
                tail,
            )));
        }
    }
}

impl<T: Clone> Node<T> {
    /// Returns a copy of this node with the element at `index` replaced.
    ///
    /// Only the nodes on the path to `index` are copied; all siblings are
    /// shared with `self`.
    pub(crate) fn assoc(&self, level: usize, index: usize, element: T) -> Self {
        match self {
            Self::Branch(children) => {
                let subindex = (index >> level) & MASK;
                let mut new_children: Children<T> = (**children).clone();
                if let Some(child) = &children[subindex] {
                    new_children[subindex] = Some(ReferenceCounter::new(child.assoc(
                        level - BITS_PER_LEVEL,
                        index,
                        element,
                    )));
                }
                Self::Branch(ReferenceCounter::new(new_children))
            }
            Self::Leaf(elements) => {
                let mut new_elements = elements.to_vec();
                if let Some(slot) = new_elements.get_mut(index & MASK) {
                    *slot = element;
                }
                Self::Leaf(ReferenceCounter::from(new_elements))
            }
        }
    }

    /// In-place variant of [`Node::assoc`].
    pub(crate) fn assoc_mut(
        node: &mut ReferenceCounter<Self>,
        level: usize,
        index: usize,
        element: T,
    ) {
        match ReferenceCounter::make_mut(node) {
            Self::Branch(children) => {
                let children = ReferenceCounter::make_mut(children);
                if let Some(child) = children[(index >> level) & MASK].as_mut() {
                    Self::assoc_mut(child, level - BITS_PER_LEVEL, index, element);
                }
            }
            Self::Leaf(elements) => {
                if let Some(slots) = ReferenceCounter::get_mut(elements) {
                    if let Some(slot) = slots.get_mut(index & MASK) {
                        *slot = element;
                    }
                } else {
                    let mut new_elements = elements.to_vec();
                    if let Some(slot) = new_elements.get_mut(index & MASK) {
                        *slot = element;
                    }
                    *elements = ReferenceCounter::from(new_elements);
                }
            }
        }
    }
}
