//! The stack of open elements.
//!
//! A linear scan from the top is correct for every case the Standard
//! defines and is what this crate uses; a name-indexed lookup only pays for
//! itself on documents with thousands of open elements (deeply nested
//! tables), which isn't worth the added bookkeeping here.

use crate::interface::{ExpandedName, LocalName, Namespace};

/// The open-elements stack. Index 0 is the bottommost element (normally
/// `<html>`); the last element is the current node.
pub struct ElementStack<Handle> {
    items: Vec<Handle>,
}

impl<Handle> Default for ElementStack<Handle> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Handle> ElementStack<Handle> {
    pub fn new() -> Self {
        ElementStack { items: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn push(&mut self, handle: Handle) {
        self.items.push(handle);
    }

    pub fn pop(&mut self) -> Option<Handle> {
        self.items.pop()
    }

    pub fn top(&self) -> Option<&Handle> {
        self.items.last()
    }

    /// The element one below the current node, if any (used by the
    /// adoption agency algorithm and a few `InBody` rules that need to
    /// insert relative to it).
    pub fn below_top(&self) -> Option<&Handle> {
        if self.items.len() < 2 {
            None
        } else {
            self.items.get(self.items.len() - 2)
        }
    }

    /// Iterate from the current node down to the bottom of the stack.
    pub fn iter_from_top(&self) -> impl Iterator<Item = &Handle> {
        self.items.iter().rev()
    }

    pub fn truncate(&mut self, new_len: usize) {
        self.items.truncate(new_len);
    }

    pub fn remove_at(&mut self, index: usize) -> Handle {
        self.items.remove(index)
    }

    pub fn insert_at(&mut self, index: usize, handle: Handle) {
        self.items.insert(index, handle);
    }

    pub fn replace_at(&mut self, index: usize, handle: Handle) -> Handle {
        std::mem::replace(&mut self.items[index], handle)
    }

    /// "Has an element in the specific scope" per the Standard: scan from
    /// the top; if the target predicate matches, the answer is yes; if the
    /// node's name falls outside the scope set first, the answer is no.
    pub fn has_in_scope<T, S>(
        &self,
        name_of: impl Fn(&Handle) -> (Namespace, LocalName),
        is_target: T,
        in_scope: S,
    ) -> bool
    where
        T: Fn(ExpandedName) -> bool,
        S: Fn(ExpandedName) -> bool,
    {
        for h in self.items.iter().rev() {
            let (ns, local) = name_of(h);
            let en = ExpandedName { ns: &ns, local: &local };
            if is_target(en) {
                return true;
            }
            if !in_scope(en) {
                return false;
            }
        }
        false
    }

    /// Position (from the bottom, i.e. index into the stack) of the
    /// topmost element satisfying `pred`, if any.
    pub fn position_from_top<P>(&self, name_of: impl Fn(&Handle) -> (Namespace, LocalName), pred: P) -> Option<usize>
    where
        P: Fn(ExpandedName) -> bool,
    {
        for (i, h) in self.items.iter().enumerate().rev() {
            let (ns, local) = name_of(h);
            let en = ExpandedName { ns: &ns, local: &local };
            if pred(en) {
                return Some(i);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{local_name, ns};

    fn name_of(h: &u32) -> (Namespace, LocalName) {
        let local = match h {
            0 => local_name!("html"),
            1 => local_name!("body"),
            2 => local_name!("table"),
            _ => local_name!("td"),
        };
        (ns!(html), local)
    }

    #[test]
    fn scope_stops_at_table() {
        let mut stack: ElementStack<u32> = ElementStack::new();
        stack.push(0);
        stack.push(1);
        stack.push(2);
        stack.push(3);
        let found = stack.has_in_scope(
            name_of,
            |en| &*en.local == "body",
            crate::tree_builder::tag_sets::table_scope,
        );
        assert!(!found, "body is outside table scope once a table is open");
    }

    #[test]
    fn below_top_and_pop() {
        let mut stack: ElementStack<u32> = ElementStack::new();
        stack.push(0);
        stack.push(1);
        assert_eq!(stack.below_top(), Some(&0));
        assert_eq!(stack.pop(), Some(1));
        assert_eq!(stack.below_top(), None);
    }
}
