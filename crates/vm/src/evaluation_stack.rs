//! Evaluation stack module for the virtual machine.
//!
//! Positions passed to [`EvaluationStack`] methods count from the top: `0`
//! is the most recently pushed item.

use crate::error::{VmError, VmResult};
use crate::stack_item::StackItem;

/// Represents the evaluation stack in the VM.
#[derive(Debug, Clone, Default)]
pub struct EvaluationStack {
    /// The underlying stack storage, bottom first
    stack: Vec<StackItem>,
}

impl EvaluationStack {
    /// Creates a new, empty evaluation stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes an item onto the stack.
    pub fn push(&mut self, item: StackItem) {
        self.stack.push(item);
    }

    /// Pops an item from the stack.
    pub fn pop(&mut self) -> VmResult<StackItem> {
        self.stack
            .pop()
            .ok_or_else(|| VmError::stack_underflow(1, 0))
    }

    /// Returns the item `n` positions below the top without removing it.
    pub fn peek(&self, n: usize) -> VmResult<&StackItem> {
        let index = self.index_from_top(n)?;
        Ok(&self.stack[index])
    }

    /// Replaces the item `n` positions below the top.
    pub fn set(&mut self, n: usize, item: StackItem) -> VmResult<()> {
        let index = self.index_from_top(n)?;
        self.stack[index] = item;
        Ok(())
    }

    /// Inserts an item so that it ends up `n` positions below the top.
    /// `n == len()` inserts at the bottom.
    pub fn insert(&mut self, n: usize, item: StackItem) -> VmResult<()> {
        if n > self.stack.len() {
            return Err(VmError::stack_underflow(n, self.stack.len()));
        }
        let index = self.stack.len() - n;
        self.stack.insert(index, item);
        Ok(())
    }

    /// Removes the item `n` positions below the top.
    pub fn remove(&mut self, n: usize) -> VmResult<StackItem> {
        let index = self.index_from_top(n)?;
        Ok(self.stack.remove(index))
    }

    /// Swaps the items `i` and `j` positions below the top.
    pub fn swap(&mut self, i: usize, j: usize) -> VmResult<()> {
        let a = self.index_from_top(i)?;
        let b = self.index_from_top(j)?;
        self.stack.swap(a, b);
        Ok(())
    }

    /// Removes the top `count` items and returns them bottom first.
    pub fn take_top(&mut self, count: usize) -> VmResult<Vec<StackItem>> {
        if count > self.stack.len() {
            return Err(VmError::stack_underflow(count, self.stack.len()));
        }
        let start = self.stack.len() - count;
        Ok(self.stack.split_off(start))
    }

    /// Pushes `items` in order, so the last item ends on top.
    pub fn extend(&mut self, items: impl IntoIterator<Item = StackItem>) {
        self.stack.extend(items);
    }

    /// Moves the top `count` items onto `target`, preserving their order.
    pub fn move_to(&mut self, target: &mut EvaluationStack, count: usize) -> VmResult<()> {
        let items = self.take_top(count)?;
        target.extend(items);
        Ok(())
    }

    /// Copies every item onto `target`, preserving order.
    pub fn copy_to(&self, target: &mut EvaluationStack) {
        target.stack.extend(self.stack.iter().cloned());
    }

    /// Returns the number of items on the stack.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Returns true if the stack is empty.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Clears the stack.
    pub fn clear(&mut self) {
        self.stack.clear();
    }

    /// Iterates from the bottom of the stack to the top.
    pub fn iter(&self) -> std::slice::Iter<'_, StackItem> {
        self.stack.iter()
    }

    fn index_from_top(&self, n: usize) -> VmResult<usize> {
        if n >= self.stack.len() {
            return Err(VmError::stack_underflow(n + 1, self.stack.len()));
        }
        Ok(self.stack.len() - 1 - n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack_of(values: &[i64]) -> EvaluationStack {
        let mut stack = EvaluationStack::new();
        for v in values {
            stack.push(StackItem::from_int(*v));
        }
        stack
    }

    #[test]
    fn test_push_pop() {
        let mut stack = stack_of(&[1, 2, 3]);
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.pop().unwrap(), StackItem::from_int(3));
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_pop_empty_underflows() {
        let mut stack = EvaluationStack::new();
        assert_eq!(stack.pop(), Err(VmError::stack_underflow(1, 0)));
        assert!(stack.peek(0).is_err());
    }

    #[test]
    fn test_peek() {
        let stack = stack_of(&[1, 2, 3]);
        assert_eq!(stack.peek(0).unwrap(), &StackItem::from_int(3));
        assert_eq!(stack.peek(2).unwrap(), &StackItem::from_int(1));
        assert_eq!(stack.peek(3), Err(VmError::stack_underflow(4, 3)));
    }

    #[test]
    fn test_insert_remove() {
        let mut stack = stack_of(&[1, 3]);
        stack.insert(1, StackItem::from_int(2)).unwrap();
        assert_eq!(stack.peek(1).unwrap(), &StackItem::from_int(2));

        stack.insert(3, StackItem::from_int(0)).unwrap();
        assert_eq!(stack.peek(3).unwrap(), &StackItem::from_int(0));

        assert_eq!(stack.remove(2).unwrap(), StackItem::from_int(1));
        assert!(stack.insert(9, StackItem::from_int(9)).is_err());
    }

    #[test]
    fn test_move_to_preserves_order() {
        let mut source = stack_of(&[1, 2, 3]);
        let mut target = stack_of(&[9]);
        source.move_to(&mut target, 2).unwrap();

        assert_eq!(source.len(), 1);
        let items: Vec<_> = target.iter().cloned().collect();
        assert_eq!(
            items,
            vec![
                StackItem::from_int(9),
                StackItem::from_int(2),
                StackItem::from_int(3)
            ]
        );
        assert!(source.move_to(&mut target, 2).is_err());
    }

    #[test]
    fn test_swap_and_set() {
        let mut stack = stack_of(&[1, 2, 3]);
        stack.swap(0, 2).unwrap();
        assert_eq!(stack.peek(0).unwrap(), &StackItem::from_int(1));
        stack.set(1, StackItem::from_int(7)).unwrap();
        assert_eq!(stack.peek(1).unwrap(), &StackItem::from_int(7));
    }
}
