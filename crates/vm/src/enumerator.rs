//! Lazy traversal of collection items.
//!
//! Every enumerator starts positioned before its first element: call
//! [`StackItemEnumerator::move_next`] before reading [`current`]. Once
//! `move_next` returns false the enumerator stays exhausted until
//! [`reset`] is called.
//!
//! Enumerators read the live collection and do not snapshot it. Mutating a
//! collection while an enumerator over it is open leaves the visibility of
//! not-yet-visited elements unspecified; scripts that do so get whatever the
//! collection holds when they arrive there.
//!
//! [`current`]: StackItemEnumerator::current
//! [`reset`]: StackItemEnumerator::reset

use crate::error::{VmError, VmResult};
use crate::stack_item::{Array, InteropInterface, Map, StackItem};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A restartable sequence of stack items.
pub trait StackItemEnumerator: fmt::Debug + Send {
    /// Advances to the next element; false once the sequence is exhausted.
    fn move_next(&mut self) -> bool;

    /// The element at the current position, `None` before the first
    /// `move_next` or after exhaustion.
    fn current(&self) -> Option<StackItem>;

    /// Repositions before the first element.
    fn reset(&mut self);

    /// The key of the current element for keyed sequences (the index for
    /// arrays, the entry key for maps).
    fn key(&self) -> Option<StackItem> {
        None
    }
}

/// Position shared by the collection enumerators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    Start,
    At(usize),
    End,
}

impl Cursor {
    fn advance(&mut self, len: usize) -> bool {
        let next = match *self {
            Cursor::Start => 0,
            Cursor::At(index) => index + 1,
            Cursor::End => return false,
        };
        if next < len {
            *self = Cursor::At(next);
            true
        } else {
            *self = Cursor::End;
            false
        }
    }

    fn index(&self) -> Option<usize> {
        match self {
            Cursor::At(index) => Some(*index),
            _ => None,
        }
    }
}

/// Elements of an Array or Struct in order; keyed by index.
#[derive(Debug)]
pub struct ArrayEnumerator {
    array: Array,
    cursor: Cursor,
}

impl ArrayEnumerator {
    pub fn new(array: Array) -> Self {
        Self {
            array,
            cursor: Cursor::Start,
        }
    }
}

impl StackItemEnumerator for ArrayEnumerator {
    fn move_next(&mut self) -> bool {
        self.cursor.advance(self.array.len())
    }

    fn current(&self) -> Option<StackItem> {
        self.cursor.index().and_then(|i| self.array.get(i))
    }

    fn reset(&mut self) {
        self.cursor = Cursor::Start;
    }

    fn key(&self) -> Option<StackItem> {
        self.cursor.index().map(|i| StackItem::from_int(i as i64))
    }
}

/// Entries of a Map in insertion order: `current` is the value, `key` the key.
#[derive(Debug)]
pub struct MapEnumerator {
    map: Map,
    cursor: Cursor,
}

impl MapEnumerator {
    pub fn new(map: Map) -> Self {
        Self {
            map,
            cursor: Cursor::Start,
        }
    }
}

impl StackItemEnumerator for MapEnumerator {
    fn move_next(&mut self) -> bool {
        self.cursor.advance(self.map.len())
    }

    fn current(&self) -> Option<StackItem> {
        self.cursor
            .index()
            .and_then(|i| self.map.get_index(i))
            .map(|(_, value)| value)
    }

    fn reset(&mut self) {
        self.cursor = Cursor::Start;
    }

    fn key(&self) -> Option<StackItem> {
        self.cursor
            .index()
            .and_then(|i| self.map.get_index(i))
            .map(|(key, _)| key)
    }
}

/// Several sequences read one after another.
#[derive(Debug)]
pub struct ConcatEnumerator {
    sources: Vec<Box<dyn StackItemEnumerator>>,
    index: usize,
}

impl ConcatEnumerator {
    pub fn new(sources: Vec<Box<dyn StackItemEnumerator>>) -> Self {
        Self { sources, index: 0 }
    }
}

impl StackItemEnumerator for ConcatEnumerator {
    fn move_next(&mut self) -> bool {
        while let Some(source) = self.sources.get_mut(self.index) {
            if source.move_next() {
                return true;
            }
            self.index += 1;
        }
        false
    }

    fn current(&self) -> Option<StackItem> {
        self.sources.get(self.index).and_then(|s| s.current())
    }

    fn reset(&mut self) {
        for source in &mut self.sources {
            source.reset();
        }
        self.index = 0;
    }

    fn key(&self) -> Option<StackItem> {
        self.sources.get(self.index).and_then(|s| s.key())
    }
}

/// Reads each element of a source through a transform, without copying the
/// source collection.
///
/// The transform sees the source positioned on the element, so it can
/// select the key, the value or anything derived from them.
pub struct ProjectionEnumerator<F> {
    source: Box<dyn StackItemEnumerator>,
    transform: F,
}

/// A projection given as a plain function, as used by the key and value
/// views.
pub type EntryProjection = fn(&dyn StackItemEnumerator) -> Option<StackItem>;

impl<F> ProjectionEnumerator<F>
where
    F: Fn(&dyn StackItemEnumerator) -> Option<StackItem> + Send,
{
    pub fn new(source: Box<dyn StackItemEnumerator>, transform: F) -> Self {
        Self { source, transform }
    }
}

impl ProjectionEnumerator<EntryProjection> {
    /// The keys of a keyed sequence, as a plain sequence.
    pub fn keys(source: Box<dyn StackItemEnumerator>) -> Self {
        Self::new(source, |entry| entry.key())
    }

    /// The values of a keyed sequence, as a plain sequence.
    pub fn values(source: Box<dyn StackItemEnumerator>) -> Self {
        Self::new(source, |entry| entry.current())
    }
}

impl<F> fmt::Debug for ProjectionEnumerator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectionEnumerator")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl<F> StackItemEnumerator for ProjectionEnumerator<F>
where
    F: Fn(&dyn StackItemEnumerator) -> Option<StackItem> + Send,
{
    fn move_next(&mut self) -> bool {
        self.source.move_next()
    }

    fn current(&self) -> Option<StackItem> {
        (self.transform)(self.source.as_ref())
    }

    fn reset(&mut self) {
        self.source.reset();
    }

    fn key(&self) -> Option<StackItem> {
        self.source.key()
    }
}

/// Opens a keyed enumerator over an Array, Struct or Map.
pub fn enumerate(item: &StackItem) -> VmResult<Box<dyn StackItemEnumerator>> {
    match item {
        StackItem::Map(map) => Ok(Box::new(MapEnumerator::new(map.clone()))),
        other => match other.as_array() {
            Some(array) => Ok(Box::new(ArrayEnumerator::new(array.clone()))),
            None => Err(VmError::type_mismatch("collection", other.item_type())),
        },
    }
}

/// An enumerator carried on the stack as an interop object.
#[derive(Debug)]
pub struct EnumeratorObject {
    kind: EnumeratorKind,
    inner: Mutex<Box<dyn StackItemEnumerator>>,
}

/// Whether scripts may ask an [`EnumeratorObject`] for keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumeratorKind {
    Enumerator,
    Iterator,
}

impl EnumeratorObject {
    pub fn new(kind: EnumeratorKind, inner: Box<dyn StackItemEnumerator>) -> Self {
        Self {
            kind,
            inner: Mutex::new(inner),
        }
    }

    pub fn kind(&self) -> EnumeratorKind {
        self.kind
    }

    pub fn move_next(&self) -> bool {
        self.inner.lock().move_next()
    }

    pub fn current(&self) -> Option<StackItem> {
        self.inner.lock().current()
    }

    pub fn key(&self) -> Option<StackItem> {
        self.inner.lock().key()
    }

    pub fn reset(&self) {
        self.inner.lock().reset();
    }
}

impl InteropInterface for EnumeratorObject {
    fn interface_type(&self) -> &str {
        match self.kind {
            EnumeratorKind::Enumerator => "Enumerator",
            EnumeratorKind::Iterator => "Iterator",
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An enumerator held on the stack, read as the source of another
/// enumerator. Both handles share one position.
#[derive(Debug, Clone)]
pub struct SharedEnumerator {
    object: Arc<dyn InteropInterface>,
}

impl SharedEnumerator {
    /// Wraps a stack item holding an [`EnumeratorObject`].
    pub fn from_item(item: &StackItem) -> VmResult<Self> {
        match item {
            StackItem::InteropInterface(object) if object.as_any().is::<EnumeratorObject>() => {
                Ok(Self {
                    object: object.clone(),
                })
            }
            other => Err(VmError::type_mismatch("Enumerator", other.item_type())),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&EnumeratorObject) -> R) -> Option<R> {
        self.object
            .as_any()
            .downcast_ref::<EnumeratorObject>()
            .map(f)
    }
}

impl StackItemEnumerator for SharedEnumerator {
    fn move_next(&mut self) -> bool {
        self.with(|e| e.move_next()).unwrap_or(false)
    }

    fn current(&self) -> Option<StackItem> {
        self.with(|e| e.current()).flatten()
    }

    fn reset(&mut self) {
        self.with(|e| e.reset());
    }

    fn key(&self) -> Option<StackItem> {
        self.with(|e| e.key()).flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<StackItem> {
        values.iter().map(|v| StackItem::from_int(*v)).collect()
    }

    fn drain(e: &mut dyn StackItemEnumerator) -> Vec<StackItem> {
        let mut out = Vec::new();
        while e.move_next() {
            out.push(e.current().unwrap());
        }
        out
    }

    #[test]
    fn test_array_enumerator_exhausts_and_resets() {
        let mut e = ArrayEnumerator::new(Array::new(ints(&[1, 2])));
        assert_eq!(e.current(), None);
        assert_eq!(drain(&mut e), ints(&[1, 2]));
        assert!(!e.move_next());
        assert_eq!(e.current(), None);

        e.reset();
        assert!(e.move_next());
        assert_eq!(e.key(), Some(StackItem::from_int(0)));
        assert_eq!(e.current(), Some(StackItem::from_int(1)));
    }

    #[test]
    fn test_map_views_follow_insertion_order() {
        let map = Map::new();
        for (k, v) in [(5, 50), (1, 10), (3, 30)] {
            map.insert(StackItem::from_int(k), StackItem::from_int(v))
                .unwrap();
        }
        let entries =
            || -> Box<dyn StackItemEnumerator> { Box::new(MapEnumerator::new(map.clone())) };
        assert_eq!(
            drain(&mut ProjectionEnumerator::keys(entries())),
            ints(&[5, 1, 3])
        );
        assert_eq!(
            drain(&mut ProjectionEnumerator::values(entries())),
            ints(&[50, 10, 30])
        );

        let mut entries = MapEnumerator::new(map);
        assert!(entries.move_next());
        assert_eq!(entries.key(), Some(StackItem::from_int(5)));
        assert_eq!(entries.current(), Some(StackItem::from_int(50)));
    }

    #[test]
    fn test_concat_advances_only_after_exhaustion() {
        let mut e = ConcatEnumerator::new(vec![
            Box::new(ArrayEnumerator::new(Array::new(ints(&[1])))),
            Box::new(ArrayEnumerator::new(Array::new(Vec::new()))),
            Box::new(ArrayEnumerator::new(Array::new(ints(&[2, 3])))),
        ]);
        assert_eq!(drain(&mut e), ints(&[1, 2, 3]));
        e.reset();
        assert_eq!(drain(&mut e), ints(&[1, 2, 3]));
    }

    #[test]
    fn test_projection_does_not_copy_source() {
        let array = Array::new(ints(&[1, 2]));
        let mut e = ProjectionEnumerator::new(
            Box::new(ArrayEnumerator::new(array.clone())),
            |entry: &dyn StackItemEnumerator| {
                entry.current().map(|item| StackItem::from_bool(item.as_bool()))
            },
        );
        array.set(1, StackItem::from_int(0)).unwrap();
        let out = drain(&mut e);
        assert_eq!(out, vec![StackItem::from_bool(true), StackItem::from_bool(false)]);
    }

    #[test]
    fn test_enumerate_rejects_primitives() {
        assert!(enumerate(&StackItem::from_int(1)).is_err());
        assert!(enumerate(&StackItem::new_struct(Vec::new())).is_ok());
    }

    #[test]
    fn test_shared_enumerator_shares_position() {
        let item = StackItem::from_interface(EnumeratorObject::new(
            EnumeratorKind::Iterator,
            Box::new(ArrayEnumerator::new(Array::new(ints(&[7, 8])))),
        ));
        let mut shared = SharedEnumerator::from_item(&item).unwrap();
        assert!(shared.move_next());

        let object = item.as_interface::<EnumeratorObject>().unwrap();
        assert_eq!(object.current(), Some(StackItem::from_int(7)));
        assert_eq!(object.interface_type(), "Iterator");
        assert!(SharedEnumerator::from_item(&StackItem::from_int(1)).is_err());
    }
}
