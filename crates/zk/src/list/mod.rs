//! Hash-committed lists.
//!
//! A [`HashCommittedList`] represents an arbitrarily long sequence by a single
//! rolling commitment:
//!
//! ```text
//! hash(e_0 .. e_{n-1}) = H(H(H(EMPTY, e_0), e_1) ..., e_{n-1})
//! ```
//!
//! The commitment is the only verified state. Next to it the list keeps
//! *shadow* data, the `(previous_hash, element)` pair recorded by every push,
//! which lets whoever builds the computation re-derive the witnesses that
//! later pops and cursor steps are checked against. Shadow data is never part
//! of the commitment and is never trusted unchecked.
//!
//! The list is a stack: pops remove the newest element. Iteration goes
//! through a [`ListCursor`], which reads newest-first as well and can walk
//! back towards the newest element in push order.
//!
//! # Element codecs
//!
//! How an element is folded into the commitment is decided by a [`ListCodec`].
//! Different structural roles use different codecs (and prefixes), so their
//! commitments never collide. [`ListOf`] is the default codec for any
//! [`FieldCodec`] element.

mod cursor;

pub use cursor::{ListCursor, Step};

use std::fmt;
use std::marker::PhantomData;

use crate::codec::FieldCodec;
use crate::commitment::{Fp254, hash_with_prefix, short_hex, zero};
use crate::error::{Result, assert_equal, select};

/// Domain prefix of [`ListOf`] pushes.
pub const LIST_PUSH_PREFIX: &str = "HashList**";

/// Structural codec for one kind of hash-committed list.
pub trait ListCodec {
    type Element: Clone + fmt::Debug;

    /// Commitment of the empty list.
    fn empty_hash() -> Fp254;

    /// Dummy element returned when reading past the real data.
    fn empty_element() -> Self::Element;

    /// Fold one element into the commitment.
    fn next_hash(previous: Fp254, element: &Self::Element) -> Fp254;
}

/// Default codec: `EMPTY_HASH = 0`, `H = hash_with_prefix("HashList**", [prev, fields(e)..])`.
pub struct ListOf<T>(PhantomData<T>);

impl<T: FieldCodec> ListCodec for ListOf<T> {
    type Element = T;

    fn empty_hash() -> Fp254 {
        zero()
    }

    fn empty_element() -> T {
        T::empty()
    }

    fn next_hash(previous: Fp254, element: &T) -> Fp254 {
        let mut inputs = vec![previous];
        inputs.extend(element.to_fields());
        hash_with_prefix(LIST_PUSH_PREFIX, &inputs)
    }
}

/// A list of plain [`FieldCodec`] elements under the default codec.
pub type FieldList<T> = HashCommittedList<ListOf<T>>;

/// One shadow entry: the commitment before the push and the pushed element.
///
/// A list keeps these oldest-first, so a sequence read newest-first must be
/// reversed before it is handed to [`HashCommittedList::from_parts`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListWitness<T> {
    pub previous_hash: Fp254,
    pub element: T,
}

impl<T> ListWitness<T> {
    pub fn new(previous_hash: Fp254, element: T) -> Self {
        Self {
            previous_hash,
            element,
        }
    }
}

/// Dynamic sequence represented by one rolling commitment plus shadow data.
///
/// The shadow is stored oldest-first so that push and pop work on the back
/// of the `Vec`. Reads go the other way: pops and [`ListCursor::next`] consume
/// it from the back, newest-first.
pub struct HashCommittedList<C: ListCodec> {
    hash: Fp254,
    shadow: Vec<ListWitness<C::Element>>,
}

impl<C: ListCodec> Clone for HashCommittedList<C> {
    fn clone(&self) -> Self {
        Self {
            hash: self.hash,
            shadow: self.shadow.clone(),
        }
    }
}

impl<C: ListCodec> fmt::Debug for HashCommittedList<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashCommittedList")
            .field("hash", &short_hex(&self.hash))
            .field("len", &self.shadow.len())
            .finish()
    }
}

impl<C: ListCodec> Default for HashCommittedList<C> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<C: ListCodec> HashCommittedList<C> {
    pub fn empty() -> Self {
        Self {
            hash: C::empty_hash(),
            shadow: Vec::new(),
        }
    }

    /// Build a list by pushing `elements` in order.
    pub fn from_elements(elements: impl IntoIterator<Item = C::Element>) -> Self {
        let mut list = Self::empty();
        for element in elements {
            list.push(element);
        }
        list
    }

    /// Assemble a list from a commitment and witnesses supplied by the caller.
    ///
    /// `shadow` is ordered oldest-first, the reverse of the order in which
    /// pops and `next()` read it. Nothing is checked here; every later pop or
    /// cursor step checks the witness it consumes.
    pub fn from_parts(hash: Fp254, shadow: Vec<ListWitness<C::Element>>) -> Self {
        Self { hash, shadow }
    }

    /// A list known only by its commitment.
    pub fn from_hash(hash: Fp254) -> Self {
        Self::from_parts(hash, Vec::new())
    }

    pub fn hash(&self) -> Fp254 {
        self.hash
    }

    /// Shadow entries, oldest-first.
    pub fn shadow(&self) -> &[ListWitness<C::Element>] {
        &self.shadow
    }

    pub fn is_empty(&self) -> bool {
        self.hash == C::empty_hash()
    }

    /// Number of shadow entries. Not backed by the commitment.
    pub fn len_unconstrained(&self) -> usize {
        self.shadow.len()
    }

    /// Elements in push order. Not backed by the commitment.
    pub fn to_vec_unconstrained(&self) -> Vec<C::Element> {
        self.shadow.iter().map(|w| w.element.clone()).collect()
    }

    pub fn assert_equals(&self, expected: Fp254) -> Result<()> {
        assert_equal(self.hash, expected, "list commitment mismatch")
    }

    pub fn push(&mut self, element: C::Element) {
        let previous_hash = self.hash;
        self.hash = C::next_hash(previous_hash, &element);
        self.shadow.push(ListWitness::new(previous_hash, element));
    }

    pub fn push_if(&mut self, condition: bool, element: C::Element) {
        if condition {
            self.push(element);
        }
    }

    fn empty_witness() -> ListWitness<C::Element> {
        ListWitness::new(C::empty_hash(), C::empty_element())
    }

    fn top_witness(&self) -> ListWitness<C::Element> {
        self.shadow
            .last()
            .cloned()
            .unwrap_or_else(Self::empty_witness)
    }

    /// Pop the newest element; fails on an empty or inconsistent list.
    pub fn pop_exn(&mut self) -> Result<C::Element> {
        let witness = self.top_witness();
        assert_equal(
            C::next_hash(witness.previous_hash, &witness.element),
            self.hash,
            "popped element does not match the list commitment",
        )?;
        self.shadow.pop();
        self.hash = witness.previous_hash;
        Ok(witness.element)
    }

    /// Pop the newest element, or return the dummy element if the list is empty.
    pub fn pop(&mut self) -> Result<C::Element> {
        let is_empty = self.is_empty();
        let witness = if is_empty {
            Self::empty_witness()
        } else {
            self.top_witness()
        };

        let required = select(
            is_empty,
            C::empty_hash(),
            C::next_hash(witness.previous_hash, &witness.element),
        );
        assert_equal(
            self.hash,
            required,
            "popped element does not match the list commitment",
        )?;

        if !is_empty {
            self.shadow.pop();
        }
        self.hash = select(is_empty, C::empty_hash(), witness.previous_hash);
        Ok(select(is_empty, C::empty_element(), witness.element))
    }

    /// Like [`pop`](Self::pop), with the presence flag made explicit.
    pub fn pop_option(&mut self) -> Result<Option<C::Element>> {
        let is_some = !self.is_empty();
        let element = self.pop()?;
        Ok(is_some.then_some(element))
    }

    /// Pop only if `condition` holds. Popping an empty list yields the dummy element.
    pub fn pop_if(&mut self, condition: bool) -> Result<C::Element> {
        let active = condition && !self.is_empty();
        let witness = if active {
            self.top_witness()
        } else {
            ListWitness::new(self.hash, C::empty_element())
        };

        let required = select(
            active,
            C::next_hash(witness.previous_hash, &witness.element),
            self.hash,
        );
        assert_equal(
            self.hash,
            required,
            "popped element does not match the list commitment",
        )?;

        if active {
            self.shadow.pop();
        }
        self.hash = witness.previous_hash;
        Ok(select(active, witness.element, C::empty_element()))
    }

    /// Pop iff `should_pop`, trusting the caller to know whether the list is non-empty.
    ///
    /// `should_pop = true` on an empty list fails; `false` is always a no-op.
    pub fn pop_if_unsafe(&mut self, should_pop: bool) -> Result<C::Element> {
        let witness = if should_pop {
            self.top_witness()
        } else {
            ListWitness::new(self.hash, C::empty_element())
        };

        let required = select(
            should_pop,
            C::next_hash(witness.previous_hash, &witness.element),
            self.hash,
        );
        assert_equal(
            self.hash,
            required,
            "popped element does not match the list commitment",
        )?;

        if should_pop {
            self.shadow.pop();
        }
        self.hash = witness.previous_hash;
        Ok(witness.element)
    }

    /// Cursor positioned at the start (`hash`); `next()` walks newest-first.
    pub fn start_iterating(&self) -> ListCursor<C> {
        ListCursor::at_start(self.hash, self.shadow.clone())
    }

    /// Cursor positioned at the end (`EMPTY_HASH`); `previous()` walks in push order.
    pub fn start_iterating_from_last(&self) -> ListCursor<C> {
        ListCursor::at_end(self.hash, self.shadow.clone())
    }

    /// Visit exactly `bound` slots newest-first, then assert the end was reached.
    ///
    /// `f(element, is_dummy, index)` is called `bound` times; slots past the
    /// real end carry the dummy element with `is_dummy = true`. Fails if the
    /// list holds more than `bound` elements.
    pub fn for_each<F>(&self, bound: usize, mut f: F) -> Result<()>
    where
        F: FnMut(C::Element, bool, usize),
    {
        self.try_for_each(bound, |element, is_dummy, index| {
            f(element, is_dummy, index);
            Ok(())
        })
    }

    /// Fallible variant of [`for_each`](Self::for_each).
    pub fn try_for_each<E, F>(&self, bound: usize, mut f: F) -> std::result::Result<(), E>
    where
        E: From<crate::error::ConstraintError>,
        F: FnMut(C::Element, bool, usize) -> std::result::Result<(), E>,
    {
        let mut cursor = self.start_iterating();
        for index in 0..bound {
            let step = cursor.next_step().map_err(E::from)?;
            f(step.element, step.is_dummy, index)?;
        }
        cursor
            .assert_at_end_with(&format!("list holds more than {bound} elements"))
            .map_err(E::from)
    }
}
