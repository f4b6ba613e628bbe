//! Bidirectional cursor over a [`HashCommittedList`](super::HashCommittedList).
//!
//! The start of a walk is the newest element: a fresh cursor sits at the list
//! hash and `next()` unfolds one element at a time, checking each witness
//! against `current_hash`, until the empty hash (the end) is reached. The
//! reverse walk starts at the empty hash and `previous()` folds elements back
//! on in push order. Its steps are unchecked, so a backward walk is only
//! trusted once it has been closed with
//! [`assert_at_start`](ListCursor::assert_at_start).

use std::fmt;

use super::{ListCodec, ListWitness};
use crate::commitment::{Fp254, short_hex};
use crate::error::{Result, assert_equal, assert_true};

/// One bounded-loop slot: the element read and whether it lies past the real data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step<T> {
    pub element: T,
    pub is_dummy: bool,
}

pub struct ListCursor<C: ListCodec> {
    hash: Fp254,
    current_hash: Fp254,
    /// Number of elements unfolded from the newest end so far.
    current_index: usize,
    /// Oldest-first, as stored by the list.
    shadow: Vec<ListWitness<C::Element>>,
}

impl<C: ListCodec> Clone for ListCursor<C> {
    fn clone(&self) -> Self {
        Self {
            hash: self.hash,
            current_hash: self.current_hash,
            current_index: self.current_index,
            shadow: self.shadow.clone(),
        }
    }
}

impl<C: ListCodec> fmt::Debug for ListCursor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListCursor")
            .field("hash", &short_hex(&self.hash))
            .field("current_hash", &short_hex(&self.current_hash))
            .field("current_index", &self.current_index)
            .finish()
    }
}

impl<C: ListCodec> ListCursor<C> {
    pub(super) fn at_start(hash: Fp254, shadow: Vec<ListWitness<C::Element>>) -> Self {
        Self {
            hash,
            current_hash: hash,
            current_index: 0,
            shadow,
        }
    }

    pub(super) fn at_end(hash: Fp254, shadow: Vec<ListWitness<C::Element>>) -> Self {
        let current_index = shadow.len();
        Self {
            hash,
            current_hash: C::empty_hash(),
            current_index,
            shadow,
        }
    }

    /// Commitment of the whole list being iterated.
    pub fn hash(&self) -> Fp254 {
        self.hash
    }

    /// Commitment of the elements not yet unfolded.
    pub fn current_hash(&self) -> Fp254 {
        self.current_hash
    }

    pub fn is_at_start(&self) -> bool {
        self.current_hash == self.hash
    }

    pub fn is_at_end(&self) -> bool {
        self.current_hash == C::empty_hash()
    }

    pub fn assert_at_start(&self) -> Result<()> {
        assert_equal(
            self.current_hash,
            self.hash,
            "cursor is not at the start of the list",
        )
    }

    pub fn assert_at_end(&self) -> Result<()> {
        self.assert_at_end_with("cursor is not at the end of the list")
    }

    pub(crate) fn assert_at_end_with(&self, message: &str) -> Result<()> {
        assert_equal(self.current_hash, C::empty_hash(), message)
    }

    /// Advance one slot newest-first, checking the witness against `current_hash`.
    ///
    /// Once the end is reached every further step is a dummy that leaves the
    /// cursor in place.
    pub fn next_step(&mut self) -> Result<Step<C::Element>> {
        if self.is_at_end() {
            return Ok(Step {
                element: C::empty_element(),
                is_dummy: true,
            });
        }

        let witness = self
            .shadow
            .len()
            .checked_sub(self.current_index + 1)
            .and_then(|index| self.shadow.get(index))
            .cloned()
            .unwrap_or_else(|| ListWitness::new(C::empty_hash(), C::empty_element()));
        assert_equal(
            C::next_hash(witness.previous_hash, &witness.element),
            self.current_hash,
            "next element does not match the cursor position",
        )?;

        self.current_hash = witness.previous_hash;
        self.current_index += 1;
        Ok(Step {
            element: witness.element,
            is_dummy: false,
        })
    }

    pub fn next(&mut self) -> Result<C::Element> {
        Ok(self.next_step()?.element)
    }

    /// Step back one slot towards the newest element (push order).
    ///
    /// Folds the element onto `current_hash`; once the start is reached every
    /// further step is a dummy.
    pub fn previous_step(&mut self) -> Step<C::Element> {
        if self.is_at_start() {
            return Step {
                element: C::empty_element(),
                is_dummy: true,
            };
        }

        let element = self
            .shadow
            .len()
            .checked_sub(self.current_index)
            .and_then(|index| self.shadow.get(index))
            .map(|witness| witness.element.clone())
            .unwrap_or_else(C::empty_element);
        self.current_hash = C::next_hash(self.current_hash, &element);
        self.current_index = self.current_index.saturating_sub(1);
        Step {
            element,
            is_dummy: false,
        }
    }

    pub fn previous(&mut self) -> C::Element {
        self.previous_step().element
    }

    pub fn jump_to_start(&mut self) {
        self.current_hash = self.hash;
        self.current_index = 0;
    }

    pub fn jump_to_end(&mut self) {
        self.current_hash = C::empty_hash();
        self.current_index = self.shadow.len();
    }

    pub fn jump_to_end_if(&mut self, condition: bool) {
        if condition {
            self.jump_to_end();
        }
    }

    /// Assert that `index` elements have been unfolded from the start.
    ///
    /// Only meaningful after a fully checked walk; the index itself is not
    /// part of any commitment.
    pub fn assert_index(&self, index: usize) -> Result<()> {
        assert_true(
            self.current_index == index,
            "cursor is not at the expected position",
        )
    }
}
