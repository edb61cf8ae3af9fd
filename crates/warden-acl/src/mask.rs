//! Sets of access identifiers.
//!
//! An [`AccessMask`] holds either a dense word bitmap or a sparse sorted list
//! of identifiers. Mutating operations work on the bitmap and convert a sparse
//! mask on first write; [`AccessMask::compact`] converts back to the list form,
//! which is cheaper to keep around and to enumerate for large, thinly
//! populated identifier spaces. Read-only operations accept either form, so a
//! mask is never held in both at once.

use std::fmt;

const WORD_BITS: usize = u64::BITS as usize;

/// Identifier of one resource action or one role.
///
/// Identifiers are allocated by the registry starting at 1 and are never
/// reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccessId(u32);

impl AccessId {
    /// Wraps a raw identifier.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    fn position(self) -> (usize, u64) {
        let index = self.0 as usize;
        (index / WORD_BITS, 1u64 << (index % WORD_BITS))
    }
}

impl From<u32> for AccessId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for AccessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
enum Repr {
    Dense(Vec<u64>),
    Sparse(Vec<AccessId>),
}

/// A set of access identifiers.
#[derive(Debug, Clone)]
pub struct AccessMask {
    repr: Repr,
}

impl Default for AccessMask {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessMask {
    /// Creates an empty mask.
    #[must_use]
    pub fn new() -> Self {
        Self {
            repr: Repr::Sparse(Vec::new()),
        }
    }

    /// Creates a mask holding a single identifier.
    #[must_use]
    pub fn singleton(id: AccessId) -> Self {
        Self {
            repr: Repr::Sparse(vec![id]),
        }
    }

    /// Creates a mask holding every identifier from `first` to `last`
    /// inclusive. Empty when `first > last`.
    #[must_use]
    pub fn range(first: AccessId, last: AccessId) -> Self {
        let mut mask = Self::new();
        for raw in first.get()..=last.get() {
            mask.set(AccessId(raw));
        }
        mask
    }

    fn dense_mut(&mut self) -> &mut Vec<u64> {
        if let Repr::Sparse(ids) = &self.repr {
            let mut words = Vec::new();
            for id in ids {
                set_bit(&mut words, *id);
            }
            self.repr = Repr::Dense(words);
        }
        match &mut self.repr {
            Repr::Dense(words) => words,
            Repr::Sparse(_) => unreachable!("sparse mask converted above"),
        }
    }

    /// Adds one identifier.
    pub fn set(&mut self, id: AccessId) {
        set_bit(self.dense_mut(), id);
    }

    /// Adds every identifier of `other` (union).
    pub fn set_all(&mut self, other: &AccessMask) {
        let words = self.dense_mut();
        for id in other.iter() {
            set_bit(words, id);
        }
    }

    /// Removes one identifier.
    pub fn reset(&mut self, id: AccessId) {
        let (word, bit) = id.position();
        if let Some(slot) = self.dense_mut().get_mut(word) {
            *slot &= !bit;
        }
    }

    /// Removes every identifier of `other` (difference).
    pub fn reset_all(&mut self, other: &AccessMask) {
        let words = self.dense_mut();
        for id in other.iter() {
            let (word, bit) = id.position();
            if let Some(slot) = words.get_mut(word) {
                *slot &= !bit;
            }
        }
    }

    /// Keeps only identifiers also present in `other` (intersection).
    pub fn filter_against(&mut self, other: &AccessMask) {
        self.retain(|id| other.contains(id));
    }

    /// Keeps only identifiers for which `keep` returns `true`.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(AccessId) -> bool,
    {
        let words = self.dense_mut();
        for (index, slot) in words.iter_mut().enumerate() {
            let mut bits = *slot;
            while bits != 0 {
                let offset = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                let id = AccessId((index * WORD_BITS + offset) as u32);
                if !keep(id) {
                    *slot &= !(1u64 << offset);
                }
            }
        }
    }

    /// Returns `true` if `id` is a member.
    #[must_use]
    pub fn contains(&self, id: AccessId) -> bool {
        match &self.repr {
            Repr::Dense(words) => {
                let (word, bit) = id.position();
                words.get(word).is_some_and(|slot| slot & bit != 0)
            }
            Repr::Sparse(ids) => ids.binary_search(&id).is_ok(),
        }
    }

    /// Returns `true` if every member of `other` is a member of `self`.
    ///
    /// Vacuously `true` when `other` is empty.
    #[must_use]
    pub fn contains_all(&self, other: &AccessMask) -> bool {
        other.iter().all(|id| self.contains(id))
    }

    /// Returns `true` if the mask has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match &self.repr {
            Repr::Dense(words) => words.iter().all(|slot| *slot == 0),
            Repr::Sparse(ids) => ids.is_empty(),
        }
    }

    /// Returns the number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Dense(words) => words.iter().map(|slot| slot.count_ones() as usize).sum(),
            Repr::Sparse(ids) => ids.len(),
        }
    }

    /// Converts the mask to the sparse list form.
    pub fn compact(&mut self) {
        if let Repr::Dense(_) = self.repr {
            let ids: Vec<AccessId> = self.iter().collect();
            self.repr = Repr::Sparse(ids);
        }
    }

    /// Returns `true` if the mask is held in the sparse list form.
    #[must_use]
    pub fn is_compact(&self) -> bool {
        matches!(self.repr, Repr::Sparse(_))
    }

    /// Iterates members in ascending order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        let inner = match &self.repr {
            Repr::Dense(words) => IterInner::Dense {
                words,
                index: 0,
                current: words.first().copied().unwrap_or(0),
            },
            Repr::Sparse(ids) => IterInner::Sparse(ids.iter()),
        };
        Iter { inner }
    }
}

fn set_bit(words: &mut Vec<u64>, id: AccessId) {
    let (word, bit) = id.position();
    if words.len() <= word {
        words.resize(word + 1, 0);
    }
    words[word] |= bit;
}

impl PartialEq for AccessMask {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Eq for AccessMask {}

impl FromIterator<AccessId> for AccessMask {
    fn from_iter<I: IntoIterator<Item = AccessId>>(iter: I) -> Self {
        let mut mask = Self::new();
        mask.extend(iter);
        mask
    }
}

impl Extend<AccessId> for AccessMask {
    fn extend<I: IntoIterator<Item = AccessId>>(&mut self, iter: I) {
        let words = self.dense_mut();
        for id in iter {
            set_bit(words, id);
        }
    }
}

impl<'a> IntoIterator for &'a AccessMask {
    type Item = AccessId;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ascending iterator over the members of an [`AccessMask`].
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    inner: IterInner<'a>,
}

#[derive(Debug, Clone)]
enum IterInner<'a> {
    Dense {
        words: &'a [u64],
        index: usize,
        current: u64,
    },
    Sparse(std::slice::Iter<'a, AccessId>),
}

impl Iterator for Iter<'_> {
    type Item = AccessId;

    fn next(&mut self) -> Option<AccessId> {
        match &mut self.inner {
            IterInner::Sparse(ids) => ids.next().copied(),
            IterInner::Dense {
                words,
                index,
                current,
            } => loop {
                if *current != 0 {
                    let offset = current.trailing_zeros() as usize;
                    *current &= *current - 1;
                    return Some(AccessId((*index * WORD_BITS + offset) as u32));
                }
                *index += 1;
                *current = *words.get(*index)?;
            },
        }
    }
}
