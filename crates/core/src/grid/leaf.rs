//! 8×8×8 leaf nodes: the point-sample storage level of the sparse tree.
//!
//! Each leaf owns a dense block of values plus a 512-bit activation mask.
//! Inactive slots always hold the tree's background value, so a leaf lookup
//! never has to consult the mask to answer `value()`.

use crate::core_types::{Coord, GridValue};

/// log2 of the leaf edge length
pub const LEAF_LOG2DIM: u32 = 3;
/// Leaf edge length in voxels
pub const LEAF_DIM: i32 = 1 << LEAF_LOG2DIM;
/// Number of voxels in one leaf
pub const LEAF_SIZE: usize = 1 << (3 * LEAF_LOG2DIM);

const MASK_WORDS: usize = LEAF_SIZE / 64;

/// Linear offset of `c` inside the leaf that contains it (x-major)
#[inline]
pub fn offset_of(c: Coord) -> usize {
    let m = LEAF_DIM - 1;
    (((c.x & m) << (2 * LEAF_LOG2DIM)) | ((c.y & m) << LEAF_LOG2DIM) | (c.z & m)) as usize
}

/// Activation bitmask for one leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValueMask {
    words: [u64; MASK_WORDS],
}

impl ValueMask {
    /// Mask with every bit set
    pub const fn all_on() -> Self {
        Self {
            words: [u64::MAX; MASK_WORDS],
        }
    }

    pub fn from_words(words: [u64; MASK_WORDS]) -> Self {
        Self { words }
    }

    pub fn words(&self) -> &[u64; MASK_WORDS] {
        &self.words
    }

    #[inline]
    pub fn is_on(&self, i: usize) -> bool {
        self.words[i >> 6] & (1u64 << (i & 63)) != 0
    }

    #[inline]
    pub fn set_on(&mut self, i: usize) {
        self.words[i >> 6] |= 1u64 << (i & 63);
    }

    #[inline]
    pub fn set_off(&mut self, i: usize) {
        self.words[i >> 6] &= !(1u64 << (i & 63));
    }

    pub fn count_on(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_off(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Indices of set bits in ascending order
    pub fn iter_on(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &word)| {
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let bit = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(wi * 64 + bit)
            })
        })
    }
}

/// Dense 8³ block of voxels with per-voxel activation.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafNode<T> {
    origin: Coord,
    values: Box<[T]>,
    mask: ValueMask,
}

impl<T: GridValue> LeafNode<T> {
    /// Empty leaf whose slots all hold `background`
    pub fn new(origin: Coord, background: T) -> Self {
        Self {
            origin: origin.aligned(LEAF_DIM),
            values: vec![background; LEAF_SIZE].into_boxed_slice(),
            mask: ValueMask::default(),
        }
    }

    /// Fully active leaf with every voxel set to `value`, used to densify a tile
    pub fn new_active(origin: Coord, value: T) -> Self {
        Self {
            origin: origin.aligned(LEAF_DIM),
            values: vec![value; LEAF_SIZE].into_boxed_slice(),
            mask: ValueMask::all_on(),
        }
    }

    /// Rebuild a leaf from its mask and the values of its active voxels, in mask order.
    ///
    /// Returns `None` when the value count does not match the number of set bits.
    pub fn from_active_values(
        origin: Coord,
        mask: ValueMask,
        active_values: &[T],
        background: T,
    ) -> Option<Self> {
        if mask.count_on() != active_values.len() {
            return None;
        }
        let mut leaf = Self::new(origin, background);
        for (i, &v) in mask.iter_on().zip(active_values) {
            leaf.values[i] = v;
        }
        leaf.mask = mask;
        Some(leaf)
    }

    #[inline]
    pub fn origin(&self) -> Coord {
        self.origin
    }

    #[inline]
    pub fn mask(&self) -> &ValueMask {
        &self.mask
    }

    #[inline]
    pub fn value(&self, c: Coord) -> T {
        self.values[offset_of(c)]
    }

    #[inline]
    pub fn is_on(&self, c: Coord) -> bool {
        self.mask.is_on(offset_of(c))
    }

    #[inline]
    pub fn set_value_on(&mut self, c: Coord, value: T) {
        let i = offset_of(c);
        self.values[i] = value;
        self.mask.set_on(i);
    }

    /// Deactivate `c`, restoring the background in its slot
    #[inline]
    pub fn set_value_off(&mut self, c: Coord, background: T) {
        let i = offset_of(c);
        self.values[i] = background;
        self.mask.set_off(i);
    }

    pub fn on_count(&self) -> usize {
        self.mask.count_on()
    }

    pub fn is_empty(&self) -> bool {
        self.mask.is_off()
    }

    /// Coordinate of the slot at linear offset `i`
    #[inline]
    pub fn coord_of(&self, i: usize) -> Coord {
        let i = i as i32;
        let m = LEAF_DIM - 1;
        self.origin.offset_by(
            (i >> (2 * LEAF_LOG2DIM)) & m,
            (i >> LEAF_LOG2DIM) & m,
            i & m,
        )
    }

    /// Active voxels in ascending offset order
    pub fn iter_on(&self) -> impl Iterator<Item = (Coord, T)> + '_ {
        self.mask.iter_on().map(|i| (self.coord_of(i), self.values[i]))
    }

    /// Values of active voxels, in the same order as [`Self::iter_on`]
    pub fn active_values(&self) -> Vec<T> {
        self.mask.iter_on().map(|i| self.values[i]).collect()
    }

    /// Visit every active voxel with write access to its value.
    ///
    /// The activation mask is not touched.
    pub fn for_each_on_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(Coord, &mut T),
    {
        let mask = self.mask;
        for i in mask.iter_on() {
            let c = self.coord_of(i);
            f(c, &mut self.values[i]);
        }
    }
}
