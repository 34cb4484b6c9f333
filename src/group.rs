//! Slot groups and the probe walk over them.
//!
//! A group is eight key-value slots sharing one control word. Slots are
//! `MaybeUninit`: the control word alone decides which of them hold live
//! pairs, and every `assume_init_*` in the crate sits behind a check of
//! a `FULL` lane.

use core::mem::MaybeUninit;

use crate::control::ControlWord;
use crate::control::LANES;

/// Entries a group may hold against table capacity. One lane of headroom
/// per group keeps empty lanes frequent enough that probe chains
/// terminate at a true sentinel instead of running long.
pub(crate) const GROUP_LOAD: usize = 7;

/// Number of groups backing a table that must hold `n` entries: enough
/// groups at `GROUP_LOAD` each, rounded up to a power of two so the home
/// group can be selected by masking, never fewer than one.
pub(crate) fn groups_for(n: usize) -> usize {
    n.div_ceil(GROUP_LOAD).next_power_of_two().max(1)
}

/// One group: a control word plus its eight slots.
pub(crate) struct Group<K, V> {
    pub(crate) ctrl: ControlWord,
    pub(crate) slots: [MaybeUninit<(K, V)>; LANES],
}

impl<K, V> Group<K, V> {
    /// A group with every lane `EMPTY` and every slot uninitialized.
    pub(crate) fn empty() -> Self {
        Group {
            ctrl: ControlWord::EMPTY_GROUP,
            slots: [const { MaybeUninit::uninit() }; LANES],
        }
    }

    /// Drops the pair in every `FULL` lane. The control word is left
    /// untouched; callers reset it themselves when the group is being
    /// recycled rather than deallocated.
    ///
    /// # Safety
    ///
    /// Every `FULL` lane of `self.ctrl` must refer to an initialized
    /// slot, and the slots must not be read again afterwards without
    /// reinitialization.
    pub(crate) unsafe fn drop_full_slots(&mut self) {
        for lane in self.ctrl.mask_full() {
            // SAFETY: the caller guarantees FULL lanes are initialized,
            // and `lane < LANES` because the mask only yields lane
            // indices.
            unsafe {
                self.slots.get_unchecked_mut(lane).assume_init_drop();
            }
        }
    }
}

impl<K, V> Clone for Group<K, V>
where
    K: Clone,
    V: Clone,
{
    fn clone(&self) -> Self {
        let mut slots = [const { MaybeUninit::uninit() }; LANES];
        for lane in self.ctrl.mask_full() {
            // SAFETY: a FULL lane guarantees the slot holds an
            // initialized pair, and `lane < LANES`.
            let pair = unsafe { self.slots.get_unchecked(lane).assume_init_ref() };
            slots[lane].write(pair.clone());
        }
        // Tombstones are carried over as-is so the copy preserves the
        // original's probe chains.
        Group {
            ctrl: self.ctrl,
            slots,
        }
    }
}

/// The triangular probe walk: starting from a key's home group it visits
/// `home, home + 1, home + 3, home + 6, ...` modulo the group count.
/// With a power-of-two group count the walk covers every group exactly
/// once before repeating.
pub(crate) struct ProbeSeq {
    pub(crate) index: usize,
    stride: usize,
    mask: usize,
}

impl ProbeSeq {
    #[inline(always)]
    pub(crate) fn new(home: usize, mask: usize) -> Self {
        ProbeSeq {
            index: home & mask,
            stride: 0,
            mask,
        }
    }

    #[inline(always)]
    pub(crate) fn advance(&mut self) {
        self.stride += 1;
        self.index = self.index.wrapping_add(self.stride) & self.mask;
    }
}
