//! Per-controller card registry
//!
//! The platform has a fixed, small number of controllers; the boot context
//! owns one registry for the duration of a boot attempt and drops it when
//! the attempt ends. There is no global device table.

use crate::engine::Card;
use crate::host::HostController;

/// Number of controller slots on the platform
pub const MAX_CONTROLLERS: usize = 3;

/// Fixed-capacity registry of brought-up cards, indexed by controller
pub struct CardRegistry<H: HostController> {
    slots: [Option<Card<H>>; MAX_CONTROLLERS],
}

impl<H: HostController> CardRegistry<H> {
    /// An empty registry
    pub fn new() -> Self {
        Self {
            slots: [None, None, None],
        }
    }

    /// Store a card under its controller index; returns the card back if
    /// the index is out of range or the slot is already taken
    pub fn insert(&mut self, card: Card<H>) -> Result<(), Card<H>> {
        let index = card.host().index();
        match self.slots.get_mut(index) {
            Some(slot @ None) => {
                *slot = Some(card);
                Ok(())
            }
            _ => Err(card),
        }
    }

    /// Borrow the card on a controller, if one was brought up
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Card<H>> {
        self.slots.get_mut(index)?.as_mut()
    }

    /// Remove and return the card on a controller
    pub fn take(&mut self, index: usize) -> Option<Card<H>> {
        self.slots.get_mut(index)?.take()
    }
}

impl<H: HostController> Default for CardRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}
