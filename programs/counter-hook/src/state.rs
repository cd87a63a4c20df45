use anchor_lang::prelude::*;

use crate::error::CounterHookError;

/// Per-authority transfer counter PDA.
/// Seeds: [authority.key().as_ref()]
#[account]
#[derive(Default, Debug, PartialEq, Eq)]
pub struct Counter {
    /// Authority the counter belongs to
    pub authority: Pubkey,
    /// Number of hooked transfers seen
    pub count: u64,
    /// PDA bump
    pub bump: u8,
}

impl Counter {
    pub const LEN: usize = 8   // discriminator
        + 32                    // authority
        + 8                     // count
        + 1;                    // bump

    pub fn is_initialized(&self) -> bool {
        self.authority != Pubkey::default()
    }

    /// Guards `init_if_needed` against reinitializing a live counter.
    pub fn ensure_uninitialized(&self) -> Result<()> {
        require!(!self.is_initialized(), CounterHookError::AlreadyInitialized);
        Ok(())
    }

    /// Adds one hooked transfer; fails instead of wrapping.
    pub fn increment(&mut self) -> Result<u64> {
        self.count = self
            .count
            .checked_add(1)
            .ok_or(CounterHookError::CounterOverflow)?;
        Ok(self.count)
    }
}
