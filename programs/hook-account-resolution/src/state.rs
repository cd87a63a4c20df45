//! The extra-account-meta list account.
//!
//! Layout: `[8-byte discriminator][count: u32 LE][entries...]`, each entry
//! packed by [`ExtraAccountMeta::pack_into`].

use anchor_lang::solana_program::program_error::ProgramError;
use bytemuck::{Pod, Zeroable};
use spl_discriminator::{ArrayDiscriminator, SplDiscriminate};
use spl_pod::primitives::PodU32;

use crate::account::{ExtraAccountMeta, MetaHeader};
use crate::constants::{FIRST_EXTRA_INDEX, MAX_EXTRA_ACCOUNT_METAS, MAX_SEED_DEPTH};
use crate::error::AccountResolutionError;

/// Validity tag of an initialized list account.
#[derive(SplDiscriminate)]
#[discriminator_hash_input("counter-hook:extra-account-metas")]
pub struct ExtraAccountMetasTag;

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ListHeader {
    pub discriminator: ArrayDiscriminator,
    pub count: PodU32,
}

impl ListHeader {
    pub const LEN: usize = std::mem::size_of::<ListHeader>();
}

/// Ordered extra-account metas for one mint. Order fixes where each extra
/// account sits in the transfer and Execute instructions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtraAccountMetaList {
    entries: Vec<ExtraAccountMeta>,
}

impl ExtraAccountMetaList {
    /// Validates `entries`: bounded count, well-formed seeds, bounded
    /// nesting, and no entry reading an account resolved after it.
    pub fn new(entries: Vec<ExtraAccountMeta>) -> Result<Self, ProgramError> {
        if entries.len() > MAX_EXTRA_ACCOUNT_METAS {
            return Err(AccountResolutionError::TooManyEntries.into());
        }
        for (position, entry) in entries.iter().enumerate() {
            if entry.depth() > MAX_SEED_DEPTH {
                return Err(AccountResolutionError::SeedTooDeep.into());
            }
            entry.validate_shape()?;
            if let Some(index) = entry.max_account_index() {
                if index as usize >= FIRST_EXTRA_INDEX + position {
                    return Err(AccountResolutionError::ForwardReference.into());
                }
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ExtraAccountMeta] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes needed to store `entries`.
    pub fn size_of(entries: &[ExtraAccountMeta]) -> Result<usize, ProgramError> {
        if entries.len() > MAX_EXTRA_ACCOUNT_METAS {
            return Err(AccountResolutionError::TooManyEntries.into());
        }
        Ok(ListHeader::LEN + entries.iter().map(ExtraAccountMeta::packed_len).sum::<usize>())
    }

    pub fn packed_len(&self) -> usize {
        ListHeader::LEN
            + self
                .entries
                .iter()
                .map(ExtraAccountMeta::packed_len)
                .sum::<usize>()
    }

    /// Writes the list into `data`. The discriminator goes in last so an
    /// interrupted write never decodes as a valid list.
    pub fn init(&self, data: &mut [u8]) -> Result<(), ProgramError> {
        if is_initialized(data) {
            return Err(AccountResolutionError::ListAlreadyInitialized.into());
        }
        let mut body = Vec::with_capacity(self.packed_len() - ListHeader::LEN);
        for entry in &self.entries {
            entry.pack_into(&mut body)?;
        }
        let total = ListHeader::LEN + body.len();
        if data.len() < total {
            return Err(AccountResolutionError::AccountTooSmall.into());
        }

        data[ListHeader::LEN..total].copy_from_slice(&body);
        let header = ListHeader {
            discriminator: ArrayDiscriminator::UNINITIALIZED,
            count: (self.entries.len() as u32).into(),
        };
        data[..ListHeader::LEN].copy_from_slice(bytemuck::bytes_of(&header));
        data[..ArrayDiscriminator::LENGTH]
            .copy_from_slice(ExtraAccountMetasTag::SPL_DISCRIMINATOR_SLICE);
        Ok(())
    }

    /// Decodes a list account. Entries are not re-validated against
    /// forward references; the resolver guards those at resolution time.
    pub fn unpack(data: &[u8]) -> Result<Self, ProgramError> {
        let discriminator = data
            .get(..ArrayDiscriminator::LENGTH)
            .ok_or(AccountResolutionError::InvalidDiscriminator)?;
        if discriminator != ExtraAccountMetasTag::SPL_DISCRIMINATOR_SLICE {
            return Err(AccountResolutionError::InvalidDiscriminator.into());
        }
        let header_bytes = data
            .get(..ListHeader::LEN)
            .ok_or(AccountResolutionError::TruncatedList)?;
        let header: &ListHeader = bytemuck::try_from_bytes(header_bytes)
            .map_err(|_| AccountResolutionError::TruncatedList)?;
        let count = u32::from(header.count) as usize;
        // every entry needs at least its header
        if count.saturating_mul(MetaHeader::LEN) > data.len() - ListHeader::LEN {
            return Err(AccountResolutionError::TruncatedList.into());
        }
        if count > MAX_EXTRA_ACCOUNT_METAS {
            return Err(AccountResolutionError::TooManyEntries.into());
        }

        let mut entries = Vec::with_capacity(count);
        let mut cursor = ListHeader::LEN;
        for _ in 0..count {
            // zeroed allocation past the last written entry
            if data[cursor..].iter().all(|byte| *byte == 0) {
                return Err(AccountResolutionError::TruncatedList.into());
            }
            let (entry, used) = ExtraAccountMeta::unpack(data, cursor)?;
            entries.push(entry);
            cursor += used;
        }
        Ok(Self { entries })
    }
}

fn is_initialized(data: &[u8]) -> bool {
    data.get(..ArrayDiscriminator::LENGTH) == Some(ExtraAccountMetasTag::SPL_DISCRIMINATOR_SLICE)
}
