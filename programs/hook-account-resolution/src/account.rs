use anchor_lang::prelude::*;
use anchor_lang::solana_program::program_error::ProgramError;
use bytemuck::{Pod, Zeroable};
use spl_pod::primitives::{PodBool, PodU32};

use crate::error::AccountResolutionError;
use crate::seeds::Seed;

/// How an entry's seeds turn into an address.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetaKind {
    /// Literal seeds concatenating to a fixed 32-byte address.
    Literal,
    /// A single reference seed (account key, account data or instruction
    /// argument) that yields a 32-byte address.
    AccountKey,
    /// A single composite PDA seed.
    Pda,
}

impl MetaKind {
    pub fn tag(self) -> u8 {
        match self {
            MetaKind::Literal => 1,
            MetaKind::AccountKey => 2,
            MetaKind::Pda => 3,
        }
    }
}

impl TryFrom<u8> for MetaKind {
    type Error = ProgramError;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(MetaKind::Literal),
            2 => Ok(MetaKind::AccountKey),
            3 => Ok(MetaKind::Pda),
            _ => Err(AccountResolutionError::MalformedSeed.into()),
        }
    }
}

/// Fixed-size prefix of every packed entry.
/// Layout: [kind][is_signer][is_writable][seeds_len: u32 LE]
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MetaHeader {
    pub kind: u8,
    pub is_signer: PodBool,
    pub is_writable: PodBool,
    /// Byte length of the seed records that follow.
    pub seeds_len: PodU32,
}

impl MetaHeader {
    pub const LEN: usize = std::mem::size_of::<MetaHeader>();
}

/// One extra account a hooked transfer must carry.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct ExtraAccountMeta {
    pub kind: MetaKind,
    pub seeds: Vec<Seed>,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl ExtraAccountMeta {
    pub fn new_with_address(address: &Pubkey, is_signer: bool, is_writable: bool) -> Self {
        Self {
            kind: MetaKind::Literal,
            seeds: vec![Seed::address(address)],
            is_signer,
            is_writable,
        }
    }

    pub fn new_with_account_key(index: u8, is_signer: bool, is_writable: bool) -> Self {
        Self::new_with_reference(Seed::account_key(index), is_signer, is_writable)
    }

    pub fn new_with_reference(seed: Seed, is_signer: bool, is_writable: bool) -> Self {
        Self {
            kind: MetaKind::AccountKey,
            seeds: vec![seed],
            is_signer,
            is_writable,
        }
    }

    /// A PDA of `seeds` under the program named by `program`.
    pub fn new_with_seeds(
        program: Seed,
        seeds: Vec<Seed>,
        is_signer: bool,
        is_writable: bool,
    ) -> Self {
        Self {
            kind: MetaKind::Pda,
            seeds: vec![Seed::pda(program, seeds)],
            is_signer,
            is_writable,
        }
    }

    /// Checks that the seeds have the shape `kind` requires.
    pub fn validate_shape(&self) -> std::result::Result<(), ProgramError> {
        let well_formed = match (self.kind, self.seeds.as_slice()) {
            (MetaKind::Literal, seeds) => {
                !seeds.is_empty()
                    && seeds.iter().all(|seed| matches!(seed, Seed::Literal { .. }))
                    && self.seeds_byte_len() == 32
            }
            (MetaKind::AccountKey, [Seed::AccountKey { .. }]) => true,
            (
                MetaKind::AccountKey,
                [Seed::AccountData { length, .. } | Seed::InstructionArg { length, .. }],
            ) => *length == 32,
            (MetaKind::Pda, [Seed::Pda { .. }]) => true,
            _ => false,
        };
        if !well_formed {
            return Err(AccountResolutionError::MalformedSeed.into());
        }
        Ok(())
    }

    /// Highest account index any seed of this entry reads from.
    pub fn max_account_index(&self) -> Option<u8> {
        self.seeds.iter().filter_map(Seed::max_account_index).max()
    }

    pub fn depth(&self) -> usize {
        self.seeds.iter().map(Seed::depth).max().unwrap_or(0)
    }

    fn seeds_byte_len(&self) -> usize {
        self.seeds
            .iter()
            .map(|seed| match seed {
                Seed::Literal { bytes } => bytes.len(),
                _ => 0,
            })
            .sum()
    }

    pub fn packed_len(&self) -> usize {
        MetaHeader::LEN + self.seeds.iter().map(Seed::packed_len).sum::<usize>()
    }

    pub fn pack_into(&self, buf: &mut Vec<u8>) -> std::result::Result<(), ProgramError> {
        let mut records = Vec::new();
        for seed in &self.seeds {
            seed.pack_into(&mut records)?;
        }
        let seeds_len =
            u32::try_from(records.len()).map_err(|_| AccountResolutionError::MalformedSeed)?;
        let header = MetaHeader {
            kind: self.kind.tag(),
            is_signer: self.is_signer.into(),
            is_writable: self.is_writable.into(),
            seeds_len: seeds_len.into(),
        };
        buf.extend_from_slice(bytemuck::bytes_of(&header));
        buf.extend_from_slice(&records);
        Ok(())
    }

    /// Decodes the entry starting at `offset`. A record shorter than its
    /// header or its declared seed length is reported as `TruncatedList`.
    pub fn unpack(bytes: &[u8], offset: usize) -> std::result::Result<(Self, usize), ProgramError> {
        let header_bytes = bytes
            .get(offset..offset + MetaHeader::LEN)
            .ok_or(AccountResolutionError::TruncatedList)?;
        let header: &MetaHeader = bytemuck::try_from_bytes(header_bytes)
            .map_err(|_| AccountResolutionError::TruncatedList)?;
        let kind = MetaKind::try_from(header.kind)?;
        let seeds_len = u32::from(header.seeds_len) as usize;

        let start = offset + MetaHeader::LEN;
        let records = bytes
            .get(start..start + seeds_len)
            .ok_or(AccountResolutionError::TruncatedList)?;
        let mut seeds = Vec::new();
        let mut cursor = 0;
        while cursor < records.len() {
            let (seed, used) = Seed::unpack(records, cursor)?;
            seeds.push(seed);
            cursor += used;
        }

        Ok((
            Self {
                kind,
                seeds,
                is_signer: header.is_signer.into(),
                is_writable: header.is_writable.into(),
            },
            MetaHeader::LEN + seeds_len,
        ))
    }
}
