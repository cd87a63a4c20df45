//! Account reference seeds and their binary record format.
//!
//! Every record starts with a one-byte kind tag followed by kind-specific
//! fields:
//!
//! | tag | kind           | fields                                                  |
//! |-----|----------------|---------------------------------------------------------|
//! | 1   | Literal        | `len: u8`, `bytes[len]`                                 |
//! | 2   | InstructionArg | `offset: u8`, `length: u8`                              |
//! | 3   | AccountKey     | `index: u8`                                             |
//! | 4   | AccountData    | `account_index: u8`, `data_offset: u8`, `length: u8`    |
//! | 5   | Pda            | `has_bump: u8`, `bump: u8`, program record, `count: u8`, sub-seed records |

use std::io::{Read, Write};

use anchor_lang::prelude::*;
use anchor_lang::solana_program::program_error::ProgramError;

use crate::constants::MAX_SEED_DEPTH;
use crate::error::AccountResolutionError;

/// A rule describing where the bytes of one seed come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Seed {
    /// Fixed bytes known when the list is built.
    Literal { bytes: Vec<u8> },
    /// A slice of the Execute instruction data.
    InstructionArg { offset: u8, length: u8 },
    /// The address of an account already in the assembled list.
    AccountKey { index: u8 },
    /// A slice of the data held by an account already in the assembled list.
    AccountData {
        account_index: u8,
        data_offset: u8,
        length: u8,
    },
    /// A program-derived address. `program` must resolve to 32 bytes.
    Pda {
        program: Box<Seed>,
        seeds: Vec<Seed>,
        bump: Option<u8>,
    },
}

impl Seed {
    pub const LITERAL_TAG: u8 = 1;
    pub const INSTRUCTION_ARG_TAG: u8 = 2;
    pub const ACCOUNT_KEY_TAG: u8 = 3;
    pub const ACCOUNT_DATA_TAG: u8 = 4;
    pub const PDA_TAG: u8 = 5;

    pub fn literal(bytes: impl Into<Vec<u8>>) -> Self {
        Seed::Literal {
            bytes: bytes.into(),
        }
    }

    pub fn address(key: &Pubkey) -> Self {
        Seed::literal(key.to_bytes())
    }

    pub fn account_key(index: u8) -> Self {
        Seed::AccountKey { index }
    }

    pub fn pda(program: Seed, seeds: Vec<Seed>) -> Self {
        Seed::Pda {
            program: Box::new(program),
            seeds,
            bump: None,
        }
    }

    /// PDA nesting depth; plain seeds are 0.
    pub fn depth(&self) -> usize {
        match self {
            Seed::Pda { program, seeds, .. } => {
                let inner = seeds.iter().map(Seed::depth).max().unwrap_or(0);
                1 + inner.max(program.depth())
            }
            _ => 0,
        }
    }

    /// Highest account index this seed reads from, if it reads any.
    pub fn max_account_index(&self) -> Option<u8> {
        match self {
            Seed::AccountKey { index } => Some(*index),
            Seed::AccountData { account_index, .. } => Some(*account_index),
            Seed::Pda { program, seeds, .. } => seeds
                .iter()
                .filter_map(Seed::max_account_index)
                .chain(program.max_account_index())
                .max(),
            Seed::Literal { .. } | Seed::InstructionArg { .. } => None,
        }
    }

    pub fn packed_len(&self) -> usize {
        match self {
            Seed::Literal { bytes } => 2 + bytes.len(),
            Seed::InstructionArg { .. } => 3,
            Seed::AccountKey { .. } => 2,
            Seed::AccountData { .. } => 4,
            Seed::Pda { program, seeds, .. } => {
                4 + program.packed_len() + seeds.iter().map(Seed::packed_len).sum::<usize>()
            }
        }
    }

    pub fn pack(&self) -> std::result::Result<Vec<u8>, ProgramError> {
        let mut buf = Vec::with_capacity(self.packed_len());
        self.pack_into(&mut buf)?;
        Ok(buf)
    }

    pub fn pack_into(&self, buf: &mut Vec<u8>) -> std::result::Result<(), ProgramError> {
        if self.depth() > MAX_SEED_DEPTH {
            return Err(AccountResolutionError::SeedTooDeep.into());
        }
        self.pack_record(buf)
    }

    fn pack_record(&self, buf: &mut Vec<u8>) -> std::result::Result<(), ProgramError> {
        match self {
            Seed::Literal { bytes } => {
                let len =
                    u8::try_from(bytes.len()).map_err(|_| AccountResolutionError::MalformedSeed)?;
                buf.push(Self::LITERAL_TAG);
                buf.push(len);
                buf.extend_from_slice(bytes);
            }
            Seed::InstructionArg { offset, length } => {
                buf.extend_from_slice(&[Self::INSTRUCTION_ARG_TAG, *offset, *length]);
            }
            Seed::AccountKey { index } => {
                buf.extend_from_slice(&[Self::ACCOUNT_KEY_TAG, *index]);
            }
            Seed::AccountData {
                account_index,
                data_offset,
                length,
            } => {
                buf.extend_from_slice(&[
                    Self::ACCOUNT_DATA_TAG,
                    *account_index,
                    *data_offset,
                    *length,
                ]);
            }
            Seed::Pda {
                program,
                seeds,
                bump,
            } => {
                let count =
                    u8::try_from(seeds.len()).map_err(|_| AccountResolutionError::MalformedSeed)?;
                buf.push(Self::PDA_TAG);
                buf.push(bump.is_some() as u8);
                buf.push(bump.unwrap_or_default());
                program.pack_record(buf)?;
                buf.push(count);
                for seed in seeds {
                    seed.pack_record(buf)?;
                }
            }
        }
        Ok(())
    }

    /// Decodes the record starting at `offset`, returning the seed and the
    /// number of bytes it occupied.
    pub fn unpack(bytes: &[u8], offset: usize) -> std::result::Result<(Self, usize), ProgramError> {
        Self::unpack_at_depth(bytes, offset, 0)
    }

    fn unpack_at_depth(
        bytes: &[u8],
        offset: usize,
        depth: usize,
    ) -> std::result::Result<(Self, usize), ProgramError> {
        let tag = read_u8(bytes, offset)?;
        match tag {
            Self::LITERAL_TAG => {
                let len = read_u8(bytes, offset + 1)? as usize;
                let start = offset + 2;
                let literal = bytes
                    .get(start..start + len)
                    .ok_or(AccountResolutionError::MalformedSeed)?;
                Ok((Seed::literal(literal), 2 + len))
            }
            Self::INSTRUCTION_ARG_TAG => Ok((
                Seed::InstructionArg {
                    offset: read_u8(bytes, offset + 1)?,
                    length: read_u8(bytes, offset + 2)?,
                },
                3,
            )),
            Self::ACCOUNT_KEY_TAG => Ok((
                Seed::AccountKey {
                    index: read_u8(bytes, offset + 1)?,
                },
                2,
            )),
            Self::ACCOUNT_DATA_TAG => Ok((
                Seed::AccountData {
                    account_index: read_u8(bytes, offset + 1)?,
                    data_offset: read_u8(bytes, offset + 2)?,
                    length: read_u8(bytes, offset + 3)?,
                },
                4,
            )),
            Self::PDA_TAG => {
                let depth = depth + 1;
                if depth > MAX_SEED_DEPTH {
                    return Err(AccountResolutionError::SeedTooDeep.into());
                }
                let bump = match (read_u8(bytes, offset + 1)?, read_u8(bytes, offset + 2)?) {
                    (0, 0) => None,
                    (1, bump) => Some(bump),
                    _ => return Err(AccountResolutionError::MalformedSeed.into()),
                };
                let mut cursor = offset + 3;
                let (program, used) = Self::unpack_at_depth(bytes, cursor, depth)?;
                cursor += used;
                let count = read_u8(bytes, cursor)?;
                cursor += 1;
                let mut seeds = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let (seed, used) = Self::unpack_at_depth(bytes, cursor, depth)?;
                    seeds.push(seed);
                    cursor += used;
                }
                Ok((
                    Seed::Pda {
                        program: Box::new(program),
                        seeds,
                        bump,
                    },
                    cursor - offset,
                ))
            }
            _ => Err(AccountResolutionError::MalformedSeed.into()),
        }
    }
}

// Borsh form: a u32 LE byte length followed by one packed record, so
// instruction arguments carry the same records the list stores.
impl AnchorSerialize for Seed {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let record = self
            .pack()
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?;
        let len = u32::try_from(record.len())
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?;
        len.serialize(writer)?;
        writer.write_all(&record)
    }
}

impl AnchorDeserialize for Seed {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        let len = u32::deserialize_reader(reader)? as usize;
        let mut record = Vec::new();
        (&mut *reader).take(len as u64).read_to_end(&mut record)?;
        if record.len() != len {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        let (seed, used) = Seed::unpack(&record, 0)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        if used != len {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "trailing bytes after seed record",
            ));
        }
        Ok(seed)
    }
}

#[cfg(feature = "idl-build")]
impl anchor_lang::idl::build::IdlBuild for Seed {}

fn read_u8(bytes: &[u8], at: usize) -> std::result::Result<u8, ProgramError> {
    bytes
        .get(at)
        .copied()
        .ok_or_else(|| AccountResolutionError::MalformedSeed.into())
}
