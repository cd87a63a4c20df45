//! Resolution of an extra-account-meta list into concrete account metas.
//!
//! The client runs this before submitting a transfer and the runtime runs it
//! again while building the Execute instruction; both must reach the same
//! accounts in the same order.

use std::collections::BTreeMap;

use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::{AccountMeta, Instruction};
use anchor_lang::solana_program::program_error::ProgramError;
use spl_discriminator::SplDiscriminate;
use spl_transfer_hook_interface::instruction::ExecuteInstruction;

use crate::account::ExtraAccountMeta;
use crate::constants::*;
use crate::error::AccountResolutionError;
use crate::pda::{check_extra_account_metas_address, check_seed_bounds, AddressDeriver};
use crate::seeds::Seed;
use crate::state::ExtraAccountMetaList;

/// Read access to on-chain account data by address.
pub trait AccountDataSource {
    /// Fails with `AccountNotFound` if nothing lives at `address`.
    fn account_data(&self, address: &Pubkey) -> std::result::Result<Vec<u8>, ProgramError>;
}

impl<'info> AccountDataSource for [AccountInfo<'info>] {
    fn account_data(&self, address: &Pubkey) -> std::result::Result<Vec<u8>, ProgramError> {
        let info = self
            .iter()
            .find(|info| info.key == address)
            .ok_or(AccountResolutionError::AccountNotFound)?;
        let data = info.try_borrow_data()?;
        Ok(data.to_vec())
    }
}

impl AccountDataSource for BTreeMap<Pubkey, Vec<u8>> {
    fn account_data(&self, address: &Pubkey) -> std::result::Result<Vec<u8>, ProgramError> {
        self.get(address)
            .cloned()
            .ok_or_else(|| AccountResolutionError::AccountNotFound.into())
    }
}

/// The four accounts every hooked transfer names, in Execute order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferAccounts {
    pub source: Pubkey,
    pub mint: Pubkey,
    pub destination: Pubkey,
    pub owner: Pubkey,
}

impl TransferAccounts {
    /// Reads the base accounts from the head of an account list.
    pub fn from_keys(keys: &[Pubkey]) -> std::result::Result<Self, ProgramError> {
        match keys {
            [source, mint, destination, owner, ..] => Ok(Self {
                source: *source,
                mint: *mint,
                destination: *destination,
                owner: *owner,
            }),
            _ => Err(AccountResolutionError::NotEnoughAccounts.into()),
        }
    }

    fn metas(&self) -> [AccountMeta; BASE_ACCOUNT_COUNT] {
        [
            AccountMeta::new_readonly(self.source, false),
            AccountMeta::new_readonly(self.mint, false),
            AccountMeta::new_readonly(self.destination, false),
            AccountMeta::new_readonly(self.owner, false),
        ]
    }
}

/// Result of one resolution pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssembledAccounts {
    pub base: TransferAccounts,
    pub hook_program_id: Pubkey,
    pub list_address: Pubkey,
    /// Resolved extra accounts in list order.
    pub extras: Vec<AccountMeta>,
}

impl AssembledAccounts {
    /// Accounts of the Execute instruction: source, mint, destination,
    /// owner, list, then the extras.
    pub fn execute_account_metas(&self) -> Vec<AccountMeta> {
        let mut metas = Vec::with_capacity(FIRST_EXTRA_INDEX + self.extras.len());
        metas.extend(self.base.metas());
        metas.push(AccountMeta::new_readonly(self.list_address, false));
        metas.extend(self.extras.iter().cloned());
        metas
    }

    /// Accounts the client appends to the base transfer instruction: the
    /// extras, then the hook program and the list.
    pub fn transfer_appendix(&self) -> Vec<AccountMeta> {
        let mut metas = self.extras.clone();
        metas.push(AccountMeta::new_readonly(self.hook_program_id, false));
        metas.push(AccountMeta::new_readonly(self.list_address, false));
        metas
    }

    /// The synthetic instruction the runtime sends to the hook program.
    pub fn execute_instruction(&self, amount: u64) -> Instruction {
        Instruction {
            program_id: self.hook_program_id,
            accounts: self.execute_account_metas(),
            data: execute_instruction_data(amount),
        }
    }
}

/// Execute instruction payload: selector followed by the transfer amount.
pub fn execute_instruction_data(amount: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(ExecuteInstruction::SPL_DISCRIMINATOR_SLICE.len() + 8);
    data.extend_from_slice(ExecuteInstruction::SPL_DISCRIMINATOR_SLICE);
    data.extend_from_slice(&amount.to_le_bytes());
    data
}

/// Turns a decoded list into account metas.
pub struct Resolver<'a, D: ?Sized, S: ?Sized> {
    pub hook_program_id: Pubkey,
    pub deriver: &'a D,
    pub data_source: &'a S,
}

impl<'a, D, S> Resolver<'a, D, S>
where
    D: AddressDeriver + ?Sized,
    S: AccountDataSource + ?Sized,
{
    pub fn new(hook_program_id: Pubkey, deriver: &'a D, data_source: &'a S) -> Self {
        Self {
            hook_program_id,
            deriver,
            data_source,
        }
    }

    /// Resolves `list`, stored at `list_address`, against the base accounts
    /// and the Execute instruction data. Entries may read any account
    /// resolved before them, including earlier extras.
    pub fn resolve(
        &self,
        base: &TransferAccounts,
        instruction_data: &[u8],
        list_address: &Pubkey,
        list: &ExtraAccountMetaList,
    ) -> std::result::Result<AssembledAccounts, ProgramError> {
        check_extra_account_metas_address(
            self.deriver,
            list_address,
            &base.mint,
            &self.hook_program_id,
        )?;

        let mut working: Vec<Pubkey> = Vec::with_capacity(FIRST_EXTRA_INDEX + list.len());
        working.extend(base.metas().iter().map(|meta| meta.pubkey));
        working.push(*list_address);

        let mut extras = Vec::with_capacity(list.len());
        for entry in list.entries() {
            let address = self.resolve_entry(entry, &working, instruction_data)?;
            working.push(address);
            extras.push(AccountMeta {
                pubkey: address,
                is_signer: entry.is_signer,
                is_writable: entry.is_writable,
            });
        }

        Ok(AssembledAccounts {
            base: *base,
            hook_program_id: self.hook_program_id,
            list_address: *list_address,
            extras,
        })
    }

    fn resolve_entry(
        &self,
        entry: &ExtraAccountMeta,
        working: &[Pubkey],
        instruction_data: &[u8],
    ) -> std::result::Result<Pubkey, ProgramError> {
        // decoded lists skip construction checks
        entry.validate_shape()?;
        let mut bytes = Vec::with_capacity(32);
        for seed in &entry.seeds {
            bytes.extend(self.resolve_seed(seed, working, instruction_data, 0)?);
        }
        to_pubkey(&bytes)
    }

    fn resolve_seed(
        &self,
        seed: &Seed,
        working: &[Pubkey],
        instruction_data: &[u8],
        depth: usize,
    ) -> std::result::Result<Vec<u8>, ProgramError> {
        match seed {
            Seed::Literal { bytes } => Ok(bytes.clone()),
            Seed::InstructionArg { offset, length } => {
                let start = *offset as usize;
                instruction_data
                    .get(start..start + *length as usize)
                    .map(<[u8]>::to_vec)
                    .ok_or_else(|| AccountResolutionError::InstructionDataOutOfRange.into())
            }
            Seed::AccountKey { index } => Ok(account_at(working, *index)?.to_bytes().to_vec()),
            Seed::AccountData {
                account_index,
                data_offset,
                length,
            } => {
                let address = account_at(working, *account_index)?;
                let data = self.data_source.account_data(address)?;
                let start = *data_offset as usize;
                data.get(start..start + *length as usize)
                    .map(<[u8]>::to_vec)
                    .ok_or_else(|| AccountResolutionError::AccountDataOutOfRange.into())
            }
            Seed::Pda {
                program,
                seeds,
                bump,
            } => {
                let depth = depth + 1;
                if depth > MAX_SEED_DEPTH {
                    return Err(AccountResolutionError::SeedTooDeep.into());
                }
                let program_id =
                    to_pubkey(&self.resolve_seed(program, working, instruction_data, depth)?)?;
                let resolved = seeds
                    .iter()
                    .map(|seed| self.resolve_seed(seed, working, instruction_data, depth))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                let seed_refs: Vec<&[u8]> = resolved.iter().map(Vec::as_slice).collect();
                check_seed_bounds(&seed_refs)?;
                let address = self
                    .deriver
                    .derive_address(&seed_refs, *bump, &program_id)?;
                Ok(address.to_bytes().to_vec())
            }
        }
    }
}

fn account_at(working: &[Pubkey], index: u8) -> std::result::Result<&Pubkey, ProgramError> {
    working
        .get(index as usize)
        .ok_or_else(|| AccountResolutionError::UnresolvedReference.into())
}

fn to_pubkey(bytes: &[u8]) -> std::result::Result<Pubkey, ProgramError> {
    Pubkey::try_from(bytes).map_err(|_| AccountResolutionError::SeedResolutionFailed.into())
}

/// Client-side hydration of a base transfer instruction. Reads the list for
/// the mint named by the instruction's second account, resolves it and
/// appends the extras, the hook program and the list address. The
/// instruction is untouched on failure.
pub fn add_extra_accounts_to_instruction<D, S>(
    instruction: &mut Instruction,
    hook_program_id: &Pubkey,
    amount: u64,
    data_source: &S,
    deriver: &D,
) -> std::result::Result<AssembledAccounts, ProgramError>
where
    D: AddressDeriver + ?Sized,
    S: AccountDataSource + ?Sized,
{
    let keys: Vec<Pubkey> = instruction
        .accounts
        .iter()
        .take(BASE_ACCOUNT_COUNT)
        .map(|meta| meta.pubkey)
        .collect();
    let base = TransferAccounts::from_keys(&keys)?;
    let list_address =
        crate::pda::extra_account_metas_address(deriver, &base.mint, hook_program_id)?;
    let list = ExtraAccountMetaList::unpack(&data_source.account_data(&list_address)?)?;

    let resolver = Resolver::new(*hook_program_id, deriver, data_source);
    let assembled = resolver.resolve(
        &base,
        &execute_instruction_data(amount),
        &list_address,
        &list,
    )?;
    instruction.accounts.extend(assembled.transfer_appendix());
    Ok(assembled)
}
