use anchor_lang::prelude::*;
use hook_account_resolution::ExtraAccountMeta;
use spl_transfer_hook_interface::instruction::TransferHookInstruction;

pub mod constants;
pub mod error;
pub mod events;
pub mod instructions;
pub mod state;

use instructions::*;

declare_id!("5sGD7FtZv6ygUTwGH9YrJk1EuT3JLdyMuDk6aATHDJgP");

#[program]
pub mod counter_hook {
    use super::*;

    /// Create the caller's counter PDA. A second call fails with
    /// `AlreadyInitialized`.
    pub fn initialize_counter(ctx: Context<InitializeCounter>) -> Result<()> {
        instructions::initialize_counter::handler(ctx)
    }

    /// Publish the mint's extra-account-meta list. Only the mint's transfer
    /// hook authority may call this, once per mint.
    pub fn initialize_extra_account_meta_list(
        ctx: Context<InitializeExtraAccountMetaList>,
        entries: Vec<ExtraAccountMeta>,
    ) -> Result<()> {
        instructions::initialize_extra_account_meta_list::handler(ctx, entries)
    }

    /// Runs on every transfer of a hooked mint; bumps the counter.
    pub fn transfer_hook<'info>(
        ctx: Context<'_, '_, '_, 'info, TransferHook<'info>>,
        amount: u64,
    ) -> Result<()> {
        instructions::transfer_hook::handler(ctx, amount)
    }

    /// Token-2022 calls the hook with the interface's Execute discriminator
    /// rather than an Anchor one; route it to `transfer_hook`.
    pub fn fallback<'info>(
        program_id: &Pubkey,
        accounts: &'info [AccountInfo<'info>],
        data: &[u8],
    ) -> Result<()> {
        match TransferHookInstruction::unpack(data)? {
            TransferHookInstruction::Execute { amount } => {
                let amount_bytes = amount.to_le_bytes();
                __private::__global::transfer_hook(program_id, accounts, &amount_bytes)
            }
            _ => Err(ProgramError::InvalidInstructionData.into()),
        }
    }
}
