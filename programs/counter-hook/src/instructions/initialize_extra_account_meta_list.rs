use anchor_lang::prelude::*;
use anchor_spl::token_interface::Mint;
use hook_account_resolution::{ExtraAccountMeta, ExtraAccountMetaList};
use spl_token_2022::extension::{
    transfer_hook::TransferHook as TransferHookExtension, BaseStateWithExtensions,
    StateWithExtensions,
};

use crate::constants::*;
use crate::error::CounterHookError;
use crate::events::ExtraAccountMetaListInitialized;

#[derive(Accounts)]
#[instruction(entries: Vec<ExtraAccountMeta>)]
pub struct InitializeExtraAccountMetaList<'info> {
    /// Must be the mint's transfer hook authority
    #[account(mut)]
    pub authority: Signer<'info>,

    /// CHECK: The ExtraAccountMetaList PDA, sized for `entries` and written
    /// by the handler.
    /// Seeds: ["extra-account-metas", mint]
    #[account(
        init,
        payer = authority,
        space = ExtraAccountMetaList::size_of(&entries)?,
        seeds = [EXTRA_ACCOUNT_METAS_SEED, mint.key().as_ref()],
        bump,
    )]
    pub extra_account_meta_list: UncheckedAccount<'info>,

    /// The Token-2022 mint that has this hook attached
    pub mint: InterfaceAccount<'info, Mint>,

    pub system_program: Program<'info, System>,
}

pub fn handler(
    ctx: Context<InitializeExtraAccountMetaList>,
    entries: Vec<ExtraAccountMeta>,
) -> Result<()> {
    // ── 1. Only the mint's hook authority may publish its list ──────────
    {
        let mint_info = ctx.accounts.mint.to_account_info();
        let mint_data = mint_info.try_borrow_data()?;
        check_hook_authority(&mint_data, &ctx.accounts.authority.key(), ctx.program_id)?;
    }

    // ── 2. Validate before any byte is written ──────────────────────────
    let list = ExtraAccountMetaList::new(entries)?;

    // ── 3. Write entries, discriminator last ────────────────────────────
    let list_info = ctx.accounts.extra_account_meta_list.to_account_info();
    list.init(&mut list_info.try_borrow_mut_data()?)?;

    msg!(
        "Extra account meta list initialized on {} with {} entries",
        list_info.key(),
        list.len()
    );
    emit!(ExtraAccountMetaListInitialized {
        mint: ctx.accounts.mint.key(),
        extra_account_meta_list: list_info.key(),
        authority: ctx.accounts.authority.key(),
        entry_count: list.len() as u32,
        timestamp: Clock::get()?.unix_timestamp,
    });

    Ok(())
}

/// Checks that `authority` is the transfer hook authority recorded in the
/// mint and that the mint hooks into `program_id`.
pub fn check_hook_authority(mint_data: &[u8], authority: &Pubkey, program_id: &Pubkey) -> Result<()> {
    let mint = StateWithExtensions::<spl_token_2022::state::Mint>::unpack(mint_data)?;
    let hook = mint
        .get_extension::<TransferHookExtension>()
        .map_err(|_| CounterHookError::InvalidAuthority)?;

    require!(
        Option::<Pubkey>::from(hook.authority) == Some(*authority),
        CounterHookError::InvalidAuthority
    );
    require!(
        Option::<Pubkey>::from(hook.program_id) == Some(*program_id),
        CounterHookError::HookProgramMismatch
    );
    Ok(())
}
