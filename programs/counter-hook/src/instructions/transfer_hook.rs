use anchor_lang::prelude::*;
use anchor_spl::token_interface::{Mint, TokenAccount};
use hook_account_resolution::constants::LIST_ACCOUNT_INDEX;
use hook_account_resolution::pda::check_extra_account_metas_address;
use hook_account_resolution::{
    execute_instruction_data, AccountDataSource, AccountResolutionError, AddressDeriver,
    ExtraAccountMetaList, ProgramDerivedAddresses, Resolver, TransferAccounts,
};
use spl_token_2022::extension::{
    transfer_hook::TransferHookAccount, BaseStateWithExtensions, StateWithExtensions,
};
use spl_transfer_hook_interface::error::TransferHookError;

use crate::constants::COUNTER_ACCOUNT_INDEX;
use crate::events::TransferHooked;
use crate::state::*;

/// Accounts of the Execute instruction Token-2022 sends on every transfer.
/// Order is fixed by the transfer hook interface: source, mint, destination,
/// owner, list, then the extras the list names.
#[derive(Accounts)]
pub struct TransferHook<'info> {
    #[account(token::mint = mint)]
    pub source_token: InterfaceAccount<'info, TokenAccount>,

    pub mint: InterfaceAccount<'info, Mint>,

    #[account(token::mint = mint)]
    pub destination_token: InterfaceAccount<'info, TokenAccount>,

    /// CHECK: Source owner or delegate, already authorized by Token-2022.
    pub owner: UncheckedAccount<'info>,

    /// CHECK: Compared against the mint's list PDA in the handler.
    pub extra_account_meta_list: UncheckedAccount<'info>,

    /// First extra account of the list
    #[account(
        mut,
        seeds = [counter.authority.as_ref()],
        bump = counter.bump,
    )]
    pub counter: Account<'info, Counter>,
}

pub fn handler<'info>(
    ctx: Context<'_, '_, '_, 'info, TransferHook<'info>>,
    amount: u64,
) -> Result<()> {
    // ── 1. Only reachable from inside a Token-2022 transfer ─────────────
    check_is_transferring(&ctx.accounts.source_token.to_account_info().try_borrow_data()?)?;
    check_is_transferring(&ctx.accounts.destination_token.to_account_info().try_borrow_data()?)?;

    // ── 2. The supplied extras must be the ones the list resolves to ────
    let mut infos = ctx.accounts.to_account_infos();
    infos.extend(ctx.remaining_accounts.iter().cloned());
    let keys: Vec<Pubkey> = infos.iter().map(|info| *info.key).collect();
    verify_execute_accounts(
        ctx.program_id,
        &keys,
        amount,
        &infos[..],
        &ProgramDerivedAddresses,
    )?;

    // ── 3. Count the transfer ───────────────────────────────────────────
    let counter = &mut ctx.accounts.counter;
    let count = counter.increment()?;

    msg!(
        "Transfer of {} on mint {} hooked, count {}",
        amount,
        ctx.accounts.mint.key(),
        count
    );
    emit!(TransferHooked {
        mint: ctx.accounts.mint.key(),
        source: ctx.accounts.source_token.key(),
        destination: ctx.accounts.destination_token.key(),
        owner: ctx.accounts.owner.key(),
        amount,
        counter: ctx.accounts.counter.key(),
        count,
        timestamp: Clock::get()?.unix_timestamp,
    });

    Ok(())
}

/// Fails unless the token account is mid-transfer. Token-2022 raises the
/// `transferring` flag on both accounts for the duration of the hook CPI.
pub fn check_is_transferring(token_account_data: &[u8]) -> Result<()> {
    let account = StateWithExtensions::<spl_token_2022::state::Account>::unpack(token_account_data)?;
    let extension = account.get_extension::<TransferHookAccount>()?;
    if !bool::from(extension.transferring) {
        return Err(ProgramError::from(TransferHookError::ProgramCalledOutsideOfTransfer).into());
    }
    Ok(())
}

/// Checks the Execute accounts against the mint's list: the list must sit at
/// its PDA and the extras must be exactly what the list resolves to, with the
/// counter first.
pub fn verify_execute_accounts<S, D>(
    program_id: &Pubkey,
    keys: &[Pubkey],
    amount: u64,
    data_source: &S,
    deriver: &D,
) -> Result<()>
where
    S: AccountDataSource + ?Sized,
    D: AddressDeriver + ?Sized,
{
    let base = TransferAccounts::from_keys(keys)?;
    let list_address = keys
        .get(LIST_ACCOUNT_INDEX)
        .ok_or(ProgramError::from(AccountResolutionError::NotEnoughAccounts))?;
    check_extra_account_metas_address(deriver, list_address, &base.mint, program_id)?;

    let list = ExtraAccountMetaList::unpack(&data_source.account_data(list_address)?)?;
    let assembled = Resolver::new(*program_id, deriver, data_source).resolve(
        &base,
        &execute_instruction_data(amount),
        list_address,
        &list,
    )?;

    let expected: Vec<Pubkey> = assembled.extras.iter().map(|meta| meta.pubkey).collect();
    // an empty list would leave the counter unconstrained
    let supplied = &keys[COUNTER_ACCOUNT_INDEX..];
    if expected.is_empty() || supplied != expected.as_slice() {
        return Err(ProgramError::from(AccountResolutionError::AddressMismatch).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_lang::solana_program::program_option::COption;
    use anchor_lang::solana_program::program_pack::Pack;
    use spl_token_2022::extension::{
        BaseStateWithExtensionsMut, ExtensionType, StateWithExtensionsMut,
    };
    use spl_token_2022::state::{Account as TokenState, AccountState};

    fn hooked_token_account(transferring: bool) -> Vec<u8> {
        let len =
            ExtensionType::try_calculate_account_len::<TokenState>(&[ExtensionType::TransferHookAccount])
                .unwrap();
        let mut data = vec![0; len];
        let mut state = StateWithExtensionsMut::<TokenState>::unpack_uninitialized(&mut data).unwrap();
        state.init_extension::<TransferHookAccount>(true).unwrap().transferring =
            transferring.into();
        state.base = TokenState {
            mint: Pubkey::new_unique(),
            owner: Pubkey::new_unique(),
            amount: 10,
            delegate: COption::None,
            state: AccountState::Initialized,
            is_native: COption::None,
            delegated_amount: 0,
            close_authority: COption::None,
        };
        state.pack_base();
        state.init_account_type().unwrap();
        data
    }

    #[test]
    fn accepts_accounts_mid_transfer() {
        check_is_transferring(&hooked_token_account(true)).unwrap();
    }

    #[test]
    fn rejects_direct_invocation() {
        let err = check_is_transferring(&hooked_token_account(false)).unwrap_err();
        assert_eq!(
            ProgramError::from(err),
            ProgramError::from(TransferHookError::ProgramCalledOutsideOfTransfer)
        );
    }

    #[test]
    fn rejects_accounts_without_the_hook_extension() {
        let mut data = vec![0; TokenState::LEN];
        TokenState {
            mint: Pubkey::new_unique(),
            owner: Pubkey::new_unique(),
            state: AccountState::Initialized,
            ..TokenState::default()
        }
        .pack_into_slice(&mut data);
        assert!(check_is_transferring(&data).is_err());
    }
}
