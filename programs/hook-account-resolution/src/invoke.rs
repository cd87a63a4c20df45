//! The runtime side of a hooked transfer.
//!
//! A transfer moves through
//! `BaseTransferPending -> BaseTransferApplied -> HookInvoked -> {HookAccepted, HookRejected}`.
//! Every phase runs against a staged copy of the account store; the copy
//! replaces the caller's store only once the hook accepts.

use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::Instruction;
use anchor_lang::solana_program::program_error::ProgramError;

use crate::constants::BASE_ACCOUNT_COUNT;
use crate::error::AccountResolutionError;
use crate::pda::{extra_account_metas_address, AddressDeriver};
use crate::resolve::{
    execute_instruction_data, AccountDataSource, AssembledAccounts, Resolver, TransferAccounts,
};
use crate::state::ExtraAccountMetaList;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookPhase {
    BaseTransferPending,
    BaseTransferApplied,
    HookInvoked,
    HookAccepted,
    HookRejected,
}

/// Drives one transfer through its base effect and its hook.
pub struct HookedTransfer<'a, D: ?Sized> {
    hook_program_id: Pubkey,
    deriver: &'a D,
    phase: HookPhase,
}

impl<'a, D> HookedTransfer<'a, D>
where
    D: AddressDeriver + ?Sized,
{
    pub fn new(hook_program_id: Pubkey, deriver: &'a D) -> Self {
        Self {
            hook_program_id,
            deriver,
            phase: HookPhase::BaseTransferPending,
        }
    }

    pub fn phase(&self) -> HookPhase {
        self.phase
    }

    /// Runs `transfer` (a base transfer hydrated by the client) against
    /// `store`. `base_transfer` applies the value movement, `hook` executes
    /// the synthetic Execute instruction. Any error leaves `store` as it was.
    pub fn execute<S, B, H>(
        &mut self,
        store: &mut S,
        transfer: &Instruction,
        amount: u64,
        base_transfer: B,
        hook: H,
    ) -> std::result::Result<(), ProgramError>
    where
        S: AccountDataSource + Clone,
        B: FnOnce(&mut S) -> std::result::Result<(), ProgramError>,
        H: FnOnce(&mut S, &Instruction) -> std::result::Result<(), ProgramError>,
    {
        let mut staged = store.clone();

        base_transfer(&mut staged)?;
        self.phase = HookPhase::BaseTransferApplied;

        // a spoofed list or tampered extras reject the transfer like the hook would
        let assembled = match self.assemble(&staged, transfer, amount) {
            Ok(assembled) => assembled,
            Err(err) => {
                self.phase = HookPhase::HookRejected;
                msg!("Transfer hook accounts rejected: {}", err);
                return Err(err);
            }
        };
        let execute = assembled.execute_instruction(amount);

        self.phase = HookPhase::HookInvoked;
        msg!(
            "Invoking transfer hook {} with {} accounts",
            self.hook_program_id,
            execute.accounts.len()
        );
        if let Err(err) = hook(&mut staged, &execute) {
            self.phase = HookPhase::HookRejected;
            msg!("Transfer hook rejected: {}", err);
            return Err(err);
        }

        self.phase = HookPhase::HookAccepted;
        *store = staged;
        Ok(())
    }

    /// Re-resolves the mint's list and checks the accounts the client
    /// appended to `transfer` against it.
    pub fn assemble<S>(
        &self,
        store: &S,
        transfer: &Instruction,
        amount: u64,
    ) -> std::result::Result<AssembledAccounts, ProgramError>
    where
        S: AccountDataSource + ?Sized,
    {
        let keys: Vec<Pubkey> = transfer.accounts.iter().map(|meta| meta.pubkey).collect();
        let base = TransferAccounts::from_keys(&keys)?;
        let list_address =
            extra_account_metas_address(self.deriver, &base.mint, &self.hook_program_id)?;

        // trailing [hook program, list] supplied by the client
        let supplied = &transfer.accounts[BASE_ACCOUNT_COUNT..];
        match supplied {
            [.., program, list] => {
                if program.pubkey != self.hook_program_id || list.pubkey != list_address {
                    return Err(AccountResolutionError::AddressMismatch.into());
                }
            }
            _ => return Err(AccountResolutionError::NotEnoughAccounts.into()),
        }

        let list = ExtraAccountMetaList::unpack(&store.account_data(&list_address)?)?;
        let assembled = Resolver::new(self.hook_program_id, self.deriver, store).resolve(
            &base,
            &execute_instruction_data(amount),
            &list_address,
            &list,
        )?;

        let supplied_extras = &supplied[..supplied.len() - 2];
        if supplied_extras != assembled.extras.as_slice() {
            return Err(AccountResolutionError::AddressMismatch.into());
        }
        Ok(assembled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::ExtraAccountMeta;
    use crate::pda::test_utils::HashDeriver;
    use crate::resolve::add_extra_accounts_to_instruction;
    use crate::seeds::Seed;
    use anchor_lang::solana_program::instruction::AccountMeta;
    use std::collections::BTreeMap;

    type Store = BTreeMap<Pubkey, Vec<u8>>;

    struct Fixture {
        hook_program_id: Pubkey,
        source: Pubkey,
        mint: Pubkey,
        destination: Pubkey,
        owner: Pubkey,
        marker: Pubkey,
        store: Store,
    }

    impl Fixture {
        fn new() -> Self {
            let hook_program_id = Pubkey::new_unique();
            let mint = Pubkey::new_unique();
            let owner = Pubkey::new_unique();
            let list = ExtraAccountMetaList::new(vec![ExtraAccountMeta::new_with_seeds(
                Seed::address(&hook_program_id),
                vec![Seed::literal(*b"marker"), Seed::account_key(3)],
                false,
                true,
            )])
            .unwrap();
            let mut data = vec![0; list.packed_len()];
            list.init(&mut data).unwrap();

            let list_address =
                extra_account_metas_address(&HashDeriver, &mint, &hook_program_id).unwrap();
            let marker = HashDeriver
                .derive_address(&[&b"marker"[..], owner.as_ref()], None, &hook_program_id)
                .unwrap();
            let source = Pubkey::new_unique();
            let destination = Pubkey::new_unique();

            let mut store = Store::new();
            store.insert(list_address, data);
            store.insert(source, 100u64.to_le_bytes().to_vec());
            store.insert(destination, 0u64.to_le_bytes().to_vec());
            store.insert(marker, vec![0]);
            Self {
                hook_program_id,
                source,
                mint,
                destination,
                owner,
                marker,
                store,
            }
        }

        fn hydrated_transfer(&self, amount: u64) -> Instruction {
            let mut ix = Instruction {
                program_id: Pubkey::new_unique(),
                accounts: vec![
                    AccountMeta::new(self.source, false),
                    AccountMeta::new_readonly(self.mint, false),
                    AccountMeta::new(self.destination, false),
                    AccountMeta::new_readonly(self.owner, true),
                ],
                data: amount.to_le_bytes().to_vec(),
            };
            add_extra_accounts_to_instruction(
                &mut ix,
                &self.hook_program_id,
                amount,
                &self.store,
                &HashDeriver,
            )
            .unwrap();
            ix
        }

        fn move_balance(
            &self,
            amount: u64,
        ) -> impl FnOnce(&mut Store) -> std::result::Result<(), ProgramError> + '_ {
            move |store| {
                let read = |store: &Store, key: &Pubkey| {
                    u64::from_le_bytes(store[key][..8].try_into().unwrap())
                };
                let from = read(store, &self.source)
                    .checked_sub(amount)
                    .ok_or(ProgramError::InsufficientFunds)?;
                let to = read(store, &self.destination) + amount;
                store.insert(self.source, from.to_le_bytes().to_vec());
                store.insert(self.destination, to.to_le_bytes().to_vec());
                Ok(())
            }
        }

        /// Stand-in hook: checks the list slot and bumps the marker byte.
        fn hook(
            &self,
        ) -> impl FnOnce(&mut Store, &Instruction) -> std::result::Result<(), ProgramError> + '_
        {
            move |store, ix| {
                let list_address =
                    extra_account_metas_address(&HashDeriver, &self.mint, &self.hook_program_id)?;
                if ix.accounts[4].pubkey != list_address {
                    return Err(AccountResolutionError::AddressMismatch.into());
                }
                let marker = store
                    .get_mut(&ix.accounts[5].pubkey)
                    .ok_or(ProgramError::UninitializedAccount)?;
                marker[0] += 1;
                Ok(())
            }
        }
    }

    #[test]
    fn accepted_hook_commits_everything() {
        let fixture = Fixture::new();
        let transfer = fixture.hydrated_transfer(30);
        let mut store = fixture.store.clone();

        let mut run = HookedTransfer::new(fixture.hook_program_id, &HashDeriver);
        assert_eq!(run.phase(), HookPhase::BaseTransferPending);
        run.execute(
            &mut store,
            &transfer,
            30,
            fixture.move_balance(30),
            fixture.hook(),
        )
        .unwrap();

        assert_eq!(run.phase(), HookPhase::HookAccepted);
        assert_eq!(store[&fixture.source], 70u64.to_le_bytes().to_vec());
        assert_eq!(store[&fixture.destination], 30u64.to_le_bytes().to_vec());
        assert_eq!(store[&fixture.marker], vec![1]);
    }

    #[test]
    fn execute_instruction_mirrors_the_client_resolution() {
        let fixture = Fixture::new();
        let transfer = fixture.hydrated_transfer(9);
        let run = HookedTransfer::new(fixture.hook_program_id, &HashDeriver);
        let assembled = run.assemble(&fixture.store, &transfer, 9).unwrap();

        let execute = assembled.execute_instruction(9);
        assert_eq!(
            execute.accounts[5..],
            transfer.accounts[4..transfer.accounts.len() - 2]
        );
        assert_eq!(execute.accounts[5].pubkey, fixture.marker);
    }

    #[test]
    fn rejected_hook_unwinds_the_base_transfer() {
        let fixture = Fixture::new();
        let transfer = fixture.hydrated_transfer(30);
        let mut store = fixture.store.clone();

        let mut run = HookedTransfer::new(fixture.hook_program_id, &HashDeriver);
        let err = run
            .execute(
                &mut store,
                &transfer,
                30,
                fixture.move_balance(30),
                |_: &mut Store, _: &Instruction| Err(ProgramError::Custom(77)),
            )
            .unwrap_err();

        assert_eq!(err, ProgramError::Custom(77));
        assert_eq!(run.phase(), HookPhase::HookRejected);
        assert_eq!(store, fixture.store);
    }

    #[test]
    fn spoofed_list_account_never_reaches_the_hook() {
        let fixture = Fixture::new();
        let mut transfer = fixture.hydrated_transfer(10);
        let last = transfer.accounts.len() - 1;
        transfer.accounts[last].pubkey = Pubkey::new_unique();
        let mut store = fixture.store.clone();

        let mut run = HookedTransfer::new(fixture.hook_program_id, &HashDeriver);
        let err = run
            .execute(
                &mut store,
                &transfer,
                10,
                fixture.move_balance(10),
                fixture.hook(),
            )
            .unwrap_err();

        assert_eq!(err, ProgramError::from(AccountResolutionError::AddressMismatch));
        assert_eq!(run.phase(), HookPhase::HookRejected);
        assert_eq!(store, fixture.store);
    }

    #[test]
    fn tampered_extra_account_is_a_mismatch() {
        let fixture = Fixture::new();
        let mut transfer = fixture.hydrated_transfer(10);
        transfer.accounts[4].pubkey = Pubkey::new_unique();
        let mut store = fixture.store.clone();

        let mut run = HookedTransfer::new(fixture.hook_program_id, &HashDeriver);
        let err = run
            .execute(
                &mut store,
                &transfer,
                10,
                fixture.move_balance(10),
                fixture.hook(),
            )
            .unwrap_err();
        assert_eq!(err, ProgramError::from(AccountResolutionError::AddressMismatch));
        assert_eq!(run.phase(), HookPhase::HookRejected);
        assert_eq!(store, fixture.store);
    }

    #[test]
    fn failed_base_transfer_never_invokes_the_hook() {
        let fixture = Fixture::new();
        let transfer = fixture.hydrated_transfer(500);
        let mut store = fixture.store.clone();

        let mut run = HookedTransfer::new(fixture.hook_program_id, &HashDeriver);
        let err = run
            .execute(
                &mut store,
                &transfer,
                500,
                fixture.move_balance(500),
                |_: &mut Store, _: &Instruction| -> std::result::Result<(), ProgramError> {
                    unreachable!("hook must not run")
                },
            )
            .unwrap_err();
        assert_eq!(err, ProgramError::InsufficientFunds);
        assert_eq!(run.phase(), HookPhase::BaseTransferPending);
        assert_eq!(store, fixture.store);
    }
}
