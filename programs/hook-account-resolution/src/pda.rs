use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::program_error::ProgramError;
use anchor_lang::solana_program::pubkey::{MAX_SEEDS, MAX_SEED_LEN};

use crate::constants::EXTRA_ACCOUNT_METAS_SEED;
use crate::error::AccountResolutionError;

/// Deterministic address derivation, injected so resolution can be driven
/// by the runtime's PDA function or by a pure stand-in.
pub trait AddressDeriver {
    /// Derives the address for `seeds` under `program_id`. With a `bump`
    /// the bump is appended as a final seed; without one the canonical bump
    /// is searched for.
    fn derive_address(
        &self,
        seeds: &[&[u8]],
        bump: Option<u8>,
        program_id: &Pubkey,
    ) -> Result<Pubkey, ProgramError>;
}

/// The Solana program-derived address function.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProgramDerivedAddresses;

impl AddressDeriver for ProgramDerivedAddresses {
    fn derive_address(
        &self,
        seeds: &[&[u8]],
        bump: Option<u8>,
        program_id: &Pubkey,
    ) -> Result<Pubkey, ProgramError> {
        match bump {
            Some(bump) => {
                let bump = [bump];
                let mut with_bump = seeds.to_vec();
                with_bump.push(&bump);
                Pubkey::create_program_address(&with_bump, program_id)
                    .map_err(|_| AccountResolutionError::SeedResolutionFailed.into())
            }
            None => Pubkey::try_find_program_address(seeds, program_id)
                .map(|(address, _)| address)
                .ok_or_else(|| AccountResolutionError::SeedResolutionFailed.into()),
        }
    }
}

/// Rejects seed sets the derivation scheme cannot accept. The bump always
/// takes a seed slot: a missing one is searched for and appended.
pub fn check_seed_bounds(seeds: &[&[u8]]) -> Result<(), ProgramError> {
    if seeds.len() + 1 > MAX_SEEDS || seeds.iter().any(|seed| seed.len() > MAX_SEED_LEN) {
        return Err(AccountResolutionError::SeedResolutionFailed.into());
    }
    Ok(())
}

/// Address of the extra-account-meta list for `mint` under the hook program.
pub fn extra_account_metas_address<D: AddressDeriver + ?Sized>(
    deriver: &D,
    mint: &Pubkey,
    hook_program_id: &Pubkey,
) -> Result<Pubkey, ProgramError> {
    deriver.derive_address(
        &[EXTRA_ACCOUNT_METAS_SEED, mint.as_ref()],
        None,
        hook_program_id,
    )
}

/// Fails with `AddressMismatch` unless `list_address` is the list PDA of
/// `mint`.
pub fn check_extra_account_metas_address<D: AddressDeriver + ?Sized>(
    deriver: &D,
    list_address: &Pubkey,
    mint: &Pubkey,
    hook_program_id: &Pubkey,
) -> Result<(), ProgramError> {
    let expected = extra_account_metas_address(deriver, mint, hook_program_id)?;
    if expected.to_bytes() != list_address.to_bytes() {
        return Err(AccountResolutionError::AddressMismatch.into());
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_utils {
    use super::*;
    use anchor_lang::solana_program::hash::hashv;

    /// Pure stand-in for PDA derivation: a hash of the seeds, bump and
    /// program id. Deterministic and collision-resistant, never off-curve
    /// checked.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct HashDeriver;

    impl AddressDeriver for HashDeriver {
        fn derive_address(
            &self,
            seeds: &[&[u8]],
            bump: Option<u8>,
            program_id: &Pubkey,
        ) -> Result<Pubkey, ProgramError> {
            check_seed_bounds(seeds)?;
            let bump = [bump.unwrap_or(u8::MAX)];
            let lens: Vec<[u8; 1]> = seeds.iter().map(|seed| [seed.len() as u8]).collect();
            let mut input: Vec<&[u8]> = Vec::with_capacity(seeds.len() * 2 + 3);
            for (seed, len) in seeds.iter().zip(&lens) {
                input.push(len);
                input.push(seed);
            }
            input.push(&bump);
            input.push(program_id.as_ref());
            input.push(b"mock-program-derived-address");
            Ok(Pubkey::new_from_array(hashv(&input).to_bytes()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::HashDeriver;
    use super::*;

    #[test]
    fn list_address_matches_the_interface_derivation() {
        let mint = Pubkey::new_unique();
        let program_id = Pubkey::new_unique();
        let derived =
            extra_account_metas_address(&ProgramDerivedAddresses, &mint, &program_id).unwrap();
        assert_eq!(
            derived,
            spl_transfer_hook_interface::get_extra_account_metas_address(&mint, &program_id)
        );
    }

    #[test]
    fn explicit_bump_reproduces_the_canonical_address() {
        let program_id = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let (expected, bump) = Pubkey::find_program_address(&[owner.as_ref()], &program_id);
        let derived = ProgramDerivedAddresses
            .derive_address(&[owner.as_ref()], Some(bump), &program_id)
            .unwrap();
        assert_eq!(derived, expected);
    }

    #[test]
    fn spoofed_list_address_is_a_mismatch() {
        let mint = Pubkey::new_unique();
        let program_id = Pubkey::new_unique();
        let genuine = extra_account_metas_address(&HashDeriver, &mint, &program_id).unwrap();
        check_extra_account_metas_address(&HashDeriver, &genuine, &mint, &program_id).unwrap();

        let other_mint = Pubkey::new_unique();
        let foreign = extra_account_metas_address(&HashDeriver, &other_mint, &program_id).unwrap();
        assert_eq!(
            check_extra_account_metas_address(&HashDeriver, &foreign, &mint, &program_id)
                .unwrap_err(),
            ProgramError::from(AccountResolutionError::AddressMismatch)
        );
    }

    #[test]
    fn seed_bounds() {
        let long = [0u8; MAX_SEED_LEN + 1];
        assert!(check_seed_bounds(&[&long[..]]).is_err());
        let short: &[u8] = b"s";
        let most = vec![short; MAX_SEEDS - 1];
        assert!(check_seed_bounds(&most).is_ok());
        // no room left for the bump
        let many = vec![short; MAX_SEEDS];
        assert!(check_seed_bounds(&many).is_err());
    }

    #[test]
    fn mock_and_runtime_agree_on_a_full_seed_set() {
        let program_id = Pubkey::new_unique();
        let short: &[u8] = b"s";
        let many = vec![short; MAX_SEEDS];
        assert!(ProgramDerivedAddresses
            .derive_address(&many, None, &program_id)
            .is_err());
        assert!(HashDeriver.derive_address(&many, None, &program_id).is_err());

        let most = &many[..MAX_SEEDS - 1];
        assert!(ProgramDerivedAddresses
            .derive_address(most, None, &program_id)
            .is_ok());
        assert!(HashDeriver.derive_address(most, None, &program_id).is_ok());
    }
}
