//! Extra-account-meta lists for Token-2022 transfer hooks.
//!
//! A list stored at `["extra-account-metas", mint]` under the hook program
//! describes which accounts, beyond source, mint, destination and owner, a
//! transfer of that mint has to carry. The same resolution runs on the
//! client, to hydrate the transfer, and in the runtime, to build the
//! Execute instruction sent to the hook.

pub mod account;
pub mod constants;
pub mod error;
pub mod invoke;
pub mod pda;
pub mod resolve;
pub mod seeds;
pub mod state;

pub use account::{ExtraAccountMeta, MetaKind};
pub use error::AccountResolutionError;
pub use invoke::{HookPhase, HookedTransfer};
pub use pda::{AddressDeriver, ProgramDerivedAddresses};
pub use resolve::{
    add_extra_accounts_to_instruction, execute_instruction_data, AccountDataSource,
    AssembledAccounts, Resolver, TransferAccounts,
};
pub use seeds::Seed;
pub use state::ExtraAccountMetaList;
