/// Seed prefix of the extra-account-meta list PDA.
/// Seeds: [b"extra-account-metas", mint.key().as_ref()]
pub const EXTRA_ACCOUNT_METAS_SEED: &[u8] = b"extra-account-metas";

/// Accounts every Execute instruction starts with: source, mint,
/// destination, owner.
pub const BASE_ACCOUNT_COUNT: usize = 4;
pub const SOURCE_INDEX: usize = 0;
pub const MINT_INDEX: usize = 1;
pub const DESTINATION_INDEX: usize = 2;
pub const OWNER_INDEX: usize = 3;
/// Position of the list account in the Execute instruction.
pub const LIST_ACCOUNT_INDEX: usize = 4;
/// Position of the first resolved extra account in the Execute instruction.
pub const FIRST_EXTRA_INDEX: usize = 5;

/// Limits
pub const MAX_EXTRA_ACCOUNT_METAS: usize = 32;
pub const MAX_SEED_DEPTH: usize = 4;
