/// PDA seeds
/// List: [b"extra-account-metas", mint.key().as_ref()]
/// Counter: [authority.key().as_ref()]
pub use hook_account_resolution::constants::EXTRA_ACCOUNT_METAS_SEED;

/// Position of the counter among the Execute accounts (first extra account).
pub const COUNTER_ACCOUNT_INDEX: usize = hook_account_resolution::constants::FIRST_EXTRA_INDEX;
