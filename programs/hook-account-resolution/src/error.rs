use anchor_lang::solana_program::program_error::ProgramError;

/// Errors raised while building, decoding or resolving an extra-account-meta
/// list, and while routing a transfer into its hook.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum AccountResolutionError {
    // Construction-time
    #[error("Seed record is malformed")]
    MalformedSeed = 9100,
    #[error("Seed nesting exceeds the maximum depth")]
    SeedTooDeep,
    #[error("Account is too small to hold the extra account meta list")]
    AccountTooSmall,
    #[error("Entry references an account that is only resolved after it")]
    ForwardReference,
    #[error("Too many extra account metas")]
    TooManyEntries,
    #[error("Extra account meta list is already initialized")]
    ListAlreadyInitialized,

    // Decoding
    #[error("Account does not carry the extra account meta list discriminator")]
    InvalidDiscriminator,
    #[error("Extra account meta list is shorter than its declared count")]
    TruncatedList,

    // Resolution-time
    #[error("Seed references an account outside the assembled list")]
    UnresolvedReference,
    #[error("Seed slices beyond the end of the instruction data")]
    InstructionDataOutOfRange,
    #[error("Seed slices beyond the end of the referenced account data")]
    AccountDataOutOfRange,
    #[error("Referenced account was not found")]
    AccountNotFound,
    #[error("Seeds could not be resolved into an address")]
    SeedResolutionFailed,
    #[error("Instruction is missing the base transfer accounts")]
    NotEnoughAccounts,

    // Runtime
    #[error("Supplied account does not match the derived address")]
    AddressMismatch,
}

impl From<AccountResolutionError> for ProgramError {
    fn from(e: AccountResolutionError) -> Self {
        ProgramError::Custom(e as u32)
    }
}
