use anchor_lang::prelude::*;

#[error_code]
pub enum CounterHookError {
    #[msg("Signer is not the mint's transfer hook authority")]
    InvalidAuthority,

    #[msg("Mint does not route its transfer hook to this program")]
    HookProgramMismatch,

    #[msg("Counter is already initialized")]
    AlreadyInitialized,

    #[msg("Counter would overflow")]
    CounterOverflow,
}
