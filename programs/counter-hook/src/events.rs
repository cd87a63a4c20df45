use anchor_lang::prelude::*;

#[event]
pub struct CounterInitialized {
    pub counter: Pubkey,
    pub authority: Pubkey,
    pub timestamp: i64,
}

#[event]
pub struct ExtraAccountMetaListInitialized {
    pub mint: Pubkey,
    pub extra_account_meta_list: Pubkey,
    pub authority: Pubkey,
    pub entry_count: u32,
    pub timestamp: i64,
}

#[event]
pub struct TransferHooked {
    pub mint: Pubkey,
    pub source: Pubkey,
    pub destination: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
    pub counter: Pubkey,
    pub count: u64,
    pub timestamp: i64,
}
