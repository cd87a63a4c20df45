use anchor_lang::prelude::*;

use crate::events::CounterInitialized;
use crate::state::*;

#[derive(Accounts)]
pub struct InitializeCounter<'info> {
    #[account(mut)]
    pub authority: Signer<'info>,

    #[account(
        init_if_needed,
        payer = authority,
        space = Counter::LEN,
        seeds = [authority.key().as_ref()],
        bump,
    )]
    pub counter: Account<'info, Counter>,

    pub system_program: Program<'info, System>,
}

pub fn handler(ctx: Context<InitializeCounter>) -> Result<()> {
    // init_if_needed lets a second call reach this check instead of failing
    // inside the system program
    let counter = &mut ctx.accounts.counter;
    counter.ensure_uninitialized()?;

    counter.authority = ctx.accounts.authority.key();
    counter.count = 0;
    counter.bump = ctx.bumps.counter;

    msg!(
        "Counter {} initialized for {}",
        counter.key(),
        counter.authority
    );
    emit!(CounterInitialized {
        counter: counter.key(),
        authority: counter.authority,
        timestamp: Clock::get()?.unix_timestamp,
    });

    Ok(())
}
