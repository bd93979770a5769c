use anchor_lang::prelude::*;
use anchor_spl::token::{self, Transfer};

use crate::errors::StakingError;
use crate::events::RewardDistributedEvent;
use crate::utils;
use crate::DistributeReward;

/// Oracle-reported reward injection. The cash lands in the vault and
/// the claim is spread over all outstanding principal via the scaled
/// accumulator.
pub fn distribute_reward(ctx: Context<DistributeReward>, amount: u64) -> Result<()> {
    let cfg = &ctx.accounts.config;
    require!(!cfg.paused, StakingError::Paused);
    require_keys_eq!(
        cfg.oracle_authority,
        ctx.accounts.oracle.key(),
        StakingError::Unauthorized
    );
    require!(amount > 0, StakingError::InvalidAmount);

    token::transfer(
        CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.oracle_token_account.to_account_info(),
                to: ctx.accounts.stake_vault.to_account_info(),
                authority: ctx.accounts.oracle.to_account_info(),
            },
        ),
        amount,
    )?;

    let registry = &mut ctx.accounts.registry;
    utils::apply_reward(registry, amount)?;

    emit!(RewardDistributedEvent {
        amount,
        total_principal: registry.total_principal,
        reward_per_unit: registry.reward_per_unit,
        slot: Clock::get()?.slot,
    });

    Ok(())
}
