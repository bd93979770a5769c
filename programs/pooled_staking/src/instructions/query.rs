use anchor_lang::prelude::*;

use crate::errors::StakingError;
use crate::utils::{self, BalanceView, FeeBreakdown, PoolBalanceView};
use crate::{GetFees, GetPoolBalance, GetPoolIds, GetUserBalance};

pub fn get_fees(ctx: Context<GetFees>) -> Result<FeeBreakdown> {
    let cfg = &ctx.accounts.config;
    let total_bps = cfg
        .operator_fee_bps
        .checked_add(cfg.network_fee_bps)
        .ok_or(StakingError::MathOverflow)?;
    Ok(FeeBreakdown {
        operator_bps: cfg.operator_fee_bps,
        network_bps: cfg.network_fee_bps,
        total_bps,
    })
}

pub fn get_user_balance(ctx: Context<GetUserBalance>, _user: Pubkey) -> Result<BalanceView> {
    let registry = &ctx.accounts.registry;
    let user_account = &ctx.accounts.user_account;
    Ok(BalanceView {
        stake: user_account.principal,
        rewards: utils::projected_rewards(registry, user_account)?,
    })
}

pub fn get_pool_balance(ctx: Context<GetPoolBalance>, pool_id: u64) -> Result<PoolBalanceView> {
    let pool = ctx
        .accounts
        .registry
        .pools
        .iter()
        .find(|p| p.id == pool_id)
        .ok_or(StakingError::UnknownPool)?;
    Ok(PoolBalanceView {
        deposits: pool.deposits,
        rewards_allocated: pool.rewards_allocated,
    })
}

pub fn get_open_pool_ids(ctx: Context<GetPoolIds>) -> Result<Vec<u64>> {
    Ok(utils::open_pool_ids(&ctx.accounts.registry))
}

pub fn get_staked_pool_ids(ctx: Context<GetPoolIds>) -> Result<Vec<u64>> {
    Ok(utils::staked_pool_ids(&ctx.accounts.registry))
}
