use anchor_lang::prelude::*;

use crate::constants::*;
use crate::errors::StakingError;
use crate::events::FeeUpdatedEvent;
use crate::{
    InitializeConfig, InitializeRegistry, SetOracleAuthority, SetPause, SetRegistrar, UpdateFee,
};

pub fn initialize_config(
    ctx: Context<InitializeConfig>,
    pool_capacity: u64,
    operator_count: u8,
    operator_fee_bps: u16,
    network_fee_bps: u16,
) -> Result<()> {
    require!(pool_capacity > 0, StakingError::InvalidPoolCapacity);
    require!(
        operator_count >= 1 && (operator_count as usize) <= MAX_OPERATORS,
        StakingError::InvalidOperatorCount
    );
    require!(operator_fee_bps <= 10_000, StakingError::InvalidFeeBps);
    require!(network_fee_bps <= 10_000, StakingError::InvalidFeeBps);

    let cfg = &mut ctx.accounts.config;

    cfg.admin = ctx.accounts.admin.key();
    cfg.bump = ctx.bumps.config;

    // oracle and registrar start as the admin until rotated
    cfg.oracle_authority = ctx.accounts.admin.key();
    cfg.registrar = ctx.accounts.admin.key();

    // SPL token plumbing
    cfg.stake_mint = ctx.accounts.stake_mint.key();
    cfg.stake_vault = ctx.accounts.stake_vault.key();
    cfg.stake_vault_bump = ctx.bumps.stake_vault;
    cfg.treasury = ctx.accounts.treasury.key();
    cfg.treasury_bump = ctx.bumps.treasury;

    cfg.pool_capacity = pool_capacity;
    cfg.operator_count = operator_count;
    cfg.operator_fee_bps = operator_fee_bps;
    cfg.network_fee_bps = network_fee_bps;

    cfg.paused = false;
    cfg.version = INITIAL_VERSION;

    Ok(())
}

pub fn initialize_registry(ctx: Context<InitializeRegistry>) -> Result<()> {
    let cfg = &ctx.accounts.config;
    require_keys_eq!(cfg.admin, ctx.accounts.admin.key(), StakingError::Unauthorized);

    let reg = &mut ctx.accounts.registry;
    reg.admin = cfg.admin;
    reg.bump = ctx.bumps.registry;

    reg.next_pool_id = 0;
    reg.next_withdrawal_seq = 0;

    reg.total_principal = 0;
    reg.total_rewards = 0;
    reg.reward_per_unit = 0;
    reg.reward_carry = 0;
    reg.pool_reward_carry = 0;

    reg.pending_total = 0;
    reg.earmarked = 0;

    reg.version = INITIAL_VERSION;

    Ok(())
}

pub fn set_pause(ctx: Context<SetPause>, paused: bool) -> Result<()> {
    let cfg = &mut ctx.accounts.config;
    require_keys_eq!(cfg.admin, ctx.accounts.admin.key(), StakingError::Unauthorized);
    cfg.paused = paused;
    Ok(())
}

/// Fees are addressed by name so the client never has to know the
/// field layout: "operator" or "network".
pub fn update_fee(ctx: Context<UpdateFee>, name: String, bps: u16) -> Result<()> {
    let cfg = &mut ctx.accounts.config;
    require_keys_eq!(cfg.admin, ctx.accounts.admin.key(), StakingError::Unauthorized);
    require!(bps <= 10_000, StakingError::InvalidFeeBps);

    match name.as_str() {
        "operator" => cfg.operator_fee_bps = bps,
        "network" => cfg.network_fee_bps = bps,
        _ => return err!(StakingError::UnknownFee),
    }

    emit!(FeeUpdatedEvent {
        name,
        bps,
        slot: Clock::get()?.slot,
    });

    Ok(())
}

pub fn set_oracle_authority(ctx: Context<SetOracleAuthority>, new_authority: Pubkey) -> Result<()> {
    let cfg = &mut ctx.accounts.config;
    require_keys_eq!(cfg.admin, ctx.accounts.admin.key(), StakingError::Unauthorized);
    cfg.oracle_authority = new_authority;
    Ok(())
}

pub fn set_registrar(ctx: Context<SetRegistrar>, new_registrar: Pubkey) -> Result<()> {
    let cfg = &mut ctx.accounts.config;
    require_keys_eq!(cfg.admin, ctx.accounts.admin.key(), StakingError::Unauthorized);
    cfg.registrar = new_registrar;
    Ok(())
}
