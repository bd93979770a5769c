use anchor_lang::prelude::*;

use crate::constants::{
    MAX_OPERATORS, MAX_PENDING_WITHDRAWALS, MAX_POOLS, MAX_READY_VALIDATORS, MAX_USER_POOLS,
};

#[account]
#[derive(InitSpace)]
pub struct Config {
    pub admin: Pubkey,
    pub bump: u8,

    /// Settlement observer: injects rewards and reports validator exits.
    pub oracle_authority: Pubkey,

    /// DKG collaborator allowed to submit validator descriptors.
    pub registrar: Pubkey,

    // SPL settlement plumbing
    pub stake_mint: Pubkey,
    pub stake_vault: Pubkey,
    pub stake_vault_bump: u8,
    pub treasury: Pubkey,
    pub treasury_bump: u8,

    pub pool_capacity: u64,
    pub operator_count: u8,

    // Additive fee schedule (basis points)
    pub operator_fee_bps: u16,
    pub network_fee_bps: u16,

    pub paused: bool,
    pub version: u16,
}

#[repr(u8)]
#[derive(PartialEq, Eq, Clone, Copy)]
pub enum PoolStatus {
    Open = 0,
    Staked = 1,
    Withdrawing = 2,
    Closed = 3,
}

#[repr(u8)]
#[derive(PartialEq, Eq, Clone, Copy)]
pub enum WithdrawalStatus {
    Pending = 0,
    Ready = 1,
    Completed = 2,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, InitSpace)]
pub struct ValidatorRecord {
    pub public_key: [u8; 48],
    #[max_len(MAX_OPERATORS)]
    pub operator_ids: Vec<u64>,
    pub withdrawal_credentials: [u8; 32],
    pub deposit_data_root: [u8; 32],

    /// sha256 over the full submission, encrypted shares included.
    /// Duplicate submissions are detected by digest.
    pub digest: [u8; 32],
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, InitSpace)]
pub struct Pool {
    pub id: u64,
    pub deposits: u64,
    pub status: u8,

    /// Projected reward stat for this pool (staked-pool split).
    pub rewards_allocated: u64,

    /// Closed-pool principal not yet dissolved into member idle claims.
    pub undissolved: u64,

    pub validator: Option<ValidatorRecord>,

    pub created_slot: u64,
    pub staked_slot: u64,
    pub closed_slot: u64,
}

#[account]
#[derive(InitSpace)]
pub struct StakeRegistry {
    pub admin: Pubkey,
    pub bump: u8,

    pub next_pool_id: u64,
    pub next_withdrawal_seq: u64,

    // Global reward accumulator (scaled by ACC_PRECISION)
    pub total_principal: u64,
    pub total_rewards: u64,
    pub reward_per_unit: u128,
    /// Scaled division remainder carried into the next reward event.
    pub reward_carry: u128,
    /// Remainder of the per-pool rewards_allocated projection.
    pub pool_reward_carry: u64,

    // Exit queue bookkeeping
    pub pending_total: u64,
    /// Vault cash reserved for Ready withdrawals.
    pub earmarked: u64,

    /// FIFO of Pending withdrawal seq ids.
    #[max_len(MAX_PENDING_WITHDRAWALS)]
    pub pending: Vec<u64>,

    /// FIFO of registered validator descriptors awaiting a pool.
    #[max_len(MAX_READY_VALIDATORS)]
    pub validators: Vec<ValidatorRecord>,

    /// Live pool set, ascending id. Fully dissolved Closed pools are pruned.
    #[max_len(MAX_POOLS)]
    pub pools: Vec<Pool>,

    pub version: u16,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, InitSpace)]
pub struct PoolShare {
    pub pool_id: u64,
    pub amount: u64,
}

#[account]
#[derive(InitSpace)]
pub struct UserAccount {
    pub user: Pubkey,
    pub bump: u8,

    /// Total outstanding principal (pooled + idle).
    pub principal: u64,

    /// Cash-backed principal returned by closed pools, not yet withdrawn.
    pub idle: u64,

    /// Principal reserved under Pending withdrawal requests.
    pub locked: u64,

    // Settled reward claim, exact in scaled units
    pub accrued_scaled: u128,
    pub reward_per_unit_paid: u128,

    #[max_len(MAX_USER_POOLS)]
    pub pool_shares: Vec<PoolShare>,

    pub created_slot: u64,
    pub updated_slot: u64,
}

#[account]
#[derive(InitSpace)]
pub struct WithdrawalRequest {
    pub seq: u64,
    pub user: Pubkey,
    pub bump: u8,

    /// Total requested amount.
    pub amount: u64,
    /// Portion paid out of accrued rewards.
    pub reward_part: u64,
    /// Portion paid out of principal.
    pub principal_part: u64,
    /// Staked-backed principal still waiting to be funded.
    pub remaining: u64,

    pub status: u8,

    pub created_slot: u64,
    pub ready_slot: u64,
    pub claimed_slot: u64,
}
