use anchor_lang::prelude::*;

pub mod constants;
pub mod contexts;
pub mod errors;
pub mod events;
pub mod instructions;
pub mod state;
pub mod utils;

pub use constants::*;
pub use contexts::*;
pub use errors::*;
pub use events::*;
pub use instructions::*;
pub use state::*;
pub use utils::*;

use solana_security_txt::security_txt;

security_txt! {
    // Required fields
    name: "Pooled Staking Manager",
    project_url: "https://pooledstaking.org",
    contacts: "email:security@pooledstaking.org,link:https://github.com/pooledstaking/pooled-staking/issues",
    policy: "https://github.com/pooledstaking/pooled-staking/blob/main/SECURITY.md",

    // Optional fields
    preferred_languages: "en",
    source_code: "https://github.com/pooledstaking/pooled-staking"
}

declare_id!("BkfmxeGZPVTjRyjr8VRfEz2BCcFpibKwQ9UDefuXPCPC");

#[program]
pub mod pooled_staking {
    use super::*;
    use crate::instructions::{admin, deposit, query, reward, upkeep, validator, withdraw};

    pub fn initialize_config(
        ctx: Context<InitializeConfig>,
        pool_capacity: u64,
        operator_count: u8,
        operator_fee_bps: u16,
        network_fee_bps: u16,
    ) -> Result<()> {
        admin::initialize_config(
            ctx,
            pool_capacity,
            operator_count,
            operator_fee_bps,
            network_fee_bps,
        )
    }

    pub fn initialize_registry(ctx: Context<InitializeRegistry>) -> Result<()> {
        admin::initialize_registry(ctx)
    }

    pub fn set_pause(ctx: Context<SetPause>, paused: bool) -> Result<()> {
        admin::set_pause(ctx, paused)
    }

    pub fn update_fee(ctx: Context<UpdateFee>, name: String, bps: u16) -> Result<()> {
        admin::update_fee(ctx, name, bps)
    }

    pub fn set_oracle_authority(
        ctx: Context<SetOracleAuthority>,
        new_authority: Pubkey,
    ) -> Result<()> {
        admin::set_oracle_authority(ctx, new_authority)
    }

    pub fn set_registrar(ctx: Context<SetRegistrar>, new_registrar: Pubkey) -> Result<()> {
        admin::set_registrar(ctx, new_registrar)
    }

    // core
    pub fn deposit<'info>(
        ctx: Context<'_, '_, 'info, 'info, Deposit<'info>>,
        gross_amount: u64,
    ) -> Result<()> {
        deposit::deposit(ctx, gross_amount)
    }

    pub fn distribute_reward(ctx: Context<DistributeReward>, amount: u64) -> Result<()> {
        reward::distribute_reward(ctx, amount)
    }

    pub fn request_withdrawal(ctx: Context<RequestWithdrawal>, amount: u64) -> Result<()> {
        withdraw::request_withdrawal(ctx, amount)
    }

    pub fn claim_withdrawal(ctx: Context<ClaimWithdrawal>, seq: u64) -> Result<()> {
        withdraw::claim_withdrawal(ctx, seq)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn register_validator(
        ctx: Context<RegisterValidator>,
        deposit_data_root: [u8; 32],
        public_key: [u8; 48],
        operator_ids: Vec<u64>,
        shares_encrypted: Vec<Vec<u8>>,
        shares_public_keys: Vec<Vec<u8>>,
        signature: [u8; 96],
        withdrawal_credentials: [u8; 32],
    ) -> Result<()> {
        validator::register_validator(
            ctx,
            deposit_data_root,
            public_key,
            operator_ids,
            shares_encrypted,
            shares_public_keys,
            signature,
            withdrawal_credentials,
        )
    }

    pub fn report_pool_exit(ctx: Context<ReportPoolExit>, pool_id: u64) -> Result<()> {
        validator::report_pool_exit(ctx, pool_id)
    }

    pub fn check_upkeep<'info>(
        ctx: Context<'_, '_, 'info, 'info, CheckUpkeep<'info>>,
    ) -> Result<UpkeepCheck> {
        upkeep::check_upkeep(ctx)
    }

    pub fn perform_upkeep<'info>(
        ctx: Context<'_, '_, 'info, 'info, PerformUpkeep<'info>>,
        actions: UpkeepActions,
    ) -> Result<()> {
        upkeep::perform_upkeep(ctx, actions)
    }

    // views
    pub fn get_fees(ctx: Context<GetFees>) -> Result<FeeBreakdown> {
        query::get_fees(ctx)
    }

    pub fn get_user_balance(ctx: Context<GetUserBalance>, user: Pubkey) -> Result<BalanceView> {
        query::get_user_balance(ctx, user)
    }

    pub fn get_pool_balance(ctx: Context<GetPoolBalance>, pool_id: u64) -> Result<PoolBalanceView> {
        query::get_pool_balance(ctx, pool_id)
    }

    pub fn get_open_pool_ids(ctx: Context<GetPoolIds>) -> Result<Vec<u64>> {
        query::get_open_pool_ids(ctx)
    }

    pub fn get_staked_pool_ids(ctx: Context<GetPoolIds>) -> Result<Vec<u64>> {
        query::get_staked_pool_ids(ctx)
    }
}
