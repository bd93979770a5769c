// programs/pooled_staking/src/contexts.rs

use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};

use crate::state::{Config, StakeRegistry, UserAccount, WithdrawalRequest};

#[derive(Accounts)]
pub struct InitializeConfig<'info> {
    #[account(
        init,
        payer = admin,
        space = 8 + Config::INIT_SPACE,
        seeds = [crate::CONFIG_SEED],
        bump
    )]
    pub config: Account<'info, Config>,

    /// SPL mint of the staked asset (created off-chain in tests or deploy script)
    pub stake_mint: Account<'info, Mint>,

    /// Principal vault, TokenAccount PDA with authority = config PDA
    #[account(
        init,
        payer = admin,
        seeds = [crate::STAKE_VAULT_SEED],
        bump,
        token::mint = stake_mint,
        token::authority = config
    )]
    pub stake_vault: Account<'info, TokenAccount>,

    /// Fee treasury, TokenAccount PDA with authority = config PDA
    #[account(
        init,
        payer = admin,
        seeds = [crate::TREASURY_SEED],
        bump,
        token::mint = stake_mint,
        token::authority = config
    )]
    pub treasury: Account<'info, TokenAccount>,

    #[account(mut)]
    pub admin: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
    pub rent: Sysvar<'info, Rent>,
}

#[derive(Accounts)]
pub struct InitializeRegistry<'info> {
    #[account(
        mut,
        seeds = [crate::CONFIG_SEED],
        bump = config.bump,
    )]
    pub config: Account<'info, Config>,

    #[account(
        init,
        payer = admin,
        space = 8 + StakeRegistry::INIT_SPACE,
        seeds = [crate::REGISTRY_SEED, config.key().as_ref()],
        bump
    )]
    pub registry: Account<'info, StakeRegistry>,

    #[account(mut)]
    pub admin: Signer<'info>,

    pub system_program: Program<'info, System>,
    pub rent: Sysvar<'info, Rent>,
}

#[derive(Accounts)]
pub struct SetPause<'info> {
    #[account(
        mut,
        seeds = [crate::CONFIG_SEED],
        bump = config.bump
    )]
    pub config: Account<'info, Config>,

    pub admin: Signer<'info>,
}

#[derive(Accounts)]
pub struct UpdateFee<'info> {
    #[account(
        mut,
        seeds = [crate::CONFIG_SEED],
        bump = config.bump
    )]
    pub config: Account<'info, Config>,

    pub admin: Signer<'info>,
}

#[derive(Accounts)]
pub struct SetOracleAuthority<'info> {
    #[account(
        mut,
        seeds = [crate::CONFIG_SEED],
        bump = config.bump
    )]
    pub config: Account<'info, Config>,

    pub admin: Signer<'info>,
}

#[derive(Accounts)]
pub struct SetRegistrar<'info> {
    #[account(
        mut,
        seeds = [crate::CONFIG_SEED],
        bump = config.bump
    )]
    pub config: Account<'info, Config>,

    pub admin: Signer<'info>,
}

#[derive(Accounts)]
pub struct Deposit<'info> {
    #[account(
        seeds = [crate::CONFIG_SEED],
        bump = config.bump
    )]
    pub config: Account<'info, Config>,

    #[account(address = config.stake_mint)]
    pub stake_mint: Account<'info, Mint>,

    #[account(
        mut,
        seeds = [crate::REGISTRY_SEED, config.key().as_ref()],
        bump = registry.bump,
    )]
    pub registry: Account<'info, StakeRegistry>,

    #[account(
        init_if_needed,
        payer = user,
        space = 8 + UserAccount::INIT_SPACE,
        seeds = [crate::USER_SEED, user.key().as_ref()],
        bump
    )]
    pub user_account: Account<'info, UserAccount>,

    #[account(
        mut,
        constraint = user_token_account.mint == stake_mint.key() @ crate::errors::StakingError::StakeMintMismatch,
        constraint = user_token_account.owner == user.key()
    )]
    pub user_token_account: Account<'info, TokenAccount>,

    #[account(mut, address = config.stake_vault)]
    pub stake_vault: Account<'info, TokenAccount>,

    #[account(mut, address = config.treasury)]
    pub treasury: Account<'info, TokenAccount>,

    #[account(mut)]
    pub user: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
    pub rent: Sysvar<'info, Rent>,
    // pending (request, owner) account pairs via remaining_accounts (writable)
}

#[derive(Accounts)]
pub struct DistributeReward<'info> {
    #[account(
        seeds = [crate::CONFIG_SEED],
        bump = config.bump
    )]
    pub config: Account<'info, Config>,

    #[account(address = config.stake_mint)]
    pub stake_mint: Account<'info, Mint>,

    #[account(
        mut,
        seeds = [crate::REGISTRY_SEED, config.key().as_ref()],
        bump = registry.bump,
    )]
    pub registry: Account<'info, StakeRegistry>,

    #[account(
        mut,
        constraint = oracle_token_account.mint == stake_mint.key() @ crate::errors::StakingError::StakeMintMismatch,
        constraint = oracle_token_account.owner == oracle.key()
    )]
    pub oracle_token_account: Account<'info, TokenAccount>,

    #[account(mut, address = config.stake_vault)]
    pub stake_vault: Account<'info, TokenAccount>,

    #[account(mut)]
    pub oracle: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct RequestWithdrawal<'info> {
    #[account(
        seeds = [crate::CONFIG_SEED],
        bump = config.bump
    )]
    pub config: Account<'info, Config>,

    #[account(
        mut,
        seeds = [crate::REGISTRY_SEED, config.key().as_ref()],
        bump = registry.bump,
    )]
    pub registry: Account<'info, StakeRegistry>,

    #[account(
        mut,
        seeds = [crate::USER_SEED, user.key().as_ref()],
        bump = user_account.bump,
    )]
    pub user_account: Account<'info, UserAccount>,

    #[account(
        init,
        payer = user,
        space = 8 + WithdrawalRequest::INIT_SPACE,
        seeds = [crate::WITHDRAWAL_SEED, registry.next_withdrawal_seq.to_le_bytes().as_ref()],
        bump
    )]
    pub request: Account<'info, WithdrawalRequest>,

    #[account(mut)]
    pub user: Signer<'info>,

    pub system_program: Program<'info, System>,
    pub rent: Sysvar<'info, Rent>,
}

#[derive(Accounts)]
#[instruction(seq: u64)]
pub struct ClaimWithdrawal<'info> {
    #[account(
        seeds = [crate::CONFIG_SEED],
        bump = config.bump
    )]
    pub config: Account<'info, Config>,

    #[account(address = config.stake_mint)]
    pub stake_mint: Account<'info, Mint>,

    #[account(
        mut,
        seeds = [crate::REGISTRY_SEED, config.key().as_ref()],
        bump = registry.bump,
    )]
    pub registry: Account<'info, StakeRegistry>,

    #[account(
        mut,
        seeds = [crate::WITHDRAWAL_SEED, seq.to_le_bytes().as_ref()],
        bump = request.bump,
        has_one = user,
        close = user
    )]
    pub request: Account<'info, WithdrawalRequest>,

    #[account(mut, address = config.stake_vault)]
    pub stake_vault: Account<'info, TokenAccount>,

    #[account(
        mut,
        constraint = user_token_account.mint == stake_mint.key() @ crate::errors::StakingError::StakeMintMismatch,
        constraint = user_token_account.owner == user.key()
    )]
    pub user_token_account: Account<'info, TokenAccount>,

    #[account(mut)]
    pub user: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

#[derive(Accounts)]
pub struct RegisterValidator<'info> {
    #[account(
        seeds = [crate::CONFIG_SEED],
        bump = config.bump
    )]
    pub config: Account<'info, Config>,

    #[account(
        mut,
        seeds = [crate::REGISTRY_SEED, config.key().as_ref()],
        bump = registry.bump,
    )]
    pub registry: Account<'info, StakeRegistry>,

    pub registrar: Signer<'info>,
}

#[derive(Accounts)]
pub struct ReportPoolExit<'info> {
    #[account(
        seeds = [crate::CONFIG_SEED],
        bump = config.bump
    )]
    pub config: Account<'info, Config>,

    #[account(
        mut,
        seeds = [crate::REGISTRY_SEED, config.key().as_ref()],
        bump = registry.bump,
    )]
    pub registry: Account<'info, StakeRegistry>,

    pub oracle: Signer<'info>,
}

#[derive(Accounts)]
pub struct CheckUpkeep<'info> {
    #[account(
        seeds = [crate::CONFIG_SEED],
        bump = config.bump
    )]
    pub config: Account<'info, Config>,

    #[account(
        seeds = [crate::REGISTRY_SEED, config.key().as_ref()],
        bump = registry.bump,
    )]
    pub registry: Account<'info, StakeRegistry>,
    // pending (request, owner) account pairs via remaining_accounts (read-only)
}

#[derive(Accounts)]
pub struct PerformUpkeep<'info> {
    #[account(
        seeds = [crate::CONFIG_SEED],
        bump = config.bump
    )]
    pub config: Account<'info, Config>,

    #[account(
        mut,
        seeds = [crate::REGISTRY_SEED, config.key().as_ref()],
        bump = registry.bump,
    )]
    pub registry: Account<'info, StakeRegistry>,

    /// Permissionless cranker paying tx fees.
    #[account(mut)]
    pub caller: Signer<'info>,
    // ready-flip (request, owner) account pairs via remaining_accounts (writable)
}

#[derive(Accounts)]
pub struct GetFees<'info> {
    #[account(
        seeds = [crate::CONFIG_SEED],
        bump = config.bump
    )]
    pub config: Account<'info, Config>,
}

#[derive(Accounts)]
#[instruction(user: Pubkey)]
pub struct GetUserBalance<'info> {
    #[account(
        seeds = [crate::CONFIG_SEED],
        bump = config.bump
    )]
    pub config: Account<'info, Config>,

    #[account(
        seeds = [crate::REGISTRY_SEED, config.key().as_ref()],
        bump = registry.bump,
    )]
    pub registry: Account<'info, StakeRegistry>,

    #[account(
        seeds = [crate::USER_SEED, user.as_ref()],
        bump = user_account.bump,
    )]
    pub user_account: Account<'info, UserAccount>,
}

#[derive(Accounts)]
pub struct GetPoolBalance<'info> {
    #[account(
        seeds = [crate::CONFIG_SEED],
        bump = config.bump
    )]
    pub config: Account<'info, Config>,

    #[account(
        seeds = [crate::REGISTRY_SEED, config.key().as_ref()],
        bump = registry.bump,
    )]
    pub registry: Account<'info, StakeRegistry>,
}

#[derive(Accounts)]
pub struct GetPoolIds<'info> {
    #[account(
        seeds = [crate::CONFIG_SEED],
        bump = config.bump
    )]
    pub config: Account<'info, Config>,

    #[account(
        seeds = [crate::REGISTRY_SEED, config.key().as_ref()],
        bump = registry.bump,
    )]
    pub registry: Account<'info, StakeRegistry>,
}
