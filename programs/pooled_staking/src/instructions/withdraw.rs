use anchor_lang::prelude::*;
use anchor_spl::token::{self, Transfer};

use crate::errors::StakingError;
use crate::events::{WithdrawalClaimedEvent, WithdrawalReadyEvent, WithdrawalRequestedEvent};
use crate::state::WithdrawalStatus;
use crate::utils::{self, CONFIG_SEED};
use crate::{ClaimWithdrawal, RequestWithdrawal};

pub fn request_withdrawal(ctx: Context<RequestWithdrawal>, amount: u64) -> Result<()> {
    let cfg = &ctx.accounts.config;
    require!(!cfg.paused, StakingError::Paused);

    let current_slot = Clock::get()?.slot;
    let registry = &mut ctx.accounts.registry;
    let user_account = &mut ctx.accounts.user_account;
    let request = &mut ctx.accounts.request;

    require_keys_eq!(
        user_account.user,
        ctx.accounts.user.key(),
        StakingError::Unauthorized
    );

    utils::settle_user(registry, user_account)?;
    let plan = utils::plan_withdrawal(registry, user_account, amount)?;

    request.seq = registry.next_withdrawal_seq;
    registry.next_withdrawal_seq = registry
        .next_withdrawal_seq
        .checked_add(1)
        .ok_or(StakingError::MathOverflow)?;
    request.user = ctx.accounts.user.key();
    request.bump = ctx.bumps.request;

    utils::apply_withdrawal(registry, user_account, request, &plan, current_slot)?;
    user_account.updated_slot = current_slot;

    emit!(WithdrawalRequestedEvent {
        seq: request.seq,
        user: request.user,
        amount: request.amount,
        reward_part: request.reward_part,
        principal_part: request.principal_part,
        remaining: request.remaining,
        slot: current_slot,
    });
    if request.status == WithdrawalStatus::Ready as u8 {
        emit!(WithdrawalReadyEvent {
            seq: request.seq,
            user: request.user,
            slot: current_slot,
        });
    }

    Ok(())
}

/// Pays out a Ready request from the vault and closes the request
/// account back to the user. Claims stay open while paused so funded
/// exits are never trapped.
pub fn claim_withdrawal(ctx: Context<ClaimWithdrawal>, seq: u64) -> Result<()> {
    let cfg = &ctx.accounts.config;
    let request = &mut ctx.accounts.request;
    require!(
        request.status == WithdrawalStatus::Ready as u8,
        StakingError::WithdrawalNotReady
    );

    let amount = request.amount;
    require!(
        ctx.accounts.stake_vault.amount >= amount,
        StakingError::InsufficientVaultFunds
    );

    let signer_seeds: &[&[&[u8]]] = &[&[CONFIG_SEED, &[cfg.bump]]];
    token::transfer(
        CpiContext::new_with_signer(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.stake_vault.to_account_info(),
                to: ctx.accounts.user_token_account.to_account_info(),
                authority: cfg.to_account_info(),
            },
            signer_seeds,
        ),
        amount,
    )?;

    let registry = &mut ctx.accounts.registry;
    registry.earmarked = registry
        .earmarked
        .checked_sub(amount)
        .ok_or(StakingError::MathOverflow)?;

    let current_slot = Clock::get()?.slot;
    request.status = WithdrawalStatus::Completed as u8;
    request.claimed_slot = current_slot;

    emit!(WithdrawalClaimedEvent {
        seq,
        user: request.user,
        amount,
        slot: current_slot,
    });

    Ok(())
}
