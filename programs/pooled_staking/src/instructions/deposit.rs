use anchor_lang::prelude::*;
use anchor_spl::token::{self, Transfer};

use crate::errors::StakingError;
use crate::events::{DepositEvent, PoolOpenedEvent, PoolStakedEvent, WithdrawalReadyEvent};
use crate::state::{UserAccount, WithdrawalRequest, WithdrawalStatus};
use crate::utils::{self, USER_SEED, WITHDRAWAL_SEED};
use crate::Deposit;

/// Deposits route through the exit queue before they open pools: each
/// queued request is offered the fresh cash against its owner's staked
/// shares, FIFO. Callers pass one (request, owner) account pair per
/// queue entry via remaining_accounts.
pub fn deposit<'info>(
    ctx: Context<'_, '_, 'info, 'info, Deposit<'info>>,
    gross_amount: u64,
) -> Result<()> {
    let cfg = &ctx.accounts.config;
    require!(!cfg.paused, StakingError::Paused);
    require!(gross_amount > 0, StakingError::InvalidAmount);

    let total_fee_bps = (cfg.operator_fee_bps as u64)
        .checked_add(cfg.network_fee_bps as u64)
        .ok_or(StakingError::MathOverflow)?;
    let (net, fee) = utils::split_gross(gross_amount, total_fee_bps)?;
    require!(net > 0, StakingError::InvalidAmount);

    let current_slot = Clock::get()?.slot;
    let user_pk = ctx.accounts.user.key();

    // settle the asset up front: net to the vault, fee to the treasury
    token::transfer(
        CpiContext::new(
            ctx.accounts.token_program.to_account_info(),
            Transfer {
                from: ctx.accounts.user_token_account.to_account_info(),
                to: ctx.accounts.stake_vault.to_account_info(),
                authority: ctx.accounts.user.to_account_info(),
            },
        ),
        net,
    )?;
    if fee > 0 {
        token::transfer(
            CpiContext::new(
                ctx.accounts.token_program.to_account_info(),
                Transfer {
                    from: ctx.accounts.user_token_account.to_account_info(),
                    to: ctx.accounts.treasury.to_account_info(),
                    authority: ctx.accounts.user.to_account_info(),
                },
            ),
            fee,
        )?;
    }

    let registry = &mut ctx.accounts.registry;
    let user_account = &mut ctx.accounts.user_account;

    if user_account.user == Pubkey::default() {
        user_account.user = user_pk;
        user_account.bump = ctx.bumps.user_account;
        user_account.created_slot = current_slot;
    }
    utils::settle_user(registry, user_account)?;

    let mut budget = net;
    let pending_snapshot: Vec<u64> = registry.pending.clone();
    let mut ra_idx = 0usize;

    for seq in pending_snapshot {
        if budget == 0 {
            break;
        }
        require!(
            ra_idx + 2 <= ctx.remaining_accounts.len(),
            StakingError::WithdrawalAccountsMissing
        );
        let request_ai = &ctx.remaining_accounts[ra_idx];
        let owner_ai = &ctx.remaining_accounts[ra_idx + 1];
        ra_idx += 2;

        let (expected_request, _bump) =
            Pubkey::find_program_address(&[WITHDRAWAL_SEED, &seq.to_le_bytes()], ctx.program_id);
        require_keys_eq!(
            request_ai.key(),
            expected_request,
            StakingError::WithdrawalPdaMismatch
        );
        require!(
            request_ai.owner == ctx.program_id,
            StakingError::AccountNotOwnedByProgram
        );

        let mut request: WithdrawalRequest = {
            let data = request_ai
                .try_borrow_data()
                .map_err(|_| error!(StakingError::AccountBorrowFailed))?;
            let mut slice: &[u8] = &data;
            WithdrawalRequest::try_deserialize(&mut slice)?
        };

        // a depositor never funds their own exit
        if request.user == user_pk {
            continue;
        }

        let (expected_owner, _bump) =
            Pubkey::find_program_address(&[USER_SEED, request.user.as_ref()], ctx.program_id);
        require_keys_eq!(owner_ai.key(), expected_owner, StakingError::UserPdaMismatch);
        require!(
            owner_ai.owner == ctx.program_id,
            StakingError::AccountNotOwnedByProgram
        );

        let mut owner: UserAccount = {
            let data = owner_ai
                .try_borrow_data()
                .map_err(|_| error!(StakingError::AccountBorrowFailed))?;
            let mut slice: &[u8] = &data;
            UserAccount::try_deserialize(&mut slice)?
        };

        utils::settle_user(registry, &mut owner)?;
        let moved = utils::fund_from_transfer(
            registry,
            &mut request,
            &mut owner,
            user_account,
            budget,
            current_slot,
        )?;
        budget -= moved;
        owner.updated_slot = current_slot;

        {
            let mut data_mut = owner_ai
                .try_borrow_mut_data()
                .map_err(|_| error!(StakingError::AccountBorrowFailed))?;
            let mut cursor = std::io::Cursor::new(&mut data_mut[..]);
            owner.try_serialize(&mut cursor)?;
        }
        {
            let mut data_mut = request_ai
                .try_borrow_mut_data()
                .map_err(|_| error!(StakingError::AccountBorrowFailed))?;
            let mut cursor = std::io::Cursor::new(&mut data_mut[..]);
            request.try_serialize(&mut cursor)?;
        }

        if moved > 0 && request.status == WithdrawalStatus::Ready as u8 {
            emit!(WithdrawalReadyEvent {
                seq,
                user: request.user,
                slot: current_slot,
            });
        }
    }

    // whatever the queue did not absorb opens or fills pools
    if budget > 0 {
        let slices = utils::assign_deposit(registry, budget, cfg.pool_capacity, current_slot)?;
        for s in &slices {
            if s.opened {
                emit!(PoolOpenedEvent {
                    pool_id: s.pool_id,
                    slot: current_slot,
                });
            }
        }
        utils::credit_deposit(registry, user_account, &slices)?;

        for (pool_id, validator_public_key) in
            utils::activate_ready_pools(registry, cfg.pool_capacity, current_slot)?
        {
            emit!(PoolStakedEvent {
                pool_id,
                validator_public_key,
                slot: current_slot,
            });
        }
    }

    user_account.updated_slot = current_slot;

    emit!(DepositEvent {
        user: user_pk,
        gross: gross_amount,
        net,
        fee,
        slot: current_slot,
    });

    Ok(())
}
