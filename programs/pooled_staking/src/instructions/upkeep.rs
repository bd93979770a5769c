use anchor_lang::prelude::*;

use crate::constants::MAX_UPKEEP_ITEMS;
use crate::errors::StakingError;
use crate::events::{PoolExitingEvent, PoolStakedEvent, UpkeepPerformedEvent, WithdrawalReadyEvent};
use crate::state::{PoolStatus, StakeRegistry, UserAccount, WithdrawalRequest};
use crate::utils::{self, PendingBacklog, UpkeepActions, UpkeepCheck, USER_SEED, WITHDRAWAL_SEED};
use crate::{CheckUpkeep, PerformUpkeep};

fn verify_pair<'info>(
    program_id: &Pubkey,
    seq: u64,
    request_ai: &AccountInfo<'info>,
    owner_ai: &AccountInfo<'info>,
) -> Result<(WithdrawalRequest, UserAccount)> {
    let (expected_request, _bump) =
        Pubkey::find_program_address(&[WITHDRAWAL_SEED, &seq.to_le_bytes()], program_id);
    require_keys_eq!(
        request_ai.key(),
        expected_request,
        StakingError::WithdrawalPdaMismatch
    );
    require!(
        request_ai.owner == program_id,
        StakingError::AccountNotOwnedByProgram
    );
    let request: WithdrawalRequest = {
        let data = request_ai
            .try_borrow_data()
            .map_err(|_| error!(StakingError::AccountBorrowFailed))?;
        let mut slice: &[u8] = &data;
        WithdrawalRequest::try_deserialize(&mut slice)?
    };

    let (expected_owner, _bump) =
        Pubkey::find_program_address(&[USER_SEED, request.user.as_ref()], program_id);
    require_keys_eq!(owner_ai.key(), expected_owner, StakingError::UserPdaMismatch);
    require!(
        owner_ai.owner == program_id,
        StakingError::AccountNotOwnedByProgram
    );
    let owner: UserAccount = {
        let data = owner_ai
            .try_borrow_data()
            .map_err(|_| error!(StakingError::AccountBorrowFailed))?;
        let mut slice: &[u8] = &data;
        UserAccount::try_deserialize(&mut slice)?
    };

    Ok((request, owner))
}

fn backlog_from_remaining<'info>(
    registry: &StakeRegistry,
    program_id: &Pubkey,
    remaining: &[AccountInfo<'info>],
) -> Result<Vec<PendingBacklog>> {
    let mut backlog = Vec::with_capacity(registry.pending.len());
    for (i, seq) in registry.pending.iter().enumerate() {
        let idx = i * 2;
        require!(
            idx + 2 <= remaining.len(),
            StakingError::WithdrawalAccountsMissing
        );
        let (request, owner) = verify_pair(program_id, *seq, &remaining[idx], &remaining[idx + 1])?;
        backlog.push(PendingBacklog {
            seq: *seq,
            remaining: request.remaining,
            owner_idle: utils::projected_idle(registry, &owner),
            owner_shares: owner.pool_shares.clone(),
        });
    }
    Ok(backlog)
}

/// Read-only planning pass, mirrored by the off-chain cranker. Pass one
/// (request, owner) account pair per pending queue entry.
pub fn check_upkeep<'info>(
    ctx: Context<'_, '_, 'info, 'info, CheckUpkeep<'info>>,
) -> Result<UpkeepCheck> {
    let cfg = &ctx.accounts.config;
    let registry = &ctx.accounts.registry;

    let backlog = backlog_from_remaining(registry, ctx.program_id, ctx.remaining_accounts)?;

    let actions = UpkeepActions {
        activations: utils::plan_activations(registry, cfg.pool_capacity),
        exits: utils::plan_exits(registry, &backlog),
        ready_flips: utils::plan_ready_flips(&backlog),
    };
    let needed =
        !(actions.activations.is_empty() && actions.exits.is_empty() && actions.ready_flips.is_empty());

    Ok(UpkeepCheck { needed, actions })
}

/// Executes a previously planned action batch. Every item is
/// re-validated against current state; items that went stale between
/// check and perform are skipped, not failed. Pass one (request, owner)
/// account pair per ready_flips entry, in payload order.
pub fn perform_upkeep<'info>(
    ctx: Context<'_, '_, 'info, 'info, PerformUpkeep<'info>>,
    actions: UpkeepActions,
) -> Result<()> {
    let cfg = &ctx.accounts.config;
    require!(!cfg.paused, StakingError::Paused);
    require!(
        actions.activations.len() <= MAX_UPKEEP_ITEMS
            && actions.exits.len() <= MAX_UPKEEP_ITEMS
            && actions.ready_flips.len() <= MAX_UPKEEP_ITEMS,
        StakingError::UpkeepPayloadTooLarge
    );

    let current_slot = Clock::get()?.slot;
    let registry = &mut ctx.accounts.registry;

    let mut ready_flips_done: u64 = 0;
    let mut exits_done: u64 = 0;
    let mut activations_done: u64 = 0;
    let mut skipped: u64 = 0;

    for (i, seq) in actions.ready_flips.iter().enumerate() {
        let idx = i * 2;
        require!(
            idx + 2 <= ctx.remaining_accounts.len(),
            StakingError::WithdrawalAccountsMissing
        );
        let request_ai = &ctx.remaining_accounts[idx];
        let owner_ai = &ctx.remaining_accounts[idx + 1];
        let (mut request, mut owner) = verify_pair(ctx.program_id, *seq, request_ai, owner_ai)?;

        utils::settle_user(registry, &mut owner)?;
        let funded = utils::fund_from_idle(registry, &mut owner, &mut request, current_slot)?;
        if funded == 0 {
            skipped = skipped.saturating_add(1);
            continue;
        }
        ready_flips_done += 1;
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

        if request.remaining == 0 {
            emit!(WithdrawalReadyEvent {
                seq: *seq,
                user: request.user,
                slot: current_slot,
            });
        }
    }

    for pool_id in &actions.exits {
        let pool = registry
            .pools
            .iter_mut()
            .find(|p| p.id == *pool_id && p.status == PoolStatus::Staked as u8);
        match pool {
            Some(pool) => {
                pool.status = PoolStatus::Withdrawing as u8;
                exits_done += 1;
                emit!(PoolExitingEvent {
                    pool_id: *pool_id,
                    slot: current_slot,
                });
            }
            None => skipped = skipped.saturating_add(1),
        }
    }

    for pool_id in &actions.activations {
        let idx = registry.pools.iter().position(|p| {
            p.id == *pool_id
                && p.status == PoolStatus::Open as u8
                && p.deposits == cfg.pool_capacity
        });
        match idx {
            Some(idx) if !registry.validators.is_empty() => {
                let record = registry.validators.remove(0);
                let pool = &mut registry.pools[idx];
                pool.validator = Some(record.clone());
                pool.status = PoolStatus::Staked as u8;
                pool.staked_slot = current_slot;
                activations_done += 1;
                emit!(PoolStakedEvent {
                    pool_id: pool.id,
                    validator_public_key: record.public_key,
                    slot: current_slot,
                });
            }
            _ => skipped = skipped.saturating_add(1),
        }
    }

    utils::prune_closed_pools(registry);

    emit!(UpkeepPerformedEvent {
        activations: activations_done,
        exits: exits_done,
        ready_flips: ready_flips_done,
        skipped,
        slot: current_slot,
    });

    Ok(())
}
