use anchor_lang::prelude::*;

use crate::constants::MAX_READY_VALIDATORS;
use crate::errors::StakingError;
use crate::events::{PoolClosedEvent, PoolStakedEvent, ValidatorRegisteredEvent};
use crate::state::ValidatorRecord;
use crate::utils::{self, ValidatorSubmission};
use crate::{RegisterValidator, ReportPoolExit};

/// Accepts a DKG-produced validator descriptor from the registrar.
/// The registry keeps only the compact record; encrypted key shares
/// travel on the event stream for off-chain operators.
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
    let cfg = &ctx.accounts.config;
    require!(!cfg.paused, StakingError::Paused);
    require_keys_eq!(
        cfg.registrar,
        ctx.accounts.registrar.key(),
        StakingError::Unauthorized
    );

    let sub = ValidatorSubmission {
        deposit_data_root,
        public_key,
        operator_ids,
        shares_encrypted,
        shares_public_keys,
        signature,
        withdrawal_credentials,
    };
    utils::validate_submission(&sub, cfg.operator_count)?;
    let digest = utils::validator_digest(&sub);

    let registry = &mut ctx.accounts.registry;
    require!(
        !utils::is_known_digest(registry, &digest),
        StakingError::ValidatorAlreadyRegistered
    );
    require!(
        registry.validators.len() < MAX_READY_VALIDATORS,
        StakingError::ValidatorQueueFull
    );

    let current_slot = Clock::get()?.slot;
    registry.validators.push(ValidatorRecord {
        public_key: sub.public_key,
        operator_ids: sub.operator_ids.clone(),
        withdrawal_credentials: sub.withdrawal_credentials,
        deposit_data_root: sub.deposit_data_root,
        digest,
    });

    // a full Open pool may already be waiting on this descriptor
    for (pool_id, validator_public_key) in
        utils::activate_ready_pools(registry, cfg.pool_capacity, current_slot)?
    {
        emit!(PoolStakedEvent {
            pool_id,
            validator_public_key,
            slot: current_slot,
        });
    }

    emit!(ValidatorRegisteredEvent {
        digest,
        public_key: sub.public_key,
        operator_ids: sub.operator_ids,
        withdrawal_credentials: sub.withdrawal_credentials,
        deposit_data_root: sub.deposit_data_root,
        signature: sub.signature,
        shares_encrypted: sub.shares_encrypted,
        shares_public_keys: sub.shares_public_keys,
        slot: current_slot,
    });

    Ok(())
}

/// Oracle-observed settlement of a validator exit. The pool's principal
/// becomes undissolved cash; member shares dissolve into idle claims on
/// each owner's next settlement.
pub fn report_pool_exit(ctx: Context<ReportPoolExit>, pool_id: u64) -> Result<()> {
    let cfg = &ctx.accounts.config;
    require_keys_eq!(
        cfg.oracle_authority,
        ctx.accounts.oracle.key(),
        StakingError::Unauthorized
    );

    let current_slot = Clock::get()?.slot;
    let registry = &mut ctx.accounts.registry;
    let returned_principal = utils::close_pool(registry, pool_id, current_slot)?;

    emit!(PoolClosedEvent {
        pool_id,
        returned_principal,
        slot: current_slot,
    });

    Ok(())
}
