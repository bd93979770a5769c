use anchor_lang::prelude::*;
use solana_sha256_hasher::hashv;

use crate::constants::*;
use crate::errors::StakingError;
use crate::state::{
    Pool, PoolShare, PoolStatus, StakeRegistry, UserAccount, WithdrawalRequest, WithdrawalStatus,
};

// -----------------
// Seeds / constants
// -----------------
pub const CONFIG_SEED: &[u8] = b"config_v1";
pub const REGISTRY_SEED: &[u8] = b"stake_registry_v1";

pub const STAKE_VAULT_SEED: &[u8] = b"stake_vault_v1";
pub const TREASURY_SEED: &[u8] = b"treasury_v1";

pub const USER_SEED: &[u8] = b"user_account_v1";
pub const WITHDRAWAL_SEED: &[u8] = b"withdrawal_v1";

pub const VALIDATOR_DIGEST_DOMAIN: &[u8] = b"validator_v1";

// ---------------
// Payload / view structs
// ---------------
#[derive(AnchorSerialize, AnchorDeserialize, Clone)]
pub struct ValidatorSubmission {
    pub deposit_data_root: [u8; 32],
    pub public_key: [u8; 48],
    pub operator_ids: Vec<u64>,
    pub shares_encrypted: Vec<Vec<u8>>,
    pub shares_public_keys: Vec<Vec<u8>>,
    pub signature: [u8; 96],
    pub withdrawal_credentials: [u8; 32],
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Default)]
pub struct UpkeepActions {
    pub activations: Vec<u64>,
    pub exits: Vec<u64>,
    pub ready_flips: Vec<u64>,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone)]
pub struct UpkeepCheck {
    pub needed: bool,
    pub actions: UpkeepActions,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone)]
pub struct FeeBreakdown {
    pub operator_bps: u16,
    pub network_bps: u16,
    pub total_bps: u16,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone)]
pub struct BalanceView {
    pub stake: u64,
    pub rewards: u64,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone)]
pub struct PoolBalanceView {
    pub deposits: u64,
    pub rewards_allocated: u64,
}

/// Slice of a deposit routed into one pool.
#[derive(Clone, Copy, Debug)]
pub struct DepositSlice {
    pub pool_id: u64,
    pub amount: u64,
    pub opened: bool,
}

/// Read-only withdrawal plan, computed before any state is touched.
#[derive(Debug)]
pub struct WithdrawalPlan {
    pub amount: u64,
    pub reward_part: u64,
    pub idle_part: u64,
    pub open_takes: Vec<(u64, u64)>,
    pub remaining: u64,
}

/// One pending request as seen by the upkeep planner.
pub struct PendingBacklog {
    pub seq: u64,
    pub remaining: u64,
    /// Owner idle projected after settlement (closed-pool shares included).
    pub owner_idle: u64,
    pub owner_shares: Vec<PoolShare>,
}

// -------------------------
// Fee math
// -------------------------
// All fee math runs in u128 and rounds half up at the smallest base unit.

pub fn gross_for_net(net: u64, fee_bps: u64) -> Result<u64> {
    let num = (net as u128)
        .checked_mul((BPS_DENOMINATOR as u128) + (fee_bps as u128))
        .ok_or(StakingError::MathOverflow)?;
    let den = BPS_DENOMINATOR as u128;
    let rounded = num
        .checked_add(den / 2)
        .ok_or(StakingError::MathOverflow)?
        / den;
    u64::try_from(rounded).map_err(|_| error!(StakingError::MathOverflow))
}

pub fn net_for_gross(gross: u64, fee_bps: u64) -> Result<u64> {
    let num = (gross as u128)
        .checked_mul(BPS_DENOMINATOR as u128)
        .ok_or(StakingError::MathOverflow)?;
    let den = (BPS_DENOMINATOR as u128) + (fee_bps as u128);
    let rounded = num
        .checked_add(den / 2)
        .ok_or(StakingError::MathOverflow)?
        / den;
    u64::try_from(rounded).map_err(|_| error!(StakingError::MathOverflow))
}

/// Splits a gross deposit into (net, fee).
pub fn split_gross(gross: u64, fee_bps: u64) -> Result<(u64, u64)> {
    let net = net_for_gross(gross, fee_bps)?;
    let fee = gross.checked_sub(net).ok_or(StakingError::MathOverflow)?;
    Ok((net, fee))
}

#[cfg(test)]
mod fee_tests {
    use super::*;

    const TOTAL_FEE_BPS: u64 = 200;

    #[test]
    fn gross_for_net_matches_production_figures() {
        // 16.0 at 2% total -> 16.32
        assert_eq!(
            gross_for_net(16_000_000_000, TOTAL_FEE_BPS).unwrap(),
            16_320_000_000
        );
        assert_eq!(
            gross_for_net(24_000_000_000, TOTAL_FEE_BPS).unwrap(),
            24_480_000_000
        );
    }

    #[test]
    fn split_gross_is_exact_on_round_amounts() {
        let (net, fee) = split_gross(16_320_000_000, TOTAL_FEE_BPS).unwrap();
        assert_eq!(net, 16_000_000_000);
        assert_eq!(fee, 320_000_000);
    }

    #[test]
    fn fee_round_trip_within_one_base_unit() {
        for net in [1u64, 7, 999, 1_000_000_007, 16_000_000_001, 32_000_000_000] {
            let gross = gross_for_net(net, TOTAL_FEE_BPS).unwrap();
            let back = net_for_gross(gross, TOTAL_FEE_BPS).unwrap();
            assert!(back.abs_diff(net) <= 1, "net {} -> gross {} -> {}", net, gross, back);
        }
    }

    #[test]
    fn zero_fee_is_identity() {
        assert_eq!(gross_for_net(123_456_789, 0).unwrap(), 123_456_789);
        assert_eq!(net_for_gross(123_456_789, 0).unwrap(), 123_456_789);
    }
}

// -------------------------
// Reward accumulator + user settlement
// -------------------------

/// Folds a reward event into the global accumulator and the per-pool
/// projection. The scaled division remainder is carried into the next
/// event, so distribution is exact:
/// sum(user claims scaled) + reward_carry == total_rewards * ACC_PRECISION.
pub fn apply_reward(registry: &mut StakeRegistry, amount: u64) -> Result<()> {
    require!(amount > 0, StakingError::InvalidAmount);
    require!(registry.total_principal > 0, StakingError::NoStakeOutstanding);

    let scaled = (amount as u128)
        .checked_mul(ACC_PRECISION)
        .ok_or(StakingError::MathOverflow)?
        .checked_add(registry.reward_carry)
        .ok_or(StakingError::MathOverflow)?;
    let tp = registry.total_principal as u128;

    let delta = scaled / tp;
    registry.reward_carry = scaled % tp;
    registry.reward_per_unit = registry
        .reward_per_unit
        .checked_add(delta)
        .ok_or(StakingError::MathOverflow)?;
    registry.total_rewards = registry
        .total_rewards
        .checked_add(amount)
        .ok_or(StakingError::MathOverflow)?;

    allocate_pool_rewards(registry, amount)
}

/// Per-pool `rewards_allocated` stat: each event is split across the
/// currently Staked pools proportional to deposits, truncating. The
/// truncated remainder rides along to the next event.
fn allocate_pool_rewards(registry: &mut StakeRegistry, amount: u64) -> Result<()> {
    let budget = amount
        .checked_add(registry.pool_reward_carry)
        .ok_or(StakingError::MathOverflow)?;

    let staked_total: u64 = registry
        .pools
        .iter()
        .filter(|p| p.status == PoolStatus::Staked as u8)
        .map(|p| p.deposits)
        .sum();
    if staked_total == 0 {
        registry.pool_reward_carry = budget;
        return Ok(());
    }

    let mut assigned: u64 = 0;
    for pool in registry
        .pools
        .iter_mut()
        .filter(|p| p.status == PoolStatus::Staked as u8)
    {
        let share = (budget as u128)
            .checked_mul(pool.deposits as u128)
            .ok_or(StakingError::MathOverflow)?
            / (staked_total as u128);
        let share = u64::try_from(share).map_err(|_| error!(StakingError::MathOverflow))?;
        pool.rewards_allocated = pool
            .rewards_allocated
            .checked_add(share)
            .ok_or(StakingError::MathOverflow)?;
        assigned = assigned
            .checked_add(share)
            .ok_or(StakingError::MathOverflow)?;
    }
    registry.pool_reward_carry = budget
        .checked_sub(assigned)
        .ok_or(StakingError::MathOverflow)?;
    Ok(())
}

/// Brings a user up to date: accrues against the global accumulator,
/// then dissolves shares of Closed pools into idle claims. Every
/// instruction that touches a user runs this first.
pub fn settle_user(registry: &mut StakeRegistry, user: &mut UserAccount) -> Result<()> {
    let delta = registry
        .reward_per_unit
        .checked_sub(user.reward_per_unit_paid)
        .ok_or(StakingError::MathOverflow)?;
    if delta > 0 && user.principal > 0 {
        let gain = (user.principal as u128)
            .checked_mul(delta)
            .ok_or(StakingError::MathOverflow)?;
        user.accrued_scaled = user
            .accrued_scaled
            .checked_add(gain)
            .ok_or(StakingError::MathOverflow)?;
    }
    user.reward_per_unit_paid = registry.reward_per_unit;

    let shares = core::mem::take(&mut user.pool_shares);
    let mut kept = Vec::with_capacity(shares.len());
    for share in shares {
        let closed_idx = registry
            .pools
            .iter()
            .position(|p| p.id == share.pool_id && p.status == PoolStatus::Closed as u8);
        match closed_idx {
            Some(i) => {
                user.idle = user
                    .idle
                    .checked_add(share.amount)
                    .ok_or(StakingError::MathOverflow)?;
                registry.pools[i].undissolved = registry.pools[i]
                    .undissolved
                    .checked_sub(share.amount)
                    .ok_or(StakingError::MathOverflow)?;
            }
            None => kept.push(share),
        }
    }
    user.pool_shares = kept;
    Ok(())
}

/// Settled reward claim, floored to whole base units.
pub fn settled_rewards(user: &UserAccount) -> Result<u64> {
    u64::try_from(user.accrued_scaled / ACC_PRECISION)
        .map_err(|_| error!(StakingError::MathOverflow))
}

/// Read-only reward projection (does not checkpoint).
pub fn projected_rewards(registry: &StakeRegistry, user: &UserAccount) -> Result<u64> {
    let delta = registry
        .reward_per_unit
        .saturating_sub(user.reward_per_unit_paid);
    let scaled = user
        .accrued_scaled
        .checked_add(
            (user.principal as u128)
                .checked_mul(delta)
                .ok_or(StakingError::MathOverflow)?,
        )
        .ok_or(StakingError::MathOverflow)?;
    u64::try_from(scaled / ACC_PRECISION).map_err(|_| error!(StakingError::MathOverflow))
}

/// Idle projected after settlement: current idle plus shares sitting in
/// Closed pools that settle_user would dissolve.
pub fn projected_idle(registry: &StakeRegistry, user: &UserAccount) -> u64 {
    let dissolvable: u64 = user
        .pool_shares
        .iter()
        .filter(|ps| {
            registry
                .pools
                .iter()
                .any(|p| p.id == ps.pool_id && p.status == PoolStatus::Closed as u8)
        })
        .map(|ps| ps.amount)
        .sum();
    user.idle.saturating_add(dissolvable)
}

// -------------------------
// Pool assignment + activation
// -------------------------

/// Routes a net deposit into the pool set: fills Open pools ascending
/// id, then lazily appends new pools for any remainder. A single
/// deposit may fill and open several pools.
pub fn assign_deposit(
    registry: &mut StakeRegistry,
    net: u64,
    capacity: u64,
    current_slot: u64,
) -> Result<Vec<DepositSlice>> {
    require!(net > 0, StakingError::InvalidAmount);

    let mut remaining = net;
    let mut slices = Vec::new();

    for pool in registry.pools.iter_mut() {
        if remaining == 0 {
            break;
        }
        if pool.status != PoolStatus::Open as u8 {
            continue;
        }
        // invariant check, unreachable under correct arithmetic
        require!(pool.deposits <= capacity, StakingError::CapacityExceeded);
        let room = capacity - pool.deposits;
        if room == 0 {
            continue;
        }
        let take = remaining.min(room);
        pool.deposits = pool
            .deposits
            .checked_add(take)
            .ok_or(StakingError::MathOverflow)?;
        remaining -= take;
        slices.push(DepositSlice {
            pool_id: pool.id,
            amount: take,
            opened: false,
        });
    }

    while remaining > 0 {
        require!(
            registry.pools.len() < MAX_POOLS,
            StakingError::PoolLimitReached
        );
        let take = remaining.min(capacity);
        let id = registry.next_pool_id;
        registry.next_pool_id = registry
            .next_pool_id
            .checked_add(1)
            .ok_or(StakingError::MathOverflow)?;
        registry.pools.push(Pool {
            id,
            deposits: take,
            status: PoolStatus::Open as u8,
            rewards_allocated: 0,
            undissolved: 0,
            validator: None,
            created_slot: current_slot,
            staked_slot: 0,
            closed_slot: 0,
        });
        remaining -= take;
        slices.push(DepositSlice {
            pool_id: id,
            amount: take,
            opened: true,
        });
    }

    Ok(slices)
}

/// Credits assigned slices to the depositor's ledger.
pub fn credit_deposit(
    registry: &mut StakeRegistry,
    user: &mut UserAccount,
    slices: &[DepositSlice],
) -> Result<()> {
    let mut total: u64 = 0;
    for s in slices {
        total = total.checked_add(s.amount).ok_or(StakingError::MathOverflow)?;
        match user.pool_shares.iter_mut().find(|ps| ps.pool_id == s.pool_id) {
            Some(ps) => {
                ps.amount = ps
                    .amount
                    .checked_add(s.amount)
                    .ok_or(StakingError::MathOverflow)?;
            }
            None => {
                require!(
                    user.pool_shares.len() < MAX_USER_POOLS,
                    StakingError::UserPoolListFull
                );
                user.pool_shares.push(PoolShare {
                    pool_id: s.pool_id,
                    amount: s.amount,
                });
            }
        }
    }
    user.principal = user
        .principal
        .checked_add(total)
        .ok_or(StakingError::MathOverflow)?;
    registry.total_principal = registry
        .total_principal
        .checked_add(total)
        .ok_or(StakingError::MathOverflow)?;
    Ok(())
}

/// Marries full Open pools to queued validator descriptors, FIFO on
/// both sides. Returns (pool_id, validator pubkey) per activation.
pub fn activate_ready_pools(
    registry: &mut StakeRegistry,
    capacity: u64,
    current_slot: u64,
) -> Result<Vec<(u64, [u8; 48])>> {
    let mut activated = Vec::new();
    loop {
        if registry.validators.is_empty() {
            break;
        }
        let idx = registry
            .pools
            .iter()
            .position(|p| p.status == PoolStatus::Open as u8 && p.deposits == capacity);
        let Some(idx) = idx else { break };

        let record = registry.validators.remove(0);
        let pool = &mut registry.pools[idx];
        pool.validator = Some(record.clone());
        pool.status = PoolStatus::Staked as u8;
        pool.staked_slot = current_slot;
        activated.push((pool.id, record.public_key));
    }
    Ok(activated)
}

// -------------------------
// Withdrawal core
// -------------------------

/// Computes how a withdrawal is satisfied, touching no state. Order:
/// accrued rewards, then free idle, then Open-pool shares unwound
/// newest-pool-first; any staked-backed remainder stays Pending.
pub fn plan_withdrawal(
    registry: &StakeRegistry,
    user: &UserAccount,
    amount: u64,
) -> Result<WithdrawalPlan> {
    require!(amount > 0, StakingError::InvalidAmount);

    let rewards = settled_rewards(user)?;
    let withdrawable_principal = user
        .principal
        .checked_sub(user.locked)
        .ok_or(StakingError::MathOverflow)?;
    let available = withdrawable_principal
        .checked_add(rewards)
        .ok_or(StakingError::MathOverflow)?;
    require!(amount <= available, StakingError::InsufficientBalance);

    let mut rest = amount;
    let reward_part = rest.min(rewards);
    rest -= reward_part;

    // idle up to `locked` is committed to the user's own pending claims
    let idle_free = user.idle.saturating_sub(user.locked);
    let idle_part = rest.min(idle_free);
    rest -= idle_part;

    let mut open_takes = Vec::new();
    if rest > 0 {
        let mut open_shares: Vec<&PoolShare> = user
            .pool_shares
            .iter()
            .filter(|ps| {
                registry
                    .pools
                    .iter()
                    .any(|p| p.id == ps.pool_id && p.status == PoolStatus::Open as u8)
            })
            .collect();
        open_shares.sort_by(|a, b| b.pool_id.cmp(&a.pool_id));
        for ps in open_shares {
            if rest == 0 {
                break;
            }
            let take = rest.min(ps.amount);
            open_takes.push((ps.pool_id, take));
            rest -= take;
        }
    }

    if rest > 0 {
        require!(
            registry.pending.len() < MAX_PENDING_WITHDRAWALS,
            StakingError::WithdrawalQueueFull
        );
    }

    Ok(WithdrawalPlan {
        amount,
        reward_part,
        idle_part,
        open_takes,
        remaining: rest,
    })
}

/// Applies a previously computed plan and fills in the request. The
/// funded portion becomes earmarked vault cash; the remainder locks the
/// user's staked principal and joins the FIFO queue.
pub fn apply_withdrawal(
    registry: &mut StakeRegistry,
    user: &mut UserAccount,
    request: &mut WithdrawalRequest,
    plan: &WithdrawalPlan,
    current_slot: u64,
) -> Result<()> {
    let reward_scaled = (plan.reward_part as u128)
        .checked_mul(ACC_PRECISION)
        .ok_or(StakingError::MathOverflow)?;
    user.accrued_scaled = user
        .accrued_scaled
        .checked_sub(reward_scaled)
        .ok_or(StakingError::MathOverflow)?;

    user.idle = user
        .idle
        .checked_sub(plan.idle_part)
        .ok_or(StakingError::MathOverflow)?;

    let mut open_total: u64 = 0;
    for (pool_id, take) in &plan.open_takes {
        let pool = registry
            .pools
            .iter_mut()
            .find(|p| p.id == *pool_id)
            .ok_or(StakingError::UnknownPool)?;
        require!(
            pool.status == PoolStatus::Open as u8,
            StakingError::InvalidPoolStatus
        );
        pool.deposits = pool
            .deposits
            .checked_sub(*take)
            .ok_or(StakingError::MathOverflow)?;

        let ps = user
            .pool_shares
            .iter_mut()
            .find(|ps| ps.pool_id == *pool_id)
            .ok_or(StakingError::UnknownPool)?;
        ps.amount = ps
            .amount
            .checked_sub(*take)
            .ok_or(StakingError::MathOverflow)?;

        open_total = open_total
            .checked_add(*take)
            .ok_or(StakingError::MathOverflow)?;
    }
    user.pool_shares.retain(|ps| ps.amount > 0);

    let principal_out = plan
        .idle_part
        .checked_add(open_total)
        .ok_or(StakingError::MathOverflow)?;
    user.principal = user
        .principal
        .checked_sub(principal_out)
        .ok_or(StakingError::MathOverflow)?;
    registry.total_principal = registry
        .total_principal
        .checked_sub(principal_out)
        .ok_or(StakingError::MathOverflow)?;

    let funded = plan
        .reward_part
        .checked_add(principal_out)
        .ok_or(StakingError::MathOverflow)?;
    registry.earmarked = registry
        .earmarked
        .checked_add(funded)
        .ok_or(StakingError::MathOverflow)?;

    request.amount = plan.amount;
    request.reward_part = plan.reward_part;
    request.principal_part = plan
        .amount
        .checked_sub(plan.reward_part)
        .ok_or(StakingError::MathOverflow)?;
    request.remaining = plan.remaining;
    request.created_slot = current_slot;

    if plan.remaining > 0 {
        user.locked = user
            .locked
            .checked_add(plan.remaining)
            .ok_or(StakingError::MathOverflow)?;
        registry.pending_total = registry
            .pending_total
            .checked_add(plan.remaining)
            .ok_or(StakingError::MathOverflow)?;
        registry.pending.push(request.seq);
        request.status = WithdrawalStatus::Pending as u8;
    } else {
        request.status = WithdrawalStatus::Ready as u8;
        request.ready_slot = current_slot;
    }
    Ok(())
}

/// Funds a Pending request from its owner's idle claims. Returns the
/// funded amount (0 means nothing to do, callers skip silently).
pub fn fund_from_idle(
    registry: &mut StakeRegistry,
    user: &mut UserAccount,
    request: &mut WithdrawalRequest,
    current_slot: u64,
) -> Result<u64> {
    if request.status != WithdrawalStatus::Pending as u8 {
        return Ok(0);
    }
    let take = request.remaining.min(user.idle);
    if take == 0 {
        return Ok(0);
    }

    user.idle -= take;
    user.principal = user
        .principal
        .checked_sub(take)
        .ok_or(StakingError::MathOverflow)?;
    user.locked = user
        .locked
        .checked_sub(take)
        .ok_or(StakingError::MathOverflow)?;
    registry.total_principal = registry
        .total_principal
        .checked_sub(take)
        .ok_or(StakingError::MathOverflow)?;
    registry.pending_total = registry
        .pending_total
        .checked_sub(take)
        .ok_or(StakingError::MathOverflow)?;
    registry.earmarked = registry
        .earmarked
        .checked_add(take)
        .ok_or(StakingError::MathOverflow)?;

    request.remaining -= take;
    if request.remaining == 0 {
        request.status = WithdrawalStatus::Ready as u8;
        request.ready_slot = current_slot;
        let seq = request.seq;
        registry.pending.retain(|s| *s != seq);
    }
    Ok(take)
}

/// Moves up to `amount` of `from`'s shares in Staked pools over to
/// `to`, oldest pool first. Principal follows the shares; pool
/// deposits are untouched. Returns the moved amount.
pub fn transfer_staked_shares(
    registry: &StakeRegistry,
    from: &mut UserAccount,
    to: &mut UserAccount,
    amount: u64,
) -> Result<u64> {
    let mut staked_ids: Vec<u64> = from
        .pool_shares
        .iter()
        .filter(|ps| {
            registry
                .pools
                .iter()
                .any(|p| p.id == ps.pool_id && p.status == PoolStatus::Staked as u8)
        })
        .map(|ps| ps.pool_id)
        .collect();
    staked_ids.sort_unstable();

    let mut moved_total: u64 = 0;
    for pool_id in staked_ids {
        if moved_total == amount {
            break;
        }
        let take = {
            let ps = from
                .pool_shares
                .iter_mut()
                .find(|ps| ps.pool_id == pool_id)
                .ok_or(StakingError::UnknownPool)?;
            let take = (amount - moved_total).min(ps.amount);
            ps.amount -= take;
            take
        };
        if take == 0 {
            continue;
        }
        match to.pool_shares.iter_mut().find(|ps| ps.pool_id == pool_id) {
            Some(ps) => {
                ps.amount = ps
                    .amount
                    .checked_add(take)
                    .ok_or(StakingError::MathOverflow)?;
            }
            None => {
                require!(
                    to.pool_shares.len() < MAX_USER_POOLS,
                    StakingError::UserPoolListFull
                );
                to.pool_shares.push(PoolShare {
                    pool_id,
                    amount: take,
                });
            }
        }
        moved_total = moved_total
            .checked_add(take)
            .ok_or(StakingError::MathOverflow)?;
    }
    from.pool_shares.retain(|ps| ps.amount > 0);

    from.principal = from
        .principal
        .checked_sub(moved_total)
        .ok_or(StakingError::MathOverflow)?;
    to.principal = to
        .principal
        .checked_add(moved_total)
        .ok_or(StakingError::MathOverflow)?;
    Ok(moved_total)
}

/// Funds a Pending request from a fresh deposit by moving the exiter's
/// staked shares to the depositor at equal value. The depositor's cash
/// backs the exiter's claim; pool reserves are never diverted.
pub fn fund_from_transfer(
    registry: &mut StakeRegistry,
    request: &mut WithdrawalRequest,
    exiter: &mut UserAccount,
    depositor: &mut UserAccount,
    budget: u64,
    current_slot: u64,
) -> Result<u64> {
    if request.status != WithdrawalStatus::Pending as u8 || budget == 0 {
        return Ok(0);
    }
    let want = request.remaining.min(budget);
    let moved = transfer_staked_shares(registry, exiter, depositor, want)?;
    if moved == 0 {
        return Ok(0);
    }

    exiter.locked = exiter
        .locked
        .checked_sub(moved)
        .ok_or(StakingError::MathOverflow)?;
    registry.pending_total = registry
        .pending_total
        .checked_sub(moved)
        .ok_or(StakingError::MathOverflow)?;
    registry.earmarked = registry
        .earmarked
        .checked_add(moved)
        .ok_or(StakingError::MathOverflow)?;

    request.remaining -= moved;
    if request.remaining == 0 {
        request.status = WithdrawalStatus::Ready as u8;
        request.ready_slot = current_slot;
        let seq = request.seq;
        registry.pending.retain(|s| *s != seq);
    }
    Ok(moved)
}

/// Settles an observed validator exit: Withdrawing -> Closed. Member
/// shares dissolve lazily into idle on each owner's next settlement.
pub fn close_pool(registry: &mut StakeRegistry, pool_id: u64, current_slot: u64) -> Result<u64> {
    let pool = registry
        .pools
        .iter_mut()
        .find(|p| p.id == pool_id)
        .ok_or(StakingError::UnknownPool)?;
    require!(
        pool.status == PoolStatus::Withdrawing as u8,
        StakingError::InvalidPoolStatus
    );
    let returned = pool.deposits;
    pool.undissolved = returned;
    pool.deposits = 0;
    pool.status = PoolStatus::Closed as u8;
    pool.closed_slot = current_slot;
    Ok(returned)
}

/// Drops Closed pools whose principal has fully dissolved. Keeps the
/// pool set bounded; enumeration stays ascending over the survivors.
pub fn prune_closed_pools(registry: &mut StakeRegistry) -> u64 {
    let before = registry.pools.len();
    registry
        .pools
        .retain(|p| !(p.status == PoolStatus::Closed as u8 && p.undissolved == 0));
    (before - registry.pools.len()) as u64
}

// -------------------------
// Validator descriptor core
// -------------------------

/// Structural checks only; key validity is the registrar's problem.
pub fn validate_submission(sub: &ValidatorSubmission, operator_count: u8) -> Result<()> {
    require!(
        sub.public_key.iter().any(|b| *b != 0),
        StakingError::MalformedValidatorDescriptor
    );
    require!(
        sub.signature.iter().any(|b| *b != 0),
        StakingError::MalformedValidatorDescriptor
    );
    require!(
        sub.operator_ids.len() == operator_count as usize
            && sub.operator_ids.len() <= MAX_OPERATORS,
        StakingError::MalformedValidatorDescriptor
    );
    for (i, id) in sub.operator_ids.iter().enumerate() {
        require!(
            !sub.operator_ids[..i].contains(id),
            StakingError::MalformedValidatorDescriptor
        );
    }
    require!(
        sub.shares_encrypted.len() == sub.operator_ids.len()
            && sub.shares_public_keys.len() == sub.operator_ids.len(),
        StakingError::MalformedValidatorDescriptor
    );
    Ok(())
}

/// sha256 digest binding the full submission, length-prefixed so
/// distinct share layouts cannot collide.
pub fn validator_digest(sub: &ValidatorSubmission) -> [u8; 32] {
    let mut ops = Vec::with_capacity(sub.operator_ids.len() * 8);
    for id in &sub.operator_ids {
        ops.extend_from_slice(&id.to_le_bytes());
    }
    let mut shares = Vec::new();
    for s in &sub.shares_encrypted {
        shares.extend_from_slice(&(s.len() as u32).to_le_bytes());
        shares.extend_from_slice(s);
    }
    for s in &sub.shares_public_keys {
        shares.extend_from_slice(&(s.len() as u32).to_le_bytes());
        shares.extend_from_slice(s);
    }
    hashv(&[
        VALIDATOR_DIGEST_DOMAIN,
        sub.public_key.as_ref(),
        ops.as_slice(),
        sub.withdrawal_credentials.as_ref(),
        sub.deposit_data_root.as_ref(),
        sub.signature.as_ref(),
        shares.as_slice(),
    ])
    .to_bytes()
}

/// Digest dedupe across the ready queue and every pool-married record.
pub fn is_known_digest(registry: &StakeRegistry, digest: &[u8; 32]) -> bool {
    registry.validators.iter().any(|v| v.digest == *digest)
        || registry.pools.iter().any(|p| {
            p.validator
                .as_ref()
                .map(|v| v.digest == *digest)
                .unwrap_or(false)
        })
}

// -------------------------
// Upkeep planning
// -------------------------

/// Full Open pools that a queued validator could activate, FIFO-fair.
pub fn plan_activations(registry: &StakeRegistry, capacity: u64) -> Vec<u64> {
    let mut available = registry.validators.len();
    let mut out = Vec::new();
    for pool in &registry.pools {
        if available == 0 || out.len() >= MAX_UPKEEP_ITEMS {
            break;
        }
        if pool.status == PoolStatus::Open as u8 && pool.deposits == capacity {
            out.push(pool.id);
            available -= 1;
        }
    }
    out
}

/// Staked pools to flip Withdrawing so the pending backlog can be
/// serviced: for each queued request, the oldest staked pools backing
/// its owner, until the uncovered remainder is covered. Pools already
/// on their way out (Withdrawing) and the owner's idle count as
/// coverage.
pub fn plan_exits(registry: &StakeRegistry, backlog: &[PendingBacklog]) -> Vec<u64> {
    let mut selected: Vec<u64> = Vec::new();
    for item in backlog {
        let mut covered = item.owner_idle;
        for ps in &item.owner_shares {
            let Some(pool) = registry.pools.iter().find(|p| p.id == ps.pool_id) else {
                continue;
            };
            let counts = pool.status == PoolStatus::Withdrawing as u8
                || (pool.status == PoolStatus::Staked as u8 && selected.contains(&pool.id));
            if counts {
                covered = covered.saturating_add(ps.amount);
            }
        }
        if covered >= item.remaining {
            continue;
        }
        let mut need = item.remaining - covered;

        let mut candidates: Vec<(u64, u64)> = item
            .owner_shares
            .iter()
            .filter(|ps| {
                !selected.contains(&ps.pool_id)
                    && registry
                        .pools
                        .iter()
                        .any(|p| p.id == ps.pool_id && p.status == PoolStatus::Staked as u8)
            })
            .map(|ps| (ps.pool_id, ps.amount))
            .collect();
        candidates.sort_unstable();

        for (pool_id, share) in candidates {
            if need == 0 || selected.len() >= MAX_UPKEEP_ITEMS {
                break;
            }
            selected.push(pool_id);
            need = need.saturating_sub(share);
        }
    }
    selected
}

/// Pending requests fundable (at least partially) from owner idle.
pub fn plan_ready_flips(backlog: &[PendingBacklog]) -> Vec<u64> {
    backlog
        .iter()
        .filter(|b| b.remaining > 0 && b.owner_idle > 0)
        .map(|b| b.seq)
        .take(MAX_UPKEEP_ITEMS)
        .collect()
}

// -------------------------
// Enumerations / views
// -------------------------

pub fn open_pool_ids(registry: &StakeRegistry) -> Vec<u64> {
    registry
        .pools
        .iter()
        .filter(|p| p.status == PoolStatus::Open as u8)
        .map(|p| p.id)
        .collect()
}

pub fn staked_pool_ids(registry: &StakeRegistry) -> Vec<u64> {
    registry
        .pools
        .iter()
        .filter(|p| p.status == PoolStatus::Staked as u8)
        .map(|p| p.id)
        .collect()
}

#[cfg(test)]
mod fixtures {
    use super::*;
    use crate::state::ValidatorRecord;

    pub const CAP: u64 = 32_000_000_000;
    pub const UNIT: u64 = 1_000_000_000;

    pub fn registry() -> StakeRegistry {
        StakeRegistry {
            admin: Pubkey::new_unique(),
            bump: 254,
            next_pool_id: 0,
            next_withdrawal_seq: 0,
            total_principal: 0,
            total_rewards: 0,
            reward_per_unit: 0,
            reward_carry: 0,
            pool_reward_carry: 0,
            pending_total: 0,
            earmarked: 0,
            pending: vec![],
            validators: vec![],
            pools: vec![],
            version: INITIAL_VERSION,
        }
    }

    pub fn user() -> UserAccount {
        UserAccount {
            user: Pubkey::new_unique(),
            bump: 253,
            principal: 0,
            idle: 0,
            locked: 0,
            accrued_scaled: 0,
            reward_per_unit_paid: 0,
            pool_shares: vec![],
            created_slot: 0,
            updated_slot: 0,
        }
    }

    pub fn request(seq: u64, user: &UserAccount) -> WithdrawalRequest {
        WithdrawalRequest {
            seq,
            user: user.user,
            bump: 252,
            amount: 0,
            reward_part: 0,
            principal_part: 0,
            remaining: 0,
            status: WithdrawalStatus::Pending as u8,
            created_slot: 0,
            ready_slot: 0,
            claimed_slot: 0,
        }
    }

    pub fn submission(tag: u8) -> ValidatorSubmission {
        ValidatorSubmission {
            deposit_data_root: [tag; 32],
            public_key: [tag.max(1); 48],
            operator_ids: vec![1, 2, 3, 4],
            shares_encrypted: vec![vec![tag; 64]; 4],
            shares_public_keys: vec![vec![tag; 48]; 4],
            signature: [tag.max(1); 96],
            withdrawal_credentials: [tag; 32],
        }
    }

    pub fn queue_validator(reg: &mut StakeRegistry, tag: u8) {
        let sub = submission(tag);
        let digest = validator_digest(&sub);
        reg.validators.push(ValidatorRecord {
            public_key: sub.public_key,
            operator_ids: sub.operator_ids.clone(),
            withdrawal_credentials: sub.withdrawal_credentials,
            deposit_data_root: sub.deposit_data_root,
            digest,
        });
    }

    /// Mirrors the deposit instruction's ledger path: settle, assign,
    /// credit, then eager activation.
    pub fn deposit(reg: &mut StakeRegistry, user: &mut UserAccount, net: u64) {
        settle_user(reg, user).unwrap();
        let slices = assign_deposit(reg, net, CAP, 0).unwrap();
        credit_deposit(reg, user, &slices).unwrap();
        activate_ready_pools(reg, CAP, 0).unwrap();
    }

    pub fn rewards_of(reg: &mut StakeRegistry, user: &mut UserAccount) -> u64 {
        settle_user(reg, user).unwrap();
        settled_rewards(user).unwrap()
    }

    pub fn assert_conservation(reg: &StakeRegistry, users: &[&UserAccount]) {
        let pooled: u64 = reg.pools.iter().map(|p| p.deposits).sum();
        let undissolved: u64 = reg.pools.iter().map(|p| p.undissolved).sum();
        let idle: u64 = users.iter().map(|u| u.idle).sum();
        let principal: u64 = users.iter().map(|u| u.principal).sum();
        assert_eq!(pooled + undissolved + idle, principal);
        assert_eq!(reg.total_principal, principal);
    }
}

#[cfg(test)]
mod pool_flow_tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn deposits_fill_fifo_and_activate_eagerly() {
        let mut reg = registry();
        queue_validator(&mut reg, 1);
        queue_validator(&mut reg, 2);

        let mut a = user();
        let mut b = user();
        let mut c = user();

        deposit(&mut reg, &mut a, 16 * UNIT);
        assert_eq!(open_pool_ids(&reg), vec![0]);
        assert_eq!(reg.pools[0].deposits, 16 * UNIT);

        // B fills pool 0 (activated) and opens pool 1 with the spill
        deposit(&mut reg, &mut b, 24 * UNIT);
        assert_eq!(staked_pool_ids(&reg), vec![0]);
        assert_eq!(open_pool_ids(&reg), vec![1]);
        assert_eq!(reg.pools[1].deposits, 8 * UNIT);
        assert!(reg.pools[0].validator.is_some());
        assert_eq!(reg.validators.len(), 1);
        assert_eq!(reg.total_principal, 40 * UNIT);

        // C fills pool 1; no third pool appears
        deposit(&mut reg, &mut c, 24 * UNIT);
        assert_eq!(staked_pool_ids(&reg), vec![0, 1]);
        assert!(open_pool_ids(&reg).is_empty());
        assert_eq!(reg.pools.len(), 2);
        assert_eq!(reg.total_principal, 64 * UNIT);

        assert_conservation(&reg, &[&a, &b, &c]);
    }

    #[test]
    fn one_deposit_can_span_several_pools() {
        let mut reg = registry();
        let mut a = user();
        deposit(&mut reg, &mut a, 80 * UNIT);
        assert_eq!(reg.pools.len(), 3);
        assert_eq!(reg.pools[0].deposits, CAP);
        assert_eq!(reg.pools[1].deposits, CAP);
        assert_eq!(reg.pools[2].deposits, 16 * UNIT);
        assert_eq!(a.pool_shares.len(), 3);
    }

    #[test]
    fn pool_limit_is_enforced() {
        let mut reg = registry();
        let mut a = user();
        deposit(&mut reg, &mut a, MAX_POOLS as u64 * CAP);
        assert_eq!(reg.pools.len(), MAX_POOLS);
        let err = assign_deposit(&mut reg, UNIT, CAP, 0).unwrap_err();
        assert_eq!(err, StakingError::PoolLimitReached.into());
    }

    #[test]
    fn rewards_split_over_total_outstanding_principal() {
        let mut reg = registry();
        queue_validator(&mut reg, 1);
        queue_validator(&mut reg, 2);

        let mut a = user();
        let mut b = user();

        deposit(&mut reg, &mut a, 16 * UNIT);
        deposit(&mut reg, &mut b, 24 * UNIT);

        // 0.1 over 16:24 (8 of B's 24 sit in the still-open pool 1)
        apply_reward(&mut reg, 100_000_000).unwrap();
        assert_eq!(rewards_of(&mut reg, &mut a), 40_000_000);
        assert_eq!(rewards_of(&mut reg, &mut b), 60_000_000);

        // staked-pool projection: pool 0 is the only staked pool
        assert_eq!(reg.pools[0].rewards_allocated, 100_000_000);
        assert_eq!(reg.pools[1].rewards_allocated, 0);

        let mut c = user();
        deposit(&mut reg, &mut c, 24 * UNIT);

        // second 0.1 over 16:24:24
        apply_reward(&mut reg, 100_000_000).unwrap();
        assert_eq!(rewards_of(&mut reg, &mut a), 65_000_000);
        assert_eq!(rewards_of(&mut reg, &mut b), 97_500_000);
        assert_eq!(rewards_of(&mut reg, &mut c), 37_500_000);

        assert_eq!(reg.pools[0].rewards_allocated, 150_000_000);
        assert_eq!(reg.pools[1].rewards_allocated, 50_000_000);
        assert_eq!(reg.total_rewards, 200_000_000);

        // distribution is exact in scaled units
        let claims = a.accrued_scaled + b.accrued_scaled + c.accrued_scaled;
        assert_eq!(
            claims + reg.reward_carry,
            reg.total_rewards as u128 * ACC_PRECISION
        );
    }

    #[test]
    fn late_joiners_do_not_share_in_earlier_rewards() {
        let mut reg = registry();
        let mut a = user();
        deposit(&mut reg, &mut a, 10 * UNIT);
        apply_reward(&mut reg, 50_000_000).unwrap();

        let mut late = user();
        deposit(&mut reg, &mut late, 10 * UNIT);
        assert_eq!(rewards_of(&mut reg, &mut late), 0);
        assert_eq!(rewards_of(&mut reg, &mut a), 50_000_000);
    }

    #[test]
    fn uneven_reward_carries_remainder_forward() {
        let mut reg = registry();
        let mut a = user();
        let mut b = user();
        deposit(&mut reg, &mut a, 3);
        deposit(&mut reg, &mut b, 4);

        // 10 over 7 units does not divide evenly
        apply_reward(&mut reg, 10).unwrap();
        let claims = {
            settle_user(&mut reg, &mut a).unwrap();
            settle_user(&mut reg, &mut b).unwrap();
            a.accrued_scaled + b.accrued_scaled
        };
        assert_eq!(claims + reg.reward_carry, 10 * ACC_PRECISION);
        assert!(reg.reward_carry > 0);

        // the carry is not lost: it joins the next event
        apply_reward(&mut reg, 4).unwrap();
        settle_user(&mut reg, &mut a).unwrap();
        settle_user(&mut reg, &mut b).unwrap();
        assert_eq!(
            a.accrued_scaled + b.accrued_scaled + reg.reward_carry,
            14 * ACC_PRECISION
        );
    }

    #[test]
    fn reward_with_no_stake_is_rejected() {
        let mut reg = registry();
        let err = apply_reward(&mut reg, UNIT).unwrap_err();
        assert_eq!(err, StakingError::NoStakeOutstanding.into());
    }
}

#[cfg(test)]
mod withdrawal_tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn over_withdrawal_is_rejected() {
        let mut reg = registry();
        let mut a = user();
        deposit(&mut reg, &mut a, 16 * UNIT);
        let err = plan_withdrawal(&reg, &a, 17 * UNIT).unwrap_err();
        assert_eq!(err, StakingError::InsufficientBalance.into());
    }

    #[test]
    fn liquid_withdrawal_is_ready_immediately() {
        let mut reg = registry();
        let mut a = user();
        deposit(&mut reg, &mut a, 16 * UNIT);
        apply_reward(&mut reg, 100_000_000).unwrap();
        settle_user(&mut reg, &mut a).unwrap();

        // rewards first, then open-pool shares
        let plan = plan_withdrawal(&reg, &a, 4 * UNIT).unwrap();
        assert_eq!(plan.reward_part, 100_000_000);
        assert_eq!(plan.idle_part, 0);
        assert_eq!(plan.open_takes, vec![(0, 4 * UNIT - 100_000_000)]);
        assert_eq!(plan.remaining, 0);

        let mut req = request(0, &a);
        apply_withdrawal(&mut reg, &mut a, &mut req, &plan, 7).unwrap();
        assert_eq!(req.status, WithdrawalStatus::Ready as u8);
        assert_eq!(reg.earmarked, 4 * UNIT);
        assert_eq!(a.principal, 16 * UNIT - (4 * UNIT - 100_000_000));
        assert_eq!(reg.pools[0].deposits, 16 * UNIT - (4 * UNIT - 100_000_000));
        assert!(reg.pending.is_empty());
        assert_conservation(&reg, &[&a]);
    }

    #[test]
    fn open_pools_unwind_newest_first() {
        let mut reg = registry();
        let mut a = user();
        deposit(&mut reg, &mut a, 40 * UNIT); // pool 0 full, pool 1 at 8

        let plan = plan_withdrawal(&reg, &a, 10 * UNIT).unwrap();
        // pool 1 (newest) drains before pool 0 loses its fill
        assert_eq!(plan.open_takes, vec![(1, 8 * UNIT), (0, 2 * UNIT)]);
        assert_eq!(plan.remaining, 0);
    }

    #[test]
    fn staked_remainder_goes_pending_and_locks() {
        let mut reg = registry();
        queue_validator(&mut reg, 1);
        let mut a = user();
        deposit(&mut reg, &mut a, 32 * UNIT); // fully staked

        let plan = plan_withdrawal(&reg, &a, 10 * UNIT).unwrap();
        assert_eq!(plan.remaining, 10 * UNIT);

        let mut req = request(0, &a);
        apply_withdrawal(&mut reg, &mut a, &mut req, &plan, 7).unwrap();
        assert_eq!(req.status, WithdrawalStatus::Pending as u8);
        assert_eq!(a.locked, 10 * UNIT);
        assert_eq!(reg.pending_total, 10 * UNIT);
        assert_eq!(reg.pending, vec![0]);

        // principal stays staked and keeps earning
        assert_eq!(a.principal, 32 * UNIT);
        apply_reward(&mut reg, 100_000_000).unwrap();
        assert_eq!(rewards_of(&mut reg, &mut a), 100_000_000);

        // a second request may not touch the locked portion
        let err = plan_withdrawal(&reg, &a, 23 * UNIT).unwrap_err();
        assert_eq!(err, StakingError::InsufficientBalance.into());
    }

    #[test]
    fn exit_and_idle_funding_readies_the_request() {
        let mut reg = registry();
        queue_validator(&mut reg, 1);
        let mut a = user();
        deposit(&mut reg, &mut a, 32 * UNIT);

        let plan = plan_withdrawal(&reg, &a, 10 * UNIT).unwrap();
        let mut req = request(0, &a);
        apply_withdrawal(&mut reg, &mut a, &mut req, &plan, 7).unwrap();

        // the pool exits: Staked -> Withdrawing -> Closed
        reg.pools[0].status = PoolStatus::Withdrawing as u8;
        let returned = close_pool(&mut reg, 0, 9).unwrap();
        assert_eq!(returned, 32 * UNIT);

        // settlement dissolves the member's shares into idle
        settle_user(&mut reg, &mut a).unwrap();
        assert_eq!(a.idle, 32 * UNIT);
        assert!(a.pool_shares.is_empty());
        assert_conservation(&reg, &[&a]);

        let funded = fund_from_idle(&mut reg, &mut a, &mut req, 11).unwrap();
        assert_eq!(funded, 10 * UNIT);
        assert_eq!(req.status, WithdrawalStatus::Ready as u8);
        assert_eq!(a.idle, 22 * UNIT);
        assert_eq!(a.locked, 0);
        assert_eq!(reg.pending_total, 0);
        assert!(reg.pending.is_empty());
        assert_eq!(reg.earmarked, 10 * UNIT);

        // fully dissolved closed pool is prunable
        assert_eq!(prune_closed_pools(&mut reg), 1);
        assert!(reg.pools.is_empty());
        assert_conservation(&reg, &[&a]);
    }

    #[test]
    fn idle_committed_to_pending_claims_is_reserved() {
        let mut reg = registry();
        let mut a = user();
        a.principal = 20 * UNIT;
        a.idle = 6 * UNIT;
        a.locked = 10 * UNIT;
        a.pool_shares = vec![PoolShare {
            pool_id: 0,
            amount: 14 * UNIT,
        }];
        reg.total_principal = 20 * UNIT;
        reg.pools.push(Pool {
            id: 0,
            deposits: 14 * UNIT,
            status: PoolStatus::Staked as u8,
            rewards_allocated: 0,
            undissolved: 0,
            validator: None,
            created_slot: 0,
            staked_slot: 0,
            closed_slot: 0,
        });

        // idle 6 < locked 10, so nothing of it is free
        let plan = plan_withdrawal(&reg, &a, 4 * UNIT).unwrap();
        assert_eq!(plan.idle_part, 0);
        assert_eq!(plan.remaining, 4 * UNIT);
    }

    #[test]
    fn deposit_funds_queue_head_by_share_transfer() {
        let mut reg = registry();
        queue_validator(&mut reg, 1);
        let mut exiter = user();
        deposit(&mut reg, &mut exiter, 32 * UNIT);

        let plan = plan_withdrawal(&reg, &exiter, 16 * UNIT).unwrap();
        let mut req = request(0, &exiter);
        apply_withdrawal(&mut reg, &mut exiter, &mut req, &plan, 7).unwrap();

        let mut depositor = user();
        settle_user(&mut reg, &mut depositor).unwrap();
        let moved =
            fund_from_transfer(&mut reg, &mut req, &mut exiter, &mut depositor, 10 * UNIT, 9)
                .unwrap();
        assert_eq!(moved, 10 * UNIT);
        assert_eq!(req.remaining, 6 * UNIT);
        assert_eq!(req.status, WithdrawalStatus::Pending as u8);

        // shares moved at equal value, pool reserves untouched
        assert_eq!(exiter.principal, 22 * UNIT);
        assert_eq!(depositor.principal, 10 * UNIT);
        assert_eq!(depositor.pool_shares[0].pool_id, 0);
        assert_eq!(reg.pools[0].deposits, 32 * UNIT);
        assert_eq!(reg.pending_total, 6 * UNIT);
        assert_eq!(reg.earmarked, 10 * UNIT);
        assert_conservation(&reg, &[&exiter, &depositor]);

        // a second transfer completes the request and dequeues it
        let moved =
            fund_from_transfer(&mut reg, &mut req, &mut exiter, &mut depositor, 6 * UNIT, 9)
                .unwrap();
        assert_eq!(moved, 6 * UNIT);
        assert_eq!(req.status, WithdrawalStatus::Ready as u8);
        assert!(reg.pending.is_empty());
        assert_eq!(exiter.locked, 0);
    }

    #[test]
    fn queue_capacity_is_checked_before_mutation() {
        let mut reg = registry();
        queue_validator(&mut reg, 1);
        let mut a = user();
        deposit(&mut reg, &mut a, 32 * UNIT);
        reg.pending = (0..MAX_PENDING_WITHDRAWALS as u64).collect();

        let before = (a.principal, a.locked);
        let err = plan_withdrawal(&reg, &a, 10 * UNIT).unwrap_err();
        assert_eq!(err, StakingError::WithdrawalQueueFull.into());
        assert_eq!((a.principal, a.locked), before);
    }
}

#[cfg(test)]
mod validator_tests {
    use super::fixtures::*;
    use super::*;
    use crate::state::ValidatorRecord;

    #[test]
    fn structural_validation_catches_malformed_descriptors() {
        let good = submission(1);
        assert!(validate_submission(&good, 4).is_ok());

        let mut zero_key = submission(1);
        zero_key.public_key = [0; 48];
        assert!(validate_submission(&zero_key, 4).is_err());

        let mut zero_sig = submission(1);
        zero_sig.signature = [0; 96];
        assert!(validate_submission(&zero_sig, 4).is_err());

        let mut wrong_count = submission(1);
        wrong_count.operator_ids = vec![1, 2, 3];
        assert!(validate_submission(&wrong_count, 4).is_err());

        let mut dup_ops = submission(1);
        dup_ops.operator_ids = vec![1, 2, 2, 4];
        assert!(validate_submission(&dup_ops, 4).is_err());

        let mut short_shares = submission(1);
        short_shares.shares_encrypted.pop();
        assert!(validate_submission(&short_shares, 4).is_err());
    }

    #[test]
    fn digest_binds_the_full_submission() {
        let a = submission(1);
        let mut b = submission(1);
        assert_eq!(validator_digest(&a), validator_digest(&b));

        b.shares_encrypted[0][0] ^= 1;
        assert_ne!(validator_digest(&a), validator_digest(&b));
    }

    #[test]
    fn duplicate_digest_is_detected_in_queue_and_pools() {
        let mut reg = registry();
        let sub = submission(1);
        let digest = validator_digest(&sub);
        assert!(!is_known_digest(&reg, &digest));

        queue_validator(&mut reg, 1);
        assert!(is_known_digest(&reg, &digest));

        // marry it to a pool; dedupe must still see it
        let mut a = user();
        deposit(&mut reg, &mut a, 32 * UNIT);
        assert!(reg.validators.is_empty());
        assert!(is_known_digest(&reg, &digest));
    }

    #[test]
    fn validator_record_round_trips_through_marriage() {
        let mut reg = registry();
        queue_validator(&mut reg, 7);
        let mut a = user();
        deposit(&mut reg, &mut a, 32 * UNIT);

        let record: &ValidatorRecord = reg.pools[0].validator.as_ref().unwrap();
        assert_eq!(record.public_key, [7u8; 48]);
        assert_eq!(record.operator_ids, vec![1, 2, 3, 4]);
    }
}

#[cfg(test)]
mod upkeep_tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn activations_wait_for_a_validator() {
        let mut reg = registry();
        let mut a = user();
        deposit(&mut reg, &mut a, 32 * UNIT); // full pool, no validator yet
        assert!(plan_activations(&reg, CAP).is_empty());

        queue_validator(&mut reg, 1);
        assert_eq!(plan_activations(&reg, CAP), vec![0]);

        // applying the activation empties the plan
        activate_ready_pools(&mut reg, CAP, 5).unwrap();
        assert!(plan_activations(&reg, CAP).is_empty());
    }

    #[test]
    fn exits_cover_the_backlog_with_oldest_backing_pools() {
        let mut reg = registry();
        queue_validator(&mut reg, 1);
        queue_validator(&mut reg, 2);
        let mut a = user();
        deposit(&mut reg, &mut a, 64 * UNIT); // pools 0 and 1, both staked

        let backlog = vec![PendingBacklog {
            seq: 0,
            remaining: 10 * UNIT,
            owner_idle: 0,
            owner_shares: a.pool_shares.clone(),
        }];
        // one pool covers 32 >= 10
        assert_eq!(plan_exits(&reg, &backlog), vec![0]);

        // a pool already Withdrawing counts as coverage
        reg.pools[0].status = PoolStatus::Withdrawing as u8;
        assert!(plan_exits(&reg, &backlog).is_empty());

        // owner idle counts as coverage too
        reg.pools[0].status = PoolStatus::Staked as u8;
        let covered = vec![PendingBacklog {
            seq: 0,
            remaining: 10 * UNIT,
            owner_idle: 10 * UNIT,
            owner_shares: a.pool_shares.clone(),
        }];
        assert!(plan_exits(&reg, &covered).is_empty());
    }

    #[test]
    fn large_backlog_selects_several_pools() {
        let mut reg = registry();
        queue_validator(&mut reg, 1);
        queue_validator(&mut reg, 2);
        let mut a = user();
        deposit(&mut reg, &mut a, 64 * UNIT);

        let backlog = vec![PendingBacklog {
            seq: 0,
            remaining: 50 * UNIT,
            owner_idle: 0,
            owner_shares: a.pool_shares.clone(),
        }];
        assert_eq!(plan_exits(&reg, &backlog), vec![0, 1]);
    }

    #[test]
    fn ready_flips_require_idle_and_an_open_remainder() {
        let backlog = vec![
            PendingBacklog {
                seq: 3,
                remaining: 5,
                owner_idle: 1,
                owner_shares: vec![],
            },
            PendingBacklog {
                seq: 4,
                remaining: 5,
                owner_idle: 0,
                owner_shares: vec![],
            },
            PendingBacklog {
                seq: 5,
                remaining: 0,
                owner_idle: 9,
                owner_shares: vec![],
            },
        ];
        assert_eq!(plan_ready_flips(&backlog), vec![3]);
    }

    #[test]
    fn stale_items_are_silent_no_ops() {
        let mut reg = registry();
        queue_validator(&mut reg, 1);
        let mut a = user();
        deposit(&mut reg, &mut a, 32 * UNIT);

        // double close attempt
        reg.pools[0].status = PoolStatus::Withdrawing as u8;
        close_pool(&mut reg, 0, 5).unwrap();
        let err = close_pool(&mut reg, 0, 6).unwrap_err();
        assert_eq!(err, StakingError::InvalidPoolStatus.into());

        // funding a request twice moves nothing the second time
        settle_user(&mut reg, &mut a).unwrap();
        let mut req = request(0, &a);
        req.remaining = 4 * UNIT;
        a.locked = 4 * UNIT;
        reg.pending_total = 4 * UNIT;
        reg.pending.push(0);

        assert_eq!(fund_from_idle(&mut reg, &mut a, &mut req, 7).unwrap(), 4 * UNIT);
        assert_eq!(fund_from_idle(&mut reg, &mut a, &mut req, 8).unwrap(), 0);
    }

    #[test]
    fn pruning_keeps_enumeration_ascending() {
        let mut reg = registry();
        queue_validator(&mut reg, 1);
        let mut a = user();
        let mut b = user();
        deposit(&mut reg, &mut a, 32 * UNIT); // pool 0 staked
        deposit(&mut reg, &mut b, 8 * UNIT); // pool 1 open

        reg.pools[0].status = PoolStatus::Withdrawing as u8;
        close_pool(&mut reg, 0, 5).unwrap();
        settle_user(&mut reg, &mut a).unwrap();
        assert_eq!(prune_closed_pools(&mut reg), 1);
        assert_eq!(open_pool_ids(&reg), vec![1]);

        // new pools keep ascending ids after the prune
        queue_validator(&mut reg, 2);
        deposit(&mut reg, &mut b, 32 * UNIT); // fills pool 1, opens pool 2
        assert_eq!(staked_pool_ids(&reg), vec![1]);
        assert_eq!(open_pool_ids(&reg), vec![2]);
    }
}
