use anchor_lang::prelude::*;

#[event]
pub struct DepositEvent {
    pub user: Pubkey,
    pub gross: u64,
    pub net: u64,
    pub fee: u64,
    pub slot: u64,
}

#[event]
pub struct PoolOpenedEvent {
    pub pool_id: u64,
    pub slot: u64,
}

#[event]
pub struct PoolStakedEvent {
    pub pool_id: u64,
    pub validator_public_key: [u8; 48],
    pub slot: u64,
}

#[event]
pub struct RewardDistributedEvent {
    pub amount: u64,
    pub total_principal: u64,
    pub reward_per_unit: u128,
    pub slot: u64,
}

#[event]
pub struct ValidatorRegisteredEvent {
    pub digest: [u8; 32],
    pub public_key: [u8; 48],
    pub operator_ids: Vec<u64>,
    pub withdrawal_credentials: [u8; 32],
    pub deposit_data_root: [u8; 32],
    pub signature: [u8; 96],
    /// Encrypted key shares and their public keys ride on the event
    /// stream instead of the registry account.
    pub shares_encrypted: Vec<Vec<u8>>,
    pub shares_public_keys: Vec<Vec<u8>>,
    pub slot: u64,
}

#[event]
pub struct WithdrawalRequestedEvent {
    pub seq: u64,
    pub user: Pubkey,
    pub amount: u64,
    pub reward_part: u64,
    pub principal_part: u64,
    pub remaining: u64,
    pub slot: u64,
}

#[event]
pub struct WithdrawalReadyEvent {
    pub seq: u64,
    pub user: Pubkey,
    pub slot: u64,
}

#[event]
pub struct WithdrawalClaimedEvent {
    pub seq: u64,
    pub user: Pubkey,
    pub amount: u64,
    pub slot: u64,
}

#[event]
pub struct PoolExitingEvent {
    pub pool_id: u64,
    pub slot: u64,
}

#[event]
pub struct PoolClosedEvent {
    pub pool_id: u64,
    pub returned_principal: u64,
    pub slot: u64,
}

#[event]
pub struct UpkeepPerformedEvent {
    pub activations: u64,
    pub exits: u64,
    pub ready_flips: u64,
    pub skipped: u64,
    pub slot: u64,
}

#[event]
pub struct FeeUpdatedEvent {
    pub name: String,
    pub bps: u16,
    pub slot: u64,
}
