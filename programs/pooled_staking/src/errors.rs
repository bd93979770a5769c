use anchor_lang::prelude::*;

#[error_code]
pub enum StakingError {
    #[msg("Unauthorized")]
    Unauthorized,
    #[msg("Protocol paused")]
    Paused,
    #[msg("Invalid amount (must be > 0)")]
    InvalidAmount,
    #[msg("Math overflow")]
    MathOverflow,

    #[msg("Unknown fee name")]
    UnknownFee,
    #[msg("Invalid fee bps (must be 0..=10_000)")]
    InvalidFeeBps,
    #[msg("Invalid pool capacity")]
    InvalidPoolCapacity,
    #[msg("Invalid operator count")]
    InvalidOperatorCount,

    #[msg("Pool capacity exceeded")]
    CapacityExceeded,
    #[msg("Pool limit reached")]
    PoolLimitReached,
    #[msg("Unknown pool id")]
    UnknownPool,
    #[msg("Pool is not in the required status")]
    InvalidPoolStatus,

    #[msg("Insufficient withdrawable balance")]
    InsufficientBalance,
    #[msg("Withdrawal queue is full")]
    WithdrawalQueueFull,
    #[msg("Withdrawal request accounts missing from instruction")]
    WithdrawalAccountsMissing,
    #[msg("Withdrawal request not ready")]
    WithdrawalNotReady,
    #[msg("User pool list is full")]
    UserPoolListFull,
    #[msg("No stake outstanding to reward")]
    NoStakeOutstanding,

    #[msg("Malformed validator descriptor")]
    MalformedValidatorDescriptor,
    #[msg("Validator already registered")]
    ValidatorAlreadyRegistered,
    #[msg("Validator queue is full")]
    ValidatorQueueFull,

    #[msg("Upkeep payload too large")]
    UpkeepPayloadTooLarge,

    #[msg("User account PDA mismatch")]
    UserPdaMismatch,
    #[msg("Withdrawal request PDA mismatch")]
    WithdrawalPdaMismatch,
    #[msg("Account not owned by program")]
    AccountNotOwnedByProgram,
    #[msg("Failed to borrow account data")]
    AccountBorrowFailed,

    #[msg("Stake mint does not match config")]
    StakeMintMismatch,
    #[msg("Insufficient vault funds")]
    InsufficientVaultFunds,
}
