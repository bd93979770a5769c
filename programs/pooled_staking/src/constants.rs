// Centralized Protocol Constants

// Units & Fees
// ============

/// Basis-point denominator. 100 bps = 1%.
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Fixed-point scale for the reward-per-unit accumulator.
pub const ACC_PRECISION: u128 = 1_000_000_000_000;

/// Default pool capacity in base units (32.0 stake, assuming 9 decimals).
pub const DEFAULT_POOL_CAPACITY: u64 = 32_000_000_000;

/// Default operator group size per validator.
pub const DEFAULT_OPERATOR_COUNT: u8 = 4;

/// Default operator fee (basis points). 100 = 1%.
pub const DEFAULT_OPERATOR_FEE_BPS: u16 = 100;

/// Default network fee (basis points). 100 = 1%.
pub const DEFAULT_NETWORK_FEE_BPS: u16 = 100;

// Registry bounds
// ===============
// Fixed max_len values keep the registry account size deterministic.

/// Max operator ids per validator descriptor.
pub const MAX_OPERATORS: usize = 8;

/// Max live pool entries in the registry. Upkeep prunes fully
/// dissolved Closed pools, so this bounds concurrency, not lifetime.
pub const MAX_POOLS: usize = 16;

/// Max queued (unmarried) validator descriptors.
pub const MAX_READY_VALIDATORS: usize = 8;

/// Max queued pending withdrawal requests.
pub const MAX_PENDING_WITHDRAWALS: usize = 16;

/// Max distinct pools a single user may hold shares in.
pub const MAX_USER_POOLS: usize = 16;

/// Max items per upkeep action list.
pub const MAX_UPKEEP_ITEMS: usize = 16;

// Validator descriptor wire sizes (BLS12-381)
// ===========================================

pub const VALIDATOR_PUBKEY_BYTES: usize = 48;
pub const VALIDATOR_SIGNATURE_BYTES: usize = 96;

/// Initial version for account structures.
pub const INITIAL_VERSION: u16 = 1;
