//! Error types for the BRAX engine.
//!
//! Every fallible entry point returns [`Result`]. Display strings keep the
//! revert messages of the deployed contracts so operators see the same text
//! whether they read chain traces or engine logs.

use thiserror::Error;

/// Result type alias for BRAX operations
pub type Result<T> = std::result::Result<T, Error>;

/// Broad error classes, used by callers that only care about how to react
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or rejected input
    Validation,
    /// Caller lacks the role required by the entry point
    Permission,
    /// A time gate (cooldown, TWAP period, pause) is not open yet
    Temporal,
    /// Price data is older than its freshness window
    Staleness,
    /// Pool level checks (ceilings, slippage, thresholds, balances)
    Pool,
    /// Overflow or division by zero
    Arithmetic,
    /// Serialization, storage and other internal failures
    Internal,
}

/// Main error type for the BRAX engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════════════
    // Validation Errors
    // ═══════════════════════════════════════════════════════════════════

    /// The zero address was supplied where a real address is required
    #[error("Zero address detected")]
    ZeroAddress,

    /// Address string could not be parsed
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Pool is already registered
    #[error("Address already exists: {0}")]
    PoolAlreadyExists(String),

    /// Pool is not registered
    #[error("Address nonexistant: {0}")]
    PoolNonexistent(String),

    /// Token is not part of the oracle's pair
    #[error("INVALID_TOKEN: {0}")]
    InvalidToken(String),

    /// Array read past the last assigned slot
    #[error("Index {index} out of range (length {len})")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Current length
        len: usize,
    },

    /// Invalid parameter value
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Zero amount not allowed
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    // ═══════════════════════════════════════════════════════════════════
    // Permission Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Governance-only entry point called by someone else
    #[error("Not the owner, controller, or the governance timelock")]
    NotGovernance,

    /// Caller may not pause the collateral ratio
    #[error("!pauser")]
    NotPauser,

    /// Pool-only hook called by a non-pool
    #[error("Only brax pools can call this function")]
    NotPool,

    /// Oracle administration by someone other than owner or timelock
    #[error("You are not an owner or the governance timelock")]
    NotOracleOwner,

    /// Pool administration by someone other than manager or timelock
    #[error("Not owner or timelock")]
    NotPoolAdmin,

    // ═══════════════════════════════════════════════════════════════════
    // Temporal Errors
    // ═══════════════════════════════════════════════════════════════════

    /// TWAP update attempted before a full period has elapsed
    #[error("PERIOD_NOT_ELAPSED: {elapsed}s elapsed, period is {period}s")]
    PeriodNotElapsed {
        /// Seconds since the last update
        elapsed: u64,
        /// Required period
        period: u64,
    },

    /// Collateral ratio refresh attempted inside the cooldown
    #[error("Must wait for the refresh cooldown since last refresh ({remaining}s remaining)")]
    RefreshCooldown {
        /// Seconds until the next refresh is allowed
        remaining: u64,
    },

    /// Collateral ratio refresh attempted while paused
    #[error("Collateral Ratio has been paused")]
    CollateralRatioPaused,

    /// Redemption collected before the delay elapsed
    #[error("Must wait for redemption_delay ({remaining}s remaining)")]
    RedemptionDelay {
        /// Seconds until collection is allowed
        remaining: u64,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Oracle Errors
    // ═══════════════════════════════════════════════════════════════════

    /// TWAP average too old to consult
    #[error("Price is stale need to call update (age {age}s, limit {max_age}s)")]
    StaleOracle {
        /// Seconds since the last update
        age: u64,
        /// Freshness window
        max_age: u64,
    },

    /// External feed answer too old
    #[error("Feed price is stale: age {age}s exceeds {max_age}s")]
    StalePrice {
        /// Seconds since the feed's last round
        age: u64,
        /// Maximum accepted age
        max_age: u64,
    },

    /// No oracle assigned for the requested asset
    #[error("No oracle assigned for {0}")]
    OracleNotSet(String),

    /// Assigned oracle address has no deployed oracle
    #[error("Oracle not deployed: {0}")]
    OracleNotFound(String),

    /// Collateral price feed not configured
    #[error("Collateral price feed not set")]
    FeedNotSet,

    /// Pair has an empty reserve
    #[error("NO_RESERVES")]
    NoReserves,

    /// Price is zero, negative or otherwise unusable
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    /// Pair address unknown to the market
    #[error("Pair not found: {0}")]
    PairNotFound(String),

    // ═══════════════════════════════════════════════════════════════════
    // Pool Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Registered pool has no deployed pool state
    #[error("Pool not deployed: {0}")]
    PoolNotFound(String),

    /// Collateral index not configured in the pool
    #[error("Invalid collateral index {0}")]
    InvalidCollateralIndex(usize),

    /// Collateral is disabled
    #[error("Collateral disabled")]
    CollateralDisabled,

    /// Minting is paused for this collateral
    #[error("Minting is paused")]
    MintPaused,

    /// Redeeming is paused for this collateral
    #[error("Redeeming is paused")]
    RedeemPaused,

    /// BRAX trades below the mint threshold
    #[error("BRAX price too low: {price} < {threshold}")]
    MintPriceTooLow {
        /// Current BRAX price
        price: u128,
        /// Mint threshold
        threshold: u128,
    },

    /// BRAX trades above the redeem threshold
    #[error("BRAX price too high: {price} > {threshold}")]
    RedeemPriceTooHigh {
        /// Current BRAX price
        price: u128,
        /// Redeem threshold
        threshold: u128,
    },

    /// Output below the caller's minimum or input above the caller's maximum
    #[error("{0} slippage")]
    Slippage(String),

    /// Mint would push free collateral above the pool ceiling
    #[error("Pool ceiling: {requested} exceeds {ceiling}")]
    PoolCeiling {
        /// Free collateral after the mint
        requested: u128,
        /// Pool ceiling
        ceiling: u128,
    },

    /// Pool lacks free collateral for a redemption
    #[error("Insufficient pool collateral: required {required}, available {available}")]
    InsufficientPoolCollateral {
        /// Required collateral
        required: u128,
        /// Free collateral
        available: u128,
    },

    /// Ledger balance too low
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Required amount
        required: u128,
        /// Available balance
        available: u128,
    },

    /// Ledger allowance too low
    #[error("Insufficient allowance: required {required}, available {available}")]
    InsufficientAllowance {
        /// Required amount
        required: u128,
        /// Approved amount
        available: u128,
    },

    /// Token ledger unknown to the controller
    #[error("Unknown token: {0}")]
    UnknownToken(String),

    // ═══════════════════════════════════════════════════════════════════
    // Arithmetic Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Arithmetic overflow
    #[error("Arithmetic overflow in {operation}")]
    Overflow {
        /// Operation that overflowed
        operation: String,
    },

    /// Division by zero
    #[error("Division by zero in {operation}")]
    DivisionByZero {
        /// Operation that divided
        operation: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Serialization / Storage Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    // ═══════════════════════════════════════════════════════════════════
    // Internal Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Lock acquisition failed
    #[error("Failed to acquire lock")]
    Lock,
}

impl Error {
    /// Builds an [`Error::Overflow`] for the named operation
    pub fn overflow(operation: &str) -> Self {
        Error::Overflow {
            operation: operation.into(),
        }
    }

    /// Builds an [`Error::DivisionByZero`] for the named operation
    pub fn division_by_zero(operation: &str) -> Self {
        Error::DivisionByZero {
            operation: operation.into(),
        }
    }

    /// Builds an [`Error::InvalidParameter`]
    pub fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Broad class of this error
    pub fn kind(&self) -> ErrorKind {
        match self.code() / 1000 {
            1 => ErrorKind::Validation,
            2 => ErrorKind::Permission,
            3 => ErrorKind::Temporal,
            4 => match self {
                Error::StaleOracle { .. } | Error::StalePrice { .. } => ErrorKind::Staleness,
                _ => ErrorKind::Validation,
            },
            5 => ErrorKind::Pool,
            6 => ErrorKind::Arithmetic,
            _ => ErrorKind::Internal,
        }
    }

    /// Returns true if the same call may succeed later without any state change by the caller
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Temporal | ErrorKind::Staleness)
    }

    /// Returns true if this is a critical error requiring immediate attention
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Error::Internal(_) | Error::Overflow { .. } | Error::Lock
        )
    }

    /// Returns the error code for external systems
    pub fn code(&self) -> u32 {
        match self {
            // Validation errors: 1xxx
            Error::ZeroAddress => 1001,
            Error::InvalidAddress(_) => 1002,
            Error::PoolAlreadyExists(_) => 1003,
            Error::PoolNonexistent(_) => 1004,
            Error::InvalidToken(_) => 1005,
            Error::IndexOutOfRange { .. } => 1006,
            Error::InvalidParameter { .. } => 1007,
            Error::ZeroAmount => 1008,

            // Permission errors: 2xxx
            Error::NotGovernance => 2001,
            Error::NotPauser => 2002,
            Error::NotPool => 2003,
            Error::NotOracleOwner => 2004,
            Error::NotPoolAdmin => 2005,

            // Temporal errors: 3xxx
            Error::PeriodNotElapsed { .. } => 3001,
            Error::RefreshCooldown { .. } => 3002,
            Error::CollateralRatioPaused => 3003,
            Error::RedemptionDelay { .. } => 3004,

            // Oracle errors: 4xxx
            Error::StaleOracle { .. } => 4001,
            Error::StalePrice { .. } => 4002,
            Error::OracleNotSet(_) => 4003,
            Error::OracleNotFound(_) => 4004,
            Error::FeedNotSet => 4005,
            Error::NoReserves => 4006,
            Error::InvalidPrice(_) => 4007,
            Error::PairNotFound(_) => 4008,

            // Pool errors: 5xxx
            Error::PoolNotFound(_) => 5001,
            Error::InvalidCollateralIndex(_) => 5002,
            Error::CollateralDisabled => 5003,
            Error::MintPaused => 5004,
            Error::RedeemPaused => 5005,
            Error::MintPriceTooLow { .. } => 5006,
            Error::RedeemPriceTooHigh { .. } => 5007,
            Error::Slippage(_) => 5008,
            Error::PoolCeiling { .. } => 5009,
            Error::InsufficientPoolCollateral { .. } => 5010,
            Error::InsufficientBalance { .. } => 5011,
            Error::InsufficientAllowance { .. } => 5012,
            Error::UnknownToken(_) => 5013,

            // Arithmetic errors: 6xxx
            Error::Overflow { .. } => 6001,
            Error::DivisionByZero { .. } => 6002,

            // Serialization errors: 7xxx
            Error::Serialization(_) => 7001,
            Error::Deserialization(_) => 7002,
            Error::Storage(_) => 7003,
            Error::Config(_) => 7004,

            // Internal errors: 9xxx
            Error::Internal(_) => 9001,
            Error::Lock => 9002,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_unique() {
        let codes = vec![
            Error::ZeroAddress.code(),
            Error::PoolAlreadyExists("".into()).code(),
            Error::NotGovernance.code(),
            Error::NotPauser.code(),
            Error::PeriodNotElapsed { elapsed: 0, period: 0 }.code(),
            Error::RefreshCooldown { remaining: 0 }.code(),
            Error::StaleOracle { age: 0, max_age: 0 }.code(),
            Error::StalePrice { age: 0, max_age: 0 }.code(),
            Error::PoolCeiling { requested: 0, ceiling: 0 }.code(),
            Error::overflow("").code(),
            Error::Internal("".into()).code(),
        ];

        let mut unique_codes = codes.clone();
        unique_codes.sort();
        unique_codes.dedup();

        assert_eq!(codes.len(), unique_codes.len(), "Error codes must be unique");
    }

    #[test]
    fn test_revert_messages() {
        assert_eq!(Error::ZeroAddress.to_string(), "Zero address detected");
        assert_eq!(Error::NotPauser.to_string(), "!pauser");
        assert_eq!(
            Error::CollateralRatioPaused.to_string(),
            "Collateral Ratio has been paused"
        );
        assert!(Error::RefreshCooldown { remaining: 10 }
            .to_string()
            .starts_with("Must wait for the refresh cooldown since last refresh"));
        assert!(Error::StaleOracle { age: 3800, max_age: 3720 }
            .to_string()
            .contains("Price is stale"));
        assert!(Error::PoolNonexistent("0x00".into())
            .to_string()
            .starts_with("Address nonexistant"));
    }

    #[test]
    fn test_kind_and_retryable() {
        assert_eq!(Error::ZeroAddress.kind(), ErrorKind::Validation);
        assert_eq!(Error::NotPool.kind(), ErrorKind::Permission);
        assert_eq!(Error::StalePrice { age: 1, max_age: 0 }.kind(), ErrorKind::Staleness);
        assert_eq!(Error::FeedNotSet.kind(), ErrorKind::Validation);
        assert_eq!(Error::division_by_zero("x").kind(), ErrorKind::Arithmetic);

        assert!(Error::RefreshCooldown { remaining: 5 }.is_retryable());
        assert!(Error::StaleOracle { age: 1, max_age: 0 }.is_retryable());
        assert!(!Error::NotGovernance.is_retryable());
    }

    #[test]
    fn test_is_critical() {
        assert!(Error::overflow("test").is_critical());
        assert!(!Error::ZeroAddress.is_critical());
    }
}
