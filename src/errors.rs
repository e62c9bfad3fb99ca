// Error types and error handling module
// This file defines the closed error taxonomy of the router: validation,
// resolution, adapter, native-asset, ledger, slippage, authorization and
// admission
//
// Numan Thabit 2025 Nov

use std::fmt;

use thiserror::Error;

use crate::ledger::LedgerError;
use crate::router::routes::{AssetId, ProtocolId};

/// Structural case a route resolution fell into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteCase {
    MajorToMajor = 1,
    MinorToMajor = 2,
    MajorToMinor = 3,
    MinorToMinor = 4,
}

impl RouteCase {
    pub fn number(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for RouteCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Rejections raised by administrative mutations. A failing batch commits nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("protocol type not set")]
    ProtocolUnset,
    #[error("edge is loop")]
    EdgeIsLoop,
    #[error("route broken")]
    RouteBroken,
    #[error("route is loop")]
    RouteIsLoop,
    #[error("route is empty")]
    EmptyRoute,
    #[error("lp entry has no underlying assets")]
    EmptyUnderlying,
    #[error("length discrepancy")]
    LengthDiscrepancy,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("{case}!path from major asset")]
    NoPathFromMajorAsset { case: RouteCase },
    #[error("{case}!path from input asset")]
    NoPathFromInputAsset { case: RouteCase },
    #[error("{case}!path from output asset")]
    NoPathFromOutputAsset { case: RouteCase },
}

impl ResolutionError {
    pub fn case(&self) -> RouteCase {
        match self {
            Self::NoPathFromMajorAsset { case }
            | Self::NoPathFromInputAsset { case }
            | Self::NoPathFromOutputAsset { case } => *case,
        }
    }

    /// Which lookup was missing, as a short label for metrics.
    pub fn missing(&self) -> &'static str {
        match self {
            Self::NoPathFromMajorAsset { .. } => "major",
            Self::NoPathFromInputAsset { .. } => "input",
            Self::NoPathFromOutputAsset { .. } => "output",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("adapter not found for protocol {0}")]
    AdapterNotFound(ProtocolId),
    #[error("can't enter lp {lp} with {asset}")]
    CantEnter { lp: AssetId, asset: AssetId },
    #[error("can't exit lp {lp} to {asset}")]
    CantExit { lp: AssetId, asset: AssetId },
    #[error("adapter for protocol {protocol} timed out")]
    Timeout { protocol: ProtocolId },
    #[error("{adapter} does not support {operation}")]
    Unsupported {
        adapter: String,
        operation: &'static str,
    },
    #[error("venue rejected call: {0}")]
    Venue(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NativeAssetError {
    #[error("from == to")]
    SameAsset,
    #[error("native to native")]
    NativeToNative,
    #[error("value/amount discrepancy: attached {attached}, amount {amount}")]
    ValueMismatch { attached: u128, amount: u128 },
    #[error("wrapped native asset not configured")]
    WrappedNativeUnset,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error(transparent)]
    Native(#[from] NativeAssetError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("slippage: received {actual}, expected at least {min}")]
    Slippage { min: u128, actual: u128 },
    #[error("actor {0} is not authorized")]
    Unauthorized(String),
    #[error("router is not admitting exchanges")]
    AdmissionClosed,
}

impl ExchangeError {
    /// Stable tag surfaced to API callers and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Resolution(_) => "resolution",
            Self::Adapter(_) => "adapter",
            Self::Native(_) => "native_asset",
            Self::Ledger(_) => "ledger",
            Self::Slippage { .. } => "slippage",
            Self::Unauthorized(_) => "authorization",
            Self::AdmissionClosed => "admission",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_messages_carry_case_number() {
        let err = ResolutionError::NoPathFromInputAsset {
            case: RouteCase::MajorToMinor,
        };
        assert_eq!(err.to_string(), "3!path from input asset");
        assert_eq!(err.case().number(), 3);
        assert_eq!(err.missing(), "input");
    }

    #[test]
    fn kinds_are_stable() {
        let err: ExchangeError = ValidationError::RouteBroken.into();
        assert_eq!(err.kind(), "validation");
        assert_eq!(err.to_string(), "route broken");
        let err = ExchangeError::Slippage { min: 10, actual: 9 };
        assert_eq!(err.kind(), "slippage");
    }
}
