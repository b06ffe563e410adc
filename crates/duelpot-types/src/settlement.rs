//! Structured settlement outcomes.
//!
//! Settlement never surfaces as a bare `Err`: application layers receive a
//! [`SettlementResult`] and branch on `error.retryable` to decide between
//! "try again" and "stop".

use serde::{Deserialize, Serialize};

use crate::{DuelpotError, ErrorKind, Result, TransactionId};

/// Why a settlement attempt did not pay out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementError {
    pub kind: ErrorKind,
    /// `DP_ERR_nnn` code of the underlying error.
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl From<&DuelpotError> for SettlementError {
    fn from(err: &DuelpotError) -> Self {
        let kind = err.kind();
        Self {
            kind,
            code: err.code(),
            message: err.to_string(),
            retryable: kind.is_retryable(),
        }
    }
}

/// Outcome of `settle_match`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<TransactionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SettlementError>,
}

impl SettlementResult {
    #[must_use]
    pub fn paid(transaction_id: TransactionId) -> Self {
        Self {
            success: true,
            transaction_id: Some(transaction_id),
            error: None,
        }
    }

    #[must_use]
    pub fn failed(err: &DuelpotError) -> Self {
        Self {
            success: false,
            transaction_id: None,
            error: Some(SettlementError::from(err)),
        }
    }

    /// Kind of the failure, if any.
    #[must_use]
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    /// Whether the caller may retry the same settlement.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.error.as_ref().is_some_and(|e| e.retryable)
    }
}

impl From<Result<TransactionId>> for SettlementResult {
    fn from(res: Result<TransactionId>) -> Self {
        match res {
            Ok(tx) => Self::paid(tx),
            Err(e) => Self::failed(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MatchId;

    #[test]
    fn paid_result() {
        let res = SettlementResult::from(Ok(TransactionId::new("abc")));
        assert!(res.success);
        assert_eq!(res.transaction_id.unwrap().as_str(), "abc");
        assert!(res.error.is_none());
    }

    #[test]
    fn failed_result_carries_kind_and_code() {
        let err = DuelpotError::AlreadySettled(MatchId::parse("m_1").unwrap());
        let res = SettlementResult::failed(&err);
        assert!(!res.success);
        assert_eq!(res.error_kind(), Some(ErrorKind::AlreadySettled));
        let e = res.error.unwrap();
        assert_eq!(e.code, "DP_ERR_300");
        assert!(!e.retryable);
    }

    #[test]
    fn chain_timeout_is_retryable() {
        let res = SettlementResult::from(Err(DuelpotError::chain_communication("timeout")));
        assert!(res.is_retryable());
    }

    #[test]
    fn json_omits_absent_fields() {
        let json = serde_json::to_string(&SettlementResult::paid(TransactionId::new("t"))).unwrap();
        assert_eq!(json, r#"{"success":true,"transaction_id":"t"}"#);
    }
}
