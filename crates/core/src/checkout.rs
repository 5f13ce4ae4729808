//! Order placement as a sequence of compensable steps.
//!
//! Placing an order touches three independent stores after the payment
//! processor has already charged the customer: the order itself, product
//! inventory, and the user's purchase history. There is no transaction
//! spanning them, so each step has a documented reaction to failure
//! ([`Compensation`]) and the saga tracks how far it got.

use serde::Serialize;

/// Steps of order placement, in the order they must happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStage {
    /// The payment processor accepted the charge.
    PaymentAuthorized,
    /// The order and its line items are stored.
    OrderPersisted,
    /// Product quantities and sold counts are adjusted.
    InventoryAdjusted,
    /// The purchase is appended to the user's history.
    HistoryRecorded,
}

impl CheckoutStage {
    /// The step after this one, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::PaymentAuthorized => Some(Self::OrderPersisted),
            Self::OrderPersisted => Some(Self::InventoryAdjusted),
            Self::InventoryAdjusted => Some(Self::HistoryRecorded),
            Self::HistoryRecorded => None,
        }
    }
}

/// What to do when the step after the current stage fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
    /// Nothing is stored yet; refund the charge and fail the request.
    ReversePayment,
    /// The order is stored but stock is not adjusted. The order is kept and
    /// the error is surfaced for manual reconciliation.
    KeepOrder,
    /// Only the history append failed. The order succeeds with a warning.
    Warn,
    /// Every step completed.
    None,
}

/// Errors driving a [`CheckoutSaga`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SagaError {
    #[error("checkout cannot move from {from:?} to {to:?}")]
    OutOfOrder {
        from: CheckoutStage,
        to: CheckoutStage,
    },
    #[error("checkout is already complete")]
    Complete,
}

/// Progress of one order placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSaga {
    stage: CheckoutStage,
    warnings: Vec<String>,
}

impl Default for CheckoutSaga {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutSaga {
    /// Start a saga for an order whose payment has been authorized.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            stage: CheckoutStage::PaymentAuthorized,
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub const fn stage(&self) -> CheckoutStage {
        self.stage
    }

    /// Record that `stage` completed. Stages must complete one at a time, in
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`SagaError`] if `stage` is not the immediate next step.
    pub fn advance(&mut self, stage: CheckoutStage) -> Result<(), SagaError> {
        match self.stage.next() {
            Some(next) if next == stage => {
                self.stage = stage;
                Ok(())
            }
            Some(_) => Err(SagaError::OutOfOrder {
                from: self.stage,
                to: stage,
            }),
            None => Err(SagaError::Complete),
        }
    }

    /// Reaction to a failure of the step after the current stage.
    #[must_use]
    pub const fn compensation(&self) -> Compensation {
        match self.stage {
            CheckoutStage::PaymentAuthorized => Compensation::ReversePayment,
            CheckoutStage::OrderPersisted => Compensation::KeepOrder,
            CheckoutStage::InventoryAdjusted => Compensation::Warn,
            CheckoutStage::HistoryRecorded => Compensation::None,
        }
    }

    /// Attach a non-fatal warning for the client.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Finish the saga, returning collected warnings.
    #[must_use]
    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stages_advance_in_order() {
        let mut saga = CheckoutSaga::new();
        saga.advance(CheckoutStage::OrderPersisted).unwrap();
        saga.advance(CheckoutStage::InventoryAdjusted).unwrap();
        saga.advance(CheckoutStage::HistoryRecorded).unwrap();
        assert_eq!(saga.stage(), CheckoutStage::HistoryRecorded);
        assert_eq!(saga.compensation(), Compensation::None);
    }

    #[test]
    fn test_skipping_a_stage_is_rejected() {
        let mut saga = CheckoutSaga::new();
        let err = saga.advance(CheckoutStage::InventoryAdjusted).unwrap_err();
        assert_eq!(
            err,
            SagaError::OutOfOrder {
                from: CheckoutStage::PaymentAuthorized,
                to: CheckoutStage::InventoryAdjusted,
            }
        );
        assert_eq!(saga.stage(), CheckoutStage::PaymentAuthorized);
    }

    #[test]
    fn test_completed_saga_cannot_advance() {
        let mut saga = CheckoutSaga::new();
        saga.advance(CheckoutStage::OrderPersisted).unwrap();
        saga.advance(CheckoutStage::InventoryAdjusted).unwrap();
        saga.advance(CheckoutStage::HistoryRecorded).unwrap();
        assert_eq!(
            saga.advance(CheckoutStage::HistoryRecorded),
            Err(SagaError::Complete)
        );
    }

    #[test]
    fn test_compensation_per_stage() {
        let mut saga = CheckoutSaga::new();
        assert_eq!(saga.compensation(), Compensation::ReversePayment);
        saga.advance(CheckoutStage::OrderPersisted).unwrap();
        assert_eq!(saga.compensation(), Compensation::KeepOrder);
        saga.advance(CheckoutStage::InventoryAdjusted).unwrap();
        assert_eq!(saga.compensation(), Compensation::Warn);
    }

    #[test]
    fn test_warnings_are_collected() {
        let mut saga = CheckoutSaga::new();
        saga.warn("history not recorded");
        assert_eq!(saga.warnings(), ["history not recorded"]);
        assert_eq!(saga.into_warnings().len(), 1);
    }
}
