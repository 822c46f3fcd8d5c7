pub use mollie_api::CustomResult;

/// Failures of the identity store backing customer and profile rows.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("value not found in storage")]
    NotFound,
    #[error("unique constraint violated on {entity}")]
    UniqueViolation { entity: &'static str },
    #[error("missing required field: {field_name}")]
    MissingRequiredField { field_name: &'static str },
}

/// Orchestrator-level failures. Provider and storage causes stay attached
/// underneath via the report chain.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("provider call failed")]
    Provider,
    #[error("storage operation failed")]
    Storage,
    #[error("payment {payment_id} not found on the host platform")]
    PaymentNotFound { payment_id: u64 },
    #[error("payment {payment_id} carries no provider transaction id")]
    MissingTransactionId { payment_id: u64 },
    #[error("retry attempts exhausted for payment {payment_id}")]
    RetryAttemptsExhausted { payment_id: u64 },
    #[error("failed to schedule retry")]
    Scheduler,
    #[error("invalid host payment data: {reason}")]
    Validation { reason: &'static str },
}

/// Failure to enqueue a delayed task.
#[derive(Debug, thiserror::Error)]
#[error("failed to schedule delayed task")]
pub struct SchedulerError;
