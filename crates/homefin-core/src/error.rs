use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),
    #[error("Category not found: {0}")]
    CategoryNotFound(String),
    #[error("Budget not found: {0}")]
    BudgetNotFound(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Cross-profile transfer failed: {0}")]
    CrossProfileTransfer(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Returns `true` for errors that name an id missing from its collection.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::AccountNotFound(_)
                | CoreError::TransactionNotFound(_)
                | CoreError::CategoryNotFound(_)
                | CoreError::BudgetNotFound(_)
        )
    }
}
