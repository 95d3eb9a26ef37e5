use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u32, need: u32 },
    #[error("insufficient inventory: have {have}, need {need}")]
    InsufficientInventory { have: u32, need: u32 },
    #[error("account capacity exhausted")]
    CapacityExhausted,
    #[error("arithmetic overflow applying {amount} to account")]
    Overflow { amount: u32 },
}
