use thiserror::Error;

use flowtalk_store::StoreError;

use crate::parser::ContentViolation;

#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("Invalid content: {}", format_violations(.0))]
    InvalidContent(Vec<ContentViolation>),

    #[error("Translation provider error{}: {}", format_status(.status), .message)]
    Provider {
        status: Option<u16>,
        message: String,
    },

    #[error("Translation request timed out")]
    Timeout,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

fn format_violations(violations: &[ContentViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn format_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" ({code})"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, TranslateError>;
