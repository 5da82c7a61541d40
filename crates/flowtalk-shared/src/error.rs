use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token is malformed")]
    Malformed,

    #[error("Token signature does not verify")]
    BadSignature,

    #[error("Token has expired")]
    Expired,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LangError {
    #[error("Unknown language code: '{0}'")]
    UnknownCode(String),
}
