use thiserror::Error;

/// Failure classes surfaced by wallet operations.
///
/// Malformed runestones are never errors: they decode to a cenotaph.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    Input(String),
    #[error("insufficient funds: short by {shortfall} sats")]
    Funds { shortfall: u64 },
    #[error("network error: {0}")]
    Network(String),
    #[error("gave up waiting for {what} after {attempts} attempts")]
    Timeout { attempts: u32, what: String },
    #[error("inscribe tool error: {0}")]
    Tool(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("transaction error: {0}")]
    Transaction(String),
    #[error("verification failed: {0}")]
    Verification(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    pub fn input(msg: impl Into<String>) -> Self {
        Error::Input(msg.into())
    }

    pub fn transaction(err: impl std::fmt::Display) -> Self {
        Error::Transaction(err.to_string())
    }
}

impl From<bitcoincore_rpc::Error> for Error {
    fn from(err: bitcoincore_rpc::Error) -> Self {
        Error::Network(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }
}

impl From<bitcoin::address::ParseError> for Error {
    fn from(err: bitcoin::address::ParseError) -> Self {
        Error::Input(format!("address: {err}"))
    }
}

impl From<ordinals::ParseRuneIdError> for Error {
    fn from(err: ordinals::ParseRuneIdError) -> Self {
        Error::Input(format!("rune id: {err}"))
    }
}

impl From<bitcoin::secp256k1::Error> for Error {
    fn from(err: bitcoin::secp256k1::Error) -> Self {
        Error::Transaction(err.to_string())
    }
}

impl From<bitcoin::taproot::TaprootBuilderError> for Error {
    fn from(err: bitcoin::taproot::TaprootBuilderError) -> Self {
        Error::Transaction(err.to_string())
    }
}
