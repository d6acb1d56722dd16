use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("FINNHUB_API_KEY is missing")]
    MissingApiKey,

    #[error("quote request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("quote provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("no usable price for {0}")]
    NoPrice(String),

    #[error("quote request timed out")]
    Timeout,
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("template error: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("mail transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("mail provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("notification timed out")]
    Timeout,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
}

#[derive(Error, Debug, PartialEq)]
pub enum AlertInputError {
    #[error("symbol is required")]
    EmptySymbol,

    #[error("target price must be a positive number")]
    InvalidTargetPrice,
}

#[derive(Error, Debug)]
pub enum AlertServiceError {
    #[error(transparent)]
    Input(#[from] AlertInputError),

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
}

#[derive(Error, Debug)]
pub enum CycleError {
    #[error("failed to load active alerts: {0}")]
    LoadActive(#[source] StoreError),
}
