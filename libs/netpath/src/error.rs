use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("query service returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("query failed: {}", .0.join("; "))]
    Query(Vec<String>),
    #[error("response did not contain results")]
    MissingResults,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config not found")]
    ConfigNotFound,
    #[error("toml parsing failed")]
    Toml(#[from] toml::de::Error),
    #[error("no api key configured")]
    #[diagnostic(help("set `api_key` in netpath.toml, NEW_RELIC_API_KEY, or pass --api-key"))]
    MissingApiKey,
    #[error("no account selected")]
    #[diagnostic(help("set `account_id` in netpath.toml, NEW_RELIC_ACCOUNT_ID, or pass --account"))]
    MissingAccount,
    #[error("invalid account id {0:?}")]
    InvalidAccount(String),
    #[error(transparent)]
    Nrql(#[from] nrql::Error),
}
