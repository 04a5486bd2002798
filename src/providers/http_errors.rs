use std::error::Error as StdError;
use std::io::ErrorKind;

use crate::error::ChatError;

fn error_chain_has_io_kind(
    err: &(dyn StdError + 'static),
    kind: ErrorKind,
    needle: &str,
) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<std::io::Error>()
            && io_err.kind() == kind
        {
            return true;
        }

        if source.to_string().to_ascii_lowercase().contains(needle) {
            return true;
        }

        current = source.source();
    }

    false
}

fn error_chain_has_connection_refused(err: &(dyn StdError + 'static)) -> bool {
    error_chain_has_io_kind(err, ErrorKind::ConnectionRefused, "connection refused")
}

fn error_chain_has_timeout(err: &(dyn StdError + 'static)) -> bool {
    error_chain_has_io_kind(err, ErrorKind::TimedOut, "timed out")
}

pub(crate) fn model_api_request_error(
    err: reqwest::Error,
    api_url: &str,
    timeout_secs: u64,
) -> ChatError {
    if err.is_timeout() || error_chain_has_timeout(&err) {
        return ChatError::transport(format!(
            "Model request timed out after {timeout_secs}s while calling '{api_url}'. \
             Increase CONNECT_TIMEOUT_SECS or check that the API is reachable."
        ));
    }

    if err.is_connect() {
        if error_chain_has_connection_refused(&err) {
            return ChatError::transport(format!(
                "Connection refused by model API at '{api_url}'. \
                 Ensure the provider is reachable and OPENAI_BASE_URL is correct."
            ));
        }

        return ChatError::transport(format!(
            "Failed to connect to model API at '{api_url}'. \
             Check OPENAI_BASE_URL and network connectivity."
        ));
    }

    if err.is_body() || err.is_decode() {
        return ChatError::transport(format!(
            "Stream from model API at '{api_url}' was interrupted: {err}"
        ));
    }

    ChatError::transport(format!("Failed to call model API at '{api_url}': {err}"))
}
