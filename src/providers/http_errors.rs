use std::error::Error as StdError;
use std::io::ErrorKind;

fn error_chain_matches(
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
    error_chain_matches(err, ErrorKind::ConnectionRefused, "connection refused")
}

fn error_chain_has_timeout(err: &(dyn StdError + 'static)) -> bool {
    error_chain_matches(err, ErrorKind::TimedOut, "timed out")
}

/// Turns a reqwest failure into a message that tells the user which setting to check.
pub(crate) fn describe_request_error(
    err: &reqwest::Error,
    api_url: &str,
    timeout_secs: u64,
) -> String {
    if err.is_timeout() || error_chain_has_timeout(err) {
        return format!(
            "Model request timed out after {timeout_secs}s while calling '{api_url}'. \
             Increase MODEL_TIMEOUT_SECS or try again later."
        );
    }

    if err.is_connect() {
        if error_chain_has_connection_refused(err) {
            return format!(
                "Connection refused by completion endpoint at '{api_url}'. \
                 Check OPENROUTER_BASE_URL."
            );
        }

        return format!(
            "Failed to connect to completion endpoint at '{api_url}'. \
             Check OPENROUTER_BASE_URL and network connectivity."
        );
    }

    format!("Failed to call completion endpoint at '{api_url}': {err}")
}
