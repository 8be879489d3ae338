use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, REFERER};
use reqwest::{redirect, Client};

use crate::core::error::{InstallerError, InstallerResult};
use crate::core::state::InstallerConfig;

pub fn build_http_client(config: &InstallerConfig) -> InstallerResult<Client> {
    let mut default_headers = HeaderMap::new();
    // Compressed transfer would make Content-Length useless for progress.
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
    default_headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    if let Some(referer) = &config.referer {
        let value = HeaderValue::from_str(referer)
            .map_err(|_| InstallerError::Config(format!("invalid referer header: {referer:?}")))?;
        default_headers.insert(REFERER, value);
    }

    let client = Client::builder()
        .user_agent(config.user_agent.as_str())
        .default_headers(default_headers)
        .redirect(redirect::Policy::limited(config.max_redirects))
        .build()?;
    Ok(client)
}
