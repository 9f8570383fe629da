//! Lazy pagination over a single API query
//!
//! Pages are walked strictly in order: each response carries the rate-limit
//! state needed before the next request, so there is no concurrent fetching.
//! The rate-limit wait happens inside [`ShipStationClient::fetch_endpoint`],
//! before the termination condition is evaluated, because even the last page
//! consumes quota.

use futures_util::stream::{self, Stream};
use serde_json::Value;
use std::pin::Pin;
use tracing::{debug, info};

use super::{ApiError, ApiResult, Params, ShipStationClient, PAGE_SIZE};

/// Lazy sequence of page bodies for one query
pub type PageStream<'a> = Pin<Box<dyn Stream<Item = ApiResult<Value>> + Send + 'a>>;

struct PageState {
    params: Params,
    page: u64,
    done: bool,
}

impl ShipStationClient {
    /// Drive a single query across pages until exhausted
    ///
    /// Missing `page`/`pageSize` parameters default to 1 and
    /// [`PAGE_SIZE`]; a caller-supplied `page` that is not a number is
    /// rejected before any request is issued. The stream ends without
    /// yielding anything when the response reports `total == 0`, and
    /// otherwise ends after the page whose reported number reaches the
    /// reported page count.
    pub fn paginate<'a>(&'a self, endpoint: &'a str, params: &[(String, String)]) -> PageStream<'a> {
        let mut params = params.to_vec();
        let page = match params.iter().find(|(k, _)| k == "page") {
            Some((_, v)) => match v.parse() {
                Ok(page) => page,
                Err(_) => {
                    // A garbage page value would desync the internal counter
                    // from what the server sees; refuse it up front.
                    let err = ApiError::UnexpectedShape(format!(
                        "invalid 'page' parameter for {endpoint}: '{v}'"
                    ));
                    return Box::pin(stream::once(std::future::ready(Err(err))));
                }
            },
            None => {
                params.push(("page".to_string(), "1".to_string()));
                1
            }
        };
        if !params.iter().any(|(k, _)| k == "pageSize") {
            params.push(("pageSize".to_string(), PAGE_SIZE.to_string()));
        }

        let state = PageState {
            params,
            page,
            done: false,
        };

        Box::pin(stream::try_unfold(state, move |mut state| async move {
            if state.done {
                return Ok(None);
            }

            let body = self.fetch_endpoint(endpoint, &state.params).await?;

            let total = require_u64(&body, endpoint, "total")?;
            if total == 0 {
                debug!(endpoint, "no data for endpoint");
                return Ok(None);
            }

            let page = require_u64(&body, endpoint, "page")?;
            let pages = require_u64(&body, endpoint, "pages")?;
            info!(endpoint, page, pages, "finished requesting page");

            if page >= pages {
                state.done = true;
            } else {
                state.page = page + 1;
                set_param(&mut state.params, "page", state.page.to_string());
            }

            Ok(Some((body, state)))
        }))
    }
}

/// Extract the records array from a page body; the records live under a key
/// matching the endpoint name
pub fn page_records<'a>(body: &'a Value, endpoint: &str) -> ApiResult<&'a [Value]> {
    body.get(endpoint)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| {
            ApiError::UnexpectedShape(format!("page body missing '{endpoint}' records array"))
        })
}

fn require_u64(body: &Value, endpoint: &str, key: &str) -> ApiResult<u64> {
    body.get(key).and_then(Value::as_u64).ok_or_else(|| {
        ApiError::UnexpectedShape(format!("response for {endpoint} missing numeric '{key}'"))
    })
}

fn set_param(params: &mut Params, key: &str, value: String) {
    if let Some(entry) = params.iter_mut().find(|(k, _)| k == key) {
        entry.1 = value;
    } else {
        params.push((key.to_string(), value));
    }
}
