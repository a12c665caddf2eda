//! Single-use local listener for the OAuth redirect.
//!
//! The listener serves `GET /callback` on loopback. A redirect carrying
//! `error`, or both `code` and `state`, is handed to the waiting flow through
//! a one-slot `watch` channel: if two arrive before pickup the later one wins.
//! Anything else gets an error page and leaves the slot untouched.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::slack::oauth::AuthorizationError;

/// Path the redirect must target.
pub const CALLBACK_PATH: &str = "/callback";

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// What the redirect carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackResult {
    /// The user approved; `state` still has to be checked.
    Code {
        /// Authorization code to exchange.
        code: String,
        /// Anti-forgery token echoed back by Slack.
        state: String,
    },
    /// The user (or Slack) refused the request.
    Denied {
        /// Value of the `error` parameter, e.g. `access_denied`.
        reason: String,
    },
}

type Slot = Arc<watch::Sender<Option<CallbackResult>>>;

/// Running callback listener.
///
/// Dropping it aborts the listener task; [`Self::shutdown`] stops it
/// gracefully and waits for the port to be released.
#[derive(Debug)]
pub struct CallbackServer {
    local_addr: SocketAddr,
    results: watch::Receiver<Option<CallbackResult>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl CallbackServer {
    /// Bind `127.0.0.1:{port}` and start serving. Port 0 picks a free port.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError::Listener`] if the port cannot be bound.
    pub async fn bind(port: u16) -> Result<Self, AuthorizationError> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| AuthorizationError::Listener(format!("binding {addr}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| AuthorizationError::Listener(e.to_string()))?;

        let (tx, results) = watch::channel(None);
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();

        let app = Router::new()
            .route(CALLBACK_PATH, get(handle_callback))
            .fallback(handle_unknown)
            .with_state(Arc::new(tx));

        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });

        let task = tokio::spawn(async move {
            if let Err(e) = server.await {
                log::warn!("callback listener stopped with error: {e}");
            }
        });

        log::debug!("callback listener bound to {local_addr}");

        Ok(Self {
            local_addr,
            results,
            shutdown: Some(shutdown),
            task,
        })
    }

    /// Address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for a delivered redirect.
    ///
    /// Returns immediately if one already arrived.
    ///
    /// # Errors
    ///
    /// - [`AuthorizationError::CallbackTimeout`] when nothing arrives in time
    /// - [`AuthorizationError::Listener`] if the listener died first
    pub async fn wait(&mut self, timeout: Duration) -> Result<CallbackResult, AuthorizationError> {
        let received = tokio::time::timeout(timeout, self.results.wait_for(Option::is_some)).await;
        match received {
            Ok(Ok(slot)) => (*slot)
                .clone()
                .ok_or_else(|| AuthorizationError::Listener("empty callback slot".to_string())),
            Ok(Err(_)) => Err(AuthorizationError::Listener(
                "listener stopped before a callback arrived".to_string(),
            )),
            Err(_) => Err(AuthorizationError::CallbackTimeout(timeout)),
        }
    }

    /// Stop accepting connections and wait for the listener to exit.
    pub async fn shutdown(mut self) {
        if let Some(signal) = self.shutdown.take() {
            let _ = signal.send(());
        }
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut self.task).await.is_err() {
            log::warn!("callback listener did not drain in {SHUTDOWN_GRACE:?}, aborting");
            self.task.abort();
            let _ = (&mut self.task).await;
        }
        log::debug!("callback listener on {} shut down", self.local_addr);
    }
}

impl Drop for CallbackServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle_callback(
    State(slot): State<Slot>,
    Query(params): Query<HashMap<String, String>>,
) -> (StatusCode, Html<String>) {
    let Some(result) = parse_callback(&params) else {
        log::warn!("ignoring callback without code/state or error");
        return (
            StatusCode::BAD_REQUEST,
            Html(render_page(
                "Authorization failed",
                "The redirect was missing its code or state.",
            )),
        );
    };

    let response = match &result {
        CallbackResult::Code { .. } => (
            StatusCode::OK,
            Html(render_page(
                "Authorization successful",
                "You can close this window and return to the terminal.",
            )),
        ),
        CallbackResult::Denied { reason } => (
            StatusCode::BAD_REQUEST,
            Html(render_page(
                "Authorization failed",
                &format!("Slack reported: {reason}"),
            )),
        ),
    };

    if slot.send_replace(Some(result)).is_some() {
        log::warn!("callback received more than once; keeping the latest");
    }
    response
}

async fn handle_unknown() -> (StatusCode, Html<String>) {
    (
        StatusCode::NOT_FOUND,
        Html(render_page("Not found", "This listener only serves /callback.")),
    )
}

fn parse_callback(params: &HashMap<String, String>) -> Option<CallbackResult> {
    if let Some(reason) = params.get("error").filter(|e| !e.is_empty()) {
        return Some(CallbackResult::Denied {
            reason: reason.clone(),
        });
    }

    let code = params.get("code").filter(|c| !c.is_empty())?;
    let state = params.get("state").filter(|s| !s.is_empty())?;
    Some(CallbackResult::Code {
        code: code.clone(),
        state: state.clone(),
    })
}

fn render_page(title: &str, message: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>slakctl</title></head>\
         <body style=\"font-family: sans-serif; text-align: center; padding-top: 4em\">\
         <h1>{}</h1><p>{}</p></body></html>",
        escape_html(title),
        escape_html(message)
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn error_parameter_wins_over_code() {
        let parsed = parse_callback(&params(&[
            ("error", "access_denied"),
            ("code", "abc"),
            ("state", "s"),
        ]));
        assert_eq!(
            parsed,
            Some(CallbackResult::Denied {
                reason: "access_denied".to_string()
            })
        );
    }

    #[test]
    fn code_requires_state() {
        assert_eq!(parse_callback(&params(&[("code", "abc")])), None);
        assert_eq!(parse_callback(&params(&[("state", "s")])), None);
        assert_eq!(parse_callback(&params(&[])), None);
        assert_eq!(
            parse_callback(&params(&[("code", "abc"), ("state", "s")])),
            Some(CallbackResult::Code {
                code: "abc".to_string(),
                state: "s".to_string()
            })
        );
    }

    #[test]
    fn pages_escape_remote_text() {
        let page = render_page("Authorization failed", "<script>alert('x')</script>");
        assert!(!page.contains("<script>"));
        assert!(page.contains("&lt;script&gt;"));
    }

    #[tokio::test]
    async fn delivers_redirect_and_releases_port() {
        let mut server = CallbackServer::bind(0).await.expect("bind");
        let addr = server.local_addr();

        let response = reqwest::get(format!("http://{addr}/callback?code=abc&state=xyz"))
            .await
            .expect("request");
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let result = server.wait(Duration::from_secs(5)).await.expect("result");
        assert_eq!(
            result,
            CallbackResult::Code {
                code: "abc".to_string(),
                state: "xyz".to_string()
            }
        );

        server.shutdown().await;
        TcpListener::bind(addr).await.expect("port released");
    }

    #[tokio::test]
    async fn unknown_paths_and_malformed_requests_are_not_delivered() {
        let mut server = CallbackServer::bind(0).await.expect("bind");
        let addr = server.local_addr();

        let missing = reqwest::get(format!("http://{addr}/favicon.ico"))
            .await
            .expect("request");
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

        let malformed = reqwest::get(format!("http://{addr}/callback?code=abc"))
            .await
            .expect("request");
        assert_eq!(malformed.status(), reqwest::StatusCode::BAD_REQUEST);

        let err = server
            .wait(Duration::from_millis(100))
            .await
            .expect_err("nothing delivered");
        assert!(matches!(err, AuthorizationError::CallbackTimeout(_)));

        server.shutdown().await;
    }

    #[tokio::test]
    async fn later_delivery_replaces_earlier_one() {
        let mut server = CallbackServer::bind(0).await.expect("bind");
        let addr = server.local_addr();

        for code in ["first", "second"] {
            reqwest::get(format!("http://{addr}/callback?code={code}&state=s"))
                .await
                .expect("request");
        }

        let result = server.wait(Duration::from_secs(5)).await.expect("result");
        assert_eq!(
            result,
            CallbackResult::Code {
                code: "second".to_string(),
                state: "s".to_string()
            }
        );
        server.shutdown().await;
    }
}
