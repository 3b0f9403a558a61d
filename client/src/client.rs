use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use ringtone_types::catalog::{CatalogPayload, InstantCatalog, WheelCatalog};
use ringtone_types::session::{
    CompleteSessionRequest, CompleteSessionResponse, CreateOrderRequest, CreateOrderResponse,
    DrawWinnerResponse, ErrorBody, SpinRequest, SpinResponse, StartSessionRequest,
    StartSessionResponse,
};
use serde::{de::DeserializeOwned, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::{Error, PendingCompletions, Result};

/// HTTP client for the award-resolution service.
///
/// Clones share the same pending-completion registry.
#[derive(Clone)]
pub struct Client {
    pub base_url: Url,
    pub http_client: reqwest::Client,
    pending: PendingCompletions,
}

/// A session completion running on its own task.
///
/// Awaiting yields the service's response. Dropping it does not cancel the request.
pub struct Completion {
    session_id: String,
    handle: JoinHandle<Result<CompleteSessionResponse>>,
}

impl Completion {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl Future for Completion {
    type Output = Result<CompleteSessionResponse>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::CompletionAborted)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Client {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        match base_url.scheme() {
            "http" | "https" => {}
            scheme => return Err(Error::InvalidScheme(scheme.to_string())),
        }
        // Relative joins keep the last path segment only when the base ends with '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            base_url,
            http_client: reqwest::Client::new(),
            pending: PendingCompletions::new(),
        })
    }

    pub fn pending(&self) -> &PendingCompletions {
        &self.pending
    }

    /// URL of the push-notification channel served next to the API.
    pub fn ws_url(&self) -> Result<Url> {
        let mut url = self.base_url.join("ws")?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| Error::InvalidScheme(scheme.to_string()))?;
        Ok(url)
    }

    /// Appends `segments` to the base path, escaping each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Asks the service to lock in an outcome for a paid order.
    pub async fn start_session(&self, order_id: &str) -> Result<StartSessionResponse> {
        let url = self.endpoint(&["api", "scratch-session", "start"])?;
        let request = StartSessionRequest {
            order_id: order_id.to_string(),
        };
        let response: StartSessionResponse = post_json(&self.http_client, url, &request).await?;
        debug!(
            order_id,
            session_id = %response.session_id,
            is_winner = response.is_winner,
            "scratch session started"
        );
        Ok(response)
    }

    /// Tells the service the outcome has been shown, triggering the balance credit.
    ///
    /// The request runs on its own task and stays registered in [Client::pending] until it
    /// settles, so it is not lost if the caller goes away before it finishes.
    pub fn complete_session(&self, session_id: &str, request: CompleteSessionRequest) -> Completion {
        let url = self.endpoint(&["api", "scratch-session", session_id, "complete"]);
        let handle = self.pending.track(
            session_id,
            send_completion(
                self.http_client.clone(),
                url,
                session_id.to_string(),
                request,
            ),
        );
        Completion {
            session_id: session_id.to_string(),
            handle,
        }
    }

    pub fn has_pending_completions(&self) -> bool {
        self.pending.has_pending()
    }

    pub fn pending_sessions(&self) -> Vec<String> {
        self.pending.sessions()
    }

    /// Barrier for callers about to tear down: resolves once every completion has settled.
    pub async fn wait_for_pending_completions(&self) {
        self.pending.wait_idle().await
    }

    pub fn warn_if_pending(&self, context: &str) -> bool {
        self.pending.warn_if_pending(context)
    }

    /// Validates the catalog locally and replaces the competition's instant-win configuration.
    pub async fn save_instant_catalog(
        &self,
        competition_id: &str,
        catalog: &InstantCatalog,
    ) -> Result<()> {
        let payload = CatalogPayload::from(catalog.prepare_save()?);
        self.save_catalog(competition_id, &payload).await
    }

    /// Validates the wheel locally and replaces the competition's wheel configuration.
    pub async fn save_wheel_catalog(
        &self,
        competition_id: &str,
        catalog: &WheelCatalog,
    ) -> Result<()> {
        let payload = CatalogPayload::from(catalog.prepare_save()?);
        self.save_catalog(competition_id, &payload).await
    }

    async fn save_catalog(&self, competition_id: &str, payload: &CatalogPayload) -> Result<()> {
        let url = self.endpoint(&["api", "admin", "competitions", competition_id, "prizes"])?;
        let _: serde_json::Value = post_json(&self.http_client, url, payload).await?;
        info!(competition_id, "prize catalog saved");
        Ok(())
    }

    pub async fn spin(&self, competition_id: &str, order_id: &str) -> Result<SpinResponse> {
        let url = self.endpoint(&["api", "spin-wheel", competition_id, "spin"])?;
        let request = SpinRequest {
            order_id: order_id.to_string(),
        };
        post_json(&self.http_client, url, &request).await
    }

    pub async fn draw_winner(&self, competition_id: &str) -> Result<DrawWinnerResponse> {
        let url = self.endpoint(&["api", "admin", "competitions", competition_id, "draw"])?;
        post_json(&self.http_client, url, &serde_json::json!({})).await
    }

    /// Creates a paid order; only development backends expose this.
    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<CreateOrderResponse> {
        let url = self.endpoint(&["api", "orders"])?;
        post_json(&self.http_client, url, request).await
    }
}

async fn send_completion(
    http_client: reqwest::Client,
    url: Result<Url>,
    session_id: String,
    request: CompleteSessionRequest,
) -> Result<CompleteSessionResponse> {
    let response: CompleteSessionResponse = post_json(&http_client, url?, &request).await?;
    info!(
        session_id = %session_id,
        order_id = %response.order_id,
        remaining_cards = response.remaining_cards,
        "scratch session completed"
    );
    Ok(response)
}

/// Posts `body` and decodes a success response, or surfaces the service's error message verbatim.
///
/// A 2xx body with `"success": false` is a rejection too. Nothing is retried.
pub(crate) async fn post_json<B, R>(http_client: &reqwest::Client, url: Url, body: &B) -> Result<R>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    let response = http_client.post(url.clone()).json(body).send().await?;
    let status = response.status();
    let text = response.text().await?;
    if status.is_success() {
        let value: serde_json::Value = serde_json::from_str(&text).map_err(|err| {
            warn!(%url, error = %err, "unexpected response body");
            Error::UnexpectedResponse(err)
        })?;
        if value.get("success").and_then(serde_json::Value::as_bool) != Some(false) {
            return serde_json::from_value(value).map_err(|err| {
                warn!(%url, error = %err, "unexpected response body");
                Error::UnexpectedResponse(err)
            });
        }
    }

    let message = error_message(&text).unwrap_or_else(|| {
        if text.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            text
        }
    });
    debug!(%url, %status, %message, "request rejected");
    Err(Error::Rejected { status, message })
}

fn error_message(text: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(text)
        .ok()
        .and_then(ErrorBody::into_message)
        .filter(|message| !message.is_empty())
}
