//! Gateway API client (chat gateway → lucky draw server), and verification of
//! the notifications the server sends back.

use reqwest::Client;
use url::Url;

use super::{ClientError, parse_response};
use crate::objects::NotificationPayload;
use crate::objects::gateway::{HistoryRequest, HistoryResponse, JoinRequest, JoinResponse};
use crate::signature::{SIGNATURE_HEADER, Signature, SignatureError, SignedObject};

/// Every request body is signed with
/// `HMAC-SHA256("{timestamp}.{json}", gateway_secret)`.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: Url,
    secret: Vec<u8>,
}

impl GatewayClient {
    pub fn new(base_url: Url, gateway_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            secret: gateway_secret.into(),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// `POST /gateway/join`
    pub async fn join(&self, request: JoinRequest) -> Result<JoinResponse, ClientError> {
        self.post_signed("/gateway/join", request).await
    }

    /// `POST /gateway/history`
    pub async fn history(&self, user_id: i64) -> Result<HistoryResponse, ClientError> {
        self.post_signed("/gateway/history", HistoryRequest { user_id })
            .await
    }

    async fn post_signed<B, R>(&self, path: &str, body: B) -> Result<R, ClientError>
    where
        B: Signature,
        R: serde::de::DeserializeOwned,
    {
        let signed = SignedObject::new(body, &self.secret).map_err(ClientError::Json)?;
        let url = self.base_url.join(path)?;

        let resp = self
            .http
            .post(url)
            .header(SIGNATURE_HEADER, signed.to_header())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(signed.json)
            .send()
            .await?;

        parse_response(resp).await
    }
}

/// Verify and deserialize a notification webhook sent by the server.
///
/// * `signature_header` – value of the `LuckyDraw-Signature` request header.
/// * `body` – raw JSON request body.
/// * `secret` – the gateway secret shared with the server.
pub fn verify_notification(
    signature_header: &str,
    body: &str,
    secret: &[u8],
) -> Result<NotificationPayload, SignatureError> {
    SignedObject::<NotificationPayload>::from_header_and_body(signature_header, body.to_owned())?
        .verify(secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_verify_notification() {
        let payload = NotificationPayload::DrawResolved {
            event_id: Uuid::from_u128(1),
            title: "Giveaway".to_string(),
            winners: vec![],
            timestamp: 0,
        };
        let signed = SignedObject::new(payload.clone(), b"key").unwrap();

        let verified = verify_notification(&signed.to_header(), &signed.json, b"key").unwrap();
        assert_eq!(verified, payload);
        assert!(matches!(
            verify_notification(&signed.to_header(), &signed.json, b"other"),
            Err(SignatureError::SignatureMismatch)
        ));
    }
}
