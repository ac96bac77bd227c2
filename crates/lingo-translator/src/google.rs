use std::time::Duration;

use async_trait::async_trait;
use lingo_config::translator::TranslatorConfig;

use crate::{LanguageCode, ProviderMetadata, TranslateError, Translation, Translator};

/// Google Translate through the keyless web endpoint (`client=gtx`)
#[derive(Clone)]
pub struct GoogleTranslator {
    client: reqwest::Client,
    api_url: String,
}

impl GoogleTranslator {
    pub fn new(config: &TranslatorConfig) -> Result<Self, TranslateError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
        })
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(
        &self,
        text: &str,
        from: Option<LanguageCode>,
        to: LanguageCode,
    ) -> Result<Translation, TranslateError> {
        let source = from.clone().unwrap_or_else(|| "auto".to_string());
        let params = [
            ("client", "gtx"),
            ("sl", source.as_str()),
            ("tl", to.as_str()),
            ("dt", "t"),
            ("q", text),
        ];

        let response = self.client.get(&self.api_url).query(&params).send().await?;

        let status = response.status();
        if status == 429 {
            return Err(TranslateError::RateLimitExceeded);
        }

        if status == 400 {
            return Err(TranslateError::UnsupportedLanguagePair { from: source, to });
        }

        if !status.is_success() {
            return Err(TranslateError::ApiError(format!("HTTP {}", status)));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| TranslateError::ApiError(format!("Failed to parse response: {}", e)))?;

        let (translated, detected) = parse_response(&json)?;

        Ok(Translation {
            text: translated,
            from: from.or(detected),
            to,
            provider: "google".to_string(),
        })
    }

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            name: "Google Translate".to_string(),
            requires_api_key: false,
            free_tier_available: true,
        }
    }
}

/// Response shape: `[[["Bonjour ","Hello ",...],["le monde","world",...]], null, "en", ...]`.
/// Long input comes back split into sentences, so all segments are joined.
fn parse_response(
    json: &serde_json::Value,
) -> Result<(String, Option<LanguageCode>), TranslateError> {
    let segments = json
        .get(0)
        .and_then(|s| s.as_array())
        .ok_or_else(|| TranslateError::ApiError("No translation in response".to_string()))?;

    let text: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(|t| t.as_str()))
        .collect();

    if text.is_empty() {
        return Err(TranslateError::ApiError("Empty translation".to_string()));
    }

    let detected = json.get(2).and_then(|d| d.as_str()).map(str::to_string);
    Ok((text, detected))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::Router;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_joins_sentences() {
        let json = json!([
            [["Bonjour. ", "Hello. ", null, null, 10], ["Au revoir.", "Goodbye.", null, null, 10]],
            null,
            "en"
        ]);
        let (text, detected) = parse_response(&json).unwrap();
        assert_eq!(text, "Bonjour. Au revoir.");
        assert_eq!(detected.as_deref(), Some("en"));
    }

    #[test]
    fn test_parse_rejects_unexpected_shape() {
        assert!(parse_response(&json!({"error": "nope"})).is_err());
        assert!(parse_response(&json!([[]])).is_err());
    }

    async fn fake_google(Query(params): Query<HashMap<String, String>>) -> Response {
        match (params.get("tl").map(String::as_str), params.get("q").map(String::as_str)) {
            (Some("fr"), Some("hello")) => {
                axum::Json(json!([[["bonjour", "hello", null, null, 10]], null, "en"])).into_response()
            }
            (Some("xx"), _) => StatusCode::BAD_REQUEST.into_response(),
            (_, Some("spam")) => StatusCode::TOO_MANY_REQUESTS.into_response(),
            _ => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }

    async fn translator() -> GoogleTranslator {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let app = Router::new().route("/translate_a/single", get(fake_google));
            axum::serve(listener, app).await.unwrap();
        });

        GoogleTranslator::new(&TranslatorConfig {
            api_url: format!("http://{addr}/translate_a/single"),
            ..TranslatorConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_translate_detects_source() {
        let google = translator().await;
        let translation = google.translate("hello", None, "fr".into()).await.unwrap();
        assert_eq!(translation.text, "bonjour");
        assert_eq!(translation.from.as_deref(), Some("en"));
        assert_eq!(translation.provider, "google");
    }

    #[tokio::test]
    async fn test_status_codes_map_to_errors() {
        let google = translator().await;
        assert!(matches!(
            google.translate("hello", None, "xx".into()).await,
            Err(TranslateError::UnsupportedLanguagePair { .. })
        ));
        assert!(matches!(
            google.translate("spam", None, "de".into()).await,
            Err(TranslateError::RateLimitExceeded)
        ));
        assert!(matches!(
            google.translate("other", None, "de".into()).await,
            Err(TranslateError::ApiError(_))
        ));
    }
}
