//! AWS Comprehend recognizer
//!
//! Calls the Comprehend `DetectEntities` JSON API over HTTPS, signing each
//! request with AWS Signature Version 4. Comprehend reports entities as
//! character offsets; they are mapped onto the shared tokenizer so the
//! output is directly comparable with the local recognizer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::tokenize::TokenizedText;
use entrel_core::{AnalyzedText, AwsConfig, EntityRecognizer, EntitySpan, EntrelError, Result};

type HmacSha256 = Hmac<Sha256>;

const SERVICE: &str = "comprehend";
const TARGET: &str = "Comprehend_20171127.DetectEntities";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// DetectEntities accepts at most 100 KB of UTF-8 per request
pub const MAX_REQUEST_BYTES: usize = 100_000;

/// Chunk requests in flight at once for long documents
const MAX_CONCURRENT_REQUESTS: usize = 4;

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DetectEntitiesRequest<'a> {
    text: &'a str,
    language_code: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DetectEntitiesResponse {
    #[serde(default)]
    entities: Vec<ComprehendEntity>,
}

/// One entity as reported by Comprehend
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ComprehendEntity {
    pub text: String,
    #[serde(rename = "Type")]
    pub entity_type: String,
    pub score: f32,
    pub begin_offset: usize,
    pub end_offset: usize,
}

// ============================================================================
// Request Signing
// ============================================================================

/// AWS credentials used for signing
#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .finish()
    }
}

/// Signature Version 4 signer for a single service and region
#[derive(Debug, Clone)]
pub struct SigV4Signer {
    credentials: AwsCredentials,
    region: String,
    service: String,
}

impl SigV4Signer {
    pub fn new(credentials: AwsCredentials, region: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            credentials,
            region: region.into(),
            service: service.into(),
        }
    }

    /// Headers to attach to a signed `POST /` with a JSON body
    pub fn sign(
        &self,
        host: &str,
        target: &str,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<(&'static str, String)>> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();

        // Canonical headers, sorted by name
        let mut headers: Vec<(&'static str, String)> = vec![
            ("content-type", CONTENT_TYPE.to_string()),
            ("host", host.to_string()),
            ("x-amz-date", amz_date.clone()),
        ];
        if let Some(token) = &self.credentials.session_token {
            headers.push(("x-amz-security-token", token.clone()));
        }
        headers.push(("x-amz-target", target.to_string()));

        let canonical_headers: String = headers
            .iter()
            .map(|(name, value)| format!("{name}:{}\n", value.trim()))
            .collect();
        let signed_headers = headers
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(";");

        let canonical_request = format!(
            "POST\n/\n\n{canonical_headers}\n{signed_headers}\n{}",
            sha256_hex(body.as_bytes())
        );

        let scope = format!("{date}/{}/{}/aws4_request", self.region, self.service);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
            sha256_hex(canonical_request.as_bytes())
        );

        let secret = format!("AWS4{}", self.credentials.secret_access_key);
        let k_date = hmac_sha256(secret.as_bytes(), date.as_bytes())?;
        let k_region = hmac_sha256(&k_date, self.region.as_bytes())?;
        let k_service = hmac_sha256(&k_region, self.service.as_bytes())?;
        let k_signing = hmac_sha256(&k_service, b"aws4_request")?;
        let signature = hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes())?);

        headers.push((
            "authorization",
            format!(
                "AWS4-HMAC-SHA256 Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
                self.credentials.access_key_id
            ),
        ));

        Ok(headers)
    }
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| EntrelError::Other(anyhow::anyhow!("invalid signing key: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

// ============================================================================
// Comprehend Recognizer
// ============================================================================

/// Entity recognizer backed by AWS Comprehend
pub struct ComprehendRecognizer {
    client: Client,
    endpoint: String,
    host: String,
    language_code: String,
    signer: SigV4Signer,
}

impl ComprehendRecognizer {
    /// Create from config
    pub fn from_config(config: &AwsConfig) -> Result<Self> {
        let access_key_id = config.access_key_id.clone().ok_or_else(|| {
            EntrelError::ConfigError("AWS_ACCESS_KEY_ID is required for aws mode".to_string())
        })?;
        let secret_access_key = config.secret_access_key.clone().ok_or_else(|| {
            EntrelError::ConfigError("AWS_SECRET_ACCESS_KEY is required for aws mode".to_string())
        })?;

        let endpoint = config.endpoint_url();
        let url = reqwest::Url::parse(&endpoint)
            .map_err(|e| EntrelError::ConfigError(format!("Invalid Comprehend endpoint {endpoint}: {e}")))?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(EntrelError::ConfigError(format!(
                    "Comprehend endpoint has no host: {endpoint}"
                )))
            }
        };

        let credentials = AwsCredentials {
            access_key_id,
            secret_access_key,
            session_token: config.session_token.clone(),
        };

        Ok(Self {
            client: Client::new(),
            endpoint,
            host,
            language_code: config.language_code.clone(),
            signer: SigV4Signer::new(credentials, config.region.clone(), SERVICE),
        })
    }

    /// Call DetectEntities for one chunk of text
    async fn detect_entities(&self, text: &str) -> Result<Vec<ComprehendEntity>> {
        let body = serde_json::to_string(&DetectEntitiesRequest {
            text,
            language_code: &self.language_code,
        })
        .map_err(|e| EntrelError::RecognitionError(format!("Failed to encode request: {e}")))?;

        let headers = self.signer.sign(&self.host, TARGET, &body, Utc::now())?;

        let mut request = self.client.post(&self.endpoint);
        for (name, value) in headers {
            // reqwest derives Host from the URL
            if name != "host" {
                request = request.header(name, value);
            }
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| EntrelError::RecognitionError(format!("Comprehend request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "Comprehend rejected DetectEntities request");
            return Err(EntrelError::RecognitionError(format!(
                "Comprehend error ({status}): {error_text}"
            )));
        }

        let result: DetectEntitiesResponse = response.json().await.map_err(|e| {
            EntrelError::RecognitionError(format!("Failed to parse Comprehend response: {e}"))
        })?;

        Ok(result.entities)
    }
}

#[async_trait]
impl EntityRecognizer for ComprehendRecognizer {
    async fn analyze(&self, text: &str) -> Result<AnalyzedText> {
        let doc = TokenizedText::new(text);
        let ranges = chunk_ranges(&doc, MAX_REQUEST_BYTES);
        tracing::debug!(chunks = ranges.len(), "Sending text to Comprehend");

        let detected: Vec<(usize, Vec<ComprehendEntity>)> = stream::iter(ranges)
            .map(|(start, end)| async move {
                let entities = self.detect_entities(&text[start..end]).await?;
                Ok::<_, EntrelError>((start, entities))
            })
            .buffered(MAX_CONCURRENT_REQUESTS)
            .try_collect()
            .await?;

        let entities = detected
            .iter()
            .flat_map(|(start, chunk)| map_entities(&doc, *start, chunk))
            .collect();

        Ok(AnalyzedText {
            sentences: doc.sentences().to_vec(),
            entities,
            token_count: doc.token_count(),
        })
    }

    fn name(&self) -> &str {
        "aws"
    }
}

/// Map entities detected in the chunk starting at `chunk_start` (bytes) onto
/// document tokens. Entities that cannot be placed are skipped.
pub fn map_entities(
    doc: &TokenizedText<'_>,
    chunk_start: usize,
    detected: &[ComprehendEntity],
) -> Vec<EntitySpan> {
    let chunk = &doc.text()[chunk_start..];

    detected
        .iter()
        .filter_map(|entity| {
            let (start, end) =
                crate::tokenize::char_span_to_byte_span(chunk, entity.begin_offset, entity.end_offset)?;
            let (start_token, end_token) =
                doc.byte_span_to_tokens(chunk_start + start, chunk_start + end)?;

            Some(
                EntitySpan::new(entity.text.clone(), entity.entity_type.clone(), start_token, end_token)
                    .with_confidence(entity.score),
            )
        })
        .collect()
}

/// Split a document into byte ranges of at most `max_bytes`, breaking
/// between sentences where possible and between tokens otherwise
pub fn chunk_ranges(doc: &TokenizedText<'_>, max_bytes: usize) -> Vec<(usize, usize)> {
    let tokens = doc.tokens();
    let mut ranges = Vec::new();
    let mut current: Option<(usize, usize)> = None;

    for sentence in doc.sentences() {
        let (s_start, s_end) = doc.sentence_bytes(sentence);

        match current {
            Some((c_start, _)) if s_end - c_start <= max_bytes => {
                current = Some((c_start, s_end));
                continue;
            }
            Some(range) => ranges.push(range),
            None => {}
        }

        if s_end - s_start <= max_bytes {
            current = Some((s_start, s_end));
            continue;
        }

        // Oversized sentence: pack its tokens
        current = None;
        for token in &tokens[sentence.start_token..sentence.end_token] {
            if token.end - token.start > max_bytes {
                ranges.extend(current.take());
                ranges.extend(split_span(doc.text(), token.start, token.end, max_bytes));
                continue;
            }
            match current {
                Some((c_start, _)) if token.end - c_start <= max_bytes => {
                    current = Some((c_start, token.end));
                }
                Some(range) => {
                    ranges.push(range);
                    current = Some((token.start, token.end));
                }
                None => current = Some((token.start, token.end)),
            }
        }
    }

    ranges.extend(current);
    ranges
}

/// Cut a byte range into pieces of at most `max_bytes`, on char boundaries.
/// A piece only exceeds `max_bytes` when a single char is wider than it.
fn split_span(text: &str, start: usize, end: usize, max_bytes: usize) -> Vec<(usize, usize)> {
    let mut pieces = Vec::new();
    let mut piece_start = start;

    while end - piece_start > max_bytes {
        let mut cut = piece_start + max_bytes;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        if cut == piece_start {
            cut += text[piece_start..].chars().next().map_or(1, char::len_utf8);
        }
        pieces.push((piece_start, cut));
        piece_start = cut;
    }

    pieces.push((piece_start, end));
    pieces
}
