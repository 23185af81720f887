use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Used when neither the stored setting nor the environment names a backend.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// A retrieval chunk as returned by the backend.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChunkOut {
    pub id: i64,
    pub document_id: i64,
    #[serde(default)]
    pub document_name: Option<String>,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QaResponse {
    pub answer: String,
    pub context: Vec<ChunkOut>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DocumentOut {
    pub id: i64,
    pub name: String,
    pub source: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IngestResponse {
    pub id: i64,
    pub name: String,
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    k: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {detail}")]
    Api { status: u16, detail: String },
}

impl Serialize for GatewayError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Typed client for the document Q&A backend. One HTTP call per operation;
/// every failure surfaces as a single `GatewayError`. Retries, if any,
/// belong to the caller.
#[derive(Debug, Clone)]
pub struct Gateway {
    pub base_url: String,
}

impl Gateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub async fn list_documents(&self) -> Result<Vec<DocumentOut>, GatewayError> {
        let client = Client::new();
        let resp = client
            .get(format!("{}/documents", self.base_url))
            .send()
            .await?;
        let resp = ok_or_detail(resp).await?;
        Ok(resp.json().await?)
    }

    pub async fn ask(&self, query: &str, k: usize) -> Result<QaResponse, GatewayError> {
        let client = Client::new();
        let resp = client
            .post(format!("{}/ask", self.base_url))
            .json(&QueryRequest { query, k })
            .send()
            .await?;
        let resp = ok_or_detail(resp).await?;
        Ok(resp.json().await?)
    }

    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<ChunkOut>, GatewayError> {
        let client = Client::new();
        let resp = client
            .post(format!("{}/search", self.base_url))
            .json(&QueryRequest { query, k })
            .send()
            .await?;
        let resp = ok_or_detail(resp).await?;
        Ok(resp.json().await?)
    }

    pub async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<IngestResponse, GatewayError> {
        let client = Client::new();
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let resp = client
            .post(format!("{}/ingest_pdf", self.base_url))
            .multipart(form)
            .send()
            .await?;
        let resp = ok_or_detail(resp).await?;
        Ok(resp.json().await?)
    }

    pub async fn delete_document(&self, id: i64) -> Result<(), GatewayError> {
        let client = Client::new();
        let resp = client
            .delete(format!("{}/documents/{}", self.base_url, id))
            .send()
            .await?;
        ok_or_detail(resp).await?;
        Ok(())
    }
}

/// Maps any non-success status to `GatewayError::Api`, keeping the response
/// body text as the error detail.
async fn ok_or_detail(resp: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let detail = resp.text().await.unwrap_or_default();
    Err(GatewayError::Api { status, detail })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_ask_parses_answer_and_context() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ask"))
            .and(body_json(serde_json::json!({"query": "what is rust", "k": 5})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "answer": "A systems language.",
                "context": [
                    {"id": 1, "document_id": 2, "document_name": "intro.pdf", "content": "Rust is..."},
                    {"id": 3, "document_id": 2, "content": "It compiles to..."}
                ]
            })))
            .mount(&server)
            .await;

        let gateway = Gateway::new(server.uri());
        let response = gateway.ask("what is rust", 5).await.unwrap();
        assert_eq!(response.answer, "A systems language.");
        assert_eq!(response.context.len(), 2);
        assert_eq!(response.context[0].document_name.as_deref(), Some("intro.pdf"));
        // document_name is optional in the wire format
        assert_eq!(response.context[1].document_name, None);
    }

    #[tokio::test]
    async fn test_error_status_carries_body_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ask"))
            .respond_with(ResponseTemplate::new(500).set_body_string("vector index not ready"))
            .mount(&server)
            .await;

        let gateway = Gateway::new(server.uri());
        let err = gateway.ask("anything", 5).await.unwrap_err();
        match err {
            GatewayError::Api { status, detail } => {
                assert_eq!(status, 500);
                assert_eq!(detail, "vector index not ready");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_documents() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/documents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 1, "name": "a.pdf", "source": "upload"},
                {"id": 2, "name": "b.pdf", "source": "upload"}
            ])))
            .mount(&server)
            .await;

        let gateway = Gateway::new(server.uri());
        let docs = gateway.list_documents().await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].name, "a.pdf");
    }

    #[tokio::test]
    async fn test_upload_returns_ingest_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/ingest_pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": 7, "name": "notes.pdf"})),
            )
            .mount(&server)
            .await;

        let gateway = Gateway::new(server.uri());
        let ingested = gateway.upload("notes.pdf", b"%PDF-1.4".to_vec()).await.unwrap();
        assert_eq!(ingested.id, 7);
        assert_eq!(ingested.name, "notes.pdf");
    }

    #[tokio::test]
    async fn test_delete_document_hits_document_path() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/documents/42"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let gateway = Gateway::new(server.uri());
        gateway.delete_document(42).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_failure_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/documents/42"))
            .respond_with(ResponseTemplate::new(404).set_body_string("document not found"))
            .mount(&server)
            .await;

        let gateway = Gateway::new(server.uri());
        let err = gateway.delete_document(42).await.unwrap_err();
        assert!(err.to_string().contains("document not found"));
    }
}
