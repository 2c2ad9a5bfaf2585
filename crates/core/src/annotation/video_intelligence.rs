use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    annotation::{SHOT_CHANGE_FEATURE, ShotAnnotation, ShotAnnotator, TokenSource},
    config::PipelineConfig,
    error::DetectionServiceError,
};

/// Google Cloud Video Intelligence client for shot-change detection.
pub struct VideoIntelligenceClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    poll_interval: Duration,
    tokens: Arc<dyn TokenSource>,
}

#[derive(Debug, Deserialize)]
struct OperationHandle {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct Operation {
    #[serde(default)]
    done: bool,
    error: Option<Status>,
    response: Option<AnnotateVideoResponse>,
}

#[derive(Debug, Default, Deserialize)]
struct Status {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateVideoResponse {
    #[serde(default)]
    annotation_results: Vec<AnnotationResults>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotationResults {
    #[serde(default)]
    shot_annotations: Vec<ShotAnnotation>,
    error: Option<Status>,
}

impl VideoIntelligenceClient {
    pub fn new(config: &PipelineConfig, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.annotation_endpoint.trim_end_matches('/').to_string(),
            model: config.detection_model.clone(),
            poll_interval: config.operation_poll_interval,
            tokens,
        }
    }

    fn annotate_request(&self, payload: &[u8]) -> serde_json::Value {
        serde_json::json!({
            "inputContent": STANDARD.encode(payload),
            "features": [SHOT_CHANGE_FEATURE],
            "videoContext": {
                "shotChangeDetectionConfig": {
                    "model": self.model,
                },
            },
        })
    }

    async fn submit(&self, payload: &[u8]) -> Result<String, DetectionServiceError> {
        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .post(format!("{}/v1/videos:annotate", self.endpoint))
            .bearer_auth(token)
            .json(&self.annotate_request(payload))
            .send()
            .await?;

        let handle: OperationHandle = read_json(response).await?;
        info!(operation = %handle.name, bytes = payload.len(), "Annotation job submitted");
        Ok(handle.name)
    }

    /// Wait for `operation` to finish and return its shot annotations.
    async fn await_operation(
        &self,
        operation: &str,
    ) -> Result<Vec<ShotAnnotation>, DetectionServiceError> {
        loop {
            let token = self.tokens.access_token().await?;
            let response = self
                .http
                .get(format!("{}/v1/{}", self.endpoint, operation))
                .bearer_auth(token)
                .send()
                .await?;

            let state: Operation = read_json(response).await?;
            if let Some(shots) = extract_shots(operation, state)? {
                info!(operation, shots = shots.len(), "Annotation job finished");
                return Ok(shots);
            }

            debug!(operation, "Annotation job still running");
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

async fn read_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, DetectionServiceError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(DetectionServiceError::Status {
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|e| DetectionServiceError::MalformedResponse {
        reason: e.to_string(),
    })
}

/// `Ok(None)` while the operation is still running.
fn extract_shots(
    operation: &str,
    state: Operation,
) -> Result<Option<Vec<ShotAnnotation>>, DetectionServiceError> {
    if !state.done {
        return Ok(None);
    }
    if let Some(status) = state.error {
        return Err(DetectionServiceError::Operation {
            operation: operation.to_string(),
            code: status.code,
            message: status.message,
        });
    }

    let results = state
        .response
        .and_then(|r| r.annotation_results.into_iter().next())
        .ok_or_else(|| DetectionServiceError::MalformedResponse {
            reason: format!("operation {operation} finished without annotation results"),
        })?;

    if let Some(status) = results.error {
        return Err(DetectionServiceError::Operation {
            operation: operation.to_string(),
            code: status.code,
            message: status.message,
        });
    }

    Ok(Some(results.shot_annotations))
}

#[async_trait]
impl ShotAnnotator for VideoIntelligenceClient {
    async fn annotate(
        &self,
        payload: Vec<u8>,
    ) -> Result<Vec<ShotAnnotation>, DetectionServiceError> {
        let operation = self.submit(&payload).await?;
        drop(payload);
        self.await_operation(&operation).await
    }
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };

    use super::*;
    use crate::{annotation::StaticToken, types::ShotBoundary};

    const OPERATION: &str = "projects/p/locations/us-east1/operations/42";

    #[derive(Debug)]
    struct SeenRequest {
        request_line: String,
        authorization: Option<String>,
        body: String,
    }

    /// Answers one connection per scripted reply, in order, then stops.
    async fn stub_server(replies: Vec<(u16, String)>) -> (String, JoinHandle<Vec<SeenRequest>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());

        let server = tokio::spawn(async move {
            let mut seen = Vec::new();
            for (status, body) in replies {
                let (mut socket, _) = listener.accept().await.unwrap();
                seen.push(read_request(&mut socket).await);

                let response = format!(
                    "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
            seen
        });

        (endpoint, server)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> SeenRequest {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
        let request_line = head.lines().next().unwrap().to_string();
        let header = |name: &str| {
            head.lines().skip(1).find_map(|line| {
                let (key, value) = line.split_once(':')?;
                key.eq_ignore_ascii_case(name)
                    .then(|| value.trim().to_string())
            })
        };
        let content_length: usize = header("content-length")
            .map(|v| v.parse().unwrap())
            .unwrap_or(0);

        while buf.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before body");
            buf.extend_from_slice(&chunk[..n]);
        }

        SeenRequest {
            request_line,
            authorization: header("authorization"),
            body: String::from_utf8_lossy(&buf[header_end..header_end + content_length])
                .into_owned(),
        }
    }

    fn client_for(endpoint: &str) -> VideoIntelligenceClient {
        let mut config = PipelineConfig::new("u");
        config.annotation_endpoint = endpoint.to_string();
        config.operation_poll_interval = Duration::ZERO;
        VideoIntelligenceClient::new(&config, Arc::new(StaticToken::new("secret-token")))
    }

    fn operation(json: &str) -> Operation {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn builds_shot_change_request() {
        let config = PipelineConfig::new("u");
        let client = VideoIntelligenceClient::new(&config, Arc::new(StaticToken::new("t")));
        let request = client.annotate_request(b"abc");

        assert_eq!(request["inputContent"], "YWJj");
        assert_eq!(request["features"][0], "SHOT_CHANGE_DETECTION");
        assert_eq!(
            request["videoContext"]["shotChangeDetectionConfig"]["model"],
            "builtin/latest"
        );
    }

    #[test]
    fn running_operation_has_no_shots_yet() {
        let state = operation(r#"{"name": "projects/p/locations/l/operations/1"}"#);
        assert!(extract_shots("op", state).unwrap().is_none());
    }

    #[test]
    fn finished_operation_yields_shots() {
        let state = operation(
            r#"{
                "done": true,
                "response": {
                    "annotationResults": [{
                        "shotAnnotations": [
                            {"startTimeOffset": {}, "endTimeOffset": {"seconds": "10", "nanos": 0}},
                            {"startTimeOffset": "10s", "endTimeOffset": "25.0004s"}
                        ]
                    }]
                }
            }"#,
        );
        let shots = extract_shots("op", state).unwrap().unwrap();
        let boundaries: Vec<_> = shots.iter().map(ShotAnnotation::to_boundary).collect();
        assert_eq!(
            boundaries,
            vec![ShotBoundary::new(0.0, 10.0), ShotBoundary::new(10.0, 25.0)]
        );
    }

    #[test]
    fn finished_operation_without_shot_list_is_empty() {
        let state = operation(r#"{"done": true, "response": {"annotationResults": [{}]}}"#);
        assert!(extract_shots("op", state).unwrap().unwrap().is_empty());
    }

    #[test]
    fn operation_errors_are_surfaced() {
        let state = operation(
            r#"{"done": true, "error": {"code": 8, "message": "Quota exceeded"}}"#,
        );
        let err = extract_shots("op", state).unwrap_err();
        assert!(matches!(
            err,
            DetectionServiceError::Operation { code: 8, .. }
        ));

        let state = operation(r#"{"done": true, "response": {}}"#);
        assert!(matches!(
            extract_shots("op", state).unwrap_err(),
            DetectionServiceError::MalformedResponse { .. }
        ));
    }

    #[tokio::test]
    async fn waits_on_submitted_operation_until_done() {
        let (endpoint, server) = stub_server(vec![
            (200, format!(r#"{{"name": "{OPERATION}"}}"#)),
            (200, format!(r#"{{"name": "{OPERATION}", "done": false}}"#)),
            (
                200,
                format!(
                    r#"{{
                        "name": "{OPERATION}",
                        "done": true,
                        "response": {{"annotationResults": [{{"shotAnnotations": [
                            {{"startTimeOffset": "0s", "endTimeOffset": "4.5s"}},
                            {{"startTimeOffset": "4.5s", "endTimeOffset": "9s"}}
                        ]}}]}}
                    }}"#
                ),
            ),
        ])
        .await;

        let shots = client_for(&endpoint).annotate(b"abc".to_vec()).await.unwrap();
        let boundaries: Vec<_> = shots.iter().map(ShotAnnotation::to_boundary).collect();
        assert_eq!(
            boundaries,
            vec![ShotBoundary::new(0.0, 4.5), ShotBoundary::new(4.5, 9.0)]
        );

        let seen = server.await.unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen[0].request_line.starts_with("POST /v1/videos:annotate "));
        assert!(seen[0].body.contains(r#""inputContent":"YWJj""#));
        for poll in &seen[1..] {
            assert!(
                poll.request_line
                    .starts_with(&format!("GET /v1/{OPERATION} ")),
                "{}",
                poll.request_line
            );
        }
        assert!(
            seen.iter()
                .all(|r| r.authorization.as_deref() == Some("Bearer secret-token"))
        );
    }

    #[tokio::test]
    async fn error_status_is_reported_with_body() {
        let (endpoint, server) =
            stub_server(vec![(403, r#"{"error": {"message": "denied"}}"#.to_string())]).await;

        let err = client_for(&endpoint).annotate(b"abc".to_vec()).await.unwrap_err();
        match err {
            DetectionServiceError::Status { status, body } => {
                assert_eq!(status, 403);
                assert!(body.contains("denied"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(server.await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unreadable_submit_reply_is_malformed() {
        let (endpoint, server) = stub_server(vec![(200, "<html>oops</html>".to_string())]).await;

        let err = client_for(&endpoint).annotate(b"abc".to_vec()).await.unwrap_err();
        assert!(matches!(err, DetectionServiceError::MalformedResponse { .. }));
        assert_eq!(server.await.unwrap().len(), 1);
    }
}
