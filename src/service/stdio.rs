//! JSON-lines front end: one request envelope per stdin line, one response
//! line per request on stdout. Responses may come back out of order; callers
//! match them by `id`.

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use crate::core::error::{Error, Result};
use crate::service::indexer::LogIndexer;
use crate::service::proto::SearchQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Method {
    HealthCheck,
    Search,
    SearchAndGroup,
}

#[derive(Debug, Deserialize)]
pub struct RequestEnvelope {
    #[serde(default)]
    pub id: Value,
    pub method: Method,
    #[serde(default)]
    pub params: Option<SearchQuery>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ResponseEnvelope {
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl ResponseEnvelope {
    fn from_result(id: Value, result: Result<Value>) -> Self {
        match result {
            Ok(value) => ResponseEnvelope { id, result: Some(value), error: None },
            Err(e) => ResponseEnvelope {
                id,
                result: None,
                error: Some(ErrorBody {
                    kind: e.kind.as_str().to_string(),
                    message: e.context,
                }),
            },
        }
    }
}

/// Decode one request line, run it and encode the response line
pub fn handle_request(indexer: &LogIndexer, line: &str) -> String {
    let response = match serde_json::from_str::<RequestEnvelope>(line) {
        Ok(envelope) => {
            let id = envelope.id.clone();
            ResponseEnvelope::from_result(id, dispatch(indexer, envelope))
        }
        Err(e) => ResponseEnvelope::from_result(
            Value::Null,
            Err(Error::invalid_argument(format!("Malformed request: {}", e))),
        ),
    };

    serde_json::to_string(&response).unwrap_or_else(|e| {
        format!(
            r#"{{"id":null,"error":{{"kind":"internal","message":"{}"}}}}"#,
            e.to_string().replace('"', "'")
        )
    })
}

fn dispatch(indexer: &LogIndexer, envelope: RequestEnvelope) -> Result<Value> {
    let query = envelope.params.unwrap_or_default();

    let value = match envelope.method {
        Method::HealthCheck => serde_json::to_value(indexer.health_check())?,
        Method::Search => serde_json::to_value(indexer.search(&query)?)?,
        Method::SearchAndGroup => serde_json::to_value(indexer.search_and_group(&query)?)?,
    };
    Ok(value)
}

/// Serve requests from stdin until EOF or Ctrl-C, then shut the indexer down.
pub async fn serve(indexer: Arc<LogIndexer>) -> Result<()> {
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();

    // Dedicated writer so a slow stdout never blocks reading requests
    let writer_task = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = out_rx.recv().await {
            if let Err(e) = write_line(&mut stdout, &line).await {
                tracing::error!(error = %e, "failed to write response");
                break;
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    tracing::info!("serving requests on stdin");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, shutting down");
                break;
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        tracing::info!("stdin closed, shutting down");
                        break;
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to read request");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }

                let indexer = indexer.clone();
                let out_tx = out_tx.clone();
                tokio::task::spawn_blocking(move || {
                    let response = handle_request(&indexer, &line);
                    let _ = out_tx.send(response);
                });
            }
        }
    }

    drop(out_tx);
    indexer.shutdown();
    let _ = writer_task.await;
    Ok(())
}

async fn write_line(stdout: &mut tokio::io::Stdout, line: &str) -> std::io::Result<()> {
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}
