//! Integration tests for the JSON-lines transport.
//!
//! Drives a real executor through `serve_json_lines` the way the `serve`
//! command does, with in-memory streams in place of stdin/stdout.
//!
//! Run with: `cargo test --test transport_integration`

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use pixo_worker::codec::{
    BoxFuture, CodecAdapter, CodecError, CompressOptions, CompressOutput, ImageCodec, RawImage,
    ResizeOptions, ResizeOutput,
};
use pixo_worker::config::ExecutorConfig;
use pixo_worker::executor::spawn_executor;
use pixo_worker::transport::serve_json_lines;

// ============================================================================
// Helper Functions
// ============================================================================

/// Compress waits on a gate; resize answers immediately.
struct GatedCodec {
    gate: Arc<Semaphore>,
}

impl CodecAdapter for GatedCodec {
    fn name(&self) -> &str {
        "gated"
    }

    fn compress(
        &self,
        _image: RawImage,
        _options: CompressOptions,
    ) -> BoxFuture<'_, Result<CompressOutput, CodecError>> {
        Box::pin(async move {
            self.gate
                .acquire()
                .await
                .map_err(|_| CodecError::new("gate closed"))?
                .forget();
            Ok(CompressOutput {
                data: Bytes::from_static(b"ok"),
                elapsed_ms: 0.0,
            })
        })
    }

    fn resize(
        &self,
        _image: RawImage,
        options: ResizeOptions,
    ) -> BoxFuture<'_, Result<ResizeOutput, CodecError>> {
        Box::pin(async move {
            Ok(ResizeOutput {
                width: options.width,
                height: options.height,
                pixels: Bytes::from(vec![0u8; (options.width * options.height * 4) as usize]),
            })
        })
    }
}

fn config() -> ExecutorConfig {
    ExecutorConfig::default()
        .with_max_concurrent_tasks(4)
        .with_shutdown_grace(Duration::from_secs(2))
}

fn pixels(width: u32, height: u32) -> Vec<u8> {
    (0..width * height)
        .flat_map(|i| [(i % 251) as u8, 40, 90, 255])
        .collect()
}

fn line(value: Value) -> String {
    format!("{}\n", value)
}

fn by_id(output: &[u8]) -> HashMap<String, Vec<Value>> {
    let mut map: HashMap<String, Vec<Value>> = HashMap::new();
    for line in std::str::from_utf8(output).unwrap().lines() {
        let value: Value = serde_json::from_str(line).unwrap();
        let id = value["id"].as_str().unwrap().to_string();
        map.entry(id).or_default().push(value);
    }
    map
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_session_with_reference_codec() {
    let (link, handle) = spawn_executor(
        config(),
        Arc::new(ImageCodec::new()),
        CancellationToken::new(),
    );

    let mut input = String::new();
    input.push_str(&line(json!({
        "id": "a",
        "type": "compress",
        "width": 10,
        "height": 10,
        "data": pixels(10, 10),
        "options": {"format": "png"}
    })));
    input.push_str(&line(json!({
        "id": "c",
        "type": "resize",
        "width": 20,
        "height": 10,
        "data": pixels(20, 10),
        "options": {"width": 10, "height": 10, "algorithm": "nearest", "maintainAspectRatio": true}
    })));
    input.push('\n');
    input.push_str(&line(json!({"id": "bad", "type": "rotate"})));
    input.push_str("this is not json\n");
    input.push_str(&line(json!({
        "id": "short",
        "type": "compress",
        "width": 4,
        "height": 4,
        "data": [1, 2, 3],
        "options": {"format": "jpeg", "quality": 70}
    })));

    let mut output = Vec::new();
    serve_json_lines(input.as_bytes(), &mut output, link)
        .await
        .unwrap();
    let stats = handle.await.unwrap();

    let responses = by_id(&output);
    assert_eq!(responses.len(), 4, "responses: {:?}", responses.keys());
    assert!(responses.values().all(|v| v.len() == 1));

    let a = &responses["a"][0];
    assert_eq!(a["success"], true);
    assert!(a["result"]["elapsedMs"].as_f64().unwrap() >= 0.0);
    assert_eq!(a["result"]["data"][0], 0x89);

    let c = &responses["c"][0];
    assert_eq!(c["success"], true);
    assert_eq!(c["result"]["width"], 10);
    assert_eq!(c["result"]["height"], 5);
    assert_eq!(c["result"]["data"].as_array().unwrap().len(), 10 * 5 * 4);

    let bad = &responses["bad"][0];
    assert_eq!(bad["success"], false);
    assert_eq!(bad["errorType"], "unknown");

    let short = &responses["short"][0];
    assert_eq!(short["success"], false);
    assert_eq!(short["errorType"], "unknown");
    assert!(short["error"].as_str().unwrap().contains("does not match"));

    assert_eq!(stats.requests, 3);
}

#[tokio::test]
async fn test_cancelled_task_writes_no_line() {
    let gate = Arc::new(Semaphore::new(0));
    let codec = Arc::new(GatedCodec {
        gate: Arc::clone(&gate),
    });
    let (link, _handle) = spawn_executor(config(), codec, CancellationToken::new());

    let (mut input_tx, input_rx) = tokio::io::duplex(64 * 1024);
    let (output_tx, output_rx) = tokio::io::duplex(64 * 1024);
    let server = tokio::spawn(serve_json_lines(BufReader::new(input_rx), output_tx, link));
    let mut output = BufReader::new(output_rx).lines();

    let compress = json!({
        "id": "b",
        "type": "compress",
        "width": 1,
        "height": 1,
        "data": [0, 0, 0, 255],
        "options": {"format": "png"}
    });
    let probe = json!({
        "id": "probe",
        "type": "resize",
        "width": 1,
        "height": 1,
        "data": [0, 0, 0, 255],
        "options": {"width": 1, "height": 1}
    });

    input_tx.write_all(line(compress).as_bytes()).await.unwrap();
    input_tx
        .write_all(line(json!({"id": "b", "type": "cancel"})).as_bytes())
        .await
        .unwrap();
    input_tx.write_all(line(probe).as_bytes()).await.unwrap();

    let first = tokio::time::timeout(Duration::from_secs(5), output.next_line())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let first: Value = serde_json::from_str(&first).unwrap();
    assert_eq!(first["id"], "probe");

    gate.add_permits(1);
    drop(input_tx);

    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(output.next_line().await.unwrap().is_none());
}
