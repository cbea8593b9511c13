//! Browser native-messaging transport.
//!
//! Frames are a 4-byte native-endian length followed by UTF-8 JSON, in both
//! directions. Each request runs on its own task; replies funnel through one
//! writer task so frames never interleave.

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc,
};
use tokio_util::{
    bytes::Bytes,
    codec::{FramedRead, FramedWrite, LengthDelimitedCodec},
};

use crate::dispatch::{Dispatcher, Request, Response};
use crate::{log_debug, log_error, log_info, log_warn};

const ENABLE_LOGS: bool = true;

/// Largest message the browser accepts from a host.
pub const MAX_RESPONSE_BYTES: usize = 1024 * 1024;
/// Largest message the browser may send to a host.
pub const MAX_REQUEST_BYTES: usize = 64 * 1024 * 1024;

pub const MALFORMED_REQUEST: &str = "Malformed request";
pub const RESPONSE_TOO_LARGE: &str = "Response too large";

pub fn codec(max_frame_length: usize) -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(4)
        .native_endian()
        .max_frame_length(max_frame_length)
        .new_codec()
}

/// Serve requests from `reader` until it closes, then wait for every
/// in-flight request to be answered.
pub async fn serve<R, W>(dispatcher: Dispatcher, reader: R, writer: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut frames = FramedRead::new(reader, codec(MAX_REQUEST_BYTES));
    let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<Response>();

    let writer_task = tokio::spawn(async move {
        let mut sink = FramedWrite::new(writer, codec(MAX_RESPONSE_BYTES));
        while let Some(response) = reply_rx.recv().await {
            sink.send(encode_response(response))
                .await
                .context("failed to write response frame")?;
        }
        SinkExt::<Bytes>::flush(&mut sink)
            .await
            .context("failed to flush responses")?;
        anyhow::Ok(())
    });

    log_info!("Native messaging host listening on stdio");

    while let Some(frame) = frames.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                log_error!("Unreadable frame, closing the channel: {err}");
                break;
            }
        };

        let request = match serde_json::from_slice::<Request>(&frame) {
            Ok(request) => request,
            Err(err) => {
                log_warn!("Malformed request ({} bytes): {err}", frame.len());
                let id = serde_json::from_slice::<Value>(&frame)
                    .ok()
                    .and_then(|value| value.get("id").cloned());
                let _ = reply_tx.send(Response::failure(MALFORMED_REQUEST).with_id(id));
                continue;
            }
        };

        let dispatcher = dispatcher.clone();
        let reply_tx = reply_tx.clone();
        tokio::spawn(async move {
            let response = dispatcher.dispatch(request).await;
            if reply_tx.send(response).is_err() {
                log_warn!("Response writer closed before reply could be sent");
            }
        });
    }

    // The writer drains once the last in-flight task drops its sender.
    drop(reply_tx);
    log_debug!("Input closed; draining pending replies");

    writer_task.await.context("response writer panicked")?
}

fn encode_response(response: Response) -> Bytes {
    let id = response.id.clone();
    let encoded = match serde_json::to_vec(&response) {
        Ok(bytes) if bytes.len() <= MAX_RESPONSE_BYTES => return Bytes::from(bytes),
        Ok(bytes) => {
            log_warn!("Response of {} bytes exceeds the frame limit", bytes.len());
            serde_json::to_vec(&Response::failure(RESPONSE_TOO_LARGE).with_id(id))
        }
        Err(err) => {
            log_error!("Failed to encode response: {err}");
            serde_json::to_vec(&Response::failure("Internal error").with_id(id))
        }
    };

    Bytes::from(encoded.unwrap_or_else(|_| br#"{"success":false,"error":"Internal error"}"#.to_vec()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tokio::io::duplex;

    use super::*;
    use crate::{
        capability::{CapabilityManager, NoEngine},
        collaborators::{ForwardedCapture, OutboxReporter},
        persistence::{MemoryStore, WriteBehind},
        runtime::{Collaborators, Coordinator},
    };

    async fn dispatcher() -> Dispatcher {
        let backing = Arc::new(MemoryStore::new());
        let writer = WriteBehind::spawn(backing.clone());
        let coordinator = Coordinator::hydrate(
            backing,
            writer,
            Collaborators {
                capability: Arc::new(CapabilityManager::new(Arc::new(NoEngine))),
                screenshot_source: Arc::new(ForwardedCapture),
                reporter: Arc::new(OutboxReporter::new(std::env::temp_dir().join("tabpilot-host-test"))),
            },
        )
        .await;
        Dispatcher::new(Arc::new(coordinator))
    }

    async fn exchange(frames: Vec<Bytes>) -> Vec<Value> {
        let (client, server) = duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server);
        let (client_read, client_write) = tokio::io::split(client);

        let host = tokio::spawn({
            let dispatcher = dispatcher().await;
            async move { serve(dispatcher, server_read, server_write).await }
        });

        let mut sink = FramedWrite::new(client_write, codec(MAX_REQUEST_BYTES));
        for frame in frames {
            sink.send(frame).await.unwrap();
        }
        SinkExt::<Bytes>::close(&mut sink).await.unwrap();
        drop(sink);

        let replies: Vec<Value> = FramedRead::new(client_read, codec(MAX_RESPONSE_BYTES))
            .map(|frame| serde_json::from_slice(&frame.unwrap()).unwrap())
            .collect()
            .await;
        host.await.unwrap().unwrap();
        replies
    }

    #[tokio::test]
    async fn answers_each_frame_and_echoes_ids() {
        let replies = exchange(vec![
            Bytes::from(json!({ "type": "GET_CAPABILITY_STATUS", "id": 1 }).to_string()),
            Bytes::from(json!({ "type": "FOO", "payload": {}, "id": "two" }).to_string()),
        ])
        .await;

        assert_eq!(replies.len(), 2);
        let unknown = replies.iter().find(|reply| reply["id"] == "two").unwrap();
        assert_eq!(unknown["success"], false);
        assert_eq!(unknown["error"], "Unknown message type");
        let status = replies.iter().find(|reply| reply["id"] == 1).unwrap();
        assert_eq!(status["success"], true);
    }

    #[tokio::test]
    async fn malformed_frames_get_an_envelope() {
        let replies = exchange(vec![
            Bytes::from_static(b"{not json"),
            Bytes::from(json!({ "payload": {}, "id": 9 }).to_string()),
        ])
        .await;

        assert_eq!(replies.len(), 2);
        for reply in &replies {
            assert_eq!(reply["success"], false);
            assert_eq!(reply["error"], MALFORMED_REQUEST);
        }
        assert!(replies.iter().any(|reply| reply["id"] == 9));
    }

    #[test]
    fn oversized_responses_are_replaced() {
        let huge = Response::ok(Value::String("x".repeat(MAX_RESPONSE_BYTES))).with_id(Some(json!(3)));
        let encoded: Value = serde_json::from_slice(&encode_response(huge)).unwrap();
        assert_eq!(
            encoded,
            json!({ "success": false, "error": RESPONSE_TOO_LARGE, "id": 3 })
        );
    }
}
