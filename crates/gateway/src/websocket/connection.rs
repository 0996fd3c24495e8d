use std::time::Duration;

use classroom_chats::types::{ClientFrame, PushFrame};
use classroom_chats::PushEvent;
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::error::{GatewayError, GatewayResult};

/// Interval between client `ping` frames
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);

pub(crate) type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub(crate) async fn open(
    url: &str,
    token: Option<&str>,
    connect_timeout: Duration,
) -> GatewayResult<Socket> {
    let mut request = url.into_client_request()?;
    if let Some(token) = token {
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|error| GatewayError::InvalidEndpoint(error.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }

    let (socket, _) = tokio::time::timeout(connect_timeout, connect_async(request))
        .await
        .map_err(|_| GatewayError::ConnectTimeout {
            url: url.to_string(),
            seconds: connect_timeout.as_secs(),
        })??;
    Ok(socket)
}

async fn send_frame<S>(sink: &mut S, frame: &ClientFrame) -> GatewayResult<()>
where
    S: Sink<WsMessage, Error = tungstenite::Error> + Unpin,
{
    let text = serde_json::to_string(frame)?;
    sink.send(WsMessage::Text(text)).await?;
    Ok(())
}

/// Decode a server frame addressed to `channel`; everything else is skipped
fn decode_frame(channel: &str, text: &str) -> Option<PushEvent> {
    let frame: PushFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(_) => {
            debug!(channel, "ignoring non-event frame");
            return None;
        }
    };

    if frame.channel != channel {
        debug!(channel, other = %frame.channel, "ignoring frame for another channel");
        return None;
    }

    match frame.into_event() {
        Ok(Some(event)) => Some(event),
        Ok(None) => {
            debug!(channel, "ignoring unknown push event");
            None
        }
        Err(error) => {
            warn!(channel, %error, "malformed push payload");
            None
        }
    }
}

/// Drive one connection until the server closes it or the subscriber goes away
pub(crate) async fn pump(socket: Socket, channel: String, events: mpsc::Sender<PushEvent>) {
    let (mut sink, mut stream) = socket.split();

    let subscribe = ClientFrame::Subscribe {
        channel: channel.clone(),
    };
    if let Err(error) = send_frame(&mut sink, &subscribe).await {
        warn!(%channel, %error, "failed to subscribe");
        return;
    }

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            _ = events.closed() => {
                let unsubscribe = ClientFrame::Unsubscribe { channel: channel.clone() };
                if let Err(error) = send_frame(&mut sink, &unsubscribe).await {
                    debug!(%channel, %error, "failed to unsubscribe");
                }
                let _ = sink.close().await;
                break;
            }
            _ = heartbeat.tick() => {
                if let Err(error) = send_frame(&mut sink, &ClientFrame::Ping).await {
                    warn!(%channel, %error, "heartbeat failed");
                    break;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => {
                    if let Some(event) = decode_frame(&channel, &text) {
                        if events.send(event).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    warn!(%channel, %error, "push connection failed");
                    break;
                }
            },
        }
    }

    debug!(%channel, "push connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_frame_filters_channel() {
        let frame = json!({
            "channel": "conversation-c1",
            "event": "message-deleted",
            "data": {"messageId": "m1", "conversationId": "c1"}
        })
        .to_string();

        assert!(decode_frame("conversation-c1", &frame).is_some());
        assert!(decode_frame("conversation-c2", &frame).is_none());
    }

    #[test]
    fn test_decode_frame_skips_noise() {
        assert!(decode_frame("conversation-c1", r#"{"type":"pong"}"#).is_none());
        let unknown = json!({"channel": "conversation-c1", "event": "typing", "data": {}}).to_string();
        assert!(decode_frame("conversation-c1", &unknown).is_none());
        let malformed =
            json!({"channel": "conversation-c1", "event": "message-deleted", "data": {}}).to_string();
        assert!(decode_frame("conversation-c1", &malformed).is_none());
    }
}
