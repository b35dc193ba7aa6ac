use std::{
    io::ErrorKind,
    net::TcpStream,
    sync::mpsc::{self, Receiver, Sender, TryRecvError},
    thread::{self, JoinHandle},
    time::Duration,
};

use serde_json::Value;
use tracing::*;
use tungstenite::{stream::MaybeTlsStream, Message, WebSocket};

use crate::{
    app::CustomEvent,
    args::LaunchArgs,
    buttons::ButtonSettings,
    errors::{AppResult, SwitcherError},
};

use super::{HostEvent, HostSink, OutboundMessage, Registration, StatePayload};

/// How long a read may block before queued outbound messages get a turn.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// [`HostSink`] that queues messages for the connection's pump thread.
#[derive(Debug, Clone)]
pub struct StreamDeckOutbound {
    tx: Sender<OutboundMessage>,
}

impl StreamDeckOutbound {
    fn queue(&self, message: OutboundMessage) -> AppResult<()> {
        self.tx.send(message).map_err(|_| SwitcherError::HostClosed)
    }
}

impl HostSink for StreamDeckOutbound {
    fn set_state(&self, context: &str, state: u32) -> AppResult<()> {
        self.queue(OutboundMessage::SetState {
            context: context.to_owned(),
            payload: StatePayload { state },
        })
    }
    fn show_alert(&self, context: &str) -> AppResult<()> {
        self.queue(OutboundMessage::ShowAlert {
            context: context.to_owned(),
        })
    }
    fn set_settings(&self, context: &str, settings: &ButtonSettings) -> AppResult<()> {
        self.queue(OutboundMessage::SetSettings {
            context: context.to_owned(),
            payload: settings.encode()?,
        })
    }
    fn send_to_property_inspector(
        &self,
        action: &str,
        context: &str,
        payload: Value,
    ) -> AppResult<()> {
        self.queue(OutboundMessage::SendToPropertyInspector {
            action: action.to_owned(),
            context: context.to_owned(),
            payload,
        })
    }
}

/// Connects and registers with the Stream Deck application, then hands the socket
/// to a pump thread that forwards every decoded [`HostEvent`] to `events`.
pub fn connect(
    launch: &LaunchArgs,
    events: Sender<CustomEvent>,
) -> AppResult<(StreamDeckOutbound, JoinHandle<AppResult<()>>)> {
    let url = format!("ws://127.0.0.1:{}", launch.port);
    info!("Connecting to Stream Deck at {url}");
    let (mut socket, _response) = tungstenite::connect(url)?;

    let registration = Registration {
        event: &launch.register_event,
        uuid: &launch.plugin_uuid,
    };
    socket.send(Message::text(serde_json::to_string(&registration)?))?;

    if let MaybeTlsStream::Plain(stream) = socket.get_ref() {
        stream.set_read_timeout(Some(POLL_INTERVAL))?;
    }

    let (tx, rx) = mpsc::channel();
    let handle = thread::Builder::new()
        .name("host-pump".into())
        .spawn(move || {
            let result = host_pump(socket, rx, &events);
            if let Err(e) = &result {
                error!("Stream Deck connection failed: {e}");
            }
            // If this fails, the event loop is already gone.
            let _ = events.send(CustomEvent::HostDisconnected);
            result
        })?;

    Ok((StreamDeckOutbound { tx }, handle))
}

fn host_pump(
    mut socket: Socket,
    outbound: Receiver<OutboundMessage>,
    events: &Sender<CustomEvent>,
) -> AppResult<()> {
    loop {
        loop {
            match outbound.try_recv() {
                Ok(message) => {
                    trace!("Sending {message:?}");
                    socket.send(Message::text(serde_json::to_string(&message)?))?;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("Outbound queue closed, closing connection");
                    socket.close(None)?;
                    return Ok(());
                }
            }
        }

        match socket.read() {
            Ok(Message::Text(text)) => match serde_json::from_str::<HostEvent>(&text) {
                Ok(HostEvent::Unknown) => trace!("Ignoring message: {text}"),
                Ok(event) => events
                    .send(CustomEvent::Host(event))
                    .map_err(|_| SwitcherError::EventLoopClosed)?,
                Err(e) => warn!("Couldn't decode message from Stream Deck ({e}): {text}"),
            },
            Ok(Message::Close(frame)) => {
                info!("Stream Deck closed the connection: {frame:?}");
                return Ok(());
            }
            Ok(_) => (),
            Err(tungstenite::Error::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                info!("Stream Deck connection closed");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }
}
