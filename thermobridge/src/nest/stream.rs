use super::*;
use crate::bridge::DeviceFeed;
use serde::Deserialize;
use std::collections::VecDeque;

/// One dispatched server-sent event.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerEvent {
    pub event: String,
    pub data:  String,
}

/// Incremental `text/event-stream` decoder; chunks may split lines anywhere.
#[derive(Debug, Default)]
pub struct EventStreamDecoder {
    buffer: Vec<u8>,
    event:  String,
    data:   Vec<String>,
}

impl EventStreamDecoder {
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ServerEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = vec![];
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&raw);
            let line = text.trim_end_matches(|c: char| c == '\n' || c == '\r');

            if line.is_empty() {
                if let Some(e) = self.dispatch() {
                    events.push(e);
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }
            let (field, value) = match line.find(':') {
                Some(i) => {
                    let value = &line[i + 1..];
                    (&line[..i], value.strip_prefix(' ').unwrap_or(value))
                }
                None => (line, ""),
            };
            match field {
                "event" => self.event = value.to_string(),
                "data" => self.data.push(value.to_string()),
                _ => trace!("Ignoring event stream field '{}'", field),
            }
        }
        events
    }

    fn dispatch(&mut self) -> Option<ServerEvent> {
        if self.event.is_empty() && self.data.is_empty() {
            return None;
        }
        let event = std::mem::take(&mut self.event);
        Some(ServerEvent {
            event: if event.is_empty() {
                "message".into()
            } else {
                event
            },
            data:  std::mem::take(&mut self.data).join("\n"),
        })
    }
}

#[derive(Deserialize, Debug)]
struct PutEvent {
    path: String,
    data: Devices,
}

/// Maps a stream event to a batch of thermostats, `None` for events that
/// carry no device data.
pub fn interpret(event: &ServerEvent) -> Result<Option<Vec<Thermostat>>> {
    match event.event.as_str() {
        "put" => {
            let put: PutEvent =
                serde_json::from_str(&event.data).context("Malformed put event from Nest")?;
            trace!("Nest put at '{}'", put.path);
            Ok(Some(put.data.into_thermostats()))
        }
        "keep-alive" => Ok(None),
        "auth_revoked" => bail!("Nest authorization was revoked"),
        "error" => bail!("Nest stream reported an error: {}", event.data),
        other => {
            debug!("Ignoring Nest stream event '{}'", other);
            Ok(None)
        }
    }
}

/// Live subscription to the Nest `devices` tree.
pub struct DeviceStream {
    response: reqwest::Response,
    decoder:  EventStreamDecoder,
    pending:  VecDeque<ServerEvent>,
}

impl DeviceStream {
    pub fn new(response: reqwest::Response) -> Self {
        DeviceStream {
            response,
            decoder: Default::default(),
            pending: Default::default(),
        }
    }
}

#[async_trait]
impl DeviceFeed for DeviceStream {
    async fn next_batch(&mut self) -> Result<Vec<Thermostat>> {
        loop {
            while let Some(event) = self.pending.pop_front() {
                if let Some(batch) = interpret(&event)? {
                    return Ok(batch);
                }
            }
            let chunk = self
                .response
                .chunk()
                .await
                .context("Failed reading the Nest stream")?
                .ok_or_else(|| anyhow!("Nest stream closed"))?;
            self.pending.extend(self.decoder.feed(&chunk));
        }
    }
}
