use engine_logging::{engine_trace, engine_warn};

use crate::StreamEvent;

/// Lines naming the event type; the payload already carries its own discriminant.
pub const EVENT_PREFIX: &str = "event:";
/// Lines carrying a JSON payload.
pub const DATA_PREFIX: &str = "data:";

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed event payload: {source}")]
    Payload {
        payload: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Decode one framed line into an event.
///
/// Never fails: a rejected payload is logged and yields `None` so one corrupt
/// line cannot abort an otherwise healthy stream.
pub fn decode_line(line: &str) -> Option<StreamEvent> {
    match try_decode_line(line) {
        Ok(event) => event,
        Err(DecodeError::Payload { payload, source }) => {
            engine_warn!(
                "Dropping event line ({} bytes): {} payload={}",
                payload.len(),
                source,
                truncate_for_log(&payload)
            );
            None
        }
    }
}

/// Like [`decode_line`] but reports payloads that could not be parsed.
pub fn try_decode_line(line: &str) -> Result<Option<StreamEvent>, DecodeError> {
    if line.starts_with(EVENT_PREFIX) {
        engine_trace!("Skipping event name line: {}", line.trim_end());
        return Ok(None);
    }

    let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(None);
    };
    let payload = rest.trim();
    if payload.is_empty() {
        return Ok(None);
    }

    serde_json::from_str::<StreamEvent>(payload)
        .map(Some)
        .map_err(|source| DecodeError::Payload {
            payload: payload.to_string(),
            source,
        })
}

fn truncate_for_log(payload: &str) -> &str {
    const MAX: usize = 120;
    if payload.len() <= MAX {
        return payload;
    }
    let mut end = MAX;
    while !payload.is_char_boundary(end) {
        end -= 1;
    }
    &payload[..end]
}
