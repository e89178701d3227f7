//! Page cursor codec.
//!
//! A cursor is a stack of [`PageFrame`]s serialized into an opaque token that
//! the host echoes back verbatim on the next call. The top frame always names
//! the resource type currently being enumerated; popping it moves on to the
//! next sibling collection.
//!
//! # Addressing modes
//!
//! - **Offset**: the frame token is a decimal offset. A page is the last one
//!   when it returned fewer records than requested ([`is_last_page`]).
//! - **Cursor relay**: the frame token is a cursor issued by the remote API.
//!   The last page is the one whose continuation cursor is empty.
//!
//! # Token format
//!
//! URL-safe base64 (no padding) of the canonical JSON of the stack. The empty
//! stack encodes to `""`, and `""` decodes to the empty stack. Anything else
//! that fails to decode is [`CursorError::Malformed`]; it is never treated as
//! "start over".

use crate::error::{CursorError, CursorResult};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};

/// One level of pagination state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFrame {
    pub resource_type_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token: String,
}

impl PageFrame {
    /// A fresh frame for `resource_type_id` with no progress yet.
    pub fn new(resource_type_id: impl Into<String>) -> Self {
        Self {
            resource_type_id: resource_type_id.into(),
            resource_id: String::new(),
            token: String::new(),
        }
    }

    #[must_use]
    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = resource_id.into();
        self
    }
}

/// Stack of page frames. The current frame is held apart from the frames
/// beneath it so an empty stack is unambiguous.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorStack {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    states: Vec<PageFrame>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current: Option<PageFrame>,
}

impl CursorStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a host-supplied token.
    pub fn decode(token: &str) -> CursorResult<Self> {
        if token.is_empty() {
            return Ok(Self::default());
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| CursorError::Malformed(format!("not base64: {e}")))?;
        let stack: Self = serde_json::from_slice(&bytes)
            .map_err(|e| CursorError::Malformed(format!("invalid structure: {e}")))?;

        if stack.current.is_none() && !stack.states.is_empty() {
            return Err(CursorError::Malformed(
                "frames present without a current frame".to_string(),
            ));
        }

        Ok(stack)
    }

    /// Encodes the stack; an empty stack encodes to `""`.
    pub fn encode(&self) -> CursorResult<String> {
        if self.current.is_none() {
            return Ok(String::new());
        }
        let json = serde_json::to_vec(self)?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Makes `frame` the current frame.
    pub fn push(&mut self, frame: PageFrame) {
        if let Some(current) = self.current.take() {
            self.states.push(current);
        }
        self.current = Some(frame);
    }

    /// Removes and returns the current frame; the one beneath becomes current.
    pub fn pop(&mut self) -> Option<PageFrame> {
        let popped = self.current.take();
        self.current = self.states.pop();
        popped
    }

    #[must_use]
    pub fn current(&self) -> Option<&PageFrame> {
        self.current.as_ref()
    }

    /// Resource type id of the current frame.
    #[must_use]
    pub fn resource_type_id(&self) -> Option<&str> {
        self.current.as_ref().map(|f| f.resource_type_id.as_str())
    }

    /// Token of the current frame, `""` when the stack is empty.
    #[must_use]
    pub fn token(&self) -> &str {
        self.current.as_ref().map_or("", |f| f.token.as_str())
    }

    /// Stores `next_token` in the current frame, or pops it when `next_token`
    /// is empty ("no more pages at this level").
    pub fn advance(&mut self, next_token: impl Into<String>) -> CursorResult<()> {
        let next_token = next_token.into();
        let current = self.current.as_mut().ok_or(CursorError::NoActiveFrame)?;
        if next_token.is_empty() {
            self.pop();
        } else {
            current.token = next_token;
        }
        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    /// Number of frames, including the current one.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.states.len() + usize::from(self.current.is_some())
    }
}

/// `true` when a page with `count` records out of `page_size` requested is the
/// final one.
#[must_use]
pub fn is_last_page(count: usize, page_size: usize) -> bool {
    count < page_size
}

/// Decodes an offset-mode cursor, starting a frame for `default_type` when the
/// token is empty. Returns the stack and the offset to fetch.
pub fn offset_cursor(token: &str, default_type: &str) -> CursorResult<(CursorStack, u64)> {
    let mut stack = CursorStack::decode(token)?;
    if stack.is_empty() {
        stack.push(PageFrame::new(default_type));
    }

    let offset = match stack.token() {
        "" => 0,
        raw => raw
            .parse::<u64>()
            .map_err(|_| CursorError::Malformed(format!("offset '{raw}' is not a number")))?,
    };

    Ok((stack, offset))
}

/// Produces the token following an offset-mode page that started at `offset`
/// and returned `count` of `page_size` records.
pub fn next_offset_cursor(
    mut stack: CursorStack,
    offset: u64,
    count: usize,
    page_size: usize,
) -> CursorResult<String> {
    if is_last_page(count, page_size) {
        stack.advance("")?;
    } else {
        let next = offset
            .checked_add(page_size as u64)
            .ok_or_else(|| CursorError::Malformed(format!("offset {offset} is out of range")))?;
        stack.advance(next.to_string())?;
    }
    stack.encode()
}

/// Decodes a cursor-relay cursor, starting a frame for `default_type` when the
/// token is empty. Returns the stack and the upstream cursor to send.
pub fn relay_cursor(token: &str, default_type: &str) -> CursorResult<(CursorStack, String)> {
    let mut stack = CursorStack::decode(token)?;
    if stack.is_empty() {
        stack.push(PageFrame::new(default_type));
    }
    let upstream = stack.token().to_string();
    Ok((stack, upstream))
}
