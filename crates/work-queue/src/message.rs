//! # Typed Messages
//!
//! This module defines the envelopes that travel through the [`WorkQueue`](crate::WorkQueue).
//!
//! A [`Request`] goes out to a worker thread carrying a payload of type `Q`; a [`Response`]
//! comes back carrying a payload of type `R`. Both share a [`RequestHeader`] so the
//! response side always knows which request, channel and request type it belongs to.
//!
//! Payloads are plain generic parameters rather than boxed `Any` values, so a handler
//! can never receive a payload it does not know how to read.

/// Identifier of a logical channel inside a work queue.
pub type ChannelId = u16;

/// Identifier assigned to every submitted request. Never zero.
pub type RequestId = u64;

/// Highest channel id available to host applications.
///
/// Channels above this value are reserved for engine subsystems.
pub const MAX_USER_CHANNEL: ChannelId = 0x4000;

/// Routing information shared by a request and its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    pub id: RequestId,
    pub channel: ChannelId,
    pub request_type: u16,
}

/// A unit of work submitted to the queue.
#[derive(Debug)]
pub struct Request<Q> {
    pub header: RequestHeader,
    pub data: Q,
}

impl<Q> Request<Q> {
    pub fn id(&self) -> RequestId {
        self.header.id
    }
}

/// The outcome of a [`Request`], delivered back on the pump thread.
///
/// A failed response still carries a payload, so the response handler can
/// inspect whatever state the worker managed to produce.
#[derive(Debug)]
pub struct Response<R> {
    pub header: RequestHeader,
    pub success: bool,
    pub messages: String,
    pub data: R,
}

impl<R> Response<R> {
    /// Builds a successful response.
    pub fn success(header: RequestHeader, data: R) -> Self {
        Self {
            header,
            success: true,
            messages: String::new(),
            data,
        }
    }

    /// Builds a failed response with a human-readable description.
    pub fn failure(header: RequestHeader, data: R, messages: impl Into<String>) -> Self {
        Self {
            header,
            success: false,
            messages: messages.into(),
            data,
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.header.id
    }

    pub fn succeeded(&self) -> bool {
        self.success
    }
}
