//! ## Remote Authentication Dial In User Service (RADIUS)
//!
//! [RFC2865]: https://tools.ietf.org/html/rfc2865
//! [RFC2866]: https://tools.ietf.org/html/rfc2866
//! [Section 3]: https://tools.ietf.org/html/rfc2865#section-3
//!
//! RADIUS is a protocol for carrying authentication, authorization, and
//! configuration information between a Network Access Server which
//! desires to authenticate its links and a shared Authentication Server.
//! A Network Access Server operates as a client of RADIUS: it passes
//! user information to designated RADIUS servers and then acts on the
//! response that is returned.  Transactions between the client and the
//! server are authenticated through the use of a shared secret, which
//! is never sent over the network, and user passwords are sent
//! obfuscated between the two.  The packet layout common to every
//! exchange is described in [Section 3]; accounting reuses the same
//! layout over a separate port as described in [RFC2866].

pub mod attribute;
pub mod code;
pub mod crypto;
pub mod dictionary;
pub mod packet;
pub mod value;

pub use self::{
    attribute::{Attribute, AttributeList},
    code::Code,
    dictionary::{Dictionary, DictionaryEntry, Vendor},
    packet::Packet,
    value::{AttributeKind, AttributeValue, IntoAttributeValue},
};

use std::{array::TryFromSliceError, str::Utf8Error};

#[derive(Debug)]
pub enum Error {
    InvalidInput,
    UnknownCode,
    AttributeOutOfRange(u32),
    UnknownAttribute(String),
    ValueOutOfRange,
    InvalidValueLength,
    InvalidAddress,
    KindMismatch,
    AttributeTooLong,
    PacketTooLarge,
    Frozen,
    InvalidPasswordLength,
    UnsupportedEncryption(u8),
    Utf8Error(Utf8Error),
    TryFromSliceError(TryFromSliceError),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl From<Utf8Error> for Error {
    fn from(value: Utf8Error) -> Self {
        Self::Utf8Error(value)
    }
}

impl From<TryFromSliceError> for Error {
    fn from(value: TryFromSliceError) -> Self {
        Self::TryFromSliceError(value)
    }
}
