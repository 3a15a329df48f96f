use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::Error;

/// RADIUS Packet Type Codes
///
/// [RFC2865]: https://tools.ietf.org/html/rfc2865
/// [RFC2866]: https://tools.ietf.org/html/rfc2866
/// [RFC5176]: https://tools.ietf.org/html/rfc5176
///
/// The Code field is one octet, and identifies the type of RADIUS
/// packet.  When a packet is received with an invalid Code field, it
/// is silently discarded.
///
/// RADIUS Codes (decimal) are assigned as follows:
///
/// 1   Access-Request
/// 2   Access-Accept
/// 3   Access-Reject
/// 4   Accounting-Request
/// 5   Accounting-Response
/// 11  Access-Challenge
/// 12  Status-Server (experimental)
/// 13  Status-Client (experimental)
///
/// The Disconnect and Change-of-Authorization codes (40-45) come from
/// the dynamic authorization extensions in [RFC5176].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
pub enum Code {
    AccessRequest = 1,
    AccessAccept = 2,
    AccessReject = 3,
    AccountingRequest = 4,
    AccountingResponse = 5,
    AccessChallenge = 11,
    StatusServer = 12,
    StatusClient = 13,
    DisconnectRequest = 40,
    DisconnectAck = 41,
    DisconnectNak = 42,
    CoaRequest = 43,
    CoaAck = 44,
    CoaNak = 45,
}

impl Code {
    /// canonical name of the code.
    ///
    /// # Test
    ///
    /// ```
    /// use radius_server_codec::code::Code;
    ///
    /// assert_eq!(Code::AccessRequest.name(), "Access-Request");
    /// assert_eq!(Code::AccountingResponse.name(), "Accounting-Response");
    /// assert_eq!(Code::CoaNak.name(), "CoA-NAK");
    /// ```
    pub const fn name(self) -> &'static str {
        match self {
            Self::AccessRequest => "Access-Request",
            Self::AccessAccept => "Access-Accept",
            Self::AccessReject => "Access-Reject",
            Self::AccountingRequest => "Accounting-Request",
            Self::AccountingResponse => "Accounting-Response",
            Self::AccessChallenge => "Access-Challenge",
            Self::StatusServer => "Status-Server",
            Self::StatusClient => "Status-Client",
            Self::DisconnectRequest => "Disconnect-Request",
            Self::DisconnectAck => "Disconnect-ACK",
            Self::DisconnectNak => "Disconnect-NAK",
            Self::CoaRequest => "CoA-Request",
            Self::CoaAck => "CoA-ACK",
            Self::CoaNak => "CoA-NAK",
        }
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Code {
    type Err = Error;

    /// Names are matched case-insensitively, with `-` and `_` treated as
    /// the same separator.
    ///
    /// # Test
    ///
    /// ```
    /// use radius_server_codec::code::Code;
    ///
    /// assert_eq!("Access-Request".parse::<Code>().unwrap(), Code::AccessRequest);
    /// assert_eq!("access_request".parse::<Code>().unwrap(), Code::AccessRequest);
    /// assert_eq!("ACCESS-ACCEPT".parse::<Code>().unwrap(), Code::AccessAccept);
    /// assert_eq!("coa-nak".parse::<Code>().unwrap(), Code::CoaNak);
    /// assert!("Access-Granted".parse::<Code>().is_err());
    /// ```
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(
            match value.to_ascii_lowercase().replace('_', "-").as_str() {
                "access-request" => Self::AccessRequest,
                "access-accept" => Self::AccessAccept,
                "access-reject" => Self::AccessReject,
                "accounting-request" => Self::AccountingRequest,
                "accounting-response" => Self::AccountingResponse,
                "access-challenge" => Self::AccessChallenge,
                "status-server" => Self::StatusServer,
                "status-client" => Self::StatusClient,
                "disconnect-request" => Self::DisconnectRequest,
                "disconnect-ack" => Self::DisconnectAck,
                "disconnect-nak" => Self::DisconnectNak,
                "coa-request" => Self::CoaRequest,
                "coa-ack" => Self::CoaAck,
                "coa-nak" => Self::CoaNak,
                _ => return Err(Error::UnknownCode),
            },
        )
    }
}
