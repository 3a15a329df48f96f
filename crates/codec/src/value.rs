use std::net::Ipv4Addr;

use bytes::BufMut;

use crate::Error;

/// The codec class of an attribute value.
///
/// [RFC2865]: https://tools.ietf.org/html/rfc2865
/// [Section 5]: https://tools.ietf.org/html/rfc2865#section-5
///
/// The Value field is zero or more octets and contains information
/// specific to the Attribute.  The format and length of the Value
/// field is determined by the Type and Length fields.  The format of
/// the value field is one of five data types described in [Section 5];
/// dictionaries additionally distinguish fixed-width sub-ranges of the
/// integer layout, which is why more than five kinds exist here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    Octets,
    String,
    Byte,
    Short,
    Integer,
    Ipv4,
    Date,
    Vsa,
}

impl AttributeKind {
    /// Map a dictionary type tag onto a codec kind.
    ///
    /// Width suffixes (`octets[24]`) are accepted and ignored, and tags
    /// this engine does not implement (`uint64`, `ipv6addr`, `tlv`,
    /// `struct`, `ether`, ...) fall back to raw octets so that foreign
    /// dictionaries still load.
    ///
    /// # Test
    ///
    /// ```
    /// use radius_server_codec::value::AttributeKind;
    ///
    /// assert_eq!(AttributeKind::from_tag("string"), AttributeKind::String);
    /// assert_eq!(AttributeKind::from_tag("octets"), AttributeKind::Octets);
    /// assert_eq!(AttributeKind::from_tag("octets[24]"), AttributeKind::Octets);
    /// assert_eq!(AttributeKind::from_tag("byte"), AttributeKind::Byte);
    /// assert_eq!(AttributeKind::from_tag("uint8"), AttributeKind::Byte);
    /// assert_eq!(AttributeKind::from_tag("short"), AttributeKind::Short);
    /// assert_eq!(AttributeKind::from_tag("uint16"), AttributeKind::Short);
    /// assert_eq!(AttributeKind::from_tag("integer"), AttributeKind::Integer);
    /// assert_eq!(AttributeKind::from_tag("signed"), AttributeKind::Integer);
    /// assert_eq!(AttributeKind::from_tag("ipaddr"), AttributeKind::Ipv4);
    /// assert_eq!(AttributeKind::from_tag("date"), AttributeKind::Date);
    /// assert_eq!(AttributeKind::from_tag("vsa"), AttributeKind::Vsa);
    /// assert_eq!(AttributeKind::from_tag("ipv6addr"), AttributeKind::Octets);
    /// assert_eq!(AttributeKind::from_tag("tlv"), AttributeKind::Octets);
    /// ```
    pub fn from_tag(tag: &str) -> Self {
        match tag.split('[').next().unwrap_or(tag) {
            "string" => Self::String,
            "octets" => Self::Octets,
            "uint8" | "byte" => Self::Byte,
            "uint16" | "short" => Self::Short,
            "integer" | "signed" => Self::Integer,
            "ipaddr" => Self::Ipv4,
            "date" => Self::Date,
            "vsa" => Self::Vsa,
            _ => Self::Octets,
        }
    }

    /// smallest legal wire size for the kind.
    pub const fn minimum_length(self) -> usize {
        match self {
            Self::Octets | Self::String | Self::Byte => 1,
            Self::Short => 2,
            Self::Integer | Self::Ipv4 | Self::Date => 4,
            Self::Vsa => 5,
        }
    }

    /// largest legal wire size for the kind.
    pub const fn maximum_length(self) -> usize {
        match self {
            Self::Octets | Self::String | Self::Vsa => 253,
            Self::Byte => 1,
            Self::Short => 2,
            Self::Integer | Self::Ipv4 | Self::Date => 4,
        }
    }
}

/// A decoded attribute value.
///
/// Values are immutable once constructed; decoding always copies out of
/// the source buffer because callers reuse receive buffers between
/// datagrams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Octets(Vec<u8>),
    String(String),
    Byte(u8),
    Short(u16),
    Integer(u32),
    Ipv4(Ipv4Addr),
    Date(u32),
    Vsa(Vec<u8>),
}

impl AttributeValue {
    /// Decode a value of the given kind from its wire layout.
    ///
    /// Numbers are big-endian over the fixed width of the kind; a buffer
    /// outside the kind's length bounds is rejected.
    ///
    /// # Test
    ///
    /// ```
    /// use radius_server_codec::value::{AttributeKind, AttributeValue};
    ///
    /// assert_eq!(
    ///     AttributeValue::decode(AttributeKind::String, b"alice").unwrap(),
    ///     AttributeValue::String("alice".to_string())
    /// );
    ///
    /// assert_eq!(
    ///     AttributeValue::decode(AttributeKind::Integer, &[0x00, 0x00, 0x00, 0x01]).unwrap(),
    ///     AttributeValue::Integer(1)
    /// );
    ///
    /// assert_eq!(
    ///     AttributeValue::decode(AttributeKind::Ipv4, &[0x0A, 0x00, 0x00, 0x01]).unwrap(),
    ///     AttributeValue::Ipv4("10.0.0.1".parse().unwrap())
    /// );
    ///
    /// assert!(AttributeValue::decode(AttributeKind::Integer, &[0x00, 0x00, 0x01]).is_err());
    /// assert!(AttributeValue::decode(AttributeKind::Byte, &[0x00, 0x01]).is_err());
    /// assert!(AttributeValue::decode(AttributeKind::Octets, &[]).is_err());
    /// ```
    pub fn decode(kind: AttributeKind, bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < kind.minimum_length() || bytes.len() > kind.maximum_length() {
            return Err(Error::InvalidValueLength);
        }

        Ok(match kind {
            AttributeKind::Octets => Self::Octets(bytes.to_vec()),
            AttributeKind::String => Self::String(std::str::from_utf8(bytes)?.to_string()),
            AttributeKind::Byte => Self::Byte(bytes[0]),
            AttributeKind::Short => Self::Short(u16::from_be_bytes(bytes.try_into()?)),
            AttributeKind::Integer => Self::Integer(u32::from_be_bytes(bytes.try_into()?)),
            AttributeKind::Ipv4 => Self::Ipv4(Ipv4Addr::from(<[u8; 4]>::try_from(bytes)?)),
            AttributeKind::Date => Self::Date(u32::from_be_bytes(bytes.try_into()?)),
            AttributeKind::Vsa => Self::Vsa(bytes.to_vec()),
        })
    }

    /// write the wire layout of the value to the buffer.
    pub fn put<B: BufMut>(&self, bytes: &mut B) {
        match self {
            Self::Octets(it) | Self::Vsa(it) => bytes.put(it.as_slice()),
            Self::String(it) => bytes.put(it.as_bytes()),
            Self::Byte(it) => bytes.put_u8(*it),
            Self::Short(it) => bytes.put_u16(*it),
            Self::Integer(it) | Self::Date(it) => bytes.put_u32(*it),
            Self::Ipv4(it) => bytes.put(it.octets().as_slice()),
        }
    }

    /// encoded size in bytes.
    pub fn len(&self) -> usize {
        match self {
            Self::Octets(it) | Self::Vsa(it) => it.len(),
            Self::String(it) => it.len(),
            Self::Byte(_) => 1,
            Self::Short(_) => 2,
            Self::Integer(_) | Self::Date(_) | Self::Ipv4(_) => 4,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> AttributeKind {
        match self {
            Self::Octets(_) => AttributeKind::Octets,
            Self::String(_) => AttributeKind::String,
            Self::Byte(_) => AttributeKind::Byte,
            Self::Short(_) => AttributeKind::Short,
            Self::Integer(_) => AttributeKind::Integer,
            Self::Ipv4(_) => AttributeKind::Ipv4,
            Self::Date(_) => AttributeKind::Date,
            Self::Vsa(_) => AttributeKind::Vsa,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(it) => Some(it),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::Byte(it) => Some(u32::from(*it)),
            Self::Short(it) => Some(u32::from(*it)),
            Self::Integer(it) | Self::Date(it) => Some(*it),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Octets(it) | Self::Vsa(it) => Some(it),
            _ => None,
        }
    }

    pub fn as_ipv4(&self) -> Option<Ipv4Addr> {
        match self {
            Self::Ipv4(it) => Some(*it),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttributeValue {
    /// # Test
    ///
    /// ```
    /// use radius_server_codec::value::AttributeValue;
    ///
    /// assert_eq!(AttributeValue::String("alice".to_string()).to_string(), "alice");
    /// assert_eq!(AttributeValue::Integer(604800).to_string(), "604800");
    /// assert_eq!(AttributeValue::Ipv4("10.0.0.1".parse().unwrap()).to_string(), "10.0.0.1");
    /// assert_eq!(AttributeValue::Octets(vec![0xDE, 0xAD]).to_string(), "0xdead");
    /// ```
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(it) => f.write_str(it),
            Self::Byte(it) => write!(f, "{}", it),
            Self::Short(it) => write!(f, "{}", it),
            Self::Integer(it) | Self::Date(it) => write!(f, "{}", it),
            Self::Ipv4(it) => write!(f, "{}", it),
            Self::Octets(it) | Self::Vsa(it) => {
                f.write_str("0x")?;
                for byte in it {
                    write!(f, "{:02x}", byte)?;
                }

                Ok(())
            }
        }
    }
}

/// Conversion of a native value into a typed attribute value under a
/// dictionary-chosen kind.
///
/// Buffers go through [`AttributeValue::decode`], everything else
/// through the kind-specific conversions below; a native shape that
/// cannot represent the kind fails with [`Error::KindMismatch`].
pub trait IntoAttributeValue {
    fn into_value(self, kind: AttributeKind) -> Result<AttributeValue, Error>;
}

impl IntoAttributeValue for &str {
    fn into_value(self, kind: AttributeKind) -> Result<AttributeValue, Error> {
        match kind {
            AttributeKind::String => {
                if self.len() < kind.minimum_length() || self.len() > kind.maximum_length() {
                    return Err(Error::InvalidValueLength);
                }

                Ok(AttributeValue::String(self.to_string()))
            }
            AttributeKind::Ipv4 => Ok(AttributeValue::Ipv4(parse_dotted_quad(self)?)),
            AttributeKind::Octets | AttributeKind::Vsa => {
                AttributeValue::decode(kind, self.as_bytes())
            }
            _ => Err(Error::KindMismatch),
        }
    }
}

impl IntoAttributeValue for String {
    fn into_value(self, kind: AttributeKind) -> Result<AttributeValue, Error> {
        self.as_str().into_value(kind)
    }
}

impl IntoAttributeValue for u32 {
    fn into_value(self, kind: AttributeKind) -> Result<AttributeValue, Error> {
        match kind {
            AttributeKind::Byte => u8::try_from(self)
                .map(AttributeValue::Byte)
                .map_err(|_| Error::ValueOutOfRange),
            AttributeKind::Short => u16::try_from(self)
                .map(AttributeValue::Short)
                .map_err(|_| Error::ValueOutOfRange),
            AttributeKind::Integer => Ok(AttributeValue::Integer(self)),
            AttributeKind::Date => Ok(AttributeValue::Date(self)),
            _ => Err(Error::KindMismatch),
        }
    }
}

impl IntoAttributeValue for &[u8] {
    fn into_value(self, kind: AttributeKind) -> Result<AttributeValue, Error> {
        AttributeValue::decode(kind, self)
    }
}

impl IntoAttributeValue for Vec<u8> {
    fn into_value(self, kind: AttributeKind) -> Result<AttributeValue, Error> {
        AttributeValue::decode(kind, &self)
    }
}

impl IntoAttributeValue for Ipv4Addr {
    fn into_value(self, kind: AttributeKind) -> Result<AttributeValue, Error> {
        match kind {
            AttributeKind::Ipv4 => Ok(AttributeValue::Ipv4(self)),
            _ => Err(Error::KindMismatch),
        }
    }
}

impl IntoAttributeValue for AttributeValue {
    fn into_value(self, kind: AttributeKind) -> Result<AttributeValue, Error> {
        if self.kind() != kind {
            return Err(Error::KindMismatch);
        }

        Ok(self)
    }
}

/// Parse a dotted quad address.
///
/// Exactly four `.`-separated decimal octets are required; empty
/// segments, values over 255 and non-digit characters are rejected.
///
/// # Test
///
/// ```
/// use std::net::Ipv4Addr;
/// use radius_server_codec::value::parse_dotted_quad;
///
/// assert_eq!(parse_dotted_quad("10.0.0.1").unwrap(), Ipv4Addr::new(10, 0, 0, 1));
/// assert_eq!(parse_dotted_quad("255.255.255.255").unwrap(), Ipv4Addr::BROADCAST);
/// assert!(parse_dotted_quad("10.0.0").is_err());
/// assert!(parse_dotted_quad("10.0.0.0.1").is_err());
/// assert!(parse_dotted_quad("10..0.1").is_err());
/// assert!(parse_dotted_quad("10.0.0.256").is_err());
/// assert!(parse_dotted_quad("10.0.0.a").is_err());
/// ```
pub fn parse_dotted_quad(value: &str) -> Result<Ipv4Addr, Error> {
    let mut octets = [0u8; 4];
    let mut parts = value.split('.');

    for slot in octets.iter_mut() {
        let part = parts.next().ok_or(Error::InvalidAddress)?;
        if part.is_empty() || !part.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(Error::InvalidAddress);
        }

        *slot = part.parse().map_err(|_| Error::InvalidAddress)?;
    }

    if parts.next().is_some() {
        return Err(Error::InvalidAddress);
    }

    Ok(Ipv4Addr::from(octets))
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::{AttributeKind, AttributeValue, IntoAttributeValue};

    #[test]
    fn test_integer_round_trip() {
        for number in [0u32, 1, 255, 256, 65535, 65536, u32::MAX] {
            let value = number.into_value(AttributeKind::Integer).unwrap();

            let mut bytes = BytesMut::new();
            value.put(&mut bytes);

            assert_eq!(&bytes[..], number.to_be_bytes());
            assert_eq!(AttributeValue::decode(AttributeKind::Integer, &bytes).unwrap(), value);
        }
    }

    #[test]
    fn test_numeric_width_bounds() {
        assert!(AttributeValue::decode(AttributeKind::Short, &[0x01]).is_err());
        assert!(AttributeValue::decode(AttributeKind::Short, &[0x01, 0x02, 0x03]).is_err());
        assert!(AttributeValue::decode(AttributeKind::Integer, &[0x01, 0x02, 0x03]).is_err());
        assert!(AttributeValue::decode(AttributeKind::Integer, &[0x01, 0x02, 0x03, 0x04, 0x05]).is_err());
        assert!(AttributeValue::decode(AttributeKind::Date, &[0x01, 0x02, 0x03]).is_err());
        assert!(AttributeValue::decode(AttributeKind::Ipv4, &[0x0A, 0x00, 0x00]).is_err());
    }

    #[test]
    fn test_numeric_range_checks() {
        assert!(255u32.into_value(AttributeKind::Byte).is_ok());
        assert!(256u32.into_value(AttributeKind::Byte).is_err());
        assert!(65535u32.into_value(AttributeKind::Short).is_ok());
        assert!(65536u32.into_value(AttributeKind::Short).is_err());
    }

    #[test]
    fn test_string_bounds() {
        assert!("".into_value(AttributeKind::String).is_err());
        assert!("a".repeat(253).as_str().into_value(AttributeKind::String).is_ok());
        assert!("a".repeat(254).as_str().into_value(AttributeKind::String).is_err());

        let snowman = "snowman \u{2603}";
        let value = snowman.into_value(AttributeKind::String).unwrap();

        let mut bytes = BytesMut::new();
        value.put(&mut bytes);

        assert_eq!(
            AttributeValue::decode(AttributeKind::String, &bytes).unwrap().to_string(),
            snowman
        );
    }

    #[test]
    fn test_octets_copy_input() {
        let mut source = vec![0x01u8, 0x02, 0x03];
        let value = AttributeValue::decode(AttributeKind::Octets, &source).unwrap();

        source[0] = 0xFF;
        assert_eq!(value.as_bytes().unwrap(), &[0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_kind_mismatch() {
        assert!("alice".into_value(AttributeKind::Integer).is_err());
        assert!(1u32.into_value(AttributeKind::String).is_err());
        assert!(AttributeValue::Integer(1).into_value(AttributeKind::Short).is_err());
    }
}
