use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    Error,
    attribute::{Attribute, AttributeList},
    code::Code,
    crypto,
    dictionary::{AttributeQuery, Dictionary, DictionaryEntry},
    value::IntoAttributeValue,
};

/// Largest datagram the codec will produce or accept.
pub const MAX_PACKET_SIZE: usize = 4096;

/// A RADIUS packet.
///
/// [RFC2865]: https://tools.ietf.org/html/rfc2865
/// [Section 3]: https://tools.ietf.org/html/rfc2865#section-3
///
/// The packet layout of [Section 3]:
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     Code      |  Identifier   |            Length             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// |                         Authenticator                         |
/// |                                                               |
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Attributes ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-
/// ```
///
/// Packets built for outbound use are mutable until sent; packets
/// produced by wire decode are frozen and reject mutation of the code,
/// identifier, authenticator and attribute list.
#[derive(Debug, Clone)]
pub struct Packet {
    code: Code,
    identifier: u8,
    authenticator: [u8; 16],
    attributes: AttributeList,
    frozen: bool,
}

impl Packet {
    /// a mutable packet with an explicit authenticator.
    pub fn new(code: Code, identifier: u8, authenticator: [u8; 16]) -> Self {
        Self {
            code,
            identifier,
            authenticator,
            attributes: AttributeList::new(),
            frozen: false,
        }
    }

    /// a mutable packet with a freshly generated random authenticator,
    /// as used for new requests.
    pub fn request(code: Code, identifier: u8) -> Self {
        Self::new(code, identifier, crypto::random_authenticator())
    }

    /// a mutable packet rebuilt from any attribute iterable.
    pub fn with_attributes<A>(code: Code, identifier: u8, authenticator: [u8; 16], attributes: A) -> Self
    where
        A: IntoIterator<Item = Attribute>,
    {
        Self {
            code,
            identifier,
            authenticator,
            attributes: attributes.into_iter().collect(),
            frozen: false,
        }
    }

    /// a mutable response template carrying this packet's identifier
    /// and authenticator.
    pub fn respond(&self, code: Code) -> Self {
        Self::new(code, self.identifier, self.authenticator)
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn identifier(&self) -> u8 {
        self.identifier
    }

    pub fn authenticator(&self) -> &[u8; 16] {
        &self.authenticator
    }

    pub fn attributes(&self) -> &AttributeList {
        &self.attributes
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn set_code(&mut self, code: Code) -> Result<(), Error> {
        if self.frozen {
            return Err(Error::Frozen);
        }

        self.code = code;
        Ok(())
    }

    pub fn set_identifier(&mut self, identifier: u8) -> Result<(), Error> {
        if self.frozen {
            return Err(Error::Frozen);
        }

        self.identifier = identifier;
        Ok(())
    }

    /// The authenticator is copied in; later mutation of the caller's
    /// array does not reach the packet.
    pub fn set_authenticator(&mut self, authenticator: [u8; 16]) -> Result<(), Error> {
        if self.frozen {
            return Err(Error::Frozen);
        }

        self.authenticator = authenticator;
        Ok(())
    }

    /// Resolve a descriptor through the registry and append the value
    /// as an attribute.
    pub fn add<'a, Q, V>(&mut self, dictionary: &Dictionary, query: Q, value: V) -> Result<(), Error>
    where
        Q: Into<AttributeQuery<'a>>,
        V: IntoAttributeValue,
    {
        let entry = dictionary.get(query)?;
        self.add_attribute(Attribute::new(entry, value)?)
    }

    pub fn add_attribute(&mut self, attribute: Attribute) -> Result<(), Error> {
        if self.frozen {
            return Err(Error::Frozen);
        }

        self.attributes.add(attribute)
    }

    pub fn has(&self, entry: &DictionaryEntry) -> bool {
        self.attributes.has(entry.key())
    }

    /// first attribute described by the entry.
    pub fn get(&self, entry: &DictionaryEntry) -> Option<&Attribute> {
        self.attributes.get(entry.key())
    }

    /// all attributes described by the entry, in insertion order.
    pub fn get_all(&self, entry: &DictionaryEntry) -> impl Iterator<Item = &Attribute> {
        self.attributes.get_all(entry.key())
    }

    /// Encode the packet.
    ///
    /// For a response the authenticator field carries the request
    /// authenticator while the attribute stream is written (the
    /// User-Password transform depends on it), and is then overwritten
    /// with the response authenticator digest.
    ///
    /// # Test
    ///
    /// ```
    /// use radius_server_codec::code::Code;
    /// use radius_server_codec::dictionary::Dictionary;
    /// use radius_server_codec::packet::Packet;
    ///
    /// let dictionary = Dictionary::standard().unwrap();
    ///
    /// let mut packet = Packet::new(Code::AccessRequest, 42, [0u8; 16]);
    /// packet.add(&dictionary, "User-Name", "alice").unwrap();
    ///
    /// let bytes = packet.encode(b"secret", false).unwrap();
    ///
    /// assert_eq!(&bytes[..4], &[0x01, 0x2a, 0x00, 0x1b]);
    /// assert_eq!(&bytes[4..20], &[0u8; 16]);
    /// assert_eq!(&bytes[20..], &[0x01, 0x07, 0x61, 0x6c, 0x69, 0x63, 0x65]);
    /// ```
    pub fn encode(&self, secret: &[u8], is_response: bool) -> Result<Bytes, Error> {
        let mut bytes = BytesMut::with_capacity(MAX_PACKET_SIZE);

        bytes.put_u8(self.code.into());
        bytes.put_u8(self.identifier);
        bytes.put_u16(0);
        bytes.put(self.authenticator.as_slice());

        self.attributes.put(&mut bytes, secret, &self.authenticator)?;
        if bytes.len() > MAX_PACKET_SIZE {
            return Err(Error::PacketTooLarge);
        }

        let length = (bytes.len() as u16).to_be_bytes();
        bytes[2] = length[0];
        bytes[3] = length[1];

        if is_response {
            let digest = crypto::md5(&[&bytes[..], secret]);
            bytes[4..20].copy_from_slice(&digest);
        }

        Ok(bytes.freeze())
    }

    /// Decode a datagram into a frozen packet.
    ///
    /// The request authenticator is not verified here: servers trust
    /// the transport boundary, and clients verify the response digest
    /// against their own pending request before decoding.
    pub fn decode(dictionary: &Dictionary, bytes: &[u8], secret: &[u8]) -> Result<Self, Error> {
        if bytes.len() < 20 {
            return Err(Error::InvalidInput);
        }

        let length = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
        if length < 20 || length > bytes.len() {
            return Err(Error::InvalidInput);
        }

        let code = Code::try_from(bytes[0]).map_err(|_| Error::UnknownCode)?;
        let identifier = bytes[1];

        let mut authenticator = [0u8; 16];
        authenticator.copy_from_slice(&bytes[4..20]);

        let attributes = AttributeList::decode(dictionary, &bytes[20..length], secret, &authenticator)?;

        Ok(Self {
            code,
            identifier,
            authenticator,
            attributes,
            frozen: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Packet;
    use crate::{Error, code::Code, dictionary::Dictionary};

    #[test]
    fn test_header_bounds() {
        let dictionary = Dictionary::standard().unwrap();

        assert!(Packet::decode(&dictionary, &[0x01; 19], b"secret").is_err());

        // declared length larger than the buffer
        let mut bytes = Packet::new(Code::AccessRequest, 1, [0u8; 16])
            .encode(b"secret", false)
            .unwrap()
            .to_vec();

        bytes[3] = 0xFF;
        assert!(Packet::decode(&dictionary, &bytes, b"secret").is_err());

        // declared length under the header size
        bytes[2] = 0x00;
        bytes[3] = 0x13;
        assert!(Packet::decode(&dictionary, &bytes, b"secret").is_err());
    }

    #[test]
    fn test_unknown_code_rejected() {
        let dictionary = Dictionary::standard().unwrap();
        let mut bytes = Packet::new(Code::AccessRequest, 1, [0u8; 16])
            .encode(b"secret", false)
            .unwrap()
            .to_vec();

        bytes[0] = 99;
        assert!(matches!(
            Packet::decode(&dictionary, &bytes, b"secret"),
            Err(Error::UnknownCode)
        ));
    }

    #[test]
    fn test_decoded_packet_is_frozen() {
        let dictionary = Dictionary::standard().unwrap();
        let bytes = Packet::new(Code::AccessRequest, 7, [0x55u8; 16])
            .encode(b"secret", false)
            .unwrap();

        let mut packet = Packet::decode(&dictionary, &bytes, b"secret").unwrap();

        assert!(packet.is_frozen());
        assert!(matches!(packet.set_code(Code::AccessAccept), Err(Error::Frozen)));
        assert!(matches!(packet.set_identifier(8), Err(Error::Frozen)));
        assert!(matches!(packet.set_authenticator([0u8; 16]), Err(Error::Frozen)));
        assert!(packet.add(&dictionary, "User-Name", "alice").is_err());
    }

    #[test]
    fn test_oversized_packet_rejected() {
        let dictionary = Dictionary::standard().unwrap();
        let mut packet = Packet::new(Code::AccessRequest, 1, [0u8; 16]);

        // 20 bytes of header plus 17 * 255-byte attributes always
        // crosses the 4096 byte ceiling
        for _ in 0..17 {
            packet.add(&dictionary, "Class", vec![0x41u8; 253]).unwrap();
        }

        assert!(matches!(packet.encode(b"secret", false), Err(Error::PacketTooLarge)));
    }

    #[test]
    fn test_respond_carries_request_identity() {
        let request = Packet::request(Code::AccessRequest, 13);
        let response = request.respond(Code::AccessReject);

        assert_eq!(response.identifier(), 13);
        assert_eq!(response.authenticator(), request.authenticator());
        assert!(!response.is_frozen());
    }
}
