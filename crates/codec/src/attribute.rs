use std::sync::Arc;

use bytes::BufMut;

use crate::{
    Error, crypto,
    dictionary::{AttributeKey, Dictionary, DictionaryEntry, VENDOR_SPECIFIC},
    value::{AttributeValue, IntoAttributeValue},
};

/// A descriptor and value pair, immutable once constructed.
#[derive(Debug, Clone)]
pub struct Attribute {
    entry: Arc<DictionaryEntry>,
    value: AttributeValue,
}

impl Attribute {
    /// Build an attribute from a native value; the value is coerced
    /// through the descriptor's real codec kind.
    ///
    /// # Test
    ///
    /// ```
    /// use radius_server_codec::attribute::Attribute;
    /// use radius_server_codec::dictionary::Dictionary;
    ///
    /// let dictionary = Dictionary::standard().unwrap();
    ///
    /// let attribute = Attribute::new(dictionary.get("User-Name").unwrap(), "alice").unwrap();
    /// assert_eq!(attribute.to_string(), "User-Name: alice");
    ///
    /// let attribute = Attribute::new(dictionary.get("Framed-Protocol").unwrap(), 1u32).unwrap();
    /// assert_eq!(attribute.to_string(), "Framed-Protocol: PPP (1)");
    ///
    /// let attribute = Attribute::new(dictionary.get("Framed-Protocol").unwrap(), 99u32).unwrap();
    /// assert_eq!(attribute.to_string(), "Framed-Protocol: 99");
    /// ```
    pub fn new<V: IntoAttributeValue>(entry: Arc<DictionaryEntry>, value: V) -> Result<Self, Error> {
        let value = value.into_value(entry.real_kind())?;
        Ok(Self { entry, value })
    }

    pub fn entry(&self) -> &Arc<DictionaryEntry> {
        &self.entry
    }

    pub fn name(&self) -> &str {
        self.entry.name()
    }

    pub fn key(&self) -> AttributeKey {
        self.entry.key()
    }

    pub fn value(&self) -> &AttributeValue {
        &self.value
    }

    /// Write the attribute in wire layout.
    ///
    /// Standard attributes frame as `id | length | data`; vendor
    /// specific attributes wrap the data in the vendor header using the
    /// vendor's declared field widths.  Entries flagged `encrypt=1` run
    /// the User-Password transform over the data first, which is why the
    /// shared secret and the request authenticator are needed here.
    ///
    /// # Test
    ///
    /// ```
    /// use bytes::BytesMut;
    /// use radius_server_codec::attribute::Attribute;
    /// use radius_server_codec::dictionary::Dictionary;
    ///
    /// let dictionary = Dictionary::standard().unwrap();
    /// let authenticator = [0u8; 16];
    ///
    /// let mut bytes = BytesMut::new();
    /// Attribute::new(dictionary.get("User-Name").unwrap(), "alice")
    ///     .unwrap()
    ///     .put(&mut bytes, b"secret", &authenticator)
    ///     .unwrap();
    ///
    /// assert_eq!(&bytes[..], &[0x01, 0x07, 0x61, 0x6c, 0x69, 0x63, 0x65]);
    ///
    /// let mut bytes = BytesMut::new();
    /// Attribute::new(dictionary.get("Framed-IP-Address").unwrap(), "10.0.0.1")
    ///     .unwrap()
    ///     .put(&mut bytes, b"secret", &authenticator)
    ///     .unwrap();
    ///
    /// assert_eq!(&bytes[..], &[0x08, 0x06, 0x0A, 0x00, 0x00, 0x01]);
    /// ```
    pub fn put<B: BufMut>(&self, bytes: &mut B, secret: &[u8], authenticator: &[u8; 16]) -> Result<(), Error> {
        let mut data = Vec::with_capacity(self.value.len());
        self.value.put(&mut data);

        match self.entry.encrypt() {
            None => {}
            Some(1) => data = crypto::encrypt_user_password(&data, secret, authenticator)?,
            Some(scheme) => return Err(Error::UnsupportedEncryption(scheme)),
        }

        match self.entry.vendor() {
            None => {
                let length = 2 + data.len();
                if length > u8::MAX as usize {
                    return Err(Error::AttributeTooLong);
                }

                bytes.put_u8(self.entry.id());
                bytes.put_u8(length as u8);
                bytes.put(data.as_slice());
            }
            Some(vendor) => {
                let length = 2 + 4 + vendor.type_size + vendor.length_size + data.len();
                if length > u8::MAX as usize {
                    return Err(Error::AttributeTooLong);
                }

                let sub_length = (vendor.type_size + vendor.length_size + data.len()).min(255);

                bytes.put_u8(VENDOR_SPECIFIC);
                bytes.put_u8(length as u8);
                bytes.put_u32(vendor.id);
                bytes.put_uint(u64::from(self.entry.sub_id().unwrap_or(0)), vendor.type_size);
                if vendor.length_size > 0 {
                    bytes.put_uint(sub_length as u64, vendor.length_size);
                }

                bytes.put(data.as_slice());
            }
        }

        Ok(())
    }

    /// Decode one attribute from its body (the bytes after the two
    /// header octets).
    ///
    /// For type code 26 the vendor header is unwrapped using the
    /// vendor's declared field widths; only the first sub-attribute is
    /// taken and any bytes past its declared length are ignored.
    ///
    /// # Test
    ///
    /// ```
    /// use radius_server_codec::attribute::Attribute;
    /// use radius_server_codec::dictionary::Dictionary;
    ///
    /// let dictionary = Dictionary::standard().unwrap();
    /// let authenticator = [0u8; 16];
    ///
    /// let attribute = Attribute::decode(
    ///     &dictionary,
    ///     26,
    ///     &[0x00, 0x00, 0x00, 0x09, 0x01, 0x06, 0x78, 0x79, 0x7A, 0x77],
    ///     b"secret",
    ///     &authenticator,
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(attribute.name(), "Cisco-AVPair");
    /// assert_eq!(attribute.value().as_str(), Some("xyzw"));
    /// ```
    pub fn decode(
        dictionary: &Dictionary,
        id: u8,
        body: &[u8],
        secret: &[u8],
        authenticator: &[u8; 16],
    ) -> Result<Self, Error> {
        let (entry, data) = if id == VENDOR_SPECIFIC {
            if body.len() < 4 {
                return Err(Error::InvalidInput);
            }

            let vendor_id = u32::from_be_bytes(body[..4].try_into()?);
            let vendor = dictionary.vendor(vendor_id);

            let header = 4 + vendor.type_size + vendor.length_size;
            if body.len() < header {
                return Err(Error::InvalidInput);
            }

            let sub_id = uint_be(&body[4..4 + vendor.type_size]) as u32;
            let data = if vendor.length_size > 0 {
                let sub_length = uint_be(&body[4 + vendor.type_size..header]) as usize;
                if sub_length < vendor.type_size + vendor.length_size {
                    return Err(Error::InvalidInput);
                }

                let length = sub_length - vendor.type_size - vendor.length_size;
                if header + length > body.len() {
                    return Err(Error::InvalidInput);
                }

                &body[header..header + length]
            } else {
                &body[header..]
            };

            (dictionary.vsa(vendor_id, sub_id), data)
        } else {
            (dictionary.get(u32::from(id))?, body)
        };

        let value = match entry.encrypt() {
            None => AttributeValue::decode(entry.real_kind(), data)?,
            Some(1) => {
                let plain = crypto::decrypt_user_password(data, secret, authenticator)?;
                AttributeValue::decode(entry.real_kind(), &plain)?
            }
            Some(scheme) => return Err(Error::UnsupportedEncryption(scheme)),
        };

        Ok(Self { entry, value })
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(number) = self.value.as_u32()
            && let Some(name) = self.entry.value_name(number)
        {
            return write!(f, "{}: {} ({})", self.entry.name(), name, number);
        }

        write!(f, "{}: {}", self.entry.name(), self.value)
    }
}

fn uint_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0, |acc, byte| (acc << 8) | u64::from(*byte))
}

/// An ordered attribute collection.
///
/// Insertion order is preserved end to end and is the wire order; no
/// deduplication happens.  Lists produced by wire decode are frozen and
/// reject mutation.
#[derive(Debug, Default, Clone)]
pub struct AttributeList {
    items: Vec<Attribute>,
    frozen: bool,
}

impl AttributeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, attribute: Attribute) -> Result<(), Error> {
        if self.frozen {
            return Err(Error::Frozen);
        }

        self.items.push(attribute);
        Ok(())
    }

    pub fn has(&self, key: AttributeKey) -> bool {
        self.get(key).is_some()
    }

    /// first attribute carrying the key, in insertion order.
    pub fn get(&self, key: AttributeKey) -> Option<&Attribute> {
        self.items.iter().find(|it| it.key() == key)
    }

    /// all attributes carrying the key, in insertion order.
    pub fn get_all(&self, key: AttributeKey) -> impl Iterator<Item = &Attribute> {
        self.items.iter().filter(move |it| it.key() == key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// serialize all attributes, in order.
    pub fn put<B: BufMut>(&self, bytes: &mut B, secret: &[u8], authenticator: &[u8; 16]) -> Result<(), Error> {
        for attribute in &self.items {
            attribute.put(bytes, secret, authenticator)?;
        }

        Ok(())
    }

    /// Parse an attribute stream until the buffer is exhausted,
    /// returning a frozen list.
    ///
    /// A trailing fragment shorter than an attribute header is
    /// discarded; an attribute whose declared length is under 2 or runs
    /// past the buffer fails the whole stream.
    pub fn decode(
        dictionary: &Dictionary,
        bytes: &[u8],
        secret: &[u8],
        authenticator: &[u8; 16],
    ) -> Result<Self, Error> {
        let mut items = Vec::new();
        let mut offset = 0;

        while bytes.len().saturating_sub(offset) >= 2 {
            let id = bytes[offset];
            let length = bytes[offset + 1] as usize;

            if length < 2 || offset + length > bytes.len() {
                return Err(Error::InvalidInput);
            }

            items.push(Attribute::decode(
                dictionary,
                id,
                &bytes[offset + 2..offset + length],
                secret,
                authenticator,
            )?);

            offset += length;
        }

        Ok(Self { items, frozen: true })
    }
}

impl<'a> IntoIterator for &'a AttributeList {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<Attribute> for AttributeList {
    fn from_iter<T: IntoIterator<Item = Attribute>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
            frozen: false,
        }
    }
}

impl From<Vec<Attribute>> for AttributeList {
    fn from(items: Vec<Attribute>) -> Self {
        Self { items, frozen: false }
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::{Attribute, AttributeList};
    use crate::{Error, dictionary::Dictionary};

    #[test]
    fn test_frozen_list_rejects_mutation() {
        let dictionary = Dictionary::standard().unwrap();
        let authenticator = [0u8; 16];

        let mut list = AttributeList::decode(&dictionary, &[], b"secret", &authenticator).unwrap();
        let attribute = Attribute::new(dictionary.get("User-Name").unwrap(), "alice").unwrap();

        assert!(list.is_frozen());
        assert!(matches!(list.add(attribute), Err(Error::Frozen)));
    }

    #[test]
    fn test_order_and_duplicates_preserved() {
        let dictionary = Dictionary::standard().unwrap();
        let authenticator = [0u8; 16];
        let proxy_state = dictionary.get("Proxy-State").unwrap();

        let mut list = AttributeList::new();
        list.add(Attribute::new(proxy_state.clone(), b"first".to_vec()).unwrap()).unwrap();
        list.add(Attribute::new(dictionary.get("User-Name").unwrap(), "alice").unwrap()).unwrap();
        list.add(Attribute::new(proxy_state.clone(), b"second".to_vec()).unwrap()).unwrap();

        let mut bytes = BytesMut::new();
        list.put(&mut bytes, b"secret", &authenticator).unwrap();

        let decoded = AttributeList::decode(&dictionary, &bytes, b"secret", &authenticator).unwrap();
        assert_eq!(decoded.len(), 3);

        let states: Vec<_> = decoded
            .get_all(proxy_state.key())
            .map(|it| it.value().as_bytes().unwrap().to_vec())
            .collect();

        assert_eq!(states, vec![b"first".to_vec(), b"second".to_vec()]);
    }

    #[test]
    fn test_trailing_fragment_discarded() {
        let dictionary = Dictionary::standard().unwrap();
        let authenticator = [0u8; 16];

        // one whole User-Name attribute plus a single stray byte
        let bytes = [0x01u8, 0x07, 0x61, 0x6c, 0x69, 0x63, 0x65, 0x1a];
        let list = AttributeList::decode(&dictionary, &bytes, b"secret", &authenticator).unwrap();

        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_bad_length_fails_stream() {
        let dictionary = Dictionary::standard().unwrap();
        let authenticator = [0u8; 16];

        // declared length runs past the buffer
        assert!(AttributeList::decode(&dictionary, &[0x01, 0x0A, 0x61], b"secret", &authenticator).is_err());
        // declared length under the header size
        assert!(AttributeList::decode(&dictionary, &[0x01, 0x01, 0x61], b"secret", &authenticator).is_err());
    }

    #[test]
    fn test_vsa_body_bounds() {
        let dictionary = Dictionary::standard().unwrap();
        let authenticator = [0u8; 16];

        // vendor header alone is not enough for the default 1,1 widths
        assert!(Attribute::decode(&dictionary, 26, &[0, 0, 0, 9, 1], b"secret", &authenticator).is_err());
        // sub-length smaller than its own header
        assert!(Attribute::decode(&dictionary, 26, &[0, 0, 0, 9, 1, 1, 0x78], b"secret", &authenticator).is_err());
        // sub-length past the end of the body
        assert!(Attribute::decode(&dictionary, 26, &[0, 0, 0, 9, 1, 9, 0x78], b"secret", &authenticator).is_err());
    }

    #[test]
    fn test_vsa_tail_bytes_ignored() {
        let dictionary = Dictionary::standard().unwrap();
        let authenticator = [0u8; 16];

        // a second sub-attribute follows the first; only the first one
        // is surfaced
        let body = [0u8, 0, 0, 9, 1, 6, 0x78, 0x79, 0x7A, 0x77, 2, 3, 0x21];
        let attribute = Attribute::decode(&dictionary, 26, &body, b"secret", &authenticator).unwrap();

        assert_eq!(attribute.name(), "Cisco-AVPair");
        assert_eq!(attribute.value().as_str(), Some("xyzw"));
    }
}
