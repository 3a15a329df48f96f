mod parser;

pub use parser::{ParseError, ParseErrorKind};

use std::{path::Path, sync::Arc};

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::{Error, value::AttributeKind};

/// The attribute type code reserved for Vendor-Specific attributes.
pub const VENDOR_SPECIFIC: u8 = 26;

/// A vendor registered through the `VENDOR` directive, or synthesized on
/// first lookup of an unknown enterprise id.
///
/// [RFC2865]: https://tools.ietf.org/html/rfc2865
/// [Section 5.26]: https://tools.ietf.org/html/rfc2865#section-5.26
///
/// The recommended sub-attribute layout of [Section 5.26] carries a one
/// octet vendor type and a one octet vendor length, but vendors exist
/// that deviate; `format=<T>,<L>` in the dictionary records the widths a
/// vendor actually uses on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vendor {
    pub name: String,
    pub id: u32,
    /// width of the vendor type field, one of 1, 2 or 4.
    pub type_size: usize,
    /// width of the vendor length field, one of 0, 1 or 2.
    pub length_size: usize,
}

impl Vendor {
    fn synthesized(id: u32) -> Self {
        Self {
            name: format!("Vendor{}", id),
            id,
            type_size: 1,
            length_size: 1,
        }
    }
}

/// Identity of an attribute descriptor.
///
/// Two descriptors describe the same attribute exactly when their keys
/// are equal; `vendor` is zero for the global attribute space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeKey {
    pub id: u8,
    pub vendor: u32,
    pub sub_id: u32,
}

#[derive(Debug, Default)]
struct ValueTable {
    names: AHashMap<u32, String>,
    numbers: AHashMap<String, u32>,
}

/// An attribute descriptor.
///
/// Immutable after dictionary load; the enumeration table is the only
/// part appended to while `VALUE` directives are still being parsed.
#[derive(Debug)]
pub struct DictionaryEntry {
    name: String,
    id: u8,
    sub_id: Option<u32>,
    vendor: Option<Arc<Vendor>>,
    kind: AttributeKind,
    sub_kind: Option<AttributeKind>,
    encrypt: Option<u8>,
    values: RwLock<ValueTable>,
}

impl DictionaryEntry {
    pub(crate) fn standard(name: String, id: u8, kind: AttributeKind, encrypt: Option<u8>) -> Self {
        Self {
            name,
            id,
            sub_id: None,
            vendor: None,
            kind,
            sub_kind: None,
            encrypt,
            values: Default::default(),
        }
    }

    pub(crate) fn vendor_specific(
        name: String,
        vendor: Arc<Vendor>,
        sub_id: u32,
        kind: AttributeKind,
        encrypt: Option<u8>,
    ) -> Self {
        Self {
            name,
            id: VENDOR_SPECIFIC,
            sub_id: Some(sub_id),
            vendor: Some(vendor),
            kind: AttributeKind::Vsa,
            sub_kind: Some(kind),
            encrypt,
            values: Default::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// the on-wire type code; always 26 for vendor-specific attributes.
    pub fn id(&self) -> u8 {
        self.id
    }

    /// the vendor type field for vendor-specific attributes.
    pub fn sub_id(&self) -> Option<u32> {
        self.sub_id
    }

    pub fn vendor(&self) -> Option<&Arc<Vendor>> {
        self.vendor.as_ref()
    }

    /// the outer codec kind; `Vsa` for vendor-specific attributes.
    pub fn kind(&self) -> AttributeKind {
        self.kind
    }

    /// the codec kind the value is actually coded with.
    pub fn real_kind(&self) -> AttributeKind {
        self.sub_kind.unwrap_or(self.kind)
    }

    /// the `encrypt=<n>` flag from the dictionary, if any.
    pub fn encrypt(&self) -> Option<u8> {
        self.encrypt
    }

    pub fn key(&self) -> AttributeKey {
        AttributeKey {
            id: self.id,
            vendor: self.vendor.as_ref().map(|vendor| vendor.id).unwrap_or(0),
            sub_id: self.sub_id.unwrap_or(0),
        }
    }

    /// presentation name of an enumerated number, if the dictionary
    /// declared one.
    pub fn value_name(&self, value: u32) -> Option<String> {
        self.values.read().names.get(&value).cloned()
    }

    /// enumerated number of a presentation name.
    pub fn value_number(&self, name: &str) -> Option<u32> {
        self.values.read().numbers.get(&name.to_ascii_lowercase()).copied()
    }

    pub(crate) fn insert_value(&self, name: String, value: u32) {
        let mut values = self.values.write();
        values.numbers.insert(name.to_ascii_lowercase(), value);
        values.names.insert(value, name);
    }
}

#[derive(Debug, Default)]
struct Registry {
    attributes: AHashMap<u8, Arc<DictionaryEntry>>,
    names: AHashMap<String, Arc<DictionaryEntry>>,
    vendors: AHashMap<u32, Arc<Vendor>>,
    vendor_names: AHashMap<String, Arc<Vendor>>,
    vendor_attributes: AHashMap<(u32, u32), Arc<DictionaryEntry>>,
}

/// An attribute lookup key: numeric type code or case-insensitive name.
pub enum AttributeQuery<'a> {
    Id(u32),
    Name(&'a str),
}

impl From<u32> for AttributeQuery<'static> {
    fn from(value: u32) -> Self {
        Self::Id(value)
    }
}

impl From<u8> for AttributeQuery<'static> {
    fn from(value: u8) -> Self {
        Self::Id(u32::from(value))
    }
}

impl<'a> From<&'a str> for AttributeQuery<'a> {
    fn from(value: &'a str) -> Self {
        Self::Name(value)
    }
}

/// The attribute metadata registry.
///
/// One registry is typically shared (`Arc`) between a server or client
/// and everything decoding packets on its behalf.  Lookups are
/// idempotent: the same id or name returns the same `Arc`'d descriptor
/// for the lifetime of the registry, including descriptors synthesized
/// for ids the loaded dictionaries never declared.
#[derive(Debug, Default)]
pub struct Dictionary {
    registry: RwLock<Registry>,
}

impl Dictionary {
    /// an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// a registry preloaded with the embedded default dictionaries
    /// (RFC 2865/2866, an RFC 2869 subset, Cisco and Microsoft).
    ///
    /// # Test
    ///
    /// ```
    /// use radius_server_codec::dictionary::Dictionary;
    /// use radius_server_codec::value::AttributeKind;
    ///
    /// let dictionary = Dictionary::standard().unwrap();
    ///
    /// assert_eq!(dictionary.get("User-Name").unwrap().id(), 1);
    /// assert_eq!(dictionary.get(2u32).unwrap().name(), "User-Password");
    /// assert_eq!(dictionary.get(2u32).unwrap().encrypt(), Some(1));
    /// assert_eq!(dictionary.get("Framed-IP-Address").unwrap().real_kind(), AttributeKind::Ipv4);
    /// assert_eq!(dictionary.vendor(9).name, "Cisco");
    /// assert_eq!(dictionary.vsa(9, 1).name(), "Cisco-AVPair");
    /// ```
    pub fn standard() -> Result<Self, ParseError> {
        let dictionary = Self::new();
        dictionary.load("dictionary")?;
        Ok(dictionary)
    }

    /// Load a dictionary file into the registry.
    ///
    /// A path that is neither absolute nor openable falls back to the
    /// dictionary set embedded in this crate.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<(), ParseError> {
        parser::load(self, path.as_ref())
    }

    /// Look up an attribute descriptor by type code or name.
    ///
    /// An undeclared id in 1..=255 synthesizes (and caches) an
    /// `Unknown-Attribute-<id>` octets descriptor; ids outside that
    /// range and undeclared names fail.
    ///
    /// # Test
    ///
    /// ```
    /// use std::sync::Arc;
    /// use radius_server_codec::dictionary::Dictionary;
    ///
    /// let dictionary = Dictionary::new();
    ///
    /// assert!(dictionary.get(0u32).is_err());
    /// assert!(dictionary.get(256u32).is_err());
    /// assert!(dictionary.get("No-Such-Attribute").is_err());
    ///
    /// let unknown = dictionary.get(224u32).unwrap();
    /// assert_eq!(unknown.name(), "Unknown-Attribute-224");
    /// assert!(Arc::ptr_eq(&unknown, &dictionary.get(224u32).unwrap()));
    /// assert!(Arc::ptr_eq(&unknown, &dictionary.get("unknown-attribute-224").unwrap()));
    /// ```
    pub fn get<'a>(&self, query: impl Into<AttributeQuery<'a>>) -> Result<Arc<DictionaryEntry>, Error> {
        match query.into() {
            AttributeQuery::Id(id) => {
                if id == 0 || id > 255 {
                    return Err(Error::AttributeOutOfRange(id));
                }

                let id = id as u8;
                if let Some(entry) = self.registry.read().attributes.get(&id) {
                    return Ok(entry.clone());
                }

                let mut registry = self.registry.write();
                if let Some(entry) = registry.attributes.get(&id) {
                    return Ok(entry.clone());
                }

                let entry = Arc::new(DictionaryEntry::standard(
                    format!("Unknown-Attribute-{}", id),
                    id,
                    AttributeKind::Octets,
                    None,
                ));

                registry.attributes.insert(id, entry.clone());
                registry.names.insert(entry.name.to_ascii_lowercase(), entry.clone());
                Ok(entry)
            }
            AttributeQuery::Name(name) => self
                .registry
                .read()
                .names
                .get(&name.to_ascii_lowercase())
                .cloned()
                .ok_or_else(|| Error::UnknownAttribute(name.to_string())),
        }
    }

    /// Look up a vendor by enterprise id, synthesizing `Vendor<id>` with
    /// the default 1,1 header widths on first miss.
    ///
    /// # Test
    ///
    /// ```
    /// use std::sync::Arc;
    /// use radius_server_codec::dictionary::Dictionary;
    ///
    /// let dictionary = Dictionary::new();
    /// let vendor = dictionary.vendor(14122);
    ///
    /// assert_eq!(vendor.name, "Vendor14122");
    /// assert_eq!((vendor.type_size, vendor.length_size), (1, 1));
    /// assert!(Arc::ptr_eq(&vendor, &dictionary.vendor(14122)));
    /// ```
    pub fn vendor(&self, id: u32) -> Arc<Vendor> {
        if let Some(vendor) = self.registry.read().vendors.get(&id) {
            return vendor.clone();
        }

        let mut registry = self.registry.write();
        if let Some(vendor) = registry.vendors.get(&id) {
            return vendor.clone();
        }

        let vendor = Arc::new(Vendor::synthesized(id));
        registry.vendors.insert(id, vendor.clone());
        registry.vendor_names.insert(vendor.name.to_ascii_lowercase(), vendor.clone());
        vendor
    }

    /// Look up a vendor by name.
    pub fn find_vendor(&self, name: &str) -> Option<Arc<Vendor>> {
        self.registry.read().vendor_names.get(&name.to_ascii_lowercase()).cloned()
    }

    /// Look up a vendor-specific attribute descriptor, synthesizing
    /// `<Vendor>-Unknown-Attribute-<sub_id>` on first miss.
    ///
    /// # Test
    ///
    /// ```
    /// use std::sync::Arc;
    /// use radius_server_codec::dictionary::Dictionary;
    ///
    /// let dictionary = Dictionary::new();
    /// let entry = dictionary.vsa(9, 252);
    ///
    /// assert_eq!(entry.name(), "Vendor9-Unknown-Attribute-252");
    /// assert_eq!(entry.id(), 26);
    /// assert_eq!(entry.sub_id(), Some(252));
    /// assert!(Arc::ptr_eq(&entry, &dictionary.vsa(9, 252)));
    /// ```
    pub fn vsa(&self, vendor_id: u32, sub_id: u32) -> Arc<DictionaryEntry> {
        if let Some(entry) = self.registry.read().vendor_attributes.get(&(vendor_id, sub_id)) {
            return entry.clone();
        }

        let vendor = self.vendor(vendor_id);

        let mut registry = self.registry.write();
        if let Some(entry) = registry.vendor_attributes.get(&(vendor_id, sub_id)) {
            return entry.clone();
        }

        let entry = Arc::new(DictionaryEntry::vendor_specific(
            format!("{}-Unknown-Attribute-{}", vendor.name, sub_id),
            vendor,
            sub_id,
            AttributeKind::Octets,
            None,
        ));

        registry.vendor_attributes.insert((vendor_id, sub_id), entry.clone());
        registry.names.insert(entry.name.to_ascii_lowercase(), entry.clone());
        entry
    }

    pub(crate) fn register_attribute(&self, entry: DictionaryEntry) -> Arc<DictionaryEntry> {
        let entry = Arc::new(entry);
        let mut registry = self.registry.write();

        match (entry.vendor(), entry.sub_id()) {
            (Some(vendor), Some(sub_id)) => {
                registry.vendor_attributes.insert((vendor.id, sub_id), entry.clone());
            }
            _ => {
                registry.attributes.insert(entry.id, entry.clone());
            }
        }

        registry.names.insert(entry.name.to_ascii_lowercase(), entry.clone());
        entry
    }

    pub(crate) fn register_vendor(&self, vendor: Vendor) -> Option<Arc<Vendor>> {
        let mut registry = self.registry.write();
        if registry.vendors.contains_key(&vendor.id) {
            return None;
        }

        let vendor = Arc::new(vendor);
        registry.vendors.insert(vendor.id, vendor.clone());
        registry.vendor_names.insert(vendor.name.to_ascii_lowercase(), vendor.clone());
        Some(vendor)
    }
}
