use anyhow::Result;
use radius_server_codec::{
    Attribute, AttributeList, Code, Dictionary, Packet,
    crypto::{self, verify_response_authenticator},
};

#[test]
fn test_standard_attribute_wire_layout() -> Result<()> {
    let dictionary = Dictionary::standard()?;
    let authenticator = [0u8; 16];

    {
        let mut bytes = bytes::BytesMut::new();
        Attribute::new(dictionary.get("User-Name")?, "alice")?
            .put(&mut bytes, b"secret", &authenticator)?;

        assert_eq!(&bytes[..], &[0x01, 0x07, 0x61, 0x6c, 0x69, 0x63, 0x65]);
    }

    {
        let mut bytes = bytes::BytesMut::new();
        Attribute::new(dictionary.get("Framed-Protocol")?, 1u32)?
            .put(&mut bytes, b"secret", &authenticator)?;

        assert_eq!(&bytes[..], &[0x07, 0x06, 0x00, 0x00, 0x00, 0x01]);
    }

    {
        let mut bytes = bytes::BytesMut::new();
        Attribute::new(dictionary.get("Framed-IP-Address")?, "10.0.0.1")?
            .put(&mut bytes, b"secret", &authenticator)?;

        assert_eq!(&bytes[..], &[0x08, 0x06, 0x0A, 0x00, 0x00, 0x01]);
    }

    Ok(())
}

#[test]
fn test_cisco_vsa_decode() -> Result<()> {
    let dictionary = Dictionary::standard()?;
    let authenticator = [0u8; 16];

    let bytes = [
        26u8, 12, 0, 0, 0, 9, 1, 6, 0x78, 0x79, 0x7A, 0x77,
    ];

    let list = AttributeList::decode(&dictionary, &bytes, b"secret", &authenticator)?;
    assert_eq!(list.len(), 1);

    let attribute = list.iter().next().unwrap();
    assert!(attribute.name().starts_with("Cisco-"));
    assert_eq!(attribute.value().as_str(), Some("xyzw"));

    // and back out again, byte for byte
    let mut encoded = bytes::BytesMut::new();
    attribute.put(&mut encoded, b"secret", &authenticator)?;
    assert_eq!(&encoded[..], &bytes[..]);

    Ok(())
}

#[test]
fn test_encrypted_password_on_the_wire() -> Result<()> {
    let dictionary = Dictionary::standard()?;
    let authenticator = [0u8; 16];

    let mut request = Packet::new(Code::AccessRequest, 1, authenticator);
    request.add(&dictionary, "User-Password", "mypass")?;

    let bytes = request.encode(b"secret", false)?;

    // the ciphertext is padded to a block and never equals the
    // plaintext
    assert_eq!(bytes.len(), 20 + 2 + 16);
    assert_ne!(&bytes[22..28], b"mypass");

    let decoded = Packet::decode(&dictionary, &bytes, b"secret")?;
    let password = decoded.get(&dictionary.get("User-Password")?).unwrap();
    assert_eq!(password.value().as_str(), Some("mypass"));

    Ok(())
}

#[test]
fn test_response_round_trip() -> Result<()> {
    let dictionary = Dictionary::standard()?;
    let request_authenticator = crypto::random_authenticator();

    let mut response = Packet::new(Code::AccessAccept, 211, request_authenticator);
    response.add(&dictionary, "Reply-Message", "welcome home")?;
    response.add(&dictionary, "Service-Type", 2u32)?;
    response.add(&dictionary, "Framed-IP-Address", "192.168.12.1")?;
    response.add(&dictionary, "Session-Timeout", 604800u32)?;
    response.add(&dictionary, "Class", vec![0xCA, 0xFE, 0x00, 0x01])?;
    response.add(&dictionary, "Cisco-AVPair", "shell:priv-lvl=15")?;

    let bytes = response.encode(b"top-secret", true)?;
    assert!(verify_response_authenticator(&bytes, &request_authenticator, b"top-secret"));
    assert!(!verify_response_authenticator(&bytes, &request_authenticator, b"other-secret"));

    let decoded = Packet::decode(&dictionary, &bytes, b"top-secret")?;
    assert_eq!(decoded.code(), Code::AccessAccept);
    assert_eq!(decoded.identifier(), 211);
    assert_eq!(decoded.attributes().len(), response.attributes().len());

    // the recomputed digest matches the authenticator that was decoded
    let digest = crypto::response_authenticator(
        &[bytes[0], bytes[1], bytes[2], bytes[3]],
        &request_authenticator,
        &bytes[20..],
        b"top-secret",
    );
    assert_eq!(decoded.authenticator(), &digest);

    for (ours, theirs) in response.attributes().iter().zip(decoded.attributes()) {
        assert_eq!(ours.name(), theirs.name());
        assert_eq!(ours.value(), theirs.value());
    }

    Ok(())
}

#[test]
fn test_event_timestamp_is_a_date() -> Result<()> {
    let dictionary = Dictionary::standard()?;
    let authenticator = [0u8; 16];

    let mut packet = Packet::new(Code::AccountingRequest, 3, authenticator);
    packet.add(&dictionary, "Event-Timestamp", 1321009871u32)?;

    let bytes = packet.encode(b"secret", false)?;
    let decoded = Packet::decode(&dictionary, &bytes, b"secret")?;
    let timestamp = decoded.get(&dictionary.get("Event-Timestamp")?).unwrap();

    assert_eq!(timestamp.value().as_u32(), Some(1321009871));
    Ok(())
}

#[test]
fn test_wide_vendor_header_round_trip() -> Result<()> {
    let dictionary = Dictionary::standard()?;
    let authenticator = [0u8; 16];

    let path = std::env::temp_dir().join(format!("radius-wide-vendors-{}", std::process::id()));
    std::fs::write(
        &path,
        "VENDOR WideType 32473 format=2,1\n\
         BEGIN-VENDOR WideType\n\
         ATTRIBUTE Wide-Label 768 string\n\
         END-VENDOR\n\
         VENDOR NoLength 32474 format=4,0\n\
         BEGIN-VENDOR NoLength\n\
         ATTRIBUTE Bare-Counter 70000 integer\n\
         END-VENDOR\n",
    )?;

    let loaded = dictionary.load(&path);
    std::fs::remove_file(&path)?;
    loaded?;

    {
        let attribute = Attribute::new(dictionary.get("Wide-Label")?, "lab")?;
        let mut bytes = bytes::BytesMut::new();
        attribute.put(&mut bytes, b"secret", &authenticator)?;

        // 2-byte vendor type, 1-byte vendor length
        assert_eq!(
            &bytes[..],
            &[26, 12, 0x00, 0x00, 0x7E, 0xD9, 0x03, 0x00, 6, 0x6C, 0x61, 0x62]
        );

        let list = AttributeList::decode(&dictionary, &bytes, b"secret", &authenticator)?;
        assert_eq!(list.iter().next().unwrap().value().as_str(), Some("lab"));
    }

    {
        let attribute = Attribute::new(dictionary.get("Bare-Counter")?, 7u32)?;
        let mut bytes = bytes::BytesMut::new();
        attribute.put(&mut bytes, b"secret", &authenticator)?;

        // 4-byte vendor type, no vendor length field: the value runs to
        // the end of the attribute
        assert_eq!(
            &bytes[..],
            &[26, 14, 0x00, 0x00, 0x7E, 0xDA, 0x00, 0x01, 0x11, 0x70, 0x00, 0x00, 0x00, 0x07]
        );

        let list = AttributeList::decode(&dictionary, &bytes, b"secret", &authenticator)?;
        assert_eq!(list.iter().next().unwrap().value().as_u32(), Some(7));
    }

    Ok(())
}

#[test]
fn test_unknown_attribute_synthesis_on_decode() -> Result<()> {
    let dictionary = Dictionary::standard()?;
    let authenticator = [0u8; 16];

    // attribute 224 is not declared anywhere
    let bytes = [224u8, 4, 0xAB, 0xCD];
    let list = AttributeList::decode(&dictionary, &bytes, b"secret", &authenticator)?;
    let attribute = list.iter().next().unwrap();

    assert_eq!(attribute.name(), "Unknown-Attribute-224");
    assert_eq!(attribute.value().as_bytes(), Some(&[0xABu8, 0xCD][..]));

    // unknown vendor and unknown sub-attribute synthesize too
    let bytes = [26u8, 9, 0x00, 0x01, 0xE2, 0x40, 7, 3, 0x7F];
    let list = AttributeList::decode(&dictionary, &bytes, b"secret", &authenticator)?;
    let attribute = list.iter().next().unwrap();

    assert_eq!(attribute.name(), "Vendor123456-Unknown-Attribute-7");
    assert_eq!(attribute.value().as_bytes(), Some(&[0x7Fu8][..]));

    Ok(())
}

#[test]
fn test_unsupported_encryption_scheme_fails() -> Result<()> {
    let dictionary = Dictionary::new();

    let path = std::env::temp_dir().join(format!("radius-tunnel-password-{}", std::process::id()));
    std::fs::write(&path, "ATTRIBUTE Tunnel-Password 69 string encrypt=2\n")?;
    let loaded = dictionary.load(&path);
    std::fs::remove_file(&path)?;
    loaded?;

    let attribute = Attribute::new(dictionary.get("Tunnel-Password")?, "hunter2")?;
    let mut bytes = bytes::BytesMut::new();

    assert!(matches!(
        attribute.put(&mut bytes, b"secret", &[0u8; 16]),
        Err(radius_server_codec::Error::UnsupportedEncryption(2))
    ));

    assert!(matches!(
        Attribute::decode(&dictionary, 69, &[0x55; 16], b"secret", &[0u8; 16]),
        Err(radius_server_codec::Error::UnsupportedEncryption(2))
    ));

    Ok(())
}
