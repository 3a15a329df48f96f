use md5::{Digest, Md5};
use rand::Rng;

use crate::Error;

/// Longest User-Password plaintext the obfuscation scheme accepts.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// MD5 digest over a sequence of buffers.
pub fn md5(source: &[&[u8]]) -> [u8; 16] {
    let mut hasher = Md5::new();
    for buf in source {
        hasher.update(buf);
    }

    hasher.finalize().into()
}

/// RFC 2865 response authenticator.
///
/// [Section 3]: https://tools.ietf.org/html/rfc2865#section-3
///
/// The value of the Authenticator field in Access-Accept, Access-
/// Reject, and Access-Challenge packets is called the Response
/// Authenticator, and contains a one-way MD5 hash calculated over a
/// stream of octets consisting of: the RADIUS packet, beginning with
/// the Code field, including the Identifier, the Length, the Request
/// Authenticator field from the Access-Request packet, and the
/// response Attributes, followed by the shared secret.
pub fn response_authenticator(
    head: &[u8; 4],
    request_authenticator: &[u8; 16],
    attributes: &[u8],
    secret: &[u8],
) -> [u8; 16] {
    md5(&[head, request_authenticator, attributes, secret])
}

/// Check the authenticator field of an encoded response against the
/// request authenticator it must have been derived from.
///
/// # Test
///
/// ```
/// use radius_server_codec::crypto::{response_authenticator, verify_response_authenticator};
///
/// let request_authenticator = [0x2au8; 16];
/// let mut response = vec![
///     0x02, 0x01, 0x00, 0x1b,
///     0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
///     0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
///     0x01, 0x07, 0x61, 0x6c, 0x69, 0x63, 0x65,
/// ];
///
/// let digest = response_authenticator(
///     &[0x02, 0x01, 0x00, 0x1b],
///     &request_authenticator,
///     &response[20..],
///     b"secret",
/// );
///
/// response[4..20].copy_from_slice(&digest);
///
/// assert!(verify_response_authenticator(&response, &request_authenticator, b"secret"));
/// assert!(!verify_response_authenticator(&response, &[0u8; 16], b"secret"));
/// assert!(!verify_response_authenticator(&response, &request_authenticator, b"wrong"));
/// ```
pub fn verify_response_authenticator(
    bytes: &[u8],
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> bool {
    if bytes.len() < 20 {
        return false;
    }

    let length = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
    if length < 20 || length > bytes.len() {
        return false;
    }

    let head = [bytes[0], bytes[1], bytes[2], bytes[3]];
    let digest = response_authenticator(&head, request_authenticator, &bytes[20..length], secret);
    digest == bytes[4..20]
}

/// RFC 2865 User-Password obfuscation.
///
/// [Section 5.2]: https://tools.ietf.org/html/rfc2865#section-5.2
///
/// The password is first padded at the end with nulls to a multiple of
/// 16 octets.  A one-way MD5 hash is calculated over a stream of
/// octets consisting of the shared secret followed by the Request
/// Authenticator; that hash is XORed with the first 16 octet segment
/// of the password.  Each later segment is XORed with the hash of the
/// shared secret and the previous ciphertext block.
///
/// # Test
///
/// ```
/// use radius_server_codec::crypto::{decrypt_user_password, encrypt_user_password};
///
/// let authenticator = [0u8; 16];
/// let cipher = encrypt_user_password(b"mypass", b"secret", &authenticator).unwrap();
///
/// assert_eq!(cipher.len(), 16);
/// assert_ne!(&cipher[..6], b"mypass");
/// assert_eq!(
///     decrypt_user_password(&cipher, b"secret", &authenticator).unwrap(),
///     b"mypass"
/// );
/// ```
pub fn encrypt_user_password(
    data: &[u8],
    secret: &[u8],
    authenticator: &[u8; 16],
) -> Result<Vec<u8>, Error> {
    if data.is_empty() || data.len() > MAX_PASSWORD_LENGTH {
        return Err(Error::InvalidPasswordLength);
    }

    let mut padded = data.to_vec();
    padded.resize(data.len().div_ceil(16) * 16, 0);

    let mut output = Vec::with_capacity(padded.len());
    let mut chain = authenticator.to_vec();

    for chunk in padded.chunks(16) {
        let digest = md5(&[secret, &chain]);
        chain = chunk.iter().zip(digest.iter()).map(|(it, b)| it ^ b).collect();
        output.extend_from_slice(&chain);
    }

    Ok(output)
}

/// Reverse of [`encrypt_user_password`]; the trailing null padding is
/// stripped from the recovered plaintext.
pub fn decrypt_user_password(
    data: &[u8],
    secret: &[u8],
    authenticator: &[u8; 16],
) -> Result<Vec<u8>, Error> {
    if data.is_empty() || data.len() % 16 != 0 || data.len() > MAX_PASSWORD_LENGTH {
        return Err(Error::InvalidPasswordLength);
    }

    let mut output = Vec::with_capacity(data.len());
    let mut chain: &[u8] = authenticator;

    for chunk in data.chunks(16) {
        let digest = md5(&[secret, chain]);
        output.extend(chunk.iter().zip(digest.iter()).map(|(it, b)| it ^ b));
        chain = chunk;
    }

    while output.last() == Some(&0) {
        output.pop();
    }

    Ok(output)
}

/// 16 random bytes for a request authenticator, drawn from the
/// OS-seeded generator.
pub fn random_authenticator() -> [u8; 16] {
    let mut authenticator = [0u8; 16];
    rand::rng().fill(&mut authenticator);
    authenticator
}
