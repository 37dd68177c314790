use eyre::{bail, eyre, Result};
use std::fmt::Write;

/// Decodes a hex string into a vector of bytes
///
/// ```
/// use evmc_common::utils::strings::decode_hex;
///
/// let hex = "48656c6c6f20576f726c64"; // "Hello World" in hex
/// let result = decode_hex(hex).expect("should decode hex");
/// assert_eq!(result, vec![72, 101, 108, 108, 111, 32, 87, 111, 114, 108, 100]);
/// ```
pub fn decode_hex(mut s: &str) -> Result<Vec<u8>> {
    // normalize
    s = s.trim();
    s = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);

    if s.is_empty() {
        return Ok(vec![]);
    }
    if s.len() % 2 != 0 {
        bail!("invalid hex string: odd number of digits ({})", s.len());
    }

    (0..s.len())
        .step_by(2)
        .map(|i| s.get(i..i + 2).and_then(|pair| u8::from_str_radix(pair, 16).ok()))
        .collect::<Option<Vec<u8>>>()
        .ok_or_else(|| eyre!("invalid hex string: {}", s))
}

/// Decodes a hex string into a fixed-size byte array. The string must encode exactly `N` bytes.
///
/// ```
/// use evmc_common::utils::strings::decode_hex_array;
///
/// let bytes: [u8; 2] = decode_hex_array("0xbeef").expect("should decode hex");
/// assert_eq!(bytes, [0xbe, 0xef]);
///
/// assert!(decode_hex_array::<3>("0xbeef").is_err());
/// ```
pub fn decode_hex_array<const N: usize>(s: &str) -> Result<[u8; N]> {
    let bytes = decode_hex(s)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| eyre!("invalid hex length: expected {} bytes, found {}", N, bytes.len()))
}

/// Encodes a vector of bytes into a hex string
///
/// ```
/// use evmc_common::utils::strings::encode_hex;
///
/// let bytes = vec![72, 101, 108, 108, 111, 32, 87, 111, 114, 108, 100];
/// let result = encode_hex(&bytes);
/// assert_eq!(result, "48656c6c6f20576f726c64");
/// ```
pub fn encode_hex(s: &[u8]) -> String {
    s.iter().fold(String::with_capacity(s.len() * 2), |mut acc, b| {
        write!(acc, "{b:02x}").expect("unable to write");
        acc
    })
}
