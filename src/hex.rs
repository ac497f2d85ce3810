//! Whitespace-tolerant hex encoding used for the payload's `hex`
//! representation and, in record form, emitted sixteen bytes per line.

/// Render `bytes` the way the payload classifier does for non-text
/// payloads: 16 bytes per line, two groups of 8 separated by a double
/// space, a single space between bytes within a group. The final line may
/// be short; no trailing padding is added.
pub fn format_hex(bytes: &[u8]) -> Vec<String> {
  bytes
    .chunks(16)
    .map(|chunk| {
      let mut line = String::with_capacity(16 * 3);
      for (i, byte) in chunk.iter().enumerate() {
        if i > 0 {
          line.push(' ');
          if i == 8 {
            line.push(' ');
          }
        }
        line.push_str(&format!("{byte:02x}"));
      }
      line
    })
    .collect()
}

/// Parse a whitespace-tolerant, case-insensitive hex string (as produced by
/// concatenating the lines from [`format_hex`], or typed by hand) into
/// bytes. Whitespace between and within byte pairs is ignored; an odd
/// number of hex digits, or any non-hex character, is an error.
pub fn parse_hex(input: &str) -> Result<Vec<u8>, String> {
  let mut digits = Vec::new();
  for ch in input.chars() {
    if ch.is_whitespace() {
      continue;
    }
    match ch.to_digit(16) {
      Some(d) => digits.push(d as u8),
      None => return Err(format!("invalid hex character '{ch}'")),
    }
  }
  if digits.len() % 2 != 0 {
    return Err("odd number of hex digits".to_string());
  }
  Ok(
    digits
      .chunks(2)
      .map(|pair| (pair[0] << 4) | pair[1])
      .collect(),
  )
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use test_log::test;

  use super::{
    format_hex,
    parse_hex,
  };

  #[test]
  fn format_hex_single_line() {
    let bytes = [
      0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0xf0, 0xe1, 0xd2, 0xc3, 0xb4, 0xa5, 0x96,
      0x87,
    ];
    let lines = format_hex(&bytes);
    assert_eq!(
      lines,
      vec!["01 23 45 67 89 ab cd ef  f0 e1 d2 c3 b4 a5 96 87".to_string()]
    );
  }

  #[test]
  fn format_hex_multi_line() {
    let mut bytes = vec![0u8; 32];
    bytes.push(0x43);
    let lines = format_hex(&bytes);
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[2], "43".to_string());
  }

  #[test]
  fn parse_hex_simple() {
    assert_eq!(parse_hex("0123456789abcdef").unwrap(), vec![
      0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef
    ]);
  }

  #[test]
  fn parse_hex_whitespace_and_case() {
    assert_eq!(
      parse_hex("01 23\n45\t67 AB CD").unwrap(),
      vec![0x01, 0x23, 0x45, 0x67, 0xab, 0xcd]
    );
  }

  #[test]
  fn parse_hex_errors() {
    assert!(parse_hex("0x").is_err());
    assert!(parse_hex("d").is_err());
    assert!(parse_hex("d e").is_err());
    assert!(parse_hex("hello").is_err());
  }
}
