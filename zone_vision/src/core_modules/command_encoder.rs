// THEORY:
// The `command_encoder` renders a zone result into the wire message the
// external controller parses: ASCII decimal indices joined by single commas,
// with no brackets, spaces, or terminator. An empty result encodes to an empty
// message, which the controller reads as "not detected". Framing such as a
// trailing newline belongs to the transport, not to this encoding.

/// Separator between zone indices on the wire.
pub const SEPARATOR: u8 = b',';

/// Encodes zone indices as `"0,2"`-style ASCII bytes.
pub fn encode(zones: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(zones.len() * 2);
    for (i, zone) in zones.iter().enumerate() {
        if i > 0 {
            out.push(SEPARATOR);
        }
        out.extend_from_slice(zone.to_string().as_bytes());
    }
    out
}

/// String form of [`encode`], for logs and console echo.
pub fn encode_to_string(zones: &[u32]) -> String {
    zones
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_comma_joined_without_decoration() {
        assert_eq!(encode(&[2]), b"2");
        assert_eq!(encode(&[0, 1, 2]), b"0,1,2");
        assert_eq!(encode(&[3, 12]), b"3,12");
    }

    #[test]
    fn empty_result_is_an_empty_message() {
        assert!(encode(&[]).is_empty());
        assert_eq!(encode_to_string(&[]), "");
    }

    #[test]
    fn string_form_matches_bytes() {
        let zones = [0, 2, 3];
        assert_eq!(encode_to_string(&zones).as_bytes(), encode(&zones).as_slice());
    }
}
