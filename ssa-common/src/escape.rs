//! String escaping shared by the IR printer and the assembly emitter.

const ESCAPE_VALUES: &[u8] = b"\n\t\r\x0c\x08\"\\";
const ESCAPE_LETTERS: &[u8] = b"ntrfb\"\\";
const PLAIN_PUNCTUATION: &[u8] = b" _!@$%^&*(){}[]|:;<>?,./~`";

/// Escape raw bytes for a double-quoted string: alphanumerics and a
/// fixed set of punctuation pass through, common control characters use
/// their letter escape, everything else becomes a three-digit octal escape.
pub fn escape_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if b.is_ascii_alphanumeric() || PLAIN_PUNCTUATION.contains(&b) {
            out.push(b as char);
        } else if let Some(index) = ESCAPE_VALUES.iter().position(|&v| v == b) {
            out.push('\\');
            out.push(ESCAPE_LETTERS[index] as char);
        } else {
            out.push_str(&format!("\\{:03o}", b));
        }
    }
    out
}
