const DELIMITERS: &[u8] = b" \t\r\n";

/// Splits a command line into tokens.
///
/// Quoted substrings (`"..."` or `'...'`) may contain delimiters. A token
/// that is wrapped in a single pair of matching quotes has them removed; an
/// unterminated quote runs to the end of the line.
pub fn split_tokens(line: &str) -> Vec<String> {
    // Delimiters and quotes are ASCII, so every index we stop at is a char
    // boundary.
    let bytes = line.as_bytes();
    let mut tokens = Vec::new();
    let mut index = 0;
    while index < bytes.len() {
        while index < bytes.len() && DELIMITERS.contains(&bytes[index]) {
            index += 1;
        }
        if index >= bytes.len() {
            break;
        }

        let begin = index;
        while index < bytes.len() {
            let c = bytes[index];
            if DELIMITERS.contains(&c) {
                break;
            }
            if c == b'"' || c == b'\'' {
                index = match bytes[index + 1..].iter().position(|&b| b == c) {
                    Some(pos) => index + 1 + pos + 1,
                    None => bytes.len(),
                };
            } else {
                index += 1;
            }
        }
        tokens.push(unquote(&line[begin..index]).to_string());
    }
    tokens
}

fn unquote(token: &str) -> &str {
    for quote in ['"', '\''] {
        if token.len() >= 2 && token.starts_with(quote) && token.ends_with(quote) {
            return &token[1..token.len() - 1];
        }
    }
    token
}
