/// Parses an unsigned integer the way C's `strtoul(s, NULL, 0)` does.
///
/// `0x`/`0X` selects hexadecimal, a leading `0` octal, anything else
/// decimal. Parsing stops at the first character that is not a digit of the
/// chosen base; if nothing was parsed the result is 0. Values that do not fit
/// saturate at `u64::MAX`.
pub fn parse_unsigned(s: &str) -> u64 {
    let s = s.trim_start();
    let s = s.strip_prefix('+').unwrap_or(s);

    let (radix, digits) = match s.as_bytes() {
        [b'0', b'x' | b'X', next, ..] if next.is_ascii_hexdigit() => (16, &s[2..]),
        [b'0', ..] => (8, s),
        _ => (10, s),
    };

    let mut value: u64 = 0;
    for c in digits.chars() {
        let Some(digit) = c.to_digit(radix) else {
            break;
        };
        value = value
            .saturating_mul(u64::from(radix))
            .saturating_add(u64::from(digit));
    }
    value
}

/// Parses an offset or length argument.
pub fn parse_usize(s: &str) -> usize {
    usize::try_from(parse_unsigned(s)).unwrap_or(usize::MAX)
}

/// Parses a byte value, keeping only the low eight bits like a C cast.
pub fn parse_byte(s: &str) -> u8 {
    (parse_unsigned(s) & 0xff) as u8
}
