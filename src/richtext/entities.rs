use std::borrow::Cow;

/// Longest entity we try to recognize, `&` and `;` included.
const MAX_ENTITY_LEN: usize = 12;

/// Decodes named and numeric character references in one left-to-right pass.
///
/// Decoded output is never rescanned, so `&amp;lt;` becomes `&lt;` rather than
/// `<`. Typographic quotes and dashes fold to their ASCII forms. Unknown named
/// entities are kept verbatim.
pub fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        match decode_one(candidate) {
            Some((decoded, consumed)) => {
                out.push_str(&decoded);
                rest = &candidate[consumed..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Decodes the entity at the start of `input` (which begins with `&`),
/// returning the replacement and the number of bytes consumed.
fn decode_one(input: &str) -> Option<(Cow<'static, str>, usize)> {
    let (semi, _) = input
        .char_indices()
        .take(MAX_ENTITY_LEN)
        .find(|(_, ch)| *ch == ';')?;
    let name = &input[1..semi];
    let consumed = semi + 1;

    if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse::<u32>().ok()?,
        };
        return decode_code_point(code).map(|decoded| (decoded, consumed));
    }

    let decoded = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "trade" => "\u{2122}",
        "ndash" | "mdash" => "-",
        "lsquo" | "rsquo" | "sbquo" => "'",
        "ldquo" | "rdquo" | "bdquo" => "\"",
        "hellip" => "...",
        _ => return None,
    };
    Some((Cow::Borrowed(decoded), consumed))
}

fn decode_code_point(code: u32) -> Option<Cow<'static, str>> {
    let folded = match code {
        8211 | 8212 => "-",
        8216 | 8217 | 8218 | 8242 => "'",
        8220 | 8221 | 8222 | 8243 => "\"",
        8230 => "...",
        0 => return None,
        _ => return char::from_u32(code).map(|ch| Cow::Owned(ch.to_string())),
    };
    Some(Cow::Borrowed(folded))
}
