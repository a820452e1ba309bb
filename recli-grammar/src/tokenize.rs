//! The CLI tokenizer (spec.md §4.5 step 1, §6 "Argument vector"):
//! space-delimited, with double-, single-, and back-quoted runs treated as a
//! single token and backslash escaping the active quote character. Quote
//! characters are preserved in the token bytes verbatim, matching §6's
//! guarantee that "downstream consumers see exactly what was typed".

/// Splits a raw input buffer into tokens. This never fails: an unterminated
/// quote simply runs to the end of the buffer, which is the right behavior
/// for tab completion (§4.5) where the buffer is, by definition, a partial
/// line still being typed.
pub fn tokenize(buffer: &str) -> Vec<String> {
    let bytes = buffer.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        while i < bytes.len() && bytes[i] == b' ' {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        let start = i;
        if matches!(bytes[i], b'"' | b'\'' | b'`') {
            let quote = bytes[i];
            i += 1;
            while i < bytes.len() {
                if bytes[i] == b'\\' && i + 1 < bytes.len() {
                    i += 2;
                } else if bytes[i] == quote {
                    i += 1;
                    break;
                } else {
                    i += 1;
                }
            }
        } else {
            while i < bytes.len() && bytes[i] != b' ' {
                i += 1;
            }
        }
        tokens.push(buffer[start..i].to_string());
    }
    tokens
}

/// True when `buffer` ends mid-token (no trailing space), i.e. the last
/// token returned by `tokenize` is still being typed rather than complete.
pub fn ends_mid_token(buffer: &str) -> bool {
    !buffer.is_empty() && !buffer.ends_with(' ')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_spaces() {
        assert_eq!(tokenize("show version"), vec!["show", "version"]);
    }

    #[test]
    fn keeps_quotes_in_token_bytes() {
        assert_eq!(tokenize(r#"set key "a b""#), vec!["set", "key", "\"a b\""]);
    }

    #[test]
    fn backslash_escapes_the_active_quote() {
        assert_eq!(tokenize(r#""a\"b""#), vec!["\"a\\\"b\""]);
    }

    #[test]
    fn unterminated_quote_runs_to_end() {
        assert_eq!(tokenize(r#"set "unterminated"#), vec!["set", "\"unterminated"]);
    }
}
