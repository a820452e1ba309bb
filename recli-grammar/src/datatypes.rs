//! Built-in data-type validators (spec.md §4.6). Each is a small struct
//! implementing `Validator`, registered under its uppercase name by
//! `Engine::new()`. Numeric/structural shapes are hand-parsed byte-wise
//! (short, rigid grammars where a regex buys nothing); `HOSTNAME` and the
//! quoted-string family lean on a compiled-once `regex::Regex`, the same
//! tool the teacher itself reaches for to recognize a token's shape.

use lazy_static::lazy_static;
use regex::Regex;

use crate::node::Validator;

lazy_static! {
    static ref HOSTNAME_LABEL: Regex = Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?$").unwrap();
}

fn err(msg: &str) -> Result<(), String> {
    Err(msg.to_string())
}

#[derive(Debug)]
pub struct Boolean;
impl Validator for Boolean {
    fn name(&self) -> &str {
        "BOOLEAN"
    }
    fn check(&self, word: &str) -> Result<(), String> {
        match word {
            "on" | "off" | "0" | "1" => Ok(()),
            _ => err("Invalid syntax for boolean (expected on, off, 0 or 1)"),
        }
    }
}

#[derive(Debug)]
pub struct Integer;
impl Validator for Integer {
    fn name(&self) -> &str {
        "INTEGER"
    }
    fn check(&self, word: &str) -> Result<(), String> {
        let body = word.strip_prefix('+').or_else(|| word.strip_prefix('-')).unwrap_or(word);
        if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
            return err("Invalid syntax for integer");
        }
        match word.parse::<i64>() {
            Ok(_) => Ok(()),
            Err(_) => err("Integer out of range"),
        }
    }
}

fn parse_ipv4_octets(word: &str) -> Option<[u16; 4]> {
    let parts: Vec<&str> = word.split('.').collect();
    if parts.len() != 4 {
        return None;
    }
    let mut out = [0u16; 4];
    for (i, p) in parts.iter().enumerate() {
        if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let v: u16 = p.parse().ok()?;
        if v > 255 {
            return None;
        }
        out[i] = v;
    }
    Some(out)
}

#[derive(Debug)]
pub struct Ipv4Addr;
impl Validator for Ipv4Addr {
    fn name(&self) -> &str {
        "IPV4ADDR"
    }
    fn check(&self, word: &str) -> Result<(), String> {
        if parse_ipv4_octets(word).is_some() {
            Ok(())
        } else {
            err("Invalid syntax for IP address")
        }
    }
}

/// Intentionally permissive per spec.md §9's open question: hex digits and
/// colons only, no structural validation of group count or `::` collapsing.
#[derive(Debug)]
pub struct Ipv6Addr;
impl Validator for Ipv6Addr {
    fn name(&self) -> &str {
        "IPV6ADDR"
    }
    fn check(&self, word: &str) -> Result<(), String> {
        let plausible = !word.is_empty()
            && word.contains(':')
            && word.bytes().all(|b| b.is_ascii_hexdigit() || b == b':');
        if plausible {
            Ok(())
        } else {
            err("Invalid syntax for IPv6 address")
        }
    }
}

#[derive(Debug)]
pub struct IpAddr;
impl Validator for IpAddr {
    fn name(&self) -> &str {
        "IPADDR"
    }
    fn check(&self, word: &str) -> Result<(), String> {
        if Ipv4Addr.check(word).is_ok() || Ipv6Addr.check(word).is_ok() {
            Ok(())
        } else {
            err("Invalid syntax for IP address")
        }
    }
}

#[derive(Debug)]
pub struct IpPrefix;
impl Validator for IpPrefix {
    fn name(&self) -> &str {
        "IPPREFIX"
    }
    fn check(&self, word: &str) -> Result<(), String> {
        let (addr, len) = match word.split_once('/') {
            Some(pair) => pair,
            None => return err("Invalid syntax for IP prefix (expected addr/len)"),
        };
        if parse_ipv4_octets(addr).is_none() {
            return err("Invalid syntax for IP address");
        }
        match len.parse::<u32>() {
            Ok(n) if n <= 32 => Ok(()),
            _ => err("Invalid prefix length (expected 0-32)"),
        }
    }
}

#[derive(Debug)]
pub struct MacAddr;
impl Validator for MacAddr {
    fn name(&self) -> &str {
        "MACADDR"
    }
    fn check(&self, word: &str) -> Result<(), String> {
        let parts: Vec<&str> = word.split(':').collect();
        if parts.len() != 6 {
            return err("Invalid syntax for MAC address");
        }
        for p in parts {
            if p.len() != 2 || !p.bytes().all(|b| b.is_ascii_hexdigit()) {
                return err("Invalid syntax for MAC address");
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct Hostname;
impl Validator for Hostname {
    fn name(&self) -> &str {
        "HOSTNAME"
    }
    fn check(&self, word: &str) -> Result<(), String> {
        if word == "." {
            return Ok(());
        }
        if word.is_empty() || word.len() > 253 {
            return err("Invalid syntax for hostname");
        }
        for label in word.split('.') {
            if label.is_empty() || label.len() > 63 || label.starts_with('-') || !HOSTNAME_LABEL.is_match(label) {
                return err("Invalid syntax for hostname");
            }
        }
        Ok(())
    }
}

/// Scans a quoted token for balance, honoring backslash escapes of the
/// closing quote, without allocating a parsed/unescaped copy.
fn balanced_quote(word: &str, quote: char) -> bool {
    let bytes = word.as_bytes();
    if bytes.len() < 2 || bytes[0] != quote as u8 {
        return false;
    }
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() => i += 2,
            b if b == quote as u8 => return i == bytes.len() - 1,
            _ => i += 1,
        }
    }
    false
}

#[derive(Debug)]
pub struct StringV;
impl Validator for StringV {
    fn name(&self) -> &str {
        "STRING"
    }
    fn check(&self, word: &str) -> Result<(), String> {
        match word.chars().next() {
            Some('"') => {
                if balanced_quote(word, '"') {
                    Ok(())
                } else {
                    err("Unbalanced double-quoted string")
                }
            }
            Some('\'') => {
                if balanced_quote(word, '\'') {
                    Ok(())
                } else {
                    err("Unbalanced single-quoted string")
                }
            }
            Some('`') => {
                if balanced_quote(word, '`') {
                    Ok(())
                } else {
                    err("Unbalanced back-quoted string")
                }
            }
            Some(_) => Ok(()),
            None => err("Expected a string"),
        }
    }
}

#[derive(Debug)]
pub struct DqString;
impl Validator for DqString {
    fn name(&self) -> &str {
        "DQSTRING"
    }
    fn check(&self, word: &str) -> Result<(), String> {
        if balanced_quote(word, '"') {
            Ok(())
        } else {
            err("Expected a double-quoted string")
        }
    }
}

#[derive(Debug)]
pub struct SqString;
impl Validator for SqString {
    fn name(&self) -> &str {
        "SQSTRING"
    }
    fn check(&self, word: &str) -> Result<(), String> {
        if balanced_quote(word, '\'') {
            Ok(())
        } else {
            err("Expected a single-quoted string")
        }
    }
}

#[derive(Debug)]
pub struct BqString;
impl Validator for BqString {
    fn name(&self) -> &str {
        "BQSTRING"
    }
    fn check(&self, word: &str) -> Result<(), String> {
        if balanced_quote(word, '`') {
            Ok(())
        } else {
            err("Expected a back-quoted string")
        }
    }
}

/// The twelve built-in data-type names, in the order spec.md §4.3 lists
/// them, each paired with a fresh validator instance.
pub fn builtins() -> Vec<(&'static str, std::rc::Rc<dyn Validator>)> {
    vec![
        ("BOOLEAN", std::rc::Rc::new(Boolean)),
        ("HOSTNAME", std::rc::Rc::new(Hostname)),
        ("INTEGER", std::rc::Rc::new(Integer)),
        ("IPADDR", std::rc::Rc::new(IpAddr)),
        ("IPV4ADDR", std::rc::Rc::new(Ipv4Addr)),
        ("IPV6ADDR", std::rc::Rc::new(Ipv6Addr)),
        ("IPPREFIX", std::rc::Rc::new(IpPrefix)),
        ("MACADDR", std::rc::Rc::new(MacAddr)),
        ("STRING", std::rc::Rc::new(StringV)),
        ("DQSTRING", std::rc::Rc::new(DqString)),
        ("SQSTRING", std::rc::Rc::new(SqString)),
        ("BQSTRING", std::rc::Rc::new(BqString)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_accepts_signed_in_range() {
        assert!(Integer.check("42").is_ok());
        assert!(Integer.check("-42").is_ok());
        assert!(Integer.check("+42").is_ok());
        assert!(Integer.check("9223372036854775807").is_ok());
    }

    #[test]
    fn integer_rejects_junk_and_overflow() {
        assert!(Integer.check("42a").is_err());
        assert!(Integer.check("").is_err());
        assert!(Integer.check("99999999999999999999").is_err());
    }

    #[test]
    fn ipv4_rejects_out_of_range_octet() {
        assert!(Ipv4Addr.check("10.0.0.1").is_ok());
        assert!(Ipv4Addr.check("10.0.0.300").is_err());
    }

    #[test]
    fn ipprefix_checks_length_bound() {
        assert!(IpPrefix.check("10.0.0.0/24").is_ok());
        assert!(IpPrefix.check("10.0.0.0/33").is_err());
    }

    #[test]
    fn macaddr_requires_six_hex_octets() {
        assert!(MacAddr.check("aa:bb:cc:dd:ee:ff").is_ok());
        assert!(MacAddr.check("aa:bb:cc:dd:ee").is_err());
    }

    #[test]
    fn hostname_rejects_label_starting_with_hyphen() {
        assert!(Hostname.check("foo.example.com").is_ok());
        assert!(Hostname.check("-foo.example.com").is_err());
        assert!(Hostname.check(".").is_ok());
    }

    #[test]
    fn string_requires_balanced_quotes_when_quoted() {
        assert!(StringV.check("plain").is_ok());
        assert!(StringV.check("\"quoted\"").is_ok());
        assert!(StringV.check("\"unterminated").is_err());
        assert!(StringV.check(r#""escaped \" end""#).is_ok());
    }
}
