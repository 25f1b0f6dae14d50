use core::ops::Range;

use anyhow::{bail, Result};

use crate::entities::Cents;

pub(crate) trait LetChain {
    fn let_<F, R>(self, f: F) -> R
    where
        Self: Sized,
        F: FnOnce(Self) -> R;
}
impl<T> LetChain for T {
    #[inline]
    fn let_<F, R>(self, f: F) -> R
    where
        Self: Sized,
        F: FnOnce(Self) -> R,
    {
        f(self)
    }
}

pub(crate) trait AlsoChain {
    fn also_<F, R>(self, f: F) -> Self
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> R;
}
impl<T> AlsoChain for T {
    #[inline]
    fn also_<F, R>(mut self, f: F) -> Self
    where
        Self: Sized,
        F: FnOnce(&mut Self) -> R,
    {
        f(&mut self);
        self
    }
}

/// `page` starts from 1.
pub fn paginate(len: usize, page: u32, items: usize) -> Result<Range<usize>> {
    if page == 0 {
        bail!("page starts from 1");
    }

    let start = items * (page as usize - 1);
    if len == 0 && page == 1 {
        return Ok(0..0);
    }
    if start >= len {
        bail!("out of range (0..{} !< {}..)", len, start);
    }

    Ok(start..len.min(start + items))
}

pub fn page_count(len: usize, items: usize) -> usize { ((len as f32) / (items as f32)).ceil() as usize }

pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();

    format!("{}${}.{:02}", sign, abs / 100, abs % 100)
}

/// accepts `12`, `12.5`, `12.50` and `$12.50`.
pub fn parse_cents(s: &str) -> ::core::result::Result<Cents, String> {
    let raw = s.trim().trim_start_matches('$');
    let (whole, frac) = match raw.split_once('.') {
        Some((w, f)) => (w, f),
        None => (raw, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return Err(format!("not an amount: {}", s));
    }
    if frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("not an amount: {}", s));
    }

    let whole: i64 = match whole {
        "" => 0,
        w => w.parse().map_err(|_| format!("not an amount: {}", s))?,
    };
    let frac: i64 = match frac.len() {
        0 => 0,
        1 => frac.parse::<i64>().map_err(|e| e.to_string())? * 10,
        _ => frac.parse().map_err(|e: ::core::num::ParseIntError| e.to_string())?,
    };

    Ok(whole * 100 + frac)
}

pub(crate) mod uuid_as_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use uuid::Uuid;

    pub fn serialize<S: Serializer>(id: &Uuid, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&id.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Uuid, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(::serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paginate_clamps_last_page() {
        assert_eq!(paginate(25, 1, 10).unwrap(), 0..10);
        assert_eq!(paginate(25, 3, 10).unwrap(), 20..25);
        assert!(paginate(25, 4, 10).is_err());
        assert!(paginate(25, 0, 10).is_err());
        assert_eq!(paginate(0, 1, 10).unwrap(), 0..0);
    }

    #[test]
    fn cents_formatting() {
        assert_eq!(format_cents(2000), "$20.00");
        assert_eq!(format_cents(499), "$4.99");
        assert_eq!(format_cents(-5), "-$0.05");
    }

    #[test]
    fn cents_parsing() {
        assert_eq!(parse_cents("15"), Ok(1500));
        assert_eq!(parse_cents("$4.99"), Ok(499));
        assert_eq!(parse_cents("0.1"), Ok(10));
        assert!(parse_cents("1.234").is_err());
        assert!(parse_cents("abc").is_err());
        assert!(parse_cents("").is_err());
    }
}
