//! Zero-copy URL query string splitting.

use memchr::memchr;

/// Borrowed view over a raw query string.
///
/// Splits on `&` and the first `=` of each pair. There is **no
/// percent-decoding** (`%20`, `%40`, ...); values are returned exactly as
/// they appear in the request target.
///
/// # Examples
/// ```rust
/// use spindle::query::Query;
///
/// let query = Query::new("?debug&name=&=Qwe&key=a=b");
/// let pairs: Vec<_> = query.iter().collect();
///
/// assert_eq!(pairs, [("debug", ""), ("name", ""), ("", "Qwe"), ("key", "a=b")]);
/// assert_eq!(query.get("key"), Some("a=b"));
/// assert_eq!(query.get("missing"), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Query<'a> {
    data: &'a str,
}

impl<'a> Query<'a> {
    /// Wraps a query string; a leading `?` is ignored.
    #[inline]
    pub fn new(raw: &'a str) -> Self {
        Query {
            data: raw.strip_prefix('?').unwrap_or(raw),
        }
    }

    /// Returns the value of the first pair named `name`.
    ///
    /// A bare key (`?debug`) yields an empty value.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.iter().find(|(key, _)| *key == name).map(|(_, value)| value)
    }

    /// Iterates over `(key, value)` pairs in order. Empty segments
    /// (`a=1&&b=2`) are skipped.
    #[inline]
    pub fn iter(&self) -> Pairs<'a> {
        Pairs { rest: self.data }
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Iterator returned by [`Query::iter`].
#[derive(Debug, Clone)]
pub struct Pairs<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Pairs<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.rest.is_empty() {
                return None;
            }

            // '&' and '=' are ASCII, so these indices are char boundaries
            let (segment, rest) = match memchr(b'&', self.rest.as_bytes()) {
                Some(pos) => (&self.rest[..pos], &self.rest[pos + 1..]),
                None => (self.rest, ""),
            };
            self.rest = rest;

            if segment.is_empty() {
                continue;
            }

            return Some(match memchr(b'=', segment.as_bytes()) {
                Some(pos) => (&segment[..pos], &segment[pos + 1..]),
                None => (segment, ""),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic() {
        for line in ["a=1&b=2", "?a=1&b=2"] {
            let params: Vec<_> = Query::new(line).iter().collect();
            assert_eq!(params, [("a", "1"), ("b", "2")]);
        }
    }

    #[test]
    fn full() {
        let params: Vec<_> = Query::new("flag&empty=&=val&&key=value&").iter().collect();

        assert_eq!(
            params,
            [("flag", ""), ("empty", ""), ("", "val"), ("key", "value")]
        );
    }

    #[test]
    fn first_match_wins() {
        let query = Query::new("a=1&a=2&a=3");
        assert_eq!(query.get("a"), Some("1"));
    }

    #[test]
    fn empty() {
        for line in ["", "?", "&&"] {
            assert_eq!(Query::new(line).iter().next(), None);
        }
        assert!(Query::new("?").is_empty());
    }

    #[test]
    fn no_decoding() {
        let query = Query::new("email=user%40example.com");
        assert_eq!(query.get("email"), Some("user%40example.com"));
    }
}
