//! Route patterns compiled once at registration.
//!
//! A pattern such as `/users/:id/posts/:post` is split into literal and
//! named-variable tokens:
//!
//! ```text
//! [Literal("/users/"), Param("id"), Literal("/posts/"), Param("post")]
//! ```
//!
//! Every `:` starts a variable whose name runs up to the next `/` or `:` (or
//! the end), so `/:a-:b` holds the variables `a-` and `b`, and `/a/:/b` one
//! unnamed variable. A `:` at the end or right before another `:` is an
//! ordinary character.

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Pattern {
    source: String,
    tokens: Vec<Token>,
}

impl Pattern {
    pub(crate) fn compile(uri: &str) -> Self {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut rest = uri;

        while let Some(pos) = rest.find(':') {
            let after = &rest[pos + 1..];
            literal.push_str(&rest[..pos]);

            if after.is_empty() || after.starts_with(':') {
                literal.push(':');
                rest = after;
                continue;
            }

            if !literal.is_empty() {
                tokens.push(Token::Literal(std::mem::take(&mut literal)));
            }

            let name_len = after.find(['/', ':']).unwrap_or(after.len());
            tokens.push(Token::Param(after[..name_len].to_string()));
            rest = &after[name_len..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }

        Pattern {
            source: uri.to_string(),
            tokens,
        }
    }

    /// The URI the pattern was compiled from.
    #[inline(always)]
    pub(crate) fn as_str(&self) -> &str {
        &self.source
    }

    /// A pattern without variables only matches its own text.
    #[inline]
    pub(crate) fn is_static(&self) -> bool {
        !self.tokens.iter().any(|t| matches!(t, Token::Param(_)))
    }

    /// Variable names in pattern order.
    #[inline]
    pub(crate) fn param_names(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().filter_map(|t| match t {
            Token::Param(name) => Some(name.as_str()),
            Token::Literal(_) => None,
        })
    }

    /// Matches the whole `path` and returns one argument per variable.
    ///
    /// Each variable takes one or more characters, preferring the longest
    /// span that still lets the rest of the pattern match. This is the same
    /// result as the anchored regex with every variable replaced by `(.+)`.
    pub(crate) fn matches<'p>(&self, path: &'p str) -> Option<Vec<&'p str>> {
        let table = self.match_table(path);
        if !table[0][0] {
            return None;
        }

        let mut args = Vec::with_capacity(self.tokens.len());
        let mut pos = 0;

        for (i, token) in self.tokens.iter().enumerate() {
            match token {
                Token::Literal(literal) => pos += literal.len(),
                Token::Param(_) => {
                    let end = (pos + 1..=path.len()).rev().find(|&end| table[i + 1][end])?;
                    args.push(&path[pos..end]);
                    pos = end;
                }
            }
        }

        Some(args)
    }

    /// `table[i][pos]` tells whether `tokens[i..]` match `path[pos..]`.
    ///
    /// Filled from the last token backwards, one row per token.
    fn match_table(&self, path: &str) -> Vec<Vec<bool>> {
        let len = path.len();
        let mut table = vec![vec![false; len + 1]; self.tokens.len() + 1];
        table[self.tokens.len()][len] = true;

        for (i, token) in self.tokens.iter().enumerate().rev() {
            let (head, tail) = table.split_at_mut(i + 1);
            let (row, next) = (&mut head[i], &tail[0]);

            match token {
                Token::Literal(literal) => {
                    for (pos, cell) in row.iter_mut().enumerate() {
                        *cell = path.is_char_boundary(pos)
                            && path.as_bytes()[pos..].starts_with(literal.as_bytes())
                            && next[pos + literal.len()];
                    }
                }
                Token::Param(_) => {
                    // Set once some `end > pos` can continue the match
                    let mut reachable = false;

                    for (pos, cell) in row.iter_mut().enumerate().rev() {
                        *cell = reachable && path.is_char_boundary(pos);
                        reachable |= next[pos];
                    }
                }
            }
        }

        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn compile() {
        #[rustfmt::skip]
        let cases: [(&str, &[&str], bool); 11] = [
            ("/",                     &[],                true),
            ("/users",                &[],                true),
            ("/users/:id",            &["id"],            false),
            ("/:a/:b",                &["a", "b"],        false),
            ("/users/:id/posts/:pid", &["id", "pid"],     false),
            ("/file.:ext",            &["ext"],           false),
            ("/:a-:b",                &["a-", "b"],       false),
            ("/:x:y",                 &["x", "y"],        false),
            ("/a/:/b",                &[""],              false),
            ("/a::b",                 &["b"],             false),
            ("/time:",                &[],                true),
        ];

        for (uri, names, is_static) in cases {
            let pattern = Pattern::compile(uri);

            assert_eq!(pattern.as_str(), uri);
            assert_eq!(pattern.param_names().collect::<Vec<_>>(), names, "{uri}");
            assert_eq!(pattern.is_static(), is_static, "{uri}");
        }
    }

    #[test]
    fn matching() {
        #[rustfmt::skip]
        let cases: [(&str, &str, Option<&[&str]>); 22] = [
            ("/:id",                "/42",               Some(&["42"])),
            ("/users/:id",          "/users/42",         Some(&["42"])),
            ("/users/:id",          "/users/a/b",        Some(&["a/b"])),
            ("/users/:id/posts",    "/users/7/posts",    Some(&["7"])),
            ("/:a/:b",              "/x/y",              Some(&["x", "y"])),
            ("/:a/:b",              "/x/y/z",            Some(&["x/y", "z"])),
            ("/:a/:b/:c",           "/1/2/3/4/5",        Some(&["1/2/3", "4", "5"])),
            ("/:a-:b",              "/1-2-3",            Some(&["1-2-", "3"])),
            ("/:x:y",               "/abc",              Some(&["ab", "c"])),
            ("/:x:y",               "/ñü",               Some(&["ñ", "ü"])),
            ("/file.:ext",          "/file.tar.gz",      Some(&["tar.gz"])),
            ("/a/:/b",              "/a/:/b",            Some(&[":"])),
            ("/a/:/b",              "/a/xy/b",           Some(&["xy"])),
            ("/a::b",               "/a:q",              Some(&["q"])),
            ("/päth/:name",         "/päth/ünï",         Some(&["ünï"])),

            ("/:x:y",               "/a",                None),

            ("/users/:id",          "/users/",           None),
            ("/users/:id",          "/users",            None),
            ("/users/:id/posts",    "/users//posts",     None),
            ("/users/:id/posts",    "/users/7/posts/",   None),
            ("/:a/:b",              "/x",                None),
            ("/users/:id",          "/people/42",        None),
        ];

        for (uri, path, expected) in cases {
            let pattern = Pattern::compile(uri);
            let expected = expected.map(|args| args.to_vec());

            assert_eq!(pattern.matches(path), expected, "{uri} ~ {path}");
        }
    }

    #[test]
    fn long_paths_match_quickly() {
        let pattern = Pattern::compile("/:a/:b/:c/end");
        let miss = format!("/{}nope", "x/".repeat(1500));
        let hit = format!("/{}end", "x/".repeat(1500));

        let started = Instant::now();
        assert_eq!(pattern.matches(&miss), None);

        let args = pattern.matches(&hit).unwrap();
        assert_eq!(args.len(), 3);
        assert_eq!((args[1], args[2]), ("x", "x"));
        assert_eq!(args[0].len(), "x/".repeat(1498).len() - 1);

        assert!(started.elapsed() < Duration::from_secs(2), "{:?}", started.elapsed());
    }
}
