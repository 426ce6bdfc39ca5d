//! Naming convention applied to namespace and method names.
//!
//! Registration-time names and wire-time method strings go through the same
//! transform before they are compared, so `"UserService.GetName"` and
//! `"user_service.get_name"` resolve to the same method under
//! [`NamingConvention::Snake`].

use serde::Deserialize;

/// Separator between namespace and method on the wire (`"namespace.method"`).
pub const METHOD_SEPARATOR: char = '.';

/// How names are folded before registration and lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingConvention {
    /// Names are compared exactly as written.
    Verbatim,
    /// Names are folded to `snake_case`.
    #[default]
    Snake,
}

impl NamingConvention {
    /// Apply the convention to a single name component.
    pub fn apply(self, name: &str) -> String {
        match self {
            NamingConvention::Verbatim => name.to_string(),
            NamingConvention::Snake => snake_case(name),
        }
    }

    /// Apply the convention to every `.`-separated component of a path.
    pub fn apply_path(self, path: &str) -> String {
        path.split(METHOD_SEPARATOR)
            .map(|part| self.apply(part))
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Fold a `CamelCase`, `mixedCase` or `snake_case` identifier to `snake_case`.
///
/// Acronym runs stay together: `"HTTPServer"` becomes `"http_server"` and
/// `"API1"` becomes `"api1"`. Already-snake input is returned unchanged.
pub fn snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() {
            let prev = if i > 0 { Some(chars[i - 1]) } else { None };
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                None | Some('_') => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                Some(_) => false,
            };
            if boundary {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
