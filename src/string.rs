use hashbrown::HashMap;

use crate::error::{Error, Result};

/// Default upper bound on the byte length of a decoded string: 1 MiB.
pub(crate) const DEFAULT_MAX_STRING_LENGTH: usize = 1 << 20;

/// Longest string the identifier cache will intern.
pub(crate) const MAX_IDENTIFIER_LENGTH: usize = 20;

/// Entries kept before the identifier cache is reset wholesale.
const MAX_CACHED_IDENTIFIERS: usize = 1024;

/// How malformed UTF-8 in string payloads is handled.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Utf8Policy {
    /// Fail with [`Error::InvalidUtf8`]. The default.
    #[default]
    Strict,
    /// Substitute U+FFFD for each malformed sequence.
    Replace,
}

pub(crate) fn decode_utf8(bytes: &[u8], policy: Utf8Policy) -> Result<String> {
    match policy {
        Utf8Policy::Strict => std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(Error::InvalidUtf8),
        Utf8Policy::Replace => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Interning cache for short, frequently repeated strings such as map keys.
///
/// A cache hit clones the interned string without re-validating its UTF-8;
/// the observable result is identical to [`decode_utf8`].
#[derive(Debug)]
pub(crate) struct Identifiers {
    cache: HashMap<Box<[u8]>, Box<str>>,
}

impl Identifiers {
    pub(crate) fn new() -> Identifiers {
        Identifiers {
            cache: HashMap::new(),
        }
    }

    pub(crate) fn resolve(&mut self, bytes: &[u8], policy: Utf8Policy) -> Result<String> {
        if bytes.len() > MAX_IDENTIFIER_LENGTH {
            return decode_utf8(bytes, policy);
        }
        if let Some(interned) = self.cache.get(bytes) {
            return Ok(interned.to_string());
        }
        let decoded = decode_utf8(bytes, policy)?;
        if self.cache.len() >= MAX_CACHED_IDENTIFIERS {
            self.cache.clear();
        }
        self.cache
            .insert(bytes.into(), decoded.clone().into_boxed_str());
        Ok(decoded)
    }
}
