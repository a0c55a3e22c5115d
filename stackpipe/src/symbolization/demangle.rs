//! Symbol demangling for JIT map entries and static symbols.
//!
//! Names are demangled without parameter lists: a JIT map usually names the
//! same function several times (one per compiled tier), and parameter lists
//! only fragment the dictionary.

use std::borrow::Cow;

/// Hash element ending a legacy Rust path: `17h` then 16 hex digits
const LEGACY_HASH_LEN: usize = 3 + 16;

/// `_R...` (v0) or `_ZN...E` whose last path element is the legacy hash.
fn is_rust_symbol(name: &str) -> bool {
    if name.starts_with("_R") {
        return true;
    }

    let Some(path) = name.strip_prefix("_ZN").and_then(|rest| rest.strip_suffix('E')) else {
        return false;
    };
    path.len()
        .checked_sub(LEGACY_HASH_LEN)
        .and_then(|at| path.get(at..))
        .and_then(|hash| hash.strip_prefix("17h"))
        .is_some_and(|digits| digits.bytes().all(|b| b.is_ascii_hexdigit()))
}

/// Demangles the given symbol name, returning it unchanged when it is not a
/// Rust or Itanium C++ symbol.
#[must_use]
pub fn demangle(name: &str) -> Cow<'_, str> {
    if is_rust_symbol(name) {
        if let Ok(demangler) = rustc_demangle::try_demangle(name) {
            // The alternate formatting using `#` suppresses the hash suffix.
            return Cow::Owned(format!("{demangler:#}"));
        }
    }

    if name.starts_with("_Z") {
        if let Ok(symbol) = cpp_demangle::Symbol::new(name.as_bytes()) {
            let options = cpp_demangle::DemangleOptions::new().no_params();
            if let Ok(demangled) = symbol.demangle(&options) {
                return Cow::Owned(demangled);
            }
        }
    }

    Cow::Borrowed(name)
}
