//! Ranked fallbacks: pick the first candidate that yields something.
//!
//! Used wherever precedence matters (default version, download file, identity
//! backfill, directory layout, search tag attempts) so the order is a plain
//! list instead of nested conditionals.

/// First `Some` in ranked order. Candidates are evaluated lazily if the
/// iterator is lazy.
pub fn first_present<T>(candidates: impl IntoIterator<Item = Option<T>>) -> Option<T> {
    candidates.into_iter().flatten().next()
}

/// First non-empty string in ranked order, trimmed
pub fn first_non_empty<'a>(candidates: impl IntoIterator<Item = &'a str>) -> Option<String> {
    first_present(candidates.into_iter().map(|c| {
        let c = c.trim();
        (!c.is_empty()).then(|| c.to_string())
    }))
}

/// Run `attempt` on each candidate in order until one yields `Some`.
///
/// Errors abort immediately; no later candidate is tried.
pub fn try_first<C, T, E>(
    candidates: impl IntoIterator<Item = C>,
    mut attempt: impl FnMut(C) -> Result<Option<T>, E>,
) -> Result<Option<T>, E> {
    for candidate in candidates {
        if let Some(found) = attempt(candidate)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}
