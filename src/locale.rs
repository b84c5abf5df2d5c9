//! Locale-aware string comparison, injected into the comparator as a
//! `Collator` (SPEC_FULL.md §4.1, §9).
//!
//! Each distinct `locale` tag seen in a key spec gets its own
//! `newlocale(LC_COLLATE_MASK, ..)` object, cached and compared against
//! with `strcoll_l`. Unlike `setlocale`/`strcoll`, this never touches
//! process-global locale state, so two keys using different `locale=`
//! tags in the same sort don't clobber each other's collation. Tags the
//! platform doesn't recognize fall back to code-point order with a
//! single warning on stderr, per the open question in SPEC_FULL.md §9.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::ffi::CString;
use std::sync::{Mutex, OnceLock};

/// Compares two strings under a named collation.
///
/// Implementors must be pure and thread-safe: SPEC_FULL.md §5 allows
/// sorting runs on worker threads, and the comparator is shared across
/// them.
pub trait Collator: Send + Sync {
    fn compare(&self, a: &str, b: &str, locale: Option<&str>) -> Ordering;
}

/// Wraps a `locale_t` so it can live in a `Mutex`-guarded map. The handle
/// is immutable after creation and `strcoll_l` is documented reentrant,
/// so sharing it across threads is safe; `locale_t` itself is just an
/// opaque pointer with no `Send`/`Sync` auto-impl.
struct LocaleHandle(libc::locale_t);

unsafe impl Send for LocaleHandle {}
unsafe impl Sync for LocaleHandle {}

impl Drop for LocaleHandle {
    fn drop(&mut self) {
        unsafe { libc::freelocale(self.0) };
    }
}

/// `strcoll_l`-backed collator with code-point fallback.
#[derive(Default)]
pub struct SystemCollator {
    warned: Mutex<HashSet<String>>,
    locales: Mutex<HashMap<String, Option<LocaleHandle>>>,
}

impl std::fmt::Debug for SystemCollator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemCollator").finish_non_exhaustive()
    }
}

impl SystemCollator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached `locale_t` for `tag`, creating it via
    /// `newlocale(LC_COLLATE_MASK, ..)` on first use. `None` means the
    /// platform doesn't recognize `tag`; the warning for that fires at
    /// most once per tag.
    fn locale_for(&self, tag: &str) -> Option<libc::locale_t> {
        let mut locales = self.locales.lock().unwrap();
        if let Some(handle) = locales.get(tag) {
            return handle.as_ref().map(|h| h.0);
        }

        let created = CString::new(tag).ok().and_then(|cstr| {
            let loc = unsafe {
                libc::newlocale(libc::LC_COLLATE_MASK, cstr.as_ptr(), std::ptr::null_mut())
            };
            if loc.is_null() {
                None
            } else {
                Some(loc)
            }
        });

        if created.is_none() {
            let mut warned = self.warned.lock().unwrap();
            if warned.insert(tag.to_string()) {
                eprintln!(
                    "sortx: warning: locale '{tag}' is unavailable, falling back to code-point order"
                );
            }
        }

        locales.insert(tag.to_string(), created.map(LocaleHandle));
        created
    }

    fn strcoll_l(a: &str, b: &str, locale: libc::locale_t) -> Ordering {
        let (Ok(a_c), Ok(b_c)) = (CString::new(a), CString::new(b)) else {
            return a.cmp(b);
        };
        let result = unsafe { libc::strcoll_l(a_c.as_ptr(), b_c.as_ptr(), locale) };
        result.cmp(&0)
    }
}

impl Collator for SystemCollator {
    fn compare(&self, a: &str, b: &str, locale: Option<&str>) -> Ordering {
        match locale.and_then(|tag| self.locale_for(tag)) {
            Some(loc) => Self::strcoll_l(a, b, loc),
            None => a.cmp(b),
        }
    }
}

static DEFAULT_COLLATOR: OnceLock<SystemCollator> = OnceLock::new();

/// The process-wide default collator, lazily initialized.
pub fn default_collator() -> &'static SystemCollator {
    DEFAULT_COLLATOR.get_or_init(SystemCollator::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_point_order_without_locale() {
        let c = SystemCollator::new();
        assert_eq!(c.compare("apple", "banana", None), Ordering::Less);
        assert_eq!(c.compare("banana", "apple", None), Ordering::Greater);
        assert_eq!(c.compare("apple", "apple", None), Ordering::Equal);
    }

    #[test]
    fn unknown_locale_falls_back_and_warns_once() {
        let c = SystemCollator::new();
        assert_eq!(
            c.compare("a", "b", Some("not-a-real-locale-xyz")),
            Ordering::Less
        );
        // Second call must not re-probe or re-warn; behavior stays consistent.
        assert_eq!(
            c.compare("a", "b", Some("not-a-real-locale-xyz")),
            Ordering::Less
        );
    }

    #[test]
    fn two_distinct_locale_tags_dont_interfere() {
        // Regression test for a prior bug where a global setlocale() call
        // meant the second tag's probe silently changed comparison
        // behavior for the first tag too. Both tags here are bogus, so
        // both fall back to code-point order independently rather than
        // one clobbering the other's (nonexistent) state.
        let c = SystemCollator::new();
        assert_eq!(c.compare("a", "b", Some("bogus-tag-one")), Ordering::Less);
        assert_eq!(c.compare("a", "b", Some("bogus-tag-two")), Ordering::Less);
        assert_eq!(c.compare("a", "b", Some("bogus-tag-one")), Ordering::Less);
    }
}
