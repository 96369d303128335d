//! Interned identifiers.
//!
//! All identifiers with equal text share one [`Symbol`]. The table is
//! append-only and may be shared between independent compilers through an
//! `Arc<Interner>`; inserts are serialized by a lock, so the first insert of a
//! given text wins and every later caller gets the same handle back.

use core::fmt;
use std::sync::{PoisonError, RwLock};

use string_interner::{DefaultBackend, DefaultSymbol, StringInterner};

pub type Symbol = DefaultSymbol;

type Table = StringInterner<DefaultBackend>;

/// The identifier `_`, which never binds anything.
pub const WILDCARD: &str = "_";

#[derive(Default)]
pub struct Interner {
    table: RwLock<Table>,
}

impl Interner {
    pub fn new() -> Self {
        Interner::default()
    }

    pub fn intern(&self, text: &str) -> Symbol {
        let found = self
            .table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(text);
        if let Some(symbol) = found {
            return symbol;
        }
        self.table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_intern(text)
    }

    /// Look up a symbol without inserting.
    pub fn get(&self, text: &str) -> Option<Symbol> {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(text)
    }

    pub fn resolve(&self, symbol: Symbol) -> Option<String> {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .resolve(symbol)
            .map(str::to_owned)
    }

    /// Like [`Interner::resolve`], but falls back to a placeholder for
    /// symbols from a foreign table.
    pub fn name(&self, symbol: Symbol) -> String {
        self.resolve(symbol)
            .unwrap_or_else(|| String::from("<unknown>"))
    }

    pub fn len(&self) -> usize {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for Interner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interner")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn equal_text_shares_a_symbol() {
        let interner = Interner::new();
        let a = interner.intern("foo");
        let b = interner.intern("foo");
        let c = interner.intern("bar");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(interner.resolve(a).as_deref(), Some("foo"));
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn get_does_not_insert() {
        let interner = Interner::new();
        assert_eq!(interner.get("missing"), None);
        assert!(interner.is_empty());
    }

    #[test]
    fn shared_table_returns_first_handle() {
        let interner = Arc::new(Interner::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let interner = Arc::clone(&interner);
                thread::spawn(move || {
                    (0..100)
                        .map(|i| interner.intern(&format!("sym{}", i % 10)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .collect();
        for other in &results[1..] {
            assert_eq!(&results[0], other);
        }
        assert_eq!(interner.len(), 10);
    }
}
