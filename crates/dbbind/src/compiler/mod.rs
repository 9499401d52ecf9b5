//! Named-placeholder compiler.
//!
//! Rewrites `:name` placeholders into the driver's native form while leaving
//! single-quoted literals untouched.
//!
//! ```
//! use dbbind::{ParamStyle, compile};
//!
//! let stmt = compile("select :b, :a from t where c = 'x:y'", ParamStyle::Dollar).unwrap();
//! assert_eq!(stmt.sql(), "select $1, $2 from t where c = 'x:y'");
//! assert_eq!(stmt.keys(), ["b", "a"]);
//! ```

mod cache;
mod scan;


pub use scan::literal_spans;

use crate::error::{DbError, DbResult};
use crate::paramstyle::ParamStyle;
use cache::CompileCache;
use scan::is_word_char;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::ops::Range;
use std::sync::Arc;

/// Native SQL plus the placeholder names it was compiled from.
///
/// Immutable once built and reusable across any number of parameter sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledStatement {
    sql: String,
    keys: Vec<String>,
    style: ParamStyle,
    layout: BindLayout,
}

/// How bind slots map back onto keys.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct BindLayout {
    /// Key bound at each driver slot.
    pub(crate) binds: Vec<String>,
    /// For each slot, the slot of that key's first appearance.
    pub(crate) first: Vec<usize>,
    /// For each slot, the index of its key among the distinct keys.
    pub(crate) distinct: Vec<usize>,
    pub(crate) distinct_len: usize,
    pub(crate) has_duplicates: bool,
}

impl BindLayout {
    fn new(binds: Vec<String>) -> Self {
        let mut seen: HashMap<&str, (usize, usize)> = HashMap::with_capacity(binds.len());
        let mut first = Vec::with_capacity(binds.len());
        let mut distinct = Vec::with_capacity(binds.len());

        for (slot, key) in binds.iter().enumerate() {
            let next = seen.len();
            let (first_slot, distinct_idx) = *seen.entry(key.as_str()).or_insert((slot, next));
            first.push(first_slot);
            distinct.push(distinct_idx);
        }

        let distinct_len = seen.len();
        drop(seen);
        Self {
            has_duplicates: distinct_len < binds.len(),
            binds,
            first,
            distinct,
            distinct_len,
        }
    }
}

impl CompiledStatement {
    /// Driver-native SQL.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Placeholder names in occurrence order, duplicates included.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn style(&self) -> ParamStyle {
        self.style
    }

    /// Keys in the order the driver expects their values.
    ///
    /// Equal to [`keys`](Self::keys) for positional styles; the distinct keys in
    /// first-appearance order for [`ParamStyle::Named`].
    pub fn bind_keys(&self) -> &[String] {
        &self.layout.binds
    }

    /// Placeholder names as they appear in the native SQL.
    ///
    /// Only meaningful for [`ParamStyle::Numeric`] (`p1, p2, ...`) and
    /// [`ParamStyle::Named`]; other styles have no names on the wire.
    pub fn native_names(&self) -> Vec<String> {
        match self.style {
            ParamStyle::Numeric => (1..=self.keys.len()).map(|i| format!("p{i}")).collect(),
            ParamStyle::Named => self.layout.binds.clone(),
            _ => Vec::new(),
        }
    }

    /// Whether some key fills more than one driver slot.
    pub fn has_duplicate_binds(&self) -> bool {
        self.layout.has_duplicates
    }

    pub(crate) fn layout(&self) -> &BindLayout {
        &self.layout
    }
}

/// Compile `sql` for `style`.
///
/// Fails with [`DbError::MalformedPlaceholder`] on a `:` outside a literal that is not
/// followed by a word character, `:` or `=`.
pub fn compile(sql: &str, style: ParamStyle) -> DbResult<CompiledStatement> {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut keys = Vec::new();
    let mut cursor = 0;

    for span in literal_spans(sql) {
        rewrite_segment(sql, cursor..span.start, style, &mut out, &mut keys)?;
        out.push_str(&sql[span.clone()]);
        cursor = span.end;
    }
    rewrite_segment(sql, cursor..sql.len(), style, &mut out, &mut keys)?;

    let binds = match style {
        ParamStyle::Named => {
            let mut distinct: Vec<String> = Vec::with_capacity(keys.len());
            for key in &keys {
                if !distinct.contains(key) {
                    distinct.push(key.clone());
                }
            }
            distinct
        }
        _ => keys.clone(),
    };

    Ok(CompiledStatement {
        sql: out,
        keys,
        style,
        layout: BindLayout::new(binds),
    })
}

/// Rewrite the placeholders of `sql[range]`, which holds no literal.
fn rewrite_segment(
    sql: &str,
    range: Range<usize>,
    style: ParamStyle,
    out: &mut String,
    keys: &mut Vec<String>,
) -> DbResult<()> {
    let offset = range.start;
    let segment = &sql[range.clone()];
    let mut chars = segment.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c != ':' {
            out.push(c);
            continue;
        }

        match chars.peek() {
            Some(&(_, ':')) => {
                chars.next();
                out.push_str("::");
            }
            Some(&(_, '=')) => out.push(':'),
            Some(&(start, next)) if is_word_char(next) => {
                let mut end = segment.len();
                while let Some(&(j, ch)) = chars.peek() {
                    if !is_word_char(ch) {
                        end = j;
                        break;
                    }
                    chars.next();
                }
                let name = &segment[start..end];
                keys.push(name.to_string());
                style.write_placeholder(out, keys.len(), name);
            }
            Some(&(_, next)) => {
                return Err(DbError::MalformedPlaceholder {
                    position: offset + i,
                    message: format!("':' followed by {next:?}"),
                });
            }
            None => {
                let message = match sql[range.end..].chars().next() {
                    Some(next) => format!("':' followed by {next:?}"),
                    None => "':' at end of statement".to_string(),
                };
                return Err(DbError::MalformedPlaceholder {
                    position: offset + i,
                    message,
                });
            }
        }
    }

    Ok(())
}

/// A compiler bound to one paramstyle, with an optional LRU of compiled statements.
#[derive(Debug)]
pub struct Compiler {
    style: ParamStyle,
    cache: Option<CompileCache>,
}

impl Compiler {
    pub fn new(style: ParamStyle) -> Self {
        Self { style, cache: None }
    }

    /// Keep up to `capacity` compiled statements. `0` disables caching.
    pub fn with_cache(style: ParamStyle, capacity: usize) -> Self {
        Self {
            style,
            cache: NonZeroUsize::new(capacity).map(CompileCache::new),
        }
    }

    pub fn style(&self) -> ParamStyle {
        self.style
    }

    pub fn compile(&self, sql: &str) -> DbResult<Arc<CompiledStatement>> {
        let Some(cache) = &self.cache else {
            return compile(sql, self.style).map(Arc::new);
        };

        if let Some(stmt) = cache.get(sql) {
            return Ok(stmt);
        }
        let stmt = Arc::new(compile(sql, self.style)?);
        Ok(cache.insert(sql, stmt))
    }

    /// Number of cached statements.
    pub fn cached(&self) -> usize {
        self.cache.as_ref().map_or(0, CompileCache::len)
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }
}
