// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared lookup helpers for materialized state queries.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// Find a value by exact key or, failing that, the unique key with `id` as
/// a prefix — the same short-id convenience `git` gives commit hashes.
pub(crate) fn find_by_prefix<'a, K, V>(map: &'a HashMap<K, V>, id: &str) -> Option<&'a V>
where
    K: Eq + Hash + Borrow<str>,
{
    if let Some(v) = map.get(id) {
        return Some(v);
    }
    let mut matches = map.iter().filter(|(k, _)| Borrow::<str>::borrow(*k).starts_with(id));
    let (_, first) = matches.next()?;
    if matches.next().is_some() {
        return None;
    }
    Some(first)
}
