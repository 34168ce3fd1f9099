//! Live window enumeration and application-key normalization.

use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};

use crate::backend::WindowManager;
use crate::config::{MULTI_WINDOW_PRODUCTS, TITLE_SEPARATORS};
use crate::error::{DuplicateKey, Error};
use crate::types::{AppKey, WindowRecord};

/// Map a raw window title to its application key.
///
/// Known multi-window products collapse to their canonical name. Any other
/// title is cut at the first whitespace-flanked separator.
pub fn normalize_title(title: &str) -> AppKey {
    let lowered = title.to_lowercase();
    if let Some((_, canonical)) = MULTI_WINDOW_PRODUCTS
        .iter()
        .find(|(needle, _)| lowered.contains(needle))
    {
        return AppKey::new(*canonical);
    }

    let chars: Vec<(usize, char)> = title.char_indices().collect();
    for (pos, &(byte_idx, ch)) in chars.iter().enumerate() {
        if !TITLE_SEPARATORS.contains(&ch) || pos == 0 {
            continue;
        }
        let before = chars[pos - 1].1;
        let after = chars.get(pos + 1).map(|(_, c)| *c);
        if before.is_whitespace() && after.is_some_and(char::is_whitespace) {
            let prefix = title[..byte_idx].trim();
            if !prefix.is_empty() {
                return AppKey::new(prefix);
            }
        }
    }
    AppKey::new(title.trim())
}

pub struct WindowDirectory<'a> {
    wm: &'a dyn WindowManager,
}

impl<'a> WindowDirectory<'a> {
    pub fn new(wm: &'a dyn WindowManager) -> Self {
        Self { wm }
    }

    pub fn enumerate(&self) -> Result<Vec<WindowRecord>> {
        let windows = self.wm.list_windows()?;
        Ok(windows
            .into_iter()
            .filter(|window| !window.title.trim().is_empty())
            .map(|window| WindowRecord {
                key: normalize_title(&window.title),
                raw_title: window.title,
                handle: window.handle,
                rect: window.rect,
                pid: window.pid,
            })
            .collect())
    }

    /// The unique live window for `key`, if any. Callers run
    /// [`ensure_unique`] first, so the first match is the only one.
    pub fn find(&self, key: &AppKey) -> Result<Option<WindowRecord>> {
        Ok(self
            .enumerate()?
            .into_iter()
            .find(|record| &record.key == key))
    }
}

/// Live keys followed by saved keys that have no live window, sorted.
/// A saved key that matches a live key is folded into it.
pub fn merged_keys(live: &[WindowRecord], saved: &BTreeSet<AppKey>) -> Vec<AppKey> {
    let mut keys: Vec<AppKey> = live.iter().map(|record| record.key.clone()).collect();
    let live_keys: BTreeSet<&AppKey> = live.iter().map(|record| &record.key).collect();
    keys.extend(saved.iter().filter(|key| !live_keys.contains(key)).cloned());
    keys.sort();
    keys
}

/// Every key that occurs more than once, each reported once.
pub fn detect_duplicates(keys: &[AppKey]) -> Vec<AppKey> {
    let mut sorted: Vec<&AppKey> = keys.iter().collect();
    sorted.sort();
    let mut duplicates: Vec<AppKey> = Vec::new();
    for pair in sorted.windows(2) {
        if pair[0] == pair[1] && duplicates.last() != Some(pair[0]) {
            duplicates.push(pair[0].clone());
        }
    }
    duplicates
}

/// Refuse to continue when two live windows share a key: there is no way
/// to tell which one a saved entry refers to.
pub fn ensure_unique(live: &[WindowRecord], saved: &BTreeSet<AppKey>) -> Result<(), Error> {
    let duplicates = detect_duplicates(&merged_keys(live, saved));
    if duplicates.is_empty() {
        return Ok(());
    }
    let mut titles: BTreeMap<&AppKey, Vec<String>> = BTreeMap::new();
    for record in live {
        titles
            .entry(&record.key)
            .or_default()
            .push(record.raw_title.clone());
    }
    let conflicts = duplicates
        .into_iter()
        .map(|key| DuplicateKey {
            titles: titles.get(&key).cloned().unwrap_or_default(),
            key,
        })
        .collect();
    Err(Error::DuplicateWindowIdentity(conflicts))
}
