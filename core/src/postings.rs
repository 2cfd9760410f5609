//! Merge algorithms over sorted, duplicate-free postings lists.
//!
//! Every binary operation walks both inputs once with two cursors, so the cost is linear in the
//! combined length of the inputs.

use crate::NewsId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One news item containing a term. `positions` holds the token offsets of the term inside the
/// field, in increasing order, and stays empty when the index is not positional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub news_id: NewsId,
    pub positions: Vec<u32>,
}

/// Project a postings list onto its item ids.
pub fn ids(postings: &[Posting]) -> Vec<NewsId> {
    postings.iter().map(|p| p.news_id).collect()
}

/// Ids present in both lists.
pub fn intersect(p1: &[NewsId], p2: &[NewsId]) -> Vec<NewsId> {
    let mut out = Vec::with_capacity(p1.len().min(p2.len()));
    let (mut i, mut j) = (0, 0);
    while i < p1.len() && j < p2.len() {
        match p1[i].cmp(&p2[j]) {
            Ordering::Equal => {
                out.push(p1[i]);
                i += 1;
                j += 1;
            }
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
        }
    }
    out
}

/// Ids present in either list, each once.
pub fn union(p1: &[NewsId], p2: &[NewsId]) -> Vec<NewsId> {
    let mut out = Vec::with_capacity(p1.len() + p2.len());
    let (mut i, mut j) = (0, 0);
    while i < p1.len() && j < p2.len() {
        match p1[i].cmp(&p2[j]) {
            Ordering::Equal => {
                out.push(p1[i]);
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                out.push(p1[i]);
                i += 1;
            }
            Ordering::Greater => {
                out.push(p2[j]);
                j += 1;
            }
        }
    }
    out.extend_from_slice(&p1[i..]);
    out.extend_from_slice(&p2[j..]);
    out
}

/// Ids of `p1` that are not in `p2`.
pub fn difference(p1: &[NewsId], p2: &[NewsId]) -> Vec<NewsId> {
    let mut out = Vec::with_capacity(p1.len());
    let (mut i, mut j) = (0, 0);
    while i < p1.len() && j < p2.len() {
        match p1[i].cmp(&p2[j]) {
            Ordering::Equal => {
                i += 1;
                j += 1;
            }
            Ordering::Less => {
                out.push(p1[i]);
                i += 1;
            }
            Ordering::Greater => j += 1,
        }
    }
    out.extend_from_slice(&p1[i..]);
    out
}

/// Every id in `[0, universe)` that is not in `p`. Ids of `p` at or beyond `universe` are ignored.
pub fn complement(p: &[NewsId], universe: NewsId) -> Vec<NewsId> {
    let mut out = Vec::with_capacity((universe as usize).saturating_sub(p.len()));
    let mut next = 0;
    for &excluded in p {
        if excluded >= universe { break; }
        out.extend(next..excluded);
        next = excluded + 1;
    }
    out.extend(next..universe);
    out
}

/// Items where the given terms occur at consecutive offsets, in order. `lists[k]` is the
/// positional postings list of the k-th term of the phrase.
pub fn positional_intersect(lists: &[&[Posting]]) -> Vec<NewsId> {
    if lists.is_empty() { return Vec::new(); }
    let mut cursors = vec![0usize; lists.len()];
    let mut out = Vec::new();
    let mut offsets: Vec<&[u32]> = Vec::with_capacity(lists.len());

    while cursors.iter().zip(lists).all(|(&c, list)| c < list.len()) {
        let first = lists[0][cursors[0]].news_id;
        let mut min_term = 0;
        let mut same = true;
        for (k, list) in lists.iter().enumerate().skip(1) {
            let id = list[cursors[k]].news_id;
            if id != first { same = false; }
            if id < lists[min_term][cursors[min_term]].news_id { min_term = k; }
        }

        if same {
            offsets.clear();
            offsets.extend(lists.iter().zip(&cursors).map(|(list, &c)| list[c].positions.as_slice()));
            if is_consecutive(&offsets) { out.push(first); }
            cursors.iter_mut().for_each(|c| *c += 1);
        } else {
            cursors[min_term] += 1;
        }
    }
    out
}

/// True if there is an anchor `s` such that `offsets[k]` contains `s + k` for every `k`.
///
/// Each offset list is walked at most once: for every anchor taken from the first list, the
/// other cursors only move forward to the first offset `>= s + k`.
pub fn is_consecutive(offsets: &[&[u32]]) -> bool {
    let Some((first, rest)) = offsets.split_first() else { return false };
    let mut cursors = vec![0usize; rest.len()];

    'anchors: for &anchor in first.iter() {
        for (k, list) in rest.iter().enumerate() {
            let want = anchor + k as u32 + 1;
            let c = &mut cursors[k];
            while *c < list.len() && list[*c] < want {
                *c += 1;
            }
            if *c >= list.len() { return false; }
            if list[*c] != want { continue 'anchors; }
        }
        return true;
    }
    false
}
