//! Reconciles an incoming batch of articles against what is already stored.
//!
//! Identity is the article `link`. A known link has its scalar fields
//! overwritten by the incoming values and its tags unioned; an unknown link
//! becomes a new record with the next id. No link is ever removed.

use std::collections::HashMap;

use crate::error::{AppError, Result};
use crate::models::{NewsItem, NewsRecord};

/// Result of merging one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Full collection: untouched records first in their original order,
    /// then newly inserted ones in batch order.
    pub records: Vec<NewsRecord>,
    pub inserted: usize,
    pub updated: usize,
}

/// Overwrites the scalar fields of `record` with those of `item` and adds
/// the item's tags. `id` and `link` are left alone.
pub fn apply_item(record: &mut NewsRecord, item: NewsItem) {
    record.title = item.title;
    record.source = item.source;
    record.published_at = item.published_at;
    record.image_url = item.image_url;
    record.content = item.content;
    record.tags.extend(item.tags);
}

/// Merges `incoming` into `existing`.
///
/// Items are applied in order against the working state, so two items with
/// the same link in one batch produce a single record (the later one wins
/// scalar fields, tags accumulate). Records in `existing` that already share
/// a link are folded into the first of them before the batch is applied.
pub fn merge(existing: Vec<NewsRecord>, incoming: Vec<NewsItem>) -> Result<MergeOutcome> {
    let highest_id = existing.iter().map(|r| r.id).max().unwrap_or(0).max(0);
    let mut next_id = highest_id.checked_add(1);

    let mut records: Vec<NewsRecord> = Vec::with_capacity(existing.len() + incoming.len());
    let mut by_link: HashMap<String, usize> = HashMap::with_capacity(records.capacity());
    for record in existing {
        match by_link.get(&record.link) {
            Some(&idx) => {
                tracing::warn!(
                    link = %record.link,
                    kept_id = records[idx].id,
                    dropped_id = record.id,
                    "Folding duplicate stored record into the first one with the same link"
                );
                fold_record(&mut records[idx], record);
            }
            None => {
                by_link.insert(record.link.clone(), records.len());
                records.push(record);
            }
        }
    }

    let mut inserted = 0;
    let mut updated = 0;

    for item in incoming {
        match by_link.get(&item.link) {
            Some(&idx) => {
                apply_item(&mut records[idx], item);
                updated += 1;
            }
            None => {
                let id = next_id.ok_or(AppError::IdsExhausted)?;
                next_id = id.checked_add(1);
                by_link.insert(item.link.clone(), records.len());
                records.push(item.into_record(id));
                inserted += 1;
            }
        }
    }

    Ok(MergeOutcome {
        records,
        inserted,
        updated,
    })
}

/// Folds a later stored duplicate into `record`: the lower id is kept, the
/// duplicate's scalars win and tags are unioned.
fn fold_record(record: &mut NewsRecord, duplicate: NewsRecord) {
    record.id = record.id.min(duplicate.id);
    record.title = duplicate.title;
    record.source = duplicate.source;
    record.published_at = duplicate.published_at;
    record.image_url = duplicate.image_url;
    record.content = duplicate.content;
    record.tags.extend(duplicate.tags);
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn item(link: &str, tags: &[&str]) -> NewsItem {
        let mut item = NewsItem::new(link).with_tags(tags.iter().copied());
        item.published_at = "2025-01-01T00:00:00+00:00".to_string();
        item
    }

    #[test]
    fn test_insert_into_empty_store() {
        let outcome = merge(Vec::new(), vec![item("a", &["AI"])]).unwrap();

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].id, 1);
        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.updated, 0);
    }

    #[test]
    fn test_update_unions_tags_and_keeps_id() {
        let existing = vec![item("a", &["AI"]).into_record(1)];
        let outcome = merge(existing, vec![item("a", &["ML"])]).unwrap();

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].id, 1);
        assert!(outcome.records[0].has_tag("AI"));
        assert!(outcome.records[0].has_tag("ML"));
        assert_eq!(outcome.inserted, 0);
        assert_eq!(outcome.updated, 1);
    }

    #[test]
    fn test_duplicate_links_within_batch_collapse() {
        let outcome = merge(
            Vec::new(),
            vec![item("a", &[]), item("a", &[]).with_title("v2")],
        )
        .unwrap();

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].title, "v2");
        assert_eq!(outcome.records[0].id, 1);
        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.updated, 1);
    }

    #[test]
    fn test_scalars_are_last_write_wins() {
        let mut first = item("a", &["AI"]);
        first.content = "old".to_string();
        first.image_url = "old.png".to_string();
        let existing = merge(Vec::new(), vec![first]).unwrap().records;

        let mut second = item("a", &[]);
        second.content = "new".to_string();
        second.published_at = "2025-06-01T00:00:00+00:00".to_string();
        let outcome = merge(existing, vec![second]).unwrap();

        let record = &outcome.records[0];
        assert_eq!(record.content, "new");
        assert_eq!(record.image_url, "");
        assert_eq!(record.published_at, "2025-06-01T00:00:00+00:00");
        assert!(record.has_tag("AI"));
    }

    #[test]
    fn test_ids_continue_after_highest_existing_id() {
        let existing = vec![
            item("a", &[]).into_record(3),
            item("b", &[]).into_record(9),
        ];
        let outcome = merge(existing, vec![item("c", &[]), item("d", &[])]).unwrap();

        let ids: Vec<i64> = outcome.records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 9, 10, 11]);
    }

    #[test]
    fn test_stored_duplicate_links_are_folded() {
        let existing = vec![
            item("a", &["x"]).into_record(1),
            item("a", &["y"]).with_title("later").into_record(2),
            item("b", &[]).into_record(3),
        ];
        let outcome = merge(existing, vec![item("a", &["z"]), item("c", &[])]).unwrap();

        let a: Vec<&NewsRecord> = outcome.records.iter().filter(|r| r.link == "a").collect();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].id, 1);
        assert_eq!(
            a[0].tags.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["x", "y", "z"]
        );
        assert_eq!(outcome.updated, 1);

        // The dropped id is not handed out again.
        let c = outcome.records.iter().find(|r| r.link == "c").unwrap();
        assert_eq!(c.id, 4);
    }

    #[test]
    fn test_id_overflow_is_an_error() {
        let existing = vec![item("a", &[]).into_record(i64::MAX)];

        let updated = merge(existing.clone(), vec![item("a", &["AI"])]).unwrap();
        assert_eq!(updated.records[0].id, i64::MAX);

        let err = merge(existing, vec![item("b", &[])]).unwrap_err();
        assert!(matches!(err, AppError::IdsExhausted));
    }

    #[test]
    fn test_untouched_records_are_carried_through() {
        let existing = vec![
            item("a", &["AI"]).into_record(1),
            item("b", &["ML"]).into_record(2),
        ];
        let outcome = merge(existing.clone(), vec![item("c", &[])]).unwrap();

        assert_eq!(&outcome.records[..2], &existing[..]);
    }

    #[test]
    fn test_links_stay_unique() {
        let batch = vec![
            item("a", &["x"]),
            item("b", &["y"]),
            item("a", &["z"]),
            item("c", &[]),
            item("b", &[]),
        ];
        let outcome = merge(vec![item("c", &["w"]).into_record(1)], batch).unwrap();

        let links: HashSet<&str> = outcome.records.iter().map(|r| r.link.as_str()).collect();
        assert_eq!(links.len(), outcome.records.len());
        assert_eq!(outcome.records.len(), 3);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let existing = vec![item("a", &["AI"]).into_record(1)];
        let batch = vec![
            item("a", &["ML"]),
            item("b", &["AI"]),
            item("b", &["深度学习"]),
        ];

        let once = merge(existing, batch.clone()).unwrap();
        let twice = merge(once.records.clone(), batch).unwrap();

        assert_eq!(twice.records, once.records);
        assert_eq!(twice.inserted, 0);
        assert_eq!(twice.updated, 3);
    }

    #[test]
    fn test_ids_stable_and_tags_monotonic_across_merges() {
        let mut state = merge(Vec::new(), vec![item("a", &["AI"]), item("b", &["ML"])])
            .unwrap()
            .records;
        let batches = vec![
            vec![item("b", &["x"]), item("c", &[])],
            vec![item("a", &[]), item("c", &["y"])],
            vec![item("d", &["AI"]), item("a", &["z"])],
        ];

        for batch in batches {
            let before = state.clone();
            state = merge(state, batch).unwrap().records;
            for old in &before {
                let new = state
                    .iter()
                    .find(|r| r.link == old.link)
                    .expect("records are never dropped");
                assert_eq!(new.id, old.id);
                assert!(new.tags.is_superset(&old.tags));
            }
        }

        let ids: HashSet<i64> = state.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), state.len());
    }

    #[test]
    fn test_empty_batch_leaves_collection_unchanged() {
        let existing = vec![item("a", &["AI"]).into_record(1)];
        let outcome = merge(existing.clone(), Vec::new()).unwrap();

        assert_eq!(outcome.records, existing);
        assert_eq!(outcome.inserted + outcome.updated, 0);
    }
}
