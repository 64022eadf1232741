use std::collections::{HashMap, HashSet};
use std::time::Instant;

use model::{Cardinality, Entity, EntityName, ForeignKey, How, Severity, ValidationIssue};
use tables::{Table, TableStore, Value};

use crate::error::IdentityError;
use crate::stats::FkStats;

pub struct LinkOutcome {
    pub table: Table,
    pub stats: FkStats,
    pub issues: Vec<ValidationIssue>,
}

/// Caps on how many matches a local (`local_cap`) or remote (`remote_cap`)
/// row may keep, per `Constraints::cardinality`. `None` means unbounded.
struct Caps {
    local_cap: Option<usize>,
    remote_cap: Option<usize>,
}

fn caps_for(cardinality: Cardinality) -> Caps {
    match cardinality {
        Cardinality::ManyToOne => Caps {
            local_cap: Some(1),
            remote_cap: None,
        },
        Cardinality::OneToOne => Caps {
            local_cap: Some(1),
            remote_cap: Some(1),
        },
        Cardinality::OneToMany => Caps {
            local_cap: None,
            remote_cap: None,
        },
    }
}

/// The Linker (C5), applied to one foreign key of one entity (spec §4.4).
/// `local` is the child's transformed, pre-link table; `parent_entity` is
/// the FK's target entity definition (needed for its `public_id`/`system_id`
/// column names); `store` supplies the parent's already-materialized table.
pub fn link(
    child: &EntityName,
    fk: &ForeignKey,
    local: Table,
    parent_entity: &Entity,
    store: &TableStore,
) -> Result<LinkOutcome, IdentityError> {
    let start = Instant::now();
    let mut issues = Vec::new();

    let remote = store
        .try_get(&fk.entity)
        .ok_or_else(|| IdentityError::ParentNotReady(fk.entity.clone()))?;

    // Step 2: reduce R to remote_keys + public_id (carrying system_id) + extra_columns.
    let mut wanted = fk.remote_keys.clone();
    if !wanted.contains(&parent_entity.public_id) {
        wanted.push(parent_entity.public_id.clone());
    }
    for col in &fk.extra_columns {
        if !wanted.contains(col) {
            wanted.push(col.clone());
        }
    }
    let reduced_remote = remote.project(&wanted).map_err(|_| IdentityError::ColumnNotFound {
        entity: fk.entity.clone(),
        column: wanted
            .iter()
            .find(|c| remote.column_index(c).is_none())
            .cloned()
            .unwrap_or_else(|| parent_entity.public_id.clone()),
    })?;

    let local_key_idx = column_indices(&local, &fk.local_keys, child)?;
    let remote_key_idx = column_indices(&reduced_remote, &fk.remote_keys, &fk.entity)?;
    let public_id_idx = reduced_remote
        .column_index(&parent_entity.public_id)
        .expect("public_id was just projected in");

    // Step 3: uniqueness constraints are a hard failure of this FK link.
    if fk.constraints.require_unique_left {
        check_unique(&local, &local_key_idx, child, &fk.entity, "local")?;
    }
    if fk.constraints.require_unique_right {
        check_unique(&reduced_remote, &remote_key_idx, child, &fk.entity, "remote")?;
    }

    // Step 4: null-key policy. `allow_null_keys == false` drops offending
    // rows with a warning rather than failing the whole entity, consistent
    // with this crate's per-entity failure isolation elsewhere.
    let local = if fk.constraints.allow_null_keys {
        local
    } else {
        let (kept, dropped) = drop_null_key_rows(local, &local_key_idx)?;
        if dropped > 0 {
            issues.push(
                ValidationIssue::new(
                    Severity::Warning,
                    model::Category::Data,
                    model::Priority::Medium,
                    "NULL_FK_KEY_DROPPED",
                    format!(
                        "{dropped} row(s) dropped: null value in local_keys for foreign key to {:?}, which disallows null keys",
                        fk.entity
                    ),
                )
                .with_entity(child.clone()),
            );
        }
        kept
    };

    let caps = caps_for(fk.constraints.cardinality);

    let remote_index = build_index(&reduced_remote, &remote_key_idx);

    let mut claimed_remote: HashSet<usize> = HashSet::new();
    let mut matched_remote: HashSet<usize> = HashSet::new();
    let mut violations: usize = 0;

    // pairs: (local row index, remote row index), either side `None` for an
    // unmatched row that must still surface depending on `how`.
    let mut pairs: Vec<(Option<usize>, Option<usize>)> = Vec::new();

    if fk.how == How::Cross {
        for l in 0..local.len() {
            for r in 0..reduced_remote.len() {
                pairs.push((Some(l), Some(r)));
            }
        }
    } else {
        for l in 0..local.len() {
            let key = local_key_tuple(&local, l, &local_key_idx);
            let candidates: Vec<usize> = match key {
                Some(k) => remote_index.get(&k).cloned().unwrap_or_default(),
                None => Vec::new(),
            };

            let capped: Vec<usize> = match caps.local_cap {
                Some(cap) if candidates.len() > cap => {
                    violations += candidates.len() - cap;
                    candidates[..cap].to_vec()
                }
                _ => candidates,
            };

            let mut used_any = false;
            for r in capped {
                if caps.remote_cap.is_some() {
                    if claimed_remote.contains(&r) {
                        violations += 1;
                        continue;
                    }
                    claimed_remote.insert(r);
                }
                matched_remote.insert(r);
                pairs.push((Some(l), Some(r)));
                used_any = true;
            }
            if !used_any {
                pairs.push((Some(l), None));
            }
        }

        if matches!(fk.how, How::Right | How::Outer) {
            for r in 0..reduced_remote.len() {
                if !matched_remote.contains(&r) {
                    pairs.push((None, Some(r)));
                }
            }
        }
    }

    // Step 8 (filter by `how`): drop the unmatched shapes each join style
    // doesn't keep.
    let pairs: Vec<(Option<usize>, Option<usize>)> = pairs
        .into_iter()
        .filter(|(l, r)| match fk.how {
            How::Inner => l.is_some() && r.is_some(),
            How::Left => l.is_some(),
            How::Right => r.is_some(),
            How::Outer | How::Cross => true,
        })
        .collect();

    let matched = pairs.iter().filter(|(l, r)| l.is_some() && r.is_some()).count();
    let unmatched_left = pairs.iter().filter(|(l, r)| l.is_some() && r.is_none()).count();
    let unmatched_right = pairs.iter().filter(|(l, r)| l.is_none() && r.is_some()).count();

    if unmatched_left > 0 {
        issues.push(
            ValidationIssue::new(
                Severity::Warning,
                model::Category::Data,
                model::Priority::Medium,
                "UNMATCHED_FK_ROW",
                format!(
                    "{unmatched_left} row(s) had no matching parent in {:?} for foreign key {:?}; the {:?} column is null",
                    fk.entity, fk.local_keys, parent_entity.public_id
                ),
            )
            .with_entity(child.clone()),
        );
    }
    if violations > 0 {
        issues.push(
            ValidationIssue::new(
                Severity::Error,
                model::Category::Data,
                model::Priority::High,
                "CARDINALITY_VIOLATION",
                format!(
                    "{violations} row(s) violated the declared {:?} cardinality for foreign key to {:?}; extra matches were dropped",
                    fk.constraints.cardinality, fk.entity
                ),
            )
            .with_entity(child.clone()),
        );
    }

    // Step 6: rewrite. Output = local columns minus local_keys, plus the
    // parent's public_id column (carrying its system_id), plus extra_columns.
    let kept_local_cols: Vec<usize> = (0..local.columns().len())
        .filter(|i| !local_key_idx.contains(i))
        .collect();

    let mut out_columns: Vec<model::ColumnName> =
        kept_local_cols.iter().map(|&i| local.columns()[i].clone()).collect();
    if !fk.drop_remote_id {
        out_columns.push(parent_entity.public_id.clone());
    }
    let extra_idx: Vec<usize> = fk
        .extra_columns
        .iter()
        .map(|c| reduced_remote.column_index(c).expect("extra_columns was just projected in"))
        .collect();
    out_columns.extend(fk.extra_columns.iter().cloned());

    let mut out = Table::new(out_columns);
    for (l, r) in &pairs {
        let mut row: Vec<Value> = kept_local_cols
            .iter()
            .map(|&i| {
                l.map(|li| local.rows()[li][i].clone())
                    .unwrap_or(Value::Null)
            })
            .collect();
        if !fk.drop_remote_id {
            row.push(
                r.map(|ri| reduced_remote.rows()[ri][public_id_idx].clone())
                    .unwrap_or(Value::Null),
            );
        }
        for &idx in &extra_idx {
            row.push(
                r.map(|ri| reduced_remote.rows()[ri][idx].clone())
                    .unwrap_or(Value::Null),
            );
        }
        out.push_row(row)?;
    }

    Ok(LinkOutcome {
        table: out,
        stats: FkStats {
            matched,
            unmatched_left,
            unmatched_right,
            duplicate_matches: violations,
            elapsed_ms: start.elapsed().as_millis() as u64,
        },
        issues,
    })
}

fn column_indices(
    table: &Table,
    columns: &[model::ColumnName],
    entity: &EntityName,
) -> Result<Vec<usize>, IdentityError> {
    columns
        .iter()
        .map(|c| {
            table.column_index(c).ok_or_else(|| IdentityError::ColumnNotFound {
                entity: entity.clone(),
                column: c.clone(),
            })
        })
        .collect()
}

fn local_key_tuple(table: &Table, row: usize, idx: &[usize]) -> Option<Vec<String>> {
    let r = &table.rows()[row];
    if idx.iter().any(|&i| r[i].is_null()) {
        return None;
    }
    Some(idx.iter().map(|&i| r[i].interpolate()).collect())
}

fn build_index(table: &Table, idx: &[usize]) -> HashMap<Vec<String>, Vec<usize>> {
    let mut index: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
    for r in 0..table.len() {
        if let Some(key) = local_key_tuple(table, r, idx) {
            index.entry(key).or_default().push(r);
        }
    }
    index
}

fn drop_null_key_rows(table: Table, idx: &[usize]) -> Result<(Table, usize), IdentityError> {
    let columns = table.columns().to_vec();
    let mut out = Table::new(columns);
    let mut dropped = 0;
    for row in table.rows() {
        if idx.iter().any(|&i| row[i].is_null()) {
            dropped += 1;
        } else {
            out.push_row(row.clone())?;
        }
    }
    Ok((out, dropped))
}

fn check_unique(
    table: &Table,
    idx: &[usize],
    child: &EntityName,
    parent: &EntityName,
    side: &'static str,
) -> Result<(), IdentityError> {
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut duplicate_count = 0;
    for r in 0..table.len() {
        if let Some(key) = local_key_tuple(table, r, idx) {
            if !seen.insert(key) {
                duplicate_count += 1;
            }
        }
    }
    if duplicate_count > 0 {
        return Err(IdentityError::UniqueConstraintViolation {
            entity: child.clone(),
            parent: parent.clone(),
            side,
            count: duplicate_count,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::ColumnName;

    fn parent_entity(public_id: &str) -> Entity {
        serde_yaml::from_str(&format!("kind: fixed\npublic_id: {public_id}\nvalues: []\n")).unwrap()
    }

    fn fk(remote: &str, how: &str, cardinality: &str) -> ForeignKey {
        serde_yaml::from_str(&format!(
            "entity: {remote}\nlocal_keys: [country_code]\nremote_keys: [code]\nhow: {how}\nconstraints:\n  cardinality: {cardinality}\n"
        ))
        .unwrap()
    }

    fn parent_table() -> Table {
        let mut t = Table::new(vec![ColumnName::new("code"), ColumnName::new("country_id")]);
        t.push_row(vec![Value::Text("NO".into()), Value::Int(1)]).unwrap();
        t.push_row(vec![Value::Text("SE".into()), Value::Int(2)]).unwrap();
        t
    }

    fn local_table() -> Table {
        let mut t = Table::new(vec![ColumnName::new("site"), ColumnName::new("country_code")]);
        t.push_row(vec![Value::Text("Oslo".into()), Value::Text("NO".into())]).unwrap();
        t.push_row(vec![Value::Text("Lund".into()), Value::Text("SE".into())]).unwrap();
        t.push_row(vec![Value::Text("Nowhere".into()), Value::Text("XX".into())]).unwrap();
        t
    }

    #[test]
    fn inner_join_drops_unmatched_and_rewrites_fk_column() {
        let store = TableStore::new(vec![EntityName::new("country")]);
        store.complete(&EntityName::new("country"), parent_table()).unwrap();
        let parent = parent_entity("country_id");
        let foreign_key = fk("country", "inner", "many_to_one");

        let outcome = link(&EntityName::new("site"), &foreign_key, local_table(), &parent, &store).unwrap();
        assert_eq!(outcome.table.len(), 2);
        assert!(outcome.table.has_column(&ColumnName::new("country_id")));
        assert!(!outcome.table.has_column(&ColumnName::new("country_code")));
        assert_eq!(outcome.stats.matched, 2);
        assert_eq!(outcome.stats.unmatched_left, 1);
        assert!(outcome.issues.iter().any(|i| i.code == "UNMATCHED_FK_ROW"));
    }

    #[test]
    fn left_join_keeps_unmatched_rows_with_null_fk() {
        let store = TableStore::new(vec![EntityName::new("country")]);
        store.complete(&EntityName::new("country"), parent_table()).unwrap();
        let parent = parent_entity("country_id");
        let foreign_key = fk("country", "left", "many_to_one");

        let outcome = link(&EntityName::new("site"), &foreign_key, local_table(), &parent, &store).unwrap();
        assert_eq!(outcome.table.len(), 3);
        let idx = outcome.table.column_index(&ColumnName::new("country_id")).unwrap();
        assert_eq!(outcome.table.rows()[2][idx], Value::Null);
    }

    #[test]
    fn one_to_one_keeps_first_match_and_flags_violation() {
        let store = TableStore::new(vec![EntityName::new("country")]);
        let mut parent = Table::new(vec![ColumnName::new("code"), ColumnName::new("country_id")]);
        parent.push_row(vec![Value::Text("NO".into()), Value::Int(1)]).unwrap();
        store.complete(&EntityName::new("country"), parent).unwrap();

        let mut local = Table::new(vec![ColumnName::new("site"), ColumnName::new("country_code")]);
        local.push_row(vec![Value::Text("Oslo".into()), Value::Text("NO".into())]).unwrap();
        local.push_row(vec![Value::Text("Bergen".into()), Value::Text("NO".into())]).unwrap();

        let parent_e = parent_entity("country_id");
        let foreign_key = fk("country", "left", "one_to_one");

        let outcome = link(&EntityName::new("site"), &foreign_key, local, &parent_e, &store).unwrap();
        assert_eq!(outcome.stats.matched, 1);
        assert_eq!(outcome.stats.duplicate_matches, 1);
        assert!(outcome.issues.iter().any(|i| i.code == "CARDINALITY_VIOLATION"));
    }

    #[test]
    fn require_unique_right_fails_the_fk_on_duplicate_remote_keys() {
        let store = TableStore::new(vec![EntityName::new("country")]);
        let mut parent = Table::new(vec![ColumnName::new("code"), ColumnName::new("country_id")]);
        parent.push_row(vec![Value::Text("NO".into()), Value::Int(1)]).unwrap();
        parent.push_row(vec![Value::Text("NO".into()), Value::Int(2)]).unwrap();
        store.complete(&EntityName::new("country"), parent).unwrap();

        let parent_e = parent_entity("country_id");
        let foreign_key: ForeignKey = serde_yaml::from_str(
            "entity: country\nlocal_keys: [country_code]\nremote_keys: [code]\nhow: inner\nconstraints:\n  cardinality: many_to_one\n  require_unique_right: true\n",
        )
        .unwrap();

        let err = link(&EntityName::new("site"), &foreign_key, local_table(), &parent_e, &store).unwrap_err();
        assert!(matches!(err, IdentityError::UniqueConstraintViolation { .. }));
    }
}
