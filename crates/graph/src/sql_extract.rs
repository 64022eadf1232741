use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

lazy_static! {
    // Matches `FROM foo`, `JOIN foo`, `from "foo"`, `join schema.foo AS f`,
    // case-insensitively, capturing the (possibly schema-qualified, possibly
    // quoted) name. Quoted identifiers may contain spaces.
    static ref TABLE_REF_RE: Regex = Regex::new(
        r#"(?i)\b(?:FROM|JOIN)\s+(?:"([^"]+)"|([\w\.]+))"#
    ).unwrap();

    static ref CTE_NAME_RE: Regex = Regex::new(
        r#"(?i)\bWITH\s+(\w+)\s+AS\s*\("#
    ).unwrap();

    static ref RESERVED: BTreeSet<&'static str> = {
        ["LATERAL", "UNNEST", "ONLY"].into_iter().collect()
    };
}

/// Conservative, regex-based extraction of table names referenced by a raw
/// SQL query's `FROM`/`JOIN` clauses (spec §4.1: "a conservative, best-effort
/// parse of FROM/JOIN clauses is sufficient; the Dependency Graph Service is
/// not expected to fully parse SQL"). Names introduced by a `WITH ... AS (`
/// CTE are excluded, since they reference an expression in the same query
/// rather than another entity's materialized table. Schema qualification and
/// quoting are stripped; the result is sorted and deduplicated.
pub fn extract_table_names(query: &str) -> Vec<String> {
    let cte_names: BTreeSet<String> = CTE_NAME_RE
        .captures_iter(query)
        .map(|c| c[1].to_ascii_lowercase())
        .collect();

    let mut found: BTreeSet<String> = BTreeSet::new();
    for caps in TABLE_REF_RE.captures_iter(query) {
        let raw = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        let bare = raw.rsplit('.').next().unwrap_or(raw);
        if bare.is_empty() || RESERVED.contains(bare.to_ascii_uppercase().as_str()) {
            continue;
        }
        if cte_names.contains(&bare.to_ascii_lowercase()) {
            continue;
        }
        found.insert(bare.to_string());
    }
    found.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_simple_from() {
        let names = extract_table_names("SELECT * FROM locations");
        assert_eq!(names, vec!["locations"]);
    }

    #[test]
    fn extracts_joins_and_strips_schema() {
        let names = extract_table_names(
            "SELECT a.* FROM public.sites a JOIN public.regions r ON a.region_id = r.id",
        );
        assert_eq!(names, vec!["regions", "sites"]);
    }

    #[test]
    fn excludes_cte_names() {
        let query = "WITH recent AS (SELECT * FROM events) SELECT * FROM recent JOIN users u ON true";
        let names = extract_table_names(query);
        assert_eq!(names, vec!["events", "users"]);
    }

    #[test]
    fn handles_quoted_identifiers() {
        let names = extract_table_names(r#"SELECT * FROM "Order Items""#);
        assert_eq!(names, vec!["Order Items"]);
    }
}
