/// Per-FK counters the Normalizer surfaces to the validation and preview
/// subsystems (spec §4.4, final paragraph).
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct FkStats {
    pub matched: usize,
    pub unmatched_left: usize,
    pub unmatched_right: usize,
    pub duplicate_matches: usize,
    pub elapsed_ms: u64,
}
