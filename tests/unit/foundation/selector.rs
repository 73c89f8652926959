use super::*;

#[test]
fn uppercase_term_matches_case_sensitively() {
    let sel = ChannelSelector::fuzzy("R");
    assert!(sel.matches("layer1.R"));
    assert!(sel.matches("layer2.R"));
    assert!(!sel.matches("layer1.G"));
}

#[test]
fn lowercase_term_ignores_case() {
    assert_eq!(matches_fuzzy("Diffuse.R", "diff"), Some(0));
    assert_eq!(matches_fuzzy("DIFFUSE.R", "dfs"), Some(0));
    assert_eq!(matches_fuzzy("specular.R", "diff"), None);
}

#[test]
fn subsequence_need_not_be_contiguous() {
    assert_eq!(matches_fuzzy("normal.X", "nml"), Some(0));
    assert_eq!(matches_fuzzy("normal.X", "lmn"), None);
}

#[test]
fn rank_is_index_of_first_matching_term() {
    assert_eq!(matches_fuzzy("B", "R,G,B"), Some(2));
    assert_eq!(matches_fuzzy("G", "R, G B"), Some(1));
    assert_eq!(matches_fuzzy("R", "R,G,B"), Some(0));
    assert_eq!(matches_fuzzy("A", "R,G,B"), None);
}

#[test]
fn empty_pattern_matches_everything() {
    assert_eq!(matches_fuzzy("anything", ""), Some(0));
    assert_eq!(matches_fuzzy("anything", " , "), Some(0));
    assert!(ChannelSelector::all().matches("x.y.z"));
    assert!(ChannelSelector::all().is_empty());
}

#[test]
fn regex_mode_ranks_every_match_equally() {
    let sel = ChannelSelector::regex(r"^layer\d\.R$").unwrap();
    assert_eq!(sel.match_rank("layer1.R"), Some(0));
    assert_eq!(sel.match_rank("layer2.R"), Some(0));
    assert_eq!(sel.match_rank("layer1.G"), None);
    assert_eq!(sel.mode(), SelectorMode::Regex);
}

#[test]
fn malformed_regex_is_a_selector_error() {
    let err = ChannelSelector::regex("(unclosed").unwrap_err();
    assert!(matches!(err, IngestError::Selector(_)));
}

#[test]
fn with_pattern_keeps_mode() {
    let sel = ChannelSelector::regex("R").unwrap();
    let other = sel.with_pattern("G").unwrap();
    assert_eq!(other.mode(), SelectorMode::Regex);
    assert_eq!(other.pattern(), "G");
}
