use super::*;
use crate::foundation::core::Vec2i;

fn data_with(names: &[&str]) -> ImageData {
    ImageData {
        channels: names.iter().map(|n| Channel::new(*n, Vec2i::new(1, 1))).collect(),
        ..ImageData::default()
    }
}

fn members(group: &ChannelGroup) -> Vec<&str> {
    group.channels.iter().map(String::as_str).collect()
}

#[test]
fn rgb_with_alpha_and_leftover_depth() {
    let data = data_with(&["R", "G", "B", "A", "Z"]);
    let groups = group_channels(&data, "");
    assert_eq!(groups.len(), 2);
    assert_eq!(members(&groups[0]), vec!["R", "G", "B", "A"]);
    assert_eq!(groups[0].name, "R,G,B,A");
    assert_eq!(members(&groups[1]), vec!["Z", "Z", "Z", "A"]);
    assert_eq!(groups[1].name, "Z,A");
}

#[test]
fn partial_tuples_omit_absent_members() {
    let data = data_with(&["B", "R"]);
    let groups = group_channels(&data, "");
    assert_eq!(groups.len(), 1);
    assert_eq!(members(&groups[0]), vec!["R", "B"]);
}

#[test]
fn single_channels_are_tripled() {
    let data = data_with(&["Y"]);
    let groups = group_channels(&data, "");
    assert_eq!(members(&groups[0]), vec!["Y", "Y", "Y"]);
    assert_eq!(groups[0].name, "Y");
}

#[test]
fn xyz_claims_z_before_the_depth_tuple() {
    let data = data_with(&["X", "Y", "Z", "u", "v", "custom"]);
    let groups = group_channels(&data, "");
    let all: Vec<Vec<&str>> = groups.iter().map(members).collect();
    assert_eq!(
        all,
        vec![
            vec!["X", "Y", "Z"],
            vec!["u", "v"],
            vec!["custom", "custom", "custom"],
        ]
    );
}

#[test]
fn layered_names_are_prefixed_and_parenthesized() {
    let data = data_with(&["diffuse.R", "diffuse.G", "diffuse.B", "diffuse.A", "depth.Z", "R"]);

    let diffuse = group_channels(&data, "diffuse");
    assert_eq!(diffuse.len(), 1);
    assert_eq!(diffuse[0].name, "diffuse.(R,G,B,A)");
    assert_eq!(members(&diffuse[0]), vec!["diffuse.R", "diffuse.G", "diffuse.B", "diffuse.A"]);

    let depth = group_channels(&data, "depth");
    assert_eq!(depth[0].name, "depth.Z");
    assert_eq!(members(&depth[0]), vec!["depth.Z", "depth.Z", "depth.Z"]);

    let root = group_channels(&data, "");
    assert_eq!(root.len(), 1);
    assert_eq!(members(&root[0]), vec!["R", "R", "R"]);
}

#[test]
fn alpha_only_layer_yields_alpha_group() {
    let data = data_with(&["mask.A"]);
    let groups = group_channels(&data, "mask");
    assert_eq!(groups.len(), 1);
    assert_eq!(members(&groups[0]), vec!["mask.A", "mask.A", "mask.A"]);
    assert_eq!(groups[0].name, "mask.A");
}

#[test]
#[should_panic(expected = "produced no channel groups")]
fn empty_layer_is_a_defect() {
    let data = data_with(&["R"]);
    let _ = group_channels(&data, "missing");
}
