pub mod internal;
pub mod raw;

#[test]
fn can_parse_the_example_file() {
    let demo_config_file = include_bytes!("../../webhook_gate_demo_config.yml");

    let config = crate::raw::ConfigFile::parse_from_reader(&demo_config_file[..]).unwrap();

    assert_eq!(config.route.path, "/github");
    assert_eq!(config.route.pipeline[0].uses, "validate_github");
}
