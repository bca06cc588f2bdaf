use portprobe::ports::{parse_port_spec, ports_for_mode, COMMON_PORTS};
use portprobe::ScanMode;
use std::collections::HashSet;

#[test]
fn mode_sizes_match_their_definitions() {
    assert_eq!(ports_for_mode(ScanMode::WellKnown).len(), 1024);
    assert_eq!(ports_for_mode(ScanMode::Common).len(), COMMON_PORTS.len());
    assert_eq!(ports_for_mode(ScanMode::All).len(), 65535);
}

#[test]
fn generated_sets_have_no_duplicates_and_no_zero() {
    for mode in [ScanMode::WellKnown, ScanMode::Common, ScanMode::All] {
        let ports = ports_for_mode(mode);
        let unique: HashSet<_> = ports.iter().collect();
        assert_eq!(unique.len(), ports.len(), "{mode:?} has duplicates");
        assert!(!ports.contains(&0));
    }
}

#[test]
fn common_list_is_deduplicated() {
    assert_eq!(COMMON_PORTS.len(), 61);
    assert_eq!(COMMON_PORTS.iter().filter(|&&p| p == 12345).count(), 1);
}

#[test]
fn numeric_mode_aliases_parse() {
    use clap::ValueEnum;
    assert_eq!(ScanMode::from_str("1", false).unwrap(), ScanMode::WellKnown);
    assert_eq!(ScanMode::from_str("2", false).unwrap(), ScanMode::Common);
    assert_eq!(ScanMode::from_str("3", false).unwrap(), ScanMode::All);
    assert_eq!(ScanMode::from_str("well-known", false).unwrap(), ScanMode::WellKnown);
}

#[test]
fn parse_spec_keeps_first_appearance() {
    let ports = parse_port_spec("22, 80,443,8000-8002,8001").expect("parse ok");
    assert_eq!(ports, vec![22, 80, 443, 8000, 8001, 8002]);
}

#[test]
fn invalid_port_rejected() {
    assert!(parse_port_spec("0").is_err());
    assert!(parse_port_spec("http").is_err());
}
