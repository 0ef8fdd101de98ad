use pdfsense::config::Config;

#[test]
fn parse_example_config() {
    let raw = include_str!("../pdfsense.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.limits.max_pages, 50);
    assert_eq!(cfg.ranking.tfidf_max_features, 5000);
    assert_eq!(cfg.headings.furniture.patterns.len(), 3);
    assert!(!cfg.paths.out_dir.is_empty());
}

#[test]
fn example_config_matches_defaults() {
    let raw = include_str!("../pdfsense.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(
        serde_json::to_value(&cfg).unwrap(),
        serde_json::to_value(Config::default()).unwrap()
    );
}

#[test]
fn missing_sections_fall_back_to_defaults() {
    let raw = r#"
[output]
ranking_filename = "challenge1b_output.json"
include_scores = false
write_timestamp = false
"#;
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert!(!cfg.output.write_timestamp);
    assert_eq!(cfg.output.ranking_filename, "challenge1b_output.json");
    assert_eq!(cfg.segmenter.title_max_chars, 100);
    assert_eq!(cfg.embedding.max_sequence_length, 256);
    assert!(cfg.headings.tables.enabled);
}

#[test]
fn furniture_patterns_compile() {
    let cfg = Config::default();
    for p in &cfg.headings.furniture.patterns {
        regex::Regex::new(p).expect("valid regex");
    }
}

#[test]
fn partial_section_keeps_other_defaults() {
    let raw = "[ranking]\nmax_subsections = 3\n";
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.ranking.max_subsections, 3);
    assert_eq!(cfg.ranking.query_keywords, 10);
    assert_eq!(cfg.ranking.min_subsection_chars, 50);
}
