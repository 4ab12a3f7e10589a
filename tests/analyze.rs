use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Value};
use techscan::{HtmlPage, RuleLoader, TechDetector, TechnologyReport};

fn detector(technologies: Value, categories: Value) -> TechDetector {
    let rule_lib = RuleLoader::from_value(json!({
        "categories": categories,
        "technologies": technologies,
    }))
    .unwrap();
    TechDetector::from_rule_library(&rule_lib)
}

fn page(html: &str) -> HtmlPage {
    HtmlPage::new("http://example.com", html, Vec::<(String, String)>::new())
}

fn names(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn empty_database_detects_nothing() {
    let detector = detector(json!({}), json!({}));
    let page = HtmlPage::new(
        "http://example.com",
        "<html><script src='/jquery.js'></script></html>",
        [("Server", "nginx")],
    );
    assert!(detector.analyze(&page).is_empty());
}

#[test]
fn cyclic_implies_are_closed() {
    let detector = detector(
        json!({
            "a": {"html": "aaa", "implies": "b"},
            "b": {"implies": "c"},
            "c": {"implies": "a"},
        }),
        json!({}),
    );
    assert_eq!(detector.analyze(&page("<p>aaa</p>")), names(&["a", "b", "c"]));
}

#[test]
fn implies_below_threshold_are_skipped() {
    let detector = detector(
        json!({
            "a": {"html": "aaa", "implies": ["b\\;confidence:30", "c\\;confidence:70"]},
            "b": {},
            "c": {},
        }),
        json!({}),
    );
    assert_eq!(detector.analyze(&page("aaa")), names(&["a", "c"]));
}

#[test]
fn wordpress_meta_version_and_categories() {
    let detector = detector(
        json!({
            "WordPress": {
                "cats": [1, 11],
                "meta": {"generator": "^WordPress ?([\\d.]+)?\\;version:\\1"},
                "implies": ["PHP", "MySQL"],
            },
            "PHP": {"cats": [27]},
            "MySQL": {"cats": [34]},
        }),
        json!({
            "1": {"name": "CMS"},
            "11": {"name": "Blogs"},
            "27": {"name": "Programming languages"},
            "34": {"name": "Databases"},
        }),
    );
    let page = page(r#"<html><head><meta name="generator" content="WordPress 5.4.2"></head></html>"#);

    let results = detector.analyze_with_versions_and_categories(&page);
    assert_eq!(
        results["WordPress"],
        TechnologyReport {
            versions: Some(vec!["5.4.2".to_string()]),
            categories: Some(vec!["CMS".to_string(), "Blogs".to_string()]),
        }
    );
    assert_eq!(results["PHP"].versions, Some(Vec::new()));
    assert_eq!(results["MySQL"].categories, Some(vec!["Databases".to_string()]));

    let output = serde_json::to_value(&results).unwrap();
    assert_eq!(
        output["WordPress"],
        json!({"versions": ["5.4.2"], "categories": ["CMS", "Blogs"]})
    );
}

#[test]
fn only_versioned_pattern_contributes_version() {
    let detector = detector(
        json!({
            "jQuery": {
                "scripts": [
                    "jquery-ui",
                    "jquery-([\\d.]+)\\.min\\.js\\;version:\\1",
                    "zepto-decoy",
                ],
            },
        }),
        json!({}),
    );
    let page = page(r#"<script src="/js/jquery-3.5.1.min.js"></script>"#);

    let results = detector.analyze_with_versions(&page);
    assert_eq!(results.len(), 1);
    assert_eq!(results["jQuery"].versions, Some(vec!["3.5.1".to_string()]));
    assert_eq!(results["jQuery"].categories, None);
    assert_eq!(detector.get_confidence("http://example.com", "jQuery"), Some(100));
}

#[test]
fn categories_only_for_detected_technologies() {
    let detector = detector(
        json!({
            "a": {"html": "aaa", "cats": [1]},
            "b": {"html": "bbb", "cats": [1, 2]},
        }),
        json!({"1": {"name": "cat1"}}),
    );

    let results = detector.analyze_with_categories(&page("<html>aaa</html>"));
    let expected = BTreeMap::from([(
        "a".to_string(),
        TechnologyReport {
            versions: None,
            categories: Some(vec!["cat1".to_string()]),
        },
    )]);
    assert_eq!(results, expected);
    assert_eq!(serde_json::to_value(&results).unwrap(), json!({"a": {"categories": ["cat1"]}}));
}

#[test]
fn dom_exists_only_selector() {
    let detector = detector(json!({"a": {"dom": ".aaa"}, "b": {"dom": [".x", "#bbb"]}}), json!({}));

    assert_eq!(detector.analyze(&page(r#"<div class="aaa">x</div>"#)), names(&["a"]));
    assert_eq!(detector.analyze(&page(r#"<div id="bbb"></div>"#)), names(&["b"]));
    assert!(detector.analyze(&page(r#"<div class="bbb"></div>"#)).is_empty());
}

#[test]
fn dom_attribute_and_text_patterns() {
    let detector = detector(
        json!({
            "attr": {"dom": {"#id": {"attributes": {"onclick": "fooScript.*"}}}},
            "text": {"dom": {"p.version": {"text": "release ([\\d.]+)\\;version:\\1"}}},
        }),
        json!({}),
    );

    let hit = HtmlPage::new(
        "http://dom.example",
        r#"<a id="id" onclick="fooScript()">x</a><p class="version">release 2.1</p>"#,
        Vec::<(String, String)>::new(),
    );
    assert_eq!(detector.analyze(&hit), names(&["attr", "text"]));
    assert_eq!(detector.get_versions("http://dom.example", "text"), vec!["2.1".to_string()]);

    assert!(detector.analyze(&page(r#"<a id="id" onclick="barScript()">x</a>"#)).is_empty());
    assert!(detector.analyze(&page(r#"<a id="other" onclick="fooScript()">x</a>"#)).is_empty());
}

#[test]
fn repeated_analysis_does_not_inflate_confidence() {
    let detector = detector(
        json!({"Nginx": {"headers": {"Server": "nginx(?:/([\\d.]+))?\\;version:\\1\\;confidence:60"}}}),
        json!({}),
    );
    let page = HtmlPage::new("http://example.com", "", [("server", "nginx/1.21.6")]);

    detector.analyze(&page);
    detector.analyze(&page);
    assert_eq!(detector.get_confidence("http://example.com", "Nginx"), Some(60));
    assert_eq!(detector.get_versions("http://example.com", "Nginx"), vec!["1.21.6".to_string()]);
}

#[test]
fn bare_meta_equals_generator_meta() {
    let bare = detector(json!({"a": {"meta": "^Hugo ([\\d.]+)\\;version:\\1"}}), json!({}));
    let keyed = detector(
        json!({"a": {"meta": {"generator": "^Hugo ([\\d.]+)\\;version:\\1"}}}),
        json!({}),
    );
    let page = page(r#"<meta name="generator" content="Hugo 0.88.1">"#);

    assert_eq!(
        bare.analyze_with_versions(&page),
        keyed.analyze_with_versions(&page)
    );
    assert_eq!(bare.analyze(&page), names(&["a"]));
}

#[test]
fn url_match_alone_detects() {
    let detector = detector(json!({"Shopify": {"url": "^https?://[^/]+\\.myshopify\\.com"}}), json!({}));
    let page = HtmlPage::new("https://store.myshopify.com/", "", Vec::<(String, String)>::new());
    assert_eq!(detector.analyze(&page), names(&["Shopify"]));
}

#[test]
fn invalid_pattern_never_matches() {
    let detector = detector(
        json!({
            "broken": {"html": "(unclosed x"},
            "ok": {"html": "x"},
        }),
        json!({}),
    );
    assert_eq!(detector.analyze(&page("(unclosed x")), names(&["ok"]));
    assert!(detector.database().fingerprint("broken").is_some());
}

#[test]
fn lookaround_signatures_match() {
    let detector = detector(
        json!({
            "jQuery": {"scripts": "jquery(?!-migrate)[.-]"},
            "jQuery Migrate": {"scripts": "jquery-migrate(?:-([\\d.]+))?(?<=\\d)\\.js\\;version:\\1"},
        }),
        json!({}),
    );

    assert_eq!(
        detector.analyze(&page(r#"<script src="/js/jquery.min.js"></script>"#)),
        names(&["jQuery"])
    );

    let hit = HtmlPage::new(
        "http://migrate.example",
        r#"<script src="/js/jquery-migrate-3.4.1.js"></script>"#,
        Vec::<(String, String)>::new(),
    );
    assert_eq!(detector.analyze(&hit), names(&["jQuery Migrate"]));
    assert_eq!(
        detector.get_versions("http://migrate.example", "jQuery Migrate"),
        vec!["3.4.1".to_string()]
    );
}
