use std::fs;
use std::thread;
use std::time::Duration;

use markdown_weaver_config::Config;
use markdown_weaver_engine::numbering::Counters;
use markdown_weaver_engine::renderers::number;
use markdown_weaver_engine::{
    Converter, ConverterBuilder, EngineError, Kernel, NumberingMode, split_label,
};
use pretty_assertions::assert_eq;
use regex::Regex;
use rstest::rstest;
use tempfile::TempDir;

/// Answers the few expressions the documents below evaluate.
struct StubKernel;

impl Kernel for StubKernel {
    fn execute(&mut self, _language: &str, code: &str) -> anyhow::Result<String> {
        match code.trim() {
            "2*3" => Ok("6\n".to_string()),
            "1+1" => Ok("2\n".to_string()),
            other => anyhow::bail!("cannot evaluate {other}"),
        }
    }
}

fn standard(config: &Config) -> Converter {
    ConverterBuilder::standard(Box::new(StubKernel))
        .unwrap()
        .build(config)
        .unwrap()
}

fn strip_tags(output: &str) -> String {
    Regex::new(r"(<.*?>)|\n")
        .unwrap()
        .replace_all(output, "")
        .into_owned()
}

#[test]
fn scenario_notebook_then_numbering() {
    let mut converter = standard(&Config::default());
    let source = "abd\n# a\n## b\n```python\n2*3\n```\n";

    let output = converter.convert(source, None).unwrap();

    assert_eq!(strip_tags(&output), "abd# 1. a## 1.1. b2*36");
    assert!(output.contains("<div class=\"cell jupyter output\"><pre>6</pre></div>"));
}

#[test]
fn scenario_cached_page_keeps_timestamp() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("index.md");
    fs::write(&path, "# Title\n\nText {{1+1}}\n").unwrap();
    let mut converter = standard(&Config::default());

    let first = converter.convert_from_file(&path, None).unwrap();
    assert!(!first.cached);
    let first_time = first.page.converted_time();
    let first_output = first.output().to_string();

    thread::sleep(Duration::from_millis(10));
    let second = converter.convert_from_file(&path, None).unwrap();
    assert!(second.cached);
    assert_eq!(second.page.converted_time(), first_time);
    assert_eq!(second.output(), first_output);

    converter.set_dirty(true);
    thread::sleep(Duration::from_millis(10));
    let third = converter.convert_from_file(&path, None).unwrap();
    assert!(!third.cached);
    assert!(third.page.converted_time() > first_time);
    assert_eq!(third.output(), first_output);
}

#[test]
fn scenario_split_label() {
    assert_eq!(
        split_label("{#mylabel#} text"),
        ("text".to_string(), "mylabel".to_string())
    );
    assert_eq!(split_label("text"), ("text".to_string(), String::new()));
}

#[rstest]
#[case("")]
#[case("plain text without any markers\n")]
#[case("# Title\n\n```python\n2*3\n```\n{{1+1}} {#ref#}\n")]
fn empty_pipeline_is_identity(#[case] source: &str) {
    let mut converter = ConverterBuilder::new()
        .register("main", Vec::new())
        .unwrap()
        .build(&Config::default())
        .unwrap();
    assert_eq!(converter.convert(source, None).unwrap(), source);
}

#[test]
fn disabled_renderers_are_identity() {
    let config = Config::from_toml(
        "[renderers.jupyter]\nenabled = false\n\
         [renderers.number]\nenabled = false\n\
         [renderers.linker]\nenabled = false\n",
    )
    .unwrap();
    let mut converter = standard(&config);
    let source = "# Title\n\n```python\n2*3\n```\n{#ref#}\n";

    assert_eq!(converter.convert(source, None).unwrap(), source);
}

#[test]
fn references_resolve_across_parsers() {
    let mut converter = standard(&Config::default());
    let source = "# Intro {#intro#}\n\n#Fig Plot {#plot#}\n![img](a.png)\n\nSee {#plot#} in {#intro#}.\n";

    let output = converter.convert(source, None).unwrap();

    assert!(output.contains(
        "<a href=\"#weaver-number-plot\" class=\"weaver-link weaver-link-figure\">Figure 1</a>"
    ));
    assert!(output.contains(
        "<a href=\"#weaver-number-intro\" class=\"weaver-link weaver-link-header\">1</a>"
    ));
    assert!(!output.contains("unresolved"));
}

#[test]
fn fenced_headers_are_not_numbered() {
    let mut converter = standard(&Config::default());
    let source = "```rust\n# not a header\n```\n# a\n";

    let output = converter.convert(source, None).unwrap();

    assert!(output.starts_with("```rust\n# not a header\n```\n# <span"));
    assert_eq!(strip_tags(&output), "```rust# not a header```# 1. a");
}

#[test]
fn tilde_fenced_headers_are_not_numbered() {
    let mut converter = standard(&Config::default());
    let source = "~~~\n# not a header\n~~~\n# a\n";

    let output = converter.convert(source, None).unwrap();

    assert!(output.starts_with("~~~\n# not a header\n~~~\n# <span"));
    assert_eq!(strip_tags(&output), "~~~# not a header~~~# 1. a");
}

#[rstest]
#[case("```python\n# comment\n```\n# a\n", "```python# comment```# 1. a")]
#[case("~~~\n# comment\n~~~\n# a\n", "~~~# comment~~~# 1. a")]
fn fences_stay_opaque_without_notebook(#[case] source: &str, #[case] expected: &str) {
    let config = Config::from_toml("[renderers.jupyter]\nenabled = false\n").unwrap();
    let mut converter = standard(&config);

    let output = converter.convert(source, None).unwrap();

    assert_eq!(strip_tags(&output), expected);
}

#[test]
fn file_conversion_runs_selected_parsers() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("refs.md");
    fs::write(&path, "# Intro {#intro#}\n\nSee {#intro#}.\n").unwrap();
    let mut converter = standard(&Config::default());

    let numbered = converter.convert_from_file(&path, Some(&["main"])).unwrap();
    assert!(numbered.output().contains("See {#intro#}."));

    let linked = converter
        .convert_from_output(&path, Some(&["link"]))
        .unwrap();
    assert!(linked.contains("<a href=\"#weaver-number-intro\""));
}

#[test]
fn malformed_numbering_config_is_rejected() {
    let config = Config::from_toml("[renderers.number]\nparent = ['one']\n").unwrap();
    let result = ConverterBuilder::standard(Box::new(StubKernel))
        .unwrap()
        .build(&config);
    assert!(matches!(
        result,
        Err(EngineError::InvalidSetting { key, .. }) if key == "parent"
    ));
}

#[test]
fn numbering_follows_config() {
    let config = Config::from_toml("[renderers.number]\nstart_level = 2\n").unwrap();
    let mut converter = standard(&config);

    let output = converter.convert("# a\n## b\n## c\n", None).unwrap();

    assert_eq!(strip_tags(&output), "# a## 1. b## 2. c");
}

#[test]
fn conflicting_numbering_config_is_rejected() {
    let config =
        Config::from_toml("[renderers.number]\nstart_level = 2\nparent = [1]\n").unwrap();
    let result = ConverterBuilder::standard(Box::new(StubKernel))
        .unwrap()
        .build(&config);
    assert!(matches!(result, Err(EngineError::ConflictingNumbering)));
}

#[test]
fn kernel_failure_leaves_no_page() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.md");
    fs::write(&path, "```python\nundefined()\n```\n").unwrap();
    let mut converter = standard(&Config::default());

    let error = converter.convert_from_file(&path, None).unwrap_err();

    assert_eq!(error.to_string(), "cannot evaluate undefined()");
    assert!(converter.page(&path).is_none());
}

#[test]
fn extra_html_is_collected_for_notebook_pages() {
    let dir = TempDir::new().unwrap();
    let with_code = dir.path().join("code.md");
    let without_code = dir.path().join("text.md");
    fs::write(&with_code, "{{2*3}}\n").unwrap();
    fs::write(&without_code, "text\n").unwrap();
    let mut converter = standard(&Config::default());

    converter.convert_from_file(&with_code, None).unwrap();
    converter.convert_from_file(&without_code, None).unwrap();

    let page = converter.page(&with_code).unwrap();
    assert_eq!(
        page.meta.extra_html,
        "<link rel=\"stylesheet\" href=\"css/jupyter.css\">"
    );
    assert_eq!(converter.page(&without_code).unwrap().meta.extra_html, "");
}

#[test]
fn duplicate_labels_are_flagged() {
    let (_, labels) = number::convert(
        "# A {#same#}\n# B {#same#}\n",
        NumberingMode::default(),
    )
    .unwrap();

    assert_eq!(labels.duplicates(), ["same".to_string()]);
    assert_eq!(labels.get("same").unwrap().number_list, vec![1]);
}

/// After a header at depth `d`, deeper counters are zero and shallower
/// ones are untouched.
#[rstest]
#[case(&[0, 1, 2, 1, 2, 0, 1])]
#[case(&[2, 2, 0, 3, 1, 5])]
#[case(&[5, 4, 3, 2, 1, 0])]
fn counters_reset_below_each_header(#[case] depths: &[usize]) {
    let mut counters = Counters::new();
    let mut expected = [0u32; 6];
    for &depth in depths {
        let numbers = counters.step("header", depth);
        expected[depth] += 1;
        for deeper in &mut expected[depth + 1..] {
            *deeper = 0;
        }
        assert_eq!(numbers, expected[..=depth].to_vec());
        assert_eq!(counters.get("header"), Some(&expected));
    }
}

#[test]
fn document_headers_match_counter_model() {
    let (output, _) = number::convert(
        "# a\n## b\n### c\n## d\n### e\n# f\n## g\n",
        NumberingMode::default(),
    )
    .unwrap();
    assert_eq!(
        strip_tags(&output),
        "# 1. a## 1.1. b### 1.1.1. c## 1.2. d### 1.2.1. e# 2. f## 2.1. g"
    );
}
