//! End-to-end rendering over real template trees

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;

use tempstack::{render, Args, Config, Engine, FsLoader, GeneratorRegistry, RenderError, TemplateNode};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// The site tree: nested composition through slots, groups, and params
fn site_tree() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();

    write(
        root,
        "site.gen",
        r#"{
            "site": {
                "title": {"$arg": "title"},
                "style": {
                    "color": {"$apply": "primary"},
                    "darkColor": {"$apply": "dark::primary"}
                },
                "hero": {"$apply": "heroTheme", "args": {"title": {"$arg": "heroTitle"}}}
            }
        }"#,
    );
    write(root, "site/style/color/primary.json", r#""red""#);
    write(root, "site/style/darkColor/.dark/primary.json", r#""darkred""#);
    write(
        root,
        "site/hero/heroTheme.gen",
        r#"{
            "title": {"$arg": "title", "default": "Hero From Template"},
            "theme": {"color": {"$apply": "colors::main"}}
        }"#,
    );
    write(root, "site/hero/theme/color/.colors/main.json", r#""gold""#);
    write(root, "site/style/layout.json", r#"{"layout": "compact"}"#);
    write(
        root,
        "site/params.gen",
        r#"{"flags": {"env": {"$arg": "env"}, "debug": {"$arg": "debug"}}}"#,
    );

    write(root, "config/.only/settings.json", r#"{"mode": "only", "enabled": true}"#);
    write(root, "config/.a/feature.json", r#"{"from": "a"}"#);
    write(root, "config/.b/feature.json", r#"{"from": "b"}"#);

    write(root, "array-tests/colors/[]/red.json", r#""red""#);
    write(root, "array-tests/colors/[]/blue.json", r#""blue""#);

    tmp
}

fn config(tmp: &TempDir) -> Config {
    Config::new().with_template_dir(tmp.path())
}

fn args(value: Value) -> Args {
    value.as_object().cloned().unwrap_or_default()
}

fn render_json(tmp: &TempDir, ids: &[&str], bag: Value) -> Value {
    render(&config(tmp), ids, &args(bag)).unwrap().into_json()
}

fn render_err(tmp: &TempDir, ids: &[&str], bag: Value) -> RenderError {
    render(&config(tmp), ids, &args(bag)).unwrap_err()
}

#[test]
fn test_no_templates_renders_empty_object() {
    let tmp = site_tree();
    assert_eq!(render_json(&tmp, &[], json!({})), json!({}));
}

#[test]
fn test_literal_under_anchor() {
    let tmp = site_tree();
    assert_eq!(
        render_json(&tmp, &["site/style/layout"], json!({})),
        json!({"site": {"style": {"layout": "compact"}}})
    );
}

#[test]
fn test_nested_apply_chain() {
    let tmp = site_tree();
    let output = render_json(&tmp, &["site"], json!({"title": "My Site", "heroTitle": "Custom Hero"}));
    insta::assert_json_snapshot!(output, @r###"
    {
      "site": {
        "title": "My Site",
        "style": {
          "color": "red",
          "darkColor": "darkred"
        },
        "hero": {
          "title": "Custom Hero",
          "theme": {
            "color": "gold"
          }
        }
      }
    }
    "###);
}

#[test]
fn test_multiple_templates_merge_into_same_anchor() {
    let tmp = site_tree();
    assert_eq!(
        render_json(&tmp, &["site", "site/style/layout"], json!({"title": "Combined Site"})),
        json!({
            "site": {
                "title": "Combined Site",
                "style": {"color": "red", "darkColor": "darkred", "layout": "compact"},
                "hero": {"title": "Hero From Template", "theme": {"color": "gold"}}
            }
        })
    );
}

#[test]
fn test_params_reach_simple_template() {
    let tmp = site_tree();
    assert_eq!(
        render_json(&tmp, &["site/params"], json!({"env": "prod", "debug": true})),
        json!({"site": {"flags": {"env": "prod", "debug": true}}})
    );
}

#[test]
fn test_single_group_shorthand() {
    let tmp = site_tree();
    assert_eq!(
        render_json(&tmp, &["config/settings"], json!({})),
        json!({"config": {"mode": "only", "enabled": true}})
    );
}

#[test]
fn test_ambiguous_group_shorthand() {
    let tmp = site_tree();
    let err = render_err(&tmp, &["config/feature"], json!({}));
    assert_eq!(err.code(), "ambiguous-template-name");
}

#[test]
fn test_explicit_group_id_is_not_ambiguous() {
    let tmp = site_tree();
    assert_eq!(
        render_json(&tmp, &["config/.b/feature"], json!({})),
        json!({"config": {"from": "b"}})
    );
}

#[test]
fn test_explicit_extensions_rejected() {
    let tmp = site_tree();
    assert_eq!(
        render_err(&tmp, &["site/style/layout.json"], json!({})).code(),
        "no-explicit-file-types"
    );
    assert_eq!(render_err(&tmp, &["site.gen"], json!({})).code(), "no-explicit-file-types");
}

#[test]
fn test_invalid_ids_rejected() {
    let tmp = site_tree();
    for id in ["", "site//style", "../site", "site/./x"] {
        assert_eq!(render_err(&tmp, &[id], json!({})).code(), "invalid-template-id", "{}", id);
    }
}

#[test]
fn test_list_contributors_append_in_order() {
    let tmp = site_tree();
    assert_eq!(
        render_json(&tmp, &["array-tests/colors/[]/red", "array-tests/colors/[]/blue"], json!({})),
        json!({"array-tests": {"colors": ["red", "blue"]}})
    );
    assert_eq!(
        render_json(&tmp, &["array-tests/colors/[]/blue", "array-tests/colors/[]/red"], json!({})),
        json!({"array-tests": {"colors": ["blue", "red"]}})
    );
}

#[test]
fn test_list_contributor_onto_object_fails() {
    let tmp = site_tree();
    write(tmp.path(), "array-tests/colors.json", r#"{"colors": {"primary": "red"}}"#);
    let err = render_err(&tmp, &["array-tests/colors", "array-tests/colors/[]/red"], json!({}));
    assert_eq!(err.code(), "array-type-mismatch");
}

#[test]
fn test_nested_list_depth_wraps() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "grid/[]/[]/cell.json", "1");
    assert_eq!(
        render_json(&tmp, &["grid/[]/[]/cell", "grid/[]/[]/cell"], json!({})),
        json!({"grid": [[1], [1]]})
    );
}

#[test]
fn test_group_dirs_do_not_change_mount_anchor() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "theme/.dark/palette.json", r#"{"palette": {"bg": "black"}}"#);
    write(tmp.path(), "swatches/.dark/[]/swatch.json", r#""black""#);
    write(tmp.path(), "swatches/[]/.light/swatch.json", r#""white""#);
    assert_eq!(
        render_json(
            &tmp,
            &["theme/.dark/palette", "swatches/.dark/[]/swatch", "swatches/[]/.light/swatch"],
            json!({})
        ),
        json!({"theme": {"palette": {"bg": "black"}}, "swatches": ["black", "white"]})
    );
}

#[test]
fn test_apply_inside_list_uses_list_directory() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "array-tests/palette.gen",
        r#"{"colors": [
            {"$apply": "swatch", "args": {"name": "red"}},
            {"$apply": "swatch", "args": {"name": "blue"}}
        ]}"#,
    );
    write(
        tmp.path(),
        "array-tests/colors/[]/swatch.gen",
        r#"{"name": {"$arg": "name"}, "at": {"$ctx": "anchor"}, "dir": {"$ctx": "path"}}"#,
    );
    write(tmp.path(), "array-tests/colors/0/swatch.json", r#""wrong""#);

    assert_eq!(
        render_json(&tmp, &["array-tests/palette"], json!({})),
        json!({"array-tests": {"colors": [
            {"name": "red", "at": "array-tests/colors", "dir": "array-tests/colors/[]"},
            {"name": "blue", "at": "array-tests/colors", "dir": "array-tests/colors/[]"}
        ]}})
    );
}

#[test]
fn test_root_function_must_return_object() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "name.gen", r#"{"$arg": "name", "default": "x"}"#);
    assert_eq!(render_err(&tmp, &["name"], json!({})).code(), "invalid-anchor");
}

#[test]
fn test_root_list_contributor_fails() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "[]/item.json", "1");
    assert_eq!(render_err(&tmp, &["[]/item"], json!({})).code(), "array-type-mismatch");
}

#[test]
fn test_later_templates_win_scalar_conflicts() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "site/a.json", r#"{"title": "first", "keep": 1}"#);
    write(tmp.path(), "site/.alt/a.json", r#"{"title": "second"}"#);
    assert_eq!(
        render_json(&tmp, &["site/a", "site/.alt/a"], json!({})),
        json!({"site": {"title": "second", "keep": 1}})
    );
}

#[test]
fn test_override_wins_last() {
    let tmp = site_tree();
    assert_eq!(
        render_json(
            &tmp,
            &["site/style/layout", "site/params"],
            json!({"env": "dev", "__override": {"site": {"style": {"layout": "wide"}, "flags": {"debug": false}}}})
        ),
        json!({"site": {"style": {"layout": "wide"}, "flags": {"env": "dev", "debug": false}}})
    );
}

#[test]
fn test_invalid_override() {
    let tmp = site_tree();
    let err = render_err(&tmp, &["site/style/layout"], json!({"__override": "nope"}));
    assert_eq!(err.code(), "invalid-override");
}

#[test]
fn test_patch_replace_push_and_absent() {
    let tmp = site_tree();
    let output = render(
        &config(&tmp),
        &["array-tests/colors/[]/red", "site/params"],
        &args(json!({
            "env": "prod",
            "debug": true,
            "__patch": [
                ["array-tests/colors/[]", "green"],
                ["site/flags/env", "staging"],
                ["site/flags/debug"]
            ]
        })),
    )
    .unwrap();

    assert_eq!(
        output.value(),
        &json!({"array-tests": {"colors": ["red", "green"]}, "site": {"flags": {"env": "staging", "debug": null}}})
    );
    assert!(output.is_absent("site/flags/debug"));
    assert_eq!(
        serde_json::to_value(&output).unwrap(),
        json!({"array-tests": {"colors": ["red", "green"]}, "site": {"flags": {"env": "staging"}}})
    );
}

#[test]
fn test_patch_push_without_list_fails() {
    let tmp = site_tree();
    let err = render_err(&tmp, &["site/style/layout"], json!({"__patch": [["a/b/[]", 1]]}));
    assert_eq!(err.code(), "array-type-mismatch");
}

#[test]
fn test_patch_replace_missing_fails() {
    let tmp = site_tree();
    let err = render_err(&tmp, &["site/style/layout"], json!({"__patch": [["site/style/missing", 1]]}));
    assert_eq!(err.code(), "invalid-patch");
}

#[test]
fn test_literal_apply_with_args_fails() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "page.gen", r#"{"page": {"title": {"$apply": "title", "args": {"x": 1}}}}"#);
    write(tmp.path(), "page/title/title.json", r#""hello""#);
    assert_eq!(render_err(&tmp, &["page"], json!({})).code(), "invalid-template-args");
}

#[test]
fn test_duplicate_templates_fail() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "site/title.json", r#""a""#);
    write(tmp.path(), "site/title.gen", r#""b""#);
    assert_eq!(render_err(&tmp, &["site/title"], json!({})).code(), "no-duplicate-templates");
}

#[test]
fn test_bad_function_file() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "site.gen", r#"{"$native": "nobody"}"#);
    assert_eq!(render_err(&tmp, &["site"], json!({})).code(), "invalid-template-type");

    write(tmp.path(), "broken.gen", "{ not json");
    assert_eq!(render_err(&tmp, &["broken"], json!({})).code(), "unexpected-read-error");
}

#[test]
fn test_missing_nested_template_keeps_its_code() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "site.gen", r#"{"site": {"logo": {"$apply": "logo"}}}"#);
    assert_eq!(render_err(&tmp, &["site"], json!({})).code(), "template-not-found");
}

#[test]
fn test_native_generator_failure_wraps_cause() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "site.gen", r#"{"$native": "site"}"#);

    let mut registry = GeneratorRegistry::new();
    registry
        .register("site", |_args, _ctx, tools| {
            // an invalid selector fails inside the generator itself
            let node = tools.apply("bad/selector")?;
            Ok(TemplateNode::object([("site", node)]))
        })
        .unwrap();

    let engine = Engine::with_loader(config(&tmp), FsLoader::with_registry(registry));
    let err = engine.render(&["site"], &Args::new()).unwrap_err();
    assert_eq!(err.code(), "template-execution-error");
    assert_eq!(err.root_cause().code(), "invalid-template-id");
}

#[test]
fn test_self_referencing_template_hits_depth_limit() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "loop.gen", r#"{"loop": {"$apply": "loop"}}"#);
    write(tmp.path(), "loop/loop.gen", r#"{"$apply": "loop"}"#);
    let config = config(&tmp).with_max_depth(16);
    let err = render(&config, &["loop"], &Args::new()).unwrap_err();
    assert_eq!(err.code(), "recursion-limit-exceeded");
}

#[test]
fn test_render_is_idempotent_for_merges() {
    let tmp = site_tree();
    let once = render_json(&tmp, &["site/style/layout"], json!({}));
    let twice = render_json(&tmp, &["site/style/layout", "site/style/layout"], json!({}));
    assert_eq!(once, twice);
}

#[test]
fn test_slot_keys_cannot_leave_template_root() {
    let outer = TempDir::new().unwrap();
    write(outer.path(), "secret.json", r#""outside""#);
    let root = outer.path().join("templates");
    let config = Config::new().with_template_dir(&root);

    let absolute = serde_json::to_string(&outer.path().to_string_lossy()).unwrap();
    write(&root, "abs.gen", &format!(r#"{{{}: {{"$apply": "secret"}}}}"#, absolute));
    write(&root, "up.gen", r#"{"x": {"..": {"..": {"$apply": "secret"}}}}"#);

    for id in ["abs", "up"] {
        let err = render(&config, &[id], &Args::new()).unwrap_err();
        assert_eq!(err.code(), "invalid-template-id", "{}", id);
    }
}

#[test]
fn test_data_keys_with_separators_are_kept() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "links.gen", r#"{"links": {"a/b": {"$arg": "url"}}}"#);
    assert_eq!(
        render_json(&tmp, &["links"], json!({"url": "https://example.com"})),
        json!({"links": {"a/b": "https://example.com"}})
    );
}
