// Copyright (c) Contributors to the denv project.
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::path::PathBuf;

use rstest::rstest;

use super::*;

fn no_paths() -> BTreeMap<String, PathBuf> {
    BTreeMap::new()
}

#[rstest]
fn test_render_basic() {
    let ops = vec![
        EnvOp::Comment(CommentEnv {
            comment: "Example environment".to_string(),
        }),
        EnvOp::Set(SetEnv {
            set: "FOO".to_string(),
            value: "bar".to_string(),
        }),
        EnvOp::Prepend(PrependEnv {
            prepend: "PATH".to_string(),
            value: "/opt/tools/bin".to_string(),
            separator: None,
        }),
    ];

    let script = render_script(&ops, &no_paths(), None).unwrap();

    assert!(script.contains("# Example environment"));
    assert!(script.contains("export FOO=\"bar\""));
    assert!(script.contains("export PATH=\"/opt/tools/bin:${PATH}\""));
}

#[rstest]
fn test_path_composition_order() {
    // prepend first, inherited value in the middle, append last
    let ops = vec![
        EnvOp::Prepend(PrependEnv {
            prepend: "PATH".to_string(),
            value: "/b".to_string(),
            separator: None,
        }),
        EnvOp::Append(AppendEnv {
            append: "PATH".to_string(),
            value: "/c".to_string(),
            separator: None,
        }),
    ];

    let script = render_script(&ops, &no_paths(), None).unwrap();
    assert_eq!(script, "export PATH=\"/b:${PATH}:/c\"\n");
}

#[rstest]
fn test_multiple_prepends_keep_declaration_order() {
    let ops = vec![
        EnvOp::Prepend(PrependEnv {
            prepend: "PATH".to_string(),
            value: "/first".to_string(),
            separator: None,
        }),
        EnvOp::Prepend(PrependEnv {
            prepend: "PATH".to_string(),
            value: "/second".to_string(),
            separator: None,
        }),
    ];

    let script = render_script(&ops, &no_paths(), None).unwrap();
    assert_eq!(script, "export PATH=\"/first:/second:${PATH}\"\n");
}

#[rstest]
fn test_set_discards_accumulated_segments() {
    let ops = vec![
        EnvOp::Prepend(PrependEnv {
            prepend: "PATH".to_string(),
            value: "/old".to_string(),
            separator: None,
        }),
        EnvOp::Set(SetEnv {
            set: "PATH".to_string(),
            value: "/only".to_string(),
        }),
        EnvOp::Append(AppendEnv {
            append: "PATH".to_string(),
            value: "/after".to_string(),
            separator: None,
        }),
    ];

    let script = render_script(&ops, &no_paths(), None).unwrap();
    assert_eq!(script, "export PATH=\"/only:/after\"\n");
}

#[rstest]
fn test_package_reference_resolution() {
    let mut paths = BTreeMap::new();
    paths.insert("ripgrep".to_string(), PathBuf::from("/store/obj/abc123"));

    let ops = vec![EnvOp::Prepend(PrependEnv {
        prepend: "PATH".to_string(),
        value: "${pkg:ripgrep}/bin".to_string(),
        separator: None,
    })];

    let script = render_script(&ops, &paths, None).unwrap();
    assert!(script.contains("/store/obj/abc123/bin"));
}

#[rstest]
fn test_unresolved_package_reference() {
    let ops = vec![EnvOp::Set(SetEnv {
        set: "TOOL_HOME".to_string(),
        value: "${pkg:missing}".to_string(),
    })];

    let err = render_script(&ops, &no_paths(), None).unwrap_err();
    assert!(matches!(
        err,
        crate::Error::UnresolvedReference { ref package, .. } if package == "missing"
    ));
}

#[rstest]
fn test_unterminated_reference_is_rejected() {
    let ops = vec![EnvOp::Set(SetEnv {
        set: "X".to_string(),
        value: "${pkg:oops".to_string(),
    })];

    assert!(render_script(&ops, &no_paths(), None).is_err());
}

#[rstest]
fn test_escaping() {
    let ops = vec![EnvOp::Set(SetEnv {
        set: "SPECIAL".to_string(),
        value: "value with $dollar and \"quotes\"".to_string(),
    })];

    let script = render_script(&ops, &no_paths(), None).unwrap();
    assert!(script.contains("\\$dollar"));
    assert!(script.contains("\\\"quotes\\\""));
}

#[rstest]
fn test_custom_separator() {
    let ops = vec![
        EnvOp::Set(SetEnv {
            set: "FLAGS".to_string(),
            value: "-a".to_string(),
        }),
        EnvOp::Append(AppendEnv {
            append: "FLAGS".to_string(),
            value: "-b".to_string(),
            separator: Some(" ".to_string()),
        }),
    ];

    let script = render_script(&ops, &no_paths(), None).unwrap();
    assert_eq!(script, "export FLAGS=\"-a -b\"\n");
}

#[rstest]
fn test_hook_appended_verbatim() {
    let ops = vec![EnvOp::Set(SetEnv {
        set: "FOO".to_string(),
        value: "bar".to_string(),
    })];

    let script = render_script(&ops, &no_paths(), Some("echo ready\n")).unwrap();
    assert!(script.ends_with("\necho ready\n"));
    assert!(script.starts_with("export FOO="));
}

#[rstest]
fn test_variables_emitted_in_first_declaration_order() {
    let ops = vec![
        EnvOp::Set(SetEnv {
            set: "B_VAR".to_string(),
            value: "1".to_string(),
        }),
        EnvOp::Set(SetEnv {
            set: "A_VAR".to_string(),
            value: "2".to_string(),
        }),
        EnvOp::Append(AppendEnv {
            append: "B_VAR".to_string(),
            value: "3".to_string(),
            separator: None,
        }),
    ];

    let script = render_script(&ops, &no_paths(), None).unwrap();
    let b_pos = script.find("B_VAR").unwrap();
    let a_pos = script.find("A_VAR").unwrap();
    assert!(b_pos < a_pos, "first-declared variable must come first");
}

#[rstest]
fn test_render_is_deterministic() {
    let ops = vec![
        EnvOp::Prepend(PrependEnv {
            prepend: "PATH".to_string(),
            value: "/b".to_string(),
            separator: None,
        }),
        EnvOp::Set(SetEnv {
            set: "ROOT".to_string(),
            value: "/work".to_string(),
        }),
    ];

    let first = render_script(&ops, &no_paths(), Some("echo hi")).unwrap();
    let second = render_script(&ops, &no_paths(), Some("echo hi")).unwrap();
    assert_eq!(first, second);
}

#[rstest]
fn test_parse_env_ops_from_yaml() {
    let yaml = r#"
- set: FOO
  value: bar
- prepend: PATH
  value: /bin
- append: MANPATH
  value: /man
  separator: ":"
- comment: "hello"
"#;
    let ops: Vec<EnvOp> = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(ops.len(), 4);
    assert!(matches!(ops[0], EnvOp::Set(_)));
    assert!(matches!(ops[1], EnvOp::Prepend(_)));
    assert!(matches!(ops[2], EnvOp::Append(_)));
    assert!(matches!(ops[3], EnvOp::Comment(_)));
}
