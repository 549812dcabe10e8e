use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn md2html(args: &[&str], dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_md2html"))
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn entries(dir: &Path) -> usize {
    fs::read_dir(dir).unwrap().count()
}

#[test]
fn test_wrong_argument_count() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("in.md"), "# hi").unwrap();

    for args in [vec![], vec!["in.md"], vec!["in.md", "out.html", "extra"]] {
        let out = md2html(&args, dir.path());
        assert_eq!(out.status.code(), Some(1), "{args:?}");
        assert!(out.stdout.is_empty(), "{args:?}");
        assert!(stderr(&out).contains("Usage:"), "{args:?}: {}", stderr(&out));
        assert_eq!(stderr(&out).lines().count(), 1, "{args:?}: {}", stderr(&out));
        // nothing but the input
        assert_eq!(entries(dir.path()), 1, "{args:?}");
    }
}

#[test]
fn test_help_and_version() {
    let dir = tempfile::tempdir().unwrap();

    let out = md2html(&["--help"], dir.path());
    assert_eq!(out.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&out.stdout).contains("INPUT_MARKDOWN_PATH"));

    let out = md2html(&["--version"], dir.path());
    assert_eq!(out.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&out.stdout).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_input() {
    let dir = tempfile::tempdir().unwrap();

    let out = md2html(&["missing.md", "out.html"], dir.path());

    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    let err = stderr(&out);
    assert!(err.contains("missing.md"), "{err}");
    assert_eq!(err.lines().count(), 1, "{err}");
    assert!(!dir.path().join("out.html").exists());
}

#[test]
fn test_missing_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("in.md"), "text").unwrap();

    let out = md2html(&["in.md", "nowhere/out.html"], dir.path());

    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("in.md"));
    assert!(!dir.path().join("nowhere").exists());
    assert_eq!(entries(dir.path()), 1);
}

#[test]
fn test_verbatim_title_and_escaping() {
    let dir = tempfile::tempdir().unwrap();
    let docs = dir.path().join("docs");
    fs::create_dir(&docs).unwrap();
    fs::write(docs.join("notes.md"), "# not parsed\n<b>x</b> & y\n").unwrap();

    let out = md2html(
        &["--policy", "verbatim", "docs/notes.md", "notes.html"],
        dir.path(),
    );

    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    assert!(out.stdout.is_empty());
    assert!(out.stderr.is_empty());
    let html = fs::read_to_string(dir.path().join("notes.html")).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>notes.md</title>"));
    assert!(html.contains("<pre># not parsed\n&lt;b&gt;x&lt;/b&gt; &amp; y\n</pre>"));
}

#[test]
fn test_unknown_policy() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("in.md"), "text").unwrap();

    let out = md2html(&["--policy", "pdf", "in.md", "out.html"], dir.path());

    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.starts_with("md2html: "), "{err}");
    assert!(err.contains("Usage:"), "{err}");
    assert_eq!(err.lines().count(), 1, "{err}");
    assert!(!dir.path().join("out.html").exists());
}

#[test]
fn test_overwrite_and_idempotence() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("in.md"), "- a\n- b\n").unwrap();
    fs::write(dir.path().join("out.html"), "stale").unwrap();

    let first = md2html(&["in.md", "out.html"], dir.path());
    assert_eq!(first.status.code(), Some(0), "{}", stderr(&first));
    let a = fs::read(dir.path().join("out.html")).unwrap();

    let second = md2html(&["in.md", "out.html"], dir.path());
    assert_eq!(second.status.code(), Some(0), "{}", stderr(&second));
    let b = fs::read(dir.path().join("out.html")).unwrap();

    assert_ne!(a, b"stale");
    assert_eq!(a, b);
    assert_eq!(entries(dir.path()), 2);
}

#[test]
fn test_verbose_logs_to_stderr() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("in.md"), "text").unwrap();

    let out = md2html(&["-vv", "in.md", "out.html"], dir.path());

    assert_eq!(out.status.code(), Some(0));
    assert!(out.stdout.is_empty());
    assert!(stderr(&out).contains("converted"));
}

#[cfg(feature = "markdown")]
#[test]
fn test_markdown_document_order() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("in.md"),
        "# Title\n\nSome *text* with `code`.\n",
    )
    .unwrap();

    let out = md2html(&["in.md", "out.html"], dir.path());

    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    let html = fs::read_to_string(dir.path().join("out.html")).unwrap();
    let h1 = html.find("<h1>Title</h1>").unwrap();
    let p = html.find("<p>").unwrap();
    let em = html.find("<em>text</em>").unwrap();
    let code = html.find("<code>code</code>").unwrap();
    assert!(h1 < p && p < em && em < code);
    assert!(html.contains("<title>in.md</title>"));
}

#[cfg(feature = "markdown")]
#[test]
fn test_deeply_nested_quotes() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("in.md"), "> ".repeat(50_000) + "x").unwrap();

    let out = md2html(&["in.md", "out.html"], dir.path());

    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    let html = fs::read_to_string(dir.path().join("out.html")).unwrap();
    assert!(html.contains("<blockquote>"));
}

#[cfg(not(feature = "markdown"))]
#[test]
fn test_markdown_policy_not_compiled_in() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("in.md"), "text").unwrap();

    let out = md2html(&["--policy", "markdown", "in.md", "out.html"], dir.path());

    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("--features markdown"));
    assert!(!dir.path().join("out.html").exists());
}
