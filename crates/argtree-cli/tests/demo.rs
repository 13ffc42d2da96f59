use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn make_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before UNIX_EPOCH")
        .as_nanos();
    let pid = std::process::id();
    let dir = std::env::temp_dir().join(format!("argtree-integ-{prefix}-{pid}-{nanos}"));
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

fn demo() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_argtree-demo"));
    cmd.env_remove("COMP_LINE")
        .env_remove("COMP_CWORD")
        .env_remove("ARGTREE_GENERATE_MAN")
        .env("RUST_LOG", "warn");
    cmd
}

fn assert_success(out: &Output, what: &str) {
    assert!(
        out.status.success(),
        "{what} failed:\nstatus: {}\nstderr:\n{}",
        out.status,
        String::from_utf8_lossy(&out.stderr),
    );
}

#[test]
fn help_lists_sub_commands() {
    let out = demo()
        .arg("--help")
        .output()
        .expect("failed to run argtree-demo --help");
    assert_success(&out, "argtree-demo --help");

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        stdout.contains("checkout|commit|push|remote"),
        "unexpected help output:\n{stdout}"
    );
    assert!(stdout.contains("--work-tree[=<path>]"), "unexpected help output:\n{stdout}");
}

#[test]
fn bare_invocation_prints_help() {
    let out = demo().output().expect("failed to run argtree-demo");
    assert_success(&out, "argtree-demo");
    assert!(String::from_utf8_lossy(&out.stdout).starts_with("usage: "));
}

#[test]
fn runs_nested_sub_command_with_parent_flags() {
    let out = demo()
        .args(["-c", "user.name=me", "push", "--depth", "3", "origin", "topic"])
        .output()
        .expect("failed to run argtree-demo push");
    assert_success(&out, "argtree-demo push");
    assert_eq!(
        String::from_utf8_lossy(&out.stdout),
        "pushing topic to origin (depth 3)\nwith config: user.name=me\n"
    );

    let out = demo()
        .args(["remote", "-v", "add", "upstream", "https://example.com/up.git"])
        .output()
        .expect("failed to run argtree-demo remote add");
    assert_success(&out, "argtree-demo remote add");
    assert_eq!(
        String::from_utf8_lossy(&out.stdout),
        "added remote upstream -> https://example.com/up.git\n"
    );
}

#[test]
fn errors_exit_with_status_one() {
    let out = demo()
        .args(["comit"])
        .output()
        .expect("failed to run argtree-demo comit");
    assert_eq!(out.status.code(), Some(1));
    assert_eq!(
        String::from_utf8_lossy(&out.stderr).trim_end(),
        "unknown sub-command: comit, did you mean: commit?"
    );

    let out = demo()
        .args(["commit"])
        .output()
        .expect("failed to run argtree-demo commit");
    assert_eq!(out.status.code(), Some(1));
    assert!(
        String::from_utf8_lossy(&out.stderr).contains("commit: aborting commit due to empty commit message"),
        "stderr:\n{}",
        String::from_utf8_lossy(&out.stderr)
    );
}

#[test]
fn completes_from_comp_line() {
    let complete = |line: &str, cword: &str| {
        let out = demo()
            .env("COMP_LINE", line)
            .env("COMP_CWORD", cword)
            .output()
            .expect("failed to run argtree-demo completion");
        assert_success(&out, "argtree-demo completion");
        String::from_utf8_lossy(&out.stdout).into_owned()
    };

    assert_eq!(
        complete("argtree-demo ", "1"),
        "--config\n--work-tree\ncheckout\ncommit\npush\nremote\n"
    );
    assert_eq!(
        complete("argtree-demo checkout -q ", "3"),
        "--force\n-b\nmain\nrelease\ntopic\n"
    );
    assert_eq!(complete("argtree-demo commit --fixup", "3"), "--all\n--message\n");
    assert_eq!(complete("argtree-demo commit -m", "3"), "");
    assert_eq!(complete("argtree-demo --nope ", "2"), "");
}

#[test]
fn generates_man_pages() {
    let dir = make_temp_dir("man");

    let out = demo()
        .env("ARGTREE_GENERATE_MAN", &dir)
        .output()
        .expect("failed to run argtree-demo man generation");
    assert_success(&out, "argtree-demo man generation");

    let mut names: Vec<String> = fs::read_dir(&dir)
        .expect("failed to read man dir")
        .map(|entry| entry.expect("bad dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "argtree-demo-checkout.1",
            "argtree-demo-commit.1",
            "argtree-demo-push.1",
            "argtree-demo-remote-add.1",
            "argtree-demo-remote.1",
            "argtree-demo.1",
        ]
    );

    let checkout = fs::read_to_string(dir.join("argtree-demo-checkout.1")).expect("missing page");
    assert!(checkout.starts_with(
        ".TH ARGTREE-DEMO-CHECKOUT 1\n.SH NAME\nargtree-demo-checkout - switch branches or restore files\n"
    ));
    assert!(checkout.contains(
        ".TP\n-b <branch>\nCreate a new branch named <branch> and start it at the given branch.\n"
    ));

    let _ = fs::remove_dir_all(&dir);
}
