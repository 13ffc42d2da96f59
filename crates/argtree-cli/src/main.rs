//! `argtree-demo`: a pretend subset of git.
//!
//! Commands print what they would do. Try `argtree-demo --help`, or enable bash
//! completion with `complete -C argtree-demo argtree-demo`.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Result, bail};
use argtree::{Command, CommandTree, SchemaError, arg, flag};

const BRANCHES: [&str; 3] = ["main", "release", "topic"];

#[derive(Debug, Default)]
struct Git {
    config: Vec<String>,
    work_tree: Option<PathBuf>,
}

#[derive(Debug, Default)]
struct Checkout {
    git: Git,
    quiet: bool,
    force: bool,
    new_branch: String,
    branch: String,
    paths: Vec<PathBuf>,
}

#[derive(Debug, Default)]
struct Commit {
    git: Git,
    all: bool,
    message: Vec<String>,
    fixup: Option<String>,
}

#[derive(Debug, Default)]
struct Remote {
    git: Git,
    verbose: bool,
}

#[derive(Debug, Default)]
struct RemoteAdd {
    remote: Remote,
    fetch: bool,
    name: String,
    url: String,
}

#[derive(Debug, Default)]
struct Push {
    git: Git,
    depth: u32,
    remote: String,
    refs: Vec<String>,
}

fn checkout() -> Command<Checkout> {
    Command::<Checkout>::new()
        .subcommand_of("checkout", |c: &mut Checkout| &mut c.git)
        .description("switch branches or restore files")
        .extended_description("Updates files in the working tree to match the given branch.")
        .flag(
            flag(|c: &mut Checkout| &mut c.quiet)
                .short('q')
                .long("quiet")
                .usage("suppress progress output"),
        )
        .flag(
            flag(|c: &mut Checkout| &mut c.force)
                .short('f')
                .long("force")
                .usage("throw away local changes"),
        )
        .flag(
            flag(|c: &mut Checkout| &mut c.new_branch)
                .short('b')
                .value_name("branch")
                .usage("create a new branch")
                .extended_usage("Create a new branch named <branch> and start it at the given branch."),
        )
        .arg(arg("branch", |c: &mut Checkout| &mut c.branch).complete(|_: &Checkout| branches()))
        .trailing(arg("paths", |c: &mut Checkout| &mut c.paths))
        .handler(|c: Checkout| {
            if c.quiet {
                return Ok(());
            }
            if let Some(work_tree) = &c.git.work_tree {
                println!("in {}", work_tree.display());
            }
            if c.force {
                println!("discarding local changes");
            }
            if c.new_branch.is_empty() {
                println!("switched to branch '{}'", c.branch);
            } else {
                println!("switched to a new branch '{}' at '{}'", c.new_branch, c.branch);
            }
            for path in &c.paths {
                println!("restored {}", path.display());
            }
            Ok(())
        })
}

fn commit() -> Command<Commit> {
    Command::<Commit>::new()
        .subcommand_of("commit", |c: &mut Commit| &mut c.git)
        .description("record changes to the repository")
        .flag(
            flag(|c: &mut Commit| &mut c.all)
                .short('a')
                .long("all")
                .usage("stage modified files first"),
        )
        .flag(
            flag(|c: &mut Commit| &mut c.message)
                .short('m')
                .long("message")
                .value_name("msg")
                .usage("commit message; paragraphs are joined"),
        )
        .flag(
            flag(|c: &mut Commit| &mut c.fixup)
                .long("fixup")
                .value_name("commit")
                .usage("mark as a fixup of a commit")
                .complete(|_: &Commit| vec!["HEAD".into(), "HEAD~1".into()]),
        )
        .handler(|c: Commit| {
            if c.message.is_empty() && c.fixup.is_none() {
                bail!("aborting commit due to empty commit message");
            }
            let subject = match &c.fixup {
                Some(target) if target.is_empty() => "fixup! HEAD".to_string(),
                Some(target) => format!("fixup! {target}"),
                None => c.message.join("\n\n"),
            };
            let scope = if c.all { "all changes" } else { "staged changes" };
            println!("[main] {subject} ({scope})");
            if !c.git.config.is_empty() {
                println!("with config: {}", c.git.config.join(", "));
            }
            Ok(())
        })
}

fn remote() -> Command<Remote> {
    Command::<Remote>::new()
        .subcommand_of("remote", |r: &mut Remote| &mut r.git)
        .description("manage tracked repositories")
        .flag(
            flag(|r: &mut Remote| &mut r.verbose)
                .short('v')
                .long("verbose")
                .usage("show remote urls"),
        )
        .handler(|r: Remote| {
            if let Some(work_tree) = &r.git.work_tree {
                println!("in {}", work_tree.display());
            }
            if r.verbose {
                println!("origin\thttps://example.com/repo.git");
            } else {
                println!("origin");
            }
            Ok(())
        })
}

fn remote_add() -> Command<RemoteAdd> {
    Command::<RemoteAdd>::new()
        .subcommand_of("add", |a: &mut RemoteAdd| &mut a.remote)
        .description("add a remote")
        .flag(
            flag(|a: &mut RemoteAdd| &mut a.fetch)
                .short('f')
                .usage("fetch the remote immediately"),
        )
        .arg(arg("name", |a: &mut RemoteAdd| &mut a.name))
        .arg(arg("url", |a: &mut RemoteAdd| &mut a.url))
        .handler(|a: RemoteAdd| {
            if a.remote.verbose {
                println!("added remote {} -> {}", a.name, a.url);
            } else {
                println!("added remote {}", a.name);
            }
            if a.fetch {
                println!("fetching {}", a.name);
            }
            Ok(())
        })
}

fn push() -> Command<Push> {
    Command::<Push>::new()
        .subcommand_of("push", |p: &mut Push| &mut p.git)
        .description("update remote refs")
        .flag(
            flag(|p: &mut Push| &mut p.depth)
                .long("depth")
                .usage("limit the pushed history"),
        )
        .arg(
            arg("remote", |p: &mut Push| &mut p.remote)
                .complete(|_: &Push| vec!["origin".into(), "upstream".into()]),
        )
        .trailing(arg("refs", |p: &mut Push| &mut p.refs).complete(|_: &Push| branches()))
        .handler(|p: Push| {
            let refs = if p.refs.is_empty() {
                "main".to_string()
            } else {
                p.refs.join(" ")
            };
            if p.depth > 0 {
                println!("pushing {refs} to {} (depth {})", p.remote, p.depth);
            } else {
                println!("pushing {refs} to {}", p.remote);
            }
            for entry in &p.git.config {
                println!("with config: {entry}");
            }
            Ok(())
        })
}

fn git() -> Command<Git> {
    Command::<Git>::new()
        .description("the stupid content tracker")
        .flag(
            flag(|g: &mut Git| &mut g.config)
                .short('c')
                .long("config")
                .value_name("name=value")
                .usage("set a configuration value"),
        )
        .flag(
            flag(|g: &mut Git| &mut g.work_tree)
                .long("work-tree")
                .value_name("path")
                .usage("path to the working tree"),
        )
}

fn branches() -> Vec<String> {
    BRANCHES.iter().map(|b| b.to_string()).collect()
}

fn tree() -> Result<CommandTree, SchemaError> {
    CommandTree::builder()
        .name("git")
        .command(git())
        .command(checkout())
        .command(commit())
        .command(remote())
        .command(remote_add())
        .command(push())
        .build()
}

fn main() -> ExitCode {
    argtree_cli::run_main(tree())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_builds() {
        let tree = tree().unwrap();
        let root = tree.root();
        assert!(!root.is_runnable());
        assert_eq!(
            root.children().keys().collect::<Vec<_>>(),
            vec!["checkout", "commit", "push", "remote"]
        );
        assert!(tree.find(&["remote", "add"]).is_some());
    }
}
