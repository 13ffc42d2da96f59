use crate::parser::Parser;
use crate::tree::CommandTree;

/// Completion candidates for the word after `partial`.
///
/// `partial` holds the complete words typed so far, without the program name.
/// Invalid input yields no candidates rather than an error.
pub fn autocomplete<I, S>(tree: &CommandTree, partial: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = Parser::new(tree);
    for token in partial {
        if let Err(err) = parser.feed(token.as_ref()) {
            tracing::debug!(%err, "no completions for invalid input");
            return Vec::new();
        }
    }

    if let Some(flag) = parser.pending_flag() {
        return flag
            .suggestions
            .as_ref()
            .map(|source| sorted(source.candidates(parser.config())))
            .unwrap_or_default();
    }

    let mut candidates = Vec::new();
    if !parser.flags_terminated() {
        candidates.extend(
            parser
                .unsupplied_flags()
                .filter(|f| !f.is_help)
                .filter_map(|f| f.completion_name()),
        );
    }

    let node = parser.node();
    if !node.children().is_empty() {
        candidates.extend(node.children().keys().cloned());
        return sorted(candidates);
    }

    if let Some(source) = parser.next_positional().and_then(|a| a.suggestions.as_ref()) {
        candidates.extend(source.candidates(parser.config()));
    }
    sorted(candidates)
}

fn sorted(mut candidates: Vec<String>) -> Vec<String> {
    candidates.sort();
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Command, arg, flag};

    #[derive(Default)]
    struct Opts {
        alpha: bool,
        bravo: String,
        charlie: i32,
        delta: Option<String>,
    }

    #[test]
    fn lists_unsupplied_flags_by_preferred_name() {
        let tree = CommandTree::builder()
            .command(
                Command::<Opts>::new()
                    .flag(flag(|o: &mut Opts| &mut o.alpha).short('a'))
                    .flag(flag(|o: &mut Opts| &mut o.bravo).short('b').long("bravo"))
                    .flag(flag(|o: &mut Opts| &mut o.charlie).long("charlie"))
                    .handler(|_| Ok(())),
            )
            .build()
            .unwrap();

        assert_eq!(
            autocomplete(&tree, [""; 0]),
            vec!["--bravo", "--charlie", "-a"]
        );
        assert_eq!(autocomplete(&tree, ["-a", "--bravo=x"]), vec!["--charlie"]);
        assert_eq!(autocomplete(&tree, ["-h"]), vec!["--bravo", "--charlie", "-a"]);
        assert!(autocomplete(&tree, ["--nope"]).is_empty());
    }

    #[test]
    fn pending_flag_uses_its_source() {
        let tree = CommandTree::builder()
            .command(
                Command::<Opts>::new()
                    .flag(flag(|o: &mut Opts| &mut o.alpha).short('a'))
                    .flag(
                        flag(|o: &mut Opts| &mut o.bravo)
                            .short('b')
                            .complete(|o: &Opts| {
                                if o.alpha {
                                    vec!["zeta".into(), "eta".into()]
                                } else {
                                    vec!["theta".into()]
                                }
                            }),
                    )
                    .flag(flag(|o: &mut Opts| &mut o.charlie).short('c'))
                    .handler(|_| Ok(())),
            )
            .build()
            .unwrap();

        assert_eq!(autocomplete(&tree, ["-b"]), vec!["theta"]);
        assert_eq!(autocomplete(&tree, ["-a", "-b"]), vec!["eta", "zeta"]);
        assert!(autocomplete(&tree, ["-c"]).is_empty());
    }

    #[test]
    fn optional_flags_are_not_pending() {
        let tree = CommandTree::builder()
            .command(
                Command::<Opts>::new()
                    .flag(
                        flag(|o: &mut Opts| &mut o.delta)
                            .long("delta")
                            .complete(|_: &Opts| vec!["never".into()]),
                    )
                    .handler(|_| Ok(())),
            )
            .build()
            .unwrap();

        assert!(autocomplete(&tree, ["--delta"]).is_empty());
    }

    #[test]
    fn terminator_hides_flags() {
        #[derive(Default)]
        struct Files {
            force: bool,
            paths: Vec<String>,
        }

        let tree = CommandTree::builder()
            .command(
                Command::<Files>::new()
                    .flag(flag(|f: &mut Files| &mut f.force).short('f'))
                    .trailing(
                        arg("paths", |f: &mut Files| &mut f.paths)
                            .complete(|f: &Files| vec![format!("file{}", f.paths.len())]),
                    )
                    .handler(|_| Ok(())),
            )
            .build()
            .unwrap();

        assert_eq!(autocomplete(&tree, ["a"]), vec!["-f", "file1"]);
        assert_eq!(autocomplete(&tree, ["--", "a", "b"]), vec!["file2"]);
    }
}
