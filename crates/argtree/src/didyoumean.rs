use crate::tree::CommandNode;

/// The sub-command of `node` closest to `name` by edit distance.
///
/// Ties go to the lexicographically smallest name. Returns `None` when the node
/// has no sub-commands.
pub fn did_you_mean(node: &CommandNode, name: &str) -> Option<String> {
    closest(node.children().keys().map(String::as_str), name).map(str::to_string)
}

fn closest<'a>(candidates: impl Iterator<Item = &'a str>, name: &str) -> Option<&'a str> {
    candidates
        .map(|candidate| (strsim::levenshtein(candidate, name), candidate))
        .min()
        .map(|(_, candidate)| candidate)
}
