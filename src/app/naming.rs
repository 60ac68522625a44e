//! Media file naming convention
//!
//! Library files are named `<parent><child>-<type><number><version> <comment>.<ext>`,
//! for example `AB12c3-V007 birthday.mov`. The parsed stable id (`AB12C3-V7`)
//! survives renames of the comment part, which is what makes it usable as the
//! first half of a cache key.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

static FILE_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([A-Za-z]+[0-9]*)([A-Za-z]*)([0-9]*(?:\+[0-9]+)*)-([A-Za-z]*)(0*)([1-9][0-9]*)([A-Za-z]*)([- ]*)(.*)$",
    )
    .expect("file name pattern is valid")
});

/// Components of a file name that follows the naming convention
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileNameParts {
    /// Uppercased parent base and suffix (`AB12C`)
    pub parent: String,
    /// Child path within the parent (`3`, `1+2`)
    pub child: String,
    /// Uppercased type letters (`""` for pictures, `V` for videos)
    pub type_code: String,
    /// Leading zeros of the sequence number, kept for display only
    pub zeros: String,
    /// Sequence number
    pub number: u64,
    /// Uppercased version letters
    pub version: String,
    /// Separator between the identifier and the comment
    pub separator: String,
    /// Free-text comment
    pub comment: String,
    /// Lowercased extension including the dot, empty when absent
    pub extension: String,
    /// Stable identifier derived from the parts above
    pub id: String,
}

/// Parse a file name, returning `None` when it does not follow the convention
///
/// A comment must be separated from the identifier by a space or dash; names
/// like `AB1-3_beach.jpg` are rejected rather than guessed at.
pub fn parse_file_name(name: &str) -> Option<FileNameParts> {
    let caps = FILE_NAME_REGEX.captures(name)?;
    let group = |i: usize| caps.get(i).map_or("", |m| m.as_str());

    let trailing = group(9);
    let dot = trailing.rfind('.').unwrap_or(trailing.len());
    let comment = &trailing[..dot];
    let separator = group(8);

    if separator.is_empty() && !comment.is_empty() {
        return None;
    }

    let number = group(6).parse::<u64>().ok()?;
    let parent = format!("{}{}", group(1), group(2)).to_uppercase();
    let child = trim_child(name, group(2), group(3));
    let type_code = group(4).to_uppercase();
    let version = group(7).to_uppercase();
    let id = format!("{}{}-{}{}{}", parent, child, type_code, number, version);

    Some(FileNameParts {
        parent,
        child,
        type_code,
        zeros: group(5).to_string(),
        number,
        version,
        separator: separator.to_string(),
        comment: comment.to_string(),
        extension: trailing[dot..].to_lowercase(),
        id,
    })
}

/// Drop a redundant leading `+` from the child when the parent ends in a letter
fn trim_child(name: &str, parent_suffix: &str, child: &str) -> String {
    match child.strip_prefix('+') {
        Some(rest) if !parent_suffix.is_empty() => {
            debug!("Redundant '+' in file name: {}", name);
            rest.to_string()
        }
        _ => child.to_string(),
    }
}
