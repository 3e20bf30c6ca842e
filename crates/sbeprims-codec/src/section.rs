use std::fmt;

use crate::error::{CodecError, Result};

/// Position of a cursor within a block's wire sections.
///
/// Sections are visited strictly in wire order: fixed fields, each group,
/// each var-data section. A cursor may skip ahead but never return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Unstarted,
    AtFixedFields,
    AtGroup(usize),
    AtVarData(usize),
    Done,
}

impl Section {
    fn rank(self, groups: usize) -> usize {
        match self {
            Section::Unstarted => 0,
            Section::AtFixedFields => 1,
            Section::AtGroup(i) => 2 + i,
            Section::AtVarData(j) => 2 + groups + j,
            Section::Done => usize::MAX,
        }
    }

    /// Index of the first group not yet passed.
    pub(crate) fn next_group(self, groups: usize) -> usize {
        match self {
            Section::Unstarted | Section::AtFixedFields => 0,
            Section::AtGroup(i) => i + 1,
            Section::AtVarData(_) | Section::Done => groups,
        }
    }

    /// Index of the first var-data section not yet passed.
    pub(crate) fn next_data(self, data: usize) -> usize {
        match self {
            Section::Unstarted | Section::AtFixedFields | Section::AtGroup(_) => 0,
            Section::AtVarData(j) => j + 1,
            Section::Done => data,
        }
    }

    /// Check that fixed fields are still accessible.
    pub(crate) fn check_fields(self, scope: &str) -> Result<()> {
        match self {
            Section::Unstarted | Section::AtFixedFields => Ok(()),
            other => Err(CodecError::Sequence(format!(
                "fixed fields of {scope} accessed after {other}"
            ))),
        }
    }

    /// Check that `target` lies strictly ahead of this section.
    pub(crate) fn check_forward(self, target: Section, groups: usize, scope: &str) -> Result<()> {
        if target.rank(groups) <= self.rank(groups) {
            return Err(CodecError::Sequence(format!(
                "{target} of {scope} accessed after {self}"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Unstarted => f.write_str("start"),
            Section::AtFixedFields => f.write_str("fixed fields"),
            Section::AtGroup(i) => write!(f, "group #{i}"),
            Section::AtVarData(j) => write!(f, "var-data #{j}"),
            Section::Done => f.write_str("end"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_moves_forward() {
        let at_group = Section::AtGroup(1);
        assert!(at_group.check_forward(Section::AtGroup(2), 3, "m").is_ok());
        assert!(at_group.check_forward(Section::AtVarData(0), 3, "m").is_ok());
        assert!(matches!(
            at_group.check_forward(Section::AtGroup(1), 3, "m"),
            Err(CodecError::Sequence(_))
        ));
        assert!(matches!(
            at_group.check_forward(Section::AtGroup(0), 3, "m"),
            Err(CodecError::Sequence(_))
        ));
        assert!(matches!(at_group.check_fields("m"), Err(CodecError::Sequence(_))));
        assert!(Section::AtFixedFields.check_fields("m").is_ok());
    }

    #[test]
    fn tracks_remaining_sections() {
        assert_eq!(Section::AtFixedFields.next_group(2), 0);
        assert_eq!(Section::AtGroup(0).next_group(2), 1);
        assert_eq!(Section::AtVarData(0).next_group(2), 2);
        assert_eq!(Section::AtGroup(1).next_data(3), 0);
        assert_eq!(Section::AtVarData(1).next_data(3), 2);
    }
}
