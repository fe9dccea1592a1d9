//! Tags, newest first

use tracing::debug;

use super::GitRunner;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    /// Short commit id
    pub commit: String,
    /// Commit subject
    pub message: String,
}

impl Tag {
    pub fn list(git: &dyn GitRunner) -> Result<Vec<Self>> {
        let lines = git.lines(&[
            "for-each-ref",
            "--sort=-creatordate",
            "refs/tags/",
            "--format=%(refname:short) %(objectname:short) %(subject)",
        ])?;

        let tags: Vec<Self> = lines.iter().filter_map(|line| Self::parse(line)).collect();
        debug!("Found {} tags", tags.len());
        Ok(tags)
    }

    fn parse(line: &str) -> Option<Self> {
        let mut fields = line.splitn(3, ' ');
        let name = fields.next()?;
        let commit = fields.next()?;
        Some(Self {
            name: name.to_string(),
            commit: commit.to_string(),
            message: fields.next().unwrap_or_default().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::FakeGit;

    #[test]
    fn test_list_tags() {
        let git = FakeGit::new().ok(
            "for-each-ref --sort=-creatordate refs/tags/ --format=%(refname:short) %(objectname:short) %(subject)",
            "v0.2.0 4f5e6d7 release: v0.2.0 with sync\nv0.1.0 1a2b3c4 initial release\nbroken\n",
        );
        let tags = Tag::list(&git).unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "v0.2.0");
        assert_eq!(tags[0].commit, "4f5e6d7");
        assert_eq!(tags[0].message, "release: v0.2.0 with sync");
    }
}
