/// Diff text handed to the classifier: one file's working-tree delta or the
/// labeled sections of a whole repository.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet(String);

impl ChangeSet {
    pub fn new(diff: impl Into<String>) -> Self {
        Self(diff.into())
    }

    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn exceeds(&self, limit: usize) -> bool {
        self.0.len() > limit
    }
}

/// Builds the whole-repository change set, skipping empty sections.
#[derive(Debug, Default)]
pub struct ChangeSetBuilder {
    sections: Vec<String>,
}

impl ChangeSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn section(mut self, title: &str, body: &str) -> Self {
        if !body.trim().is_empty() {
            self.sections.push(format!("=== {title} ===\n{}", body.trim_end()));
        }
        self
    }

    pub fn build(self) -> ChangeSet {
        if self.sections.is_empty() {
            return ChangeSet::empty();
        }
        let mut text = self.sections.join("\n\n");
        text.push('\n');
        ChangeSet(text)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangesSummary {
    pub modified: usize,
    pub added: usize,
    pub deleted: usize,
    pub renamed: usize,
    pub untracked: usize,
}

impl ChangesSummary {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn total(&self) -> usize {
        self.modified + self.added + self.deleted + self.renamed + self.untracked
    }

    /// Counts `git status --porcelain` lines, one bucket per path.
    pub fn from_porcelain(output: &str) -> Self {
        let mut summary = Self::empty();
        for line in output.lines() {
            if line.len() < 3 {
                continue;
            }
            let code = &line[..2];
            if code == "??" {
                summary.untracked += 1;
            } else if code.contains('R') || code.contains('C') {
                summary.renamed += 1;
            } else if code.contains('A') {
                summary.added += 1;
            } else if code.contains('D') {
                summary.deleted += 1;
            } else if code.contains(&['M', 'T', 'U'][..]) {
                summary.modified += 1;
            }
        }
        summary
    }
}
