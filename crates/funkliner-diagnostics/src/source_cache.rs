//! Sources registered for diagnostic rendering.

use crate::span::{FileId, Location, Span};

/// A registered source with its line table.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: FileId,
    /// Display name (a path or a role such as `library`)
    pub name: String,
    pub source: String,
    line_starts: Vec<u32>,
}

impl SourceFile {
    fn new(id: FileId, name: String, source: String) -> Self {
        let line_starts = compute_line_starts(&source);
        Self {
            id,
            name,
            source,
            line_starts,
        }
    }

    /// 1-indexed line and column for a byte offset.
    pub fn line_column(&self, offset: u32) -> (u32, u32) {
        let offset = offset.min(self.source.len() as u32);

        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.saturating_sub(1),
        };

        let line_start = self.line_starts[line_idx];
        ((line_idx + 1) as u32, (offset - line_start + 1).max(1))
    }

    /// Text of a 1-indexed line without its line terminator.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        if line == 0 {
            return None;
        }

        let idx = (line - 1) as usize;
        let start = *self.line_starts.get(idx)? as usize;
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&e| e as usize)
            .unwrap_or(self.source.len());

        Some(
            self.source[start..end]
                .trim_end_matches('\n')
                .trim_end_matches('\r'),
        )
    }

    pub fn slice(&self, start: u32, end: u32) -> Option<&str> {
        self.source.get(start as usize..end as usize)
    }
}

fn compute_line_starts(source: &str) -> Vec<u32> {
    let mut starts = vec![0];
    for (i, c) in source.char_indices() {
        if c == '\n' {
            starts.push((i + 1) as u32);
        }
    }
    starts
}

/// Sources indexed by [`FileId`].
///
/// An inliner run registers at most a handful of sources (library, snippet,
/// and the snippet of every later pass), so a flat vector is enough.
#[derive(Debug, Default)]
pub struct SourceCache {
    files: Vec<SourceFile>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Register a source and return its id. Registering the same name and
    /// text twice returns the existing id.
    pub fn add_file(&mut self, name: impl Into<String>, source: String) -> FileId {
        let name = name.into();
        if let Some(existing) = self
            .files
            .iter()
            .find(|f| f.name == name && f.source == source)
        {
            return existing.id;
        }

        let id = FileId(self.files.len() as u32);
        self.files.push(SourceFile::new(id, name, source));
        id
    }

    pub fn get_file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0 as usize)
    }

    pub fn location(&self, span: Span) -> Option<Location> {
        if span.is_dummy() {
            return None;
        }

        let file = self.get_file(span.file_id)?;
        let (line, column) = file.line_column(span.start);

        Some(Location {
            file: file.name.clone(),
            line,
            column,
        })
    }

    pub fn source_text(&self, span: Span) -> Option<&str> {
        if span.is_dummy() {
            return None;
        }
        self.get_file(span.file_id)?.slice(span.start, span.end)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_starts() {
        assert_eq!(compute_line_starts("a;\nb;\nc;"), vec![0, 3, 6]);
    }

    #[test]
    fn test_line_column() {
        let mut cache = SourceCache::new();
        let id = cache.add_file("snippet", "var x;\nlog(x);\n".to_string());
        let file = cache.get_file(id).unwrap();

        assert_eq!(file.line_column(0), (1, 1));
        assert_eq!(file.line_column(5), (1, 6));
        assert_eq!(file.line_column(7), (2, 1));
        assert_eq!(file.line_column(11), (2, 5));
    }

    #[test]
    fn test_line_text() {
        let mut cache = SourceCache::new();
        let id = cache.add_file("library", "function f() {\r\n}\n".to_string());
        let file = cache.get_file(id).unwrap();

        assert_eq!(file.line_text(1), Some("function f() {"));
        assert_eq!(file.line_text(2), Some("}"));
        assert_eq!(file.line_text(0), None);
    }

    #[test]
    fn test_same_source_reuses_id() {
        let mut cache = SourceCache::new();
        let a = cache.add_file("snippet", "log(1)".to_string());
        let b = cache.add_file("snippet", "log(1)".to_string());
        let c = cache.add_file("snippet", "log(2)".to_string());
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_location_and_text() {
        let mut cache = SourceCache::new();
        let id = cache.add_file("snippet", "var x = 1;\nadd(x, 2);".to_string());

        let span = Span::new(id, 11, 14);
        let loc = cache.location(span).unwrap();
        assert_eq!(loc.to_string(), "snippet:2:1");
        assert_eq!(cache.source_text(span), Some("add"));
        assert_eq!(cache.location(Span::DUMMY), None);
    }
}
