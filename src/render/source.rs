//! Splits a single `.shader` file into its vertex and fragment sections.
//!
//! A file looks like this:
//!
//! ```text
//! #shader vertex
//! #version 330 core
//! ...
//! #shader fragment
//! #version 330 core
//! ...
//! ```
//!
//! Any line containing `#shader` is a section marker. If the marker also
//! contains `vertex` the following lines belong to the vertex stage, any
//! other marker selects the fragment stage. Sections run until the next
//! marker or the end of the file.

use crate::utils::error::ParseError;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

pub const SHADER_MARKER: &str = "#shader";
pub const VERTEX_TOKEN: &str = "vertex";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }

    /// Stage selected by a marker line. Only `vertex` is recognised, every
    /// other marker falls through to the fragment stage.
    fn from_marker(line: &str) -> Self {
        if line.contains(VERTEX_TOKEN) {
            ShaderStage::Vertex
        } else {
            ShaderStage::Fragment
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Vertex and fragment source text of one program, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderProgramSource {
    pub vertex: String,
    pub fragment: String,
}

impl ShaderProgramSource {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ParseError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ParseError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let source = Self::from_reader(BufReader::new(file))?;
        log::debug!(
            "Split {:?}: {} vertex bytes, {} fragment bytes",
            path,
            source.vertex.len(),
            source.fragment.len()
        );
        Ok(source)
    }

    pub fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, ParseError> {
        let mut source = Self::default();
        let mut active: Option<ShaderStage> = None;
        let mut raw = Vec::new();
        let mut line_no = 0;

        loop {
            raw.clear();
            if reader.read_until(b'\n', &mut raw)? == 0 {
                break;
            }
            line_no += 1;

            // Only the line feed is a terminator, a trailing '\r' is kept verbatim.
            let bytes = raw.strip_suffix(b"\n").unwrap_or(&raw);
            // Non UTF-8 bytes (a Latin-1 comment, say) become U+FFFD instead of failing the file.
            let line = String::from_utf8_lossy(bytes);
            let content = line.as_ref();

            if content.contains(SHADER_MARKER) {
                active = Some(ShaderStage::from_marker(content));
                continue;
            }

            let stage = active.ok_or(ParseError::ContentBeforeMarker { line: line_no })?;
            let buffer = source.buffer_mut(stage);
            buffer.push_str(content);
            buffer.push('\n');
        }

        Ok(source)
    }

    pub fn source(&self, stage: ShaderStage) -> &str {
        match stage {
            ShaderStage::Vertex => &self.vertex,
            ShaderStage::Fragment => &self.fragment,
        }
    }

    fn buffer_mut(&mut self, stage: ShaderStage) -> &mut String {
        match stage {
            ShaderStage::Vertex => &mut self.vertex,
            ShaderStage::Fragment => &mut self.fragment,
        }
    }

    pub fn into_parts(self) -> (String, String) {
        (self.vertex, self.fragment)
    }
}

impl FromStr for ShaderProgramSource {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_reader(s.as_bytes())
    }
}

/// Reads `path` and returns its `(vertex, fragment)` sources.
pub fn split<P: AsRef<Path>>(path: P) -> Result<(String, String), ParseError> {
    ShaderProgramSource::from_file(path).map(ShaderProgramSource::into_parts)
}
