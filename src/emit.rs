//! Indent/brace-aware emission sink for the generated C text.
//!
//! The generators never touch raw strings-with-indentation; they speak in
//! logical statements and blocks. A block opened through [`CodeWriter::block`]
//! is closed on every exit path of the closure, so emitted braces always
//! balance. `if`/`else if`/`else` ladders go through [`Chain`], which glues
//! each branch onto the previous closing brace.

const INDENT_WIDTH: usize = 4;

/// Column where trailing doc comments start, so consecutive field
/// declarations line up.
const DOC_COLUMN: usize = 40;

#[derive(Debug, Default)]
pub struct CodeWriter {
    lines: Vec<String>,
    indent: usize,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one indented line. An empty string emits a blank line.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if text.is_empty() {
            self.lines.push(String::new());
        } else {
            let mut out = " ".repeat(self.indent * INDENT_WIDTH);
            out.push_str(text);
            self.lines.push(out);
        }
    }

    pub fn blank(&mut self) {
        self.lines.push(String::new());
    }

    /// Line with a trailing `/**< ... */` doc comment, padded to a fixed
    /// column when it fits.
    pub fn doc_line(&mut self, text: &str, doc: Option<&str>) {
        match doc {
            None => self.line(text),
            Some(doc) => self.line(format!("{:<DOC_COLUMN$}/**< {} */", text, doc)),
        }
    }

    /// Splice a text blob verbatim, ignoring the current indent. Used for
    /// caller-supplied prefix/postfix blocks.
    pub fn raw(&mut self, blob: &str) {
        for raw_line in blob.lines() {
            self.lines.push(raw_line.to_string());
        }
    }

    /// `head {` ... `}` with the body emitted one level deeper. The closing
    /// brace is emitted no matter how the closure exits.
    pub fn block<R>(&mut self, head: &str, body: impl FnOnce(&mut Self) -> R) -> R {
        self.line(format!("{head} {{"));
        self.indent += 1;
        let result = body(self);
        self.indent -= 1;
        self.line("}");
        result
    }

    /// Indent without braces (struct bodies, enum label lists).
    pub fn indented<R>(&mut self, body: impl FnOnce(&mut Self) -> R) -> R {
        self.indent += 1;
        let result = body(self);
        self.indent -= 1;
        result
    }

    /// Start an `if` / `else if` / `else` ladder.
    pub fn chain(&mut self) -> Chain<'_> {
        Chain {
            writer: self,
            glued: false,
        }
    }

    pub fn into_string(self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    fn pop_closing_brace(&mut self) -> usize {
        let closed = self
            .lines
            .pop()
            .expect("chain branch must follow a closed block");
        let brace_at = closed
            .find('}')
            .expect("chain branch must follow a closed block");
        debug_assert_eq!(closed.trim(), "}");
        brace_at
    }
}

/// Builder for branch ladders. Each [`Chain::case`] after the first pops the
/// previous closing brace and re-emits it as `} else head {`.
pub struct Chain<'w> {
    writer: &'w mut CodeWriter,
    glued: bool,
}

impl Chain<'_> {
    pub fn case<R>(&mut self, head: &str, body: impl FnOnce(&mut CodeWriter) -> R) -> R {
        if self.glued {
            let column = self.writer.pop_closing_brace();
            self.writer
                .lines
                .push(format!("{}}} else {head} {{", " ".repeat(column)));
            self.writer.indent += 1;
        } else {
            self.writer.line(format!("{head} {{"));
            self.writer.indent += 1;
            self.glued = true;
        }
        let result = body(self.writer);
        self.writer.indent -= 1;
        self.writer.line("}");
        result
    }

    /// Final `else` branch. With no preceding case this degrades to a bare
    /// compound statement, which is what an object with zero declared fields
    /// needs for its unknown-key arm.
    pub fn tail<R>(self, body: impl FnOnce(&mut CodeWriter) -> R) -> R {
        if self.glued {
            let column = self.writer.pop_closing_brace();
            self.writer
                .lines
                .push(format!("{}}} else {{", " ".repeat(column)));
        } else {
            self.writer.line("{");
        }
        self.writer.indent += 1;
        let result = body(self.writer);
        self.writer.indent -= 1;
        self.writer.line("}");
        result
    }
}
