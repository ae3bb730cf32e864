//! Error types and reporting

use crate::ast::Span;
use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, CompileError>;

/// Compile error: anything that stops a program before it runs
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Lexer error at {span}: {message}")]
    Lexer { message: String, span: Span },

    #[error("Parser error at {span}: {message}")]
    Parser { message: String, span: Span },

    #[error("Analysis error at {span}: {message}")]
    Analysis { message: String, span: Span },

    #[error("IO error: {message}")]
    Io { message: String },
}

impl CompileError {
    pub fn lexer(message: impl Into<String>, span: Span) -> Self {
        Self::Lexer {
            message: message.into(),
            span,
        }
    }

    pub fn parser(message: impl Into<String>, span: Span) -> Self {
        Self::Parser {
            message: message.into(),
            span,
        }
    }

    pub fn analysis(message: impl Into<String>, span: Span) -> Self {
        Self::Analysis {
            message: message.into(),
            span,
        }
    }

    pub fn io_error(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Lexer { span, .. } | Self::Parser { span, .. } | Self::Analysis { span, .. } => {
                Some(*span)
            }
            Self::Io { .. } => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Lexer { message, .. }
            | Self::Parser { message, .. }
            | Self::Analysis { message, .. }
            | Self::Io { message } => message,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Self::Lexer { .. } => "Lexer",
            Self::Parser { .. } => "Parser",
            Self::Analysis { .. } => "Analysis",
            Self::Io { .. } => "IO",
        }
    }
}

impl From<std::io::Error> for CompileError {
    fn from(err: std::io::Error) -> Self {
        CompileError::io_error(err.to_string())
    }
}

/// Kinds of non-fatal diagnostics produced by the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Statement after `break`/`continue`/`return` in the same block
    UnreachableCode,
    /// `:=` used on a subscript target, which always faults at runtime
    ConstantIndexAssign,
}

impl WarningKind {
    pub fn as_str(self) -> &'static str {
        match self {
            WarningKind::UnreachableCode => "unreachable_code",
            WarningKind::ConstantIndexAssign => "constant_index_assign",
        }
    }
}

/// Non-fatal diagnostic
#[derive(Debug, Clone, PartialEq)]
pub struct CompileWarning {
    pub kind: WarningKind,
    pub message: String,
    pub span: Span,
}

impl CompileWarning {
    pub fn unreachable_code(span: Span) -> Self {
        Self {
            kind: WarningKind::UnreachableCode,
            message: "unreachable statement".to_string(),
            span,
        }
    }

    pub fn constant_index_assign(name: &str, span: Span) -> Self {
        Self {
            kind: WarningKind::ConstantIndexAssign,
            message: format!("`{name}[...] := ...` always fails; use `=` to assign an element"),
            span,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind.as_str()
    }
}

/// A labelled diagnostic ready to be rendered against a source file
pub(crate) struct Diagnostic<'a> {
    pub kind: ReportKind<'a>,
    pub title: String,
    pub label: Option<(Span, String)>,
}

impl Diagnostic<'_> {
    fn build(&self, filename: &str, color: bool) -> Report<'_, (String, std::ops::Range<usize>)> {
        let (start, end) = self
            .label
            .as_ref()
            .map_or((0, 0), |(span, _)| (span.start, span.end));
        let mut report = Report::build(self.kind, (filename.to_string(), start..end))
            .with_config(Config::default().with_color(color))
            .with_message(&self.title);
        if let Some((span, message)) = &self.label {
            let label_color = if matches!(self.kind, ReportKind::Warning) {
                Color::Yellow
            } else {
                Color::Red
            };
            report = report.with_label(
                Label::new((filename.to_string(), span.start..span.end))
                    .with_message(message)
                    .with_color(label_color),
            );
        }
        report.finish()
    }

    /// Print to stderr
    pub fn eprint(&self, filename: &str, source: &str) -> std::io::Result<()> {
        self.build(filename, true)
            .eprint((filename.to_string(), Source::from(source)))
    }

    /// Render without colors (used by tests and non-terminal output)
    pub fn render(&self, filename: &str, source: &str) -> String {
        let mut out = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self
            .build(filename, false)
            .write((filename.to_string(), Source::from(source)), &mut out);
        String::from_utf8_lossy(&out).into_owned()
    }
}

impl CompileError {
    pub(crate) fn diagnostic(&self) -> Diagnostic<'static> {
        match self.span() {
            Some(span) => Diagnostic {
                kind: ReportKind::Error,
                title: format!("{} error", self.kind_name()),
                label: Some((span, self.message().to_string())),
            },
            None => Diagnostic {
                kind: ReportKind::Error,
                title: format!("{} error: {}", self.kind_name(), self.message()),
                label: None,
            },
        }
    }
}

impl CompileWarning {
    pub(crate) fn diagnostic(&self) -> Diagnostic<'static> {
        Diagnostic {
            kind: ReportKind::Warning,
            title: format!("warning[{}]", self.kind()),
            label: Some((self.span, self.message.clone())),
        }
    }
}

/// Report error with ariadne
pub fn report_error(filename: &str, source: &str, error: &CompileError) -> std::io::Result<()> {
    error.diagnostic().eprint(filename, source)
}

/// Report warning with ariadne
pub fn report_warning(filename: &str, source: &str, warning: &CompileWarning) -> std::io::Result<()> {
    warning.diagnostic().eprint(filename, source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_and_message() {
        let err = CompileError::parser("expected `;`", Span::new(3, 4));
        assert_eq!(err.span(), Some(Span::new(3, 4)));
        assert_eq!(err.message(), "expected `;`");
    }

    #[test]
    fn test_io_error_has_no_span() {
        let err: CompileError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.span(), None);
        assert!(err.to_string().starts_with("IO error:"));
    }

    #[test]
    fn test_display_includes_span() {
        let err = CompileError::lexer("unexpected character: \"@\"", Span::new(4, 5));
        assert_eq!(
            err.to_string(),
            "Lexer error at 4..5: unexpected character: \"@\""
        );
    }

    #[test]
    fn test_warning_kind_names() {
        let w = CompileWarning::unreachable_code(Span::new(0, 1));
        assert_eq!(w.kind(), "unreachable_code");
        let w = CompileWarning::constant_index_assign("xs", Span::new(0, 1));
        assert_eq!(w.kind(), "constant_index_assign");
        assert!(w.message.contains("xs"));
    }

    #[test]
    fn test_render_points_at_label() {
        let source = "x = ;";
        let err = CompileError::parser("expected expression, found `;`", Span::new(4, 5));
        let rendered = err.diagnostic().render("main.em", source);
        assert!(rendered.contains("Parser error"));
        assert!(rendered.contains("expected expression"));
        assert!(rendered.contains("main.em"));
    }
}
