//! Signature rendering for commands.
//!
//! A signature is built as a list of typed [`Span`]s. The plain signature is
//! the concatenation of the span texts; the highlighted signature wraps each
//! typed span in `<span class="...">` markup. Both come from the same spans,
//! so removing the markup from a highlight always yields the plain signature.

use std::sync::LazyLock;

use regex::Regex;

use crate::commands::{Arg, Command, CommandMode};

static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Address,
    Name,
    ParamName,
    ParamType,
    ClassName,
    MemberName,
    ReturnVarType,
    Plain,
}

impl SpanKind {
    pub fn css_class(self) -> Option<&'static str> {
        match self {
            Self::Address => Some("opcode-address"),
            Self::Name => Some("opcode-name"),
            Self::ParamName => Some("opcode-param-name"),
            Self::ParamType => Some("opcode-param-type"),
            Self::ClassName => Some("opcode-class-name"),
            Self::MemberName => Some("opcode-member-name"),
            Self::ReturnVarType => Some("opcode-return-var-type"),
            Self::Plain => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub kind: SpanKind,
    pub text: String,
}

#[derive(Default)]
struct SpanWriter {
    spans: Vec<Span>,
}

impl SpanWriter {
    fn push(&mut self, kind: SpanKind, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        // Merge adjacent plain text so separators stay in one span.
        if kind == SpanKind::Plain
            && let Some(last) = self.spans.last_mut()
            && last.kind == SpanKind::Plain
        {
            last.text.push_str(&text);
            return;
        }
        self.spans.push(Span { kind, text });
    }

    fn plain(&mut self, text: &str) {
        self.push(SpanKind::Plain, text);
    }

    /// Push groups of spans separated by `separator`, skipping empty groups.
    fn join(&mut self, groups: Vec<Vec<Span>>, separator: &str) {
        let mut first = true;
        for group in groups.into_iter().filter(|g| !g.is_empty()) {
            if !first {
                self.plain(separator);
            }
            first = false;
            for span in group {
                self.push(span.kind, span.text);
            }
        }
    }

    fn finish(self) -> Vec<Span> {
        self.spans
    }
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.trim().is_empty())
}

/// `var_local` → `local var`, etc.
pub fn normalize_var_source(source: &str) -> &str {
    match source {
        "var_any" => "var",
        "var_global" => "global var",
        "var_local" => "local var",
        other => other,
    }
}

fn opcode_input_arg(arg: &Arg) -> Vec<Span> {
    let mut pieces = Vec::new();
    if let Some(name) = non_blank(arg.name.as_ref()) {
        pieces.push(vec![Span {
            kind: SpanKind::ParamName,
            text: format!("{{{name}}}"),
        }]);
    }
    if let Some(ty) = non_blank(arg.r#type.as_ref()) {
        pieces.push(vec![Span {
            kind: SpanKind::ParamType,
            text: format!("[{ty}]"),
        }]);
    }
    if let Some(source) = non_blank(arg.source.as_ref()) {
        pieces.push(vec![Span {
            kind: SpanKind::Plain,
            text: source.to_string(),
        }]);
    }

    let mut writer = SpanWriter::default();
    writer.join(pieces, " ");
    writer.finish()
}

fn opcode_output_arg(arg: &Arg) -> Vec<Span> {
    let mut writer = SpanWriter::default();
    writer.plain("[");
    if let Some(source) = arg.source.as_deref().filter(|s| !s.is_empty()) {
        writer.push(SpanKind::ReturnVarType, normalize_var_source(source));
        writer.plain(" ");
    }
    if let Some(name) = non_blank(arg.name.as_ref()) {
        writer.push(SpanKind::ParamName, format!("{name}:"));
        writer.plain(" ");
    }
    writer.push(SpanKind::ParamType, arg.r#type.as_deref().unwrap_or_default());
    writer.plain("]");
    writer.finish()
}

fn class_output_arg(arg: &Arg) -> Vec<Span> {
    let mut pieces = Vec::new();
    if let Some(name) = non_blank(arg.name.as_ref()) {
        pieces.push(vec![Span {
            kind: SpanKind::ParamName,
            text: name.to_string(),
        }]);
    }
    if let Some(ty) = non_blank(arg.r#type.as_ref()) {
        pieces.push(vec![Span {
            kind: SpanKind::ReturnVarType,
            text: format!("[{ty}]"),
        }]);
    }

    let mut writer = SpanWriter::default();
    writer.join(pieces, " ");
    writer.finish()
}

fn opcode_spans(command: &Command) -> Vec<Span> {
    let mut writer = SpanWriter::default();
    writer.push(SpanKind::Address, format!("{}:", command.id));
    writer.plain(" ");

    if let Some(output) = &command.output {
        writer.join(output.iter().map(opcode_output_arg).collect(), ", ");
        writer.plain(" ");
    }

    writer.push(SpanKind::Name, command.name.as_str());
    writer.plain(" ");

    if let Some(input) = &command.input {
        writer.join(input.iter().map(opcode_input_arg).collect(), " ");
    }
    writer.finish()
}

fn class_member_spans(command: &Command) -> Vec<Span> {
    let mut writer = SpanWriter::default();

    if let Some(output) = &command.output {
        write_separated(&mut writer, output.iter().map(class_output_arg).collect(), ", ");
        writer.plain(" = ");
    }

    writer.push(
        SpanKind::ClassName,
        command.class.as_deref().unwrap_or_default(),
    );
    writer.plain(".");
    writer.push(
        SpanKind::MemberName,
        command.member.as_deref().unwrap_or_default(),
    );

    writer.plain("(");
    if let Some(input) = &command.input {
        let names = input
            .iter()
            .map(|arg| {
                let name = arg.name.as_deref().unwrap_or_default();
                vec![Span {
                    kind: SpanKind::ParamName,
                    text: name.to_string(),
                }]
            })
            .collect::<Vec<_>>();
        write_separated(&mut writer, names, ", ");
    }
    writer.plain(")");
    writer.finish()
}

/// Like [`SpanWriter::join`] but keeps empty groups, so a nameless argument
/// still gets its separator.
fn write_separated(writer: &mut SpanWriter, groups: Vec<Vec<Span>>, separator: &str) {
    for (i, group) in groups.into_iter().enumerate() {
        if i > 0 {
            writer.plain(separator);
        }
        for span in group {
            writer.push(span.kind, span.text);
        }
    }
}

/// Typed spans of the signature of `command` in `mode`.
pub fn signature_spans(command: &Command, mode: CommandMode) -> Vec<Span> {
    match mode {
        CommandMode::Opcode => opcode_spans(command),
        CommandMode::ClassMember => class_member_spans(command),
    }
}

/// Plain signature of `command` in `mode`.
pub fn format(command: &Command, mode: CommandMode) -> String {
    signature_spans(command, mode)
        .into_iter()
        .map(|span| span.text)
        .collect()
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
}

/// Render spans to markup, wrapping unsupported commands in `<s>`.
pub fn render(spans: &[Span], is_unsupported: bool) -> String {
    let mut out = String::new();
    for span in spans {
        match span.kind.css_class() {
            Some(class) => {
                out.push_str("<span class=\"");
                out.push_str(class);
                out.push_str("\">");
                escape_into(&mut out, &span.text);
                out.push_str("</span>");
            },
            None => escape_into(&mut out, &span.text),
        }
    }

    if is_unsupported {
        format!("<s>{out}</s>")
    } else {
        out
    }
}

/// Highlight `signature`, a signature previously rendered for `command`.
///
/// A signature that does not match the command's current rendering is
/// returned without span markup.
pub fn highlight(signature: &str, command: &Command, mode: CommandMode) -> String {
    let spans = signature_spans(command, mode);
    let rendered: String = spans.iter().map(|s| s.text.as_str()).collect();

    if rendered == signature {
        render(&spans, command.is_unsupported)
    } else {
        let plain = [Span {
            kind: SpanKind::Plain,
            text: signature.to_string(),
        }];
        render(&plain, command.is_unsupported)
    }
}

/// Remove every markup tag and undo the text escaping of [`render`].
pub fn strip_markup(markup: &str) -> String {
    MARKUP
        .replace_all(markup, "")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
