use crate::{
    diagnostics::DiagnosticLogger,
    models::{sanitize_exception, sanitize_message, sanitize_string, MAX_STRING_LENGTH},
    serializer::{Contract, Field, FieldType, FieldValue},
};
use once_cell::sync::Lazy;
use regex::Regex;

pub(crate) const NOT_SPECIFIED: &str = "not_specified";

/// Parsed stacks above this size lose frames from the middle.
const PARSED_STACK_THRESHOLD: usize = 32 * 1024;

static STACK_FRAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\s+at)?(.*?)(@|\s\(|\s)([^(@\n]+):([0-9]+):([0-9]+)(\)?)$")
        .expect("stack frame regex should be valid")
});

/// Exception details of the exception in a chain.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExceptionDetails {
    /// Exception type name.
    pub(crate) type_name: String,

    /// Exception message.
    pub(crate) message: String,

    /// Whether `parsed_stack` holds at least one frame.
    pub(crate) has_full_stack: bool,

    /// Text describing the stack. Either stack or parsedStack should have a value.
    pub(crate) stack: Option<String>,

    /// List of stack frames. Either stack or parsedStack should have a value.
    pub(crate) parsed_stack: Option<Vec<StackFrame>>,
}

impl ExceptionDetails {
    pub(crate) fn new(
        logger: &DiagnosticLogger,
        type_name: Option<&str>,
        message: Option<&str>,
        stack: Option<&str>,
    ) -> Self {
        let parsed_stack = stack.map(parse_stack);
        Self {
            type_name: type_name
                .map(|name| sanitize_string(logger, name, MAX_STRING_LENGTH))
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| NOT_SPECIFIED.into()),
            message: message
                .map(|message| sanitize_message(logger, message))
                .filter(|message| !message.is_empty())
                .unwrap_or_else(|| NOT_SPECIFIED.into()),
            has_full_stack: parsed_stack.as_ref().map_or(false, |frames| !frames.is_empty()),
            stack: stack.map(|stack| sanitize_exception(logger, stack)),
            parsed_stack,
        }
    }
}

impl Contract for ExceptionDetails {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("typeName", FieldType::REQUIRED, self.type_name.as_str()),
            Field::new("message", FieldType::REQUIRED, self.message.as_str()),
            Field::new("hasFullStack", FieldType::DEFAULT, FieldValue::Bool(self.has_full_stack)),
            Field::new("stack", FieldType::DEFAULT, self.stack.as_deref()),
            Field::new(
                "parsedStack",
                FieldType::ARRAY,
                self.parsed_stack
                    .as_ref()
                    .map_or(FieldValue::Absent, |frames| {
                        FieldValue::Objects(frames.iter().map(|f| f as &dyn Contract).collect())
                    }),
            ),
        ]
    }
}

/// Stack frame information.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StackFrame {
    /// Level in the call stack. For the long stacks SDK may not report every function in a call
    /// stack.
    pub(crate) level: i64,

    /// Method name.
    pub(crate) method: String,

    /// Name of the assembly (dll, jar, etc.) containing this function.
    pub(crate) assembly: String,

    /// File name or URL of the method implementation.
    pub(crate) file_name: String,

    /// Line number of the code implementation.
    pub(crate) line: i64,

    size_in_bytes: usize,
}

impl StackFrame {
    const BASE_SIZE: usize = 58;

    fn new(frame: &str, level: i64) -> Self {
        let mut method = "<no_method>".to_string();
        let mut file_name = String::new();
        let mut line = 0;
        if let Some(captures) = STACK_FRAME_REGEX.captures(frame) {
            let name = captures.get(2).map_or("", |m| m.as_str().trim());
            if !name.is_empty() {
                method = name.to_string();
            }
            file_name = captures
                .get(4)
                .map_or("", |m| m.as_str().trim())
                .to_string();
            line = captures
                .get(5)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or_default();
        }
        let assembly = frame.trim().to_string();
        let size_in_bytes = method.chars().count()
            + file_name.chars().count()
            + assembly.chars().count()
            + Self::BASE_SIZE
            + level.to_string().len()
            + line.to_string().len();
        Self {
            level,
            method,
            assembly,
            file_name,
            line,
            size_in_bytes,
        }
    }
}

impl Contract for StackFrame {
    fn fields(&self) -> Vec<Field<'_>> {
        vec![
            Field::new("level", FieldType::REQUIRED, FieldValue::Int(self.level)),
            Field::new("method", FieldType::REQUIRED, self.method.as_str()),
            Field::new("assembly", FieldType::DEFAULT, self.assembly.as_str()),
            Field::new("fileName", FieldType::DEFAULT, self.file_name.as_str()),
            Field::new("line", FieldType::DEFAULT, FieldValue::Int(self.line)),
        ]
    }
}

/// Parse the frames of a stack trace. When the frames are too large, the largest matching
/// number of frames from the top and the bottom is kept.
pub(crate) fn parse_stack(stack: &str) -> Vec<StackFrame> {
    let mut frames: Vec<StackFrame> = stack
        .split('\n')
        .filter(|frame| STACK_FRAME_REGEX.is_match(frame))
        .enumerate()
        .map(|(level, frame)| StackFrame::new(frame, level as i64))
        .collect();

    let total_size: usize = frames.iter().map(|f| f.size_in_bytes).sum();
    if total_size > PARSED_STACK_THRESHOLD {
        // Keep pairs from both ends while they fit; everything between them goes, including
        // an odd centre frame.
        let len = frames.len();
        let mut size = 0;
        let mut kept = 0;
        while kept < len - 1 - kept {
            let pair = frames[kept].size_in_bytes + frames[len - 1 - kept].size_in_bytes;
            if size + pair > PARSED_STACK_THRESHOLD {
                break;
            }
            size += pair;
            kept += 1;
        }
        frames.drain(kept..len - kept);
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("    at foo (http://host/app.js:10:5)", "foo", "http://host/app.js", 10 ; "chrome")]
    #[test_case("bar@http://host/app.js:20:7", "bar", "http://host/app.js", 20 ; "firefox")]
    #[test_case("    at http://host/app.js:3:1", "<no_method>", "http://host/app.js", 3 ; "anonymous")]
    fn parses_frame(frame: &str, method: &str, file_name: &str, line: i64) {
        let frames = parse_stack(frame);
        assert_eq!(1, frames.len());
        assert_eq!(method, frames[0].method);
        assert_eq!(file_name, frames[0].file_name);
        assert_eq!(line, frames[0].line);
        assert_eq!(frame.trim(), frames[0].assembly);
    }

    #[test]
    fn skips_lines_without_location() {
        let frames = parse_stack(
            "TypeError: x is undefined\n    at a (app.js:1:1)\n    at b (app.js:2:2)",
        );
        assert_eq!(2, frames.len());
        assert_eq!(0, frames[0].level);
        assert_eq!("b", frames[1].method);
        assert_eq!(1, frames[1].level);
    }

    #[test]
    fn frame_size() {
        let frame = StackFrame::new("    at foo (app.js:10:5)", 3);
        // method + file name + assembly + base + level digits + line digits
        assert_eq!(3 + 6 + 20 + 58 + 1 + 2, frame.size_in_bytes);
    }

    #[test]
    fn trims_large_stacks_from_the_middle() {
        let stack: Vec<String> = (0..400)
            .map(|i| format!("    at method{} ({}.js:{}:1)", i, "f".repeat(100), i))
            .collect();
        let frames = parse_stack(&stack.join("\n"));
        assert!(frames.len() < 400);
        let size: usize = frames.iter().map(|f| f.size_in_bytes).sum();
        assert!(size <= PARSED_STACK_THRESHOLD);
        assert_eq!("method0", frames[0].method);
        assert_eq!("method399", frames[frames.len() - 1].method);
        assert_eq!(frames.len() / 2, frames.iter().filter(|f| f.level < 200).count());
    }

    #[test]
    fn drops_oversized_centre_frame() {
        let stack = format!(
            "    at a (app.js:1:1)\n    at big ({}.js:2:1)\n    at c (app.js:3:1)",
            "x".repeat(40_000)
        );
        let frames = parse_stack(&stack);
        let methods: Vec<&str> = frames.iter().map(|f| f.method.as_str()).collect();
        assert_eq!(vec!["a", "c"], methods);
        let size: usize = frames.iter().map(|f| f.size_in_bytes).sum();
        assert!(size <= PARSED_STACK_THRESHOLD);
    }

    #[test]
    fn drops_single_oversized_frame() {
        let stack = format!("    at big ({}.js:2:1)", "x".repeat(40_000));
        assert!(parse_stack(&stack).is_empty());
    }

    #[test]
    fn defaults_for_missing_names() {
        let logger = DiagnosticLogger::default();
        let details = ExceptionDetails::new(&logger, None, Some(""), None);
        assert_eq!(NOT_SPECIFIED, details.type_name);
        assert_eq!(NOT_SPECIFIED, details.message);
        assert!(!details.has_full_stack);
        assert_eq!(None, details.parsed_stack);
    }
}
