//! Static Validator: an AST walk over strategy-artifact source that
//! rejects forbidden constructs and unknown field references before any
//! sandbox is spawned, using a whole-file `tree-sitter` Python parse.

mod error;
mod violation;

pub use error::{ValidationError, ValidationResult};
pub use violation::{Rule, ValidationOutcome, Violation};

use crate::field_manifest::FieldManifest;
use tree_sitter::{Node, Parser};

/// Call-site function names that must never appear in artifact source.
const FORBIDDEN_DYNAMIC_EVAL: &[&str] = &["eval", "exec", "compile", "__import__"];
const FORBIDDEN_FILESYSTEM: &[&str] = &["open", "os.remove", "os.unlink", "shutil.rmtree"];
const FORBIDDEN_SUBPROCESS: &[&str] =
    &["subprocess.run", "subprocess.Popen", "subprocess.call", "os.system", "os.popen"];
const FORBIDDEN_NETWORK: &[&str] =
    &["socket.socket", "urllib.request.urlopen", "requests.get", "requests.post", "http.client.HTTPConnection"];

/// Names of calls that perform a temporal shift/offset and therefore must be
/// called with a positive integer literal.
const SHIFT_LIKE_CALLS: &[&str] = &["shift", "offset"];

/// Names of calls whose first string-literal argument is a field reference.
const FIELD_LOOKUP_CALLS: &[&str] = &["get", "indicator"];

/// The call that produces the single simulated-result/backtest-report object.
const BACKTEST_REPORT_CALL: &str = "simulate";

/// Run the Static Validator against strategy-artifact source text.
///
/// Deterministic and pure: identical `text` always yields a byte-identical
/// `ValidationOutcome`.
pub fn validate(text: &str, manifest: &FieldManifest) -> ValidationResult<ValidationOutcome> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .expect("tree-sitter-python language");

    let tree = parser.parse(text, None).ok_or(ValidationError::ParseFailed)?;
    let root = tree.root_node();
    let source = text.as_bytes();

    let mut violations = Vec::new();
    let mut report_calls = 0usize;
    walk(root, source, manifest, &mut violations, &mut report_calls);

    if report_calls == 0 {
        violations.push(Violation::new(Rule::MissingBacktestReport, 0, "<no simulate(...) call found>"));
    } else if report_calls > 1 {
        violations.push(Violation::new(
            Rule::MultipleBacktestReports,
            0,
            format!("<{report_calls} simulate(...) calls found>"),
        ));
    }

    violations.sort_by_key(|v| v.line);

    Ok(ValidationOutcome { ok: violations.is_empty(), violations })
}

fn walk(
    node: Node,
    source: &[u8],
    manifest: &FieldManifest,
    violations: &mut Vec<Violation>,
    report_calls: &mut usize,
) {
    match node.kind() {
        "import_statement" | "import_from_statement" => {
            violations.push(Violation::new(Rule::NoImport, line_of(node), node_text(node, source)));
        }
        "call" => {
            check_call(node, source, manifest, violations, report_calls);
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, source, manifest, violations, report_calls);
    }
}

fn check_call(
    node: Node,
    source: &[u8],
    manifest: &FieldManifest,
    violations: &mut Vec<Violation>,
    report_calls: &mut usize,
) {
    let Some(function) = node.child_by_field_name("function") else { return };
    let callee = node_text(function, source);
    let line = line_of(node);

    if FORBIDDEN_DYNAMIC_EVAL.contains(&callee.as_str()) {
        violations.push(Violation::new(Rule::NoDynamicEval, line, node_text(node, source)));
    } else if FORBIDDEN_FILESYSTEM.contains(&callee.as_str()) {
        violations.push(Violation::new(Rule::NoFilesystem, line, node_text(node, source)));
    } else if FORBIDDEN_SUBPROCESS.contains(&callee.as_str()) {
        violations.push(Violation::new(Rule::NoSubprocess, line, node_text(node, source)));
    } else if FORBIDDEN_NETWORK.contains(&callee.as_str()) {
        violations.push(Violation::new(Rule::NoNetwork, line, node_text(node, source)));
    }

    let method_name = callee.rsplit('.').next().unwrap_or(&callee);

    if SHIFT_LIKE_CALLS.contains(&method_name) {
        check_shift_argument(node, source, violations, line);
    }

    if FIELD_LOOKUP_CALLS.contains(&method_name) {
        check_field_argument(node, source, manifest, violations, line);
    }

    if method_name == BACKTEST_REPORT_CALL {
        *report_calls += 1;
    }
}

/// Reject `shift`/`offset` calls whose first argument is not a positive
/// integer literal.
fn check_shift_argument(node: Node, source: &[u8], violations: &mut Vec<Violation>, line: usize) {
    let Some(args) = node.child_by_field_name("arguments") else { return };
    let mut cursor = args.walk();
    let first_value = args
        .children(&mut cursor)
        .find(|c| c.kind() == "integer" || c.kind() == "unary_operator");

    match first_value {
        Some(arg) if arg.kind() == "integer" => {
            let text = node_text(arg, source);
            if text.parse::<i64>().map(|v| v <= 0).unwrap_or(true) {
                violations.push(Violation::new(Rule::NonPositiveShift, line, node_text(node, source)));
            }
        }
        Some(arg) => {
            // A unary `-N` or `+N`: negative is always rejected.
            let text = node_text(arg, source);
            if text.trim_start().starts_with('-') {
                violations.push(Violation::new(Rule::NonPositiveShift, line, node_text(node, source)));
            }
        }
        None => {
            violations.push(Violation::new(Rule::NonPositiveShift, line, node_text(node, source)));
        }
    }
}

/// Cross-check a field-lookup call's first string-literal argument against
/// the Field Manifest, attaching a nearest-match suggestion on failure.
fn check_field_argument(
    node: Node,
    source: &[u8],
    manifest: &FieldManifest,
    violations: &mut Vec<Violation>,
    line: usize,
) {
    let Some(args) = node.child_by_field_name("arguments") else { return };
    let mut cursor = args.walk();
    let Some(string_node) = args.children(&mut cursor).find(|c| c.kind() == "string") else { return };

    let raw = node_text(string_node, source);
    let field_name = raw.trim_matches(|c| c == '"' || c == '\'');

    if !manifest.is_valid(field_name) {
        let mut violation = Violation::new(Rule::UnknownField, line, field_name);
        if let Some(suggestion) = manifest.suggest(field_name) {
            violation = violation.with_suggestion(suggestion.canonical_name);
        }
        violations.push(violation);
    }
}

fn line_of(node: Node) -> usize {
    node.start_position().row + 1
}

fn node_text<'a>(node: Node, source: &'a [u8]) -> String {
    node.utf8_text(source).unwrap_or("").to_string()
}
