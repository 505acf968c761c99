//! Shader source loading and preprocessing.
//!
//! WGSL has no preprocessor, so multi-stage shader files gate stages behind
//! `#ifdef NAME` / `#else` / `#endif` line blocks and parameterize constants
//! with `${NAME}` placeholders. Both are expanded here before the source
//! reaches a backend compiler; directive lines never appear in the output.

use std::path::Path;

use crate::util::{Error, Result};

/// Load a shader from disk and preprocess it.
///
/// A missing or unreadable file is a resolution failure, same as a missing
/// scene node: the name could not be resolved to a resource.
pub fn load(path: &Path, defines: &[(&str, &str)]) -> Result<String> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| Error::resolution(format!("shader '{}': {}", path.display(), e)))?;
    preprocess(&source, defines)
}

/// Expand defines in `source`: filter `#ifdef` blocks and substitute
/// `${NAME}` placeholders.
pub fn preprocess(source: &str, defines: &[(&str, &str)]) -> Result<String> {
    struct Frame {
        parent_active: bool,
        defined: bool,
        in_else: bool,
    }
    impl Frame {
        fn active(&self) -> bool {
            self.parent_active && (self.defined != self.in_else)
        }
    }

    let mut out = String::with_capacity(source.len());
    let mut stack: Vec<Frame> = Vec::new();

    for (index, line) in source.lines().enumerate() {
        let lineno = index + 1;
        let trimmed = line.trim();

        if let Some(rest) = trimmed.strip_prefix("#ifdef") {
            let name = rest.trim();
            if name.is_empty() {
                return Err(Error::resolution(format!(
                    "shader line {lineno}: #ifdef without a name"
                )));
            }
            let parent_active = stack.last().map_or(true, Frame::active);
            stack.push(Frame {
                parent_active,
                defined: defines.iter().any(|(n, _)| *n == name),
                in_else: false,
            });
            continue;
        }
        if trimmed == "#else" {
            match stack.last_mut() {
                Some(frame) if !frame.in_else => frame.in_else = true,
                _ => {
                    return Err(Error::resolution(format!(
                        "shader line {lineno}: #else without matching #ifdef"
                    )))
                }
            }
            continue;
        }
        if trimmed == "#endif" {
            if stack.pop().is_none() {
                return Err(Error::resolution(format!(
                    "shader line {lineno}: #endif without matching #ifdef"
                )));
            }
            continue;
        }

        if stack.last().map_or(true, Frame::active) {
            out.push_str(&substitute(line, defines, lineno)?);
            out.push('\n');
        }
    }

    if !stack.is_empty() {
        return Err(Error::resolution("shader: unterminated #ifdef block"));
    }
    Ok(out)
}

fn substitute(line: &str, defines: &[(&str, &str)], lineno: usize) -> Result<String> {
    if !line.contains("${") {
        return Ok(line.to_string());
    }
    let mut expanded = line.to_string();
    for (name, value) in defines {
        expanded = expanded.replace(&format!("${{{name}}}"), value);
    }
    if let Some(start) = expanded.find("${") {
        let tail = &expanded[start..];
        let token = tail.split('}').next().unwrap_or(tail);
        return Err(Error::resolution(format!(
            "shader line {lineno}: undefined placeholder '{token}}}'"
        )));
    }
    Ok(expanded)
}
