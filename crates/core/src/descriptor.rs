//! JVM method descriptor parsing.

use chaff_utils::errors::DescriptorError;

/// Returns the argument types of a method descriptor as Java class names
/// (`kotlin.coroutines.Continuation`, `int`, `java.lang.String[]`, ...).
///
/// # Examples
/// ```rust,ignore
/// let args = argument_class_names("(ILjava/lang/String;[J)V").unwrap();
/// assert_eq!(args, vec!["int", "java.lang.String", "long[]"]);
/// ```
pub fn argument_class_names(descriptor: &str) -> Result<Vec<String>, DescriptorError> {
    let params = descriptor
        .strip_prefix('(')
        .and_then(|rest| rest.split_once(')'))
        .map(|(params, _)| params)
        .ok_or_else(|| DescriptorError::Malformed(descriptor.to_string()))?;

    let bytes = params.as_bytes();
    let mut names = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let mut dims = 0;
        while pos < bytes.len() && bytes[pos] == b'[' {
            dims += 1;
            pos += 1;
        }
        let Some(&tag) = bytes.get(pos) else {
            return Err(DescriptorError::Malformed(descriptor.to_string()));
        };
        let mut name = match tag {
            b'Z' => "boolean".to_string(),
            b'B' => "byte".to_string(),
            b'C' => "char".to_string(),
            b'S' => "short".to_string(),
            b'I' => "int".to_string(),
            b'J' => "long".to_string(),
            b'F' => "float".to_string(),
            b'D' => "double".to_string(),
            b'L' => {
                let end = params[pos..]
                    .find(';')
                    .map(|offset| pos + offset)
                    .ok_or_else(|| DescriptorError::Malformed(descriptor.to_string()))?;
                let internal = &params[pos + 1..end];
                pos = end;
                internal.replace('/', ".")
            }
            other => {
                return Err(DescriptorError::UnexpectedChar {
                    descriptor: descriptor.to_string(),
                    // +1 for the opening parenthesis
                    offset: pos + 1,
                    found: other as char,
                });
            }
        };
        pos += 1;
        for _ in 0..dims {
            name.push_str("[]");
        }
        names.push(name);
    }
    Ok(names)
}

/// True when the last declared argument has the given Java class name.
/// Malformed descriptors never match.
pub fn last_argument_is(descriptor: &str, class_name: &str) -> bool {
    argument_class_names(descriptor)
        .ok()
        .and_then(|args| args.last().map(|last| last == class_name))
        .unwrap_or(false)
}
