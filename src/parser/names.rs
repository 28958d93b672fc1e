//! JVM type descriptor to Java-style display name conversion.
//!
//! `Ljava/lang/String;` -> `java.lang.String`, `[I` -> `int []`,
//! `[[Lfoo/Bar;` -> `foo.Bar [] []`.

/// Spelled-out name for a primitive descriptor code
fn primitive_name(code: &str) -> Option<&'static str> {
    let name = match code {
        "B" => "byte",
        "C" => "char",
        "I" => "int",
        "S" => "short",
        "J" => "long",
        "D" => "double",
        "F" => "float",
        "V" => "void",
        "Z" => "boolean",
        _ => return None,
    };
    Some(name)
}

/// Convert a raw class descriptor into its Java-style display name
///
/// One `L` directly after the array brackets and one trailing `;` are
/// dropped, a lone primitive code is spelled out, every leading `[` becomes
/// a trailing ` []`, and `/` separators become `.`.
pub fn normalize_class_name(raw: &str) -> String {
    let dimensions = raw.bytes().take_while(|&b| b == b'[').count();

    let mut element = &raw[dimensions..];
    if let Some(rest) = element.strip_prefix('L') {
        element = rest;
    }
    if let Some(rest) = element.strip_suffix(';') {
        element = rest;
    }

    let element = primitive_name(element).unwrap_or(element);

    let mut name = String::with_capacity(element.len() + dimensions * 3);
    name.push_str(element);
    for _ in 0..dimensions {
        name.push_str(" []");
    }

    name.replace('/', ".")
}

/// Decode raw descriptor bytes into a display name
///
/// Invalid UTF-8 is replaced rather than rejected; names are only ever shown.
pub fn decode_class_name(bytes: &[u8], java_style: bool) -> (String, Option<String>) {
    let raw = String::from_utf8_lossy(bytes).into_owned();
    let display = java_style.then(|| normalize_class_name(&raw));
    (raw, display)
}
