use brine_flatjson_schema::FieldKind;

/// The C type a field of the given kind is stored as in the generated struct.
pub fn c_type(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::String  => "char*",
        FieldKind::Integer => "int64_t",
        FieldKind::Boolean => "bool",
    }
}

/// Looks up the C type for a declared type name that has not been validated.
pub fn c_type_for_declared(type_name: &str) -> Option<&'static str> {
    FieldKind::from_type_name(type_name).map(c_type)
}
