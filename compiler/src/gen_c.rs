//! C code generation for a validated record schema.
//!
//! The output is one text holding a header (the struct definition and the two
//! exported functions) followed by the implementation unit. The builder splits
//! them at the header guard's closing `#endif` line.

use crate::{
    error::{CompileError, TemplateError},
    protocol::{WireProtocol, FIELD_DELIMITER, SUCCESS_SENTINEL},
    template::Template,
    type_map::c_type,
    verifier::{validate, Field, ValidatedSchema},
};
use brine_flatjson_schema::{FieldKind, RecordSchema};

const HEADER: Template = Template::new("header", r#"#ifndef {{guard}}
#define {{guard}}

#include <stdint.h>
#include <stdbool.h>

typedef struct {
{{members}}} {{type_name}};

char* parse_and_serialize(const char* input);
void free_serialized(char* str);

#endif // {{guard}}
"#);

const IMPLEMENTATION: Template = Template::new("implementation", r#"
#include <errno.h>
#include <inttypes.h>
#include <stdbool.h>
#include <stdint.h>
#include <stdio.h>
#include <stdlib.h>
#include <string.h>
#include "{{header_file}}"

typedef struct {
    char* data;
    size_t len;
    size_t cap;
} bfj_buf;

static int bfj_buf_reserve(bfj_buf* buf, size_t extra) {
    size_t need = buf->len + extra + 1;
    if (need <= buf->cap) return 0;
    size_t cap = buf->cap ? buf->cap : 64;
    while (cap < need) cap *= 2;
    char* data = (char*)realloc(buf->data, cap);
    if (data == NULL) return -1;
    buf->data = data;
    buf->cap = cap;
    return 0;
}

static int bfj_buf_append(bfj_buf* buf, const char* text, size_t n) {
    if (bfj_buf_reserve(buf, n) != 0) return -1;
    memcpy(buf->data + buf->len, text, n);
    buf->len += n;
    buf->data[buf->len] = '\0';
    return 0;
}

static int bfj_buf_puts(bfj_buf* buf, const char* text) {
    return bfj_buf_append(buf, text, strlen(text));
}

static const char* bfj_skip_ws(const char* ptr) {
    while (*ptr == ' ' || *ptr == '\n' || *ptr == '\t' || *ptr == '\r') ptr++;
    return ptr;
}

static const char* bfj_skip_separators(const char* ptr) {
    while (*ptr == ' ' || *ptr == '\n' || *ptr == '\t' || *ptr == '\r' || *ptr == ',') ptr++;
    return ptr;
}

/* Reads the quoted literal at *cursor. \" \\ and \/ are resolved, any other
   escape is copied as written. Returns a heap string or NULL. */
static char* bfj_read_string(const char** cursor) {
    const char* ptr = *cursor;
    if (*ptr != '"') return NULL;
    ptr++;

    bfj_buf value = {NULL, 0, 0};
    if (bfj_buf_reserve(&value, 0) != 0) return NULL;
    value.data[0] = '\0';

    while (*ptr != '\0' && *ptr != '"') {
        int status;
        if (*ptr == '\\' && (ptr[1] == '"' || ptr[1] == '\\' || ptr[1] == '/')) {
            status = bfj_buf_append(&value, ptr + 1, 1);
            ptr += 2;
        } else if (*ptr == '\\' && ptr[1] != '\0') {
            status = bfj_buf_append(&value, ptr, 2);
            ptr += 2;
        } else {
            status = bfj_buf_append(&value, ptr, 1);
            ptr++;
        }
        if (status != 0) {
            free(value.data);
            return NULL;
        }
    }

    if (*ptr != '"') {
        free(value.data);
        return NULL;
    }
    *cursor = ptr + 1;
    return value.data;
}

static int bfj_read_integer(const char** cursor, int64_t* out) {
    const char* start = *cursor;
    const char* ptr = start;
    if (*ptr == '-') ptr++;
    const char* digits = ptr;
    while (*ptr >= '0' && *ptr <= '9') ptr++;
    if (ptr == digits) return -1;

    char* end = NULL;
    errno = 0;
    long long value = strtoll(start, &end, 10);
    if (errno == ERANGE || end != ptr) return -1;

    *out = (int64_t)value;
    *cursor = ptr;
    return 0;
}

static int bfj_read_bool(const char** cursor, bool* out) {
    const char* ptr = *cursor;
    if (strncmp(ptr, "true", 4) == 0) {
        *out = true;
        *cursor = ptr + 4;
        return 0;
    }
    if (strncmp(ptr, "false", 5) == 0) {
        *out = false;
        *cursor = ptr + 5;
        return 0;
    }
    return -1;
}

/* Skips the value of an unrecognized key, stopping at the ',' or closing
   brace that ends it. */
static const char* bfj_skip_value(const char* ptr) {
    int depth = 0;
    bool in_string = false;
    while (*ptr != '\0') {
        if (in_string) {
            if (*ptr == '\\' && ptr[1] != '\0') {
                ptr += 2;
                continue;
            }
            if (*ptr == '"') in_string = false;
        } else if (*ptr == '"') {
            in_string = true;
        } else if (*ptr == '{' || *ptr == '[') {
            depth++;
        } else if (*ptr == '}' || *ptr == ']') {
            if (depth == 0) break;
            depth--;
        } else if (*ptr == ',' && depth == 0) {
            break;
        }
        ptr++;
    }
    return ptr;
}

static void bfj_release({{type_name}}* out) {
    (void)out;
{{release}}}

static int parse_record(const char* input, {{type_name}}* out) {
    const char* ptr = bfj_skip_ws(input);
    if (*ptr != '{') return -1;
    ptr++;

    for (;;) {
        ptr = bfj_skip_separators(ptr);
        if (*ptr == '}') return 0;
        if (*ptr != '"') return -1;

        char* key = bfj_read_string(&ptr);
        if (key == NULL) return -1;
        ptr = bfj_skip_ws(ptr);
        if (*ptr != ':') {
            free(key);
            return -1;
        }
        ptr = bfj_skip_ws(ptr + 1);
{{branches}}
        free(key);
        ptr = bfj_skip_value(ptr);
        if (*ptr == '\0') return -1;
    }
}

char* parse_and_serialize(const char* input) {
    {{type_name}} out;
    memset(&out, 0, sizeof(out));

    if (input == NULL || parse_record(input, &out) != 0) {
        bfj_release(&out);
        return NULL;
    }

    bfj_buf buf = {NULL, 0, 0};
    int status = bfj_buf_puts(&buf, "{{success}}");
{{serializers}}
    bfj_release(&out);
    if (status != 0) {
        free(buf.data);
        return NULL;
    }
    return buf.data;
}

void free_serialized(char* str) {
    if (str != NULL) {
        free(str);
    }
}
"#);

const MEMBER: Template = Template::new("member", "    {{c_type}} {{member}};\n");

const RELEASE_STRING: Template = Template::new("release_string", "    free(out->{{member}});\n    out->{{member}} = NULL;\n");

const BRANCH_STRING: Template = Template::new("branch_string", r#"        if (strcmp(key, "{{key}}") == 0) {
            free(key);
            char* value = bfj_read_string(&ptr);
            if (value == NULL) return -1;
            free(out->{{member}});
            out->{{member}} = value;
            continue;
        }
"#);

const BRANCH_INTEGER: Template = Template::new("branch_integer", r#"        if (strcmp(key, "{{key}}") == 0) {
            free(key);
            if (bfj_read_integer(&ptr, &out->{{member}}) != 0) return -1;
            continue;
        }
"#);

const BRANCH_BOOLEAN: Template = Template::new("branch_boolean", r#"        if (strcmp(key, "{{key}}") == 0) {
            free(key);
            if (bfj_read_bool(&ptr, &out->{{member}}) != 0) return -1;
            continue;
        }
"#);

const SERIALIZE_STRING: Template = Template::new("serialize_string", r#"    status |= bfj_buf_puts(&buf, "{{prefix}}");
    status |= bfj_buf_puts(&buf, out.{{member}} != NULL ? out.{{member}} : "");
"#);

const SERIALIZE_INTEGER: Template = Template::new("serialize_integer", r#"    {
        char number[32];
        snprintf(number, sizeof(number), "%" PRId64, out.{{member}});
        status |= bfj_buf_puts(&buf, "{{prefix}}");
        status |= bfj_buf_puts(&buf, number);
    }
"#);

const SERIALIZE_BOOLEAN: Template = Template::new("serialize_boolean", r#"    status |= bfj_buf_puts(&buf, "{{prefix}}");
    status |= bfj_buf_puts(&buf, out.{{member}} ? "true" : "false");
"#);

/// Schema names are never used bare as C identifiers; the prefix keeps them
/// clear of keywords and macros.
fn type_ident(record_name: &str) -> String {
    format!("bfj_t_{}", record_name)
}

fn member_ident(field_name: &str) -> String {
    format!("bfj_f_{}", field_name)
}

fn header_guard(record_name: &str) -> String {
    format!("BFJ_{}_H", record_name)
}

/// Generated source text for one record, plus the names it expects its files to have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSource {
    pub record_name: String,
    pub type_name:   String,
    pub members:     Vec<String>,
    pub protocol:    WireProtocol,
    pub text:        String,
}

impl GeneratedSource {
    pub fn header_file(&self) -> String {
        format!("{}.h", self.record_name)
    }

    pub fn source_file(&self) -> String {
        format!("{}.c", self.record_name)
    }

    /// The line that closes the header's include guard.
    pub fn header_marker(&self) -> String {
        format!("#endif // {}\n", header_guard(&self.record_name))
    }

    /// Splits the text into `(header, implementation)` right after the header marker.
    pub fn split(&self) -> Result<(&str, &str), TemplateError> {
        let marker = self.header_marker();
        let end = self
            .text
            .find(&marker)
            .map(|start| start + marker.len())
            .ok_or(TemplateError::MissingMarker(marker))?;
        Ok(self.text.split_at(end))
    }
}

/// Validates `schema` and generates its C parser. Invalid schemas produce no code.
pub fn compile_schema_to_c(schema: &RecordSchema, protocol: WireProtocol) -> Result<GeneratedSource, CompileError> {
    let validated = validate(schema)?;
    Ok(generate_c(&validated, protocol)?)
}

pub fn generate_c(schema: &ValidatedSchema, protocol: WireProtocol) -> Result<GeneratedSource, TemplateError> {
    let record_name = schema.name().to_string();
    let type_name = type_ident(&record_name);
    let members: Vec<String> = schema.fields().iter().map(|f| member_ident(&f.name)).collect();

    let mut member_lines = String::new();
    let mut release = String::new();
    let mut branches = String::new();
    let mut serializers = String::new();

    for (field, member) in schema.fields().iter().zip(&members) {
        member_lines.push_str(&MEMBER.render(&[("c_type", c_type(field.kind)), ("member", member)])?);

        let branch = match field.kind {
            FieldKind::String  => BRANCH_STRING,
            FieldKind::Integer => BRANCH_INTEGER,
            FieldKind::Boolean => BRANCH_BOOLEAN,
        };
        branches.push_str(&branch.render(&[("key", &field.name), ("member", member)])?);

        if field.kind == FieldKind::String {
            release.push_str(&RELEASE_STRING.render(&[("member", member)])?);
        }

        let prefix = value_prefix(field, protocol);
        let serializer = match field.kind {
            FieldKind::String  => SERIALIZE_STRING,
            FieldKind::Integer => SERIALIZE_INTEGER,
            FieldKind::Boolean => SERIALIZE_BOOLEAN,
        };
        serializers.push_str(&serializer.render(&[("prefix", &prefix), ("member", member)])?);
    }

    let guard = header_guard(&record_name);
    let header_file = format!("{}.h", record_name);

    let header = HEADER.render(&[
        ("guard", &guard),
        ("members", &member_lines),
        ("type_name", &type_name),
    ])?;
    let implementation = IMPLEMENTATION.render(&[
        ("header_file", &header_file),
        ("type_name", &type_name),
        ("release", &release),
        ("branches", &branches),
        ("success", SUCCESS_SENTINEL),
        ("serializers", &serializers),
    ])?;

    Ok(GeneratedSource {
        record_name,
        type_name,
        members,
        protocol,
        text: format!("{}{}", header, implementation),
    })
}

/// What goes in front of each serialized value.
fn value_prefix(field: &Field, protocol: WireProtocol) -> String {
    match protocol {
        WireProtocol::Positional => FIELD_DELIMITER.to_string(),
        WireProtocol::Keyed      => format!("{}{}=", FIELD_DELIMITER, field.name),
    }
}
