use crate::{
    error::TemplateError,
    gen_c::GeneratedSource,
    protocol::{FAILURE_LINE, SERVE_FLAG},
    template::Template,
};

const DRIVER: Template = Template::new("driver", r#"
#include <stdio.h>
#include <stdlib.h>
#include <string.h>
#include "{{header_file}}"

#define BFJ_FAILURE "{{failure_line}}"

/* Worker loop: each request is "<length>\n<document>", each response is
   "<length>\n<payload>". Returns 0 on clean EOF. */
static int bfj_serve(void) {
    for (;;) {
        unsigned long long length = 0;
        int seen = 0;
        int c;
        while ((c = getchar()) != EOF && c != '\n') {
            if (c < '0' || c > '9') return 1;
            length = length * 10 + (unsigned long long)(c - '0');
            seen = 1;
        }
        if (c == EOF) return seen ? 1 : 0;
        if (!seen) return 1;

        char* document = (char*)malloc((size_t)length + 1);
        if (document == NULL) return 1;
        if (fread(document, 1, (size_t)length, stdin) != (size_t)length) {
            free(document);
            return 1;
        }
        document[length] = '\0';

        char* result = parse_and_serialize(document);
        free(document);

        const char* payload = result != NULL ? result : BFJ_FAILURE;
        printf("%lu\n", (unsigned long)strlen(payload));
        fputs(payload, stdout);
        fflush(stdout);
        free_serialized(result);
    }
}

int main(int argc, char* argv[]) {
    if (argc == 2 && strcmp(argv[1], "{{serve_flag}}") == 0) {
        return bfj_serve();
    }
    if (argc != 2) {
        fprintf(stderr, "Usage: %s <json_string> | {{serve_flag}}\n", argv[0]);
        return 1;
    }

    char* result = parse_and_serialize(argv[1]);
    if (result == NULL) {
        fputs(BFJ_FAILURE "\n", stdout);
        return 1;
    }

    fputs(result, stdout);
    free_serialized(result);
    return 0;
}
"#);

/// File name of the driver for a record.
pub fn driver_file(record_name: &str) -> String {
    format!("main_{}.c", record_name)
}

/// Renders the `main` program that exposes the generated parser as a process.
pub fn generate_driver(source: &GeneratedSource) -> Result<String, TemplateError> {
    DRIVER.render(&[
        ("header_file", &source.header_file()),
        ("failure_line", FAILURE_LINE),
        ("serve_flag", SERVE_FLAG),
    ])
}
