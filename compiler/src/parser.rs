use crate::{
    tokenizer::{tokenize_decl, Token},
    utils::{error, quote},
    error::DeclError,
};
use brine_flatjson_schema::{FieldSpec, RecordSchema};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref IDENTIFIER:     Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref TYPE_NAME:      Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*\*?$").unwrap();
    static ref SEMICOLON:      Regex = Regex::new(r"^;$").unwrap();
    static ref LEFT_BRACE:     Regex = Regex::new(r"^\{$").unwrap();
    static ref RIGHT_BRACE:    Regex = Regex::new(r"^\}$").unwrap();
    static ref STRUCT_KEYWORD: Regex = Regex::new(r"^struct$").unwrap();
    static ref EOF:            Regex = Regex::new(r"^$").unwrap();
}

/// Parses the text of a `.bfj` declaration file into its records.
///
/// The declared type of each field is kept verbatim; whether it is supported
/// is decided by [`crate::verifier::validate`].
pub fn parse_decl(text: &str) -> Result<Vec<RecordSchema>, DeclError> {
    let tokens = tokenize_decl(text)?;
    parse_records(&tokens)
}

pub fn parse_records(tokens: &[Token]) -> Result<Vec<RecordSchema>, DeclError> {
    let mut records = Vec::new();
    let mut index   = 0;

    fn current_token(tokens: &[Token], index: usize) -> Result<&Token, DeclError> {
        tokens
            .get(index)
            .or_else(|| tokens.last())
            .ok_or_else(|| error("Unexpected end of tokens", 0, 0))
    }

    fn eat(tokens: &[Token], index: &mut usize, test: &Regex) -> Result<bool, DeclError> {
        if test.is_match(&current_token(tokens, *index)?.text) {
            *index += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(tokens: &[Token], index: &mut usize, test: &Regex, expected: &str) -> Result<(), DeclError> {
        if !eat(tokens, index, test)? {
            let tok = current_token(tokens, *index)?;
            let found = if tok.text.is_empty() { "end of file".to_string() } else { quote(&tok.text) };
            return Err(error(
                &format!("Expected {} but found {}", expected, found),
                tok.line,
                tok.column,
            ));
        }
        Ok(())
    }

    while index < tokens.len() && !eat(tokens, &mut index, &EOF)? {
        if !eat(tokens, &mut index, &STRUCT_KEYWORD)? {
            let tok = current_token(tokens, index)?;
            return Err(error(
                &format!("Unexpected token {}", quote(&tok.text)),
                tok.line,
                tok.column,
            ));
        }

        let name_tok = current_token(tokens, index)?;
        expect(tokens, &mut index, &IDENTIFIER, "identifier")?;
        expect(tokens, &mut index, &LEFT_BRACE, "\"{\"")?;

        let mut fields = Vec::new();
        while !eat(tokens, &mut index, &RIGHT_BRACE)? {
            let type_tok = current_token(tokens, index)?;
            expect(tokens, &mut index, &TYPE_NAME, "type")?;

            let field_tok = current_token(tokens, index)?;
            expect(tokens, &mut index, &IDENTIFIER, "identifier")?;
            expect(tokens, &mut index, &SEMICOLON, "\";\"")?;

            fields.push(FieldSpec::declared(field_tok.text.clone(), type_tok.text.clone()));
        }

        records.push(RecordSchema::new(name_tok.text.clone(), fields));
    }

    Ok(records)
}
