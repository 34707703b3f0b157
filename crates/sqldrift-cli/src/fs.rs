//! Thin filesystem loader for the desired-state tree
//!
//! Reads each directory's `sqldrift.toml` plus its `.sql` files into the
//! planner's directory shape. Statement tokenization is deliberately
//! simple: files hold CREATE statements (and optionally ALTER TABLE
//! statements), and a stored-program definition must be the last
//! statement in its file since its body keeps inner `;` terminators.

use std::path::Path;

use sqldrift_apply::{Dir, DirConfig, TargetOptions};
use sqldrift_core::{Error, LogicalSchema, ObjectType, Result, Statement};

use crate::config::load_file_config;

/// Load a directory subtree rooted at `path`. Connection settings and
/// options inherit downward; parse failures mark the directory instead
/// of aborting the walk.
pub fn load_dir(path: &Path, base_config: &DirConfig, base_opts: &TargetOptions) -> Dir {
    let mut dir = Dir {
        path: path.to_path_buf(),
        config: base_config.clone(),
        options: base_opts.clone(),
        logical_schemas: Vec::new(),
        parse_error: None,
        subdirs: Vec::new(),
    };

    match load_file_config(path) {
        Ok(Some(file_config)) => {
            match file_config
                .apply_to_dir_config(&dir.config)
                .and_then(|config| Ok((config, file_config.apply_to_options(&dir.options)?)))
            {
                Ok((config, options)) => {
                    dir.config = config;
                    dir.options = options;
                }
                Err(err) => {
                    dir.parse_error = Some(err.to_string());
                    return dir;
                }
            }
        }
        Ok(None) => {}
        Err(err) => {
            dir.parse_error = Some(err.to_string());
            return dir;
        }
    }

    let mut entries: Vec<_> = match std::fs::read_dir(path) {
        Ok(read) => read.filter_map(|e| e.ok()).collect(),
        Err(err) => {
            dir.parse_error = Some(format!("cannot read directory: {err}"));
            return dir;
        }
    };
    entries.sort_by_key(|e| e.file_name());

    let mut logical = LogicalSchema::new(None);
    for entry in &entries {
        let entry_path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        if entry_path.is_dir() {
            dir.subdirs
                .push(load_dir(&entry_path, &dir.config, &dir.options));
        } else if name.ends_with(".sql") {
            let content = match std::fs::read_to_string(&entry_path) {
                Ok(content) => content,
                Err(err) => {
                    dir.parse_error = Some(format!("{}: {err}", entry_path.display()));
                    break;
                }
            };
            if let Err(err) = parse_sql_file(&content, &entry_path, &mut logical) {
                dir.parse_error = Some(err.to_string());
                break;
            }
        }
    }

    if dir.parse_error.is_none() && !logical.is_empty() {
        dir.logical_schemas.push(logical);
    }
    dir
}

fn parse_sql_file(content: &str, file: &Path, logical: &mut LogicalSchema) -> Result<()> {
    for (line_no, mut text) in split_statements(content) {
        let (header, name_token) = parse_statement_header(&text)
            .map_err(|err| Error::Config(format!("{}:{line_no}: {err}", file.display())))?;
        let (object_type, object_name, schema_qualifier, is_alter) = header;
        // Statements run inside a scratch schema; a schema-qualified name
        // would escape it, so the qualifier is validated separately and
        // stripped from the executed text.
        if schema_qualifier.is_some() {
            text = text.replacen(&name_token, &sqldrift_core::quote_ident(&object_name), 1);
        }
        let statement = Statement {
            text,
            file: file.to_path_buf(),
            line_no,
            object_type,
            object_name,
            schema_qualifier,
            compound: object_type.is_stored_program(),
        };
        if is_alter {
            logical.add_alter(statement);
        } else if let Some(previous) = logical.add_create(statement) {
            return Err(Error::Config(format!(
                "{}:{line_no}: {} already defined at {}",
                file.display(),
                previous.key(),
                previous.location()
            )));
        }
    }
    Ok(())
}

/// Split file content into statements with their starting line numbers.
/// Statements end at a line whose last non-space character is `;`, except
/// stored programs, which run to the end of the file.
fn split_statements(content: &str) -> Vec<(usize, String)> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut start_line = 0usize;
    let mut in_routine = false;

    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if current.is_empty() {
            if trimmed.is_empty() || trimmed.starts_with("--") || trimmed.starts_with('#') {
                continue;
            }
            start_line = index + 1;
            let upper = trimmed.to_uppercase();
            in_routine =
                upper.starts_with("CREATE PROCEDURE") || upper.starts_with("CREATE FUNCTION");
        }
        current.push_str(line);
        current.push('\n');

        if !in_routine && trimmed.ends_with(';') {
            let text = current.trim().trim_end_matches(';').trim_end().to_string();
            statements.push((start_line, text));
            current.clear();
        }
    }
    if !current.trim().is_empty() {
        let text = current.trim().trim_end_matches(';').trim_end().to_string();
        statements.push((start_line, text));
    }
    statements
}

type StatementHeader = (ObjectType, String, Option<String>, bool);

/// Parse a statement's leading words. Returns the header plus the raw
/// name token, so callers can rewrite qualified names in place.
fn parse_statement_header(text: &str) -> Result<(StatementHeader, String)> {
    let mut words = text.split_whitespace();
    let verb = words.next().unwrap_or("").to_uppercase();
    let is_alter = match verb.as_str() {
        "CREATE" => false,
        "ALTER" => true,
        other => {
            return Err(Error::Config(format!(
                "unsupported statement starting with '{other}'; only CREATE and ALTER TABLE are allowed"
            )));
        }
    };

    let object_type = match words.next().unwrap_or("").to_uppercase().as_str() {
        "TABLE" => ObjectType::Table,
        "PROCEDURE" if !is_alter => ObjectType::Procedure,
        "FUNCTION" if !is_alter => ObjectType::Function,
        other => {
            return Err(Error::Config(format!(
                "unsupported object type '{other}'"
            )));
        }
    };

    let name_token = words
        .next()
        .ok_or_else(|| Error::Config("statement names no object".to_string()))?;
    let (schema_qualifier, object_name) = parse_object_name(name_token)?;
    let token_without_paren = name_token.split('(').next().unwrap_or(name_token);
    Ok((
        (object_type, object_name, schema_qualifier, is_alter),
        token_without_paren.to_string(),
    ))
}

/// Parse `name`, `` `name` ``, `db.name`, or `` `db`.`name` `` forms. A
/// trailing parenthesis (from `CREATE TABLE t(` spellings) is ignored.
fn parse_object_name(token: &str) -> Result<(Option<String>, String)> {
    let mut idents = Vec::new();
    let mut rest = token;
    loop {
        if let Some(after_tick) = rest.strip_prefix('`') {
            let end = after_tick
                .find('`')
                .ok_or_else(|| Error::Config(format!("unterminated identifier in '{token}'")))?;
            idents.push(after_tick[..end].to_string());
            rest = &after_tick[end + 1..];
        } else {
            let end = rest
                .find(['.', '('])
                .unwrap_or(rest.len());
            idents.push(rest[..end].trim().to_string());
            rest = &rest[end..];
        }
        if let Some(after_dot) = rest.strip_prefix('.') {
            rest = after_dot;
            continue;
        }
        break;
    }

    match idents.len() {
        1 if !idents[0].is_empty() => Ok((None, idents.pop().unwrap_or_default())),
        2 if !idents[1].is_empty() => {
            let name = idents.pop().unwrap_or_default();
            let qualifier = idents.pop().unwrap_or_default();
            Ok((Some(qualifier), name))
        }
        _ => Err(Error::Config(format!("cannot parse object name '{token}'"))),
    }
}

#[cfg(test)]
mod tests;
