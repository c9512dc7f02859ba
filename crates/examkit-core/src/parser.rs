//! JSON question pool parser.
//!
//! Pool documents come in several loosely typed shapes. This module resolves
//! all of them into strict [`QuestionRecord`]s in one pass, so the engine
//! never sees alternate field names. Unrecognized values are parse errors.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::error::PoolError;
use crate::model::{positional_label, Difficulty, QuestionRecord, QuestionType, MAX_OPTIONS};

/// Field names accepted for the explanation, in priority order.
const EXPLANATION_FIELDS: [&str; 6] = [
    "explanation",
    "solution",
    "loigiai",
    "loi_giai",
    "guide",
    "huongdan",
];

/// Parse a pool document from a JSON string.
///
/// Accepts a bare array of questions or an object with a `questions` array.
pub fn parse_pool_str(content: &str) -> Result<Vec<QuestionRecord>, PoolError> {
    let document: Value = serde_json::from_str(content)?;
    parse_pool_value(document)
}

/// Parse an already-decoded pool document.
pub fn parse_pool_value(document: Value) -> Result<Vec<QuestionRecord>, PoolError> {
    let entries = match document {
        Value::Array(entries) => entries,
        Value::Object(mut object) => match object.remove("questions") {
            Some(Value::Array(entries)) => entries,
            _ => return Err(PoolError::UnrecognizedShape),
        },
        _ => return Err(PoolError::UnrecognizedShape),
    };

    let mut seen = HashSet::new();
    let mut questions = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let Value::Object(fields) = entry else {
            return Err(PoolError::NotAnObject { index });
        };
        let question = parse_question(index, &fields)?;
        if !seen.insert(question.id.clone()) {
            return Err(PoolError::DuplicateId(question.id));
        }
        questions.push(question);
    }

    Ok(questions)
}

fn parse_question(index: usize, fields: &Map<String, Value>) -> Result<QuestionRecord, PoolError> {
    let id = match fields.get("id") {
        None | Some(Value::Null) => format!("q-{index}"),
        Some(Value::String(s)) if s.trim().is_empty() => format!("q-{index}"),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => {
            return Err(PoolError::InvalidField {
                id: format!("q-{index}"),
                field: "id",
                expected: "must be a string or number",
            })
        }
    };

    let content = match optional_string(&id, fields, "content")? {
        Some(content) => content,
        None => optional_string(&id, fields, "text")?
            .ok_or_else(|| PoolError::MissingContent { id: id.clone() })?,
    };

    let question_type = match optional_string(&id, fields, "type")? {
        Some(raw) if !raw.trim().is_empty() => {
            raw.parse::<QuestionType>()
                .map_err(|_| PoolError::UnknownType {
                    id: id.clone(),
                    value: raw,
                })?
        }
        _ => QuestionType::MultipleChoice,
    };

    let difficulty = match optional_string(&id, fields, "difficulty")? {
        Some(raw) if !raw.trim().is_empty() => {
            raw.parse::<Difficulty>()
                .map_err(|_| PoolError::UnknownDifficulty {
                    id: id.clone(),
                    value: raw,
                })?
        }
        _ => Difficulty::Recall,
    };

    let options = parse_options(&id, fields.get("options"))?;
    if options.len() > MAX_OPTIONS {
        return Err(PoolError::TooManyOptions {
            id,
            count: options.len(),
        });
    }

    let correct_answer = parse_correct_answer(&id, fields)?;

    let explanation = EXPLANATION_FIELDS
        .iter()
        .filter_map(|key| fields.get(*key).and_then(Value::as_str))
        .find(|text| !text.trim().is_empty())
        .map(str::to_string);

    Ok(QuestionRecord {
        id,
        content,
        question_type,
        difficulty,
        options,
        correct_answer,
        explanation,
    })
}

/// A string field that may be absent or null.
fn optional_string(
    id: &str,
    fields: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, PoolError> {
    match fields.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(PoolError::InvalidField {
            id: id.to_string(),
            field,
            expected: "must be a string",
        }),
    }
}

/// Options are strings, or `{id, content}` objects flattened to `"<id>. <content>"`.
fn parse_options(id: &str, value: Option<&Value>) -> Result<Vec<String>, PoolError> {
    let entries = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            return Err(PoolError::InvalidField {
                id: id.to_string(),
                field: "options",
                expected: "must be an array",
            })
        }
    };

    let invalid = || PoolError::InvalidField {
        id: id.to_string(),
        field: "options",
        expected: "must hold strings or {id, content} objects",
    };

    entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| match entry {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            Value::Object(option) => {
                let label = match option.get("id") {
                    Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
                    Some(Value::Number(n)) => n.to_string(),
                    None | Some(Value::Null) | Some(Value::String(_)) => {
                        positional_label(idx).to_string()
                    }
                    Some(_) => return Err(invalid()),
                };
                let text = match option.get("content").or_else(|| option.get("text")) {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    None | Some(Value::Null) => String::new(),
                    Some(_) => return Err(invalid()),
                };
                Ok(format!("{label}. {text}"))
            }
            _ => Err(invalid()),
        })
        .collect()
}

/// `correctOptionId` wins over `correctAnswer`. A numeric id is an option
/// index and maps to its letter; an empty answer counts as absent.
fn parse_correct_answer(
    id: &str,
    fields: &Map<String, Value>,
) -> Result<Option<String>, PoolError> {
    let answer = match fields.get("correctOptionId") {
        Some(Value::Number(n)) => {
            let index = n
                .as_u64()
                .filter(|&i| (i as usize) < MAX_OPTIONS)
                .ok_or_else(|| PoolError::InvalidField {
                    id: id.to_string(),
                    field: "correctOptionId",
                    expected: "must be an option index between 0 and 25",
                })?;
            Some(positional_label(index as usize).to_string())
        }
        Some(Value::String(s)) => Some(s.clone()),
        None | Some(Value::Null) => match fields.get("correctAnswer") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            Some(_) => {
                return Err(PoolError::InvalidField {
                    id: id.to_string(),
                    field: "correctAnswer",
                    expected: "must be a string, number or boolean",
                })
            }
        },
        Some(_) => {
            return Err(PoolError::InvalidField {
                id: id.to_string(),
                field: "correctOptionId",
                expected: "must be a number or string",
            })
        }
    };

    Ok(answer.filter(|a| !a.trim().is_empty()))
}

/// Load a pool from a JSON file.
pub fn load_pool(path: &Path) -> Result<Vec<QuestionRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read pool file: {}", path.display()))?;
    parse_pool_str(&content).with_context(|| format!("failed to parse pool: {}", path.display()))
}

/// Recursively load and merge every `.json` pool in a directory.
///
/// Files that fail to parse are skipped with a warning. Ids must be unique
/// across the merged pool.
pub fn load_pool_directory(dir: &Path) -> Result<Vec<QuestionRecord>> {
    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut paths = Vec::new();
    collect_json_files(dir, &mut paths)?;
    paths.sort();

    let mut seen = HashSet::new();
    let mut pool = Vec::new();
    for path in paths {
        match load_pool(&path) {
            Ok(questions) => {
                for question in questions {
                    if !seen.insert(question.id.clone()) {
                        anyhow::bail!(
                            "duplicate question id {} in {}",
                            question.id,
                            path.display()
                        );
                    }
                    pool.push(question);
                }
            }
            Err(e) => {
                tracing::warn!("skipping {}: {e:#}", path.display());
            }
        }
    }

    Ok(pool)
}

fn collect_json_files(dir: &Path, out: &mut Vec<std::path::PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if path.is_dir() {
            collect_json_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            out.push(path);
        }
    }
    Ok(())
}

/// Load a pool from a file or a directory of files.
pub fn load_pool_path(path: &Path) -> Result<Vec<QuestionRecord>> {
    if path.is_dir() {
        load_pool_directory(path)
    } else {
        load_pool(path)
    }
}

/// A warning from pool validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Check a pool for content problems that do not block composition.
pub fn validate_pool(pool: &[QuestionRecord]) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    for question in pool {
        let warn = |message: String| ValidationWarning {
            question_id: Some(question.id.clone()),
            message,
        };

        if question.content.trim().is_empty() {
            warnings.push(warn("content is empty".into()));
        }

        if question.question_type != QuestionType::MultipleChoice {
            continue;
        }

        if question.options.is_empty() {
            warnings.push(warn("multiple choice question has no options".into()));
        }

        match &question.correct_answer {
            None => warnings.push(warn(
                "multiple choice question has no correct answer and will not be scored".into(),
            )),
            Some(answer) if !question.options.is_empty() => {
                let normalized = crate::normalize::normalize_answer(answer);
                let known = question
                    .labeled_options()
                    .iter()
                    .any(|(label, _)| label.to_string() == normalized);
                if !known {
                    warnings.push(warn(format!(
                        "correct answer `{answer}` does not match any option label"
                    )));
                }
            }
            Some(_) => {}
        }
    }

    if pool.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "pool contains no questions".into(),
        });
    }

    warnings
}
