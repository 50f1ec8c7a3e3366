//! Declarative generator documents
//!
//! A function file holds a JSON document whose directive objects are
//! evaluated on every call:
//!
//! ```text
//! {
//!   "title": {"$arg": "title", "default": "Untitled"},
//!   "theme": {"$apply": "dark::heroTheme", "args": {"accent": {"$arg": "accent"}}},
//!   "mountedAt": {"$ctx": "anchor"},
//!   "raw": {"$literal": {"$arg": "not evaluated"}}
//! }
//! ```
//!
//! Objects without a directive key are copied with their values evaluated.

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

use super::context::TemplateContext;
use super::node::{Args, TemplateNode, Tools};
use crate::error::GeneratorError;

const ARG: &str = "$arg";
const APPLY: &str = "$apply";
const CTX: &str = "$ctx";
const LITERAL: &str = "$literal";
const NATIVE: &str = "$native";

const DIRECTIVES: [&str; 5] = [ARG, APPLY, CTX, LITERAL, NATIVE];

/// Malformed directive in a generator document
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectiveError {
    #[error("object mixes directives {0} and {1}")]
    Conflicting(String, String),

    #[error("'{directive}' does not accept key '{key}'")]
    UnexpectedKey { directive: String, key: String },

    #[error("'{directive}' expects {expected}")]
    BadOperand {
        directive: &'static str,
        expected: &'static str,
    },

    #[error("'$ctx' field '{0}' is unknown (expected id, anchor, path or filename)")]
    UnknownContextField(String),

    #[error("'$native' is only allowed as the whole document")]
    NestedNative,

    #[error("'$apply' args must not contain '$apply'")]
    ApplyInArgs,
}

/// Context field readable with `$ctx`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtxField {
    Id,
    Anchor,
    Path,
    Filename,
}

impl CtxField {
    fn parse(name: &str) -> Result<Self, DirectiveError> {
        match name {
            "id" => Ok(Self::Id),
            "anchor" => Ok(Self::Anchor),
            "path" => Ok(Self::Path),
            "filename" => Ok(Self::Filename),
            other => Err(DirectiveError::UnknownContextField(other.to_string())),
        }
    }

    fn read(self, ctx: &TemplateContext) -> String {
        match self {
            Self::Id => ctx.id.clone(),
            Self::Anchor => ctx.anchor.to_string(),
            Self::Path => ctx.path.to_string(),
            Self::Filename => ctx.filename.clone(),
        }
    }
}

/// Parsed generator body
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Copied verbatim
    Literal(Value),
    /// Argument lookup, `/` descends into nested objects; a null argument
    /// counts as missing
    Arg {
        path: Vec<String>,
        default: Option<Box<Expr>>,
    },
    Apply {
        selector: String,
        args: IndexMap<String, Expr>,
    },
    Ctx(CtxField),
    Object(IndexMap<String, Expr>),
    Array(Vec<Expr>),
}

impl Expr {
    /// Parse a generator document
    pub fn parse(doc: &Value) -> Result<Self, DirectiveError> {
        let expr = match doc {
            Value::Object(map) => match directive_of(map)? {
                Some(directive) => parse_directive(directive, map)?,
                None => Self::Object(
                    map.iter()
                        .map(|(k, v)| Ok::<_, DirectiveError>((k.clone(), Self::parse(v)?)))
                        .collect::<Result<_, _>>()?,
                ),
            },
            Value::Array(items) => Self::Array(items.iter().map(Self::parse).collect::<Result<_, _>>()?),
            other => Self::Literal(other.clone()),
        };
        Ok(expr.collapse())
    }

    /// Fold containers whose children are all literals into one literal
    fn collapse(self) -> Self {
        match self {
            Self::Object(entries) if entries.values().all(|e| matches!(e, Self::Literal(_))) => Self::Literal(
                Value::Object(
                    entries
                        .into_iter()
                        .filter_map(|(k, e)| match e {
                            Self::Literal(v) => Some((k, v)),
                            _ => None,
                        })
                        .collect(),
                ),
            ),
            Self::Array(items) if items.iter().all(|e| matches!(e, Self::Literal(_))) => Self::Literal(
                Value::Array(
                    items
                        .into_iter()
                        .filter_map(|e| match e {
                            Self::Literal(v) => Some(v),
                            _ => None,
                        })
                        .collect(),
                ),
            ),
            other => other,
        }
    }

    fn contains_apply(&self) -> bool {
        match self {
            Self::Apply { .. } => true,
            Self::Arg { default, .. } => default.as_deref().is_some_and(Self::contains_apply),
            Self::Object(entries) => entries.values().any(Self::contains_apply),
            Self::Array(items) => items.iter().any(Self::contains_apply),
            Self::Literal(_) | Self::Ctx(_) => false,
        }
    }

    /// Evaluate against one call's arguments and context
    pub fn eval(&self, args: &Args, ctx: &TemplateContext, tools: &Tools<'_>) -> Result<TemplateNode, GeneratorError> {
        match self {
            Self::Literal(value) => Ok(TemplateNode::Value(value.clone())),
            Self::Arg { path, default } => match lookup_arg(args, path) {
                Some(value) if !value.is_null() => Ok(TemplateNode::Value(value.clone())),
                _ => match default {
                    Some(default) => default.eval(args, ctx, tools),
                    None => Ok(TemplateNode::Value(Value::Null)),
                },
            },
            Self::Apply { selector, args: call_args } => {
                let mut evaluated = Args::new();
                for (name, expr) in call_args {
                    let value = expr
                        .eval(args, ctx, tools)?
                        .into_value()
                        .ok_or_else(|| format!("argument '{}' of '{}' is not a plain value", name, selector))?;
                    evaluated.insert(name.clone(), value);
                }
                Ok(tools.apply_with(selector, evaluated)?)
            }
            Self::Ctx(field) => Ok(TemplateNode::Value(Value::String(field.read(ctx)))),
            Self::Object(entries) => {
                let mut out = IndexMap::with_capacity(entries.len());
                for (key, expr) in entries {
                    out.insert(key.clone(), expr.eval(args, ctx, tools)?);
                }
                Ok(TemplateNode::Object(out))
            }
            Self::Array(items) => Ok(TemplateNode::Array(
                items
                    .iter()
                    .map(|e| e.eval(args, ctx, tools))
                    .collect::<Result<_, _>>()?,
            )),
        }
    }
}

/// Name of the `$native` generator a document refers to, if it is one
pub fn native_name(doc: &Value) -> Result<Option<&str>, DirectiveError> {
    let Value::Object(map) = doc else {
        return Ok(None);
    };
    if !map.contains_key(NATIVE) {
        return Ok(None);
    }
    if let Some(key) = map.keys().find(|k| k.as_str() != NATIVE) {
        return Err(DirectiveError::UnexpectedKey {
            directive: NATIVE.to_string(),
            key: key.clone(),
        });
    }
    match &map[NATIVE] {
        Value::String(name) if !name.is_empty() => Ok(Some(name.as_str())),
        _ => Err(DirectiveError::BadOperand {
            directive: NATIVE,
            expected: "a generator name",
        }),
    }
}

fn directive_of(map: &serde_json::Map<String, Value>) -> Result<Option<&'static str>, DirectiveError> {
    let mut found: Option<&'static str> = None;
    for directive in DIRECTIVES {
        if map.contains_key(directive) {
            if let Some(first) = found {
                return Err(DirectiveError::Conflicting(first.to_string(), directive.to_string()));
            }
            found = Some(directive);
        }
    }
    Ok(found)
}

fn check_keys(
    directive: &'static str,
    map: &serde_json::Map<String, Value>,
    allowed: &[&str],
) -> Result<(), DirectiveError> {
    match map.keys().find(|k| k.as_str() != directive && !allowed.contains(&k.as_str())) {
        Some(key) => Err(DirectiveError::UnexpectedKey {
            directive: directive.to_string(),
            key: key.clone(),
        }),
        None => Ok(()),
    }
}

fn parse_directive(directive: &'static str, map: &serde_json::Map<String, Value>) -> Result<Expr, DirectiveError> {
    let operand = &map[directive];
    match directive {
        ARG => {
            check_keys(ARG, map, &["default"])?;
            let path: Vec<String> = match operand {
                Value::String(name) if !name.is_empty() && name.split('/').all(|s| !s.is_empty()) => {
                    name.split('/').map(str::to_string).collect()
                }
                _ => {
                    return Err(DirectiveError::BadOperand {
                        directive: ARG,
                        expected: "an argument name",
                    })
                }
            };
            let default = map.get("default").map(Expr::parse).transpose()?.map(Box::new);
            Ok(Expr::Arg { path, default })
        }
        APPLY => {
            check_keys(APPLY, map, &["args"])?;
            let Value::String(selector) = operand else {
                return Err(DirectiveError::BadOperand {
                    directive: APPLY,
                    expected: "a selector string",
                });
            };
            let args = match map.get("args") {
                None => IndexMap::new(),
                Some(Value::Object(args)) => args
                    .iter()
                    .map(|(k, v)| Ok::<_, DirectiveError>((k.clone(), Expr::parse(v)?)))
                    .collect::<Result<IndexMap<_, _>, _>>()?,
                Some(_) => {
                    return Err(DirectiveError::BadOperand {
                        directive: APPLY,
                        expected: "an object of arguments",
                    })
                }
            };
            if args.values().any(Expr::contains_apply) {
                return Err(DirectiveError::ApplyInArgs);
            }
            Ok(Expr::Apply {
                selector: selector.clone(),
                args,
            })
        }
        CTX => {
            check_keys(CTX, map, &[])?;
            match operand {
                Value::String(field) => Ok(Expr::Ctx(CtxField::parse(field)?)),
                _ => Err(DirectiveError::BadOperand {
                    directive: CTX,
                    expected: "a context field name",
                }),
            }
        }
        LITERAL => {
            check_keys(LITERAL, map, &[])?;
            Ok(Expr::Literal(operand.clone()))
        }
        _ => Err(DirectiveError::NestedNative),
    }
}

fn lookup_arg<'a>(args: &'a Args, path: &[String]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = args.get(first)?;
    for key in rest {
        current = current.as_object()?.get(key)?;
    }
    Some(current)
}
